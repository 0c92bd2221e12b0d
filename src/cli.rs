use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use common::Configuration;
use common::cli::{CommonArgs, utils};
use hadoop::{Hdfs, Hive, validate_path};
use retention::{DropperOptions, PartitionDropper, PartitionType, TableRef};
use std::path::PathBuf;
use tracing::error;

/// Drop hourly partitions older than a retention window from a Hive table and
/// remove their directories from HDFS
#[derive(Parser, Debug)]
#[command(name = "drop-hourly-partitions", version, about)]
pub struct Cli {
    /// Drop partitions older than this many days, at least 1 [default: 60]
    #[arg(short = 'd', long, value_parser = clap::value_parser!(u32).range(1..))]
    older_than_days: Option<u32>,

    /// Hive database holding the table [default: default]
    #[arg(short = 'D', long)]
    database: Option<String>,

    /// Table to drop partitions from
    #[arg(short, long)]
    table: String,

    /// Base HDFS location of the table's data; read from the table metadata if omitted
    #[arg(short, long)]
    location: Option<String>,

    /// Options passed to every Hive CLI invocation
    #[arg(short = 'o', long, allow_hyphen_values = true)]
    hive_options: Option<String>,

    /// Print the deletion commands instead of running them
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Partition layout of the table [default: raw]
    #[arg(long)]
    partition_type: Option<PartitionType>,

    /// Record planned deletions in this JSON file before executing them
    #[arg(long)]
    intent_log: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let dispatch = utils::init_logging(&self.common);
        tracing::dispatcher::with_default(&dispatch, || self.execute())
    }

    fn execute(&self) -> Result<()> {
        if let Some(location) = self.location.as_deref().filter(|l| !validate_path(l)) {
            error!(location = %location, "Location must be an absolute path or a URI such as hdfs://namenode/path");
            bail!("Invalid location '{location}'");
        }

        let config = utils::load_config(self.common.config.as_ref())?;
        let options = self.dropper_options(&config)?;

        let hive_options = self.hive_options.as_deref().or(config.hive.options.as_deref());
        let hive = Hive::new(options.table.database.clone(), &config.hive.command, hive_options);
        let hdfs = Hdfs::new(&config.hdfs.command);

        let stdout = std::io::stdout();
        PartitionDropper::new(&hive, &hdfs, options).run(Utc::now().naive_utc(), &mut stdout.lock())?;
        Ok(())
    }

    /// Flags win over configuration values.
    fn dropper_options(&self, config: &Configuration) -> Result<DropperOptions> {
        let partition_type = match self.partition_type {
            Some(partition_type) => partition_type,
            None => PartitionType::from_name(&config.retention.partition_type)
                .context("Invalid retention.partition_type in configuration")?,
        };

        Ok(DropperOptions {
            table: TableRef::new(
                self.database
                    .clone()
                    .unwrap_or_else(|| config.retention.database.clone()),
                self.table.clone(),
            ),
            location: self.location.clone(),
            older_than_days: self.older_than_days.unwrap_or(config.retention.older_than_days),
            partition_type,
            dry_run: self.dry_run,
            intent_log: self.intent_log.clone().or_else(|| config.intent_log.clone()),
        })
    }
}
