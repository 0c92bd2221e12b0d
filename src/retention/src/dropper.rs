//! End-to-end retention run for one table.

use anyhow::{Context, Result, bail};
use chrono::{NaiveDateTime, Utc};
use hadoop::{Catalog, FileSystem, validate_path};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::classifier::AgeClassifier;
use crate::coordinator::{DeletionCoordinator, DeletionOutcome, TableRef};
use crate::intent::{IntentLog, IntentRecord, IntentStatus};
use crate::partition_type::PartitionType;
use crate::policy::RetentionCutoff;

/// Inputs of a run.
#[derive(Debug, Clone)]
pub struct DropperOptions {
    pub table: TableRef,
    /// Base directory of the table's data; asked from the catalog when `None`.
    pub location: Option<String>,
    pub older_than_days: u32,
    pub partition_type: PartitionType,
    pub dry_run: bool,
    pub intent_log: Option<PathBuf>,
}

/// Result of a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub cutoff: NaiveDateTime,
    pub location: String,
    pub partitions_evaluated: usize,
    pub partitions_selected: Vec<String>,
    pub directories_evaluated: usize,
    pub directories_selected: Vec<String>,
    /// Directories whose date could not be parsed and were left alone.
    pub directories_skipped: usize,
    pub outcome: DeletionOutcome,
}

/// Drops expired partitions of one table from the catalog and from HDFS.
pub struct PartitionDropper<'a, C: ?Sized, F: ?Sized> {
    catalog: &'a C,
    filesystem: &'a F,
    options: DropperOptions,
}

impl<'a, C, F> PartitionDropper<'a, C, F>
where
    C: Catalog + ?Sized,
    F: FileSystem + ?Sized,
{
    pub fn new(catalog: &'a C, filesystem: &'a F, options: DropperOptions) -> Self {
        Self {
            catalog,
            filesystem,
            options,
        }
    }

    /// Classify everything against a cutoff derived from `now` and delete (or
    /// print) what is expired. Dry-run text goes to `out`.
    pub fn run<W: Write + ?Sized>(&self, now: NaiveDateTime, out: &mut W) -> Result<RunSummary> {
        let options = &self.options;
        let run_id = format!("drop_{}", now.and_utc().timestamp_millis());

        if let Some(location) = options.location.as_deref().filter(|l| !validate_path(l)) {
            bail!("Invalid location '{location}': must be absolute or start with a scheme such as hdfs://");
        }

        let cutoff = RetentionCutoff::from_days(options.older_than_days, now)
            .context("Failed to compute retention cutoff")?;
        let strategy = options.partition_type.strategy();
        let classifier = AgeClassifier::new(&strategy, cutoff)
            .with_context(|| format!("Invalid {} partition type", options.partition_type))?;

        info!(
            table = %options.table,
            run_id = %run_id,
            partition_type = %options.partition_type,
            dry_run = options.dry_run,
            "Starting partition drop run ({})",
            cutoff.display()
        );

        let location = match &options.location {
            Some(location) => location.clone(),
            None => {
                let location = self
                    .catalog
                    .table_location(&options.table.table)
                    .with_context(|| format!("Failed to look up location of {}", options.table))?;
                if !validate_path(&location) {
                    bail!("Catalog reported an invalid location '{location}' for {}", options.table);
                }
                debug!(table = %options.table, location = %location, "Inferred table location");
                location
            }
        };

        let partitions = self
            .catalog
            .partitions(&options.table.table)
            .with_context(|| format!("Failed to list partitions of {}", options.table))?;
        let partitions_selected = select_partitions(&classifier, &partitions)?;

        let glob = strategy.glob_under(&location);
        let directories = self
            .filesystem
            .ls(&glob, false)
            .with_context(|| format!("Failed to list partition directories matching {glob}"))?;
        let (directories_selected, directories_skipped) = select_directories(&classifier, &directories);

        info!(
            table = %options.table,
            partitions = partitions.len(),
            expired_partitions = partitions_selected.len(),
            directories = directories.len(),
            expired_directories = directories_selected.len(),
            skipped_directories = directories_skipped,
            "Classified partitions and partition directories"
        );

        let has_work = !partitions_selected.is_empty() || !directories_selected.is_empty();
        let intent = if has_work { self.intent_log() } else { None };
        let planned = IntentRecord {
            run_id: run_id.clone(),
            table: options.table.to_string(),
            location: location.clone(),
            cutoff: cutoff.cutoff_timestamp,
            partitions: partitions_selected.clone(),
            directories: directories_selected.clone(),
            status: IntentStatus::Planned,
            recorded_at: Utc::now(),
            errors: Vec::new(),
        };
        if let Some(log) = &intent {
            log.record(&planned).context("Failed to record planned deletions")?;
        }

        let coordinator = DeletionCoordinator::new(
            self.catalog,
            self.filesystem,
            &options.table,
            &location,
            options.dry_run,
        );
        let result = coordinator.plan_and_execute(&partitions_selected, &directories_selected, out);

        if let Some(log) = &intent {
            let finished = match &result {
                Ok(_) => planned.with_status(IntentStatus::Completed, Vec::new()),
                Err(e) => planned.with_status(IntentStatus::Failed, vec![e.to_string()]),
            };
            if let Err(e) = log.record(&finished) {
                warn!(path = %log.path().display(), error = %e, "Failed to update intent log");
            }
        }

        let outcome = result?;

        info!(
            table = %options.table,
            run_id = %run_id,
            partitions_dropped = outcome.partitions_dropped,
            directories_removed = outcome.directories_removed,
            dry_run = outcome.dry_run,
            "Partition drop run completed"
        );

        Ok(RunSummary {
            run_id,
            cutoff: cutoff.cutoff_timestamp,
            location,
            partitions_evaluated: partitions.len(),
            partitions_selected,
            directories_evaluated: directories.len(),
            directories_selected,
            directories_skipped,
            outcome,
        })
    }

    /// The configured intent log, unless this is a dry run. A record left
    /// unfinished by an earlier run is reported before it is overwritten.
    /// Only called when there is something to delete.
    fn intent_log(&self) -> Option<IntentLog> {
        if self.options.dry_run {
            return None;
        }
        let log = IntentLog::new(self.options.intent_log.clone()?);

        match log.load() {
            Ok(Some(previous)) if previous.status != IntentStatus::Completed => {
                warn!(
                    path = %log.path().display(),
                    run_id = %previous.run_id,
                    status = ?previous.status,
                    partitions = previous.partitions.len(),
                    directories = previous.directories.len(),
                    "Previous run did not complete; its deletions may be partially applied"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(path = %log.path().display(), error = %e, "Ignoring unreadable intent log"),
        }

        Some(log)
    }
}

/// Expired partition identifiers, in catalog order. Any identifier that does
/// not carry a date aborts the run.
fn select_partitions(classifier: &AgeClassifier, partitions: &[String]) -> Result<Vec<String>> {
    let mut selected = Vec::new();
    for partition in partitions {
        if classifier
            .classify_partition(partition)
            .context("Unexpected partition layout")?
        {
            debug!(partition = %partition, "Partition is expired");
            selected.push(partition.clone());
        }
    }
    Ok(selected)
}

/// Expired directories in listing order, plus the number of directories
/// skipped because no date could be read from them.
fn select_directories(classifier: &AgeClassifier, directories: &[String]) -> (Vec<String>, usize) {
    let mut selected = Vec::new();
    let mut skipped = 0;
    for path in directories {
        match classifier.classify_path(path) {
            Ok(true) => {
                debug!(path = %path, "Partition directory is expired");
                selected.push(path.clone());
            }
            Ok(false) => {}
            Err(e) => {
                error!(
                    path = %e.path,
                    pattern = %e.pattern,
                    format = %e.format,
                    "{e}"
                );
                skipped += 1;
            }
        }
    }
    (selected, skipped)
}
