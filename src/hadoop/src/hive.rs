//! Hive metastore access through the Hive command line.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::command::{CommandRunner, ProcessRunner};
use crate::error::HadoopError;

/// Catalog operations the dropper relies on.
pub trait Catalog {
    /// Base directory of the table's data.
    fn table_location(&self, table: &str) -> Result<String, HadoopError>;

    /// Partition identifiers of the table, e.g. `year=2020/month=1/day=1/hour=0`.
    fn partitions(&self, table: &str) -> Result<Vec<String>, HadoopError>;

    /// Drop all given partitions in a single catalog call.
    fn drop_partitions(&self, table: &str, partition_ids: &[String]) -> Result<(), HadoopError>;

    /// The statements [`Catalog::drop_partitions`] would execute.
    fn drop_partitions_ddl(&self, table: &str, partition_ids: &[String]) -> String;
}

/// [`Catalog`] implemented by shelling out to the Hive CLI.
#[derive(Debug, Clone)]
pub struct Hive<R = ProcessRunner> {
    database: String,
    program: String,
    leading_args: Vec<String>,
    options: Vec<String>,
    runner: R,
}

impl Hive<ProcessRunner> {
    pub fn new(database: impl Into<String>, command: &[String], options: Option<&str>) -> Self {
        Self::with_runner(database, command, options, ProcessRunner)
    }
}

impl<R: CommandRunner> Hive<R> {
    /// `command` is the program plus its leading arguments; an empty command
    /// falls back to plain `hive`.
    pub fn with_runner(
        database: impl Into<String>,
        command: &[String],
        options: Option<&str>,
        runner: R,
    ) -> Self {
        let (program, leading_args) = match command.split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => ("hive".to_string(), Vec::new()),
        };

        Self {
            database: database.into(),
            program,
            leading_args,
            options: options.map(split_options).unwrap_or_default(),
            runner,
        }
    }

    /// `<database>.<table>`, unless `table` already names its database.
    pub fn qualified(&self, table: &str) -> String {
        if table.contains('.') {
            table.to_string()
        } else {
            format!("{}.{}", self.database, table)
        }
    }

    fn query(&self, hql: &str) -> Result<String, HadoopError> {
        let mut args = self.leading_args.clone();
        args.push("--database".to_string());
        args.push(self.database.clone());
        args.extend(self.options.iter().cloned());
        args.push("-e".to_string());
        args.push(hql.to_string());

        let out = self.runner.run(&self.program, &args)?;
        Ok(out.stdout)
    }
}

impl<R: CommandRunner> Catalog for Hive<R> {
    fn table_location(&self, table: &str) -> Result<String, HadoopError> {
        let metadata = self.query(&format!("DESCRIBE FORMATTED {table};"))?;

        metadata
            .lines()
            .filter_map(|line| line.trim().strip_prefix("Location:"))
            .find_map(|rest| rest.split_whitespace().next())
            .map(str::to_string)
            .ok_or_else(|| HadoopError::TableLocationNotFound {
                table: self.qualified(table),
            })
    }

    fn partitions(&self, table: &str) -> Result<Vec<String>, HadoopError> {
        let listing = self.query(&format!("SHOW PARTITIONS {table};"))?;

        Ok(listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && line.contains('='))
            .map(str::to_string)
            .collect())
    }

    fn drop_partitions(&self, table: &str, partition_ids: &[String]) -> Result<(), HadoopError> {
        if partition_ids.is_empty() {
            return Ok(());
        }
        self.query(&self.drop_partitions_ddl(table, partition_ids))?;
        Ok(())
    }

    /// Statements name the table with its database so they can be pasted
    /// into any Hive session.
    fn drop_partitions_ddl(&self, table: &str, partition_ids: &[String]) -> String {
        drop_partitions_ddl(&self.qualified(table), partition_ids)
    }
}

/// One `ALTER TABLE .. DROP IF EXISTS PARTITION` statement per identifier, in input order.
pub fn drop_partitions_ddl(table: &str, partition_ids: &[String]) -> String {
    partition_ids
        .iter()
        .map(|id| {
            format!(
                "ALTER TABLE {table} DROP IF EXISTS PARTITION ({});",
                partition_spec_from_id(id)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn `a=1/b=x` into the DDL form `a=1,b='x'`.
pub fn partition_spec_from_id(partition_id: &str) -> String {
    partition_id
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) if is_numeric(value) => format!("{key}={value}"),
            Some((key, value)) => format!("{key}='{}'", value.replace('\'', "\\'")),
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Split passthrough options into words the way a shell would for simple
/// quoting: whitespace separates words except inside single or double quotes,
/// and the quotes themselves are dropped.
fn split_options(options: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote = None;

    for c in options.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => word.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (None, c) => {
                word.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(word);
    }
    words
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Extract the date-time encoded in a partition identifier.
///
/// `pattern` must define the named groups `year`, `month`, `day` and `hour`.
pub fn partition_datetime_from_spec(
    partition_id: &str,
    pattern: &Regex,
) -> Result<NaiveDateTime, HadoopError> {
    let spec_error = |reason: String| HadoopError::PartitionSpec {
        spec: partition_id.to_string(),
        pattern: pattern.as_str().to_string(),
        reason,
    };

    let captures = pattern
        .captures(partition_id)
        .ok_or_else(|| spec_error("pattern does not match".to_string()))?;

    let field = |name: &str| -> Result<u32, HadoopError> {
        let raw = captures
            .name(name)
            .ok_or_else(|| spec_error(format!("no '{name}' group matched")))?;
        raw.as_str()
            .parse()
            .map_err(|e| spec_error(format!("{name} '{}': {e}", raw.as_str())))
    };

    let (year, month, day, hour) = (field("year")?, field("month")?, field("day")?, field("hour")?);

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .ok_or_else(|| spec_error(format!("{year}-{month}-{day} {hour}h is not a valid date")))
}
