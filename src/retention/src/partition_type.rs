//! Supported partition layouts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How a table encodes partition dates, both in the metastore and on HDFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionType {
    /// Hourly imports laid out as `<location>/<source>/hourly/YYYY/MM/DD/HH`.
    #[default]
    Raw,
}

/// Patterns and formats used to date one partition layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStrategy {
    /// Regex with named groups `year`, `month`, `day`, `hour`, applied to
    /// catalog partition identifiers.
    pub partition_pattern: &'static str,

    /// Regex whose first capture group is the date part of a directory path.
    pub directory_pattern: &'static str,

    /// strftime format of the captured directory date.
    pub date_format: &'static str,

    /// Glob of partition directories, relative to the table location.
    pub directory_glob: &'static str,
}

impl ExtractionStrategy {
    /// Absolute glob of partition directories under `location`.
    pub fn glob_under(&self, location: &str) -> String {
        format!("{}/{}", location.trim_end_matches('/'), self.directory_glob)
    }
}

impl PartitionType {
    pub const ALL: [PartitionType; 1] = [PartitionType::Raw];

    pub fn name(&self) -> &'static str {
        match self {
            PartitionType::Raw => "raw",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, UnknownPartitionType> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| UnknownPartitionType(name.to_string()))
    }

    pub fn strategy(&self) -> ExtractionStrategy {
        match self {
            PartitionType::Raw => ExtractionStrategy {
                partition_pattern: r"year=(?P<year>\d+)/month=(?P<month>\d+)/day=(?P<day>\d+)/hour=(?P<hour>\d+)",
                directory_pattern: r".*/hourly/(.+)$",
                date_format: "%Y/%m/%d/%H",
                directory_glob: "*/hourly/*/*/*/*",
            },
        }
    }
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PartitionType {
    type Err = UnknownPartitionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown partition type '{0}' (supported: raw)")]
pub struct UnknownPartitionType(pub String);
