//! Age classification of partition identifiers and partition directories.

use chrono::NaiveDateTime;
use chrono::format::{Parsed, StrftimeItems};
use hadoop::{HadoopError, partition_datetime_from_spec};
use regex::Regex;
use std::fmt;
use thiserror::Error;

use crate::partition_type::ExtractionStrategy;
use crate::policy::RetentionCutoff;

const PARTITION_GROUPS: [&str; 4] = ["year", "month", "day", "hour"];

/// Decides whether a partition or directory is older than the run's cutoff.
#[derive(Debug, Clone)]
pub struct AgeClassifier {
    cutoff: RetentionCutoff,
    partition_pattern: Regex,
    directory_pattern: Regex,
    date_format: String,
}

impl AgeClassifier {
    /// Compile the patterns of `strategy`.
    pub fn new(strategy: &ExtractionStrategy, cutoff: RetentionCutoff) -> Result<Self, ClassifierError> {
        Self::from_parts(
            strategy.partition_pattern,
            strategy.directory_pattern,
            strategy.date_format,
            cutoff,
        )
    }

    /// Compile arbitrary patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if either regex fails to compile, the partition
    /// pattern lacks one of the `year`/`month`/`day`/`hour` groups, or the
    /// directory pattern has no capture group.
    pub fn from_parts(
        partition_pattern: &str,
        directory_pattern: &str,
        date_format: &str,
        cutoff: RetentionCutoff,
    ) -> Result<Self, ClassifierError> {
        let partition_pattern = compile(partition_pattern)?;
        for group in PARTITION_GROUPS {
            if !partition_pattern.capture_names().flatten().any(|name| name == group) {
                return Err(ClassifierError::MissingGroup {
                    pattern: partition_pattern.as_str().to_string(),
                    group,
                });
            }
        }

        let directory_pattern = compile(directory_pattern)?;
        if directory_pattern.captures_len() < 2 {
            return Err(ClassifierError::NoCaptureGroup {
                pattern: directory_pattern.as_str().to_string(),
            });
        }

        Ok(Self {
            cutoff,
            partition_pattern,
            directory_pattern,
            date_format: date_format.to_string(),
        })
    }

    /// True if the partition's date is strictly before the cutoff.
    ///
    /// A mismatch means the catalog returned something other than the
    /// expected layout, which callers treat as fatal.
    pub fn classify_partition(&self, partition_id: &str) -> Result<bool, HadoopError> {
        let timestamp = partition_datetime_from_spec(partition_id, &self.partition_pattern)?;
        Ok(self.cutoff.is_expired(timestamp))
    }

    /// True if the directory's date is strictly before the cutoff.
    ///
    /// On error the path must be left alone; the error carries the pattern
    /// and format that were applied.
    pub fn classify_path(&self, path: &str) -> Result<bool, PathParseError> {
        let timestamp = self.path_datetime(path)?;
        Ok(self.cutoff.is_expired(timestamp))
    }

    fn path_datetime(&self, path: &str) -> Result<NaiveDateTime, PathParseError> {
        let parse_error = |reason| PathParseError {
            path: path.to_string(),
            pattern: self.directory_pattern.as_str().to_string(),
            format: self.date_format.clone(),
            reason,
        };

        let captured = self
            .directory_pattern
            .captures(path)
            .and_then(|c| c.get(1))
            .ok_or_else(|| parse_error(PathParseReason::NoMatch))?;

        parse_datetime(captured.as_str(), &self.date_format)
            .map_err(|e| parse_error(PathParseReason::InvalidDate(e)))
    }
}

fn compile(pattern: &str) -> Result<Regex, ClassifierError> {
    Regex::new(pattern).map_err(|source| ClassifierError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Parse `value` with a strftime `format`.
///
/// Minutes and hours absent from the format default to zero, so formats like
/// `%Y/%m/%d/%H` or `%Y-%m-%d` describe a full date-time. The date itself
/// must be complete.
pub fn parse_datetime(value: &str, format: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let mut parsed = Parsed::new();
    chrono::format::parse(&mut parsed, value, StrftimeItems::new(format))?;

    // These only fail when the format already set a different value, which is kept.
    let _ = parsed.set_hour(0);
    let _ = parsed.set_minute(0);

    parsed.to_naive_datetime_with_offset(0)
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Partition pattern '{pattern}' has no '{group}' group")]
    MissingGroup { pattern: String, group: &'static str },

    #[error("Directory pattern '{pattern}' has no capture group")]
    NoCaptureGroup { pattern: String },
}

/// A directory path whose date could not be determined.
#[derive(Error, Debug)]
#[error("Could not extract a date from '{path}' with pattern '{pattern}' and format '{format}': {reason}")]
pub struct PathParseError {
    pub path: String,
    pub pattern: String,
    pub format: String,
    pub reason: PathParseReason,
}

#[derive(Debug)]
pub enum PathParseReason {
    NoMatch,
    InvalidDate(chrono::ParseError),
}

impl fmt::Display for PathParseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathParseReason::NoMatch => write!(f, "pattern does not match"),
            PathParseReason::InvalidDate(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition_type::PartitionType;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn raw_classifier(now: NaiveDateTime) -> AgeClassifier {
        let cutoff = RetentionCutoff::from_days(60, now).unwrap();
        AgeClassifier::new(&PartitionType::Raw.strategy(), cutoff).unwrap()
    }

    #[test]
    fn test_classify_partition_selects_only_old() {
        let classifier = raw_classifier(at(2024, 6, 1, 0));

        assert!(classifier
            .classify_partition("year=2020/month=01/day=01/hour=00")
            .unwrap());
        assert!(!classifier
            .classify_partition("year=2099/month=01/day=01/hour=00")
            .unwrap());
    }

    #[test]
    fn test_partition_exactly_at_cutoff_is_retained() {
        // 60 days before 2024-03-01T12 is 2024-01-01T12
        let classifier = raw_classifier(at(2024, 3, 1, 12));

        assert!(!classifier
            .classify_partition("year=2024/month=1/day=1/hour=12")
            .unwrap());
        assert!(classifier
            .classify_partition("year=2024/month=1/day=1/hour=11")
            .unwrap());
    }

    #[test]
    fn test_classify_partition_mismatch_is_an_error() {
        let classifier = raw_classifier(at(2024, 6, 1, 0));
        assert!(classifier.classify_partition("dt=2020-01-01").is_err());
    }

    #[test]
    fn test_classify_path_selects_only_old() {
        let classifier = raw_classifier(at(2024, 6, 1, 0));

        assert!(classifier
            .classify_path("/wmf/data/raw/webrequest/webrequest_text/hourly/2020/01/01/00")
            .unwrap());
        assert!(!classifier
            .classify_path("/wmf/data/raw/webrequest/webrequest_text/hourly/2099/01/01/00")
            .unwrap());
    }

    #[test]
    fn test_classify_path_with_scheme() {
        let classifier = raw_classifier(at(2024, 6, 1, 0));
        assert!(classifier
            .classify_path("hdfs://analytics-hadoop/wmf/data/raw/webrequest/text/hourly/2020/01/01/00")
            .unwrap());
    }

    #[test]
    fn test_classify_path_errors_name_the_pattern() {
        let classifier = raw_classifier(at(2024, 6, 1, 0));

        let no_match = classifier
            .classify_path("/wmf/data/raw/webrequest/text/daily/2020/01/01")
            .unwrap_err();
        assert!(matches!(no_match.reason, PathParseReason::NoMatch));
        assert_eq!(no_match.pattern, r".*/hourly/(.+)$");
        assert!(no_match.to_string().contains(r".*/hourly/(.+)$"));

        let bad_date = classifier
            .classify_path("/wmf/data/raw/webrequest/text/hourly/2020/13/01/00")
            .unwrap_err();
        assert!(matches!(bad_date.reason, PathParseReason::InvalidDate(_)));
        assert_eq!(bad_date.format, "%Y/%m/%d/%H");

        let trailing = classifier
            .classify_path("/wmf/data/raw/webrequest/text/hourly/2020/01/01/00/_IMPORTED")
            .unwrap_err();
        assert!(matches!(trailing.reason, PathParseReason::InvalidDate(_)));
    }

    #[test]
    fn test_from_parts_validates_patterns() {
        let cutoff = RetentionCutoff::from_days(1, at(2024, 6, 1, 0)).unwrap();

        let invalid = AgeClassifier::from_parts("(", r"hourly/(.+)", "%Y", cutoff).unwrap_err();
        assert!(matches!(invalid, ClassifierError::InvalidPattern { .. }));

        let missing = AgeClassifier::from_parts(
            r"year=(?P<year>\d+)/month=(?P<month>\d+)/day=(?P<day>\d+)",
            r"hourly/(.+)",
            "%Y",
            cutoff,
        )
        .unwrap_err();
        assert!(matches!(missing, ClassifierError::MissingGroup { group: "hour", .. }));

        let no_group = AgeClassifier::from_parts(
            PartitionType::Raw.strategy().partition_pattern,
            r"hourly/.+",
            "%Y",
            cutoff,
        )
        .unwrap_err();
        assert!(matches!(no_group, ClassifierError::NoCaptureGroup { .. }));
    }

    #[test]
    fn test_parse_datetime_defaults_missing_time_fields() {
        assert_eq!(parse_datetime("2020/01/02/13", "%Y/%m/%d/%H").unwrap(), at(2020, 1, 2, 13));
        assert_eq!(parse_datetime("2020-01-02", "%Y-%m-%d").unwrap(), at(2020, 1, 2, 0));
        assert_eq!(
            parse_datetime("2020-01-02 13:45", "%Y-%m-%d %H:%M").unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 2)
                .unwrap()
                .and_hms_opt(13, 45, 0)
                .unwrap()
        );
        assert!(parse_datetime("2020/01", "%Y/%m").is_err());
        assert!(parse_datetime("not-a-date", "%Y/%m/%d/%H").is_err());
    }
}
