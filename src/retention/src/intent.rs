//! On-disk record of deletions a run is about to perform.
//!
//! The record is written before either side executes and rewritten once both
//! have been attempted. A record still marked `planned` means the process
//! died in between, and lists exactly what may be half-deleted.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    Planned,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRecord {
    pub run_id: String,
    pub table: String,
    pub location: String,
    pub cutoff: NaiveDateTime,
    pub partitions: Vec<String>,
    pub directories: Vec<String>,
    pub status: IntentStatus,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl IntentRecord {
    /// Same plan, new status.
    pub fn with_status(&self, status: IntentStatus, errors: Vec<String>) -> Self {
        Self {
            status,
            errors,
            recorded_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// A single JSON file holding the latest [`IntentRecord`].
#[derive(Debug, Clone)]
pub struct IntentLog {
    path: PathBuf,
}

impl IntentLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored record. Writes a sibling temp file and renames it
    /// over the log so readers never see a partial record.
    pub fn record(&self, record: &IntentRecord) -> Result<(), IntentLogError> {
        let json = serde_json::to_vec_pretty(record)?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json).map_err(|source| IntentLogError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| IntentLogError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// The stored record, or `None` if no run has recorded one yet.
    pub fn load(&self) -> Result<Option<IntentRecord>, IntentLogError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(IntentLogError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "intent".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[derive(Error, Debug)]
pub enum IntentLogError {
    #[error("Intent log I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed intent record: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn planned() -> IntentRecord {
        IntentRecord {
            run_id: "drop_1704067200000".to_string(),
            table: "wmf_raw.webrequest".to_string(),
            location: "/wmf/data/raw/webrequest".to_string(),
            cutoff: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            partitions: vec!["year=2020/month=1/day=1/hour=0".to_string()],
            directories: vec!["/wmf/data/raw/webrequest/text/hourly/2020/01/01/00".to_string()],
            status: IntentStatus::Planned,
            recorded_at: Utc::now(),
            errors: vec![],
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let log = IntentLog::new(dir.path().join("intent.json"));
        assert!(log.load().unwrap().is_none());
    }

    #[test]
    fn test_record_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let log = IntentLog::new(dir.path().join("intent.json"));

        let record = planned();
        log.record(&record).unwrap();
        assert_eq!(log.load().unwrap(), Some(record.clone()));

        let failed = record.with_status(IntentStatus::Failed, vec!["namenode down".to_string()]);
        log.record(&failed).unwrap();

        let loaded = log.load().unwrap().unwrap();
        assert_eq!(loaded.status, IntentStatus::Failed);
        assert_eq!(loaded.errors, vec!["namenode down"]);
        assert_eq!(loaded.partitions, record.partitions);
        assert!(!dir.path().join("intent.json.tmp").exists());
    }

    #[test]
    fn test_status_is_lowercase_json() {
        let json = serde_json::to_value(planned()).unwrap();
        assert_eq!(json["status"], "planned");
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_malformed_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intent.json");
        fs::write(&path, "{not json").unwrap();

        let err = IntentLog::new(&path).load().unwrap_err();
        assert!(matches!(err, IntentLogError::Serde(_)));
    }

    #[test]
    fn test_unwritable_location() {
        let dir = tempfile::tempdir().unwrap();
        let log = IntentLog::new(dir.path().join("missing-dir").join("intent.json"));

        let err = log.record(&planned()).unwrap_err();
        assert!(matches!(err, IntentLogError::Io { .. }));
    }
}
