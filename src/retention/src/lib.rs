//! Time-based retention for hourly partitioned Hive tables.
//!
//! A run computes a single cutoff, classifies every catalog partition and
//! every partition directory against it, then drops the expired ones from
//! both the metastore and HDFS (or prints the equivalent commands).
//!
//! ## Architecture
//!
//! - `policy`: cutoff computation
//! - `partition_type`: the closed set of supported directory layouts
//! - `classifier`: date extraction and age comparison
//! - `coordinator`: dry-run rendering or execution of both deletions
//! - `intent`: on-disk record of planned deletions
//! - `dropper`: the end-to-end run

pub mod classifier;
pub mod coordinator;
pub mod dropper;
pub mod intent;
pub mod partition_type;
pub mod policy;

#[cfg(test)]
mod test_util;

pub use classifier::{AgeClassifier, ClassifierError, PathParseError, parse_datetime};
pub use coordinator::{DeletionCoordinator, DeletionError, DeletionOutcome, TableRef};
pub use dropper::{DropperOptions, PartitionDropper, RunSummary};
pub use intent::{IntentLog, IntentLogError, IntentRecord, IntentStatus};
pub use partition_type::{ExtractionStrategy, PartitionType, UnknownPartitionType};
pub use policy::{RetentionCutoff, RetentionPolicyError};
