//! Thin wrappers around the Hive and HDFS command line tools.
//!
//! Both collaborators shell out through a [`CommandRunner`], so tests can
//! substitute the process layer and production code can point the wrappers at
//! alternative binaries (e.g. `beeline`) through configuration.

pub mod command;
pub mod error;
pub mod hdfs;
pub mod hive;

pub use command::{CommandOutput, CommandRunner, ProcessRunner};
pub use error::{CommandError, HadoopError};
pub use hdfs::{FileSystem, Hdfs, validate_path};
pub use hive::{Catalog, Hive, partition_datetime_from_spec};
