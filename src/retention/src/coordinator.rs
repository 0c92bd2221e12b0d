//! Dry-run rendering or execution of the two deletions.
//!
//! The metastore drop and the directory removal are independent: neither is
//! skipped because the other failed, and nothing ties them together
//! transactionally. Use the intent log when a record of a half-finished run
//! is needed.

use hadoop::{Catalog, FileSystem, HadoopError};
use std::fmt;
use std::io::Write;
use thiserror::Error;
use tracing::info;

/// A table addressed by database and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub database: String,
    pub table: String,
}

impl TableRef {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// What a coordinator run did, or would have done in dry-run mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub partitions_dropped: usize,
    pub directories_removed: usize,
    pub dry_run: bool,
}

/// Applies (or prints) the deletions for one table.
pub struct DeletionCoordinator<'a, C: ?Sized, F: ?Sized> {
    catalog: &'a C,
    filesystem: &'a F,
    table: &'a TableRef,
    location: &'a str,
    dry_run: bool,
}

impl<'a, C, F> DeletionCoordinator<'a, C, F>
where
    C: Catalog + ?Sized,
    F: FileSystem + ?Sized,
{
    pub fn new(
        catalog: &'a C,
        filesystem: &'a F,
        table: &'a TableRef,
        location: &'a str,
        dry_run: bool,
    ) -> Self {
        Self {
            catalog,
            filesystem,
            table,
            location,
            dry_run,
        }
    }

    /// Drop `old_partition_ids` from the catalog and remove `old_paths`.
    ///
    /// In dry-run mode the equivalent statements are written to `out` in input
    /// order and no collaborator is called. Otherwise each non-empty set is
    /// deleted with exactly one batched call. Both sides are attempted before
    /// any failure is returned.
    pub fn plan_and_execute<W: Write + ?Sized>(
        &self,
        old_partition_ids: &[String],
        old_paths: &[String],
        out: &mut W,
    ) -> Result<DeletionOutcome, DeletionError> {
        let mut outcome = DeletionOutcome {
            dry_run: self.dry_run,
            ..Default::default()
        };

        let catalog_result = self.drop_partitions(old_partition_ids, out);
        if let Ok(count) = catalog_result {
            outcome.partitions_dropped = count;
        }

        let filesystem_result = self.remove_directories(old_paths, out);
        if let Ok(count) = filesystem_result {
            outcome.directories_removed = count;
        }

        match (catalog_result, filesystem_result) {
            (Ok(_), Ok(_)) => Ok(outcome),
            (Err(Failure::Output(e)), _) | (_, Err(Failure::Output(e))) => {
                Err(DeletionError::Output(e))
            }
            (Err(Failure::Hadoop(source)), Ok(_)) => Err(DeletionError::Catalog {
                table: self.table.to_string(),
                source,
            }),
            (Ok(_), Err(Failure::Hadoop(source))) => Err(DeletionError::FileSystem {
                table: self.table.to_string(),
                source,
            }),
            (Err(Failure::Hadoop(catalog)), Err(Failure::Hadoop(filesystem))) => {
                Err(DeletionError::Both {
                    table: self.table.to_string(),
                    catalog,
                    filesystem,
                })
            }
        }
    }

    fn drop_partitions<W: Write + ?Sized>(
        &self,
        partition_ids: &[String],
        out: &mut W,
    ) -> Result<usize, Failure> {
        if partition_ids.is_empty() {
            info!(table = %self.table, "No partitions need dropped");
            return Ok(0);
        }

        if self.dry_run {
            let ddl = self
                .catalog
                .drop_partitions_ddl(&self.table.table, partition_ids);
            writeln!(out, "{ddl}")?;
            return Ok(partition_ids.len());
        }

        info!(
            table = %self.table,
            count = partition_ids.len(),
            "Dropping {} partitions from table {}",
            partition_ids.len(),
            self.table
        );
        self.catalog
            .drop_partitions(&self.table.table, partition_ids)?;
        Ok(partition_ids.len())
    }

    fn remove_directories<W: Write + ?Sized>(
        &self,
        paths: &[String],
        out: &mut W,
    ) -> Result<usize, Failure> {
        if paths.is_empty() {
            info!(table = %self.table, "No partition directories need removed");
            return Ok(0);
        }

        if self.dry_run {
            writeln!(out, "{}", self.filesystem.rm_command(paths))?;
            return Ok(paths.len());
        }

        info!(
            table = %self.table,
            location = %self.location,
            count = paths.len(),
            "Removing {} partition directories for table {} from {}",
            paths.len(),
            self.table,
            self.location
        );
        self.filesystem.rm(paths)?;
        Ok(paths.len())
    }
}

enum Failure {
    Output(std::io::Error),
    Hadoop(HadoopError),
}

impl From<std::io::Error> for Failure {
    fn from(e: std::io::Error) -> Self {
        Failure::Output(e)
    }
}

impl From<HadoopError> for Failure {
    fn from(e: HadoopError) -> Self {
        Failure::Hadoop(e)
    }
}

#[derive(Error, Debug)]
pub enum DeletionError {
    #[error("Failed to write dry-run output: {0}")]
    Output(#[source] std::io::Error),

    #[error("Failed to drop partitions of {table}: {source}")]
    Catalog {
        table: String,
        #[source]
        source: HadoopError,
    },

    #[error("Failed to remove partition directories of {table}: {source}")]
    FileSystem {
        table: String,
        #[source]
        source: HadoopError,
    },

    #[error(
        "Failed to drop partitions of {table} ({catalog}) and to remove its partition directories ({filesystem})"
    )]
    Both {
        table: String,
        catalog: HadoopError,
        filesystem: HadoopError,
    },
}
