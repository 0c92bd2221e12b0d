use thiserror::Error;

/// Failures of a single external process invocation.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The program could not be started at all.
    #[error("Failed to execute `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and reported failure.
    #[error("`{command}` exited with {}: {stderr}", describe_status(.status))]
    NonZeroExit {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

impl CommandError {
    /// Captured stderr of a failed run, empty when the program never started.
    pub fn stderr(&self) -> &str {
        match self {
            CommandError::Spawn { .. } => "",
            CommandError::NonZeroExit { stderr, .. } => stderr,
        }
    }
}

/// Errors surfaced by the catalog and filesystem wrappers.
#[derive(Error, Debug)]
pub enum HadoopError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// `DESCRIBE FORMATTED` did not report a location for the table.
    #[error("No location found in metadata of table {table}")]
    TableLocationNotFound { table: String },

    /// A partition identifier did not fit the expected date encoding.
    #[error("Cannot extract a date from partition '{spec}' with pattern '{pattern}': {reason}")]
    PartitionSpec {
        spec: String,
        pattern: String,
        reason: String,
    },
}
