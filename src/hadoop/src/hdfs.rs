//! HDFS access through the `hdfs dfs` shell.

use crate::command::{CommandRunner, ProcessRunner};
use crate::error::HadoopError;

/// Filesystem operations the dropper relies on.
pub trait FileSystem {
    /// Paths matching `glob`. With `include_children` false, matched
    /// directories are listed themselves rather than their contents.
    fn ls(&self, glob: &str, include_children: bool) -> Result<Vec<String>, HadoopError>;

    /// Recursively remove all given paths in a single call.
    fn rm(&self, paths: &[String]) -> Result<(), HadoopError>;

    /// The command line [`FileSystem::rm`] would run.
    fn rm_command(&self, paths: &[String]) -> String;
}

/// True if `path` is absolute or carries a URI scheme (`hdfs://`, `viewfs://`, ...).
pub fn validate_path(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }

    let Some((scheme, _)) = path.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// [`FileSystem`] implemented by shelling out to `hdfs dfs`.
#[derive(Debug, Clone)]
pub struct Hdfs<R = ProcessRunner> {
    program: String,
    leading_args: Vec<String>,
    runner: R,
}

impl Hdfs<ProcessRunner> {
    pub fn new(command: &[String]) -> Self {
        Self::with_runner(command, ProcessRunner)
    }
}

impl<R: CommandRunner> Hdfs<R> {
    /// `command` is the program plus its leading arguments; an empty command
    /// falls back to `hdfs dfs`.
    pub fn with_runner(command: &[String], runner: R) -> Self {
        let (program, leading_args) = match command.split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => ("hdfs".to_string(), vec!["dfs".to_string()]),
        };

        Self {
            program,
            leading_args,
            runner,
        }
    }

    fn args(&self, extra: impl IntoIterator<Item = String>) -> Vec<String> {
        self.leading_args.iter().cloned().chain(extra).collect()
    }
}

impl<R: CommandRunner> FileSystem for Hdfs<R> {
    fn ls(&self, glob: &str, include_children: bool) -> Result<Vec<String>, HadoopError> {
        let mut extra = vec!["-ls".to_string()];
        if !include_children {
            extra.push("-d".to_string());
        }
        extra.push(glob.to_string());

        match self.runner.run(&self.program, &self.args(extra)) {
            Ok(out) => Ok(parse_listing(&out.stdout)),
            // An unmatched glob is reported as a failure by the shell
            Err(e) if e.stderr().contains("No such file or directory") => {
                tracing::debug!(glob = %glob, "Glob matched nothing");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn rm(&self, paths: &[String]) -> Result<(), HadoopError> {
        if paths.is_empty() {
            return Ok(());
        }

        let extra = ["-rm".to_string(), "-R".to_string()]
            .into_iter()
            .chain(paths.iter().cloned());
        self.runner.run(&self.program, &self.args(extra))?;
        Ok(())
    }

    fn rm_command(&self, paths: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.leading_args.iter().map(String::as_str))
            .chain(["-rm", "-R"])
            .chain(paths.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Paths from `hdfs dfs -ls` output, in listing order.
///
/// Listing rows have eight columns (permissions, replication, owner, group,
/// size, date, time, path); anything shorter, like the `Found N items`
/// header, is skipped.
fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(path_column)
        .map(str::to_string)
        .collect()
}

/// Everything after the seventh column, so paths may contain spaces.
fn path_column(line: &str) -> Option<&str> {
    let mut rest = line.trim_start();
    for _ in 0..7 {
        let end = rest.find(char::is_whitespace)?;
        rest = rest[end..].trim_start();
    }
    let path = rest.trim_end();
    (!path.is_empty()).then_some(path)
}
