use clap::Args;
use std::path::PathBuf;

/// CLI arguments shared by every dropper binary
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Only log warnings and errors")]
    pub quiet: bool,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use tracing::Dispatch;
    use tracing_subscriber::EnvFilter;

    /// Filter directive derived from the verbosity flags.
    pub fn log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Build the logging handle for a run.
    ///
    /// Nothing is installed globally: callers scope the returned dispatch with
    /// `tracing::dispatcher::with_default`. `RUST_LOG` takes precedence over the
    /// verbosity flags. Output goes to stderr so stdout only carries dry-run text.
    pub fn init_logging(args: &CommonArgs) -> Dispatch {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level(args)));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();

        Dispatch::new(subscriber)
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        let config = match config_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading configuration");
                Configuration::load_from_path(path).context("Failed to load configuration")?
            }
            None => Configuration::load().context("Failed to load configuration")?,
        };

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}
