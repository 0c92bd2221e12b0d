use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Name of the configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "partition-dropper.toml";

/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "PARTITION_DROPPER__";

/// Retention defaults applied when the corresponding CLI flag is absent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionDefaults {
    /// Retention window in days
    ///
    /// Env: PARTITION_DROPPER__RETENTION__OLDER_THAN_DAYS
    pub older_than_days: u32,
    /// Catalog database holding the table
    ///
    /// Env: PARTITION_DROPPER__RETENTION__DATABASE
    pub database: String,
    /// Name of the partition layout (see `retention::PartitionType`)
    ///
    /// Env: PARTITION_DROPPER__RETENTION__PARTITION_TYPE
    pub partition_type: String,
}

impl Default for RetentionDefaults {
    fn default() -> Self {
        Self {
            older_than_days: 60,
            database: "default".to_string(),
            partition_type: "raw".to_string(),
        }
    }
}

/// How to invoke the Hive CLI.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HiveConfig {
    /// Program and leading arguments, e.g. `["hive", "--service", "cli"]`
    pub command: Vec<String>,
    /// Extra options passed to every Hive invocation, whitespace separated
    #[serde(default)]
    pub options: Option<String>,
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            command: vec!["hive".to_string(), "--service".to_string(), "cli".to_string()],
            options: None,
        }
    }
}

/// How to invoke the HDFS shell.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HdfsConfig {
    /// Program and leading arguments, e.g. `["hdfs", "dfs"]`
    pub command: Vec<String>,
}

impl Default for HdfsConfig {
    fn default() -> Self {
        Self {
            command: vec!["hdfs".to_string(), "dfs".to_string()],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Retention defaults
    pub retention: RetentionDefaults,
    /// Hive CLI invocation
    pub hive: HiveConfig,
    /// HDFS shell invocation
    pub hdfs: HdfsConfig,
    /// Where to record planned deletions before executing them
    #[serde(default)]
    pub intent_log: Option<PathBuf>,
}

impl Configuration {
    /// Load defaults, `partition-dropper.toml` if present, then environment overrides.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(DEFAULT_CONFIG_FILE))
            .extract()
            .map_err(Box::new)
    }

    /// Load defaults, the given TOML file, then environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file_exact(path))
            .extract()
            .map_err(Box::new)
    }

    fn figment(file: figment::providers::Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Reject values no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention.older_than_days == 0 {
            return Err(ConfigError::ZeroRetention);
        }
        if self.retention.database.trim().is_empty() {
            return Err(ConfigError::EmptyDatabase);
        }
        if self.hive.command.is_empty() {
            return Err(ConfigError::EmptyCommand("hive"));
        }
        if self.hdfs.command.is_empty() {
            return Err(ConfigError::EmptyCommand("hdfs"));
        }
        Ok(())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("retention window must be at least one day")]
    ZeroRetention,

    #[error("catalog database name cannot be empty")]
    EmptyDatabase,

    #[error("{0}.command must name a program")]
    EmptyCommand(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();

        assert_eq!(config.retention.older_than_days, 60);
        assert_eq!(config.retention.database, "default");
        assert_eq!(config.retention.partition_type, "raw");
        assert_eq!(config.hive.command, vec!["hive", "--service", "cli"]);
        assert!(config.hive.options.is_none());
        assert_eq!(config.hdfs.command, vec!["hdfs", "dfs"]);
        assert!(config.intent_log.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_configless_operation() {
        Jail::expect_with(|_jail| {
            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(config.retention.older_than_days, 60);
            assert_eq!(config.hdfs.command, vec!["hdfs", "dfs"]);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                intent_log = "/var/lib/dropper/intent.json"

                [retention]
                older_than_days = 90

                [hive]
                command = ["beeline"]
                options = "--hiveconf mapreduce.job.queuename=production"
                "#,
            )?;

            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(config.retention.older_than_days, 90);
            // untouched keys keep their defaults
            assert_eq!(config.retention.database, "default");
            assert_eq!(config.hive.command, vec!["beeline"]);
            assert_eq!(
                config.hive.options.as_deref(),
                Some("--hiveconf mapreduce.job.queuename=production")
            );
            assert_eq!(
                config.intent_log,
                Some(PathBuf::from("/var/lib/dropper/intent.json"))
            );
            Ok(())
        });
    }

    #[test]
    fn test_env_var_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [retention]
                database = "wmf_raw"
                older_than_days = 30
                "#,
            )?;
            jail.set_env("PARTITION_DROPPER__RETENTION__OLDER_THAN_DAYS", "7");

            let config = Configuration::load_from_path(Path::new("custom.toml")).map_err(|e| *e)?;
            assert_eq!(config.retention.database, "wmf_raw");
            assert_eq!(config.retention.older_than_days, 7);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        Jail::expect_with(|_jail| {
            assert!(Configuration::load_from_path(Path::new("missing.toml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let mut config = Configuration::default();
        config.retention.older_than_days = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroRetention));

        let mut config = Configuration::default();
        config.hdfs.command.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyCommand("hdfs")));

        let mut config = Configuration::default();
        config.retention.database = "  ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::EmptyDatabase));
    }
}
