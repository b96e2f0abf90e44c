use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use adaudit_utils::error::ConfigError;

use super::{AuditConfig, CliArgs, Config, ConfigSource, QueryConfig, SeedConfig, ServerConfig};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ADAUDIT_CONFIG";
/// Directory searched for upward from the start directory.
pub const CONFIG_DIR_NAME: &str = ".adaudit";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Every attributed key, in display order.
pub(crate) const KEYS: &[&str] = &[
    "bind",
    "verbose",
    "json_logs",
    "pass_probability",
    "min_delay_ms",
    "max_delay_ms",
    "max_attempts",
    "retry_base_delay_ms",
    "stale_after_secs",
    "sweep_interval_secs",
    "violation_tags",
    "rng_seed",
    "default_page_size",
    "max_page_size",
    "demo_materials",
];

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    server: Option<ServerConfig>,
    audit: Option<AuditConfig>,
    query: Option<QueryConfig>,
    seed: Option<SeedConfig>,
}

/// Copy `Some` fields from the file section over the target, recording the
/// source of each copied key.
macro_rules! overlay {
    ($target:expr, $file:expr, $attr:expr, $source:expr, [$($field:ident),+ $(,)?]) => {
        $(
            if $file.$field.is_some() {
                $target.$field = $file.$field;
                $attr.insert(stringify!($field).to_string(), $source.clone());
            }
        )+
    };
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// The config file is `cli_args.config_path` if set, else the path in
    /// `ADAUDIT_CONFIG`, else `.adaudit/config.toml` found by searching upward
    /// from the current directory.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        let mut args = cli_args.clone();
        if args.config_path.is_none() {
            args.config_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        }
        Self::discover_from(&start_dir, &args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// This is the path-driven variant used by tests to avoid process-global
    /// state: it never consults the environment.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut config = Config::default();
        let mut source_attribution: HashMap<String, ConfigSource> = KEYS
            .iter()
            .map(|key| ((*key).to_string(), ConfigSource::Defaults))
            .collect();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.is_file() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            let source = ConfigSource::ConfigFile(path.clone());

            if let Some(server) = file_config.server {
                overlay!(config.server, server, source_attribution, source, [
                    bind, verbose, json_logs
                ]);
            }
            if let Some(audit) = file_config.audit {
                overlay!(config.audit, audit, source_attribution, source, [
                    pass_probability,
                    min_delay_ms,
                    max_delay_ms,
                    max_attempts,
                    retry_base_delay_ms,
                    stale_after_secs,
                    sweep_interval_secs,
                    violation_tags,
                    rng_seed,
                ]);
            }
            if let Some(query) = file_config.query {
                overlay!(config.query, query, source_attribution, source, [
                    default_page_size,
                    max_page_size
                ]);
            }
            if let Some(seed) = file_config.seed {
                overlay!(config.seed, seed, source_attribution, source, [demo_materials]);
            }
        }

        // CLI overrides win over everything
        let cli = ConfigSource::Cli;
        if let Some(bind) = &cli_args.bind {
            config.server.bind = Some(bind.clone());
            source_attribution.insert("bind".to_string(), cli.clone());
        }
        if let Some(verbose) = cli_args.verbose {
            config.server.verbose = Some(verbose);
            source_attribution.insert("verbose".to_string(), cli.clone());
        }
        if let Some(json_logs) = cli_args.json_logs {
            config.server.json_logs = Some(json_logs);
            source_attribution.insert("json_logs".to_string(), cli.clone());
        }
        if let Some(seed) = cli_args.seed_demo_materials {
            config.seed.demo_materials = Some(seed);
            source_attribution.insert("demo_materials".to_string(), cli.clone());
        }
        if let Some(probability) = cli_args.pass_probability {
            config.audit.pass_probability = Some(probability);
            source_attribution.insert("pass_probability".to_string(), cli);
        }

        config.source_attribution = source_attribution;
        config.validate()?;
        Ok(config)
    }

    /// Search upward from `start_dir` for `.adaudit/config.toml`.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        start_dir
            .ancestors()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let parsed: TomlConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(e.to_string()))?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let config_dir = dir.join(CONFIG_DIR_NAME);
        fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join(CONFIG_FILE_NAME);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let config = Config::discover_from(temp.path(), &CliArgs::default()).unwrap();
        assert_eq!(config.bind(), crate::DEFAULT_BIND);
        assert_eq!(
            config.source_attribution.get("bind"),
            Some(&ConfigSource::Defaults)
        );
    }

    #[test]
    fn test_file_discovered_from_nested_directory() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            "[audit]\npass_probability = 0.25\nviolation_tags = [\"copyright_issue\"]\n",
        );
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::discover_from(&nested, &CliArgs::default()).unwrap();
        assert!((config.pass_probability() - 0.25).abs() < f64::EPSILON);
        assert_eq!(
            config.violation_tags(),
            vec![adaudit_utils::types::ViolationTag::CopyrightIssue]
        );
        assert_eq!(
            config.source_attribution.get("pass_probability"),
            Some(&ConfigSource::ConfigFile(path))
        );
    }

    #[test]
    fn test_cli_overrides_file() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[server]\nbind = \"0.0.0.0:8080\"\n");
        let args = CliArgs {
            bind: Some("127.0.0.1:9000".to_string()),
            ..CliArgs::default()
        };
        let config = Config::discover_from(temp.path(), &args).unwrap();
        assert_eq!(config.bind(), "127.0.0.1:9000");
        assert_eq!(config.source_attribution.get("bind"), Some(&ConfigSource::Cli));
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let temp = TempDir::new().unwrap();
        let args = CliArgs {
            config_path: Some(temp.path().join("missing.toml")),
            ..CliArgs::default()
        };
        assert!(Config::discover_from(temp.path(), &args).is_err());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[audit]\npass_probabilty = 0.5\n");
        let err = Config::discover_from(temp.path(), &CliArgs::default()).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid configuration file"));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[audit]\nmin_delay_ms = 9000\nmax_delay_ms = 10\n");
        assert!(Config::discover_from(temp.path(), &CliArgs::default()).is_err());
    }
}
