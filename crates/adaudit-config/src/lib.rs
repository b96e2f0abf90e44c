//! Configuration management for adaudit
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > config file > defaults. Config files are TOML with `[server]`,
//! `[audit]`, `[query]` and `[seed]` sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use adaudit_utils::types::ConfigSource;
pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use discovery::{CONFIG_DIR_NAME, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
pub use model::*;
