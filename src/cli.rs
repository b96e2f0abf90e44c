//! Command-line interface for adaudit
//!
//! `adaudit serve` runs the HTTP service; `adaudit config` prints the
//! effective configuration and where each value came from.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use adaudit_api::ApiServer;
use adaudit_config::{CliArgs, Config};
use adaudit_orchestrator::AuditOrchestrator;
use adaudit_utils::error::{AuditError, ConfigError, UserFriendlyError};
use adaudit_utils::logging::{LogFormat, init_tracing};

use crate::exit_codes::ExitCode;

/// adaudit - asynchronous compliance audits for creative materials
#[derive(Debug, Parser)]
#[command(name = "adaudit")]
#[command(about = "Asynchronous compliance audit orchestrator for creative materials")]
#[command(long_about = r#"
adaudit accepts audit submissions for creative materials over HTTP, resolves
each one after a jittered delay through a verdict provider, and serves
filtered results, statistics and per-material verdicts.

EXAMPLES:
  # Serve on the default address with the demo catalog loaded
  adaudit serve

  # Serve on all interfaces with JSON logs and an empty catalog
  adaudit serve --bind 0.0.0.0:3001 --json-logs --no-seed

  # Show the effective configuration
  adaudit config --config ./audit.toml

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  The config file is --config, else $ADAUDIT_CONFIG, else .adaudit/config.toml
  found by searching upward from the current directory
"#)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Explicit config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the audit HTTP service
    Serve {
        /// Listen address, e.g. 127.0.0.1:3001
        #[arg(long)]
        bind: Option<String>,

        /// Emit newline-delimited JSON logs
        #[arg(long)]
        json_logs: bool,

        /// Start with an empty material catalog
        #[arg(long)]
        no_seed: bool,

        /// Probability in [0, 1] that the simulated provider passes a material
        #[arg(long)]
        pass_probability: Option<f64>,
    },
    /// Print the effective configuration with value sources
    Config,
}

impl Cli {
    /// Configuration overrides carried by the command line.
    #[must_use]
    pub fn cli_args(&self) -> CliArgs {
        let mut args = CliArgs {
            config_path: self.config.clone(),
            verbose: self.verbose.then_some(true),
            ..CliArgs::default()
        };
        if let Commands::Serve {
            bind,
            json_logs,
            no_seed,
            pass_probability,
        } = &self.command
        {
            args.bind.clone_from(bind);
            args.json_logs = json_logs.then_some(true);
            args.seed_demo_materials = no_seed.then_some(false);
            args.pass_probability = *pass_probability;
        }
        args
    }
}

/// Parse arguments, load configuration and dispatch.
///
/// Errors are reported on stderr here; the caller only maps the exit code.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    let config = match Config::discover(&cli.cli_args()) {
        Ok(config) => config,
        Err(err) => {
            report_config_error(&err);
            return Err(ExitCode::CONFIG);
        }
    };

    match cli.command {
        Commands::Config => {
            print_effective_config(&config);
            Ok(())
        }
        Commands::Serve { .. } => serve(config),
    }
}

fn serve(config: Config) -> Result<(), ExitCode> {
    let format = if config.json_logs() {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    if let Err(err) = init_tracing(config.verbose(), format) {
        eprintln!("warning: failed to initialise logging: {err}");
    }

    let runtime = tokio::runtime::Runtime::new().map_err(|err| {
        eprintln!("✗ Failed to create async runtime: {err}");
        ExitCode::INTERNAL
    })?;

    // The demo catalog is on for `serve` unless the file or --no-seed says otherwise.
    let seed = config.seed.demo_materials.unwrap_or(true);
    let result = runtime.block_on(async move {
        let orchestrator = AuditOrchestrator::builder(&config)
            .seed_demo_materials(seed)
            .build()?;
        ApiServer::new(config, orchestrator).serve().await
    });

    result.map_err(|err| {
        report_error(&err);
        ExitCode::from(&err)
    })
}

fn print_effective_config(config: &Config) {
    let rows = config.effective_config();
    let key_width = rows.iter().map(|(key, _, _)| key.len()).max().unwrap_or(0);
    let value_width = rows.iter().map(|(_, value, _)| value.len()).max().unwrap_or(0);
    println!("Effective configuration:");
    for (key, value, source) in rows {
        println!("  {key:<key_width$}  {value:<value_width$}  ({source})");
    }
}

fn report_config_error(err: &anyhow::Error) {
    if let Some(audit_err) = err.downcast_ref::<AuditError>() {
        report_error(audit_err);
    } else if let Some(config_err) = err.downcast_ref::<ConfigError>() {
        report_error(config_err);
        eprintln!("  {err}");
    } else {
        eprintln!("✗ Configuration error: {err:#}");
    }
}

fn report_error(err: &dyn UserFriendlyError) {
    eprintln!("✗ {}: {}", err.category(), err.user_message());
    if let Some(context) = err.context() {
        eprintln!("  {context}");
    }
    for suggestion in err.suggestions() {
        eprintln!("  → {suggestion}");
    }
}
