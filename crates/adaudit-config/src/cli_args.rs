use std::path::PathBuf;

/// CLI-sourced overrides, applied last during discovery.
///
/// Kept free of clap so the config crate does not depend on the binary's
/// argument parser.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file path (skips discovery)
    pub config_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub verbose: Option<bool>,
    pub json_logs: Option<bool>,
    pub seed_demo_materials: Option<bool>,
    pub pass_probability: Option<f64>,
}
