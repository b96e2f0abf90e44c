use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use adaudit_utils::types::{ConfigSource, ViolationTag};

/// Default listen address for the HTTP boundary.
pub const DEFAULT_BIND: &str = "127.0.0.1:3001";
/// Probability that the simulated provider returns `passed`.
pub const DEFAULT_PASS_PROBABILITY: f64 = 0.7;
/// Lower bound of the jittered resolution delay.
pub const DEFAULT_MIN_DELAY_MS: u64 = 3_000;
/// Upper bound of the jittered resolution delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 5_000;
/// Provider attempts per task before it is marked failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// First retry delay; doubled on each further attempt.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;
/// Interval between staleness sweeps when a threshold is configured.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Configuration for adaudit.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > config file > built-in defaults. Every value is optional
/// in the file; accessors apply the built-in default.
///
/// # Configuration File Format
///
/// ```toml
/// [server]
/// bind = "0.0.0.0:3001"
/// json_logs = true
///
/// [audit]
/// pass_probability = 0.7
/// min_delay_ms = 3000
/// max_delay_ms = 5000
/// max_attempts = 3
/// retry_base_delay_ms = 1000
/// stale_after_secs = 600
/// violation_tags = ["content_violation", "policy_breach"]
///
/// [query]
/// default_page_size = 20
/// max_page_size = 100
///
/// [seed]
/// demo_materials = true
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// HTTP server and logging settings.
    pub server: ServerConfig,
    /// Task resolution settings.
    pub audit: AuditConfig,
    /// Result query settings.
    pub query: QueryConfig,
    /// Demo catalog seeding.
    pub seed: SeedConfig,
    /// Source attribution for each setting (for `adaudit config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub verbose: Option<bool>,
    pub json_logs: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    pub pass_probability: Option<f64>,
    pub min_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    /// Pending tasks older than this are failed by the staleness sweep.
    /// Unset disables the sweep.
    pub stale_after_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
    /// Tags attached to every simulated `failed` verdict.
    pub violation_tags: Option<Vec<ViolationTag>>,
    /// Fixed seed for the simulated provider and delay jitter.
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    pub default_page_size: Option<usize>,
    pub max_page_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SeedConfig {
    pub demo_materials: Option<bool>,
}

impl Config {
    #[must_use]
    pub fn bind(&self) -> &str {
        self.server.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.server.verbose.unwrap_or(false)
    }

    #[must_use]
    pub fn json_logs(&self) -> bool {
        self.server.json_logs.unwrap_or(false)
    }

    #[must_use]
    pub fn pass_probability(&self) -> f64 {
        self.audit.pass_probability.unwrap_or(DEFAULT_PASS_PROBABILITY)
    }

    /// Inclusive window the per-task resolution delay is drawn from.
    #[must_use]
    pub fn delay_window(&self) -> (Duration, Duration) {
        let min = self.audit.min_delay_ms.unwrap_or(DEFAULT_MIN_DELAY_MS);
        let max = self.audit.max_delay_ms.unwrap_or(DEFAULT_MAX_DELAY_MS);
        (Duration::from_millis(min), Duration::from_millis(max))
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.audit.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    #[must_use]
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(
            self.audit
                .retry_base_delay_ms
                .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS),
        )
    }

    #[must_use]
    pub fn stale_after(&self) -> Option<Duration> {
        self.audit.stale_after_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(
            self.audit
                .sweep_interval_secs
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        )
    }

    #[must_use]
    pub fn violation_tags(&self) -> Vec<ViolationTag> {
        self.audit.violation_tags.clone().unwrap_or_else(|| {
            vec![ViolationTag::ContentViolation, ViolationTag::PolicyBreach]
        })
    }

    #[must_use]
    pub fn rng_seed(&self) -> Option<u64> {
        self.audit.rng_seed
    }

    #[must_use]
    pub fn default_page_size(&self) -> usize {
        self.query.default_page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    #[must_use]
    pub fn max_page_size(&self) -> usize {
        self.query.max_page_size.unwrap_or(DEFAULT_MAX_PAGE_SIZE)
    }

    #[must_use]
    pub fn seed_demo_materials(&self) -> bool {
        self.seed.demo_materials.unwrap_or(false)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Config {
    /// Config with zero-jitter delays and a fixed seed, for unit tests that
    /// don't need discovery.
    pub fn minimal_for_testing() -> Self {
        Config {
            audit: AuditConfig {
                min_delay_ms: Some(3_000),
                max_delay_ms: Some(5_000),
                rng_seed: Some(7),
                ..AuditConfig::default()
            },
            ..Config::default()
        }
    }
}
