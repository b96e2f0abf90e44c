use std::collections::HashMap;
use std::time::Duration;

use adaudit_utils::error::AuditError;
use adaudit_utils::types::{ConfigSource, ViolationTag};

use super::Config;
use super::discovery::KEYS;

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding the orchestrator without relying on
    /// environment variables or config files.
    ///
    /// # Example
    ///
    /// ```rust
    /// use adaudit_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .pass_probability(1.0)
    ///     .delay_window(Duration::from_millis(10), Duration::from_millis(20))
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.pass_probability(), 1.0);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
    touched: Vec<&'static str>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bind(mut self, bind: impl Into<String>) -> Self {
        self.config.server.bind = Some(bind.into());
        self.touched.push("bind");
        self
    }

    #[must_use]
    pub fn pass_probability(mut self, probability: f64) -> Self {
        self.config.audit.pass_probability = Some(probability);
        self.touched.push("pass_probability");
        self
    }

    #[must_use]
    pub fn delay_window(mut self, min: Duration, max: Duration) -> Self {
        self.config.audit.min_delay_ms = Some(duration_ms(min));
        self.config.audit.max_delay_ms = Some(duration_ms(max));
        self.touched.push("min_delay_ms");
        self.touched.push("max_delay_ms");
        self
    }

    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.audit.max_attempts = Some(attempts);
        self.touched.push("max_attempts");
        self
    }

    #[must_use]
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.audit.retry_base_delay_ms = Some(duration_ms(delay));
        self.touched.push("retry_base_delay_ms");
        self
    }

    #[must_use]
    pub fn stale_after(mut self, threshold: Duration) -> Self {
        self.config.audit.stale_after_secs = Some(threshold.as_secs());
        self.touched.push("stale_after_secs");
        self
    }

    #[must_use]
    pub fn violation_tags(mut self, tags: Vec<ViolationTag>) -> Self {
        self.config.audit.violation_tags = Some(tags);
        self.touched.push("violation_tags");
        self
    }

    #[must_use]
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.config.audit.rng_seed = Some(seed);
        self.touched.push("rng_seed");
        self
    }

    #[must_use]
    pub fn page_sizes(mut self, default_size: usize, max_size: usize) -> Self {
        self.config.query.default_page_size = Some(default_size);
        self.config.query.max_page_size = Some(max_size);
        self.touched.push("default_page_size");
        self.touched.push("max_page_size");
        self
    }

    #[must_use]
    pub fn seed_demo_materials(mut self, enabled: bool) -> Self {
        self.config.seed.demo_materials = Some(enabled);
        self.touched.push("demo_materials");
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, AuditError> {
        let mut config = self.config;
        let mut attribution: HashMap<String, ConfigSource> = KEYS
            .iter()
            .map(|key| ((*key).to_string(), ConfigSource::Defaults))
            .collect();
        for key in self.touched {
            attribution.insert(key.to_string(), ConfigSource::Programmatic);
        }
        config.source_attribution = attribution;
        config.validate()?;
        Ok(config)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
