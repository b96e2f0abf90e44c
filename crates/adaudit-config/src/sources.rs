use adaudit_utils::types::ConfigSource;

use super::Config;
use super::discovery::KEYS;

impl Config {
    /// Effective configuration as `(key, value, source)` rows, in a stable
    /// order, for `adaudit config`.
    #[must_use]
    pub fn effective_config(&self) -> Vec<(String, String, String)> {
        let (min_delay, max_delay) = self.delay_window();
        KEYS.iter()
            .map(|key| {
                let value = match *key {
                    "bind" => self.bind().to_string(),
                    "verbose" => self.verbose().to_string(),
                    "json_logs" => self.json_logs().to_string(),
                    "pass_probability" => self.pass_probability().to_string(),
                    "min_delay_ms" => min_delay.as_millis().to_string(),
                    "max_delay_ms" => max_delay.as_millis().to_string(),
                    "max_attempts" => self.max_attempts().to_string(),
                    "retry_base_delay_ms" => self.retry_base_delay().as_millis().to_string(),
                    "stale_after_secs" => self
                        .stale_after()
                        .map_or_else(|| "disabled".to_string(), |d| d.as_secs().to_string()),
                    "sweep_interval_secs" => self.sweep_interval().as_secs().to_string(),
                    "violation_tags" => self
                        .violation_tags()
                        .iter()
                        .map(|tag| tag.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    "rng_seed" => self
                        .rng_seed()
                        .map_or_else(|| "entropy".to_string(), |seed| seed.to_string()),
                    "default_page_size" => self.default_page_size().to_string(),
                    "max_page_size" => self.max_page_size().to_string(),
                    "demo_materials" => self.seed_demo_materials().to_string(),
                    _ => String::new(),
                };
                let source = self
                    .source_attribution
                    .get(*key)
                    .unwrap_or(&ConfigSource::Defaults)
                    .to_string();
                ((*key).to_string(), value, source)
            })
            .collect()
    }
}
