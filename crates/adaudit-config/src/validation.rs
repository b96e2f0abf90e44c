use std::net::SocketAddr;

use adaudit_utils::error::{AuditError, ConfigError};

use super::Config;

/// One hour; resolution delays beyond this are almost certainly a unit mistake.
const MAX_DELAY_CEILING_MS: u64 = 3_600_000;
const MAX_ATTEMPTS_CEILING: u32 = 20;
const MAX_PAGE_SIZE_CEILING: usize = 1_000;

fn invalid(key: &str, value: impl Into<String>) -> AuditError {
    AuditError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    })
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), AuditError> {
        if self.bind().parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "bind",
                format!("'{}' is not a socket address", self.bind()),
            ));
        }

        let probability = self.pass_probability();
        if !(0.0..=1.0).contains(&probability) {
            return Err(invalid("pass_probability", "must be within 0.0..=1.0"));
        }

        let (min, max) = self.delay_window();
        if min > max {
            return Err(invalid("min_delay_ms", "must not exceed max_delay_ms"));
        }
        if max.as_millis() > u128::from(MAX_DELAY_CEILING_MS) {
            return Err(invalid("max_delay_ms", "exceeds maximum limit of 1 hour"));
        }

        let attempts = self.max_attempts();
        if attempts == 0 {
            return Err(invalid("max_attempts", "must be greater than 0"));
        }
        if attempts > MAX_ATTEMPTS_CEILING {
            return Err(invalid("max_attempts", "exceeds maximum limit of 20"));
        }

        if self.audit.stale_after_secs == Some(0) {
            return Err(invalid("stale_after_secs", "must be at least 1 second"));
        }
        if self.audit.sweep_interval_secs == Some(0) {
            return Err(invalid("sweep_interval_secs", "must be at least 1 second"));
        }

        if self.violation_tags().is_empty() {
            return Err(invalid(
                "violation_tags",
                "failed verdicts need at least one tag",
            ));
        }

        let max_page = self.max_page_size();
        if max_page == 0 || max_page > MAX_PAGE_SIZE_CEILING {
            return Err(invalid("max_page_size", "must be within 1..=1000"));
        }
        let default_page = self.default_page_size();
        if default_page == 0 || default_page > max_page {
            return Err(invalid(
                "default_page_size",
                "must be at least 1 and not exceed max_page_size",
            ));
        }

        Ok(())
    }
}
