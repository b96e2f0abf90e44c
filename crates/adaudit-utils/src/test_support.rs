//! Shared fixtures for unit and integration tests.

use chrono::{DateTime, TimeZone, Utc};

/// Fixed instant used as virtual time zero: 2024-09-01T00:00:00Z.
#[must_use]
pub fn fixed_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Account id unique to a test, so concurrent tests never share rows.
#[must_use]
pub fn unique_account(test_name: &str) -> String {
    format!("acct-{}-{}", test_name, std::process::id())
}

/// Material ids `1..=count` as strings.
#[must_use]
pub fn material_ids(count: usize) -> Vec<String> {
    (1..=count).map(|n| n.to_string()).collect()
}
