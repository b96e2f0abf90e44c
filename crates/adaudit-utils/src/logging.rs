//! Logging and observability infrastructure for adaudit
//!
//! Structured logging with `tracing`: one initialisation entry point for the
//! binary and a set of helpers that give every task lifecycle event the same
//! field names (`task_id`, `material_id`, `account_id`, `batch_id`).

use tracing::{Level, debug, error, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Compact,
    /// Newline-delimited JSON for log shippers
    Json,
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `adaudit=info` (or `adaudit=debug`
/// when `verbose`) is used.
///
/// # Returns
/// Error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("adaudit=debug,info")
            } else {
                EnvFilter::try_new("adaudit=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(verbose)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_line_number(false)
                        .with_file(false)
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Span wrapping a single resolver invocation.
pub fn resolution_span(task_id: u64, material_id: &str, attempt: u32) -> tracing::Span {
    span!(
        Level::INFO,
        "task_resolution",
        task_id = task_id,
        material_id = %material_id,
        attempt = attempt,
    )
}

pub fn log_task_submitted(task_id: u64, material_id: &str, account_id: &str, delay_ms: u128) {
    info!(
        task_id = task_id,
        material_id = %material_id,
        account_id = %account_id,
        delay_ms = %delay_ms,
        "Audit task submitted"
    );
}

pub fn log_batch_submitted(batch_id: u64, account_id: &str, member_count: usize) {
    info!(
        batch_id = batch_id,
        account_id = %account_id,
        member_count = member_count,
        "Batch audit submitted"
    );
}

pub fn log_task_resolved(task_id: u64, material_id: &str, verdict: &str, known_material: bool) {
    info!(
        task_id = task_id,
        material_id = %material_id,
        verdict = %verdict,
        known_material = known_material,
        "Audit task resolved"
    );
}

/// A second resolution attempt for a terminal task. Never expected under
/// correct scheduling, so it is surfaced at warn.
pub fn log_duplicate_resolution(task_id: u64, status: &str) {
    warn!(
        task_id = task_id,
        status = %status,
        "Ignoring resolution for task that is already terminal"
    );
}

pub fn log_task_retry(task_id: u64, attempt: u32, backoff_ms: u128, reason: &str) {
    warn!(
        task_id = task_id,
        attempt = attempt,
        backoff_ms = %backoff_ms,
        reason = %reason,
        "Transient provider failure, retrying"
    );
}

pub fn log_task_failed(task_id: u64, attempts: u32, reason: &str) {
    error!(
        task_id = task_id,
        attempts = attempts,
        reason = %reason,
        "Audit task failed without a verdict"
    );
}

pub fn log_task_expired(task_id: u64, age_ms: i64) {
    warn!(
        task_id = task_id,
        age_ms = age_ms,
        "Pending task exceeded staleness threshold"
    );
}

pub fn log_query(account_id: Option<&str>, page: usize, page_size: usize, total: usize) {
    debug!(
        account_id = account_id.unwrap_or("*"),
        page = page,
        page_size = page_size,
        total = total,
        "Result query served"
    );
}
