//! HTTP route handlers.

pub mod audit;
pub mod materials;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::server::AppState;

/// Every route the server exposes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(audit::routes())
        .merge(materials::routes())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

async fn health() -> Envelope<HealthResponse> {
    Envelope::ok(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Read an id that clients may send as a JSON string or number.
pub(crate) fn id_value(value: Option<&Value>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        None | Some(Value::Null) => Err(ApiError::bad_request(format!("{field} is required"))),
        Some(_) => Err(ApiError::bad_request(format!(
            "{field} must be a string or number"
        ))),
    }
}

/// Parse an optional positive integer query parameter.
pub(crate) fn usize_param(raw: Option<&str>, field: &str) -> Result<Option<usize>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("{field} must be a positive integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_value_accepts_strings_and_numbers() {
        assert_eq!(id_value(Some(&json!("42")), "materialId").unwrap(), "42");
        assert_eq!(id_value(Some(&json!(42)), "materialId").unwrap(), "42");
        assert!(id_value(None, "materialId").is_err());
        assert!(id_value(Some(&json!([1])), "materialId").is_err());
    }

    #[test]
    fn test_usize_param() {
        assert_eq!(usize_param(None, "page").unwrap(), None);
        assert_eq!(usize_param(Some(" "), "page").unwrap(), None);
        assert_eq!(usize_param(Some("3"), "page").unwrap(), Some(3));
        assert!(usize_param(Some("-1"), "page").is_err());
    }
}
