//! HTTP boundary for the audit orchestrator.
//!
//! Every response uses the envelope `{ code, message, data }` with
//! camelCase bodies; `code` is `0` on success and the HTTP-equivalent
//! status otherwise.
//!
//! ## Routes
//!
//! - `POST /audit` - submit one material
//! - `GET /audit/:task_id` - poll a task
//! - `POST /audit/batch` - submit several materials as one batch
//! - `GET /audit/results` - filtered, paginated result rows
//! - `GET /audit/stats` - aggregate counts
//! - `GET /audit/object-result` - provider-style verdict for one material
//! - `GET /materials`, `GET /materials/:id` - the material catalog
//! - `POST /materials` - register material metadata
//! - `GET /health` - liveness

pub mod envelope;
pub mod error;
pub mod routes;
pub mod server;

pub use envelope::Envelope;
pub use error::{ApiError, ApiResult};
pub use server::{ApiServer, AppState, spawn_stale_sweeper};
