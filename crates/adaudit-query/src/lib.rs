//! Result Query Service
//!
//! Read-only views derived on demand from an [`AuditState`] snapshot:
//!
//! - [`query_results`]: filtered, offset-paginated result rows
//! - [`stats`]: aggregate counts and spend over the same rows
//! - [`object_result`]: provider-style verdict for one material
//!
//! Nothing here holds state or takes locks; callers hand in a borrowed
//! snapshot (typically through `AuditOrchestrator::read`).
//!
//! [`AuditState`]: adaudit_store::AuditState

mod filter;
mod object;
mod page;
mod row;
mod stats;

pub use filter::ResultFilter;
pub use object::{ObjectResult, ObjectStatus, object_result};
pub use page::{PageRequest, ResultPage, query_results};
pub use row::{ResultItem, result_rows};
pub use stats::{AuditStats, stats};
