//! Owned stores for audit orchestration.
//!
//! Three stores make up the orchestrator's state:
//!
//! - [`MaterialStore`]: material id -> mutable compliance record
//! - [`TaskRegistry`]: task id -> task lifecycle, append-mostly
//! - [`BatchRegistry`]: batch id -> ordered member tasks
//!
//! [`AuditState`] bundles them so a task transition and the matching
//! material update happen inside one `&mut` borrow. Callers that share the
//! state across threads wrap it in a single lock; nothing here locks.

mod batch;
mod material;
pub mod seed;
mod state;
mod task;

pub use batch::{BatchRegistry, BatchRun};
pub use material::{Material, MaterialStore, NewMaterial};
pub use state::{AuditState, TransitionOutcome};
pub use task::{AuditTask, Resolution, TaskRegistry};
