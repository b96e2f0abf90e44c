//! Audit Task Orchestrator
//!
//! Creates audit tasks, resolves them asynchronously into a terminal
//! verdict, and owns the state every read goes through.
//!
//! # Architecture
//!
//! - **AuditOrchestrator** (`handle.rs`): the facade. Validates and registers
//!   submissions synchronously, schedules resolution, exposes reads.
//! - **Scheduler** (`scheduler.rs`): deferred execution. `TokioScheduler`
//!   in production, `ManualScheduler` with a virtual clock in tests.
//! - **VerdictProvider** (`verdict.rs`): where verdicts come from. The
//!   simulated provider is a weighted coin flip; a live provider plugs in
//!   behind the same trait.
//! - **Resolver** (`resolver.rs`): one invocation per task attempt; applies
//!   the verdict to task and material in one critical section, retries
//!   transient provider failures with exponential backoff.
//! - **Batch coordinator** (`batch.rs`): fans a batch out into independent
//!   member tasks and acknowledges before any of them resolves.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use adaudit_config::Config;
//! use adaudit_orchestrator::{AuditOrchestrator, FixedVerdictProvider, ManualScheduler};
//! use adaudit_utils::types::{OperationKind, TaskStatus, Verdict};
//!
//! let scheduler = Arc::new(ManualScheduler::default());
//! let orchestrator = AuditOrchestrator::builder(&Config::default())
//!     .scheduler(scheduler.clone())
//!     .provider(Arc::new(FixedVerdictProvider::new(Verdict::Passed)))
//!     .build()
//!     .unwrap();
//!
//! let submission = orchestrator
//!     .submit_audit("acct-1", "42", OperationKind::Single)
//!     .unwrap();
//! assert_eq!(orchestrator.task(submission.task_id).unwrap().status, TaskStatus::Pending);
//!
//! scheduler.advance(Duration::from_secs(5));
//! assert_eq!(orchestrator.task(submission.task_id).unwrap().status, TaskStatus::Completed);
//! ```

mod batch;
mod handle;
mod resolver;
mod scheduler;
mod verdict;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use batch::BatchReceipt;
pub use handle::{AuditOrchestrator, OrchestratorBuilder, OrchestratorConfig, Submission};
pub use resolver::ResolveOutcome;
pub use scheduler::{Job, ManualScheduler, ScheduleHandle, Scheduler, TokioScheduler};
pub use verdict::{
    AuditRequest, FixedVerdictProvider, SimulatedVerdictProvider, VerdictDecision,
    VerdictProvider,
};
