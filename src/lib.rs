//! adaudit - asynchronous compliance audits for creative materials
//!
//! Clients submit a material (or a batch of materials) for audit and get a
//! task id back immediately. Each task is resolved after a jittered delay by
//! a [`VerdictProvider`]; the verdict updates the task and, for materials in
//! the catalog, the material's own audit status. Results, statistics and
//! per-material verdicts are served over HTTP.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Serve on 127.0.0.1:3001 with the demo catalog
//! adaudit serve
//!
//! # Print effective configuration and where each value came from
//! adaudit config
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use adaudit::{ApiServer, AuditOrchestrator, Config};
//!
//! # async fn run() -> Result<(), adaudit::AuditError> {
//! let config = Config::builder().seed_demo_materials(true).build()?;
//! let orchestrator = AuditOrchestrator::builder(&config).build()?;
//! let submission = orchestrator.submit_audit(
//!     "client-a",
//!     "3",
//!     adaudit::OperationKind::Single,
//! )?;
//! println!("task {} submitted", submission.task_id);
//! ApiServer::new(config, orchestrator).serve().await
//! # }
//! ```
//!
//! # Crates
//!
//! - `adaudit-utils`: ids, domain enums, errors, logging
//! - `adaudit-config`: configuration discovery and validation
//! - `adaudit-store`: material catalog, task registry, batch runs
//! - `adaudit-orchestrator`: submission, scheduling, resolution, batches
//! - `adaudit-query`: result rows, filters, pagination, statistics
//! - `adaudit-api`: HTTP routes and the server loop

pub mod cli;
pub mod exit_codes;

pub use adaudit_api::{ApiServer, AppState, Envelope};
pub use adaudit_config::{CliArgs, Config, ConfigBuilder};
pub use adaudit_orchestrator::{
    AuditOrchestrator, BatchReceipt, FixedVerdictProvider, ManualScheduler, OrchestratorBuilder,
    ResolveOutcome, Scheduler, SimulatedVerdictProvider, Submission, TokioScheduler,
    VerdictDecision, VerdictProvider,
};
pub use adaudit_query::{AuditStats, ObjectResult, ObjectStatus, ResultFilter, ResultItem};
pub use adaudit_store::{AuditState, AuditTask, Material, NewMaterial};
pub use adaudit_utils::error::{AuditError, ConfigError, ProviderError, UserFriendlyError};
pub use adaudit_utils::ids::{BatchId, MaterialId, TaskId};
pub use adaudit_utils::types::{MaterialStatus, OperationKind, TaskStatus, Verdict, ViolationTag};
pub use exit_codes::ExitCode;
