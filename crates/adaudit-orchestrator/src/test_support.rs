//! Providers and fixtures for orchestrator tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use adaudit_config::Config;
use adaudit_utils::error::ProviderError;
use adaudit_utils::test_support::fixed_epoch;

use crate::handle::AuditOrchestrator;
use crate::scheduler::ManualScheduler;
use crate::verdict::{AuditRequest, VerdictDecision, VerdictProvider};

/// Replays a fixed script of provider answers, then repeats a fallback.
#[derive(Debug)]
pub struct ScriptedVerdictProvider {
    script: Mutex<VecDeque<Result<VerdictDecision, ProviderError>>>,
    fallback: Result<VerdictDecision, ProviderError>,
    calls: AtomicUsize,
}

impl ScriptedVerdictProvider {
    pub fn new(
        script: Vec<Result<VerdictDecision, ProviderError>>,
        fallback: VerdictDecision,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Ok(fallback),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(decision: VerdictDecision) -> Self {
        Self::new(Vec::new(), decision)
    }

    pub fn always_err(error: ProviderError) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `evaluate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VerdictProvider for ScriptedVerdictProvider {
    fn evaluate(&self, _request: &AuditRequest<'_>) -> Result<VerdictDecision, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Orchestrator on a virtual clock starting at [`fixed_epoch`].
pub fn manual_orchestrator(
    config: &Config,
    provider: Arc<dyn VerdictProvider>,
) -> (AuditOrchestrator, Arc<ManualScheduler>) {
    let scheduler = Arc::new(ManualScheduler::starting_at(fixed_epoch()));
    let orchestrator = AuditOrchestrator::builder(config)
        .scheduler(scheduler.clone())
        .provider(provider)
        .build()
        .expect("orchestrator builds with a manual scheduler");
    (orchestrator, scheduler)
}
