//! Resolver: one invocation per task attempt.
//!
//! An invocation checks the task is still pending and counts the attempt,
//! asks the provider for a verdict outside the state lock, then applies
//! the outcome to task and material in a single write-lock section.
//! Whatever happens between the two lock sections, the transition itself
//! is exactly-once: a task that went terminal in the meantime is reported
//! as [`ResolveOutcome::AlreadyResolved`] and left untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use adaudit_store::TransitionOutcome;
use adaudit_utils::error::{AuditError, ProviderError};
use adaudit_utils::ids::{MaterialId, TaskId};
use adaudit_utils::logging::{
    log_duplicate_resolution, log_task_expired, log_task_failed, log_task_resolved,
    log_task_retry, resolution_span,
};
use adaudit_utils::types::{TaskStatus, Verdict};

use crate::handle::{AuditOrchestrator, Inner};
use crate::verdict::{AuditRequest, VerdictDecision};

/// Reason recorded on tasks failed by the staleness sweep.
pub const EXPIRED_REASON: &str = "Resolution expired before a verdict arrived";

/// What a single resolver invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The task completed. `material_updated` is false for unknown
    /// materials and for materials re-submitted under a newer task.
    Resolved {
        verdict: Verdict,
        material_updated: bool,
    },
    /// Transient provider failure; another attempt is scheduled.
    RetryScheduled { attempt: u32, backoff: Duration },
    /// The task failed without a verdict.
    Failed { attempts: u32, reason: String },
    /// The task was already terminal; nothing changed.
    AlreadyResolved(TaskStatus),
}

impl Inner {
    pub(crate) fn resolve(self: &Arc<Self>, task_id: TaskId) -> Result<ResolveOutcome, AuditError> {
        let (account_id, material_id, attempt) = {
            let mut state = self.write()?;
            let task = state
                .tasks()
                .get(task_id)
                .ok_or_else(|| AuditError::not_found("task", task_id))?;
            if task.status.is_terminal() {
                log_duplicate_resolution(task_id.get(), task.status.as_str());
                return Ok(ResolveOutcome::AlreadyResolved(task.status));
            }
            let account_id = task.account_id.clone();
            let material_id = task.material_id.clone();
            let attempt = state.record_attempt(task_id)?;
            (account_id, material_id, attempt)
        };

        let span = resolution_span(task_id.get(), material_id.as_str(), attempt);
        let _guard = span.enter();

        let request = AuditRequest {
            task_id,
            account_id: &account_id,
            material_id: &material_id,
            attempt,
        };
        let decision = self.provider.evaluate(&request).and_then(check_decision);
        let now = self.scheduler.now();

        match decision {
            Ok(decision) => self.complete(task_id, &material_id, decision, now),
            Err(err) => {
                let failure = AuditError::from_provider(task_id.get(), err);
                if failure.is_retryable() && attempt < self.config.max_attempts {
                    let backoff = self.config.backoff(attempt);
                    log_task_retry(
                        task_id.get(),
                        attempt,
                        backoff.as_millis(),
                        &failure.to_string(),
                    );
                    self.schedule_resolution(task_id, backoff);
                    return Ok(ResolveOutcome::RetryScheduled { attempt, backoff });
                }
                let reason = if failure.is_retryable() {
                    format!("No verdict after {attempt} attempts")
                } else {
                    "Verdict provider rejected the request".to_string()
                };
                self.fail(task_id, attempt, reason, failure.to_string(), now)
            }
        }
    }

    fn complete(
        &self,
        task_id: TaskId,
        material_id: &MaterialId,
        decision: VerdictDecision,
        now: DateTime<Utc>,
    ) -> Result<ResolveOutcome, AuditError> {
        let verdict = decision.verdict;
        let transition = self.write()?.apply_verdict(
            task_id,
            verdict,
            decision.reason,
            decision.violations,
            now,
        )?;
        match transition {
            TransitionOutcome::Applied { material_updated } => {
                log_task_resolved(
                    task_id.get(),
                    material_id.as_str(),
                    verdict.as_str(),
                    material_updated,
                );
                Ok(ResolveOutcome::Resolved {
                    verdict,
                    material_updated,
                })
            }
            TransitionOutcome::AlreadyTerminal(status) => {
                log_duplicate_resolution(task_id.get(), status.as_str());
                Ok(ResolveOutcome::AlreadyResolved(status))
            }
        }
    }

    fn fail(
        &self,
        task_id: TaskId,
        attempts: u32,
        reason: String,
        error: String,
        now: DateTime<Utc>,
    ) -> Result<ResolveOutcome, AuditError> {
        let transition = self.write()?.fail_task(task_id, reason.clone(), error, now)?;
        match transition {
            TransitionOutcome::Applied { .. } => {
                log_task_failed(task_id.get(), attempts, &reason);
                Ok(ResolveOutcome::Failed { attempts, reason })
            }
            TransitionOutcome::AlreadyTerminal(status) => {
                log_duplicate_resolution(task_id.get(), status.as_str());
                Ok(ResolveOutcome::AlreadyResolved(status))
            }
        }
    }

    fn expire_stale(&self, threshold: Duration) -> Result<Vec<TaskId>, AuditError> {
        let now = self.scheduler.now();
        let window = chrono::Duration::from_std(threshold)
            .map_err(|err| AuditError::internal(format!("stale threshold out of range: {err}")))?;
        let Some(cutoff) = now.checked_sub_signed(window) else {
            return Ok(Vec::new());
        };

        let mut state = self.write()?;
        let mut expired = Vec::new();
        let candidates = state.tasks().pending_created_before(cutoff);
        for task_id in candidates {
            let created_at = state
                .tasks()
                .get(task_id)
                .map_or(now, |task| task.created_at);
            let error = format!("no verdict within {}s", threshold.as_secs());
            if let TransitionOutcome::Applied { .. } =
                state.fail_task(task_id, EXPIRED_REASON.to_string(), error, now)?
            {
                log_task_expired(task_id.get(), (now - created_at).num_milliseconds());
                expired.push(task_id);
            }
        }
        Ok(expired)
    }
}

/// A `failed` verdict must name at least one violation.
fn check_decision(decision: VerdictDecision) -> Result<VerdictDecision, ProviderError> {
    if decision.verdict == Verdict::Failed && decision.violations.is_empty() {
        return Err(ProviderError::Permanent(
            "failed verdict without violation tags".to_string(),
        ));
    }
    Ok(decision)
}

impl AuditOrchestrator {
    /// Run the resolver for `task_id` now, outside the schedule.
    ///
    /// Calling this for a task that is already terminal is a reported
    /// no-op.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown task id.
    pub fn resolve_now(&self, task_id: TaskId) -> Result<ResolveOutcome, AuditError> {
        self.inner.resolve(task_id)
    }

    /// Fail every pending task older than the configured staleness
    /// threshold. Returns the expired task ids; empty when no threshold is
    /// configured.
    pub fn sweep_stale(&self) -> Result<Vec<TaskId>, AuditError> {
        match self.inner.config.stale_after {
            Some(threshold) => self.inner.expire_stale(threshold),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use crate::test_support::{ScriptedVerdictProvider, manual_orchestrator};
    use adaudit_config::Config;
    use adaudit_store::NewMaterial;
    use adaudit_utils::test_support::fixed_epoch;
    use adaudit_utils::types::{Compliance, ContentType, MaterialStatus, OperationKind};

    fn setup(
        config: &Config,
        provider: Arc<ScriptedVerdictProvider>,
    ) -> (AuditOrchestrator, Arc<ManualScheduler>) {
        manual_orchestrator(config, provider)
    }

    fn banner(orchestrator: &AuditOrchestrator) -> MaterialId {
        orchestrator
            .register_material(NewMaterial {
                name: "Banner".to_string(),
                content_type: ContentType::Image,
                account_id: "acct-1".to_string(),
                uploader: "ops".to_string(),
                created_on: fixed_epoch().date_naive(),
            })
            .unwrap()
    }

    #[test]
    fn test_second_resolve_is_noop() {
        let provider = Arc::new(ScriptedVerdictProvider::always(VerdictDecision::passed()));
        let (orchestrator, scheduler) = setup(&Config::minimal_for_testing(), provider.clone());
        let task_id = orchestrator
            .submit_audit("acct-1", "42", OperationKind::Single)
            .unwrap()
            .task_id;
        scheduler.advance(Duration::from_secs(5));
        let resolved_at = orchestrator.task(task_id).unwrap().resolved_at;

        let again = orchestrator.resolve_now(task_id).unwrap();
        assert_eq!(again, ResolveOutcome::AlreadyResolved(TaskStatus::Completed));
        assert_eq!(provider.calls(), 1);
        assert_eq!(orchestrator.task(task_id).unwrap().resolved_at, resolved_at);
    }

    #[test]
    fn test_transient_errors_retry_with_backoff_then_succeed() {
        let provider = Arc::new(ScriptedVerdictProvider::new(
            vec![
                Err(ProviderError::Transient("timeout".to_string())),
                Err(ProviderError::Transient("rate limited".to_string())),
            ],
            VerdictDecision::passed(),
        ));
        let (orchestrator, scheduler) = setup(&Config::minimal_for_testing(), provider.clone());
        let submission = orchestrator
            .submit_audit("acct-1", "42", OperationKind::Single)
            .unwrap();

        scheduler.advance(submission.delay);
        assert_eq!(provider.calls(), 1);
        assert_eq!(
            orchestrator.task(submission.task_id).unwrap().status,
            TaskStatus::Pending
        );

        // first backoff is 1s, second 2s
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(provider.calls(), 2);
        scheduler.advance(Duration::from_millis(1_999));
        assert_eq!(provider.calls(), 2);
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(provider.calls(), 3);

        let task = orchestrator.task(submission.task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.attempts, 3);
    }

    #[test]
    fn test_exhausted_retries_fail_task_and_reset_material() {
        let provider = Arc::new(ScriptedVerdictProvider::always_err(ProviderError::Transient(
            "unreachable".to_string(),
        )));
        let (orchestrator, scheduler) = setup(&Config::minimal_for_testing(), provider.clone());
        let material = banner(&orchestrator);
        let task_id = orchestrator
            .submit_audit("acct-1", material.as_str(), OperationKind::Single)
            .unwrap()
            .task_id;

        scheduler.run_until_idle(10);
        assert_eq!(provider.calls(), 3);
        let task = orchestrator.task(task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.verdict(), None);
        let resolution = task.resolution.unwrap();
        let error = resolution.error.unwrap();
        assert!(error.starts_with("Transient resolution failure"), "{error}");
        assert!(error.contains("unreachable"));
        let material = orchestrator.material(material.as_str()).unwrap();
        assert_eq!(material.compliance, Compliance::Pending);
        assert_eq!(material.status, MaterialStatus::Pending);
    }

    #[test]
    fn test_permanent_error_fails_immediately() {
        let provider = Arc::new(ScriptedVerdictProvider::always_err(ProviderError::Permanent(
            "token revoked".to_string(),
        )));
        let (orchestrator, scheduler) = setup(&Config::minimal_for_testing(), provider.clone());
        let task_id = orchestrator
            .submit_audit("acct-1", "42", OperationKind::Single)
            .unwrap()
            .task_id;
        scheduler.run_until_idle(10);
        assert_eq!(provider.calls(), 1);
        assert_eq!(orchestrator.task(task_id).unwrap().status, TaskStatus::Failed);
    }

    #[test]
    fn test_failed_decision_without_tags_fails_task() {
        let provider = Arc::new(ScriptedVerdictProvider::always(VerdictDecision::failed(vec![])));
        let (orchestrator, scheduler) = setup(&Config::minimal_for_testing(), provider);
        let task_id = orchestrator
            .submit_audit("acct-1", "42", OperationKind::Single)
            .unwrap()
            .task_id;
        scheduler.run_until_idle(10);
        let task = orchestrator.task(task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.resolution.unwrap().error.unwrap().contains("violation tags"));
    }

    #[test]
    fn test_sweep_expires_only_old_pending_tasks() {
        let config = Config::builder()
            .delay_window(Duration::from_secs(120), Duration::from_secs(120))
            .stale_after(Duration::from_secs(60))
            .rng_seed(3)
            .build()
            .unwrap();
        let provider = Arc::new(ScriptedVerdictProvider::always(VerdictDecision::passed()));
        let (orchestrator, scheduler) = setup(&config, provider.clone());

        let old = orchestrator
            .submit_audit("acct-1", "1", OperationKind::Single)
            .unwrap()
            .task_id;
        assert!(orchestrator.sweep_stale().unwrap().is_empty());

        scheduler.advance(Duration::from_secs(61));
        let young = orchestrator
            .submit_audit("acct-1", "2", OperationKind::Single)
            .unwrap()
            .task_id;
        assert_eq!(orchestrator.sweep_stale().unwrap(), vec![old]);

        let old_task = orchestrator.task(old).unwrap();
        assert_eq!(old_task.status, TaskStatus::Failed);
        assert_eq!(
            old_task.resolution.map(|r| r.reason),
            Some(EXPIRED_REASON.to_string())
        );
        assert_eq!(orchestrator.task(young).unwrap().status, TaskStatus::Pending);

        // The late resolver invocation for the expired task is a no-op.
        scheduler.advance(Duration::from_secs(60));
        assert_eq!(orchestrator.task(old).unwrap().status, TaskStatus::Failed);
        assert_eq!(provider.calls(), 0);
        scheduler.advance(Duration::from_secs(61));
        assert_eq!(orchestrator.task(young).unwrap().status, TaskStatus::Completed);
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_sweep_without_threshold_is_noop() {
        let provider = Arc::new(ScriptedVerdictProvider::always(VerdictDecision::passed()));
        let (orchestrator, scheduler) = setup(&Config::minimal_for_testing(), provider);
        orchestrator
            .submit_audit("acct-1", "1", OperationKind::Single)
            .unwrap();
        scheduler.advance(Duration::from_secs(1));
        assert!(orchestrator.sweep_stale().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_unknown_task_is_not_found() {
        let provider = Arc::new(ScriptedVerdictProvider::always(VerdictDecision::passed()));
        let (orchestrator, _scheduler) = setup(&Config::minimal_for_testing(), provider);
        let err = orchestrator.resolve_now(TaskId::new(1)).unwrap_err();
        assert_eq!(err.api_code(), 404);
    }
}
