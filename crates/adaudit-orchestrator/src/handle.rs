use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use adaudit_config::Config;
use adaudit_store::seed::load_demo_materials;
use adaudit_store::{AuditState, AuditTask, BatchRun, Material, NewMaterial};
use adaudit_utils::error::AuditError;
use adaudit_utils::ids::{BatchId, IdAllocator, MaterialId, TaskId, request_trace_id};
use adaudit_utils::logging::log_task_submitted;
use adaudit_utils::types::{OperationKind, ViolationTag};

use crate::scheduler::{ScheduleHandle, Scheduler, TokioScheduler};
use crate::verdict::{SimulatedVerdictProvider, VerdictProvider};

/// The subset of [`Config`] the orchestrator acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Inclusive bounds of the jittered resolution delay.
    pub delay_window: (Duration, Duration),
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    /// Pending tasks older than this are failed by [`AuditOrchestrator::sweep_stale`].
    pub stale_after: Option<Duration>,
    pub rng_seed: Option<u64>,
}

impl OrchestratorConfig {
    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.retry_base_delay.saturating_mul(1u32 << exponent)
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            delay_window: config.delay_window(),
            max_attempts: config.max_attempts(),
            retry_base_delay: config.retry_base_delay(),
            stale_after: config.stale_after(),
            rng_seed: config.rng_seed(),
        }
    }
}

/// Synchronous acknowledgement of a single submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub task_id: TaskId,
    pub request_trace_id: String,
    /// Delay after which the first resolution attempt runs.
    pub delay: Duration,
}

pub(crate) struct Inner {
    state: RwLock<AuditState>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) provider: Arc<dyn VerdictProvider>,
    pub(crate) config: OrchestratorConfig,
    ids: IdAllocator,
    jitter: Mutex<StdRng>,
}

impl Inner {
    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, AuditState>, AuditError> {
        self.state
            .read()
            .map_err(|_| AuditError::internal("audit state lock poisoned"))
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, AuditState>, AuditError> {
        self.state
            .write()
            .map_err(|_| AuditError::internal("audit state lock poisoned"))
    }

    pub(crate) fn new_task(
        &self,
        account_id: String,
        material_id: MaterialId,
        kind: OperationKind,
        batch_id: Option<BatchId>,
        now: DateTime<Utc>,
    ) -> AuditTask {
        let trace = request_trace_id(now, &material_id);
        AuditTask::new_pending(
            self.ids.next_task_id(now),
            account_id,
            material_id,
            kind,
            batch_id,
            now,
            trace,
        )
    }

    pub(crate) fn next_batch_id(&self, now: DateTime<Utc>) -> BatchId {
        self.ids.next_batch_id(now)
    }

    /// Uniform draw from the configured delay window.
    pub(crate) fn draw_delay(&self) -> Duration {
        let (min, max) = self.config.delay_window;
        if max <= min {
            return min;
        }
        let (lo, hi) = (min.as_millis() as u64, max.as_millis() as u64);
        let mut rng = self.jitter.lock().unwrap_or_else(PoisonError::into_inner);
        Duration::from_millis(rng.gen_range(lo..=hi))
    }

    /// Queue one resolver invocation for `task_id` after `delay`.
    pub(crate) fn schedule_resolution(self: &Arc<Self>, task_id: TaskId, delay: Duration) -> ScheduleHandle {
        let inner = Arc::clone(self);
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Err(err) = inner.resolve(task_id) {
                    tracing::error!(
                        task_id = task_id.get(),
                        error = %err,
                        "Resolver invocation failed"
                    );
                }
            }),
        )
    }
}

pub(crate) fn require_account(raw: &str) -> Result<String, AuditError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuditError::invalid_argument("accountId must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Builder for [`AuditOrchestrator`].
///
/// Defaults: the simulated provider configured from [`Config`], a
/// [`TokioScheduler`] on the current runtime, and an empty store.
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    pass_probability: f64,
    violation_tags: Vec<ViolationTag>,
    seed_demo_materials: bool,
    scheduler: Option<Arc<dyn Scheduler>>,
    provider: Option<Arc<dyn VerdictProvider>>,
    state: Option<AuditState>,
}

impl OrchestratorBuilder {
    fn new(config: &Config) -> Self {
        Self {
            config: OrchestratorConfig::from(config),
            pass_probability: config.pass_probability(),
            violation_tags: config.violation_tags(),
            seed_demo_materials: config.seed_demo_materials(),
            scheduler: None,
            provider: None,
            state: None,
        }
    }

    #[must_use]
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn VerdictProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Start from an existing state instead of an empty one.
    #[must_use]
    pub fn state(mut self, state: AuditState) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn seed_demo_materials(mut self, enabled: bool) -> Self {
        self.seed_demo_materials = enabled;
        self
    }

    /// # Errors
    ///
    /// `Internal` when no scheduler was given and there is no Tokio runtime,
    /// or when the demo catalog fails validation.
    pub fn build(self) -> Result<AuditOrchestrator, AuditError> {
        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(TokioScheduler::try_current()?),
        };
        let provider: Arc<dyn VerdictProvider> = match self.provider {
            Some(provider) => provider,
            None => Arc::new(SimulatedVerdictProvider::new(
                self.pass_probability,
                self.violation_tags,
                self.config.rng_seed,
            )),
        };
        let mut state = self.state.unwrap_or_default();
        if self.seed_demo_materials {
            load_demo_materials(&mut state)?;
        }
        let jitter = match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        tracing::debug!(
            provider = provider.name(),
            materials = state.materials().len(),
            "Audit orchestrator ready"
        );
        Ok(AuditOrchestrator {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                scheduler,
                provider,
                config: self.config,
                ids: IdAllocator::new(),
                jitter: Mutex::new(jitter),
            }),
        })
    }
}

/// Owner of all audit state. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AuditOrchestrator {
    pub(crate) inner: Arc<Inner>,
}

impl std::fmt::Debug for AuditOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditOrchestrator")
            .field("scheduler", &self.inner.scheduler)
            .field("provider", &self.inner.provider)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl AuditOrchestrator {
    #[must_use]
    pub fn builder(config: &Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Current instant on the scheduler's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.scheduler.now()
    }

    /// Resolver invocations scheduled but not yet run.
    #[must_use]
    pub fn pending_resolutions(&self) -> usize {
        self.inner.scheduler.pending_jobs()
    }

    /// Register a task for one material and schedule its resolution.
    ///
    /// Returns before any resolution work happens. Unknown materials are
    /// accepted and tracked on the task only.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when either id is blank; no task is created.
    pub fn submit_audit(
        &self,
        account_id: &str,
        material_id: &str,
        kind: OperationKind,
    ) -> Result<Submission, AuditError> {
        let account_id = require_account(account_id)?;
        let material_id = MaterialId::parse(material_id)?;
        // Ids are allocated under the write lock so registration order
        // matches id order.
        let (task_id, request_trace_id) = {
            let mut state = self.inner.write()?;
            let now = self.inner.scheduler.now();
            let task = self
                .inner
                .new_task(account_id.clone(), material_id.clone(), kind, None, now);
            let registered = (task.id, task.request_trace_id.clone());
            state.register_task(task)?;
            registered
        };

        let delay = self.inner.draw_delay();
        self.inner.schedule_resolution(task_id, delay);
        log_task_submitted(
            task_id.get(),
            material_id.as_str(),
            &account_id,
            delay.as_millis(),
        );
        Ok(Submission {
            task_id,
            request_trace_id,
            delay,
        })
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown task id.
    pub fn task(&self, task_id: TaskId) -> Result<AuditTask, AuditError> {
        self.inner
            .read()?
            .tasks()
            .get(task_id)
            .cloned()
            .ok_or_else(|| AuditError::not_found("task", task_id))
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown batch id.
    pub fn batch(&self, batch_id: BatchId) -> Result<BatchRun, AuditError> {
        self.inner
            .read()?
            .batches()
            .get(batch_id)
            .cloned()
            .ok_or_else(|| AuditError::not_found("batch", batch_id))
    }

    /// # Errors
    ///
    /// `InvalidArgument` for a blank id, `NotFound` for an unknown one.
    pub fn material(&self, material_id: &str) -> Result<Material, AuditError> {
        let id = MaterialId::parse(material_id)?;
        self.inner
            .read()?
            .materials()
            .get(&id)
            .cloned()
            .ok_or_else(|| AuditError::not_found("material", id))
    }

    /// Catalog in insertion order.
    pub fn materials(&self) -> Result<Vec<Material>, AuditError> {
        Ok(self.inner.read()?.materials().list().cloned().collect())
    }

    /// Add a material to the catalog in the pending state.
    ///
    /// # Errors
    ///
    /// `Internal` when the numeric id space is exhausted.
    pub fn register_material(&self, material: NewMaterial) -> Result<MaterialId, AuditError> {
        self.inner.write()?.insert_material(material)
    }

    /// Run `f` against a consistent snapshot of the state.
    ///
    /// The read lock is held for the duration of `f`, so every task and
    /// material seen together reflect the same set of resolutions.
    pub fn read<R>(&self, f: impl FnOnce(&AuditState) -> R) -> Result<R, AuditError> {
        let state = self.inner.read()?;
        Ok(f(&state))
    }
}
