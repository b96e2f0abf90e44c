//! Deferred execution for resolver invocations.
//!
//! The orchestrator never sleeps itself: it hands a job and a delay to a
//! [`Scheduler`]. Production uses [`TokioScheduler`]; tests drive a
//! [`ManualScheduler`] whose clock only moves when told to.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;

use adaudit_utils::error::AuditError;

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Receipt for a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleHandle {
    pub id: u64,
    pub due_at: DateTime<Utc>,
}

/// Runs jobs after a delay and supplies the clock the orchestrator stamps
/// records with.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Run `job` once, no earlier than `delay` from now.
    fn schedule(&self, delay: Duration, job: Job) -> ScheduleHandle;

    /// Current instant on this scheduler's clock.
    fn now(&self) -> DateTime<Utc>;

    /// Jobs scheduled but not yet finished.
    fn pending_jobs(&self) -> usize;
}

fn offset(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Wall-clock scheduler backed by `tokio::time::sleep`.
pub struct TokioScheduler {
    runtime: Handle,
    next_id: AtomicU64,
    in_flight: Arc<AtomicUsize>,
}

impl TokioScheduler {
    /// Bind to the runtime the caller is running on.
    pub fn try_current() -> Result<Self, AuditError> {
        Handle::try_current()
            .map(Self::with_handle)
            .map_err(|err| AuditError::internal(format!("no tokio runtime available: {err}")))
    }

    #[must_use]
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, job: Job) -> ScheduleHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let due_at = offset(self.now(), delay);
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::AcqRel);
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Providers may block.
            let outcome = tokio::task::spawn_blocking(job).await;
            in_flight.fetch_sub(1, Ordering::AcqRel);
            if let Err(err) = outcome {
                tracing::error!(job_id = id, error = %err, "Scheduled job panicked");
            }
        });
        ScheduleHandle { id, due_at }
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn pending_jobs(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

#[derive(Default)]
struct ManualQueue {
    now: Option<DateTime<Utc>>,
    next_id: u64,
    due: BinaryHeap<Reverse<(DateTime<Utc>, u64)>>,
    jobs: HashMap<u64, Job>,
}

/// Virtual-clock scheduler for deterministic tests.
///
/// Jobs run on the caller's thread inside [`ManualScheduler::advance`], in
/// due order (ties in scheduling order). A job may schedule further jobs;
/// those run in the same `advance` call if they fall due within it.
pub struct ManualScheduler {
    start: DateTime<Utc>,
    queue: Mutex<ManualQueue>,
}

impl ManualScheduler {
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            queue: Mutex::new(ManualQueue::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualQueue> {
        // Jobs run outside the lock; a poisoned queue is still coherent.
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Move the clock forward by `by`, running every job that falls due.
    /// Returns how many jobs ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = offset(self.now(), by);
        let mut ran = 0;
        loop {
            let job = {
                let mut queue = self.lock();
                match queue.due.peek() {
                    Some(Reverse((due_at, _))) if *due_at <= target => {
                        let Some(Reverse((due_at, id))) = queue.due.pop() else {
                            break;
                        };
                        queue.now = Some(due_at);
                        queue.jobs.remove(&id)
                    }
                    _ => break,
                }
            };
            if let Some(job) = job {
                job();
                ran += 1;
            }
        }
        self.lock().now = Some(target);
        ran
    }

    /// Advance until no jobs remain, giving up after `limit` jobs.
    pub fn run_until_idle(&self, limit: usize) -> usize {
        let mut ran = 0;
        while ran < limit {
            let next_due = {
                let queue = self.lock();
                queue.due.peek().map(|Reverse((due_at, _))| *due_at)
            };
            let Some(due_at) = next_due else {
                break;
            };
            let step = (due_at - self.now()).to_std().unwrap_or(Duration::ZERO);
            ran += self.advance(step);
        }
        ran
    }

    /// Due instant of the earliest queued job.
    #[must_use]
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.lock().due.peek().map(|Reverse((due_at, _))| *due_at)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::starting_at(Utc::now())
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &queue.now.unwrap_or(self.start))
            .field("queued", &queue.jobs.len())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, job: Job) -> ScheduleHandle {
        let mut queue = self.lock();
        let now = queue.now.unwrap_or(self.start);
        let due_at = offset(now, delay);
        queue.next_id += 1;
        let id = queue.next_id;
        queue.due.push(Reverse((due_at, id)));
        queue.jobs.insert(id, job);
        ScheduleHandle { id, due_at }
    }

    fn now(&self) -> DateTime<Utc> {
        self.lock().now.unwrap_or(self.start)
    }

    fn pending_jobs(&self) -> usize {
        self.lock().jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaudit_utils::test_support::fixed_epoch;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Job) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |label: &'static str| -> Job {
            let sink = Arc::clone(&sink);
            Box::new(move || sink.lock().unwrap().push(label))
        };
        (log, make)
    }

    #[test]
    fn test_manual_runs_jobs_in_due_order() {
        let scheduler = ManualScheduler::starting_at(fixed_epoch());
        let (log, job) = recorder();
        scheduler.schedule(Duration::from_secs(5), job("late"));
        scheduler.schedule(Duration::from_secs(3), job("early"));
        scheduler.schedule(Duration::from_secs(3), job("early-tie"));

        assert_eq!(scheduler.advance(Duration::from_secs(2)), 0);
        assert_eq!(scheduler.advance(Duration::from_secs(1)), 2);
        assert_eq!(*log.lock().unwrap(), ["early", "early-tie"]);
        assert_eq!(scheduler.pending_jobs(), 1);
        assert_eq!(scheduler.now(), fixed_epoch() + chrono::Duration::seconds(3));

        scheduler.advance(Duration::from_secs(10));
        assert_eq!(*log.lock().unwrap(), ["early", "early-tie", "late"]);
        assert_eq!(scheduler.pending_jobs(), 0);
    }

    #[test]
    fn test_manual_job_can_schedule_follow_up() {
        let scheduler = Arc::new(ManualScheduler::starting_at(fixed_epoch()));
        let (log, job) = recorder();
        let inner = Arc::clone(&scheduler);
        let follow_up = job("follow-up");
        scheduler.schedule(
            Duration::from_secs(1),
            Box::new(move || {
                inner.schedule(Duration::from_secs(1), follow_up);
            }),
        );
        assert_eq!(scheduler.advance(Duration::from_secs(2)), 2);
        assert_eq!(*log.lock().unwrap(), ["follow-up"]);
    }

    #[test]
    fn test_run_until_idle_drains_queue() {
        let scheduler = ManualScheduler::starting_at(fixed_epoch());
        let (log, job) = recorder();
        scheduler.schedule(Duration::from_secs(60), job("a"));
        scheduler.schedule(Duration::from_secs(3600), job("b"));
        assert_eq!(scheduler.run_until_idle(10), 2);
        assert_eq!(log.lock().unwrap().len(), 2);
        assert!(scheduler.next_due().is_none());
    }

    #[tokio::test]
    async fn test_tokio_scheduler_runs_after_delay() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        scheduler.schedule(
            Duration::from_millis(20),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        assert_eq!(scheduler.pending_jobs(), 1);
        tokio::time::timeout(Duration::from_secs(10), rx)
            .await
            .expect("job should run")
            .expect("sender kept");
    }
}
