//! Batch coordinator.
//!
//! A batch is N independent single submissions that share a batch id. The
//! acknowledgement is returned once every member task exists; each member
//! then resolves on its own jittered schedule, in any order.

use adaudit_store::BatchRun;
use adaudit_utils::error::AuditError;
use adaudit_utils::ids::{BatchId, MaterialId, TaskId};
use adaudit_utils::logging::log_batch_submitted;
use adaudit_utils::types::OperationKind;

use crate::handle::{AuditOrchestrator, require_account};

/// Synchronous acknowledgement of a batch submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReceipt {
    pub batch_id: BatchId,
    /// Member task ids in submission order.
    pub task_ids: Vec<TaskId>,
}

impl BatchReceipt {
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.task_ids.len()
    }
}

impl AuditOrchestrator {
    /// Submit every material in `material_ids` as a batch member.
    ///
    /// Validation is all-or-nothing: one blank member id rejects the whole
    /// batch before any task is created. An empty list yields a batch with
    /// no members.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a blank account id or member id.
    pub fn submit_batch<S: AsRef<str>>(
        &self,
        account_id: &str,
        material_ids: &[S],
    ) -> Result<BatchReceipt, AuditError> {
        let account_id = require_account(account_id)?;
        let members = material_ids
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                MaterialId::parse(raw.as_ref()).map_err(|_| {
                    AuditError::invalid_argument(format!("materialIds[{index}] must not be empty"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (batch_id, task_ids) = {
            let mut state = self.inner.write()?;
            let now = self.inner.scheduler.now();
            let batch_id = self.inner.next_batch_id(now);
            let mut task_ids = Vec::with_capacity(members.len());
            for material_id in members {
                let task = self.inner.new_task(
                    account_id.clone(),
                    material_id,
                    OperationKind::BatchMember,
                    Some(batch_id),
                    now,
                );
                task_ids.push(task.id);
                state.register_task(task)?;
            }
            state.register_batch(BatchRun {
                id: batch_id,
                account_id: account_id.clone(),
                task_ids: task_ids.clone(),
                created_at: now,
            })?;
            (batch_id, task_ids)
        };

        for task_id in &task_ids {
            let delay = self.inner.draw_delay();
            self.inner.schedule_resolution(*task_id, delay);
            tracing::debug!(
                batch_id = batch_id.get(),
                task_id = task_id.get(),
                delay_ms = %delay.as_millis(),
                "Batch member scheduled"
            );
        }
        log_batch_submitted(batch_id.get(), &account_id, task_ids.len());

        Ok(BatchReceipt { batch_id, task_ids })
    }
}
