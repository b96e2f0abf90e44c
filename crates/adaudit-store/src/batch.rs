use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adaudit_utils::error::AuditError;
use adaudit_utils::ids::{BatchId, TaskId};

/// A group of tasks submitted together. Carries no aggregate status: members
/// resolve independently and callers poll them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRun {
    pub id: BatchId,
    pub account_id: String,
    pub task_ids: Vec<TaskId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct BatchRegistry {
    order: Vec<BatchId>,
    batches: HashMap<BatchId, BatchRun>,
}

impl BatchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: BatchId) -> Option<&BatchRun> {
        self.batches.get(&id)
    }

    pub fn list(&self) -> impl Iterator<Item = &BatchRun> {
        self.order.iter().filter_map(|id| self.batches.get(id))
    }

    pub fn insert(&mut self, batch: BatchRun) -> Result<(), AuditError> {
        if self.batches.contains_key(&batch.id) {
            return Err(AuditError::internal(format!(
                "batch id {} allocated twice",
                batch.id
            )));
        }
        self.order.push(batch.id);
        self.batches.insert(batch.id, batch);
        Ok(())
    }
}
