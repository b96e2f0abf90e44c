use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adaudit_utils::error::AuditError;
use adaudit_utils::ids::{BatchId, MaterialId, TaskId};
use adaudit_utils::types::{OperationKind, TaskStatus, Verdict, ViolationTag};

/// Payload stamped on a task when it leaves `pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Absent when the task failed without a verdict.
    pub verdict: Option<Verdict>,
    pub reason: String,
    pub request_trace_id: String,
    pub violations: Vec<ViolationTag>,
    /// Provider or expiry error; set only for `failed` tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One request to evaluate one material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTask {
    pub id: TaskId,
    pub account_id: String,
    pub material_id: MaterialId,
    pub kind: OperationKind,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Provider calls made so far.
    pub attempts: u32,
    pub request_trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl AuditTask {
    #[must_use]
    pub fn new_pending(
        id: TaskId,
        account_id: String,
        material_id: MaterialId,
        kind: OperationKind,
        batch_id: Option<BatchId>,
        created_at: DateTime<Utc>,
        request_trace_id: String,
    ) -> Self {
        Self {
            id,
            account_id,
            material_id,
            kind,
            status: TaskStatus::Pending,
            batch_id,
            created_at,
            resolved_at: None,
            attempts: 0,
            request_trace_id,
            resolution: None,
        }
    }

    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        self.resolution.as_ref().and_then(|r| r.verdict)
    }
}

/// Task id -> task. Entries are never removed, only transitioned.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    order: Vec<TaskId>,
    tasks: HashMap<TaskId, AuditTask>,
    latest_by_material: HashMap<MaterialId, TaskId>,
    /// Materials in order of their first submission.
    subjects: Vec<MaterialId>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&AuditTask> {
        self.tasks.get(&id)
    }

    /// Tasks in creation order.
    pub fn list(&self) -> impl Iterator<Item = &AuditTask> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Most recently created task for a material.
    #[must_use]
    pub fn latest_for_material(&self, material_id: &MaterialId) -> Option<&AuditTask> {
        self.latest_by_material
            .get(material_id)
            .and_then(|id| self.tasks.get(id))
    }

    /// Every material that has at least one task, in first-submission order.
    pub fn subjects(&self) -> impl Iterator<Item = &MaterialId> {
        self.subjects.iter()
    }

    /// Register a new task. Ids must be unique.
    pub fn insert(&mut self, task: AuditTask) -> Result<(), AuditError> {
        if self.tasks.contains_key(&task.id) {
            return Err(AuditError::internal(format!(
                "task id {} allocated twice",
                task.id
            )));
        }
        if task.status != TaskStatus::Pending {
            return Err(AuditError::internal(format!(
                "task {} must be created pending",
                task.id
            )));
        }
        if !self.latest_by_material.contains_key(&task.material_id) {
            self.subjects.push(task.material_id.clone());
        }
        self.latest_by_material
            .insert(task.material_id.clone(), task.id);
        self.order.push(task.id);
        self.tasks.insert(task.id, task);
        Ok(())
    }

    /// Count one provider attempt; returns the new total.
    pub(crate) fn record_attempt(&mut self, id: TaskId) -> Option<u32> {
        let task = self.tasks.get_mut(&id)?;
        task.attempts += 1;
        Some(task.attempts)
    }

    /// Move a pending task to a terminal status. Returns the previous status
    /// when the task was already terminal, without touching it.
    pub(crate) fn finish(
        &mut self,
        id: TaskId,
        status: TaskStatus,
        resolution: Resolution,
        at: DateTime<Utc>,
    ) -> Result<Result<&AuditTask, TaskStatus>, AuditError> {
        debug_assert!(status.is_terminal());
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| AuditError::not_found("task", id))?;
        if task.status.is_terminal() {
            return Ok(Err(task.status));
        }
        task.status = status;
        task.resolved_at = Some(at);
        task.resolution = Some(resolution);
        Ok(Ok(task))
    }

    /// Pending tasks created at or before `cutoff`.
    #[must_use]
    pub fn pending_created_before(&self, cutoff: DateTime<Utc>) -> Vec<TaskId> {
        self.list()
            .filter(|t| t.status == TaskStatus::Pending && t.created_at <= cutoff)
            .map(|t| t.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaudit_utils::test_support::fixed_epoch;

    fn pending(id: u64, material: &str) -> AuditTask {
        AuditTask::new_pending(
            TaskId::new(id),
            "acct-1".to_string(),
            MaterialId::parse(material).unwrap(),
            OperationKind::Single,
            None,
            fixed_epoch(),
            format!("req_{id}"),
        )
    }

    fn passed() -> Resolution {
        Resolution {
            verdict: Some(Verdict::Passed),
            reason: "ok".to_string(),
            request_trace_id: "req".to_string(),
            violations: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut registry = TaskRegistry::new();
        registry.insert(pending(1, "42")).unwrap();
        assert!(registry.insert(pending(1, "43")).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_finish_is_exactly_once() {
        let mut registry = TaskRegistry::new();
        registry.insert(pending(1, "42")).unwrap();
        let first = registry
            .finish(TaskId::new(1), TaskStatus::Completed, passed(), fixed_epoch())
            .unwrap();
        assert!(first.is_ok());
        let second = registry
            .finish(TaskId::new(1), TaskStatus::Failed, passed(), fixed_epoch())
            .unwrap();
        assert_eq!(second.unwrap_err(), TaskStatus::Completed);
        assert_eq!(
            registry.get(TaskId::new(1)).unwrap().status,
            TaskStatus::Completed
        );
    }

    #[test]
    fn test_finish_unknown_task_is_not_found() {
        let mut registry = TaskRegistry::new();
        let err = registry
            .finish(TaskId::new(9), TaskStatus::Completed, passed(), fixed_epoch())
            .unwrap_err();
        assert_eq!(err.api_code(), 404);
    }

    #[test]
    fn test_latest_for_material_and_subject_order() {
        let mut registry = TaskRegistry::new();
        registry.insert(pending(1, "b")).unwrap();
        registry.insert(pending(2, "a")).unwrap();
        registry.insert(pending(3, "b")).unwrap();
        let b = MaterialId::parse("b").unwrap();
        assert_eq!(registry.latest_for_material(&b).unwrap().id, TaskId::new(3));
        let subjects: Vec<_> = registry.subjects().map(MaterialId::as_str).collect();
        assert_eq!(subjects, ["b", "a"]);
    }
}
