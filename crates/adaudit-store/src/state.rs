use chrono::{DateTime, Utc};

use adaudit_utils::error::AuditError;
use adaudit_utils::ids::{MaterialId, TaskId};
use adaudit_utils::types::{TaskStatus, Verdict, ViolationTag};

use crate::batch::{BatchRegistry, BatchRun};
use crate::material::{Material, MaterialStore, NewMaterial};
use crate::task::{AuditTask, Resolution, TaskRegistry};

/// Result of trying to move a task out of `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The task transitioned. `material_updated` is false for unknown
    /// materials and for materials already re-submitted under a newer task.
    Applied { material_updated: bool },
    /// The task was already terminal; nothing changed.
    AlreadyTerminal(TaskStatus),
}

/// The orchestrator's complete state.
///
/// Every method that touches both a task and its material does so within a
/// single `&mut self` call, so a reader holding the same lock never sees one
/// updated without the other.
#[derive(Debug, Default)]
pub struct AuditState {
    materials: MaterialStore,
    tasks: TaskRegistry,
    batches: BatchRegistry,
}

impl AuditState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            materials: MaterialStore::new(),
            tasks: TaskRegistry::new(),
            batches: BatchRegistry::new(),
        }
    }

    #[must_use]
    pub fn materials(&self) -> &MaterialStore {
        &self.materials
    }

    #[must_use]
    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    #[must_use]
    pub fn batches(&self) -> &BatchRegistry {
        &self.batches
    }

    pub fn insert_material(&mut self, new: NewMaterial) -> Result<MaterialId, AuditError> {
        self.materials.insert_new(new)
    }

    pub fn upsert_material(&mut self, material: Material) -> Result<(), AuditError> {
        self.materials.upsert(material)
    }

    /// Register a pending task and, for a known material, move the material
    /// into review. Returns whether the material is known.
    pub fn register_task(&mut self, task: AuditTask) -> Result<bool, AuditError> {
        let material_id = task.material_id.clone();
        let task_id = task.id;
        self.tasks.insert(task)?;
        Ok(self.materials.begin_audit(&material_id, task_id))
    }

    pub fn register_batch(&mut self, batch: BatchRun) -> Result<(), AuditError> {
        self.batches.insert(batch)
    }

    /// Count a provider attempt for a pending task.
    pub fn record_attempt(&mut self, task_id: TaskId) -> Result<u32, AuditError> {
        self.tasks
            .record_attempt(task_id)
            .ok_or_else(|| AuditError::not_found("task", task_id))
    }

    /// Complete a task with a verdict and apply it to the material.
    pub fn apply_verdict(
        &mut self,
        task_id: TaskId,
        verdict: Verdict,
        reason: String,
        violations: Vec<ViolationTag>,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, AuditError> {
        if verdict == Verdict::Failed && violations.is_empty() {
            return Err(AuditError::internal(format!(
                "task {task_id}: failed verdict without violation tags"
            )));
        }
        let violations = match verdict {
            Verdict::Passed => Vec::new(),
            Verdict::Failed => violations,
        };
        let trace = self.trace_id(task_id)?;
        let resolution = Resolution {
            verdict: Some(verdict),
            reason,
            request_trace_id: trace,
            violations: violations.clone(),
            error: None,
        };
        match self
            .tasks
            .finish(task_id, TaskStatus::Completed, resolution, at)?
        {
            Ok(task) => {
                let material_id = task.material_id.clone();
                let updated =
                    self.materials
                        .apply_verdict(&material_id, task_id, verdict, &violations);
                Ok(TransitionOutcome::Applied {
                    material_updated: updated,
                })
            }
            Err(previous) => Ok(TransitionOutcome::AlreadyTerminal(previous)),
        }
    }

    /// Fail a task that produced no verdict and return its material to
    /// `pending`.
    pub fn fail_task(
        &mut self,
        task_id: TaskId,
        reason: String,
        error: String,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, AuditError> {
        let trace = self.trace_id(task_id)?;
        let resolution = Resolution {
            verdict: None,
            reason,
            request_trace_id: trace,
            violations: Vec::new(),
            error: Some(error),
        };
        match self
            .tasks
            .finish(task_id, TaskStatus::Failed, resolution, at)?
        {
            Ok(task) => {
                let material_id = task.material_id.clone();
                let updated = self.materials.reset_pending(&material_id, task_id);
                Ok(TransitionOutcome::Applied {
                    material_updated: updated,
                })
            }
            Err(previous) => Ok(TransitionOutcome::AlreadyTerminal(previous)),
        }
    }

    fn trace_id(&self, task_id: TaskId) -> Result<String, AuditError> {
        self.tasks
            .get(task_id)
            .map(|t| t.request_trace_id.clone())
            .ok_or_else(|| AuditError::not_found("task", task_id))
    }
}
