use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use adaudit_utils::error::AuditError;
use adaudit_utils::ids::{MaterialId, TaskId};
use adaudit_utils::types::{
    Compliance, ContentType, MaterialStatus, QualityPrediction, Verdict, ViolationTag,
};

/// A creative asset and its compliance record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub status: MaterialStatus,
    pub compliance: Compliance,
    pub prediction: QualityPrediction,
    pub violations: Vec<ViolationTag>,
    pub spend: f64,
    pub ctr: f64,
    pub account_id: String,
    pub uploader: String,
    pub created_on: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

impl Material {
    /// Check the record-level invariants.
    ///
    /// - status agrees with compliance
    /// - violations are present exactly when compliance is `failed`
    /// - spend and ctr are finite and non-negative
    pub fn validate(&self) -> Result<(), AuditError> {
        if !self.status.is_consistent_with(self.compliance) {
            return Err(AuditError::internal(format!(
                "material {}: status '{}' is inconsistent with compliance '{}'",
                self.id, self.status, self.compliance
            )));
        }
        let failed = self.compliance == Compliance::Failed;
        if failed == self.violations.is_empty() {
            return Err(AuditError::internal(format!(
                "material {}: violations must be non-empty exactly when compliance is failed",
                self.id
            )));
        }
        for (field, value) in [("spend", self.spend), ("ctr", self.ctr)] {
            if !value.is_finite() || value < 0.0 {
                return Err(AuditError::invalid_argument(format!(
                    "material {}: {field} must be a non-negative number",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Fields supplied when registering a new material; the store allocates the id.
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub name: String,
    pub content_type: ContentType,
    pub account_id: String,
    pub uploader: String,
    pub created_on: NaiveDate,
}

/// Material id -> record, iterated in insertion order.
#[derive(Debug, Default)]
pub struct MaterialStore {
    order: Vec<MaterialId>,
    records: HashMap<MaterialId, Material>,
    next_sequence: u64,
}

impl MaterialStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            ..Self::default()
        }
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
    pub fn get(&self, id: &MaterialId) -> Option<&Material> {
        self.records.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &MaterialId) -> bool {
        self.records.contains_key(id)
    }

    /// Materials in insertion order.
    pub fn list(&self) -> impl Iterator<Item = &Material> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Register a new material in the pending state with a freshly allocated id.
    ///
    /// Fails once the numeric id space is used up.
    pub fn insert_new(&mut self, new: NewMaterial) -> Result<MaterialId, AuditError> {
        let sequence = self.next_sequence.max(1);
        let id = MaterialId::from_sequence(sequence);
        if self.records.contains_key(&id) {
            return Err(AuditError::internal("material id space exhausted"));
        }
        self.next_sequence = sequence.saturating_add(1);
        let material = Material {
            id: id.clone(),
            name: new.name,
            content_type: new.content_type,
            status: MaterialStatus::Pending,
            compliance: Compliance::Pending,
            prediction: QualityPrediction::Pending,
            violations: Vec::new(),
            spend: 0.0,
            ctr: 0.0,
            account_id: new.account_id,
            uploader: new.uploader,
            created_on: new.created_on,
            task_id: None,
        };
        self.order.push(id.clone());
        self.records.insert(id.clone(), material);
        Ok(id)
    }

    /// Insert or replace a full record after validating it.
    ///
    /// Numeric ids advance the allocator so later `insert_new` calls never
    /// collide with upserted records.
    pub fn upsert(&mut self, material: Material) -> Result<(), AuditError> {
        material.validate()?;
        if let Ok(numeric) = material.id.as_str().parse::<u64>() {
            self.next_sequence = self.next_sequence.max(numeric.saturating_add(1));
        }
        if !self.records.contains_key(&material.id) {
            self.order.push(material.id.clone());
        }
        self.records.insert(material.id.clone(), material);
        Ok(())
    }

    /// Move a known material into review for `task_id`. Returns false when
    /// the material is unknown.
    pub(crate) fn begin_audit(&mut self, id: &MaterialId, task_id: TaskId) -> bool {
        let Some(material) = self.records.get_mut(id) else {
            return false;
        };
        material.status = MaterialStatus::Testing;
        material.compliance = Compliance::Pending;
        material.violations.clear();
        material.task_id = Some(task_id);
        true
    }

    /// Apply a terminal verdict, but only if `task_id` is still the
    /// material's current task. Returns whether the material changed.
    pub(crate) fn apply_verdict(
        &mut self,
        id: &MaterialId,
        task_id: TaskId,
        verdict: Verdict,
        violations: &[ViolationTag],
    ) -> bool {
        let Some(material) = self.records.get_mut(id) else {
            return false;
        };
        if material.task_id != Some(task_id) {
            return false;
        }
        material.compliance = verdict.compliance();
        material.status = verdict.material_status();
        material.violations = match verdict {
            Verdict::Passed => Vec::new(),
            Verdict::Failed => violations.to_vec(),
        };
        true
    }

    /// Return a material to `pending` after its current task failed without
    /// a verdict.
    pub(crate) fn reset_pending(&mut self, id: &MaterialId, task_id: TaskId) -> bool {
        let Some(material) = self.records.get_mut(id) else {
            return false;
        };
        if material.task_id != Some(task_id) {
            return false;
        }
        material.compliance = Compliance::Pending;
        material.status = MaterialStatus::Pending;
        material.violations.clear();
        true
    }
}
