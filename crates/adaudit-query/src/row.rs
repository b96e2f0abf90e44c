use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use adaudit_store::{AuditState, AuditTask, Material};
use adaudit_utils::ids::{MaterialId, TaskId};
use adaudit_utils::types::{
    Compliance, ContentType, MaterialStatus, QualityPrediction, TaskStatus, Verdict, ViolationTag,
};

/// One result row: a material joined with its most recent task.
///
/// Materials that only exist on tasks (submitted by id but never
/// registered) produce rows too; their catalog fields are absent and their
/// compliance is derived from the task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    pub material_id: MaterialId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    pub status: MaterialStatus,
    pub compliance: Compliance,
    pub prediction: QualityPrediction,
    pub violations: Vec<ViolationTag>,
    pub spend: f64,
    pub ctr: f64,
    /// Account of the latest task, or the material's own when it has none.
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    pub created_on: NaiveDate,
    pub known_material: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ResultItem {
    fn from_material(material: &Material, latest: Option<&AuditTask>) -> Self {
        let mut item = Self {
            material_id: material.id.clone(),
            name: Some(material.name.clone()),
            content_type: Some(material.content_type),
            status: material.status,
            compliance: material.compliance,
            prediction: material.prediction,
            violations: material.violations.clone(),
            spend: material.spend,
            ctr: material.ctr,
            account_id: material.account_id.clone(),
            uploader: Some(material.uploader.clone()),
            created_on: material.created_on,
            known_material: true,
            task_id: None,
            task_status: None,
            verdict: None,
            reason: None,
            request_trace_id: None,
            resolved_at: None,
        };
        if let Some(task) = latest {
            item.attach(task);
        }
        item
    }

    fn from_task(task: &AuditTask) -> Self {
        let verdict = task.verdict();
        let (status, compliance) = match (task.status, verdict) {
            (TaskStatus::Completed, Some(verdict)) => (verdict.material_status(), verdict.compliance()),
            (TaskStatus::Pending, _) => (MaterialStatus::Testing, Compliance::Pending),
            _ => (MaterialStatus::Pending, Compliance::Pending),
        };
        let violations = match compliance {
            Compliance::Failed => task
                .resolution
                .as_ref()
                .map(|r| r.violations.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        let mut item = Self {
            material_id: task.material_id.clone(),
            name: None,
            content_type: None,
            status,
            compliance,
            prediction: QualityPrediction::Pending,
            violations,
            spend: 0.0,
            ctr: 0.0,
            account_id: task.account_id.clone(),
            uploader: None,
            created_on: task.created_at.date_naive(),
            known_material: false,
            task_id: None,
            task_status: None,
            verdict: None,
            reason: None,
            request_trace_id: None,
            resolved_at: None,
        };
        item.attach(task);
        item
    }

    fn attach(&mut self, task: &AuditTask) {
        self.account_id = task.account_id.clone();
        self.task_id = Some(task.id);
        self.task_status = Some(task.status);
        self.verdict = task.verdict();
        self.reason = task.resolution.as_ref().map(|r| r.reason.clone());
        self.request_trace_id = Some(task.request_trace_id.clone());
        self.resolved_at = task.resolved_at;
    }
}

/// Every row in store order: catalog materials first, then task-only
/// subjects in first-submission order.
#[must_use]
pub fn result_rows(state: &AuditState) -> Vec<ResultItem> {
    let tasks = state.tasks();
    let materials = state.materials();
    let catalog = materials
        .list()
        .map(|material| ResultItem::from_material(material, tasks.latest_for_material(&material.id)));
    let task_only = tasks
        .subjects()
        .filter(|id| !materials.contains(id))
        .filter_map(|id| tasks.latest_for_material(id))
        .map(ResultItem::from_task);
    catalog.chain(task_only).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaudit_store::NewMaterial;
    use adaudit_utils::test_support::fixed_epoch;
    use adaudit_utils::types::OperationKind;

    fn task(id: u64, account: &str, material: &str) -> AuditTask {
        AuditTask::new_pending(
            TaskId::new(id),
            account.to_string(),
            MaterialId::parse(material).unwrap(),
            OperationKind::Single,
            None,
            fixed_epoch(),
            format!("req_{id}_{material}"),
        )
    }

    #[test]
    fn test_catalog_rows_precede_task_only_rows() {
        let mut state = AuditState::new();
        let known = state.insert_material(NewMaterial {
            name: "Banner".to_string(),
            content_type: ContentType::Image,
            account_id: "client-a".to_string(),
            uploader: "ops".to_string(),
            created_on: fixed_epoch().date_naive(),
        })
        .unwrap();
        state.register_task(task(1, "acct-9", "zzz")).unwrap();
        state.register_task(task(2, "acct-1", known.as_str())).unwrap();

        let rows = result_rows(&state);
        let ids: Vec<_> = rows.iter().map(|r| r.material_id.as_str()).collect();
        assert_eq!(ids, [known.as_str(), "zzz"]);

        assert!(rows[0].known_material);
        assert_eq!(rows[0].account_id, "acct-1");
        assert_eq!(rows[0].status, MaterialStatus::Testing);
        assert_eq!(rows[0].task_id, Some(TaskId::new(2)));

        assert!(!rows[1].known_material);
        assert_eq!(rows[1].status, MaterialStatus::Testing);
        assert_eq!(rows[1].compliance, Compliance::Pending);
        assert!(rows[1].name.is_none());
    }

    #[test]
    fn test_untasked_material_keeps_own_account() {
        let mut state = AuditState::new();
        state.insert_material(NewMaterial {
            name: "Copy".to_string(),
            content_type: ContentType::Text,
            account_id: "client-b".to_string(),
            uploader: "ops".to_string(),
            created_on: fixed_epoch().date_naive(),
        })
        .unwrap();
        let rows = result_rows(&state);
        assert_eq!(rows[0].account_id, "client-b");
        assert!(rows[0].task_id.is_none());
    }

    #[test]
    fn test_task_only_row_reflects_failed_verdict() {
        let mut state = AuditState::new();
        state.register_task(task(1, "acct-1", "42")).unwrap();
        state
            .apply_verdict(
                TaskId::new(1),
                Verdict::Failed,
                "policy".to_string(),
                vec![ViolationTag::PolicyBreach],
                fixed_epoch(),
            )
            .unwrap();
        let row = &result_rows(&state)[0];
        assert_eq!(row.compliance, Compliance::Failed);
        assert_eq!(row.status, MaterialStatus::Flagged);
        assert_eq!(row.violations, [ViolationTag::PolicyBreach]);
        assert_eq!(row.verdict, Some(Verdict::Failed));
    }

    #[test]
    fn test_row_serializes_camel_case() {
        let mut state = AuditState::new();
        state.register_task(task(1, "acct-1", "42")).unwrap();
        let json = serde_json::to_value(&result_rows(&state)[0]).unwrap();
        assert_eq!(json["materialId"], "42");
        assert_eq!(json["taskStatus"], "pending");
        assert_eq!(json["knownMaterial"], false);
        assert!(json.get("name").is_none());
    }
}
