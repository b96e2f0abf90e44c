use chrono::{DateTime, Utc};
use serde::Serialize;

use adaudit_store::AuditState;
use adaudit_utils::error::AuditError;
use adaudit_utils::ids::{MaterialId, request_trace_id};
use adaudit_utils::types::Compliance;

use crate::row::result_rows;

/// Provider-style verdict code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectStatus {
    Approve,
    Reject,
    Auditing,
}

impl ObjectStatus {
    fn from_compliance(compliance: Compliance) -> Self {
        match compliance {
            Compliance::Passed => Self::Approve,
            Compliance::Failed => Self::Reject,
            Compliance::Pending => Self::Auditing,
        }
    }

    fn reason_text(self) -> &'static str {
        match self {
            Self::Approve => "Material approved: meets advertising standards",
            Self::Reject => "Material contains violating content and does not meet advertising standards",
            Self::Auditing => "Material is under review, please wait",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectResult {
    pub status: ObjectStatus,
    pub reason_text: String,
    pub request_id: String,
}

/// Audit result for one material in the shape a provider reports it.
///
/// The account id is required but does not narrow the lookup: a material
/// has one compliance record whichever account asks. Materials with no
/// record at all report `AUDITING`.
///
/// # Errors
///
/// `InvalidArgument` when either id is blank.
pub fn object_result(
    state: &AuditState,
    account_id: &str,
    material_id: &str,
    now: DateTime<Utc>,
) -> Result<ObjectResult, AuditError> {
    if account_id.trim().is_empty() {
        return Err(AuditError::invalid_argument("accountId must not be empty"));
    }
    let material_id = MaterialId::parse(material_id)
        .map_err(|_| AuditError::invalid_argument("objectId must not be empty"))?;

    let row = result_rows(state)
        .into_iter()
        .find(|row| row.material_id == material_id);
    let status = row
        .as_ref()
        .map_or(ObjectStatus::Auditing, |row| ObjectStatus::from_compliance(row.compliance));
    let request_id = row
        .and_then(|row| row.request_trace_id)
        .unwrap_or_else(|| request_trace_id(now, &material_id));

    Ok(ObjectResult {
        status,
        reason_text: status.reason_text().to_string(),
        request_id,
    })
}
