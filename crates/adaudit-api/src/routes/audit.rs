//! Audit submission and query routes.
//!
//! - `POST /audit` - submit one material
//! - `GET /audit/:task_id` - poll one task
//! - `POST /audit/batch` - submit a batch
//! - `GET /audit/results` - filtered, paginated result rows
//! - `GET /audit/stats` - aggregates over result rows
//! - `GET /audit/object-result` - provider-style verdict for one material
//!
//! `accessToken` is accepted on submissions for a live provider and is
//! never logged.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use adaudit_orchestrator::Submission;
use adaudit_query::{
    AuditStats, ObjectResult, PageRequest, ResultFilter, ResultItem, object_result,
    query_results, stats,
};
use adaudit_utils::ids::{BatchId, MaterialId, TaskId};
use adaudit_utils::types::{OperationKind, TaskStatus, Verdict, ViolationTag};

use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::routes::{id_value, usize_param};
use crate::server::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/audit", post(submit_audit))
        .route("/audit/batch", post(submit_batch))
        .route("/audit/results", get(list_results))
        .route("/audit/stats", get(get_stats))
        .route("/audit/object-result", get(get_object_result))
        .route("/audit/:task_id", get(get_task))
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAuditRequest {
    pub account_id: Option<Value>,
    pub material_id: Option<Value>,
    pub access_token: Option<String>,
    pub operation_kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAuditResponse {
    pub task_id: TaskId,
    pub request_trace_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBatchRequest {
    pub account_id: Option<Value>,
    pub material_ids: Option<Vec<Value>>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBatchResponse {
    pub batch_id: BatchId,
    pub total_count: usize,
    pub task_ids: Vec<TaskId>,
}

/// Poll view of one task. `verdict` is `null` until the task completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub task_id: TaskId,
    pub material_id: MaterialId,
    pub account_id: String,
    pub operation_kind: OperationKind,
    pub status: TaskStatus,
    pub verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub violations: Vec<ViolationTag>,
    pub request_trace_id: String,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsQuery {
    pub account_id: Option<String>,
    pub status: Option<String>,
    pub date: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<ResultItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub account_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectResultQuery {
    pub account_id: Option<String>,
    pub object_id: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn submit_audit(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitAuditRequest>, JsonRejection>,
) -> ApiResult<Envelope<SubmitAuditResponse>> {
    let Json(request) = body?;
    let account_id = id_value(request.account_id.as_ref(), "accountId")?;
    let material_id = id_value(request.material_id.as_ref(), "materialId")?;
    let kind = match request.operation_kind.as_deref() {
        Some(raw) => raw.parse::<OperationKind>()?,
        None => OperationKind::Single,
    };
    tracing::debug!(
        account_id = %account_id,
        has_access_token = request.access_token.is_some(),
        "Audit submission received"
    );

    let Submission {
        task_id,
        request_trace_id,
        ..
    } = state
        .orchestrator
        .submit_audit(&account_id, &material_id, kind)?;
    Ok(Envelope::with_message(
        "Audit task submitted",
        SubmitAuditResponse {
            task_id,
            request_trace_id,
        },
    ))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<Envelope<TaskView>> {
    let task_id: TaskId = raw_id.parse()?;
    let task = state.orchestrator.task(task_id)?;
    let resolution = task.resolution.as_ref();
    let view = TaskView {
        task_id: task.id,
        material_id: task.material_id.clone(),
        account_id: task.account_id.clone(),
        operation_kind: task.kind,
        status: task.status,
        verdict: task.verdict(),
        reason: resolution.map(|r| r.reason.clone()),
        violations: resolution.map(|r| r.violations.clone()).unwrap_or_default(),
        request_trace_id: task.request_trace_id.clone(),
        attempts: task.attempts,
        created_at: task.created_at,
        resolved_at: task.resolved_at,
        batch_id: task.batch_id,
        error: resolution.and_then(|r| r.error.clone()),
    };
    Ok(Envelope::ok(view))
}

async fn submit_batch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitBatchRequest>, JsonRejection>,
) -> ApiResult<Envelope<SubmitBatchResponse>> {
    let Json(request) = body?;
    let account_id = id_value(request.account_id.as_ref(), "accountId")?;
    let raw_ids = request
        .material_ids
        .ok_or_else(|| ApiError::bad_request("materialIds is required"))?;
    let material_ids = raw_ids
        .iter()
        .enumerate()
        .map(|(index, value)| id_value(Some(value), &format!("materialIds[{index}]")))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(
        account_id = %account_id,
        members = material_ids.len(),
        has_access_token = request.access_token.is_some(),
        "Batch submission received"
    );

    let receipt = state.orchestrator.submit_batch(&account_id, &material_ids)?;
    Ok(Envelope::with_message(
        "Batch audit submitted",
        SubmitBatchResponse {
            batch_id: receipt.batch_id,
            total_count: receipt.total_count(),
            task_ids: receipt.task_ids,
        },
    ))
}

async fn list_results(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ResultsQuery>, QueryRejection>,
) -> ApiResult<Envelope<ResultsResponse>> {
    let Query(query) = query?;
    let filter = ResultFilter::parse(
        query.account_id.as_deref(),
        query.status.as_deref(),
        query.date.as_deref(),
    )?;
    let page = PageRequest::new(
        usize_param(query.page.as_deref(), "page")?.unwrap_or(1),
        usize_param(query.page_size.as_deref(), "pageSize")?.unwrap_or(state.default_page_size),
        state.max_page_size,
    )?;
    let page = state
        .orchestrator
        .read(|snapshot| query_results(snapshot, &filter, page))?;
    Ok(Envelope::ok(ResultsResponse {
        total: page.total,
        page: page.page,
        page_size: page.page_size,
        results: page.items,
    }))
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> ApiResult<Envelope<AuditStats>> {
    let Query(query) = query?;
    let account = query
        .account_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let stats = state.orchestrator.read(|snapshot| stats(snapshot, account))?;
    Ok(Envelope::ok(stats))
}

async fn get_object_result(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ObjectResultQuery>, QueryRejection>,
) -> ApiResult<Envelope<ObjectResult>> {
    let Query(query) = query?;
    let (Some(account_id), Some(object_id)) = (query.account_id, query.object_id) else {
        return Err(ApiError::bad_request(
            "Missing required parameters: accountId, objectId",
        ));
    };
    let now = state.orchestrator.now();
    let result = state
        .orchestrator
        .read(|snapshot| object_result(snapshot, &account_id, &object_id, now))??;
    Ok(Envelope::ok(result))
}
