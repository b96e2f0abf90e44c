//! Catalog routes.
//!
//! - `GET /materials?accountId&type` - catalog in insertion order, optionally
//!   narrowed to one account and/or content type
//! - `GET /materials/:id` - one material
//! - `POST /materials` - register a material's metadata in the pending state

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use adaudit_store::{Material, NewMaterial};
use adaudit_utils::types::ContentType;

use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

const DEFAULT_ACCOUNT: &str = "system";
const DEFAULT_UPLOADER: &str = "admin";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/materials", get(list_materials).post(register_material))
        .route("/materials/:id", get(get_material))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialsQuery {
    pub account_id: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMaterialRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub account_id: Option<String>,
    pub uploader: Option<String>,
}

async fn list_materials(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MaterialsQuery>, QueryRejection>,
) -> ApiResult<Envelope<Vec<Material>>> {
    let Query(query) = query?;
    let account_id = non_blank(query.account_id);
    let content_type = non_blank(query.content_type)
        .map(|raw| raw.parse::<ContentType>())
        .transpose()?;
    let materials = state
        .orchestrator
        .materials()?
        .into_iter()
        .filter(|m| account_id.as_deref().is_none_or(|wanted| m.account_id == wanted))
        .filter(|m| content_type.is_none_or(|wanted| m.content_type == wanted))
        .collect();
    Ok(Envelope::ok(materials))
}

async fn get_material(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Material>> {
    Ok(Envelope::ok(state.orchestrator.material(&id)?))
}

async fn register_material(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterMaterialRequest>, JsonRejection>,
) -> ApiResult<Envelope<Material>> {
    let Json(request) = body?;
    let name = non_blank(request.name)
        .ok_or_else(|| ApiError::bad_request("name is required"))?;
    let content_type = match request.content_type.as_deref() {
        Some(raw) => raw.parse::<ContentType>()?,
        None => return Err(ApiError::bad_request("type is required")),
    };
    let new = NewMaterial {
        name,
        content_type,
        account_id: non_blank(request.account_id).unwrap_or_else(|| DEFAULT_ACCOUNT.to_string()),
        uploader: non_blank(request.uploader).unwrap_or_else(|| DEFAULT_UPLOADER.to_string()),
        created_on: state.orchestrator.now().date_naive(),
    };
    let id = state.orchestrator.register_material(new)?;
    tracing::info!(material_id = %id, "Material registered");
    Ok(Envelope::with_message(
        "Material registered",
        state.orchestrator.material(id.as_str())?,
    ))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
