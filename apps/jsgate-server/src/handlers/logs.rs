use axum::{
    Json,
    extract::{Path, Query, State},
};
use jsgate_core::analytics::{Tally, summarize};
use jsgate_core::model::AccessLogEntry;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::{load_project, load_script};
use crate::AppState;
use crate::error::{ApiError, ApiResult};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Deserialize, Default)]
pub struct LogParams {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct LogListing {
    pub logs: Vec<AccessLogEntry>,
    pub stats: Tally,
}

pub async fn list_logs(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Query(params): Query<LogParams>,
) -> ApiResult<Json<LogListing>> {
    let project = load_project(&state, project_id).await?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let logs = state.repos.access_logs.recent_for_project(project.id, limit).await?;
    let all = state.repos.access_logs.list_for_project(project.id).await?;

    Ok(Json(LogListing {
        logs,
        stats: summarize(&all),
    }))
}

pub async fn clear_project_logs(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let project = load_project(&state, project_id).await?;
    let deleted = state.repos.access_logs.delete_for_project(project.id).await?;
    info!("Cleared {} access log entries for project {}", deleted, project.slug);
    Ok(Json(json!({ "deleted": deleted })))
}

pub async fn clear_script_logs(
    State(state): State<AppState>,
    Path((project_id, script_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    let script = load_script(&state, project_id, script_id).await?;
    let deleted = state
        .repos
        .access_logs
        .delete_for_script(project_id, script.id)
        .await?;
    info!("Cleared {} access log entries for script {}", deleted, script.id);
    Ok(Json(json!({ "deleted": deleted })))
}

pub async fn delete_log(
    State(state): State<AppState>,
    Path((project_id, log_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    let project = load_project(&state, project_id).await?;
    if !state.repos.access_logs.delete_entry(project.id, log_id).await? {
        return Err(ApiError::NotFound("Log entry not found".to_string()));
    }
    Ok(Json(json!({ "deleted": 1 })))
}
