use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use jsgate_core::dns::VerificationReport;
use jsgate_core::model::CustomDomain;
use jsgate_core::pattern::{WILDCARD_PREFIX, validate_pattern};
use serde::Deserialize;
use tracing::info;

use crate::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
pub struct CreateDomainRequest {
    pub domain: String,
}

#[derive(Deserialize)]
pub struct ActivateRequest {
    pub is_active: bool,
    #[serde(default)]
    pub force: bool,
}

async fn load_domain(state: &AppState, id: i64) -> ApiResult<CustomDomain> {
    state
        .repos
        .custom_domains
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Custom domain not found".to_string()))
}

pub async fn list_domains(State(state): State<AppState>) -> ApiResult<Json<Vec<CustomDomain>>> {
    Ok(Json(state.repos.custom_domains.list().await?))
}

/// Public: hosts currently allowed to front the platform.
pub async fn list_active_domains(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CustomDomain>>> {
    Ok(Json(state.repos.custom_domains.list_active().await?))
}

pub async fn create_domain(
    State(state): State<AppState>,
    Json(req): Json<CreateDomainRequest>,
) -> ApiResult<(StatusCode, Json<CustomDomain>)> {
    let domain = validate_pattern(&req.domain)?;
    if domain.starts_with(WILDCARD_PREFIX) {
        return Err(ApiError::BadRequest(
            "Custom domain must be a concrete host".to_string(),
        ));
    }
    let platform_ip = state.verifier.platform_ip().to_string();
    let record = state.repos.custom_domains.insert(&domain, &platform_ip).await?;
    info!("Registered custom domain {}", record.domain);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn delete_domain(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.repos.custom_domains.delete(id).await? {
        return Err(ApiError::NotFound("Custom domain not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn verify_domain(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<VerificationReport>> {
    let mut record = load_domain(&state, id).await?;
    let report = state.verifier.verify(&record.domain).await;

    record.apply_verification(&report, Utc::now());
    state.repos.custom_domains.save(&record).await?;
    Ok(Json(report))
}

pub async fn activate_domain(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ActivateRequest>,
) -> ApiResult<Json<CustomDomain>> {
    let mut record = load_domain(&state, id).await?;
    record.set_active(req.is_active, req.force)?;
    state.repos.custom_domains.save(&record).await?;

    if req.force && req.is_active {
        info!("Force-activated {} while {}", record.domain, record.status);
    }
    Ok(Json(record))
}
