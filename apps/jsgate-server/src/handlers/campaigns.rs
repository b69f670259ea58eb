use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use jsgate_core::model::{CampaignStatus, PopunderCampaign, PopunderSettings};
use jsgate_core::popunder::{slugify, validate_settings};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{load_campaign, load_project};
use crate::AppState;
use crate::error::{ApiError, ApiResult};

/// Upper bound on `-N` suffixes tried before giving up on a free slug.
const MAX_SLUG_ATTEMPTS: u32 = 100;

#[derive(Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub settings: PopunderSettings,
}

#[derive(Deserialize, Default)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub status: Option<CampaignStatus>,
    pub settings: Option<PopunderSettings>,
}

#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    #[serde(flatten)]
    pub campaign: PopunderCampaign,
    pub url: String,
}

fn respond(campaign: PopunderCampaign, project_slug: &str) -> CampaignResponse {
    let url = campaign.public_url(project_slug);
    CampaignResponse { campaign, url }
}

fn clean_name(raw: &str) -> ApiResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Campaign name is required".to_string()));
    }
    Ok(name.to_string())
}

async fn free_slug(state: &AppState, project_id: i64, name: &str) -> ApiResult<String> {
    let base = slugify(name);
    let campaigns = &state.repos.campaigns;
    if campaigns.find_by_slug(project_id, &base).await?.is_none() {
        return Ok(base);
    }
    for n in 2..MAX_SLUG_ATTEMPTS {
        let candidate = format!("{}-{}", base, n);
        if campaigns.find_by_slug(project_id, &candidate).await?.is_none() {
            return Ok(candidate);
        }
    }
    Err(ApiError::Conflict(format!("No free slug for campaign '{}'", name)))
}

pub async fn list_campaigns(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<Vec<CampaignResponse>>> {
    let project = load_project(&state, project_id).await?;
    let campaigns = state.repos.campaigns.list_for_project(project.id).await?;
    Ok(Json(
        campaigns
            .into_iter()
            .map(|c| respond(c, &project.slug))
            .collect(),
    ))
}

pub async fn create_campaign(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Json(req): Json<CreateCampaignRequest>,
) -> ApiResult<(StatusCode, Json<CampaignResponse>)> {
    let project = load_project(&state, project_id).await?;
    let name = clean_name(&req.name)?;
    let settings = validate_settings(&req.settings)?;
    let slug = free_slug(&state, project.id, &name).await?;

    let campaign = state
        .repos
        .campaigns
        .insert(project.id, &name, &slug, &settings)
        .await?;
    info!("Created popunder campaign {} in project {}", campaign.slug, project.slug);
    Ok((StatusCode::CREATED, Json(respond(campaign, &project.slug))))
}

pub async fn get_campaign(
    State(state): State<AppState>,
    Path((project_id, campaign_id)): Path<(i64, i64)>,
) -> ApiResult<Json<CampaignResponse>> {
    let project = load_project(&state, project_id).await?;
    let campaign = load_campaign(&state, project.id, campaign_id).await?;
    Ok(Json(respond(campaign, &project.slug)))
}

/// The slug is fixed at creation so published URLs keep working.
pub async fn update_campaign(
    State(state): State<AppState>,
    Path((project_id, campaign_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateCampaignRequest>,
) -> ApiResult<Json<CampaignResponse>> {
    let project = load_project(&state, project_id).await?;
    let mut campaign = load_campaign(&state, project.id, campaign_id).await?;

    if let Some(raw) = req.name {
        campaign.name = clean_name(&raw)?;
    }
    if let Some(status) = req.status {
        campaign.status = status;
    }
    if let Some(settings) = req.settings {
        campaign.settings = validate_settings(&settings)?;
    }

    state.repos.campaigns.update(&campaign).await?;
    Ok(Json(respond(campaign, &project.slug)))
}

pub async fn delete_campaign(
    State(state): State<AppState>,
    Path((project_id, campaign_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    let project = load_project(&state, project_id).await?;
    if !state.repos.campaigns.delete(project.id, campaign_id).await? {
        return Err(ApiError::NotFound("Campaign not found".to_string()));
    }
    info!("Deleted popunder campaign {} in project {}", campaign_id, project.slug);
    Ok(StatusCode::NO_CONTENT)
}
