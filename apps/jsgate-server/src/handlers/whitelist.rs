use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use jsgate_core::model::{WhitelistEntry, WhitelistOwner};
use jsgate_core::pattern::validate_pattern;
use serde::Deserialize;
use tracing::info;

use super::{load_campaign, load_script};
use crate::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
pub struct CreateEntryRequest {
    pub pattern: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateEntryRequest {
    pub pattern: Option<String>,
    pub is_active: Option<bool>,
}

async fn script_owner(state: &AppState, project_id: i64, id: i64) -> ApiResult<WhitelistOwner> {
    let script = load_script(state, project_id, id).await?;
    Ok(WhitelistOwner::Script(script.id))
}

async fn campaign_owner(state: &AppState, project_id: i64, id: i64) -> ApiResult<WhitelistOwner> {
    let campaign = load_campaign(state, project_id, id).await?;
    Ok(WhitelistOwner::Campaign(campaign.id))
}

async fn list(state: &AppState, owner: WhitelistOwner) -> ApiResult<Json<Vec<WhitelistEntry>>> {
    Ok(Json(state.repos.whitelist.list_for(owner).await?))
}

/// Uniqueness is left to the store, so two concurrent creates of the same
/// pattern end in one entry and one 409.
async fn create(
    state: &AppState,
    owner: WhitelistOwner,
    req: CreateEntryRequest,
) -> ApiResult<(StatusCode, Json<WhitelistEntry>)> {
    let pattern = validate_pattern(&req.pattern)?;
    let entry = state.repos.whitelist.insert(owner, &pattern).await?;
    info!("Whitelisted '{}' for {}", entry.pattern, owner);
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn update(
    state: &AppState,
    owner: WhitelistOwner,
    entry_id: i64,
    req: UpdateEntryRequest,
) -> ApiResult<Json<WhitelistEntry>> {
    let mut entry = state
        .repos
        .whitelist
        .get(owner, entry_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Whitelist entry not found".to_string()))?;

    if let Some(raw) = req.pattern {
        entry.pattern = validate_pattern(&raw)?;
    }
    if let Some(active) = req.is_active {
        entry.is_active = active;
    }

    state.repos.whitelist.update(&entry).await?;
    Ok(Json(entry))
}

async fn delete(state: &AppState, owner: WhitelistOwner, entry_id: i64) -> ApiResult<StatusCode> {
    if !state.repos.whitelist.delete(owner, entry_id).await? {
        return Err(ApiError::NotFound("Whitelist entry not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_entries(
    State(state): State<AppState>,
    Path((project_id, script_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Vec<WhitelistEntry>>> {
    let owner = script_owner(&state, project_id, script_id).await?;
    list(&state, owner).await
}

pub async fn create_entry(
    State(state): State<AppState>,
    Path((project_id, script_id)): Path<(i64, i64)>,
    Json(req): Json<CreateEntryRequest>,
) -> ApiResult<(StatusCode, Json<WhitelistEntry>)> {
    let owner = script_owner(&state, project_id, script_id).await?;
    create(&state, owner, req).await
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path((project_id, script_id, entry_id)): Path<(i64, i64, i64)>,
    Json(req): Json<UpdateEntryRequest>,
) -> ApiResult<Json<WhitelistEntry>> {
    let owner = script_owner(&state, project_id, script_id).await?;
    update(&state, owner, entry_id, req).await
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path((project_id, script_id, entry_id)): Path<(i64, i64, i64)>,
) -> ApiResult<StatusCode> {
    let owner = script_owner(&state, project_id, script_id).await?;
    delete(&state, owner, entry_id).await
}

pub async fn list_campaign_entries(
    State(state): State<AppState>,
    Path((project_id, campaign_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Vec<WhitelistEntry>>> {
    let owner = campaign_owner(&state, project_id, campaign_id).await?;
    list(&state, owner).await
}

pub async fn create_campaign_entry(
    State(state): State<AppState>,
    Path((project_id, campaign_id)): Path<(i64, i64)>,
    Json(req): Json<CreateEntryRequest>,
) -> ApiResult<(StatusCode, Json<WhitelistEntry>)> {
    let owner = campaign_owner(&state, project_id, campaign_id).await?;
    create(&state, owner, req).await
}

pub async fn update_campaign_entry(
    State(state): State<AppState>,
    Path((project_id, campaign_id, entry_id)): Path<(i64, i64, i64)>,
    Json(req): Json<UpdateEntryRequest>,
) -> ApiResult<Json<WhitelistEntry>> {
    let owner = campaign_owner(&state, project_id, campaign_id).await?;
    update(&state, owner, entry_id, req).await
}

pub async fn delete_campaign_entry(
    State(state): State<AppState>,
    Path((project_id, campaign_id, entry_id)): Path<(i64, i64, i64)>,
) -> ApiResult<StatusCode> {
    let owner = campaign_owner(&state, project_id, campaign_id).await?;
    delete(&state, owner, entry_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::test_state;
    use anyhow::Result;
    use async_trait::async_trait;
    use jsgate_core::memory::MemoryStore;
    use jsgate_core::model::{
        CampaignStatus, FrequencyUnit, PopunderSettings, ProjectStatus, ScriptStatus,
    };
    use jsgate_core::repo::WhitelistRepo;
    use std::sync::Arc;

    fn seeded() -> (AppState, Arc<MemoryStore>, i64, i64) {
        let (state, store) = test_state();
        let pid = store.add_project("Shop", "shop", ProjectStatus::Active);
        let sid = store.add_script(pid, "banner", "", ScriptStatus::Active, None);
        (state, store, pid, sid)
    }

    async fn create(
        state: &AppState,
        pid: i64,
        sid: i64,
        pattern: &str,
    ) -> ApiResult<WhitelistEntry> {
        create_entry(
            State(state.clone()),
            Path((pid, sid)),
            Json(CreateEntryRequest {
                pattern: pattern.to_string(),
            }),
        )
        .await
        .map(|(_, Json(entry))| entry)
    }

    /// Another writer lands the same pattern between the handler's
    /// validation and its insert.
    struct RacingWhitelist(Arc<MemoryStore>);

    #[async_trait]
    impl WhitelistRepo for RacingWhitelist {
        async fn active_for(&self, owner: WhitelistOwner) -> Result<Vec<WhitelistEntry>> {
            self.0.active_for(owner).await
        }
        async fn list_for(&self, owner: WhitelistOwner) -> Result<Vec<WhitelistEntry>> {
            self.0.list_for(owner).await
        }
        async fn get(&self, owner: WhitelistOwner, id: i64) -> Result<Option<WhitelistEntry>> {
            WhitelistRepo::get(&*self.0, owner, id).await
        }
        async fn exists(&self, _owner: WhitelistOwner, _pattern: &str) -> Result<bool> {
            Ok(false)
        }
        async fn insert(&self, owner: WhitelistOwner, pattern: &str) -> Result<WhitelistEntry> {
            WhitelistRepo::insert(&*self.0, owner, pattern).await?;
            WhitelistRepo::insert(&*self.0, owner, pattern).await
        }
        async fn update(&self, entry: &WhitelistEntry) -> Result<()> {
            WhitelistRepo::update(&*self.0, entry).await
        }
        async fn delete(&self, owner: WhitelistOwner, id: i64) -> Result<bool> {
            WhitelistRepo::delete(&*self.0, owner, id).await
        }
    }

    #[tokio::test]
    async fn stores_normalized_pattern() {
        let (state, _, pid, sid) = seeded();
        let entry = create(&state, pid, sid, "  *.Example.COM ").await.unwrap();
        assert_eq!(entry.pattern, "*.example.com");
        assert_eq!(entry.owner, WhitelistOwner::Script(sid));
        assert!(entry.is_active);

        let Json(all) = list_entries(State(state.clone()), Path((pid, sid))).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_and_duplicate_patterns() {
        let (state, _, pid, sid) = seeded();

        match create(&state, pid, sid, "https://example.com").await {
            Err(ApiError::BadRequest(reason)) => {
                assert_eq!(reason, "Domain pattern must not contain protocol or path")
            }
            other => panic!("unexpected {other:?}"),
        }

        create(&state, pid, sid, "example.com").await.unwrap();
        match create(&state, pid, sid, "EXAMPLE.com").await {
            Err(ApiError::Conflict(msg)) => {
                assert_eq!(msg, "Domain pattern 'example.com' already exists")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_duplicate_is_conflict_not_500() {
        let (mut state, store, pid, sid) = seeded();
        state.repos.whitelist = Arc::new(RacingWhitelist(store.clone()));

        let result = create(&state, pid, sid, "example.com").await;
        assert!(matches!(result, Err(ApiError::Conflict(_))), "{result:?}");
        let owner = WhitelistOwner::Script(sid);
        assert_eq!(store.list_for(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn toggles_and_edits_entries() {
        let (state, _, pid, sid) = seeded();
        let entry = create(&state, pid, sid, "a.example.com").await.unwrap();
        create(&state, pid, sid, "b.example.com").await.unwrap();

        let Json(updated) = update_entry(
            State(state.clone()),
            Path((pid, sid, entry.id)),
            Json(UpdateEntryRequest {
                is_active: Some(false),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert!(!updated.is_active);
        let active = state.repos.whitelist.active_for(WhitelistOwner::Script(sid)).await;
        assert_eq!(active.unwrap().len(), 1);

        let clash = update_entry(
            State(state.clone()),
            Path((pid, sid, entry.id)),
            Json(UpdateEntryRequest {
                pattern: Some("b.example.com".into()),
                ..Default::default()
            }),
        )
        .await;
        assert!(matches!(clash, Err(ApiError::Conflict(_))));

        let bad = update_entry(
            State(state.clone()),
            Path((pid, sid, entry.id)),
            Json(UpdateEntryRequest {
                pattern: Some("*.*.example.com".into()),
                ..Default::default()
            }),
        )
        .await;
        assert!(matches!(bad, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn delete_is_scoped_to_script() {
        let (state, store, pid, sid) = seeded();
        let other = store.add_script(pid, "other", "", ScriptStatus::Active, None);
        let entry = create(&state, pid, sid, "example.com").await.unwrap();

        let wrong = delete_entry(State(state.clone()), Path((pid, other, entry.id))).await;
        assert!(matches!(wrong, Err(ApiError::NotFound(_))));

        let ok = delete_entry(State(state.clone()), Path((pid, sid, entry.id))).await.unwrap();
        assert_eq!(ok, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn campaign_whitelist_is_separate_from_scripts() {
        let (state, store, pid, sid) = seeded();
        let settings = PopunderSettings {
            target_url: "https://target.com".into(),
            frequency: 1,
            frequency_unit: FrequencyUnit::Day,
            delay: 0,
            width: None,
            height: None,
        };
        let cid = store.add_campaign(pid, "spring", CampaignStatus::Active, settings);
        create(&state, pid, sid, "example.com").await.unwrap();

        let (status, Json(entry)) = create_campaign_entry(
            State(state.clone()),
            Path((pid, cid)),
            Json(CreateEntryRequest {
                pattern: "example.com".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(entry.owner, WhitelistOwner::Campaign(cid));

        let Json(listed) = list_campaign_entries(State(state.clone()), Path((pid, cid)))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        // The script's entry id is not reachable through the campaign.
        let script_entry = list_entries(State(state.clone()), Path((pid, sid))).await.unwrap().0;
        let wrong =
            delete_campaign_entry(State(state.clone()), Path((pid, cid, script_entry[0].id)))
                .await;
        assert!(matches!(wrong, Err(ApiError::NotFound(_))));

        let missing = list_campaign_entries(State(state), Path((pid, 999))).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }
}
