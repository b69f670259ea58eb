use axum::{
    Json,
    extract::{Path, State},
};
use jsgate_core::matcher::evaluate;
use jsgate_core::model::WhitelistOwner;
use serde::{Deserialize, Serialize};

use super::{load_campaign, load_script};
use crate::AppState;
use crate::error::ApiResult;

#[derive(Deserialize)]
pub struct TestDomainRequest {
    pub domain: String,
}

#[derive(Debug, Serialize)]
pub struct TestDomainResponse {
    pub domain: String,
    pub normalized_domain: Option<String>,
    pub allowed: bool,
    pub matched_patterns: Vec<String>,
    pub active_patterns_count: usize,
}

/// Runs an arbitrary domain through the same check delivery uses, without
/// serving anything or writing a log entry.
async fn check(
    state: &AppState,
    owner: WhitelistOwner,
    req: TestDomainRequest,
) -> ApiResult<Json<TestDomainResponse>> {
    let entries = state.repos.whitelist.active_for(owner).await?;
    let check = evaluate(&req.domain, &entries);

    Ok(Json(TestDomainResponse {
        domain: req.domain,
        normalized_domain: check.normalized_domain,
        allowed: check.allowed,
        matched_patterns: check.matched_patterns,
        active_patterns_count: check.active_patterns_count,
    }))
}

pub async fn test_domain(
    State(state): State<AppState>,
    Path((project_id, script_id)): Path<(i64, i64)>,
    Json(req): Json<TestDomainRequest>,
) -> ApiResult<Json<TestDomainResponse>> {
    let script = load_script(&state, project_id, script_id).await?;
    check(&state, WhitelistOwner::Script(script.id), req).await
}

pub async fn test_campaign_domain(
    State(state): State<AppState>,
    Path((project_id, campaign_id)): Path<(i64, i64)>,
    Json(req): Json<TestDomainRequest>,
) -> ApiResult<Json<TestDomainResponse>> {
    let campaign = load_campaign(&state, project_id, campaign_id).await?;
    check(&state, WhitelistOwner::Campaign(campaign.id), req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::handlers::test_support::test_state;
    use jsgate_core::model::{
        CampaignStatus, FrequencyUnit, PopunderSettings, ProjectStatus, ScriptStatus,
    };

    fn request(domain: &str) -> Json<TestDomainRequest> {
        Json(TestDomainRequest {
            domain: domain.to_string(),
        })
    }

    async fn run(
        state: &AppState,
        pid: i64,
        sid: i64,
        domain: &str,
    ) -> ApiResult<Json<TestDomainResponse>> {
        test_domain(State(state.clone()), Path((pid, sid)), request(domain)).await
    }

    #[tokio::test]
    async fn reports_matches_and_counts() {
        let (state, store) = test_state();
        let pid = store.add_project("Shop", "shop", ProjectStatus::Active);
        let sid = store.add_script(pid, "banner", "", ScriptStatus::Active, None);
        let owner = WhitelistOwner::Script(sid);
        store.add_whitelist(owner, "*.example.com", true);
        store.add_whitelist(owner, "app.example.com", true);
        store.add_whitelist(owner, "old.example.com", false);

        let Json(res) = run(&state, pid, sid, "https://App.Example.com:8443/x").await.unwrap();
        assert!(res.allowed);
        assert_eq!(res.normalized_domain.as_deref(), Some("app.example.com"));
        assert_eq!(res.matched_patterns, vec!["*.example.com", "app.example.com"]);
        assert_eq!(res.active_patterns_count, 2);

        let Json(res) = run(&state, pid, sid, "example.com").await.unwrap();
        assert!(!res.allowed);
        assert!(res.matched_patterns.is_empty());

        let Json(res) = run(&state, pid, sid, "").await.unwrap();
        assert!(!res.allowed);
        assert_eq!(res.normalized_domain, None);
        assert_eq!(store.log_count(), 0);
    }

    #[tokio::test]
    async fn script_must_belong_to_project() {
        let (state, store) = test_state();
        let a = store.add_project("A", "a", ProjectStatus::Active);
        let b = store.add_project("B", "b", ProjectStatus::Active);
        let sid = store.add_script(a, "s", "", ScriptStatus::Active, None);

        let err = run(&state, b, sid, "example.com").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn campaign_check_uses_campaign_whitelist() {
        let (state, store) = test_state();
        let pid = store.add_project("Promo", "promo", ProjectStatus::Active);
        let settings = PopunderSettings {
            target_url: "https://target.com".into(),
            frequency: 1,
            frequency_unit: FrequencyUnit::Day,
            delay: 0,
            width: None,
            height: None,
        };
        let cid = store.add_campaign(pid, "spring", CampaignStatus::Active, settings);
        let sid = store.add_script(pid, "banner", "", ScriptStatus::Active, None);
        store.add_whitelist(WhitelistOwner::Campaign(cid), "allowed.com", true);
        store.add_whitelist(WhitelistOwner::Script(sid), "script-only.com", true);

        let path = Path((pid, cid));
        let Json(res) = test_campaign_domain(State(state.clone()), path, request("allowed.com"))
            .await
            .unwrap();
        assert!(res.allowed);
        assert_eq!(res.active_patterns_count, 1);

        let path = Path((pid, cid));
        let Json(res) = test_campaign_domain(State(state), path, request("script-only.com"))
            .await
            .unwrap();
        assert!(!res.allowed);
    }
}
