use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use jsgate_core::analytics::{AnalyticsReport, DEFAULT_TOP_DOMAINS, ReportOptions};
use serde::Deserialize;

use super::{load_project, load_script};
use crate::AppState;
use crate::error::ApiResult;

#[derive(Deserialize, Default)]
pub struct AnalyticsParams {
    pub days: Option<u32>,
    pub top: Option<usize>,
}

impl AnalyticsParams {
    fn options(&self) -> ReportOptions {
        ReportOptions {
            top_domains: self.top.unwrap_or(DEFAULT_TOP_DOMAINS),
            days: self.days,
            now: Utc::now(),
        }
    }
}

pub async fn project_analytics(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Query(params): Query<AnalyticsParams>,
) -> ApiResult<Json<AnalyticsReport>> {
    let project = load_project(&state, project_id).await?;
    let logs = state.repos.access_logs.list_for_project(project.id).await?;
    let scripts = state.repos.scripts.list_for_project(project.id).await?;
    let campaigns = state.repos.campaigns.list_for_project(project.id).await?;

    Ok(Json(AnalyticsReport::build(
        &logs,
        &scripts,
        &campaigns,
        &project.slug,
        params.options(),
    )))
}

pub async fn script_analytics(
    State(state): State<AppState>,
    Path((project_id, script_id)): Path<(i64, i64)>,
    Query(params): Query<AnalyticsParams>,
) -> ApiResult<Json<AnalyticsReport>> {
    let project = load_project(&state, project_id).await?;
    let script = load_script(&state, project.id, script_id).await?;
    let logs = state.repos.access_logs.list_for_script(project.id, script.id).await?;

    Ok(Json(AnalyticsReport::build(
        &logs,
        std::slice::from_ref(&script),
        &[],
        &project.slug,
        params.options(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::handlers::test_support::test_state;
    use jsgate_core::model::{
        CampaignStatus, FrequencyUnit, NewAccessLog, PopunderSettings, ProjectStatus,
        ScriptStatus,
    };

    fn hit(
        project_id: i64,
        script_id: Option<i64>,
        domain: &str,
        allowed: bool,
    ) -> NewAccessLog {
        NewAccessLog {
            project_id,
            script_id,
            campaign_id: None,
            domain: Some(domain.to_string()),
            referer_url: Some(format!("https://{}/", domain)),
            ip: None,
            user_agent: None,
            allowed,
        }
    }

    #[tokio::test]
    async fn project_report_covers_all_scripts() {
        let (state, store) = test_state();
        let pid = store.add_project("Shop", "shop", ProjectStatus::Active);
        let a = store.add_script(pid, "a", "", ScriptStatus::Active, None);
        let b = store.add_script(pid, "b", "", ScriptStatus::Active, None);
        let now = Utc::now();
        store.append_at(hit(pid, Some(a), "good.com", true), now);
        store.append_at(hit(pid, Some(a), "bad.com", false), now);
        store.append_at(hit(pid, Some(b), "bad.com", false), now);

        let Json(report) = project_analytics(
            State(state),
            Path(pid),
            Query(AnalyticsParams {
                days: Some(7),
                top: Some(1),
            }),
        )
        .await
        .unwrap();

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.denied, 2);
        assert_eq!(report.top_domains.len(), 1);
        assert_eq!(report.top_domains[0].domain, "bad.com");
        assert_eq!(report.blacklisted_domains.len(), 1);
        assert_eq!(report.by_script.len(), 2);
        assert_eq!(report.by_script[0].script_url.as_deref(), Some("/api/js/shop/a.js"));
        assert_eq!(report.daily.len(), 1);
    }

    #[tokio::test]
    async fn script_report_is_filtered() {
        let (state, store) = test_state();
        let pid = store.add_project("Shop", "shop", ProjectStatus::Active);
        let a = store.add_script(pid, "a", "", ScriptStatus::Active, None);
        let b = store.add_script(pid, "b", "", ScriptStatus::Active, None);
        store.append_at(hit(pid, Some(a), "good.com", true), Utc::now());
        store.append_at(hit(pid, Some(b), "bad.com", false), Utc::now());

        let params = Query(AnalyticsParams::default());
        let Json(report) = script_analytics(State(state.clone()), Path((pid, a)), params)
            .await
            .unwrap();
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.summary.allowed, 1);

        let params = Query(AnalyticsParams::default());
        let missing = project_analytics(State(state), Path(999), params).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn project_report_lists_campaigns() {
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
        let popunder = NewAccessLog {
            campaign_id: Some(cid),
            ..hit(pid, None, "allowed.com", true)
        };
        store.append_at(popunder, Utc::now());

        let params = Query(AnalyticsParams::default());
        let Json(report) = project_analytics(State(state), Path(pid), params).await.unwrap();
        assert_eq!(report.summary.total, 1);
        assert!(report.by_script.is_empty());
        assert_eq!(report.by_campaign.len(), 1);
        assert_eq!(report.by_campaign[0].campaign_url, "/api/js/popunder/promo/spring.js");
        assert_eq!(report.by_campaign[0].counts.allowed, 1);
    }
}
