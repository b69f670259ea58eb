//! Per-request delivery decision for scripts and popunder campaigns.
//!
//! Every failure before a whitelist match (unknown slug, paused project or
//! campaign, disabled script, unreadable headers, storage errors) collapses
//! into the same 200 noop body. Secondary content is only served to a domain
//! that was evaluated and denied.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::matcher::evaluate;
use crate::model::{
    CampaignStatus, NewAccessLog, Project, ProjectStatus, ScriptStatus, WhitelistOwner,
};
use crate::normalize::{domain_header, normalize_domain};
use crate::popunder;
use crate::repo::{CampaignRepo, ProjectRepo, ScriptRepo, WhitelistRepo};
use crate::secondary;

pub const NOOP_JS: &str = "/* unauthorized or inactive */\n/* noop */";
pub const CONTENT_TYPE_JS: &str = "application/javascript; charset=utf-8";
pub const CACHE_CONTROL: &str = "public, max-age=60";
pub const VARY: &str = "Origin, Referer";

/// Which kind of asset the file segment names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssetKind {
    #[default]
    Script,
    Popunder,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryRequest {
    pub kind: AssetKind,
    pub project_slug: String,
    /// Last path segment, e.g. `banner.js`.
    pub file: String,
    pub origin: Option<String>,
    pub referer: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub body: String,
    pub allowed: bool,
    pub matched_domain: Option<String>,
}

impl DeliveryResponse {
    pub fn noop() -> Self {
        Self {
            body: NOOP_JS.to_string(),
            allowed: false,
            matched_domain: None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE_JS
    }

    /// Headers sent with every delivery response, allowed or not.
    pub fn headers(&self) -> [(&'static str, &'static str); 2] {
        [("cache-control", CACHE_CONTROL), ("vary", VARY)]
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub response: DeliveryResponse,
    /// Record to append to the access log. `None` only when the project
    /// could not be resolved.
    pub access: Option<NewAccessLog>,
}

impl DeliveryOutcome {
    fn unlogged() -> Self {
        Self {
            response: DeliveryResponse::noop(),
            access: None,
        }
    }

    fn denied(access: NewAccessLog) -> Self {
        Self {
            response: DeliveryResponse::noop(),
            access: Some(access),
        }
    }
}

/// A servable asset after its status gate passed.
struct Asset {
    owner: WhitelistOwner,
    body: String,
    fallback: Option<String>,
}

#[derive(Clone)]
pub struct DeliveryPipeline {
    projects: Arc<dyn ProjectRepo>,
    scripts: Arc<dyn ScriptRepo>,
    campaigns: Arc<dyn CampaignRepo>,
    whitelist: Arc<dyn WhitelistRepo>,
}

impl DeliveryPipeline {
    pub fn new(
        projects: Arc<dyn ProjectRepo>,
        scripts: Arc<dyn ScriptRepo>,
        campaigns: Arc<dyn CampaignRepo>,
        whitelist: Arc<dyn WhitelistRepo>,
    ) -> Self {
        Self {
            projects,
            scripts,
            campaigns,
            whitelist,
        }
    }

    pub async fn run(&self, req: &DeliveryRequest) -> DeliveryOutcome {
        let Some(slug) = req.file.strip_suffix(".js").filter(|s| !s.is_empty()) else {
            debug!("Delivery: '{}' is not a .js file", req.file);
            return DeliveryOutcome::unlogged();
        };

        let project = match self.projects.find_by_slug(&req.project_slug).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                debug!("Delivery: unknown project '{}'", req.project_slug);
                return DeliveryOutcome::unlogged();
            }
            Err(e) => {
                warn!(
                    "Delivery: project lookup failed for '{}': {:#}",
                    req.project_slug, e
                );
                return DeliveryOutcome::unlogged();
            }
        };

        let raw_domain = domain_header(req.origin.as_deref(), req.referer.as_deref());
        let domain = normalize_domain(raw_domain).ok();
        let mut access = NewAccessLog {
            project_id: project.id,
            script_id: None,
            campaign_id: None,
            domain: domain.clone(),
            referer_url: req.referer.clone().filter(|r| !r.trim().is_empty()),
            ip: req.client_ip.clone(),
            user_agent: req.user_agent.clone(),
            allowed: false,
        };

        if project.status != ProjectStatus::Active {
            debug!("Delivery: project '{}' is {}", project.slug, project.status);
            return DeliveryOutcome::denied(access);
        }

        let asset = match req.kind {
            AssetKind::Script => self.resolve_script(&project, slug, &mut access).await,
            AssetKind::Popunder => self.resolve_campaign(&project, slug, &mut access).await,
        };
        let Some(asset) = asset else {
            return DeliveryOutcome::denied(access);
        };

        if domain.is_none() {
            debug!("Delivery: no usable Origin or Referer for {}", asset.owner);
            return DeliveryOutcome::denied(access);
        }

        let entries = match self.whitelist.active_for(asset.owner).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Delivery: whitelist read failed for {}: {:#}", asset.owner, e);
                return DeliveryOutcome::denied(access);
            }
        };

        let check = evaluate(raw_domain, &entries);
        access.allowed = check.allowed;

        let response = if check.allowed {
            DeliveryResponse {
                body: asset.body,
                allowed: true,
                matched_domain: check.normalized_domain,
            }
        } else {
            DeliveryResponse {
                body: asset.fallback.unwrap_or_else(|| NOOP_JS.to_string()),
                allowed: false,
                matched_domain: None,
            }
        };

        DeliveryOutcome {
            response,
            access: Some(access),
        }
    }

    async fn resolve_script(
        &self,
        project: &Project,
        slug: &str,
        access: &mut NewAccessLog,
    ) -> Option<Asset> {
        let script = match self.scripts.find_by_slug(project.id, slug).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                debug!("Delivery: unknown script '{}/{}'", project.slug, slug);
                return None;
            }
            Err(e) => {
                warn!(
                    "Delivery: script lookup failed for '{}/{}': {:#}",
                    project.slug, slug, e
                );
                return None;
            }
        };
        access.script_id = Some(script.id);

        if script.status != ScriptStatus::Active {
            debug!("Delivery: script '{}/{}' is {}", project.slug, script.slug, script.status);
            return None;
        }

        Some(Asset {
            owner: WhitelistOwner::Script(script.id),
            fallback: script.secondary.as_ref().and_then(secondary::render),
            body: script.js_code,
        })
    }

    async fn resolve_campaign(
        &self,
        project: &Project,
        slug: &str,
        access: &mut NewAccessLog,
    ) -> Option<Asset> {
        let campaign = match self.campaigns.find_by_slug(project.id, slug).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                debug!("Delivery: unknown campaign '{}/{}'", project.slug, slug);
                return None;
            }
            Err(e) => {
                warn!(
                    "Delivery: campaign lookup failed for '{}/{}': {:#}",
                    project.slug, slug, e
                );
                return None;
            }
        };
        access.campaign_id = Some(campaign.id);

        if campaign.status != CampaignStatus::Active {
            debug!(
                "Delivery: campaign '{}/{}' is {}",
                project.slug, campaign.slug, campaign.status
            );
            return None;
        }

        Some(Asset {
            owner: WhitelistOwner::Campaign(campaign.id),
            body: popunder::render(campaign.id, &campaign.settings),
            fallback: None,
        })
    }
}
