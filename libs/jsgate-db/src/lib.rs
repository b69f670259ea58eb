//! Postgres storage for the repository traits in `jsgate-core`.

pub mod db;
pub mod models;
pub mod repositories;

pub use db::init_db;
pub use sqlx;

use std::sync::Arc;

use jsgate_core::repo::{
    AccessLogRepo, CampaignRepo, CustomDomainRepo, ProjectRepo, ScriptRepo, WhitelistRepo,
};
use repositories::{
    AccessLogRepository, CampaignRepository, CustomDomainRepository, ProjectRepository,
    ScriptRepository, WhitelistRepository,
};
use sqlx::PgPool;

/// One handle per repository trait, all sharing the same pool.
#[derive(Clone)]
pub struct Repositories {
    pub projects: Arc<dyn ProjectRepo>,
    pub scripts: Arc<dyn ScriptRepo>,
    pub campaigns: Arc<dyn CampaignRepo>,
    pub whitelist: Arc<dyn WhitelistRepo>,
    pub access_logs: Arc<dyn AccessLogRepo>,
    pub custom_domains: Arc<dyn CustomDomainRepo>,
}

impl Repositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            projects: Arc::new(ProjectRepository::new(pool.clone())),
            scripts: Arc::new(ScriptRepository::new(pool.clone())),
            campaigns: Arc::new(CampaignRepository::new(pool.clone())),
            whitelist: Arc::new(WhitelistRepository::new(pool.clone())),
            access_logs: Arc::new(AccessLogRepository::new(pool.clone())),
            custom_domains: Arc::new(CustomDomainRepository::new(pool)),
        }
    }
}
