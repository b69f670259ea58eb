//! Storage seams. Postgres implementations live in `jsgate-db`; the
//! in-memory ones in [`crate::memory`].

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{
    AccessLogEntry, CustomDomain, NewAccessLog, PopunderCampaign, PopunderSettings, Project,
    Script, WhitelistEntry, WhitelistOwner,
};

#[async_trait]
pub trait ProjectRepo: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Project>>;
    async fn get(&self, id: i64) -> Result<Option<Project>>;
}

#[async_trait]
pub trait ScriptRepo: Send + Sync {
    async fn find_by_slug(&self, project_id: i64, slug: &str) -> Result<Option<Script>>;
    async fn get(&self, project_id: i64, id: i64) -> Result<Option<Script>>;
    async fn list_for_project(&self, project_id: i64) -> Result<Vec<Script>>;
}

#[async_trait]
pub trait CampaignRepo: Send + Sync {
    async fn find_by_slug(&self, project_id: i64, slug: &str) -> Result<Option<PopunderCampaign>>;
    async fn get(&self, project_id: i64, id: i64) -> Result<Option<PopunderCampaign>>;
    async fn list_for_project(&self, project_id: i64) -> Result<Vec<PopunderCampaign>>;
    /// New campaigns start active. A taken slug is a [`crate::DuplicateError`].
    async fn insert(
        &self,
        project_id: i64,
        name: &str,
        slug: &str,
        settings: &PopunderSettings,
    ) -> Result<PopunderCampaign>;
    async fn update(&self, campaign: &PopunderCampaign) -> Result<()>;
    async fn delete(&self, project_id: i64, id: i64) -> Result<bool>;
}

/// Whitelist entries are always read and written through their owner.
#[async_trait]
pub trait WhitelistRepo: Send + Sync {
    /// Point-in-time snapshot of the owner's active entries.
    async fn active_for(&self, owner: WhitelistOwner) -> Result<Vec<WhitelistEntry>>;
    async fn list_for(&self, owner: WhitelistOwner) -> Result<Vec<WhitelistEntry>>;
    async fn get(&self, owner: WhitelistOwner, id: i64) -> Result<Option<WhitelistEntry>>;
    async fn exists(&self, owner: WhitelistOwner, pattern: &str) -> Result<bool>;
    /// A pattern the owner already has is a [`crate::DuplicateError`].
    async fn insert(&self, owner: WhitelistOwner, pattern: &str) -> Result<WhitelistEntry>;
    async fn update(&self, entry: &WhitelistEntry) -> Result<()>;
    async fn delete(&self, owner: WhitelistOwner, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait AccessLogRepo: Send + Sync {
    async fn append(&self, entry: NewAccessLog) -> Result<()>;
    async fn list_for_project(&self, project_id: i64) -> Result<Vec<AccessLogEntry>>;
    async fn list_for_script(
        &self,
        project_id: i64,
        script_id: i64,
    ) -> Result<Vec<AccessLogEntry>>;
    async fn recent_for_project(
        &self,
        project_id: i64,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>>;
    async fn delete_for_project(&self, project_id: i64) -> Result<u64>;
    async fn delete_for_script(&self, project_id: i64, script_id: i64) -> Result<u64>;
    /// Returns false when no entry with that id belongs to the project.
    async fn delete_entry(&self, project_id: i64, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait CustomDomainRepo: Send + Sync {
    async fn list(&self) -> Result<Vec<CustomDomain>>;
    async fn list_active(&self) -> Result<Vec<CustomDomain>>;
    async fn get(&self, id: i64) -> Result<Option<CustomDomain>>;
    async fn find_by_domain(&self, domain: &str) -> Result<Option<CustomDomain>>;
    /// A domain already registered is a [`crate::DuplicateError`].
    async fn insert(&self, domain: &str, platform_ip: &str) -> Result<CustomDomain>;
    async fn save(&self, domain: &CustomDomain) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<bool>;
}
