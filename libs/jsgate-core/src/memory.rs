//! In-memory implementation of every repository trait.
//!
//! Used by unit tests across the workspace and handy for running the server
//! without Postgres. Ids are allocated from one shared counter.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DuplicateError;
use crate::model::{
    AccessLogEntry, CampaignStatus, CustomDomain, DomainStatus, NewAccessLog, PopunderCampaign,
    PopunderSettings, Project, ProjectStatus, Script, ScriptStatus, SecondaryContent,
    WhitelistEntry, WhitelistOwner,
};
use crate::repo::{
    AccessLogRepo, CampaignRepo, CustomDomainRepo, ProjectRepo, ScriptRepo, WhitelistRepo,
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    projects: Vec<Project>,
    scripts: Vec<Script>,
    campaigns: Vec<PopunderCampaign>,
    whitelist: Vec<WhitelistEntry>,
    logs: Vec<AccessLogEntry>,
    domains: Vec<CustomDomain>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent access-log append fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    pub fn add_project(&self, name: &str, slug: &str, status: ProjectStatus) -> i64 {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.projects.push(Project {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
            status,
            created_at: Utc::now(),
        });
        id
    }

    pub fn set_project_status(&self, id: i64, status: ProjectStatus) {
        if let Some(p) = self.lock().projects.iter_mut().find(|p| p.id == id) {
            p.status = status;
        }
    }

    pub fn add_script(
        &self,
        project_id: i64,
        slug: &str,
        js_code: &str,
        status: ScriptStatus,
        secondary: Option<SecondaryContent>,
    ) -> i64 {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.scripts.push(Script {
            id,
            project_id,
            name: slug.to_string(),
            slug: slug.to_string(),
            js_code: js_code.to_string(),
            status,
            secondary,
            created_at: Utc::now(),
        });
        id
    }

    pub fn set_script_status(&self, id: i64, status: ScriptStatus) {
        if let Some(s) = self.lock().scripts.iter_mut().find(|s| s.id == id) {
            s.status = status;
        }
    }

    pub fn set_secondary(&self, id: i64, secondary: Option<SecondaryContent>) {
        if let Some(s) = self.lock().scripts.iter_mut().find(|s| s.id == id) {
            s.secondary = secondary;
        }
    }

    pub fn add_campaign(
        &self,
        project_id: i64,
        slug: &str,
        status: CampaignStatus,
        settings: PopunderSettings,
    ) -> i64 {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.campaigns.push(PopunderCampaign {
            id,
            project_id,
            name: slug.to_string(),
            slug: slug.to_string(),
            status,
            settings,
            created_at: Utc::now(),
        });
        id
    }

    pub fn set_campaign_status(&self, id: i64, status: CampaignStatus) {
        if let Some(c) = self.lock().campaigns.iter_mut().find(|c| c.id == id) {
            c.status = status;
        }
    }

    /// Seeds an entry without the uniqueness check `insert` applies.
    pub fn add_whitelist(&self, owner: WhitelistOwner, pattern: &str, is_active: bool) -> i64 {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.whitelist.push(WhitelistEntry {
            id,
            owner,
            pattern: pattern.to_string(),
            is_active,
            created_at: Utc::now(),
        });
        id
    }

    /// Appends a log entry with an explicit timestamp.
    pub fn append_at(&self, entry: NewAccessLog, created_at: DateTime<Utc>) -> i64 {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.logs.push(AccessLogEntry {
            id,
            project_id: entry.project_id,
            script_id: entry.script_id,
            campaign_id: entry.campaign_id,
            domain: entry.domain,
            referer_url: entry.referer_url,
            ip: entry.ip,
            user_agent: entry.user_agent,
            allowed: entry.allowed,
            created_at,
        });
        id
    }

    pub fn log_count(&self) -> usize {
        self.lock().logs.len()
    }
}

#[async_trait]
impl ProjectRepo for MemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Project>> {
        Ok(self.lock().projects.iter().find(|p| p.slug == slug).cloned())
    }

    async fn get(&self, id: i64) -> Result<Option<Project>> {
        Ok(self.lock().projects.iter().find(|p| p.id == id).cloned())
    }
}

#[async_trait]
impl ScriptRepo for MemoryStore {
    async fn find_by_slug(&self, project_id: i64, slug: &str) -> Result<Option<Script>> {
        Ok(self
            .lock()
            .scripts
            .iter()
            .find(|s| s.project_id == project_id && s.slug == slug)
            .cloned())
    }

    async fn get(&self, project_id: i64, id: i64) -> Result<Option<Script>> {
        Ok(self
            .lock()
            .scripts
            .iter()
            .find(|s| s.project_id == project_id && s.id == id)
            .cloned())
    }

    async fn list_for_project(&self, project_id: i64) -> Result<Vec<Script>> {
        Ok(self
            .lock()
            .scripts
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CampaignRepo for MemoryStore {
    async fn find_by_slug(&self, project_id: i64, slug: &str) -> Result<Option<PopunderCampaign>> {
        Ok(self
            .lock()
            .campaigns
            .iter()
            .find(|c| c.project_id == project_id && c.slug == slug)
            .cloned())
    }

    async fn get(&self, project_id: i64, id: i64) -> Result<Option<PopunderCampaign>> {
        Ok(self
            .lock()
            .campaigns
            .iter()
            .find(|c| c.project_id == project_id && c.id == id)
            .cloned())
    }

    async fn list_for_project(&self, project_id: i64) -> Result<Vec<PopunderCampaign>> {
        Ok(self
            .lock()
            .campaigns
            .iter()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        project_id: i64,
        name: &str,
        slug: &str,
        settings: &PopunderSettings,
    ) -> Result<PopunderCampaign> {
        let mut inner = self.lock();
        if inner
            .campaigns
            .iter()
            .any(|c| c.project_id == project_id && c.slug == slug)
        {
            return Err(DuplicateError {
                what: format!("Campaign slug '{}'", slug),
            }
            .into());
        }
        let id = inner.next_id();
        let campaign = PopunderCampaign {
            id,
            project_id,
            name: name.to_string(),
            slug: slug.to_string(),
            status: CampaignStatus::Active,
            settings: settings.clone(),
            created_at: Utc::now(),
        };
        inner.campaigns.push(campaign.clone());
        Ok(campaign)
    }

    async fn update(&self, campaign: &PopunderCampaign) -> Result<()> {
        let mut inner = self.lock();
        match inner
            .campaigns
            .iter_mut()
            .find(|c| c.project_id == campaign.project_id && c.id == campaign.id)
        {
            Some(existing) => {
                *existing = campaign.clone();
                Ok(())
            }
            None => bail!("campaign {} not found", campaign.id),
        }
    }

    async fn delete(&self, project_id: i64, id: i64) -> Result<bool> {
        let mut inner = self.lock();
        let before = inner.campaigns.len();
        inner
            .campaigns
            .retain(|c| !(c.project_id == project_id && c.id == id));
        let removed = inner.campaigns.len() != before;
        if removed {
            let owner = WhitelistOwner::Campaign(id);
            inner.whitelist.retain(|e| e.owner != owner);
        }
        Ok(removed)
    }
}

#[async_trait]
impl WhitelistRepo for MemoryStore {
    async fn active_for(&self, owner: WhitelistOwner) -> Result<Vec<WhitelistEntry>> {
        Ok(self
            .lock()
            .whitelist
            .iter()
            .filter(|e| e.owner == owner && e.is_active)
            .cloned()
            .collect())
    }

    async fn list_for(&self, owner: WhitelistOwner) -> Result<Vec<WhitelistEntry>> {
        Ok(self
            .lock()
            .whitelist
            .iter()
            .filter(|e| e.owner == owner)
            .cloned()
            .collect())
    }

    async fn get(&self, owner: WhitelistOwner, id: i64) -> Result<Option<WhitelistEntry>> {
        Ok(self
            .lock()
            .whitelist
            .iter()
            .find(|e| e.owner == owner && e.id == id)
            .cloned())
    }

    async fn exists(&self, owner: WhitelistOwner, pattern: &str) -> Result<bool> {
        Ok(self
            .lock()
            .whitelist
            .iter()
            .any(|e| e.owner == owner && e.pattern == pattern))
    }

    async fn insert(&self, owner: WhitelistOwner, pattern: &str) -> Result<WhitelistEntry> {
        let mut inner = self.lock();
        if inner
            .whitelist
            .iter()
            .any(|e| e.owner == owner && e.pattern == pattern)
        {
            return Err(DuplicateError {
                what: format!("Domain pattern '{}'", pattern),
            }
            .into());
        }
        let id = inner.next_id();
        let entry = WhitelistEntry {
            id,
            owner,
            pattern: pattern.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        inner.whitelist.push(entry.clone());
        Ok(entry)
    }

    async fn update(&self, entry: &WhitelistEntry) -> Result<()> {
        let mut inner = self.lock();
        if inner
            .whitelist
            .iter()
            .any(|e| e.owner == entry.owner && e.id != entry.id && e.pattern == entry.pattern)
        {
            return Err(DuplicateError {
                what: format!("Domain pattern '{}'", entry.pattern),
            }
            .into());
        }
        match inner
            .whitelist
            .iter_mut()
            .find(|e| e.owner == entry.owner && e.id == entry.id)
        {
            Some(existing) => {
                existing.pattern = entry.pattern.clone();
                existing.is_active = entry.is_active;
                Ok(())
            }
            None => bail!("whitelist entry {} not found", entry.id),
        }
    }

    async fn delete(&self, owner: WhitelistOwner, id: i64) -> Result<bool> {
        let mut inner = self.lock();
        let before = inner.whitelist.len();
        inner.whitelist.retain(|e| !(e.owner == owner && e.id == id));
        Ok(inner.whitelist.len() != before)
    }
}

#[async_trait]
impl AccessLogRepo for MemoryStore {
    async fn append(&self, entry: NewAccessLog) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            bail!("access log store unavailable");
        }
        self.append_at(entry, Utc::now());
        Ok(())
    }

    async fn list_for_project(&self, project_id: i64) -> Result<Vec<AccessLogEntry>> {
        Ok(self
            .lock()
            .logs
            .iter()
            .filter(|l| l.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_for_script(
        &self,
        project_id: i64,
        script_id: i64,
    ) -> Result<Vec<AccessLogEntry>> {
        Ok(self
            .lock()
            .logs
            .iter()
            .filter(|l| l.project_id == project_id && l.script_id == Some(script_id))
            .cloned()
            .collect())
    }

    async fn recent_for_project(
        &self,
        project_id: i64,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>> {
        let mut logs = AccessLogRepo::list_for_project(self, project_id).await?;
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        logs.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(logs)
    }

    async fn delete_for_project(&self, project_id: i64) -> Result<u64> {
        let mut inner = self.lock();
        let before = inner.logs.len();
        inner.logs.retain(|l| l.project_id != project_id);
        Ok((before - inner.logs.len()) as u64)
    }

    async fn delete_for_script(&self, project_id: i64, script_id: i64) -> Result<u64> {
        let mut inner = self.lock();
        let before = inner.logs.len();
        inner
            .logs
            .retain(|l| !(l.project_id == project_id && l.script_id == Some(script_id)));
        Ok((before - inner.logs.len()) as u64)
    }

    async fn delete_entry(&self, project_id: i64, id: i64) -> Result<bool> {
        let mut inner = self.lock();
        let before = inner.logs.len();
        inner.logs.retain(|l| !(l.project_id == project_id && l.id == id));
        Ok(inner.logs.len() != before)
    }
}

#[async_trait]
impl CustomDomainRepo for MemoryStore {
    async fn list(&self) -> Result<Vec<CustomDomain>> {
        Ok(self.lock().domains.clone())
    }

    async fn list_active(&self) -> Result<Vec<CustomDomain>> {
        Ok(self
            .lock()
            .domains
            .iter()
            .filter(|d| d.is_active)
            .cloned()
            .collect())
    }

    async fn get(&self, id: i64) -> Result<Option<CustomDomain>> {
        Ok(self.lock().domains.iter().find(|d| d.id == id).cloned())
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<CustomDomain>> {
        Ok(self.lock().domains.iter().find(|d| d.domain == domain).cloned())
    }

    async fn insert(&self, domain: &str, platform_ip: &str) -> Result<CustomDomain> {
        let mut inner = self.lock();
        if inner.domains.iter().any(|d| d.domain == domain) {
            return Err(DuplicateError {
                what: format!("Custom domain '{}'", domain),
            }
            .into());
        }
        let id = inner.next_id();
        let record = CustomDomain {
            id,
            domain: domain.to_string(),
            status: DomainStatus::Pending,
            is_active: false,
            resolved_ip: None,
            platform_ip: platform_ip.to_string(),
            verified_at: None,
            created_at: Utc::now(),
        };
        inner.domains.push(record.clone());
        Ok(record)
    }

    async fn save(&self, domain: &CustomDomain) -> Result<()> {
        let mut inner = self.lock();
        match inner.domains.iter_mut().find(|d| d.id == domain.id) {
            Some(existing) => {
                *existing = domain.clone();
                Ok(())
            }
            None => bail!("custom domain {} not found", domain.id),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut inner = self.lock();
        let before = inner.domains.len();
        inner.domains.retain(|d| d.id != id);
        Ok(inner.domains.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_inserts_are_typed() {
        let store = MemoryStore::new();
        let owner = WhitelistOwner::Script(1);
        WhitelistRepo::insert(&store, owner, "example.com").await.unwrap();
        let err = WhitelistRepo::insert(&store, owner, "example.com").await.unwrap_err();
        let dup = err.downcast_ref::<DuplicateError>().unwrap();
        assert_eq!(dup.to_string(), "Domain pattern 'example.com' already exists");

        // Same pattern under another owner is fine.
        WhitelistRepo::insert(&store, WhitelistOwner::Campaign(1), "example.com")
            .await
            .unwrap();

        CustomDomainRepo::insert(&store, "cdn.example.com", "203.0.113.10").await.unwrap();
        let err = CustomDomainRepo::insert(&store, "cdn.example.com", "203.0.113.10")
            .await
            .unwrap_err();
        assert!(err.is::<DuplicateError>());
    }

    #[tokio::test]
    async fn owners_do_not_share_entries() {
        let store = MemoryStore::new();
        store.add_whitelist(WhitelistOwner::Script(5), "a.com", true);
        store.add_whitelist(WhitelistOwner::Campaign(5), "b.com", true);

        let script = store.active_for(WhitelistOwner::Script(5)).await.unwrap();
        assert_eq!(script.len(), 1);
        assert_eq!(script[0].pattern, "a.com");

        let campaign_entry = store.list_for(WhitelistOwner::Campaign(5)).await.unwrap()[0].id;
        assert!(
            !WhitelistRepo::delete(&store, WhitelistOwner::Script(5), campaign_entry)
                .await
                .unwrap()
        );
    }
}
