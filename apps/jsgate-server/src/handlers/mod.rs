pub mod analytics;
pub mod campaigns;
pub mod delivery;
pub mod domains;
pub mod health;
pub mod logs;
pub mod tester;
pub mod whitelist;

use jsgate_core::model::{PopunderCampaign, Project, Script};

use crate::AppState;
use crate::error::{ApiError, ApiResult};

pub(crate) async fn load_project(state: &AppState, project_id: i64) -> ApiResult<Project> {
    state
        .repos
        .projects
        .get(project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}

/// Resolves a script only through its owning project.
pub(crate) async fn load_script(
    state: &AppState,
    project_id: i64,
    script_id: i64,
) -> ApiResult<Script> {
    state
        .repos
        .scripts
        .get(project_id, script_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Script not found".to_string()))
}

pub(crate) async fn load_campaign(
    state: &AppState,
    project_id: i64,
    campaign_id: i64,
) -> ApiResult<PopunderCampaign> {
    state
        .repos
        .campaigns
        .get(project_id, campaign_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Campaign not found".to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::net::IpAddr;
    use std::sync::Arc;

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use jsgate_core::dns::{DnsResolver, DnsVerifier, ProxyRanges};
    use jsgate_core::memory::MemoryStore;
    use jsgate_db::Repositories;

    use crate::AppState;
    use crate::config::ServerConfig;

    pub const PLATFORM_IP: &str = "203.0.113.10";

    #[derive(Default)]
    pub struct StaticResolver(pub HashMap<String, Vec<IpAddr>>);

    #[async_trait]
    impl DnsResolver for StaticResolver {
        async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>> {
            self.0
                .get(domain)
                .cloned()
                .ok_or_else(|| anyhow!("NXDOMAIN {}", domain))
        }
    }

    pub fn test_config() -> ServerConfig {
        ServerConfig {
            database_url: "postgres://localhost/jsgate_test".into(),
            admin_token: "test-admin-token".into(),
            listen_port: 0,
            platform_ip: Some(PLATFORM_IP.into()),
            platform_ip_echo_url: String::new(),
            dns_timeout_secs: 1,
            log_file: None,
            db_max_connections: 1,
            trusted_proxy: false,
            source: "test".into(),
        }
    }

    /// Verifier over a fixed record set, checked against [`PLATFORM_IP`].
    pub fn verifier_for(records: &[(&str, &str)]) -> DnsVerifier {
        let mut map: HashMap<String, Vec<IpAddr>> = HashMap::new();
        for (domain, ip) in records {
            map.entry(domain.to_string())
                .or_default()
                .push(ip.parse().unwrap());
        }
        DnsVerifier::new(
            Arc::new(StaticResolver(map)),
            PLATFORM_IP.parse().unwrap(),
            ProxyRanges::cloudflare(),
        )
    }

    pub fn state_with_dns(records: &[(&str, &str)]) -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let repos = Repositories {
            projects: store.clone(),
            scripts: store.clone(),
            campaigns: store.clone(),
            whitelist: store.clone(),
            access_logs: store.clone(),
            custom_domains: store.clone(),
        };

        (AppState::new(test_config(), repos, verifier_for(records)), store)
    }

    pub fn test_state() -> (AppState, Arc<MemoryStore>) {
        state_with_dns(&[])
    }
}
