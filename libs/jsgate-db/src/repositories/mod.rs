pub mod access_log_repo;
pub mod campaign_repo;
pub mod custom_domain_repo;
pub mod project_repo;
pub mod script_repo;
pub mod whitelist_repo;

pub use access_log_repo::AccessLogRepository;
pub use campaign_repo::CampaignRepository;
pub use custom_domain_repo::CustomDomainRepository;
pub use project_repo::ProjectRepository;
pub use script_repo::ScriptRepository;
pub use whitelist_repo::WhitelistRepository;
