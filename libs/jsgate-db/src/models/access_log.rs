use chrono::{DateTime, Utc};
use jsgate_core::model::AccessLogEntry;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct AccessLogRow {
    pub id: i64,
    pub project_id: i64,
    pub script_id: Option<i64>,
    pub campaign_id: Option<i64>,
    pub domain: Option<String>,
    pub referer_url: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub allowed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<AccessLogRow> for AccessLogEntry {
    fn from(row: AccessLogRow) -> Self {
        AccessLogEntry {
            id: row.id,
            project_id: row.project_id,
            script_id: row.script_id,
            campaign_id: row.campaign_id,
            domain: row.domain,
            referer_url: row.referer_url,
            ip: row.ip,
            user_agent: row.user_agent,
            allowed: row.allowed,
            created_at: row.created_at,
        }
    }
}
