use anyhow::Result;
use chrono::{DateTime, Utc};
use jsgate_core::model::CustomDomain;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct CustomDomainRow {
    pub id: i64,
    pub domain: String,
    pub status: String,
    pub is_active: bool,
    pub resolved_ip: Option<String>,
    pub platform_ip: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CustomDomainRow> for CustomDomain {
    type Error = anyhow::Error;

    fn try_from(row: CustomDomainRow) -> Result<Self> {
        Ok(CustomDomain {
            id: row.id,
            domain: row.domain,
            status: row.status.parse()?,
            is_active: row.is_active,
            resolved_ip: row.resolved_ip,
            platform_ip: row.platform_ip,
            verified_at: row.verified_at,
            created_at: row.created_at,
        })
    }
}
