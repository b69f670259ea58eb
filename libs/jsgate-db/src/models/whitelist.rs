use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use jsgate_core::model::{WhitelistEntry, WhitelistOwner};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct WhitelistRow {
    pub id: i64,
    pub script_id: Option<i64>,
    pub campaign_id: Option<i64>,
    pub pattern: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<WhitelistRow> for WhitelistEntry {
    type Error = anyhow::Error;

    fn try_from(row: WhitelistRow) -> Result<Self> {
        let owner = match (row.script_id, row.campaign_id) {
            (Some(id), None) => WhitelistOwner::Script(id),
            (None, Some(id)) => WhitelistOwner::Campaign(id),
            _ => bail!("whitelist entry {} must have exactly one owner", row.id),
        };
        Ok(WhitelistEntry {
            id: row.id,
            owner,
            pattern: row.pattern,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}
