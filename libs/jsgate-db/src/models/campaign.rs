use anyhow::Result;
use chrono::{DateTime, Utc};
use jsgate_core::model::{PopunderCampaign, PopunderSettings};
use sqlx::FromRow;
use sqlx::types::Json;

#[derive(Debug, Clone, FromRow)]
pub struct CampaignRow {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub slug: String,
    pub status: String,
    pub settings: Json<PopunderSettings>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CampaignRow> for PopunderCampaign {
    type Error = anyhow::Error;

    fn try_from(row: CampaignRow) -> Result<Self> {
        Ok(PopunderCampaign {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            slug: row.slug,
            status: row.status.parse()?,
            settings: row.settings.0,
            created_at: row.created_at,
        })
    }
}
