use anyhow::Result;
use chrono::{DateTime, Utc};
use jsgate_core::model::{Script, SecondaryContent, SecondaryLink};
use sqlx::FromRow;
use sqlx::types::Json;

/// `secondary_mode` selects which of the two payload columns is live; the
/// other one is kept so switching modes back does not lose content.
#[derive(Debug, Clone, FromRow)]
pub struct ScriptRow {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub slug: String,
    pub js_code: String,
    pub status: String,
    pub secondary_mode: Option<String>,
    pub secondary_script: Option<String>,
    pub secondary_links: Option<Json<Vec<SecondaryLink>>>,
    pub created_at: DateTime<Utc>,
}

impl ScriptRow {
    fn secondary(&mut self) -> Option<SecondaryContent> {
        match self.secondary_mode.as_deref() {
            Some("js") => self.secondary_script.take().map(SecondaryContent::Js),
            Some("links") => self
                .secondary_links
                .take()
                .map(|Json(links)| SecondaryContent::Links(links)),
            _ => None,
        }
    }
}

impl TryFrom<ScriptRow> for Script {
    type Error = anyhow::Error;

    fn try_from(mut row: ScriptRow) -> Result<Self> {
        let secondary = row.secondary();
        Ok(Script {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            slug: row.slug,
            js_code: row.js_code,
            status: row.status.parse()?,
            secondary,
            created_at: row.created_at,
        })
    }
}
