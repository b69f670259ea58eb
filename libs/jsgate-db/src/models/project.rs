use anyhow::Result;
use chrono::{DateTime, Utc};
use jsgate_core::model::Project;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = anyhow::Error;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            id: row.id,
            name: row.name,
            slug: row.slug,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}
