use anyhow::{Context, Result};
use async_trait::async_trait;
use jsgate_core::model::Script;
use jsgate_core::repo::ScriptRepo;
use sqlx::PgPool;

use crate::models::script::ScriptRow;

#[derive(Debug, Clone)]
pub struct ScriptRepository {
    pool: PgPool,
}

impl ScriptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScriptRepo for ScriptRepository {
    async fn find_by_slug(&self, project_id: i64, slug: &str) -> Result<Option<Script>> {
        sqlx::query_as::<_, ScriptRow>("SELECT * FROM scripts WHERE project_id = $1 AND slug = $2")
            .bind(project_id)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch script by slug")?
            .map(Script::try_from)
            .transpose()
    }

    async fn get(&self, project_id: i64, id: i64) -> Result<Option<Script>> {
        sqlx::query_as::<_, ScriptRow>("SELECT * FROM scripts WHERE project_id = $1 AND id = $2")
            .bind(project_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch script")?
            .map(Script::try_from)
            .transpose()
    }

    async fn list_for_project(&self, project_id: i64) -> Result<Vec<Script>> {
        sqlx::query_as::<_, ScriptRow>(
            "SELECT * FROM scripts WHERE project_id = $1 ORDER BY id ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch project scripts")?
        .into_iter()
        .map(Script::try_from)
        .collect()
    }
}
