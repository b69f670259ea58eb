use anyhow::{Context, Result};
use async_trait::async_trait;
use jsgate_core::model::Project;
use jsgate_core::repo::ProjectRepo;
use sqlx::PgPool;

use crate::models::project::ProjectRow;

#[derive(Debug, Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepo for ProjectRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Project>> {
        sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch project by slug")?
            .map(Project::try_from)
            .transpose()
    }

    async fn get(&self, id: i64) -> Result<Option<Project>> {
        sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch project")?
            .map(Project::try_from)
            .transpose()
    }
}
