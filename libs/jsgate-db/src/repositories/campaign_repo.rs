use anyhow::{Context, Result};
use async_trait::async_trait;
use jsgate_core::model::{PopunderCampaign, PopunderSettings};
use jsgate_core::repo::CampaignRepo;
use sqlx::PgPool;
use sqlx::types::Json;

use crate::db::write_error;
use crate::models::campaign::CampaignRow;

#[derive(Debug, Clone)]
pub struct CampaignRepository {
    pool: PgPool,
}

impl CampaignRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepo for CampaignRepository {
    async fn find_by_slug(&self, project_id: i64, slug: &str) -> Result<Option<PopunderCampaign>> {
        sqlx::query_as::<_, CampaignRow>(
            "SELECT * FROM popunder_campaigns WHERE project_id = $1 AND slug = $2",
        )
        .bind(project_id)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch campaign by slug")?
        .map(PopunderCampaign::try_from)
        .transpose()
    }

    async fn get(&self, project_id: i64, id: i64) -> Result<Option<PopunderCampaign>> {
        sqlx::query_as::<_, CampaignRow>(
            "SELECT * FROM popunder_campaigns WHERE project_id = $1 AND id = $2",
        )
        .bind(project_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch campaign")?
        .map(PopunderCampaign::try_from)
        .transpose()
    }

    async fn list_for_project(&self, project_id: i64) -> Result<Vec<PopunderCampaign>> {
        sqlx::query_as::<_, CampaignRow>(
            "SELECT * FROM popunder_campaigns WHERE project_id = $1 ORDER BY id ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch project campaigns")?
        .into_iter()
        .map(PopunderCampaign::try_from)
        .collect()
    }

    async fn insert(
        &self,
        project_id: i64,
        name: &str,
        slug: &str,
        settings: &PopunderSettings,
    ) -> Result<PopunderCampaign> {
        let row = sqlx::query_as::<_, CampaignRow>(
            r#"
            INSERT INTO popunder_campaigns (project_id, name, slug, settings)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(name)
        .bind(slug)
        .bind(Json(settings))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            write_error(e, "Failed to insert campaign", || {
                format!("Campaign slug '{}'", slug)
            })
        })?;

        row.try_into()
    }

    async fn update(&self, campaign: &PopunderCampaign) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE popunder_campaigns SET name = $1, status = $2, settings = $3
            WHERE id = $4 AND project_id = $5
            "#,
        )
        .bind(&campaign.name)
        .bind(campaign.status.as_str())
        .bind(Json(&campaign.settings))
        .bind(campaign.id)
        .bind(campaign.project_id)
        .execute(&self.pool)
        .await
        .context("Failed to update campaign")?;

        Ok(())
    }

    async fn delete(&self, project_id: i64, id: i64) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM popunder_campaigns WHERE id = $1 AND project_id = $2")
                .bind(id)
                .bind(project_id)
                .execute(&self.pool)
                .await
                .context("Failed to delete campaign")?;

        Ok(result.rows_affected() > 0)
    }
}
