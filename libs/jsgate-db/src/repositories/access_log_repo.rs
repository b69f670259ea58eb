use anyhow::{Context, Result};
use async_trait::async_trait;
use jsgate_core::model::{AccessLogEntry, NewAccessLog};
use jsgate_core::repo::AccessLogRepo;
use sqlx::PgPool;

use crate::models::access_log::AccessLogRow;

#[derive(Debug, Clone)]
pub struct AccessLogRepository {
    pool: PgPool,
}

impl AccessLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessLogRepo for AccessLogRepository {
    async fn append(&self, entry: NewAccessLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO access_logs
                (project_id, script_id, campaign_id, domain, referer_url, ip, user_agent, allowed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.project_id)
        .bind(entry.script_id)
        .bind(entry.campaign_id)
        .bind(entry.domain)
        .bind(entry.referer_url)
        .bind(entry.ip)
        .bind(entry.user_agent)
        .bind(entry.allowed)
        .execute(&self.pool)
        .await
        .context("Failed to append access log")?;

        Ok(())
    }

    async fn list_for_project(&self, project_id: i64) -> Result<Vec<AccessLogEntry>> {
        let rows = sqlx::query_as::<_, AccessLogRow>(
            "SELECT * FROM access_logs WHERE project_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch project access logs")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_for_script(
        &self,
        project_id: i64,
        script_id: i64,
    ) -> Result<Vec<AccessLogEntry>> {
        let rows = sqlx::query_as::<_, AccessLogRow>(
            r#"
            SELECT * FROM access_logs
            WHERE project_id = $1 AND script_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(project_id)
        .bind(script_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch script access logs")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn recent_for_project(
        &self,
        project_id: i64,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>> {
        let rows = sqlx::query_as::<_, AccessLogRow>(
            r#"
            SELECT * FROM access_logs
            WHERE project_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(project_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent access logs")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_for_project(&self, project_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM access_logs WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .context("Failed to clear project access logs")?;

        Ok(result.rows_affected())
    }

    async fn delete_for_script(&self, project_id: i64, script_id: i64) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM access_logs WHERE project_id = $1 AND script_id = $2")
                .bind(project_id)
                .bind(script_id)
                .execute(&self.pool)
                .await
                .context("Failed to clear script access logs")?;

        Ok(result.rows_affected())
    }

    async fn delete_entry(&self, project_id: i64, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM access_logs WHERE id = $1 AND project_id = $2")
            .bind(id)
            .bind(project_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete access log entry")?;

        Ok(result.rows_affected() > 0)
    }
}
