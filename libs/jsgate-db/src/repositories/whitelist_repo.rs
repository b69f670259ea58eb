use anyhow::{Context, Result};
use async_trait::async_trait;
use jsgate_core::model::{WhitelistEntry, WhitelistOwner};
use jsgate_core::repo::WhitelistRepo;
use sqlx::PgPool;

use crate::db::write_error;
use crate::models::whitelist::WhitelistRow;

/// Entries live in `domain_whitelists`, keyed by `script_id` or
/// `campaign_id`. Every query binds both columns from
/// [`WhitelistOwner::columns`]; the unset one binds NULL and never matches.
#[derive(Debug, Clone)]
pub struct WhitelistRepository {
    pool: PgPool,
}

impl WhitelistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WhitelistRepo for WhitelistRepository {
    async fn active_for(&self, owner: WhitelistOwner) -> Result<Vec<WhitelistEntry>> {
        let (script_id, campaign_id) = owner.columns();
        sqlx::query_as::<_, WhitelistRow>(
            r#"
            SELECT * FROM domain_whitelists
            WHERE (script_id = $1 OR campaign_id = $2) AND is_active = TRUE
            ORDER BY id ASC
            "#,
        )
        .bind(script_id)
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active whitelist")?
        .into_iter()
        .map(WhitelistEntry::try_from)
        .collect()
    }

    async fn list_for(&self, owner: WhitelistOwner) -> Result<Vec<WhitelistEntry>> {
        let (script_id, campaign_id) = owner.columns();
        sqlx::query_as::<_, WhitelistRow>(
            r#"
            SELECT * FROM domain_whitelists
            WHERE (script_id = $1 OR campaign_id = $2)
            ORDER BY id ASC
            "#,
        )
        .bind(script_id)
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch whitelist")?
        .into_iter()
        .map(WhitelistEntry::try_from)
        .collect()
    }

    async fn get(&self, owner: WhitelistOwner, id: i64) -> Result<Option<WhitelistEntry>> {
        let (script_id, campaign_id) = owner.columns();
        sqlx::query_as::<_, WhitelistRow>(
            r#"
            SELECT * FROM domain_whitelists
            WHERE (script_id = $1 OR campaign_id = $2) AND id = $3
            "#,
        )
        .bind(script_id)
        .bind(campaign_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch whitelist entry")?
        .map(WhitelistEntry::try_from)
        .transpose()
    }

    async fn exists(&self, owner: WhitelistOwner, pattern: &str) -> Result<bool> {
        let (script_id, campaign_id) = owner.columns();
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM domain_whitelists
                WHERE (script_id = $1 OR campaign_id = $2) AND pattern = $3
            )
            "#,
        )
        .bind(script_id)
        .bind(campaign_id)
        .bind(pattern)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check whitelist duplicate")
    }

    async fn insert(&self, owner: WhitelistOwner, pattern: &str) -> Result<WhitelistEntry> {
        let (script_id, campaign_id) = owner.columns();
        let row = sqlx::query_as::<_, WhitelistRow>(
            r#"
            INSERT INTO domain_whitelists (script_id, campaign_id, pattern, is_active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING *
            "#,
        )
        .bind(script_id)
        .bind(campaign_id)
        .bind(pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            write_error(e, "Failed to insert whitelist entry", || {
                format!("Domain pattern '{}'", pattern)
            })
        })?;

        row.try_into()
    }

    async fn update(&self, entry: &WhitelistEntry) -> Result<()> {
        let (script_id, campaign_id) = entry.owner.columns();
        sqlx::query(
            r#"
            UPDATE domain_whitelists SET pattern = $1, is_active = $2
            WHERE id = $3 AND (script_id = $4 OR campaign_id = $5)
            "#,
        )
        .bind(&entry.pattern)
        .bind(entry.is_active)
        .bind(entry.id)
        .bind(script_id)
        .bind(campaign_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            write_error(e, "Failed to update whitelist entry", || {
                format!("Domain pattern '{}'", entry.pattern)
            })
        })?;

        Ok(())
    }

    async fn delete(&self, owner: WhitelistOwner, id: i64) -> Result<bool> {
        let (script_id, campaign_id) = owner.columns();
        let result = sqlx::query(
            "DELETE FROM domain_whitelists WHERE id = $1 AND (script_id = $2 OR campaign_id = $3)",
        )
        .bind(id)
        .bind(script_id)
        .bind(campaign_id)
        .execute(&self.pool)
        .await
        .context("Failed to delete whitelist entry")?;

        Ok(result.rows_affected() > 0)
    }
}
