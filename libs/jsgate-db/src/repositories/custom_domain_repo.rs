use anyhow::{Context, Result};
use async_trait::async_trait;
use jsgate_core::model::CustomDomain;
use jsgate_core::repo::CustomDomainRepo;
use sqlx::PgPool;

use crate::db::write_error;
use crate::models::custom_domain::CustomDomainRow;

#[derive(Debug, Clone)]
pub struct CustomDomainRepository {
    pool: PgPool,
}

impl CustomDomainRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomDomainRepo for CustomDomainRepository {
    async fn list(&self) -> Result<Vec<CustomDomain>> {
        sqlx::query_as::<_, CustomDomainRow>("SELECT * FROM custom_domains ORDER BY domain ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch custom domains")?
            .into_iter()
            .map(CustomDomain::try_from)
            .collect()
    }

    async fn list_active(&self) -> Result<Vec<CustomDomain>> {
        sqlx::query_as::<_, CustomDomainRow>(
            "SELECT * FROM custom_domains WHERE is_active = TRUE ORDER BY domain ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active custom domains")?
        .into_iter()
        .map(CustomDomain::try_from)
        .collect()
    }

    async fn get(&self, id: i64) -> Result<Option<CustomDomain>> {
        sqlx::query_as::<_, CustomDomainRow>("SELECT * FROM custom_domains WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch custom domain")?
            .map(CustomDomain::try_from)
            .transpose()
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<CustomDomain>> {
        sqlx::query_as::<_, CustomDomainRow>("SELECT * FROM custom_domains WHERE domain = $1")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch custom domain by name")?
            .map(CustomDomain::try_from)
            .transpose()
    }

    async fn insert(&self, domain: &str, platform_ip: &str) -> Result<CustomDomain> {
        let row = sqlx::query_as::<_, CustomDomainRow>(
            "INSERT INTO custom_domains (domain, platform_ip) VALUES ($1, $2) RETURNING *",
        )
        .bind(domain)
        .bind(platform_ip)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            write_error(e, "Failed to insert custom domain", || {
                format!("Custom domain '{}'", domain)
            })
        })?;

        CustomDomain::try_from(row)
    }

    async fn save(&self, domain: &CustomDomain) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE custom_domains
            SET status = $1, is_active = $2, resolved_ip = $3, platform_ip = $4, verified_at = $5
            WHERE id = $6
            "#,
        )
        .bind(domain.status.as_str())
        .bind(domain.is_active)
        .bind(&domain.resolved_ip)
        .bind(&domain.platform_ip)
        .bind(domain.verified_at)
        .bind(domain.id)
        .execute(&self.pool)
        .await
        .context("Failed to save custom domain")?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM custom_domains WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete custom domain")?;

        Ok(result.rows_affected() > 0)
    }
}
