use anyhow::{Context, Result};
use jsgate_core::DuplicateError;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

pub async fn init_db(database_url: &str, max_connections: u32) -> Result<PgPool> {
    if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
        return Err(anyhow::anyhow!(
            "DATABASE_URL must start with postgres:// or postgresql://"
        ));
    }

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!("Connected to PostgreSQL, running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(pool)
}

/// Maps a unique-constraint violation to [`DuplicateError`] so callers can
/// tell it apart from a storage failure.
pub(crate) fn write_error(
    e: sqlx::Error,
    context: &'static str,
    what: impl FnOnce() -> String,
) -> anyhow::Error {
    if e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        return DuplicateError { what: what() }.into();
    }
    anyhow::Error::new(e).context(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_write_errors_keep_context() {
        let err = write_error(sqlx::Error::RowNotFound, "Failed to insert", || "x".into());
        assert!(!err.is::<DuplicateError>());
        assert_eq!(err.to_string(), "Failed to insert");
    }

    #[tokio::test]
    async fn rejects_non_postgres_urls() {
        let err = init_db("sqlite://jsgate.db", 1).await.unwrap_err();
        assert!(err.to_string().contains("postgres://"));
    }
}
