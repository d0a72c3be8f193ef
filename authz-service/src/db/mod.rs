//! PostgreSQL pool construction and schema migration for the
//! authorization store.
//!
//! Pool sizing and timeouts come from [`DatabaseConfig`] so deployments can
//! tune them per environment; the schema under `migrations/` is applied
//! with sqlx's migrator and is safe to re-run.

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .max_lifetime(Duration::from_secs(config.max_lifetime_seconds))
}

/// Open the authorization database pool.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Opening authorization database pool"
    );

    let pool = pool_options(config).connect(&config.url).await?;

    tracing::info!("Authorization database pool ready");
    Ok(pool)
}

/// Apply the authorization schema. Idempotent; already-applied migrations
/// are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Applying authorization schema migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Authorization schema up to date");
    Ok(())
}

/// Ping the store. Surfaced to deployment liveness checks.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_options_reflect_config() {
        let config = DatabaseConfig {
            url: "postgres://localhost/authz".to_string(),
            max_connections: 7,
            min_connections: 2,
            acquire_timeout_seconds: 5,
            idle_timeout_seconds: 60,
            max_lifetime_seconds: 300,
        };

        let options = pool_options(&config);
        assert_eq!(options.get_max_connections(), 7);
        assert_eq!(options.get_min_connections(), 2);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(5));
        assert_eq!(options.get_idle_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(options.get_max_lifetime(), Some(Duration::from_secs(300)));
    }
}
