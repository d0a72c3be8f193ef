//! Bootstrap entry point: load config, connect, migrate, seed the catalog.
//!
//! The authorization core itself is a library; this binary prepares a
//! deployment's database so the embedding transport can construct an
//! [`authz_service::AppState`] and start serving.

use authz_service::config::AuthzConfig;
use authz_service::db;
use authz_service::services::{catalog, AuthzStore};
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AuthzConfig::from_env()?;
    init_tracing(&config.service_name, &config.log_level);

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    catalog::ensure_seeded(&AuthzStore::new(pool)).await?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Authorization store ready"
    );
    Ok(())
}
