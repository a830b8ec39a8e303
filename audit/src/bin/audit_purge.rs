use chrono::{Duration, Utc};
use model_audit::{
    config::Config,
    db::connection::{create_pool, run_migrations},
    services::{AuditLogStore, PgAuditLogStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "model_audit=info,audit_purge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    // Fail before touching the database if the audit settings are inconsistent.
    config.audit.clone().into_policy()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let cutoff = Utc::now() - Duration::days(config.retention_days);
    let store = PgAuditLogStore::new(pool);
    let deleted = store.purge_before(cutoff).await?;

    tracing::info!(
        deleted,
        retention_days = config.retention_days,
        cutoff = %cutoff,
        "Purged audit log entries"
    );

    Ok(())
}
