use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gotravel_sync::{Services, SyncConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gotravel_sync=debug,gotravel_migration=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = SyncConfig::from_env().context("Invalid configuration")?;
    let user_id = config
        .user_id
        .clone()
        .context("GOTRAVEL_USER_ID must be set")?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        user_id = %user_id,
        flag = %config.migration_flag_key,
        "Loaded sync configuration"
    );

    // --- Services ---
    let services = Services::load(&config, &user_id).context("Failed to restore stores")?;

    // --- Migration ---
    let report = services
        .bridge
        .run(&user_id)
        .await
        .context("Migration failed")?;
    services
        .persist(&config)
        .context("Failed to persist target store")?;

    tracing::info!(
        report = %serde_json::to_string(&report)?,
        "Sync finished"
    );
    Ok(())
}
