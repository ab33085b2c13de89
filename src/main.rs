use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use med_plan::config;
use med_plan::store::SqliteStore;
use med_plan::{AdapterConfig, MedPlanService};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("med-plan starting v{}", config::APP_VERSION);

    let data_dir = config::app_data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(dir = %data_dir.display(), error = %e, "Cannot create data directory");
        std::process::exit(1);
    }

    let store = match SqliteStore::open(&config::state_db_path()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, "Cannot open state store");
            std::process::exit(1);
        }
    };

    let service = MedPlanService::new(store, AdapterConfig::default());
    service.start();

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for shutdown signal");
    }

    tracing::info!("Shutting down");
    service.stop();
}
