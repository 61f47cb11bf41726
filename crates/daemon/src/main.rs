//! Reelimport Daemon - Main Entry Point
//! JSON-RPC server over the bulk import engine

mod config;
mod logging;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use config::DaemonConfig;
use reelimport_api_rpc::{RpcServer, RpcServerConfig};
use reelimport_core::application::{
    BulkImportService, ImportProcessor, ProcessorConfig, RecoveryService,
};
use reelimport_core::domain::ImportProfile;
use reelimport_core::port::id_provider::UuidProvider;
use reelimport_core::port::time_provider::SystemTimeProvider;
use reelimport_core::port::{JobStore, TimeProvider};
use reelimport_infra_http::{HttpClientConfig, HttpRecordService, HttpTitleCatalog};
use reelimport_infra_memory::MemoryJobStore;
use reelimport_infra_sqlite::{create_pool, database_url, run_migrations, SqliteJobStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    let _log_guard = logging::init(config.log_format, config.log_dir.as_deref())?;

    info!("Reelimport daemon v{} starting...", VERSION);

    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);

    // 2. Job store
    let (store, durable): (Arc<dyn JobStore>, bool) = match &config.db_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
            info!(db_path = %path.display(), "Initializing database...");
            let pool = create_pool(&database_url(path))
                .await
                .context("DB pool creation failed")?;
            run_migrations(&pool).await.context("Migration failed")?;
            (Arc::new(SqliteJobStore::new(pool)), true)
        }
        None => {
            warn!("REELIMPORT_DB_PATH not set, using in-memory job store (jobs are lost on exit)");
            (Arc::new(MemoryJobStore::new()), false)
        }
    };

    // 3. Downstream adapters
    let records = HttpRecordService::new(&HttpClientConfig::new(
        config.record_service_url.clone(),
        config.http_timeout,
    ))
    .context("Failed to build record service client")?;
    let catalog = HttpTitleCatalog::new(&HttpClientConfig::new(
        config.catalog_url.clone(),
        config.http_timeout,
    ))
    .context("Failed to build title catalog client")?;

    // 4. Application services
    let profile = ImportProfile::letterboxd_movies().with_min_watch_year(config.min_watch_year);
    let processor = Arc::new(ImportProcessor::new(
        store.clone(),
        Arc::new(records),
        Arc::new(catalog),
        time_provider.clone(),
        profile,
        ProcessorConfig {
            remote_dedupe: config.remote_dedupe,
            rng_seed: None,
        },
    ));
    let service = Arc::new(BulkImportService::new(
        store.clone(),
        processor,
        Arc::new(UuidProvider),
        time_provider.clone(),
    ));

    // 5. Finalize jobs abandoned by a previous process
    if durable {
        info!("Running orphan recovery...");
        let recovery = RecoveryService::new(store.clone(), time_provider.clone());
        match recovery.recover_orphaned_jobs().await {
            Ok(count) => info!(recovered_jobs = count, "Orphan recovery completed"),
            Err(e) => error!(error = ?e, "Orphan recovery failed"),
        }
    }

    // 6. JSON-RPC server
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port: config.rpc_port,
    };
    let started = RpcServer::new(rpc_config, service)
        .start()
        .await
        .context("RPC server start failed")?;

    info!(
        addr = %started.addr,
        remote_dedupe = config.remote_dedupe,
        "System ready. Press Ctrl+C to shutdown"
    );

    // 7. Graceful shutdown
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    started
        .handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    started.handle.stopped().await;

    info!("Shutdown complete.");
    Ok(())
}
