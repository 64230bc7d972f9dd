//! Vehicle Inspection Service
//!
//! Vehicle classification and two-stage vehicle / license plate detection
//! over a REST (Axum) API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use carinspect::api::rest::{create_rest_router, AppState};
use carinspect::config::{Config, StorageType};
use carinspect::engine::{InferenceEngine, ModelConfigRegistry, ModelPool};
use carinspect::service::InferenceService;
use carinspect::storage::{MemoryStorage, ResultStorage, SqliteStorage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Starting Vehicle Inspection Service v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load(Config::default_path()).unwrap_or_else(|e| {
        info!("Using default config ({})", e);
        Config::default()
    });

    info!("Configuration loaded:");
    info!("  REST port: {}", config.server.rest_port);
    info!("  Device: {}", config.inference.device);
    info!("  Model idle timeout: {}s", config.inference.model_idle_timeout);
    info!("  Request timeout: {}ms", config.inference.request_timeout_ms);

    let registry = Arc::new(
        ModelConfigRegistry::from_settings(config.models.clone()).context("Invalid model configuration")?,
    );
    for model_type in registry.model_types() {
        info!("  Model configured: {}", model_type);
    }

    // Initialize model pool
    let engine = create_engine(&config.inference.device)?;
    let pool = Arc::new(ModelPool::new(
        engine,
        Duration::from_secs(config.inference.model_idle_timeout),
    ));

    // Start model cleanup task
    tokio::spawn(pool.clone().start_cleanup_task());

    // Initialize storage
    match config.storage.storage_type {
        StorageType::Sqlite => {
            let storage_path = match config.storage.sqlite_path.as_deref() {
                Some(path) => path.to_str().context("SQLite path is not valid UTF-8")?,
                None => "data/results.db",
            };
            let storage = Arc::new(SqliteStorage::new(storage_path).await?);
            info!("SQLite storage initialized at: {}", storage_path);
            serve(&config, registry, pool, storage).await
        }
        StorageType::Memory => {
            info!("Using in-memory storage, results are lost on exit");
            serve(&config, registry, pool, Arc::new(MemoryStorage::new())).await
        }
    }
}

#[cfg(feature = "openvino")]
fn create_engine(device: &str) -> Result<Arc<dyn InferenceEngine>> {
    Ok(Arc::new(carinspect::engine::openvino::OpenVinoEngine::new(device)?))
}

#[cfg(not(feature = "openvino"))]
fn create_engine(device: &str) -> Result<Arc<dyn InferenceEngine>> {
    anyhow::bail!(
        "No inference backend for device {}: rebuild with `--features openvino`",
        device
    )
}

async fn serve<S: ResultStorage>(
    config: &Config,
    registry: Arc<ModelConfigRegistry>,
    pool: Arc<ModelPool>,
    storage: Arc<S>,
) -> Result<()> {
    // Create inference service
    let service = Arc::new(InferenceService::new(registry, pool.clone(), storage));

    let app_state = Arc::new(AppState {
        service,
        request_timeout: Duration::from_millis(config.inference.request_timeout_ms),
    });
    let rest_router = create_rest_router(app_state);

    // Start REST server
    let addr = format!("0.0.0.0:{}", config.server.rest_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("REST API listening on http://{}", addr);
    info!("Vehicle Inspection Service is ready!");

    axum::serve(listener, rest_router)
        .with_graceful_shutdown(async {
            // Wait for shutdown signal
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received, cleaning up...");
        })
        .await?;

    // Shutdown model pool
    pool.shutdown();

    info!("Goodbye!");
    Ok(())
}
