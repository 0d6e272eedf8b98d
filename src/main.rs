use anyhow::{Context, Result};
use axum::Router;
use netherious_api::{
    build_router,
    config::{AppConfig, StoreBackend},
    db,
    services::{
        disk_store::DiskStore, gallery_service::GalleryService, object_store::ObjectStore,
        r2_store::R2Store,
    },
    state::{AppState, DownloadSettings},
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting netherious-api with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    let db = Arc::new(db::connect(&cfg.database_url).await?);

    // --- Migrations (idempotent, so also applied on every start) ---
    db::run_migrations(&db).await?;
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize object store ---
    let store = build_store(&cfg).await?;
    tracing::info!("Using {} object store", store.name());

    // --- Initialize core services ---
    let gallery = GalleryService::new(db.clone(), store.clone(), cfg.public_base_url.clone());
    let state = AppState::new(
        store,
        gallery,
        cfg.important_key.clone(),
        DownloadSettings {
            default_mod_key: cfg.default_mod_key.clone(),
            archive_name: cfg.archive_name.clone(),
        },
    );

    // --- Build router ---
    let app: Router = build_router(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_store(cfg: &AppConfig) -> Result<Arc<dyn ObjectStore>> {
    match cfg.backend {
        StoreBackend::Disk => {
            // --- Ensure storage directory exists ---
            if !Path::new(&cfg.storage_dir).exists() {
                fs::create_dir_all(&cfg.storage_dir)?;
                tracing::info!("Created storage directory at {}", cfg.storage_dir);
            }
            Ok(Arc::new(DiskStore::new(
                &cfg.storage_dir,
                cfg.public_base_url.clone(),
            )))
        }
        StoreBackend::R2 => {
            let r2 = cfg
                .r2
                .clone()
                .context("r2 store selected without R2 settings")?;
            let store = R2Store::connect(r2).await;
            tracing::info!("Connected to bucket {}", store.bucket());
            Ok(Arc::new(store))
        }
    }
}
