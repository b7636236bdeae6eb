use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::{fs, net::TcpListener};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    extractor::YtDlpExtractor, media_service::MediaService, object_store::S3ObjectStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Environment file (optional) ---
    let dotenv_loaded = dotenv::dotenv().is_ok();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // --- Parse config; fails before binding when storage settings are missing ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!(dotenv_loaded, "Starting reel-relay with config: {:?}", cfg);

    // --- Ensure staging directory exists ---
    if !fs::try_exists(&cfg.downloads_dir).await.unwrap_or(false) {
        fs::create_dir_all(&cfg.downloads_dir)
            .await
            .with_context(|| format!("creating {}", cfg.downloads_dir.display()))?;
        tracing::info!("Created staging directory at {}", cfg.downloads_dir.display());
    }

    // --- Initialize adapters and core service ---
    let store = S3ObjectStore::new(&cfg.storage).await;
    let extractor = YtDlpExtractor::new(cfg.yt_dlp_bin.clone());
    let media = MediaService::new(
        Arc::new(extractor),
        Arc::new(store),
        cfg.downloads_dir.clone(),
        cfg.storage.bucket.clone(),
    );

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(media);

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
        Err(err) => return Err(err).with_context(|| format!("binding {}", addr)),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
