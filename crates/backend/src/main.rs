use std::path::PathBuf;

use dronedash_backend::{build_app, seed, storage::Storage};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn run() -> Result<(), String> {
    let db_path = PathBuf::from(
        std::env::var("DB_PATH").unwrap_or_else(|_| "data/dronedash.redb".to_string()),
    );
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create database directory: {}", e))?;
    }
    let storage = Storage::open(&db_path)?;

    let seed_enabled = std::env::var("SEED_SAMPLE_DATA")
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);
    if seed_enabled {
        seed::seed_sample_data(&storage)?;
    }

    let dist_dir = PathBuf::from(std::env::var("DIST_DIR").unwrap_or_else(|_| "dist".to_string()));
    let app = build_app(storage, &dist_dir);

    let port = std::env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    info!(db = %db_path.display(), dist = %dist_dir.display(), "server running at http://localhost:{}", port);

    axum::serve(listener, app).await.map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}
