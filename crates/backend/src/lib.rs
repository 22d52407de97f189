//! Reference REST service for the dashboard: terminals, warehouses, package
//! telemetry and drone assignments over an embedded redb store, plus the built
//! frontend bundle.

pub mod rest;
pub mod seed;
pub mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use storage::Storage;

/// Build a cache-controlled static file router.
///
/// Separated so tests can exercise the caching layer with arbitrary directories.
pub fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

pub const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Build the full application router.
pub fn build_app(storage: Arc<Storage>, dist_dir: &Path) -> Router {
    // Static file routers are stateless, merge them before adding app state
    let static_files = Router::new()
        .nest("/dist", cached_static_router(dist_dir, CACHE_IMMUTABLE))
        .nest(
            "/assets",
            cached_static_router(&dist_dir.join("assets"), CACHE_IMMUTABLE),
        );

    let index = dist_dir.join("index.html");
    let index_page = get(move || serve_index(index.clone()));

    Router::new()
        .route("/terminals", get(rest::list_terminals).post(rest::create_terminal))
        .route(
            "/terminals/{id}",
            axum::routing::put(rest::update_terminal).delete(rest::delete_terminal),
        )
        .route("/warehouses", get(rest::list_warehouses).post(rest::create_warehouse))
        .route(
            "/warehouses/{id}",
            axum::routing::put(rest::update_warehouse).delete(rest::delete_warehouse),
        )
        .route("/package_telemetry/{package_id}", get(rest::package_telemetry))
        .route(
            "/drone_assignments_by_warehouse/{warehouse_name}",
            get(rest::drone_assignments),
        )
        .route("/", index_page.clone())
        .route("/monitor/{package_id}", index_page)
        .with_state(storage)
        .merge(static_files)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

async fn serve_index(index: PathBuf) -> Html<String> {
    // Serve the built frontend, fall back to a simple message
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html),
        Err(_) => Html(
            r#"<!DOCTYPE html>
<html>
<head><title>DroneDash</title></head>
<body>
<h1>DroneDash</h1>
<p>Frontend not built yet. The REST API is served under <code>/terminals</code> and <code>/warehouses</code>.</p>
</body>
</html>"#
                .to_string(),
        ),
    }
}
