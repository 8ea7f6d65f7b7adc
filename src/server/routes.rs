//! Router configuration for the API server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        // Scrape triggers
        .route("/api/scrape/categories", post(handlers::scrape_categories))
        .route("/api/scrape/products/:category", post(handlers::scrape_products))
        .route("/api/scrape/detail/:product_id", post(handlers::scrape_product_detail))
        // Catalog browsing
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/categories/:id", get(handlers::get_category))
        .route("/api/products", get(handlers::list_products))
        .route("/api/products/:id", get(handlers::get_product))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
