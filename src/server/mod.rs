//! JSON API server for triggering scrapes and browsing the catalog.
//!
//! Thin layer over the ingest service: it validates input, translates
//! errors into HTTP payloads, and owns nothing of the pipeline itself.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;

use crate::config::Settings;
use crate::repository::AsyncSqlitePool;
use crate::services::IngestService;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub ingest: IngestService,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        let pool = AsyncSqlitePool::from_path(&settings.database_path());
        Self {
            ingest: IngestService::new(settings.clone(), pool),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
