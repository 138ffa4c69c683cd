//! Web server adapter.
//!
//! Serves the dashboard page, the JSON query API and the rendered chart
//! over axum. All handlers are read-only.

mod error;
mod handlers;
mod templates;

pub use error::WebError;
pub use handlers::*;
pub use templates::*;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::domain::query::DataQueries;
use crate::domain::settings::Settings;
use crate::ports::data_port::DataPort;

pub struct AppState {
    pub data_port: Arc<dyn DataPort + Send + Sync>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn queries(&self) -> DataQueries<'_> {
        DataQueries::new(self.data_port.as_ref(), &self.settings)
    }
}

pub fn build_router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.settings.static_dir);
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/api/classified-meta", get(handlers::classified_meta))
        .route("/api/raw/file", get(handlers::raw_file))
        .route("/api/raw/{kind}", get(handlers::raw_listing))
        .route("/api/classified/records", get(handlers::classified_records))
        .route("/api/alerts/bars", get(handlers::alert_bars))
        .route("/api/plot/vectors", get(handlers::plot_vectors))
        .route("/api/plot/svg", get(handlers::plot_svg))
        .route("/api/plot/hit", get(handlers::plot_hit))
        .nest_service("/static", static_dir)
        .fallback(handlers::not_found)
        .with_state(Arc::new(state))
}

/// Bind `listen` and serve until the process is stopped.
pub async fn serve(state: AppState, listen: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, build_router(state)).await
}
