//! HTTP prediction service
//!
//! Serves `/predict` from an immutable [`PredictionContext`] built once at
//! startup and shared across requests. Every response carries permissive
//! CORS headers so the browser extension can call the service directly.
//!
//! # Example
//!
//! ```ignore
//! use ecolabel::prediction::PredictionContext;
//! use ecolabel::server;
//!
//! let context = PredictionContext::load("linear_regression_model.apr", "sorted_auto_carbon_emissions")?;
//! server::serve("127.0.0.1:5000".parse()?, context).await?;
//! ```

mod handlers;

pub use handlers::*;

use crate::prediction::PredictionContext;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<PredictionContext>,
    /// Client used by `/proxy`
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(context: PredictionContext) -> Self {
        Self {
            context: Arc::new(context),
            http: reqwest::Client::new(),
        }
    }
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/predict", post(predict).options(preflight))
        .route("/proxy", post(proxy))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(address: SocketAddr, context: PredictionContext) -> std::io::Result<()> {
    let app = router(AppState::new(context));
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests;
