//! HTTP boundary: JSON endpoints over the classification pipeline.

pub mod handlers;
pub mod types;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    infrastructure::{notifier::Notifier, shutdown::ShutdownListener},
    mail::MailSource,
    pipeline::{ClassificationService, ScanAggregator},
};

/// Shared application state
pub struct AppState {
    pub classifier: ClassificationService,
    pub scanner: ScanAggregator,
    pub mail_source: Arc<dyn MailSource>,
    pub notifier: Arc<dyn Notifier>,
    pub scan_limit: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/scan-inbox", post(handlers::scan_inbox))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn serve(
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: ShutdownListener,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(target: "http", addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.notified())
        .await
}
