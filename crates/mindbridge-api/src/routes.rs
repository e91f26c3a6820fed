//! Router setup with all routes and middleware.

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use mindbridge_core::error::MindbridgeError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/webhook",
            get(handlers::verify_webhook).post(handlers::receive_webhook),
        )
        .route("/system/ping", get(handlers::ping))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB global limit
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on `addr` until `shutdown` resolves.
pub async fn start_server<F>(
    addr: &str,
    state: AppState,
    shutdown: F,
) -> Result<(), MindbridgeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MindbridgeError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| MindbridgeError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
