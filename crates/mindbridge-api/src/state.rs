//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use mindbridge_bot::EventHandlers;
use mindbridge_core::config::StorageBackend;

/// Shared application state, passed to handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Callbacks for messaging events.
    pub handlers: EventHandlers,
    /// Token the platform must echo during webhook verification.
    pub verify_token: Arc<str>,
    /// Page whose entries this instance answers.
    pub page_id: Arc<str>,
    /// Session store backend in use, reported by `/health`.
    pub storage: StorageBackend,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        handlers: EventHandlers,
        verify_token: &str,
        page_id: &str,
        storage: StorageBackend,
    ) -> Self {
        Self {
            handlers,
            verify_token: Arc::from(verify_token),
            page_id: Arc::from(page_id),
            storage,
            start_time: Instant::now(),
        }
    }
}
