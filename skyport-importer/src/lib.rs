//! skyport-importer library
//!
//! Imports an uploaded archive export of tweets into a Bluesky account:
//! - login against a PDS, per-user session workspace
//! - export upload and preview
//! - selection submission (direct or inverted) with a server-held handle
//! - paced, retrying import streamed to the browser as SSE progress frames

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod types;

pub use crate::error::{ApiError, ApiResult, ImportError};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::session::SessionStore;
use crate::types::AccountConnector;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub sessions: SessionStore,
    /// Logs users in against the remote service
    pub connector: Arc<dyn AccountConnector>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServiceConfig, connector: Arc<dyn AccountConnector>) -> Self {
        Self {
            config: Arc::new(config),
            sessions: SessionStore::new(),
            connector,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .merge(api::health_routes())
        .merge(api::session_routes())
        .merge(api::upload_routes())
        .merge(api::import_routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
