//! arc-api library - CultureArc REST backend
//!
//! Exposes the router and application state for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod validate;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use services::ModerationService;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Moderation pipeline (holds the Gemini connection)
    pub moderation: Arc<ModerationService>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, moderation: ModerationService) -> Self {
        Self {
            db,
            moderation: Arc::new(moderation),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// The service sits behind an authenticating gateway; CORS stays
/// permissive and identity arrives in a forwarded header (see
/// `api::identity`).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::artifact_routes())
        .merge(api::collection_routes())
        .merge(api::user_routes())
        .merge(api::analyze_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
