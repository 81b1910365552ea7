//! StudyHub Server - learning platform API
//!
//! Architecture:
//! - Accounts: JWT sessions with a per-user cap, Google sign-in, password reset
//! - Content: concepts, courses and problems with filtering and pagination
//! - Progress: daily concept/problem pairs, streaks, heatmaps, dashboards
//! - Judging: code runs and graded submissions through an external executor
//! - Discussion: private notes, comment threads and reactions
//!
//! Everything is stored in one PostgreSQL database.

pub mod api;
pub mod auth;
pub mod config;
pub mod daily;
pub mod db;
pub mod mail;
pub mod media;
pub mod observability;
pub mod rule_engine;
pub mod state;

pub use config::ServerConfig;
pub use db::DbPool;
pub use observability::{init_sentry, AuditEventType, AuditLogger};
pub use rule_engine::RuleEngine;
pub use state::AppState;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Full application router: API routes, home and health checks, uploaded
/// media.
pub fn app(state: Arc<AppState>) -> Router {
    let media = ServeDir::new(&state.config.media_root);
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(api::routes())
        .route("/", get(home))
        .route("/health", get(health_check))
        .nest_service("/media", media)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn home() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Backend is running" }))
}

async fn health_check() -> &'static str {
    "OK"
}

fn cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let trimmed = origins.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return layer.allow_origin(Any);
    }

    let list: Vec<HeaderValue> = trimmed
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(list))
}
