//! API Box HTTP Server
//!
//! Exposes the route authorization engine over HTTP: JSON decision endpoints
//! for other services, and a gate that answers `/{remote}/{path}` requests
//! the way the gateway's dispatch layer would.

pub mod api;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod state;

pub use api::{AuthorizeRequest, AuthorizeResponse, HealthResponse};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use std::path::PathBuf;

use axum::{
    routing::{any, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Configuration file used when `APIBOX_CONFIG` is unset
pub const DEFAULT_CONFIG: &str = "config/apibox.toml";

/// Configuration path from the value of `APIBOX_CONFIG`, if any
pub fn config_path(value: Option<String>) -> PathBuf {
    match value {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG),
    }
}

/// Build the application router.
///
/// Fixed endpoints take priority over the gate, so remotes named `v1`,
/// `health` or `metrics` cannot be reached through it.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Decision endpoints
        .route("/v1/authorize", post(handlers::authorize))
        .route("/v1/authorize/batch", post(handlers::batch_authorize))
        .route("/v1/remotes", get(handlers::list_remotes))
        // Health checks
        .route("/health/live", get(handlers::health_live))
        .route("/health/ready", get(handlers::health_ready))
        // Metrics
        .route("/metrics", get(handlers::metrics))
        // Gate
        .route("/:remote", any(handlers::gate_root))
        .route("/:remote/*path", any(handlers::gate))
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
