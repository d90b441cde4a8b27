//! HTTP request handlers

use crate::api::{
    AuthorizeRequest, AuthorizeResponse, BatchAuthorizeRequest, BatchAuthorizeResponse,
    HealthResponse, HealthStatus, RemoteSummary, RemotesResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::metrics as telemetry;
use crate::state::AppState;
use apibox_core::{ApiBoxError, AuthorizationResult, Dispatch, ResolvedRoute};
use axum::{
    extract::{Path, Query, State},
    http::Method,
    Json,
};
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Maximum number of requests in one batch
pub const MAX_BATCH_SIZE: usize = 100;

/// Query parameters for debug mode
#[derive(Debug, Deserialize)]
pub struct DebugParams {
    #[serde(default)]
    debug: bool,
}

/// Count an engine outcome in Prometheus
fn observe(
    outcome: apibox_core::Result<AuthorizationResult>,
    start: Instant,
) -> apibox_core::Result<AuthorizationResult> {
    match &outcome {
        Ok(result) => {
            telemetry::record_authorization(result.decision.as_str(), start.elapsed().as_secs_f64())
        }
        Err(e) if e.is_not_found() => telemetry::record_remote_not_found(),
        Err(_) => {}
    }
    outcome
}

/// Handle authorization request
pub async fn authorize(
    State(state): State<AppState>,
    Query(params): Query<DebugParams>,
    Json(req): Json<AuthorizeRequest>,
) -> ApiResult<Json<AuthorizeResponse>> {
    let start = Instant::now();
    debug!("Authorization request: {:?}", req);

    let result = observe(state.engine.authorize(&req.path, &req.remote), start)?;

    info!(
        "Authorization: {} {} -> {} ({:.3}ms)",
        req.remote,
        result.path,
        result.decision.as_str(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(Json(AuthorizeResponse::from_result(
        result,
        state.debug || params.debug,
    )))
}

/// Handle batch authorization request
pub async fn batch_authorize(
    State(state): State<AppState>,
    Query(params): Query<DebugParams>,
    Json(req): Json<BatchAuthorizeRequest>,
) -> ApiResult<Json<BatchAuthorizeResponse>> {
    let start = Instant::now();
    debug!("Batch authorization request: {} requests", req.requests.len());

    if req.requests.is_empty() {
        return Err(ApiError::BadRequest("No requests provided".to_string()));
    }

    if req.requests.len() > MAX_BATCH_SIZE {
        return Err(ApiError::BadRequest(format!(
            "Too many requests (max {})",
            MAX_BATCH_SIZE
        )));
    }

    telemetry::record_batch(req.requests.len());
    let debug = state.debug || params.debug;
    let mut results = Vec::with_capacity(req.requests.len());

    for item in req.requests {
        let item_start = Instant::now();
        match observe(state.engine.authorize(&item.path, &item.remote), item_start) {
            Ok(result) => results.push(AuthorizeResponse::from_result(result, debug)),
            Err(ApiBoxError::RemoteNotFound(_)) => {
                results.push(AuthorizeResponse::not_found(item.remote, item.path))
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        "Batch authorization: {} requests processed in {:.2}ms",
        results.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(Json(BatchAuthorizeResponse { results }))
}

/// List configured remotes
pub async fn list_remotes(State(state): State<AppState>) -> Json<RemotesResponse> {
    let snapshot = state.engine.store().snapshot();
    let config = &snapshot.config;
    Json(RemotesResponse {
        generation: snapshot.generation,
        restricted_routes: config
            .restricted_routes
            .iter()
            .map(ToString::to_string)
            .collect(),
        remotes: config.remotes.values().map(RemoteSummary::from).collect(),
    })
}

/// Gate for a bare remote: reports what the remote is
pub async fn gate_root(
    State(state): State<AppState>,
    Path(remote): Path<String>,
) -> ApiResult<Json<RemoteSummary>> {
    let config = state.engine.snapshot();
    match config.remote(&remote) {
        Ok(remote_config) => Ok(Json(RemoteSummary::from(remote_config))),
        Err(e) => {
            telemetry::record_remote_not_found();
            Err(e.into())
        }
    }
}

/// Gate for `/{remote}/{path}`: authorize, then return the dispatch plan
pub async fn gate(
    State(state): State<AppState>,
    method: Method,
    Path((remote, path)): Path<(String, String)>,
) -> ApiResult<Json<ResolvedRoute>> {
    let start = Instant::now();

    let dispatch = match state.engine.resolve(&path, &remote, method.as_str()) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            if e.is_not_found() {
                telemetry::record_remote_not_found();
            }
            return Err(e.into());
        }
    };
    let latency = start.elapsed().as_secs_f64();

    match dispatch {
        Dispatch::Denied(result) => {
            telemetry::record_authorization(result.decision.as_str(), latency);
            info!(
                "Gate denied {} {}/{}: {}",
                method, remote, result.path, result.explanation
            );
            Err(ApiError::Forbidden(format!(
                "Route '{}' is not allowed for remote '{}'",
                result.path, remote
            )))
        }
        Dispatch::Forward(route) => {
            telemetry::record_authorization("allow", latency);
            debug!(
                "Gate forward {} {}/{} -> {} {}",
                method, remote, path, route.method, route.upstream_path
            );
            Ok(Json(route))
        }
    }
}

fn health(state: &AppState, status: HealthStatus) -> HealthResponse {
    let snapshot = state.engine.store().snapshot();
    HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        loaded_remotes: snapshot.config.remotes.len(),
        config_generation: snapshot.generation,
    }
}

/// Health check - liveness probe
pub async fn health_live(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.engine.snapshot().remotes.is_empty() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };
    Json(health(&state, status))
}

/// Health check - readiness probe
pub async fn health_ready(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    if state.engine.snapshot().remotes.is_empty() {
        warn!("Readiness check failed: no remotes configured");
        return Err(ApiError::ServiceUnavailable(
            "No remotes configured".to_string(),
        ));
    }
    Ok(Json(health(&state, HealthStatus::Healthy)))
}

/// Prometheus metrics endpoint
pub async fn metrics() -> String {
    telemetry::get_prometheus_metrics()
}
