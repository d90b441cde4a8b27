//! API request and response types

use apibox_core::engine::Decision as CoreDecision;
use apibox_core::{AuthorizationResult, RemoteConfig};
use serde::{Deserialize, Serialize};

/// Authorization request
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    /// Remote the request targets
    pub remote: String,

    /// Request path relative to the remote, e.g. `users/123/profile`
    pub path: String,
}

/// Authorization decision on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Request may proceed
    Allow,
    /// Matched a global deny pattern
    DenyGlobal,
    /// Matched a remote deny pattern
    DenyRemote,
    /// Whitelist mode and no allowed pattern matched
    DenyNotWhitelisted,
    /// Remote is not configured
    NotFound,
}

impl From<CoreDecision> for Decision {
    fn from(decision: CoreDecision) -> Self {
        match decision {
            CoreDecision::Allow => Decision::Allow,
            CoreDecision::DenyGlobal => Decision::DenyGlobal,
            CoreDecision::DenyRemote => Decision::DenyRemote,
            CoreDecision::DenyNotWhitelisted => Decision::DenyNotWhitelisted,
        }
    }
}

/// Authorization response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeResponse {
    /// Remote the request targeted
    pub remote: String,

    /// Normalized path
    pub path: String,

    /// Shorthand for `decision == ALLOW`
    pub allowed: bool,

    /// Authorization decision
    pub decision: Decision,

    /// Human-readable reason
    pub reason: String,

    /// Pattern responsible for the decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,

    /// Diagnostic information (only in debug mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

impl AuthorizeResponse {
    /// Build a response from an engine result
    pub fn from_result(result: AuthorizationResult, debug: bool) -> Self {
        let diagnostics = debug.then(|| Diagnostics {
            evaluation_time_ms: result.evaluation_time_ns as f64 / 1_000_000.0,
        });
        AuthorizeResponse {
            allowed: result.is_allowed(),
            decision: result.decision.into(),
            remote: result.remote,
            path: result.path,
            reason: result.explanation,
            matched_pattern: result.matched_pattern,
            diagnostics,
        }
    }

    /// Response for a remote that is not configured
    pub fn not_found(remote: String, path: String) -> Self {
        AuthorizeResponse {
            reason: format!("Remote '{}' not found", remote),
            remote,
            path,
            allowed: false,
            decision: Decision::NotFound,
            matched_pattern: None,
            diagnostics: None,
        }
    }
}

/// Diagnostic information for debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Time taken to evaluate (milliseconds)
    pub evaluation_time_ms: f64,
}

/// Batch authorization request
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAuthorizeRequest {
    /// Multiple authorization requests
    pub requests: Vec<AuthorizeRequest>,
}

/// Batch authorization response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAuthorizeResponse {
    /// Results for each request, in request order
    pub results: Vec<AuthorizeResponse>,
}

/// Summary of one configured remote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSummary {
    /// Remote name
    pub name: String,

    /// Upstream base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether only whitelisted routes are allowed
    pub whitelisted: bool,

    /// Number of remote-specific deny patterns
    pub restricted_routes: usize,

    /// Number of unified route entries
    pub routes: usize,
}

impl From<&RemoteConfig> for RemoteSummary {
    fn from(remote: &RemoteConfig) -> Self {
        RemoteSummary {
            name: remote.name.clone(),
            url: remote.url.clone(),
            description: remote.description.clone(),
            whitelisted: remote.is_whitelisted(),
            restricted_routes: remote.restricted_routes.len(),
            routes: remote.routes.len(),
        }
    }
}

/// Remote listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotesResponse {
    /// Configuration generation the listing came from
    pub generation: u64,

    /// Global deny patterns
    pub restricted_routes: Vec<String>,

    /// Remotes in name order
    pub remotes: Vec<RemoteSummary>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status
    pub status: HealthStatus,

    /// Service version
    pub version: String,

    /// Uptime in seconds
    pub uptime_seconds: u64,

    /// Number of configured remotes
    pub loaded_remotes: usize,

    /// Live configuration generation
    pub config_generation: u64,
}

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Service is healthy
    Healthy,
    /// Running, but with no remotes configured
    Degraded,
}
