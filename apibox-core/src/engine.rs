//! Route authorization engine
//!
//! Decides whether a path may be forwarded to a remote. Precedence is fixed:
//!
//! 1. unknown remote: `RemoteNotFound`
//! 2. global deny, then remote deny: denied, whatever the whitelist says
//! 3. non-empty whitelist: allowed only if a whitelist pattern matches
//! 4. otherwise allowed

use crate::config::MainConfig;
use crate::error::Result;
use crate::pattern::{first_match, Captures, RoutePath};
use crate::restriction::{find_restriction, RestrictionSource};
use crate::store::ConfigStore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, trace};

/// Authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Request may proceed
    Allow,
    /// Matched a global deny pattern
    DenyGlobal,
    /// Matched the remote's own deny pattern
    DenyRemote,
    /// Remote is in whitelist mode and nothing matched
    DenyNotWhitelisted,
}

impl Decision {
    /// Check if decision allows the request
    pub fn is_permitted(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::DenyGlobal => "deny_global",
            Decision::DenyRemote => "deny_remote",
            Decision::DenyNotWhitelisted => "deny_not_whitelisted",
        }
    }
}

impl From<RestrictionSource> for Decision {
    fn from(source: RestrictionSource) -> Self {
        match source {
            RestrictionSource::Global => Decision::DenyGlobal,
            RestrictionSource::Remote => Decision::DenyRemote,
        }
    }
}

/// Authorization result with details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    /// Remote the request targets
    pub remote: String,
    /// Normalized request path
    pub path: String,
    /// The decision
    pub decision: Decision,
    /// Pattern responsible for the decision, if any
    pub matched_pattern: Option<String>,
    /// Explanation for the decision
    pub explanation: String,
    /// Evaluation time in nanoseconds
    pub evaluation_time_ns: u64,
}

impl AuthorizationResult {
    /// Shorthand for `decision.is_permitted()`
    pub fn is_allowed(&self) -> bool {
        self.decision.is_permitted()
    }
}

/// Authorize `path` against `remote` using an explicit configuration snapshot
pub fn authorize(path: &str, config: &MainConfig, remote: &str) -> Result<AuthorizationResult> {
    evaluate(&RoutePath::parse(path), config, remote)
}

/// Boolean form of [`authorize`]
pub fn is_allowed(path: &str, config: &MainConfig, remote: &str) -> Result<bool> {
    Ok(authorize(path, config, remote)?.is_allowed())
}

fn evaluate(path: &RoutePath, config: &MainConfig, remote: &str) -> Result<AuthorizationResult> {
    let start = Instant::now();
    let remote_config = config.remote(remote)?;

    let (decision, matched_pattern, explanation) =
        if let Some(restriction) = find_restriction(path, config, remote)? {
            let scope = match restriction.source {
                RestrictionSource::Global => "global",
                RestrictionSource::Remote => "remote",
            };
            (
                Decision::from(restriction.source),
                Some(restriction.pattern.to_string()),
                format!("route restricted by {} rule '{}'", scope, restriction.pattern),
            )
        } else if let Some(whitelist) = remote_config.whitelist() {
            match first_match(whitelist, path) {
                Some(pattern) => (
                    Decision::Allow,
                    Some(pattern.to_string()),
                    format!("route allowed by whitelist entry '{}'", pattern),
                ),
                None => (
                    Decision::DenyNotWhitelisted,
                    None,
                    "route not in allowed_routes".to_string(),
                ),
            }
        } else {
            (Decision::Allow, None, "no restriction matched".to_string())
        };

    if !decision.is_permitted() {
        debug!(
            remote,
            path = %path,
            decision = decision.as_str(),
            pattern = ?matched_pattern,
            "Route denied"
        );
    } else {
        trace!(remote, path = %path, "Route allowed");
    }

    Ok(AuthorizationResult {
        remote: remote.to_string(),
        path: path.to_string(),
        decision,
        matched_pattern,
        explanation,
        evaluation_time_ns: start.elapsed().as_nanos() as u64,
    })
}

/// Where an authorized request should go upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRoute {
    /// Remote name
    pub remote: String,
    /// Upstream method
    pub method: String,
    /// Unified route that matched, if any
    pub route: Option<String>,
    /// Upstream path after remapping
    pub upstream_path: String,
    /// Remote base URL joined with the upstream path
    pub upstream_url: Option<String>,
    /// Values bound by the matched route
    pub captures: Captures,
}

/// Outcome of authorizing and mapping a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Authorization failed
    Denied(AuthorizationResult),
    /// Authorized; forward as described
    Forward(ResolvedRoute),
}

/// Authorization engine bound to a live configuration store
pub struct AuthorizationEngine {
    /// Published configuration
    store: ConfigStore,
    /// Metrics
    metrics: Arc<EngineMetrics>,
}

impl AuthorizationEngine {
    /// Create an engine over an initial configuration
    pub fn new(config: MainConfig) -> Self {
        Self::with_store(ConfigStore::new(config))
    }

    /// Create an engine sharing an existing store
    pub fn with_store(store: ConfigStore) -> Self {
        AuthorizationEngine {
            store,
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// Authorize a request against the current snapshot
    #[instrument(skip(self), level = "debug")]
    pub fn authorize(&self, path: &str, remote: &str) -> Result<AuthorizationResult> {
        let config = self.store.load();
        match authorize(path, &config, remote) {
            Ok(result) => {
                self.metrics.record_authorization(result.decision);
                Ok(result)
            }
            Err(e) => {
                if e.is_not_found() {
                    self.metrics.record_not_found();
                }
                Err(e)
            }
        }
    }

    /// Boolean form of [`AuthorizationEngine::authorize`]
    pub fn is_allowed(&self, path: &str, remote: &str) -> Result<bool> {
        Ok(self.authorize(path, remote)?.is_allowed())
    }

    /// Authorize, then map the request onto the remote's route table.
    ///
    /// Both steps read the same snapshot. Paths with no unified route are
    /// forwarded unchanged with the requested method.
    #[instrument(skip(self), level = "debug")]
    pub fn resolve(&self, path: &str, remote: &str, method: &str) -> Result<Dispatch> {
        let config = self.store.load();
        let route_path = RoutePath::parse(path);

        let result = match evaluate(&route_path, &config, remote) {
            Ok(result) => result,
            Err(e) => {
                if e.is_not_found() {
                    self.metrics.record_not_found();
                }
                return Err(e);
            }
        };
        self.metrics.record_authorization(result.decision);

        if !result.is_allowed() {
            return Ok(Dispatch::Denied(result));
        }

        let remote_config = config.remote(remote)?;
        let (route, method, upstream_path, captures) =
            match remote_config.routes.resolve(&route_path, method) {
                Some(mapping) => (
                    Some(mapping.route),
                    mapping.method,
                    mapping.upstream_path,
                    mapping.captures,
                ),
                None => (
                    None,
                    method.trim().to_ascii_uppercase(),
                    route_path.to_string(),
                    Captures::default(),
                ),
            };

        let upstream_url = remote_config
            .url
            .as_deref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), upstream_path));

        Ok(Dispatch::Forward(ResolvedRoute {
            remote: remote.to_string(),
            method,
            route,
            upstream_path,
            upstream_url,
            captures,
        }))
    }

    /// Publish a new configuration, returning its generation
    pub fn reload(&self, config: MainConfig) -> u64 {
        self.store.publish(config)
    }

    /// Current configuration snapshot
    pub fn snapshot(&self) -> Arc<MainConfig> {
        self.store.load()
    }

    /// The underlying store
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Get engine metrics
    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.metrics.clone()
    }
}

/// Engine metrics
#[derive(Debug, Default)]
pub struct EngineMetrics {
    total_authorizations: AtomicU64,
    total_allows: AtomicU64,
    total_deny_global: AtomicU64,
    total_deny_remote: AtomicU64,
    total_deny_not_whitelisted: AtomicU64,
    total_not_found: AtomicU64,
}

/// Point-in-time copy of [`EngineMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Decisions made
    pub authorizations: u64,
    /// Allowed
    pub allows: u64,
    /// Denied by global rules
    pub deny_global: u64,
    /// Denied by remote rules
    pub deny_remote: u64,
    /// Denied by whitelist mode
    pub deny_not_whitelisted: u64,
    /// Lookups for unknown remotes
    pub not_found: u64,
}

impl EngineMetrics {
    fn new() -> Self {
        Self::default()
    }

    fn record_authorization(&self, decision: Decision) {
        self.total_authorizations.fetch_add(1, Ordering::Relaxed);

        let counter = match decision {
            Decision::Allow => &self.total_allows,
            Decision::DenyGlobal => &self.total_deny_global,
            Decision::DenyRemote => &self.total_deny_remote,
            Decision::DenyNotWhitelisted => &self.total_deny_not_whitelisted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_not_found(&self) {
        self.total_not_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            authorizations: self.total_authorizations.load(Ordering::Relaxed),
            allows: self.total_allows.load(Ordering::Relaxed),
            deny_global: self.total_deny_global.load(Ordering::Relaxed),
            deny_remote: self.total_deny_remote.load(Ordering::Relaxed),
            deny_not_whitelisted: self.total_deny_not_whitelisted.load(Ordering::Relaxed),
            not_found: self.total_not_found.load(Ordering::Relaxed),
        }
    }
}
