//! API Box Core - route authorization for an API gateway
//!
//! Decides whether a request path may be forwarded to a configured remote
//! (global and per-remote deny lists, optional whitelists) and maps allowed
//! requests onto the remote's unified route table.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod pattern;
pub mod registry;
pub mod reload;
pub mod restriction;
pub mod route;
pub mod store;
pub mod watcher;

pub use config::{load_main_config, MainConfig, RemoteConfig};
pub use engine::{
    authorize, is_allowed, AuthorizationEngine, AuthorizationResult, Decision, Dispatch,
    ResolvedRoute,
};
pub use error::{ApiBoxError, Result};
pub use pattern::{matches, Captures, Pattern, RoutePath};
pub use registry::{RouteMapping, RouteRegistry};
pub use restriction::is_restricted;
pub use route::{Method, RouteDefinition, RouteEntry};
pub use store::{ConfigStore, Snapshot};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
