//! Deny-list resolution
//!
//! Global deny patterns are checked before the remote's own list. Only the
//! boolean outcome matters to callers, but the matching rule is reported so
//! denials can be logged with their cause.

use crate::config::MainConfig;
use crate::error::Result;
use crate::pattern::{first_match, Pattern, RoutePath};
use serde::Serialize;

/// Which deny list produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestrictionSource {
    /// Top-level `restricted_routes`
    Global,
    /// The remote's own `restricted_routes`
    Remote,
}

/// A deny rule that matched a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restriction<'a> {
    /// List the pattern came from
    pub source: RestrictionSource,
    /// The matching pattern
    pub pattern: &'a Pattern,
}

/// Find the first deny rule matching `path` for `remote`.
///
/// Fails with `RemoteNotFound` if the remote is not configured, even when a
/// global rule would match.
pub fn find_restriction<'a>(
    path: &RoutePath,
    config: &'a MainConfig,
    remote: &str,
) -> Result<Option<Restriction<'a>>> {
    let remote_config = config.remote(remote)?;

    if let Some(pattern) = first_match(&config.restricted_routes, path) {
        return Ok(Some(Restriction {
            source: RestrictionSource::Global,
            pattern,
        }));
    }

    Ok(
        first_match(&remote_config.restricted_routes, path).map(|pattern| Restriction {
            source: RestrictionSource::Remote,
            pattern,
        }),
    )
}

/// True iff `path` matches a global or remote-specific deny pattern
pub fn is_restricted(path: &RoutePath, config: &MainConfig, remote: &str) -> Result<bool> {
    Ok(find_restriction(path, config, remote)?.is_some())
}
