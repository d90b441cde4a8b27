//! Unified route entries
//!
//! A remote's `routes` list mixes bare pattern strings with structured
//! entries carrying an HTTP method and an upstream remapping. Both shapes are
//! normalized at load time into [`RouteDefinition`].

use crate::error::{ApiBoxError, Result};
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default method for bare route strings and entries without `method`
pub const DEFAULT_METHOD: &str = "GET";

/// A route entry as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteEntry {
    /// Bare pattern string: `GET`, no remapping
    Literal(String),
    /// Structured entry
    Mapped(MappedRoute),
}

/// Structured route entry fields.
///
/// `route` is optional at the serde level so a missing key surfaces as a
/// configuration error naming the entry rather than an opaque parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedRoute {
    /// Inbound pattern (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Upstream path template, defaults to `route`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_route: Option<String>,
    /// HTTP verb, defaults to `GET`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl RouteEntry {
    /// Structured entry shorthand
    pub fn mapped(
        route: impl Into<String>,
        remote_route: Option<&str>,
        method: Option<&str>,
    ) -> Self {
        RouteEntry::Mapped(MappedRoute {
            route: Some(route.into()),
            remote_route: remote_route.map(str::to_string),
            method: method.map(str::to_string),
        })
    }

    /// Normalize into a compiled definition
    pub fn compile(&self) -> Result<RouteDefinition> {
        match self {
            RouteEntry::Literal(route) => {
                let pattern = compile_route(route)?;
                Ok(RouteDefinition {
                    upstream: pattern.clone(),
                    pattern,
                    method: Method::get(),
                })
            }
            RouteEntry::Mapped(mapped) => {
                let route = mapped.route.as_deref().ok_or_else(|| {
                    ApiBoxError::ConfigError(format!(
                        "route entry is missing the 'route' key: {:?}",
                        mapped
                    ))
                })?;
                let pattern = compile_route(route)?;

                let upstream = match mapped.remote_route.as_deref() {
                    Some(remote_route) => {
                        let upstream = Pattern::parse(remote_route)?;
                        check_upstream_variables(&pattern, &upstream)?;
                        upstream
                    }
                    None => pattern.clone(),
                };

                let method = match mapped.method.as_deref() {
                    Some(m) => Method::parse(m)?,
                    None => Method::get(),
                };

                Ok(RouteDefinition {
                    pattern,
                    upstream,
                    method,
                })
            }
        }
    }
}

impl From<&str> for RouteEntry {
    fn from(route: &str) -> Self {
        RouteEntry::Literal(route.to_string())
    }
}

fn compile_route(route: &str) -> Result<Pattern> {
    if route.trim_matches('/').is_empty() {
        return Err(ApiBoxError::ConfigError(
            "route entry has an empty 'route' pattern".to_string(),
        ));
    }
    Pattern::parse(route)
}

fn check_upstream_variables(route: &Pattern, upstream: &Pattern) -> Result<()> {
    for name in upstream.variable_names() {
        if !route.variable_names().any(|n| n == name) {
            return Err(ApiBoxError::ConfigError(format!(
                "remote_route '{}' uses variable '{}' not bound by route '{}'",
                upstream, name, route
            )));
        }
    }
    if upstream.anonymous_count() > route.anonymous_count() {
        return Err(ApiBoxError::ConfigError(format!(
            "remote_route '{}' has more '{{{{}}}}' wildcards than route '{}'",
            upstream, route
        )));
    }
    Ok(())
}

/// Upper-cased HTTP method token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Method(String);

impl Method {
    /// `GET`
    pub fn get() -> Self {
        Method(DEFAULT_METHOD.to_string())
    }

    /// Parse a method token, case-insensitively
    pub fn parse(input: &str) -> Result<Self> {
        let token = input.trim();
        if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ApiBoxError::ConfigError(format!(
                "invalid HTTP method '{}'",
                input
            )));
        }
        Ok(Method(token.to_ascii_uppercase()))
    }

    /// Case-insensitive comparison with a raw method string
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }

    /// Method as an upper-case string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized route: inbound pattern, upstream template and method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    /// Pattern tested by authorization and lookup
    pub pattern: Pattern,
    /// Upstream path template
    pub upstream: Pattern,
    /// HTTP method
    pub method: Method,
}

impl RouteDefinition {
    /// True when the upstream path differs from the inbound pattern
    pub fn is_remapped(&self) -> bool {
        self.pattern.as_str() != self.upstream.as_str()
    }
}
