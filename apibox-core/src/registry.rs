//! Unified route registry
//!
//! Holds a remote's normalized route table in declaration order. Matching is
//! method-agnostic; mapping lookup filters by method and returns the first
//! declared match.

use crate::error::Result;
use crate::pattern::{Captures, RoutePath};
use crate::route::{RouteDefinition, RouteEntry};
use serde::Serialize;
use tracing::trace;

/// Compiled route table for one remote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRegistry {
    routes: Vec<RouteDefinition>,
}

/// A mapping resolved for a concrete path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMapping {
    /// Inbound pattern that matched
    pub route: String,
    /// Method of the matched entry
    pub method: String,
    /// Upstream path with variables substituted
    pub upstream_path: String,
    /// Values bound by the inbound pattern
    pub captures: Captures,
}

impl RouteRegistry {
    /// Normalize and validate a list of route entries
    pub fn build(entries: &[RouteEntry]) -> Result<Self> {
        let routes = entries
            .iter()
            .map(RouteEntry::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(RouteRegistry { routes })
    }

    /// True if any route pattern matches `path`, regardless of method
    pub fn matches(&self, path: &RoutePath) -> bool {
        self.routes.iter().any(|r| r.pattern.matches(path))
    }

    /// First route in declaration order matching `path` and `method`
    pub fn find_mapping(&self, path: &RoutePath, method: &str) -> Option<&RouteDefinition> {
        let found = self
            .routes
            .iter()
            .find(|r| r.method.matches(method) && r.pattern.matches(path));
        trace!(path = %path, method, found = found.is_some(), "route lookup");
        found
    }

    /// Find the mapping for `path` and render its upstream path
    pub fn resolve(&self, path: &RoutePath, method: &str) -> Option<RouteMapping> {
        let definition = self.find_mapping(path, method)?;
        let captures = definition.pattern.captures(path)?;
        let upstream_path = definition.upstream.render(&captures)?;

        Some(RouteMapping {
            route: definition.pattern.to_string(),
            method: definition.method.to_string(),
            upstream_path,
            captures,
        })
    }

    /// Routes in declaration order
    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    /// Number of routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when no routes are configured
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiBoxError;
    use crate::route::MappedRoute;

    fn mixed_registry() -> RouteRegistry {
        RouteRegistry::build(&[
            RouteEntry::from("users"),
            RouteEntry::from("users/{{user_id}}"),
            RouteEntry::from("users/{{user_id}}/profile"),
            RouteEntry::mapped(
                "users/{{user_id}}/permissions",
                Some("user-permissions/{{user_id}}"),
                Some("get"),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_matches_mixed_entries() {
        let registry = mixed_registry();
        assert_eq!(registry.len(), 4);

        assert!(registry.matches(&"users".into()));
        assert!(registry.matches(&"users/123".into()));
        assert!(registry.matches(&"users/123/profile".into()));
        assert!(registry.matches(&"users/123/permissions".into()));
        assert!(!registry.matches(&"users/123/settings".into()));
        assert!(!registry.matches(&"posts".into()));
    }

    #[test]
    fn test_bare_and_structured_behave_alike() {
        let bare = RouteRegistry::build(&[RouteEntry::from("a/{{x}}")]).unwrap();
        let structured = RouteRegistry::build(&[RouteEntry::mapped("a/{{x}}", None, None)]).unwrap();

        for path in ["a/1", "a", "a/1/2", "b/1"] {
            let path = RoutePath::parse(path);
            assert_eq!(bare.matches(&path), structured.matches(&path));
        }
    }

    #[test]
    fn test_find_mapping_filters_method() {
        let registry = RouteRegistry::build(&[
            RouteEntry::mapped("items/{{id}}", Some("v2/items/{{id}}"), Some("post")),
            RouteEntry::from("items/{{id}}"),
        ])
        .unwrap();

        let path = RoutePath::parse("items/9");
        let post = registry.find_mapping(&path, "POST").unwrap();
        assert_eq!(post.upstream.as_str(), "v2/items/{{id}}");

        let get = registry.find_mapping(&path, "get").unwrap();
        assert_eq!(get.upstream.as_str(), "items/{{id}}");

        assert!(registry.find_mapping(&path, "DELETE").is_none());
    }

    #[test]
    fn test_first_declared_match_wins() {
        let registry = RouteRegistry::build(&[
            RouteEntry::mapped("users/{{id}}", Some("first/{{id}}"), None),
            RouteEntry::mapped("users/{{id}}", Some("second/{{id}}"), None),
        ])
        .unwrap();

        let mapping = registry.resolve(&"users/5".into(), "GET").unwrap();
        assert_eq!(mapping.upstream_path, "first/5");
    }

    #[test]
    fn test_resolve_renders_upstream() {
        let registry = mixed_registry();

        let mapping = registry
            .resolve(&"users/123/permissions".into(), "GET")
            .unwrap();
        assert_eq!(mapping.route, "users/{{user_id}}/permissions");
        assert_eq!(mapping.upstream_path, "user-permissions/123");
        assert_eq!(mapping.captures.get("user_id"), Some("123"));

        let identity = registry.resolve(&"users/123".into(), "GET").unwrap();
        assert_eq!(identity.upstream_path, "users/123");

        assert!(registry.resolve(&"users/123/settings".into(), "GET").is_none());
    }

    #[test]
    fn test_build_fails_on_malformed_entry() {
        let err = RouteRegistry::build(&[
            RouteEntry::from("ok"),
            RouteEntry::Mapped(MappedRoute::default()),
        ])
        .unwrap_err();
        assert!(matches!(err, ApiBoxError::ConfigError(_)));

        let err = RouteRegistry::build(&[RouteEntry::from("users/{{id")]).unwrap_err();
        assert!(matches!(err, ApiBoxError::PatternError { .. }));
    }
}
