//! Unified route tables and upstream resolution

use super::sample_config;
use apibox_core::engine::{AuthorizationEngine, Dispatch};
use apibox_core::pattern::RoutePath;

#[test]
fn test_unified_table_matching() {
    let config = sample_config();
    let routes = &config.remote("custom_mapping_remote").unwrap().routes;

    for (path, expected) in [
        ("users", true),
        ("users/123", true),
        ("users/123/profile", true),
        ("users/123/permissions", true),
        ("users/123/settings", false),
        ("posts", false),
    ] {
        assert_eq!(routes.matches(&RoutePath::parse(path)), expected, "{}", path);
    }
}

#[test]
fn test_remapped_route_resolution() {
    let engine = AuthorizationEngine::new(sample_config());

    let Dispatch::Forward(route) = engine
        .resolve("users/123/permissions", "custom_mapping_remote", "GET")
        .unwrap()
    else {
        panic!("expected the request to be forwarded");
    };

    assert_eq!(route.route.as_deref(), Some("users/{{user_id}}/permissions"));
    assert_eq!(route.method, "GET");
    assert_eq!(route.upstream_path, "user-permissions/123");
    assert_eq!(
        route.upstream_url.as_deref(),
        Some("http://localhost:9002/user-permissions/123")
    );
}

#[test]
fn test_method_selects_entry() {
    let engine = AuthorizationEngine::new(sample_config());

    let Dispatch::Forward(post) = engine
        .resolve("users/42", "custom_mapping_remote", "post")
        .unwrap()
    else {
        panic!("expected the request to be forwarded");
    };
    assert_eq!(post.method, "POST");
    assert_eq!(post.route.as_deref(), Some("users/{{user_id}}"));
    assert_eq!(post.captures.get("user_id"), Some("42"));

    // No DELETE entry: the request passes through unmapped
    let Dispatch::Forward(delete) = engine
        .resolve("users/42", "custom_mapping_remote", "DELETE")
        .unwrap()
    else {
        panic!("expected the request to be forwarded");
    };
    assert_eq!(delete.route, None);
    assert_eq!(delete.upstream_path, "users/42");
}

#[test]
fn test_denied_requests_are_not_mapped() {
    let engine = AuthorizationEngine::new(sample_config());

    match engine
        .resolve("users/123/settings", "custom_mapping_remote", "GET")
        .unwrap()
    {
        Dispatch::Denied(result) => assert!(!result.is_allowed()),
        Dispatch::Forward(route) => panic!("unexpected forward: {:?}", route),
    }
}
