//! Configuration failures and unknown remotes

use super::sample_config;
use apibox_core::engine::AuthorizationEngine;
use apibox_core::{is_allowed, ApiBoxError, MainConfig};

#[test]
fn test_unknown_remote_is_not_a_denial() {
    let config = sample_config();
    let err = is_allowed("users/123/delete", &config, "nonexistent_remote").unwrap_err();
    assert!(matches!(err, ApiBoxError::RemoteNotFound(ref name) if name == "nonexistent_remote"));
}

#[test]
fn test_engine_counts_unknown_remotes() {
    let engine = AuthorizationEngine::new(sample_config());
    assert!(engine.resolve("users", "ghost", "GET").is_err());
    assert!(engine.authorize("users", "ghost").is_err());
    assert_eq!(engine.metrics().snapshot().not_found, 2);
    assert_eq!(engine.metrics().snapshot().authorizations, 0);
}

#[test]
fn test_route_entry_without_route_key() {
    let err = MainConfig::from_toml_str(
        r#"
        [remotes.broken]
        routes = ["users", { remote_route = "people", method = "get" }]
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ApiBoxError::ConfigError(_)), "{}", err);
}

#[test]
fn test_unterminated_wildcard() {
    for source in [
        r#"restricted_routes = ["users/{{id"]"#,
        "[remotes.a]\nallowed_routes = [\"posts/{{}\"]",
        "[remotes.a]\nroutes = [\"users/{{user id}}\"]",
    ] {
        let err = MainConfig::from_toml_str(source).unwrap_err();
        assert!(
            matches!(err, ApiBoxError::PatternError { .. }),
            "{}: {}",
            source,
            err
        );
    }
}

#[test]
fn test_remote_route_with_unbound_variable() {
    let err = MainConfig::from_toml_str(
        r#"
        [remotes.a]
        routes = [{ route = "users/{{id}}", remote_route = "people/{{user_id}}" }]
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("user_id"), "{}", err);
}
