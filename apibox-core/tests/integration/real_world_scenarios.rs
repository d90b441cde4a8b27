//! Restriction scenarios across the sample remotes

use super::{check_cases, sample_config};
use apibox_core::engine::{authorize, Decision};

#[test]
fn test_global_restrictions_apply_to_every_remote() {
    let config = sample_config();

    for remote in config.remote_names() {
        let result = authorize("users/123/delete", &config, remote).unwrap();
        assert_eq!(result.decision, Decision::DenyGlobal, "remote {}", remote);

        let result = authorize("admin/999/dangerous", &config, remote).unwrap();
        assert_eq!(result.decision, Decision::DenyGlobal, "remote {}", remote);
    }

    check_cases(
        &config,
        &[
            ("users/123/profile", "remote_4321", true),
            ("users/456/settings", "remote_4321", true),
            ("admin/safe", "remote_4321", true),
        ],
    );
}

#[test]
fn test_remote_specific_restrictions() {
    check_cases(
        &sample_config(),
        &[
            ("users/123/permissions", "restricted_remote", false),
            ("admin", "restricted_remote", false),
            ("admin/dashboard", "restricted_remote", false),
            ("system/prod/config", "restricted_remote", false),
            ("users/123/private", "restricted_remote", false),
            // Same paths on a remote without those rules
            ("users/123/permissions", "remote_4321", true),
            ("users/123/permissions", "basic_remote", true),
            ("admin", "remote_4321", true),
            ("admin/dashboard", "basic_remote", true),
            ("system/prod/config", "remote_4321", true),
            ("users/123/settings", "another_name", false),
            ("users/123/settings", "remote_4321", true),
            ("users/123/profile", "restricted_remote", true),
            ("users/123/posts", "restricted_remote", true),
        ],
    );
}

#[test]
fn test_whitelist_remote() {
    let config = sample_config();
    check_cases(
        &config,
        &[
            ("users", "allowed_routes_remote", true),
            ("users/123", "allowed_routes_remote", true),
            ("users/123/profile", "allowed_routes_remote", true),
            ("users/123/posts", "allowed_routes_remote", true),
            ("posts", "allowed_routes_remote", true),
            ("posts/456", "allowed_routes_remote", true),
            ("health", "allowed_routes_remote", true),
            ("users/123/settings", "allowed_routes_remote", false),
            ("users/123/permissions", "allowed_routes_remote", false),
            ("admin", "allowed_routes_remote", false),
            ("admin/dashboard", "allowed_routes_remote", false),
            ("system/config", "allowed_routes_remote", false),
            ("api/docs", "allowed_routes_remote", false),
            ("users/123/public", "allowed_routes_remote", false),
            ("posts/456/comments", "allowed_routes_remote", false),
        ],
    );

    let result = authorize("users/123/settings", &config, "allowed_routes_remote").unwrap();
    assert_eq!(result.decision, Decision::DenyNotWhitelisted);
    assert_eq!(result.matched_pattern, None);
}

#[test]
fn test_deny_beats_whitelist() {
    let config = sample_config();
    let result = authorize("users/456/delete", &config, "allowed_routes_remote").unwrap();
    assert_eq!(result.decision, Decision::DenyGlobal);
    assert_eq!(result.matched_pattern.as_deref(), Some("users/{{}}/delete"));
}

#[test]
fn test_custom_mapping_remote_precedence() {
    check_cases(
        &sample_config(),
        &[
            ("users/123/profile", "custom_mapping_remote", true),
            ("users/123/settings", "custom_mapping_remote", false),
            ("users/123/delete", "custom_mapping_remote", false),
            // Routes outside the unified table are still default-allowed
            ("users/123/other", "another_name", true),
            ("users/123/permissions", "another_name", true),
        ],
    );
}

#[test]
fn test_slashes_are_normalized() {
    check_cases(
        &sample_config(),
        &[
            ("/users/123/delete/", "basic_remote", false),
            ("/health/", "allowed_routes_remote", true),
            ("//admin//", "restricted_remote", false),
        ],
    );
}

#[test]
fn test_repeated_slashes_cannot_skip_deny_rules() {
    let config = sample_config();
    check_cases(
        &config,
        &[
            ("users/123//delete", "basic_remote", false),
            ("users//123///delete", "remote_4321", false),
            ("admin//999//dangerous", "allowed_routes_remote", false),
            ("users/123//permissions", "restricted_remote", false),
            ("system//prod/config", "restricted_remote", false),
            ("users//123//settings", "another_name", false),
        ],
    );

    let result = authorize("users/123//permissions", &config, "restricted_remote").unwrap();
    assert_eq!(result.decision, Decision::DenyRemote);
    assert_eq!(result.path, "users/123/permissions");
}

#[test]
fn test_repeated_slashes_in_whitelist_mode() {
    check_cases(
        &sample_config(),
        &[
            ("users//123", "allowed_routes_remote", true),
            ("posts///7", "allowed_routes_remote", true),
            ("users//123//comments", "allowed_routes_remote", false),
            ("users/123//delete", "allowed_routes_remote", false),
        ],
    );
}
