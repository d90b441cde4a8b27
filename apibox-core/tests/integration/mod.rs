//! End-to-end scenarios against the sample gateway configuration
//!
//! - Restriction and whitelist behavior per remote
//! - Unified route tables and upstream remapping
//! - Configuration errors and unknown remotes

pub mod error_scenarios;
pub mod real_world_scenarios;
pub mod route_mapping;

use apibox_core::{load_main_config, MainConfig};
use std::path::PathBuf;

/// Path of the sample configuration shipped with the repository
pub fn sample_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../config/apibox.toml")
}

/// Load the sample configuration
pub fn sample_config() -> MainConfig {
    load_main_config(sample_config_path()).expect("sample config should load")
}

/// Check a table of `(path, remote, expected)` cases, reporting every failure
pub fn check_cases(config: &MainConfig, cases: &[(&str, &str, bool)]) {
    let failures: Vec<String> = cases
        .iter()
        .filter_map(|(path, remote, expected)| {
            let actual = apibox_core::is_allowed(path, config, remote)
                .unwrap_or_else(|e| panic!("{} on {}: {}", path, remote, e));
            (actual != *expected).then(|| {
                format!("{} on {}: expected {}, got {}", path, remote, expected, actual)
            })
        })
        .collect();

    assert!(failures.is_empty(), "failed cases:\n{}", failures.join("\n"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_loads() {
        let config = sample_config();
        assert_eq!(config.name.as_deref(), Some("test_project"));
        assert_eq!(config.restricted_routes.len(), 2);
        assert_eq!(config.remotes.len(), 6);
    }
}
