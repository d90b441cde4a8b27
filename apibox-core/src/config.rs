//! Gateway configuration
//!
//! The on-disk schema ([`MainConfigFile`]) is plain serde data. Loading
//! compiles every pattern and route table into a [`MainConfig`], which is
//! immutable from then on; reload publishes a new one.

use crate::error::{ApiBoxError, Result};
use crate::pattern::{parse_patterns, Pattern};
use crate::registry::RouteRegistry;
use crate::route::RouteEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Configuration file schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MainConfigFile {
    /// Project name
    pub name: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Global deny patterns, applied to every remote
    pub restricted_routes: Vec<String>,
    /// Remote definitions by name
    pub remotes: BTreeMap<String, RemoteConfigFile>,
}

/// Per-remote section of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfigFile {
    /// Upstream base URL
    pub url: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Remote-specific deny patterns
    pub restricted_routes: Vec<String>,
    /// Whitelist; when non-empty only these patterns are allowed
    pub allowed_routes: Option<Vec<String>>,
    /// Unified route table
    pub routes: Vec<RouteEntry>,
}

/// Compiled, immutable gateway configuration
#[derive(Debug, Clone, Default)]
pub struct MainConfig {
    /// Project name
    pub name: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Global deny patterns
    pub restricted_routes: Vec<Pattern>,
    /// Remotes by name
    pub remotes: BTreeMap<String, RemoteConfig>,
}

/// Compiled configuration of one remote
#[derive(Debug, Clone, Default)]
pub struct RemoteConfig {
    /// Remote name
    pub name: String,
    /// Upstream base URL
    pub url: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Remote-specific deny patterns
    pub restricted_routes: Vec<Pattern>,
    /// Whitelist patterns, if configured
    pub allowed_routes: Option<Vec<Pattern>>,
    /// Unified route table
    pub routes: RouteRegistry,
}

impl RemoteConfig {
    /// Compile one remote section
    pub fn compile(name: &str, file: &RemoteConfigFile) -> Result<Self> {
        let restricted_routes = parse_patterns(&file.restricted_routes)
            .map_err(|e| in_context(e, &format!("remote '{}' restricted_routes", name)))?;

        let allowed_routes = file
            .allowed_routes
            .as_deref()
            .map(|patterns| parse_patterns(patterns))
            .transpose()
            .map_err(|e| in_context(e, &format!("remote '{}' allowed_routes", name)))?;

        let routes = RouteRegistry::build(&file.routes)
            .map_err(|e| in_context(e, &format!("remote '{}' routes", name)))?;

        Ok(RemoteConfig {
            name: name.to_string(),
            url: file.url.clone(),
            description: file.description.clone(),
            restricted_routes,
            allowed_routes,
            routes,
        })
    }

    /// Non-empty whitelist patterns, if whitelist mode is engaged
    pub fn whitelist(&self) -> Option<&[Pattern]> {
        self.allowed_routes
            .as_deref()
            .filter(|patterns| !patterns.is_empty())
    }

    /// True when only whitelisted patterns are allowed
    pub fn is_whitelisted(&self) -> bool {
        self.whitelist().is_some()
    }
}

impl MainConfig {
    /// Compile a parsed configuration file
    pub fn compile(file: &MainConfigFile) -> Result<Self> {
        let restricted_routes = parse_patterns(&file.restricted_routes)
            .map_err(|e| in_context(e, "global restricted_routes"))?;

        let remotes = file
            .remotes
            .iter()
            .map(|(name, remote)| -> Result<(String, RemoteConfig)> {
                Ok((name.clone(), RemoteConfig::compile(name, remote)?))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(MainConfig {
            name: file.name.clone(),
            description: file.description.clone(),
            restricted_routes,
            remotes,
        })
    }

    /// Parse and compile TOML text
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let file: MainConfigFile = toml::from_str(input)?;
        Self::compile(&file)
    }

    /// Look up a remote by name
    pub fn remote(&self, name: &str) -> Result<&RemoteConfig> {
        self.remotes
            .get(name)
            .ok_or_else(|| ApiBoxError::RemoteNotFound(name.to_string()))
    }

    /// Remote names in sorted order
    pub fn remote_names(&self) -> impl Iterator<Item = &str> {
        self.remotes.keys().map(String::as_str)
    }
}

/// Load and compile a configuration file
pub fn load_main_config(path: impl AsRef<Path>) -> Result<MainConfig> {
    let path = path.as_ref();
    debug!("Loading configuration from {:?}", path);

    let content = std::fs::read_to_string(path)?;
    let config = MainConfig::from_toml_str(&content)
        .map_err(|e| in_context(e, &format!("{}", path.display())))?;

    info!(
        remotes = config.remotes.len(),
        global_restrictions = config.restricted_routes.len(),
        "Loaded configuration from {:?}",
        path
    );
    Ok(config)
}

fn in_context(err: ApiBoxError, context: &str) -> ApiBoxError {
    match err {
        ApiBoxError::ConfigError(msg) => ApiBoxError::ConfigError(format!("{}: {}", context, msg)),
        ApiBoxError::PatternError { pattern, reason } => ApiBoxError::PatternError {
            pattern,
            reason: format!("{} (in {})", reason, context),
        },
        other => other,
    }
}
