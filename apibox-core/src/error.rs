//! Error types for API Box

use thiserror::Error;

/// Main error type for API Box operations
#[derive(Error, Debug)]
pub enum ApiBoxError {
    /// Malformed configuration or route entry
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed route pattern syntax
    #[error("Invalid pattern '{pattern}': {reason}")]
    PatternError {
        /// The offending pattern text
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// The requested remote has no configuration entry
    #[error("Remote not found: {0}")]
    RemoteNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML deserialization error
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

impl ApiBoxError {
    /// Build a pattern error
    pub fn pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        ApiBoxError::PatternError {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// True when the error signals an unknown remote rather than a bad config
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiBoxError::RemoteNotFound(_))
    }
}

/// Result type alias for API Box operations
pub type Result<T> = std::result::Result<T, ApiBoxError>;
