//! Error types for pathwarden
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors that are part of the API.
//! A denial is not an error: `check_access` returns a `Decision` value and only
//! the `require` convenience turns it into an `AccessDeniedError`.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Path resolution error: {0}")]
    PathResolution(#[from] PathResolutionError),

    #[error("Access denied: {0}")]
    AccessDenied(#[from] AccessDeniedError),

    #[error("Role token error: {0}")]
    Token(#[from] TokenError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Malformed policy document '{source_id}': {reason}")]
    Parse { source_id: String, reason: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error(
        "Role '{role}' is defined with level {existing_level} in '{existing_source}' \
         and level {conflicting_level} in '{conflicting_source}'"
    )]
    RoleConflict {
        role: String,
        existing_level: i64,
        existing_source: String,
        conflicting_level: i64,
        conflicting_source: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while canonicalizing a path. Never converted into an allow.
#[derive(Error, Debug)]
pub enum PathResolutionError {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Symlink cycle detected while resolving '{}'", path.display())]
    SymlinkCycle { path: PathBuf },

    #[error("Failed to resolve '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Access control errors
#[derive(Error, Debug)]
#[error("{operation} access to '{path}' denied: {reason}")]
pub struct AccessDeniedError {
    pub path: String,
    pub operation: String,
    pub reason: String,
}

impl AccessDeniedError {
    pub fn new(
        path: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Role token verification errors
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Token is not valid UTF-8")]
    Encoding,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token expired")]
    Expired,

    #[error("Token '{0}' has been revoked")]
    Revoked(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, PolicyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_conflict_names_both_levels() {
        let err = ConfigError::RoleConflict {
            role: "admin".into(),
            existing_level: 100,
            existing_source: "/repo/.pathwarden.json".into(),
            conflicting_level: 50,
            conflicting_source: "/repo/app/.pathwarden.json".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
        assert!(msg.contains("app/.pathwarden.json"));
    }

    #[test]
    fn test_access_denied_display() {
        let err = AccessDeniedError::new("secrets/key.pem", "read", "Denied by rule 'secrets/**'");
        assert_eq!(
            err.to_string(),
            "read access to 'secrets/key.pem' denied: Denied by rule 'secrets/**'"
        );
    }

    #[test]
    fn test_errors_convert_into_policy_error() {
        let err: PolicyError = TokenError::Expired.into();
        assert!(matches!(err, PolicyError::Token(TokenError::Expired)));

        let err: PolicyError = PathResolutionError::SymlinkCycle {
            path: PathBuf::from("loop"),
        }
        .into();
        assert!(err.to_string().contains("cycle"));
    }
}
