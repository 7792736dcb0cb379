//! Configuration loading
//!
//! Engine settings come from layered sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (PATHWARDEN__*)
//! 2. Settings file (TOML)
//! 3. Default values
//!
//! Policy documents are discovered one per directory from the project root down
//! to the working directory and merged least specific first.

use crate::config::types::{EngineSettings, PolicyDocument};
use crate::error::ConfigError;
use crate::policy::{PolicyStore, ResolvedPolicy};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default settings file paths to check (in order)
const DEFAULT_SETTINGS_PATHS: &[&str] = &["pathwarden.toml", "~/.config/pathwarden/config.toml"];

/// On-disk format of a policy document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    Json,
    Toml,
}

impl PolicyFormat {
    /// Pick the format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => PolicyFormat::Toml,
            _ => PolicyFormat::Json,
        }
    }
}

/// Load settings from a TOML string (useful for testing)
pub fn load_settings_from_str(toml_str: &str) -> Result<EngineSettings, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let settings: EngineSettings = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_settings(&settings)?;

    Ok(settings)
}

/// Load settings from files and environment
pub fn load_settings(settings_path: Option<&str>) -> Result<EngineSettings, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = settings_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Settings file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_SETTINGS_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // e.g. PATHWARDEN__LOGGING__LEVEL=debug, PATHWARDEN__POLICY_FILE=.policy.toml
    builder = builder.add_source(
        Environment::with_prefix("PATHWARDEN")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let settings: EngineSettings = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_settings(&settings)?;

    Ok(settings)
}

fn validate_settings(settings: &EngineSettings) -> Result<(), ConfigError> {
    if settings.policy_file.is_empty() || settings.policy_file.contains('/') {
        return Err(ConfigError::Invalid {
            message: format!(
                "policy_file must be a bare file name, got: '{}'",
                settings.policy_file
            ),
        });
    }

    if settings.audit.preview_chars == 0 {
        return Err(ConfigError::Invalid {
            message: "audit.preview_chars must be greater than 0".to_string(),
        });
    }

    Ok(())
}

/// Parse a policy document, failing on malformed input
pub fn parse_policy_document(
    body: &str,
    format: PolicyFormat,
    source_id: &str,
) -> Result<PolicyDocument, ConfigError> {
    let parsed = match format {
        PolicyFormat::Json => serde_json::from_str(body).map_err(|e| e.to_string()),
        PolicyFormat::Toml => toml::from_str(body).map_err(|e| e.to_string()),
    };

    parsed.map_err(|reason| ConfigError::Parse {
        source_id: source_id.to_string(),
        reason,
    })
}

/// Parse a policy document, substituting an empty one when the body is malformed.
///
/// An empty document contributes no rules and no allowlist layer, so a broken
/// file fails open rather than blocking the session.
pub fn parse_policy_document_lenient(
    body: &str,
    format: PolicyFormat,
    source_id: &str,
) -> PolicyDocument {
    parse_policy_document(body, format, source_id).unwrap_or_else(|e| {
        warn!(source = source_id, error = %e, "Ignoring malformed policy document");
        PolicyDocument::default()
    })
}

/// Find policy files from `root` down to `dir`, least specific first.
///
/// If `dir` is not inside `root`, only `root` is searched.
pub fn discover_policy_files(root: &Path, dir: &Path, file_name: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = if dir.starts_with(root) {
        dir.ancestors()
            .take_while(|a| a.starts_with(root))
            .map(|a| a.join(file_name))
            .filter(|p| p.is_file())
            .collect()
    } else {
        let candidate = root.join(file_name);
        candidate.is_file().then_some(candidate).into_iter().collect()
    };
    found.reverse();
    found
}

/// Discover, parse and merge the policy documents that apply to `dir`
pub fn load_policy(
    root: &Path,
    dir: &Path,
    file_name: &str,
) -> Result<ResolvedPolicy, ConfigError> {
    let mut layers = Vec::new();

    for path in discover_policy_files(root, dir, file_name) {
        let body = std::fs::read_to_string(&path)?;
        let source_id = path.display().to_string();
        debug!(source = %source_id, "Loading policy document");
        let document =
            parse_policy_document_lenient(&body, PolicyFormat::from_path(&path), &source_id);
        layers.push((document, source_id));
    }

    PolicyStore::merge(&layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;

    #[test]
    fn test_load_settings_from_str() {
        let toml = r#"
policy_file = ".policy.toml"

[logging]
level = "debug"
format = "json"

[audit]
path = "/var/log/pathwarden.jsonl"
"#;

        let settings = load_settings_from_str(toml).unwrap();
        assert_eq!(settings.policy_file, ".policy.toml");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(
            settings.audit.path,
            Some(PathBuf::from("/var/log/pathwarden.jsonl"))
        );
        assert_eq!(settings.audit.preview_chars, 120);
    }

    #[test]
    fn test_policy_file_must_be_bare_name() {
        let result = load_settings_from_str(r#"policy_file = "nested/policy.json""#);
        assert!(matches!(result.unwrap_err(), ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_parse_json_document() {
        let body = r#"{
            "version": 1,
            "roles": [{"name": "viewer", "level": 10}],
            "rules": [{"pattern": ".env", "type": "file", "deniedOperations": ["llm"], "allowedRoles": []}]
        }"#;
        let doc = parse_policy_document(body, PolicyFormat::Json, "root").unwrap();
        assert_eq!(doc.version, Some(1));
        assert_eq!(doc.roles.len(), 1);
        assert_eq!(doc.rules[0].pattern, ".env");
    }

    #[test]
    fn test_parse_toml_document() {
        let body = r#"
version = 1
allowlist = []

[[roles]]
name = "admin"
level = 100

[[rules]]
pattern = "secrets/**"
type = "directory"
deniedOperations = ["read", "write", "llm"]
allowedRoles = ["admin"]
"#;
        let doc = parse_policy_document(body, PolicyFormat::Toml, "root").unwrap();
        assert_eq!(doc.allowlist, Some(vec![]));
        assert_eq!(doc.rules[0].allowed_roles, vec!["admin"]);
    }

    #[test]
    fn test_malformed_document_is_recovered_as_empty() {
        let strict = parse_policy_document("{ not json", PolicyFormat::Json, "broken");
        assert!(matches!(strict.unwrap_err(), ConfigError::Parse { .. }));

        let lenient = parse_policy_document_lenient("{ not json", PolicyFormat::Json, "broken");
        assert_eq!(lenient, PolicyDocument::default());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            PolicyFormat::from_path(Path::new("a/.pathwarden.toml")),
            PolicyFormat::Toml
        );
        assert_eq!(
            PolicyFormat::from_path(Path::new("a/.pathwarden.json")),
            PolicyFormat::Json
        );
    }
}
