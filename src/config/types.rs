//! Configuration types for pathwarden
//!
//! Two kinds of configuration live here:
//! - [`PolicyDocument`]: one per directory, discovered root-to-leaf and merged
//!   into a single resolved policy.
//! - [`EngineSettings`]: process-level settings (policy file name, logging,
//!   audit sink) loaded from an optional TOML file and environment variables.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::policy::{McpServerPolicy, NodeKind, Operation, PathScope};

/// Default policy file name looked up in every directory
pub const DEFAULT_POLICY_FILE: &str = ".pathwarden.json";

/// A single policy document as written on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyDocument {
    /// Schema version of the document
    pub version: Option<u32>,

    /// Role definitions (name + numeric level)
    pub roles: Vec<RoleConfig>,

    /// Path-scoped deny rules
    pub rules: Vec<RuleConfig>,

    /// Positive path list; `None` (field omitted) contributes no layer,
    /// `Some(vec![])` is an explicit empty layer that denies every read/llm.
    pub allowlist: Option<Vec<AllowlistEntryConfig>>,

    /// Sub-file segment protection
    pub segments: SegmentsConfig,

    /// MCP server trust configuration
    pub mcp: Option<McpConfig>,

    /// Audit logging destination
    pub logging: Option<PolicyLoggingConfig>,
}

/// Role definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RoleConfig {
    pub name: String,
    pub level: i64,
}

/// Path rule as written in a policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    /// Glob pattern (case-sensitive)
    pub pattern: String,

    /// Whether the pattern names files or whole directory trees
    #[serde(rename = "type", default)]
    pub scope: PathScope,

    #[serde(default)]
    pub denied_operations: Vec<Operation>,

    #[serde(default)]
    pub allowed_roles: Vec<String>,
}

/// Allowlist entry as written in a policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AllowlistEntryConfig {
    pub pattern: String,

    #[serde(rename = "type", default)]
    pub scope: PathScope,
}

/// Segment protection configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SegmentsConfig {
    pub markers: Vec<MarkerConfig>,
    pub ast: Vec<AstConfig>,
}

/// Marker delimiter pair recognized inside comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkerConfig {
    pub start: String,
    pub end: String,

    #[serde(default)]
    pub denied_operations: Vec<Operation>,

    #[serde(default)]
    pub allowed_roles: Vec<String>,
}

/// Syntax-tree based segment protection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AstConfig {
    /// Language families, e.g. `javascript`, `typescript`, `python`
    pub languages: Vec<String>,

    pub node_types: Vec<NodeKind>,

    /// Regex matched against the declaration's identifier
    pub name_pattern: String,

    #[serde(default)]
    pub denied_operations: Vec<Operation>,

    #[serde(default)]
    pub allowed_roles: Vec<String>,
}

/// MCP server trust configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct McpConfig {
    /// Fallback for servers not listed in `servers`
    pub default_policy: Option<McpServerPolicy>,

    pub servers: HashMap<String, McpServerPolicy>,
}

/// Audit logging block of a policy document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PolicyLoggingConfig {
    /// Audit log file (JSON lines)
    pub path: Option<PathBuf>,

    /// Minimum level recorded by the audit sink
    pub level: Option<String>,
}

/// Process-level settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Policy file name looked up in each directory
    pub policy_file: String,

    /// Diagnostic logging
    pub logging: LoggingConfig,

    /// Audit sink settings
    pub audit: AuditSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            policy_file: DEFAULT_POLICY_FILE.to_string(),
            logging: LoggingConfig::default(),
            audit: AuditSettings::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}

/// Audit sink settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Overrides the policy document's `logging.path`
    pub path: Option<PathBuf>,

    /// Maximum characters of content kept as plaintext preview
    pub preview_chars: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            path: None,
            preview_chars: 120,
        }
    }
}
