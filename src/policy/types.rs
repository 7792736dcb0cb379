//! Policy types
//!
//! Core types shared by the decision engine, the segment redactor and the scanners.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::policy::patterns::PathPattern;
use crate::segments::markers::wrapped_delimiter;

/// Operation requested on a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Content shown to a human-facing tool result
    Read,
    /// Content modified on disk
    Write,
    /// Content sent to a language model
    Llm,
}

impl Operation {
    /// Whether allowlist layers gate this operation (`write` is never gated)
    pub const fn is_allowlist_gated(&self) -> bool {
        matches!(self, Operation::Read | Operation::Llm)
    }

    /// Get the operation name as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Llm => "llm",
        }
    }

    /// Try to parse an operation from a string
    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Operation::Read),
            "write" => Some(Operation::Write),
            "llm" => Some(Operation::Llm),
            _ => None,
        }
    }

    /// Get all operations
    pub fn all() -> &'static [Operation] {
        &[Operation::Read, Operation::Write, Operation::Llm]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a path pattern names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PathScope {
    /// Matches individual files
    #[default]
    File,
    /// Matches a directory and everything beneath it
    Directory,
}

impl fmt::Display for PathScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathScope::File => write!(f, "file"),
            PathScope::Directory => write!(f, "directory"),
        }
    }
}

/// Declaration kinds recognized by AST segment rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Function,
    ArrowFunction,
    Method,
    Class,
}

/// Trust level of an MCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum McpServerPolicy {
    /// Never invoked
    Blocked,
    /// Arguments and results are scanned
    Enforced,
    /// Bypasses scanning entirely
    #[default]
    Trusted,
}

/// A configured role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub level: i64,
    /// Config source that first defined the role
    pub source: Arc<str>,
}

/// The deny half of every protection rule: which operations are denied and
/// which roles are exempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    pub denied_operations: Vec<Operation>,
    pub allowed_roles: Vec<String>,
}

impl RoleGate {
    pub fn new(denied_operations: Vec<Operation>, allowed_roles: Vec<String>) -> Self {
        Self {
            denied_operations,
            allowed_roles,
        }
    }

    /// Whether this gate applies to the operation at all
    pub fn denies(&self, operation: Operation) -> bool {
        self.denied_operations.contains(&operation)
    }
}

/// Path-scoped deny rule
#[derive(Debug, Clone)]
pub struct PathRule {
    pub pattern: PathPattern,
    pub gate: RoleGate,
    pub source: Arc<str>,
}

/// Marker delimiter rule
#[derive(Debug, Clone)]
pub struct MarkerRule {
    pub start: String,
    pub end: String,
    pub start_pattern: regex::Regex,
    pub end_pattern: regex::Regex,
    pub gate: RoleGate,
    pub source: Arc<str>,
}

impl MarkerRule {
    /// Compile the comment-wrapped forms of both delimiters
    pub fn new(
        start: &str,
        end: &str,
        gate: RoleGate,
        source: Arc<str>,
    ) -> Result<Self, ConfigError> {
        if start.is_empty() || end.is_empty() {
            return Err(ConfigError::Invalid {
                message: format!("marker delimiters must not be empty in '{source}'"),
            });
        }
        let compile = |delimiter: &str| {
            wrapped_delimiter(delimiter).map_err(|e| ConfigError::InvalidPattern {
                pattern: delimiter.to_string(),
                reason: e.to_string(),
            })
        };
        Ok(Self {
            start: start.to_string(),
            end: end.to_string(),
            start_pattern: compile(start)?,
            end_pattern: compile(end)?,
            gate,
            source,
        })
    }
}

/// Syntax-tree rule
#[derive(Debug, Clone)]
pub struct AstRule {
    pub languages: Vec<String>,
    pub node_kinds: Vec<NodeKind>,
    pub name_pattern: regex::Regex,
    pub gate: RoleGate,
    pub source: Arc<str>,
}

impl AstRule {
    pub fn covers_language(&self, family: &str) -> bool {
        self.languages.iter().any(|l| l.eq_ignore_ascii_case(family))
    }
}

/// Every kind of protection rule, for consumers that treat them uniformly
#[derive(Debug, Clone, Copy)]
pub enum ProtectionRule<'a> {
    Path(&'a PathRule),
    Marker(&'a MarkerRule),
    Ast(&'a AstRule),
}

impl<'a> ProtectionRule<'a> {
    pub fn gate(&self) -> &'a RoleGate {
        match self {
            ProtectionRule::Path(r) => &r.gate,
            ProtectionRule::Marker(r) => &r.gate,
            ProtectionRule::Ast(r) => &r.gate,
        }
    }

    pub fn source(&self) -> &'a str {
        match self {
            ProtectionRule::Path(r) => &r.source,
            ProtectionRule::Marker(r) => &r.source,
            ProtectionRule::Ast(r) => &r.source,
        }
    }

    /// Human-readable name used in denial reasons and match reports
    pub fn describe(&self) -> String {
        match self {
            ProtectionRule::Path(r) => {
                format!("{} rule '{}'", r.pattern.scope(), r.pattern.source())
            }
            ProtectionRule::Marker(r) => format!("marker '{}'..'{}'", r.start, r.end),
            ProtectionRule::Ast(r) => format!("ast '{}'", r.name_pattern.as_str()),
        }
    }
}
