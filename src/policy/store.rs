//! Policy store
//!
//! Merges layered policy documents (least specific first) into one immutable
//! [`ResolvedPolicy`]. Deny rules, markers and AST rules are concatenated and
//! never overridden, and every document that defines `allowlist` contributes
//! its own layer. A more specific document can therefore only add restrictions.

use crate::config::{McpConfig, PolicyDocument, PolicyLoggingConfig};
use crate::error::ConfigError;
use crate::policy::patterns::PathPattern;
use crate::policy::types::{
    AstRule, MarkerRule, McpServerPolicy, Operation, PathRule, ProtectionRule, Role, RoleGate,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

/// One allowlist entry
#[derive(Debug, Clone)]
pub struct AllowlistEntry {
    pub pattern: PathPattern,
}

/// Allowlist entries contributed by a single config source
#[derive(Debug, Clone)]
pub struct AllowlistLayer {
    pub source: Arc<str>,
    pub entries: Vec<AllowlistEntry>,
}

impl AllowlistLayer {
    /// Find the first entry matching a project-relative path
    pub fn find_match(&self, relative_path: &str) -> Option<&AllowlistEntry> {
        self.entries.iter().find(|e| e.pattern.matches(relative_path))
    }
}

/// Merged MCP trust configuration
#[derive(Debug, Clone, Default)]
pub struct McpPolicy {
    configured: bool,
    default_policy: Option<McpServerPolicy>,
    servers: HashMap<String, McpServerPolicy>,
}

impl McpPolicy {
    /// Trust level for a server. Without any `mcp` config everything is trusted.
    pub fn policy_for(&self, server: &str) -> McpServerPolicy {
        if !self.configured {
            return McpServerPolicy::Trusted;
        }
        self.servers
            .get(server)
            .copied()
            .or(self.default_policy)
            .unwrap_or_default()
    }

    fn absorb(&mut self, config: &McpConfig) {
        self.configured = true;
        if config.default_policy.is_some() {
            self.default_policy = config.default_policy;
        }
        for (name, policy) in &config.servers {
            self.servers.insert(name.clone(), *policy);
        }
    }
}

/// The single immutable structure produced by merging all layered configs
#[derive(Debug, Clone, Default)]
pub struct ResolvedPolicy {
    roles: Vec<Role>,
    rules: Vec<PathRule>,
    allowlist: Vec<AllowlistLayer>,
    markers: Vec<MarkerRule>,
    ast_rules: Vec<AstRule>,
    mcp: McpPolicy,
    logging: Option<PolicyLoggingConfig>,
}

impl ResolvedPolicy {
    /// A policy with nothing configured: everything is allowed
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn rules(&self) -> &[PathRule] {
        &self.rules
    }

    pub fn allowlist_layers(&self) -> &[AllowlistLayer] {
        &self.allowlist
    }

    pub fn markers(&self) -> &[MarkerRule] {
        &self.markers
    }

    pub fn ast_rules(&self) -> &[AstRule] {
        &self.ast_rules
    }

    pub fn mcp(&self) -> &McpPolicy {
        &self.mcp
    }

    /// Audit logging block from the most specific document that defines one
    pub fn logging(&self) -> Option<&PolicyLoggingConfig> {
        self.logging.as_ref()
    }

    /// Fail-open: no rules and no allowlist layers
    pub fn is_unrestricted(&self) -> bool {
        self.rules.is_empty() && self.allowlist.is_empty()
    }

    /// Every rule of every kind, in source order per kind
    pub fn protection_rules(&self) -> impl Iterator<Item = ProtectionRule<'_>> {
        self.rules
            .iter()
            .map(ProtectionRule::Path)
            .chain(self.markers.iter().map(ProtectionRule::Marker))
            .chain(self.ast_rules.iter().map(ProtectionRule::Ast))
    }

    pub fn role_level(&self, name: &str) -> Option<i64> {
        self.roles.iter().find(|r| r.name == name).map(|r| r.level)
    }

    /// Role hierarchy test: named explicitly, or strictly above the lowest
    /// level among the allowed roles. An empty allow-list is satisfied by nobody.
    pub fn role_satisfies(&self, role: &str, allowed_roles: &[String]) -> bool {
        if allowed_roles.iter().any(|a| a == role) {
            return true;
        }
        let Some(level) = self.role_level(role) else {
            return false;
        };
        allowed_roles
            .iter()
            .filter_map(|a| self.role_level(a))
            .min()
            .is_some_and(|min| level > min)
    }

    /// Whether a gate exempts the role from the operation
    pub fn gate_permits(&self, gate: &RoleGate, operation: Operation, role: &str) -> bool {
        !gate.denies(operation) || self.role_satisfies(role, &gate.allowed_roles)
    }

    /// The lowest-level configured role. This, not a token-derived role, is the
    /// role used for tool-level access checks.
    pub fn default_role(&self) -> Option<&Role> {
        self.roles.iter().min_by_key(|r| r.level)
    }
}

/// Builds [`ResolvedPolicy`] values from layered documents
pub struct PolicyStore;

impl PolicyStore {
    /// Merge documents given least specific first, each paired with its source id
    pub fn merge<S: AsRef<str>>(
        layers: &[(PolicyDocument, S)],
    ) -> Result<ResolvedPolicy, ConfigError> {
        let mut policy = ResolvedPolicy::default();

        for (document, source) in layers {
            let source: Arc<str> = Arc::from(source.as_ref());
            trace!(source = %source, "Merging policy layer");

            for role in &document.roles {
                Self::merge_role(&mut policy.roles, &role.name, role.level, &source)?;
            }

            for rule in &document.rules {
                policy.rules.push(PathRule {
                    pattern: PathPattern::new(&rule.pattern, rule.scope)?,
                    gate: RoleGate::new(rule.denied_operations.clone(), rule.allowed_roles.clone()),
                    source: Arc::clone(&source),
                });
            }

            if let Some(entries) = &document.allowlist {
                let entries = entries
                    .iter()
                    .map(|e| {
                        Ok(AllowlistEntry {
                            pattern: PathPattern::new(&e.pattern, e.scope)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ConfigError>>()?;
                policy.allowlist.push(AllowlistLayer {
                    source: Arc::clone(&source),
                    entries,
                });
            }

            for marker in &document.segments.markers {
                policy.markers.push(MarkerRule::new(
                    &marker.start,
                    &marker.end,
                    RoleGate::new(marker.denied_operations.clone(), marker.allowed_roles.clone()),
                    Arc::clone(&source),
                )?);
            }

            for ast in &document.segments.ast {
                let name_pattern =
                    Regex::new(&ast.name_pattern).map_err(|e| ConfigError::InvalidPattern {
                        pattern: ast.name_pattern.clone(),
                        reason: e.to_string(),
                    })?;
                policy.ast_rules.push(AstRule {
                    languages: ast.languages.clone(),
                    node_kinds: ast.node_types.clone(),
                    name_pattern,
                    gate: RoleGate::new(ast.denied_operations.clone(), ast.allowed_roles.clone()),
                    source: Arc::clone(&source),
                });
            }

            if let Some(mcp) = &document.mcp {
                policy.mcp.absorb(mcp);
            }

            if document.logging.is_some() {
                policy.logging = document.logging.clone();
            }
        }

        debug!(
            roles = policy.roles.len(),
            rules = policy.rules.len(),
            allowlist_layers = policy.allowlist.len(),
            markers = policy.markers.len(),
            ast_rules = policy.ast_rules.len(),
            "Resolved policy"
        );

        Ok(policy)
    }

    fn merge_role(
        roles: &mut Vec<Role>,
        name: &str,
        level: i64,
        source: &Arc<str>,
    ) -> Result<(), ConfigError> {
        match roles.iter().find(|r| r.name == name) {
            Some(existing) if existing.level != level => Err(ConfigError::RoleConflict {
                role: name.to_string(),
                existing_level: existing.level,
                existing_source: existing.source.to_string(),
                conflicting_level: level,
                conflicting_source: source.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                roles.push(Role {
                    name: name.to_string(),
                    level,
                    source: Arc::clone(source),
                });
                Ok(())
            }
        }
    }
}

/// Shared reference to the active policy.
///
/// Readers take a snapshot and keep using it for the whole decision; a reload
/// builds a new [`ResolvedPolicy`] and swaps it in, so a caller observes either
/// the old or the new policy, never a mix.
#[derive(Debug)]
pub struct PolicyHandle {
    current: RwLock<Arc<ResolvedPolicy>>,
}

impl PolicyHandle {
    pub fn new(policy: ResolvedPolicy) -> Self {
        Self {
            current: RwLock::new(Arc::new(policy)),
        }
    }

    /// The policy active right now
    pub fn snapshot(&self) -> Arc<ResolvedPolicy> {
        let guard = self.current.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the active policy, returning the previous one
    pub fn swap(&self, policy: ResolvedPolicy) -> Arc<ResolvedPolicy> {
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        std::mem::replace(&mut *guard, Arc::new(policy))
    }
}

impl Default for PolicyHandle {
    fn default() -> Self {
        Self::new(ResolvedPolicy::empty())
    }
}
