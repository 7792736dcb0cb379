//! Access decision engine
//!
//! Evaluates `(path, operation, role)` against a [`ResolvedPolicy`]:
//! 1. Normalize the path lexically and resolve symlinks
//! 2. Deny rules: every matching rule that denies the operation must be
//!    satisfied by the role (AND across rules)
//! 3. A symlink's resolved target is checked against the same rules
//! 4. Allowlist layers (`read`/`llm` only): the path must match in every layer
//! 5. Otherwise allow
//!
//! A policy with no rules and no allowlist allows everything.

use crate::access_control::path::{absolute_base, match_form, resolve_against};
use crate::access_control::symlink::SymlinkResolver;
use crate::audit::{AuditLog, SecurityEvent, TracingAuditLog};
use crate::error::{AccessDeniedError, PathResolutionError, PolicyError};
use crate::policy::{Operation, PathRule, ProtectionRule, ResolvedPolicy};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of an access check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn is_denied(&self) -> bool {
        !self.allowed
    }
}

/// Access control resolver
///
/// Holds the project root and the audit sink; the policy is passed to every
/// call so a reload is just a new snapshot.
pub struct AccessResolver {
    root: PathBuf,
    canonical_root: PathBuf,
    symlinks: SymlinkResolver,
    audit: Arc<dyn AuditLog>,
}

impl AccessResolver {
    /// Create a resolver for a project root, auditing through `tracing`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = absolute_base(&root.into());
        let canonical_root = std::fs::canonicalize(&root).unwrap_or_else(|_| root.clone());
        Self {
            symlinks: SymlinkResolver::new(root.clone()),
            root,
            canonical_root,
            audit: Arc::new(TracingAuditLog),
        }
    }

    /// Replace the audit sink
    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check whether `role` may perform `operation` on `path`.
    ///
    /// Path resolution failures are returned as errors and never treated as
    /// an allow.
    pub fn check_access(
        &self,
        policy: &ResolvedPolicy,
        path: &str,
        operation: Operation,
        role: &str,
    ) -> Result<Decision, PathResolutionError> {
        debug!(path, operation = %operation, role, "Checking access");

        // Resolve before the fail-open shortcut so bad paths always surface
        let resolved = self.symlinks.resolve(Path::new(path))?;

        if policy.is_unrestricted() {
            trace!("No rules or allowlist configured, allowing");
            return Ok(Decision::allow());
        }

        let absolute = resolve_against(&self.root, Path::new(path));
        let relative = match_form(&self.root, &absolute);
        let target = resolved
            .filter(|r| r.is_symlink)
            .map(|r| match_form(&self.canonical_root, &r.real_path))
            .filter(|t| *t != relative);

        let decision = self.decide(policy, &relative, target.as_deref(), operation, role);

        if let Some(reason) = &decision.reason {
            self.audit.log_security_event(&SecurityEvent::new(
                role,
                operation,
                path,
                false,
                Some(reason.clone()),
            ));
        }

        Ok(decision)
    }

    fn decide(
        &self,
        policy: &ResolvedPolicy,
        relative: &str,
        symlink_target: Option<&str>,
        operation: Operation,
        role: &str,
    ) -> Decision {
        if let Some(rule) = Self::denying_rule(policy, relative, operation, role) {
            trace!(pattern = rule.pattern.source(), "Matched denying rule");
            return Decision::deny(format!(
                "Denied by {} from {}",
                ProtectionRule::Path(rule).describe(),
                rule.source
            ));
        }

        if let Some(target) = symlink_target
            && let Some(rule) = Self::denying_rule(policy, target, operation, role)
        {
            trace!(target, pattern = rule.pattern.source(), "Symlink target matched denying rule");
            return Decision::deny(format!(
                "symlink target is protected: '{}' matches {} from {}",
                target,
                ProtectionRule::Path(rule).describe(),
                rule.source
            ));
        }

        if operation.is_allowlist_gated() {
            for candidate in std::iter::once(relative).chain(symlink_target) {
                if let Some(layer) = policy
                    .allowlist_layers()
                    .iter()
                    .find(|layer| layer.find_match(candidate).is_none())
                {
                    trace!(source = %layer.source, candidate, "No allowlist entry matched");
                    return Decision::deny(format!(
                        "Allowlist denial: '{}' is not covered by the allowlist in {}; \
                         add an entry such as {{\"pattern\": \"{}\", \"type\": \"file\"}}",
                        candidate, layer.source, candidate
                    ));
                }
            }
        }

        Decision::allow()
    }

    /// The last rule that matches, denies the operation, and is not satisfied
    /// by the role. Any such rule denies.
    fn denying_rule<'a>(
        policy: &'a ResolvedPolicy,
        relative: &str,
        operation: Operation,
        role: &str,
    ) -> Option<&'a PathRule> {
        policy
            .rules()
            .iter()
            .filter(|rule| rule.gate.denies(operation))
            .filter(|rule| rule.pattern.matches(relative))
            .filter(|rule| !policy.role_satisfies(role, &rule.gate.allowed_roles))
            .last()
    }

    /// Check access, returning an error if denied
    pub fn require(
        &self,
        policy: &ResolvedPolicy,
        path: &str,
        operation: Operation,
        role: &str,
    ) -> Result<(), PolicyError> {
        let decision = self.check_access(policy, path, operation, role)?;
        match decision.reason {
            Some(reason) if !decision.allowed => {
                Err(AccessDeniedError::new(path, operation.as_str(), reason).into())
            }
            _ => Ok(()),
        }
    }
}
