//! Prompt content scanner
//!
//! Flags protected content in free text bound for (or returned from) a model.
//! Two passes run over the text:
//!
//! - **marker**: comment-wrapped delimiter pairs of `llm`-denying marker rules,
//!   matched exactly like file segments
//! - **pattern**: the literal prefix of every `llm`-denying rule's glob (or a
//!   marker's start delimiter), found as a plain case-sensitive substring
//!
//! The pattern pass over-matches on purpose: `.env` also flags `.envrc`.

use crate::policy::{Operation, ProtectionRule, ResolvedPolicy, RoleGate};
use crate::segments::{find_marker_segments, redact_ranges};
use serde::Serialize;
use tracing::debug;

/// How a match was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Marker,
    Pattern,
}

/// A span of text covered by a protection rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMatch {
    pub kind: MatchKind,
    pub start: usize,
    pub end: usize,
    pub matched_text: String,
    /// Description of the rule, e.g. `file rule '.env'`
    pub rule: String,
    pub source: String,
    #[serde(skip)]
    pub gate: RoleGate,
}

/// Outcome of guarding a prompt for a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum PromptVerdict {
    /// Nothing the role may not send
    Clean,
    /// Protected spans replaced with the redaction placeholder
    Redacted {
        text: String,
        matches: Vec<PromptMatch>,
    },
    /// A matched rule exempts no role at all
    Blocked { reason: String },
}

/// Literal prefix of a glob: a leading `**/` or `*/` is dropped, then
/// everything from the first wildcard on.
pub fn extract_literal_from_glob(pattern: &str) -> &str {
    let stripped = pattern
        .strip_prefix("**/")
        .or_else(|| pattern.strip_prefix("*/"))
        .unwrap_or(pattern);
    let cut = stripped
        .find(['*', '?', '[', '{'])
        .unwrap_or(stripped.len());
    &stripped[..cut]
}

/// Every span of `text` covered by an `llm`-denying rule, ordered by position
pub fn scan_for_protected_content(text: &str, policy: &ResolvedPolicy) -> Vec<PromptMatch> {
    let mut matches = Vec::new();

    for segment in find_marker_segments(text, policy.markers()) {
        if !segment.gate.denies(Operation::Llm) {
            continue;
        }
        let Some(rule) = policy.markers().get(segment.rule_index) else {
            continue;
        };
        matches.push(PromptMatch {
            kind: MatchKind::Marker,
            start: segment.start,
            end: segment.end,
            matched_text: text[segment.start..segment.end].to_string(),
            rule: ProtectionRule::Marker(rule).describe(),
            source: rule.source.to_string(),
            gate: segment.gate,
        });
    }

    for rule in policy.protection_rules() {
        if !rule.gate().denies(Operation::Llm) {
            continue;
        }
        let literal = match rule {
            ProtectionRule::Path(r) => extract_literal_from_glob(r.pattern.source()),
            ProtectionRule::Marker(r) => extract_literal_from_glob(&r.start),
            ProtectionRule::Ast(_) => continue,
        };
        if literal.is_empty() {
            continue;
        }
        for (start, found) in text.match_indices(literal) {
            matches.push(PromptMatch {
                kind: MatchKind::Pattern,
                start,
                end: start + found.len(),
                matched_text: found.to_string(),
                rule: rule.describe(),
                source: rule.source().to_string(),
                gate: rule.gate().clone(),
            });
        }
    }

    matches.sort_by_key(|m| (m.start, m.end));
    matches
}

/// Decide what `role` may send to a model.
///
/// A match whose rule the role does not satisfy is redacted in place, unless
/// the rule's `allowedRoles` is empty, in which case the whole prompt is
/// blocked.
pub fn guard_prompt(text: &str, policy: &ResolvedPolicy, role: &str) -> PromptVerdict {
    let unsatisfied: Vec<PromptMatch> = scan_for_protected_content(text, policy)
        .into_iter()
        .filter(|m| !policy.gate_permits(&m.gate, Operation::Llm, role))
        .collect();

    if unsatisfied.is_empty() {
        return PromptVerdict::Clean;
    }

    if let Some(hard) = unsatisfied.iter().find(|m| m.gate.allowed_roles.is_empty()) {
        debug!(rule = %hard.rule, source = %hard.source, "Prompt blocked");
        return PromptVerdict::Blocked {
            reason: format!(
                "prompt contains '{}' protected by {} from {}, which no role may send",
                hard.matched_text, hard.rule, hard.source
            ),
        };
    }

    debug!(count = unsatisfied.len(), role, "Prompt redacted");
    PromptVerdict::Redacted {
        text: redact_ranges(text, unsatisfied.iter().map(|m| (m.start, m.end))),
        matches: unsatisfied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyDocument;
    use crate::policy::PolicyStore;
    use rstest::rstest;

    fn policy(json: &str) -> ResolvedPolicy {
        let doc: PolicyDocument = serde_json::from_str(json).unwrap();
        PolicyStore::merge(&[(doc, "root")]).unwrap()
    }

    #[rstest]
    #[case("**/.env", ".env")]
    #[case("*/config.yml", "config.yml")]
    #[case("secrets/**", "secrets/")]
    #[case("keys/*.pem", "keys/")]
    #[case("src/{a,b}.rs", "src/")]
    #[case("**/*", "")]
    #[case("*.key", "")]
    fn test_extract_literal(#[case] glob: &str, #[case] literal: &str) {
        assert_eq!(extract_literal_from_glob(glob), literal);
    }

    #[test]
    fn test_pattern_match_on_env() {
        let policy = policy(
            r#"{"rules": [{"pattern": ".env", "deniedOperations": ["llm"], "allowedRoles": []}]}"#,
        );
        let matches = scan_for_protected_content("The file .env has secrets", &policy);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, MatchKind::Pattern);
        assert_eq!(matches[0].matched_text, ".env");
        assert_eq!(matches[0].start, 9);
    }

    #[test]
    fn test_over_matching_and_case_sensitivity() {
        let policy = policy(
            r#"{"rules": [{"pattern": ".env", "deniedOperations": ["llm"], "allowedRoles": []}]}"#,
        );
        assert_eq!(scan_for_protected_content("see .envrc", &policy).len(), 1);
        assert!(scan_for_protected_content("see .ENV", &policy).is_empty());
    }

    #[test]
    fn test_non_llm_rules_ignored() {
        let policy = policy(
            r#"{"rules": [{"pattern": ".env", "deniedOperations": ["read"], "allowedRoles": []}]}"#,
        );
        assert!(scan_for_protected_content("The file .env", &policy).is_empty());
    }

    #[test]
    fn test_marker_match() {
        let policy = policy(
            r#"{"segments": {"markers": [{"start": "@s", "end": "@e", "deniedOperations": ["llm"], "allowedRoles": []}]}}"#,
        );
        let text = "code\n// @s\nhidden\n// @e\n";
        let matches = scan_for_protected_content(text, &policy);
        assert!(
            matches
                .iter()
                .any(|m| m.kind == MatchKind::Marker && m.matched_text == "// @s\nhidden\n// @e")
        );
    }

    const GUARD_POLICY: &str = r#"{
        "roles": [{"name": "viewer", "level": 10}, {"name": "dev", "level": 50}],
        "rules": [
            {"pattern": "internal/**", "type": "directory", "deniedOperations": ["llm"], "allowedRoles": ["dev"]},
            {"pattern": ".env", "deniedOperations": ["llm"], "allowedRoles": []}
        ]
    }"#;

    #[test]
    fn test_guard_clean() {
        let policy = policy(GUARD_POLICY);
        assert_eq!(guard_prompt("refactor src/main.rs", &policy, "viewer"), PromptVerdict::Clean);
        // dev satisfies the directory rule
        assert_eq!(guard_prompt("open internal/notes", &policy, "dev"), PromptVerdict::Clean);
    }

    #[test]
    fn test_guard_redacts() {
        let policy = policy(GUARD_POLICY);
        match guard_prompt("open internal/notes", &policy, "viewer") {
            PromptVerdict::Redacted { text, matches } => {
                assert_eq!(text, "open [REDACTED]notes");
                assert_eq!(matches.len(), 1);
            }
            other => panic!("expected redaction, got {other:?}"),
        }
    }

    #[test]
    fn test_guard_blocks_when_no_role_exempt() {
        let policy = policy(GUARD_POLICY);
        let verdict = guard_prompt("cat .env please", &policy, "dev");
        assert!(matches!(verdict, PromptVerdict::Blocked { reason } if reason.contains(".env")));
    }
}
