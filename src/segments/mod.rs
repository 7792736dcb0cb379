//! Sub-file segment protection
//!
//! A file that passes the path-level check may still hold regions some roles
//! must not see. Two rule kinds find those regions:
//!
//! - **markers**: comment-wrapped start/end delimiters (see [`markers`])
//! - **ast**: declarations in a parsed syntax tree, by kind and name (see [`ast`])
//!
//! A segment is hidden from a role when its rule denies the operation and the
//! role does not satisfy the rule's `allowedRoles`.

pub mod ast;
pub mod markers;
pub mod redact;

pub use ast::{Grammar, find_ast_segments};
pub use markers::find_marker_segments;
pub use redact::{REDACTED_PLACEHOLDER, redact_content, redact_ranges};

use crate::policy::{Operation, ResolvedPolicy, RoleGate};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Which rule kind produced a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Marker,
    Ast,
}

/// A protected byte range and the rule that protects it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub kind: SegmentKind,
    /// Index into the policy's marker or AST rule list, per `kind`
    pub rule_index: usize,
    pub gate: RoleGate,
    pub source: Arc<str>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Segments of `content` that must be hidden from `role` for `operation`
pub fn protected_segments(
    path: &Path,
    content: &str,
    policy: &ResolvedPolicy,
    operation: Operation,
    role: &str,
) -> Vec<Segment> {
    let mut segments = find_marker_segments(content, policy.markers());
    segments.extend(find_ast_segments(path, content, policy.ast_rules()));
    segments.retain(|s| !policy.gate_permits(&s.gate, operation, role));
    segments.sort_by_key(|s| (s.start, s.end));

    if !segments.is_empty() {
        debug!(
            path = %path.display(),
            operation = %operation,
            role,
            count = segments.len(),
            "Protected segments found"
        );
    }
    segments
}

/// Content as `role` may see it for `operation`
pub fn redact_for_role(
    path: &Path,
    content: &str,
    policy: &ResolvedPolicy,
    operation: Operation,
    role: &str,
) -> String {
    redact_content(content, &protected_segments(path, content, policy, operation, role))
}

/// Whether `[a, b)` overlaps any segment
pub fn range_is_protected(a: usize, b: usize, segments: &[Segment]) -> bool {
    segments.iter().any(|s| a < s.end && b > s.start)
}
