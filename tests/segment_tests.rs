//! Segment discovery and redaction tests

use pathwarden::config::PolicyDocument;
use pathwarden::policy::{Operation, PolicyStore, ResolvedPolicy};
use pathwarden::segments::{
    REDACTED_PLACEHOLDER, SegmentKind, find_marker_segments, protected_segments,
    range_is_protected, redact_content, redact_for_role,
};
use std::path::Path;

fn policy(json: &str) -> ResolvedPolicy {
    let doc: PolicyDocument = serde_json::from_str(json).unwrap();
    PolicyStore::merge(&[(doc, "/project/.pathwarden.json")]).unwrap()
}

const MARKERS: &str = r#"{
    "roles": [{"name": "viewer", "level": 10}, {"name": "admin", "level": 100}],
    "segments": {"markers": [{
        "start": "@secret-start", "end": "@secret-end",
        "deniedOperations": ["read", "llm"], "allowedRoles": ["admin"]
    }]}
}"#;

const NESTED: &str = "\
header
// @secret-start
outer
// @secret-start
inner
// @secret-end
tail
// @secret-end
footer
";

mod markers {
    use super::*;

    #[test]
    fn test_nested_pairs_yield_two_segments() {
        let policy = policy(MARKERS);
        let segments = find_marker_segments(NESTED, policy.markers());
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.kind == SegmentKind::Marker));
    }

    #[test]
    fn test_redaction_hides_both_and_keeps_lines() {
        let policy = policy(MARKERS);
        let redacted =
            redact_for_role(Path::new("x.py"), NESTED, &policy, Operation::Read, "viewer");

        assert!(!redacted.contains("outer"));
        assert!(!redacted.contains("inner"));
        assert!(redacted.contains("header"));
        assert!(redacted.contains("footer"));
        assert_eq!(redacted.matches(REDACTED_PLACEHOLDER).count(), 1);
        assert_eq!(redacted.lines().count(), NESTED.lines().count());
    }

    #[test]
    fn test_allowed_role_sees_original() {
        let policy = policy(MARKERS);
        assert_eq!(
            redact_for_role(Path::new("x.py"), NESTED, &policy, Operation::Read, "admin"),
            NESTED
        );
    }

    #[test]
    fn test_unmatched_start_protects_nothing() {
        let policy = policy(MARKERS);
        let content = "a\n// @secret-start\nrest of the file\n";
        assert!(find_marker_segments(content, policy.markers()).is_empty());
    }

    #[test]
    fn test_html_and_block_comment_wrappers() {
        let policy = policy(MARKERS);
        let content = "<p>hi</p>\n<!-- @secret-start -->\n<p>key</p>\n<!-- @secret-end -->\n/* @secret-start */ x /* @secret-end */";
        assert_eq!(find_marker_segments(content, policy.markers()).len(), 2);
    }

    #[test]
    fn test_redact_identity() {
        assert_eq!(redact_content(NESTED, &[]), NESTED);
    }
}

mod ast {
    use super::*;

    const AST_POLICY: &str = r#"{
        "roles": [{"name": "viewer", "level": 10}, {"name": "admin", "level": 100}],
        "segments": {"ast": [{
            "languages": ["typescript", "javascript"],
            "nodeTypes": ["function", "arrow_function", "class"],
            "namePattern": "^internal",
            "deniedOperations": ["llm"],
            "allowedRoles": ["admin"]
        }]}
    }"#;

    const SOURCE: &str = "\
export function publicApi() {
  return internalHelper();
}

function internalHelper() {
  return 42;
}

export const internalArrow = (x) => x * 2;

class InternalNotMatched {}

class internalStore {
  get() { return 1; }
}
";

    #[test]
    fn test_matching_declarations_redacted() {
        let policy = policy(AST_POLICY);
        let redacted =
            redact_for_role(Path::new("src/api.ts"), SOURCE, &policy, Operation::Llm, "viewer");

        assert!(redacted.contains("export function publicApi()"));
        assert!(!redacted.contains("return 42"));
        assert!(!redacted.contains("x * 2"));
        assert!(!redacted.contains("class internalStore"));
        // Case-sensitive name pattern
        assert!(redacted.contains("class InternalNotMatched"));
        assert_eq!(redacted.lines().count(), SOURCE.lines().count());
    }

    #[test]
    fn test_javascript_extension_uses_same_rule() {
        let policy = policy(AST_POLICY);
        let segments =
            protected_segments(Path::new("lib/util.mjs"), SOURCE, &policy, Operation::Llm, "viewer");
        assert!(segments.iter().all(|s| s.kind == SegmentKind::Ast));
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn test_unsupported_language_is_empty() {
        let policy = policy(AST_POLICY);
        let segments = protected_segments(
            Path::new("main.go"),
            "func internalX() {}",
            &policy,
            Operation::Llm,
            "viewer",
        );
        assert!(segments.is_empty());
    }

    #[test]
    fn test_admin_exempt() {
        let policy = policy(AST_POLICY);
        let segments =
            protected_segments(Path::new("src/api.ts"), SOURCE, &policy, Operation::Llm, "admin");
        assert!(segments.is_empty());
    }

    #[test]
    fn test_search_hit_overlap() {
        let policy = policy(AST_POLICY);
        let segments =
            protected_segments(Path::new("src/api.ts"), SOURCE, &policy, Operation::Llm, "viewer");

        let hit = SOURCE.find("return 42").unwrap();
        assert!(range_is_protected(hit, hit + 9, &segments));

        let public = SOURCE.find("publicApi").unwrap();
        assert!(!range_is_protected(public, public + 9, &segments));
    }
}
