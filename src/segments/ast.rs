//! Syntax-tree segments
//!
//! Parses a file with tree-sitter when its extension belongs to a language
//! family some AST rule covers, then protects every declaration whose kind and
//! plain identifier match the rule. Files in other languages yield no segments.
//!
//! Only plain identifiers are considered: computed property names,
//! destructuring aliases and re-export aliases are not traced back to the
//! declaration they refer to.

use crate::policy::{AstRule, NodeKind};
use crate::segments::{Segment, SegmentKind};
use std::path::Path;
use tracing::{trace, warn};
use tree_sitter::{Language, Node, Parser};

/// Grammar used for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    JavaScript,
    TypeScript,
    Tsx,
    Python,
}

impl Grammar {
    /// Pick the grammar from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "js" | "jsx" | "mjs" | "cjs" => Some(Grammar::JavaScript),
            "ts" | "mts" | "cts" => Some(Grammar::TypeScript),
            "tsx" => Some(Grammar::Tsx),
            "py" | "pyi" => Some(Grammar::Python),
            _ => None,
        }
    }

    /// Language family name used in `languages` of an AST rule
    pub fn family(&self) -> &'static str {
        match self {
            Grammar::JavaScript => "javascript",
            Grammar::TypeScript | Grammar::Tsx => "typescript",
            Grammar::Python => "python",
        }
    }

    fn language(&self) -> Language {
        match self {
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

/// A declaration found in the tree
#[derive(Debug, Clone, Copy)]
struct Declaration<'t> {
    kind: NodeKind,
    name: Node<'t>,
    span: Node<'t>,
}

/// Find declarations protected by AST rules
pub fn find_ast_segments(path: &Path, content: &str, rules: &[AstRule]) -> Vec<Segment> {
    let Some(grammar) = Grammar::from_path(path) else {
        return Vec::new();
    };

    let applicable: Vec<(usize, &AstRule)> = rules
        .iter()
        .enumerate()
        .filter(|(_, r)| r.covers_language(grammar.family()))
        .collect();
    if applicable.is_empty() {
        return Vec::new();
    }

    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&grammar.language()) {
        warn!(grammar = ?grammar, error = %e, "Failed to load grammar");
        return Vec::new();
    }
    let Some(tree) = parser.parse(content, None) else {
        warn!(path = %path.display(), "Parser returned no tree");
        return Vec::new();
    };

    let source = content.as_bytes();
    let mut segments = Vec::new();
    let mut stack = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        if let Some(decl) = classify(grammar, node) {
            let Ok(name) = decl.name.utf8_text(source) else {
                continue;
            };
            // `#secret` is matched as `secret`
            let name = name.strip_prefix('#').unwrap_or(name);
            for (index, rule) in &applicable {
                if rule.node_kinds.contains(&decl.kind) && rule.name_pattern.is_match(name) {
                    trace!(name, kind = ?decl.kind, "Protected declaration");
                    segments.push(Segment {
                        start: decl.span.start_byte(),
                        end: decl.span.end_byte(),
                        kind: SegmentKind::Ast,
                        rule_index: *index,
                        gate: rule.gate.clone(),
                        source: rule.source.clone(),
                    });
                }
            }
        }

        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }

    segments.sort_by_key(|s| (s.start, s.end, s.rule_index));
    segments.dedup_by(|a, b| a.start == b.start && a.end == b.end && a.rule_index == b.rule_index);
    segments
}

fn classify(grammar: Grammar, node: Node<'_>) -> Option<Declaration<'_>> {
    match grammar {
        Grammar::Python => classify_python(node),
        _ => classify_ecmascript(node),
    }
}

fn classify_ecmascript(node: Node<'_>) -> Option<Declaration<'_>> {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            let name = plain_name(node, "name", &["identifier"])?;
            Some(Declaration {
                kind: NodeKind::Function,
                name,
                span: node,
            })
        }
        "class_declaration" | "abstract_class_declaration" => {
            let name = plain_name(node, "name", &["identifier", "type_identifier"])?;
            Some(Declaration {
                kind: NodeKind::Class,
                name,
                span: node,
            })
        }
        "method_definition" => {
            let name = plain_name(node, "name", MEMBER_NAMES)?;
            Some(Declaration {
                kind: NodeKind::Method,
                name,
                span: node,
            })
        }
        "variable_declarator" => {
            let value = node.child_by_field_name("value")?;
            let kind = match value.kind() {
                "arrow_function" => NodeKind::ArrowFunction,
                "function_expression" | "function" => NodeKind::Function,
                _ => return None,
            };
            let name = plain_name(node, "name", &["identifier"])?;
            Some(Declaration {
                kind,
                name,
                span: enclosing_declaration(node),
            })
        }
        "field_definition" | "public_field_definition" => {
            let value = node.child_by_field_name("value")?;
            if value.kind() != "arrow_function" {
                return None;
            }
            let name = plain_name(node, "property", MEMBER_NAMES)
                .or_else(|| plain_name(node, "name", MEMBER_NAMES))?;
            Some(Declaration {
                kind: NodeKind::ArrowFunction,
                name,
                span: node,
            })
        }
        _ => None,
    }
}

fn classify_python(node: Node<'_>) -> Option<Declaration<'_>> {
    match node.kind() {
        "function_definition" => {
            let name = plain_name(node, "name", &["identifier"])?;
            let in_class = node
                .parent()
                .filter(|p| p.kind() == "block")
                .and_then(|b| b.parent())
                .or_else(|| {
                    // Decorated methods sit one level deeper
                    node.parent()
                        .filter(|p| p.kind() == "decorated_definition")
                        .and_then(|d| d.parent())
                        .filter(|p| p.kind() == "block")
                        .and_then(|b| b.parent())
                })
                .is_some_and(|p| p.kind() == "class_definition");
            Some(Declaration {
                kind: if in_class {
                    NodeKind::Method
                } else {
                    NodeKind::Function
                },
                name,
                span: decorated(node),
            })
        }
        "class_definition" => {
            let name = plain_name(node, "name", &["identifier"])?;
            Some(Declaration {
                kind: NodeKind::Class,
                name,
                span: decorated(node),
            })
        }
        "assignment" => {
            let right = node.child_by_field_name("right")?;
            if right.kind() != "lambda" {
                return None;
            }
            let name = plain_name(node, "left", &["identifier"])?;
            let span = node
                .parent()
                .filter(|p| p.kind() == "expression_statement")
                .unwrap_or(node);
            Some(Declaration {
                kind: NodeKind::ArrowFunction,
                name,
                span,
            })
        }
        _ => None,
    }
}

/// Class member names, including `#private` ones
const MEMBER_NAMES: &[&str] = &["property_identifier", "private_property_identifier"];

/// The named field, only if it is one of the plain identifier kinds
fn plain_name<'t>(node: Node<'t>, field: &str, kinds: &[&str]) -> Option<Node<'t>> {
    node.child_by_field_name(field)
        .filter(|n| kinds.contains(&n.kind()))
}

/// `const f = () => {}` spans the whole statement when it declares only `f`
fn enclosing_declaration(declarator: Node<'_>) -> Node<'_> {
    declarator
        .parent()
        .filter(|p| matches!(p.kind(), "lexical_declaration" | "variable_declaration"))
        .filter(|p| p.named_child_count() == 1)
        .unwrap_or(declarator)
}

fn decorated(node: Node<'_>) -> Node<'_> {
    node.parent()
        .filter(|p| p.kind() == "decorated_definition")
        .unwrap_or(node)
}
