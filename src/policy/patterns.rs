//! Pattern matching for path rules
//!
//! Provides glob-based matching for deny rules and allowlist entries.
//! Matching is case-sensitive and `*` never crosses a `/`. Paths are matched
//! in their project-relative, `/`-separated form.
//!
//! - a pattern without `/` matches at any depth (`.env` behaves like `**/.env`)
//! - a leading `/` anchors the pattern to the project root
//! - a `directory` pattern also matches everything beneath the directory

use crate::error::ConfigError;
use crate::policy::types::PathScope;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Compiled path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    scope: PathScope,
    set: GlobSet,
}

impl PathPattern {
    /// Compile a glob pattern for the given scope
    pub fn new(pattern: &str, scope: PathScope) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for glob in expand(pattern, scope) {
            let compiled = GlobBuilder::new(&glob)
                .literal_separator(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;
            builder.add(compiled);
        }

        let set = builder.build().map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            scope,
            set,
        })
    }

    /// Check if a project-relative path matches
    pub fn matches(&self, relative_path: &str) -> bool {
        self.set.is_match(relative_path)
    }

    /// The pattern as written in the config
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn scope(&self) -> PathScope {
        self.scope
    }
}

/// Expand a configured pattern into the globs that implement its semantics
fn expand(pattern: &str, scope: PathScope) -> Vec<String> {
    let trimmed = pattern.strip_prefix("./").unwrap_or(pattern);
    let (anchored, body) = match trimmed.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let body = body.trim_end_matches('/');

    let rooted = |glob: &str| -> String {
        if anchored || glob.contains('/') {
            glob.to_string()
        } else {
            format!("**/{glob}")
        }
    };

    match scope {
        PathScope::File => vec![rooted(body)],
        PathScope::Directory => {
            let base = body.strip_suffix("/**").unwrap_or(body);
            if base.is_empty() || base == "**" {
                return vec!["**".to_string()];
            }
            let base = rooted(base);
            vec![base.clone(), format!("{base}/**")]
        }
    }
}
