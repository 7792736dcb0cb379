//! Pathwarden
//!
//! Policy decisions and content redaction for AI coding agents.
//!
//! ## Features
//!
//! - **Path access checks** for `read`, `write` and `llm` with a numeric role hierarchy
//! - **Layered policy documents** discovered root-to-leaf; children can only narrow access
//! - **Segment redaction** by comment markers or by syntax-tree declarations
//! - **Lexical pre-filters** for shell commands, prompts and MCP traffic
//!
//! ## Decision Model
//!
//! ```text
//! deny rules (AND) → symlink target → allowlist layers (AND, read/llm) → allow
//! ```
//!
//! A policy with no rules and no allowlist allows everything.
//!
//! ## Example Policy
//!
//! ```json
//! {
//!   "roles": [{"name": "viewer", "level": 10}, {"name": "admin", "level": 100}],
//!   "rules": [{
//!     "pattern": "secrets/**",
//!     "type": "directory",
//!     "deniedOperations": ["read", "write", "llm"],
//!     "allowedRoles": ["admin"]
//!   }],
//!   "segments": {
//!     "markers": [{"start": "@private-start", "end": "@private-end",
//!                  "deniedOperations": ["llm"], "allowedRoles": ["admin"]}]
//!   },
//!   "mcp": {"defaultPolicy": "enforced", "servers": {"docs": "trusted"}}
//! }
//! ```

pub mod access_control;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod policy;
pub mod scanner;
pub mod segments;

// Re-export main types
pub use access_control::{AccessResolver, Decision};
pub use config::{EngineSettings, PolicyDocument, load_policy, load_settings};
pub use error::{PolicyError, Result};
pub use policy::{Operation, PolicyHandle, PolicyStore, ResolvedPolicy};
