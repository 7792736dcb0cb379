//! Access control module
//!
//! Decides whether a role may `read`, `write` or send to an `llm` a given path.
//!
//! ## Decision Model
//!
//! ```text
//! normalize path → deny rules (AND) → symlink target → allowlist layers (AND) → allow
//! ```
//!
//! - Every rule whose pattern matches and whose `deniedOperations` include the
//!   operation must be satisfied by the role; one unsatisfied rule denies.
//! - For `read`/`llm`, the path must match at least one entry in every
//!   allowlist layer. `write` bypasses the allowlist.
//! - A child config can add rules and layers but never remove a parent's,
//!   so it can only narrow access.
//!
//! ## Example Configuration
//!
//! ```json
//! {
//!   "roles": [{"name": "viewer", "level": 10}, {"name": "admin", "level": 100}],
//!   "rules": [{
//!     "pattern": "secrets/**",
//!     "type": "directory",
//!     "deniedOperations": ["read", "write", "llm"],
//!     "allowedRoles": ["admin"]
//!   }]
//! }
//! ```

pub mod path;
pub mod resolver;
pub mod symlink;

pub use path::{match_form, normalize_lexically, resolve_against};
pub use resolver::{AccessResolver, Decision};
pub use symlink::{ResolvedPath, SymlinkResolver};
