//! Policy module
//!
//! Role, rule and allowlist types, glob matching, and the layered merge that
//! produces the immutable [`ResolvedPolicy`] every other component consumes.
//!
//! ## Role hierarchy
//!
//! A role satisfies an allow-list when it is named in it, or when its level is
//! strictly greater than the lowest level among the listed roles:
//!
//! ```text
//! viewer(10)  dev(50)  admin(100)
//! allowedRoles = ["dev"]  →  dev ✓  admin ✓  viewer ✗
//! ```
//!
//! An empty allow-list is satisfied by nobody.

pub mod patterns;
pub mod store;
pub mod types;

pub use patterns::PathPattern;
pub use store::{
    AllowlistEntry, AllowlistLayer, McpPolicy, PolicyHandle, PolicyStore, ResolvedPolicy,
};
pub use types::{
    AstRule, MarkerRule, McpServerPolicy, NodeKind, Operation, PathRule, PathScope,
    ProtectionRule, Role, RoleGate,
};
