//! Role authentication
//!
//! Verifies signed role tokens. A verified role is an identity claim for
//! prompt-level decisions only: tool-level access checks always run as
//! [`ResolvedPolicy::default_role`](crate::policy::ResolvedPolicy::default_role),
//! so a token cannot elevate what tools may touch.

pub mod token;

pub use token::{RoleClaims, RoleTokenVerifier, TokenVerification};
