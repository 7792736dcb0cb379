//! Configuration module
//!
//! Handles policy documents (JSON or TOML, one per directory) and engine
//! settings loaded from TOML files and environment variables.

pub mod loader;
pub mod types;

pub use loader::{
    PolicyFormat, discover_policy_files, load_policy, load_settings, load_settings_from_str,
    parse_policy_document, parse_policy_document_lenient,
};
pub use types::*;
