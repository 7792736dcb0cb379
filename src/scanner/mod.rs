//! Lexical pre-filters
//!
//! - [`bash`]: paths a shell command would read, checked before it runs
//! - [`prompt`]: protected markers and path literals in text sent to a model
//! - [`mcp`]: per-server trust gate deciding whether MCP traffic is scanned

pub mod bash;
pub mod mcp;
pub mod prompt;

pub use bash::{FILE_ACCESS_COMMANDS, is_file_access_command, scan_bash_command};
pub use mcp::{McpGate, McpVerdict};
pub use prompt::{
    MatchKind, PromptMatch, PromptVerdict, extract_literal_from_glob, guard_prompt,
    scan_for_protected_content,
};
