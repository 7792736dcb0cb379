//! MCP server trust gate
//!
//! Applies a server's trust level to the text crossing the boundary:
//! `blocked` servers are never called, `enforced` servers have both their call
//! arguments and their results run through [`guard_prompt`], and `trusted`
//! servers pass through unscanned.

use crate::policy::{McpServerPolicy, ResolvedPolicy};
use crate::scanner::prompt::{PromptVerdict, guard_prompt};
use serde::Serialize;
use tracing::{debug, warn};

/// What to do with one MCP call or result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum McpVerdict {
    /// Do not call the server, or drop its output
    Refused { reason: String },
    /// Trusted server: forward the text unchanged without scanning
    Passthrough,
    /// Enforced server: forward according to the scan
    Scanned { verdict: PromptVerdict },
}

impl McpVerdict {
    /// The text to forward, or `None` when nothing may be forwarded
    pub fn forwarded<'a>(&'a self, original: &'a str) -> Option<&'a str> {
        match self {
            McpVerdict::Refused { .. } => None,
            McpVerdict::Passthrough => Some(original),
            McpVerdict::Scanned { verdict } => match verdict {
                PromptVerdict::Clean => Some(original),
                PromptVerdict::Redacted { text, .. } => Some(text),
                PromptVerdict::Blocked { .. } => None,
            },
        }
    }
}

/// Direction of the text being guarded
#[derive(Debug, Clone, Copy)]
enum Flow {
    Call,
    Result,
}

/// Trust gate over a resolved policy snapshot
pub struct McpGate<'a> {
    policy: &'a ResolvedPolicy,
}

impl<'a> McpGate<'a> {
    pub fn new(policy: &'a ResolvedPolicy) -> Self {
        Self { policy }
    }

    pub fn policy_for(&self, server: &str) -> McpServerPolicy {
        self.policy.mcp().policy_for(server)
    }

    /// Guard the serialized arguments of a tool call before it is sent
    pub fn guard_call(&self, server: &str, arguments: &str, role: &str) -> McpVerdict {
        self.guard(server, arguments, role, Flow::Call)
    }

    /// Guard a tool result before it reaches the model
    pub fn guard_result(&self, server: &str, output: &str, role: &str) -> McpVerdict {
        self.guard(server, output, role, Flow::Result)
    }

    fn guard(&self, server: &str, text: &str, role: &str, flow: Flow) -> McpVerdict {
        match self.policy_for(server) {
            McpServerPolicy::Blocked => {
                warn!(server, ?flow, "MCP server is blocked");
                McpVerdict::Refused {
                    reason: format!("MCP server '{server}' is blocked by policy"),
                }
            }
            McpServerPolicy::Trusted => McpVerdict::Passthrough,
            McpServerPolicy::Enforced => {
                let verdict = guard_prompt(text, self.policy, role);
                debug!(server, ?flow, clean = verdict == PromptVerdict::Clean, "MCP text scanned");
                McpVerdict::Scanned { verdict }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyDocument;
    use crate::policy::PolicyStore;

    fn policy(json: &str) -> ResolvedPolicy {
        let doc: PolicyDocument = serde_json::from_str(json).unwrap();
        PolicyStore::merge(&[(doc, "root")]).unwrap()
    }

    const POLICY: &str = r#"{
        "rules": [{"pattern": ".env", "deniedOperations": ["llm"], "allowedRoles": []}],
        "mcp": {"defaultPolicy": "enforced", "servers": {"scraper": "blocked", "docs": "trusted"}}
    }"#;

    #[test]
    fn test_absent_mcp_config_trusts_everyone() {
        let policy = policy(r#"{"rules": []}"#);
        let gate = McpGate::new(&policy);
        assert_eq!(gate.policy_for("anything"), McpServerPolicy::Trusted);
        assert_eq!(gate.guard_result("anything", ".env", "viewer"), McpVerdict::Passthrough);
    }

    #[test]
    fn test_blocked_server_refused() {
        let policy = policy(POLICY);
        let gate = McpGate::new(&policy);
        let verdict = gate.guard_call("scraper", "{}", "viewer");
        assert!(matches!(verdict, McpVerdict::Refused { .. }));
        assert_eq!(verdict.forwarded("{}"), None);
    }

    #[test]
    fn test_trusted_server_bypasses_scan() {
        let policy = policy(POLICY);
        let gate = McpGate::new(&policy);
        let verdict = gate.guard_result("docs", "contents of .env", "viewer");
        assert_eq!(verdict.forwarded("contents of .env"), Some("contents of .env"));
    }

    #[test]
    fn test_enforced_server_scans_both_directions() {
        let policy = policy(POLICY);
        let gate = McpGate::new(&policy);

        let call = gate.guard_call("search", r#"{"query": "read .env"}"#, "viewer");
        assert!(matches!(
            call,
            McpVerdict::Scanned { verdict: PromptVerdict::Blocked { .. } }
        ));

        let result = gate.guard_result("search", "nothing to see", "viewer");
        assert_eq!(result.forwarded("nothing to see"), Some("nothing to see"));
    }
}
