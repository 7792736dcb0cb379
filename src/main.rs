//! Pathwarden CLI
//!
//! Runs policy checks, scanners and redaction from the command line and prints
//! JSON results to stdout.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pathwarden::{
    access_control::{AccessResolver, resolve_against},
    audit::{AuditLog, FileAuditLog, SecurityEvent, TracingAuditLog},
    auth::RoleTokenVerifier,
    config::{EngineSettings, LogFormat, PolicyDocument, load_policy, load_settings},
    policy::{Operation, PolicyHandle, ResolvedPolicy},
    scanner::{PromptVerdict, guard_prompt, scan_bash_command},
    segments::redact_for_role,
};
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Policy decisions and content redaction for AI coding agents
#[derive(Parser, Debug)]
#[command(name = "pathwarden")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to settings file
    #[arg(short, long, env = "PATHWARDEN_CONFIG")]
    config: Option<String>,

    /// Project root (outermost directory searched for policy files)
    #[arg(long, env = "PATHWARDEN_ROOT", default_value = ".")]
    root: PathBuf,

    /// Directory whose policy applies (defaults to the project root)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides settings
    #[arg(long, env = "PATHWARDEN_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decide whether a role may perform an operation on a path
    Check {
        path: String,
        #[arg(short, long, value_parser = parse_operation, default_value = "read")]
        operation: Operation,
        /// Defaults to the lowest-level configured role
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Extract the paths a shell command would read and check each one
    ScanBash {
        command: String,
        /// Working directory the command runs in (defaults to the project root)
        #[arg(long)]
        cwd: Option<PathBuf>,
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Guard prompt text read from a file or stdin
    ScanPrompt {
        /// Read from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Print a file with protected segments replaced
    Redact {
        path: PathBuf,
        #[arg(short, long, value_parser = parse_operation, default_value = "llm")]
        operation: Operation,
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Verify a role token
    VerifyToken {
        /// PEM file holding the RSA public key
        #[arg(long)]
        public_key: PathBuf,
        /// File holding the token (stdin when omitted)
        #[arg(long)]
        token: Option<PathBuf>,
        /// Revoked token ids
        #[arg(long, value_delimiter = ',')]
        revoked: Vec<String>,
    },
    /// Print the JSON Schema of a policy document
    Schema,
}

fn parse_operation(s: &str) -> Result<Operation, String> {
    Operation::try_parse(s).ok_or_else(|| format!("unknown operation '{s}' (read, write, llm)"))
}

fn init_logging(args: &Args, settings: &EngineSettings) {
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let registry = tracing_subscriber::registry().with(filter);
    match settings.logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Audit sink: settings override the policy's `logging.path`; the policy's
/// `logging.level` filters what the file receives
fn audit_sink(settings: &EngineSettings, policy: &ResolvedPolicy) -> Arc<dyn AuditLog> {
    let path = settings
        .audit
        .path
        .clone()
        .or_else(|| policy.logging().and_then(|l| l.path.clone()));
    let Some(path) = path else {
        return Arc::new(TracingAuditLog);
    };

    let mut sink = FileAuditLog::new(&path);
    if let Some(level) = policy.logging().and_then(|l| l.level.as_deref()) {
        match level.parse::<Level>() {
            Ok(level) => sink = sink.with_min_level(level),
            Err(_) => warn!(level, "Ignoring unknown audit level"),
        }
    }
    debug!(path = %path.display(), "Auditing to file");
    Arc::new(sink)
}

fn role_or_default(role: Option<String>, policy: &ResolvedPolicy) -> String {
    role.or_else(|| policy.default_role().map(|r| r.name.clone()))
        .unwrap_or_default()
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = load_settings(args.config.as_deref())?;
    init_logging(&args, &settings);

    if matches!(args.command, Command::Schema) {
        return print_json(&schemars::schema_for!(PolicyDocument));
    }

    if let Command::VerifyToken {
        public_key,
        token,
        revoked,
    } = &args.command
    {
        let pem = std::fs::read_to_string(public_key)
            .with_context(|| format!("failed to read {}", public_key.display()))?;
        let verifier = RoleTokenVerifier::new(&pem)?;
        let token = read_input(token.as_deref())?;
        return print_json(&verifier.verify(token.as_bytes(), revoked));
    }

    let root = std::fs::canonicalize(&args.root)
        .with_context(|| format!("project root {} not found", args.root.display()))?;
    let dir = match &args.dir {
        Some(dir) => std::fs::canonicalize(dir)?,
        None => root.clone(),
    };

    let handle = PolicyHandle::new(
        load_policy(&root, &dir, &settings.policy_file)
            .inspect_err(|e| error!(error = %e, "Failed to load policy"))?,
    );
    let policy = handle.snapshot();
    info!(
        rules = policy.rules().len(),
        layers = policy.allowlist_layers().len(),
        "Policy loaded"
    );

    let audit = audit_sink(&settings, &policy);
    let resolver = AccessResolver::new(root.clone()).with_audit(audit.clone());

    match args.command {
        Command::Check {
            path,
            operation,
            role,
        } => {
            let role = role_or_default(role, &policy);
            let decision = resolver.check_access(&policy, &path, operation, &role)?;
            print_json(&decision)?;
        }
        Command::ScanBash { command, cwd, role } => {
            let role = role_or_default(role, &policy);
            let cwd = cwd.map_or_else(|| root.clone(), |c| resolve_against(&root, &c));
            let mut results = Vec::new();
            for path in scan_bash_command(&command, &cwd) {
                let shown = path.to_string_lossy().into_owned();
                let decision = resolver.check_access(&policy, &shown, Operation::Read, &role)?;
                results.push(json!({"path": shown, "decision": decision}));
            }
            print_json(&results)?;
        }
        Command::ScanPrompt { file, role } => {
            let role = role_or_default(role, &policy);
            let text = read_input(file.as_deref())?;
            let verdict = guard_prompt(&text, &policy, &role);
            if let PromptVerdict::Blocked { reason } = &verdict {
                let event = SecurityEvent::new(
                    &role,
                    Operation::Llm,
                    "<prompt>",
                    false,
                    Some(reason.clone()),
                )
                .with_content(&text, settings.audit.preview_chars);
                audit.log_security_event(&event);
            }
            print_json(&verdict)?;
        }
        Command::Redact {
            path,
            operation,
            role,
        } => {
            let role = role_or_default(role, &policy);
            let path = resolve_against(&root, &path);
            resolver.require(&policy, &path.to_string_lossy(), operation, &role)?;
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            print!("{}", redact_for_role(&path, &content, &policy, operation, &role));
        }
        Command::Schema | Command::VerifyToken { .. } => {}
    }

    Ok(())
}
