//! Shell command pre-filter
//!
//! Extracts the file paths a command line would obviously read, so they can be
//! checked before the command runs. The scan is lexical: the command is split
//! on `|`, `;`, `&&`, `||` and `&` without regard to quoting, and tokens are
//! separated by whitespace.
//!
//! Only a fixed set of viewer, editor and search utilities is recognized.
//! Anything else (copies, archivers, network tools, interpreters running
//! inline code, command substitution, here-documents) is out of reach of a
//! lexical scan and yields no paths.

use crate::access_control::path::resolve_against;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Commands whose non-flag arguments name files they read or edit
pub const FILE_ACCESS_COMMANDS: &[&str] = &[
    "ag", "awk", "bat", "cat", "diff", "egrep", "emacs", "fgrep", "file", "find", "grep", "head",
    "hexdump", "less", "more", "nano", "nl", "nvim", "od", "rg", "sed", "sort", "stat", "strings",
    "tac", "tail", "uniq", "vi", "view", "vim", "wc", "xxd",
];

/// Whether `flag` consumes the next token as its value for `command`.
///
/// Script files (`grep -f`, `sed -f`, `awk -f`) are read by the command, so
/// their values stay path candidates.
fn flag_takes_value(command: &str, flag: &str) -> bool {
    let flags: &[&str] = match command {
        "head" | "tail" => &["-n", "-c"],
        "grep" | "egrep" | "fgrep" => &["-e", "-m", "-A", "-B", "-C", "--regexp"],
        "rg" => &[
            "-e", "-g", "-m", "-t", "-A", "-B", "-C", "--regexp", "--glob", "--type",
        ],
        "ag" => &["-G", "-A", "-B", "-C", "-m"],
        "find" => &[
            "-name", "-iname", "-path", "-ipath", "-type", "-maxdepth", "-mindepth", "-newer",
            "-size",
        ],
        "sort" => &["-k", "-t", "-o"],
        "sed" => &["-e", "--expression"],
        "awk" => &["-F", "-v"],
        "diff" => &["-U", "-C"],
        "xxd" | "od" | "hexdump" => &["-c", "-l", "-s", "-n", "-N", "-j", "-t"],
        "strings" => &["-n", "-t"],
        "nl" => &["-b", "-s", "-w"],
        _ => &[],
    };
    flags.contains(&flag)
}

/// Only this prefix is stripped to find the real command
const SUDO: &str = "sudo";

fn basename(token: &str) -> &str {
    Path::new(token)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(token)
}

/// Whether a command name (possibly a path) is a scanned file-access command
pub fn is_file_access_command(name: &str) -> bool {
    FILE_ACCESS_COMMANDS.contains(&basename(name))
}

/// Split a command line into simple commands on `|`, `||`, `&&`, `;` and `&`.
///
/// `>&` and `<&` are file descriptor duplications, not separators.
fn split_commands(command: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev = None;

    for (i, c) in command.char_indices() {
        let separator = match c {
            '|' | ';' => true,
            '&' => !matches!(prev, Some('>') | Some('<')),
            _ => false,
        };
        if separator {
            parts.push(&command[start..i]);
            start = i + c.len_utf8();
        }
        prev = Some(c);
    }
    parts.push(&command[start..]);
    parts.retain(|p| !p.trim().is_empty());
    parts
}

/// Output redirection: `>`, `>>`, `2>`, `&>`, `>&2`, with or without a
/// target glued on
fn is_output_redirect(token: &str) -> bool {
    let rest = token.trim_start_matches(|c: char| c.is_ascii_digit() || c == '&');
    rest.starts_with('>')
}

/// Path candidates of one simple command
fn candidates(segment: &str) -> Vec<&str> {
    let tokens: Vec<&str> = segment.split_whitespace().collect();
    let head_index = match tokens.first() {
        Some(first) if basename(first) == SUDO => 1,
        Some(_) => 0,
        None => return Vec::new(),
    };
    let Some(head) = tokens.get(head_index) else {
        return Vec::new();
    };
    if !is_file_access_command(head) {
        trace!(command = head, "Command not scanned");
        return Vec::new();
    }

    let mut found = Vec::new();
    let command = basename(head);
    let mut args = tokens[head_index + 1..].iter();
    while let Some(&token) = args.next() {
        if is_output_redirect(token) {
            // Bare operator: the next token is the write target
            if token.ends_with(['>', '&']) {
                args.next();
            }
            continue;
        }
        if let Some(input) = token.strip_prefix('<') {
            if input.is_empty() {
                if let Some(&target) = args.next() {
                    found.push(target);
                }
            } else {
                found.push(input);
            }
            continue;
        }
        if token.starts_with('-') {
            if flag_takes_value(command, token) {
                args.next();
            }
            continue;
        }
        // Bare patterns and inline scripts are candidates too
        found.push(token);
    }
    found
}

/// Absolute paths a command line would read, resolved against `cwd`.
///
/// `~` is expanded and `..` segments are normalized. Results are deduplicated
/// in first-seen order.
pub fn scan_bash_command(command: &str, cwd: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();

    for segment in split_commands(command) {
        for candidate in candidates(segment) {
            let expanded = shellexpand::tilde(candidate);
            let resolved = resolve_against(cwd, Path::new(expanded.as_ref()));
            if !paths.contains(&resolved) {
                paths.push(resolved);
            }
        }
    }

    trace!(command, count = paths.len(), "Scanned command");
    paths
}
