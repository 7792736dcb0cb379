//! Lexical path handling
//!
//! Normalization here never touches the filesystem; symlinks are resolved
//! separately by [`crate::access_control::SymlinkResolver`].

use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without consulting the filesystem.
///
/// `..` at the root of an absolute path is dropped; leading `..` components of
/// a relative path are kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Join a candidate onto a base directory (unless already absolute) and normalize
pub fn resolve_against(base: &Path, candidate: &Path) -> PathBuf {
    if candidate.is_absolute() {
        normalize_lexically(candidate)
    } else {
        normalize_lexically(&base.join(candidate))
    }
}

/// Anchor a base directory to the process working directory.
///
/// Relative bases would otherwise produce relative paths that never start with
/// the base, hiding symlinks in their first component.
pub fn absolute_base(base: &Path) -> PathBuf {
    std::path::absolute(base)
        .map(|p| normalize_lexically(&p))
        .unwrap_or_else(|_| normalize_lexically(base))
}

/// The `/`-separated form that patterns are matched against: relative to
/// `root` when the path lies inside it, otherwise the path without its root.
pub fn match_form(root: &Path, path: &Path) -> String {
    let relative = path
        .strip_prefix(root)
        .unwrap_or_else(|_| path.strip_prefix("/").unwrap_or(path));

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();

    parts.join("/")
}
