//! Symlink resolution
//!
//! Canonicalizes a path through its whole link chain. Cycles and invalid path
//! bytes are errors, never a silent result.

use crate::access_control::path::{absolute_base, normalize_lexically, resolve_against};
use crate::error::PathResolutionError;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// Upper bound on links followed when checking a chain by hand
const MAX_LINK_HOPS: usize = 40;

/// Outcome of resolving an existing (or dangling-link) path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Whether the path, or any directory on the way to it, is a symlink
    pub is_symlink: bool,
    /// Canonical target
    pub real_path: PathBuf,
}

/// Resolves paths relative to a base directory
#[derive(Debug, Clone)]
pub struct SymlinkResolver {
    base: PathBuf,
}

impl SymlinkResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: absolute_base(&base.into()),
        }
    }

    /// Resolve a path.
    ///
    /// Returns `Ok(None)` when nothing exists at the path. A dangling symlink
    /// resolves to its lexical target so rules can still be checked against it.
    pub fn resolve(&self, path: &Path) -> Result<Option<ResolvedPath>, PathResolutionError> {
        if path.as_os_str().as_encoded_bytes().contains(&0) {
            return Err(PathResolutionError::InvalidPath {
                path: path.to_string_lossy().into_owned(),
                reason: "embedded NUL byte".to_string(),
            });
        }

        let absolute = resolve_against(&self.base, path);

        match fs::canonicalize(&absolute) {
            Ok(real_path) => {
                let is_symlink = self.has_symlink_component(&absolute);
                trace!(
                    path = %absolute.display(),
                    real = %real_path.display(),
                    is_symlink,
                    "Resolved path"
                );
                Ok(Some(ResolvedPath {
                    is_symlink,
                    real_path,
                }))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match fs::symlink_metadata(&absolute) {
                    Ok(meta) if meta.file_type().is_symlink() => {
                        let target = read_link_target(&absolute)
                            .map_err(|source| PathResolutionError::Io {
                                path: absolute.clone(),
                                source,
                            })?;
                        Ok(Some(ResolvedPath {
                            is_symlink: true,
                            real_path: target,
                        }))
                    }
                    _ => Ok(None),
                }
            }
            Err(e) => {
                if is_loop_error(&e) || follows_into_cycle(&absolute) {
                    return Err(PathResolutionError::SymlinkCycle { path: absolute });
                }
                Err(PathResolutionError::Io {
                    path: absolute,
                    source: e,
                })
            }
        }
    }

    /// Check every component below the base (or every component, for paths
    /// outside it) for a symlink.
    fn has_symlink_component(&self, absolute: &Path) -> bool {
        let start = if absolute.starts_with(&self.base) {
            self.base.components().count()
        } else {
            0
        };

        let mut prefix = PathBuf::new();
        for (i, component) in absolute.components().enumerate() {
            prefix.push(component);
            if i < start || matches!(component, Component::RootDir | Component::Prefix(_)) {
                continue;
            }
            if fs::symlink_metadata(&prefix).is_ok_and(|m| m.file_type().is_symlink()) {
                return true;
            }
        }
        false
    }
}

fn read_link_target(link: &Path) -> io::Result<PathBuf> {
    let target = fs::read_link(link)?;
    let parent = link.parent().unwrap_or(Path::new("/"));
    Ok(normalize_lexically(&parent.join(target)))
}

/// Follow the final-component link chain by hand looking for a repeat
fn follows_into_cycle(start: &Path) -> bool {
    let mut visited = HashSet::new();
    let mut current = start.to_path_buf();

    for _ in 0..MAX_LINK_HOPS {
        let is_link = fs::symlink_metadata(&current).is_ok_and(|m| m.file_type().is_symlink());
        if !is_link {
            return false;
        }
        if !visited.insert(current.clone()) {
            return true;
        }
        match read_link_target(&current) {
            Ok(next) => current = next,
            Err(_) => return false,
        }
    }
    true
}

#[cfg(target_os = "linux")]
fn is_loop_error(e: &io::Error) -> bool {
    e.raw_os_error() == Some(40)
}

#[cfg(target_os = "macos")]
fn is_loop_error(e: &io::Error) -> bool {
    e.raw_os_error() == Some(62)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn is_loop_error(_e: &io::Error) -> bool {
    false
}
