//! Directive processing context.
//!
//! Provides file system location information to directive generators.

use std::path::{Component, Path, PathBuf};

/// Context provided to directive generators for resolving referenced files.
///
/// Every relative path a directive mentions (`src`, `href`, `pattern`) is
/// resolved against [`base_dir`](Self::base_dir). The process working
/// directory is never consulted or changed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DirectiveContext<'a> {
    /// Path to the document being preprocessed (if known).
    pub source_path: Option<&'a Path>,
    /// Base directory for resolving relative paths.
    pub base_dir: &'a Path,
}

impl DirectiveContext<'_> {
    /// Resolve a relative path against the base directory.
    ///
    /// Absolute paths are returned unchanged.
    pub(crate) fn resolve_path(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }

    /// Whether `path` refers to the document being preprocessed.
    pub(crate) fn is_source(&self, path: &Path) -> bool {
        let Some(source_path) = self.source_path else {
            return false;
        };
        match (absolute(source_path), absolute(path)) {
            (Some(source), Some(candidate)) => source == candidate,
            _ => false,
        }
    }

    /// Render `path` relative to the base directory with `/` separators.
    pub(crate) fn display_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(self.base_dir).unwrap_or(path);
        if relative.is_absolute() {
            return relative.to_string_lossy().into_owned();
        }
        relative
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Canonical form of `path`, or its lexical absolute form if it does not exist.
fn absolute(path: &Path) -> Option<PathBuf> {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .ok()
}
