//! `index`/`toc` directive: bullet list of matching documents.

use std::io::Write;
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::{Location, PreprocessError};
use crate::title::title_of_file;

use super::DirectiveContext;

/// One matched document.
#[derive(Debug)]
struct Entry {
    path: PathBuf,
    /// Path relative to the base directory, `/` separated.
    display: String,
}

/// Write one `* [title](path)` line per file matching `pattern`.
///
/// Entries are sorted by path. The document being preprocessed is listed
/// by title only. Returns the number of entries written.
pub(crate) fn write_toc<W: Write>(
    out: &mut W,
    ctx: &DirectiveContext<'_>,
    pattern: &str,
    indent: &str,
    location: &Location,
) -> Result<usize, PreprocessError> {
    let entries = matching_entries(ctx, pattern, location)?;

    for entry in &entries {
        let title = title_of_file(&entry.path, &entry.display).map_err(|err| {
            PreprocessError::referenced(entry.path.clone(), err, location.clone())
        })?;
        if ctx.is_source(&entry.path) {
            writeln!(out, "{indent}* {title}")?;
        } else {
            writeln!(out, "{indent}* [{title}]({})", entry.display)?;
        }
    }

    tracing::debug!(pattern, count = entries.len(), "Generated table of contents");
    Ok(entries.len())
}

fn matching_entries(
    ctx: &DirectiveContext<'_>,
    pattern: &str,
    location: &Location,
) -> Result<Vec<Entry>, PreprocessError> {
    let full_pattern = anchored_pattern(ctx.base_dir, pattern);
    let paths = glob::glob(&full_pattern).map_err(|err| PreprocessError::MalformedDirective {
        message: format!("invalid pattern `{pattern}`: {err}"),
        location: location.clone(),
    })?;

    let mut entries = Vec::new();
    for path in paths {
        let path = path.map_err(|err| {
            let path = err.path().to_path_buf();
            PreprocessError::referenced(path, err.into(), location.clone())
        })?;
        if path.is_dir() {
            continue;
        }
        let display = ctx.display_path(&path);
        entries.push(Entry { path, display });
    }
    entries.sort_by(|a, b| a.display.cmp(&b.display));

    Ok(entries)
}

/// Prefix `pattern` with the base directory, escaping glob metacharacters in it.
fn anchored_pattern(base_dir: &Path, pattern: &str) -> String {
    if base_dir.as_os_str().is_empty() || Path::new(pattern).is_absolute() {
        return pattern.to_owned();
    }
    let base = Pattern::escape(&base_dir.to_string_lossy());
    let base = base.trim_end_matches(std::path::MAIN_SEPARATOR);
    format!("{base}{}{pattern}", std::path::MAIN_SEPARATOR)
}
