//! `code` directive: file embedding.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};

use crate::error::{Location, PreprocessError};

use super::DirectiveContext;

/// Write every line of the file at `src`, each prefixed with `indent`.
///
/// Lines are always terminated with a single `\n`, whatever the file uses.
/// Returns the number of lines written.
pub(crate) fn embed_file<W: Write>(
    out: &mut W,
    ctx: &DirectiveContext<'_>,
    src: &str,
    indent: &str,
    location: &Location,
) -> Result<usize, PreprocessError> {
    let path = ctx.resolve_path(src);
    let file = File::open(&path)
        .map_err(|err| PreprocessError::referenced(path.clone(), err, location.clone()))?;

    let mut count = 0;
    for line in BufReader::new(file).split(b'\n') {
        let mut line =
            line.map_err(|err| PreprocessError::referenced(path.clone(), err, location.clone()))?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        out.write_all(indent.as_bytes())?;
        out.write_all(&line)?;
        out.write_all(b"\n")?;
        count += 1;
    }

    tracing::debug!(path = %path.display(), count, "Embedded file");
    Ok(count)
}
