//! `link` directive: link text taken from the target's title.

use crate::error::{Location, PreprocessError};
use crate::title::title_of_file;

use super::DirectiveContext;

/// Render `[title](href)` for the document at `href`.
///
/// The title defaults to `href` itself when the target declares none.
pub(crate) fn link_fragment(
    ctx: &DirectiveContext<'_>,
    href: &str,
    location: &Location,
) -> Result<String, PreprocessError> {
    let path = ctx.resolve_path(href);
    let title = title_of_file(&path, href)
        .map_err(|err| PreprocessError::referenced(path, err, location.clone()))?;
    Ok(format!("[{title}]({href})"))
}
