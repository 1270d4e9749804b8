//! Document tree traversal.
//!
//! Drives pulldown-cmark's offset iterator and reports the nodes the
//! directive engine cares about, in document order, together with their
//! byte span and tree depth.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

/// Kind of a node of interest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// Raw HTML inside a run of inline content.
    InlineHtml,
    /// Block-level HTML (one or more whole lines).
    HtmlBlock,
    /// Indented or fenced code block.
    CodeBlock { fenced: bool },
}

/// A node of interest with its source span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub span: Range<usize>,
    /// Number of enclosing container nodes.
    pub depth: usize,
}

/// Parser options used for every document.
pub(crate) fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
        | Options::ENABLE_PLUSES_DELIMITED_METADATA_BLOCKS
}

/// Walk `source` and call `visit` for each node of interest.
///
/// Stops at the first error returned by `visit`.
pub(crate) fn walk<E>(source: &str, mut visit: impl FnMut(Node) -> Result<(), E>) -> Result<(), E> {
    let mut depth = 0usize;

    for (event, span) in Parser::new_ext(source, parser_options()).into_offset_iter() {
        match event {
            Event::Start(tag) => {
                let kind = match tag {
                    Tag::HtmlBlock => Some(NodeKind::HtmlBlock),
                    Tag::CodeBlock(kind) => Some(NodeKind::CodeBlock {
                        fenced: matches!(kind, CodeBlockKind::Fenced(_)),
                    }),
                    _ => None,
                };
                if let Some(kind) = kind {
                    tracing::trace!(?kind, depth, start = span.start, "Visiting node");
                    visit(Node { kind, span, depth })?;
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::InlineHtml(_) => visit(Node {
                kind: NodeKind::InlineHtml,
                span,
                depth,
            })?,
            _ => {}
        }
    }

    Ok(())
}
