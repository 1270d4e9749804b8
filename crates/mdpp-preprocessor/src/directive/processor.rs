//! Directive processor.
//!
//! Walks the document tree, keeps a stack of open directives and splices
//! generated content into a copy of the source.

use std::io::{Read, Write};
use std::ops::Range;
use std::path::PathBuf;

use crate::error::{Location, PreprocessError};
use crate::walk::{Node, NodeKind, walk};

use super::embed::embed_file;
use super::frame::{Directive, DirectiveName, Frame, Surface};
use super::link::link_fragment;
use super::output::{Splicer, block_end, line_end, line_prefix, line_start, skip_blanks};
use super::parser::{Attribute, DirectiveGrammar, ParsedMarker, Recognized};
use super::toc::write_toc;
use super::DirectiveContext;

/// Configuration for the preprocessor.
#[derive(Clone, Debug)]
pub struct PreprocessorConfig {
    /// Base directory for resolving `src`, `href` and `pattern` attributes.
    pub base_dir: PathBuf,
    /// Path to the document being preprocessed (if known).
    ///
    /// Used in error locations and to avoid linking a document to itself
    /// from its own table of contents.
    pub source_path: Option<PathBuf>,
    /// Prefix of directive names, e.g. `mdpp` for `<!-- mdppcode ... -->`.
    ///
    /// Default: empty
    pub prefix: String,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PreprocessorConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            source_path: None,
            prefix: String::new(),
        }
    }

    /// Set the base directory for resolving relative paths.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Set the source file path.
    #[must_use]
    pub fn with_source_path(mut self, source_path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(source_path.into());
        self
    }

    /// Set the directive name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn context(&self) -> DirectiveContext<'_> {
        DirectiveContext {
            source_path: self.source_path.as_deref(),
            base_dir: &self.base_dir,
        }
    }
}

/// Result of preprocessing one document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preprocessed {
    /// The rewritten document.
    pub output: Vec<u8>,
    /// Whether any directive marker was encountered.
    pub found_directive: bool,
    /// Whether `output` differs from the input.
    pub changed: bool,
}

/// Markdown directive preprocessor.
///
/// # Example
///
/// ```
/// use mdpp_preprocessor::Preprocessor;
///
/// let preprocessor = Preprocessor::new();
/// let result = preprocessor.process(b"# Plain\n\nNo directives here.\n").unwrap();
///
/// assert_eq!(result.output, b"# Plain\n\nNo directives here.\n");
/// assert!(!result.found_directive);
/// assert!(!result.changed);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Preprocessor {
    config: PreprocessorConfig,
}

impl Preprocessor {
    /// Create a preprocessor with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PreprocessorConfig::default())
    }

    /// Create a preprocessor with custom configuration.
    #[must_use]
    pub fn with_config(config: PreprocessorConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Preprocess one document.
    ///
    /// Output is only returned when the whole document was processed.
    pub fn process(&self, input: &[u8]) -> Result<Preprocessed, PreprocessError> {
        let source = std::str::from_utf8(input)?;
        let grammar = DirectiveGrammar::new(&self.config.prefix)?;

        let mut run = Run::new(source, &grammar, self.config.context());
        walk(source, |node| run.visit(&node))?;
        let found_directive = run.found_directive;
        let output = run.finish()?;

        let changed = output != input;
        tracing::debug!(found_directive, changed, "Preprocessed document");

        Ok(Preprocessed {
            output,
            found_directive,
            changed,
        })
    }

    /// Read a whole document from `reader`, preprocess it and write it to `writer`.
    ///
    /// Nothing is written when preprocessing fails.
    pub fn process_reader<R: Read, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
    ) -> Result<Preprocessed, PreprocessError> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;

        let result = self.process(&input)?;
        writer.write_all(&result.output)?;
        writer.flush()?;

        Ok(result)
    }
}

/// State of one preprocessing run.
struct Run<'a> {
    source: &'a str,
    grammar: &'a DirectiveGrammar,
    ctx: DirectiveContext<'a>,
    stack: Vec<Frame>,
    splicer: Splicer<'a>,
    found_directive: bool,
}

/// A directive marker located in the source.
struct Marker {
    /// Offset of `<!--`.
    offset: usize,
    /// End of the node holding the marker.
    end: usize,
    depth: usize,
    surface: Surface,
}

impl<'a> Run<'a> {
    fn new(source: &'a str, grammar: &'a DirectiveGrammar, ctx: DirectiveContext<'a>) -> Self {
        Self {
            source,
            grammar,
            ctx,
            stack: Vec::new(),
            splicer: Splicer::new(source),
            found_directive: false,
        }
    }

    fn location(&self, offset: usize) -> Location {
        Location::at(self.source, offset, self.ctx.source_path)
    }

    fn visit(&mut self, node: &Node) -> Result<(), PreprocessError> {
        let source = self.source;
        match node.kind {
            NodeKind::InlineHtml => {
                let marker = Marker {
                    offset: node.span.start,
                    end: node.span.end,
                    depth: node.depth,
                    surface: Surface::Inline,
                };
                self.visit_comment(&source[node.span.clone()], &marker)
            }
            NodeKind::HtmlBlock => {
                let offset = skip_blanks(source, node.span.start);
                let first_line_end = source[offset..node.span.end]
                    .find('\n')
                    .map_or(node.span.end, |i| offset + i);
                let marker = Marker {
                    offset,
                    end: block_end(source, node.span.end),
                    depth: node.depth,
                    surface: Surface::Block,
                };
                self.visit_comment(&source[offset..first_line_end], &marker)
            }
            NodeKind::CodeBlock { fenced } => self.visit_code_block(node.span.clone(), fenced),
        }
    }

    fn visit_comment(&mut self, text: &str, marker: &Marker) -> Result<(), PreprocessError> {
        let parsed = match self.grammar.recognize(text) {
            Recognized::NotDirective => return Ok(()),
            Recognized::Malformed => {
                self.found_directive = true;
                return Err(PreprocessError::MalformedDirective {
                    message: format!("`{}` does not match the directive grammar", text.trim()),
                    location: self.location(marker.offset),
                });
            }
            Recognized::Marker(parsed) => parsed,
        };
        self.found_directive = true;

        let (ParsedMarker::Open { name, .. } | ParsedMarker::Close { name }) = &parsed;
        let kind = self.directive_name(name, marker)?;

        match parsed {
            ParsedMarker::Open { attribute, .. } => self.open(kind, attribute, marker),
            ParsedMarker::Close { name } => self.close(kind, name, marker),
        }
    }

    fn open(
        &mut self,
        kind: DirectiveName,
        attribute: Option<Attribute>,
        marker: &Marker,
    ) -> Result<(), PreprocessError> {
        let location = self.location(marker.offset);
        if self
            .stack
            .iter()
            .any(|frame| matches!(frame.directive, Directive::Index { .. }))
        {
            return Err(PreprocessError::MalformedDirective {
                message: format!(
                    "directive `{}` cannot appear inside an `index` body, which is regenerated",
                    kind.as_str()
                ),
                location,
            });
        }
        let line = location.line;
        let directive = Directive::from_open(kind, attribute, location)?;
        tracing::debug!(directive = kind.as_str(), line, "Opened directive");

        self.splicer.copy_up_to(marker.end);
        self.stack.push(Frame {
            directive,
            depth: marker.depth,
            offset: marker.offset,
        });
        Ok(())
    }

    /// Resolve a marker name, checking that it is used on the right surface.
    fn directive_name(&self, name: &str, marker: &Marker) -> Result<DirectiveName, PreprocessError> {
        let Some(kind) = DirectiveName::parse(name) else {
            return Err(PreprocessError::MalformedDirective {
                message: format!("unknown directive `{name}`"),
                location: self.location(marker.offset),
            });
        };
        if kind.surface() != marker.surface {
            return Err(PreprocessError::MalformedDirective {
                message: format!(
                    "directive `{}` must appear {}",
                    kind.as_str(),
                    kind.surface().describe()
                ),
                location: self.location(marker.offset),
            });
        }
        Ok(kind)
    }

    fn close(
        &mut self,
        kind: DirectiveName,
        name: String,
        marker: &Marker,
    ) -> Result<(), PreprocessError> {
        let location = self.location(marker.offset);
        let Some(frame) = self.stack.pop() else {
            return Err(PreprocessError::UnbalancedDirective { name, location });
        };
        let open = frame.directive.name();
        if open != kind {
            return Err(PreprocessError::MismatchedDirective {
                expected: open.as_str(),
                found: name,
                location,
            });
        }
        if frame.depth != marker.depth {
            return Err(PreprocessError::DepthMismatch {
                name: open.as_str(),
                expected: frame.depth,
                found: marker.depth,
                location,
            });
        }

        tracing::debug!(directive = open.as_str(), line = location.line, "Closed directive");
        let opened_at = self.location(frame.offset);
        match frame.directive {
            Directive::Link { href } => {
                let fragment = link_fragment(&self.ctx, &href, &opened_at)?;
                self.splicer.write_all(fragment.as_bytes())?;
                self.splicer.skip_to(marker.offset);
            }
            Directive::Index { pattern } => {
                let indent = line_prefix(self.source, marker.offset);
                write_toc(&mut self.splicer, &self.ctx, &pattern, &indent, &opened_at)?;
                self.splicer.skip_to(line_start(self.source, marker.offset));
            }
            Directive::Code {
                embedded: false, ..
            } => return Err(PreprocessError::MissingCodeBlock { location: opened_at }),
            Directive::Code { .. } => {}
        }
        self.splicer.copy_up_to(marker.end);

        Ok(())
    }

    /// Replace the body of the first code block after an open `code` directive.
    fn visit_code_block(&mut self, span: Range<usize>, fenced: bool) -> Result<(), PreprocessError> {
        let (src, opened_at) = match self.stack.last() {
            Some(Frame {
                directive:
                    Directive::Code {
                        src,
                        embedded: false,
                    },
                offset,
                ..
            }) => (src.clone(), self.location(*offset)),
            _ => return Ok(()),
        };

        let body = CodeBody::locate(self.source, span.clone(), fenced).ok_or_else(|| {
            PreprocessError::EmptyCodeBlock {
                location: self.location(span.start),
            }
        })?;

        self.splicer
            .copy_up_to_start(body.start, body.trim, body.end);
        embed_file(&mut self.splicer, &self.ctx, &src, &body.indent, &opened_at)?;

        if let Some(Frame {
            directive: Directive::Code { embedded, .. },
            ..
        }) = self.stack.last_mut()
        {
            *embedded = true;
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, PreprocessError> {
        if let Some(frame) = self.stack.last() {
            return Err(PreprocessError::UnclosedDirective {
                name: frame.directive.name().as_str(),
                location: self.location(frame.offset),
            });
        }
        Ok(self.splicer.finish())
    }
}

/// Content lines of a code block.
#[derive(Debug, PartialEq, Eq)]
struct CodeBody {
    /// Offset of the first content byte.
    start: usize,
    /// Indentation bytes before `start` on its line.
    trim: usize,
    /// Offset just past the last content line.
    end: usize,
    /// Indentation to repeat on each embedded line.
    indent: String,
}

impl CodeBody {
    /// Locate the content of the code block at `span`, `None` if it has none.
    fn locate(source: &str, span: Range<usize>, fenced: bool) -> Option<Self> {
        if fenced {
            Self::fenced(source, span)
        } else {
            Self::indented(source, span)
        }
    }

    /// Content between the opening fence line and the closing fence (if any).
    fn fenced(source: &str, span: Range<usize>) -> Option<Self> {
        let fence_pos = skip_blanks(source, span.start);
        let opening = &source[fence_pos..span.end];
        let start = fence_pos + opening.find('\n')? + 1;

        let fence_char = opening.chars().next()?;
        let fence_len = opening.chars().take_while(|&c| c == fence_char).count();

        let stop = block_end(source, span.end);
        let body = &source[start..stop];
        let last_line = body
            .trim_end_matches('\n')
            .rfind('\n')
            .map_or(start, |i| start + i + 1);
        let end = if is_closing_fence(&source[last_line..stop], fence_char, fence_len) {
            last_line
        } else {
            stop
        };

        (end > start).then(|| Self {
            start,
            trim: 0,
            end,
            indent: line_prefix(source, fence_pos),
        })
    }

    /// Lines of an indented block, without trailing blank lines.
    fn indented(source: &str, span: Range<usize>) -> Option<Self> {
        let mut start = span.start;
        let mut columns = indent_columns(&source[line_start(source, start)..start]);
        while columns < 4 {
            match source.as_bytes().get(start) {
                Some(b' ') => columns += 1,
                Some(b'\t') => columns += 4 - columns % 4,
                _ => break,
            }
            start += 1;
        }

        let content = source[start..span.end.max(start)].trim_end();
        if content.is_empty() {
            return None;
        }

        let line = line_start(source, start);
        Some(Self {
            start,
            trim: start - line,
            end: line_end(source, start + content.len()),
            indent: line_prefix(source, start),
        })
    }
}

/// Width of the whitespace run at the end of `prefix`, with tab stops of 4.
fn indent_columns(prefix: &str) -> usize {
    let run = prefix.len() - prefix.trim_end_matches([' ', '\t']).len();
    prefix[prefix.len() - run..].chars().fold(0, |columns, c| match c {
        '\t' => columns + 4 - columns % 4,
        _ => columns + 1,
    })
}

/// Whether `line` closes a fence opened with `len` repetitions of `fence`.
fn is_closing_fence(line: &str, fence: char, len: usize) -> bool {
    let line = line.trim_start_matches([' ', '\t', '>']).trim_end();
    line.len() >= len && line.chars().all(|c| c == fence)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    const HELLO_C: &str = "int main(void) {\n    return 0;\n}\n";

    /// Documents and sources on disk, laid out like a small docs tree.
    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let misc = dir.path().join("misc");
            std::fs::create_dir(&misc).unwrap();
            std::fs::write(misc.join("hello.c"), HELLO_C).unwrap();
            std::fs::write(misc.join("two.txt"), "first\r\nsecond").unwrap();
            std::fs::write(misc.join("foo.md"), "# Foo\n\nNo front matter.\n").unwrap();
            std::fs::write(
                misc.join("bar.md"),
                "---\ntitle: Bar ドキュメント\n---\n\nBody.\n",
            )
            .unwrap();
            Self { dir }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn config(&self) -> PreprocessorConfig {
            PreprocessorConfig::new().with_base_dir(self.path())
        }

        fn run(&self, config: PreprocessorConfig, input: &str) -> Result<Preprocessed, PreprocessError> {
            Preprocessor::with_config(config).process(input.as_bytes())
        }

        fn process(&self, input: &str) -> Result<Preprocessed, PreprocessError> {
            self.run(self.config(), input)
        }

        fn output(&self, input: &str) -> String {
            String::from_utf8(self.process(input).unwrap().output).unwrap()
        }

        fn error(&self, input: &str) -> PreprocessError {
            self.process(input).unwrap_err()
        }
    }

    fn doc(lines: &[&str]) -> String {
        lines.iter().map(|line| format!("{line}\n")).collect()
    }

    fn line_of(err: &PreprocessError) -> usize {
        err.location().expect("error has a location").line
    }

    #[test]
    fn test_config_builder() {
        let config = PreprocessorConfig::new()
            .with_base_dir("/docs")
            .with_source_path("/docs/index.md")
            .with_prefix("mdpp");

        assert_eq!(config.base_dir, PathBuf::from("/docs"));
        assert_eq!(config.source_path, Some(PathBuf::from("/docs/index.md")));
        assert_eq!(config.prefix, "mdpp");
    }

    #[test]
    fn test_document_without_directives_is_unchanged() {
        let fixture = Fixture::new();
        let input = doc(&[
            "---",
            "title: Plain",
            "---",
            "",
            "# Heading <!-- a comment -->",
            "",
            "<!-- block comment -->",
            "",
            "* item",
            "",
            "    indented code",
            "",
            "```",
            "<!-- code src=misc/hello.c -->",
            "```",
        ]);

        let result = fixture.process(&input).unwrap();

        assert_eq!(String::from_utf8(result.output).unwrap(), input);
        assert!(!result.found_directive);
        assert!(!result.changed);
    }

    #[test]
    fn test_input_without_trailing_newline_is_unchanged() {
        let fixture = Fixture::new();
        assert_eq!(fixture.output("text <b>bold</b>"), "text <b>bold</b>");
    }

    #[test]
    fn test_fenced_code_block() {
        let fixture = Fixture::new();
        let input = doc(&[
            "# Demo",
            "",
            "<!-- code src=misc/hello.c -->",
            "```c",
            "old content",
            "```",
            "<!-- /code -->",
            "",
            "Trailing text.",
        ]);

        let result = fixture.process(&input).unwrap();

        assert_eq!(
            String::from_utf8(result.output).unwrap(),
            doc(&[
                "# Demo",
                "",
                "<!-- code src=misc/hello.c -->",
                "```c",
                "int main(void) {",
                "    return 0;",
                "}",
                "```",
                "<!-- /code -->",
                "",
                "Trailing text.",
            ])
        );
        assert!(result.found_directive);
        assert!(result.changed);
    }

    #[test]
    fn test_fenced_code_block_in_list_item() {
        let fixture = Fixture::new();
        let input = doc(&[
            "* Build it:",
            "",
            "  <!-- code src=misc/two.txt -->",
            "  ~~~~",
            "      stale",
            "  ~~~~",
            "  <!-- /code -->",
        ]);

        assert_eq!(
            fixture.output(&input),
            doc(&[
                "* Build it:",
                "",
                "  <!-- code src=misc/two.txt -->",
                "  ~~~~",
                "  first",
                "  second",
                "  ~~~~",
                "  <!-- /code -->",
            ])
        );
    }

    #[test]
    fn test_indented_code_block() {
        let fixture = Fixture::new();
        let input = doc(&[
            "<!-- code src=misc/two.txt -->",
            "",
            "    old",
            "",
            "<!-- /code -->",
        ]);

        assert_eq!(
            fixture.output(&input),
            doc(&[
                "<!-- code src=misc/two.txt -->",
                "",
                "    first",
                "    second",
                "",
                "<!-- /code -->",
            ])
        );
    }

    #[test]
    fn test_indented_code_block_in_list_item() {
        let fixture = Fixture::new();
        let input = doc(&[
            "1. Step one",
            "",
            "   <!-- code src=misc/hello.c -->",
            "",
            "       old line",
            "   <!-- /code -->",
            "",
            "2. Step two",
        ]);

        assert_eq!(
            fixture.output(&input),
            doc(&[
                "1. Step one",
                "",
                "   <!-- code src=misc/hello.c -->",
                "",
                "       int main(void) {",
                "           return 0;",
                "       }",
                "   <!-- /code -->",
                "",
                "2. Step two",
            ])
        );
    }

    #[test]
    fn test_only_first_code_block_is_replaced() {
        let fixture = Fixture::new();
        let input = doc(&[
            "<!-- code src=misc/two.txt -->",
            "```",
            "one",
            "```",
            "",
            "```",
            "two",
            "```",
            "<!-- /code -->",
        ]);

        assert_eq!(
            fixture.output(&input),
            doc(&[
                "<!-- code src=misc/two.txt -->",
                "```",
                "first",
                "second",
                "```",
                "",
                "```",
                "two",
                "```",
                "<!-- /code -->",
            ])
        );
    }

    #[test]
    fn test_index_top_level() {
        let fixture = Fixture::new();
        let input = doc(&[
            "# Contents",
            "",
            "<!-- index pattern=misc/*.md -->",
            "* stale entry",
            "<!-- /index -->",
            "",
            "After.",
        ]);

        assert_eq!(
            fixture.output(&input),
            doc(&[
                "# Contents",
                "",
                "<!-- index pattern=misc/*.md -->",
                "* [Bar ドキュメント](misc/bar.md)",
                "* [misc/foo.md](misc/foo.md)",
                "<!-- /index -->",
                "",
                "After.",
            ])
        );
    }

    #[test]
    fn test_toc_alias_nested_in_list_item() {
        let fixture = Fixture::new();
        let input = doc(&[
            "* Top",
            "  <!-- toc pattern=misc/*.md -->",
            "  <!-- /toc -->",
            "* Next",
        ]);

        assert_eq!(
            fixture.output(&input),
            doc(&[
                "* Top",
                "  <!-- toc pattern=misc/*.md -->",
                "  * [Bar ドキュメント](misc/bar.md)",
                "  * [misc/foo.md](misc/foo.md)",
                "  <!-- /toc -->",
                "* Next",
            ])
        );
    }

    #[test]
    fn test_index_in_block_quote() {
        let fixture = Fixture::new();
        let input = doc(&[
            "> <!-- index pattern=misc/foo.md -->",
            "> <!-- /index -->",
        ]);

        assert_eq!(
            fixture.output(&input),
            doc(&[
                "> <!-- index pattern=misc/foo.md -->",
                "> * [misc/foo.md](misc/foo.md)",
                "> <!-- /index -->",
            ])
        );
    }

    #[test]
    fn test_index_skips_own_document() {
        let fixture = Fixture::new();
        let config = fixture
            .config()
            .with_source_path(fixture.path().join("misc/bar.md"));
        let input = doc(&["<!-- index pattern=misc/*.md -->", "<!-- /index -->"]);

        let result = fixture.run(config, &input).unwrap();

        assert_eq!(
            String::from_utf8(result.output).unwrap(),
            doc(&[
                "<!-- index pattern=misc/*.md -->",
                "* Bar ドキュメント",
                "* [misc/foo.md](misc/foo.md)",
                "<!-- /index -->",
            ])
        );
    }

    #[test]
    fn test_index_without_matches() {
        let fixture = Fixture::new();
        let input = doc(&["<!-- index pattern=none/*.md -->", "* old", "<!-- /index -->"]);

        assert_eq!(
            fixture.output(&input),
            doc(&["<!-- index pattern=none/*.md -->", "<!-- /index -->"])
        );
    }

    #[test]
    fn test_link() {
        let fixture = Fixture::new();
        let input = doc(&[
            "See <!-- link href=misc/bar.md -->whatever was here<!-- /link --> for details.",
        ]);

        assert_eq!(
            fixture.output(&input),
            doc(&[
                "See <!-- link href=misc/bar.md -->[Bar ドキュメント](misc/bar.md)<!-- /link --> for details.",
            ])
        );
    }

    #[test]
    fn test_link_without_title_and_other_comments() {
        let fixture = Fixture::new();
        let input = doc(&[
            "A <!-- x --> and <!-- link href=misc/foo.md --><!-- /link --> <!-- y -->.",
        ]);

        assert_eq!(
            fixture.output(&input),
            doc(&[
                "A <!-- x --> and <!-- link href=misc/foo.md -->[misc/foo.md](misc/foo.md)<!-- /link --> <!-- y -->.",
            ])
        );
    }

    #[test]
    fn test_output_is_idempotent() {
        let fixture = Fixture::new();
        let input = doc(&[
            "* Intro <!-- link href=misc/bar.md -->x<!-- /link -->",
            "",
            "  <!-- code src=misc/hello.c -->",
            "  ```c",
            "  placeholder",
            "  ```",
            "  <!-- /code -->",
            "",
            "<!-- index pattern=misc/*.md -->",
            "<!-- /index -->",
        ]);

        let first = fixture.process(&input).unwrap();
        assert!(first.changed);

        let second = Preprocessor::with_config(fixture.config())
            .process(&first.output)
            .unwrap();
        assert!(second.found_directive);
        assert!(!second.changed);
        assert_eq!(second.output, first.output);
    }

    #[test]
    fn test_prefixed_directives() {
        let fixture = Fixture::new();
        let config = fixture.config().with_prefix("mdpp");
        let input = doc(&[
            "<!-- code src=ignored.c -->",
            "",
            "<!-- mdppindex pattern=misc/foo.md -->",
            "<!-- /mdppindex -->",
        ]);

        let result = fixture.run(config, &input).unwrap();

        assert_eq!(
            String::from_utf8(result.output).unwrap(),
            doc(&[
                "<!-- code src=ignored.c -->",
                "",
                "<!-- mdppindex pattern=misc/foo.md -->",
                "* [misc/foo.md](misc/foo.md)",
                "<!-- /mdppindex -->",
            ])
        );
    }

    #[test]
    fn test_process_reader() {
        let fixture = Fixture::new();
        let input = doc(&["<!-- index pattern=misc/foo.md -->", "<!-- /index -->"]);
        let mut output = Vec::new();

        let result = Preprocessor::with_config(fixture.config())
            .process_reader(input.as_bytes(), &mut output)
            .unwrap();

        assert_eq!(output, result.output);
        assert!(result.changed);
    }

    #[test]
    fn test_process_reader_writes_nothing_on_error() {
        let fixture = Fixture::new();
        let mut output = Vec::new();

        let result = Preprocessor::with_config(fixture.config())
            .process_reader("<!-- /code -->\n".as_bytes(), &mut output);

        assert!(result.is_err());
        assert!(output.is_empty());
    }

    #[test]
    fn test_invalid_utf8() {
        let err = Preprocessor::new().process(b"\xff\xfe").unwrap_err();
        assert!(matches!(err, PreprocessError::InvalidUtf8(_)));
    }

    #[test]
    fn test_unknown_directive() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&["Intro.", "", "<!-- foo src=x -->", "<!-- /foo -->"]));

        assert!(matches!(err, PreprocessError::MalformedDirective { .. }));
        assert_eq!(line_of(&err), 3);
    }

    #[test]
    fn test_known_directive_grammar_mismatch() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&[
            "Intro.",
            "",
            "<!-- code src=misc/two.txt extra -->",
            "```",
            "old",
            "```",
            "<!-- /code -->",
        ]));

        assert!(matches!(err, PreprocessError::MalformedDirective { .. }));
        assert_eq!(line_of(&err), 3);
    }

    #[test]
    fn test_close_marker_grammar_mismatch() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&[
            "<!-- index pattern=misc/*.md -->",
            "<!-- /index  -->",
        ]));

        assert!(matches!(err, PreprocessError::MalformedDirective { .. }));
        assert_eq!(line_of(&err), 2);
    }

    #[test]
    fn test_directive_inside_index_body() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&[
            "<!-- index pattern=misc/*.md -->",
            "See <!-- link href=misc/foo.md -->x<!-- /link -->",
            "<!-- /index -->",
        ]));

        match &err {
            PreprocessError::MalformedDirective { message, location } => {
                assert!(message.contains("inside an `index` body"), "{message}");
                assert_eq!(location.line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_prefixed_grammar_mismatch() {
        let fixture = Fixture::new();
        let config = fixture.config().with_prefix("mdpp");

        let err = fixture
            .run(config, &doc(&["<!-- mdppcode src=a b -->"]))
            .unwrap_err();

        assert!(matches!(err, PreprocessError::MalformedDirective { .. }));
    }

    #[test]
    fn test_block_directive_used_inline() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&["Text <!-- index pattern=*.md --> more."]));

        assert_eq!(
            err.to_string(),
            "malformed directive: directive `index` must appear on a line of its own (line 1)"
        );
    }

    #[test]
    fn test_missing_required_attribute() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&["", "<!-- code -->"]));

        assert!(matches!(
            err,
            PreprocessError::MissingRequiredAttribute {
                directive: "code",
                attribute: "src",
                ..
            }
        ));
        assert_eq!(line_of(&err), 2);
    }

    #[test]
    fn test_wrong_attribute_key() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&["A <!-- link title=x -->b<!-- /link -->"]));

        assert!(matches!(
            err,
            PreprocessError::MissingRequiredAttribute {
                attribute: "href",
                ..
            }
        ));
    }

    #[test]
    fn test_unbalanced_close() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&["# Title", "", "<!-- /code -->"]));

        assert!(matches!(err, PreprocessError::UnbalancedDirective { .. }));
        assert_eq!(line_of(&err), 3);
    }

    #[test]
    fn test_mismatched_close() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&["<!-- index pattern=*.md -->", "<!-- /code -->"]));

        match err {
            PreprocessError::MismatchedDirective {
                expected,
                found,
                location,
            } => {
                assert_eq!(expected, "index");
                assert_eq!(found, "code");
                assert_eq!(location.line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_depth_mismatch() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&[
            "* item",
            "",
            "  <!-- index pattern=misc/*.md -->",
            "",
            "<!-- /index -->",
        ]));

        assert!(matches!(err, PreprocessError::DepthMismatch { .. }));
        assert_eq!(line_of(&err), 5);
    }

    #[test]
    fn test_unclosed_directive() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&[
            "<!-- code src=misc/hello.c -->",
            "```c",
            "old",
            "```",
        ]));

        assert!(matches!(
            err,
            PreprocessError::UnclosedDirective { name: "code", .. }
        ));
        assert_eq!(line_of(&err), 1);
    }

    #[test]
    fn test_unclosed_reports_innermost() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&[
            "<!-- index pattern=*.md -->",
            "",
            "Some <!-- link href=misc/foo.md -->text",
        ]));

        assert!(matches!(
            err,
            PreprocessError::UnclosedDirective { name: "link", .. }
        ));
        assert_eq!(line_of(&err), 3);
    }

    #[test]
    fn test_empty_code_block() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&[
            "<!-- code src=misc/hello.c -->",
            "```",
            "```",
            "<!-- /code -->",
        ]));

        assert!(matches!(err, PreprocessError::EmptyCodeBlock { .. }));
        assert_eq!(line_of(&err), 2);
    }

    #[test]
    fn test_code_closed_without_block() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&["<!-- code src=misc/hello.c -->", "<!-- /code -->"]));

        assert!(matches!(err, PreprocessError::MissingCodeBlock { .. }));
        assert_eq!(line_of(&err), 1);
    }

    #[test]
    fn test_code_file_not_found() {
        let fixture = Fixture::new();
        let config = fixture
            .config()
            .with_source_path(fixture.path().join("guide.md"));
        let input = doc(&["", "<!-- code src=missing.c -->", "```", "x", "```", "<!-- /code -->"]);

        let err = fixture.run(config, &input).unwrap_err();

        match &err {
            PreprocessError::ReferencedFileNotFound { path, location } => {
                assert_eq!(path, &fixture.path().join("missing.c"));
                assert_eq!(location.line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(
            err.to_string()
                .ends_with(&format!("({}:2)", fixture.path().join("guide.md").display()))
        );
    }

    #[test]
    fn test_link_target_not_found() {
        let fixture = Fixture::new();
        let err = fixture.error(&doc(&["<!-- link href=nope.md -->x<!-- /link --> text"]));

        // A comment opening a line starts an HTML block, so this link is
        // not inline.
        assert!(matches!(err, PreprocessError::MalformedDirective { .. }));

        let err = fixture.error(&doc(&["Go <!-- link href=nope.md -->x<!-- /link -->"]));
        assert!(matches!(err, PreprocessError::ReferencedFileNotFound { .. }));
    }

    #[test]
    fn test_closing_fence_detection() {
        assert!(is_closing_fence("```\n", '`', 3));
        assert!(is_closing_fence("  > ````  \n", '`', 3));
        assert!(!is_closing_fence("``\n", '`', 3));
        assert!(!is_closing_fence("```c\n", '`', 3));
        assert!(!is_closing_fence("~~~\n", '`', 3));
    }

    #[test]
    fn test_indent_columns() {
        assert_eq!(indent_columns(""), 0);
        assert_eq!(indent_columns("    "), 4);
        assert_eq!(indent_columns("* \t"), 4);
        assert_eq!(indent_columns(">  "), 2);
    }
}
