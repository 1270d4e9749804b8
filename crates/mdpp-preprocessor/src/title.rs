//! Document title extraction.
//!
//! Recognizes three header conventions at the top of a markdown file:
//!
//! - YAML metadata block: `---` followed by `title: ...` lines, closed by `---`
//! - Pandoc title block: `% Title`, continued by lines starting with a space
//! - MultiMarkdown header: `Title: ...` key/value lines before the body
//!
//! The first non-blank line decides the convention. Extraction never fails:
//! anything unexpected yields the caller's default title.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Header convention detected from the first non-blank line of a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum TitleStyle {
    /// No convention recognized yet.
    #[default]
    Unknown,
    /// `---` delimited YAML front matter.
    YamlMetadataBlock,
    /// `%` prefixed Pandoc title block.
    PandocTitleBlock,
    /// `Key: value` MultiMarkdown metadata header.
    MultiMarkdownHeader,
}

impl TitleStyle {
    /// Classify a trimmed, non-blank line.
    fn classify(line: &str) -> Self {
        if line == "---" {
            Self::YamlMetadataBlock
        } else if line.starts_with('%') {
            Self::PandocTitleBlock
        } else if line.contains(':') {
            Self::MultiMarkdownHeader
        } else {
            Self::Unknown
        }
    }
}

/// Extract a document title from `reader`, falling back to `default`.
///
/// # Example
///
/// ```
/// use mdpp_preprocessor::extract_title;
///
/// let doc = "---\ntitle: \"My Title\"\n---\n\nBody.\n";
/// assert_eq!(extract_title(doc.as_bytes(), "fallback"), "My Title");
/// assert_eq!(extract_title("Just text.\n".as_bytes(), "fallback"), "fallback");
/// ```
pub fn extract_title<R: BufRead>(reader: R, default: &str) -> String {
    find_title(reader)
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// Open `path` and extract its title, falling back to `default`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn title_of_file(path: &Path, default: &str) -> io::Result<String> {
    let file = File::open(path)?;
    Ok(extract_title(BufReader::new(file), default))
}

fn find_title<R: BufRead>(reader: R) -> Option<String> {
    let mut lines = reader.lines().map_while(Result::ok);
    let mut style = TitleStyle::Unknown;

    while let Some(raw) = lines.next() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if style == TitleStyle::Unknown {
            style = TitleStyle::classify(line);
            // The opening `---` carries no data; unclassified lines are skipped.
            if matches!(style, TitleStyle::Unknown | TitleStyle::YamlMetadataBlock) {
                continue;
            }
        }

        match style {
            TitleStyle::PandocTitleBlock => return Some(pandoc_title(line, &mut lines)),
            TitleStyle::YamlMetadataBlock if line == "---" => return None,
            TitleStyle::MultiMarkdownHeader if !line.contains(':') => return None,
            _ => {
                if let Some(title) = title_field(line) {
                    return Some(title);
                }
            }
        }
    }

    None
}

/// Title from a Pandoc block, appending continuation lines verbatim.
fn pandoc_title(first: &str, rest: &mut impl Iterator<Item = String>) -> String {
    let mut title = first
        .trim_start_matches(|c: char| c == '%' || c.is_whitespace())
        .to_owned();
    for line in rest {
        if !line.starts_with(' ') {
            break;
        }
        title.push_str(&line);
    }
    title
}

/// Value of a `title: value` line, with quotes and whitespace trimmed.
fn title_field(line: &str) -> Option<String> {
    let (key, value) = line.split_once(':')?;
    if !key.trim().eq_ignore_ascii_case("title") {
        return None;
    }
    Some(
        value
            .trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace())
            .to_owned(),
    )
}
