//! Directive marker recognition.
//!
//! Markers are HTML comments:
//!
//! - open: `<!-- PREFIXname -->` or `<!-- PREFIXname key=value -->`
//! - close: `<!-- /PREFIXname -->`
//!
//! Attribute values run up to the next space; quoting is not supported.

use regex::Regex;

use super::frame::DirectiveName;

/// The single `key=value` attribute of an opening marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Attribute {
    pub key: String,
    pub value: String,
}

/// A marker that matched the grammar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ParsedMarker {
    /// `<!-- name key=value -->`
    Open {
        /// Directive name with the prefix removed.
        name: String,
        attribute: Option<Attribute>,
    },
    /// `<!-- /name -->`
    Close {
        /// Directive name with the prefix removed.
        name: String,
    },
}

/// Outcome of matching a comment against the grammar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Recognized {
    /// Ordinary comment, passed through untouched.
    NotDirective,
    Marker(ParsedMarker),
    /// Claims the directive prefix but does not match the grammar.
    Malformed,
}

/// Compiled open/close recognizers for one directive prefix.
#[derive(Debug)]
pub(crate) struct DirectiveGrammar {
    prefix: String,
    open: Regex,
    close: Regex,
}

impl DirectiveGrammar {
    /// Compile the recognizers for `prefix` (may be empty).
    pub(crate) fn new(prefix: &str) -> Result<Self, regex::Error> {
        let escaped = regex::escape(prefix);
        // Without a prefix the name itself must be non-empty.
        let name = if prefix.is_empty() {
            "[_a-zA-Z0-9]+"
        } else {
            "[_a-zA-Z0-9]*"
        };
        let open = Regex::new(&format!(
            r"^<!-- *({escaped}{name})(?: ([_a-zA-Z][_a-zA-Z0-9]*)=([^ ]*))? *-->"
        ))?;
        let close = Regex::new(&format!(r"^<!-- /({escaped}{name}) -->"))?;

        Ok(Self {
            prefix: prefix.to_owned(),
            open,
            close,
        })
    }

    /// Classify the text of a comment.
    ///
    /// With a non-empty prefix every comment starting with `<!-- PREFIX` or
    /// `<!-- /PREFIX` is claimed. With the empty prefix a comment is claimed
    /// when it matches the grammar and looks like a directive (a close
    /// marker, an attribute, or a known name), or when it starts with a
    /// known name but does not match the grammar.
    pub(crate) fn recognize(&self, text: &str) -> Recognized {
        let text = text.trim();
        if self.prefix.is_empty() {
            self.recognize_unprefixed(text)
        } else {
            self.recognize_prefixed(text)
        }
    }

    fn recognize_prefixed(&self, text: &str) -> Recognized {
        let Some(rest) = text.strip_prefix("<!-- ") else {
            return Recognized::NotDirective;
        };

        if rest.starts_with(&self.prefix) {
            self.match_open(text)
                .map_or(Recognized::Malformed, Recognized::Marker)
        } else if rest
            .strip_prefix('/')
            .is_some_and(|name| name.starts_with(&self.prefix))
        {
            self.match_close(text)
                .map_or(Recognized::Malformed, Recognized::Marker)
        } else {
            Recognized::NotDirective
        }
    }

    fn recognize_unprefixed(&self, text: &str) -> Recognized {
        if let Some(marker) = self.match_close(text) {
            return Recognized::Marker(marker);
        }

        match self.match_open(text) {
            Some(marker @ ParsedMarker::Open { attribute: Some(_), .. }) => {
                Recognized::Marker(marker)
            }
            Some(ParsedMarker::Open { name, attribute: None })
                if DirectiveName::parse(&name).is_some() =>
            {
                Recognized::Marker(ParsedMarker::Open {
                    name,
                    attribute: None,
                })
            }
            Some(_) => Recognized::NotDirective,
            None if names_known_directive(text) => Recognized::Malformed,
            None => Recognized::NotDirective,
        }
    }

    fn match_open(&self, text: &str) -> Option<ParsedMarker> {
        let caps = self.open.captures(text)?;
        let name = self.strip_prefix(&caps[1]);
        let attribute = caps.get(2).map(|key| Attribute {
            key: key.as_str().to_owned(),
            value: caps.get(3).map_or("", |v| v.as_str()).to_owned(),
        });
        Some(ParsedMarker::Open { name, attribute })
    }

    fn match_close(&self, text: &str) -> Option<ParsedMarker> {
        let caps = self.close.captures(text)?;
        Some(ParsedMarker::Close {
            name: self.strip_prefix(&caps[1]),
        })
    }

    fn strip_prefix(&self, command: &str) -> String {
        command
            .strip_prefix(self.prefix.as_str())
            .unwrap_or(command)
            .to_owned()
    }
}

/// Whether the comment starts with a known directive name, as in
/// `<!-- code src=a b -->` or `<!-- /index  -->`.
fn names_known_directive(text: &str) -> bool {
    let Some(rest) = text.strip_prefix("<!--") else {
        return false;
    };
    let rest = rest.trim_start_matches(' ');
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let (name, after) = rest.split_at(len);
    DirectiveName::parse(name).is_some() && (after.starts_with(' ') || after.starts_with("-->"))
}
