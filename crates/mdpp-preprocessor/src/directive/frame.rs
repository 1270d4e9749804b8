//! Directive vocabulary and nesting stack entries.

use crate::error::{Location, PreprocessError};

use super::parser::Attribute;

/// The closed set of directive kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DirectiveName {
    /// Embed a file into the following code block.
    Code,
    /// Bullet list of files matching a glob (`index` or `toc`).
    Index,
    /// Link whose text is the target document's title.
    Link,
}

/// Where a directive's markers may appear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Surface {
    /// Inside a run of inline text.
    Inline,
    /// On a line of its own.
    Block,
}

impl DirectiveName {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        match name {
            "code" => Some(Self::Code),
            "index" | "toc" => Some(Self::Index),
            "link" => Some(Self::Link),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Index => "index",
            Self::Link => "link",
        }
    }

    /// Key of the mandatory attribute.
    pub(crate) fn attribute(self) -> &'static str {
        match self {
            Self::Code => "src",
            Self::Index => "pattern",
            Self::Link => "href",
        }
    }

    pub(crate) fn surface(self) -> Surface {
        match self {
            Self::Link => Surface::Inline,
            Self::Code | Self::Index => Surface::Block,
        }
    }
}

impl Surface {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Inline => "inside a paragraph",
            Self::Block => "on a line of its own",
        }
    }
}

/// Payload of an open directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Directive {
    Link { href: String },
    Code { src: String, embedded: bool },
    Index { pattern: String },
}

impl Directive {
    /// Build the payload of an opening marker, checking its attribute.
    pub(crate) fn from_open(
        name: DirectiveName,
        attribute: Option<Attribute>,
        location: Location,
    ) -> Result<Self, PreprocessError> {
        let value = match attribute {
            Some(Attribute { key, value }) if key == name.attribute() => value,
            _ => {
                return Err(PreprocessError::MissingRequiredAttribute {
                    directive: name.as_str(),
                    attribute: name.attribute(),
                    location,
                });
            }
        };

        Ok(match name {
            DirectiveName::Code => Self::Code {
                src: value,
                embedded: false,
            },
            DirectiveName::Index => Self::Index { pattern: value },
            DirectiveName::Link => Self::Link { href: value },
        })
    }

    pub(crate) fn name(&self) -> DirectiveName {
        match self {
            Self::Link { .. } => DirectiveName::Link,
            Self::Code { .. } => DirectiveName::Code,
            Self::Index { .. } => DirectiveName::Index,
        }
    }
}

/// An open directive on the nesting stack.
#[derive(Clone, Debug)]
pub(crate) struct Frame {
    pub directive: Directive,
    /// Tree depth of the opening marker.
    pub depth: usize,
    /// Byte offset of the opening marker.
    pub offset: usize,
}
