//! Preprocessing error types.
//!
//! Every directive error carries a [`Location`] pointing at the line of the
//! marker (or code block) that caused it. Errors are terminal for the current
//! document: the preprocessor never returns partial output.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Position of a failure inside the document being preprocessed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// Path of the document, if it came from a file.
    pub path: Option<PathBuf>,
    /// Line number (1-indexed).
    pub line: usize,
}

impl Location {
    /// Build a location from a byte offset into `source`.
    pub(crate) fn at(source: &str, offset: usize, path: Option<&Path>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
            line: line_number(source, offset),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}:{}", path.display(), self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// 1-based line number of `offset`, counting newlines before it.
pub(crate) fn line_number(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Error raised while preprocessing a document.
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    /// Marker text does not match the directive grammar or names an unknown command.
    #[error("malformed directive: {message} ({location})")]
    MalformedDirective {
        /// What was wrong with the marker.
        message: String,
        /// Where the marker starts.
        location: Location,
    },

    /// An opening marker lacks its mandatory attribute.
    #[error("directive `{directive}` requires attribute `{attribute}` ({location})")]
    MissingRequiredAttribute {
        /// Directive name.
        directive: &'static str,
        /// Expected attribute key.
        attribute: &'static str,
        /// Where the marker starts.
        location: Location,
    },

    /// A closing marker was found while no directive was open.
    #[error("closing directive `{name}` has no matching open directive ({location})")]
    UnbalancedDirective {
        /// Name used by the closing marker.
        name: String,
        /// Where the closing marker starts.
        location: Location,
    },

    /// A closing marker names a different directive than the innermost open one.
    #[error("closing directive `{found}` does not match open directive `{expected}` ({location})")]
    MismatchedDirective {
        /// Name of the innermost open directive.
        expected: &'static str,
        /// Name used by the closing marker.
        found: String,
        /// Where the closing marker starts.
        location: Location,
    },

    /// A closing marker sits at a different document tree depth than its opener.
    #[error(
        "closing directive `{name}` is at tree depth {found} but was opened at depth {expected} ({location})"
    )]
    DepthMismatch {
        /// Directive name.
        name: &'static str,
        /// Depth of the opening marker.
        expected: usize,
        /// Depth of the closing marker.
        found: usize,
        /// Where the closing marker starts.
        location: Location,
    },

    /// The document ended while a directive was still open.
    #[error("directive `{name}` is never closed ({location})")]
    UnclosedDirective {
        /// Directive name.
        name: &'static str,
        /// Where the opening marker starts.
        location: Location,
    },

    /// The code block following a `code` directive has no content lines.
    #[error("code block has no content lines ({location})")]
    EmptyCodeBlock {
        /// Where the code block starts.
        location: Location,
    },

    /// A `code` directive was closed before any code block followed it.
    #[error("directive `code` was closed without a code block to replace ({location})")]
    MissingCodeBlock {
        /// Where the opening marker starts.
        location: Location,
    },

    /// A file referenced by a directive does not exist.
    #[error("referenced file not found: {} ({location})", .path.display())]
    ReferencedFileNotFound {
        /// Resolved path of the referenced file.
        path: PathBuf,
        /// Where the directive starts.
        location: Location,
    },

    /// A file referenced by a directive exists but could not be read.
    #[error("failed to read referenced file {}: {source} ({location})", .path.display())]
    ReferencedFileUnreadable {
        /// Resolved path of the referenced file.
        path: PathBuf,
        /// Where the directive starts.
        location: Location,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The directive recognizers could not be compiled.
    #[error("invalid directive grammar: {0}")]
    Grammar(#[from] regex::Error),

    /// The input document is not valid UTF-8.
    #[error("input is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Reading the input or writing the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PreprocessError {
    /// Classify a failed access to a referenced file.
    pub(crate) fn referenced(path: PathBuf, err: io::Error, location: Location) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::ReferencedFileNotFound { path, location }
        } else {
            Self::ReferencedFileUnreadable {
                path,
                location,
                source: err,
            }
        }
    }

    /// Location of the failure, if it is tied to a place in the document.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::MalformedDirective { location, .. }
            | Self::MissingRequiredAttribute { location, .. }
            | Self::UnbalancedDirective { location, .. }
            | Self::MismatchedDirective { location, .. }
            | Self::DepthMismatch { location, .. }
            | Self::UnclosedDirective { location, .. }
            | Self::EmptyCodeBlock { location }
            | Self::MissingCodeBlock { location }
            | Self::ReferencedFileNotFound { location, .. }
            | Self::ReferencedFileUnreadable { location, .. } => Some(location),
            Self::Grammar(_) | Self::InvalidUtf8(_) | Self::Io(_) => None,
        }
    }
}
