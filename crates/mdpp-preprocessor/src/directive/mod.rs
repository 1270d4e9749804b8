//! Directive engine for HTML comment directives.
//!
//! Directives are paired comment markers around the content they generate:
//!
//! ````markdown
//! <!-- code src=snippets/hello.c -->
//! ```c
//! (replaced by the contents of hello.c)
//! ```
//! <!-- /code -->
//!
//! <!-- index pattern=guides/*.md -->
//! (replaced by a bullet list of titled links)
//! <!-- /index -->
//!
//! See <!-- link href=guides/setup.md -->(replaced by [title](href))<!-- /link -->.
//! ````
//!
//! # Architecture
//!
//! 1. **Recognition** (`parser`): per-run compiled regexes classify each HTML
//!    comment as an open marker, a close marker, or an ordinary comment.
//! 2. **Nesting** (`processor`): a stack of open frames, each tagged with the
//!    tree depth of its opening marker, enforces balanced markers.
//! 3. **Splicing** (`output`): a cursor copies untouched source verbatim while
//!    generators (`embed`, `toc`, `link`) write replacement text in place of
//!    the directive bodies.

mod context;
mod embed;
mod frame;
mod link;
mod output;
mod parser;
mod processor;
mod toc;

pub(crate) use context::DirectiveContext;
pub use processor::{Preprocessed, Preprocessor, PreprocessorConfig};
