//! Markdown directive preprocessor.
//!
//! Rewrites a markdown document in place of its directive comments, keeping
//! every other byte identical:
//!
//! - `code`: embeds a source file into the code block that follows
//! - `index` / `toc`: lists the documents matching a glob, by title
//! - `link`: renders a link whose text is the target document's title
//!
//! Titles come from [`extract_title`], which understands YAML metadata
//! blocks, Pandoc title blocks and MultiMarkdown headers.
//!
//! # Example
//!
//! ```no_run
//! use mdpp_preprocessor::{Preprocessor, PreprocessorConfig};
//!
//! let config = PreprocessorConfig::new()
//!     .with_base_dir("docs")
//!     .with_source_path("docs/index.md");
//! let input = std::fs::read("docs/index.md").unwrap();
//!
//! let result = Preprocessor::with_config(config).process(&input).unwrap();
//! if result.changed {
//!     std::fs::write("docs/index.md", &result.output).unwrap();
//! }
//! ```

mod directive;
mod error;
mod title;
mod walk;

pub use directive::{Preprocessed, Preprocessor, PreprocessorConfig};
pub use error::{Location, PreprocessError};
pub use title::{extract_title, title_of_file};
