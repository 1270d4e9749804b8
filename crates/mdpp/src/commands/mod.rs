//! CLI command implementations.

pub(crate) mod process;
pub(crate) mod title;

pub(crate) use process::ProcessArgs;
pub(crate) use title::TitleArgs;
