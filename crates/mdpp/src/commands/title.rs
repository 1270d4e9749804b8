//! `mdpp title` command implementation.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Args;
use mdpp_preprocessor::title_of_file;

use crate::error::CliError;

/// Arguments for the title command.
#[derive(Args)]
pub(crate) struct TitleArgs {
    /// Markdown files to read titles from.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl TitleArgs {
    /// Execute the title command.
    ///
    /// Prints one title per file, falling back to the path when the file
    /// declares none.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be opened.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let mut stdout = BufWriter::new(io::stdout().lock());
        for line in titles(&self.files)? {
            writeln!(stdout, "{line}")?;
        }
        stdout.flush()?;
        Ok(())
    }
}

fn titles(files: &[PathBuf]) -> Result<Vec<String>, CliError> {
    files
        .iter()
        .map(|path| {
            let default = path.display().to_string();
            title_of_file(path, &default).map_err(CliError::file(path))
        })
        .collect()
}
