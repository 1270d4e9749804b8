//! `mdpp process` command implementation.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use mdpp_config::{CliSettings, Config};
use mdpp_preprocessor::{Preprocessed, Preprocessor, PreprocessorConfig};
use tempfile::NamedTempFile;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the process command.
#[derive(Args)]
pub(crate) struct ProcessArgs {
    /// Markdown files to process (default: standard input; `-` also reads it).
    files: Vec<PathBuf>,

    /// Write output to FILE instead of standard output.
    #[arg(short, long, value_name = "FILE", conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Rewrite each file in place (only files whose content changes).
    #[arg(short, long)]
    in_place: bool,

    /// Directive name prefix (overrides config).
    #[arg(long)]
    prefix: Option<String>,

    /// Path to configuration file (default: auto-discover mdpp.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output (show directive debug logs).
    #[arg(short, long)]
    pub verbose: bool,
}

/// A document to read.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    /// Inputs named on the command line; none means standard input.
    fn from_args(files: &[PathBuf]) -> Vec<Self> {
        if files.is_empty() {
            return vec![Self::Stdin];
        }
        files
            .iter()
            .map(|path| {
                if path.as_os_str() == "-" {
                    Self::Stdin
                } else {
                    Self::File(path.clone())
                }
            })
            .collect()
    }

    /// Preprocessor resolving references relative to this input.
    fn preprocessor(&self, prefix: &str) -> Preprocessor {
        let config = PreprocessorConfig::new().with_prefix(prefix);
        let config = match self {
            Self::Stdin => config,
            Self::File(path) => config
                .with_base_dir(path.parent().unwrap_or(Path::new("")))
                .with_source_path(path),
        };
        Preprocessor::with_config(config)
    }
}

impl ProcessArgs {
    /// Execute the process command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, a file cannot be read or
    /// written, or a document contains an invalid directive.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            prefix: self.prefix.clone(),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::debug!(path = %path.display(), "Loaded configuration");
        }
        let prefix = config.directives.prefix.as_str();
        let inputs = Input::from_args(&self.files);

        if self.in_place {
            self.rewrite_all(&inputs, prefix)
        } else {
            self.write_output(&inputs, prefix)
        }
    }

    /// Rewrite every input file in place.
    fn rewrite_all(&self, inputs: &[Input], prefix: &str) -> Result<(), CliError> {
        let output = Output::new();
        for input in inputs {
            let Input::File(path) = input else {
                return Err(CliError::Validation(
                    "--in-place requires file arguments, not standard input".to_owned(),
                ));
            };
            let result = rewrite_in_place(path, &input.preprocessor(prefix))?;
            if result.changed {
                output.success(&format!("Updated {}", path.display()));
            } else if self.verbose {
                output.info(&format!("Unchanged {}", path.display()));
            }
        }
        Ok(())
    }

    /// Preprocess every input and write the concatenated output.
    ///
    /// All documents are processed before anything is written, so a failure
    /// leaves the destination untouched.
    fn write_output(&self, inputs: &[Input], prefix: &str) -> Result<(), CliError> {
        let mut buffer = Vec::new();
        for input in inputs {
            let preprocessor = input.preprocessor(prefix);
            let result = match input {
                Input::Stdin => preprocessor.process_reader(io::stdin().lock(), &mut buffer)?,
                Input::File(path) => {
                    let file = File::open(path).map_err(CliError::file(path))?;
                    preprocessor.process_reader(file, &mut buffer)?
                }
            };
            if !result.found_directive {
                tracing::debug!(?input, "No directives found");
            }
        }

        let mut sink = open_sink(self.output.as_deref())?;
        sink.write_all(&buffer)?;
        sink.flush()?;
        Ok(())
    }
}

/// Destination for processed output.
///
/// A terminal is written to directly; pipes and files are buffered.
fn open_sink(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(CliError::file(path))?,
        )),
        None if console::user_attended() => Box::new(io::stdout()),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Preprocess `path` and atomically replace it if the content changed.
///
/// The new content is written to a temporary file in the same directory
/// and renamed over the original, preserving its permissions.
fn rewrite_in_place(path: &Path, preprocessor: &Preprocessor) -> Result<Preprocessed, CliError> {
    let input = fs::read(path).map_err(CliError::file(path))?;

    let result = preprocessor.process(&input)?;
    if !result.changed {
        return Ok(result);
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path)
        .map_err(CliError::file(path))?
        .permissions();

    let mut temp = NamedTempFile::new_in(dir).map_err(CliError::file(dir))?;
    temp.write_all(&result.output)?;
    temp.as_file().sync_all()?;
    temp.as_file().set_permissions(permissions)?;
    temp.persist(path)
        .map_err(|err| CliError::file(path)(err.error))?;

    tracing::debug!(path = %path.display(), "Rewrote file");
    Ok(result)
}
