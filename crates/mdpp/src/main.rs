//! mdpp CLI - Markdown directive preprocessor.
//!
//! Provides commands for:
//! - `process`: Expand `code`, `index`/`toc` and `link` directives
//! - `title`: Print the titles of markdown documents

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ProcessArgs, TitleArgs};
use output::Output;

/// mdpp - Markdown directive preprocessor.
#[derive(Parser)]
#[command(name = "mdpp", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand directives in markdown documents.
    Process(ProcessArgs),
    /// Print the title of each markdown document.
    Title(TitleArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // Check if verbose flag is set for process command
    let verbose = matches!(&cli.command, Commands::Process(args) if args.verbose);

    // Initialize tracing with appropriate log level
    // --verbose enables DEBUG level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Process(args) => args.execute(),
        Commands::Title(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
