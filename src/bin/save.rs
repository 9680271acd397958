//! Load a grammar document and save it somewhere else.
//!
//! Usage:
//!   save <FROM> <TO>

use anyhow::Context;
use clap::Parser;
use gragra::logger::{level_for_verbosity, start_logger};
use gragra::GrammarDocument;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "save")]
#[command(version)]
#[command(about = "Copy a grammar document, validating it on the way")]
struct Cli {
    /// Document to read
    #[arg(value_name = "FROM")]
    from: PathBuf,

    /// Where to write the document
    #[arg(value_name = "TO")]
    to: PathBuf,

    /// Log more, repeat for even more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    start_logger(level_for_verbosity(cli.verbose));

    println!(
        "Copying file from {} to {}",
        cli.from.display(),
        cli.to.display()
    );
    let document = GrammarDocument::load(&cli.from)
        .with_context(|| format!("Failed to load {}", cli.from.display()))?;
    document
        .save(&cli.to)
        .with_context(|| format!("Failed to save {}", cli.to.display()))?;
    Ok(())
}
