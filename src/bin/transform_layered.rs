//! Run a grammar's layered transformation and save the rewritten document.
//!
//! Usage:
//!   transform-layered <FROM> <TO>
//!   transform-layered <FROM> <TO> --max-steps 1000

use anyhow::Context;
use clap::Parser;
use gragra::logger::{level_for_verbosity, start_logger};
use gragra::transform::LoggingListener;
use gragra::{GrammarDocument, LayeredTransformation};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "transform-layered")]
#[command(version)]
#[command(about = "Apply a grammar's rules to its host graph, layer by layer")]
struct Cli {
    /// Document holding the grammar and its host graph
    #[arg(value_name = "FROM")]
    from: PathBuf,

    /// Where to write the transformed document
    #[arg(value_name = "TO")]
    to: PathBuf,

    /// Abort after this many rule applications, overriding the document's options
    #[arg(long, value_name = "N")]
    max_steps: Option<usize>,

    /// Log more, repeat for even more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    start_logger(level_for_verbosity(cli.verbose));

    println!("Loading file {}", cli.from.display());
    let mut document = GrammarDocument::load(&cli.from)
        .with_context(|| format!("Failed to load {}", cli.from.display()))?;
    if let Some(max_steps) = cli.max_steps {
        document.options.max_steps = Some(max_steps);
    }

    println!("Transform layered: {}", document.name);
    let name = document.name.clone();
    let mut engine = LayeredTransformation::for_document(&mut document);
    engine.subscribe(LoggingListener);
    let summary = engine
        .transform()
        .with_context(|| format!("Transformation of {} failed", name))?;
    println!(
        "Applied {} rules in {} passes; the graph now has {} nodes and {} edges",
        summary.steps,
        summary.passes,
        document.graph.order(),
        document.graph.size()
    );
    for (rule, count) in &summary.applications {
        log::info!("{}: {} applications", rule, count);
    }

    println!("Saving result to {}", cli.to.display());
    document
        .save(&cli.to)
        .with_context(|| format!("Failed to save {}", cli.to.display()))?;
    Ok(())
}
