//! ccgeval CLI
//!
//! Command-line interface for:
//! - Scoring CCGbank-style dependency files against gold standards (`eval`),
//!   with standard single-dimension or decomposed multi-dimension metrics
//! - Extracting sentence roots from `.auto`/`.autox` derivation files
//!   (`roots`)

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod eval;
mod roots;

#[derive(Parser)]
#[command(name = "ccgeval")]
#[command(author, version, about = "CCG dependency evaluation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a system dependency file against a gold one.
    ///
    /// Accepts C&C `.deps`, CCGbank PARG, and 4-field converted files. Roots
    /// can come from `.roots` files or be extracted from `.auto`/`.autox`
    /// derivations on the fly.
    Eval(eval::EvalArgs),

    /// Print one root (`word_index category`) per sentence of a derivation
    /// file, `None` for sentences without a parse.
    Roots(roots::RootsArgs),
}

/// Head-finding method for roots extracted from derivation files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RootMethod {
    /// Trust the head markers in the `.auto` tree format. Only meaningful for
    /// CCGbank itself and for EasyCCG output.
    Autofile,
    /// The head-finding rules of Lewis and Steedman (EMNLP 2014), for parsers
    /// that do not emit semantic head markers.
    Ls14,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Eval(args) => eval::run(args),
        Commands::Roots(args) => roots::run(args),
    }
}
