//! The `roots` subcommand: sentence-root extraction from derivation files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ccgeval_deps::formats::{AutoReader, RootDeriver};
use ccgeval_deps::{BuildOptions, HeadRuleTable};

use crate::RootMethod;

#[derive(Args)]
pub struct RootsArgs {
    /// Derivations file (`.auto`/`.autox`), one tree per line
    auto: PathBuf,
    /// Head-finding method
    #[arg(long, short = 'm', value_enum, default_value_t = RootMethod::Autofile)]
    method: RootMethod,
    /// Force DepCCG's `.autox` field order (otherwise inferred from the file
    /// extension)
    #[arg(long)]
    autox: bool,
}

pub fn run(args: RootsArgs) -> Result<()> {
    let autox =
        args.autox || args.auto.extension().and_then(|e| e.to_str()) == Some("autox");
    let reader = AutoReader::open(&args.auto, autox)
        .with_context(|| format!("opening derivation file {}", args.auto.display()))?;

    let table = HeadRuleTable::ls14();
    let options = match args.method {
        RootMethod::Autofile => BuildOptions::autofile(),
        RootMethod::Ls14 => BuildOptions::percolation(&table),
    };

    for root in RootDeriver::new(reader, options) {
        let root = root.with_context(|| format!("in {}", args.auto.display()))?;
        match root {
            Some(root) => println!("{root}"),
            None => println!("None"),
        }
    }
    Ok(())
}
