//! The `eval` subcommand: corpus-level dependency scoring.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use ccgeval_deps::formats::{with_roots, AutoReader, DepsReader, FormatError, RootDeriver, RootsReader};
use ccgeval_deps::{
    BuildOptions, Counts, DecomposedScorer, HeadRuleTable, IgnoreList, Root, ScoreConfig,
    SentenceDeps, SentenceScore,
};

use crate::RootMethod;

#[derive(Args)]
pub struct EvalArgs {
    /// Ground-truth dependencies file
    truth: PathBuf,
    /// System dependencies file to evaluate
    system: PathBuf,
    /// Ground-truth roots: a `.roots` file, or a `.auto` file to extract
    /// roots from (always with the autofile method)
    truth_roots: Option<PathBuf>,
    /// System roots: a `.roots` file, or a `.auto`/`.autox` file to extract
    /// roots from with --root-method
    system_roots: Option<PathBuf>,

    /// Original CCGbank-style evaluation: one atomic labelled match, roots
    /// ignored
    #[arg(long, short = 's')]
    std: bool,
    /// Strip features from category labels before matching
    #[arg(long, short = 'u')]
    unlabelled: bool,
    /// Skip the alignment dimension
    #[arg(long)]
    no_alignment: bool,
    /// Head-finding method for roots extracted from system derivation files
    #[arg(long, short = 'm', value_enum, default_value_t = RootMethod::Ls14)]
    root_method: RootMethod,
    /// Drop root dependencies and do not warn about their absence
    #[arg(long, short = 'r')]
    ignore_roots: bool,
    /// Keep scoring roots but silence missing-root warnings
    #[arg(long)]
    quiet_roots: bool,
    /// Output metrics for each sentence (implies --tsv)
    #[arg(long, short = 'e')]
    each_sentence: bool,
    /// TSV output
    #[arg(long, short = 't')]
    tsv: bool,
    /// JSON output
    #[arg(long)]
    json: bool,
}

pub fn run(mut args: EvalArgs) -> Result<()> {
    if args.std {
        args.ignore_roots = true;
    }
    if args.each_sentence {
        args.tsv = true;
    }
    let ignore_roots = args.ignore_roots;
    let config = ScoreConfig {
        use_labels: !args.unlabelled,
        use_alignment: !args.no_alignment,
        use_roots: !ignore_roots
            && (args.truth_roots.is_some() || args.system_roots.is_some()),
        standard: args.std,
        suppress_root_warning: ignore_roots || args.quiet_roots,
    };

    let table = HeadRuleTable::ls14();
    // Explicit .roots data always wins over re-derivation; the truth side of
    // a derivation file is CCGbank, whose own head markers are authoritative.
    let truth_roots = args
        .truth_roots
        .as_deref()
        .filter(|_| !ignore_roots)
        .map(|p| roots_stream(p, RootMethod::Autofile, &table))
        .transpose()?;
    let system_roots = args
        .system_roots
        .as_deref()
        .filter(|_| !ignore_roots)
        .map(|p| roots_stream(p, args.root_method, &table))
        .transpose()?;

    let mut truth = deps_stream(&args.truth, truth_roots)?;
    let mut system = deps_stream(&args.system, system_roots)?;

    let mut scorer = DecomposedScorer::new(config);
    let mut rows: Vec<(usize, SentenceScore)> = Vec::new();
    let mut sentence = 0usize;
    loop {
        match (truth.next(), system.next()) {
            (Some(t), Some(s)) => {
                sentence += 1;
                let t = t.with_context(|| format!("in {}", args.truth.display()))?;
                let s = s.with_context(|| format!("in {}", args.system.display()))?;
                let score = scorer.score_sentence(&t, &s, sentence);
                if args.each_sentence {
                    rows.push((sentence, score));
                }
            }
            (None, None) => break,
            (t, s) => bail!(
                "sentence count mismatch between {} and {}: {} vs {}",
                args.truth.display(),
                args.system.display(),
                sentence + t.map_or(0, |_| 1) + truth.count(),
                sentence + s.map_or(0, |_| 1) + system.count(),
            ),
        }
    }

    if args.json {
        print_json(&scorer, &rows, args.each_sentence)?;
    } else if args.tsv {
        print_tsv(&scorer, &rows, args.each_sentence);
    } else {
        print_human(&scorer);
    }
    Ok(())
}

type RootStream<'a> = Box<dyn Iterator<Item = Result<Option<Root>, FormatError>> + 'a>;
type DepsStream<'a> = Box<dyn Iterator<Item = Result<SentenceDeps, FormatError>> + 'a>;

fn roots_stream<'a>(
    path: &Path,
    method: RootMethod,
    table: &'a HeadRuleTable,
) -> Result<RootStream<'a>> {
    let ext = path.extension().and_then(|e| e.to_str());
    if ext == Some("roots") {
        let reader = RootsReader::open(path)
            .with_context(|| format!("opening roots file {}", path.display()))?;
        return Ok(Box::new(reader));
    }
    let autox = ext == Some("autox");
    let reader = AutoReader::open(path, autox)
        .with_context(|| format!("opening derivation file {}", path.display()))?;
    let options = match method {
        RootMethod::Autofile => BuildOptions::autofile(),
        RootMethod::Ls14 => BuildOptions::percolation(table),
    };
    Ok(Box::new(RootDeriver::new(reader, options)))
}

fn deps_stream<'a>(path: &Path, roots: Option<RootStream<'a>>) -> Result<DepsStream<'a>> {
    let deps = DepsReader::open(path, IgnoreList::candc())
        .with_context(|| format!("opening dependencies file {}", path.display()))?;
    Ok(match roots {
        Some(roots) => Box::new(with_roots(deps, roots)),
        None => Box::new(deps),
    })
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Serialize)]
struct DimensionReport {
    gold: usize,
    system: usize,
    matched: usize,
    precision: f64,
    recall: f64,
    f1: f64,
}

impl From<Counts> for DimensionReport {
    fn from(c: Counts) -> Self {
        DimensionReport {
            gold: c.gold,
            system: c.system,
            matched: c.matched,
            precision: c.precision(),
            recall: c.recall(),
            f1: c.f1(),
        }
    }
}

#[derive(Serialize)]
struct Report {
    sentences: usize,
    dimensions: BTreeMap<&'static str, DimensionReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    per_sentence: Vec<SentenceReport>,
}

#[derive(Serialize)]
struct SentenceReport {
    sentence: usize,
    dimensions: BTreeMap<&'static str, DimensionReport>,
}

fn dimension_map(score: &SentenceScore) -> BTreeMap<&'static str, DimensionReport> {
    score
        .dimensions()
        .map(|(name, counts)| (name, counts.into()))
        .collect()
}

fn print_json(
    scorer: &DecomposedScorer,
    rows: &[(usize, SentenceScore)],
    each_sentence: bool,
) -> Result<()> {
    let report = Report {
        sentences: scorer.sentences(),
        dimensions: dimension_map(scorer.totals()),
        per_sentence: if each_sentence {
            rows.iter()
                .map(|(sentence, score)| SentenceReport {
                    sentence: *sentence,
                    dimensions: dimension_map(score),
                })
                .collect()
        } else {
            Vec::new()
        },
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_tsv(scorer: &DecomposedScorer, rows: &[(usize, SentenceScore)], each_sentence: bool) {
    if each_sentence {
        println!("sent_id\tdimension\tgold\tsystem\tmatched\tprecision\trecall\tf1");
        for (sentence, score) in rows {
            for (name, c) in score.dimensions() {
                println!(
                    "{sentence}\t{name}\t{}\t{}\t{}\t{}\t{}\t{}",
                    c.gold,
                    c.system,
                    c.matched,
                    c.precision(),
                    c.recall(),
                    c.f1(),
                );
            }
        }
    } else {
        println!("dimension\tgold\tsystem\tmatched\tprecision\trecall\tf1");
        for (name, c) in scorer.totals().dimensions() {
            println!(
                "{name}\t{}\t{}\t{}\t{}\t{}\t{}",
                c.gold,
                c.system,
                c.matched,
                c.precision(),
                c.recall(),
                c.f1(),
            );
        }
    }
}

fn print_human(scorer: &DecomposedScorer) {
    println!(
        "{} ({} sentences)",
        "Dependency scores".bold(),
        scorer.sentences()
    );
    for (name, c) in scorer.totals().dimensions() {
        println!("{}", name.cyan().bold());
        println!("  Precision: {:.2}%", c.precision() * 100.0);
        println!("  Recall:    {:.2}%", c.recall() * 100.0);
        println!("  F1:        {:.2}%", c.f1() * 100.0);
    }
}
