//! CCG dependency evaluation
//!
//! This crate consumes already-produced CCG derivations and dependency
//! tuples and provides:
//!
//! - typed dependency tuples and per-sentence multisets (`dependency`),
//! - derivation trees with autofile and percolation head-finding
//!   (`derivation`, `heads`),
//! - loaders for the C&C `.deps`, CCGbank PARG, `.auto`/`.autox`, and
//!   `.roots` file formats (`formats`),
//! - the excluded-dependency configuration boundary (`ignore`), and
//! - the decomposed precision/recall/F1 scorer (`scorer`).
//!
//! It deliberately does **not** parse natural-language sentences; derivations
//! and dependencies enter fully formed and are evaluated or manipulated.

pub mod dependency;
pub mod derivation;
pub mod formats;
pub mod heads;
pub mod ignore;
pub mod scorer;

pub use dependency::{DependencyTuple, Root, SentenceDeps, WordToken};
pub use derivation::{
    AutoNode, BuildOptions, CategoryMode, DerivationError, DerivationNode, HeadMode, TermGraph,
};
pub use formats::{AutoReader, DepsReader, FormatError, RootDeriver, RootsReader, with_roots};
pub use heads::{
    ChildSide, HeadChoice, HeadRule, HeadRuleTable, HeadTableError, NodeCategory, RuleShape,
    UnknownRuleError,
};
pub use ignore::IgnoreList;
pub use scorer::{score_corpus, Counts, DecomposedScorer, EvalError, ScoreConfig, SentenceScore};
