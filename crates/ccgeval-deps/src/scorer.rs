//! Decomposed dependency scoring.
//!
//! Gold and system dependency multisets are matched along independent
//! dimensions, each with its own precision/recall/F1: *category* (predicate
//! category and slot, word positions ignored), *alignment* (predicate and
//! argument positions, category ignored), *root* (the sentence head as a
//! single item), and *combined* (simultaneous identity on every active
//! dimension). Standard mode collapses everything into the single atomic
//! match of the CCGbank evaluation.
//!
//! Counts accumulate per sentence into corpus totals; corpus-level scores are
//! micro-averages, never averages of per-sentence scores.

use std::collections::HashMap;
use std::hash::Hash;

use ccgeval_grammar::Category;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::dependency::SentenceDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Compare full category labels; when false, features are stripped first.
    pub use_labels: bool,
    /// Score the alignment dimension (and require it in combined).
    pub use_alignment: bool,
    /// Score root dependencies.
    pub use_roots: bool,
    /// Single-dimension CCGbank-style scoring instead of decomposed.
    pub standard: bool,
    /// Keep quiet about sentences missing a root.
    pub suppress_root_warning: bool,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        ScoreConfig {
            use_labels: true,
            use_alignment: true,
            use_roots: false,
            standard: false,
            suppress_root_warning: false,
        }
    }
}

/// Match counts for one dimension. Scores are derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub gold: usize,
    pub system: usize,
    pub matched: usize,
}

impl Counts {
    /// Nothing expected and nothing produced counts as fully correct, so that
    /// root-less comparisons rank consistently with root-bearing ones.
    pub fn precision(&self) -> f64 {
        if self.gold == 0 && self.system == 0 {
            1.0
        } else if self.system == 0 {
            0.0
        } else {
            self.matched as f64 / self.system as f64
        }
    }

    pub fn recall(&self) -> f64 {
        if self.gold == 0 && self.system == 0 {
            1.0
        } else if self.gold == 0 {
            0.0
        } else {
            self.matched as f64 / self.gold as f64
        }
    }

    pub fn f1(&self) -> f64 {
        if self.gold == 0 && self.system == 0 {
            1.0
        } else {
            2.0 * self.matched as f64 / (self.gold + self.system) as f64
        }
    }

    fn add(&mut self, other: Counts) {
        self.gold += other.gold;
        self.system += other.system;
        self.matched += other.matched;
    }
}

/// Per-dimension counts for one sentence (or, summed, for a corpus).
/// Inactive dimensions are `None`; a sentence excluded from the root
/// dimension leaves `root` as `None` while other dimensions are scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceScore {
    pub standard: Option<Counts>,
    pub category: Option<Counts>,
    pub alignment: Option<Counts>,
    pub root: Option<Counts>,
    pub combined: Option<Counts>,
}

impl SentenceScore {
    /// Active dimensions in report order.
    pub fn dimensions(&self) -> impl Iterator<Item = (&'static str, Counts)> {
        [
            ("standard", self.standard),
            ("category", self.category),
            ("alignment", self.alignment),
            ("root", self.root),
            ("combined", self.combined),
        ]
        .into_iter()
        .filter_map(|(name, counts)| counts.map(|c| (name, c)))
    }

    fn accumulate(&mut self, part: &SentenceScore) {
        fn merge(total: &mut Option<Counts>, part: Option<Counts>) {
            if let Some(c) = part {
                total.get_or_insert_with(Counts::default).add(c);
            }
        }
        merge(&mut self.standard, part.standard);
        merge(&mut self.category, part.category);
        merge(&mut self.alignment, part.alignment);
        merge(&mut self.root, part.root);
        merge(&mut self.combined, part.combined);
    }
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("sentence count mismatch: {gold} gold vs {system} system")]
    SentenceCountMismatch { gold: usize, system: usize },
}

/// Streaming scorer: one aligned sentence pair at a time, corpus totals
/// maintained incrementally.
#[derive(Debug, Clone)]
pub struct DecomposedScorer {
    config: ScoreConfig,
    totals: SentenceScore,
    sentences: usize,
}

/// Combined-dimension item: a dependency projected onto every active
/// dimension, or the sentence's root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CombinedKey {
    Dep {
        category: Category,
        slot: usize,
        edge: Option<(usize, usize)>,
    },
    Root {
        index: usize,
        category: Category,
    },
}

impl DecomposedScorer {
    pub fn new(config: ScoreConfig) -> Self {
        DecomposedScorer {
            config,
            totals: SentenceScore::default(),
            sentences: 0,
        }
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    pub fn totals(&self) -> &SentenceScore {
        &self.totals
    }

    pub fn sentences(&self) -> usize {
        self.sentences
    }

    /// Score one aligned gold/system pair and fold it into the corpus totals.
    /// `sentence_id` is only used to identify the sentence in warnings.
    pub fn score_sentence(
        &mut self,
        gold: &SentenceDeps,
        system: &SentenceDeps,
        sentence_id: usize,
    ) -> SentenceScore {
        let config = self.config;
        let label = |category: &Category| {
            if config.use_labels {
                category.clone()
            } else {
                category.strip_features()
            }
        };

        // Root exclusion is per sentence: a missing root on either side drops
        // the root item everywhere without touching the other dimensions.
        let score_roots = config.use_roots && gold.root.is_some() && system.root.is_some();
        if config.use_roots && !score_roots && !config.suppress_root_warning {
            if gold.root.is_none() {
                warn!("no root in gold dependencies for sentence #{sentence_id}");
            }
            if system.root.is_none() {
                warn!("no root in system dependencies for sentence #{sentence_id}");
            }
        }

        let mut score = SentenceScore::default();
        if config.standard {
            // Atomic match; a scored root joins the multiset as the
            // pseudo-dependency ROOT -> head (predicate position 0, slot 0).
            let keys = |side: &SentenceDeps| {
                let mut keys: Vec<(usize, Category, usize, usize)> = side
                    .deps
                    .iter()
                    .map(|d| (d.pred.index, label(&d.category), d.slot.0, d.arg.index))
                    .collect();
                if score_roots {
                    if let Some(root) = &side.root {
                        keys.push((0, label(&root.category), 0, root.token.index));
                    }
                }
                keys
            };
            score.standard = Some(dimension(&keys(gold), &keys(system)));
        } else {
            let category_keys = |side: &SentenceDeps| {
                side.deps
                    .iter()
                    .map(|d| (label(&d.category), d.slot.0))
                    .collect::<Vec<_>>()
            };
            score.category = Some(dimension(&category_keys(gold), &category_keys(system)));

            if config.use_alignment {
                let alignment_keys = |side: &SentenceDeps| {
                    side.deps
                        .iter()
                        .map(|d| (d.pred.index, d.arg.index))
                        .collect::<Vec<_>>()
                };
                score.alignment = Some(dimension(&alignment_keys(gold), &alignment_keys(system)));
            }

            if score_roots {
                let root_keys = |side: &SentenceDeps| {
                    side.root
                        .iter()
                        .map(|r| (r.token.index, label(&r.category)))
                        .collect::<Vec<_>>()
                };
                score.root = Some(dimension(&root_keys(gold), &root_keys(system)));
            }

            let combined_keys = |side: &SentenceDeps| {
                let mut keys: Vec<CombinedKey> = side
                    .deps
                    .iter()
                    .map(|d| CombinedKey::Dep {
                        category: label(&d.category),
                        slot: d.slot.0,
                        edge: config.use_alignment.then_some((d.pred.index, d.arg.index)),
                    })
                    .collect();
                if score_roots {
                    if let Some(root) = &side.root {
                        keys.push(CombinedKey::Root {
                            index: root.token.index,
                            category: label(&root.category),
                        });
                    }
                }
                keys
            };
            score.combined = Some(dimension(&combined_keys(gold), &combined_keys(system)));
        }

        self.totals.accumulate(&score);
        self.sentences += 1;
        score
    }
}

/// Score two complete sentence streams, requiring them to be the same length.
/// Returns the scorer with its accumulated totals.
pub fn score_corpus<G, S>(gold: G, system: S, config: ScoreConfig) -> Result<DecomposedScorer, EvalError>
where
    G: IntoIterator<Item = SentenceDeps>,
    S: IntoIterator<Item = SentenceDeps>,
{
    let mut scorer = DecomposedScorer::new(config);
    let mut gold = gold.into_iter();
    let mut system = system.into_iter();
    loop {
        match (gold.next(), system.next()) {
            (Some(g), Some(s)) => {
                scorer.score_sentence(&g, &s, scorer.sentences() + 1);
            }
            (None, None) => return Ok(scorer),
            (leftover_gold, leftover_system) => {
                let n = scorer.sentences();
                return Err(EvalError::SentenceCountMismatch {
                    gold: n + leftover_gold.map_or(0, |_| 1) + gold.count(),
                    system: n + leftover_system.map_or(0, |_| 1) + system.count(),
                });
            }
        }
    }
}

/// One multiset intersection: each gold item is consumed by at most one
/// matching system item.
fn dimension<K: Eq + Hash>(gold: &[K], system: &[K]) -> Counts {
    let mut pool: HashMap<&K, usize> = HashMap::new();
    for key in gold {
        *pool.entry(key).or_insert(0) += 1;
    }
    let mut matched = 0;
    for key in system {
        if let Some(remaining) = pool.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                matched += 1;
            }
        }
    }
    Counts {
        gold: gold.len(),
        system: system.len(),
        matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_against_empty_is_perfect() {
        let c = Counts::default();
        assert_eq!(c.precision(), 1.0);
        assert_eq!(c.recall(), 1.0);
        assert_eq!(c.f1(), 1.0);
    }

    #[test]
    fn one_sided_emptiness_is_zero() {
        let c = Counts {
            gold: 2,
            system: 0,
            matched: 0,
        };
        assert_eq!(c.precision(), 0.0);
        assert_eq!(c.recall(), 0.0);
        assert_eq!(c.f1(), 0.0);
    }

    #[test]
    fn multiset_matching_never_double_counts() {
        let gold = vec!["a", "a", "b"];
        let system = vec!["a", "a", "a", "c"];
        let counts = dimension(&gold, &system);
        assert_eq!(counts.matched, 2);
        assert_eq!(counts.gold, 3);
        assert_eq!(counts.system, 4);
    }

    #[test]
    fn corpus_scoring_rejects_unequal_streams() {
        let err = score_corpus(
            vec![SentenceDeps::default(), SentenceDeps::default()],
            vec![SentenceDeps::default()],
            ScoreConfig::default(),
        )
        .unwrap_err();
        match err {
            EvalError::SentenceCountMismatch { gold, system } => {
                assert_eq!((gold, system), (2, 1));
            }
        }
    }
}
