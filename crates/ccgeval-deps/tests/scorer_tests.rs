use approx::assert_relative_eq;
use ccgeval_deps::{DecomposedScorer, DependencyTuple, Root, ScoreConfig, SentenceDeps, WordToken};
use ccgeval_grammar::{Category, Slot};
use proptest::prelude::*;

fn dep(pred: (&str, usize), cat: &str, slot: usize, arg: (&str, usize)) -> DependencyTuple {
    DependencyTuple {
        pred: WordToken::new(pred.0, pred.1),
        category: Category::parse(cat).expect("category"),
        slot: Slot(slot),
        arg: WordToken::new(arg.0, arg.1),
        rule_id: None,
    }
}

fn sentence(deps: Vec<DependencyTuple>) -> SentenceDeps {
    SentenceDeps { deps, root: None }
}

/// Transitive verb with a wrong subject attachment: the labelling is fully
/// right (both slots of the right category), only one edge aligns, and only
/// one dependency is right on every dimension at once.
fn worked_example() -> (SentenceDeps, SentenceDeps) {
    let cat = r"(S\NP)/NP";
    let gold = sentence(vec![
        dep(("saw", 3), cat, 1, ("kids", 1)),
        dep(("saw", 3), cat, 2, ("birds", 5)),
    ]);
    let system = sentence(vec![
        dep(("saw", 3), cat, 1, ("the", 2)),
        dep(("saw", 3), cat, 2, ("birds", 5)),
    ]);
    (gold, system)
}

#[test]
fn worked_example_decomposed() {
    let (gold, system) = worked_example();
    let mut scorer = DecomposedScorer::new(ScoreConfig::default());
    let score = scorer.score_sentence(&gold, &system, 1);

    assert!(score.standard.is_none());
    let category = score.category.expect("category dimension");
    assert_eq!((category.gold, category.system, category.matched), (2, 2, 2));
    let alignment = score.alignment.expect("alignment dimension");
    assert_eq!(alignment.matched, 1);
    let combined = score.combined.expect("combined dimension");
    assert_eq!(combined.matched, 1);
    assert_relative_eq!(combined.f1(), 0.5);
}

#[test]
fn worked_example_standard() {
    let (gold, system) = worked_example();
    let config = ScoreConfig {
        standard: true,
        ..ScoreConfig::default()
    };
    let mut scorer = DecomposedScorer::new(config);
    let score = scorer.score_sentence(&gold, &system, 1);

    let standard = score.standard.expect("standard dimension");
    assert_eq!((standard.gold, standard.system, standard.matched), (2, 2, 1));
    assert_relative_eq!(standard.precision(), 0.5);
    assert_relative_eq!(standard.recall(), 0.5);
    assert_relative_eq!(standard.f1(), 0.5);
    assert!(score.category.is_none());
}

#[test]
fn unlabelled_scoring_strips_features() {
    let gold = sentence(vec![dep(("saw", 2), r"(S[dcl]\NP)/NP", 1, ("I", 1))]);
    let system = sentence(vec![dep(("saw", 2), r"(S[b]\NP)/NP", 1, ("I", 1))]);

    let mut labelled = DecomposedScorer::new(ScoreConfig {
        standard: true,
        ..ScoreConfig::default()
    });
    let score = labelled.score_sentence(&gold, &system, 1);
    assert_eq!(score.standard.expect("counts").matched, 0);

    let mut unlabelled = DecomposedScorer::new(ScoreConfig {
        standard: true,
        use_labels: false,
        ..ScoreConfig::default()
    });
    let score = unlabelled.score_sentence(&gold, &system, 1);
    assert_eq!(score.standard.expect("counts").matched, 1);
}

#[test]
fn identical_sides_are_perfect_on_every_dimension() {
    let (gold, _) = worked_example();
    let mut scorer = DecomposedScorer::new(ScoreConfig::default());
    let score = scorer.score_sentence(&gold, &gold.clone(), 1);
    for (_, counts) in score.dimensions() {
        assert_relative_eq!(counts.precision(), 1.0);
        assert_relative_eq!(counts.recall(), 1.0);
        assert_relative_eq!(counts.f1(), 1.0);
    }
}

#[test]
fn missing_root_excludes_only_the_root_dimension() {
    let root = Root {
        token: WordToken::new("saw", 3),
        category: Category::parse(r"S[dcl]").expect("category"),
    };
    let with_root = |side: &SentenceDeps| SentenceDeps {
        deps: side.deps.clone(),
        root: Some(root.clone()),
    };
    let (gold, system) = worked_example();

    let config = ScoreConfig {
        use_roots: true,
        suppress_root_warning: true,
        ..ScoreConfig::default()
    };
    let mut scorer = DecomposedScorer::new(config);
    // Two sentences with roots on both sides, one with the system root absent.
    scorer.score_sentence(&with_root(&gold), &with_root(&system), 1);
    scorer.score_sentence(&with_root(&gold), &with_root(&gold), 2);
    let excluded = scorer.score_sentence(&with_root(&gold), &system, 3);
    assert!(excluded.root.is_none());
    assert!(excluded.alignment.is_some());

    let totals = scorer.totals();
    let root_counts = totals.root.expect("root totals");
    assert_eq!((root_counts.gold, root_counts.system), (2, 2));
    let category = totals.category.expect("category totals");
    assert_eq!(category.gold, 6);
}

#[test]
fn root_participates_in_combined() {
    let (gold, system) = worked_example();
    let gold_root = Root {
        token: WordToken::new("saw", 3),
        category: Category::parse(r"S[dcl]").expect("category"),
    };
    let bad_root = Root {
        token: WordToken::new("birds", 5),
        category: Category::parse("NP").expect("category"),
    };
    let gold = SentenceDeps {
        root: Some(gold_root),
        ..gold
    };
    let system = SentenceDeps {
        root: Some(bad_root),
        ..system
    };

    let config = ScoreConfig {
        use_roots: true,
        ..ScoreConfig::default()
    };
    let mut scorer = DecomposedScorer::new(config);
    let score = scorer.score_sentence(&gold, &system, 1);
    let root = score.root.expect("root counts");
    assert_eq!((root.gold, root.system, root.matched), (1, 1, 0));
    // two deps plus the root item on each side; one dep matches fully
    let combined = score.combined.expect("combined counts");
    assert_eq!((combined.gold, combined.system, combined.matched), (3, 3, 1));
}

// ============================================================================
// Property tests
// ============================================================================

fn any_dep() -> impl Strategy<Value = DependencyTuple> {
    let cat = prop_oneof![
        Just(r"(S[dcl]\NP)/NP"),
        Just(r"S[dcl]\NP"),
        Just("NP/N"),
        Just(r"(N\N)/N"),
    ];
    (1usize..6, cat, 1usize..4, 1usize..6).prop_map(|(pred, cat, slot, arg)| {
        dep(("w", pred), cat, slot, ("w", arg))
    })
}

fn deps_with_permutation(
) -> impl Strategy<Value = (Vec<DependencyTuple>, Vec<DependencyTuple>)> {
    proptest::collection::vec(any_dep(), 0..12)
        .prop_flat_map(|deps| (Just(deps.clone()), Just(deps).prop_shuffle()))
}

proptest! {
    #[test]
    fn matching_is_order_independent(
        (gold, gold_shuffled) in deps_with_permutation(),
        (system, system_shuffled) in deps_with_permutation(),
    ) {
        for standard in [false, true] {
            let config = ScoreConfig { standard, ..ScoreConfig::default() };
            let mut a = DecomposedScorer::new(config);
            let mut b = DecomposedScorer::new(config);
            let sa = a.score_sentence(&sentence(gold.clone()), &sentence(system.clone()), 1);
            let sb = b.score_sentence(
                &sentence(gold_shuffled.clone()),
                &sentence(system_shuffled.clone()),
                1,
            );
            prop_assert_eq!(sa, sb);
        }
    }

    #[test]
    fn identical_multisets_score_one(deps in proptest::collection::vec(any_dep(), 0..12)) {
        let config = ScoreConfig { standard: true, ..ScoreConfig::default() };
        let mut scorer = DecomposedScorer::new(config);
        let score = scorer.score_sentence(&sentence(deps.clone()), &sentence(deps), 1);
        let counts = score.standard.expect("standard counts");
        prop_assert_eq!(counts.precision(), 1.0);
        prop_assert_eq!(counts.recall(), 1.0);
        prop_assert_eq!(counts.f1(), 1.0);
    }

    #[test]
    fn matched_never_exceeds_either_side(
        gold in proptest::collection::vec(any_dep(), 0..12),
        system in proptest::collection::vec(any_dep(), 0..12),
    ) {
        let mut scorer = DecomposedScorer::new(ScoreConfig::default());
        let score = scorer.score_sentence(&sentence(gold), &sentence(system), 1);
        for (_, counts) in score.dimensions() {
            prop_assert!(counts.matched <= counts.gold);
            prop_assert!(counts.matched <= counts.system);
        }
    }
}
