//! End-to-end tests: write real files to disk, run them through the format
//! readers, root derivation, and the scorer, the way the CLI wires things up.

use std::fs;
use std::io::BufReader;

use ccgeval_deps::formats::{with_roots, AutoReader, DepsReader, RootDeriver, RootsReader};
use ccgeval_deps::{
    score_corpus, BuildOptions, HeadRuleTable, IgnoreList, ScoreConfig, SentenceDeps, WordToken,
};
use ccgeval_grammar::Category;
use tempfile::TempDir;

const GOLD_DEPS: &str = "\
# gold standard

joined_2 ((S[dcl]{_}\\NP{Y}<1>){_}/NP{Z}<2>){_} 1 Smith_1 0
joined_2 ((S[dcl]{_}\\NP{Y}<1>){_}/NP{Z}<2>){_} 2 board_4 0
the_3 (NP[nb]{Y}/N{Y}<1>){_} 1 board_4 0

retired_2 (S[dcl]{_}\\NP{Y}<1>){_} 1 Vinken_1 0
";

// Same sentences with one wrong argument attachment in the first.
const SYSTEM_DEPS: &str = "\
joined_2 ((S[dcl]{_}\\NP{Y}<1>){_}/NP{Z}<2>){_} 1 board_4 0
joined_2 ((S[dcl]{_}\\NP{Y}<1>){_}/NP{Z}<2>){_} 2 board_4 0
the_3 (NP[nb]{Y}/N{Y}<1>){_} 1 board_4 0

retired_2 (S[dcl]{_}\\NP{Y}<1>){_} 1 Vinken_1 0
";

const GOLD_AUTO: &str = "\
ID=1
(<T S[dcl] 1 2> (<L NP NNP NNP Smith NP>) (<T S[dcl]\\NP 0 2> (<L (S[dcl]\\NP)/NP VBD VBD joined (S[dcl]\\NP)/NP>) (<T NP 0 2> (<L NP[nb]/N DT DT the NP[nb]/N>) (<L N NN NN board N>))))
ID=2
(<T S[dcl] 1 2> (<L NP NNP NNP Vinken NP>) (<L S[dcl]\\NP VBD VBD retired S[dcl]\\NP>))
";

fn read_deps(path: &std::path::Path) -> Vec<SentenceDeps> {
    DepsReader::open(path, IgnoreList::candc())
        .expect("open deps")
        .collect::<Result<_, _>>()
        .expect("read deps")
}

#[test]
fn deps_files_score_end_to_end() {
    let dir = TempDir::new().expect("tempdir");
    let gold_path = dir.path().join("gold.deps");
    let system_path = dir.path().join("system.deps");
    fs::write(&gold_path, GOLD_DEPS).expect("write gold");
    fs::write(&system_path, SYSTEM_DEPS).expect("write system");

    let gold = read_deps(&gold_path);
    let system = read_deps(&system_path);
    assert_eq!(gold.len(), 2);

    let scorer = score_corpus(gold, system, ScoreConfig::default()).expect("score");
    let totals = scorer.totals();
    let category = totals.category.expect("category");
    // Both sides agree on every (category, slot) pair.
    assert_eq!((category.gold, category.system, category.matched), (4, 4, 4));
    let alignment = totals.alignment.expect("alignment");
    assert_eq!(alignment.matched, 3);
    let combined = totals.combined.expect("combined");
    assert_eq!(combined.matched, 3);
}

#[test]
fn derived_roots_attach_and_score() {
    let dir = TempDir::new().expect("tempdir");
    let gold_path = dir.path().join("gold.deps");
    let auto_path = dir.path().join("gold.auto");
    let roots_path = dir.path().join("system.roots");
    fs::write(&gold_path, GOLD_DEPS).expect("write gold");
    fs::write(&auto_path, GOLD_AUTO).expect("write auto");
    // System roots: right for sentence 1, wrong for sentence 2.
    fs::write(&roots_path, "joined_2 (S[dcl]\\NP)/NP\nVinken_1 NP\n").expect("write roots");

    let table = HeadRuleTable::ls14();
    let gold_roots = RootDeriver::new(
        AutoReader::open(&auto_path, false).expect("open auto"),
        BuildOptions::percolation(&table),
    );
    let gold: Vec<SentenceDeps> = with_roots(
        DepsReader::open(&gold_path, IgnoreList::candc()).expect("open deps"),
        gold_roots,
    )
    .collect::<Result<_, _>>()
    .expect("merge gold");

    assert_eq!(
        gold[0].root.as_ref().map(|r| r.token.clone()),
        Some(WordToken::new("joined", 2))
    );
    assert_eq!(
        gold[1].root.as_ref().map(|r| &r.category),
        Some(&Category::parse("S[dcl]\\NP").expect("category"))
    );

    let system_roots: Vec<_> = RootsReader::new(BufReader::new(
        fs::File::open(&roots_path).expect("open roots"),
    ))
    .collect::<Result<_, _>>()
    .expect("read roots");
    let system: Vec<SentenceDeps> = read_deps(&gold_path)
        .into_iter()
        .zip(system_roots)
        .map(|(mut s, root)| {
            s.root = root;
            s
        })
        .collect();

    let config = ScoreConfig {
        use_roots: true,
        suppress_root_warning: true,
        ..ScoreConfig::default()
    };
    let scorer = score_corpus(gold, system, config).expect("score");
    let root = scorer.totals().root.expect("root dimension");
    assert_eq!((root.gold, root.system, root.matched), (2, 2, 1));
}

#[test]
fn sentence_deps_round_trip_through_json() {
    let dir = TempDir::new().expect("tempdir");
    let gold_path = dir.path().join("gold.deps");
    fs::write(&gold_path, GOLD_DEPS).expect("write gold");

    let gold = read_deps(&gold_path);
    let json = serde_json::to_string(&gold).expect("serialize");
    let restored: Vec<SentenceDeps> = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored, gold);
}

#[test]
fn autofile_and_percolation_agree_on_ccgbank_style_trees() {
    let dir = TempDir::new().expect("tempdir");
    let auto_path = dir.path().join("gold.auto");
    fs::write(&auto_path, GOLD_AUTO).expect("write auto");

    let table = HeadRuleTable::ls14();
    for options in [BuildOptions::autofile(), BuildOptions::percolation(&table)] {
        let roots: Vec<_> = RootDeriver::new(
            AutoReader::open(&auto_path, false).expect("open auto"),
            options,
        )
        .collect::<Result<_, _>>()
        .expect("derive roots");
        let tokens: Vec<_> = roots
            .iter()
            .map(|r| r.as_ref().expect("root").token.clone())
            .collect();
        assert_eq!(
            tokens,
            vec![WordToken::new("joined", 2), WordToken::new("retired", 2)]
        );
    }
}
