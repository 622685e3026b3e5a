//! Readers for the external CCG file formats.
//!
//! All readers are line-oriented iterators over any [`BufRead`], yielding one
//! item per sentence so memory stays bounded by a single sentence:
//!
//! - [`DepsReader`] — dependency files: C&C `.deps` (5-6 fields, markup-bearing
//!   categories, rule ids), CCGbank PARG (`<s>` blocks, 0-based indices), and
//!   the 4-field `ccgbank_deps` conversion. The three layouts can be mixed per
//!   file the way the producing tools emit them; PARG is recognized by its
//!   `<s` sentence markers.
//! - [`AutoReader`] — CCGbank `.auto` derivations (one per line), including
//!   DepCCG's `.autox` field order.
//! - [`RootsReader`] — `.roots` files (`word_index category` or `None`).
//! - [`RootDeriver`] — roots recomputed from an `.auto` stream through
//!   [`TermGraph`] head finding.
//! - [`with_roots`] — merges a roots stream into a dependency stream, failing
//!   on a count mismatch.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::mem;
use std::path::Path;
use std::sync::OnceLock;

use ccgeval_grammar::{Category, CategoryParseError, Slot};
use regex::Regex;
use thiserror::Error;

use crate::dependency::{
    DependencyTuple, Root, RootParseError, SentenceDeps, TokenParseError, WordToken,
};
use crate::derivation::{AutoNode, BuildOptions, DerivationError, TermGraph};
use crate::ignore::IgnoreList;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("line {line}: unexpected number of fields: `{text}`")]
    Fields { line: usize, text: String },
    #[error("line {line}: uncommented line in comment header: `{text}`")]
    Header { line: usize, text: String },
    #[error("line {line}: bad word token: {source}")]
    Token {
        line: usize,
        source: TokenParseError,
    },
    #[error("line {line}: bad category: {source}")]
    Category {
        line: usize,
        source: CategoryParseError,
    },
    #[error("line {line}: bad slot `{text}`")]
    Slot { line: usize, text: String },
    #[error("line {line}: bad root: {source}")]
    Root { line: usize, source: RootParseError },
    #[error("line {line}: malformed derivation: {detail}")]
    Auto { line: usize, detail: String },
    #[error("line {line}: {source}")]
    Derivation {
        line: usize,
        source: DerivationError,
    },
    #[error("root count mismatch: {roots} roots for {sentences} sentences")]
    RootCountMismatch { roots: usize, sentences: usize },
}

// C&C markedup annotations: slot markers `<n>`, head variables `{X}`/`{X*}`,
// and the variable feature `[X]`.
fn markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[0-9]>|\{[A-Z_]\*?\}|\[X\]").expect("markup pattern"))
}

// A derivation node header: the inside of `(<...>`.
fn node_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(<([^>]*)>").expect("node pattern"))
}

// ============================================================================
// Dependency files
// ============================================================================

enum DepsState {
    Start,
    Preamble,
    Body,
}

/// Streaming reader for dependency files; yields one [`SentenceDeps`] (roots
/// left empty) per blank-line- or `<\s>`-terminated block. Dependencies
/// matching the supplied [`IgnoreList`] are dropped as they are read, probed
/// with the raw markup-bearing category exactly as C&C's `evaluate` does.
pub struct DepsReader<R: BufRead> {
    lines: io::Lines<R>,
    ignore: IgnoreList,
    state: DepsState,
    parg: bool,
    line_no: usize,
    pending: SentenceDeps,
    done: bool,
}

impl DepsReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, ignore: IgnoreList) -> io::Result<Self> {
        Ok(DepsReader::new(BufReader::new(File::open(path)?), ignore))
    }
}

impl<R: BufRead> DepsReader<R> {
    pub fn new(reader: R, ignore: IgnoreList) -> Self {
        DepsReader {
            lines: reader.lines(),
            ignore,
            state: DepsState::Start,
            parg: false,
            line_no: 0,
            pending: SentenceDeps::default(),
            done: false,
        }
    }

    fn parse_dep(&self, line: &str) -> Result<Option<DependencyTuple>, FormatError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let line_no = self.line_no;
        let token = |text: &str| {
            text.parse::<WordToken>().map_err(|source| FormatError::Token {
                line: line_no,
                source,
            })
        };
        let category = |text: &str| {
            Category::parse(text).map_err(|source| FormatError::Category {
                line: line_no,
                source,
            })
        };
        let slot = |text: &str| {
            text.parse::<usize>().map(Slot).map_err(|_| FormatError::Slot {
                line: line_no,
                text: text.to_string(),
            })
        };

        if self.parg && (6..8).contains(&fields.len()) {
            // PARG: arg_idx pred_idx cat slot arg_word pred_word, 0-based.
            let (arg_idx, pred_idx, cat, slot_text, arg, pred) =
                (fields[0], fields[1], fields[2], fields[3], fields[4], fields[5]);
            let index = |text: &str| {
                text.parse::<usize>().map_err(|_| FormatError::Fields {
                    line: line_no,
                    text: line.to_string(),
                })
            };
            return Ok(Some(DependencyTuple {
                pred: WordToken::new(pred, index(pred_idx)? + 1),
                category: category(cat)?,
                slot: slot(slot_text)?,
                arg: WordToken::new(arg, index(arg_idx)? + 1),
                rule_id: None,
            }));
        }
        match fields.len() {
            5..=6 => {
                // C&C: pred cat slot arg rule_id, markup-bearing category.
                let (pred, cat, slot_text, arg, rule) =
                    (fields[0], fields[1], fields[2], fields[3], fields[4]);
                let pred_word = pred.split('_').next().unwrap_or(pred);
                let arg_word = arg.split('_').next().unwrap_or(arg);
                if self.ignore.ignores(pred_word, cat, slot_text, arg_word, rule) {
                    return Ok(None);
                }
                let stripped = markup_re().replace_all(cat, "");
                Ok(Some(DependencyTuple {
                    pred: token(pred)?,
                    category: category(&stripped)?,
                    slot: slot(slot_text)?,
                    arg: token(arg)?,
                    rule_id: Some(rule.to_string()),
                }))
            }
            4 => {
                let (pred, cat, slot_text, arg) = (fields[0], fields[1], fields[2], fields[3]);
                Ok(Some(DependencyTuple {
                    pred: token(pred)?,
                    category: category(cat)?,
                    slot: slot(slot_text)?,
                    arg: token(arg)?,
                    rule_id: None,
                }))
            }
            _ => Err(FormatError::Fields {
                line: line_no,
                text: line.to_string(),
            }),
        }
    }
}

impl<R: BufRead> Iterator for DepsReader<R> {
    type Item = Result<SentenceDeps, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.done = true;
                    // Files normally end every sentence with a blank line; a
                    // trailing unterminated block still counts.
                    if self.pending.deps.is_empty() {
                        return None;
                    }
                    return Some(Ok(mem::take(&mut self.pending)));
                }
            };
            self.line_no += 1;
            let trimmed = line.trim();

            match self.state {
                DepsState::Start => {
                    self.state = if trimmed.starts_with('#') {
                        DepsState::Preamble
                    } else {
                        DepsState::Body
                    };
                    if matches!(self.state, DepsState::Preamble) {
                        continue;
                    }
                }
                DepsState::Preamble => {
                    if trimmed.starts_with('#') {
                        continue;
                    }
                    if trimmed.is_empty() {
                        self.state = DepsState::Body;
                        continue;
                    }
                    self.done = true;
                    return Some(Err(FormatError::Header {
                        line: self.line_no,
                        text: trimmed.to_string(),
                    }));
                }
                DepsState::Body => {}
            }

            if trimmed.starts_with("<c>") {
                // C&C's POS/supertag line
                continue;
            }
            if trimmed.starts_with("<s") && !trimmed.starts_with(r"<\s>") {
                self.parg = true;
                continue;
            }
            if trimmed.is_empty() || trimmed == r"<\s>" {
                return Some(Ok(mem::take(&mut self.pending)));
            }

            match self.parse_dep(trimmed) {
                Ok(Some(dep)) => self.pending.deps.push(dep),
                Ok(None) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Attach one root per sentence from a roots stream (a `.roots` file or
/// derivation-derived roots). The two streams must have the same length.
pub fn with_roots<D, R>(deps: D, roots: R) -> MergedDeps<D::IntoIter, R::IntoIter>
where
    D: IntoIterator<Item = Result<SentenceDeps, FormatError>>,
    R: IntoIterator<Item = Result<Option<Root>, FormatError>>,
{
    MergedDeps {
        deps: deps.into_iter(),
        roots: roots.into_iter(),
        sentences: 0,
        done: false,
    }
}

pub struct MergedDeps<D, R> {
    deps: D,
    roots: R,
    sentences: usize,
    done: bool,
}

impl<D, R> Iterator for MergedDeps<D, R>
where
    D: Iterator<Item = Result<SentenceDeps, FormatError>>,
    R: Iterator<Item = Result<Option<Root>, FormatError>>,
{
    type Item = Result<SentenceDeps, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.deps.next() {
            Some(Ok(mut sentence)) => match self.roots.next() {
                Some(Ok(root)) => {
                    self.sentences += 1;
                    sentence.root = root;
                    Some(Ok(sentence))
                }
                Some(Err(e)) => {
                    self.done = true;
                    Some(Err(e))
                }
                None => {
                    self.done = true;
                    Some(Err(FormatError::RootCountMismatch {
                        roots: self.sentences,
                        sentences: self.sentences + 1 + self.deps.by_ref().count(),
                    }))
                }
            },
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            None => {
                self.done = true;
                let leftover = self.roots.by_ref().count();
                if leftover > 0 {
                    Some(Err(FormatError::RootCountMismatch {
                        roots: self.sentences + leftover,
                        sentences: self.sentences,
                    }))
                } else {
                    None
                }
            }
        }
    }
}

// ============================================================================
// Derivation files
// ============================================================================

/// Streaming reader for `.auto`/`.autox` files: one derivation per line,
/// `ID=` header lines skipped, a blank line yielding `None` (a sentence the
/// producing parser failed on).
pub struct AutoReader<R: BufRead> {
    lines: io::Lines<R>,
    autox: bool,
    line_no: usize,
    done: bool,
}

impl AutoReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, autox: bool) -> io::Result<Self> {
        Ok(AutoReader::new(BufReader::new(File::open(path)?), autox))
    }
}

impl<R: BufRead> AutoReader<R> {
    pub fn new(reader: R, autox: bool) -> Self {
        AutoReader {
            lines: reader.lines(),
            autox,
            line_no: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for AutoReader<R> {
    type Item = Result<Option<AutoNode>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.starts_with("ID=") {
                continue;
            }
            if trimmed.is_empty() {
                return Some(Ok(None));
            }
            return Some(
                parse_auto_line(trimmed, self.autox)
                    .map(Some)
                    .map_err(|detail| FormatError::Auto {
                        line: self.line_no,
                        detail,
                    }),
            );
        }
    }
}

/// Parse one `.auto` line into a raw tree. Node headers are matched in order
/// and consumed by daughter counts; brackets around subtrees are redundant
/// with the counts and ignored, as in the reference tools.
pub fn parse_auto_line(line: &str, autox: bool) -> Result<AutoNode, String> {
    let headers: Vec<&str> = node_re()
        .captures_iter(line)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    if headers.is_empty() {
        return Err("no derivation nodes".to_string());
    }
    let mut pos = 0;
    let node = build_auto(&headers, &mut pos, autox)?;
    if pos != headers.len() {
        return Err(format!(
            "{} trailing derivation nodes",
            headers.len() - pos
        ));
    }
    Ok(node)
}

fn build_auto(headers: &[&str], pos: &mut usize, autox: bool) -> Result<AutoNode, String> {
    let header = headers.get(*pos).ok_or("truncated derivation")?;
    *pos += 1;
    let fields: Vec<&str> = header.split_whitespace().collect();
    match fields.first() {
        Some(&"T") => {
            if fields.len() < 4 {
                return Err(format!("short T node: `{header}`"));
            }
            let ndtrs: usize = fields[fields.len() - 1]
                .parse()
                .map_err(|_| format!("bad daughter count in `{header}`"))?;
            if !(1..=2).contains(&ndtrs) {
                return Err(format!("T node with {ndtrs} daughters"));
            }
            // .autox moves the head annotation next to the daughter count.
            let head_field = if autox {
                fields[fields.len() - 2]
            } else {
                fields[2]
            };
            let head_index: usize = head_field
                .parse()
                .map_err(|_| format!("bad head index in `{header}`"))?;
            let mut children = Vec::with_capacity(ndtrs);
            for _ in 0..ndtrs {
                children.push(build_auto(headers, pos, autox)?);
            }
            Ok(AutoNode::Branch {
                category: fields[1].to_string(),
                head_index,
                children,
            })
        }
        Some(&"L") => {
            if fields.len() < 5 {
                return Err(format!("short L node: `{header}`"));
            }
            // .auto: L cat pos pos word tag; .autox swaps word into the
            // second field and the POS tag toward the end.
            let word = if autox {
                fields[2]
            } else {
                fields[fields.len() - 2]
            };
            let pos_tag = if autox {
                fields[fields.len() - 2]
            } else {
                fields[2]
            };
            Ok(AutoNode::Leaf {
                category: fields[1].to_string(),
                pos: pos_tag.to_string(),
                word: word.replace(r"\/", "/"),
            })
        }
        _ => Err(format!("unknown node kind in `{header}`")),
    }
}

/// Roots recomputed from an `.auto` stream: builds a [`TermGraph`] per
/// derivation and extracts its head; a missing derivation yields `None`.
pub struct RootDeriver<'a, R: BufRead> {
    auto: AutoReader<R>,
    options: BuildOptions<'a>,
}

impl<'a, R: BufRead> RootDeriver<'a, R> {
    pub fn new(auto: AutoReader<R>, options: BuildOptions<'a>) -> Self {
        RootDeriver { auto, options }
    }
}

impl<'a, R: BufRead> Iterator for RootDeriver<'a, R> {
    type Item = Result<Option<Root>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.auto.next()?;
        let line = self.auto.line_no;
        match item {
            Ok(Some(tree)) => Some(
                TermGraph::build(&tree, &self.options)
                    .map(|graph| Some(graph.root_head()))
                    .map_err(|source| FormatError::Derivation { line, source }),
            ),
            Ok(None) => Some(Ok(None)),
            Err(e) => Some(Err(e)),
        }
    }
}

// ============================================================================
// Roots files
// ============================================================================

/// Streaming reader for `.roots` files: one `word_index category` line per
/// sentence, the literal `None` for a sentence without a root.
pub struct RootsReader<R: BufRead> {
    lines: io::Lines<R>,
    line_no: usize,
    done: bool,
}

impl RootsReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(RootsReader::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> RootsReader<R> {
    pub fn new(reader: R) -> Self {
        RootsReader {
            lines: reader.lines(),
            line_no: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for RootsReader<R> {
    type Item = Result<Option<Root>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };
        self.line_no += 1;
        Some(Root::parse_line(&line).map_err(|source| FormatError::Root {
            line: self.line_no,
            source,
        }))
    }
}
