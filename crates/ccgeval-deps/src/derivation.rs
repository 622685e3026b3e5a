//! Typed derivation trees and root extraction.
//!
//! An external loader supplies one raw [`AutoNode`] tree per sentence;
//! [`TermGraph::build`] turns it into a typed derivation in a single
//! bottom-up pass, resolving each internal node's category and head child
//! according to [`BuildOptions`]. The graph is immutable after construction
//! and owns its nodes exclusively.

use ccgeval_grammar::{Category, CombineError, MatchPolicy, Slash};
use thiserror::Error;

use crate::dependency::{Root, WordToken};
use crate::heads::{classify, ChildSide, HeadRuleTable, NodeCategory, RuleShape, UnknownRuleError};

/// A raw derivation node as read from a `.auto`/`.autox` file. Category
/// strings are unparsed; `head_index` is the explicit head annotation
/// (meaningful in autofile mode only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoNode {
    Leaf {
        category: String,
        pos: String,
        word: String,
    },
    Branch {
        category: String,
        head_index: usize,
        children: Vec<AutoNode>,
    },
}

/// Where an internal node's head child comes from.
#[derive(Debug, Clone, Copy)]
pub enum HeadMode<'a> {
    /// Trust the explicit head annotation on each branch node.
    Autofile,
    /// Ignore the annotation and classify each step against a head rule
    /// table.
    Percolation(&'a HeadRuleTable),
}

/// Where an internal node's category comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryMode {
    /// Trust the annotated category string.
    Annotated,
    /// Recompute binary nodes via function application; unary nodes (type
    /// raising and friends) keep their annotation.
    Derived,
}

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions<'a> {
    pub head_mode: HeadMode<'a>,
    pub category_mode: CategoryMode,
    pub match_policy: MatchPolicy,
    /// Under `Derived`, record an argument mismatch on the node instead of
    /// failing the build.
    pub lenient: bool,
}

impl<'a> BuildOptions<'a> {
    pub fn autofile() -> Self {
        BuildOptions {
            head_mode: HeadMode::Autofile,
            category_mode: CategoryMode::Annotated,
            match_policy: MatchPolicy::StripFeatures,
            lenient: true,
        }
    }

    pub fn percolation(table: &'a HeadRuleTable) -> Self {
        BuildOptions {
            head_mode: HeadMode::Percolation(table),
            category_mode: CategoryMode::Annotated,
            match_policy: MatchPolicy::StripFeatures,
            lenient: true,
        }
    }
}

/// A typed derivation node. Leaf indices are 1-based sentence positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivationNode {
    Leaf {
        index: usize,
        word: String,
        category: NodeCategory,
    },
    Internal {
        category: NodeCategory,
        children: Vec<DerivationNode>,
        /// Index into `children`; always in range.
        head_child: usize,
        /// Category derivation hit an argument mismatch (lenient mode).
        mismatched: bool,
    },
}

impl DerivationNode {
    pub fn category(&self) -> &NodeCategory {
        match self {
            DerivationNode::Leaf { category, .. } => category,
            DerivationNode::Internal { category, .. } => category,
        }
    }
}

#[derive(Debug, Error)]
pub enum DerivationError {
    #[error("bad category on derivation node: {0}")]
    Category(#[from] ccgeval_grammar::CategoryParseError),
    #[error("head index {head_index} out of range for a node with {children} children")]
    HeadIndexOutOfRange { head_index: usize, children: usize },
    #[error("derivation node with {0} children; expected 1 or 2")]
    BadArity(usize),
    #[error("cannot derive a category for `{left}` `{right}`: {source}")]
    Combine {
        left: String,
        right: String,
        source: CombineError,
    },
    #[error(transparent)]
    Head(#[from] UnknownRuleError),
}

/// One sentence's typed derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermGraph {
    root: DerivationNode,
}

impl TermGraph {
    /// Build the typed derivation bottom-up. Fails on the first malformed
    /// node, out-of-range head annotation, strict-mode category mismatch, or
    /// head-rule miss anywhere in the tree.
    pub fn build(tree: &AutoNode, options: &BuildOptions<'_>) -> Result<TermGraph, DerivationError> {
        let mut next_index = 1;
        let root = build_node(tree, options, &mut next_index)?;
        Ok(TermGraph { root })
    }

    pub fn root(&self) -> &DerivationNode {
        &self.root
    }

    /// The sentence's lexical head: follow head children from the top node
    /// down to a leaf and return that leaf's token and category.
    pub fn root_head(&self) -> Root {
        let mut node = &self.root;
        loop {
            match node {
                DerivationNode::Leaf {
                    index,
                    word,
                    category,
                } => {
                    return Root {
                        token: WordToken::new(word.clone(), *index),
                        category: category.category.clone(),
                    }
                }
                DerivationNode::Internal {
                    children,
                    head_child,
                    ..
                } => node = &children[*head_child],
            }
        }
    }

    /// Whether any node recorded an argument mismatch during lenient
    /// category derivation.
    pub fn has_mismatch(&self) -> bool {
        fn walk(node: &DerivationNode) -> bool {
            match node {
                DerivationNode::Leaf { .. } => false,
                DerivationNode::Internal {
                    children,
                    mismatched,
                    ..
                } => *mismatched || children.iter().any(walk),
            }
        }
        walk(&self.root)
    }
}

fn build_node(
    tree: &AutoNode,
    options: &BuildOptions<'_>,
    next_index: &mut usize,
) -> Result<DerivationNode, DerivationError> {
    match tree {
        AutoNode::Leaf { category, word, .. } => {
            let index = *next_index;
            *next_index += 1;
            Ok(DerivationNode::Leaf {
                index,
                word: word.clone(),
                category: NodeCategory::parse(category)?,
            })
        }
        AutoNode::Branch {
            category,
            head_index,
            children,
        } => {
            let annotated = NodeCategory::parse(category)?;
            let typed: Vec<DerivationNode> = children
                .iter()
                .map(|child| build_node(child, options, next_index))
                .collect::<Result<_, _>>()?;
            if typed.is_empty() || typed.len() > 2 {
                return Err(DerivationError::BadArity(typed.len()));
            }

            let (node_category, mismatched) = match (options.category_mode, typed.len()) {
                (CategoryMode::Annotated, _) | (CategoryMode::Derived, 1) => (annotated, false),
                (CategoryMode::Derived, _) => {
                    derive_category(&typed[0], &typed[1], annotated.conj, options)?
                }
            };

            let head_child = match options.head_mode {
                HeadMode::Autofile => {
                    if *head_index >= typed.len() {
                        return Err(DerivationError::HeadIndexOutOfRange {
                            head_index: *head_index,
                            children: typed.len(),
                        });
                    }
                    *head_index
                }
                HeadMode::Percolation(table) => {
                    let shape = if typed.len() == 1 {
                        RuleShape::Unary
                    } else {
                        classify(&node_category, typed[0].category(), typed[1].category())?
                    };
                    match table.head_side(shape)? {
                        ChildSide::Left => 0,
                        ChildSide::Right => typed.len() - 1,
                    }
                }
            };

            Ok(DerivationNode::Internal {
                category: node_category,
                children: typed,
                head_child,
                mismatched,
            })
        }
    }
}

/// Compute a binary node's category by function application: a forward
/// functor on the left consumes the right child, otherwise a backward functor
/// on the right consumes the left child.
fn derive_category(
    left: &DerivationNode,
    right: &DerivationNode,
    conj: bool,
    options: &BuildOptions<'_>,
) -> Result<(NodeCategory, bool), DerivationError> {
    let l = &left.category().category;
    let r = &right.category().category;
    let combine_err = |source| DerivationError::Combine {
        left: l.to_string(),
        right: r.to_string(),
        source,
    };

    let combined = if matches!(
        l,
        Category::Complex {
            slash: Slash::Forward,
            ..
        }
    ) {
        l.combine(r, Slash::Forward, options.match_policy, options.lenient)
            .map_err(combine_err)?
    } else if matches!(
        r,
        Category::Complex {
            slash: Slash::Backward,
            ..
        }
    ) {
        r.combine(l, Slash::Backward, options.match_policy, options.lenient)
            .map_err(combine_err)?
    } else {
        return Err(combine_err(CombineError::NotAFunctor(l.to_string())));
    };

    Ok((
        NodeCategory {
            category: combined.category,
            conj,
        },
        combined.mismatched,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(category: &str, word: &str) -> AutoNode {
        AutoNode::Leaf {
            category: category.to_string(),
            pos: "XX".to_string(),
            word: word.to_string(),
        }
    }

    fn branch(category: &str, head_index: usize, children: Vec<AutoNode>) -> AutoNode {
        AutoNode::Branch {
            category: category.to_string(),
            head_index,
            children,
        }
    }

    /// `Smith joined the board` with conventional CCGbank annotation.
    fn sentence(top_head: usize) -> AutoNode {
        let object = branch("NP", 0, vec![leaf("NP/N", "the"), leaf("N", "board")]);
        let vp = branch(
            r"S[dcl]\NP",
            0,
            vec![leaf(r"(S[dcl]\NP)/NP", "joined"), object],
        );
        branch("S[dcl]", top_head, vec![leaf("NP", "Smith"), vp])
    }

    #[test]
    fn autofile_mode_returns_the_marked_leaf() {
        let graph = TermGraph::build(&sentence(1), &BuildOptions::autofile()).expect("build");
        let root = graph.root_head();
        assert_eq!(root.token, WordToken::new("joined", 2));
        assert_eq!(root.category, Category::parse(r"(S[dcl]\NP)/NP").unwrap());

        // A different marker wins regardless of what any rule table says.
        let graph = TermGraph::build(&sentence(0), &BuildOptions::autofile()).expect("build");
        assert_eq!(graph.root_head().token, WordToken::new("Smith", 1));
    }

    #[test]
    fn percolation_mode_follows_the_functor() {
        let table = HeadRuleTable::ls14();
        // Head markers deliberately wrong; percolation ignores them.
        let graph =
            TermGraph::build(&sentence(0), &BuildOptions::percolation(&table)).expect("build");
        assert_eq!(graph.root_head().token, WordToken::new("joined", 2));
    }

    #[test]
    fn derived_mode_computes_binary_categories() {
        let mut options = BuildOptions::autofile();
        options.category_mode = CategoryMode::Derived;
        // Annotate the top node wrongly; derived mode recomputes it.
        let object = branch("NP", 0, vec![leaf("NP/N", "the"), leaf("N", "board")]);
        let vp = branch("N", 0, vec![leaf(r"(S[dcl]\NP)/NP", "joined"), object]);
        let tree = branch("N", 1, vec![leaf("NP", "Smith"), vp]);
        let graph = TermGraph::build(&tree, &options).expect("build");
        assert_eq!(
            graph.root().category().category,
            Category::parse("S[dcl]").unwrap()
        );
        assert!(!graph.has_mismatch());
    }

    #[test]
    fn derived_mode_flags_lenient_mismatches() {
        let mut options = BuildOptions::autofile();
        options.category_mode = CategoryMode::Derived;
        let tree = branch("S[dcl]", 0, vec![leaf("S[dcl]/NP", "eats"), leaf("PP", "x")]);
        let graph = TermGraph::build(&tree, &options).expect("lenient build");
        assert!(graph.has_mismatch());

        options.lenient = false;
        let err = TermGraph::build(&tree, &options).unwrap_err();
        assert!(matches!(err, DerivationError::Combine { .. }));
    }

    #[test]
    fn rejects_out_of_range_head_annotations() {
        let tree = branch("NP", 2, vec![leaf("NP/N", "the"), leaf("N", "board")]);
        let err = TermGraph::build(&tree, &BuildOptions::autofile()).unwrap_err();
        assert!(matches!(
            err,
            DerivationError::HeadIndexOutOfRange {
                head_index: 2,
                children: 2
            }
        ));
    }

    #[test]
    fn unary_steps_keep_their_annotation_and_head() {
        let table = HeadRuleTable::ls14();
        let tree = branch(r"S/(S\NP)", 0, vec![leaf("NP", "Smith")]);
        let mut options = BuildOptions::percolation(&table);
        options.category_mode = CategoryMode::Derived;
        let graph = TermGraph::build(&tree, &options).expect("build");
        assert_eq!(
            graph.root().category().category,
            Category::parse(r"S/(S\NP)").unwrap()
        );
        assert_eq!(graph.root_head().token, WordToken::new("Smith", 1));
    }
}
