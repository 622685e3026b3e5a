//! Head-percolation rules.
//!
//! The percolation rule set follows Lewis and Steedman (EMNLP 2014) — the
//! head-finding rules used by EasyCCG — but is represented as explicit
//! enumerated configuration data rather than scattered conditionals: each
//! binary derivation step is classified into a [`RuleShape`] from the shapes
//! of its children's categories, and a [`HeadRuleTable`] maps every shape to
//! a head-side selector. The table is validated once at construction; a
//! lookup miss or an unclassifiable step fails immediately with
//! [`UnknownRuleError`] instead of silently defaulting, since a wrong guess
//! would silently corrupt downstream root-dependency scores.

use ccgeval_grammar::{Category, CategoryParseError, Slash};
use thiserror::Error;

/// A node's category as annotated on a derivation, with the CCGbank `[conj]`
/// coordination marker split out (the marker is not a real feature and is
/// stripped before parsing). C&C's `[X]` variable-feature placeholder is
/// removed as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCategory {
    pub category: Category,
    pub conj: bool,
}

impl NodeCategory {
    pub fn parse(text: &str) -> Result<Self, CategoryParseError> {
        let trimmed = text.trim();
        let (body, conj) = match trimmed.strip_suffix("[conj]") {
            Some(body) => (body, true),
            None => (trimmed, false),
        };
        let body = body.replace("[X]", "");
        Ok(NodeCategory {
            category: Category::parse(&body)?,
            conj,
        })
    }

    pub fn from_category(category: Category) -> Self {
        NodeCategory {
            category,
            conj: false,
        }
    }

    /// Whether this node takes part in coordination: marked `[conj]`, carrying
    /// a `conj` feature, or the lexical conjunction category itself.
    pub fn is_conj(&self) -> bool {
        fn has_conj(c: &Category) -> bool {
            match c {
                Category::Atomic { base, feature } => {
                    base == "conj" || feature.as_deref() == Some("conj")
                }
                Category::Complex {
                    result, argument, ..
                } => has_conj(result) || has_conj(argument),
            }
        }
        self.conj || has_conj(&self.category)
    }

    /// Whether this is a punctuation category: a bracket atom (`LRB`, `RRB`,
    /// `LCB`, `RCB`) or an atom made of punctuation characters (`,`, `.`,
    /// `;`, `:`, ...). Complex categories never qualify, deliberately
    /// narrower than the substring test some tools apply: CCGbank annotates
    /// absorbed punctuation with atomic categories only, and a functor whose
    /// notation merely contains `/` or `\` must stay eligible as a functor.
    pub fn is_punctuation(&self) -> bool {
        fn punct_atom(base: &str) -> bool {
            matches!(base, "LRB" | "RRB" | "LCB" | "RCB")
                || (!base.is_empty() && base.chars().all(|c| c.is_ascii_punctuation()))
        }
        match &self.category {
            Category::Atomic { base, .. } => punct_atom(base),
            Category::Complex { .. } => false,
        }
    }
}

/// Category-shape pattern of a derivation step, the lookup key of the head
/// rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleShape {
    /// Left child is punctuation being absorbed.
    PunctuationLeft,
    /// Right child is punctuation being absorbed.
    PunctuationRight,
    /// A conjunction (or `[conj]`-marked left child) combining with the
    /// conjunct to its right.
    Coordination,
    /// A constituent absorbing a `[conj]`-marked sibling: `X X[conj] => X`.
    CoordinationCompletion,
    /// `X/Y Y => X`
    ForwardApplication,
    /// `Y X\Y => X`
    BackwardApplication,
    /// `X/Y Y/Z => X/Z`, including the degree-2 generalization.
    ForwardComposition,
    /// `Y\Z X\Y => X\Z`, including crossed and degree-2 variants.
    BackwardComposition,
    /// Forward functor shaped like an adjunct: `X/X` or `X/(X\Y)`.
    ForwardAdjunct,
    /// Backward functor shaped like an adjunct: `X\X` or `X\(X/Y)`.
    BackwardAdjunct,
    /// `Y/Z (X\Y)/Z => X/Z`
    BackwardCrossedSubstitution,
    /// Unary (single-child) step.
    Unary,
}

impl RuleShape {
    /// The designated functor child for shapes that have one.
    pub fn functor_side(&self) -> Option<ChildSide> {
        match self {
            RuleShape::ForwardApplication | RuleShape::ForwardComposition => Some(ChildSide::Left),
            RuleShape::BackwardApplication | RuleShape::BackwardComposition => {
                Some(ChildSide::Right)
            }
            _ => None,
        }
    }
}

/// Head-side selector stored in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadChoice {
    Left,
    Right,
    /// Same side as the step's designated functor child.
    Functor,
}

/// A resolved head side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadRule {
    pub shape: RuleShape,
    pub head: HeadChoice,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeadTableError {
    #[error("duplicate head rule for {shape:?}")]
    Duplicate { shape: RuleShape },
    #[error("{shape:?} has no designated functor child; use an explicit side")]
    NoFunctor { shape: RuleShape },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnknownRuleError {
    #[error("unrecognized rule shape: `{left}` `{right}` => `{parent}`")]
    Unclassified {
        parent: String,
        left: String,
        right: String,
    },
    #[error("no head rule for shape {shape:?}")]
    MissingRule { shape: RuleShape },
    #[error("ill-formed coordination `{left}` `{right}` => `{parent}`: {detail}")]
    IllFormedCoordination {
        parent: String,
        left: String,
        right: String,
        detail: &'static str,
    },
    #[error("punctuation pair `{left}` `{right}` does not project to parent `{parent}`")]
    PunctuationPair {
        parent: String,
        left: String,
        right: String,
    },
}

/// An explicit enumerated mapping from rule shape to head-side selector.
#[derive(Debug, Clone)]
pub struct HeadRuleTable {
    rules: Vec<HeadRule>,
}

impl HeadRuleTable {
    /// Validate and build a table: duplicate shapes are rejected, and
    /// [`HeadChoice::Functor`] is only allowed for shapes that designate a
    /// functor child.
    pub fn new(rules: Vec<HeadRule>) -> Result<Self, HeadTableError> {
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.shape == rule.shape) {
                return Err(HeadTableError::Duplicate { shape: rule.shape });
            }
            if rule.head == HeadChoice::Functor && rule.shape.functor_side().is_none() {
                return Err(HeadTableError::NoFunctor { shape: rule.shape });
            }
        }
        Ok(HeadRuleTable { rules })
    }

    /// The Lewis–Steedman (EMNLP 2014) head rules.
    pub fn ls14() -> Self {
        use HeadChoice::*;
        use RuleShape::*;
        HeadRuleTable::new(vec![
            HeadRule { shape: PunctuationLeft, head: Right },
            HeadRule { shape: PunctuationRight, head: Left },
            HeadRule { shape: Coordination, head: Right },
            HeadRule { shape: CoordinationCompletion, head: Left },
            HeadRule { shape: ForwardApplication, head: Functor },
            HeadRule { shape: BackwardApplication, head: Functor },
            HeadRule { shape: ForwardComposition, head: Functor },
            HeadRule { shape: BackwardComposition, head: Functor },
            HeadRule { shape: ForwardAdjunct, head: Right },
            HeadRule { shape: BackwardAdjunct, head: Left },
            HeadRule { shape: BackwardCrossedSubstitution, head: Right },
            HeadRule { shape: Unary, head: Left },
        ])
        .expect("builtin head rule table")
    }

    pub fn lookup(&self, shape: RuleShape) -> Option<HeadChoice> {
        self.rules
            .iter()
            .find(|rule| rule.shape == shape)
            .map(|rule| rule.head)
    }

    /// Resolve the head side for a shape, or fail with [`UnknownRuleError`].
    pub fn head_side(&self, shape: RuleShape) -> Result<ChildSide, UnknownRuleError> {
        match self.lookup(shape) {
            Some(HeadChoice::Left) => Ok(ChildSide::Left),
            Some(HeadChoice::Right) => Ok(ChildSide::Right),
            // `new` guarantees a functor side exists for Functor entries, but
            // tables can also be built literally; treat a gap as a miss.
            Some(HeadChoice::Functor) => shape
                .functor_side()
                .ok_or(UnknownRuleError::MissingRule { shape }),
            None => Err(UnknownRuleError::MissingRule { shape }),
        }
    }
}

fn parts(c: &Category) -> Option<(&Category, Slash, &Category)> {
    match c {
        Category::Complex {
            result,
            slash,
            argument,
        } => Some((result.as_ref(), *slash, argument.as_ref())),
        Category::Atomic { .. } => None,
    }
}

/// Classify a binary derivation step into a [`RuleShape`] from the shapes of
/// the children's categories. Functor-pattern matching works on
/// feature-stripped categories; the adjunct tests look at the annotated
/// (feature-bearing) functor, as in the source rule set.
pub fn classify(
    parent: &NodeCategory,
    left: &NodeCategory,
    right: &NodeCategory,
) -> Result<RuleShape, UnknownRuleError> {
    let unclassified = || UnknownRuleError::Unclassified {
        parent: parent.category.to_string(),
        left: left.category.to_string(),
        right: right.category.to_string(),
    };

    // Punctuation absorption comes first: punctuation categories never act as
    // functors here.
    let left_punct = left.is_punctuation();
    let right_punct = right.is_punctuation();
    if left_punct && right_punct {
        if parent.category == left.category {
            return Ok(RuleShape::PunctuationRight);
        }
        if parent.category == right.category {
            return Ok(RuleShape::PunctuationLeft);
        }
        return Err(UnknownRuleError::PunctuationPair {
            parent: parent.category.to_string(),
            left: left.category.to_string(),
            right: right.category.to_string(),
        });
    }
    if left_punct {
        return Ok(RuleShape::PunctuationLeft);
    }
    if right_punct {
        return Ok(RuleShape::PunctuationRight);
    }

    // Coordination. A conj-marked (or lexical conjunction) left child heads
    // the step to its conjunct; a conj-marked right child is absorbed by a
    // matching left sibling. Two conj children are only well-formed under a
    // conj parent, in which case the functor patterns below decide.
    let left_conj = left.is_conj();
    let right_conj = right.is_conj();
    if left_conj && !right_conj {
        return Ok(RuleShape::Coordination);
    }
    if right_conj && !left_conj {
        if left.category.equals(&parent.category, true) {
            return Ok(RuleShape::CoordinationCompletion);
        }
        return Err(UnknownRuleError::IllFormedCoordination {
            parent: parent.category.to_string(),
            left: left.category.to_string(),
            right: right.category.to_string(),
            detail: "conj-marked right child requires a matching left sibling",
        });
    }
    if left_conj && right_conj && !parent.is_conj() {
        return Err(UnknownRuleError::IllFormedCoordination {
            parent: parent.category.to_string(),
            left: left.category.to_string(),
            right: right.category.to_string(),
            detail: "two conj children must combine to a conj parent",
        });
    }

    let p = parent.category.strip_features();
    let l = left.category.strip_features();
    let r = right.category.strip_features();

    // Forward functor patterns: application, composition (incl. degree 2).
    if let Some((lres, Slash::Forward, larg)) = parts(&l) {
        let application = *lres == p && *larg == r;
        let composition = match (parts(&r), parts(&p)) {
            (Some((rres, Slash::Forward, rarg)), Some((pres, Slash::Forward, parg))) => {
                lres == pres && rarg == parg && larg == rres
            }
            _ => false,
        };
        let composition2 = match (parts(&r), parts(&p)) {
            (Some((rres, rs, rarg)), Some((pres, ps, parg))) if rs == ps => {
                match (parts(rres), parts(pres)) {
                    (
                        Some((rres2, Slash::Forward, rarg2)),
                        Some((pres2, Slash::Forward, parg2)),
                    ) => {
                        lres == pres2 && rarg == parg && rarg2 == parg2 && larg == rres2
                    }
                    _ => false,
                }
            }
            _ => false,
        };

        if application || composition || composition2 {
            if forward_adjunct(&left.category) {
                return Ok(RuleShape::ForwardAdjunct);
            }
            return Ok(if application {
                RuleShape::ForwardApplication
            } else {
                RuleShape::ForwardComposition
            });
        }

        // Backward crossed substitution: Y/Z (X\Y)/Z => X/Z.
        if let (
            Some((rres, Slash::Forward, rarg)),
            Some((pres, Slash::Forward, parg)),
        ) = (parts(&r), parts(&p))
        {
            if larg == parg && rarg == parg {
                if let Some((rres2, Slash::Backward, rarg2)) = parts(rres) {
                    if rarg2 == lres && rres2 == pres {
                        return Ok(RuleShape::BackwardCrossedSubstitution);
                    }
                }
            }
        }
    }

    // Backward functor patterns.
    if let Some((rres, Slash::Backward, rarg)) = parts(&r) {
        let application = *rres == p && *rarg == l;
        let composition = match (parts(&l), parts(&p)) {
            (Some((lres, ls, larg)), Some((pres, ps, parg))) if ls == ps => {
                rres == pres && larg == parg && rarg == lres
            }
            _ => false,
        };
        let composition2 = match (parts(&l), parts(&p)) {
            (Some((lres, ls, larg)), Some((pres, ps, parg))) if ls == ps => {
                match (parts(lres), parts(pres)) {
                    (
                        Some((lres2, Slash::Forward, larg2)),
                        Some((pres2, Slash::Forward, parg2)),
                    ) => {
                        rres == pres2 && larg == parg && larg2 == parg2 && rarg == lres2
                    }
                    _ => false,
                }
            }
            _ => false,
        };

        if application || composition || composition2 {
            if backward_adjunct(&right.category) {
                return Ok(RuleShape::BackwardAdjunct);
            }
            return Ok(if application {
                RuleShape::BackwardApplication
            } else {
                RuleShape::BackwardComposition
            });
        }
    }

    Err(unclassified())
}

/// `X/X` or `X/(X\Y)` — a forward functor that modifies rather than selects.
fn forward_adjunct(functor: &Category) -> bool {
    match parts(functor) {
        Some((result, Slash::Forward, argument)) => {
            result == argument
                || matches!(
                    parts(argument),
                    Some((ares, Slash::Backward, _)) if ares == result
                )
        }
        _ => false,
    }
}

/// `X\X` or `X\(X/Y)`.
fn backward_adjunct(functor: &Category) -> bool {
    match parts(functor) {
        Some((result, Slash::Backward, argument)) => {
            result == argument
                || matches!(
                    parts(argument),
                    Some((ares, Slash::Forward, _)) if ares == result
                )
        }
        _ => false,
    }
}
