//! Category types and parser.
//!
//! The surface notation is CCGbank's bracketed slash notation in Steedman
//! order: an atom is a base symbol with an optional bracketed feature
//! (`S[dcl]`, `NP`, `,`), and a complex category is `result/argument` or
//! `result\argument` with parentheses grouping subcategories. Unparenthesized
//! slash chains associate to the left, so `N/N/N` reads as `(N/N)/N`.
//!
//! `Display` always emits the fully parenthesized form, so for every category
//! `c`, `Category::parse(&c.to_string())` reconstructs `c` exactly.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char as pchar,
    combinator::{all_consuming, opt},
    multi::many0,
    sequence::{delimited, pair},
    IResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slash direction of a complex category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slash {
    /// `/` — the argument is sought to the right.
    Forward,
    /// `\` — the argument is sought to the left.
    Backward,
}

impl fmt::Display for Slash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slash::Forward => write!(f, "/"),
            Slash::Backward => write!(f, "\\"),
        }
    }
}

/// An argument position within a category, numbered outward-to-inward:
/// slot 1 is the outermost argument. Slots are derived on demand from a
/// category and never stored independently of one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Slot(pub usize);

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A CCG category: either an atom with an optional feature annotation, or a
/// directional function from an argument category to a result category.
///
/// Derived `PartialEq`/`Eq`/`Hash` give full structural equality (features
/// included); use [`Category::equals`] with `strip_features = true` for the
/// feature-insensitive coarsening.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum Category {
    Atomic {
        base: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feature: Option<String>,
    },
    Complex {
        result: Box<Category>,
        slash: Slash,
        argument: Box<Category>,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CategoryParseError {
    #[error("empty category")]
    Empty,
    #[error("unbalanced bracket in `{text}` at byte {offset}")]
    Unbalanced { text: String, offset: usize },
    #[error("malformed feature annotation in `{text}`")]
    Feature { text: String },
    #[error("unknown slash symbol `{symbol}` in `{text}`")]
    UnknownSlash { text: String, symbol: char },
    #[error("malformed category `{text}`")]
    Malformed { text: String },
}

/// How a functor's expected argument is compared against the actual argument
/// during combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Full structural equality, features included.
    Exact,
    /// Feature-stripped equality at every node.
    StripFeatures,
}

/// The outcome of a (possibly lenient) combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combined {
    pub category: Category,
    /// True when the argument did not match the functor's expectation but the
    /// combination was allowed to proceed in lenient mode.
    pub mismatched: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombineError {
    #[error("category `{0}` is not a functor")]
    NotAFunctor(String),
    #[error("functor `{functor}` expects its argument in the {expected} direction")]
    WrongDirection { functor: String, expected: Slash },
    #[error("functor `{functor}` expects argument `{expected}`, got `{found}`")]
    ArgumentMismatch {
        functor: String,
        expected: String,
        found: String,
    },
}

impl Category {
    /// Construct an atomic category.
    pub fn atomic(base: impl Into<String>, feature: Option<&str>) -> Self {
        Category::Atomic {
            base: base.into(),
            feature: feature.map(str::to_string),
        }
    }

    /// Construct a complex category from owned parts.
    pub fn complex(result: Category, slash: Slash, argument: Category) -> Self {
        Category::Complex {
            result: Box::new(result),
            slash,
            argument: Box::new(argument),
        }
    }

    /// Parse bracketed slash notation into a category tree.
    pub fn parse(text: &str) -> Result<Self, CategoryParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CategoryParseError::Empty);
        }
        pre_scan(trimmed)?;
        match all_consuming(category_expr)(trimmed) {
            Ok((_, category)) => Ok(category),
            Err(_) => Err(CategoryParseError::Malformed {
                text: trimmed.to_string(),
            }),
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Category::Atomic { .. })
    }

    pub fn is_complex(&self) -> bool {
        !self.is_atomic()
    }

    /// Structural comparison; with `strip_features` every node's feature
    /// annotation is ignored. Full equality implies feature-stripped equality.
    pub fn equals(&self, other: &Category, strip_features: bool) -> bool {
        if !strip_features {
            return self == other;
        }
        match (self, other) {
            (Category::Atomic { base: a, .. }, Category::Atomic { base: b, .. }) => a == b,
            (
                Category::Complex {
                    result: ra,
                    slash: sa,
                    argument: aa,
                },
                Category::Complex {
                    result: rb,
                    slash: sb,
                    argument: ab,
                },
            ) => sa == sb && ra.equals(rb, true) && aa.equals(ab, true),
            _ => false,
        }
    }

    /// The feature-stripped normal form, used as a grouping key wherever two
    /// categories should be treated as "the same" modulo features.
    pub fn strip_features(&self) -> Category {
        match self {
            Category::Atomic { base, .. } => Category::Atomic {
                base: base.clone(),
                feature: None,
            },
            Category::Complex {
                result,
                slash,
                argument,
            } => Category::Complex {
                result: Box::new(result.strip_features()),
                slash: *slash,
                argument: Box::new(argument.strip_features()),
            },
        }
    }

    /// The number of arguments this category takes before reaching its target.
    pub fn arity(&self) -> usize {
        match self {
            Category::Atomic { .. } => 0,
            Category::Complex { result, .. } => result.arity() + 1,
        }
    }

    /// The innermost result atom (the category itself if atomic).
    pub fn target(&self) -> &Category {
        match self {
            Category::Atomic { .. } => self,
            Category::Complex { result, .. } => result.target(),
        }
    }

    /// Argument positions, outward-to-inward: slot 1 is the outermost
    /// argument.
    pub fn slots(&self) -> impl Iterator<Item = Slot> {
        (1..=self.arity()).map(Slot)
    }

    /// The argument category filling the given slot (slot 1 = outermost), or
    /// `None` if the slot exceeds the arity.
    pub fn argument_at(&self, slot: Slot) -> Option<&Category> {
        match self {
            Category::Atomic { .. } => None,
            Category::Complex {
                result, argument, ..
            } => {
                if slot.0 == 1 {
                    Some(argument)
                } else {
                    result.argument_at(Slot(slot.0.checked_sub(1)?))
                }
            }
        }
    }

    /// Apply this category, as a functor, to `argument` in the given
    /// direction, producing the result category.
    ///
    /// `policy` controls how the expected argument is compared. A mismatched
    /// argument under `lenient = true` still produces the functor's result
    /// category, flagged via [`Combined::mismatched`]; a non-functor or a
    /// functor pointing the other way is always an error. Inputs are never
    /// mutated.
    pub fn combine(
        &self,
        argument: &Category,
        direction: Slash,
        policy: MatchPolicy,
        lenient: bool,
    ) -> Result<Combined, CombineError> {
        let Category::Complex {
            result,
            slash,
            argument: expected,
        } = self
        else {
            return Err(CombineError::NotAFunctor(self.to_string()));
        };
        if *slash != direction {
            return Err(CombineError::WrongDirection {
                functor: self.to_string(),
                expected: *slash,
            });
        }
        let matches = match policy {
            MatchPolicy::Exact => expected.as_ref() == argument,
            MatchPolicy::StripFeatures => expected.equals(argument, true),
        };
        if matches {
            Ok(Combined {
                category: (**result).clone(),
                mismatched: false,
            })
        } else if lenient {
            Ok(Combined {
                category: (**result).clone(),
                mismatched: true,
            })
        } else {
            Err(CombineError::ArgumentMismatch {
                functor: self.to_string(),
                expected: expected.to_string(),
                found: argument.to_string(),
            })
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn child(f: &mut fmt::Formatter<'_>, c: &Category) -> fmt::Result {
            if c.is_complex() {
                write!(f, "({c})")
            } else {
                write!(f, "{c}")
            }
        }

        match self {
            Category::Atomic { base, feature } => {
                write!(f, "{base}")?;
                if let Some(feature) = feature {
                    write!(f, "[{feature}]")?;
                }
                Ok(())
            }
            Category::Complex {
                result,
                slash,
                argument,
            } => {
                child(f, result)?;
                write!(f, "{slash}")?;
                child(f, argument)
            }
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Reject the error cases nom would only report as a generic failure:
/// unbalanced parentheses, dangling feature brackets, and slash symbols
/// outside `/` and `\`.
fn pre_scan(text: &str) -> Result<(), CategoryParseError> {
    let mut paren_stack: Vec<usize> = Vec::new();
    let mut feature_open: Option<usize> = None;
    for (offset, ch) in text.char_indices() {
        match ch {
            '(' => paren_stack.push(offset),
            ')' => {
                if paren_stack.pop().is_none() {
                    return Err(CategoryParseError::Unbalanced {
                        text: text.to_string(),
                        offset,
                    });
                }
            }
            '[' => {
                if feature_open.is_some() {
                    return Err(CategoryParseError::Feature {
                        text: text.to_string(),
                    });
                }
                feature_open = Some(offset);
            }
            ']' => {
                if feature_open.take().is_none() {
                    return Err(CategoryParseError::Feature {
                        text: text.to_string(),
                    });
                }
            }
            '|' => {
                return Err(CategoryParseError::UnknownSlash {
                    text: text.to_string(),
                    symbol: ch,
                });
            }
            _ => {}
        }
    }
    if let Some(offset) = paren_stack.pop() {
        return Err(CategoryParseError::Unbalanced {
            text: text.to_string(),
            offset,
        });
    }
    if feature_open.is_some() {
        return Err(CategoryParseError::Feature {
            text: text.to_string(),
        });
    }
    Ok(())
}

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '/' | '\\' | '(' | ')' | '[' | ']' | '|')
}

fn is_feature_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

fn atom(input: &str) -> IResult<&str, Category> {
    let (input, base) = take_while1(is_atom_char)(input)?;
    let (input, feature) = opt(delimited(
        pchar('['),
        take_while1(is_feature_char),
        pchar(']'),
    ))(input)?;
    Ok((
        input,
        Category::Atomic {
            base: base.to_string(),
            feature: feature.map(str::to_string),
        },
    ))
}

fn slash(input: &str) -> IResult<&str, Slash> {
    let (input, c) = alt((pchar('/'), pchar('\\')))(input)?;
    let slash = if c == '/' {
        Slash::Forward
    } else {
        Slash::Backward
    };
    Ok((input, slash))
}

fn element(input: &str) -> IResult<&str, Category> {
    alt((delimited(pchar('('), category_expr, pchar(')')), atom))(input)
}

fn category_expr(input: &str) -> IResult<&str, Category> {
    let (input, first) = element(input)?;
    let (input, rest) = many0(pair(slash, element))(input)?;
    let category = rest.into_iter().fold(first, |result, (slash, argument)| {
        Category::complex(result, slash, argument)
    });
    Ok((input, category))
}
