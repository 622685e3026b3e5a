//! CCG category algebra
//!
//! This crate defines the typed representation of Combinatory Categorial
//! Grammar categories and the operations the evaluation pipeline needs:
//!
//! - parsing bracketed slash notation (e.g. `(S[dcl]\NP)/NP`) into a closed
//!   `Atomic`/`Complex` tree,
//! - structural equality with an optional feature-stripped coarsening,
//! - argument-slot addressing (slot 1 = outermost argument), and
//! - function application (`combine`) with strict and lenient mismatch modes.
//!
//! Categories are immutable: they are constructed once by parsing and every
//! operation that "changes" a category produces a fresh value.

pub mod category;

pub use category::{
    Category, CategoryParseError, Combined, CombineError, MatchPolicy, Slash, Slot,
};
