//! Dependency tuples, word tokens, and sentence roots.
//!
//! "Token" here means a unique occurrence of a word in a sentence (the
//! type-token distinction), addressed by its 1-based position. The textual
//! forms (`word_index`, `word_index category`) are the ones used by `.deps`
//! and `.roots` files.

use std::fmt;
use std::str::FromStr;

use ccgeval_grammar::{Category, CategoryParseError, Slot};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A word occurrence: surface form plus 1-based sentence position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordToken {
    pub word: String,
    pub index: usize,
}

impl WordToken {
    pub fn new(word: impl Into<String>, index: usize) -> Self {
        WordToken {
            word: word.into(),
            index,
        }
    }
}

impl fmt::Display for WordToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.word, self.index)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenParseError {
    #[error("word token `{0}` is missing its `_index` suffix")]
    MissingIndex(String),
    #[error("word token `{0}` has a non-numeric index")]
    BadIndex(String),
}

impl FromStr for WordToken {
    type Err = TokenParseError;

    /// Parse `word_index`. The word itself may contain underscores, so the
    /// index is taken from the last `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (word, index) = s
            .rsplit_once('_')
            .ok_or_else(|| TokenParseError::MissingIndex(s.to_string()))?;
        let index = index
            .parse::<usize>()
            .map_err(|_| TokenParseError::BadIndex(s.to_string()))?;
        Ok(WordToken::new(word, index))
    }
}

/// One predicate-argument dependency.
///
/// Tuples are not unique within a sentence: duplicates are meaningful and the
/// per-sentence collection is a multiset. `rule_id` is provenance only and
/// never participates in scoring equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTuple {
    pub pred: WordToken,
    pub category: Category,
    pub slot: Slot,
    pub arg: WordToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

/// The lexical head of a whole sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    pub token: WordToken,
    pub category: Category,
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.token, self.category)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RootParseError {
    #[error("root line `{0}` must be `word_index category` or `None`")]
    Fields(String),
    #[error(transparent)]
    Token(#[from] TokenParseError),
    #[error(transparent)]
    Category(#[from] CategoryParseError),
}

impl Root {
    /// Parse one `.roots` line: `word_index category`, or the literal `None`
    /// for a sentence without a derivable root.
    pub fn parse_line(line: &str) -> Result<Option<Root>, RootParseError> {
        let line = line.trim();
        if line == "None" {
            return Ok(None);
        }
        let (token, category) = line
            .split_once(' ')
            .ok_or_else(|| RootParseError::Fields(line.to_string()))?;
        Ok(Some(Root {
            token: token.parse()?,
            category: Category::parse(category)?,
        }))
    }
}

/// One sentence's worth of scoring input on one side (gold or system).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceDeps {
    pub deps: Vec<DependencyTuple>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<Root>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_token_round_trips_with_underscores_in_word() {
        let token: WordToken = "vice_versa_7".parse().expect("parse token");
        assert_eq!(token, WordToken::new("vice_versa", 7));
        assert_eq!(token.to_string(), "vice_versa_7");
    }

    #[test]
    fn word_token_rejects_bad_forms() {
        assert!(matches!(
            "word".parse::<WordToken>(),
            Err(TokenParseError::MissingIndex(_))
        ));
        assert!(matches!(
            "word_x".parse::<WordToken>(),
            Err(TokenParseError::BadIndex(_))
        ));
    }

    #[test]
    fn root_line_round_trips() {
        let root = Root::parse_line(r"joined_3 (S[dcl]\NP)/NP")
            .expect("parse root")
            .expect("root present");
        assert_eq!(root.token, WordToken::new("joined", 3));
        assert_eq!(root.to_string(), r"joined_3 (S[dcl]\NP)/NP");
        assert_eq!(Root::parse_line("None").expect("parse none"), None);
    }
}
