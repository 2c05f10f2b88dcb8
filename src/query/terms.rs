// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Parsed query terms and their tsquery rendering.

use std::fmt;

/// How a term combines with the term before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOperator {
    And,
    Or,
}

impl TermOperator {
    /// tsquery operator symbol
    pub fn symbol(self) -> char {
        match self {
            TermOperator::And => '&',
            TermOperator::Or => '|',
        }
    }
}

/// A bare word or a quoted phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermText {
    Word(String),
    /// Words of a quoted phrase, matched as a conjunction
    Phrase(Vec<String>),
}

/// One term of a translated query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    pub operator: TermOperator,
    pub negated: bool,
    pub text: TermText,
}

impl QueryTerm {
    pub fn word(operator: TermOperator, negated: bool, word: impl Into<String>) -> Self {
        Self {
            operator,
            negated,
            text: TermText::Word(word.into()),
        }
    }

    pub fn phrase<I, S>(operator: TermOperator, negated: bool, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operator,
            negated,
            text: TermText::Phrase(words.into_iter().map(Into::into).collect()),
        }
    }
}

impl fmt::Display for QueryTerm {
    /// The term alone, without its operator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!")?;
        }
        match self.text {
            TermText::Word(ref word) => write_lexeme(f, word),
            TermText::Phrase(ref words) => {
                write!(f, "(")?;
                for (i, word) in words.iter().enumerate() {
                    if i > 0 {
                        write!(f, "&")?;
                    }
                    write_lexeme(f, word)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Words with an apostrophe become quoted lexemes, `don't` -> `'don''t'`.
fn write_lexeme(f: &mut fmt::Formatter<'_>, word: &str) -> fmt::Result {
    if word.contains('\'') {
        write!(f, "'{}'", word.replace('\'', "''"))
    } else {
        write!(f, "{}", word)
    }
}
