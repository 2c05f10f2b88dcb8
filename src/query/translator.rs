// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Google-style search strings to tsquery text.
//!
//! ```text
//! hello world          hello&world
//! hello or world       hello|world
//! "hello world"        (hello&world)
//! -hello               !hello
//! cat -"hot dog"       cat&!(hot&dog)
//! ```

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use super::terms::{QueryTerm, TermOperator, TermText};
use crate::error::QueryError;

/// Runs of characters that are neither word characters nor `- + ' "`.
fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[^\w\-+'"]+"#).expect("static regex"))
}

/// Optional prefix, then a quoted phrase or a bare word.
fn term_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\+|or -?|and -?|-)?("[^"]*"?|[\w-]+)"#).expect("static regex"))
}

fn phrase_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\w']+").expect("static regex"))
}

/// Search string translator
pub struct QueryTranslator;

impl QueryTranslator {
    /// Collapse disallowed characters to single spaces, trim, lower-case.
    pub fn clean(raw: &str) -> String {
        disallowed().replace_all(raw, " ").trim().to_lowercase()
    }

    /// Parse an already cleaned string into terms.
    pub fn terms(cleaned: &str) -> Vec<QueryTerm> {
        let mut terms = Vec::new();

        for caps in term_pattern().captures_iter(cleaned) {
            let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let body = match caps.get(2) {
                Some(m) => m.as_str(),
                None => continue,
            };

            let operator = if prefix.contains("or") {
                TermOperator::Or
            } else {
                TermOperator::And
            };
            let negated = prefix.contains('-');

            let text = if body.starts_with('"') {
                let words: Vec<String> = phrase_word()
                    .find_iter(body)
                    .map(|m| m.as_str().to_string())
                    .collect();
                if words.is_empty() {
                    continue;
                }
                TermText::Phrase(words)
            } else {
                let word = body.trim_matches('-');
                if word.is_empty() {
                    continue;
                }
                TermText::Word(word.to_string())
            };

            terms.push(QueryTerm {
                operator,
                negated,
                text,
            });
        }

        terms
    }

    /// Join terms with their operators. The first term's operator is dropped.
    pub fn render(terms: &[QueryTerm]) -> String {
        let mut out = String::new();
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                out.push(term.operator.symbol());
            }
            out.push_str(&term.to_string());
        }
        out
    }

    /// Translate a raw search string into tsquery text.
    pub fn translate(raw: &str) -> Result<String, QueryError> {
        let cleaned = Self::clean(raw);
        if cleaned.is_empty() {
            return Err(QueryError::Empty);
        }

        let terms = Self::terms(&cleaned);
        if terms.is_empty() {
            return Err(QueryError::Empty);
        }

        let rendered = Self::render(&terms);
        debug!(raw = %raw, tsquery = %rendered, terms = terms.len(), "Translated search string");
        Ok(rendered)
    }
}
