//! Property-based tests (fuzzing) for search string and SQL handling.
//!
//! Uses proptest to generate random/malformed search strings and verify the
//! translator never panics, only returns clean errors, and that statement
//! serialization keeps placeholders and parameters aligned.
//!
//! Run with: `cargo test --test proptest_fuzz`

use proptest::prelude::*;

use tsearch_engine::config::{FieldsConfig, VectorConfig};
use tsearch_engine::search::{SearchOptions, SearchQueryBuilder, SearchRequest};
use tsearch_engine::spec::{SchemaSnapshot, TableSearch, VectorDefaults};
use tsearch_engine::sql::{quote_literal, Fragment, Predicate, Select, SqlParam, Statement};
use tsearch_engine::{QueryError, QueryTranslator, SearchError, TableConfig};

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Plain lower-case words, never the `or`/`and` keywords
fn plain_word_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,10}".prop_filter("operator keyword", |w| w != "or" && w != "and")
}

/// Search strings made of operators, quotes and punctuation only
fn punctuation_only_strategy() -> impl Strategy<Value = String> {
    "[ \\-+'\"!?.,;:()&|*]{0,40}"
}

/// Search-ish strings: words mixed with operators and stray syntax
fn search_string_strategy() -> impl Strategy<Value = String> {
    let token = prop_oneof![
        "[a-zA-Z0-9]{1,8}",
        Just("-".to_string()),
        Just("+".to_string()),
        Just("\"".to_string()),
        Just("'".to_string()),
        Just("or".to_string()),
        Just("and".to_string()),
        Just("OR -".to_string()),
        "[!-/:-@]{1,3}",
    ];
    prop::collection::vec(token, 0..12).prop_map(|tokens| tokens.join(" "))
}

fn posts_search() -> TableSearch {
    let schema = SchemaSnapshot::new().with_table("posts", ["id", "title", "body"]);
    TableSearch::new(
        "posts",
        TableConfig::from(VectorConfig::new(FieldsConfig::list(["title", "body"]))),
        &VectorDefaults::default(),
        &schema,
    )
    .unwrap()
}

// =============================================================================
// Translator Fuzz Tests
// =============================================================================

proptest! {
    /// Translation should never panic on arbitrary input
    #[test]
    fn fuzz_translate_arbitrary_text(raw in ".*") {
        match QueryTranslator::translate(&raw) {
            Ok(tsquery) => prop_assert!(!tsquery.is_empty()),
            Err(QueryError::Empty) => {}
        }
    }

    /// Structured search strings should either translate to whitespace-free
    /// tsquery text or report an empty query
    #[test]
    fn fuzz_translate_search_syntax(raw in search_string_strategy()) {
        if let Ok(tsquery) = QueryTranslator::translate(&raw) {
            prop_assert!(!tsquery.chars().any(char::is_whitespace), "tsquery: {}", tsquery);
            prop_assert!(!tsquery.starts_with('&') && !tsquery.starts_with('|'));
        }
    }

    /// Strings without any word characters translate to nothing
    #[test]
    fn prop_punctuation_only_is_empty(raw in punctuation_only_strategy()) {
        prop_assert_eq!(QueryTranslator::translate(&raw), Err(QueryError::Empty));
    }

    /// Plain words are AND-ed together, lower-cased
    #[test]
    fn prop_plain_words_are_anded(words in prop::collection::vec(plain_word_strategy(), 1..8)) {
        let raw = words.iter().map(|w| w.to_uppercase()).collect::<Vec<_>>().join("  ");
        let expected = words.join("&");
        prop_assert_eq!(QueryTranslator::translate(&raw).unwrap(), expected);
    }
}

// =============================================================================
// Cleaning Invariant Tests
// =============================================================================

proptest! {
    /// Cleaning twice is the same as cleaning once
    #[test]
    fn prop_clean_idempotent(raw in "[\\x20-\\x7E]{0,80}") {
        let once = QueryTranslator::clean(&raw);
        let twice = QueryTranslator::clean(&once);
        prop_assert_eq!(once, twice);
    }

    /// Cleaned output is trimmed, single-spaced, and limited to word
    /// characters plus the operator set
    #[test]
    fn prop_clean_output_charset(raw in "[\\x20-\\x7E]{0,80}") {
        let cleaned = QueryTranslator::clean(&raw);
        prop_assert_eq!(cleaned.trim(), cleaned.as_str());
        prop_assert!(!cleaned.contains("  "));
        for c in cleaned.chars() {
            prop_assert!(
                c.is_ascii_lowercase()
                    || c.is_ascii_digit()
                    || matches!(c, '_' | '-' | '+' | '\'' | '"' | ' '),
                "unexpected {:?} in {:?}", c, cleaned
            );
        }
    }
}

// =============================================================================
// SQL Serialization Tests
// =============================================================================

proptest! {
    /// Placeholders are numbered in order and match the parameter count
    #[test]
    fn prop_placeholders_match_params(values in prop::collection::vec(any::<i64>(), 1..20)) {
        let predicate = Predicate::and(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    Predicate::fragment(Fragment::new(format!("c{} = ?", i), vec![SqlParam::Int(*v)]))
                })
                .collect(),
        );
        let select = Select {
            selection: vec![Fragment::raw("*")],
            from: vec![Fragment::raw("posts")],
            predicate: Some(predicate),
            ..Default::default()
        };

        let query = Statement::from(select).to_sql();
        prop_assert_eq!(query.params.len(), values.len());
        prop_assert!(!query.sql.contains('?'));
        for i in 1..=values.len() {
            let placeholder = format!("${}", i);
            prop_assert!(query.sql.contains(&placeholder), "missing {}", placeholder);
        }
    }

    /// Quoted literals always balance their quotes
    #[test]
    fn prop_quote_literal_balanced(value in ".*") {
        let quoted = quote_literal(&value);
        prop_assert!(quoted.starts_with('\'') && quoted.ends_with('\''));
        prop_assert_eq!(quoted.matches('\'').count() % 2, 0);
    }

    /// User text reaches a search statement only as a bound parameter
    #[test]
    fn prop_search_text_never_inlined(raw in search_string_strategy()) {
        let search = posts_search();
        match SearchQueryBuilder::build(&search, "vectors", &raw, SearchRequest::new(), &SearchOptions::default()) {
            Ok(select) => {
                let query = Statement::from(select).to_sql();
                let tsquery = QueryTranslator::translate(&raw).unwrap();
                prop_assert!(query.params.contains(&SqlParam::Text(tsquery)));
                prop_assert!(!query.sql.contains('\''));
            }
            Err(err) => prop_assert!(matches!(err, SearchError::EmptyQuery)),
        }
    }
}
