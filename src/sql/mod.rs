// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Structured SQL
//!
//! Every statement the engine sends to PostgreSQL is first assembled as a
//! small tree (selection list, FROM list, predicate tree, ordering list) and
//! serialized exactly once by [`Statement::to_sql`].
//!
//! # Placeholders
//!
//! Fragments are written with `?` placeholders and carry their own parameter
//! list. Serialization renumbers them to PostgreSQL `$n` positions in textual
//! order, so fragments from different sources (the search builder, a caller's
//! filter) compose without coordinating indices:
//!
//! ```rust
//! use tsearch_engine::sql::{Fragment, Predicate, Select, SqlParam, Statement};
//!
//! let select = Select {
//!     selection: vec![Fragment::raw("posts.*")],
//!     from: vec![Fragment::raw("posts")],
//!     predicate: Some(Predicate::and(vec![
//!         Predicate::fragment(Fragment::new("posts.author = ?", vec!["ann".into()])),
//!         Predicate::fragment(Fragment::new("posts.year > ?", vec![SqlParam::Int(2020)])),
//!     ])),
//!     ..Default::default()
//! };
//!
//! let query = Statement::Select(select).to_sql();
//! assert_eq!(
//!     query.sql,
//!     "SELECT posts.* FROM posts WHERE posts.author = $1 AND posts.year > $2"
//! );
//! assert_eq!(query.params.len(), 2);
//! ```
//!
//! A literal `?` (e.g. the jsonb operator) is written as `??`. Question marks
//! inside single-quoted literals are left alone.
//!
//! # Escaping
//!
//! User-controlled text never reaches the SQL string: it travels as a
//! [`SqlParam`]. Configuration text that must be inlined (locale names inside
//! trigger bodies) goes through [`quote_literal`], and every identifier is
//! checked with [`is_identifier`] or [`is_column_reference`] at registration.

mod statement;

pub use statement::{
    Ddl, Fragment, IndexMethod, Predicate, Select, SqlParam, SqlQuery, Statement, TriggerTiming,
    Update,
};

/// PostgreSQL truncates identifiers longer than this.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Quote a string as a SQL literal, doubling embedded single quotes.
///
/// ```rust
/// use tsearch_engine::sql::quote_literal;
/// assert_eq!(quote_literal("english"), "'english'");
/// assert_eq!(quote_literal("o'neil"), "'o''neil'");
/// ```
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Whether `name` is a plain, unquoted SQL identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    name.len() <= MAX_IDENTIFIER_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `reference` is `column` or `table.column`.
pub fn is_column_reference(reference: &str) -> bool {
    match reference.split_once('.') {
        Some((table, column)) => is_identifier(table) && is_identifier(column),
        None => is_identifier(reference),
    }
}
