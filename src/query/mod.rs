// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search string translation
//!
//! User input is cleaned, split into terms (optionally prefixed with `+`,
//! `-`, `or`, `and`) and rendered as a boolean tsquery expression. The result
//! is always passed to `to_tsquery` as a bound parameter.
//!
//! ```rust
//! use tsearch_engine::query::QueryTranslator;
//!
//! assert_eq!(QueryTranslator::translate("rust -\"garbage collector\"").unwrap(), "rust&!(garbage&collector)");
//! assert!(QueryTranslator::translate("  ").is_err());
//! ```
//!
//! Quoted phrases match their words anywhere in the document, not adjacently.

mod terms;
mod translator;

pub use terms::{QueryTerm, TermOperator, TermText};
pub use translator::QueryTranslator;
