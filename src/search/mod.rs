// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Full-text search statements
//!
//! # Flow
//!
//! ```text
//! search string
//!     ↓ QueryTranslator
//! tsquery text (bound parameter)
//!     ↓ SearchQueryBuilder
//! Select (rank, headlines, caller filter AND vector @@ query)
//!     ↓ Statement::to_sql
//! PostgreSQL text with $n placeholders
//! ```
//!
//! # Example
//!
//! ```rust
//! use tsearch_engine::config::{FieldsConfig, TableConfig, VectorConfig};
//! use tsearch_engine::search::{Filter, SearchOptions, SearchQueryBuilder, SearchRequest};
//! use tsearch_engine::spec::{SchemaSnapshot, TableSearch, VectorDefaults};
//! use tsearch_engine::sql::Statement;
//!
//! let schema = SchemaSnapshot::new().with_table("posts", ["id", "title", "body", "draft"]);
//! let search = TableSearch::new(
//!     "posts",
//!     TableConfig::from(VectorConfig::new(FieldsConfig::list(["title", "body"]))),
//!     &VectorDefaults::default(),
//!     &schema,
//! ).unwrap();
//!
//! let select = SearchQueryBuilder::build(
//!     &search,
//!     "vectors",
//!     "rust -java",
//!     SearchRequest::new().filter(Filter::raw("NOT posts.draft")).limit(20),
//!     &SearchOptions::default().headline("body"),
//! ).unwrap();
//!
//! let query = Statement::from(select).to_sql();
//! assert!(query.sql.contains("WHERE (NOT posts.draft) AND posts.vectors @@ tsearch_query"));
//! ```

mod builder;

pub use builder::{
    Filter, SearchOptions, SearchQueryBuilder, SearchRequest, QUERY_ALIAS, RANK_ALIAS,
};
