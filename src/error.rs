// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types.
//!
//! - [`ConfigError`]: malformed vector configuration, fatal at registration.
//! - [`QueryError`]: a search string that translates to nothing.
//! - [`SearchError`]: per-request failures surfaced to the caller.
//!
//! Storage failures are [`StorageError`](crate::storage::StorageError). Schema
//! provisioning failures are logged and swallowed by the
//! [`IndexMaintainer`](crate::vector::IndexMaintainer) rather than returned.

use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Up to 4 weighted field groups (a, b, c, d) are supported, got {count}")]
    TooManyWeightClasses { count: usize },

    #[error("Unknown weight class '{0}' (expected one of a, b, c, d)")]
    UnknownWeightClass(String),

    #[error("Invalid field specification: {0}")]
    InvalidFieldSpec(String),

    #[error("Invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Missing fields: {} in search definition for table {table}", .fields.join(","))]
    MissingFields { table: String, fields: Vec<String> },

    #[error("Column '{column}' references table '{table}', which is neither the owning table nor a joined table")]
    UnknownJoinTable { column: String, table: String },

    #[error("Failed to parse search configuration: {0}")]
    Parse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Search string is empty")]
    Empty,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Table '{0}' has no registered search configuration")]
    UnknownTable(String),

    #[error("Vector '{vector}' is not declared for table '{table}'")]
    UnknownVector { table: String, vector: String },

    #[error("Couldn't search without a search string")]
    EmptyQuery,

    #[error("Invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<QueryError> for SearchError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Empty => SearchError::EmptyQuery,
        }
    }
}
