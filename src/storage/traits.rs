use async_trait::async_trait;
use thiserror::Error;

use crate::sql::Statement;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Storage connection error: {0}")]
    Connection(String),
}

impl StorageError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }
}

/// A column as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// PostgreSQL type name, e.g. `tsvector`, `text`, `int4`
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    pub fn is_tsvector(&self) -> bool {
        self.data_type.eq_ignore_ascii_case("tsvector")
    }
}

/// What the engine needs from the database: catalog reads and statement
/// execution.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Columns of `table`, empty when the table does not exist.
    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, StorageError>;

    /// Execute a statement, returning the number of affected rows.
    async fn execute(&self, statement: &Statement) -> Result<u64, StorageError>;

    /// Execute statements in one transaction, serialized against every other
    /// caller using the same `lock` key (in any process). Nothing is applied
    /// when one statement fails.
    async fn execute_atomic(&self, lock: &str, statements: &[Statement]) -> Result<u64, StorageError>;

    /// Column names only.
    async fn column_names(&self, table: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .columns(table)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }
}
