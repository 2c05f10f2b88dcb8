// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory schema store.
//!
//! Tracks table columns, applies `ADD COLUMN`/`DROP COLUMN` to them, records
//! every executed statement and can be told to fail statements matching a
//! pattern. Used to test provisioning without a database.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::traits::{ColumnInfo, SchemaStore, StorageError};
use crate::sql::{Ddl, Statement};

pub struct MemoryStore {
    tables: DashMap<String, Vec<ColumnInfo>>,
    row_counts: DashMap<String, u64>,
    /// SQL substring to remaining forced failures
    failures: DashMap<String, usize>,
    executed: Mutex<Vec<Statement>>,
    /// Lock keys of atomic batches, in call order
    locks: Mutex<Vec<String>>,
    /// Held for the whole of an atomic batch
    batch: Mutex<()>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            row_counts: DashMap::new(),
            failures: DashMap::new(),
            executed: Mutex::new(Vec::new()),
            locks: Mutex::new(Vec::new()),
            batch: Mutex::new(()),
        }
    }

    /// Add a table whose columns are all `text`.
    #[must_use]
    pub fn with_table<I, S>(self, table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns
            .into_iter()
            .map(|name| ColumnInfo::new(name, "text"))
            .collect();
        self.tables.insert(table.to_string(), columns);
        self
    }

    /// Add a column with an explicit type.
    pub fn add_column(&self, table: &str, column: &str, data_type: &str) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(ColumnInfo::new(column, data_type));
    }

    /// Rows reported as affected by UPDATEs of `table`.
    pub fn set_row_count(&self, table: &str, rows: u64) {
        self.row_counts.insert(table.to_string(), rows);
    }

    /// Fail the next `times` statements whose SQL contains `pattern`.
    pub fn fail_next(&self, pattern: &str, times: usize) {
        self.failures.insert(pattern.to_string(), times);
    }

    /// Every statement executed so far, including failed ones.
    pub fn executed(&self) -> Vec<Statement> {
        self.executed.lock().clone()
    }

    /// Number of executed statements of the given [`Statement::kind`].
    pub fn count_kind(&self, kind: &str) -> usize {
        self.executed.lock().iter().filter(|s| s.kind() == kind).count()
    }

    /// Lock keys passed to [`SchemaStore::execute_atomic`] so far.
    pub fn lock_keys(&self) -> Vec<String> {
        self.locks.lock().clone()
    }

    pub fn clear_log(&self) {
        self.executed.lock().clear();
        self.locks.lock().clear();
    }

    pub fn column(&self, table: &str, column: &str) -> Option<ColumnInfo> {
        self.tables
            .get(table)
            .and_then(|columns| columns.iter().find(|c| c.name == column).cloned())
    }

    fn take_failure(&self, sql: &str) -> Option<String> {
        for mut entry in self.failures.iter_mut() {
            if *entry.value() > 0 && sql.contains(entry.key().as_str()) {
                *entry.value_mut() -= 1;
                return Some(entry.key().clone());
            }
        }
        None
    }

    fn apply(&self, statement: &Statement) -> u64 {
        match statement {
            Statement::Ddl(Ddl::AddColumn {
                table,
                column,
                data_type,
            }) => {
                let mut columns = self.tables.entry(table.clone()).or_default();
                if !columns.iter().any(|c| &c.name == column) {
                    columns.push(ColumnInfo::new(column.clone(), data_type.clone()));
                }
                0
            }
            Statement::Ddl(Ddl::DropColumn { table, column }) => {
                if let Some(mut columns) = self.tables.get_mut(table) {
                    columns.retain(|c| &c.name != column);
                }
                0
            }
            Statement::Update(update) => self
                .row_counts
                .get(&update.table)
                .map(|rows| *rows)
                .unwrap_or(0),
            _ => 0,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaStore for MemoryStore {
    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, StorageError> {
        Ok(self
            .tables
            .get(table)
            .map(|columns| columns.clone())
            .unwrap_or_default())
    }

    async fn execute(&self, statement: &Statement) -> Result<u64, StorageError> {
        self.executed.lock().push(statement.clone());
        let sql = statement.to_sql().sql;
        if let Some(pattern) = self.take_failure(&sql) {
            return Err(StorageError::Backend(format!("injected failure ({})", pattern)));
        }
        let _batch = self.batch.lock();
        Ok(self.apply(statement))
    }

    async fn execute_atomic(&self, lock: &str, statements: &[Statement]) -> Result<u64, StorageError> {
        let _batch = self.batch.lock();
        self.locks.lock().push(lock.to_string());

        // Every statement is checked before any is applied.
        for statement in statements {
            self.executed.lock().push(statement.clone());
            let sql = statement.to_sql().sql;
            if let Some(pattern) = self.take_failure(&sql) {
                return Err(StorageError::Backend(format!(
                    "injected failure ({}), transaction rolled back",
                    pattern
                )));
            }
        }
        Ok(statements.iter().map(|statement| self.apply(statement)).sum())
    }
}
