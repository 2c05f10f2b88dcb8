// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! PostgreSQL store.
//!
//! Statements are serialized with [`Statement::to_sql`] and every
//! [`SqlParam`] is bound in order, so user text never becomes part of the
//! statement string.
//!
//! Catalog reads go through `information_schema.columns`, restricted to the
//! schemas on the current `search_path`:
//!
//! ```sql
//! SELECT column_name::text, udt_name::text
//! FROM information_schema.columns
//! WHERE table_name = $1 AND table_schema = ANY(current_schemas(false))
//! ORDER BY ordinal_position
//! ```

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::{Arguments, FromRow};
use std::time::Duration;
use tracing::{debug, instrument};

use super::traits::{ColumnInfo, SchemaStore, StorageError};
use crate::config::EngineConfig;
use crate::resilience::retry::{retry, retry_if, RetryConfig};
use crate::sql::{SqlParam, SqlQuery, Statement};

const COLUMNS_SQL: &str = "SELECT column_name::text, udt_name::text \
     FROM information_schema.columns \
     WHERE table_name = $1 AND table_schema = ANY(current_schemas(false)) \
     ORDER BY ordinal_position";

const ADVISORY_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtext($1))";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect with startup-mode retry (fails fast if the URL is wrong).
    pub async fn connect(config: &EngineConfig) -> Result<Self, StorageError> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| StorageError::Connection("no database_url configured".into()))?;

        let pool = retry("pg_connect", &RetryConfig::startup(), || async {
            PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
                .connect(url)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))
        })
        .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Run a SELECT and map each row to `T`.
    #[instrument(skip(self, statement), fields(kind = statement.kind()))]
    pub async fn fetch_all<T>(&self, statement: &Statement) -> Result<Vec<T>, StorageError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let SqlQuery { sql, params } = statement.to_sql();
        debug!(sql = %sql, params = params.len(), "Fetching rows");
        sqlx::query_as_with::<_, T, _>(&sql, bind_all(&params)?)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    /// Run a SELECT whose single column is a bigint, e.g. `count(*)`.
    #[instrument(skip(self, statement), fields(kind = statement.kind()))]
    pub async fn fetch_count(&self, statement: &Statement) -> Result<i64, StorageError> {
        let SqlQuery { sql, params } = statement.to_sql();
        debug!(sql = %sql, params = params.len(), "Fetching count");
        sqlx::query_scalar_with::<_, i64, _>(&sql, bind_all(&params)?)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl SchemaStore for PgStore {
    #[instrument(skip(self))]
    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, StorageError> {
        let rows: Vec<(String, String)> = retry_if(
            "pg_columns",
            &RetryConfig::query(),
            StorageError::is_transient,
            || async {
                sqlx::query_as::<_, (String, String)>(COLUMNS_SQL)
                    .bind(table)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)
            },
        )
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type)| ColumnInfo::new(name, data_type))
            .collect())
    }

    #[instrument(skip(self, statement), fields(kind = statement.kind()))]
    async fn execute(&self, statement: &Statement) -> Result<u64, StorageError> {
        let SqlQuery { sql, params } = statement.to_sql();
        debug!(sql = %sql, params = params.len(), "Executing statement");
        let result = sqlx::query_with(&sql, bind_all(&params)?)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    /// Runs inside one transaction holding
    /// `pg_advisory_xact_lock(hashtext(lock))`; the lock is released on
    /// commit or rollback.
    #[instrument(skip(self, statements), fields(statements = statements.len()))]
    async fn execute_atomic(&self, lock: &str, statements: &[Statement]) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query(ADVISORY_LOCK_SQL)
            .bind(lock)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let mut rows = 0;
        for statement in statements {
            let SqlQuery { sql, params } = statement.to_sql();
            debug!(sql = %sql, params = params.len(), lock, "Executing statement in transaction");
            rows += sqlx::query_with(&sql, bind_all(&params)?)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(rows)
    }
}

fn bind_all(params: &[SqlParam]) -> Result<PgArguments, StorageError> {
    let mut args = PgArguments::default();
    for param in params {
        let added = match param {
            SqlParam::Text(s) => args.add(s.clone()),
            SqlParam::Int(n) => args.add(*n),
            SqlParam::Float(n) => args.add(*n),
            SqlParam::Boolean(b) => args.add(*b),
        };
        added.map_err(|e| StorageError::Backend(format!("Failed to bind parameter {}: {}", param, e)))?;
    }
    Ok(args)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StorageError::Connection(err.to_string()),
        other => StorageError::Backend(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_all_accepts_every_param_kind() {
        let params = vec![
            SqlParam::Text("english".into()),
            SqlParam::Int(5),
            SqlParam::Float(0.5),
            SqlParam::Boolean(true),
        ];
        assert!(bind_all(&params).is_ok());
    }

    #[test]
    fn test_error_classification() {
        assert!(map_sqlx_error(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!map_sqlx_error(sqlx::Error::RowNotFound).is_transient());
    }
}
