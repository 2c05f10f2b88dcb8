// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The search engine facade.
//!
//! # Lifecycle
//!
//! ```text
//! register(table, config)        introspect + validate, once per table
//!       │
//!       ├─→ search / count_matches   ensure_column, then one SELECT
//!       │
//!       └─→ after_commit(table, id)  recompute application-maintained vectors
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::FromRow;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, TableConfig};
use crate::error::{ConfigError, SearchError};
use crate::metrics::{self, LatencyTimer};
use crate::registry::SearchRegistry;
use crate::search::{SearchOptions, SearchQueryBuilder, SearchRequest};
use crate::spec::{SchemaSnapshot, TableSearch, VectorDefaults};
use crate::sql::{is_identifier, Select, SqlParam, Statement};
use crate::storage::{PgStore, SchemaStore};
use crate::vector::{IndexMaintainer, Provisioning};

/// Full-text search over registered tables
pub struct TsearchEngine<S: SchemaStore = PgStore> {
    config: EngineConfig,
    defaults: VectorDefaults,
    store: Arc<S>,
    registry: SearchRegistry,
    maintainer: IndexMaintainer<S>,
}

impl<S: SchemaStore> TsearchEngine<S> {
    pub fn new(config: EngineConfig, store: Arc<S>) -> Self {
        Self {
            defaults: VectorDefaults::from(&config),
            maintainer: IndexMaintainer::new(store.clone()),
            registry: SearchRegistry::new(),
            store,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &SearchRegistry {
        &self.registry
    }

    pub fn maintainer(&self) -> &IndexMaintainer<S> {
        &self.maintainer
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Registration
    // ═══════════════════════════════════════════════════════════════════════════

    /// Validate and register a table's search configuration.
    ///
    /// Reads the columns of the table and of every joined table. Replacing an
    /// existing registration forgets its provisioning state.
    pub async fn register(
        &self,
        table: &str,
        config: TableConfig,
    ) -> Result<Arc<TableSearch>, SearchError> {
        let result = self.build_table_search(table, config).await;
        metrics::record_registration(table, result.is_ok());
        let search = result?;

        let (search, previous) = self.registry.register(search);
        if previous.is_some() {
            self.maintainer.forget(table).await;
        }
        metrics::set_registered_tables(self.registry.len());

        info!(
            table,
            vectors = ?search.vector_names(),
            joined = ?search.joined_tables(),
            replaced = previous.is_some(),
            "Registered search definition"
        );
        Ok(search)
    }

    async fn build_table_search(
        &self,
        table: &str,
        config: TableConfig,
    ) -> Result<TableSearch, SearchError> {
        if !is_identifier(table) {
            return Err(ConfigError::InvalidIdentifier(table.to_string()).into());
        }

        let mut snapshot = SchemaSnapshot::new();
        for name in std::iter::once(table.to_string()).chain(joined_tables(&config)) {
            if !is_identifier(&name) {
                return Err(ConfigError::InvalidIdentifier(name).into());
            }
            let columns = self.store.column_names(&name).await?;
            if columns.is_empty() {
                warn!(table = %name, "Table has no columns or does not exist");
            }
            snapshot.insert(name, columns);
        }

        Ok(TableSearch::new(table, config, &self.defaults, &snapshot)?)
    }

    pub fn table(&self, table: &str) -> Result<Arc<TableSearch>, SearchError> {
        self.registry
            .get(table)
            .ok_or_else(|| SearchError::UnknownTable(table.to_string()))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Maintenance
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn ensure_column(&self, table: &str, vector: &str) -> Result<Provisioning, SearchError> {
        let search = self.table(table)?;
        self.maintainer.ensure_column(&search, vector).await
    }

    pub async fn recreate_column(&self, table: &str, vector: &str) -> Result<Provisioning, SearchError> {
        let search = self.table(table)?;
        self.maintainer.recreate_column(&search, vector).await
    }

    pub async fn install_triggers(&self, table: &str, vector: &str) -> Result<Provisioning, SearchError> {
        let search = self.table(table)?;
        self.maintainer.install_triggers(&search, vector).await
    }

    /// Recompute one vector for one row, or the whole table when `row_id` is
    /// `None`.
    pub async fn recompute(
        &self,
        table: &str,
        vector: &str,
        row_id: Option<SqlParam>,
    ) -> Result<u64, SearchError> {
        let search = self.table(table)?;
        self.maintainer.recompute(&search, vector, row_id).await
    }

    /// Recompute every vector of the table.
    pub async fn recompute_all(&self, table: &str, row_id: Option<SqlParam>) -> Result<u64, SearchError> {
        let search = self.table(table)?;
        self.maintainer.recompute_all(&search, row_id).await
    }

    /// Post-commit hook for a written row: recomputes every vector of the
    /// table that has `auto_update_index` set. Trigger-maintained vectors
    /// are skipped by the recompute itself.
    pub async fn after_commit(&self, table: &str, row_id: impl Into<SqlParam>) -> Result<u64, SearchError> {
        let search = self.table(table)?;
        let row_id = row_id.into();
        let mut rows = 0;
        for spec in search.vectors().filter(|spec| spec.auto_update_index) {
            rows += self
                .maintainer
                .recompute(&search, &spec.name, Some(row_id.clone()))
                .await?;
        }
        debug!(table, row = %row_id, rows, "Post-commit vector refresh");
        Ok(rows)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Search statements
    // ═══════════════════════════════════════════════════════════════════════════

    /// Build the ranked search statement, then provision the vector. An
    /// empty query or unknown vector fails before any schema change.
    pub async fn prepare_search(
        &self,
        table: &str,
        vector: &str,
        query: &str,
        request: SearchRequest,
        options: &SearchOptions,
    ) -> Result<Select, SearchError> {
        let search = self.table(table)?;
        let select = SearchQueryBuilder::build(&search, vector, query, request, options)?;
        self.maintainer.ensure_column(&search, vector).await?;
        Ok(select)
    }

    /// Like [`prepare_search`](Self::prepare_search) but selecting
    /// `count(*)`. Ordering and paging are dropped.
    pub async fn prepare_count(
        &self,
        table: &str,
        vector: &str,
        query: &str,
        request: SearchRequest,
        options: &SearchOptions,
    ) -> Result<Select, SearchError> {
        let request = SearchRequest {
            select: Some("count(*)".to_string()),
            order: None,
            limit: None,
            offset: None,
            ..request
        };
        self.prepare_search(table, vector, query, request, options).await
    }
}

impl TsearchEngine<PgStore> {
    /// Connect to PostgreSQL using `config.database_url`.
    pub async fn connect(config: EngineConfig) -> Result<Self, SearchError> {
        let store = PgStore::connect(&config).await?;
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Ranked search. Rows carry the selected columns plus `tsearch_rank`
    /// (`real`, map it to `f32`) and one `<column>_headline` per requested
    /// headline.
    pub async fn search<T>(
        &self,
        table: &str,
        vector: &str,
        query: &str,
        request: SearchRequest,
        options: &SearchOptions,
    ) -> Result<Vec<T>, SearchError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let _timer = LatencyTimer::new(table, "search");
        let result = async {
            let select = self.prepare_search(table, vector, query, request, options).await?;
            Ok::<_, SearchError>(self.store.fetch_all::<T>(&Statement::from(select)).await?)
        }
        .await;

        metrics::record_search_query(table, status_label(&result));
        if let Ok(ref rows) = result {
            metrics::record_search_results(rows.len());
            debug!(table, vector, results = rows.len(), "Search complete");
        }
        result
    }

    /// Number of rows matching `query`.
    pub async fn count_matches(
        &self,
        table: &str,
        vector: &str,
        query: &str,
        request: SearchRequest,
        options: &SearchOptions,
    ) -> Result<i64, SearchError> {
        let _timer = LatencyTimer::new(table, "count");
        let result = async {
            let select = self.prepare_count(table, vector, query, request, options).await?;
            Ok::<_, SearchError>(self.store.fetch_count(&Statement::from(select)).await?)
        }
        .await;

        metrics::record_search_query(table, status_label(&result));
        result
    }
}

fn status_label<T>(result: &Result<T, SearchError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(SearchError::EmptyQuery) => "empty",
        Err(_) => "error",
    }
}

/// Joined table names across every vector of a configuration.
fn joined_tables(config: &TableConfig) -> BTreeSet<String> {
    let vectors: Vec<_> = match config {
        TableConfig::Single(vector) => vec![vector],
        TableConfig::Named(vectors) => vectors.values().collect(),
    };
    vectors
        .into_iter()
        .flat_map(|vector| vector.tables.keys().cloned())
        .collect()
}
