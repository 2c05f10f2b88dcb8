// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Vector column provisioning and recomputation.
//!
//! # Provisioning contract
//!
//! [`IndexMaintainer::ensure_column`] runs, in order:
//!
//! 1. `ADD COLUMN` when the column is missing, or `DROP COLUMN` + `ADD COLUMN`
//!    when it exists with a type other than `tsvector`
//! 2. `CREATE INDEX IF NOT EXISTS`
//! 3. trigger function and trigger statements, for trigger-maintained vectors
//! 4. a full-table `UPDATE`, when the column was just created and the vector
//!    is recomputed by the application (`auto_update_index` without triggers)
//!
//! Each DDL step (the column change, the index, each trigger's function,
//! drop and create) runs as one transaction holding a PostgreSQL advisory
//! lock keyed by `<table>.<vector>`, so engines in other processes
//! provisioning the same vector wait for each other and then find nothing
//! left to do. A trigger is never observed dropped but not yet re-created.
//!
//! A failing step is rolled back, logged, counted and reported in
//! [`Provisioning::failed`]; the remaining steps still run. The vector is
//! remembered as provisioned only when nothing failed, so the next call
//! retries. A population that failed after the column was created is retried
//! too, even though the column now exists.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::expression::VectorExpressionBuilder;
use super::triggers::TriggerGenerator;
use crate::error::SearchError;
use crate::metrics;
use crate::spec::{TableSearch, VectorSpec};
use crate::sql::{Ddl, Fragment, Predicate, SqlParam, Statement};
use crate::storage::SchemaStore;

const TSVECTOR: &str = "tsvector";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VectorState {
    Provisioned,
    /// Column exists but its initial population failed
    PendingPopulation,
}

/// Remembered provisioning outcome for the definition it was reached with
#[derive(Debug, Clone)]
struct Tracked {
    state: VectorState,
    spec: VectorSpec,
}

/// A provisioning step that failed and was rolled back
#[derive(Debug, Clone, PartialEq)]
pub struct FailedStatement {
    /// [`Statement::kind`] of the step's first statement
    pub kind: &'static str,
    /// SQL of every statement in the step, `;`-separated
    pub sql: String,
    pub error: String,
}

/// Outcome of a provisioning call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provisioning {
    /// The vector column was added (or re-added) by this call
    pub column_created: bool,
    /// Rows touched by the initial population, when it ran
    pub recomputed_rows: Option<u64>,
    pub failed: Vec<FailedStatement>,
    /// Nothing to do, an earlier call completed provisioning
    pub already_provisioned: bool,
}

impl Provisioning {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn done() -> Self {
        Self {
            already_provisioned: true,
            ..Default::default()
        }
    }
}

/// Keeps vector columns, indexes and triggers in place and vectors current
pub struct IndexMaintainer<S: SchemaStore> {
    store: Arc<S>,
    states: DashMap<String, Tracked>,
    provisioning: Mutex<()>,
}

impl<S: SchemaStore> IndexMaintainer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            states: DashMap::new(),
            provisioning: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Whether `table.vector` completed provisioning in this process.
    pub fn is_provisioned(&self, table: &str, vector: &str) -> bool {
        self.states
            .get(&format!("{}.{}", table, vector))
            .map(|tracked| tracked.state == VectorState::Provisioned)
            .unwrap_or(false)
    }

    /// Drop remembered state for every vector of `table`. Waits for an
    /// in-flight provisioning pass to finish first.
    pub async fn forget(&self, table: &str) {
        let _guard = self.provisioning.lock().await;
        let prefix = format!("{}.", table);
        self.states.retain(|key, _| !key.starts_with(&prefix));
    }

    /// Make sure the vector column, its index and (if configured) its
    /// triggers exist.
    ///
    /// Only catalog introspection errors are returned; statement failures are
    /// reported in the [`Provisioning`].
    pub async fn ensure_column(
        &self,
        search: &TableSearch,
        vector: &str,
    ) -> Result<Provisioning, SearchError> {
        let spec = lookup(search, vector)?;
        if self.state(spec) == Some(VectorState::Provisioned) {
            return Ok(Provisioning::done());
        }

        let _guard = self.provisioning.lock().await;
        if self.state(spec) == Some(VectorState::Provisioned) {
            return Ok(Provisioning::done());
        }

        self.provision(spec, false).await
    }

    /// Drop and re-create the vector column, then rebuild its index and
    /// triggers and repopulate it.
    pub async fn recreate_column(
        &self,
        search: &TableSearch,
        vector: &str,
    ) -> Result<Provisioning, SearchError> {
        let spec = lookup(search, vector)?;
        let _guard = self.provisioning.lock().await;
        self.states.remove(&spec.key());
        self.provision(spec, true).await
    }

    /// (Re)install the maintenance triggers of a vector. Best-effort.
    pub async fn install_triggers(
        &self,
        search: &TableSearch,
        vector: &str,
    ) -> Result<Provisioning, SearchError> {
        let spec = lookup(search, vector)?;
        let _guard = self.provisioning.lock().await;
        let mut report = Provisioning::default();
        self.run_triggers(spec, &mut report).await;
        Ok(report)
    }

    /// Recompute a vector for one row, or for every row when `row_id` is
    /// `None`. Returns the number of rows updated.
    ///
    /// Single-row recomputation of a trigger-maintained vector is a no-op:
    /// the trigger already did it inside the writing transaction.
    pub async fn recompute(
        &self,
        search: &TableSearch,
        vector: &str,
        row_id: Option<SqlParam>,
    ) -> Result<u64, SearchError> {
        let spec = lookup(search, vector)?;
        if spec.triggers && row_id.is_some() {
            debug!(vector = %spec.key(), "Skipping row recompute of trigger-maintained vector");
            return Ok(0);
        }

        let provisioning = self.ensure_column(search, vector).await?;
        if row_id.is_none() {
            if let Some(rows) = provisioning.recomputed_rows {
                return Ok(rows);
            }
        }

        let scope = if row_id.is_some() { "row" } else { "table" };
        let narrow = row_id.map(|id| {
            Predicate::fragment(Fragment::new(
                format!("{}.{} = ?", spec.table, spec.primary_key),
                vec![id],
            ))
        });
        let update = Statement::from(VectorExpressionBuilder::update(spec, narrow));
        let rows = self.store.execute(&update).await?;

        metrics::record_recompute(&spec.table, scope, rows);
        debug!(vector = %spec.key(), scope, rows, "Recomputed search vector");
        Ok(rows)
    }

    /// Recompute every vector of the table. Returns the total rows updated.
    pub async fn recompute_all(
        &self,
        search: &TableSearch,
        row_id: Option<SqlParam>,
    ) -> Result<u64, SearchError> {
        let mut total = 0;
        for spec in search.vectors() {
            total += self.recompute(search, &spec.name, row_id.clone()).await?;
        }
        Ok(total)
    }

    /// State reached with exactly this definition. A re-registered vector
    /// whose definition changed starts over.
    fn state(&self, spec: &VectorSpec) -> Option<VectorState> {
        self.states
            .get(&spec.key())
            .filter(|tracked| tracked.spec == *spec)
            .map(|tracked| tracked.state)
    }

    fn track(&self, spec: &VectorSpec, state: VectorState) {
        self.states.insert(
            spec.key(),
            Tracked {
                state,
                spec: spec.clone(),
            },
        );
    }

    /// Caller holds the provisioning lock.
    async fn provision(&self, spec: &VectorSpec, force: bool) -> Result<Provisioning, SearchError> {
        let key = spec.key();
        let mut report = Provisioning::default();

        let columns = self.store.columns(&spec.table).await?;
        let existing = columns.iter().find(|c| c.name == spec.name);

        let add_column = Statement::Ddl(Ddl::AddColumn {
            table: spec.table.clone(),
            column: spec.name.clone(),
            data_type: TSVECTOR.to_string(),
        });
        let drop_column = Statement::Ddl(Ddl::DropColumn {
            table: spec.table.clone(),
            column: spec.name.clone(),
        });

        match existing {
            None => {
                report.column_created = self.run(spec, &mut report, vec![add_column]).await;
            }
            Some(column) if force || !column.is_tsvector() => {
                if !column.is_tsvector() {
                    warn!(
                        vector = %key,
                        data_type = %column.data_type,
                        "Vector column has the wrong type, re-creating it"
                    );
                }
                report.column_created = self
                    .run(spec, &mut report, vec![drop_column, add_column])
                    .await;
            }
            Some(_) => {}
        }

        let index = Statement::Ddl(Ddl::CreateIndex {
            name: spec.index_name(),
            table: spec.table.clone(),
            column: spec.name.clone(),
            method: spec.index_method,
        });
        self.run(spec, &mut report, vec![index]).await;

        if spec.triggers {
            self.run_triggers(spec, &mut report).await;
        }

        let pending = self.state(spec) == Some(VectorState::PendingPopulation);
        let populate = if force {
            report.column_created
        } else {
            spec.auto_update_index && !spec.triggers && (report.column_created || pending)
        };
        if populate {
            let update = Statement::from(VectorExpressionBuilder::update(spec, None));
            match self.store.execute(&update).await {
                Ok(rows) => {
                    metrics::record_recompute(&spec.table, "table", rows);
                    report.recomputed_rows = Some(rows);
                }
                Err(e) => self.record_failure(&mut report, std::slice::from_ref(&update), e.to_string()),
            }
        }

        if report.is_complete() {
            self.track(spec, VectorState::Provisioned);
        } else if populate && report.recomputed_rows.is_none() {
            self.track(spec, VectorState::PendingPopulation);
        } else {
            self.states.remove(&key);
        }

        info!(
            vector = %key,
            column_created = report.column_created,
            recomputed_rows = ?report.recomputed_rows,
            failed = report.failed.len(),
            "Provisioned search vector"
        );
        Ok(report)
    }

    async fn run_triggers(&self, spec: &VectorSpec, report: &mut Provisioning) {
        for trigger in TriggerGenerator::generate(spec) {
            debug!(
                vector = %spec.key(),
                trigger = %trigger.trigger_name,
                table = %trigger.table_name,
                "Installing maintenance trigger"
            );
            let statements = trigger.statements().into_iter().map(Statement::Ddl).collect();
            self.run(spec, report, statements).await;
        }
    }

    /// Execute one provisioning step atomically under the vector's advisory
    /// lock, recording a failure instead of returning it.
    async fn run(&self, spec: &VectorSpec, report: &mut Provisioning, statements: Vec<Statement>) -> bool {
        match self.store.execute_atomic(&spec.key(), &statements).await {
            Ok(_) => {
                for statement in &statements {
                    metrics::record_provisioning_statement(statement.kind(), true);
                }
                true
            }
            Err(e) => {
                self.record_failure(report, &statements, e.to_string());
                false
            }
        }
    }

    fn record_failure(&self, report: &mut Provisioning, statements: &[Statement], error: String) {
        let kind = statements.first().map(Statement::kind).unwrap_or("empty");
        let sql = statements
            .iter()
            .map(|statement| statement.to_sql().sql)
            .collect::<Vec<_>>()
            .join(";\n");
        warn!(kind, sql = %sql, error = %error, "Provisioning statement failed, skipping");
        metrics::record_provisioning_statement(kind, false);
        report.failed.push(FailedStatement { kind, sql, error });
    }
}

fn lookup<'a>(search: &'a TableSearch, vector: &str) -> Result<&'a VectorSpec, SearchError> {
    search.vector(vector).ok_or_else(|| SearchError::UnknownVector {
        table: search.table().to_string(),
        vector: vector.to_string(),
    })
}
