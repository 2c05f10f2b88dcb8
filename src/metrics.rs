// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for tsearch-engine.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `tsearch_engine_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `table`: owning table of the vector
//! - `operation`: search, count, recompute, ensure_column
//! - `status`: success, error, empty

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

// ═══════════════════════════════════════════════════════════════════════════
// SEARCH
// ═══════════════════════════════════════════════════════════════════════════

/// Record a search request
pub fn record_search_query(table: &str, status: &str) {
    counter!(
        "tsearch_engine_search_queries_total",
        "table" => table.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record search latency
pub fn record_search_latency(table: &str, operation: &str, duration: Duration) {
    histogram!(
        "tsearch_engine_search_seconds",
        "table" => table.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record search result count
pub fn record_search_results(count: usize) {
    histogram!("tsearch_engine_search_results").record(count as f64);
}

// ═══════════════════════════════════════════════════════════════════════════
// MAINTENANCE
// ═══════════════════════════════════════════════════════════════════════════

/// Record one provisioning statement (add_column, create_index, ...)
pub fn record_provisioning_statement(kind: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "tsearch_engine_provisioning_statements_total",
        "kind" => kind.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a vector recomputation and the rows it touched
pub fn record_recompute(table: &str, scope: &str, rows: u64) {
    counter!(
        "tsearch_engine_recomputes_total",
        "table" => table.to_string(),
        "scope" => scope.to_string()
    )
    .increment(1);
    histogram!("tsearch_engine_recompute_rows", "scope" => scope.to_string()).record(rows as f64);
}

/// Record a table registration
pub fn record_registration(table: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "tsearch_engine_registrations_total",
        "table" => table.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Number of registered tables
pub fn set_registered_tables(count: usize) {
    gauge!("tsearch_engine_registered_tables").set(count as f64);
}

/// A timing guard that records search latency on drop
pub struct LatencyTimer {
    table: String,
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(table: &str, operation: &'static str) -> Self {
        Self {
            table: table.to_string(),
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_search_latency(&self.table, self.operation, self.start.elapsed());
    }
}
