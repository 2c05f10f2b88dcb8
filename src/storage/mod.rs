// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage backends behind the [`SchemaStore`] seam.
//!
//! - [`PgStore`]: PostgreSQL through a `sqlx` pool
//! - [`MemoryStore`]: in-process catalog for tests

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use traits::{ColumnInfo, SchemaStore, StorageError};
