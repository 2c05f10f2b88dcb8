// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Registered search definitions, looked up by table name at call time.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::spec::TableSearch;

pub struct SearchRegistry {
    /// Table name to its validated search definition
    tables: RwLock<HashMap<String, Arc<TableSearch>>>,
}

impl SearchRegistry {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Register a definition, replacing any previous one for the same table.
    /// Returns the replaced definition.
    pub fn register(&self, search: TableSearch) -> (Arc<TableSearch>, Option<Arc<TableSearch>>) {
        let search = Arc::new(search);
        let previous = self
            .tables
            .write()
            .insert(search.table().to_string(), search.clone());
        (search, previous)
    }

    pub fn get(&self, table: &str) -> Option<Arc<TableSearch>> {
        self.tables.read().get(table).cloned()
    }

    /// Registered table names, sorted.
    pub fn tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }
}

impl Default for SearchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
