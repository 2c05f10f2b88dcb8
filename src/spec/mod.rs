// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search vector model.
//!
//! A [`TableSearch`] is the validated, immutable form of a table's
//! [`TableConfig`]: one [`VectorSpec`] per declared vector. It is built once at
//! registration against a [`SchemaSnapshot`] of the owning and joined tables
//! and shared by `Arc` with every component that needs it.
//!
//! ```rust
//! use tsearch_engine::config::{EngineConfig, FieldsConfig, TableConfig, VectorConfig};
//! use tsearch_engine::spec::{SchemaSnapshot, TableSearch, VectorDefaults};
//!
//! let schema = SchemaSnapshot::new().with_table("posts", ["id", "title", "body"]);
//! let config = TableConfig::from(VectorConfig::new(FieldsConfig::list(["title", "body"])));
//!
//! let search = TableSearch::new(
//!     "posts",
//!     config,
//!     &VectorDefaults::from(&EngineConfig::default()),
//!     &schema,
//! ).unwrap();
//!
//! let spec = search.vector("vectors").unwrap();
//! assert!(spec.auto_update_index);
//! assert!(!spec.is_multi_table());
//! ```

mod fields;

pub use fields::{ColumnRef, FieldGroup, FieldSpec, WeightClass, MAX_WEIGHT_CLASSES};

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::config::{EngineConfig, TableConfig, VectorConfig};
use crate::error::ConfigError;
use crate::sql::{is_identifier, IndexMethod};

/// Vector name used when a table declares its fields directly.
pub const DEFAULT_VECTOR_NAME: &str = "vectors";

/// Row identity column unless configured otherwise.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Locale tag meaning "whatever the server is configured with".
pub const SERVER_DEFAULT_LOCALE: &str = "default";

/// Text search configuration passed to `to_tsvector`/`to_tsquery`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locale {
    /// Use the one-argument function forms (`default_text_search_config`)
    ServerDefault,
    /// A named configuration such as `english` or `public.my_config`
    Named(String),
}

impl Locale {
    pub fn parse(tag: &str) -> Result<Self, ConfigError> {
        if tag == SERVER_DEFAULT_LOCALE {
            return Ok(Locale::ServerDefault);
        }
        let valid = match tag.split_once('.') {
            Some((schema, name)) => is_identifier(schema) && is_identifier(name),
            None => is_identifier(tag),
        };
        if valid {
            Ok(Locale::Named(tag.to_string()))
        } else {
            Err(ConfigError::InvalidIdentifier(tag.to_string()))
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Locale::ServerDefault => None,
            Locale::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::ServerDefault => write!(f, "{}", SERVER_DEFAULT_LOCALE),
            Locale::Named(name) => write!(f, "{}", name),
        }
    }
}

/// A table joined into a cross-table vector
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub table: String,
    /// Join condition, e.g. `comments.post_id = posts.id`
    pub predicate: String,
    /// FROM item replacing the bare table name
    pub from: Option<String>,
}

impl JoinSpec {
    pub fn from_item(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.table)
    }
}

/// One named search vector owned by one table. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSpec {
    pub name: String,
    pub table: String,
    pub primary_key: String,
    pub locale: Locale,
    pub auto_update_index: bool,
    pub triggers: bool,
    pub fields: FieldSpec,
    pub joins: Vec<JoinSpec>,
    pub index_method: IndexMethod,
}

impl VectorSpec {
    /// Validate one vector's options. Column existence is checked separately
    /// by [`TableSearch::new`].
    pub fn from_config(
        table: &str,
        name: &str,
        config: &VectorConfig,
        defaults: &VectorDefaults,
    ) -> Result<Self, ConfigError> {
        for identifier in [table, name] {
            if !is_identifier(identifier) {
                return Err(ConfigError::InvalidIdentifier(identifier.to_string()));
            }
        }

        let primary_key = config
            .primary_key
            .clone()
            .unwrap_or_else(|| DEFAULT_PRIMARY_KEY.to_string());
        if !is_identifier(&primary_key) {
            return Err(ConfigError::InvalidIdentifier(primary_key));
        }

        let locale = Locale::parse(config.locale.as_deref().unwrap_or(&defaults.locale))?;
        let fields = FieldSpec::from_config(&config.fields)?;

        let mut joins = Vec::with_capacity(config.tables.len());
        for (joined, join) in &config.tables {
            if !is_identifier(joined) {
                return Err(ConfigError::InvalidIdentifier(joined.clone()));
            }
            if join.predicate().trim().is_empty() {
                return Err(ConfigError::InvalidFieldSpec(format!(
                    "join to table {} has an empty predicate",
                    joined
                )));
            }
            joins.push(JoinSpec {
                table: joined.clone(),
                predicate: join.predicate().to_string(),
                from: join.from_clause().map(str::to_string),
            });
        }

        for column in fields.columns() {
            if let Some(ref qualifier) = column.table {
                if qualifier != table && !joins.iter().any(|j| &j.table == qualifier) {
                    return Err(ConfigError::UnknownJoinTable {
                        column: column.to_string(),
                        table: qualifier.clone(),
                    });
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            table: table.to_string(),
            primary_key,
            locale,
            auto_update_index: config
                .auto_update_index
                .unwrap_or(defaults.auto_update_index),
            triggers: config.triggers,
            fields,
            joins,
            index_method: config.index_method.unwrap_or_default(),
        })
    }

    /// Whether the vector reads columns from joined tables.
    pub fn is_multi_table(&self) -> bool {
        !self.joins.is_empty()
    }

    pub fn index_name(&self) -> String {
        format!("{}_fts_{}_index", self.table, self.name)
    }

    /// Registry key, `table.vector`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }

    /// Column names grouped by the table they live on, tables in order of
    /// first appearance, columns deduplicated.
    pub fn columns_by_table(&self) -> Vec<(String, Vec<String>)> {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for column in self.fields.columns() {
            let table = column.table_or(&self.table);
            match grouped.iter_mut().find(|(t, _)| t == table) {
                Some((_, columns)) => {
                    if !columns.contains(&column.column) {
                        columns.push(column.column.clone());
                    }
                }
                None => grouped.push((table.to_string(), vec![column.column.clone()])),
            }
        }
        grouped
    }
}

/// Defaults applied to vectors that leave an option unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorDefaults {
    pub locale: String,
    pub auto_update_index: bool,
}

impl Default for VectorDefaults {
    fn default() -> Self {
        Self {
            locale: SERVER_DEFAULT_LOCALE.to_string(),
            auto_update_index: true,
        }
    }
}

impl From<&EngineConfig> for VectorDefaults {
    fn from(config: &EngineConfig) -> Self {
        Self {
            locale: config.default_locale.clone(),
            auto_update_index: config.default_auto_update_index,
        }
    }
}

/// Column names of the tables a registration touches
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    tables: HashMap<String, Vec<String>>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&mut self, table: impl Into<String>, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables
            .insert(table.into(), columns.into_iter().map(Into::into).collect());
    }

    pub fn with_table<I, S>(mut self, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(table, columns);
        self
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .map(|columns| columns.iter().any(|c| c == column))
            .unwrap_or(false)
    }
}

/// All search vectors declared for one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSearch {
    table: String,
    vectors: Vec<VectorSpec>,
}

impl TableSearch {
    /// Validate `config` for `table`.
    ///
    /// Every referenced column must exist in `schema`; the missing ones are
    /// reported together, sorted. Columns of joined tables are reported as
    /// `table.column`.
    pub fn new(
        table: &str,
        config: TableConfig,
        defaults: &VectorDefaults,
        schema: &SchemaSnapshot,
    ) -> Result<Self, ConfigError> {
        let mut vectors = Vec::new();
        let mut missing = BTreeSet::new();

        for (name, vector_config) in config.into_vectors() {
            let spec = VectorSpec::from_config(table, &name, &vector_config, defaults)?;
            for column in spec.fields.columns() {
                let owner = column.table_or(table);
                if !schema.has_column(owner, &column.column) {
                    missing.insert(column.to_string());
                }
            }
            vectors.push(spec);
        }

        if !missing.is_empty() {
            return Err(ConfigError::MissingFields {
                table: table.to_string(),
                fields: missing.into_iter().collect(),
            });
        }

        Ok(Self {
            table: table.to_string(),
            vectors,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn vector(&self, name: &str) -> Option<&VectorSpec> {
        self.vectors.iter().find(|v| v.name == name)
    }

    pub fn vectors(&self) -> impl Iterator<Item = &VectorSpec> {
        self.vectors.iter()
    }

    pub fn vector_names(&self) -> Vec<&str> {
        self.vectors.iter().map(|v| v.name.as_str()).collect()
    }

    /// Tables other than the owner whose columns feed some vector.
    pub fn joined_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for spec in &self.vectors {
            for join in &spec.joins {
                if !tables.contains(&join.table.as_str()) {
                    tables.push(&join.table);
                }
            }
        }
        tables
    }
}
