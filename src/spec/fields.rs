// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Field groups and weight classes.

use std::fmt;

use crate::config::FieldsConfig;
use crate::error::ConfigError;
use crate::sql::is_column_reference;

/// Maximum number of weight classes PostgreSQL supports.
pub const MAX_WEIGHT_CLASSES: usize = 4;

/// Relevance tier for a field group, `A` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WeightClass {
    A,
    B,
    C,
    D,
}

impl WeightClass {
    pub const ALL: [WeightClass; 4] = [WeightClass::A, WeightClass::B, WeightClass::C, WeightClass::D];

    /// Parse a configuration key, case-insensitive.
    pub fn parse(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "a" => Some(WeightClass::A),
            "b" => Some(WeightClass::B),
            "c" => Some(WeightClass::C),
            "d" => Some(WeightClass::D),
            _ => None,
        }
    }

    /// PostgreSQL's built-in `ts_rank` weight for this class.
    pub fn default_rank_weight(self) -> f64 {
        match self {
            WeightClass::A => 1.0,
            WeightClass::B => 0.4,
            WeightClass::C => 0.2,
            WeightClass::D => 0.1,
        }
    }
}

impl fmt::Display for WeightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WeightClass::A => "A",
            WeightClass::B => "B",
            WeightClass::C => "C",
            WeightClass::D => "D",
        };
        write!(f, "{}", label)
    }
}

/// `column` or `table.column`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn parse(reference: &str) -> Result<Self, ConfigError> {
        if !is_column_reference(reference) {
            return Err(ConfigError::InvalidIdentifier(reference.to_string()));
        }
        Ok(match reference.split_once('.') {
            Some((table, column)) => Self {
                table: Some(table.to_string()),
                column: column.to_string(),
            },
            None => Self {
                table: None,
                column: reference.to_string(),
            },
        })
    }

    /// The table this column lives on, unqualified columns belonging to `owner`.
    pub fn table_or<'a>(&'a self, owner: &'a str) -> &'a str {
        self.table.as_deref().unwrap_or(owner)
    }

    pub fn belongs_to(&self, owner: &str) -> bool {
        self.table_or(owner) == owner
    }

    /// `table.column`, qualifying with `owner` when needed.
    pub fn qualified(&self, owner: &str) -> String {
        format!("{}.{}", self.table_or(owner), self.column)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table {
            Some(ref table) => write!(f, "{}.{}", table, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// Columns sharing one weight class
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGroup {
    pub class: WeightClass,
    pub columns: Vec<ColumnRef>,
    /// Rank weight override for this class
    pub weight: Option<f64>,
}

/// Which columns feed a vector, and how they are weighted
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    Single(ColumnRef),
    List(Vec<ColumnRef>),
    /// Groups ordered A to D; absent classes are omitted
    Weighted(Vec<FieldGroup>),
}

impl FieldSpec {
    pub fn from_config(config: &FieldsConfig) -> Result<Self, ConfigError> {
        match config {
            FieldsConfig::Single(column) => Ok(FieldSpec::Single(ColumnRef::parse(column)?)),
            FieldsConfig::List(columns) => {
                if columns.is_empty() {
                    return Err(ConfigError::InvalidFieldSpec("field list is empty".into()));
                }
                let columns = columns
                    .iter()
                    .map(|c| ColumnRef::parse(c))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(FieldSpec::List(columns))
            }
            FieldsConfig::Weighted(groups) => {
                if groups.len() > MAX_WEIGHT_CLASSES {
                    return Err(ConfigError::TooManyWeightClasses {
                        count: groups.len(),
                    });
                }
                if groups.is_empty() {
                    return Err(ConfigError::InvalidFieldSpec("no weighted field groups".into()));
                }

                let mut parsed = Vec::with_capacity(groups.len());
                for (key, group) in groups {
                    let class = WeightClass::parse(key)
                        .ok_or_else(|| ConfigError::UnknownWeightClass(key.clone()))?;
                    if parsed.iter().any(|g: &FieldGroup| g.class == class) {
                        return Err(ConfigError::InvalidFieldSpec(format!(
                            "weight class {} declared twice",
                            class
                        )));
                    }
                    if group.columns.is_empty() {
                        return Err(ConfigError::InvalidFieldSpec(format!(
                            "weight class {} has no columns",
                            class
                        )));
                    }
                    if let Some(weight) = group.weight {
                        if !(0.0..=1.0).contains(&weight) {
                            return Err(ConfigError::InvalidFieldSpec(format!(
                                "weight {} for class {} is outside 0.0..=1.0",
                                weight, class
                            )));
                        }
                    }
                    let columns = group
                        .columns
                        .iter()
                        .map(|c| ColumnRef::parse(c))
                        .collect::<Result<Vec<_>, _>>()?;
                    parsed.push(FieldGroup {
                        class,
                        columns,
                        weight: group.weight,
                    });
                }
                parsed.sort_by_key(|g| g.class);
                Ok(FieldSpec::Weighted(parsed))
            }
            FieldsConfig::Other(value) => Err(ConfigError::InvalidFieldSpec(format!(
                "fields must be a string, a list or a mapping of weight classes, got {}",
                value
            ))),
        }
    }

    /// Every column reference, in declaration order.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        match self {
            FieldSpec::Single(column) => vec![column],
            FieldSpec::List(columns) => columns.iter().collect(),
            FieldSpec::Weighted(groups) => groups.iter().flat_map(|g| g.columns.iter()).collect(),
        }
    }

    /// `ts_rank_cd` weights array `{D, C, B, A}` when any group overrides
    /// its weight.
    pub fn rank_weights(&self) -> Option<[f64; 4]> {
        let FieldSpec::Weighted(groups) = self else {
            return None;
        };
        if groups.iter().all(|g| g.weight.is_none()) {
            return None;
        }
        let mut weights = [0.0; 4];
        for (slot, class) in WeightClass::ALL.iter().rev().enumerate() {
            weights[slot] = groups
                .iter()
                .find(|g| g.class == *class)
                .and_then(|g| g.weight)
                .unwrap_or_else(|| class.default_rank_weight());
        }
        Some(weights)
    }
}
