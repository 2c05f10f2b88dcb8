// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Ranked search SELECT construction.
//!
//! ```sql
//! SELECT posts.*,
//!        ts_rank_cd(posts.vectors, tsearch_query) AS tsearch_rank,
//!        ts_headline($1::regconfig, posts.body, tsearch_query) AS body_headline
//! FROM to_tsquery($2::regconfig, $3) AS tsearch_query, posts
//! WHERE (posts.published) AND posts.vectors @@ tsearch_query
//! ORDER BY tsearch_rank DESC
//! LIMIT $4
//! ```

use crate::error::SearchError;
use crate::query::QueryTranslator;
use crate::spec::{Locale, TableSearch, VectorSpec};
use crate::sql::{is_column_reference, is_identifier, Fragment, Predicate, Select, SqlParam};

/// Alias of the rank column added to every non-count search.
pub const RANK_ALIAS: &str = "tsearch_rank";

/// Alias of the parsed tsquery in the FROM list.
pub const QUERY_ALIAS: &str = "tsearch_query";

/// Caller conditions AND-ed with the full-text match
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// SQL condition without parameters
    Raw(String),
    /// SQL condition with `?` placeholders and their values.
    ///
    /// A `?` inside a `'..'`/`E'..'` literal or a `".."` identifier is not a
    /// placeholder. Dollar-quoted bodies are not recognized; write `??` there.
    WithParams(String, Vec<SqlParam>),
    /// Column equality conditions
    Map(Vec<(String, SqlParam)>),
}

impl Filter {
    pub fn raw(sql: impl Into<String>) -> Self {
        Filter::Raw(sql.into())
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Filter::WithParams(sql.into(), params)
    }

    pub fn map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlParam>,
    {
        Filter::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    fn into_predicate(self, table: &str) -> Result<Option<Predicate>, SearchError> {
        match self {
            Filter::Raw(sql) => Ok(Some(Predicate::group(Predicate::raw(sql)))),
            Filter::WithParams(sql, params) => Ok(Some(Predicate::group(Predicate::fragment(
                Fragment::new(sql, params),
            )))),
            Filter::Map(pairs) => {
                let mut conditions = Vec::with_capacity(pairs.len());
                for (column, value) in pairs {
                    if !is_column_reference(&column) {
                        return Err(SearchError::InvalidIdentifier(column));
                    }
                    let column = if column.contains('.') {
                        column
                    } else {
                        format!("{}.{}", table, column)
                    };
                    conditions.push(Predicate::fragment(Fragment::new(
                        format!("{} = ?", column),
                        vec![value],
                    )));
                }
                Ok(match conditions.len() {
                    0 => None,
                    _ => Some(Predicate::and(conditions)),
                })
            }
        }
    }
}

/// The statement-shaping half of a search: what the caller would pass as
/// select/from/conditions/order/limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    /// Selection list, `<table>.*` when unset
    pub select: Option<String>,
    /// FROM item replacing the owning table
    pub from: Option<String>,
    pub filter: Option<Filter>,
    /// ORDER BY text, rank descending when unset
    pub order: Option<String>,
    /// Associations the caller eager-loads. When non-empty the default
    /// ordering repeats the rank expression instead of using its alias.
    pub include: Vec<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `count(*)` request.
    pub fn count() -> Self {
        Self::new().select("count(*)")
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn include(mut self, association: impl Into<String>) -> Self {
        self.include.push(association.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    fn is_count(&self) -> bool {
        self.select
            .as_deref()
            .map(|s| s.trim().eq_ignore_ascii_case("count(*)"))
            .unwrap_or(false)
    }
}

/// Search behavior options
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Translate the search string; when false it must already be tsquery text
    pub fix_query: bool,
    /// Columns returned highlighted as `<column>_headline`
    pub headlines: Vec<String>,
    /// `ts_rank_cd` normalization bitmask
    pub normalization: Option<i32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            fix_query: true,
            headlines: Vec::new(),
            normalization: None,
        }
    }
}

impl SearchOptions {
    pub fn headline(mut self, column: impl Into<String>) -> Self {
        self.headlines.push(column.into());
        self
    }

    pub fn normalization(mut self, bitmask: i32) -> Self {
        self.normalization = Some(bitmask);
        self
    }

    pub fn raw_query(mut self) -> Self {
        self.fix_query = false;
        self
    }
}

/// Builds ranked full-text search statements
pub struct SearchQueryBuilder;

impl SearchQueryBuilder {
    pub fn build(
        search: &TableSearch,
        vector: &str,
        raw: &str,
        request: SearchRequest,
        options: &SearchOptions,
    ) -> Result<Select, SearchError> {
        let spec = lookup(search, vector)?;
        let table = spec.table.as_str();
        let tsquery = Self::tsquery_text(raw, options)?;
        let is_count = request.is_count();
        let rank = Self::rank_expression(spec, QUERY_ALIAS, options);

        let mut selection = vec![Fragment::raw(
            request.select.unwrap_or_else(|| format!("{}.*", table)),
        )];
        if !is_count {
            selection.push(Fragment::raw(format!("{} AS {}", rank, RANK_ALIAS)));
            for column in &options.headlines {
                selection.push(Self::headline(spec, column)?);
            }
        }

        let from = vec![
            Self::tsquery_fragment(&spec.locale, tsquery, Some(QUERY_ALIAS)),
            Fragment::raw(request.from.unwrap_or_else(|| table.to_string())),
        ];

        let matches = Predicate::raw(format!("{}.{} @@ {}", table, spec.name, QUERY_ALIAS));
        let predicate = match request.filter {
            Some(filter) => match filter.into_predicate(table)? {
                Some(conditions) => conditions.and_also(matches),
                None => matches,
            },
            None => matches,
        };

        let order_by = match request.order {
            Some(order) => vec![Fragment::raw(order)],
            None if is_count => Vec::new(),
            None if !request.include.is_empty() => vec![Fragment::raw(format!("{} DESC", rank))],
            None => vec![Fragment::raw(format!("{} DESC", RANK_ALIAS))],
        };

        Ok(Select {
            selection,
            from,
            predicate: Some(predicate),
            order_by,
            limit: request.limit,
            offset: request.offset,
        })
    }

    /// Standalone `<table>.<vector> @@ to_tsquery(...)` condition for
    /// composing into other statements.
    pub fn match_predicate(
        search: &TableSearch,
        vector: &str,
        raw: &str,
        options: &SearchOptions,
    ) -> Result<Predicate, SearchError> {
        let spec = lookup(search, vector)?;
        let tsquery = Self::tsquery_text(raw, options)?;
        let query = Self::tsquery_fragment(&spec.locale, tsquery, None);
        Ok(Predicate::fragment(Fragment::new(
            format!("{}.{} @@ {}", spec.table, spec.name, query.sql),
            query.params,
        )))
    }

    /// `ts_rank_cd([weights,] <table>.<vector>, <query>[, normalization])`
    pub fn rank_expression(spec: &VectorSpec, query: &str, options: &SearchOptions) -> String {
        let mut args = Vec::with_capacity(4);
        if let Some(weights) = spec.fields.rank_weights() {
            let list: Vec<String> = weights.iter().map(|w| w.to_string()).collect();
            args.push(format!("'{{{}}}'::float4[]", list.join(",")));
        }
        args.push(format!("{}.{}", spec.table, spec.name));
        args.push(query.to_string());
        if let Some(normalization) = options.normalization {
            args.push(normalization.to_string());
        }
        format!("ts_rank_cd({})", args.join(", "))
    }

    fn tsquery_text(raw: &str, options: &SearchOptions) -> Result<String, SearchError> {
        if options.fix_query {
            Ok(QueryTranslator::translate(raw)?)
        } else if raw.trim().is_empty() {
            Err(SearchError::EmptyQuery)
        } else {
            Ok(raw.to_string())
        }
    }

    fn tsquery_fragment(locale: &Locale, tsquery: String, alias: Option<&str>) -> Fragment {
        let (call, params): (&str, Vec<SqlParam>) = match locale.name() {
            Some(name) => ("to_tsquery(?::regconfig, ?)", vec![name.into(), tsquery.into()]),
            None => ("to_tsquery(?)", vec![tsquery.into()]),
        };
        match alias {
            Some(alias) => Fragment::new(format!("{} AS {}", call, alias), params),
            None => Fragment::new(call, params),
        }
    }

    fn headline(spec: &VectorSpec, column: &str) -> Result<Fragment, SearchError> {
        if !is_identifier(column) {
            return Err(SearchError::InvalidIdentifier(column.to_string()));
        }
        let document = format!("{}.{}", spec.table, column);
        Ok(match spec.locale.name() {
            Some(name) => Fragment::new(
                format!("ts_headline(?::regconfig, {}, {}) AS {}_headline", document, QUERY_ALIAS, column),
                vec![name.into()],
            ),
            None => Fragment::raw(format!(
                "ts_headline({}, {}) AS {}_headline",
                document, QUERY_ALIAS, column
            )),
        })
    }
}

fn lookup<'a>(search: &'a TableSearch, vector: &str) -> Result<&'a VectorSpec, SearchError> {
    search.vector(vector).ok_or_else(|| SearchError::UnknownVector {
        table: search.table().to_string(),
        vector: vector.to_string(),
    })
}
