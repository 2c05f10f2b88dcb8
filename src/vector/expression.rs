// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! tsvector expressions for a vector spec.
//!
//! ```sql
//! -- fields: [title, body], locale: english
//! to_tsvector('english', coalesce(posts.title::text,'') || ' ' || coalesce(posts.body::text,''))
//!
//! -- fields: {a: [title], b: [body]}, server default locale
//! setweight(to_tsvector(coalesce(posts.title::text,'')), 'A') || setweight(to_tsvector(coalesce(posts.body::text,'')), 'B')
//! ```

use crate::spec::{ColumnRef, FieldSpec, Locale, VectorSpec};
use crate::sql::{quote_literal, Predicate, Update};

/// Row prefix used inside trigger functions.
pub const NEW_ROW: &str = "NEW.";

/// Builds the SQL that computes a vector's value
pub struct VectorExpressionBuilder;

impl VectorExpressionBuilder {
    /// Expression computing the vector.
    ///
    /// With `row_prefix` (e.g. [`NEW_ROW`]) owning-table columns are read from
    /// that row; otherwise every column is table-qualified.
    pub fn build(spec: &VectorSpec, row_prefix: Option<&str>) -> String {
        let column = |c: &ColumnRef| Self::column_sql(spec, c, row_prefix);
        match spec.fields {
            FieldSpec::Single(ref c) => Self::to_tsvector(&spec.locale, &Self::coalesce(&[c], column)),
            FieldSpec::List(ref cs) => {
                let refs: Vec<&ColumnRef> = cs.iter().collect();
                Self::to_tsvector(&spec.locale, &Self::coalesce(&refs, column))
            }
            FieldSpec::Weighted(ref groups) => groups
                .iter()
                .map(|group| {
                    let refs: Vec<&ColumnRef> = group.columns.iter().collect();
                    format!(
                        "setweight({}, '{}')",
                        Self::to_tsvector(&spec.locale, &Self::coalesce(&refs, column)),
                        group.class
                    )
                })
                .collect::<Vec<_>>()
                .join(" || "),
        }
    }

    /// `UPDATE <table> SET <vector> = <expr>` over the vector's joins,
    /// narrowed by `extra` when given.
    pub fn update(spec: &VectorSpec, extra: Option<Predicate>) -> Update {
        let from = spec
            .joins
            .iter()
            .map(|join| join.from_item().to_string())
            .collect();

        let mut conditions: Vec<Predicate> = spec
            .joins
            .iter()
            .map(|join| Predicate::group(Predicate::raw(join.predicate.clone())))
            .collect();
        conditions.extend(extra);

        let predicate = match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Predicate::and(conditions)),
        };

        Update {
            table: spec.table.clone(),
            column: spec.name.clone(),
            value: Self::build(spec, None),
            from,
            predicate,
        }
    }

    fn column_sql(spec: &VectorSpec, column: &ColumnRef, row_prefix: Option<&str>) -> String {
        match row_prefix {
            Some(prefix) if column.belongs_to(&spec.table) => format!("{}{}", prefix, column.column),
            _ => column.qualified(&spec.table),
        }
    }

    fn coalesce<F>(columns: &[&ColumnRef], render: F) -> String
    where
        F: Fn(&ColumnRef) -> String,
    {
        columns
            .iter()
            .map(|c| format!("coalesce({}::text,'')", render(c)))
            .collect::<Vec<_>>()
            .join(" || ' ' || ")
    }

    fn to_tsvector(locale: &Locale, document: &str) -> String {
        match locale.name() {
            Some(name) => format!("to_tsvector({}, {})", quote_literal(name), document),
            None => format!("to_tsvector({})", document),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldsConfig, TableConfig, VectorConfig};
    use crate::spec::{SchemaSnapshot, TableSearch, VectorDefaults};
    use crate::sql::{Fragment, SqlParam, Statement};

    fn spec(config: VectorConfig) -> VectorSpec {
        let schema = SchemaSnapshot::new()
            .with_table("posts", ["id", "title", "body", "tags"])
            .with_table("comments", ["id", "post_id", "body"]);
        let search = TableSearch::new(
            "posts",
            TableConfig::from(config),
            &VectorDefaults::default(),
            &schema,
        )
        .unwrap();
        search.vector("vectors").unwrap().clone()
    }

    #[test]
    fn test_single_column() {
        let spec = spec(VectorConfig::new("title"));
        assert_eq!(
            VectorExpressionBuilder::build(&spec, None),
            "to_tsvector(coalesce(posts.title::text,''))"
        );
    }

    #[test]
    fn test_list_with_locale() {
        let spec = spec(VectorConfig::new(FieldsConfig::list(["title", "body"])).locale("english"));
        assert_eq!(
            VectorExpressionBuilder::build(&spec, None),
            "to_tsvector('english', coalesce(posts.title::text,'') || ' ' || coalesce(posts.body::text,''))"
        );
    }

    #[test]
    fn test_weighted_a_and_b_only() {
        let spec = spec(VectorConfig::new(FieldsConfig::weighted([
            ("b", vec!["body"]),
            ("a", vec!["title"]),
        ])));
        let expr = VectorExpressionBuilder::build(&spec, None);
        assert_eq!(
            expr,
            "setweight(to_tsvector(coalesce(posts.title::text,'')), 'A') || \
             setweight(to_tsvector(coalesce(posts.body::text,'')), 'B')"
        );
        assert!(!expr.contains("'C'"));
        assert!(!expr.contains("'D'"));
    }

    #[test]
    fn test_new_row_prefix() {
        let spec = spec(VectorConfig::new(FieldsConfig::list(["title", "posts.body"])));
        assert_eq!(
            VectorExpressionBuilder::build(&spec, Some(NEW_ROW)),
            "to_tsvector(coalesce(NEW.title::text,'') || ' ' || coalesce(NEW.body::text,''))"
        );
    }

    #[test]
    fn test_single_table_update() {
        let spec = spec(VectorConfig::new("title"));
        let update = VectorExpressionBuilder::update(
            &spec,
            Some(Predicate::fragment(Fragment::new("posts.id = ?", vec![SqlParam::Int(3)]))),
        );
        let query = Statement::from(update).to_sql();
        assert_eq!(
            query.sql,
            "UPDATE posts SET vectors = to_tsvector(coalesce(posts.title::text,'')) WHERE posts.id = $1"
        );
        assert_eq!(query.params, vec![SqlParam::Int(3)]);
    }

    #[test]
    fn test_multi_table_update() {
        let spec = spec(
            VectorConfig::new(FieldsConfig::list(["posts.title", "comments.body"]))
                .join("comments", "comments.post_id = posts.id"),
        );
        let query = Statement::from(VectorExpressionBuilder::update(&spec, None)).to_sql();
        assert_eq!(
            query.sql,
            "UPDATE posts SET vectors = to_tsvector(coalesce(posts.title::text,'') || ' ' || \
             coalesce(comments.body::text,'')) FROM comments WHERE (comments.post_id = posts.id)"
        );
    }

    #[test]
    fn test_join_from_item() {
        let spec = spec(
            VectorConfig::new(FieldsConfig::list(["title", "comments.body"])).join_from(
                "comments",
                "p2.id = posts.id",
                "posts p2 left outer join comments on comments.post_id = p2.id",
            ),
        );
        let update = VectorExpressionBuilder::update(&spec, None);
        assert_eq!(update.from, vec!["posts p2 left outer join comments on comments.post_id = p2.id"]);
    }
}
