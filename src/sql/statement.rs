// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Statement tree and its PostgreSQL serializer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        SqlParam::Int(i64::from(value))
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        SqlParam::Float(value)
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        SqlParam::Boolean(value)
    }
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlParam::Text(s) => write!(f, "{}", s),
            SqlParam::Int(n) => write!(f, "{}", n),
            SqlParam::Float(n) => write!(f, "{}", n),
            SqlParam::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Serialized statement with PostgreSQL `$n` placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    /// Statement text
    pub sql: String,
    /// Parameter values, `params[0]` binds `$1`
    pub params: Vec<SqlParam>,
}

/// A piece of SQL text with `?` placeholders and the values they bind.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Fragment without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Boolean condition tree for WHERE clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// A leaf condition
    Fragment(Fragment),
    /// Conjunction of conditions
    And(Vec<Predicate>),
    /// Parenthesized condition, used for caller-supplied text whose
    /// precedence is unknown
    Group(Box<Predicate>),
}

impl Predicate {
    pub fn fragment(fragment: Fragment) -> Self {
        Predicate::Fragment(fragment)
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Predicate::Fragment(Fragment::raw(sql))
    }

    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::And(predicates)
    }

    pub fn group(predicate: Predicate) -> Self {
        Predicate::Group(Box::new(predicate))
    }

    /// AND `other` onto this predicate, flattening nested conjunctions.
    pub fn and_also(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut parts) => {
                parts.push(other);
                Predicate::And(parts)
            }
            single => Predicate::And(vec![single, other]),
        }
    }

    fn write(&self, out: &mut SqlWriter) {
        match self {
            Predicate::Fragment(fragment) => out.push_fragment(fragment),
            Predicate::And(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    part.write(out);
                }
            }
            Predicate::Group(inner) => {
                out.push_str("(");
                inner.write(out);
                out.push_str(")");
            }
        }
    }
}

/// SELECT statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub selection: Vec<Fragment>,
    pub from: Vec<Fragment>,
    pub predicate: Option<Predicate>,
    pub order_by: Vec<Fragment>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// UPDATE statement assigning one column
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub column: String,
    pub value: String,
    pub from: Vec<String>,
    pub predicate: Option<Predicate>,
}

/// Index access method for the vector column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMethod {
    #[default]
    Gin,
    Gist,
}

impl fmt::Display for IndexMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexMethod::Gin => write!(f, "gin"),
            IndexMethod::Gist => write!(f, "gist"),
        }
    }
}

/// When a maintenance trigger fires relative to the row write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
}

impl fmt::Display for TriggerTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerTiming::Before => write!(f, "BEFORE"),
            TriggerTiming::After => write!(f, "AFTER"),
        }
    }
}

/// Schema statements issued during provisioning
#[derive(Debug, Clone, PartialEq)]
pub enum Ddl {
    AddColumn {
        table: String,
        column: String,
        data_type: String,
    },
    DropColumn {
        table: String,
        column: String,
    },
    CreateIndex {
        name: String,
        table: String,
        column: String,
        method: IndexMethod,
    },
    /// PL/pgSQL trigger function; `body` goes between the dollar quotes
    CreateFunction {
        name: String,
        body: String,
    },
    DropTrigger {
        name: String,
        table: String,
    },
    CreateTrigger {
        name: String,
        table: String,
        timing: TriggerTiming,
        function: String,
    },
}

/// Any statement the engine executes
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Update(Update),
    Ddl(Ddl),
}

impl Statement {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => "select",
            Statement::Update(_) => "update",
            Statement::Ddl(Ddl::AddColumn { .. }) => "add_column",
            Statement::Ddl(Ddl::DropColumn { .. }) => "drop_column",
            Statement::Ddl(Ddl::CreateIndex { .. }) => "create_index",
            Statement::Ddl(Ddl::CreateFunction { .. }) => "create_function",
            Statement::Ddl(Ddl::DropTrigger { .. }) => "drop_trigger",
            Statement::Ddl(Ddl::CreateTrigger { .. }) => "create_trigger",
        }
    }

    /// Serialize to PostgreSQL text with numbered placeholders.
    pub fn to_sql(&self) -> SqlQuery {
        let mut out = SqlWriter::default();
        match self {
            Statement::Select(select) => write_select(select, &mut out),
            Statement::Update(update) => write_update(update, &mut out),
            Statement::Ddl(ddl) => write_ddl(ddl, &mut out),
        }
        out.finish()
    }
}

impl From<Select> for Statement {
    fn from(select: Select) -> Self {
        Statement::Select(select)
    }
}

impl From<Update> for Statement {
    fn from(update: Update) -> Self {
        Statement::Update(update)
    }
}

impl From<Ddl> for Statement {
    fn from(ddl: Ddl) -> Self {
        Statement::Ddl(ddl)
    }
}

fn write_select(select: &Select, out: &mut SqlWriter) {
    out.push_str("SELECT ");
    out.push_list(&select.selection);
    if !select.from.is_empty() {
        out.push_str(" FROM ");
        out.push_list(&select.from);
    }
    if let Some(ref predicate) = select.predicate {
        out.push_str(" WHERE ");
        predicate.write(out);
    }
    if !select.order_by.is_empty() {
        out.push_str(" ORDER BY ");
        out.push_list(&select.order_by);
    }
    if let Some(limit) = select.limit {
        out.push_str(" LIMIT ");
        out.push_param(SqlParam::Int(limit));
    }
    if let Some(offset) = select.offset {
        out.push_str(" OFFSET ");
        out.push_param(SqlParam::Int(offset));
    }
}

fn write_update(update: &Update, out: &mut SqlWriter) {
    out.push_str(&format!(
        "UPDATE {} SET {} = {}",
        update.table, update.column, update.value
    ));
    if !update.from.is_empty() {
        out.push_str(" FROM ");
        out.push_str(&update.from.join(", "));
    }
    if let Some(ref predicate) = update.predicate {
        out.push_str(" WHERE ");
        predicate.write(out);
    }
}

fn write_ddl(ddl: &Ddl, out: &mut SqlWriter) {
    let sql = match ddl {
        Ddl::AddColumn {
            table,
            column,
            data_type,
        } => format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
            table, column, data_type
        ),
        Ddl::DropColumn { table, column } => {
            format!("ALTER TABLE {} DROP COLUMN IF EXISTS {}", table, column)
        }
        Ddl::CreateIndex {
            name,
            table,
            column,
            method,
        } => format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} USING {}({})",
            name, table, method, column
        ),
        Ddl::CreateFunction { name, body } => format!(
            "CREATE OR REPLACE FUNCTION {}() RETURNS trigger AS $tsearch$\n{}\n$tsearch$ LANGUAGE plpgsql",
            name, body
        ),
        Ddl::DropTrigger { name, table } => {
            format!("DROP TRIGGER IF EXISTS {} ON {}", name, table)
        }
        Ddl::CreateTrigger {
            name,
            table,
            timing,
            function,
        } => format!(
            "CREATE TRIGGER {} {} INSERT OR UPDATE ON {} FOR EACH ROW EXECUTE PROCEDURE {}()",
            name, timing, table, function
        ),
    };
    out.push_str(&sql);
}

/// Where [`SqlWriter::push_fragment`] is inside the fragment text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexical {
    Code,
    Literal { escaped: bool },
    Identifier,
}

/// Accumulates statement text and renumbers placeholders.
#[derive(Default)]
struct SqlWriter {
    sql: String,
    params: Vec<SqlParam>,
}

impl SqlWriter {
    fn push_str(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn push_param(&mut self, param: SqlParam) {
        self.params.push(param);
        self.sql.push_str(&format!("${}", self.params.len()));
    }

    fn push_list(&mut self, fragments: &[Fragment]) {
        for (i, fragment) in fragments.iter().enumerate() {
            if i > 0 {
                self.push_str(", ");
            }
            self.push_fragment(fragment);
        }
    }

    /// Copy fragment text, turning each `?` into the next `$n`.
    ///
    /// `?` inside `'..'` and `E'..'` literals and `".."` identifiers is
    /// copied as is; `''`, `""` and backslash escapes in `E''` strings are
    /// understood. Dollar-quoted strings are not, so a `?` inside one must be
    /// written `??`.
    ///
    /// Placeholders beyond the fragment's parameter list are left as `?` so a
    /// malformed fragment fails loudly in PostgreSQL instead of binding the
    /// wrong value.
    fn push_fragment(&mut self, fragment: &Fragment) {
        let mut params = fragment.params.iter();
        let mut state = Lexical::Code;
        let mut prev: Option<char> = None;
        let mut before_prev: Option<char> = None;
        let mut chars = fragment.sql.chars().peekable();

        while let Some(c) = chars.next() {
            match (state, c) {
                (Lexical::Code, '\'') => {
                    let escaped = matches!(prev, Some('E' | 'e'))
                        && !before_prev.map_or(false, |p| p.is_alphanumeric() || p == '_');
                    state = Lexical::Literal { escaped };
                    self.sql.push(c);
                }
                (Lexical::Code, '"') => {
                    state = Lexical::Identifier;
                    self.sql.push(c);
                }
                (Lexical::Code, '?') => {
                    if chars.peek() == Some(&'?') {
                        chars.next();
                        self.sql.push('?');
                    } else if let Some(param) = params.next() {
                        self.push_param(param.clone());
                    } else {
                        self.sql.push('?');
                    }
                }
                (Lexical::Literal { escaped: true }, '\\') => {
                    self.sql.push(c);
                    if let Some(next) = chars.next() {
                        self.sql.push(next);
                    }
                }
                (Lexical::Literal { .. }, '\'') => {
                    self.sql.push(c);
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        self.sql.push('\'');
                    } else {
                        state = Lexical::Code;
                    }
                }
                (Lexical::Identifier, '"') => {
                    state = Lexical::Code;
                    self.sql.push(c);
                }
                _ => self.sql.push(c),
            }
            before_prev = prev;
            prev = Some(c);
        }
    }

    fn finish(self) -> SqlQuery {
        SqlQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}
