//! Parameterized SQL construction.
//!
//! Every caller-supplied value is bound; identifiers are validated against a
//! conservative pattern and quoted for the dialect. The row query and the
//! count query of a listing share the same condition list.
//!
//! ```ignore
//! let query = QueryBuilder::new("users")
//!     .where_eq("email", json!("a@b.com"))
//!     .where_any(vec![Condition::contains("username", "jo")])
//!     .order_by("id", true)
//!     .limit(10)
//!     .build_select(&["*"])?;
//! ```

use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders.
    #[default]
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite => "?".to_string(),
        }
    }
}

impl FromStr for Dialect {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(Dialect::Generic),
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(QueryError::UnknownDialect(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierPolicy {
    /// Validate identifiers against a conservative pattern.
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    #[default]
    Quote,
}

/// A parameterized statement ready for a storage collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<Value>,
}

/// One predicate of a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    /// Raw LIKE pattern; `\` escapes `%` and `_`.
    Like(String, String),
    IsNull(String),
    /// Parenthesized OR group.
    AnyOf(Vec<Condition>),
}

impl Condition {
    pub fn eq(column: &str, value: Value) -> Self {
        Condition::Eq(column.to_string(), value)
    }

    /// Substring match: `term` is escaped and wrapped in `%`.
    pub fn contains(column: &str, term: &str) -> Self {
        Condition::Like(column.to_string(), format!("%{}%", escape_like(term)))
    }
}

/// Escape LIKE wildcards so `term` matches literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A fluent query builder over one table.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    conditions: Vec<Condition>,
    order: Vec<(String, bool)>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
}

struct Placeholders {
    dialect: Dialect,
    next: usize,
}

impl Placeholders {
    fn new(dialect: Dialect) -> Self {
        Self { dialect, next: 1 }
    }

    fn next(&mut self) -> String {
        let p = self.dialect.placeholder(self.next);
        self.next += 1;
        p
    }
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            dialect: Dialect::Generic,
            identifier_policy: IdentifierPolicy::Quote,
        }
    }

    /// Create a new builder with an explicit SQL dialect.
    pub fn new_with_dialect(table: &str, dialect: Dialect) -> Self {
        Self::new(table).dialect(dialect)
    }

    /// Set the SQL dialect (affects placeholder style).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn where_eq(self, column: &str, value: Value) -> Self {
        self.condition(Condition::eq(column, value))
    }

    pub fn where_null(self, column: &str) -> Self {
        self.condition(Condition::IsNull(column.to_string()))
    }

    /// OR the given conditions together as one AND-ed group. An empty group
    /// is ignored.
    pub fn where_any(self, conditions: Vec<Condition>) -> Self {
        if conditions.is_empty() {
            return self;
        }
        self.condition(Condition::AnyOf(conditions))
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// `SELECT <columns> FROM <table> [WHERE ..] [ORDER BY ..] [LIMIT ..] [OFFSET ..]`.
    pub fn build_select(&self, columns: &[&str]) -> Result<Query, QueryError> {
        let table = self.ident(&self.table, false, "table")?;
        let columns = self.column_list(columns)?;
        let mut sql = format!("SELECT {columns} FROM {table}");
        let mut params = Vec::new();
        let mut ph = Placeholders::new(self.dialect);
        self.append_where(&mut sql, &mut params, &mut ph)?;
        self.append_order(&mut sql)?;
        self.append_limit_offset(&mut sql);
        Ok(Query { sql, params })
    }

    /// `SELECT COUNT(*) AS total FROM <table> [WHERE ..]`, same predicate as
    /// [`build_select`](Self::build_select).
    pub fn build_count(&self) -> Result<Query, QueryError> {
        let table = self.ident(&self.table, false, "table")?;
        let mut sql = format!("SELECT COUNT(*) AS total FROM {table}");
        let mut params = Vec::new();
        let mut ph = Placeholders::new(self.dialect);
        self.append_where(&mut sql, &mut params, &mut ph)?;
        Ok(Query { sql, params })
    }

    /// `INSERT INTO <table> (..) VALUES (..) RETURNING *`.
    pub fn build_insert(&self, values: &[(String, Value)]) -> Result<Query, QueryError> {
        let table = self.ident(&self.table, false, "table")?;
        if values.is_empty() {
            return Ok(Query {
                sql: format!("INSERT INTO {table} DEFAULT VALUES RETURNING *"),
                params: Vec::new(),
            });
        }
        let mut ph = Placeholders::new(self.dialect);
        let mut columns = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());
        let mut params = Vec::with_capacity(values.len());
        for (col, val) in values {
            columns.push(self.ident(col, false, "column")?);
            placeholders.push(ph.next());
            params.push(val.clone());
        }
        Ok(Query {
            sql: format!(
                "INSERT INTO {table} ({}) VALUES ({}) RETURNING *",
                columns.join(", "),
                placeholders.join(", ")
            ),
            params,
        })
    }

    /// `UPDATE <table> SET .. WHERE .. RETURNING *`. Refuses an empty change
    /// set and a missing predicate.
    pub fn build_update(&self, values: &[(String, Value)]) -> Result<Query, QueryError> {
        if values.is_empty() {
            return Err(QueryError::EmptyUpdate);
        }
        if self.conditions.is_empty() {
            return Err(QueryError::MissingPredicate("UPDATE"));
        }
        let table = self.ident(&self.table, false, "table")?;
        let mut ph = Placeholders::new(self.dialect);
        let mut params = Vec::with_capacity(values.len());
        let mut sets = Vec::with_capacity(values.len());
        for (col, val) in values {
            let col = self.ident(col, false, "column")?;
            sets.push(format!("{col} = {}", ph.next()));
            params.push(val.clone());
        }
        let mut sql = format!("UPDATE {table} SET {}", sets.join(", "));
        self.append_where(&mut sql, &mut params, &mut ph)?;
        sql.push_str(" RETURNING *");
        Ok(Query { sql, params })
    }

    /// `DELETE FROM <table> WHERE .. RETURNING *`. Refuses a missing predicate.
    pub fn build_delete(&self) -> Result<Query, QueryError> {
        if self.conditions.is_empty() {
            return Err(QueryError::MissingPredicate("DELETE"));
        }
        let table = self.ident(&self.table, false, "table")?;
        let mut sql = format!("DELETE FROM {table}");
        let mut params = Vec::new();
        let mut ph = Placeholders::new(self.dialect);
        self.append_where(&mut sql, &mut params, &mut ph)?;
        sql.push_str(" RETURNING *");
        Ok(Query { sql, params })
    }

    fn append_where(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
        ph: &mut Placeholders,
    ) -> Result<(), QueryError> {
        if self.conditions.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(self.conditions.len());
        for cond in &self.conditions {
            clauses.push(self.render_condition(cond, params, ph)?);
        }
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
        Ok(())
    }

    fn render_condition(
        &self,
        cond: &Condition,
        params: &mut Vec<Value>,
        ph: &mut Placeholders,
    ) -> Result<String, QueryError> {
        match cond {
            Condition::Eq(col, val) => {
                let col = self.ident(col, false, "column")?;
                params.push(val.clone());
                Ok(format!("{col} = {}", ph.next()))
            }
            Condition::Like(col, pattern) => {
                let col = self.ident(col, false, "column")?;
                params.push(Value::String(pattern.clone()));
                Ok(format!("{col} LIKE {} ESCAPE '\\'", ph.next()))
            }
            Condition::IsNull(col) => {
                let col = self.ident(col, false, "column")?;
                Ok(format!("{col} IS NULL"))
            }
            Condition::AnyOf(group) => {
                if group.is_empty() {
                    return Err(QueryError::EmptyGroup);
                }
                let mut parts = Vec::with_capacity(group.len());
                for c in group {
                    parts.push(self.render_condition(c, params, ph)?);
                }
                Ok(format!("({})", parts.join(" OR ")))
            }
        }
    }

    fn append_order(&self, sql: &mut String) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(self.order.len());
        for (col, asc) in &self.order {
            let col = self.ident(col, false, "column")?;
            clauses.push(if *asc {
                format!("{col} ASC")
            } else {
                format!("{col} DESC")
            });
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&clauses.join(", "));
        Ok(())
    }

    fn append_limit_offset(&self, sql: &mut String) {
        if let Some(limit) = self.limit_val {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset_val {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    fn column_list(&self, columns: &[&str]) -> Result<String, QueryError> {
        if columns.is_empty() {
            return Ok("*".to_string());
        }
        let mut out = Vec::with_capacity(columns.len());
        for col in columns {
            out.push(self.ident(col, true, "column")?);
        }
        Ok(out.join(", "))
    }

    fn ident(&self, ident: &str, allow_star: bool, kind: &'static str) -> Result<String, QueryError> {
        if !is_valid_identifier(ident, allow_star) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.identifier_policy {
            IdentifierPolicy::Quote => Ok(quote_identifier(ident, allow_star)),
            IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    UnknownDialect(String),
    EmptyUpdate,
    EmptyGroup,
    MissingPredicate(&'static str),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::UnknownDialect(d) => write!(f, "Unknown SQL dialect: {d}"),
            QueryError::EmptyUpdate => write!(f, "UPDATE without any column to set"),
            QueryError::EmptyGroup => write!(f, "Empty OR group"),
            QueryError::MissingPredicate(stmt) => write!(f, "{stmt} without a WHERE clause"),
        }
    }
}

impl std::error::Error for QueryError {}

pub(crate) fn is_valid_identifier(ident: &str, allow_star: bool) -> bool {
    if ident.is_empty() {
        return false;
    }
    let parts: Vec<&str> = ident.split('.').collect();
    for (idx, part) in parts.iter().enumerate() {
        if allow_star && *part == "*" {
            return idx + 1 == parts.len();
        }
        if !is_valid_segment(part) {
            return false;
        }
    }
    true
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(ident: &str, allow_star: bool) -> String {
    let parts: Vec<&str> = ident.split('.').collect();
    let last_idx = parts.len().saturating_sub(1);
    parts
        .into_iter()
        .enumerate()
        .map(|(idx, part)| {
            if allow_star && part == "*" && idx == last_idx {
                part.to_string()
            } else {
                format!("\"{part}\"")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
