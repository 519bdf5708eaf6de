//! Row sources: where exported rows come from.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use schemaforge_core::{Dialect, Error, Result};
use serde_json::{Map, Value};
use sqlx::{MySqlPool, PgPool};

/// One exported row, keyed by column name.
pub type Row = Map<String, Value>;

/// What to read from one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowQuery {
    pub schema: String,
    pub table: String,
    /// Columns in output order.
    pub columns: Vec<String>,
    pub where_clause: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<u64>,
}

impl RowQuery {
    /// `FROM ... WHERE ... ORDER BY ... LIMIT ...` tail shared by every SQL source.
    pub fn select_tail(&self, dialect: Dialect) -> String {
        let schema = if dialect == Dialect::MySql { "" } else { self.schema.as_str() };
        let mut sql = format!("FROM {}", dialect.qualified_table(schema, &self.table));
        if let Some(condition) = self.where_clause.as_deref().filter(|c| !c.trim().is_empty()) {
            sql.push_str(&format!(" WHERE {condition}"));
        }
        if let Some(order) = self.order_by.as_deref().filter(|o| !o.trim().is_empty()) {
            sql.push_str(&format!(" ORDER BY {order}"));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        sql
    }

    /// Plain `SELECT *` form, used for logging.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        format!("SELECT * {}", self.select_tail(dialect))
    }
}

/// Fetches every matching row of a table as JSON objects.
#[async_trait]
pub trait RowSource: Send + Sync {
    fn dialect(&self) -> Dialect;

    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<Row>>;
}

fn parse_rows(raw: Vec<String>) -> Result<Vec<Row>> {
    raw.into_iter()
        .map(|text| match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::Db(format!("expected a JSON object row, got {other}"))),
        })
        .collect()
}

/// Postgres rows via `row_to_json`.
pub struct PgRowSource {
    pool: PgPool,
}

impl PgRowSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RowSource for PgRowSource {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<Row>> {
        let sql = format!(
            "SELECT row_to_json(t)::text FROM (SELECT * {}) t",
            query.select_tail(Dialect::Postgres)
        );
        let raw: Vec<String> = sqlx::query_scalar(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Error::Db(err.to_string()))?;
        parse_rows(raw)
    }
}

/// MySQL rows via `JSON_OBJECT` over the requested columns.
pub struct MySqlRowSource {
    pool: MySqlPool,
}

impl MySqlRowSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RowSource for MySqlRowSource {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<Row>> {
        if query.columns.is_empty() {
            return Ok(Vec::new());
        }
        let pairs = query
            .columns
            .iter()
            .map(|column| {
                format!(
                    "'{}', {}",
                    column.replace('\'', "''"),
                    Dialect::MySql.quote_ident(column)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT CAST(JSON_OBJECT({pairs}) AS CHAR) {}",
            query.select_tail(Dialect::MySql)
        );
        let raw: Vec<String> = sqlx::query_scalar(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Error::Db(err.to_string()))?;
        parse_rows(raw)
    }
}

/// Rows held in memory, keyed by table name. `WHERE`/`ORDER BY` are ignored.
#[derive(Debug, Clone)]
pub struct MemoryRowSource {
    dialect: Dialect,
    tables: BTreeMap<String, Vec<Row>>,
    failing: BTreeSet<String>,
}

impl MemoryRowSource {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            tables: BTreeMap::new(),
            failing: BTreeSet::new(),
        }
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(table.to_string(), rows);
        self
    }

    /// Make reads of `table` fail.
    pub fn failing(mut self, table: &str) -> Self {
        self.failing.insert(table.to_string());
        self
    }
}

#[async_trait]
impl RowSource for MemoryRowSource {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<Row>> {
        if self.failing.contains(&query.table) {
            return Err(Error::Db(format!("read of {} failed", query.table)));
        }
        let rows = self.tables.get(&query.table).cloned().unwrap_or_default();
        Ok(match query.limit {
            Some(limit) => rows.into_iter().take(limit as usize).collect(),
            None => rows,
        })
    }
}
