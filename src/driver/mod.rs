//! Database driver capability surface.
//!
//! A driver hands out connections, connections hand out cursors. Every call
//! is synchronous; the session layer decides which thread makes it and
//! serializes calls on a connection. All handle methods take `&self` so a
//! cursor can be cancelled from a thread other than the one blocked in
//! `execute`.
//!
//! Catalog functions take ODBC-style search patterns: `""` and `"%"` match
//! everything, `_` and `%` are wildcards escaped with the driver's search
//! escape character, and `"\0"` selects objects without a catalog or schema.

pub mod memory;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConnectionError;

pub use memory::MemoryDriver;

/// Error reported by the driver for a statement or catalog call.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseError {
    pub message: String,
    pub sqlstate: Option<String>,
}

impl DatabaseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sqlstate: None,
        }
    }

    pub fn with_state(message: impl Into<String>, sqlstate: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sqlstate: Some(sqlstate.into()),
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sqlstate {
            Some(state) => write!(f, "[{state}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for DatabaseError {}

pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Driver information codes understood by [`DbConnection::get_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoType {
    IdentifierQuoteChar,
    SearchPatternEscape,
    DbmsName,
    /// "Y" when the driver supports catalogs.
    CatalogNameSupport,
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

pub type Row = Vec<Value>;

/// Result-set column metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescription {
    pub name: String,
    pub type_name: String,
}

/// A data source the driver knows about.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceInfo {
    pub name: String,
    pub description: String,
}

/// Row returned by `find_tables`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub catalog: String,
    pub schema: String,
    pub name: String,
    /// `TABLE`, `VIEW`, `SYSTEM TABLE`...
    pub kind: String,
}

/// Row returned by `find_columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRow {
    pub catalog: String,
    pub schema: String,
    pub table: String,
    pub column: String,
    pub type_name: String,
    pub nullable: bool,
    pub default: Option<String>,
}

/// Row returned by `find_procedures`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureRow {
    pub catalog: String,
    pub schema: String,
    pub name: String,
}

/// Row returned by `find_procedure_columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureColumnRow {
    pub procedure: String,
    pub column: String,
    pub type_name: String,
}

/// A foreign-key column pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyRow {
    pub parent_schema: String,
    pub parent_table: String,
    pub parent_column: String,
    pub child_schema: String,
    pub child_table: String,
    pub child_column: String,
}

/// Entry point of a driver binding.
pub trait Driver: Send + Sync {
    /// Data sources available to this driver.
    fn data_sources(&self) -> Vec<DataSourceInfo>;

    /// Open a connection described by an ODBC connection string.
    fn connect(&self, conn_str: &str, timeout: Duration)
    -> Result<Arc<dyn DbConnection>, ConnectionError>;
}

/// A live connection.
pub trait DbConnection: Send + Sync {
    fn get_info(&self, info: InfoType) -> DbResult<String>;

    fn cursor(&self) -> DbResult<Arc<dyn Cursor>>;

    fn list_catalogs(&self) -> DbResult<Vec<String>>;

    /// Schemas of `catalog`, or of the current catalog when `None`.
    fn list_schemas(&self, catalog: Option<&str>) -> DbResult<Vec<String>>;

    fn find_tables(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
        table_type: &str,
    ) -> DbResult<Vec<TableRow>>;

    fn find_columns(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
        column: &str,
    ) -> DbResult<Vec<ColumnRow>>;

    fn find_procedures(
        &self,
        catalog: &str,
        schema: &str,
        procedure: &str,
    ) -> DbResult<Vec<ProcedureRow>>;

    fn find_procedure_columns(
        &self,
        catalog: &str,
        schema: &str,
        procedure: &str,
        column: &str,
    ) -> DbResult<Vec<ProcedureColumnRow>>;

    /// Foreign keys in which `table` takes part on either side.
    fn foreign_keys(&self, _catalog: &str, _schema: &str, _table: &str) -> DbResult<Vec<ForeignKeyRow>> {
        Ok(Vec::new())
    }

    fn connected(&self) -> bool;

    fn current_catalog(&self) -> DbResult<String>;

    fn close(&self);
}

/// A statement handle.
pub trait Cursor: Send + Sync {
    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<()>;

    /// Up to `n` rows; an empty vector means the result set is exhausted.
    fn fetch_many(&self, n: usize) -> DbResult<Vec<Row>>;

    /// Abort a running `execute` or `fetch_many`. Safe to call from any thread.
    fn cancel(&self) -> DbResult<()>;

    /// Columns of the current result set, `None` when the statement produced none.
    fn description(&self) -> Option<Vec<ColumnDescription>>;

    fn close(&self);
}

/// Build the connection string handed to [`Driver::connect`].
pub fn connection_string(dsn: &str, username: &str, password: &str) -> String {
    let mut s = format!("DSN={dsn};");
    if !username.is_empty() {
        s.push_str(&format!("UID={username};"));
    }
    if !password.is_empty() {
        s.push_str(&format!("PWD={password};"));
    }
    s
}

/// Split a connection string into upper-cased keys and values.
pub fn parse_connection_string(conn_str: &str) -> Vec<(String, String)> {
    conn_str
        .split(';')
        .filter_map(|part| {
            let (k, v) = part.split_once('=')?;
            Some((k.trim().to_uppercase(), v.trim().to_string()))
        })
        .collect()
}
