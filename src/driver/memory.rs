//! In-memory driver loaded from a TOML fixture.
//!
//! Serves catalog calls from the fixture's tables, procedures and foreign
//! keys, and answers statements from canned queries. `SELECT * FROM t`
//! (with an optional `TOP n` or `LIMIT n`) returns the fixture rows of `t`
//! and `USE name` switches the current catalog. Anything else fails the way
//! a real server would.
//!
//! Canned queries may carry a delay; delays are spent in short slices that
//! observe [`Cursor::cancel`], so cancellation can be exercised end to end.
//!
//! ```toml
//! [[data_sources]]
//! name = "warehouse"
//! dbms_name = "PostgreSQL"
//! current_catalog = "sales"
//!
//! [[data_sources.tables]]
//! catalog = "sales"
//! schema = "public"
//! name = "orders"
//! columns = [{ name = "id", type_name = "integer" }]
//! rows = [[1], [2]]
//! ```

use regex::Regex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::{
    ColumnDescription, ColumnRow, Cursor, DataSourceInfo, DatabaseError, DbConnection, DbResult,
    Driver, ForeignKeyRow, InfoType, ProcedureColumnRow, ProcedureRow, Row, TableRow, Value,
    parse_connection_string,
};
use crate::error::{ConfigError, ConnectionError, Result};

static USE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^use\s+(\S+)$").expect("valid regex"));

static SELECT_STAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^select\s+(?:top\s+(\d+)\s+)?\*\s+from\s+(\S+)").expect("valid regex")
});

static LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\slimit\s+(\d+)$").expect("valid regex"));

/// Root of a fixture file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub data_sources: Vec<SourceFixture>,
}

/// One data source and everything reachable through it.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceFixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_dbms_name")]
    pub dbms_name: String,
    #[serde(default = "default_quote_char")]
    pub quote_char: String,
    #[serde(default = "default_search_escape")]
    pub search_escape: String,
    #[serde(default = "default_catalog_support")]
    pub catalog_support: bool,
    #[serde(default)]
    pub current_catalog: String,
    /// Catalog names; derived from the tables when empty.
    #[serde(default)]
    pub catalogs: Vec<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub connect_delay_ms: u64,
    #[serde(default)]
    pub tables: Vec<TableFixture>,
    #[serde(default)]
    pub procedures: Vec<ProcedureFixture>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyFixture>,
    #[serde(default)]
    pub queries: Vec<QueryFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableFixture {
    #[serde(default)]
    pub catalog: String,
    #[serde(default)]
    pub schema: String,
    pub name: String,
    #[serde(default = "default_table_kind")]
    pub kind: String,
    #[serde(default)]
    pub columns: Vec<ColumnFixture>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnFixture {
    pub name: String,
    #[serde(default = "default_type_name")]
    pub type_name: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcedureFixture {
    #[serde(default)]
    pub catalog: String,
    #[serde(default)]
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ColumnFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForeignKeyFixture {
    #[serde(default)]
    pub catalog: String,
    #[serde(default)]
    pub parent_schema: String,
    pub parent_table: String,
    pub parent_column: String,
    #[serde(default)]
    pub child_schema: String,
    pub child_table: String,
    pub child_column: String,
}

/// A statement with a fixed outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryFixture {
    pub sql: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub delay_ms: u64,
    /// Delay spent in every `fetch_many` call of the result.
    #[serde(default)]
    pub fetch_delay_ms: u64,
    /// Catalog made current by the statement.
    #[serde(default)]
    pub switch_catalog: Option<String>,
}

fn default_dbms_name() -> String {
    "Memory".to_string()
}

fn default_quote_char() -> String {
    "\"".to_string()
}

fn default_search_escape() -> String {
    "\\".to_string()
}

fn default_catalog_support() -> bool {
    true
}

fn default_table_kind() -> String {
    "TABLE".to_string()
}

fn default_type_name() -> String {
    "varchar".to_string()
}

fn default_nullable() -> bool {
    true
}

/// Fixture-backed implementation of [`Driver`].
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    sources: Vec<Arc<SourceFixture>>,
}

impl MemoryDriver {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            sources: fixture.data_sources.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let fixture: Fixture =
            toml::from_str(text).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        Ok(Self::new(fixture))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn source(&self, dsn: &str) -> Option<Arc<SourceFixture>> {
        self.sources
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(dsn))
            .cloned()
    }
}

impl Driver for MemoryDriver {
    fn data_sources(&self) -> Vec<DataSourceInfo> {
        self.sources
            .iter()
            .map(|s| DataSourceInfo {
                name: s.name.clone(),
                description: s.description.clone(),
            })
            .collect()
    }

    fn connect(
        &self,
        conn_str: &str,
        timeout: Duration,
    ) -> std::result::Result<Arc<dyn DbConnection>, ConnectionError> {
        let parts = parse_connection_string(conn_str);
        let value = |key: &str| {
            parts
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        let dsn = value("DSN");
        let source = self.source(&dsn).ok_or_else(|| {
            ConnectionError::ConnectFailed(format!("[IM002] Data source name not found: {dsn}"))
        })?;

        let delay = Duration::from_millis(source.connect_delay_ms);
        if delay > timeout {
            thread::sleep(timeout);
            return Err(ConnectionError::Timeout);
        }
        thread::sleep(delay);

        if let Some(user) = &source.user {
            let password = source.password.clone().unwrap_or_default();
            if value("UID") != *user || value("PWD") != password {
                return Err(ConnectionError::ConnectFailed(format!(
                    "[28000] Login failed for user '{}'",
                    value("UID")
                )));
            }
        }

        Ok(Arc::new(MemoryConnection::new(source)))
    }
}

struct MemoryConnection {
    source: Arc<SourceFixture>,
    catalog: Arc<Mutex<String>>,
    open: AtomicBool,
}

impl MemoryConnection {
    fn new(source: Arc<SourceFixture>) -> Self {
        let catalog = Arc::new(Mutex::new(source.current_catalog.clone()));
        Self {
            source,
            catalog,
            open: AtomicBool::new(true),
        }
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DatabaseError::with_state("Connection is closed", "08003"))
        }
    }

    fn escape(&self) -> Option<char> {
        self.source.search_escape.chars().next()
    }

    fn tables_matching<'a>(
        &'a self,
        catalog: &'a str,
        schema: &'a str,
        table: &'a str,
    ) -> impl Iterator<Item = &'a TableFixture> + 'a {
        let esc = self.escape();
        self.source.tables.iter().filter(move |t| {
            like_match(catalog, &t.catalog, esc)
                && like_match(schema, &t.schema, esc)
                && like_match(table, &t.name, esc)
        })
    }
}

impl DbConnection for MemoryConnection {
    fn get_info(&self, info: InfoType) -> DbResult<String> {
        self.ensure_open()?;
        Ok(match info {
            InfoType::IdentifierQuoteChar => self.source.quote_char.clone(),
            InfoType::SearchPatternEscape => self.source.search_escape.clone(),
            InfoType::DbmsName => self.source.dbms_name.clone(),
            InfoType::CatalogNameSupport => {
                if self.source.catalog_support { "Y" } else { "N" }.to_string()
            }
        })
    }

    fn cursor(&self) -> DbResult<Arc<dyn Cursor>> {
        self.ensure_open()?;
        Ok(Arc::new(MemoryCursor::new(
            Arc::clone(&self.source),
            Arc::clone(&self.catalog),
        )))
    }

    fn list_catalogs(&self) -> DbResult<Vec<String>> {
        self.ensure_open()?;
        if !self.source.catalog_support {
            return Ok(Vec::new());
        }
        if !self.source.catalogs.is_empty() {
            return Ok(self.source.catalogs.clone());
        }
        Ok(distinct(
            self.source.tables.iter().map(|t| t.catalog.clone()),
        ))
    }

    fn list_schemas(&self, catalog: Option<&str>) -> DbResult<Vec<String>> {
        self.ensure_open()?;
        let catalog = match catalog {
            Some(c) => c.to_string(),
            None => self.current_catalog()?,
        };
        let esc = self.escape();
        Ok(distinct(
            self.source
                .tables
                .iter()
                .filter(|t| like_match(&catalog, &t.catalog, esc))
                .map(|t| t.schema.clone()),
        ))
    }

    fn find_tables(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
        table_type: &str,
    ) -> DbResult<Vec<TableRow>> {
        self.ensure_open()?;
        Ok(self
            .tables_matching(catalog, schema, table)
            .filter(|t| type_matches(table_type, &t.kind))
            .map(|t| TableRow {
                catalog: t.catalog.clone(),
                schema: t.schema.clone(),
                name: t.name.clone(),
                kind: t.kind.clone(),
            })
            .collect())
    }

    fn find_columns(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
        column: &str,
    ) -> DbResult<Vec<ColumnRow>> {
        self.ensure_open()?;
        let esc = self.escape();
        let mut rows = Vec::new();
        for t in self.tables_matching(catalog, schema, table) {
            for c in t.columns.iter().filter(|c| like_match(column, &c.name, esc)) {
                rows.push(ColumnRow {
                    catalog: t.catalog.clone(),
                    schema: t.schema.clone(),
                    table: t.name.clone(),
                    column: c.name.clone(),
                    type_name: c.type_name.clone(),
                    nullable: c.nullable,
                    default: c.default.clone(),
                });
            }
        }
        Ok(rows)
    }

    fn find_procedures(
        &self,
        catalog: &str,
        schema: &str,
        procedure: &str,
    ) -> DbResult<Vec<ProcedureRow>> {
        self.ensure_open()?;
        let esc = self.escape();
        Ok(self
            .source
            .procedures
            .iter()
            .filter(|p| {
                like_match(catalog, &p.catalog, esc)
                    && like_match(schema, &p.schema, esc)
                    && like_match(procedure, &p.name, esc)
            })
            .map(|p| ProcedureRow {
                catalog: p.catalog.clone(),
                schema: p.schema.clone(),
                name: p.name.clone(),
            })
            .collect())
    }

    fn find_procedure_columns(
        &self,
        catalog: &str,
        schema: &str,
        procedure: &str,
        column: &str,
    ) -> DbResult<Vec<ProcedureColumnRow>> {
        self.ensure_open()?;
        let esc = self.escape();
        let mut rows = Vec::new();
        for p in self.source.procedures.iter().filter(|p| {
            like_match(catalog, &p.catalog, esc)
                && like_match(schema, &p.schema, esc)
                && like_match(procedure, &p.name, esc)
        }) {
            for c in p.parameters.iter().filter(|c| like_match(column, &c.name, esc)) {
                rows.push(ProcedureColumnRow {
                    procedure: p.name.clone(),
                    column: c.name.clone(),
                    type_name: c.type_name.clone(),
                });
            }
        }
        Ok(rows)
    }

    fn foreign_keys(&self, catalog: &str, schema: &str, table: &str) -> DbResult<Vec<ForeignKeyRow>> {
        self.ensure_open()?;
        let same = |a: &str, b: &str| b.is_empty() || a.eq_ignore_ascii_case(b);
        Ok(self
            .source
            .foreign_keys
            .iter()
            .filter(|fk| same(&fk.catalog, catalog))
            .filter(|fk| {
                (fk.child_table.eq_ignore_ascii_case(table) && same(&fk.child_schema, schema))
                    || (fk.parent_table.eq_ignore_ascii_case(table)
                        && same(&fk.parent_schema, schema))
            })
            .map(|fk| ForeignKeyRow {
                parent_schema: fk.parent_schema.clone(),
                parent_table: fk.parent_table.clone(),
                parent_column: fk.parent_column.clone(),
                child_schema: fk.child_schema.clone(),
                child_table: fk.child_table.clone(),
                child_column: fk.child_column.clone(),
            })
            .collect())
    }

    fn connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn current_catalog(&self) -> DbResult<String> {
        self.ensure_open()?;
        Ok(self.catalog.lock().unwrap().clone())
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CursorState {
    rows: VecDeque<Row>,
    description: Option<Vec<ColumnDescription>>,
    fetch_delay: Duration,
}

struct MemoryCursor {
    source: Arc<SourceFixture>,
    catalog: Arc<Mutex<String>>,
    state: Mutex<CursorState>,
    cancelled: AtomicBool,
    closed: AtomicBool,
}

impl MemoryCursor {
    fn new(source: Arc<SourceFixture>, catalog: Arc<Mutex<String>>) -> Self {
        Self {
            source,
            catalog,
            state: Mutex::new(CursorState::default()),
            cancelled: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Sleep for `delay`, giving up early when cancelled.
    fn pause(&self, delay: Duration) -> DbResult<()> {
        let deadline = Instant::now() + delay;
        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                return Err(DatabaseError::with_state("Operation canceled", "HY008"));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep((deadline - now).min(Duration::from_millis(5)));
        }
    }

    fn set_result(&self, columns: Vec<ColumnDescription>, rows: Vec<Row>, fetch_delay: Duration) {
        let mut state = self.state.lock().unwrap();
        state.description = if columns.is_empty() { None } else { Some(columns) };
        state.rows = rows.into();
        state.fetch_delay = fetch_delay;
    }

    fn select_star(&self, caps: &regex::Captures<'_>, sql: &str) -> DbResult<()> {
        let path: Vec<String> = caps[2]
            .split('.')
            .map(|p| p.trim_matches(|c| matches!(c, '"' | '[' | ']' | '`')).to_string())
            .collect();
        let (name, schema) = match path.as_slice() {
            [.., schema, name] => (name.as_str(), Some(schema.as_str())),
            [name] => (name.as_str(), None),
            [] => ("", None),
        };
        let table = self
            .source
            .tables
            .iter()
            .find(|t| {
                t.name.eq_ignore_ascii_case(name)
                    && schema.is_none_or(|s| t.schema.eq_ignore_ascii_case(s))
            })
            .ok_or_else(|| {
                DatabaseError::with_state(format!("Invalid object name '{}'", &caps[2]), "42S02")
            })?;

        let limit = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .or_else(|| LIMIT_RE.captures(sql).map(|c| c[1].to_string()))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(usize::MAX);
        let columns = table
            .columns
            .iter()
            .map(|c| ColumnDescription {
                name: c.name.clone(),
                type_name: c.type_name.clone(),
            })
            .collect();
        let rows = table.rows.iter().take(limit).cloned().collect();
        self.set_result(columns, rows, Duration::ZERO);
        Ok(())
    }
}

impl Cursor for MemoryCursor {
    fn execute(&self, sql: &str, _params: &[Value]) -> DbResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DatabaseError::new("Cursor is closed"));
        }
        let normalized = normalize_sql(sql);

        if let Some(q) = self
            .source
            .queries
            .iter()
            .find(|q| normalize_sql(&q.sql).eq_ignore_ascii_case(&normalized))
        {
            self.pause(Duration::from_millis(q.delay_ms))?;
            if let Some(message) = &q.error {
                return Err(DatabaseError::new(message.clone()));
            }
            if let Some(catalog) = &q.switch_catalog {
                *self.catalog.lock().unwrap() = catalog.clone();
            }
            let columns = q
                .columns
                .iter()
                .map(|name| ColumnDescription {
                    name: name.clone(),
                    type_name: String::new(),
                })
                .collect();
            self.set_result(columns, q.rows.clone(), Duration::from_millis(q.fetch_delay_ms));
            return Ok(());
        }

        if let Some(caps) = USE_RE.captures(&normalized) {
            let name = caps[1].trim_matches(|c| matches!(c, '"' | '[' | ']' | '`'));
            let known = self.source.catalogs.iter().any(|c| c.eq_ignore_ascii_case(name))
                || self.source.tables.iter().any(|t| t.catalog.eq_ignore_ascii_case(name));
            if !known {
                return Err(DatabaseError::with_state(
                    format!("Database '{name}' does not exist"),
                    "08004",
                ));
            }
            *self.catalog.lock().unwrap() = name.to_string();
            self.set_result(Vec::new(), Vec::new(), Duration::ZERO);
            return Ok(());
        }

        if let Some(caps) = SELECT_STAR_RE.captures(&normalized) {
            return self.select_star(&caps, &normalized);
        }

        Err(DatabaseError::with_state(
            format!("Syntax error or access violation: {sql}"),
            "42000",
        ))
    }

    fn fetch_many(&self, n: usize) -> DbResult<Vec<Row>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DatabaseError::new("Cursor is closed"));
        }
        let delay = self.state.lock().unwrap().fetch_delay;
        self.pause(delay)?;
        let mut state = self.state.lock().unwrap();
        let take = n.min(state.rows.len());
        Ok(state.rows.drain(..take).collect())
    }

    fn cancel(&self) -> DbResult<()> {
        self.cancelled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn description(&self) -> Option<Vec<ColumnDescription>> {
        self.state.lock().unwrap().description.clone()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.state.lock().unwrap().rows.clear();
    }
}

/// Collapse whitespace and drop a trailing semicolon.
fn normalize_sql(sql: &str) -> String {
    sql.trim()
        .trim_end_matches(';')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn distinct(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

fn type_matches(filter: &str, kind: &str) -> bool {
    let filter = filter.trim();
    if filter.is_empty() || filter == "%" {
        return true;
    }
    filter
        .split(',')
        .map(|t| t.trim().trim_matches('\''))
        .any(|t| t.eq_ignore_ascii_case(kind))
}

enum PatternToken {
    Any,
    One,
    Literal(char),
}

/// Case-insensitive ODBC search-pattern match.
fn like_match(pattern: &str, value: &str, escape: Option<char>) -> bool {
    if pattern.is_empty() || pattern == "%" {
        return true;
    }
    if pattern == "\0" {
        return value.is_empty();
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if Some(c) == escape {
            tokens.push(PatternToken::Literal(chars.next().unwrap_or(c)));
        } else if c == '%' {
            tokens.push(PatternToken::Any);
        } else if c == '_' {
            tokens.push(PatternToken::One);
        } else {
            tokens.push(PatternToken::Literal(c));
        }
    }

    let value: Vec<char> = value.chars().collect();
    // matched[j]: the pattern prefix processed so far matches value[..j]
    let mut matched = vec![false; value.len() + 1];
    matched[0] = true;
    for token in &tokens {
        let mut next = vec![false; value.len() + 1];
        match token {
            PatternToken::Any => {
                let mut seen = false;
                for j in 0..=value.len() {
                    seen |= matched[j];
                    next[j] = seen;
                }
            }
            PatternToken::One => {
                for j in 1..=value.len() {
                    next[j] = matched[j - 1];
                }
            }
            PatternToken::Literal(c) => {
                for j in 1..=value.len() {
                    next[j] = matched[j - 1] && value[j - 1].to_lowercase().eq(c.to_lowercase());
                }
            }
        }
        matched = next;
    }
    matched[value.len()]
}
