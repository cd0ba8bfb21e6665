//! One data source, its live connection and the statement running on it.
//!
//! Statements run on a dedicated worker thread while the caller waits on a
//! channel it can abandon through a [`CancellationToken`]. Result rows are
//! pulled by a second worker into a buffer the caller drains with
//! [`Session::fetch_from_cache`].
//!
//! Locks:
//! - `conn` serializes every driver call on the connection and is held by
//!   the execute worker for the whole statement.
//! - `cursor`, `query`, `status` and `execution` are short-lived and never
//!   held across a driver call, so status reads and [`Session::cancel`]
//!   never queue behind a running statement.
//! - `buffer` may be held while reading `status`, never the other way round.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::identifier::IdentifierCodec;
use super::quirks::{DriverQuirks, QuirkContext, SearchArgs};
use super::status::{ExecutionStatus, Status};
use crate::driver::{
    ColumnRow, Cursor, DbConnection, DbResult, Driver, ForeignKeyRow, InfoType,
    ProcedureColumnRow, ProcedureRow, Row, TableRow, connection_string,
};
use crate::error::{ConnectionError, ExecutionError};
use crate::metadata::{MetadataCache, ObjectType};

/// How often blocked waits look at their interrupt token.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Called from worker threads when the display should refresh.
pub type RedrawHook = Arc<dyn Fn() + Send + Sync>;

pub struct Session {
    dsn: String,
    username: RwLock<String>,
    driver: Arc<dyn Driver>,
    timeout: Duration,

    conn: Mutex<Option<Arc<dyn DbConnection>>>,
    cursor: Mutex<Option<Arc<dyn Cursor>>>,
    query: Mutex<Option<String>>,

    status: RwLock<Status>,
    execution: RwLock<(ExecutionStatus, Option<String>)>,

    buffer: Mutex<VecDeque<Row>>,
    buffer_changed: Condvar,
    fetch_cancel: Mutex<CancellationToken>,
    cancel_requested: AtomicBool,
    exec_worker: Mutex<Option<JoinHandle<()>>>,
    fetch_worker: Mutex<Option<JoinHandle<()>>>,

    quirks: RwLock<DriverQuirks>,
    codec: RwLock<IdentifierCodec>,
    catalog_support: AtomicBool,
    current_catalog: RwLock<String>,
    metadata: MetadataCache,
    redraw: RwLock<Option<RedrawHook>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("dsn", &self.dsn)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(dsn: impl Into<String>, driver: Arc<dyn Driver>, timeout: Duration) -> Self {
        Self {
            dsn: dsn.into(),
            username: RwLock::new(String::new()),
            driver,
            timeout,
            conn: Mutex::new(None),
            cursor: Mutex::new(None),
            query: Mutex::new(None),
            status: RwLock::new(Status::Disconnected),
            execution: RwLock::new((ExecutionStatus::Ok, None)),
            buffer: Mutex::new(VecDeque::new()),
            buffer_changed: Condvar::new(),
            fetch_cancel: Mutex::new(CancellationToken::new()),
            cancel_requested: AtomicBool::new(false),
            exec_worker: Mutex::new(None),
            fetch_worker: Mutex::new(None),
            quirks: RwLock::new(DriverQuirks::default()),
            codec: RwLock::new(IdentifierCodec::default()),
            catalog_support: AtomicBool::new(false),
            current_catalog: RwLock::new(String::new()),
            metadata: MetadataCache::new(),
            redraw: RwLock::new(None),
        }
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn username(&self) -> String {
        self.username.read().unwrap().clone()
    }

    pub fn status(&self) -> Status {
        *self.status.read().unwrap()
    }

    fn set_status(&self, status: Status) {
        let mut current = self.status.write().unwrap();
        if *current != status {
            trace!("{}: {} -> {}", self.dsn, *current, status);
            *current = status;
        }
    }

    /// Move to `to` only when currently in `from`.
    fn transition(&self, from: Status, to: Status) -> bool {
        let mut current = self.status.write().unwrap();
        if *current == from {
            trace!("{}: {} -> {}", self.dsn, from, to);
            *current = to;
            true
        } else {
            false
        }
    }

    pub fn execution_status(&self) -> ExecutionStatus {
        self.execution.read().unwrap().0
    }

    /// Driver text of the last failed statement.
    pub fn execution_error(&self) -> Option<String> {
        self.execution.read().unwrap().1.clone()
    }

    fn set_execution(&self, status: ExecutionStatus, error: Option<String>) {
        *self.execution.write().unwrap() = (status, error);
    }

    pub fn query(&self) -> Option<String> {
        self.query.lock().unwrap().clone()
    }

    pub fn cursor(&self) -> Option<Arc<dyn Cursor>> {
        self.cursor.lock().unwrap().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status() != Status::Disconnected
            && self
                .conn
                .lock()
                .unwrap()
                .as_ref()
                .is_some_and(|c| c.connected())
    }

    /// Connected and not busy with a statement or fetch.
    pub fn is_ready(&self) -> bool {
        self.status().accepts_metadata_calls() && self.is_connected()
    }

    pub fn codec(&self) -> IdentifierCodec {
        self.codec.read().unwrap().clone()
    }

    pub fn quirks(&self) -> DriverQuirks {
        *self.quirks.read().unwrap()
    }

    pub fn catalog_support(&self) -> bool {
        self.catalog_support.load(Ordering::SeqCst)
    }

    pub fn current_catalog(&self) -> String {
        self.current_catalog.read().unwrap().clone()
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    /// Drop everything cached about the database.
    pub fn reset_metadata(&self) {
        self.metadata.reset();
    }

    pub fn set_redraw_hook(&self, hook: RedrawHook) {
        *self.redraw.write().unwrap() = Some(hook);
    }

    fn request_redraw(&self) {
        let hook = self.redraw.read().unwrap().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    pub fn escape_name(&self, name: &str) -> String {
        self.codec.read().unwrap().escape_name(name)
    }

    pub fn unescape_name(&self, name: &str) -> String {
        self.codec.read().unwrap().unescape_name(name)
    }

    pub fn sanitize_search_string(&self, term: &str) -> String {
        self.codec.read().unwrap().sanitize_search_string(term)
    }

    /// Open the connection. A no-op when already connected unless `force`.
    ///
    /// On failure the status is left as it was.
    pub fn connect(&self, username: &str, password: &str, force: bool) -> Result<(), ConnectionError> {
        if self.is_connected() && !force {
            return Ok(());
        }
        let conn_str = connection_string(&self.dsn, username, password);
        debug!("connecting to {} with timeout {:?}", self.dsn, self.timeout);
        let conn = self.driver.connect(&conn_str, self.timeout).inspect_err(|e| {
            debug!("connect to {} failed: {e}", self.dsn);
        })?;

        let info = |kind| conn.get_info(kind).unwrap_or_default();
        let codec = IdentifierCodec::new(
            &info(InfoType::IdentifierQuoteChar),
            &info(InfoType::SearchPatternEscape),
        );
        let dbms = info(InfoType::DbmsName);
        let quirks = DriverQuirks::for_dbms(&dbms);
        let catalog_support = info(InfoType::CatalogNameSupport).eq_ignore_ascii_case("y");
        let current = conn.current_catalog().unwrap_or_default();

        if force {
            self.close_cursor();
        }
        let previous = self.conn.lock().unwrap().replace(conn);
        if let Some(previous) = previous {
            previous.close();
        }
        *self.username.write().unwrap() = username.to_string();
        *self.codec.write().unwrap() = codec;
        *self.quirks.write().unwrap() = quirks;
        self.catalog_support.store(catalog_support, Ordering::SeqCst);
        *self.current_catalog.write().unwrap() = current;
        self.metadata.reset();
        self.set_status(Status::Idle);
        info!("connected to {} ({dbms}, {} rules)", self.dsn, quirks.family);
        Ok(())
    }

    /// Run `sql` on a worker thread and wait for it.
    ///
    /// The wait ends early with [`ExecutionError::Cancelled`] when
    /// `interrupt` fires; the statement keeps running until [`cancel`]
    /// is called. Driver failures are not errors here: they land in
    /// [`execution_status`](Self::execution_status).
    ///
    /// [`cancel`]: Self::cancel
    pub fn execute_async(
        self: &Arc<Self>,
        sql: &str,
        interrupt: &CancellationToken,
    ) -> Result<Option<Arc<dyn Cursor>>, ExecutionError> {
        match self.status() {
            Status::Executing => return Err(ExecutionError::Busy),
            Status::Disconnected => {
                return Err(ExecutionError::CursorError(format!(
                    "{} is not connected",
                    self.dsn
                )));
            }
            _ => {}
        }
        self.close_cursor();
        self.cancel_requested.store(false, Ordering::SeqCst);

        let (done_tx, done_rx) = mpsc::channel();
        let session = Arc::clone(self);
        let statement = sql.to_string();
        let handle = thread::Builder::new()
            .name(format!("sqlnav-exec-{}", self.dsn))
            .spawn(move || {
                session.run_statement(&statement);
                let _ = done_tx.send(());
            })
            .map_err(|e| ExecutionError::CursorError(e.to_string()))?;
        *self.exec_worker.lock().unwrap() = Some(handle);

        loop {
            if interrupt.is_cancelled() {
                debug!("{}: wait for statement interrupted", self.dsn);
                return Err(ExecutionError::Cancelled(sql.to_string()));
            }
            match done_rx.recv_timeout(POLL_INTERVAL) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => continue,
            }
        }
        self.join_exec_worker();
        Ok(self.cursor())
    }

    fn run_statement(&self, sql: &str) {
        let guard = self.conn.lock().unwrap();
        let Some(conn) = guard.as_ref() else {
            self.set_execution(ExecutionStatus::Fail, Some("Not connected".to_string()));
            return;
        };

        let previous = self.cursor.lock().unwrap().take();
        if let Some(previous) = previous {
            previous.close();
        }
        let cursor = match conn.cursor() {
            Ok(cursor) => cursor,
            Err(e) => {
                warn!("{}: could not open cursor: {e}", self.dsn);
                self.set_execution(ExecutionStatus::Fail, Some(e.to_string()));
                return;
            }
        };
        *self.cursor.lock().unwrap() = Some(Arc::clone(&cursor));
        *self.query.lock().unwrap() = Some(sql.to_string());

        // Checked after the cursor is published: a cancel either sees the
        // cursor or leaves this flag for us.
        if self.cancel_requested.swap(false, Ordering::SeqCst) {
            debug!("{}: cancelled before execute, skipping {sql}", self.dsn);
            self.set_execution(ExecutionStatus::Fail, Some("Operation canceled".to_string()));
            self.set_status(Status::Idle);
            return;
        }
        self.set_status(Status::Executing);

        debug!("{}: executing {sql}", self.dsn);
        match cursor.execute(sql, &[]) {
            Ok(()) => {
                let status = if cursor.description().is_some() {
                    ExecutionStatus::OkWithResults
                } else {
                    ExecutionStatus::Ok
                };
                self.set_execution(status, None);
            }
            Err(e) => {
                warn!("{}: statement failed: {e}", self.dsn);
                self.set_execution(ExecutionStatus::Fail, Some(e.to_string()));
            }
        }

        // A statement may have switched databases.
        match conn.current_catalog() {
            Ok(catalog) => {
                let mut current = self.current_catalog.write().unwrap();
                if *current != catalog {
                    debug!("{}: current catalog {} -> {catalog}", self.dsn, *current);
                    *current = catalog;
                }
            }
            Err(e) => debug!("{}: could not read current catalog: {e}", self.dsn),
        }
        self.set_status(Status::Idle);
    }

    fn join_exec_worker(&self) {
        let handle = self.exec_worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn join_fetch_worker(&self) {
        let handle = self.fetch_worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn notify_waiters(&self) {
        let _buffer = self.buffer.lock().unwrap();
        self.buffer_changed.notify_all();
    }

    /// Fetch up to `n` rows from the open cursor into the buffer.
    ///
    /// An exhausted or failing cursor returns the session to idle.
    pub fn fetch_many(&self, n: usize) -> Vec<Row> {
        let fetched = {
            let _conn = self.conn.lock().unwrap();
            let cursor = self.cursor.lock().unwrap().clone();
            cursor.map(|c| c.fetch_many(n))
        };
        match fetched {
            Some(Ok(rows)) if !rows.is_empty() => {
                trace!("{}: fetched {} rows", self.dsn, rows.len());
                let mut buffer = self.buffer.lock().unwrap();
                buffer.extend(rows.iter().cloned());
                self.buffer_changed.notify_all();
                rows
            }
            Some(Err(e)) => {
                warn!("{}: fetch failed: {e}", self.dsn);
                self.finish_fetch();
                Vec::new()
            }
            _ => {
                self.finish_fetch();
                Vec::new()
            }
        }
    }

    fn finish_fetch(&self) {
        if !matches!(self.status(), Status::Disconnected | Status::Executing) {
            self.set_status(Status::Idle);
        }
        self.notify_waiters();
    }

    /// Pull the whole result set in `chunk_size` pieces on a worker thread.
    pub fn fetch_all_async(self: &Arc<Self>, chunk_size: usize) {
        if !self.status().accepts_metadata_calls() {
            debug!("{}: fetch requested while {}", self.dsn, self.status());
            return;
        }
        self.stop_fetching();

        let token = CancellationToken::new();
        *self.fetch_cancel.lock().unwrap() = token.clone();
        self.set_status(Status::Fetching);

        let session = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("sqlnav-fetch-{}", self.dsn))
            .spawn(move || {
                while !token.is_cancelled() {
                    if session.fetch_many(chunk_size.max(1)).is_empty() {
                        break;
                    }
                }
                session.transition(Status::Fetching, Status::Idle);
                session.notify_waiters();
                session.request_redraw();
            });
        match spawned {
            Ok(handle) => *self.fetch_worker.lock().unwrap() = Some(handle),
            Err(e) => {
                warn!("{}: could not start fetch worker: {e}", self.dsn);
                self.transition(Status::Fetching, Status::Idle);
                self.notify_waiters();
            }
        }
    }

    /// Stop the fetch worker, keeping the rows it already buffered.
    pub fn stop_fetching(&self) {
        self.fetch_cancel.lock().unwrap().cancel();
        self.join_fetch_worker();
    }

    /// Take up to `n` buffered rows.
    ///
    /// With `wait`, blocks until `n` rows are buffered or fetching stops.
    pub fn fetch_from_cache(&self, n: usize, wait: bool) -> Vec<Row> {
        let mut buffer = self.buffer.lock().unwrap();
        if wait {
            buffer = self
                .buffer_changed
                .wait_while(buffer, |b| b.len() < n && self.status() == Status::Fetching)
                .unwrap();
        }
        let take = n.min(buffer.len());
        buffer.drain(..take).collect()
    }

    /// Like `fetch_from_cache(n, true)`, but gives up when `interrupt` fires.
    pub fn fetch_from_cache_until(
        &self,
        n: usize,
        interrupt: &CancellationToken,
    ) -> Result<Vec<Row>, ExecutionError> {
        let mut buffer = self.buffer.lock().unwrap();
        while buffer.len() < n && self.status() == Status::Fetching {
            if interrupt.is_cancelled() {
                return Err(ExecutionError::Cancelled("fetch".to_string()));
            }
            buffer = self.buffer_changed.wait_timeout(buffer, POLL_INTERVAL).unwrap().0;
        }
        let take = n.min(buffer.len());
        Ok(buffer.drain(..take).collect())
    }

    /// Rows fetched but not yet taken.
    pub fn buffered(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    /// Abort whatever runs on this session and discard buffered rows.
    pub fn cancel(&self) {
        self.fetch_cancel.lock().unwrap().cancel();
        self.join_fetch_worker();
        self.buffer.lock().unwrap().clear();

        // A worker still waiting for `conn` has no cursor to cancel yet.
        self.cancel_requested.store(true, Ordering::SeqCst);
        // Not under `conn`: the execute worker holds it while blocked.
        let cursor = self.cursor.lock().unwrap().clone();
        if let Some(cursor) = cursor
            && let Err(e) = cursor.cancel()
        {
            warn!("{}: cancel failed: {e}", self.dsn);
        }
        self.join_exec_worker();
        self.cancel_requested.store(false, Ordering::SeqCst);

        if self.status() != Status::Disconnected {
            self.set_status(Status::Idle);
        }
        *self.query.lock().unwrap() = None;
        self.notify_waiters();
        info!("{}: cancelled", self.dsn);
    }

    /// Stop fetching, close the cursor and forget the query.
    pub fn close_cursor(&self) {
        self.stop_fetching();
        let cursor = self.cursor.lock().unwrap().take();
        if let Some(cursor) = cursor {
            cursor.close();
        }
        *self.query.lock().unwrap() = None;
        self.buffer.lock().unwrap().clear();
        self.transition(Status::Fetching, Status::Idle);
        self.notify_waiters();
    }

    pub fn close(&self) {
        self.close_cursor();
        let conn = self.conn.lock().unwrap().take();
        if let Some(conn) = conn {
            conn.close();
            info!("disconnected from {}", self.dsn);
        }
        self.set_status(Status::Disconnected);
    }

    /// Run a catalog call under the connection lock.
    ///
    /// Skipped while busy; failures are logged and yield the default value.
    fn with_connection<T, F>(&self, op: &str, demote: bool, call: F) -> T
    where
        T: Default,
        F: FnOnce(&QuirkContext<'_>) -> DbResult<T>,
    {
        if !self.status().accepts_metadata_calls() {
            debug!("{}: skipping {op} while {}", self.dsn, self.status());
            return T::default();
        }
        let codec = self.codec();
        let current = self.current_catalog();
        let result = {
            let guard = self.conn.lock().unwrap();
            let Some(conn) = guard.as_ref() else {
                return T::default();
            };
            let ctx = QuirkContext {
                conn: conn.as_ref(),
                codec: &codec,
                current_catalog: &current,
            };
            call(&ctx)
        };
        match result {
            Ok(value) => {
                self.transition(Status::Error, Status::Idle);
                value
            }
            Err(e) => {
                warn!("{}: {op} failed: {e}", self.dsn);
                if demote {
                    self.set_status(Status::Error);
                }
                T::default()
            }
        }
    }

    pub fn list_catalogs(&self) -> Vec<String> {
        let quirks = self.quirks();
        self.with_connection("list_catalogs", true, |ctx| {
            match quirks.list_catalogs.and_then(|hook| hook(ctx)) {
                Some(result) => result,
                None => ctx.conn.list_catalogs(),
            }
        })
    }

    pub fn list_schemas(&self, catalog: Option<&str>) -> Vec<String> {
        let quirks = self.quirks();
        self.with_connection("list_schemas", true, |ctx| {
            match quirks.list_schemas.and_then(|hook| hook(ctx, catalog)) {
                Some(result) => result,
                None => ctx.conn.list_schemas(catalog),
            }
        })
    }

    pub fn find_tables(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
        table_type: &str,
    ) -> Vec<TableRow> {
        let quirks = self.quirks();
        self.with_connection("find_tables", false, |ctx| {
            let mut args = SearchArgs {
                catalog: catalog.to_string(),
                schema: schema.to_string(),
                name: table.to_string(),
            };
            if let Some(hook) = quirks.find_tables
                && !hook(ctx, &mut args)
            {
                return Ok(Vec::new());
            }
            ctx.conn
                .find_tables(&args.catalog, &args.schema, &args.name, table_type)
        })
    }

    pub fn find_columns(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Vec<ColumnRow> {
        let quirks = self.quirks();
        self.with_connection("find_columns", false, |ctx| {
            let mut args = SearchArgs {
                catalog: catalog.to_string(),
                schema: schema.to_string(),
                name: table.to_string(),
            };
            if let Some(hook) = quirks.find_columns
                && !hook(ctx, &mut args)
            {
                return Ok(Vec::new());
            }
            ctx.conn
                .find_columns(&args.catalog, &args.schema, &args.name, column)
        })
    }

    pub fn find_procedures(&self, catalog: &str, schema: &str, procedure: &str) -> Vec<ProcedureRow> {
        self.with_connection("find_procedures", false, |ctx| {
            ctx.conn.find_procedures(catalog, schema, procedure)
        })
    }

    pub fn find_procedure_columns(
        &self,
        catalog: &str,
        schema: &str,
        procedure: &str,
        column: &str,
    ) -> Vec<ProcedureColumnRow> {
        self.with_connection("find_procedure_columns", false, |ctx| {
            ctx.conn
                .find_procedure_columns(catalog, schema, procedure, column)
        })
    }

    pub fn foreign_keys(&self, catalog: &str, schema: &str, table: &str) -> Vec<ForeignKeyRow> {
        self.with_connection("foreign_keys", false, |ctx| {
            ctx.conn.foreign_keys(catalog, schema, table)
        })
    }

    /// SQL showing the first `limit` rows of a table or view.
    pub fn preview_query(
        &self,
        name: &str,
        otype: ObjectType,
        filter: &str,
        limit: i64,
    ) -> Option<String> {
        match otype {
            ObjectType::Table | ObjectType::View => {
                Some(self.quirks().preview_sql(name, filter, limit))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::{FIXTURE, session_from};
    use crate::driver::Value;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn connected() -> Arc<Session> {
        let session = session_from(FIXTURE, "shop");
        session.connect("", "", false).unwrap();
        session
    }

    fn ints(rows: &[Row]) -> Vec<i64> {
        rows.iter()
            .filter_map(|r| match r.first() {
                Some(Value::Int(i)) => Some(*i),
                _ => None,
            })
            .collect()
    }

    fn wait_for_status(session: &Session, status: Status) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if session.status() == status {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_connect_reads_driver_info() {
        let session = session_from(FIXTURE, "shop");
        assert_eq!(session.status(), Status::Disconnected);
        session.connect("", "", false).unwrap();
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.quirks().family, "postgresql");
        assert_eq!(session.current_catalog(), "shop");
        assert!(session.catalog_support());
        assert_eq!(session.escape_name("Name"), "\"Name\"");
        // Already connected: nothing happens.
        session.connect("", "", false).unwrap();
    }

    #[test]
    fn test_connect_failure_keeps_status() {
        let session = session_from(FIXTURE, "nowhere");
        let err = session.connect("", "", false).unwrap_err();
        assert!(matches!(err, ConnectionError::ConnectFailed(_)));
        assert_eq!(session.status(), Status::Disconnected);
    }

    #[test]
    fn test_execute_and_fetch() {
        let session = connected();
        let token = CancellationToken::new();
        let cursor = session.execute_async("SELECT 1", &token).unwrap();
        assert!(cursor.is_some());
        assert_eq!(session.execution_status(), ExecutionStatus::OkWithResults);
        assert_eq!(session.query().as_deref(), Some("SELECT 1"));
        assert_eq!(session.fetch_many(10).len(), 1);
        assert!(session.fetch_many(10).is_empty());
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(ints(&session.fetch_from_cache(10, false)), vec![1]);
    }

    #[test]
    fn test_failed_statement_records_driver_text() {
        let session = connected();
        let token = CancellationToken::new();
        session.execute_async("SELECT boom", &token).unwrap();
        assert_eq!(session.execution_status(), ExecutionStatus::Fail);
        assert_eq!(
            session.execution_error().as_deref(),
            Some("relation \"boom\" does not exist")
        );
        assert_eq!(session.status(), Status::Idle);
    }

    #[test]
    fn test_use_updates_current_catalog() {
        let session = connected();
        let token = CancellationToken::new();
        session.execute_async("USE archive", &token).unwrap();
        assert_eq!(session.execution_status(), ExecutionStatus::Ok);
        assert_eq!(session.current_catalog(), "archive");
    }

    #[test]
    fn test_interrupted_wait_then_cancel() {
        let session = connected();
        let token = CancellationToken::new();
        let trigger = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.cancel();
        });
        let err = session.execute_async("SELECT slow", &token).err().unwrap();
        assert!(matches!(err, ExecutionError::Cancelled(_)));
        assert_eq!(session.status(), Status::Executing);

        session.cancel();
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.execution_status(), ExecutionStatus::Fail);
        assert!(session.query().is_none());
    }

    #[test]
    fn test_cancel_before_statement_starts() {
        let session = connected();
        let token = CancellationToken::new();
        token.cancel();
        let err = session.execute_async("SELECT slow", &token).err().unwrap();
        assert!(matches!(err, ExecutionError::Cancelled(_)));

        let started = Instant::now();
        session.cancel();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.execution_status(), ExecutionStatus::Fail);
        assert!(session.execution_error().unwrap().contains("Operation canceled"));
    }

    #[test]
    fn test_cancel_while_worker_waits_for_connection() {
        let session = connected();
        let (locked_tx, locked_rx) = mpsc::channel();
        let started = Instant::now();
        thread::scope(|s| {
            s.spawn(|| {
                // Stands in for a metadata call holding the connection.
                let _guard = session.conn.lock().unwrap();
                locked_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(200));
            });
            locked_rx.recv().unwrap();

            let token = CancellationToken::new();
            let trigger = token.clone();
            s.spawn(move || {
                thread::sleep(Duration::from_millis(50));
                trigger.cancel();
            });
            let err = session.execute_async("SELECT slow", &token).err().unwrap();
            assert!(matches!(err, ExecutionError::Cancelled(_)));
            assert!(session.cursor().is_none());
            session.cancel();
        });
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.execution_status(), ExecutionStatus::Fail);

        // The flag does not leak into the next statement.
        let token = CancellationToken::new();
        session.execute_async("SELECT 1", &token).unwrap();
        assert_eq!(session.execution_status(), ExecutionStatus::OkWithResults);
    }

    #[test]
    fn test_busy_session_skips_catalog_calls() {
        let session = connected();
        let worker = Arc::clone(&session);
        let handle = thread::spawn(move || {
            worker.execute_async("SELECT slow", &CancellationToken::new())
        });
        assert!(wait_for_status(&session, Status::Executing));
        assert!(session.list_catalogs().is_empty());
        assert!(matches!(
            session.execute_async("SELECT 1", &CancellationToken::new()),
            Err(ExecutionError::Busy)
        ));

        session.cancel();
        assert!(handle.join().unwrap().is_ok());
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.list_catalogs(), vec!["shop", "archive"]);
    }

    #[test]
    fn test_fetch_all_delivers_rows_in_order() {
        let session = connected();
        let redraws = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&redraws);
        session.set_redraw_hook(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        session.execute_async("SELECT n", &CancellationToken::new()).unwrap();
        session.fetch_all_async(3);
        let rows = session.fetch_from_cache(100, true);
        assert_eq!(ints(&rows), (0..10).collect::<Vec<_>>());
        session.stop_fetching();
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(redraws.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_fetching_keeps_buffered_rows() {
        let session = connected();
        session.execute_async("SELECT n", &CancellationToken::new()).unwrap();
        session.fetch_all_async(2);
        let first = session.fetch_from_cache(2, true);
        assert_eq!(first.len(), 2);

        session.stop_fetching();
        assert_eq!(session.status(), Status::Idle);
        let mut seen = ints(&first);
        seen.extend(ints(&session.fetch_from_cache(100, false)));
        seen.extend(ints(&session.fetch_many(100)));
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_cancel_during_fetch_settles_idle() {
        let session = connected();
        session.execute_async("SELECT n", &CancellationToken::new()).unwrap();
        session.fetch_all_async(1);
        assert_eq!(session.status(), Status::Fetching);
        thread::sleep(Duration::from_millis(30));
        session.cancel();
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.buffered(), 0);
        assert!(session.fetch_from_cache(10, true).is_empty());
    }

    #[test]
    fn test_interruptible_cache_wait() {
        let session = connected();
        session.execute_async("SELECT n", &CancellationToken::new()).unwrap();
        session.fetch_all_async(1);
        let token = CancellationToken::new();
        token.cancel();
        let result = session.fetch_from_cache_until(1000, &token);
        session.cancel();
        // Either the fetch had already finished or the wait was interrupted.
        match result {
            Ok(rows) => assert_eq!(rows.len(), 10),
            Err(e) => assert!(matches!(e, ExecutionError::Cancelled(_))),
        }
    }

    #[test]
    fn test_close_disconnects() {
        let session = connected();
        session.execute_async("SELECT 1", &CancellationToken::new()).unwrap();
        session.close();
        assert_eq!(session.status(), Status::Disconnected);
        assert!(!session.is_connected());
        assert!(session.cursor().is_none());
        assert!(session.list_catalogs().is_empty());
    }

    #[test]
    fn test_preview_query() {
        let session = connected();
        assert_eq!(
            session.preview_query("orders", ObjectType::Table, "", 5).as_deref(),
            Some("SELECT * FROM orders LIMIT 5")
        );
        assert!(session.preview_query("total", ObjectType::Function, "", 5).is_none());
    }
}
