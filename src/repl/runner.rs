//! Statement execution for the shell
//!
//! A statement runs on the active session's worker thread while the caller
//! polls. Result sets are pulled by the session's fetch worker and printed
//! page by page as they arrive, so the first rows of a large result show up
//! before the last ones are fetched. Formats that need the whole result at
//! once (`json-pretty`, `compact`) are rendered after fetching ends.
//!
//! Everything here blocks; the shell calls it from `spawn_blocking`.

use std::io::Write;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::completion::CompletionEngine;
use crate::config::{DisplayConfig, OutputFormat};
use crate::connection::{ExecutionStatus, Session};
use crate::error::{ConnectionError, ExecutionError, Result, SqlnavError};
use crate::formatter::Formatter;
use crate::parser::{SqlLexer, TokenKind};

use super::progress::ProgressTracker;
use super::shared_state::SharedState;

/// How a statement ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// A result set of this many rows was printed
    Rows(usize),
    /// The statement succeeded without a result set
    Done,
    /// The user interrupted the wait; the statement was cancelled
    Interrupted,
}

/// Runs statements on the active session and prints their results
#[derive(Clone)]
pub struct StatementRunner {
    state: SharedState,
    engine: Arc<CompletionEngine>,
    display: DisplayConfig,
    fetch_chunk_size: usize,
    show_progress: bool,
}

impl StatementRunner {
    pub fn new(
        state: SharedState,
        engine: Arc<CompletionEngine>,
        display: DisplayConfig,
        fetch_chunk_size: usize,
    ) -> Self {
        Self {
            state,
            engine,
            display,
            fetch_chunk_size: fetch_chunk_size.max(1),
            show_progress: true,
        }
    }

    /// Draw a spinner while waiting
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Session statements run on; must be connected.
    pub fn active_session(&self) -> Result<Arc<Session>> {
        self.state
            .active_session()
            .filter(|s| s.is_connected())
            .ok_or_else(|| ConnectionError::NotConnected.into())
    }

    fn formatter(&self) -> Formatter {
        let mut display = self.display.clone();
        display.format = self.state.get_format();
        display.color_output = self.state.get_color_enabled();
        Formatter::from_config(&display)
    }

    /// Execute `sql` on the active session and print its result to `out`.
    pub fn run<W: Write>(
        &self,
        sql: &str,
        interrupt: &CancellationToken,
        out: &mut W,
    ) -> Result<RunOutcome> {
        let session = self.active_session()?;
        self.run_on(&session, sql, interrupt, out)
    }

    /// Execute `sql` on `session` and print its result to `out`.
    ///
    /// Driver failures come back as [`ExecutionError::QueryFailed`] with the
    /// driver's text. An interrupt cancels the statement and yields
    /// [`RunOutcome::Interrupted`].
    pub fn run_on<W: Write>(
        &self,
        session: &Arc<Session>,
        sql: &str,
        interrupt: &CancellationToken,
        out: &mut W,
    ) -> Result<RunOutcome> {
        if !session.is_connected() {
            return Err(ConnectionError::NotConnected.into());
        }
        let formatter = self.formatter();
        let progress = ProgressTracker::new("executing", self.show_progress);

        match session.execute_async(sql, interrupt) {
            Ok(_) => {}
            Err(ExecutionError::Cancelled(_)) => {
                progress.finish();
                session.cancel();
                info!("{}: statement interrupted", session.dsn());
                return Ok(RunOutcome::Interrupted);
            }
            Err(e) => return Err(stop_with(&progress, e)),
        }

        match session.execution_status() {
            ExecutionStatus::Fail => {
                let message = session
                    .execution_error()
                    .unwrap_or_else(|| "Statement failed".to_string());
                return Err(stop_with(&progress, ExecutionError::QueryFailed(message)));
            }
            ExecutionStatus::Ok => {
                progress.finish();
                self.engine.extend_query_history(sql, false);
                if self.display.show_timing {
                    writeln!(out, "{}", formatter.format_success(&format!(
                        "OK ({:.3} sec)",
                        progress.elapsed().as_secs_f64()
                    )))?;
                } else {
                    writeln!(out, "{}", formatter.format_success("OK"))?;
                }
                return Ok(RunOutcome::Done);
            }
            ExecutionStatus::OkWithResults => {}
        }

        let columns = session
            .cursor()
            .and_then(|c| c.description())
            .unwrap_or_default();
        session.fetch_all_async(self.fetch_chunk_size);

        let streams = matches!(formatter.format_type(), OutputFormat::Table | OutputFormat::Json);
        let page_size = self.display.page_size.max(1);
        let mut collected = Vec::new();
        let mut total = 0;
        let mut pages = 0;

        loop {
            let rows = match session.fetch_from_cache_until(page_size, interrupt) {
                Ok(rows) => rows,
                Err(ExecutionError::Cancelled(_)) => {
                    progress.finish();
                    session.cancel();
                    info!("{}: fetch interrupted after {total} rows", session.dsn());
                    return Ok(RunOutcome::Interrupted);
                }
                Err(e) => return Err(stop_with(&progress, e)),
            };
            if rows.is_empty() {
                break;
            }
            total += rows.len();
            progress.update(total);

            if streams {
                let page = formatter.format_rows(&columns, &rows)?;
                progress.suspend(|| writeln!(out, "{page}"))?;
                pages += 1;
            } else {
                collected.extend(rows);
            }
        }
        progress.finish();
        debug!("{}: {total} rows in {pages} pages", session.dsn());

        if !streams || pages == 0 {
            writeln!(out, "{}", formatter.format_rows(&columns, &collected)?)?;
        }
        if formatter.format_type() != OutputFormat::Compact {
            writeln!(out, "{}", formatter.format_stats(total, progress.elapsed()))?;
        }
        self.engine.extend_query_history(sql, false);

        Ok(RunOutcome::Rows(total))
    }
}

/// Clear the spinner before an error reaches the caller's output.
fn stop_with(progress: &ProgressTracker, err: impl Into<SqlnavError>) -> SqlnavError {
    progress.finish();
    err.into()
}

/// Split a script into statements at `;` outside strings and comments.
///
/// Pieces without any SQL token (blank or comment-only) are dropped.
pub fn split_statements(script: &str) -> Vec<String> {
    let chars: Vec<char> = script.chars().collect();
    let mut statements = Vec::new();
    let mut push = |start: usize, end: usize| {
        let piece: String = chars[start..end].iter().collect();
        if !SqlLexer::significant(&piece).is_empty() {
            statements.push(piece.trim().to_string());
        }
    };

    let mut start = 0;
    for token in SqlLexer::significant(script) {
        if matches!(token.kind, TokenKind::Semicolon) {
            push(start, token.span.start);
            start = token.span.end;
        }
    }
    push(start, chars.len());
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionConfig;
    use crate::connection::testing::{FIXTURE, session_from};

    fn runner(format: OutputFormat) -> (StatementRunner, Arc<Session>) {
        let session = session_from(FIXTURE, "shop");
        session.connect("", "", false).unwrap();
        let display = DisplayConfig {
            format,
            color_output: false,
            show_timing: false,
            page_size: 1,
            ..DisplayConfig::default()
        };
        let state = SharedState::with_config(vec![Arc::clone(&session)], &display);
        state.set_active("shop");
        let engine = Arc::new(CompletionEngine::new(
            state.active_session_resolver(),
            CompletionConfig::default(),
        ));
        let runner = StatementRunner::new(state, engine, display, 10).with_progress(false);
        (runner, session)
    }

    fn run(runner: &StatementRunner, sql: &str) -> (Result<RunOutcome>, String) {
        let mut out = Vec::new();
        let outcome = runner.run(sql, &CancellationToken::new(), &mut out);
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_json_lines_are_streamed() {
        let (runner, _) = runner(OutputFormat::Json);
        let (outcome, out) = run(&runner, "SELECT * FROM shop.public.orders;");
        assert_eq!(outcome.unwrap(), RunOutcome::Rows(2));
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("\"id\":1"));
        assert!(lines[1].contains("\"id\":2"));
        assert_eq!(lines[2], "2 rows");
    }

    #[test]
    fn test_compact_prints_count_once() {
        let (runner, _) = runner(OutputFormat::Compact);
        let (outcome, out) = run(&runner, "SELECT * FROM shop.public.orders");
        assert_eq!(outcome.unwrap(), RunOutcome::Rows(2));
        assert_eq!(out.trim(), "2 rows");
    }

    #[test]
    fn test_statement_without_results() {
        let (runner, session) = runner(OutputFormat::Table);
        let (outcome, out) = run(&runner, "USE archive;");
        assert_eq!(outcome.unwrap(), RunOutcome::Done);
        assert_eq!(out.trim(), "OK");
        assert_eq!(session.current_catalog(), "archive");
    }

    #[test]
    fn test_driver_error_is_returned() {
        let (runner, _) = runner(OutputFormat::Table);
        let (outcome, _) = run(&runner, "SELECT boom;");
        let err = outcome.unwrap_err();
        assert!(matches!(err, SqlnavError::Execution(ExecutionError::QueryFailed(_))));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_failure_clears_spinner() {
        let progress = ProgressTracker::new("executing", false);
        let err = stop_with(&progress, ExecutionError::QueryFailed("boom".to_string()));
        assert!(progress.is_finished());
        assert!(matches!(err, SqlnavError::Execution(ExecutionError::QueryFailed(_))));
    }

    #[test]
    fn test_empty_table_result() {
        let (runner, _) = runner(OutputFormat::Table);
        let (outcome, out) = run(&runner, "SELECT * FROM shop.audit.log;");
        assert_eq!(outcome.unwrap(), RunOutcome::Rows(0));
        assert!(out.contains("(empty result set)"));
    }

    #[test]
    fn test_requires_connected_session() {
        let session = session_from(FIXTURE, "shop");
        let state = SharedState::new(vec![session]);
        state.set_active("shop");
        let engine = Arc::new(CompletionEngine::detached(CompletionConfig::default()));
        let runner = StatementRunner::new(state, engine, DisplayConfig::default(), 10)
            .with_progress(false);
        let (outcome, _) = run(&runner, "SELECT 1;");
        assert!(matches!(
            outcome,
            Err(SqlnavError::Connection(ConnectionError::NotConnected))
        ));
    }

    #[test]
    fn test_split_statements() {
        let script = "SELECT 1;\n-- only a comment\n;SELECT ';' FROM t ; ;\n  USE archive";
        assert_eq!(
            split_statements(script),
            vec!["SELECT 1", "SELECT ';' FROM t", "USE archive"]
        );
        assert!(split_statements("  ;  ").is_empty());
    }
}
