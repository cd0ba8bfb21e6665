use std::fs;
use std::io;
use std::sync::Arc;

use reedline::{
    ColumnarMenu, Emacs, FileBackedHistory, History, KeyCode, KeyModifiers, MenuBuilder,
    Reedline, ReedlineEvent, ReedlineMenu, SearchDirection, SearchQuery, Signal,
    default_emacs_keybindings,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::completion::{CompletionEngine, SPECIAL_COMMANDS};
use crate::config::{Config, HistoryConfig};
use crate::connection::{Session, Status};
use crate::driver::Value;
use crate::error::{ConnectionError, ExecutionError, Result, SqlnavError};
use crate::formatter::{Colorizer, Formatter, TableFormatter};
use crate::tree::{NodeKind, NodeView, ObjectTree};

use super::commands::MetaCommand;
use super::completer::SqlCompleter;
use super::highlighter::SqlHighlighter;
use super::hinter::SqlHinter;
use super::progress::ProgressTracker;
use super::prompt::SqlPrompt;
use super::runner::{RunOutcome, StatementRunner, split_statements};
use super::shared_state::SharedState;
use super::validator::SqlValidator;

/// REPL engine for interactive statement execution
pub struct ReplEngine {
    /// Line editor for statement input
    editor: Reedline,

    /// Sessions, active data source and tree
    shared_state: SharedState,

    /// Completion engine shared with the completer
    completion: Arc<CompletionEngine>,

    /// Executes statements and prints results
    runner: StatementRunner,

    /// Loaded configuration
    config: Config,

    /// Credentials used by `\c` when none are given
    default_user: String,
    default_password: String,

    /// Draw spinners while waiting
    show_progress: bool,

    /// Whether to continue running
    running: bool,
}

impl ReplEngine {
    /// Create a new REPL engine
    ///
    /// # Arguments
    /// * `shared_state` - Sessions and display settings
    /// * `completion` - Completion engine resolving the active session
    /// * `config` - Loaded configuration
    ///
    /// # Returns
    /// * `Result<Self>` - New REPL engine or error
    pub fn new(
        shared_state: SharedState,
        completion: Arc<CompletionEngine>,
        config: Config,
    ) -> Result<Self> {
        let history = Self::open_history(&config.history)?;
        Self::replay_history(history.as_ref(), &completion);

        let mut keybindings = default_emacs_keybindings();
        keybindings.add_binding(
            KeyModifiers::NONE,
            KeyCode::Tab,
            ReedlineEvent::UntilFound(vec![
                ReedlineEvent::Menu("completion_menu".to_string()),
                ReedlineEvent::MenuNext,
            ]),
        );
        keybindings.add_binding(KeyModifiers::SHIFT, KeyCode::BackTab, ReedlineEvent::MenuPrevious);

        let completion_menu = Box::new(ColumnarMenu::default().with_name("completion_menu"));
        let colors = shared_state.get_color_enabled();

        let editor = Reedline::create()
            .with_history(history)
            .with_completer(Box::new(SqlCompleter::new(Arc::clone(&completion))))
            .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
            .with_edit_mode(Box::new(Emacs::new(keybindings)))
            .with_hinter(Box::new(SqlHinter::new()))
            .with_highlighter(Box::new(SqlHighlighter::new(colors)))
            .with_validator(Box::new(SqlValidator::new()));

        let runner = StatementRunner::new(
            shared_state.clone(),
            Arc::clone(&completion),
            config.display.clone(),
            config.connection.fetch_chunk_size,
        );

        Ok(Self {
            editor,
            shared_state,
            completion,
            runner,
            config,
            default_user: String::new(),
            default_password: String::new(),
            show_progress: true,
            running: true,
        })
    }

    /// Credentials used when `\c` names none
    pub fn with_credentials(mut self, user: String, password: String) -> Self {
        self.default_user = user;
        self.default_password = password;
        self
    }

    /// Draw spinners while statements run
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self.runner = self.runner.with_progress(show_progress);
        self
    }

    fn open_history(config: &HistoryConfig) -> Result<Box<dyn History>> {
        let history = if config.persist {
            FileBackedHistory::with_file(config.max_size, config.file_path.clone())
        } else {
            FileBackedHistory::new(config.max_size)
        };
        match history {
            Ok(history) => Ok(Box::new(history)),
            Err(e) => {
                warn!("history unavailable ({e}), keeping it in memory");
                FileBackedHistory::new(config.max_size)
                    .map(|h| Box::new(h) as Box<dyn History>)
                    .map_err(|e| SqlnavError::Generic(format!("History error: {e}")))
            }
        }
    }

    /// Feed earlier statements to keyword prevalence.
    fn replay_history(history: &dyn History, completion: &CompletionEngine) {
        let query = SearchQuery::everything(SearchDirection::Forward, None);
        let Ok(items) = history.search(query) else {
            return;
        };
        debug!("replaying {} history entries", items.len());
        for item in items {
            if !MetaCommand::is_meta_command(&item.command_line) {
                completion.extend_query_history(&item.command_line, true);
            }
        }
    }

    /// Shared state of this shell
    pub fn shared_state(&self) -> &SharedState {
        &self.shared_state
    }

    /// Check if REPL is still running
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn formatter(&self) -> Formatter {
        let mut display = self.config.display.clone();
        display.format = self.shared_state.get_format();
        display.color_output = self.shared_state.get_color_enabled();
        Formatter::from_config(&display)
    }

    fn prompt(&self) -> SqlPrompt {
        let active = self.shared_state.active_session();
        SqlPrompt::new(
            active.as_ref().map(|s| s.dsn().to_string()),
            active.map(|s| s.status()).unwrap_or(Status::Disconnected),
            self.shared_state.get_color_enabled(),
        )
    }

    /// Start the REPL loop
    ///
    /// Reads statements until `\q` or Ctrl-D, then closes every session.
    pub async fn run(&mut self) -> Result<()> {
        while self.running {
            let prompt = self.prompt();
            let line = match self.editor.read_line(&prompt)? {
                Signal::Success(buffer) => buffer,
                Signal::CtrlC => continue,
                Signal::CtrlD => break,
                #[allow(unreachable_patterns)]
                _ => continue,
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if let Err(e) = self.process_input(input).await {
                eprintln!("{}", self.formatter().format_error(&e.to_string()));
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Run one line of input: a meta-command or a SQL statement
    pub async fn process_input(&mut self, input: &str) -> Result<()> {
        if MetaCommand::is_meta_command(input) {
            let command = MetaCommand::parse(input)?;
            self.handle_meta(command).await
        } else {
            self.execute_sql(None, input).await.map(|_| ())
        }
    }

    /// Stop the loop and close all sessions
    pub fn shutdown(&mut self) {
        self.running = false;
        for session in self.shared_state.sessions() {
            session.close();
        }
    }

    /// Connect `dsn` (or the active data source) and make it active.
    pub async fn connect(
        &mut self,
        dsn: Option<String>,
        user: Option<String>,
        password: Option<String>,
    ) -> Result<()> {
        let dsn = match dsn {
            Some(dsn) => dsn,
            None => self
                .shared_state
                .active_session()
                .map(|s| s.dsn().to_string())
                .ok_or_else(|| SqlnavError::Generic("Usage: \\c DSN [USER] [PASSWORD]".into()))?,
        };
        let session = self
            .shared_state
            .session(&dsn)
            .ok_or_else(|| ConnectionError::UnknownDataSource(dsn.clone()))?;

        // New credentials replace a live connection.
        let force = user.is_some();
        let user = user.unwrap_or_else(|| self.default_user.clone());
        let password = password.unwrap_or_else(|| self.default_password.clone());

        let progress = ProgressTracker::new(format!("connecting to {}", session.dsn()), self.show_progress);
        let worker = Arc::clone(&session);
        tokio::task::spawn_blocking(move || worker.connect(&user, &password, force))
            .await
            .map_err(|e| SqlnavError::Generic(format!("Connect task failed: {e}")))??;
        progress.finish();

        self.shared_state.set_active(session.dsn());
        println!(
            "{}",
            self.formatter().format_success(&format!("Connected to {}", session.dsn()))
        );
        Ok(())
    }

    async fn handle_meta(&mut self, command: MetaCommand) -> Result<()> {
        debug!("meta-command {command:?}");
        let tree = self.shared_state.tree().clone();
        match command {
            MetaCommand::Quit => self.running = false,
            MetaCommand::Help => println!("{}", help_text()),
            MetaCommand::Sources => println!("{}", self.sources_table()?),
            MetaCommand::Connect {
                dsn,
                user,
                password,
            } => self.connect(dsn, user, password).await?,
            MetaCommand::Disconnect => {
                let session = self
                    .shared_state
                    .active_session()
                    .ok_or(ConnectionError::NotConnected)?;
                session.close();
                self.shared_state.clear_active();
                println!("Disconnected from {}", session.dsn());
            }
            MetaCommand::Tree => self.print_tree(),
            MetaCommand::Next => {
                tree.select_next();
                self.print_tree();
            }
            MetaCommand::Prev => {
                tree.select_previous();
                self.print_tree();
            }
            MetaCommand::Expand => {
                let selected = tree.selected().ok_or_else(no_selection)?;
                let progress = ProgressTracker::new("loading", self.show_progress);
                let worker = tree.clone();
                tokio::task::spawn_blocking(move || worker.expand_blocking(selected))
                    .await
                    .map_err(|e| SqlnavError::Generic(format!("Expand task failed: {e}")))?;
                progress.finish();
                self.print_tree();
            }
            MetaCommand::Collapse => {
                tree.collapse();
                self.print_tree();
            }
            MetaCommand::Refresh => {
                tree.refresh();
                self.print_tree();
            }
            MetaCommand::Preview(filter) => self.preview(&tree, &filter).await?,
            MetaCommand::NamedQuery(name) => {
                let sql = self
                    .completion
                    .named_query(&name)
                    .ok_or(ExecutionError::UnknownNamedQuery(name))?;
                println!("{}", self.formatter().colorizer().dim(&sql));
                self.execute_sql(None, &sql).await?;
            }
            MetaCommand::Include(path) => {
                let script = fs::read_to_string(&path)?;
                for statement in split_statements(&script) {
                    if self.execute_sql(None, &statement).await? == RunOutcome::Interrupted {
                        break;
                    }
                }
            }
            MetaCommand::Status => println!("{}", self.status_text()),
            MetaCommand::Reset => {
                self.completion.reset_completions();
                println!("Completion metadata will be loaded again");
            }
            MetaCommand::Format(format) => {
                self.shared_state.set_format(format);
                println!("Output format set to {}", format.name());
            }
        }
        Ok(())
    }

    /// Show the first rows of the selected table or view.
    async fn preview(&mut self, tree: &ObjectTree, filter: &str) -> Result<()> {
        let selected = tree.selected().ok_or_else(no_selection)?;
        let (name, otype) = tree
            .qualified_name(selected)
            .ok_or_else(|| SqlnavError::Generic("Select a table or view to preview".into()))?;
        let session = tree.session_of(selected).ok_or_else(no_selection)?;
        let sql = session
            .preview_query(&name, otype, filter, self.config.display.preview_limit)
            .ok_or_else(|| {
                SqlnavError::Generic(format!("Cannot preview {}: {name}", otype.as_str()))
            })?;
        println!("{}", self.formatter().colorizer().dim(&sql));
        self.execute_sql(Some(session), &sql).await?;
        Ok(())
    }

    /// Execute one statement, interruptible with Ctrl-C.
    async fn execute_sql(&self, session: Option<Arc<Session>>, sql: &str) -> Result<RunOutcome> {
        let session = match session {
            Some(session) => session,
            None => self.runner.active_session()?,
        };
        info!("{}: running statement", session.dsn());

        let interrupt = CancellationToken::new();
        let watcher = spawn_interrupt_watcher(interrupt.clone());

        let runner = self.runner.clone();
        let statement = sql.to_string();
        let token = interrupt.clone();
        let result = tokio::task::spawn_blocking(move || {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            runner.run_on(&session, &statement, &token, &mut out)
        })
        .await;
        watcher.abort();

        let outcome = result.map_err(|e| SqlnavError::Generic(format!("Statement task failed: {e}")))??;
        if outcome == RunOutcome::Interrupted {
            println!("{}", self.formatter().format_warning("Interrupted"));
        }
        Ok(outcome)
    }

    fn print_tree(&self) {
        let colorizer = Colorizer::new(self.shared_state.get_color_enabled());
        println!("{}", render_tree(&self.shared_state.tree().visible(), &colorizer));
    }

    fn sources_table(&self) -> Result<String> {
        let active = self.shared_state.active_session().map(|s| s.dsn().to_string());
        let rows: Vec<Vec<Value>> = self
            .shared_state
            .sessions()
            .iter()
            .map(|s| {
                let marker = if active.as_deref() == Some(s.dsn()) { "*" } else { "" };
                vec![
                    Value::Text(marker.to_string()),
                    Value::Text(s.dsn().to_string()),
                    Value::Text(s.status().to_string()),
                ]
            })
            .collect();
        TableFormatter::with_colors(self.shared_state.get_color_enabled())
            .format(&["", "data source", "status"], &rows)
    }

    fn status_text(&self) -> String {
        let Some(session) = self.shared_state.active_session() else {
            return "No active data source".to_string();
        };
        let mut lines = vec![
            format!("Data source:  {}", session.dsn()),
            format!("Status:       {}", session.status()),
        ];
        if session.is_connected() {
            lines.push(format!("User:         {}", session.username()));
            lines.push(format!("Catalog:      {}", session.current_catalog()));
            lines.push(format!("DBMS rules:   {}", session.quirks().family));
        }
        if let Some(query) = session.query() {
            lines.push(format!("Last query:   {query}"));
            lines.push(format!("Result:       {:?}", session.execution_status()));
        }
        if let Some(error) = session.execution_error() {
            lines.push(format!("Last error:   {error}"));
        }
        lines.push(format!("Output:       {}", self.shared_state.get_format().name()));
        lines.join("\n")
    }
}

fn no_selection() -> SqlnavError {
    SqlnavError::Generic("Nothing selected in the tree".into())
}

/// Cancel `token` on Ctrl-C until the returned task is aborted
fn spawn_interrupt_watcher(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => token.cancel(),
            Err(err) => warn!("failed to listen for Ctrl-C: {err}"),
        }
    })
}

fn help_text() -> String {
    let width = SPECIAL_COMMANDS.iter().map(|(c, _)| c.len()).max().unwrap_or(0);
    let mut text = String::from("Meta-commands:\n");
    for (command, description) in SPECIAL_COMMANDS {
        text.push_str(&format!("  {command:<width$}  {description}\n"));
    }
    text.push_str("\nSQL statements run when terminated with ';'.");
    text
}

/// One line per visible node, indented by depth
fn render_tree(nodes: &[NodeView], colorizer: &Colorizer) -> String {
    nodes
        .iter()
        .map(|node| {
            let marker = match (node.kind, node.expanded) {
                (NodeKind::Column, _) => " ",
                (_, true) => "-",
                (_, false) => "+",
            };
            let mut line = format!("{}{marker} {}", "  ".repeat(node.level), node.name);
            if !node.otype.is_empty() {
                line.push_str(&format!(" {}", colorizer.dim(&format!("[{}]", node.otype))));
            }
            if node.selected {
                colorizer.selected(&line)
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::connection::testing::{FIXTURE, session_from};

    fn engine() -> ReplEngine {
        let sessions = vec![session_from(FIXTURE, "shop"), session_from(FIXTURE, "notes")];
        let mut config = Config::default();
        config.history.persist = false;
        config.display.color_output = false;
        config.display.show_timing = false;
        config
            .named_queries
            .insert("one".to_string(), "SELECT 1".to_string());

        let state = SharedState::with_config(sessions, &config.display);
        let completion = Arc::new(CompletionEngine::new(
            state.active_session_resolver(),
            config.completion.clone(),
        ));
        completion.set_named_queries(config.named_queries.clone());
        ReplEngine::new(state, completion, config)
            .unwrap()
            .with_progress(false)
    }

    #[tokio::test]
    async fn test_connect_makes_session_active() {
        let mut engine = engine();
        engine.process_input("\\c shop").await.unwrap();
        let active = engine.shared_state().active_session().unwrap();
        assert_eq!(active.dsn(), "shop");
        assert!(active.is_connected());
    }

    #[tokio::test]
    async fn test_connect_unknown_source() {
        let mut engine = engine();
        let err = engine.process_input("\\c nowhere").await.unwrap_err();
        assert!(matches!(
            err,
            SqlnavError::Connection(ConnectionError::UnknownDataSource(_))
        ));
    }

    #[tokio::test]
    async fn test_sql_requires_connection() {
        let mut engine = engine();
        let err = engine.process_input("SELECT 1;").await.unwrap_err();
        assert!(matches!(err, SqlnavError::Connection(ConnectionError::NotConnected)));
    }

    #[tokio::test]
    async fn test_named_query_runs() {
        let mut engine = engine();
        engine.process_input("\\c shop").await.unwrap();
        engine.process_input("\\n one").await.unwrap();
        let err = engine.process_input("\\n two").await.unwrap_err();
        assert!(matches!(
            err,
            SqlnavError::Execution(ExecutionError::UnknownNamedQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_format_and_quit() {
        let mut engine = engine();
        engine.process_input("\\format json").await.unwrap();
        assert_eq!(engine.shared_state().get_format(), OutputFormat::Json);
        engine.process_input("\\q").await.unwrap();
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_disconnect_clears_active() {
        let mut engine = engine();
        engine.process_input("\\c shop").await.unwrap();
        engine.process_input("\\disconnect").await.unwrap();
        assert!(engine.shared_state().active_session().is_none());
        assert!(!engine.shared_state().session("shop").unwrap().is_connected());
    }

    #[tokio::test]
    async fn test_preview_needs_object_selection() {
        let mut engine = engine();
        engine.process_input("\\c shop").await.unwrap();
        // The connection node is selected
        assert!(engine.process_input("\\preview").await.is_err());
    }

    #[test]
    fn test_render_tree() {
        let nodes = vec![
            NodeView {
                id: 0,
                kind: NodeKind::Connection,
                name: "shop".to_string(),
                otype: String::new(),
                level: 0,
                expanded: true,
                selected: false,
            },
            NodeView {
                id: 1,
                kind: NodeKind::Table,
                name: "orders".to_string(),
                otype: "table".to_string(),
                level: 1,
                expanded: false,
                selected: true,
            },
        ];
        let text = render_tree(&nodes, &Colorizer::new(false));
        assert_eq!(text, "- shop\n  + orders [table]");
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text();
        for (command, _) in SPECIAL_COMMANDS {
            assert!(help.contains(command));
        }
    }
}
