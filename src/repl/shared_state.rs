use std::sync::{Arc, RwLock};

use crate::completion::ActiveSession;
use crate::config::{DisplayConfig, OutputFormat};
use crate::connection::Session;
use crate::tree::ObjectTree;

/// State shared between the line editor, the completer and command handlers.
#[derive(Debug, Clone)]
pub struct SharedState {
    /// One session per discovered data source, in discovery order
    sessions: Arc<Vec<Arc<Session>>>,

    /// DSN of the session statements run on
    active: Arc<RwLock<Option<String>>>,

    /// Object browser over all sessions
    tree: ObjectTree,

    /// Output format setting
    output_format: Arc<RwLock<OutputFormat>>,

    /// Color output setting
    color_enabled: Arc<RwLock<bool>>,
}

impl SharedState {
    /// Create a new shared state with default display settings.
    pub fn new(sessions: Vec<Arc<Session>>) -> Self {
        Self::with_config(sessions, &DisplayConfig::default())
    }

    /// Create a new shared state with display configuration.
    pub fn with_config(sessions: Vec<Arc<Session>>, display_config: &DisplayConfig) -> Self {
        let tree = ObjectTree::new(&sessions);
        Self {
            sessions: Arc::new(sessions),
            active: Arc::new(RwLock::new(None)),
            tree,
            output_format: Arc::new(RwLock::new(display_config.format)),
            color_enabled: Arc::new(RwLock::new(display_config.color_output)),
        }
    }

    pub fn sessions(&self) -> &[Arc<Session>] {
        &self.sessions
    }

    /// Session of `dsn`, matched case-insensitively.
    pub fn session(&self, dsn: &str) -> Option<Arc<Session>> {
        self.sessions
            .iter()
            .find(|s| s.dsn().eq_ignore_ascii_case(dsn))
            .cloned()
    }

    pub fn tree(&self) -> &ObjectTree {
        &self.tree
    }

    /// The active session, if one is set.
    pub fn active_session(&self) -> Option<Arc<Session>> {
        let active = self.active.read().unwrap().clone()?;
        self.session(&active)
    }

    /// Make `dsn` active and select its tree root.
    pub fn set_active(&self, dsn: &str) -> bool {
        let Some(session) = self.session(dsn) else {
            return false;
        };
        *self.active.write().unwrap() = Some(session.dsn().to_string());
        self.tree.select_connection(dsn);
        true
    }

    pub fn clear_active(&self) {
        *self.active.write().unwrap() = None;
    }

    /// Resolver handed to the completion engine.
    pub fn active_session_resolver(&self) -> ActiveSession {
        let state = self.clone();
        Arc::new(move || state.active_session().filter(|s| s.is_connected()))
    }

    /// Get current output format.
    pub fn get_format(&self) -> OutputFormat {
        *self.output_format.read().unwrap()
    }

    /// Set output format.
    pub fn set_format(&self, format: OutputFormat) {
        *self.output_format.write().unwrap() = format;
    }

    /// Get current color setting.
    pub fn get_color_enabled(&self) -> bool {
        *self.color_enabled.read().unwrap()
    }

    /// Set color output.
    pub fn set_color_enabled(&self, enabled: bool) {
        *self.color_enabled.write().unwrap() = enabled;
    }
}
