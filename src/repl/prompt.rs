//! Prompt showing the active data source and its state

use std::borrow::Cow;

use nu_ansi_term::Color;
use reedline::{Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus};

use crate::connection::Status;

/// Prompt for the sqlnav shell
pub struct SqlPrompt {
    /// Active data source, if any
    dsn: Option<String>,
    /// Status of the active session
    status: Status,
    /// Paint the prompt
    use_colors: bool,
}

impl SqlPrompt {
    /// Create a prompt for the current state
    ///
    /// # Arguments
    /// * `dsn` - Active data source name
    /// * `status` - Its session status
    /// * `use_colors` - Color the data source by status
    pub fn new(dsn: Option<String>, status: Status, use_colors: bool) -> Self {
        Self {
            dsn,
            status,
            use_colors,
        }
    }

    fn label(&self) -> String {
        match (&self.dsn, self.status) {
            (None, _) => "sqlnav".to_string(),
            (Some(dsn), Status::Idle) => dsn.clone(),
            (Some(dsn), status) => format!("{dsn} ({status})"),
        }
    }

    fn color(&self) -> Color {
        match (&self.dsn, self.status) {
            (None, _) | (_, Status::Disconnected) => Color::DarkGray,
            (_, Status::Error) => Color::Red,
            (_, Status::Idle) => Color::Green,
            _ => Color::Yellow,
        }
    }
}

impl Prompt for SqlPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let label = self.label();
        if self.use_colors {
            format!("{}> ", self.color().paint(label)).into()
        } else {
            format!("{label}> ").into()
        }
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        "".into()
    }

    fn render_prompt_indicator(&self, _prompt_mode: PromptEditMode) -> Cow<'_, str> {
        "".into()
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        "... ".into()
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };

        format!("({}reverse-search: {}) ", prefix, history_search.term).into()
    }
}
