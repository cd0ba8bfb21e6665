//! Hinter for reedline - inline hints from history and meta-commands

use nu_ansi_term::{Color, Style};
use reedline::{Hinter, History, SearchQuery};

use crate::completion::SPECIAL_COMMANDS;

/// Shows the rest of the latest history entry starting with the input, or
/// of the only meta-command starting with it.
pub struct SqlHinter {
    style: Style,
    current_hint: String,
}

impl SqlHinter {
    pub fn new() -> Self {
        Self {
            style: Style::new().italic().fg(Color::DarkGray),
            current_hint: String::new(),
        }
    }

    fn from_history(line: &str, history: &dyn History) -> Option<String> {
        let item = history
            .search(SearchQuery::last_with_prefix(line.to_string(), None))
            .ok()?
            .into_iter()
            .next()?;
        item.command_line
            .strip_prefix(line)
            .filter(|rest| !rest.is_empty())
            .map(String::from)
    }

    fn from_meta_commands(line: &str) -> Option<String> {
        if !line.starts_with('\\') || line.contains(char::is_whitespace) {
            return None;
        }
        let mut candidates = SPECIAL_COMMANDS
            .iter()
            .filter(|(command, _)| command.starts_with(line) && command.len() > line.len());
        match (candidates.next(), candidates.next()) {
            (Some((command, _)), None) => Some(command[line.len()..].to_string()),
            _ => None,
        }
    }
}

impl Default for SqlHinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Hinter for SqlHinter {
    fn handle(
        &mut self,
        line: &str,
        pos: usize,
        history: &dyn History,
        use_ansi_coloring: bool,
        _cwd: &str,
    ) -> String {
        self.current_hint.clear();

        // Only at the end of a non-empty line
        if pos != line.len() || line.trim().is_empty() {
            return String::new();
        }

        let Some(hint) =
            Self::from_history(line, history).or_else(|| Self::from_meta_commands(line))
        else {
            return String::new();
        };

        self.current_hint = hint;
        if use_ansi_coloring {
            self.style.paint(&self.current_hint).to_string()
        } else {
            self.current_hint.clone()
        }
    }

    /// The hint up to and including its first word
    fn next_hint_token(&self) -> String {
        let leading = self.current_hint.len() - self.current_hint.trim_start().len();
        let rest = &self.current_hint[leading..];
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.current_hint[..leading + end].to_string()
    }

    fn complete_hint(&self) -> String {
        self.current_hint.clone()
    }
}
