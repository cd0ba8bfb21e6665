//! Message colors for terminal output
//!
//! Colors can be switched off for pipes and `--no-color`; the text is then
//! returned unchanged apart from the `Error:` prefix.

use nu_ansi_term::{Color, Style};

/// Color scheme for shell messages
pub struct Colorizer {
    /// Enable colors
    enabled: bool,
}

impl Colorizer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.enabled {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Colorize text as success (green)
    pub fn success(&self, text: &str) -> String {
        self.paint(Color::Green.normal(), text)
    }

    /// Colorize text as error (red), with an `Error:` prefix
    pub fn error(&self, text: &str) -> String {
        self.paint(Color::Red.normal(), &format!("Error: {text}"))
    }

    /// Colorize text as warning (yellow)
    pub fn warning(&self, text: &str) -> String {
        self.paint(Color::Yellow.normal(), text)
    }

    /// Colorize text as info (blue)
    pub fn info(&self, text: &str) -> String {
        self.paint(Color::Blue.normal(), text)
    }

    /// Reverse video, used for the selected tree node
    pub fn selected(&self, text: &str) -> String {
        self.paint(Style::new().reverse(), text)
    }

    /// Dimmed text for secondary details
    pub fn dim(&self, text: &str) -> String {
        self.paint(Style::new().dimmed(), text)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
