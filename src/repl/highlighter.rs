//! Syntax highlighter for SQL input
//!
//! Styling follows the lexer's tokens, so multi-word keywords, quoted
//! identifiers and unterminated strings are colored the same way the
//! completion analyzer sees them. Text between tokens (whitespace and
//! comments) is passed through, with comments dimmed.

use nu_ansi_term::{Color, Style};
use reedline::{Highlighter, StyledText};

use crate::completion::{DATATYPES, FUNCTIONS};
use crate::parser::{SqlLexer, TokenKind};

/// Highlighter for SQL statements and meta-commands
pub struct SqlHighlighter {
    enabled: bool,
}

impl SqlHighlighter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn token_style(kind: &TokenKind) -> Style {
        match kind {
            TokenKind::Keyword(word) if DATATYPES.contains(&word.as_str()) => Color::Cyan.bold(),
            TokenKind::Keyword(_) => Color::Green.bold(),
            TokenKind::Ident(word) => {
                let upper = word.to_uppercase();
                if FUNCTIONS.contains(&upper.as_str()) {
                    Color::Magenta.normal()
                } else if DATATYPES.contains(&upper.as_str()) {
                    Color::Cyan.bold()
                } else {
                    Style::default()
                }
            }
            TokenKind::QuotedIdent(_) => Color::LightBlue.normal(),
            TokenKind::String(_) => Color::Yellow.normal(),
            TokenKind::Number(_) => Color::LightMagenta.normal(),
            TokenKind::Unknown(_) => Color::Red.normal(),
            _ => Style::default(),
        }
    }

    fn gap_style(text: &str) -> Style {
        let trimmed = text.trim_start();
        if trimmed.starts_with("--") || trimmed.starts_with("/*") {
            Color::DarkGray.dimmed()
        } else {
            Style::default()
        }
    }

    fn highlight_sql(line: &str) -> StyledText {
        let chars: Vec<char> = line.chars().collect();
        let slice = |start: usize, end: usize| chars[start..end].iter().collect::<String>();
        let mut styled = StyledText::new();
        let mut pos = 0;

        for token in SqlLexer::significant(line) {
            let start = token.span.start.min(chars.len());
            let end = token.span.end.min(chars.len());
            if start > pos {
                let gap = slice(pos, start);
                styled.push((Self::gap_style(&gap), gap));
            }
            if end > start {
                styled.push((Self::token_style(&token.kind), slice(start, end)));
            }
            pos = pos.max(end);
        }
        if pos < chars.len() {
            let rest = slice(pos, chars.len());
            styled.push((Self::gap_style(&rest), rest));
        }
        styled
    }

    fn highlight_meta(line: &str) -> StyledText {
        let mut styled = StyledText::new();
        let split = line.find(char::is_whitespace).unwrap_or(line.len());
        styled.push((Color::Blue.bold(), line[..split].to_string()));
        if split < line.len() {
            styled.push((Style::default(), line[split..].to_string()));
        }
        styled
    }
}

impl Default for SqlHighlighter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Highlighter for SqlHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        if !self.enabled {
            let mut styled = StyledText::new();
            styled.push((Style::default(), line.to_string()));
            return styled;
        }
        if line.trim_start().starts_with('\\') {
            Self::highlight_meta(line)
        } else {
            Self::highlight_sql(line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(styled: &StyledText) -> String {
        styled.buffer.iter().map(|(_, s)| s.as_str()).collect()
    }

    fn style_of(styled: &StyledText, piece: &str) -> Style {
        styled.buffer.iter().find(|(_, s)| s == piece).unwrap().0
    }

    #[test]
    fn test_round_trips_text() {
        let highlighter = SqlHighlighter::default();
        for line in [
            "SELECT * FROM orders WHERE total > 5 -- big ones",
            "select 'unterminated",
            "SELECT \"Name\" /* c */ FROM customers;",
            "  ",
        ] {
            assert_eq!(text(&highlighter.highlight(line, 0)), line);
        }
    }

    #[test]
    fn test_token_styles() {
        let styled = SqlHighlighter::default().highlight("SELECT count(id), 'x' FROM t", 0);
        assert_eq!(style_of(&styled, "SELECT"), Color::Green.bold());
        assert_eq!(style_of(&styled, "count"), Color::Magenta.normal());
        assert_eq!(style_of(&styled, "'x'"), Color::Yellow.normal());
        assert_eq!(style_of(&styled, "t"), Style::default());
    }

    #[test]
    fn test_comment_is_dimmed() {
        let styled = SqlHighlighter::default().highlight("SELECT 1 -- note", 0);
        assert_eq!(style_of(&styled, " -- note"), Color::DarkGray.dimmed());
    }

    #[test]
    fn test_meta_command() {
        let styled = SqlHighlighter::default().highlight("\\c shop", 0);
        assert_eq!(style_of(&styled, "\\c"), Color::Blue.bold());
        assert_eq!(text(&styled), "\\c shop");
    }

    #[test]
    fn test_disabled_highlighting() {
        let styled = SqlHighlighter::new(false).highlight("SELECT 1", 0);
        assert_eq!(styled.buffer.len(), 1);
        assert_eq!(style_of(&styled, "SELECT 1"), Style::default());
    }
}
