//! Word and keyword helpers shared by the analyzer and the completer.

use super::sql_lexer::{SqlLexer, TokenKind};

/// Which characters may belong to the word that ends at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordChars {
    /// Letters, digits and `_`
    AlphanumUnderscore,
    /// Anything except `( ) : ,` and whitespace
    ManyPunctuations,
    /// Anything except `. ( ) : ,` and whitespace
    MostPunctuations,
    /// Anything except whitespace
    AllPunctuations,
}

impl WordChars {
    fn accepts(self, c: char) -> bool {
        if c.is_whitespace() {
            return false;
        }
        match self {
            WordChars::AlphanumUnderscore => c.is_alphanumeric() || c == '_',
            WordChars::ManyPunctuations => !matches!(c, '(' | ')' | ':' | ','),
            WordChars::MostPunctuations => !matches!(c, '.' | '(' | ')' | ':' | ','),
            WordChars::AllPunctuations => true,
        }
    }
}

/// The trailing word of `text`, empty when `text` ends in whitespace.
pub fn last_word(text: &str, include: WordChars) -> &str {
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| include.accepts(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[start..]
}

/// `text` cut to its first `n` characters.
pub fn char_prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// `text` from character `from` (inclusive) to character `to` (exclusive).
pub fn char_slice(text: &str, from: usize, to: usize) -> &str {
    let head = char_prefix(text, to);
    match head.char_indices().nth(from) {
        Some((byte, _)) => &head[byte..],
        None => "",
    }
}

/// The keyword closest to the end of `sql`, skipping the last `n_skip`
/// tokens, together with `sql` truncated right after that keyword.
///
/// An opening parenthesis counts as a keyword; `AND`, `OR`, `NOT` and
/// `BETWEEN` do not.
pub fn find_prev_keyword(sql: &str, n_skip: usize) -> Option<(TokenKind, String)> {
    let tokens = SqlLexer::significant(sql);
    let limit = tokens.len().saturating_sub(n_skip);
    tokens[..limit]
        .iter()
        .rev()
        .find(|t| match &t.kind {
            TokenKind::LParen => true,
            TokenKind::Keyword(k) => !matches!(k.as_str(), "AND" | "OR" | "NOT" | "BETWEEN"),
            _ => false,
        })
        .map(|t| (t.kind.clone(), char_prefix(sql, t.span.end).to_string()))
}
