//! The statement under the cursor.

use super::ctes::{LocalTable, isolate_query_ctes};
use super::sql_lexer::{SqlLexer, Token, TokenKind};
use super::tables::{TableReference, extract_tables};
use super::words::{WordChars, char_prefix, char_slice, find_prev_keyword, last_word};

/// Which tables [`SqlStatement::get_tables`] should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableScope {
    /// Every table of the statement
    Full,
    /// Only the INSERT target
    Insert,
    /// Tables named before the cursor
    Before,
}

/// A statement split around the cursor.
///
/// The partially typed word at the cursor is removed from
/// `text_before_cursor` and kept in `identifier`, so the last token is the
/// one the word follows.
#[derive(Debug, Clone)]
pub struct SqlStatement {
    pub full_text: String,
    pub text_before_cursor: String,
    pub word_before_cursor: String,
    pub local_tables: Vec<LocalTable>,
    identifier: Option<String>,
    tokens: Vec<Token>,
    typed_last: Option<TokenKind>,
}

impl SqlStatement {
    pub fn new(full_text: &str, text_before_cursor: &str) -> Self {
        let word_before_cursor = last_word(text_before_cursor, WordChars::ManyPunctuations).to_string();
        let (full_text, mut before, local_tables) = isolate_query_ctes(full_text, text_before_cursor);

        let mut identifier = None;
        if !word_before_cursor.is_empty() && !word_before_cursor.starts_with('\\') {
            let keep = before.chars().count().saturating_sub(word_before_cursor.chars().count());
            before = char_prefix(&before, keep).to_string();
            identifier = Some(word_before_cursor.clone());
        }

        let (full_text, before) = current_statement(&full_text, &before);
        let tokens = SqlLexer::significant(&before);
        let typed_last = tokens.last().map(|t| t.kind.clone());
        Self {
            full_text,
            text_before_cursor: before,
            word_before_cursor,
            local_tables,
            identifier,
            tokens,
            typed_last,
        }
    }

    /// Significant tokens before the cursor, excluding the partial word.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn last_token(&self) -> Option<&Token> {
        self.tokens.last()
    }

    /// The last token as typed, unaffected by [`Self::reduce_to_prev_keyword`].
    pub fn typed_last_token(&self) -> Option<&TokenKind> {
        self.typed_last.as_ref()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn is_insert(&self) -> bool {
        self.tokens.first().is_some_and(|t| t.kind.is_keyword("INSERT"))
    }

    /// Tables available to the statement. Unless `scope` is `Insert`, an
    /// INSERT target is left out.
    pub fn get_tables(&self, scope: TableScope) -> Vec<TableReference> {
        let text = match scope {
            TableScope::Full | TableScope::Insert => &self.full_text,
            TableScope::Before => &self.text_before_cursor,
        };
        let mut tables = extract_tables(text);
        if scope == TableScope::Insert {
            tables.truncate(1);
        } else if self.is_insert() && !tables.is_empty() {
            tables.remove(0);
        }
        tables
    }

    /// The `(grandparent, parent)` qualifiers of the word at the cursor:
    /// `abc.def.gh` gives `(abc, def)`, `abc.` gives `(None, abc)`.
    pub fn get_identifier_parents(&self) -> (Option<String>, Option<String>) {
        let Some(identifier) = &self.identifier else {
            return (None, None);
        };
        let mut parts = split_dotted(identifier);
        parts.pop();
        match parts.len() {
            0 => (None, None),
            1 => (None, parts.pop()),
            n => (Some(parts[n - 2].clone()), Some(parts[n - 1].clone())),
        }
    }

    /// The immediate qualifier of the word at the cursor, if any.
    pub fn identifier_parent(&self) -> Option<String> {
        self.get_identifier_parents().1
    }

    /// Cut the text back to the previous keyword and return it.
    pub fn reduce_to_prev_keyword(&mut self, n_skip: usize) -> Option<TokenKind> {
        let (keyword, text) = find_prev_keyword(&self.text_before_cursor, n_skip)?;
        self.tokens = SqlLexer::significant(&text);
        self.text_before_cursor = text;
        Some(keyword)
    }

    /// True when the cursor sits inside an unfinished WHERE clause.
    pub fn in_where_clause(&self) -> bool {
        let mut depth = 0usize;
        let mut where_depth = None;
        for token in &self.tokens {
            match &token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth = depth.saturating_sub(1);
                    if where_depth.is_some_and(|d| depth < d) {
                        where_depth = None;
                    }
                }
                TokenKind::Keyword(k) if k == "WHERE" => where_depth = Some(depth),
                TokenKind::Keyword(k)
                    if where_depth == Some(depth)
                        && matches!(
                            k.as_str(),
                            "GROUP BY" | "ORDER BY" | "HAVING" | "LIMIT" | "UNION" | "EXCEPT" | "INTERSECT" | "RETURNING"
                        ) =>
                {
                    where_depth = None
                }
                _ => {}
            }
        }
        where_depth.is_some()
    }
}

/// Split `a."b.c".d` on the dots that are outside quotes.
fn split_dotted(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match (quote, c) {
            (None, '.') => parts.push(std::mem::take(&mut current)),
            (None, '"' | '`') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[') => {
                quote = Some(']');
                current.push(c);
            }
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Narrow multi-statement input to the statement holding the cursor.
fn current_statement(full_text: &str, before: &str) -> (String, String) {
    let tokens = SqlLexer::significant(before);
    match tokens.iter().rev().find(|t| t.kind == TokenKind::Semicolon) {
        Some(semicolon) => {
            let start = semicolon.span.end;
            let before_len = before.chars().count();
            let full_len = full_text.chars().count();
            (
                char_slice(full_text, start, full_len).to_string(),
                char_slice(before, start, before_len).to_string(),
            )
        }
        None => (full_text.to_string(), before.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_identifier_parents() {
        let cases = [
            (" ", (None, None)),
            ("abc", (None, None)),
            ("abc.", (None, Some("abc"))),
            ("abc.def", (None, Some("abc"))),
            ("abc.def.", (Some("abc"), Some("def"))),
            ("abc.def.ghi", (Some("abc"), Some("def"))),
        ];
        for (before, (grandparent, parent)) in cases {
            let stmt = SqlStatement::new("SELECT * FROM abc.def.ghi", before);
            assert_eq!(
                stmt.get_identifier_parents(),
                (grandparent.map(String::from), parent.map(String::from)),
                "input {before:?}"
            );
        }
    }

    #[test]
    fn test_quoted_parents_keep_inner_dots() {
        let stmt = SqlStatement::new("", r#"SELECT * FROM "my.db".dbo.x"#);
        assert_eq!(
            stmt.get_identifier_parents(),
            (Some("\"my.db\"".to_string()), Some("dbo".to_string()))
        );
    }

    #[test]
    fn test_partial_word_is_removed() {
        let stmt = SqlStatement::new("SELECT * FROM us", "SELECT * FROM us");
        assert_eq!(stmt.word_before_cursor, "us");
        assert_eq!(stmt.text_before_cursor, "SELECT * FROM ");
        assert!(stmt.last_token().unwrap().kind.is_keyword("FROM"));
    }

    #[test]
    fn test_multiple_statements() {
        let full = "SELECT * FROM a; SELECT * FROM b WHERE ";
        let stmt = SqlStatement::new(full, full);
        assert_eq!(stmt.full_text.trim(), "SELECT * FROM b WHERE");
        let names: Vec<_> = stmt.get_tables(TableScope::Full).into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_insert_scopes() {
        let full = "INSERT INTO orders SELECT * FROM customers";
        let stmt = SqlStatement::new(full, full);
        assert!(stmt.is_insert());
        let names = |scope| -> Vec<String> {
            stmt.get_tables(scope).into_iter().map(|t| t.name).collect()
        };
        assert_eq!(names(TableScope::Insert), vec!["orders"]);
        assert_eq!(names(TableScope::Full), vec!["customers"]);
    }

    #[test]
    fn test_where_clause_detection() {
        let open = SqlStatement::new("", "SELECT * FROM t WHERE a = 1 AND ");
        assert!(open.in_where_clause());
        let closed = SqlStatement::new("", "SELECT * FROM t WHERE a = 1 ORDER BY ");
        assert!(!closed.in_where_clause());
        let nested = SqlStatement::new("", "SELECT * FROM t WHERE a IN (SELECT b FROM u) AND ");
        assert!(nested.in_where_clause());
    }

    #[test]
    fn test_reduce_to_prev_keyword() {
        let mut stmt = SqlStatement::new("", "SELECT a, b FROM t WHERE a = 1 AND b = ");
        let keyword = stmt.reduce_to_prev_keyword(0).unwrap();
        assert!(keyword.is_keyword("WHERE"));
        assert_eq!(stmt.text_before_cursor, "SELECT a, b FROM t WHERE");
        assert!(stmt.last_token().unwrap().kind.is_keyword("WHERE"));
    }
}
