//! SQL lexer for error-tolerant tokenization
//!
//! This lexer is designed to be extremely forgiving and never panic.
//! It handles incomplete input gracefully, which is essential for
//! completion while the user is still typing.
//!
//! # Design Principles
//!
//! - **Never panic** - always return a valid token stream
//! - **Never reject input** - unknown characters become `Unknown` tokens
//! - **Don't detect syntax errors** - classification happens downstream
//! - **Performance** - simple character-by-character scanning
//!
//! Keywords are reported upper-cased. Multi-word clauses that the analyzer
//! treats as one unit (`GROUP BY`, `ORDER BY` and the join phrases such as
//! `LEFT OUTER JOIN`) come out as a single keyword token.

use std::ops::Range;

/// Words recognised as keywords. Anything else is an identifier.
pub const KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BEGIN", "BETWEEN", "BY", "CASE", "CAST",
    "CHECK", "COLUMN", "COMMIT", "CONSTRAINT", "COPY", "CREATE", "CROSS", "CURRENT_DATE",
    "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DECLARE", "DEFAULT", "DELETE", "DESC",
    "DESCRIBE", "DISTINCT", "DROP", "ELSE", "END", "EXCEPT", "EXEC", "EXECUTE", "EXISTS",
    "EXPLAIN", "FALSE", "FETCH", "FOR", "FOREIGN", "FROM", "FULL", "FUNCTION", "GRANT", "GROUP",
    "HAVING", "IF", "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTERVAL", "INTO", "IS",
    "JOIN", "LEFT", "LIKE", "LIMIT", "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER",
    "OUTER", "PRIMARY", "PROCEDURE", "REFERENCES", "REPLACE", "RETURNING", "REVOKE", "RIGHT",
    "ROLLBACK", "SCHEMA", "SELECT", "SET", "TABLE", "THEN", "TO", "TOP", "TRUE", "TRUNCATE",
    "TYPE", "UNION", "UNIQUE", "UPDATE", "USE", "USING", "VALUES", "VIEW", "WHEN", "WHERE",
    "WITH",
];

/// Token type enumeration
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Upper-cased keyword, possibly several words joined by one space
    Keyword(String),

    // Identifiers and Literals
    Ident(String),
    /// Raw text of a `"quoted"`, `` `quoted` `` or `[bracketed]` identifier
    QuotedIdent(String),
    Number(String),
    String(String),

    // Operators and Symbols
    Star,
    Comma,
    Dot,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    LParen,
    RParen,
    Colon,
    DoubleColon,
    Plus,
    Minus,
    Slash,
    Semicolon,

    // Special tokens
    EOF,
    Unknown(char),
}

impl TokenKind {
    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(self, TokenKind::Keyword(k) if k == word)
    }

    /// Any keyword ending in `JOIN`.
    pub fn is_join(&self) -> bool {
        matches!(self, TokenKind::Keyword(k) if k.ends_with("JOIN"))
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self, TokenKind::Ident(_) | TokenKind::QuotedIdent(_))
    }

    pub fn is_punctuation(&self) -> bool {
        matches!(
            self,
            TokenKind::Comma | TokenKind::LParen | TokenKind::RParen | TokenKind::Semicolon
        )
    }

    /// Lower-cased text used when dispatching on the last token.
    pub fn value(&self) -> String {
        match self {
            TokenKind::Keyword(s) | TokenKind::Ident(s) | TokenKind::QuotedIdent(s) => s.to_lowercase(),
            TokenKind::Number(s) => s.clone(),
            TokenKind::String(s) => format!("'{s}'"),
            TokenKind::Star => "*".into(),
            TokenKind::Comma => ",".into(),
            TokenKind::Dot => ".".into(),
            TokenKind::Eq => "=".into(),
            TokenKind::Ne => "<>".into(),
            TokenKind::Gt => ">".into(),
            TokenKind::Lt => "<".into(),
            TokenKind::Ge => ">=".into(),
            TokenKind::Le => "<=".into(),
            TokenKind::LParen => "(".into(),
            TokenKind::RParen => ")".into(),
            TokenKind::Colon => ":".into(),
            TokenKind::DoubleColon => "::".into(),
            TokenKind::Plus => "+".into(),
            TokenKind::Minus => "-".into(),
            TokenKind::Slash => "/".into(),
            TokenKind::Semicolon => ";".into(),
            TokenKind::EOF => String::new(),
            TokenKind::Unknown(c) => c.to_string(),
        }
    }
}

/// Token with position information (character indices)
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    /// Create a new token
    pub fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }
}

/// Identifier text with any surrounding quotes or brackets removed.
pub fn strip_quotes(raw: &str) -> &str {
    let mut chars = raw.chars();
    match (chars.next(), chars.next_back()) {
        (Some('"'), Some('"')) | (Some('`'), Some('`')) | (Some('['), Some(']')) => {
            &raw[1..raw.len() - 1]
        }
        (Some('"' | '`' | '['), _) => &raw[1..],
        _ => raw,
    }
}

/// SQL Lexer - error-tolerant tokenizer
pub struct SqlLexer {
    input: Vec<char>,
    pos: usize,
}

impl SqlLexer {
    /// Create a new lexer from input string
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenize the entire input, always ending with `EOF`
    pub fn tokenize(input: &str) -> Vec<Token> {
        let mut lexer = Self::new(input);
        let mut tokens = Vec::new();

        loop {
            let token = lexer.next_token();
            let is_eof = matches!(token.kind, TokenKind::EOF);
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    /// Tokenize without the trailing `EOF`
    pub fn significant(input: &str) -> Vec<Token> {
        let mut tokens = Self::tokenize(input);
        tokens.pop();
        tokens
    }

    /// Get the next token
    fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let start = self.pos;

        if self.is_at_end() {
            return Token::new(TokenKind::EOF, start..start);
        }

        let ch = self.current_char();

        match ch {
            // Single-character tokens
            '*' => self.single(TokenKind::Star, start),
            ',' => self.single(TokenKind::Comma, start),
            '.' => self.single(TokenKind::Dot, start),
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            ';' => self.single(TokenKind::Semicolon, start),
            '+' => self.single(TokenKind::Plus, start),
            '-' => self.single(TokenKind::Minus, start),
            '/' => self.single(TokenKind::Slash, start),
            '=' => self.single(TokenKind::Eq, start),

            // Operators (possibly two characters)
            ':' => {
                self.advance();
                if self.current_char() == ':' {
                    self.advance();
                    Token::new(TokenKind::DoubleColon, start..self.pos)
                } else {
                    Token::new(TokenKind::Colon, start..self.pos)
                }
            }
            '!' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    Token::new(TokenKind::Ne, start..self.pos)
                } else {
                    Token::new(TokenKind::Unknown('!'), start..self.pos)
                }
            }
            '>' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    Token::new(TokenKind::Ge, start..self.pos)
                } else {
                    Token::new(TokenKind::Gt, start..self.pos)
                }
            }
            '<' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    Token::new(TokenKind::Le, start..self.pos)
                } else if self.current_char() == '>' {
                    self.advance();
                    Token::new(TokenKind::Ne, start..self.pos)
                } else {
                    Token::new(TokenKind::Lt, start..self.pos)
                }
            }

            // String literals
            '\'' => self.scan_string(start),

            // Quoted identifiers
            '"' | '`' => self.scan_quoted(ch, start),
            '[' => self.scan_quoted(']', start),

            // Numbers
            '0'..='9' => self.scan_number(start),

            // Identifiers and keywords
            c if c.is_alphabetic() || c == '_' || c == '#' || c == '@' => self.scan_identifier(start),

            // Unknown character - don't panic, just return it
            _ => self.single(TokenKind::Unknown(ch), start),
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Token {
        self.advance();
        Token::new(kind, start..self.pos)
    }

    /// Scan a string literal; `''` inside the literal is an escaped quote
    fn scan_string(&mut self, start: usize) -> Token {
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();
            if ch == '\'' {
                if self.peek_char() == '\'' {
                    value.push('\'');
                    self.advance();
                    self.advance();
                    continue;
                }
                break;
            }
            value.push(ch);
            self.advance();
        }

        // Skip closing quote if present
        if self.current_char() == '\'' {
            self.advance();
        }

        Token::new(TokenKind::String(value), start..self.pos)
    }

    /// Scan a quoted identifier up to `close`, keeping the quotes
    fn scan_quoted(&mut self, close: char, start: usize) -> Token {
        let mut raw = String::new();
        raw.push(self.current_char());
        self.advance();

        while !self.is_at_end() {
            let ch = self.current_char();
            raw.push(ch);
            self.advance();
            if ch == close {
                if self.current_char() == close && close != ']' {
                    // doubled quote
                    raw.push(close);
                    self.advance();
                    continue;
                }
                break;
            }
        }

        Token::new(TokenKind::QuotedIdent(raw), start..self.pos)
    }

    /// Scan a number (integer or decimal)
    fn scan_number(&mut self, start: usize) -> Token {
        let mut value = String::new();

        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            value.push(self.current_char());
            self.advance();
        }

        // Handle decimal point
        if self.current_char() == '.' && self.peek_char().is_ascii_digit() {
            value.push('.');
            self.advance();
            while !self.is_at_end() && self.current_char().is_ascii_digit() {
                value.push(self.current_char());
                self.advance();
            }
        }

        Token::new(TokenKind::Number(value), start..self.pos)
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self, start: usize) -> Token {
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();
            if is_word_char(ch) {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let upper = value.to_uppercase();
        if !KEYWORDS.contains(&upper.as_str()) {
            return Token::new(TokenKind::Ident(value), start..self.pos);
        }

        let keyword = match upper.as_str() {
            "GROUP" | "ORDER" => {
                if self.follow_words(&["BY"]) {
                    format!("{upper} BY")
                } else {
                    upper
                }
            }
            "INNER" | "CROSS" | "NATURAL" => {
                if self.follow_words(&["JOIN"]) {
                    format!("{upper} JOIN")
                } else {
                    upper
                }
            }
            "LEFT" | "RIGHT" | "FULL" => {
                if self.follow_words(&["OUTER", "JOIN"]) {
                    format!("{upper} OUTER JOIN")
                } else if self.follow_words(&["JOIN"]) {
                    format!("{upper} JOIN")
                } else {
                    upper
                }
            }
            _ => upper,
        };

        Token::new(TokenKind::Keyword(keyword), start..self.pos)
    }

    /// Consume `words` (case-insensitive, whitespace separated) if they come
    /// next; otherwise leave the position untouched.
    fn follow_words(&mut self, words: &[&str]) -> bool {
        let saved_pos = self.pos;
        for word in words {
            self.skip_whitespace();
            if !self.peek_word().eq_ignore_ascii_case(word) {
                self.pos = saved_pos;
                return false;
            }
            self.skip_word();
        }
        true
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) {
        loop {
            self.skip_whitespace();
            if self.current_char() == '-' && self.peek_char() == '-' {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
            } else if self.current_char() == '/' && self.peek_char() == '*' {
                self.advance();
                self.advance();
                while !self.is_at_end() && !(self.current_char() == '*' && self.peek_char() == '/') {
                    self.advance();
                }
                self.advance();
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Peek the next word without consuming it
    fn peek_word(&self) -> String {
        let mut pos = self.pos;
        let mut word = String::new();

        while pos < self.input.len() {
            let ch = self.input[pos];
            if is_word_char(ch) {
                word.push(ch);
                pos += 1;
            } else {
                break;
            }
        }

        word
    }

    /// Skip the next word
    fn skip_word(&mut self) {
        while !self.is_at_end() {
            if is_word_char(self.current_char()) {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Get current character
    fn current_char(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.input[self.pos]
        }
    }

    /// Peek at next character
    fn peek_char(&self) -> char {
        if self.pos + 1 >= self.input.len() {
            '\0'
        } else {
            self.input[self.pos + 1]
        }
    }

    /// Advance position
    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '$' | '#' | '@')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(token: &Token) -> Option<&str> {
        match &token.kind {
            TokenKind::Keyword(k) => Some(k),
            _ => None,
        }
    }

    #[test]
    fn test_tokenize_simple_select() {
        let tokens = SqlLexer::tokenize("SELECT * FROM users");
        assert_eq!(tokens.len(), 5); // SELECT, *, FROM, users, EOF

        assert_eq!(keyword(&tokens[0]), Some("SELECT"));
        assert!(matches!(tokens[1].kind, TokenKind::Star));
        assert_eq!(keyword(&tokens[2]), Some("FROM"));
        assert!(matches!(tokens[3].kind, TokenKind::Ident(ref s) if s == "users"));
        assert!(matches!(tokens[4].kind, TokenKind::EOF));
        assert_eq!(tokens[3].span, 14..19);
    }

    #[test]
    fn test_tokenize_with_where() {
        let tokens = SqlLexer::tokenize("SELECT name FROM users WHERE age > 18");
        assert!(matches!(tokens[1].kind, TokenKind::Ident(ref s) if s == "name"));
        assert_eq!(keyword(&tokens[4]), Some("WHERE"));
        assert!(matches!(tokens[6].kind, TokenKind::Gt));
        assert!(matches!(tokens[7].kind, TokenKind::Number(ref s) if s == "18"));
    }

    #[test]
    fn test_tokenize_partial_input() {
        let tokens = SqlLexer::tokenize("SELECT * FR");
        assert!(matches!(tokens[2].kind, TokenKind::Ident(ref s) if s == "FR"));
        assert!(matches!(tokens[3].kind, TokenKind::EOF));

        let tokens = SqlLexer::tokenize("SELECT 'unterminated");
        assert!(matches!(tokens[1].kind, TokenKind::String(ref s) if s == "unterminated"));
    }

    #[test]
    fn test_tokenize_string_literal() {
        let tokens = SqlLexer::tokenize("SELECT * FROM users WHERE name = 'O''Brien'");
        assert!(matches!(
            tokens.iter().find(|t| matches!(t.kind, TokenKind::String(_))),
            Some(Token { kind: TokenKind::String(s), .. }) if s == "O'Brien"
        ));
    }

    #[test]
    fn test_tokenize_quoted_identifiers() {
        let tokens = SqlLexer::significant(r#"SELECT "Order Id", [Total], `x` FROM t"#);
        let quoted: Vec<_> = tokens
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::QuotedIdent(raw) => Some(strip_quotes(raw)),
                _ => None,
            })
            .collect();
        assert_eq!(quoted, vec!["Order Id", "Total", "x"]);
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = SqlLexer::tokenize("a = 1 AND b != 2 AND c >= 3 AND d <= 4 AND e::int");
        assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Eq)));
        assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Ne)));
        assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Ge)));
        assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Le)));
        assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::DoubleColon)));
    }

    #[test]
    fn test_tokenize_group_and_order_by() {
        let tokens = SqlLexer::tokenize("SELECT COUNT(*) FROM users GROUP  BY age ORDER BY age DESC");
        assert!(tokens.iter().any(|t| t.kind.is_keyword("GROUP BY")));
        assert!(tokens.iter().any(|t| t.kind.is_keyword("ORDER BY")));
        assert!(tokens.iter().any(|t| t.kind.is_keyword("DESC")));
        assert!(matches!(tokens[1].kind, TokenKind::Ident(ref s) if s == "COUNT"));
    }

    #[test]
    fn test_tokenize_join_phrases() {
        let tokens = SqlLexer::significant("a LEFT OUTER JOIN b INNER JOIN c left d natural join e");
        let keywords: Vec<_> = tokens.iter().filter_map(keyword).collect();
        assert_eq!(
            keywords,
            vec!["LEFT OUTER JOIN", "INNER JOIN", "LEFT", "NATURAL JOIN"]
        );
        assert!(tokens[1].kind.is_join());
    }

    #[test]
    fn test_tokenize_skips_comments() {
        let tokens = SqlLexer::significant("SELECT -- pick\n a /* the column */ FROM t");
        assert_eq!(tokens.len(), 4);
        assert!(matches!(tokens[1].kind, TokenKind::Ident(ref s) if s == "a"));
    }

    #[test]
    fn test_tokenize_empty_input() {
        let tokens = SqlLexer::tokenize("");
        assert_eq!(tokens.len(), 1);
        assert!(matches!(tokens[0].kind, TokenKind::EOF));
        assert!(SqlLexer::significant("   ").is_empty());
    }

    #[test]
    fn test_tokenize_case_insensitive() {
        for input in ["SELECT * FROM users", "select * from users", "SeLeCt * FrOm users"] {
            let tokens = SqlLexer::tokenize(input);
            assert_eq!(keyword(&tokens[0]), Some("SELECT"));
        }
    }

    #[test]
    fn test_tokenize_decimal_numbers() {
        let tokens = SqlLexer::tokenize("SELECT * WHERE price = 19.99");
        assert!(matches!(
            tokens.iter().find(|t| matches!(t.kind, TokenKind::Number(_))),
            Some(Token { kind: TokenKind::Number(s), .. }) if s == "19.99"
        ));
    }

    #[test]
    fn test_tokenize_unknown_chars() {
        let tokens = SqlLexer::tokenize("SELECT ? FROM users");
        assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Unknown('?'))));
        let tokens = SqlLexer::tokenize("SELECT * FROM #temp");
        assert!(matches!(tokens[3].kind, TokenKind::Ident(ref s) if s == "#temp"));
    }
}
