//! Identifier quoting and search-pattern escaping.
//!
//! Both rules come from the driver (`IdentifierQuoteChar` and
//! `SearchPatternEscape`) and are fixed for the lifetime of a connection.

use regex::Regex;
use std::sync::LazyLock;

static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[_a-z][_a-z0-9\$]*$").expect("valid regex"));

/// Words that always need quoting when used as identifiers.
const RESERVED: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN", "CONSTRAINT",
    "CREATE", "CROSS", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXISTS",
    "FOREIGN", "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IN", "INDEX", "INNER", "INSERT",
    "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "ON", "OR", "ORDER",
    "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TO", "UNION",
    "UNIQUE", "UPDATE", "USER", "USING", "VALUES", "VIEW", "WHEN", "WHERE", "WITH",
];

/// Quotes, unquotes and pattern-escapes identifiers for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentifierCodec {
    quote: Option<char>,
    escape: Option<char>,
}

impl IdentifierCodec {
    /// Build a codec from the driver-reported characters.
    ///
    /// A blank quote character means the driver does not quote identifiers.
    pub fn new(quote_char: &str, search_escape: &str) -> Self {
        let quote = quote_char.chars().next().filter(|c| !c.is_whitespace());
        let escape = search_escape.chars().next().filter(|c| !c.is_whitespace());
        Self { quote, escape }
    }

    pub fn quote_char(&self) -> Option<char> {
        self.quote
    }

    pub fn escape_char(&self) -> Option<char> {
        self.escape
    }

    fn closing_quote(&self) -> Option<char> {
        self.quote.map(|q| if q == '[' { ']' } else { q })
    }

    /// Whether `name` is wrapped in this connection's quote characters.
    pub fn is_quoted(&self, name: &str) -> bool {
        match (self.quote, self.closing_quote()) {
            (Some(open), Some(close)) => {
                name.chars().count() > 1 && name.starts_with(open) && name.ends_with(close)
            }
            _ => false,
        }
    }

    /// Quote `name` unless it is a plain lower-case identifier.
    ///
    /// Mixed case, reserved words and names with special characters are
    /// quoted; already-quoted names pass through.
    pub fn escape_name(&self, name: &str) -> String {
        let (Some(open), Some(close)) = (self.quote, self.closing_quote()) else {
            return name.to_string();
        };
        if name.is_empty() || self.is_quoted(name) {
            return name.to_string();
        }
        let needs_quotes =
            !PLAIN_IDENTIFIER.is_match(name) || RESERVED.contains(&name.to_uppercase().as_str());
        if !needs_quotes {
            return name.to_string();
        }
        let doubled = name.replace(close, &format!("{close}{close}"));
        format!("{open}{doubled}{close}")
    }

    /// Strip quoting added by [`escape_name`](Self::escape_name).
    pub fn unescape_name(&self, name: &str) -> String {
        let Some(close) = self.closing_quote() else {
            return name.to_string();
        };
        if !self.is_quoted(name) {
            return name.to_string();
        }
        let inner: String = {
            let mut chars = name.chars();
            chars.next();
            chars.next_back();
            chars.collect()
        };
        inner.replace(&format!("{close}{close}"), &close.to_string())
    }

    pub fn escape_names<I, S>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|n| self.escape_name(n.as_ref()))
            .collect()
    }

    /// Escape the search-pattern wildcards `_` and `%` in a literal name.
    pub fn sanitize_search_string(&self, term: &str) -> String {
        let Some(esc) = self.escape else {
            return term.to_string();
        };
        let mut out = String::with_capacity(term.len());
        for c in term.chars() {
            if c == '_' || c == '%' {
                out.push(esc);
            }
            out.push(c);
        }
        out
    }

    /// Reverse of [`sanitize_search_string`](Self::sanitize_search_string).
    pub fn unsanitize_search_string(&self, term: &str) -> String {
        let Some(esc) = self.escape else {
            return term.to_string();
        };
        let mut out = String::with_capacity(term.len());
        let mut chars = term.chars().peekable();
        while let Some(c) = chars.next() {
            if c == esc && matches!(chars.peek(), Some('_') | Some('%')) {
                continue;
            }
            out.push(c);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> IdentifierCodec {
        IdentifierCodec::new("\"", "\\")
    }

    #[test]
    fn test_escape_name() {
        let c = codec();
        assert_eq!(c.escape_name("orders"), "orders");
        assert_eq!(c.escape_name("Orders"), "\"Orders\"");
        assert_eq!(c.escape_name("order items"), "\"order items\"");
        assert_eq!(c.escape_name("select"), "\"select\"");
        assert_eq!(c.escape_name("\"Already\""), "\"Already\"");
        assert_eq!(c.escape_name("say\"hi"), "\"say\"\"hi\"");
        assert_eq!(c.escape_name(""), "");
    }

    #[test]
    fn test_unescape_name() {
        let c = codec();
        assert_eq!(c.unescape_name("\"Orders\""), "Orders");
        assert_eq!(c.unescape_name("\"say\"\"hi\""), "say\"hi");
        assert_eq!(c.unescape_name("plain"), "plain");
        assert_eq!(c.unescape_name("\""), "\"");
    }

    #[test]
    fn test_brackets() {
        let c = IdentifierCodec::new("[", "\\");
        assert_eq!(c.escape_name("Order Details"), "[Order Details]");
        assert_eq!(c.unescape_name("[Order Details]"), "Order Details");
    }

    #[test]
    fn test_blank_quote_char_disables_quoting() {
        let c = IdentifierCodec::new(" ", "");
        assert_eq!(c.escape_name("Mixed Case"), "Mixed Case");
        assert_eq!(c.sanitize_search_string("a_b"), "a_b");
    }

    #[test]
    fn test_sanitize_search_string() {
        let c = codec();
        assert_eq!(c.sanitize_search_string("my_db%"), "my\\_db\\%");
        assert_eq!(c.unsanitize_search_string("my\\_db\\%"), "my_db%");
        assert_eq!(c.unsanitize_search_string("a\\b"), "a\\b");
    }
}
