//! Table references named by a statement's FROM, JOIN, INTO, UPDATE, COPY
//! and TABLE clauses.

use super::sql_lexer::{SqlLexer, Token, TokenKind, strip_quotes};

/// A table (or table-valued function) a statement reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableReference {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
    pub is_function: bool,
}

impl TableReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            name: name.into(),
            alias: None,
            is_function: false,
        }
    }

    /// How the rest of the statement refers to this table: the alias, else
    /// the name, double-quoted unless it is all lower case or already quoted.
    pub fn reference(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        if is_lower(&self.name) || self.name.starts_with('"') {
            self.name.clone()
        } else {
            format!("\"{}\"", self.name)
        }
    }
}

/// True when `s` has at least one cased character and no upper-case ones.
pub fn is_lower(s: &str) -> bool {
    s.chars().any(|c| c.is_lowercase()) && !s.chars().any(|c| c.is_uppercase())
}

const TABLE_PREFIXES: &[&str] = &["COPY", "FROM", "INTO", "UPDATE", "TABLE"];
const SUBSELECT_STARTS: &[&str] = &["SELECT", "INSERT", "UPDATE", "CREATE", "DELETE", "WITH"];

fn is_table_prefix(keyword: &str) -> bool {
    TABLE_PREFIXES.contains(&keyword) || keyword.ends_with("JOIN")
}

/// Extract the table references of the first statement in `sql`.
///
/// INSERT statements stop at the first punctuation so that the column list
/// in `INSERT INTO t (a, b)` is not mistaken for tables.
pub fn extract_tables(sql: &str) -> Vec<TableReference> {
    let tokens = SqlLexer::significant(sql);
    let end = tokens
        .iter()
        .position(|t| t.kind == TokenKind::Semicolon)
        .unwrap_or(tokens.len());
    let tokens = &tokens[..end];
    let insert = tokens.first().is_some_and(|t| t.kind.is_keyword("INSERT"));

    let mut found = Vec::new();
    extract_from_part(tokens, insert, &mut found);
    found.retain(|t| !t.name.is_empty());
    found
}

/// Index of the parenthesis closing the one at `open`, or `tokens.len()`.
pub(super) fn matching_paren(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}

fn is_subselect(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .any(|t| matches!(&t.kind, TokenKind::Keyword(k) if SUBSELECT_STARTS.contains(&k.as_str())))
}

fn extract_from_part(tokens: &[Token], insert: bool, found: &mut Vec<TableReference>) {
    let mut prefix_seen = false;
    let mut i = 0;
    while i < tokens.len() {
        let kind = &tokens[i].kind;
        if !prefix_seen {
            match kind {
                TokenKind::Keyword(k) => prefix_seen = is_table_prefix(k),
                // Parenthesised expressions outside a table clause never name tables.
                TokenKind::LParen => i = matching_paren(tokens, i),
                _ => {}
            }
            i += 1;
            continue;
        }

        match kind {
            TokenKind::LParen => {
                let close = matching_paren(tokens, i);
                let inner = &tokens[i + 1..close.min(tokens.len())];
                if is_subselect(inner) {
                    extract_from_part(inner, insert, found);
                } else if insert {
                    return;
                }
                i = skip_alias(tokens, close + 1);
            }
            k if insert && k.is_punctuation() => return,
            TokenKind::Keyword(k) => {
                if k != "FROM" && !k.ends_with("JOIN") {
                    prefix_seen = is_table_prefix(k);
                }
                i += 1;
            }
            k if k.is_identifier() => {
                let (table, next) = parse_table_identifier(tokens, i, !insert);
                found.push(table);
                i = next;
            }
            _ => i += 1,
        }
    }
}

/// Position after an optional `[AS] alias` starting at `i`, plus the alias.
fn read_alias(tokens: &[Token], mut i: usize) -> (usize, Option<&Token>) {
    if tokens.get(i).is_some_and(|t| t.kind.is_keyword("AS")) {
        i += 1;
    }
    match tokens.get(i) {
        Some(t) if t.kind.is_identifier() => (i + 1, Some(t)),
        _ => (i, None),
    }
}

fn skip_alias(tokens: &[Token], i: usize) -> usize {
    read_alias(tokens, i).0
}

fn identifier_text(token: &Token) -> (String, bool) {
    match &token.kind {
        TokenKind::Ident(s) => (s.clone(), false),
        TokenKind::QuotedIdent(raw) => (strip_quotes(raw).to_string(), true),
        _ => (String::new(), false),
    }
}

/// Parse `[catalog.][schema.]name [(args)] [[AS] alias]` starting at `i`.
fn parse_table_identifier(tokens: &[Token], mut i: usize, allow_functions: bool) -> (TableReference, usize) {
    let mut parts: Vec<(String, bool)> = Vec::new();
    while let Some(token) = tokens.get(i).filter(|t| t.kind.is_identifier()) {
        parts.push(identifier_text(token));
        i += 1;
        if tokens.get(i).is_some_and(|t| t.kind == TokenKind::Dot) {
            i += 1;
            if !tokens.get(i).is_some_and(|t| t.kind.is_identifier()) {
                // "schema.<cursor>": nothing named yet
                parts.push((String::new(), false));
                break;
            }
        } else {
            break;
        }
    }

    let mut is_function = false;
    if allow_functions && tokens.get(i).is_some_and(|t| t.kind == TokenKind::LParen) {
        is_function = true;
        i = matching_paren(tokens, i) + 1;
    }

    let (next, alias_token) = read_alias(tokens, i);
    let mut alias = alias_token.map(|t| {
        let (text, quoted) = identifier_text(t);
        if quoted { format!("\"{text}\"") } else { text }
    });

    let (mut name, name_quoted) = parts.pop().unwrap_or_default();
    let schema = parts.pop().map(|(s, quoted)| if quoted { s } else { s.to_lowercase() });
    let catalog = parts.pop().map(|(c, _)| c);

    if name_quoted && alias.is_none() && is_lower(&name) {
        alias = Some(format!("\"{name}\""));
    }
    if !name_quoted && !name.is_empty() && !is_lower(&name) {
        alias.get_or_insert_with(|| name.clone());
        name = name.to_lowercase();
    }

    (
        TableReference {
            catalog,
            schema,
            name,
            alias,
            is_function,
        },
        next,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(catalog: Option<&str>, schema: Option<&str>, name: &str, alias: Option<&str>) -> TableReference {
        TableReference {
            catalog: catalog.map(String::from),
            schema: schema.map(String::from),
            name: name.to_string(),
            alias: alias.map(String::from),
            is_function: false,
        }
    }

    #[test]
    fn test_three_part_names_with_aliases() {
        let tables = extract_tables(
            "SELECT a.col1, b.col2 FROM abc.def.ghi AS a \
             INNER JOIN jkl.mno.pqr AS b ON a.id_one = b.id_two",
        );
        assert_eq!(
            tables,
            vec![
                named(Some("abc"), Some("def"), "ghi", Some("a")),
                named(Some("jkl"), Some("mno"), "pqr", Some("b")),
            ]
        );
    }

    #[test]
    fn test_identifier_list_and_bare_alias() {
        let tables = extract_tables("SELECT * FROM orders o, customers WHERE o.id = 1");
        assert_eq!(
            tables,
            vec![named(None, None, "orders", Some("o")), named(None, None, "customers", None)]
        );
        assert_eq!(tables[0].reference(), "o");
        assert_eq!(tables[1].reference(), "customers");
    }

    #[test]
    fn test_insert_stops_at_column_list() {
        let tables = extract_tables("INSERT INTO abc (col1, col2) VALUES (1, 2)");
        assert_eq!(tables, vec![named(None, None, "abc", None)]);
    }

    #[test]
    fn test_subselects_are_searched() {
        let tables = extract_tables("SELECT * FROM (SELECT id FROM inner_t) AS sub JOIN outer_t ON 1 = 1");
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["inner_t", "outer_t"]);

        let unfinished = extract_tables("SELECT * FROM (SELECT id FROM users");
        assert_eq!(unfinished, vec![named(None, None, "users", None)]);
    }

    #[test]
    fn test_case_and_quoting() {
        let tables = extract_tables(r#"SELECT * FROM Sales."Orders" JOIN Dbo.Items JOIN "lower""#);
        assert_eq!(tables[0], named(None, Some("sales"), "Orders", None));
        assert_eq!(tables[0].reference(), "\"Orders\"");
        assert_eq!(tables[1], named(None, Some("dbo"), "items", Some("Items")));
        assert_eq!(tables[2].reference(), "\"lower\"");
    }

    #[test]
    fn test_functions_and_partial_names() {
        let tables = extract_tables("SELECT * FROM generate_series(1, 10) g");
        assert!(tables[0].is_function);
        assert_eq!(tables[0].alias.as_deref(), Some("g"));

        assert!(extract_tables("SELECT * FROM sche.").is_empty());
        assert!(extract_tables("SELECT a, b").is_empty());
    }

    #[test]
    fn test_only_first_statement_counts() {
        let tables = extract_tables("UPDATE a SET x = 1; SELECT * FROM b");
        assert_eq!(tables, vec![named(None, None, "a", None)]);
    }
}
