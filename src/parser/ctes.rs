//! Common table expressions.
//!
//! `WITH name [(cols)] AS (body), ...` is reduced to local table metadata so
//! the main query can be analysed on its own.

use super::sql_lexer::{SqlLexer, Token, TokenKind, strip_quotes};
use super::tables::matching_paren;
use super::words::char_slice;

/// A table defined by the statement itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTable {
    pub name: String,
    pub columns: Vec<String>,
}

/// A CTE and the character span of its parenthesised body.
#[derive(Debug, Clone, PartialEq)]
struct TableExpression {
    table: LocalTable,
    start: usize,
    stop: usize,
}

fn name_of(token: &Token) -> Option<String> {
    match &token.kind {
        TokenKind::Ident(s) => Some(s.clone()),
        TokenKind::QuotedIdent(raw) => Some(strip_quotes(raw).to_string()),
        _ => None,
    }
}

/// Names produced by a SELECT list (or a RETURNING clause).
fn output_columns(body: &[Token]) -> Vec<String> {
    let start = body.iter().position(|t| {
        matches!(&t.kind, TokenKind::Keyword(k) if k == "SELECT" || k == "RETURNING")
    });
    let Some(start) = start else {
        return Vec::new();
    };

    // An item's name is its last identifier: the alias, or the column
    // itself after any qualifiers.
    fn flush(item: &mut Vec<&Token>, columns: &mut Vec<String>) {
        if let Some(name) = item.iter().rev().find_map(|t| name_of(t)) {
            columns.push(name);
        }
        item.clear();
    }

    let mut columns = Vec::new();
    let mut item: Vec<&Token> = Vec::new();
    let mut depth = 0usize;

    for token in &body[start + 1..] {
        match &token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                flush(&mut item, &mut columns);
                continue;
            }
            TokenKind::Keyword(k) if depth == 0 && (k == "FROM" || k == "INTO") => break,
            TokenKind::Keyword(k) if k == "DISTINCT" || k == "ALL" => continue,
            _ => {}
        }
        if depth == 0 {
            item.push(token);
        }
    }
    flush(&mut item, &mut columns);
    columns
}

fn extract_ctes(tokens: &[Token]) -> Vec<TableExpression> {
    if !tokens.first().is_some_and(|t| t.kind.is_keyword("WITH")) {
        return Vec::new();
    }

    let mut ctes = Vec::new();
    let mut i = 1;
    while let Some(name) = tokens.get(i).and_then(name_of) {
        i += 1;
        let mut explicit = None;
        if tokens.get(i).is_some_and(|t| t.kind == TokenKind::LParen) {
            let close = matching_paren(tokens, i);
            explicit = Some(
                tokens[i + 1..close.min(tokens.len())]
                    .iter()
                    .filter_map(name_of)
                    .collect::<Vec<_>>(),
            );
            i = close + 1;
        }
        if !tokens.get(i).is_some_and(|t| t.kind.is_keyword("AS")) {
            break;
        }
        i += 1;
        let Some(open) = tokens.get(i).filter(|t| t.kind == TokenKind::LParen) else {
            break;
        };
        let close = matching_paren(tokens, i);
        let body = &tokens[i + 1..close.min(tokens.len())];
        let stop = tokens.get(close).map(|t| t.span.end).unwrap_or(usize::MAX);
        ctes.push(TableExpression {
            table: LocalTable {
                name,
                columns: explicit.unwrap_or_else(|| output_columns(body)),
            },
            start: open.span.start,
            stop,
        });
        i = close + 1;
        if tokens.get(i).is_some_and(|t| t.kind == TokenKind::Comma) {
            i += 1;
        } else {
            break;
        }
    }
    ctes
}

/// Reduce a statement with CTEs to the part the cursor is in.
///
/// Inside a CTE body the body becomes the statement. Past the CTEs, the
/// main query becomes the statement and every CTE is returned as a local
/// table.
pub fn isolate_query_ctes(full_text: &str, text_before_cursor: &str) -> (String, String, Vec<LocalTable>) {
    let ctes = extract_ctes(&SqlLexer::significant(full_text));
    let Some(last) = ctes.last() else {
        return (full_text.to_string(), text_before_cursor.to_string(), Vec::new());
    };

    let position = text_before_cursor.chars().count();
    let mut local = Vec::new();
    for cte in &ctes {
        if cte.start < position && position < cte.stop {
            return (
                char_slice(full_text, cte.start, cte.stop).to_string(),
                char_slice(text_before_cursor, cte.start, position).to_string(),
                local,
            );
        }
        local.push(cte.table.clone());
    }

    let stop = last.stop.min(position);
    let full_len = full_text.chars().count();
    (
        char_slice(full_text, last.stop.min(full_len), full_len).to_string(),
        char_slice(text_before_cursor, stop, position).to_string(),
        local,
    )
}
