//! What kind of completion is valid at the cursor.

use super::ctes::LocalTable;
use super::sql_lexer::TokenKind;
use super::statement::{SqlStatement, TableScope};
use super::tables::{TableReference, extract_tables};
use super::words::{WordChars, find_prev_keyword, last_word};

/// Where a function suggestion will be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionUsage {
    /// Called in an expression
    Call,
    /// A table-valued function in FROM
    From,
    /// Named in CREATE/ALTER/DROP FUNCTION
    Signature,
}

/// Whose columns a column suggestion lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnContext {
    Expression,
    /// The target column list of an INSERT
    Insert,
}

/// One kind of completion valid at the cursor, with what its matcher needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Suggestion {
    Blank,
    /// Keywords, narrowed by the keyword that precedes the cursor.
    Keyword {
        last_token: Option<String>,
    },
    Special,
    NamedQuery,
    Path,
    Database,
    /// Schemas of `parent`, or of the current catalog.
    Schema {
        parent: Option<String>,
    },
    Table {
        catalog: Option<String>,
        schema: Option<String>,
        table_refs: Vec<TableReference>,
        local_tables: Vec<LocalTable>,
        /// Named in FROM or JOIN, where the table may take an alias
        from_clause: bool,
    },
    View {
        catalog: Option<String>,
        schema: Option<String>,
        table_refs: Vec<TableReference>,
        from_clause: bool,
    },
    Function {
        catalog: Option<String>,
        schema: Option<String>,
        table_refs: Vec<TableReference>,
        usage: FunctionUsage,
    },
    Column {
        table_refs: Vec<TableReference>,
        local_tables: Vec<LocalTable>,
        /// Only columns shared by the last table and another one
        require_last_table: bool,
        qualifiable: bool,
        context: ColumnContext,
    },
    Alias {
        aliases: Vec<String>,
    },
    Join {
        table_refs: Vec<TableReference>,
        schema: Option<String>,
    },
    JoinCondition {
        table_refs: Vec<TableReference>,
        parent: Option<TableReference>,
    },
    Datatype {
        schema: Option<String>,
    },
}

impl Suggestion {
    fn keyword(last: Option<&str>) -> Self {
        Suggestion::Keyword {
            last_token: last.map(str::to_uppercase),
        }
    }

    fn columns(table_refs: Vec<TableReference>, stmt: &SqlStatement) -> Self {
        Suggestion::Column {
            table_refs,
            local_tables: stmt.local_tables.clone(),
            require_last_table: false,
            qualifiable: false,
            context: ColumnContext::Expression,
        }
    }

    fn table(catalog: Option<String>, schema: Option<String>) -> Self {
        Suggestion::Table {
            catalog,
            schema,
            table_refs: Vec::new(),
            local_tables: Vec::new(),
            from_clause: false,
        }
    }

    fn view(catalog: Option<String>, schema: Option<String>) -> Self {
        Suggestion::View {
            catalog,
            schema,
            table_refs: Vec::new(),
            from_clause: false,
        }
    }

    fn function(schema: Option<String>, usage: FunctionUsage) -> Self {
        Suggestion::Function {
            catalog: None,
            schema,
            table_refs: Vec::new(),
            usage,
        }
    }
}

/// Classify the cursor position in `full_text`.
///
/// Several suggestions may apply at once, e.g. after `FROM` both schemas and
/// tables are valid.
pub fn suggest_type(full_text: &str, text_before_cursor: &str) -> Vec<Suggestion> {
    if full_text.starts_with("\\i ") {
        return vec![Suggestion::Path];
    }

    let mut stmt = SqlStatement::new(full_text, text_before_cursor);

    if stmt.text_before_cursor.trim_start().starts_with('\\') {
        return suggest_special(text_before_cursor);
    }

    // Inside a WHERE clause the keyword that opened the current condition decides.
    let token = if stmt.in_where_clause() {
        stmt.reduce_to_prev_keyword(0)
    } else {
        stmt.last_token().map(|t| t.kind.clone())
    };
    suggest_based_on_last_token(token, &mut stmt)
}

fn suggest_special(text: &str) -> Vec<Suggestion> {
    let text = text.trim_start();
    let Some((cmd, _arg)) = text.split_once(char::is_whitespace) else {
        // Still typing the command itself
        return vec![Suggestion::Special];
    };
    match cmd {
        "\\c" | "\\connect" => vec![Suggestion::Database],
        "\\n" => vec![Suggestion::NamedQuery],
        "\\i" => vec![Suggestion::Path],
        _ => Vec::new(),
    }
}

/// Does `id` name the table `table` (by alias, name, or schema.name)?
fn identifies(id: &str, table: &TableReference) -> bool {
    table.alias.as_deref() == Some(id)
        || table.name == id
        || table
            .schema
            .as_ref()
            .is_some_and(|schema| format!("{schema}.{}", table.name) == id)
}

/// Join conditions only make sense right after ON, AND or OR.
fn allow_join_condition(stmt: &SqlStatement) -> bool {
    matches!(
        stmt.typed_last_token(),
        Some(TokenKind::Keyword(k)) if matches!(k.as_str(), "ON" | "AND" | "OR")
    )
}

/// Joins only make sense right after a JOIN keyword.
fn allow_join(stmt: &SqlStatement) -> bool {
    matches!(
        stmt.typed_last_token(),
        Some(TokenKind::Keyword(k)) if k.ends_with("JOIN") && k != "CROSS JOIN" && k != "NATURAL JOIN"
    )
}

fn suggest_expression(token_v: &str, stmt: &SqlStatement) -> Vec<Suggestion> {
    let (grandparent, parent) = stmt.get_identifier_parents();
    let tables = stmt.get_tables(TableScope::Full);

    if let Some(parent) = parent {
        let scoped: Vec<_> = tables.into_iter().filter(|t| identifies(&parent, t)).collect();
        return vec![
            Suggestion::columns(scoped, stmt),
            Suggestion::table(grandparent.clone(), Some(parent.clone())),
            Suggestion::view(grandparent, Some(parent.clone())),
            Suggestion::function(Some(parent), FunctionUsage::Call),
        ];
    }

    vec![
        Suggestion::Column {
            table_refs: tables,
            local_tables: stmt.local_tables.clone(),
            require_last_table: false,
            qualifiable: true,
            context: ColumnContext::Expression,
        },
        Suggestion::function(None, FunctionUsage::Call),
        Suggestion::keyword(Some(token_v)),
    ]
}

fn suggest_after_paren(stmt: &SqlStatement) -> Vec<Suggestion> {
    let tokens = stmt.tokens();
    let before_paren = tokens.len().checked_sub(2).map(|i| tokens[i].kind.clone());
    let before_that = tokens.len().checked_sub(3).map(|i| tokens[i].kind.clone());

    if stmt.in_where_clause() {
        // "WHERE EXISTS (" starts a subquery; anything else is an expression.
        if before_paren.as_ref().is_some_and(|k| k.is_keyword("EXISTS")) {
            return vec![Suggestion::keyword(None)];
        }
        return suggest_expression("where", stmt);
    }

    if before_paren.as_ref().is_some_and(|k| k.is_keyword("USING")) {
        // tbl1 JOIN tbl2 USING (col1, col2)
        return vec![Suggestion::Column {
            table_refs: stmt.get_tables(TableScope::Before),
            local_tables: stmt.local_tables.clone(),
            require_last_table: true,
            qualifiable: false,
            context: ColumnContext::Expression,
        }];
    }

    let starts_with_select = stmt.tokens().first().is_some_and(|t| t.kind.is_keyword("SELECT"));
    if starts_with_select
        && last_word(&stmt.text_before_cursor, WordChars::AllPunctuations).starts_with('(')
    {
        // A parenthesis after whitespace opens a sub-select.
        return vec![Suggestion::keyword(None)];
    }

    if before_that.is_some_and(|k| k.is_keyword("INTO")) {
        return vec![Suggestion::Column {
            table_refs: stmt.get_tables(TableScope::Insert),
            local_tables: Vec::new(),
            require_last_table: false,
            qualifiable: false,
            context: ColumnContext::Insert,
        }];
    }

    // Probably a function argument list
    suggest_expression("(", stmt)
}

fn suggest_table_clause(keyword: &str, stmt: &SqlStatement) -> Vec<Suggestion> {
    let (grandparent, parent) = stmt.get_identifier_parents();
    let tables = extract_tables(&stmt.text_before_cursor);
    let is_join = keyword.ends_with("join");

    let mut suggest = Vec::new();
    if parent.is_none() {
        suggest.push(Suggestion::Database);
    }
    if grandparent.is_none() {
        suggest.push(Suggestion::Schema {
            parent: parent.clone(),
        });
    }

    if keyword == "from" || is_join {
        suggest.push(Suggestion::Table {
            catalog: grandparent.clone(),
            schema: parent.clone(),
            table_refs: tables.clone(),
            local_tables: stmt.local_tables.clone(),
            from_clause: true,
        });
        suggest.push(Suggestion::View {
            catalog: grandparent.clone(),
            schema: parent.clone(),
            table_refs: tables.clone(),
            from_clause: true,
        });
        suggest.push(Suggestion::Function {
            catalog: grandparent,
            schema: parent.clone(),
            table_refs: tables,
            usage: FunctionUsage::From,
        });
    } else if keyword == "truncate" {
        suggest.push(Suggestion::table(grandparent, parent.clone()));
    } else {
        suggest.push(Suggestion::table(grandparent.clone(), parent.clone()));
        suggest.push(Suggestion::view(grandparent, parent.clone()));
    }

    if is_join && allow_join(stmt) {
        suggest.push(Suggestion::Join {
            table_refs: stmt.get_tables(TableScope::Before),
            schema: parent,
        });
    }
    suggest
}

fn suggest_after_on(stmt: &SqlStatement) -> Vec<Suggestion> {
    let tables = stmt.get_tables(TableScope::Before);
    if let Some(parent) = stmt.identifier_parent() {
        // "ON parent.<cursor>": parent is a table alias or a schema
        let scoped: Vec<_> = tables.iter().filter(|t| identifies(&parent, t)).cloned().collect();
        let last_scoped = scoped.last().cloned();
        let mut suggest = vec![
            Suggestion::columns(scoped, stmt),
            Suggestion::table(None, Some(parent.clone())),
            Suggestion::view(None, Some(parent.clone())),
            Suggestion::function(Some(parent), FunctionUsage::Call),
        ];
        if last_scoped.is_some() && allow_join_condition(stmt) {
            suggest.push(Suggestion::JoinCondition {
                table_refs: tables,
                parent: last_scoped,
            });
        }
        return suggest;
    }

    // "ON <cursor>": offer the aliases (or names) in scope
    let aliases = tables.iter().map(TableReference::reference).collect();
    if allow_join_condition(stmt) {
        vec![
            Suggestion::Alias { aliases },
            Suggestion::JoinCondition {
                table_refs: tables,
                parent: None,
            },
        ]
    } else {
        vec![Suggestion::Alias { aliases }]
    }
}

fn suggest_based_on_last_token(token: Option<TokenKind>, stmt: &mut SqlStatement) -> Vec<Suggestion> {
    let Some(token) = token else {
        return vec![Suggestion::keyword(None), Suggestion::Special];
    };

    let keyword = match &token {
        TokenKind::Keyword(k) => k.to_lowercase(),
        TokenKind::LParen => return suggest_after_paren(stmt),
        TokenKind::Comma
        | TokenKind::Eq
        | TokenKind::Ne
        | TokenKind::Lt
        | TokenKind::Gt
        | TokenKind::Le
        | TokenKind::Ge => {
            return match stmt.reduce_to_prev_keyword(0) {
                Some(prev) => suggest_based_on_last_token(Some(prev), stmt),
                None => Vec::new(),
            };
        }
        TokenKind::DoubleColon => return suggest_datatype(stmt),
        TokenKind::Ident(_) | TokenKind::QuotedIdent(_) => {
            // An identifier inside a parenthesised list is followed by a type,
            // e.g. CREATE TABLE foo (id <cursor>; elsewhere by an alias or keyword.
            let prev = find_prev_keyword(&stmt.text_before_cursor, 0);
            if matches!(prev, Some((TokenKind::LParen, _))) {
                return suggest_datatype(stmt);
            }
            return vec![Suggestion::keyword(None)];
        }
        _ => return vec![Suggestion::keyword(None)],
    };

    match keyword.as_str() {
        "set" => vec![Suggestion::columns(stmt.get_tables(TableScope::Full), stmt)],
        "select" | "where" | "having" | "order by" | "group by" | "distinct" => {
            suggest_expression(&keyword, stmt)
        }
        "as" => Vec::new(),
        k if k.ends_with("join")
            || matches!(k, "copy" | "from" | "update" | "into" | "describe" | "truncate") =>
        {
            suggest_table_clause(k, stmt)
        }
        "function" => {
            let tokens = stmt.tokens();
            let prev = tokens.len().checked_sub(2).map(|i| tokens[i].kind.value());
            if matches!(prev.as_deref(), Some("drop" | "alter" | "create" | "replace")) {
                let parent = stmt.identifier_parent();
                let mut suggest = Vec::new();
                if parent.is_none() {
                    suggest.push(Suggestion::Schema { parent: None });
                }
                suggest.push(Suggestion::function(parent, FunctionUsage::Signature));
                suggest
            } else {
                Vec::new()
            }
        }
        "table" | "view" => {
            let (grandparent, parent) = stmt.get_identifier_parents();
            let relation = if keyword == "table" {
                Suggestion::table(grandparent, parent.clone())
            } else {
                Suggestion::view(grandparent, parent.clone())
            };
            if parent.is_some() {
                vec![relation]
            } else {
                vec![Suggestion::Schema { parent: None }, relation]
            }
        }
        "column" => vec![Suggestion::columns(stmt.get_tables(TableScope::Full), stmt)],
        "on" => suggest_after_on(stmt),
        "use" | "database" => vec![Suggestion::Database],
        "schema" => vec![Suggestion::Schema { parent: None }],
        "type" => suggest_datatype(stmt),
        "and" | "or" => match stmt.reduce_to_prev_keyword(0) {
            Some(prev) => suggest_based_on_last_token(Some(prev), stmt),
            None => Vec::new(),
        },
        "alter" | "create" | "drop" => vec![Suggestion::keyword(Some(&keyword))],
        _ => {
            // Unhandled keyword: walk back to one that is handled
            match stmt.reduce_to_prev_keyword(1) {
                Some(prev) => suggest_based_on_last_token(Some(prev), stmt),
                None => vec![Suggestion::keyword(Some(&keyword))],
            }
        }
    }
}

fn suggest_datatype(stmt: &SqlStatement) -> Vec<Suggestion> {
    let schema = stmt.identifier_parent();
    let mut suggest = vec![
        Suggestion::Datatype { schema: schema.clone() },
        Suggestion::table(None, schema.clone()),
    ];
    if schema.is_none() {
        suggest.push(Suggestion::Schema { parent: None });
    }
    suggest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggest(text: &str) -> Vec<Suggestion> {
        suggest_type(text, text)
    }

    fn table_refs(suggestions: &[Suggestion]) -> Vec<String> {
        suggestions
            .iter()
            .find_map(|s| match s {
                Suggestion::Column { table_refs, .. } => {
                    Some(table_refs.iter().map(TableReference::reference).collect())
                }
                _ => None,
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_empty_input_offers_keywords_and_commands() {
        assert_eq!(suggest(""), vec![Suggestion::keyword(None), Suggestion::Special]);
    }

    #[test]
    fn test_select_offers_columns_functions_keywords() {
        let suggestions = suggest_type("SELECT  FROM orders o", "SELECT ");
        assert!(matches!(&suggestions[0], Suggestion::Column { qualifiable: true, .. }));
        assert_eq!(table_refs(&suggestions), vec!["o"]);
        assert!(matches!(&suggestions[1], Suggestion::Function { schema: None, .. }));
        assert_eq!(suggestions[2], Suggestion::keyword(Some("select")));
    }

    #[test]
    fn test_from_offers_databases_schemas_and_relations() {
        let suggestions = suggest("SELECT * FROM ");
        assert_eq!(suggestions[0], Suggestion::Database);
        assert_eq!(suggestions[1], Suggestion::Schema { parent: None });
        assert!(matches!(&suggestions[2], Suggestion::Table { schema: None, .. }));
        assert!(matches!(&suggestions[3], Suggestion::View { .. }));
        assert!(matches!(&suggestions[4], Suggestion::Function { usage: FunctionUsage::From, .. }));
    }

    #[test]
    fn test_qualified_from() {
        let suggestions = suggest("SELECT * FROM shop.");
        assert_eq!(
            suggestions[0],
            Suggestion::Schema {
                parent: Some("shop".into())
            }
        );
        assert!(matches!(
            &suggestions[1],
            Suggestion::Table { catalog: None, schema: Some(s), .. } if s == "shop"
        ));

        let suggestions = suggest("SELECT * FROM shop.public.ord");
        assert!(matches!(
            &suggestions[0],
            Suggestion::Table { catalog: Some(c), schema: Some(s), .. } if c == "shop" && s == "public"
        ));
    }

    #[test]
    fn test_join_offers_join_clauses() {
        let suggestions = suggest("SELECT * FROM orders o JOIN ");
        assert!(suggestions.iter().any(|s| matches!(
            s,
            Suggestion::Join { table_refs, .. } if table_refs.len() == 1
        )));
        let cross = suggest("SELECT * FROM orders o CROSS JOIN ");
        assert!(!cross.iter().any(|s| matches!(s, Suggestion::Join { .. })));
    }

    #[test]
    fn test_on_offers_aliases_and_conditions() {
        let suggestions = suggest("SELECT * FROM orders o JOIN customers c ON ");
        assert_eq!(
            suggestions[0],
            Suggestion::Alias {
                aliases: vec!["o".into(), "c".into()]
            }
        );
        assert!(matches!(&suggestions[1], Suggestion::JoinCondition { parent: None, .. }));

        let suggestions = suggest("SELECT * FROM orders o JOIN customers c ON c.");
        assert_eq!(table_refs(&suggestions), vec!["c"]);
        assert!(suggestions.iter().any(|s| matches!(
            s,
            Suggestion::JoinCondition { parent: Some(p), .. } if p.reference() == "c"
        )));
    }

    #[test]
    fn test_where_clause_suggests_columns() {
        for text in [
            "SELECT * FROM orders WHERE ",
            "SELECT * FROM orders WHERE id = 1 AND ",
            "SELECT * FROM orders WHERE id > ",
            "SELECT * FROM orders WHERE total IN (",
        ] {
            let suggestions = suggest(text);
            assert_eq!(table_refs(&suggestions), vec!["orders"], "input {text:?}");
        }
        assert_eq!(
            suggest("SELECT * FROM orders WHERE EXISTS ("),
            vec![Suggestion::keyword(None)]
        );
    }

    #[test]
    fn test_qualified_column() {
        let suggestions = suggest_type("SELECT o. FROM orders o, customers c", "SELECT o.");
        assert_eq!(table_refs(&suggestions), vec!["o"]);
        assert!(matches!(&suggestions[1], Suggestion::Table { schema: Some(s), .. } if s == "o"));
    }

    #[test]
    fn test_insert_column_list() {
        let suggestions = suggest("INSERT INTO orders (");
        assert!(matches!(
            &suggestions[0],
            Suggestion::Column { context: ColumnContext::Insert, table_refs, .. } if table_refs[0].name == "orders"
        ));
    }

    #[test]
    fn test_using_requires_last_table() {
        let suggestions = suggest("SELECT * FROM orders JOIN customers USING (");
        assert!(matches!(&suggestions[0], Suggestion::Column { require_last_table: true, .. }));
    }

    #[test]
    fn test_keyword_contexts() {
        assert!(suggest("SELECT id AS ").is_empty());
        assert_eq!(suggest("DROP "), vec![Suggestion::keyword(Some("drop"))]);
        assert_eq!(suggest("USE "), vec![Suggestion::Database]);
        assert_eq!(suggest("SELECT * FROM orders o "), vec![Suggestion::keyword(None)]);
        assert!(matches!(
            suggest("ALTER TABLE ").as_slice(),
            [Suggestion::Schema { parent: None }, Suggestion::Table { .. }]
        ));
        assert!(matches!(suggest("SELECT x::").first(), Some(Suggestion::Datatype { .. })));
    }

    #[test]
    fn test_order_by_walks_back_to_columns() {
        let suggestions = suggest("SELECT * FROM orders ORDER BY ");
        assert_eq!(table_refs(&suggestions), vec!["orders"]);
        let suggestions = suggest("SELECT * FROM orders ORDER BY id, ");
        assert_eq!(table_refs(&suggestions), vec!["orders"]);
    }

    #[test]
    fn test_special_commands() {
        assert_eq!(suggest("\\"), vec![Suggestion::Special]);
        assert_eq!(suggest("\\pre"), vec![Suggestion::Special]);
        assert_eq!(suggest("\\c "), vec![Suggestion::Database]);
        assert_eq!(suggest("\\n "), vec![Suggestion::NamedQuery]);
        assert_eq!(suggest("\\i ~/q"), vec![Suggestion::Path]);
    }

    #[test]
    fn test_cte_columns_are_local_tables() {
        let text = "WITH big AS (SELECT id, total FROM orders) SELECT  FROM big";
        let suggestions = suggest_type(text, "WITH big AS (SELECT id, total FROM orders) SELECT ");
        match &suggestions[0] {
            Suggestion::Column { local_tables, table_refs, .. } => {
                assert_eq!(local_tables[0].columns, vec!["id", "total"]);
                assert_eq!(table_refs[0].name, "big");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
