//! Built-in SQL vocabulary offered regardless of the connected database.

/// Keywords, each with the keywords that commonly follow it. An empty list
/// means "no narrowing".
pub const KEYWORDS_TREE: &[(&str, &[&str])] = &[
    ("ADD", &["COLUMN", "CONSTRAINT"]),
    ("ALL", &[]),
    ("ALTER", &["COLUMN", "DATABASE", "FUNCTION", "INDEX", "PROCEDURE", "SCHEMA", "TABLE", "VIEW"]),
    ("AND", &[]),
    ("AS", &[]),
    ("ASC", &[]),
    ("BEGIN", &["TRANSACTION"]),
    ("BETWEEN", &[]),
    ("BY", &[]),
    ("CASE", &[]),
    ("CHECK", &[]),
    ("COLUMN", &[]),
    ("COMMIT", &[]),
    ("CONSTRAINT", &[]),
    ("CREATE", &[
        "DATABASE", "FUNCTION", "INDEX", "OR REPLACE", "PROCEDURE", "SCHEMA", "TABLE", "UNIQUE", "VIEW",
    ]),
    ("CROSS JOIN", &[]),
    ("DATABASE", &[]),
    ("DEFAULT", &[]),
    ("DELETE", &["FROM"]),
    ("DESC", &[]),
    ("DESCRIBE", &[]),
    ("DISTINCT", &[]),
    ("DROP", &[
        "COLUMN", "CONSTRAINT", "DATABASE", "FUNCTION", "INDEX", "PROCEDURE", "SCHEMA", "TABLE", "VIEW",
    ]),
    ("ELSE", &[]),
    ("END", &[]),
    ("EXCEPT", &[]),
    ("EXISTS", &[]),
    ("EXPLAIN", &[]),
    ("FETCH", &[]),
    ("FOREIGN KEY", &[]),
    ("FROM", &[]),
    ("FULL OUTER JOIN", &[]),
    ("FUNCTION", &[]),
    ("GRANT", &[]),
    ("GROUP BY", &[]),
    ("HAVING", &[]),
    ("IN", &[]),
    ("INDEX", &[]),
    ("INNER JOIN", &[]),
    ("INSERT", &["INTO"]),
    ("INTERSECT", &[]),
    ("INTO", &[]),
    ("IS", &["NOT", "NULL"]),
    ("JOIN", &[]),
    ("LEFT JOIN", &[]),
    ("LEFT OUTER JOIN", &[]),
    ("LIKE", &[]),
    ("LIMIT", &[]),
    ("NATURAL JOIN", &[]),
    ("NOT", &["BETWEEN", "EXISTS", "IN", "LIKE", "NULL"]),
    ("NULL", &[]),
    ("OFFSET", &[]),
    ("ON", &[]),
    ("OR", &[]),
    ("ORDER BY", &[]),
    ("OUTER", &[]),
    ("OVER", &[]),
    ("PARTITION BY", &[]),
    ("PRIMARY KEY", &[]),
    ("PROCEDURE", &[]),
    ("REFERENCES", &[]),
    ("REPLACE", &[]),
    ("RETURNING", &[]),
    ("REVOKE", &[]),
    ("RIGHT JOIN", &[]),
    ("RIGHT OUTER JOIN", &[]),
    ("ROLLBACK", &[]),
    ("SCHEMA", &[]),
    ("SELECT", &[]),
    ("SET", &[]),
    ("TABLE", &[]),
    ("THEN", &[]),
    ("TOP", &[]),
    ("TRANSACTION", &[]),
    ("TRUNCATE", &["TABLE"]),
    ("UNION", &["ALL"]),
    ("UNIQUE", &[]),
    ("UPDATE", &[]),
    ("USE", &[]),
    ("USING", &[]),
    ("VALUES", &[]),
    ("VIEW", &[]),
    ("WHEN", &[]),
    ("WHERE", &[]),
    ("WITH", &[]),
];

/// Every keyword of [`KEYWORDS_TREE`].
pub fn keywords() -> impl Iterator<Item = &'static str> {
    KEYWORDS_TREE.iter().map(|(k, _)| *k)
}

/// Keywords expected after `last`, or every keyword.
pub fn next_keywords(last: Option<&str>) -> Vec<&'static str> {
    let narrowed = last
        .and_then(|last| KEYWORDS_TREE.iter().find(|(k, _)| k.eq_ignore_ascii_case(last)))
        .map(|(_, next)| *next)
        .filter(|next| !next.is_empty());
    match narrowed {
        Some(next) => next.to_vec(),
        None => keywords().collect(),
    }
}

/// Functions common to most SQL dialects.
pub const FUNCTIONS: &[&str] = &[
    "ABS", "AVG", "CAST", "CEILING", "CHARINDEX", "COALESCE", "CONCAT", "CONVERT", "COUNT",
    "CURRENT_DATE", "CURRENT_TIMESTAMP", "DATEADD", "DATEDIFF", "DENSE_RANK", "FLOOR", "GETDATE",
    "IIF", "ISNULL", "LAG", "LEAD", "LEFT", "LEN", "LENGTH", "LOWER", "LTRIM", "MAX", "MIN", "NOW",
    "NULLIF", "RANK", "REPLACE", "RIGHT", "ROUND", "ROW_NUMBER", "RTRIM", "SUBSTRING", "SUM",
    "TRIM", "UPPER",
];

/// Column types common to most SQL dialects.
pub const DATATYPES: &[&str] = &[
    "BIGINT", "BINARY", "BIT", "BOOLEAN", "CHAR", "DATE", "DATETIME", "DATETIME2", "DECIMAL",
    "DOUBLE", "FLOAT", "INT", "INTEGER", "INTERVAL", "NCHAR", "NUMERIC", "NVARCHAR", "REAL",
    "SMALLINT", "TEXT", "TIME", "TIMESTAMP", "TINYINT", "UNIQUEIDENTIFIER", "VARBINARY", "VARCHAR",
    "XML",
];

/// Shell meta-commands with a short description.
pub const SPECIAL_COMMANDS: &[(&str, &str)] = &[
    ("\\?", "Show the list of meta-commands"),
    ("\\c", "Connect to a data source: \\c [DSN] [USER] [PASSWORD]"),
    ("\\collapse", "Collapse the selected tree node"),
    ("\\disconnect", "Disconnect the active data source"),
    ("\\expand", "Expand the selected tree node"),
    ("\\format", "Set the output format: table, json, json-pretty, compact"),
    ("\\i", "Execute the statements of a file"),
    ("\\n", "Run a named query"),
    ("\\next", "Select the next tree node"),
    ("\\prev", "Select the previous tree node"),
    ("\\preview", "Preview rows of the selected table or view"),
    ("\\q", "Quit"),
    ("\\refresh", "Reload the children of the selected tree node"),
    ("\\reset", "Reset cached completion metadata"),
    ("\\sources", "List data sources"),
    ("\\status", "Show the active session"),
    ("\\tree", "Print the object tree"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_keywords_narrow_the_list() {
        assert_eq!(next_keywords(Some("insert")), vec!["INTO"]);
        assert!(next_keywords(Some("DROP")).contains(&"TABLE"));
        assert_eq!(next_keywords(Some("SELECT")).len(), KEYWORDS_TREE.len());
        assert_eq!(next_keywords(None).len(), KEYWORDS_TREE.len());
    }

    #[test]
    fn test_keyword_tree_is_sorted_and_unique() {
        let names: Vec<_> = keywords().collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }
}
