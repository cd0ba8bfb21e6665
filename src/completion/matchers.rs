//! One matcher per suggestion kind.
//!
//! Matchers turn a [`Suggestion`] into candidates, reading database objects
//! through the active session, and rank them with
//! [`CompletionEngine::find_matches`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use super::CompletionEngine;
use super::candidate::{Candidate, Completion, Match};
use super::literals;
use super::matcher::{MatchMode, Priority};
use crate::config::{ColumnOrder, KeywordCasing, QualifyColumns};
use crate::connection::IdentifierCodec;
use crate::metadata::{ColumnMetadata, ObjectType};
use crate::parser::{ColumnContext, FunctionUsage, LocalTable, Suggestion, TableReference, WordChars, last_word};

/// Defaults the database fills in by itself; `INSERT INTO t (*` leaves
/// such columns out.
static INSERT_SKIP_DEFAULTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"^now\(\)$", r"^nextval\("]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Tables in scope with their columns, in statement order.
type ScopedColumns = Vec<(TableReference, Vec<ColumnMetadata>)>;

/// `"name"` for a quoted reference, `"lower"` otherwise, so references
/// compare the way the database resolves them.
fn normalize_ref(reference: &str) -> String {
    if reference.starts_with('"') {
        reference.to_string()
    } else {
        format!("\"{}\"", reference.to_lowercase())
    }
}

/// Alias made of the capitals of a name (`OrderItems` gives `OI`), or of
/// its first letter and the letters after underscores (`order_items` gives
/// `oi`).
pub fn generate_alias(table: &str) -> String {
    let capitals: String = table.chars().filter(|c| c.is_uppercase()).collect();
    if !capitals.is_empty() {
        return capitals;
    }
    let mut alias = String::new();
    let mut prev = '_';
    for c in table.chars() {
        if prev == '_' && c != '_' {
            alias.push(c);
        }
        prev = c;
    }
    alias
}

/// A column as written in SQL: escaped schema, table and column names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ColumnKey {
    schema: String,
    table: String,
    column: String,
}

impl ColumnKey {
    fn new(schema: &str, table: &str, column: &str) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    fn escaped(codec: &IdentifierCodec, schema: &str, table: &str, column: &str) -> Self {
        Self {
            schema: codec.escape_name(schema),
            table: codec.escape_name(table),
            column: codec.escape_name(column),
        }
    }
}

fn add_scoped(scoped: &mut ScopedColumns, table: TableReference, columns: Vec<ColumnMetadata>) {
    match scoped.iter_mut().find(|(t, _)| *t == table) {
        Some((_, existing)) => existing.extend(columns),
        None => scoped.push((table, columns)),
    }
}

impl CompletionEngine {
    pub(super) fn matches_for(&self, suggestion: &Suggestion, word: &str) -> Vec<Match> {
        match suggestion {
            Suggestion::Blank => Vec::new(),
            Suggestion::Keyword { last_token } => self.keyword_matches(last_token.as_deref(), word),
            Suggestion::Special => self.special_matches(word),
            Suggestion::NamedQuery => self.named_query_matches(word),
            Suggestion::Path => self.path_matches(word),
            Suggestion::Database => self.database_matches(word),
            Suggestion::Schema { parent } => self.schema_matches(parent.as_deref(), word),
            Suggestion::Table {
                catalog,
                schema,
                table_refs,
                local_tables,
                from_clause,
            } => {
                let alias = *from_clause && self.settings.generate_aliases;
                let mut local: &[LocalTable] = local_tables;
                if catalog.is_some() || schema.is_some() {
                    local = &[];
                }
                self.object_matches(
                    ObjectType::Table,
                    catalog.as_deref(),
                    schema.as_deref(),
                    table_refs,
                    local,
                    alias,
                    word,
                )
            }
            Suggestion::View {
                catalog,
                schema,
                table_refs,
                from_clause,
            } => {
                let alias = *from_clause && self.settings.generate_aliases;
                self.object_matches(
                    ObjectType::View,
                    catalog.as_deref(),
                    schema.as_deref(),
                    table_refs,
                    &[],
                    alias,
                    word,
                )
            }
            Suggestion::Function {
                catalog,
                schema,
                table_refs,
                usage,
            } => {
                let alias = *usage == FunctionUsage::From && self.settings.generate_aliases;
                let mut matches = self.object_matches(
                    ObjectType::Function,
                    catalog.as_deref(),
                    schema.as_deref(),
                    table_refs,
                    &[],
                    alias,
                    word,
                );
                if schema.is_none() && *usage == FunctionUsage::Call {
                    matches.extend(self.find_matches(
                        word,
                        literals::FUNCTIONS.iter().copied(),
                        MatchMode::Strict,
                        "function",
                    ));
                }
                matches
            }
            Suggestion::Column {
                table_refs,
                local_tables,
                require_last_table,
                qualifiable,
                context,
            } => self.column_matches(
                table_refs,
                local_tables,
                *require_last_table,
                *qualifiable,
                *context,
                word,
            ),
            Suggestion::Alias { aliases } => {
                self.find_matches(word, aliases.iter().cloned(), MatchMode::Fuzzy, "table alias")
            }
            Suggestion::Join { table_refs, schema } => self.join_matches(table_refs, schema.as_deref(), word),
            Suggestion::JoinCondition { table_refs, parent } => {
                self.join_condition_matches(table_refs, parent.as_ref(), word)
            }
            Suggestion::Datatype { schema } => {
                let mut matches =
                    self.object_matches(ObjectType::Datatype, None, schema.as_deref(), &[], &[], false, word);
                if schema.is_none() {
                    matches.extend(self.find_matches(
                        word,
                        literals::DATATYPES.iter().copied(),
                        MatchMode::Strict,
                        "datatype",
                    ));
                }
                matches
            }
        }
    }

    /// A unique alias for `table` among `table_refs`, numbered from 2 when taken.
    fn alias(&self, table: &str, table_refs: &[TableReference]) -> String {
        let mut table = self.case(table);
        let taken: HashSet<String> = table_refs.iter().map(|t| normalize_ref(&t.reference())).collect();
        if self.settings.generate_aliases {
            table = generate_alias(&self.codec().unescape_name(&table));
        }
        if !taken.contains(&normalize_ref(&table)) {
            return table;
        }

        let quoted = table.starts_with('"');
        let stem = table.trim_matches('"');
        let mut n = 2;
        loop {
            let candidate = if quoted {
                format!("\"{stem}{n}\"")
            } else {
                format!("{stem}{n}")
            };
            if !taken.contains(&normalize_ref(&candidate)) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Columns of the tables in scope. Statement-local tables shadow
    /// database tables of the same unqualified name.
    fn populate_scoped_cols(&self, tables: &[TableReference], local_tables: &[LocalTable]) -> ScopedColumns {
        let session = self.session();
        let codec = self.codec();
        let mut scoped = ScopedColumns::new();

        for table in tables {
            if table.catalog.is_none() && table.schema.is_none() {
                let name = normalize_ref(&table.name);
                if let Some(local) = local_tables.iter().find(|l| normalize_ref(&l.name) == name) {
                    if !table.is_function {
                        let columns = local.columns.iter().map(|c| ColumnMetadata::new(c.as_str(), "")).collect();
                        add_scoped(&mut scoped, table.clone(), columns);
                    }
                    continue;
                }
            }
            if table.is_function {
                continue;
            }
            let Some(session) = &session else {
                continue;
            };

            let mut catalog = match &table.catalog {
                Some(c) => codec.unescape_name(c),
                None => session.current_catalog(),
            };
            let mut schema = table.schema.as_deref().map(|s| codec.unescape_name(s)).unwrap_or_default();
            if catalog.is_empty() {
                catalog = std::mem::take(&mut schema);
            }
            let catalog = codec.escape_name(&catalog);
            let schema = codec.escape_name(&schema);
            let name = codec.escape_name(&codec.unescape_name(&table.name));

            let columns = session.columns(&catalog, &schema, &name, ObjectType::Table);
            if !columns.is_empty() {
                let reference = TableReference {
                    catalog: Some(catalog),
                    schema: Some(schema),
                    name,
                    alias: table.alias.clone(),
                    is_function: false,
                };
                add_scoped(&mut scoped, reference, columns);
            }
        }
        scoped
    }

    /// Names of objects of one type plus the escaped schema they were read from.
    fn populate_objects(&self, catalog: Option<&str>, schema: Option<&str>, otype: ObjectType) -> (String, Vec<String>) {
        let Some(session) = self.session() else {
            return (String::new(), Vec::new());
        };
        let codec = session.codec();
        let (catalog, schema) = match (catalog, schema) {
            (None, None) => (String::new(), String::new()),
            (None, Some(schema)) => {
                let current = session.current_catalog();
                if current.is_empty() {
                    (codec.unescape_name(schema), String::new())
                } else {
                    (current, codec.unescape_name(schema))
                }
            }
            (Some(catalog), schema) => (
                codec.unescape_name(catalog),
                schema.map(|s| codec.unescape_name(s)).unwrap_or_default(),
            ),
        };
        let catalog = codec.escape_name(&catalog);
        let schema = codec.escape_name(&schema);
        let names = session.objects(&catalog, &schema, otype);
        (schema, names)
    }

    #[allow(clippy::too_many_arguments)]
    fn object_matches(
        &self,
        otype: ObjectType,
        catalog: Option<&str>,
        schema: Option<&str>,
        table_refs: &[TableReference],
        local_tables: &[LocalTable],
        alias: bool,
        word: &str,
    ) -> Vec<Match> {
        let (schema, mut names) = self.populate_objects(catalog, schema, otype);
        names.extend(local_tables.iter().map(|t| t.name.clone()));

        let candidates: Vec<Candidate> = names
            .iter()
            .map(|name| {
                let cased = self.case(name);
                let item = if alias {
                    format!("{cased} {}", self.alias(&cased, table_refs))
                } else {
                    cased.clone()
                };
                Candidate::new(item)
                    .synonyms([cased.clone(), generate_alias(&cased)])
                    .prio2(if schema.is_empty() { 1 } else { 0 })
            })
            .collect();
        self.find_matches(word, candidates, MatchMode::Fuzzy, otype.as_str())
    }

    fn column_matches(
        &self,
        table_refs: &[TableReference],
        local_tables: &[LocalTable],
        require_last_table: bool,
        qualifiable: bool,
        context: ColumnContext,
        word: &str,
    ) -> Vec<Match> {
        let mut scoped = self.populate_scoped_cols(table_refs, local_tables);
        let qualify = qualifiable
            && match self.settings.qualify_columns {
                QualifyColumns::Always => true,
                QualifyColumns::Never => false,
                QualifyColumns::IfMoreThanOneTable => table_refs.len() > 1,
            };
        let qualified = |name: &str, reference: &str| {
            if qualify {
                format!("{reference}.{}", self.case(name))
            } else {
                self.case(name)
            }
        };

        if require_last_table && let Some(last) = table_refs.last() {
            // USING (...) lists columns of the last table that another table shares
            let last = last.reference();
            let shared: HashSet<String> = scoped
                .iter()
                .filter(|(t, _)| t.reference() != last)
                .flat_map(|(_, columns)| columns.iter().map(|c| c.name.clone()))
                .collect();
            scoped = scoped
                .into_iter()
                .filter(|(t, _)| t.reference() == last)
                .map(|(t, columns)| {
                    let columns = columns.into_iter().filter(|c| shared.contains(&c.name)).collect();
                    (t, columns)
                })
                .collect();
        }

        if last_word(word, WordChars::MostPunctuations) == "*" {
            if context == ColumnContext::Insert {
                for (_, columns) in &mut scoped {
                    columns.retain(|c| {
                        !c.default
                            .as_deref()
                            .is_some_and(|d| INSERT_SKIP_DEFAULTS.iter().any(|p| p.is_match(d)))
                    });
                }
            }
            if self.settings.asterisk_column_order == ColumnOrder::Alphabetic {
                for (_, columns) in &mut scoped {
                    columns.sort_by(|a, b| a.name.cmp(&b.name));
                }
            }

            let list = if word != "*" && table_refs.len() == 1 && word.ends_with(".*") {
                // "x.*": the first column reuses the typed "x."
                let separator = format!(", {}", &word[..word.len() - 1]);
                scoped
                    .iter()
                    .flat_map(|(_, columns)| columns.iter().map(|c| self.case(&c.name)))
                    .collect::<Vec<_>>()
                    .join(&separator)
            } else {
                scoped
                    .iter()
                    .flat_map(|(t, columns)| {
                        let reference = t.reference();
                        columns.iter().map(move |c| qualified(&c.name, &reference))
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            if list.is_empty() {
                return Vec::new();
            }
            return vec![Match {
                completion: Completion {
                    text: list,
                    start_position: -1,
                    display: "*".to_string(),
                    display_meta: Some("columns".to_string()),
                },
                priority: Priority::top(),
            }];
        }

        let candidates: Vec<Candidate> = scoped
            .iter()
            .flat_map(|(t, columns)| {
                let reference = t.reference();
                columns.iter().map(move |c| {
                    Candidate::new(qualified(&c.name, &reference))
                        .meta("column")
                        .synonyms([c.name.clone(), generate_alias(&self.case(&c.name))])
                })
            })
            .collect();
        self.find_matches(word, candidates, MatchMode::Fuzzy, "column")
    }

    /// Whole join clauses along the foreign keys of the tables in scope.
    fn join_matches(&self, table_refs: &[TableReference], schema: Option<&str>, word: &str) -> Vec<Match> {
        let scoped = self.populate_scoped_cols(table_refs, &[]);
        let codec = self.codec();
        let refs: HashSet<String> = table_refs.iter().map(|t| normalize_ref(&t.reference())).collect();
        let ref_prio: HashMap<String, i64> = table_refs
            .iter()
            .enumerate()
            .map(|(i, t)| (normalize_ref(&t.reference()), i as i64))
            .collect();
        let in_scope: Vec<(String, String)> = scoped
            .iter()
            .map(|(t, _)| (t.schema.clone().unwrap_or_default(), t.name.clone()))
            .collect();
        let earlier = &in_scope[..in_scope.len().saturating_sub(1)];

        let mut joins = Vec::new();
        for (rtbl, rcols) in &scoped {
            let rschema = rtbl.schema.clone().unwrap_or_default();
            let rref = rtbl.reference();
            for rcol in rcols {
                let right = ColumnKey::new(&rschema, &rtbl.name, &rcol.name);
                for fk in &rcol.foreign_keys {
                    let parent = ColumnKey::escaped(&codec, &fk.parent_schema, &fk.parent_table, &fk.parent_column);
                    let child = ColumnKey::escaped(&codec, &fk.child_schema, &fk.child_table, &fk.child_column);
                    let left = if parent == right { child } else { parent };
                    if let Some(schema) = schema
                        && !codec
                            .unescape_name(schema)
                            .eq_ignore_ascii_case(&codec.unescape_name(&left.schema))
                    {
                        continue;
                    }

                    let join = if self.settings.generate_aliases || refs.contains(&normalize_ref(&left.table)) {
                        let lref = self.alias(&left.table, table_refs);
                        format!("{} {lref} ON {lref}.{} = {rref}.{}", left.table, left.column, right.column)
                    } else {
                        format!("{0} ON {0}.{1} = {rref}.{2}", left.table, left.column, right.column)
                    };
                    let alias = generate_alias(&self.case(&left.table));
                    let synonyms = [
                        join.clone(),
                        format!("{alias} ON {alias}.{} = {rref}.{}", left.column, right.column),
                    ];

                    // Qualify only to tell the table apart from a namesake in scope
                    let namesake = in_scope
                        .iter()
                        .any(|(s, n)| *n == left.table && *s != left.schema);
                    let join = if schema.is_none() && namesake && !left.schema.is_empty() {
                        format!("{}.{join}", left.schema)
                    } else {
                        join
                    };

                    let joined_before = earlier
                        .iter()
                        .any(|(s, n)| *s == left.schema && *n == left.table);
                    let prio = ref_prio.get(&normalize_ref(&rref)).copied().unwrap_or(0) * 2
                        + if joined_before { 0 } else { 1 };
                    joins.push(Candidate::new(join).prio(prio).meta("join").synonyms(synonyms));
                }
            }
        }
        self.find_matches(word, joins, MatchMode::Fuzzy, "join")
    }

    /// `ON` conditions between the last (or the qualifying) table and the
    /// others: foreign keys first, then columns sharing name and type.
    fn join_condition_matches(
        &self,
        table_refs: &[TableReference],
        parent: Option<&TableReference>,
        word: &str,
    ) -> Vec<Match> {
        let scoped = self.populate_scoped_cols(table_refs, &[]);
        let codec = self.codec();
        let Some(lref) = parent.or(table_refs.last()).map(TableReference::reference) else {
            return Vec::new();
        };
        let Some((ltbl, lcols)) = scoped.iter().rev().find(|(t, _)| t.reference() == lref) else {
            return Vec::new();
        };

        let ref_prio: HashMap<String, i64> = table_refs
            .iter()
            .enumerate()
            .map(|(i, t)| (t.reference(), i as i64))
            .collect();

        let mut by_column: HashMap<ColumnKey, Vec<&TableReference>> = HashMap::new();
        let mut by_name_type: HashMap<(String, String), Vec<&TableReference>> = HashMap::new();
        for (t, columns) in &scoped {
            let schema = t.schema.clone().unwrap_or_default();
            for c in columns {
                if t.reference() != lref {
                    by_column.entry(ColumnKey::new(&schema, &t.name, &c.name)).or_default().push(t);
                }
                by_name_type
                    .entry((c.name.clone(), c.type_name.to_lowercase()))
                    .or_default()
                    .push(t);
            }
        }

        let prefix = if parent.is_some() {
            String::new()
        } else {
            format!("{}.", ltbl.reference())
        };
        let mut seen = HashSet::new();
        let mut conditions = Vec::new();
        let mut add = |lcol: &str, rcol: &str, rref: &str, prio: i64, meta: &str| {
            let condition = format!("{prefix}{} = {rref}.{}", self.case(lcol), self.case(rcol));
            if seen.insert(condition.clone()) {
                let prio = prio + ref_prio.get(rref).copied().unwrap_or(0);
                conditions.push(Candidate::new(condition).prio(prio).meta(meta));
            }
        };

        let lschema = ltbl.schema.clone().unwrap_or_default();
        for lcol in lcols {
            let left = ColumnKey::new(&lschema, &ltbl.name, &lcol.name);
            for fk in &lcol.foreign_keys {
                let parent_col = ColumnKey::escaped(&codec, &fk.parent_schema, &fk.parent_table, &fk.parent_column);
                let child_col = ColumnKey::escaped(&codec, &fk.child_schema, &fk.child_table, &fk.child_column);
                let right = if left == child_col { parent_col } else { child_col };
                for rtbl in by_column.get(&right).into_iter().flatten() {
                    add(&left.column, &right.column, &rtbl.reference(), 2000, "fk join");
                }
            }
        }

        for lcol in lcols {
            let key = (lcol.name.clone(), lcol.type_name.to_lowercase());
            let prio = if matches!(key.1.as_str(), "integer" | "bigint" | "smallint") {
                1000
            } else {
                0
            };
            for rtbl in by_name_type.get(&key).into_iter().flatten() {
                if rtbl.reference() != ltbl.reference() {
                    add(&lcol.name, &lcol.name, &rtbl.reference(), prio, "name join");
                }
            }
        }

        self.find_matches(word, conditions, MatchMode::Fuzzy, "join")
    }

    fn schema_matches(&self, parent: Option<&str>, word: &str) -> Vec<Match> {
        let Some(session) = self.session() else {
            return Vec::new();
        };
        let codec = session.codec();
        let catalog = match parent {
            Some(parent) => codec.unescape_name(parent),
            None => session.current_catalog(),
        };
        let schemas = session.schemas(&codec.escape_name(&catalog));
        self.find_matches(word, schemas, MatchMode::Fuzzy, "schema")
    }

    fn database_matches(&self, word: &str) -> Vec<Match> {
        let Some(session) = self.session() else {
            return Vec::new();
        };
        let catalogs: Vec<Candidate> = session
            .catalogs()
            .into_iter()
            .map(|c| Candidate::new(c).meta("catalog"))
            .collect();
        self.find_matches(word, catalogs, MatchMode::Fuzzy, "database")
    }

    fn keyword_matches(&self, last_token: Option<&str>, word: &str) -> Vec<Match> {
        let upper = match self.settings.keyword_casing {
            KeywordCasing::Upper => true,
            KeywordCasing::Lower => false,
            KeywordCasing::Auto => !word.chars().last().is_some_and(char::is_lowercase),
        };
        let keywords = literals::next_keywords(last_token)
            .into_iter()
            .map(|k| if upper { k.to_uppercase() } else { k.to_lowercase() });
        self.find_matches(word, keywords, MatchMode::Strict, "keyword")
    }

    fn special_matches(&self, word: &str) -> Vec<Match> {
        let commands = literals::SPECIAL_COMMANDS
            .iter()
            .map(|(command, description)| Candidate::new(*command).meta(*description));
        self.find_matches(word, commands, MatchMode::Strict, "")
    }

    fn named_query_matches(&self, word: &str) -> Vec<Match> {
        let names: Vec<String> = self.named_queries.read().unwrap().keys().cloned().collect();
        self.find_matches(word, names, MatchMode::Fuzzy, "named query")
    }

    /// File names completing the last path component of `word`.
    fn path_matches(&self, word: &str) -> Vec<Match> {
        let (dir, prefix) = match word.rfind('/') {
            Some(i) => (&word[..=i], &word[i + 1..]),
            None => ("", word),
        };
        let directory = if dir.is_empty() {
            PathBuf::from(".")
        } else if let Some(rest) = dir.strip_prefix('~') {
            match dirs::home_dir() {
                Some(home) => home.join(rest.trim_start_matches('/')),
                None => return Vec::new(),
            }
        } else {
            PathBuf::from(dir)
        };
        let Ok(entries) = fs::read_dir(&directory) else {
            return Vec::new();
        };

        let start_position = -(prefix.chars().count() as isize);
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                if !name.starts_with(prefix) || (name.starts_with('.') && !prefix.starts_with('.')) {
                    return None;
                }
                let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
                Some(if is_dir { format!("{name}/") } else { name })
            })
            .collect();
        names.sort();
        names
            .into_iter()
            .map(|name| Match {
                priority: Priority::bottom(&name),
                completion: Completion {
                    text: name.clone(),
                    start_position,
                    display: name,
                    display_meta: None,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionConfig;

    #[test]
    fn test_generate_alias() {
        assert_eq!(generate_alias("orders"), "o");
        assert_eq!(generate_alias("order_items"), "oi");
        assert_eq!(generate_alias("_order__items"), "oi");
        assert_eq!(generate_alias("OrderItems"), "OI");
    }

    #[test]
    fn test_alias_is_unique() {
        let engine = CompletionEngine::detached(CompletionConfig::default());
        let refs = vec![TableReference::new("orders"), TableReference::new("orders2")];
        assert_eq!(engine.alias("orders", &refs), "orders3");
        assert_eq!(engine.alias("customers", &refs), "customers");

        let aliasing = CompletionEngine::detached(CompletionConfig {
            generate_aliases: true,
            ..CompletionConfig::default()
        });
        let mut taken = TableReference::new("orders");
        taken.alias = Some("o".into());
        assert_eq!(aliasing.alias("other", &[taken]), "o2");
    }

    #[test]
    fn test_normalize_ref() {
        assert_eq!(normalize_ref("Orders"), "\"orders\"");
        assert_eq!(normalize_ref("\"Orders\""), "\"Orders\"");
    }

    #[test]
    fn test_path_completion() {
        let dir = std::env::temp_dir().join(format!("sqlnav-paths-{}", std::process::id()));
        fs::create_dir_all(dir.join("queries")).unwrap();
        fs::write(dir.join("query.sql"), "SELECT 1;").unwrap();
        fs::write(dir.join("other.sql"), "SELECT 2;").unwrap();

        let engine = CompletionEngine::detached(CompletionConfig::default());
        let word = format!("{}/que", dir.display());
        let completions: Vec<_> = engine.path_matches(&word).into_iter().map(|m| m.completion).collect();
        let names: Vec<_> = completions.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(names, vec!["queries/", "query.sql"]);
        assert_eq!(completions[0].start_position, -3);

        fs::remove_dir_all(dir).unwrap();
    }
}
