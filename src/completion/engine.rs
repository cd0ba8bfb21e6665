//! Completion engine - ties the statement analyzer to the matchers
//!
//! The engine owns the state that outlives a keystroke: completion settings,
//! preferred casings, named queries and usage counts. Everything that depends
//! on the database is read through the active session, whose metadata cache
//! fills lazily as completions ask for it.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, warn};

use super::candidate::{Completion, Match};
use super::literals;
use super::matcher::MatchMode;
use super::prioritization::PrevalenceCounter;
use crate::config::CompletionConfig;
use crate::connection::{IdentifierCodec, Session};
use crate::error::Result;
use crate::parser::{WordChars, last_word, suggest_type};

/// Returns the session completions should read metadata from.
pub type ActiveSession = Arc<dyn Fn() -> Option<Arc<Session>> + Send + Sync>;

/// Main completion engine
pub struct CompletionEngine {
    active_session: ActiveSession,
    pub(super) settings: CompletionConfig,
    pub(super) prevalence: Mutex<PrevalenceCounter>,
    casing: RwLock<HashMap<String, String>>,
    pub(super) named_queries: RwLock<BTreeMap<String, String>>,
}

impl CompletionEngine {
    /// Create an engine reading metadata through `active_session`.
    ///
    /// A configured casing file is loaded right away; a missing or unreadable
    /// file only disables casing.
    pub fn new(active_session: ActiveSession, settings: CompletionConfig) -> Self {
        let engine = Self {
            active_session,
            settings,
            prevalence: Mutex::new(PrevalenceCounter::new()),
            casing: RwLock::new(HashMap::new()),
            named_queries: RwLock::new(BTreeMap::new()),
        };
        if let Some(path) = engine.settings.casing_file.clone()
            && let Err(e) = engine.load_casing_file(&path)
        {
            warn!(path = %path.display(), error = %e, "Cannot read casing file");
        }
        engine
    }

    /// An engine with no database behind it.
    pub fn detached(settings: CompletionConfig) -> Self {
        Self::new(Arc::new(|| None), settings)
    }

    pub fn settings(&self) -> &CompletionConfig {
        &self.settings
    }

    pub(super) fn session(&self) -> Option<Arc<Session>> {
        (self.active_session)()
    }

    /// Identifier rules of the active session; plain names without one.
    pub(super) fn codec(&self) -> IdentifierCodec {
        self.session().map(|s| s.codec()).unwrap_or_default()
    }

    /// Completions for the cursor at byte offset `cursor` of `text`, best first.
    pub fn get_completions(&self, text: &str, cursor: usize) -> Vec<Completion> {
        let mut cursor = cursor.min(text.len());
        while !text.is_char_boundary(cursor) {
            cursor -= 1;
        }
        let before = &text[..cursor];
        let word = last_word(before, WordChars::AllPunctuations);

        let mut matches: Vec<Match> = if self.settings.smart_completion {
            suggest_type(text, before)
                .iter()
                .flat_map(|suggestion| {
                    debug!(?suggestion, "Completing");
                    self.matches_for(suggestion, word)
                })
                .collect()
        } else {
            let mut matches = self.find_matches(word, literals::keywords(), MatchMode::Strict, "keyword");
            matches.extend(self.find_matches(word, literals::FUNCTIONS.iter().copied(), MatchMode::Strict, "function"));
            matches
        };

        matches.sort_by(|a, b| b.priority.cmp(&a.priority));
        matches.into_iter().map(|m| m.completion).collect()
    }

    /// Drop cached metadata of the active session so it is fetched again.
    pub fn reset_completions(&self) {
        if let Some(session) = self.session() {
            debug!(dsn = session.dsn(), "Resetting completion metadata");
            session.reset_metadata();
        }
    }

    /// Count the keywords and names of an executed statement.
    ///
    /// `is_init` is set while replaying history at startup, where only
    /// keywords are counted.
    pub fn extend_query_history(&self, text: &str, is_init: bool) {
        let mut prevalence = self.prevalence.lock().unwrap();
        if is_init {
            prevalence.update_keywords(text);
        } else {
            prevalence.update(text);
        }
    }

    /// Forget the names counted so far.
    pub fn reset_name_counts(&self) {
        self.prevalence.lock().unwrap().clear_names();
    }

    /// Remember preferred spellings, keyed by their lower-case form.
    pub fn extend_casing<I, S>(&self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut casing = self.casing.write().unwrap();
        for word in words {
            let word = word.as_ref().trim();
            if !word.is_empty() {
                casing.insert(word.to_lowercase(), word.to_string());
            }
        }
    }

    /// Load one preferred spelling per line from `path`.
    pub fn load_casing_file(&self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.extend_casing(text.lines());
        debug!(path = %path.display(), "Loaded casing file");
        Ok(())
    }

    /// The preferred spelling of `word`, or `word` itself.
    pub fn case(&self, word: &str) -> String {
        self.casing
            .read()
            .unwrap()
            .get(word)
            .cloned()
            .unwrap_or_else(|| word.to_string())
    }

    pub fn set_named_queries(&self, queries: BTreeMap<String, String>) {
        *self.named_queries.write().unwrap() = queries;
    }

    pub fn named_query(&self, name: &str) -> Option<String> {
        self.named_queries.read().unwrap().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KeywordCasing, QualifyColumns};
    use crate::connection::testing::{FIXTURE, session_from, shop};

    fn engine_for(session: Arc<Session>, settings: CompletionConfig) -> CompletionEngine {
        CompletionEngine::new(Arc::new(move || Some(session.clone())), settings)
    }

    fn texts(completions: &[Completion]) -> Vec<&str> {
        completions.iter().map(|c| c.text.as_str()).collect()
    }

    fn complete(engine: &CompletionEngine, text: &str) -> Vec<Completion> {
        engine.get_completions(text, text.len())
    }

    #[test]
    fn test_keywords_at_statement_start() {
        let engine = CompletionEngine::detached(CompletionConfig::default());
        let completions = complete(&engine, "SEL");
        assert_eq!(completions[0].text, "SELECT");
        assert_eq!(completions[0].start_position, -3);
        assert_eq!(completions[0].display_meta.as_deref(), Some("keyword"));
    }

    #[test]
    fn test_keyword_casing_auto_follows_input() {
        let settings = CompletionConfig {
            keyword_casing: KeywordCasing::Auto,
            ..CompletionConfig::default()
        };
        let engine = CompletionEngine::detached(settings);
        assert_eq!(complete(&engine, "sel")[0].text, "select");
        assert_eq!(complete(&engine, "SEL")[0].text, "SELECT");
    }

    #[test]
    fn test_keywords_follow_previous_keyword() {
        let engine = CompletionEngine::detached(CompletionConfig::default());
        assert_eq!(texts(&complete(&engine, "INSERT ")), vec!["INTO"]);
    }

    #[test]
    fn test_dumb_completion_offers_keywords_and_functions() {
        let settings = CompletionConfig {
            smart_completion: false,
            ..CompletionConfig::default()
        };
        let engine = engine_for(shop(), settings);
        let completions = complete(&engine, "SELECT * FROM cust");
        assert!(completions.is_empty());
        let completions = complete(&engine, "SELECT CO");
        assert!(texts(&completions).contains(&"COUNT"));
    }

    #[test]
    fn test_tables_after_qualified_from() {
        let engine = engine_for(shop(), CompletionConfig::default());
        let completions = complete(&engine, "SELECT * FROM shop.public.");
        let names = texts(&completions);
        assert!(names.contains(&"orders"));
        assert!(names.contains(&"customers"));
        assert!(names.contains(&"order_summary"));
        assert!(names.contains(&"total_spent"));
        assert!(!names.contains(&"log"));
    }

    #[test]
    fn test_schemas_of_a_catalog() {
        let engine = engine_for(shop(), CompletionConfig::default());
        let completions = complete(&engine, "SELECT * FROM shop.");
        assert_eq!(texts(&completions)[..2], ["audit", "public"]);
        assert!(completions.iter().all(|c| c.display_meta.as_deref() == Some("schema")));
    }

    #[test]
    fn test_databases_after_from() {
        let engine = engine_for(shop(), CompletionConfig::default());
        let completions = complete(&engine, "SELECT * FROM ar");
        assert_eq!(completions[0].text, "archive");
        assert_eq!(completions[0].display_meta.as_deref(), Some("catalog"));
    }

    #[test]
    fn test_columns_of_aliased_table() {
        let engine = engine_for(shop(), CompletionConfig::default());
        let text = "SELECT o. FROM shop.public.orders o";
        let completions = engine.get_completions(text, "SELECT o.".len());
        let names = texts(&completions);
        assert_eq!(names[..3], ["id", "total", "customer_id"]);
        assert!(completions[..3].iter().all(|c| c.display_meta.as_deref() == Some("column")));
    }

    #[test]
    fn test_columns_are_qualified_with_several_tables() {
        let engine = engine_for(shop(), CompletionConfig::default());
        let text = "SELECT  FROM shop.public.orders o JOIN shop.public.customers c ON o.customer_id = c.id";
        let completions = engine.get_completions(text, "SELECT ".len());
        let names = texts(&completions);
        assert!(names.contains(&"o.total"));
        assert!(names.contains(&"c.\"Name\""));

        let never = CompletionConfig {
            qualify_columns: QualifyColumns::Never,
            ..CompletionConfig::default()
        };
        let engine = engine_for(shop(), never);
        let completions = engine.get_completions(text, "SELECT ".len());
        assert!(texts(&completions).contains(&"total"));
    }

    #[test]
    fn test_star_expands_to_column_list() {
        let engine = engine_for(shop(), CompletionConfig::default());
        let text = "SELECT * FROM shop.public.orders";
        let completions = engine.get_completions(text, "SELECT *".len());
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].text, "id, customer_id, total");
        assert_eq!(completions[0].display, "*");
        assert_eq!(completions[0].start_position, -1);

        let text = "SELECT o.* FROM shop.public.orders o";
        let completions = engine.get_completions(text, "SELECT o.*".len());
        assert_eq!(completions[0].text, "id, o.customer_id, o.total");
    }

    #[test]
    fn test_catalogless_columns() {
        let session = session_from(FIXTURE, "notes");
        session.connect("", "", false).unwrap();
        let engine = engine_for(session, CompletionConfig::default());
        let completions = complete(&engine, "SELECT * FROM notes WHERE bo");
        assert_eq!(completions[0].text, "body");
    }

    #[test]
    fn test_cte_columns() {
        let engine = CompletionEngine::detached(CompletionConfig::default());
        let text = "WITH big AS (SELECT id, total FROM orders) SELECT  FROM big";
        let cursor = text.find("SELECT  FROM").unwrap() + "SELECT ".len();
        let completions = engine.get_completions(text, cursor);
        let names = texts(&completions);
        assert!(names.contains(&"id"));
        assert!(names.contains(&"total"));
    }

    #[test]
    fn test_join_suggestions_follow_foreign_keys() {
        let engine = engine_for(shop(), CompletionConfig::default());
        let completions = complete(&engine, "SELECT * FROM shop.public.orders o JOIN ");
        let join = completions
            .iter()
            .find(|c| c.display_meta.as_deref() == Some("join"))
            .unwrap();
        assert_eq!(join.text, "customers ON customers.id = o.customer_id");
    }

    #[test]
    fn test_generated_aliases_in_joins() {
        let settings = CompletionConfig {
            generate_aliases: true,
            ..CompletionConfig::default()
        };
        let engine = engine_for(shop(), settings);
        let completions = complete(&engine, "SELECT * FROM shop.public.orders o JOIN ");
        let join = completions
            .iter()
            .find(|c| c.display_meta.as_deref() == Some("join"))
            .unwrap();
        assert_eq!(join.text, "customers c ON c.id = o.customer_id");

        let completions = complete(&engine, "SELECT * FROM shop.public.ord");
        assert_eq!(completions[0].text, "orders o");
    }

    #[test]
    fn test_join_conditions() {
        let engine = engine_for(shop(), CompletionConfig::default());
        let completions =
            complete(&engine, "SELECT * FROM shop.public.orders o JOIN shop.public.customers c ON ");
        let names = texts(&completions);
        assert_eq!(names[0], "c.id = o.customer_id");
        assert!(names.contains(&"c.id = o.id"));
        assert!(names.contains(&"o"));
        assert!(names.contains(&"c"));
        assert_eq!(completions[0].display_meta.as_deref(), Some("fk join"));
    }

    #[test]
    fn test_special_commands_and_named_queries() {
        let engine = CompletionEngine::detached(CompletionConfig::default());
        let completions = complete(&engine, "\\pre");
        assert_eq!(texts(&completions), vec!["\\prev", "\\preview"]);
        assert_eq!(completions[0].start_position, -4);

        let mut queries = BTreeMap::new();
        queries.insert("daily".to_string(), "SELECT 1".to_string());
        queries.insert("weekly".to_string(), "SELECT 2".to_string());
        engine.set_named_queries(queries);
        assert_eq!(texts(&complete(&engine, "\\n da")), vec!["daily"]);
        assert_eq!(engine.named_query("weekly").as_deref(), Some("SELECT 2"));
    }

    #[test]
    fn test_casing_is_applied() {
        let engine = engine_for(shop(), CompletionConfig::default());
        engine.extend_casing(["Customers"]);
        let completions = complete(&engine, "SELECT * FROM shop.public.cust");
        assert_eq!(completions[0].text, "Customers");
    }

    #[test]
    fn test_casing_file() {
        let path = std::env::temp_dir().join(format!("sqlnav-casing-{}", std::process::id()));
        std::fs::write(&path, "CustomerId\n\nOrderTotal\n").unwrap();
        let settings = CompletionConfig {
            casing_file: Some(path.clone()),
            ..CompletionConfig::default()
        };
        let engine = CompletionEngine::detached(settings);
        assert_eq!(engine.case("customerid"), "CustomerId");
        assert_eq!(engine.case("ordertotal"), "OrderTotal");
        assert_eq!(engine.case("other"), "other");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_reset_completions_drops_metadata() {
        let session = shop();
        let engine = engine_for(session.clone(), CompletionConfig::default());
        complete(&engine, "SELECT * FROM shop.public.");
        assert!(!session.metadata().get_catalogs().names().unwrap_or_default().is_empty());
        engine.reset_completions();
        assert!(session.metadata().get_catalogs().names().unwrap_or_default().is_empty());
    }

    #[test]
    fn test_disconnected_session_reads_no_metadata() {
        let session = session_from(FIXTURE, "shop");
        let engine = engine_for(session.clone(), CompletionConfig::default());
        assert!(complete(&engine, "SELECT * FROM ").is_empty());
        assert_eq!(session.metadata().get_catalogs(), crate::metadata::Lookup::Unqueried);
    }
}
