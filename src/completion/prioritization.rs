//! Usage counts from executed statements, used to break ranking ties.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use super::literals;
use crate::parser::{SqlLexer, TokenKind, strip_quotes};

/// One case-insensitive, word-bounded pattern per keyword; inner spaces
/// match any whitespace run.
static KEYWORD_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    literals::keywords()
        .filter_map(|keyword| {
            let body = keyword
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            RegexBuilder::new(&format!(r"\b{body}\b"))
                .case_insensitive(true)
                .build()
                .ok()
                .map(|re| (keyword, re))
        })
        .collect()
});

#[derive(Debug, Default)]
pub struct PrevalenceCounter {
    keyword_counts: HashMap<String, u64>,
    name_counts: HashMap<String, u64>,
}

impl PrevalenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, text: &str) {
        self.update_keywords(text);
        self.update_names(text);
    }

    pub fn update_keywords(&mut self, text: &str) {
        for (keyword, pattern) in KEYWORD_PATTERNS.iter() {
            let seen = pattern.find_iter(text).count() as u64;
            if seen > 0 {
                *self.keyword_counts.entry(keyword.to_string()).or_default() += seen;
            }
        }
    }

    pub fn update_names(&mut self, text: &str) {
        for token in SqlLexer::significant(text) {
            let name = match &token.kind {
                TokenKind::Ident(name) => name.to_lowercase(),
                TokenKind::QuotedIdent(raw) => strip_quotes(raw).to_lowercase(),
                _ => continue,
            };
            *self.name_counts.entry(name).or_default() += 1;
        }
    }

    pub fn clear_names(&mut self) {
        self.name_counts.clear();
    }

    pub fn keyword_count(&self, keyword: &str) -> u64 {
        self.keyword_counts.get(&keyword.to_uppercase()).copied().unwrap_or(0)
    }

    pub fn name_count(&self, name: &str) -> u64 {
        let name = name.trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']');
        self.name_counts.get(&name.to_lowercase()).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_counted_case_insensitively() {
        let mut counter = PrevalenceCounter::new();
        counter.update("select a from t; SELECT b FROM u ORDER   BY b");
        assert_eq!(counter.keyword_count("SELECT"), 2);
        assert_eq!(counter.keyword_count("from"), 2);
        assert_eq!(counter.keyword_count("ORDER BY"), 1);
        assert_eq!(counter.keyword_count("WHERE"), 0);
    }

    #[test]
    fn test_keywords_need_word_boundaries() {
        let mut counter = PrevalenceCounter::new();
        counter.update_keywords("SELECT selected FROM t");
        assert_eq!(counter.keyword_count("SELECT"), 1);
    }

    #[test]
    fn test_names_are_counted() {
        let mut counter = PrevalenceCounter::new();
        counter.update("SELECT id, \"Name\" FROM customers WHERE id > 1");
        assert_eq!(counter.name_count("id"), 2);
        assert_eq!(counter.name_count("\"Name\""), 1);
        assert_eq!(counter.name_count("customers"), 1);
        assert_eq!(counter.name_count("select"), 0);

        counter.clear_names();
        assert_eq!(counter.name_count("id"), 0);
    }
}
