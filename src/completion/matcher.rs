//! Matching typed text against candidates and ranking the results.

use regex::Regex;
use tracing::warn;

use super::CompletionEngine;
use super::candidate::{Candidate, Completion, Match};
use crate::parser::{WordChars, last_word};

/// How the typed text must relate to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The typed characters appear in order, anywhere in the candidate
    Fuzzy,
    /// The candidate starts with the typed text
    Strict,
}

/// How well the typed text matched, weakest variant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchQuality {
    /// Strict matches always rank after fuzzy ones.
    Strict,
    /// Shorter matched spans, then earlier ones, rank higher.
    Fuzzy { neg_length: i64, neg_start: i64 },
    /// The candidate's first word is the typed text.
    Exact,
}

/// Tie-breaker on the candidate text: shorter first, then
/// case-insensitive order (`_` and space before letters), then case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LexicalKey {
    neg_length: i64,
    folded: Vec<i64>,
    exact: Vec<i64>,
}

impl LexicalKey {
    fn new(unescaped_lower: &str, item: &str) -> Self {
        Self {
            neg_length: -(item.chars().count() as i64),
            folded: unescaped_lower
                .chars()
                .map(|c| if c == ' ' || c == '_' { 0 } else { -(c as i64) })
                .collect(),
            exact: item.chars().map(|c| c as i64).collect(),
        }
    }
}

/// Rank of a match; larger sorts first.
///
/// Fields compare in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority {
    pub quality: MatchQuality,
    pub type_priority: i64,
    pub prio: i64,
    pub prevalence: u64,
    pub prio2: i64,
    pub lexical: LexicalKey,
}

impl Priority {
    /// A rank above every ordinary match.
    pub fn top() -> Self {
        Self {
            quality: MatchQuality::Exact,
            type_priority: i64::MAX,
            prio: i64::MAX,
            prevalence: u64::MAX,
            prio2: i64::MAX,
            lexical: LexicalKey {
                neg_length: 0,
                folded: Vec::new(),
                exact: Vec::new(),
            },
        }
    }

    /// A rank below every ordinary match.
    pub fn bottom(item: &str) -> Self {
        Self {
            quality: MatchQuality::Strict,
            type_priority: i64::MIN,
            prio: 0,
            prevalence: 0,
            prio2: 0,
            lexical: LexicalKey::new(&item.to_lowercase(), item),
        }
    }
}

/// Kinds in ascending order of precedence: join conditions outrank
/// columns, which outrank tables and keywords.
const TYPE_ORDER: &[&str] = &[
    "keyword",
    "function",
    "view",
    "table",
    "datatype",
    "database",
    "schema",
    "column",
    "table alias",
    "join",
    "name join",
    "fk join",
];

fn type_priority(meta: &str) -> i64 {
    TYPE_ORDER
        .iter()
        .position(|m| *m == meta)
        .map(|i| i as i64)
        .unwrap_or(-1)
}

const MAX_META_LEN: usize = 50;

fn truncate_meta(meta: String) -> String {
    if meta.chars().count() > MAX_META_LEN {
        let head: String = meta.chars().take(MAX_META_LEN - 3).collect();
        format!("{head}...")
    } else {
        meta
    }
}

impl CompletionEngine {
    /// Match `text` (the word before the cursor) against `candidates`.
    ///
    /// `meta` is the kind of the candidates; it sets their type precedence
    /// and is shown for candidates without their own meta text.
    pub fn find_matches<I, C>(&self, text: &str, candidates: I, mode: MatchMode, meta: &str) -> Vec<Match>
    where
        I: IntoIterator<Item = C>,
        C: Into<Candidate>,
    {
        let codec = self.codec();
        let mut text = last_word(text, WordChars::MostPunctuations).to_lowercase();
        let text_len = text.chars().count() as isize;
        if text.starts_with('"') {
            text.remove(0);
        }

        let pattern = match mode {
            MatchMode::Fuzzy => {
                let joined = text
                    .chars()
                    .map(|c| regex::escape(&c.to_string()))
                    .collect::<Vec<_>>()
                    .join(".*?");
                match Regex::new(&joined) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(error = %e, "Cannot build match pattern");
                        return Vec::new();
                    }
                }
            }
            MatchMode::Strict => None,
        };
        let exact_first_word = format!("{text} ");

        let quality_of = |item: &str| -> Option<MatchQuality> {
            if item.is_empty() {
                return None;
            }
            let lower = item.to_lowercase();
            match &pattern {
                Some(re) => {
                    let head: String = lower.chars().take(text.chars().count() + 1).collect();
                    if head == text || head == exact_first_word {
                        return Some(MatchQuality::Exact);
                    }
                    let unescaped = codec.unescape_name(&lower);
                    re.find(&unescaped).map(|m| MatchQuality::Fuzzy {
                        neg_length: -(m.as_str().chars().count() as i64),
                        neg_start: -(unescaped[..m.start()].chars().count() as i64),
                    })
                }
                None => lower.starts_with(&text).then_some(MatchQuality::Strict),
            }
        };

        let type_priority = type_priority(meta);
        let prevalence = self.prevalence.lock().unwrap();
        let mut matches = Vec::new();
        for candidate in candidates {
            let candidate: Candidate = candidate.into();
            let Some(quality) = candidate.synonyms.iter().filter_map(|s| quality_of(s)).max() else {
                continue;
            };

            let display_meta = candidate
                .meta
                .clone()
                .or_else(|| (!meta.is_empty()).then(|| meta.to_string()))
                .map(truncate_meta);
            let lexical = LexicalKey::new(
                &codec.unescape_name(&candidate.completion.to_lowercase()),
                &candidate.completion,
            );
            let item = self.case(&candidate.completion);
            let count = match mode {
                MatchMode::Fuzzy => prevalence.name_count(&item),
                MatchMode::Strict => prevalence.keyword_count(&item),
            };
            matches.push(Match {
                priority: Priority {
                    quality,
                    type_priority,
                    prio: candidate.prio,
                    prevalence: count,
                    prio2: candidate.prio2,
                    lexical,
                },
                completion: Completion {
                    display: self.case(&candidate.display),
                    text: item,
                    start_position: -text_len,
                    display_meta,
                },
            });
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionConfig;

    fn engine() -> CompletionEngine {
        CompletionEngine::detached(CompletionConfig::default())
    }

    fn texts(matches: &[Match]) -> Vec<String> {
        let mut matches = matches.to_vec();
        matches.sort_by(|a, b| b.priority.cmp(&a.priority));
        matches.into_iter().map(|m| m.completion.text).collect()
    }

    #[test]
    fn test_shorter_names_rank_first() {
        let engine = engine();
        let matches = engine.find_matches("us", ["user_groups", "users", "use"], MatchMode::Fuzzy, "");
        assert_eq!(texts(&matches), vec!["use", "users", "user_groups"]);
    }

    #[test]
    fn test_fuzzy_prefers_tight_early_spans() {
        let engine = engine();
        let matches = engine.find_matches(
            "ord",
            ["customer_orders", "orders", "o_r_d", "nothing"],
            MatchMode::Fuzzy,
            "table",
        );
        assert_eq!(texts(&matches), vec!["orders", "o_r_d", "customer_orders"]);
        assert_eq!(matches[0].completion.start_position, -3);
        assert_eq!(matches[0].completion.display_meta.as_deref(), Some("table"));
    }

    #[test]
    fn test_exact_first_word_ranks_above_everything() {
        let engine = engine();
        let candidates = vec![
            Candidate::new("EndUsers EU").synonyms(["EndUsers", "EU"]),
            Candidate::new("Entries E").synonyms(["Entries", "E"]),
        ];
        let matches = engine.find_matches("e", candidates, MatchMode::Fuzzy, "table");
        assert_eq!(texts(&matches)[0], "Entries E");
        let best = matches.iter().max_by(|a, b| a.priority.cmp(&b.priority)).unwrap();
        assert_eq!(best.priority.quality, MatchQuality::Exact);
    }

    #[test]
    fn test_strict_is_anchored_and_ranks_last() {
        let engine = engine();
        let mut matches = engine.find_matches("se", ["SELECT", "SET", "USE"], MatchMode::Strict, "keyword");
        assert_eq!(texts(&matches), vec!["SET", "SELECT"]);
        matches.extend(engine.find_matches("se", ["users"], MatchMode::Fuzzy, "table"));
        assert_eq!(texts(&matches)[0], "users");
    }

    #[test]
    fn test_quoted_input_and_names() {
        let engine = engine();
        let matches = engine.find_matches("\"na", ["\"Name\"", "email"], MatchMode::Fuzzy, "column");
        assert_eq!(texts(&matches), vec!["\"Name\""]);
        assert_eq!(matches[0].completion.start_position, -3);
    }

    #[test]
    fn test_long_meta_is_truncated() {
        let engine = engine();
        let long = "x".repeat(60);
        let matches = engine.find_matches("a", [Candidate::new("abc").meta(long)], MatchMode::Strict, "");
        let meta = matches[0].completion.display_meta.clone().unwrap();
        assert_eq!(meta.chars().count(), 50);
        assert!(meta.ends_with("..."));
    }

    #[test]
    fn test_type_precedence_breaks_ties() {
        let engine = engine();
        let mut matches = engine.find_matches("", ["id"], MatchMode::Fuzzy, "column");
        matches.extend(engine.find_matches("", ["id"], MatchMode::Fuzzy, "table"));
        matches.sort_by(|a, b| b.priority.cmp(&a.priority));
        assert_eq!(matches[0].completion.display_meta.as_deref(), Some("column"));
    }

    #[test]
    fn test_prevalence_breaks_ties() {
        let engine = engine();
        let matches = engine.find_matches("", ["alpha", "gamma"], MatchMode::Fuzzy, "column");
        assert_eq!(texts(&matches), vec!["alpha", "gamma"]);
        engine.extend_query_history("SELECT gamma FROM t", false);
        let matches = engine.find_matches("", ["alpha", "gamma"], MatchMode::Fuzzy, "column");
        assert_eq!(texts(&matches), vec!["gamma", "alpha"]);
    }
}
