//! Context-aware SQL completion
//!
//! Completions are recomputed on every request from the statement text and
//! the metadata cache of the active session. Nothing about a previous request
//! is reused except usage counts and preferred casings.
//!
//! # Architecture
//!
//! - **Analyzer** (`crate::parser`): decides which kinds of objects fit at the cursor
//! - **Matchers**: turn each kind into candidates read from the metadata cache
//! - **Ranking**: fuzzy or prefix matching, then a fixed chain of tie-breakers
//! - **Prevalence**: keyword and name counts from executed statements
//! - **Engine**: holds settings and casing, orchestrates the flow
//!
//! # Examples
//!
//! ```
//! use sqlnav::completion::CompletionEngine;
//! use sqlnav::config::CompletionConfig;
//!
//! let engine = CompletionEngine::detached(CompletionConfig::default());
//! let completions = engine.get_completions("SEL", 3);
//! assert_eq!(completions[0].text, "SELECT");
//! assert_eq!(completions[0].start_position, -3);
//! ```

mod candidate;
mod engine;
mod literals;
mod matcher;
mod matchers;
mod prioritization;

pub use candidate::{Candidate, Completion, Match};
pub use engine::{ActiveSession, CompletionEngine};
pub use literals::{DATATYPES, FUNCTIONS, KEYWORDS_TREE, SPECIAL_COMMANDS};
pub use matcher::{MatchMode, MatchQuality, Priority};
pub use matchers::generate_alias;
pub use prioritization::PrevalenceCounter;
