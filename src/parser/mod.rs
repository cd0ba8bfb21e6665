//! Lightweight SQL analysis for completion
//!
//! Nothing here parses SQL fully. The lexer produces an error-tolerant token
//! stream and the analyzer looks at the tokens around the cursor to decide
//! what may be typed next.
//!
//! # Architecture
//!
//! - `sql_lexer`: tokens with keyword folding (`ORDER BY`, `LEFT OUTER JOIN`)
//! - `words`: the word at the cursor and the previous keyword
//! - `tables`: table references in FROM/JOIN/INTO/UPDATE clauses
//! - `ctes`: `WITH` clauses reduced to local tables
//! - `statement`: the statement under the cursor
//! - `suggest`: the completion contexts valid at the cursor
//!
//! # Examples
//!
//! ```
//! use sqlnav::parser::{Suggestion, suggest_type};
//!
//! let suggestions = suggest_type("SELECT * FROM ", "SELECT * FROM ");
//! assert!(suggestions.contains(&Suggestion::Database));
//! ```

mod ctes;
mod sql_lexer;
mod statement;
mod suggest;
mod tables;
mod words;

pub use ctes::LocalTable;
pub use sql_lexer::{KEYWORDS, SqlLexer, Token, TokenKind, strip_quotes};
pub use statement::{SqlStatement, TableScope};
pub use suggest::{ColumnContext, FunctionUsage, Suggestion, suggest_type};
pub use tables::{TableReference, extract_tables, is_lower};
pub use words::{WordChars, find_prev_keyword, last_word};
