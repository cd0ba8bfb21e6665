//! Interactive shell for sqlnav
//!
//! This module provides the line-editing front end:
//! - Statement editing with reedline, with history and inline hints
//! - Context-aware completion backed by [`crate::completion`]
//! - Lexer-driven syntax highlighting
//! - Multi-line input, ended by `;`
//! - Backslash meta-commands for sessions and the object tree
//! - Result sets streamed page by page, interruptible with Ctrl-C

mod commands;
mod completer;
mod engine;
mod highlighter;
mod hinter;
mod progress;
mod prompt;
mod runner;
mod shared_state;
mod validator;

pub use commands::MetaCommand;
pub use completer::SqlCompleter;
pub use engine::ReplEngine;
pub use highlighter::SqlHighlighter;
pub use hinter::SqlHinter;
pub use progress::ProgressTracker;
pub use prompt::SqlPrompt;
pub use runner::{RunOutcome, StatementRunner, split_statements};
pub use shared_state::SharedState;
pub use validator::SqlValidator;
