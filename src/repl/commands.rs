//! Meta-command parser
//!
//! Lines starting with a backslash control the shell instead of being sent
//! to the database:
//! - `\c`, `\disconnect`, `\sources`, `\status` manage sessions
//! - `\tree`, `\next`, `\prev`, `\expand`, `\collapse`, `\refresh`, `\preview`
//!   drive the object browser
//! - `\n`, `\i` run stored statements
//! - `\format`, `\reset`, `\?`, `\q` adjust the shell itself
//!
//! Arguments are split on whitespace; `\preview` keeps the rest of the line
//! as its filter.

use std::path::PathBuf;

use crate::config::OutputFormat;
use crate::error::{ExecutionError, Result};

/// A parsed meta-command
#[derive(Debug, Clone, PartialEq)]
pub enum MetaCommand {
    Quit,
    Help,
    Sources,
    /// Connect to `dsn` (or the active one) and make it active
    Connect {
        dsn: Option<String>,
        user: Option<String>,
        password: Option<String>,
    },
    Disconnect,
    Tree,
    Next,
    Prev,
    Expand,
    Collapse,
    Refresh,
    /// Preview the selected table or view, with optional filter text
    Preview(String),
    NamedQuery(String),
    Include(PathBuf),
    Status,
    Reset,
    Format(OutputFormat),
}

impl MetaCommand {
    /// Check if input is a meta-command
    pub fn is_meta_command(input: &str) -> bool {
        input.trim_start().starts_with('\\')
    }

    /// Parse a meta-command line
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim().trim_end_matches(';').trim_end();
        let Some(body) = trimmed.strip_prefix('\\') else {
            return Err(invalid(format!("Not a meta-command: {input}")));
        };
        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };
        let mut args = rest.split_whitespace();

        let command = match name {
            "q" | "quit" => MetaCommand::Quit,
            "?" | "help" => MetaCommand::Help,
            "sources" => MetaCommand::Sources,
            "c" | "connect" => MetaCommand::Connect {
                dsn: args.next().map(String::from),
                user: args.next().map(String::from),
                password: args.next().map(String::from),
            },
            "disconnect" => MetaCommand::Disconnect,
            "tree" => MetaCommand::Tree,
            "next" => MetaCommand::Next,
            "prev" => MetaCommand::Prev,
            "expand" => MetaCommand::Expand,
            "collapse" => MetaCommand::Collapse,
            "refresh" => MetaCommand::Refresh,
            "preview" => MetaCommand::Preview(rest.to_string()),
            "n" => match args.next() {
                Some(query) => MetaCommand::NamedQuery(query.to_string()),
                None => return Err(invalid("Usage: \\n NAME".to_string())),
            },
            "i" => {
                if rest.is_empty() {
                    return Err(invalid("Usage: \\i FILE".to_string()));
                }
                MetaCommand::Include(PathBuf::from(rest))
            }
            "status" => MetaCommand::Status,
            "reset" => MetaCommand::Reset,
            "format" => {
                let format = args
                    .next()
                    .ok_or_else(|| invalid("Usage: \\format table|json|json-pretty|compact".to_string()))?;
                MetaCommand::Format(
                    OutputFormat::parse(format)
                        .ok_or_else(|| invalid(format!("Unknown format: {format}")))?,
                )
            }
            other => return Err(invalid(format!("Unknown command: \\{other}. Type \\? for help"))),
        };

        Ok(command)
    }
}

fn invalid(message: String) -> crate::error::SqlnavError {
    ExecutionError::InvalidCommand(message).into()
}
