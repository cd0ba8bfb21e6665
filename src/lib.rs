//! sqlnav Library
//!
//! Core of the sqlnav interactive SQL navigator: sessions against data
//! sources, a lazily populated object tree, and completion that analyzes the
//! statement being written. It can be embedded by other tools that want the
//! same browsing and completion behaviour.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `completion`: Candidate generation, matching and ranking
//! - `config`: Configuration management
//! - `connection`: Sessions, status tracking and per-DBMS rules
//! - `driver`: Driver traits and the in-memory driver
//! - `error`: Error types and handling
//! - `formatter`: Result-set rendering
//! - `metadata`: Per-session metadata cache
//! - `parser`: Error-tolerant SQL analysis
//! - `repl`: Interactive shell
//! - `tree`: Object browser
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use sqlnav::connection::Session;
//! use sqlnav::driver::MemoryDriver;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = MemoryDriver::from_file("fixture.toml")?;
//!     let session = Arc::new(Session::new("shop", Arc::new(driver), Duration::from_secs(5)));
//!
//!     session.connect("", "", false)?;
//!     println!("catalogs: {:?}", session.list_catalogs());
//!
//!     session.close();
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod completion;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod formatter;
pub mod metadata;
pub mod parser;
pub mod repl;
pub mod tree;

// Re-export commonly used types
pub use completion::CompletionEngine;
pub use config::Config;
pub use connection::Session;
pub use error::{Result, SqlnavError};
pub use formatter::Formatter;
pub use repl::{ReplEngine, SharedState};
pub use tree::ObjectTree;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
