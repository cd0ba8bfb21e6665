//! Error handling for sqlnav.
//!
//! Errors are grouped by the layer that raises them. Driver failures carry
//! the driver's own text so it can be shown to the user unchanged.
//!
//! Errors raised on worker threads never cross the thread boundary: the
//! session converts them into status fields (see `connection::Session`).
//! Only same-thread calls such as connecting return errors directly.
//!
//! # Example
//!
//! ```rust,no_run
//! use sqlnav::error::{ConnectionError, Result};
//!
//! fn require_connection(connected: bool) -> Result<()> {
//!     if !connected {
//!         return Err(ConnectionError::NotConnected.into());
//!     }
//!     Ok(())
//! }
//! ```

pub mod kinds;

pub use kinds::{ConfigError, ConnectionError, ExecutionError, Result, SqlnavError};
