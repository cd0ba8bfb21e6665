use std::{fmt, io};

use crate::driver::DatabaseError;

/// Crate-wide `Result` type using [`SqlnavError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, SqlnavError>;

/// Top-level error type for sqlnav operations.
///
/// Wraps the more specific error kinds so callers only ever need to
/// handle a single type.
#[derive(Debug)]
pub enum SqlnavError {
    /// Connection-related errors.
    Connection(ConnectionError),

    /// Statement execution errors.
    Execution(ExecutionError),

    /// Configuration errors.
    Config(ConfigError),

    /// Error reported by the database driver.
    Database(DatabaseError),

    /// I/O errors.
    Io(io::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Connection-specific errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// The driver refused the connection.
    ConnectFailed(String),

    /// The driver did not answer within the connect timeout.
    Timeout,

    /// The session has no live connection.
    NotConnected,

    /// No data source with this name was discovered.
    UnknownDataSource(String),
}

/// Execution-specific errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// Statement execution failed; carries the raw driver text.
    QueryFailed(String),

    /// The wait for a worker was interrupted by the user.
    Cancelled(String),

    /// Another statement is still executing on this session.
    Busy,

    /// Cursor error.
    CursorError(String),

    /// Named query does not exist.
    UnknownNamedQuery(String),

    /// Malformed or unknown meta-command.
    InvalidCommand(String),
}

/// Configuration-specific errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Anything else.
    Generic(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for SqlnavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlnavError::Connection(e) => write!(f, "Connection error: {e}"),
            SqlnavError::Execution(e) => write!(f, "{e}"),
            SqlnavError::Config(e) => write!(f, "Configuration error: {e}"),
            SqlnavError::Database(e) => write!(f, "{e}"),
            SqlnavError::Io(e) => write!(f, "I/O error: {e}"),
            SqlnavError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::Timeout => write!(f, "Connection timeout"),
            ConnectionError::NotConnected => write!(f, "Not connected"),
            ConnectionError::UnknownDataSource(name) => write!(f, "Unknown data source: {name}"),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Driver text is surfaced verbatim.
            ExecutionError::QueryFailed(msg) => write!(f, "{msg}"),
            ExecutionError::Cancelled(what) => write!(f, "Interrupted: {what}"),
            ExecutionError::Busy => write!(f, "A statement is already executing"),
            ExecutionError::CursorError(msg) => write!(f, "Cursor error: {msg}"),
            ExecutionError::UnknownNamedQuery(name) => write!(f, "No named query '{name}'"),
            ExecutionError::InvalidCommand(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SqlnavError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for ExecutionError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to SqlnavError ========================= */

impl From<io::Error> for SqlnavError {
    fn from(err: io::Error) -> Self {
        SqlnavError::Io(err)
    }
}

impl From<DatabaseError> for SqlnavError {
    fn from(err: DatabaseError) -> Self {
        SqlnavError::Database(err)
    }
}

impl From<ConnectionError> for SqlnavError {
    fn from(err: ConnectionError) -> Self {
        SqlnavError::Connection(err)
    }
}

impl From<ExecutionError> for SqlnavError {
    fn from(err: ExecutionError) -> Self {
        SqlnavError::Execution(err)
    }
}

impl From<ConfigError> for SqlnavError {
    fn from(err: ConfigError) -> Self {
        SqlnavError::Config(err)
    }
}

impl From<String> for SqlnavError {
    fn from(msg: String) -> Self {
        SqlnavError::Generic(msg)
    }
}

impl From<&str> for SqlnavError {
    fn from(msg: &str) -> Self {
        SqlnavError::Generic(msg.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_is_verbatim() {
        let err: SqlnavError = ExecutionError::QueryFailed("ORA-00942: table missing".into()).into();
        assert_eq!(err.to_string(), "ORA-00942: table missing");
    }

    #[test]
    fn test_connection_error_display() {
        let err = SqlnavError::from(ConnectionError::UnknownDataSource("prod".into()));
        assert_eq!(err.to_string(), "Connection error: Unknown data source: prod");
    }

    #[test]
    fn test_from_str() {
        assert!(matches!(SqlnavError::from("boom"), SqlnavError::Generic(ref m) if m == "boom"));
    }
}
