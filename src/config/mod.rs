//! Configuration management for sqlnav
//!
//! Configuration is read from a TOML file and then overridden by
//! command-line arguments:
//! 1. Command-line arguments
//! 2. Configuration file (`~/.sqlnav/config.toml` by default)
//! 3. Default values
//!
//! Every field has a default so a partial file is always accepted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Completion configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Display configuration
    #[serde(default)]
    pub display: DisplayConfig,

    /// History configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Named queries, executed with `\n NAME`
    #[serde(default)]
    pub named_queries: BTreeMap<String, String>,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Rows requested from the driver per fetch
    #[serde(default = "default_fetch_chunk_size")]
    pub fetch_chunk_size: usize,

    /// Data source made active at startup
    #[serde(default)]
    pub default_datasource: Option<String>,

    /// In-memory driver fixture describing the available data sources
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

/// Completion behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Analyze the statement instead of offering keywords only
    #[serde(default = "default_smart_completion")]
    pub smart_completion: bool,

    /// Casing applied to keyword suggestions
    #[serde(default = "default_keyword_casing")]
    pub keyword_casing: KeywordCasing,

    /// When column suggestions are prefixed with their table reference
    #[serde(default = "default_qualify_columns")]
    pub qualify_columns: QualifyColumns,

    /// Append a generated alias to table suggestions in FROM clauses
    #[serde(default)]
    pub generate_aliases: bool,

    /// Column order used when expanding `*`
    #[serde(default = "default_asterisk_column_order")]
    pub asterisk_column_order: ColumnOrder,

    /// File with one preferred identifier casing per line
    #[serde(default)]
    pub casing_file: Option<PathBuf>,
}

/// Keyword casing options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeywordCasing {
    Upper,
    Lower,
    /// Follow the casing of the word being typed
    Auto,
}

/// Column qualification policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QualifyColumns {
    Always,
    Never,
    IfMoreThanOneTable,
}

/// Column order for `*` expansion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnOrder {
    TableOrder,
    Alphabetic,
}

/// Display and output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Output format (table, json, json-pretty, compact)
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Enable colored output
    #[serde(default = "default_color_output")]
    pub color_output: bool,

    /// Rows rendered per page of a result set
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Row limit used by `\preview`
    #[serde(default = "default_preview_limit")]
    pub preview_limit: i64,

    /// Show execution time
    #[serde(default = "default_show_timing")]
    pub show_timing: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// ASCII table layout
    Table,

    /// One JSON object per row, single line
    Json,

    /// Pretty-printed JSON array
    JsonPretty,

    /// Row count only
    Compact,
}

/// Command history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of history entries
    #[serde(default = "default_max_history_size")]
    pub max_size: usize,

    /// Path to history file
    #[serde(default = "default_history_file")]
    pub file_path: PathBuf,

    /// Enable history persistence
    #[serde(default = "default_persist_history")]
    pub persist: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Path to log file (None for stderr)
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_timeout() -> u64 {
    5
}

fn default_fetch_chunk_size() -> usize {
    500
}

fn default_smart_completion() -> bool {
    true
}

fn default_keyword_casing() -> KeywordCasing {
    KeywordCasing::Upper
}

fn default_qualify_columns() -> QualifyColumns {
    QualifyColumns::IfMoreThanOneTable
}

fn default_asterisk_column_order() -> ColumnOrder {
    ColumnOrder::TableOrder
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_color_output() -> bool {
    true
}

fn default_page_size() -> usize {
    100
}

fn default_preview_limit() -> i64 {
    1000
}

fn default_show_timing() -> bool {
    true
}

fn default_max_history_size() -> usize {
    1000
}

fn default_history_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sqlnav_history")
}

fn default_persist_history() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            fetch_chunk_size: default_fetch_chunk_size(),
            default_datasource: None,
            fixture: None,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            smart_completion: default_smart_completion(),
            keyword_casing: default_keyword_casing(),
            qualify_columns: default_qualify_columns(),
            generate_aliases: false,
            asterisk_column_order: default_asterisk_column_order(),
            casing_file: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            color_output: default_color_output(),
            page_size: default_page_size(),
            preview_limit: default_preview_limit(),
            show_timing: default_show_timing(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_history_size(),
            file_path: default_history_file(),
            persist: default_persist_history(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_path: None,
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Load configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::Generic(format!("{}: {e}", path.display()))
            }
        })?;
        Self::from_toml_str(&text)
    }

    /// Load configuration from an explicit path or the default location.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Self::default_config_path();
                if default.exists() {
                    Self::from_file(default)
                } else {
                    tracing::debug!("No config at {}, using defaults", default.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sqlnav")
            .join("config.toml")
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("connection.timeout", self.connection.timeout as usize),
            ("connection.fetch_chunk_size", self.connection.fetch_chunk_size),
            ("display.page_size", self.display.page_size),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Get connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.timeout)
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl OutputFormat {
    /// Parse a user-supplied format name
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "compact" => Some(OutputFormat::Compact),
            _ => None,
        }
    }

    /// Name accepted by [`OutputFormat::parse`]
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::JsonPretty => "json-pretty",
            OutputFormat::Compact => "compact",
        }
    }

    /// Check if format is JSON-based
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::JsonPretty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.timeout, 5);
        assert_eq!(config.display.format, OutputFormat::Table);
        assert_eq!(config.completion.keyword_casing, KeywordCasing::Upper);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [completion]
            keyword_casing = "lower"
            qualify_columns = "always"

            [named_queries]
            users = "SELECT * FROM users"
            "#,
        )
        .unwrap();
        assert_eq!(config.completion.keyword_casing, KeywordCasing::Lower);
        assert_eq!(config.completion.qualify_columns, QualifyColumns::Always);
        assert_eq!(config.connection.fetch_chunk_size, 500);
        assert_eq!(config.named_queries["users"], "SELECT * FROM users");
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml_str("[display\nformat = 1").unwrap_err();
        assert!(err.to_string().contains("Invalid config format"));
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.display.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load_from_file(Some(Path::new("/nonexistent/sqlnav.toml"))).unwrap_err();
        assert!(matches!(
            err,
            crate::error::SqlnavError::Config(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON-pretty"), Some(OutputFormat::JsonPretty));
        assert_eq!(OutputFormat::parse("csv"), None);
        assert!(OutputFormat::Json.is_json());
    }

    #[test]
    fn test_round_trip_via_toml() {
        let text = Config::default().to_toml().unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed.display.page_size, 100);
    }
}
