//! Output formatting for result sets
//!
//! Results arrive page by page from the session's row buffer, so every
//! formatter renders one page at a time:
//! - Table layout for interactive reading
//! - JSON lines or a pretty JSON array for piping
//! - Compact output that only reports counts
//! - Timing and row-count footers
//!
//! # Examples
//!
//! ```
//! use sqlnav::config::OutputFormat;
//! use sqlnav::driver::{ColumnDescription, Value};
//! use sqlnav::formatter::Formatter;
//!
//! let columns = vec![ColumnDescription { name: "id".into(), type_name: "int".into() }];
//! let rows = vec![vec![Value::Int(1)], vec![Value::Int(2)]];
//!
//! let formatter = Formatter::new(OutputFormat::Json, false);
//! let output = formatter.format_rows(&columns, &rows).unwrap();
//! assert_eq!(output, "{\"id\":1}\n{\"id\":2}");
//! ```

mod colorizer;
mod json;
mod stats;
mod table;

pub use colorizer::Colorizer;
pub use json::JsonFormatter;
pub use stats::StatsFormatter;
pub use table::{TableFormatter, TableStyle};

use std::time::Duration;

use crate::config::{DisplayConfig, OutputFormat};
use crate::driver::{ColumnDescription, Row};
use crate::error::Result;

/// Main formatter for result pages and shell messages
pub struct Formatter {
    /// Output format type
    format_type: OutputFormat,

    /// Colorizer for messages
    colorizer: Colorizer,

    /// Footer settings
    stats: StatsFormatter,

    /// Enable colored output
    use_colors: bool,
}

impl Formatter {
    /// Create a new formatter
    ///
    /// # Arguments
    /// * `format_type` - Output format type
    /// * `use_colors` - Enable colored output
    ///
    /// # Returns
    /// * `Self` - New formatter instance
    pub fn new(format_type: OutputFormat, use_colors: bool) -> Self {
        Self {
            format_type,
            colorizer: Colorizer::new(use_colors),
            stats: StatsFormatter::new(true),
            use_colors,
        }
    }

    /// Create a formatter from display settings
    pub fn from_config(config: &DisplayConfig) -> Self {
        let mut formatter = Self::new(config.format, config.color_output);
        formatter.stats = StatsFormatter::new(config.show_timing);
        formatter
    }

    pub fn format_type(&self) -> OutputFormat {
        self.format_type
    }

    pub fn colorizer(&self) -> &Colorizer {
        &self.colorizer
    }

    /// Render one page of rows
    ///
    /// # Arguments
    /// * `columns` - Result-set description
    /// * `rows` - Rows of this page, in driver order
    ///
    /// # Returns
    /// * `Result<String>` - Rendered page or error
    pub fn format_rows(&self, columns: &[ColumnDescription], rows: &[Row]) -> Result<String> {
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        match self.format_type {
            OutputFormat::Table => {
                TableFormatter::with_colors(self.use_colors).format(&names, rows)
            }
            OutputFormat::Json => JsonFormatter::new(false).format(&names, rows),
            OutputFormat::JsonPretty => JsonFormatter::new(true).format(&names, rows),
            OutputFormat::Compact => Ok(self.format_compact(rows)),
        }
    }

    fn format_compact(&self, rows: &[Row]) -> String {
        match rows.len() {
            1 => "1 row".to_string(),
            n => format!("{n} rows"),
        }
    }

    /// Footer printed after the last page of a result set
    pub fn format_stats(&self, total_rows: usize, elapsed: Duration) -> String {
        self.colorizer.info(&self.stats.format(total_rows, elapsed))
    }

    /// Format an error message
    pub fn format_error(&self, message: &str) -> String {
        self.colorizer.error(message)
    }

    /// Format a success message
    pub fn format_success(&self, message: &str) -> String {
        self.colorizer.success(message)
    }

    /// Format a warning message
    pub fn format_warning(&self, message: &str) -> String {
        self.colorizer.warning(message)
    }
}
