//! Table layout for result pages using tabled
//!
//! Columns keep the driver's order and long values wrap instead of being
//! truncated.

use tabled::{
    Table,
    builder::Builder,
    settings::{Alignment, Color, Modify, Style, object::Columns, object::Rows, width::Width},
};

use crate::driver::{Row, Value};
use crate::error::Result;

/// Maximum width for a single column (characters)
const DEFAULT_MAX_COLUMN_WIDTH: usize = 40;

/// Table formatter for result pages
pub struct TableFormatter {
    /// Maximum column width
    max_column_width: usize,

    /// Table style
    style: TableStyle,

    /// Enable colored header
    use_colors: bool,
}

/// Available table styles
#[derive(Debug, Clone, Copy)]
pub enum TableStyle {
    /// Box-drawing characters
    Modern,
    /// Plain `+-|` characters
    Ascii,
    /// Rounded corners
    Rounded,
    /// Markdown pipe table
    Markdown,
    /// psql-like, no outer border
    Psql,
}

impl TableFormatter {
    /// Create a new table formatter with default settings
    pub fn new() -> Self {
        Self {
            max_column_width: DEFAULT_MAX_COLUMN_WIDTH,
            style: TableStyle::Psql,
            use_colors: false,
        }
    }

    /// Create a new table formatter with color support
    ///
    /// # Arguments
    /// * `use_colors` - Color the header row
    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            ..Self::new()
        }
    }

    /// Set the table style
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.style = style;
        self
    }

    /// Set maximum column width
    pub fn with_max_column_width(mut self, width: usize) -> Self {
        self.max_column_width = width;
        self
    }

    /// Format one page of rows under the given headers
    ///
    /// # Arguments
    /// * `columns` - Column names, in result-set order
    /// * `rows` - Rows to render
    ///
    /// # Returns
    /// * `Result<String>` - Table string
    pub fn format(&self, columns: &[&str], rows: &[Row]) -> Result<String> {
        if columns.is_empty() {
            return Ok("(no columns)".to_string());
        }
        if rows.is_empty() {
            return Ok("(empty result set)".to_string());
        }

        let mut builder = Builder::default();
        builder.push_record(columns.iter().map(|c| c.to_string()));
        for row in rows {
            // Short rows are padded so every record has one cell per column.
            let cells = (0..columns.len()).map(|i| row.get(i).map(format_cell).unwrap_or_default());
            builder.push_record(cells);
        }

        let mut table = builder.build();
        self.apply_style(&mut table);

        for i in 0..columns.len() {
            table.with(Modify::new(Columns::new(i..=i)).with(Width::wrap(self.max_column_width)));
        }
        table.with(Modify::new(Rows::first()).with(Alignment::center()));

        if self.use_colors {
            table.modify(Rows::first(), Color::FG_CYAN | Color::BOLD);
        }

        Ok(table.to_string())
    }

    fn apply_style(&self, table: &mut Table) {
        match self.style {
            TableStyle::Modern => table.with(Style::modern()),
            TableStyle::Ascii => table.with(Style::ascii()),
            TableStyle::Rounded => table.with(Style::rounded()),
            TableStyle::Markdown => table.with(Style::markdown()),
            TableStyle::Psql => table.with(Style::psql()),
        };
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Float(f) if f.fract() == 0.0 && f.abs() < 1e10 => format!("{f:.1}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_set() {
        let formatter = TableFormatter::new();
        assert_eq!(formatter.format(&["id"], &[]).unwrap(), "(empty result set)");
        assert_eq!(formatter.format(&[], &[]).unwrap(), "(no columns)");
    }

    #[test]
    fn test_header_and_cells() {
        let formatter = TableFormatter::new();
        let rows = vec![
            vec![Value::Int(1), Value::Text("Ada".to_string())],
            vec![Value::Int(2), Value::Bool(true)],
        ];
        let output = formatter.format(&["id", "name"], &rows).unwrap();
        let header = output.lines().next().unwrap();
        assert!(header.find("id").unwrap() < header.find("name").unwrap());
        assert!(output.contains("Ada"));
        assert!(output.contains("true"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let formatter = TableFormatter::new();
        let rows = vec![vec![Value::Int(7)]];
        let output = formatter.format(&["a", "b"], &rows).unwrap();
        assert!(output.contains('7'));
        assert_eq!(output.lines().count(), 3);
    }

    #[test]
    fn test_ascii_style() {
        let formatter = TableFormatter::new().with_style(TableStyle::Ascii);
        let output = formatter.format(&["x"], &[vec![Value::Float(2.0)]]).unwrap();
        assert!(output.contains('+'));
        assert!(output.contains("2.0"));
    }

    #[test]
    fn test_long_values_wrap() {
        let formatter = TableFormatter::new().with_max_column_width(10);
        let rows = vec![vec![Value::Text("x".repeat(30))]];
        let output = formatter.format(&["body"], &rows).unwrap();
        assert!(output.lines().count() > 3);
    }
}
