//! JSON output for result pages
//!
//! Each row becomes an object keyed by column name, in result-set order.

use serde_json::{Map, Value as JsonValue};

use crate::driver::{Row, Value};
use crate::error::{Result, SqlnavError};

/// JSON formatter with pretty printing support
pub struct JsonFormatter {
    /// Pretty-print as one array instead of one object per line
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Format rows as JSON lines, or as a pretty-printed array
    ///
    /// # Arguments
    /// * `columns` - Column names used as object keys
    /// * `rows` - Rows to render
    ///
    /// # Returns
    /// * `Result<String>` - JSON text or error
    pub fn format(&self, columns: &[&str], rows: &[Row]) -> Result<String> {
        let objects: Vec<JsonValue> = rows.iter().map(|row| row_to_object(columns, row)).collect();

        if self.pretty {
            return serde_json::to_string_pretty(&objects).map_err(json_error);
        }

        let lines = objects
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(json_error)?;
        Ok(lines.join("\n"))
    }
}

fn row_to_object(columns: &[&str], row: &Row) -> JsonValue {
    let mut object = Map::new();
    for (i, name) in columns.iter().enumerate() {
        let value = row.get(i).map(to_json).unwrap_or(JsonValue::Null);
        object.insert((*name).to_string(), value);
    }
    JsonValue::Object(object)
}

fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => JsonValue::from(*i),
        // NaN and infinities have no JSON form.
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(s) => JsonValue::String(s.clone()),
    }
}

fn json_error(err: serde_json::Error) -> SqlnavError {
    SqlnavError::Generic(format!("JSON encoding failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_array() {
        let rows = vec![vec![Value::Int(1), Value::Float(2.5)]];
        let output = JsonFormatter::new(true).format(&["a", "b"], &rows).unwrap();
        let parsed: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["a"], 1);
        assert_eq!(parsed[0]["b"], 2.5);
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_empty_page() {
        assert_eq!(JsonFormatter::new(false).format(&["a"], &[]).unwrap(), "");
        assert_eq!(JsonFormatter::new(true).format(&["a"], &[]).unwrap(), "[]");
    }

    #[test]
    fn test_non_finite_float_is_null() {
        let rows = vec![vec![Value::Float(f64::NAN)]];
        let output = JsonFormatter::new(false).format(&["x"], &rows).unwrap();
        assert_eq!(output, r#"{"x":null}"#);
    }
}
