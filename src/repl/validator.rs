//! Validator for reedline - decides when a statement is ready to run

use reedline::{ValidationResult, Validator};

use crate::parser::{SqlLexer, TokenKind};

/// Accepts empty input, meta-commands, and SQL ending in `;`
pub struct SqlValidator;

impl SqlValidator {
    pub fn new() -> Self {
        Self
    }

    /// Whether the last significant token is a semicolon.
    ///
    /// Going through the lexer keeps `;` inside strings and comments from
    /// ending the statement.
    fn ends_with_semicolon(&self, input: &str) -> bool {
        matches!(
            SqlLexer::significant(input).last().map(|t| &t.kind),
            Some(TokenKind::Semicolon)
        )
    }
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for SqlValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('\\') || self.ends_with_semicolon(trimmed) {
            ValidationResult::Complete
        } else {
            ValidationResult::Incomplete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let validator = SqlValidator::new();
        assert!(matches!(validator.validate(""), ValidationResult::Complete));
        assert!(matches!(validator.validate("   "), ValidationResult::Complete));
    }

    #[test]
    fn test_meta_commands_complete_at_once() {
        let validator = SqlValidator::new();
        assert!(matches!(validator.validate("\\tree"), ValidationResult::Complete));
        assert!(matches!(validator.validate("  \\c shop"), ValidationResult::Complete));
    }

    #[test]
    fn test_statement_needs_semicolon() {
        let validator = SqlValidator::new();
        assert!(matches!(validator.validate("SELECT 1"), ValidationResult::Incomplete));
        assert!(matches!(validator.validate("SELECT 1;"), ValidationResult::Complete));
        assert!(matches!(
            validator.validate("SELECT *\nFROM orders ;  "),
            ValidationResult::Complete
        ));
    }

    #[test]
    fn test_semicolon_in_string_does_not_count() {
        let validator = SqlValidator::new();
        assert!(matches!(
            validator.validate("SELECT * FROM t WHERE a = ';'"),
            ValidationResult::Incomplete
        ));
    }
}
