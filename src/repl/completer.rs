//! Completer for reedline - adapts the completion engine

use std::sync::Arc;

use reedline::{Completer, Span, Suggestion};

use crate::completion::CompletionEngine;

/// SQL completer for reedline
pub struct SqlCompleter {
    engine: Arc<CompletionEngine>,
}

impl SqlCompleter {
    pub fn new(engine: Arc<CompletionEngine>) -> Self {
        Self { engine }
    }
}

/// Byte offset reached by stepping `chars` characters back from `pos`.
fn span_start(line: &str, pos: usize, chars: usize) -> usize {
    if chars == 0 {
        return pos;
    }
    line[..pos]
        .char_indices()
        .rev()
        .nth(chars - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

impl Completer for SqlCompleter {
    /// Complete the input at byte offset `pos`
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let mut pos = pos.min(line.len());
        while !line.is_char_boundary(pos) {
            pos -= 1;
        }

        self.engine
            .get_completions(line, pos)
            .into_iter()
            .map(|completion| {
                let back = completion.start_position.unsigned_abs();
                Suggestion {
                    value: completion.text,
                    description: completion.display_meta,
                    style: None,
                    extra: None,
                    span: Span::new(span_start(line, pos, back), pos),
                    append_whitespace: false,
                    match_indices: None,
                }
            })
            .collect()
    }
}
