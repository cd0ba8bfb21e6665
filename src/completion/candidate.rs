//! Completion values passed between the matchers and the shell.

use super::matcher::Priority;

/// Something that may be offered at the cursor, before it is matched
/// against the typed text.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Text inserted when the candidate is accepted
    pub completion: String,
    pub prio: i64,
    /// Shown next to the candidate; defaults to the matcher's kind
    pub meta: Option<String>,
    /// Spellings the typed text is matched against; the best one counts
    pub synonyms: Vec<String>,
    pub prio2: i64,
    pub display: String,
}

impl Candidate {
    pub fn new(completion: impl Into<String>) -> Self {
        let completion = completion.into();
        Self {
            synonyms: vec![completion.clone()],
            display: completion.clone(),
            completion,
            prio: 0,
            meta: None,
            prio2: 0,
        }
    }

    pub fn prio(mut self, prio: i64) -> Self {
        self.prio = prio;
        self
    }

    pub fn prio2(mut self, prio2: i64) -> Self {
        self.prio2 = prio2;
        self
    }

    pub fn meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    pub fn synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }
}

impl From<&str> for Candidate {
    fn from(s: &str) -> Self {
        Candidate::new(s)
    }
}

impl From<String> for Candidate {
    fn from(s: String) -> Self {
        Candidate::new(s)
    }
}

/// A suggestion ready for display.
///
/// `start_position` is the negated number of characters before the cursor
/// that `text` replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub start_position: isize,
    pub display: String,
    pub display_meta: Option<String>,
}

/// A completion together with its rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub completion: Completion,
    pub priority: Priority,
}
