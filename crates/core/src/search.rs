//! Case-insensitive title search over user-supplied text.

use regex::{Regex, RegexBuilder};

use crate::error::{DomainError, DomainResult};

/// A literal, case-insensitive substring match.
///
/// User input is escaped before it becomes a pattern, so `.*` matches the two
/// characters `.` and `*` rather than everything.
#[derive(Debug, Clone)]
pub struct TitleSearch {
    needle: String,
    pattern: String,
    regex: Regex,
}

impl TitleSearch {
    /// Returns `Ok(None)` for blank input (no filtering).
    pub fn new(needle: &str) -> DomainResult<Option<Self>> {
        let needle = needle.trim();
        if needle.is_empty() {
            return Ok(None);
        }

        let pattern = regex::escape(needle);
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .size_limit(1 << 16)
            .build()
            .map_err(|e| DomainError::validation(format!("search: {e}")))?;

        Ok(Some(Self {
            needle: needle.to_string(),
            pattern,
            regex,
        }))
    }

    /// The escaped pattern, usable with a database case-insensitive regex
    /// operator.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, title: &str) -> bool {
        self.regex.is_match(title)
    }
}

impl PartialEq for TitleSearch {
    fn eq(&self, other: &Self) -> bool {
        self.needle == other.needle
    }
}
