//! Cache key conventions.
//!
//! Keys are plain strings of `-`-separated segments: `"<kind>-<id>"`, optionally
//! followed by qualifiers such as a sub-resource or the identity of the viewer
//! (`"event-42-attendance-ana@example.com"`). Keeping the kind and id first
//! lets a caller that only knows an id drop every key derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between key segments.
pub const KEY_DELIMITER: char = '-';

/// A conventionally-built cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// `"<kind>-<id>"`
    pub fn new(kind: &str, id: impl fmt::Display) -> Self {
        Self(format!("{kind}{KEY_DELIMITER}{id}"))
    }

    /// Append a qualifier segment.
    pub fn with(mut self, qualifier: impl fmt::Display) -> Self {
        self.0.push(KEY_DELIMITER);
        self.0.push_str(&qualifier.to_string());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// How a pattern passed to `invalidate_matching` selects keys.
///
/// An empty pattern matches nothing in either mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMatch {
    /// Pattern must cover whole segments: `event-42` matches `event-42` and
    /// `event-42-reviews` but not `event-421`.
    #[default]
    Segment,
    /// Plain containment: `event-42` also matches `event-421`.
    Substring,
}

impl KeyMatch {
    pub fn matches(self, key: &str, pattern: &str) -> bool {
        if pattern.is_empty() {
            return false;
        }

        match self {
            KeyMatch::Substring => key.contains(pattern),
            KeyMatch::Segment => segment_match(key, pattern),
        }
    }
}

fn segment_match(key: &str, pattern: &str) -> bool {
    let step = pattern.chars().next().map_or(1, char::len_utf8);
    let mut from = 0;

    while let Some(offset) = key[from..].find(pattern) {
        let start = from + offset;
        let end = start + pattern.len();

        let open = start == 0
            || pattern.starts_with(KEY_DELIMITER)
            || key[..start].ends_with(KEY_DELIMITER);
        let close = end == key.len()
            || pattern.ends_with(KEY_DELIMITER)
            || key[end..].starts_with(KEY_DELIMITER);

        if open && close {
            return true;
        }

        // occurrences may overlap
        from = start + step;
    }

    false
}
