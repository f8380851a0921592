// src/model.rs
// Snapshot records fetched fresh each run. Never mutated after parse.

use serde::{Deserialize, Serialize};

/// One row of a forum section listing. `id` is the stable comparison key
/// (e.g. "t31" extracted from the thread URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub url: String,
    pub last_post_date: String,
}

/// Cap `s` at `max` characters, appending an ellipsis when cut. Char-based
/// so multi-byte text never splits inside a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

/// One post inside a thread. IDs are unique within the thread and increase
/// in posting order; the client returns posts chronologically, which the
/// delta computation relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub author: String,
    /// Preview text, truncated by the parser.
    pub content: String,
    pub timestamp: String,
    pub url: String,
}
