//! Parsing model answers and accumulating the candidate set.
//!
//! Answers are split on the literal `", "` separator and nothing else. A
//! model that answers with a numbered list or prose produces odd candidates
//! here; those are left for the relevance filter to reject.

use std::cmp::Ordering;
use std::collections::HashSet;

/// Separator the prompts ask the model to use between keywords.
pub const RESPONSE_SEPARATOR: &str = ", ";

/// Split a raw model answer into trimmed, non-empty candidate strings.
pub fn parse_response(raw: &str) -> Vec<String> {
    raw.trim()
        .split(RESPONSE_SEPARATOR)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-insensitive ordering with a case-sensitive tie-break so the order is
/// total and stable across runs.
pub fn case_insensitive_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Deduplicated, case-preserving set of candidate keywords.
///
/// `"Graph"` and `"graph"` are distinct members; exact duplicates collapse.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    inner: HashSet<String>,
}

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one keyword. Returns `false` for duplicates and blanks.
    pub fn insert(&mut self, keyword: impl Into<String>) -> bool {
        let keyword = keyword.into();
        let trimmed = keyword.trim();
        if trimmed.is_empty() {
            return false;
        }
        if trimmed.len() == keyword.len() {
            self.inner.insert(keyword)
        } else {
            self.inner.insert(trimmed.to_string())
        }
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.inner.contains(keyword)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Consume the set and return its members sorted case-insensitively.
    pub fn into_sorted(self) -> Vec<String> {
        let mut keywords: Vec<String> = self.inner.into_iter().collect();
        keywords.sort_by(|a, b| case_insensitive_cmp(a, b));
        keywords
    }
}

impl Extend<String> for KeywordSet {
    fn extend<T: IntoIterator<Item = String>>(&mut self, iter: T) {
        for keyword in iter {
            self.insert(keyword);
        }
    }
}

impl FromIterator<String> for KeywordSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        let mut set = KeywordSet::new();
        set.extend(iter);
        set
    }
}
