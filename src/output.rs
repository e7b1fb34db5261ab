//! Result types returned by [`crate::extract_keywords`].

use crate::pipeline::relevance::{join_keywords, ScoredKeyword};
use serde::{Deserialize, Serialize};

/// Everything a run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Kept keywords, deduplicated and sorted case-insensitively.
    pub keywords: Vec<String>,

    /// Every deduplicated candidate with its similarity scores, in the same
    /// order as `keywords`. Empty when no candidate reached the filter.
    pub candidates: Vec<ScoredKeyword>,

    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// The keywords joined with `", "`; empty when nothing was kept.
    pub fn keyword_line(&self) -> String {
        join_keywords(&self.keywords)
    }
}

/// Counters and stage timings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// `image`, `pdf`, `word` or `text`.
    pub input_kind: String,
    /// Content units produced by the loader.
    pub units: usize,
    /// Model calls made (equals `units` on success).
    pub model_calls: usize,
    /// Distinct candidates after deduplication.
    pub candidate_count: usize,
    pub kept_count: usize,
    pub load_duration_ms: u64,
    pub inference_duration_ms: u64,
    /// Embedding model load plus scoring.
    pub filter_duration_ms: u64,
    pub total_duration_ms: u64,
}
