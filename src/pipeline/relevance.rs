//! Domain relevance filter.
//!
//! A candidate is kept when its embedding is close enough to at least one
//! reference term. Scores are computed one phrase at a time; references are
//! embedded once per filter.

use crate::error::KeywordError;
use crate::pipeline::embed::{cosine_similarity, Embedder};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Phrases a keyword must resemble to be kept.
pub const REFERENCE_TERMS: [&str; 2] = ["mathematics", "computer science"];

/// Inclusive cosine-similarity cut-off.
pub const RELEVANCE_THRESHOLD: f32 = 0.6;

/// Separator between keywords on the output line.
pub const OUTPUT_SEPARATOR: &str = ", ";

/// A candidate with its similarity to every reference term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub keyword: String,
    /// One entry per reference term, same order as [`REFERENCE_TERMS`].
    pub similarities: Vec<f32>,
    pub kept: bool,
}

impl ScoredKeyword {
    /// Highest similarity across the reference terms.
    pub fn best(&self) -> f32 {
        self.similarities
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// `true` when any similarity reaches the threshold.
pub fn is_relevant(similarities: &[f32]) -> bool {
    similarities.iter().any(|&s| s >= RELEVANCE_THRESHOLD)
}

/// Join keywords for display; no trailing separator.
pub fn join_keywords<S: AsRef<str>>(keywords: &[S]) -> String {
    keywords
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(OUTPUT_SEPARATOR)
}

/// Scores candidates against pre-embedded reference terms.
pub struct RelevanceFilter<'e> {
    embedder: &'e dyn Embedder,
    references: Vec<Vec<f32>>,
}

impl<'e> RelevanceFilter<'e> {
    /// Embed the reference terms once.
    pub fn new(embedder: &'e dyn Embedder) -> Result<Self, KeywordError> {
        let references = REFERENCE_TERMS
            .iter()
            .map(|term| embedder.embed(term))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            embedder,
            references,
        })
    }

    /// Score one keyword.
    pub fn score(&self, keyword: &str) -> Result<ScoredKeyword, KeywordError> {
        let vector = self.embedder.embed(keyword)?;
        let similarities: Vec<f32> = self
            .references
            .iter()
            .map(|r| cosine_similarity(&vector, r))
            .collect();
        let kept = is_relevant(&similarities);

        debug!("'{}' → {:?} kept={}", keyword, similarities, kept);

        Ok(ScoredKeyword {
            keyword: keyword.to_string(),
            similarities,
            kept,
        })
    }

    /// Score every candidate, preserving input order.
    pub fn score_all(&self, sorted: &[String]) -> Result<Vec<ScoredKeyword>, KeywordError> {
        sorted.iter().map(|k| self.score(k)).collect()
    }

    /// Keep the relevant candidates, preserving input order.
    pub fn filter(&self, sorted: &[String]) -> Result<Vec<String>, KeywordError> {
        Ok(self
            .score_all(sorted)?
            .into_iter()
            .filter(|s| s.kept)
            .map(|s| s.keyword)
            .collect())
    }
}
