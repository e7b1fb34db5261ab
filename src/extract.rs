//! Extraction entry points.
//!
//! A run is strictly sequential: load the file, send one prompt per content
//! unit in document order, merge the answers into one candidate set, then
//! score every candidate against the reference terms. The first error ends
//! the run and nothing partial is returned.

use crate::config::{ExtractionConfig, BASE_URL_ENV};
use crate::error::KeywordError;
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::embed::{Embedder, SciBertEmbedder};
use crate::pipeline::keywords::KeywordSet;
use crate::pipeline::llm::{self, CompletionBackend, OllamaBackend, ProviderBackend};
use crate::pipeline::loader::{self, ContentUnit, InputKind};
use crate::pipeline::relevance::{RelevanceFilter, ScoredKeyword};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extract domain keywords from a file.
///
/// This is the primary entry point for the library. The inference backend is
/// resolved from `config` (see [`resolve_backend`]) and the embedding model
/// named by `config.embedding_model` is loaded for the relevance filter.
///
/// A document with no text yields an empty output without contacting the
/// backend or loading the embedding model.
///
/// # Errors
/// Any failure is fatal: unreadable or undecodable input, no configured
/// backend, a failed model call, or a failed embedding.
pub async fn extract_keywords(
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, KeywordError> {
    let total_start = Instant::now();
    let path = input.as_ref();
    info!("Starting extraction: {}", path.display());

    // ── Step 1: Load and chunk ───────────────────────────────────────────
    let mut run = Run::load(path, config).await?;
    if run.units.is_empty() {
        return Ok(run.finish_empty(config, total_start));
    }

    // ── Step 2: Resolve backend ──────────────────────────────────────────
    let backend = resolve_backend(config, &run.units)?;

    // ── Step 3: Ask the model about every unit ───────────────────────────
    let candidates = run.infer(backend.as_ref(), config).await?;
    if candidates.is_empty() {
        return Ok(run.finish_empty(config, total_start));
    }

    // ── Step 4: Relevance filter ─────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_filter_start(candidates.len());
    }
    let filter_start = Instant::now();
    let repo = config.embedding_model.clone();
    let local_dir = config.embedding_model_dir.clone();
    let sorted = candidates.into_sorted();

    // Model loading and the forward passes are CPU-bound.
    let scored = tokio::task::spawn_blocking(move || {
        let embedder = SciBertEmbedder::load(&repo, local_dir.as_deref())?;
        RelevanceFilter::new(&embedder)?.score_all(&sorted)
    })
    .await
    .map_err(|e| KeywordError::Internal(format!("Relevance task panicked: {}", e)))??;
    run.filter_ms = elapsed_ms(filter_start);

    Ok(run.finish(scored, config, total_start))
}

/// Extract keywords with a caller-supplied backend and embedder.
///
/// `config.backend`, `provider_name`, `base_url` and the embedding model
/// fields are ignored. Filtering runs on the calling task.
pub async fn extract_keywords_with(
    input: impl AsRef<Path>,
    backend: &dyn CompletionBackend,
    embedder: &dyn Embedder,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, KeywordError> {
    let total_start = Instant::now();
    let path = input.as_ref();
    info!("Starting extraction: {} (backend: {})", path.display(), backend.name());

    let mut run = Run::load(path, config).await?;
    if run.units.is_empty() {
        return Ok(run.finish_empty(config, total_start));
    }

    let candidates = run.infer(backend, config).await?;
    if candidates.is_empty() {
        return Ok(run.finish_empty(config, total_start));
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_filter_start(candidates.len());
    }
    let filter_start = Instant::now();
    let scored = RelevanceFilter::new(embedder)?.score_all(&candidates.into_sorted())?;
    run.filter_ms = elapsed_ms(filter_start);

    Ok(run.finish(scored, config, total_start))
}

/// Synchronous wrapper around [`extract_keywords`].
///
/// Creates a temporary single-threaded tokio runtime internally.
pub fn extract_keywords_sync(
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, KeywordError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| KeywordError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_keywords(input, config))
}

/// Pick the inference backend, from most-specific to least-specific:
///
/// 1. **Pre-built backend** (`config.backend`), used as-is.
/// 2. **Named provider** (`config.provider_name`): one `edgequake-llm`
///    provider per model the units need, credentials from the provider's
///    usual env vars.
/// 3. **Base URL** (`config.base_url`): an Ollama-compatible server.
///
/// Blank names and URLs count as unset.
pub fn resolve_backend(
    config: &ExtractionConfig,
    units: &[ContentUnit],
) -> Result<Arc<dyn CompletionBackend>, KeywordError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if let Some(name) = non_blank(config.provider_name.as_deref()) {
        let mut models: Vec<&str> = Vec::new();
        for unit in units {
            let model = unit.model(config);
            if !models.contains(&model) {
                models.push(model);
            }
        }
        debug!("Using provider '{}' for models {:?}", name, models);
        return Ok(Arc::new(ProviderBackend::new(name, &models)?));
    }

    if let Some(url) = non_blank(config.base_url.as_deref()) {
        debug!("Using Ollama server at {}", url);
        return Ok(Arc::new(OllamaBackend::new(
            url,
            config.request_timeout_secs,
        )?));
    }

    Err(KeywordError::BackendNotConfigured {
        hint: format!(
            "Set the {} environment variable (or pass --base-url) to the \
            Ollama server URL, or choose an edgequake-llm provider with --provider.",
            BASE_URL_ENV
        ),
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// State carried between the stages of one run.
struct Run {
    kind: InputKind,
    units: Vec<ContentUnit>,
    model_calls: usize,
    load_ms: u64,
    inference_ms: u64,
    filter_ms: u64,
}

impl Run {
    async fn load(path: &Path, config: &ExtractionConfig) -> Result<Self, KeywordError> {
        let start = Instant::now();
        let (kind, units) = loader::load_units(path, config).await?;
        let load_ms = elapsed_ms(start);
        info!(
            "Loaded {} as {}: {} units in {}ms",
            path.display(),
            kind.as_str(),
            units.len(),
            load_ms
        );

        if let Some(ref cb) = config.progress_callback {
            cb.on_extraction_start(units.len());
        }

        Ok(Self {
            kind,
            units,
            model_calls: 0,
            load_ms,
            inference_ms: 0,
            filter_ms: 0,
        })
    }

    /// One call per unit, in order; answers merged into one set.
    async fn infer(
        &mut self,
        backend: &dyn CompletionBackend,
        config: &ExtractionConfig,
    ) -> Result<KeywordSet, KeywordError> {
        let start = Instant::now();
        let total = self.units.len();
        let mut candidates = KeywordSet::new();

        for (idx, unit) in self.units.iter().enumerate() {
            let n = idx + 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_unit_start(n, total);
            }

            let keywords = llm::request_keywords(backend, unit, config).await?;
            self.model_calls += 1;

            if let Some(ref cb) = config.progress_callback {
                cb.on_unit_complete(n, total, keywords.len());
            }
            candidates.extend(keywords);
        }

        self.inference_ms = elapsed_ms(start);
        info!(
            "{} model calls in {}ms: {} distinct candidates",
            self.model_calls,
            self.inference_ms,
            candidates.len()
        );
        Ok(candidates)
    }

    fn finish(
        self,
        scored: Vec<ScoredKeyword>,
        config: &ExtractionConfig,
        total_start: Instant,
    ) -> ExtractionOutput {
        let keywords: Vec<String> = scored
            .iter()
            .filter(|s| s.kept)
            .map(|s| s.keyword.clone())
            .collect();

        let stats = ExtractionStats {
            input_kind: self.kind.as_str().to_string(),
            units: self.units.len(),
            model_calls: self.model_calls,
            candidate_count: scored.len(),
            kept_count: keywords.len(),
            load_duration_ms: self.load_ms,
            inference_duration_ms: self.inference_ms,
            filter_duration_ms: self.filter_ms,
            total_duration_ms: elapsed_ms(total_start),
        };

        info!(
            "Extraction complete: {}/{} candidates kept, {}ms total",
            stats.kept_count, stats.candidate_count, stats.total_duration_ms
        );

        if let Some(ref cb) = config.progress_callback {
            cb.on_extraction_complete(stats.kept_count, stats.candidate_count);
        }

        ExtractionOutput {
            keywords,
            candidates: scored,
            stats,
        }
    }

    fn finish_empty(self, config: &ExtractionConfig, total_start: Instant) -> ExtractionOutput {
        info!("No candidates; nothing to filter");
        self.finish(Vec::new(), config, total_start)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::loader::{ImageUnit, TextChunk};

    fn text_unit() -> Vec<ContentUnit> {
        vec![ContentUnit::Text(TextChunk {
            text: "graphs".into(),
        })]
    }

    #[test]
    fn no_backend_is_an_error_with_hint() {
        let err = resolve_backend(&ExtractionConfig::default(), &text_unit())
            .err()
            .expect("should fail");
        assert!(matches!(err, KeywordError::BackendNotConfigured { .. }));
        assert!(err.to_string().contains(BASE_URL_ENV), "got: {err}");
    }

    #[test]
    fn blank_base_url_counts_as_unset() {
        let config = ExtractionConfig::builder().base_url("   ").build().unwrap();
        assert!(matches!(
            resolve_backend(&config, &text_unit()),
            Err(KeywordError::BackendNotConfigured { .. })
        ));
    }

    #[test]
    fn base_url_selects_ollama() {
        let config = ExtractionConfig::builder()
            .base_url("http://localhost:11434/")
            .build()
            .unwrap();
        let backend = resolve_backend(&config, &text_unit()).unwrap();
        assert_eq!(backend.name(), "ollama");
    }

    #[test]
    fn provider_name_selects_provider_backend() {
        let config = ExtractionConfig::builder()
            .provider_name("mock")
            .build()
            .unwrap();
        let backend = resolve_backend(&config, &text_unit()).unwrap();
        assert_eq!(backend.name(), "mock");
    }

    #[test]
    fn provider_name_wins_over_base_url() {
        let config = ExtractionConfig::builder()
            .provider_name("mock")
            .base_url("http://localhost:11434")
            .build()
            .unwrap();
        let backend = resolve_backend(&config, &text_unit()).unwrap();
        assert_eq!(backend.name(), "mock");
    }

    #[test]
    fn blank_provider_name_falls_through_to_base_url() {
        let config = ExtractionConfig::builder()
            .provider_name("  ")
            .base_url("http://localhost:11434")
            .build()
            .unwrap();
        let backend = resolve_backend(&config, &text_unit()).unwrap();
        assert_eq!(backend.name(), "ollama");
    }

    #[test]
    fn unknown_provider_name_is_not_configured() {
        let config = ExtractionConfig::builder()
            .provider_name("no-such-provider")
            .base_url("http://localhost:11434")
            .build()
            .unwrap();
        assert!(matches!(
            resolve_backend(&config, &text_unit()),
            Err(KeywordError::BackendNotConfigured { .. })
        ));
    }

    #[tokio::test]
    async fn provider_backend_serves_image_and_text_units() {
        let config = ExtractionConfig::builder()
            .provider_name("mock")
            .build()
            .unwrap();
        let units = vec![
            ContentUnit::Image(ImageUnit {
                base64: "QUJD".into(),
                mime_type: "image/png",
            }),
            ContentUnit::Text(TextChunk {
                text: "graphs".into(),
            }),
        ];
        let backend = resolve_backend(&config, &units).unwrap();

        for unit in &units {
            let keywords = llm::request_keywords(backend.as_ref(), unit, &config)
                .await
                .unwrap();
            assert_eq!(keywords, vec!["Mock response"]);
        }
    }

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank(Some("  x ")), Some("x"));
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(None), None);
    }
}
