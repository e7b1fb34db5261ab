//! Configuration types for keyword extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The inference endpoint is an explicit
//! field here; nothing in the library reads the environment on its own.
//!
//! The relevance threshold and the reference terms are fixed constants in
//! [`crate::pipeline::relevance`], not config fields.

use crate::error::KeywordError;
use crate::pipeline::llm::CompletionBackend;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default vision model used for image inputs.
pub const DEFAULT_IMAGE_MODEL: &str = "llava:13b";

/// Default text model used for document chunks.
pub const DEFAULT_TEXT_MODEL: &str = "phi3:14b";

/// Default Hugging Face repository of the relevance embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "allenai/scibert_scivocab_uncased";

/// Environment variable the CLI reads the inference base URL from.
pub const BASE_URL_ENV: &str = "ngrok_ollama_server";

/// Configuration for a keyword extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_keywords::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .base_url("http://localhost:11434")
///     .text_model("phi3:14b")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Base URL of the Ollama-compatible inference server.
    pub base_url: Option<String>,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    /// Takes precedence over `base_url` when set.
    pub provider_name: Option<String>,

    /// Pre-constructed backend. Takes precedence over everything else.
    pub backend: Option<Arc<dyn CompletionBackend>>,

    /// Model used for image inputs. Default: `llava:13b`.
    pub image_model: String,

    /// Model used for document chunks. Default: `phi3:14b`.
    pub text_model: String,

    /// Hugging Face repository id of the embedding model.
    pub embedding_model: String,

    /// Local directory holding the embedding model files. When set, nothing
    /// is downloaded.
    pub embedding_model_dir: Option<PathBuf>,

    /// Maximum chunk length in characters. Default: 1000.
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks. Default: 10.
    pub chunk_overlap: usize,

    /// Per-request timeout for the inference client. Default: none, the
    /// HTTP client waits as long as the server does.
    pub request_timeout_secs: Option<u64>,

    /// Receives stage events while the pipeline runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            provider_name: None,
            backend: None,
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_model_dir: None,
            chunk_size: 1000,
            chunk_overlap: 10,
            request_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("base_url", &self.base_url)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("image_model", &self.image_model)
            .field("text_model", &self.text_model)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_model_dir", &self.embedding_model_dir)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = model.into();
        self
    }

    pub fn embedding_model(mut self, repo: impl Into<String>) -> Self {
        self.config.embedding_model = repo.into();
        self
    }

    pub fn embedding_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.embedding_model_dir = Some(dir.into());
        self
    }

    pub fn chunk_size(mut self, n: usize) -> Self {
        self.config.chunk_size = n;
        self
    }

    pub fn chunk_overlap(mut self, n: usize) -> Self {
        self.config.chunk_overlap = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, KeywordError> {
        let c = &self.config;
        if c.chunk_size == 0 {
            return Err(KeywordError::InvalidConfig(
                "Chunk size must be ≥ 1".into(),
            ));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(KeywordError::InvalidConfig(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        for (field, value) in [
            ("image model", &c.image_model),
            ("text model", &c.text_model),
            ("embedding model", &c.embedding_model),
        ] {
            if value.trim().is_empty() {
                return Err(KeywordError::InvalidConfig(format!(
                    "The {field} name must not be empty"
                )));
            }
        }
        Ok(self.config)
    }
}
