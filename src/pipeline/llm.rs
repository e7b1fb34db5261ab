//! Remote inference: send one prompt per content unit and parse the answer.
//!
//! The [`CompletionBackend`] trait is the seam between the pipeline and the
//! network. Two implementations ship with the crate:
//!
//! * [`OllamaBackend`] posts to `{base_url}/api/generate` of an
//!   Ollama-compatible server (the default, configured by URL).
//! * [`ProviderBackend`] routes through any `edgequake-llm` provider
//!   (OpenAI, Anthropic, Gemini, ...) selected by name.
//!
//! There is no retry: the first failure ends the run.

use crate::config::ExtractionConfig;
use crate::error::KeywordError;
use crate::pipeline::keywords::parse_response;
use crate::pipeline::loader::{ContentUnit, ImageUnit};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, ImageData, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// A text-completion endpoint.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Send `prompt` to `model` and return the raw answer text.
    ///
    /// `image` is the unit's picture when the prompt is about an image; the
    /// same payload is already interpolated into `prompt`.
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        image: Option<&ImageUnit>,
    ) -> Result<String, KeywordError>;
}

/// Ask the backend about one unit and split the answer into candidates.
pub async fn request_keywords(
    backend: &dyn CompletionBackend,
    unit: &ContentUnit,
    config: &ExtractionConfig,
) -> Result<Vec<String>, KeywordError> {
    let model = unit.model(config);
    let prompt = unit.prompt();
    let start = Instant::now();

    let raw = backend.complete(model, &prompt, unit.image()).await?;
    let keywords = parse_response(&raw);

    debug!(
        "{} / {}: {} prompt chars → {} answer chars, {} candidates, {:?}",
        backend.name(),
        model,
        prompt.len(),
        raw.len(),
        keywords.len(),
        start.elapsed()
    );

    Ok(keywords)
}

// ── Ollama ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for the Ollama `/api/generate` endpoint.
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaBackend {
    /// Create a client for the server at `base_url`.
    ///
    /// A trailing `/` on the URL is ignored.
    pub fn new(base_url: &str, timeout_secs: Option<u64>) -> Result<Self, KeywordError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(KeywordError::InvalidConfig(
                "Inference base URL must not be empty".into(),
            ));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| KeywordError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        image: Option<&ImageUnit>,
    ) -> Result<String, KeywordError> {
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            images: image.map(|img| vec![img.base64.as_str()]).unwrap_or_default(),
        };

        let fail = |message: String| KeywordError::InferenceFailed {
            model: model.to_string(),
            message,
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fail(format!("HTTP {}: {}", status, body.trim())));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| fail(format!("unexpected response body: {}", e)))?;

        Ok(body.response)
    }
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// Routes calls through `edgequake-llm` providers, one per model name.
pub struct ProviderBackend {
    provider_name: String,
    providers: Vec<(String, Arc<dyn LLMProvider>)>,
}

impl ProviderBackend {
    /// Create one provider per distinct model via
    /// [`ProviderFactory::create_llm_provider`]. Credentials come from the
    /// provider's usual environment variables.
    pub fn new(provider_name: &str, models: &[&str]) -> Result<Self, KeywordError> {
        let mut providers: Vec<(String, Arc<dyn LLMProvider>)> = Vec::new();
        for &model in models {
            if providers.iter().any(|(m, _)| m == model) {
                continue;
            }
            let provider =
                ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
                    KeywordError::BackendNotConfigured {
                        hint: format!(
                            "Could not create provider '{}' for model '{}'.\n\
                            Check the provider name and its API key env var.\n\
                            Error: {}",
                            provider_name, model, e
                        ),
                    }
                })?;
            providers.push((model.to_string(), provider));
        }

        Ok(Self {
            provider_name: provider_name.to_string(),
            providers,
        })
    }

    fn provider_for(&self, model: &str) -> Option<&Arc<dyn LLMProvider>> {
        self.providers
            .iter()
            .find(|(m, _)| m == model)
            .map(|(_, p)| p)
    }
}

#[async_trait]
impl CompletionBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        image: Option<&ImageUnit>,
    ) -> Result<String, KeywordError> {
        let provider = self
            .provider_for(model)
            .ok_or_else(|| KeywordError::InferenceFailed {
                model: model.to_string(),
                message: format!("no '{}' provider was created for this model", self.provider_name),
            })?;

        let message = match image {
            Some(img) => ChatMessage::user_with_images(
                prompt,
                vec![ImageData::new(img.base64.clone(), img.mime_type)],
            ),
            None => ChatMessage::user(prompt),
        };
        let messages = vec![message];

        let response = provider
            .chat(&messages, None)
            .await
            .map_err(|e| KeywordError::InferenceFailed {
                model: model.to_string(),
                message: format!("{}", e),
            })?;

        Ok(response.content)
    }
}
