//! # edgequake-keywords
//!
//! Extract computer-science and mathematics keywords from documents and
//! images with a remote language model, then keep only the keywords that a
//! SciBERT embedding places close to those domains.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Load     images → base64; PDF / Word / text → plain text
//!  ├─ 2. Split    1000-char chunks with a 10-char overlap
//!  ├─ 3. Prompt   one call per unit (llava:13b for images, phi3:14b for text)
//!  ├─ 4. Merge    split answers on ", ", deduplicate, sort case-insensitively
//!  ├─ 5. Filter   keep cosine ≥ 0.6 to "mathematics" or "computer science"
//!  └─ 6. Output   "kw1, kw2, kw3"
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_keywords::{extract_keywords, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .base_url("https://example.ngrok.app")
//!         .build()?;
//!     let output = extract_keywords("lecture-notes.pdf", &config).await?;
//!     println!("{}", output.keyword_line());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2kw` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-keywords = { version = "0.1", default-features = false }
//! ```
//!
//! PDF input needs the pdfium shared library at run time; see
//! [`KeywordError::PdfiumBindingFailed`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::KeywordError;
pub use extract::{extract_keywords, extract_keywords_sync, extract_keywords_with, resolve_backend};
pub use output::{ExtractionOutput, ExtractionStats};
pub use pipeline::embed::{Embedder, SciBertEmbedder};
pub use pipeline::llm::{CompletionBackend, OllamaBackend, ProviderBackend};
pub use pipeline::loader::{ContentUnit, ImageUnit, InputKind, TextChunk};
pub use pipeline::relevance::{ScoredKeyword, REFERENCE_TERMS, RELEVANCE_THRESHOLD};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
