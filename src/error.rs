//! Error types for the edgequake-keywords library.
//!
//! Every failure is fatal: the pipeline has no per-chunk recovery, so a
//! single [`KeywordError`] is returned from [`crate::extract_keywords`] and
//! the run stops. Variants are grouped by the stage that produced them so
//! the CLI can print an actionable hint.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-keywords library.
#[derive(Debug, Error)]
pub enum KeywordError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the file failed for another I/O reason.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// The file was read but its content could not be decoded by the parser
    /// selected from its extension.
    #[error("Cannot decode '{path}' as {format}: {detail}")]
    CorruptDocument {
        path: PathBuf,
        format: &'static str,
        detail: String,
    },

    /// Could not bind to a pdfium library for PDF text extraction.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF text extraction needs the pdfium shared library.\n\
  • Install it system-wide (e.g. libpdfium.so on the loader path), or\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Inference errors ──────────────────────────────────────────────────
    /// No inference backend could be constructed from the configuration.
    #[error("No inference backend is configured.\n{hint}")]
    BackendNotConfigured { hint: String },

    /// The remote model call failed (network, HTTP status, bad body).
    #[error("Inference call to model '{model}' failed: {message}")]
    InferenceFailed { model: String, message: String },

    // ── Embedding errors ──────────────────────────────────────────────────
    /// Embedding model or tokenizer files could not be fetched or parsed.
    #[error("Failed to load embedding model '{model}': {detail}")]
    EmbeddingModelLoad { model: String, detail: String },

    /// Tokenisation or the forward pass failed for a phrase.
    #[error("Embedding failed for '{phrase}': {detail}")]
    EmbeddingFailed { phrase: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
