//! Pipeline stages for keyword extraction.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! loader ──▶ split ──▶ llm ──▶ keywords ──▶ relevance
//! (by ext)   (chunks)  (model)  (dedupe)    (SciBERT ≥ 0.6)
//! ```
//!
//! 1. [`loader`]: classify the input by extension and produce content
//!    units; [`pdf`] and [`docx`] extract text, [`encode`] wraps images
//! 2. [`split`]: cut each logical document into overlapping chunks
//! 3. [`llm`]: one model call per unit, the only stage with network I/O
//! 4. [`keywords`]: parse answers and accumulate the deduplicated set
//! 5. [`relevance`]: embed every candidate with [`embed`] and keep those
//!    close enough to a reference term

pub mod docx;
pub mod embed;
pub mod encode;
pub mod keywords;
pub mod llm;
pub mod loader;
pub mod pdf;
pub mod relevance;
pub mod split;
