//! Input loading: turn a file path into the content units sent to the model.
//!
//! The lowercased extension picks the branch:
//!
//! | Extension                          | Parser             | Units            |
//! |------------------------------------|--------------------|------------------|
//! | `.jpg .jpeg .png .gif .bmp`        | raw bytes → base64 | exactly one      |
//! | `.pdf`                             | pdfium, per page   | chunks per page  |
//! | `.doc .docx`                       | docx-rs            | chunks           |
//! | anything else                      | UTF-8 plain text   | chunks           |
//!
//! Existence and read permission are checked up front so the caller gets a
//! precise error instead of a parser failure.

use crate::config::ExtractionConfig;
use crate::error::KeywordError;
use crate::pipeline::split::TextSplitter;
use crate::pipeline::{docx, encode, pdf};
use crate::prompts;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extensions routed to the image branch (compared lowercased, without dot).
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "bmp"];

/// Handling branch selected from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Image,
    Pdf,
    Word,
    PlainText,
}

impl InputKind {
    /// Classify a path by its lowercased extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            e if IMAGE_EXTENSIONS.contains(&e) => InputKind::Image,
            "pdf" => InputKind::Pdf,
            "doc" | "docx" => InputKind::Word,
            _ => InputKind::PlainText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Image => "image",
            InputKind::Pdf => "pdf",
            InputKind::Word => "word",
            InputKind::PlainText => "text",
        }
    }
}

/// A whole image file, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUnit {
    pub base64: String,
    pub mime_type: &'static str,
}

/// One chunk of document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
}

/// One model call's worth of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentUnit {
    Image(ImageUnit),
    Text(TextChunk),
}

impl ContentUnit {
    /// The instruction string for this unit.
    pub fn prompt(&self) -> String {
        match self {
            ContentUnit::Image(img) => prompts::image_prompt(&img.base64),
            ContentUnit::Text(chunk) => prompts::text_prompt(&chunk.text),
        }
    }

    /// The model that should answer this unit.
    pub fn model<'c>(&self, config: &'c ExtractionConfig) -> &'c str {
        match self {
            ContentUnit::Image(_) => &config.image_model,
            ContentUnit::Text(_) => &config.text_model,
        }
    }

    /// The image to attach to the request, if any.
    pub fn image(&self) -> Option<&ImageUnit> {
        match self {
            ContentUnit::Image(img) => Some(img),
            ContentUnit::Text(_) => None,
        }
    }
}

/// Load a file and produce its content units in document order.
///
/// An empty document yields an empty vector, not an error.
pub async fn load_units(
    path: &Path,
    config: &ExtractionConfig,
) -> Result<(InputKind, Vec<ContentUnit>), KeywordError> {
    check_readable(path)?;

    let kind = InputKind::from_path(path);
    info!("Loading {} as {}", path.display(), kind.as_str());

    let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap);

    let units = match kind {
        InputKind::Image => vec![ContentUnit::Image(load_image(path)?)],
        InputKind::Pdf => {
            let pages = pdf::extract_pages(path).await?;
            text_units(&splitter, pages.iter().map(String::as_str))
        }
        InputKind::Word => {
            let text = docx::extract_text(path).await?;
            text_units(&splitter, [text.as_str()])
        }
        InputKind::PlainText => {
            let text = read_plain_text(path)?;
            text_units(&splitter, [text.as_str()])
        }
    };

    debug!("{} produced {} content units", path.display(), units.len());
    Ok((kind, units))
}

fn text_units<'a, I>(splitter: &TextSplitter, documents: I) -> Vec<ContentUnit>
where
    I: IntoIterator<Item = &'a str>,
{
    splitter
        .split_all(documents)
        .into_iter()
        .map(|text| ContentUnit::Text(TextChunk { text }))
        .collect()
}

/// Validate existence and read permission before any parser runs.
fn check_readable(path: &Path) -> Result<(), KeywordError> {
    if !path.exists() {
        return Err(KeywordError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(e) => Err(io_error(path, e)),
    }
}

fn load_image(path: &Path) -> Result<ImageUnit, KeywordError> {
    let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
    encode::encode_image(&bytes).map_err(|e| KeywordError::CorruptDocument {
        path: path.to_path_buf(),
        format: "image",
        detail: e.to_string(),
    })
}

fn read_plain_text(path: &Path) -> Result<String, KeywordError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => KeywordError::CorruptDocument {
            path: path.to_path_buf(),
            format: "UTF-8 text",
            detail: e.to_string(),
        },
        _ => io_error(path, e),
    })
}

fn io_error(path: &Path, e: std::io::Error) -> KeywordError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound => KeywordError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => KeywordError::PermissionDenied { path },
        _ => KeywordError::ReadFailed { path, source: e },
    }
}
