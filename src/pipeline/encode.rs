//! Image encoding: raw file bytes → base64 payload with a MIME type.
//!
//! The bytes are validated by magic number only; nothing is decoded or
//! re-encoded, so the model receives exactly the file the user passed in.

use crate::pipeline::loader::ImageUnit;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Wrap raw image bytes in an [`ImageUnit`].
///
/// Fails when the bytes do not start with a known image signature, which
/// catches truncated downloads and files renamed to an image extension.
pub fn encode_image(bytes: &[u8]) -> Result<ImageUnit, image::ImageError> {
    let format = image::guess_format(bytes)?;
    let base64 = STANDARD.encode(bytes);
    debug!(
        "Encoded {:?} image: {} bytes → {} bytes base64",
        format,
        bytes.len(),
        base64.len()
    );

    Ok(ImageUnit {
        base64,
        mime_type: format.to_mime_type(),
    })
}
