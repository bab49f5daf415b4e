//! Preview encoding: blob → `data:` URL.
//!
//! A data URL is self-contained, so the HTML page and any other rendering
//! surface can display the image without a server. The MIME type falls back
//! to a sniff of the payload and then to `application/octet-stream`.

use crate::asset::Blob;
use crate::pipeline::input::sniff_mime;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Encode a blob as a `data:{mime};base64,{payload}` URL.
pub fn to_data_url(blob: &Blob) -> String {
    let mime = blob
        .mime_type
        .as_deref()
        .or_else(|| sniff_mime(blob.bytes()))
        .unwrap_or("application/octet-stream");

    let b64 = STANDARD.encode(blob.bytes());
    debug!("Encoded preview → {} bytes base64", b64.len());

    format!("data:{mime};base64,{b64}")
}
