//! Error types for the imgrc library.
//!
//! A single fatal error type, [`ImgError`], covers every operation that can
//! fail: loading a source, fetching a URL, converting, writing a download.
//!
//! Inside the converter view these errors never escape as panics or silent
//! drops. Acquisition and conversion failures are caught where the library
//! call returns and turned into a [`crate::state::Notice`] that the view
//! keeps until the user dismisses it. Callers that drive the pipeline
//! directly (without the view) receive the `Err(ImgError)` as usual.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the imgrc library.
#[derive(Debug, Error)]
pub enum ImgError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The remote body is larger than the configured cap.
    #[error("Download of '{url}' exceeds the {limit} byte limit")]
    DownloadTooLarge { url: String, limit: u64 },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The source bytes could not be decoded as an image.
    #[error("Could not decode image{}: {detail}", quoted_name(.name))]
    DecodeFailed {
        name: Option<String>,
        detail: String,
    },

    /// The decoded image could not be encoded to the requested format.
    #[error("Could not encode image as {format}: {detail}")]
    EncodeFailed { format: String, detail: String },

    /// Conversion parameters failed validation at the input layer.
    #[error("Invalid conversion parameters: {0}")]
    InvalidParameters(String),

    /// A conversion was requested before any source was loaded.
    #[error("No source image loaded\nSelect a file or submit a URL first.")]
    NoSource,

    /// A result download was requested before any conversion succeeded.
    #[error("No converted image available\nConvert the source first.")]
    NoResult,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a downloaded file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn quoted_name(name: &Option<String>) -> String {
    name.as_deref().map(|n| format!(" '{n}'")).unwrap_or_default()
}

impl ImgError {
    /// True for failures that happened while obtaining the source bytes.
    pub fn is_acquisition(&self) -> bool {
        matches!(
            self,
            ImgError::FileNotFound { .. }
                | ImgError::PermissionDenied { .. }
                | ImgError::InvalidInput { .. }
                | ImgError::DownloadFailed { .. }
                | ImgError::DownloadTimeout { .. }
                | ImgError::DownloadTooLarge { .. }
        )
    }
}
