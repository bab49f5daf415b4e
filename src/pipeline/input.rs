//! Input resolution: turn a local path or a URL into a [`Blob`].
//!
//! Local files are named after their file name and typed by sniffing the
//! magic bytes. Nothing here checks that the bytes really are an image the
//! converter can decode: an unsupported file is a conversion error, raised
//! later by the transform stage.
//!
//! Remote sources are fetched with `reqwest`. The body size is capped twice:
//! once from `Content-Length` before reading, once after, since the header
//! may be missing or wrong.

use crate::asset::Blob;
use crate::config::ConverterConfig;
use crate::error::ImgError;
use std::path::Path;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Guess the MIME type of an image payload from its leading bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Read a local file into a named, typed blob.
pub async fn read_local_file(path: &Path) -> Result<Blob, ImgError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ImgError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ImgError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ImgError::InvalidInput {
            input: format!("{} ({e})", path.display()),
        },
    })?;

    let mut blob = Blob::new(bytes);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        blob = blob.with_name(name);
    }
    if let Some(mime) = sniff_mime(blob.bytes()) {
        blob = blob.with_mime_type(mime);
    }

    debug!("Read local file {} ({} bytes)", path.display(), blob.size());
    Ok(blob)
}

/// Download a URL into a blob.
pub async fn fetch_url(
    client: &reqwest::Client,
    url: &str,
    config: &ConverterConfig,
) -> Result<Blob, ImgError> {
    if !is_url(url) {
        return Err(ImgError::InvalidInput {
            input: url.to_string(),
        });
    }
    info!("Downloading image from: {}", url);

    let response = client.get(url).send().await.map_err(|e| classify(url, e, config))?;

    check_status(url, response.status())?;
    if let Some(len) = response.content_length() {
        check_size(url, len, config.max_download_bytes)?;
    }

    let header_mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .filter(|v| v.starts_with("image/"));

    let bytes = response.bytes().await.map_err(|e| classify(url, e, config))?;

    check_size(url, bytes.len() as u64, config.max_download_bytes)?;

    let mut blob = Blob::new(bytes.to_vec());
    if let Some(name) = extract_filename(url) {
        blob = blob.with_name(name);
    }
    if let Some(mime) = header_mime.or_else(|| sniff_mime(&bytes).map(str::to_string)) {
        blob = blob.with_mime_type(mime);
    }

    info!("Downloaded {} bytes from {}", blob.size(), url);
    Ok(blob)
}

fn check_status(url: &str, status: reqwest::StatusCode) -> Result<(), ImgError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ImgError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {status}"),
        })
    }
}

fn check_size(url: &str, len: u64, limit: u64) -> Result<(), ImgError> {
    if len > limit {
        Err(ImgError::DownloadTooLarge {
            url: url.to_string(),
            limit,
        })
    } else {
        Ok(())
    }
}

fn classify(url: &str, e: reqwest::Error, config: &ConverterConfig) -> ImgError {
    if e.is_timeout() {
        ImgError::DownloadTimeout {
            url: url.to_string(),
            secs: config.download_timeout_secs,
        }
    } else {
        ImgError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Take a file name from the last URL path segment, if it has an extension.
pub fn extract_filename(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if !last.is_empty() && last.contains('.') {
        Some(last.to_string())
    } else {
        None
    }
}
