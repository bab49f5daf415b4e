//! Result presenter: asset summaries, the size-delta label, downloads.
//!
//! Sizes are shown in kilobytes (bytes / 1024) with three decimals. The
//! delta is always source minus result: zero or more reads "Reduced", below
//! zero reads "Increased" with a hint to try another format or quality.

use crate::asset::Blob;
use crate::config::OutputFormat;
use crate::error::ImgError;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Download name used when the source has no name.
pub const FALLBACK_DOWNLOAD_NAME: &str = "image.png";

/// Advice shown next to an "Increased" delta.
pub const INCREASED_HINT: &str = "Try changing image format or quality";

/// Format a byte count (possibly negative) as kilobytes with 3 decimals.
pub fn size_kb(bytes: i64) -> String {
    format!("{:.3}", bytes as f64 / 1024.0)
}

/// Display fields of one pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub name: Option<String>,
    /// e.g. `"100.000kb"`
    pub size: String,
    pub mime_type: Option<String>,
}

impl fmt::Display for AssetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            writeln!(f, "Name: {name}")?;
        }
        write!(f, "Size: {}", self.size)?;
        if let Some(mime) = &self.mime_type {
            write!(f, "\nFormat: {mime}")?;
        }
        Ok(())
    }
}

/// Summarise a pane's blob. Pure.
pub fn render_asset_summary(blob: &Blob) -> AssetSummary {
    AssetSummary {
        name: blob.name.clone(),
        size: format!("{}kb", size_kb(blob.size() as i64)),
        mime_type: blob.mime_type.clone(),
    }
}

/// The size-delta readout of the After pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "kb", rename_all = "lowercase")]
pub enum DeltaLabel {
    /// Result is no larger than the source; kilobytes saved.
    Reduced(String),
    /// Result is larger than the source; kilobytes added.
    Increased(String),
}

impl DeltaLabel {
    /// Advice to show alongside the label, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            DeltaLabel::Reduced(_) => None,
            DeltaLabel::Increased(_) => Some(INCREASED_HINT),
        }
    }
}

impl fmt::Display for DeltaLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaLabel::Reduced(kb) => write!(f, "Reduced: {kb}kb"),
            DeltaLabel::Increased(kb) => write!(f, "Increased: {kb}kb"),
        }
    }
}

/// Label a delta of `source − result` bytes.
pub fn render_delta(delta_bytes: i64) -> DeltaLabel {
    if delta_bytes >= 0 {
        DeltaLabel::Reduced(size_kb(delta_bytes))
    } else {
        DeltaLabel::Increased(size_kb(-delta_bytes))
    }
}

/// Suffix added to a result name that would otherwise equal the source name.
pub const CONVERTED_SUFFIX: &str = "-converted";

/// Name to save a pane under.
///
/// Both panes use the source's name, falling back to
/// [`FALLBACK_DOWNLOAD_NAME`]. A result swaps the extension for its output
/// format. When that yields the source name again (`photo.webp` converted to
/// webp) the stem gets [`CONVERTED_SUFFIX`], so the two panes never share a
/// name.
pub fn suggested_download_name(source: Option<&Blob>, result_format: Option<OutputFormat>) -> String {
    let Some(name) = source.and_then(|s| s.name.as_deref()).filter(|n| !n.is_empty()) else {
        return FALLBACK_DOWNLOAD_NAME.to_string();
    };
    let Some(format) = result_format else {
        return name.to_string();
    };
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let swapped = format!("{stem}.{}", format.as_str());
    if swapped.eq_ignore_ascii_case(name) {
        format!("{stem}{CONVERTED_SUFFIX}.{}", format.as_str())
    } else {
        swapped
    }
}

/// Save `bytes` into `dir` under `suggested_name`.
///
/// Writes a temp file in the same directory and renames it into place, so a
/// failed download never leaves a partial file behind. Path components in
/// the name are stripped.
pub fn trigger_download(bytes: &[u8], suggested_name: &str, dir: &Path) -> Result<PathBuf, ImgError> {
    let file_name = Path::new(suggested_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_DOWNLOAD_NAME);
    let target = dir.join(file_name);

    let write_err = |source: std::io::Error| ImgError::OutputWriteFailed {
        path: target.clone(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(write_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(&target).map_err(|e| write_err(e.error))?;

    info!("Saved {} bytes to {}", bytes.len(), target.display());
    Ok(target)
}
