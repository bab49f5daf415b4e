//! Data model: blobs and the two asset slots of the converter view.
//!
//! A [`Blob`] is what the image library trades in: bytes plus optional name
//! and MIME type. An asset is a blob the view is displaying, paired with the
//! [`PreviewReference`] the page renders it through.
//!
//! Assets are replaced wholesale, never mutated. Neither asset type is
//! `Clone`: each owns its preview reference, and that reference has to be
//! released exactly once when the asset is superseded.

use crate::config::ConversionParams;
use crate::preview::PreviewReference;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// An image payload with descriptive metadata.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    data: Arc<[u8]>,
    /// File name, when the payload came from a named file.
    pub name: Option<String>,
    /// MIME type, e.g. `image/webp`.
    pub mime_type: Option<String>,
}

impl Blob {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            name: None,
            mime_type: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the payload, cheap to move into blocking tasks.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("size", &self.data.len())
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Where the current source came from. Decides which conversion
/// primitive the request builder calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum Provenance {
    /// Picked from the local file system.
    LocalFile,
    /// Fetched from this URL.
    RemoteUrl(String),
}

/// The original image ("Before" pane).
#[derive(Debug)]
pub struct SourceAsset {
    pub blob: Blob,
    pub preview: PreviewReference,
    pub provenance: Provenance,
    /// Increments every time a new source replaces the old one.
    pub generation: u64,
}

/// The converted image ("After" pane).
#[derive(Debug)]
pub struct ResultAsset {
    pub blob: Blob,
    pub preview: PreviewReference,
    pub params: ConversionParams,
    /// Generation of the source this result was converted from.
    pub source_generation: u64,
    /// Source size minus result size; positive means the image shrank.
    pub delta_bytes: i64,
}

/// Signed size difference between a source and its conversion.
pub fn size_delta(source: &Blob, result: &Blob) -> i64 {
    source.size() as i64 - result.size() as i64
}
