//! Preview references and the object-URL registry that backs them.
//!
//! A preview reference is a handle a rendering surface can use as an image
//! source. Two kinds exist:
//!
//! * [`PreviewReference::Object`]: an `blob:`-style URL minted by the
//!   [`PreviewStore`] for bytes held in memory. These are the scarce,
//!   leak-prone handles: every one must be revoked once its asset is
//!   superseded or the view is torn down.
//! * [`PreviewReference::Remote`]: the original URL of a fetched source.
//!   Nothing is held locally, so releasing it is a no-op.
//!
//! `ObjectUrl` is neither `Clone` nor `Copy` and revoking takes it by value,
//! so a handle cannot be released twice.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// Scheme prefix of minted object URLs.
const OBJECT_URL_PREFIX: &str = "blob:imgrc/";

/// A live entry in a [`PreviewStore`].
#[derive(Debug, PartialEq, Eq)]
pub struct ObjectUrl {
    id: u64,
}

impl ObjectUrl {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{OBJECT_URL_PREFIX}{}", self.id)
    }
}

/// Handle a rendering surface displays an asset through.
#[derive(Debug, PartialEq, Eq)]
pub enum PreviewReference {
    Object(ObjectUrl),
    Remote(String),
}

impl PreviewReference {
    /// Stable textual form for logs and snapshots.
    pub fn href(&self) -> String {
        match self {
            PreviewReference::Object(url) => url.to_string(),
            PreviewReference::Remote(url) => url.clone(),
        }
    }
}

impl Serialize for PreviewReference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.href())
    }
}

/// Registry of object URLs, one per in-memory preview.
///
/// Each entry holds the displayable data URL produced by the image library.
#[derive(Debug, Default)]
pub struct PreviewStore {
    next_id: u64,
    entries: HashMap<u64, String>,
    revoked: u64,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a displayable source and mint a reference for it.
    pub fn create(&mut self, displayable: String) -> PreviewReference {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(id, displayable);
        debug!("Created preview {OBJECT_URL_PREFIX}{id} ({} live)", self.entries.len());
        PreviewReference::Object(ObjectUrl { id })
    }

    /// Resolve a reference to something an `<img src>` accepts.
    ///
    /// Returns `None` for an object URL that was already revoked.
    pub fn resolve<'a>(&'a self, reference: &'a PreviewReference) -> Option<&'a str> {
        match reference {
            PreviewReference::Object(url) => self.entries.get(&url.id).map(String::as_str),
            PreviewReference::Remote(url) => Some(url.as_str()),
        }
    }

    /// Release a reference. Remote references hold nothing and are dropped.
    pub fn revoke(&mut self, reference: PreviewReference) {
        if let PreviewReference::Object(url) = reference {
            if self.entries.remove(&url.id).is_some() {
                self.revoked += 1;
                debug!("Revoked preview {url} ({} live)", self.entries.len());
            } else {
                warn!("Preview {url} was not registered");
            }
        }
    }

    /// Number of object URLs currently held.
    pub fn live(&self) -> usize {
        self.entries.len()
    }

    /// Number of object URLs released so far.
    pub fn revoked(&self) -> u64 {
        self.revoked
    }

    /// Drop every entry. Used on teardown.
    pub fn clear(&mut self) {
        let n = self.entries.len() as u64;
        self.entries.clear();
        self.revoked += n;
    }
}
