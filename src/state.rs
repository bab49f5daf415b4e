//! The converter view's state record and its transitions.
//!
//! All view state lives in one owned [`ViewState`]. It changes only through
//! [`ViewState::apply`], which consumes the old record and returns a
//! [`Step`]: the next record, what happened to the transition, and the
//! preview references the transition superseded. The caller must revoke
//! those references; the view does this in one place.
//!
//! ```text
//!            select / fetch ok            convert
//!   Empty ───────────────────▶ SourceLoaded ───────▶ Converting
//!                                  ▲   ▲                │   │
//!                     new source   │   │ dismiss   ok   │   │ error
//!                   (any phase) ───┘   │                ▼   ▼
//!                                      │  ConversionComplete ConversionFailed
//!                                      └──────────────────────────┘
//! ```
//!
//! ## Request sequencing
//!
//! Every acquisition and conversion is keyed by a sequence number allocated
//! when it starts. A completion is applied only if its number is still the
//! pending one of its kind; conversions additionally carry the source
//! generation they were started against. Anything else is discarded and its
//! preview released, so a slow reply can never overwrite newer state or
//! compute a delta against a replaced source.
//!
//! ## New-source policy
//!
//! Loading a new source clears the previous result and abandons any
//! in-flight conversion. The After pane is never shown next to a source it
//! was not converted from.

use crate::asset::{size_delta, Blob, Provenance, ResultAsset, SourceAsset};
use crate::config::ConversionParams;
use crate::preview::PreviewReference;
use serde::Serialize;
use tracing::debug;

/// Coarse phase of the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Empty,
    SourceLoaded,
    Converting,
    ConversionComplete,
    ConversionFailed,
}

/// Which step a notice reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    AcquisitionFailed,
    ConversionFailed,
}

/// A blocking, user-visible notification. Stays until dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Enabled state of the form's submit controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormControls {
    /// "Upload" (convert) button: needs a loaded source.
    pub upload_enabled: bool,
    /// "From URL" button: needs non-blank URL text.
    pub from_url_enabled: bool,
    /// Download button of the Before pane.
    pub source_download: bool,
    /// Download button of the After pane.
    pub result_download: bool,
}

/// Inputs to [`ViewState::apply`].
#[derive(Debug)]
pub enum Transition {
    /// The URL text field changed.
    UrlEdited(String),
    /// A file selection or URL fetch began.
    AcquisitionStarted,
    /// An acquisition resolved to bytes and a preview.
    SourceLoaded {
        request: u64,
        blob: Blob,
        preview: PreviewReference,
        provenance: Provenance,
    },
    /// An acquisition was rejected.
    AcquisitionFailed { request: u64, message: String },
    /// A conversion was submitted for the current source.
    ConversionStarted,
    /// The library returned a converted payload.
    ConversionSucceeded {
        request: u64,
        source_generation: u64,
        blob: Blob,
        preview: PreviewReference,
        params: ConversionParams,
    },
    /// The library rejected a conversion.
    ConversionFailed {
        request: u64,
        source_generation: u64,
        message: String,
    },
    /// A started conversion will never report back.
    ConversionAbandoned { request: u64 },
    /// The user acknowledged the current notice.
    NoticeDismissed,
}

/// What [`ViewState::apply`] did with a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The state changed.
    Applied,
    /// A request was started under this sequence number.
    Started(u64),
    /// A completion arrived for a request that is no longer current.
    Discarded,
    /// The transition is not valid in the current state.
    Rejected,
}

/// Result of applying one transition.
#[must_use = "superseded previews must be released"]
#[derive(Debug)]
pub struct Step {
    pub state: ViewState,
    pub outcome: Outcome,
    pub released: Vec<PreviewReference>,
}

/// The whole converter view state.
#[derive(Debug, Default)]
pub struct ViewState {
    phase: Phase,
    source: Option<SourceAsset>,
    result: Option<ResultAsset>,
    pending_url: String,
    notice: Option<Notice>,
    next_seq: u64,
    source_generation: u64,
    pending_acquisition: Option<u64>,
    pending_conversion: Option<u64>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn source(&self) -> Option<&SourceAsset> {
        self.source.as_ref()
    }

    pub fn result(&self) -> Option<&ResultAsset> {
        self.result.as_ref()
    }

    pub fn pending_url(&self) -> &str {
        &self.pending_url
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn source_generation(&self) -> u64 {
        self.source_generation
    }

    pub fn is_acquiring(&self) -> bool {
        self.pending_acquisition.is_some()
    }

    pub fn is_converting(&self) -> bool {
        self.pending_conversion.is_some()
    }

    /// Size delta in bytes, only when the result was made from the current source.
    pub fn delta_bytes(&self) -> Option<i64> {
        match (&self.source, &self.result) {
            (Some(source), Some(result)) if result.source_generation == source.generation => {
                Some(result.delta_bytes)
            }
            _ => None,
        }
    }

    pub fn controls(&self) -> FormControls {
        FormControls {
            upload_enabled: self.source.is_some(),
            from_url_enabled: !self.pending_url.trim().is_empty(),
            source_download: self.source.is_some(),
            result_download: self.result.is_some(),
        }
    }

    /// Consume the state and hand back every preview it still owns.
    pub fn into_previews(self) -> Vec<PreviewReference> {
        let mut previews = Vec::with_capacity(2);
        if let Some(source) = self.source {
            previews.push(source.preview);
        }
        if let Some(result) = self.result {
            previews.push(result.preview);
        }
        previews
    }

    fn allocate(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn is_current_conversion(&self, request: u64, source_generation: u64) -> bool {
        self.pending_conversion == Some(request)
            && self.source_generation == source_generation
            && self.source.is_some()
    }

    /// Apply one transition.
    pub fn apply(mut self, transition: Transition) -> Step {
        let mut released = Vec::new();

        let outcome = match transition {
            Transition::UrlEdited(url) => {
                self.pending_url = url;
                Outcome::Applied
            }

            Transition::AcquisitionStarted => {
                let seq = self.allocate();
                self.pending_acquisition = Some(seq);
                Outcome::Started(seq)
            }

            Transition::SourceLoaded {
                request,
                blob,
                preview,
                provenance,
            } => {
                if self.pending_acquisition != Some(request) {
                    debug!("Discarding stale source from request {request}");
                    released.push(preview);
                    Outcome::Discarded
                } else {
                    self.pending_acquisition = None;
                    self.pending_conversion = None;
                    self.source_generation += 1;
                    if let Some(old) = self.source.take() {
                        released.push(old.preview);
                    }
                    if let Some(old) = self.result.take() {
                        released.push(old.preview);
                    }
                    self.notice = None;
                    self.source = Some(SourceAsset {
                        blob,
                        preview,
                        provenance,
                        generation: self.source_generation,
                    });
                    self.phase = Phase::SourceLoaded;
                    Outcome::Applied
                }
            }

            Transition::AcquisitionFailed { request, message } => {
                if self.pending_acquisition != Some(request) {
                    debug!("Discarding stale acquisition failure from request {request}");
                    Outcome::Discarded
                } else {
                    self.pending_acquisition = None;
                    self.notice = Some(Notice {
                        kind: NoticeKind::AcquisitionFailed,
                        message,
                    });
                    Outcome::Applied
                }
            }

            Transition::ConversionStarted => {
                if self.source.is_none() {
                    Outcome::Rejected
                } else {
                    let seq = self.allocate();
                    self.pending_conversion = Some(seq);
                    self.phase = Phase::Converting;
                    Outcome::Started(seq)
                }
            }

            Transition::ConversionSucceeded {
                request,
                source_generation,
                blob,
                preview,
                params,
            } => match self.source.as_ref() {
                Some(source) if self.is_current_conversion(request, source_generation) => {
                    let delta_bytes = size_delta(&source.blob, &blob);
                    if let Some(old) = self.result.take() {
                        released.push(old.preview);
                    }
                    self.result = Some(ResultAsset {
                        blob,
                        preview,
                        params,
                        source_generation,
                        delta_bytes,
                    });
                    self.pending_conversion = None;
                    self.phase = Phase::ConversionComplete;
                    Outcome::Applied
                }
                _ => {
                    debug!("Discarding stale conversion result from request {request}");
                    released.push(preview);
                    Outcome::Discarded
                }
            },

            Transition::ConversionFailed {
                request,
                source_generation,
                message,
            } => {
                if !self.is_current_conversion(request, source_generation) {
                    debug!("Discarding stale conversion failure from request {request}");
                    Outcome::Discarded
                } else {
                    self.pending_conversion = None;
                    self.phase = Phase::ConversionFailed;
                    self.notice = Some(Notice {
                        kind: NoticeKind::ConversionFailed,
                        message,
                    });
                    Outcome::Applied
                }
            }

            Transition::ConversionAbandoned { request } => {
                if self.pending_conversion != Some(request) {
                    Outcome::Discarded
                } else {
                    debug!("Conversion {request} abandoned");
                    self.pending_conversion = None;
                    self.phase = if self.result.is_some() {
                        Phase::ConversionComplete
                    } else {
                        Phase::SourceLoaded
                    };
                    Outcome::Applied
                }
            }

            Transition::NoticeDismissed => {
                self.notice = None;
                if self.phase == Phase::ConversionFailed {
                    self.phase = Phase::SourceLoaded;
                }
                Outcome::Applied
            }
        };

        Step {
            state: self,
            outcome,
            released,
        }
    }

    /// Serialisable picture of the state for `--json` output and logging.
    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            phase: self.phase,
            pending_url: self.pending_url.clone(),
            notice: self.notice.clone(),
            controls: self.controls(),
            source: self.source.as_ref().map(|s| AssetSnapshot {
                name: s.blob.name.clone(),
                size: s.blob.size(),
                mime_type: s.blob.mime_type.clone(),
                preview: s.preview.href(),
                provenance: Some(s.provenance.clone()),
                params: None,
            }),
            result: self.result.as_ref().map(|r| AssetSnapshot {
                name: r.blob.name.clone(),
                size: r.blob.size(),
                mime_type: r.blob.mime_type.clone(),
                preview: r.preview.href(),
                provenance: None,
                params: Some(r.params),
            }),
            delta_bytes: self.delta_bytes(),
        }
    }
}

/// One pane of a [`ViewSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct AssetSnapshot {
    pub name: Option<String>,
    pub size: u64,
    pub mime_type: Option<String>,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ConversionParams>,
}

/// Serialisable copy of a [`ViewState`].
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub phase: Phase,
    pub pending_url: String,
    pub notice: Option<Notice>,
    pub controls: FormControls,
    pub source: Option<AssetSnapshot>,
    pub result: Option<AssetSnapshot>,
    pub delta_bytes: Option<i64>,
}
