//! The converter view: input acquisition, conversion requests, downloads.
//!
//! [`ConverterView`] owns the [`ViewState`] record, the [`PreviewStore`]
//! backing its preview references, and a handle to the [`ImageLibrary`].
//! Every user action is one of the methods below; each turns into
//! transitions on the state record.
//!
//! ## Two-phase requests
//!
//! Acquisitions and conversions are split into *begin* (synchronous: take a
//! ticket, update state), *resolve* (async: call the library; borrows
//! nothing from the view) and *finish* (synchronous: apply the completion if
//! it is still current). The convenience methods
//! ([`ConverterView::convert_from_source`] and friends) run all three in a
//! row. Callers that need overlapping requests hold tickets themselves:
//!
//! ```rust,no_run
//! # use imgrc::{ConverterView, ConversionParams, ConverterConfig, NativeLibrary};
//! # use std::sync::Arc;
//! # async fn demo() -> Result<(), imgrc::ImgError> {
//! let lib = Arc::new(NativeLibrary::new(ConverterConfig::default())?);
//! let mut view = ConverterView::new(lib);
//! view.load_path("photo.png").await;
//!
//! let first = view.begin_conversion(ConversionParams::default())?;
//! let second = view.begin_conversion(ConversionParams::default())?;
//! let (a, b) = futures::join!(first.resolve(), second.resolve());
//! view.finish_conversion(b); // applied
//! view.finish_conversion(a); // discarded: no longer current
//! # Ok(())
//! # }
//! ```

use crate::asset::{Blob, Provenance};
use crate::config::ConversionParams;
use crate::error::ImgError;
use crate::library::ImageLibrary;
use crate::observer::{NoopObserver, SharedObserver};
use crate::pipeline::input;
use crate::present::{suggested_download_name, trigger_download};
use crate::preview::{PreviewReference, PreviewStore};
use crate::state::{Outcome, Transition, ViewSnapshot, ViewState};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which pane a download targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Before,
    After,
}

// ── Tickets ──────────────────────────────────────────────────────────────

enum PendingSource {
    Blob(Blob),
    Path(PathBuf),
    Url(String),
}

/// A started acquisition. Resolve it, then hand the outcome back to
/// [`ConverterView::finish_acquisition`].
pub struct AcquisitionTicket {
    request: u64,
    source: PendingSource,
    library: Arc<dyn ImageLibrary>,
}

/// Where a loaded source should be displayed from.
enum Displayable {
    Data(String),
    Remote(String),
}

struct LoadedSource {
    blob: Blob,
    displayable: Displayable,
    provenance: Provenance,
}

/// A settled acquisition.
pub struct AcquisitionOutcome {
    request: u64,
    result: Result<LoadedSource, ImgError>,
}

impl AcquisitionTicket {
    pub fn request(&self) -> u64 {
        self.request
    }

    /// Call the library. Never touches view state.
    pub async fn resolve(self) -> AcquisitionOutcome {
        let library = self.library;
        let result = match self.source {
            PendingSource::Blob(blob) => local_source(library.as_ref(), blob).await,
            PendingSource::Path(path) => match input::read_local_file(&path).await {
                Ok(blob) => local_source(library.as_ref(), blob).await,
                Err(e) => Err(e),
            },
            PendingSource::Url(url) => library.url_to_blob(&url).await.map(|blob| LoadedSource {
                blob,
                displayable: Displayable::Remote(url.clone()),
                provenance: Provenance::RemoteUrl(url),
            }),
        };
        AcquisitionOutcome {
            request: self.request,
            result,
        }
    }
}

async fn local_source(library: &dyn ImageLibrary, blob: Blob) -> Result<LoadedSource, ImgError> {
    let preview = library.blob_to_preview(&blob).await?;
    Ok(LoadedSource {
        blob,
        displayable: Displayable::Data(preview),
        provenance: Provenance::LocalFile,
    })
}

enum ConversionInput {
    Blob(Blob),
    Url(String),
}

/// A started conversion.
///
/// The view stays in [`Phase::Converting`](crate::state::Phase) until the
/// ticket comes back through [`ConverterView::finish_conversion`] or
/// [`ConverterView::abandon_conversion`]. Dropping it does neither.
#[must_use = "hand the ticket back to finish_conversion or abandon_conversion"]
pub struct ConversionTicket {
    request: u64,
    source_generation: u64,
    input: ConversionInput,
    params: ConversionParams,
    library: Arc<dyn ImageLibrary>,
}

/// A settled conversion.
pub struct ConversionOutcome {
    request: u64,
    source_generation: u64,
    params: ConversionParams,
    result: Result<(Blob, String), ImgError>,
}

impl ConversionTicket {
    pub fn request(&self) -> u64 {
        self.request
    }

    /// Call the library. Never touches view state.
    pub async fn resolve(self) -> ConversionOutcome {
        let library = self.library.as_ref();
        let converted = match &self.input {
            ConversionInput::Blob(blob) => library.convert_blob(blob, &self.params).await,
            ConversionInput::Url(url) => library.convert_url(url, &self.params).await,
        };
        let result = match converted {
            Ok(blob) => match library.blob_to_preview(&blob).await {
                Ok(preview) => Ok((blob, preview)),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        ConversionOutcome {
            request: self.request,
            source_generation: self.source_generation,
            params: self.params,
            result,
        }
    }
}

// ── The view ─────────────────────────────────────────────────────────────

/// Single-page converter view over an [`ImageLibrary`].
pub struct ConverterView {
    state: ViewState,
    previews: PreviewStore,
    library: Arc<dyn ImageLibrary>,
    observer: SharedObserver,
}

impl fmt::Debug for ConverterView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterView")
            .field("state", &self.state)
            .field("previews", &self.previews)
            .field("library", &"<dyn ImageLibrary>")
            .finish()
    }
}

impl ConverterView {
    pub fn new(library: Arc<dyn ImageLibrary>) -> Self {
        Self {
            state: ViewState::new(),
            previews: PreviewStore::new(),
            library,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.state.snapshot()
    }

    /// Resolve a preview reference owned by this view for display.
    pub fn preview_src<'a>(&'a self, reference: &'a PreviewReference) -> Option<&'a str> {
        self.previews.resolve(reference)
    }

    /// Run one transition and release whatever it superseded.
    fn transition(&mut self, t: Transition) -> Outcome {
        let step = std::mem::take(&mut self.state).apply(t);
        self.state = step.state;
        for reference in step.released {
            self.previews.revoke(reference);
        }
        step.outcome
    }

    fn start(&mut self, t: Transition) -> Option<u64> {
        match self.transition(t) {
            Outcome::Started(seq) => Some(seq),
            _ => None,
        }
    }

    // ── Input acquisition ────────────────────────────────────────────────

    /// Take a ticket for loading an in-memory file.
    pub fn begin_local_file(&mut self, blob: Blob) -> AcquisitionTicket {
        let label = blob.name.clone().unwrap_or_else(|| "<unnamed file>".into());
        self.begin_acquisition(PendingSource::Blob(blob), &label)
    }

    /// Take a ticket for loading a file from disk.
    pub fn begin_path(&mut self, path: impl Into<PathBuf>) -> AcquisitionTicket {
        let path = path.into();
        let label = path.display().to_string();
        self.begin_acquisition(PendingSource::Path(path), &label)
    }

    /// Take a ticket for fetching the pending URL.
    ///
    /// Fails with [`ImgError::InvalidInput`] while the URL text is blank,
    /// mirroring the disabled "From URL" button.
    pub fn begin_remote_url(&mut self) -> Result<AcquisitionTicket, ImgError> {
        if !self.state.controls().from_url_enabled {
            return Err(ImgError::InvalidInput {
                input: self.state.pending_url().to_string(),
            });
        }
        let url = self.state.pending_url().trim().to_string();
        Ok(self.begin_acquisition(PendingSource::Url(url.clone()), &url))
    }

    fn begin_acquisition(&mut self, source: PendingSource, label: &str) -> AcquisitionTicket {
        let request = self
            .start(Transition::AcquisitionStarted)
            .unwrap_or_default();
        debug!("Acquisition {request} started: {label}");
        self.observer.on_acquisition_start(request, label);
        AcquisitionTicket {
            request,
            source,
            library: Arc::clone(&self.library),
        }
    }

    /// Apply a settled acquisition.
    pub fn finish_acquisition(&mut self, outcome: AcquisitionOutcome) -> Outcome {
        let request = outcome.request;
        let applied = match outcome.result {
            Ok(loaded) => {
                let preview = match loaded.displayable {
                    Displayable::Data(src) => self.previews.create(src),
                    Displayable::Remote(url) => PreviewReference::Remote(url),
                };
                let result = self.transition(Transition::SourceLoaded {
                    request,
                    blob: loaded.blob,
                    preview,
                    provenance: loaded.provenance,
                });
                if result == Outcome::Applied {
                    if let Some(source) = self.state.source() {
                        info!(
                            "Source loaded: {} ({} bytes)",
                            source.blob.name.as_deref().unwrap_or("<unnamed>"),
                            source.blob.size()
                        );
                        self.observer.on_source_loaded(&source.blob);
                    }
                }
                result
            }
            Err(e) => {
                warn!("Acquisition {request} failed: {e}");
                self.transition(Transition::AcquisitionFailed {
                    request,
                    message: e.to_string(),
                })
            }
        };
        self.report(request, applied);
        applied
    }

    /// Select an in-memory file as the new source.
    pub async fn select_local_file(&mut self, blob: Blob) -> Outcome {
        let ticket = self.begin_local_file(blob);
        let outcome = ticket.resolve().await;
        self.finish_acquisition(outcome)
    }

    /// Read a file from disk and select it as the new source.
    pub async fn load_path(&mut self, path: impl AsRef<Path>) -> Outcome {
        let ticket = self.begin_path(path.as_ref());
        let outcome = ticket.resolve().await;
        self.finish_acquisition(outcome)
    }

    /// Update the URL text field. Does not fetch.
    pub fn set_remote_url(&mut self, url: impl Into<String>) {
        let _ = self.transition(Transition::UrlEdited(url.into()));
    }

    /// Fetch the pending URL and select it as the new source.
    ///
    /// Returns [`Outcome::Rejected`] while the URL text is blank.
    pub async fn submit_remote_url(&mut self) -> Outcome {
        let ticket = match self.begin_remote_url() {
            Ok(ticket) => ticket,
            Err(e) => {
                debug!("URL submit ignored: {e}");
                return Outcome::Rejected;
            }
        };
        let outcome = ticket.resolve().await;
        self.finish_acquisition(outcome)
    }

    /// Fetch the pending URL, then convert it from the URL.
    ///
    /// Stops after the fetch if it did not produce a new source.
    pub async fn submit_remote_url_and_convert(&mut self, params: ConversionParams) -> Outcome {
        match self.submit_remote_url().await {
            Outcome::Applied => self.convert_from_source(params).await,
            other => other,
        }
    }

    // ── Conversion request builder ───────────────────────────────────────

    /// Take a ticket for converting the current source.
    pub fn begin_conversion(&mut self, params: ConversionParams) -> Result<ConversionTicket, ImgError> {
        let Some(source) = self.state.source() else {
            return Err(ImgError::NoSource);
        };
        let input = match &source.provenance {
            Provenance::LocalFile => ConversionInput::Blob(source.blob.clone()),
            Provenance::RemoteUrl(url) => ConversionInput::Url(url.clone()),
        };
        let source_generation = source.generation;

        let request = self
            .start(Transition::ConversionStarted)
            .ok_or(ImgError::NoSource)?;
        debug!("Conversion {request} started with {params:?}");
        self.observer.on_conversion_start(request, &params);

        Ok(ConversionTicket {
            request,
            source_generation,
            input,
            params,
            library: Arc::clone(&self.library),
        })
    }

    /// Apply a settled conversion.
    pub fn finish_conversion(&mut self, outcome: ConversionOutcome) -> Outcome {
        let ConversionOutcome {
            request,
            source_generation,
            params,
            result,
        } = outcome;

        let applied = match result {
            Ok((blob, preview_src)) => {
                let preview = self.previews.create(preview_src);
                let result = self.transition(Transition::ConversionSucceeded {
                    request,
                    source_generation,
                    blob,
                    preview,
                    params,
                });
                if result == Outcome::Applied {
                    if let Some(converted) = self.state.result() {
                        info!(
                            "Conversion {request} complete: {} bytes {} (delta {})",
                            converted.blob.size(),
                            params.format(),
                            converted.delta_bytes
                        );
                        self.observer
                            .on_conversion_complete(&converted.blob, converted.delta_bytes);
                    }
                }
                result
            }
            Err(e) => {
                warn!("Conversion {request} failed: {e}");
                self.transition(Transition::ConversionFailed {
                    request,
                    source_generation,
                    message: e.to_string(),
                })
            }
        };
        self.report(request, applied);
        applied
    }

    /// Give up on a conversion without waiting for it.
    ///
    /// Leaves any earlier result in place. A later outcome for the same
    /// ticket is discarded.
    pub fn abandon_conversion(&mut self, ticket: ConversionTicket) -> Outcome {
        let request = ticket.request;
        let outcome = self.transition(Transition::ConversionAbandoned { request });
        if outcome == Outcome::Applied {
            info!("Conversion {request} abandoned");
        }
        outcome
    }

    /// Convert the current source with `params`.
    ///
    /// Without a source this is [`Outcome::Rejected`], the same as pressing
    /// a disabled "Upload" button.
    pub async fn convert_from_source(&mut self, params: ConversionParams) -> Outcome {
        let ticket = match self.begin_conversion(params) {
            Ok(ticket) => ticket,
            Err(e) => {
                debug!("Conversion ignored: {e}");
                return Outcome::Rejected;
            }
        };
        let outcome = ticket.resolve().await;
        self.finish_conversion(outcome)
    }

    fn report(&self, request: u64, outcome: Outcome) {
        match outcome {
            Outcome::Discarded => self.observer.on_discarded(request),
            Outcome::Applied => {
                if let Some(notice) = self.state.notice() {
                    self.observer.on_notice(notice);
                }
            }
            Outcome::Started(_) | Outcome::Rejected => {}
        }
    }

    /// Acknowledge the current notice.
    pub fn dismiss_notice(&mut self) {
        let _ = self.transition(Transition::NoticeDismissed);
    }

    // ── Downloads ────────────────────────────────────────────────────────

    /// Save a pane's bytes into `dir`.
    pub fn download(&self, pane: Pane, dir: &Path) -> Result<PathBuf, ImgError> {
        let source = self.state.source().ok_or(ImgError::NoSource)?;
        match pane {
            Pane::Before => {
                let name = suggested_download_name(Some(&source.blob), None);
                trigger_download(source.blob.bytes(), &name, dir)
            }
            Pane::After => {
                let result = self.state.result().ok_or(ImgError::NoResult)?;
                let name = suggested_download_name(Some(&source.blob), Some(result.params.format()));
                trigger_download(result.blob.bytes(), &name, dir)
            }
        }
    }

    // ── Teardown ─────────────────────────────────────────────────────────

    /// Release every preview and reset to `Empty`.
    pub fn teardown(&mut self) {
        let state = std::mem::take(&mut self.state);
        for reference in state.into_previews() {
            self.previews.revoke(reference);
        }
        if self.previews.live() > 0 {
            debug!("Clearing {} orphaned previews", self.previews.live());
            self.previews.clear();
        }
    }
}

impl Drop for ConverterView {
    fn drop(&mut self) {
        self.teardown();
    }
}
