//! Observer trait for converter-view events.
//!
//! Inject an [`Arc<dyn ViewObserver>`] via
//! [`crate::view::ConverterView::with_observer`] to hear about acquisitions,
//! conversions and notices as they happen. The CLI uses this to drive a
//! spinner and to print blocking notices; tests use it to count events.
//!
//! # Example
//!
//! ```rust
//! use imgrc::{Notice, ViewObserver};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct NoticeCounter {
//!     notices: AtomicUsize,
//! }
//!
//! impl ViewObserver for NoticeCounter {
//!     fn on_notice(&self, notice: &Notice) {
//!         self.notices.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}", notice.message);
//!     }
//! }
//! ```

use crate::asset::Blob;
use crate::config::ConversionParams;
use crate::state::Notice;
use std::sync::Arc;

/// Called by the converter view as requests start and settle.
///
/// All methods have default no-op implementations so implementors only
/// override what they care about. Implementations must be `Send + Sync`;
/// protect shared mutable state with atomics or a `Mutex`.
pub trait ViewObserver: Send + Sync {
    /// A file selection or URL fetch started.
    ///
    /// # Arguments
    /// * `request`: sequence number of the acquisition
    /// * `label`  : file name or URL being loaded
    fn on_acquisition_start(&self, request: u64, label: &str) {
        let _ = (request, label);
    }

    /// A new source replaced the previous one.
    fn on_source_loaded(&self, source: &Blob) {
        let _ = source;
    }

    /// A conversion was submitted.
    fn on_conversion_start(&self, request: u64, params: &ConversionParams) {
        let _ = (request, params);
    }

    /// A conversion result was applied.
    ///
    /// # Arguments
    /// * `result`     : the converted blob
    /// * `delta_bytes`: source size minus result size
    fn on_conversion_complete(&self, result: &Blob, delta_bytes: i64) {
        let _ = (result, delta_bytes);
    }

    /// A completion arrived for a request that is no longer current.
    fn on_discarded(&self, request: u64) {
        let _ = request;
    }

    /// A failure must be shown to the user.
    fn on_notice(&self, notice: &Notice) {
        let _ = notice;
    }
}

/// A no-op implementation for callers that don't need events.
///
/// This is the default when no observer is configured.
pub struct NoopObserver;

impl ViewObserver for NoopObserver {}

/// Convenience alias for the type stored in the view.
pub type SharedObserver = Arc<dyn ViewObserver>;
