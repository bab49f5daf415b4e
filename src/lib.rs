//! # imgrc
//!
//! Resize, compress and convert images, with a before/after view of the
//! result.
//!
//! ## Why this crate?
//!
//! Shrinking an image for the web usually means trying a few formats and
//! quality settings and comparing sizes. This crate keeps that loop in one
//! place: load a source (local file or URL), convert it, and read off how many
//! kilobytes the conversion saved or added. A converted result is never shown
//! next to a source it was not made from, and slow replies never overwrite
//! newer ones.
//!
//! ## Overview
//!
//! ```text
//! file / URL
//!  │
//!  ├─ 1. Acquire   read the file or download the URL        (view + library)
//!  ├─ 2. Preview   wrap bytes as a data URL, mint a handle  (preview store)
//!  ├─ 3. Convert   decode, resize, encode (spawn_blocking)  (library)
//!  └─ 4. Present   summaries, size delta, downloads, HTML   (present, page)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgrc::{ConversionParams, ConverterConfig, ConverterView, NativeLibrary, OutputFormat, Pane};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let library = Arc::new(NativeLibrary::new(ConverterConfig::default())?);
//!     let mut view = ConverterView::new(library);
//!
//!     view.load_path("photo.png").await;
//!     let params = ConversionParams::new(80, 1024, 0, OutputFormat::Jpeg)?;
//!     view.convert_from_source(params).await;
//!
//!     if let Some(delta) = view.state().delta_bytes() {
//!         println!("{}", imgrc::render_delta(delta));
//!     }
//!     view.download(Pane::After, "out".as_ref())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `imgrc` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! imgrc = { version = "0.1", default-features = false }
//! ```
//!
//! ## Output formats
//!
//! | Format | Quality | Notes |
//! |--------|---------|-------|
//! | `jpeg` | honoured | alpha is dropped |
//! | `png`  | ignored  | best compression, adaptive filter |
//! | `webp` | ignored  | lossless encoder |
//! | `bmp`  | ignored  | uncompressed |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod asset;
pub mod config;
pub mod error;
pub mod library;
pub mod observer;
pub mod page;
pub mod pipeline;
pub mod present;
pub mod preview;
pub mod state;
pub mod view;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use asset::{Blob, Provenance, ResultAsset, SourceAsset};
pub use config::{ConversionParams, ConverterConfig, ConverterConfigBuilder, OutputFormat, ResizeFilter};
pub use error::ImgError;
pub use library::{ImageLibrary, NativeLibrary};
pub use observer::{NoopObserver, SharedObserver, ViewObserver};
pub use page::render_page;
pub use present::{
    render_asset_summary, render_delta, suggested_download_name, trigger_download, AssetSummary, DeltaLabel,
    CONVERTED_SUFFIX, FALLBACK_DOWNLOAD_NAME, INCREASED_HINT,
};
pub use preview::{PreviewReference, PreviewStore};
pub use state::{FormControls, Notice, NoticeKind, Outcome, Phase, ViewSnapshot, ViewState};
pub use view::{AcquisitionOutcome, AcquisitionTicket, ConversionOutcome, ConversionTicket, ConverterView, Pane};
