//! Pipeline stages behind the native image library.
//!
//! Each submodule implements exactly one step, so each can be tested alone.
//! The view reaches them through the [`crate::library::ImageLibrary`] trait,
//! except for reading local paths, which goes straight to [`input`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ transform ──▶ encode
//! (path/URL)  (decode/resize/encode)  (data URL preview)
//! ```
//!
//! 1. [`input`]    : read a local file or download a URL into a `Blob`
//! 2. [`transform`]: decode, resize and re-encode; CPU-bound, callers run it
//!    in `spawn_blocking`
//! 3. [`encode`]   : base64-wrap a blob as a `data:` URL for previews

pub mod encode;
pub mod input;
pub mod transform;
