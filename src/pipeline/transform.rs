//! Transform stage: decode → optional resize → encode.
//!
//! | Step   | How |
//! |--------|-----|
//! | Decode | `image::load_from_memory` (PNG, JPEG, WebP, BMP decoders) |
//! | Resize | `DynamicImage::resize_exact` with the configured filter |
//! | Encode | JPEG honours `quality`; PNG uses best compression; WebP is lossless; BMP is raw |
//!
//! The `image` crate only ships a lossless WebP encoder, so `quality` has no
//! effect on WebP or PNG output. A WebP result can therefore be larger than
//! a lossy source, which the presenter reports as "Increased".
//!
//! Everything here is synchronous and CPU-bound. Callers on an async runtime
//! run it inside `spawn_blocking`.

use crate::asset::Blob;
use crate::config::{check_output_size, ConversionParams, OutputFormat, ResizeFilter};
use crate::error::ImgError;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use tracing::debug;

/// Output size for a source of `src_w`×`src_h` given the requested axes.
///
/// 0 on both axes keeps the size. 0 on one axis scales that axis to keep the
/// aspect ratio. Both set resizes exactly.
pub fn target_dimensions(src_w: u32, src_h: u32, width: u32, height: u32) -> (u32, u32) {
    match (width, height) {
        (0, 0) => (src_w, src_h),
        (w, 0) => (w, scale(src_h, w, src_w)),
        (0, h) => (scale(src_w, h, src_h), h),
        (w, h) => (w, h),
    }
}

/// `other * target / base`, rounded, never below 1.
fn scale(other: u32, target: u32, base: u32) -> u32 {
    let base = u64::from(base.max(1));
    let scaled = (u64::from(other) * u64::from(target) + base / 2) / base;
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

/// Convert an encoded image to the requested format and size.
///
/// The returned blob carries the output MIME type and no name.
pub fn convert_bytes(
    bytes: &[u8],
    name: Option<&str>,
    params: &ConversionParams,
    filter: ResizeFilter,
) -> Result<Blob, ImgError> {
    let img = image::load_from_memory(bytes).map_err(|e| ImgError::DecodeFailed {
        name: name.map(str::to_string),
        detail: e.to_string(),
    })?;

    let (src_w, src_h) = (img.width(), img.height());
    let (w, h) = target_dimensions(src_w, src_h, params.width(), params.height());
    let img = if (w, h) == (src_w, src_h) {
        img
    } else {
        // A single requested axis can still scale the other one past the limit.
        check_output_size(w, h)?;
        debug!("Resizing {src_w}x{src_h} → {w}x{h}");
        img.resize_exact(w, h, filter.filter_type())
    };

    let encoded = encode(&img, params)?;
    debug!(
        "Encoded {} → {} bytes (quality {})",
        params.format(),
        encoded.len(),
        params.quality()
    );

    Ok(Blob::new(encoded).with_mime_type(params.format().mime_type()))
}

fn encode(img: &DynamicImage, params: &ConversionParams) -> Result<Vec<u8>, ImgError> {
    let mut buf = Vec::new();
    let written = match params.format() {
        // JPEG has no alpha channel.
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, params.quality())),
        OutputFormat::Png => DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(
            PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive),
        ),
        OutputFormat::Webp => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_with_encoder(WebPEncoder::new_lossless(&mut buf)),
        OutputFormat::Bmp => {
            DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(BmpEncoder::new(&mut buf))
        }
    };

    written.map_err(|e| ImgError::EncodeFailed {
        format: params.format().to_string(),
        detail: e.to_string(),
    })?;
    Ok(buf)
}
