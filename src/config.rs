//! Configuration types for image conversion.
//!
//! Two kinds of knobs live here:
//!
//! * [`ConversionParams`]: what the user types into the form: quality,
//!   width, height and output format. One value per conversion request.
//! * [`ConverterConfig`]: how the native library behaves: download
//!   timeout, body-size cap, resize filter. Set once per session and built
//!   via its [`ConverterConfigBuilder`].
//!
//! Parameter validation happens here, at the input layer. The conversion
//! request builder in [`crate::view`] trusts any `ConversionParams` it is
//! handed.

use crate::error::ImgError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default JPEG/WebP quality shown in the form.
pub const DEFAULT_QUALITY: u8 = 90;

/// Largest output width or height, in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// Largest output area, in pixels (256 MiB as RGBA).
pub const MAX_PIXELS: u64 = 64 * 1024 * 1024;

/// Reject an output size the converter would not be able to allocate.
pub fn check_output_size(width: u32, height: u32) -> Result<(), ImgError> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ImgError::InvalidParameters(format!(
            "output size {width}x{height} exceeds the {MAX_DIMENSION}px limit per side"
        )));
    }
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(ImgError::InvalidParameters(format!(
            "output size {width}x{height} exceeds the {MAX_PIXELS} pixel limit"
        )));
    }
    Ok(())
}

// ── Conversion parameters ────────────────────────────────────────────────

/// The quality/width/height/format tuple governing one conversion.
///
/// # Example
/// ```rust
/// use imgrc::{ConversionParams, OutputFormat};
///
/// let params = ConversionParams::from_form("75", "800", "0", "jpeg").unwrap();
/// assert_eq!(params.quality(), 75);
/// assert_eq!(params.width(), 800);
/// assert_eq!(params.format(), OutputFormat::Jpeg);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionParams {
    quality: u8,
    width: u32,
    height: u32,
    format: OutputFormat,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            width: 0,
            height: 0,
            format: OutputFormat::default(),
        }
    }
}

impl ConversionParams {
    /// Validate and assemble a parameter set.
    ///
    /// `quality` must lie in 1–100. `width` and `height` of 0 mean
    /// "unchanged on that axis"; neither may exceed [`MAX_DIMENSION`] and
    /// together they may not exceed [`MAX_PIXELS`].
    pub fn new(quality: u8, width: u32, height: u32, format: OutputFormat) -> Result<Self, ImgError> {
        if !(1..=100).contains(&quality) {
            return Err(ImgError::InvalidParameters(format!(
                "quality must be 1–100, got {quality}"
            )));
        }
        check_output_size(width, height)?;
        Ok(Self {
            quality,
            width,
            height,
            format,
        })
    }

    /// Parse the four raw form fields.
    ///
    /// Blank width/height fields count as 0, matching an untouched form.
    pub fn from_form(quality: &str, width: &str, height: &str, format: &str) -> Result<Self, ImgError> {
        let quality: u8 = quality.trim().parse().map_err(|_| {
            ImgError::InvalidParameters(format!("quality must be a number 1–100, got '{}'", quality.trim()))
        })?;
        let width = parse_dimension("width", width)?;
        let height = parse_dimension("height", height)?;
        let format: OutputFormat = format.parse()?;
        Self::new(quality, width, height, format)
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Same parameters with another output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// True when neither axis asks for a resize.
    pub fn keeps_dimensions(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

fn parse_dimension(field: &str, raw: &str) -> Result<u32, ImgError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse().map_err(|_| {
        ImgError::InvalidParameters(format!("{field} must be a whole number ≥ 0, got '{raw}'"))
    })
}

// ── Output format ────────────────────────────────────────────────────────

/// The four output formats the converter offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    /// Default selection in the form.
    #[default]
    Webp,
    Bmp,
    Jpeg,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Png,
        OutputFormat::Webp,
        OutputFormat::Bmp,
        OutputFormat::Jpeg,
    ];

    /// Form value and file extension.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Jpeg => "jpeg",
        }
    }

    /// MIME type of an image encoded in this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Bmp => "image/bmp",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    /// The `image` crate format used to encode this output.
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Webp => image::ImageFormat::WebP,
            OutputFormat::Bmp => image::ImageFormat::Bmp,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ImgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "bmp" => Ok(OutputFormat::Bmp),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(ImgError::InvalidParameters(format!(
                "unknown format '{other}' (choose: png, webp, bmp, jpeg)"
            ))),
        }
    }
}

// ── Native library configuration ─────────────────────────────────────────

/// Resampling filter used when a conversion resizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    /// Sharpest result; the default.
    #[default]
    Lanczos3,
}

impl ResizeFilter {
    pub fn filter_type(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Configuration for [`crate::library::NativeLibrary`].
///
/// # Example
/// ```rust
/// use imgrc::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .download_timeout_secs(30)
///     .max_download_bytes(10 * 1024 * 1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.download_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Timeout for URL sources in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Largest remote body accepted, in bytes. Default: 50 MiB.
    ///
    /// Checked against `Content-Length` up front and against the received
    /// body afterwards, since servers may omit or lie about the header.
    pub max_download_bytes: u64,

    /// Filter used when width or height asks for a resize. Default: Lanczos3.
    pub resize_filter: ResizeFilter,

    /// `User-Agent` sent with URL fetches.
    pub user_agent: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: 60,
            max_download_bytes: 50 * 1024 * 1024,
            resize_filter: ResizeFilter::default(),
            user_agent: concat!("imgrc/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_download_bytes(mut self, bytes: u64) -> Self {
        self.config.max_download_bytes = bytes;
        self
    }

    pub fn resize_filter(mut self, filter: ResizeFilter) -> Self {
        self.config.resize_filter = filter;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ImgError> {
        let c = &self.config;
        if c.download_timeout_secs == 0 {
            return Err(ImgError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_download_bytes == 0 {
            return Err(ImgError::InvalidConfig(
                "Maximum download size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}
