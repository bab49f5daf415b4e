//! The image library boundary and its native implementation.
//!
//! The converter view never decodes or encodes anything itself. It reaches
//! an [`ImageLibrary`] through four calls:
//!
//! | Call              | Returns |
//! |-------------------|---------|
//! | `blob_to_preview` | a displayable data URL for a blob |
//! | `url_to_blob`     | the bytes behind a URL |
//! | `convert_blob`    | a converted blob from a blob |
//! | `convert_url`     | a converted blob from a URL |
//!
//! The trait is object safe (methods return boxed futures) so the view can
//! hold an `Arc<dyn ImageLibrary>` and tests can swap in a scripted fake.
//! [`NativeLibrary`] is the production implementation, built on the
//! `image` crate and `reqwest`.

use crate::asset::Blob;
use crate::config::{ConversionParams, ConverterConfig};
use crate::error::ImgError;
use crate::pipeline::{encode, input, transform};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::time::Duration;
use tracing::info;

/// Resize/compress/convert primitives the converter view is built on.
pub trait ImageLibrary: Send + Sync {
    /// Produce something a rendering surface can display for `blob`.
    fn blob_to_preview<'a>(&'a self, blob: &'a Blob) -> BoxFuture<'a, Result<String, ImgError>>;

    /// Fetch the bytes behind `url`.
    fn url_to_blob<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Blob, ImgError>>;

    /// Convert an in-memory image.
    fn convert_blob<'a>(
        &'a self,
        blob: &'a Blob,
        params: &'a ConversionParams,
    ) -> BoxFuture<'a, Result<Blob, ImgError>>;

    /// Fetch and convert the image behind `url`.
    fn convert_url<'a>(
        &'a self,
        url: &'a str,
        params: &'a ConversionParams,
    ) -> BoxFuture<'a, Result<Blob, ImgError>>;
}

/// Pure Rust implementation of [`ImageLibrary`].
#[derive(Debug, Clone)]
pub struct NativeLibrary {
    config: ConverterConfig,
    client: reqwest::Client,
}

impl NativeLibrary {
    pub fn new(config: ConverterConfig) -> Result<Self, ImgError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ImgError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    async fn convert(&self, blob: &Blob, params: ConversionParams) -> Result<Blob, ImgError> {
        let bytes = blob.shared_bytes();
        let name = blob.name.clone();
        let filter = self.config.resize_filter;

        info!(
            "Converting {} ({} bytes) → {} q{} {}x{}",
            name.as_deref().unwrap_or("<unnamed>"),
            bytes.len(),
            params.format(),
            params.quality(),
            params.width(),
            params.height()
        );

        tokio::task::spawn_blocking(move || {
            transform::convert_bytes(&bytes, name.as_deref(), &params, filter)
        })
        .await
        .map_err(|e| ImgError::Internal(format!("conversion task failed: {e}")))?
    }
}

impl ImageLibrary for NativeLibrary {
    fn blob_to_preview<'a>(&'a self, blob: &'a Blob) -> BoxFuture<'a, Result<String, ImgError>> {
        async move { Ok(encode::to_data_url(blob)) }.boxed()
    }

    fn url_to_blob<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Blob, ImgError>> {
        input::fetch_url(&self.client, url, &self.config).boxed()
    }

    fn convert_blob<'a>(
        &'a self,
        blob: &'a Blob,
        params: &'a ConversionParams,
    ) -> BoxFuture<'a, Result<Blob, ImgError>> {
        self.convert(blob, *params).boxed()
    }

    fn convert_url<'a>(
        &'a self,
        url: &'a str,
        params: &'a ConversionParams,
    ) -> BoxFuture<'a, Result<Blob, ImgError>> {
        async move {
            let source = input::fetch_url(&self.client, url, &self.config).await?;
            self.convert(&source, *params).await
        }
        .boxed()
    }
}
