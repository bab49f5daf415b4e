//! HTML rendering of the converter view.
//!
//! Produces one self-contained document: the conversion form, the URL form,
//! and the Before/After panes. Previews are resolved through the view's
//! [`PreviewStore`](crate::preview::PreviewStore) so a page written to disk
//! carries its images inline as `data:` URLs. Remote sources keep their
//! original URL.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.

use crate::asset::Blob;
use crate::config::{ConversionParams, OutputFormat};
use crate::present::{render_asset_summary, render_delta, suggested_download_name};
use crate::state::{FormControls, Notice};
use crate::view::ConverterView;
use maud::{html, Markup, DOCTYPE};

const CSS: &str = r#"
body { font-family: sans-serif; margin: 2rem; }
form { margin-bottom: 1rem; }
label { margin-right: 1rem; }
.url-input { width: 24rem; }
.notice { border: 1px solid #c00; padding: .5rem 1rem; color: #c00; }
.preview { display: flex; gap: 2rem; }
.image img { max-width: 32rem; }
.reduced { color: #080; }
.increased { color: #c00; }
"#;

/// Render the whole view, prefilling the form with `params`.
pub fn render_page(view: &ConverterView, params: &ConversionParams) -> String {
    let state = view.state();
    let controls = state.controls();

    let before = state.source().map(|source| {
        render_pane(
            "Before:",
            view.preview_src(&source.preview),
            &source.blob,
            None,
            &suggested_download_name(Some(&source.blob), None),
        )
    });

    let after = state.result().map(|result| {
        let delta = state.delta_bytes().map(render_delta_markup);
        render_pane(
            "After:",
            view.preview_src(&result.preview),
            &result.blob,
            delta,
            &suggested_download_name(
                state.source().map(|s| &s.blob),
                Some(result.params.format()),
            ),
        )
    });

    base_document(html! {
        h1 { "Image Resizer, Compressor and Converter" }
        @if let Some(notice) = state.notice() {
            (render_notice(notice))
        }
        (render_form(params, &controls))
        (render_url_form(state.pending_url(), &controls))
        br;
        div.preview {
            @if let Some(pane) = before { (pane) }
            @if let Some(pane) = after { (pane) }
        }
    })
    .into_string()
}

fn base_document(content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "imgrc" }
                style { (CSS) }
            }
            body {
                (content)
            }
        }
    }
}

fn render_notice(notice: &Notice) -> Markup {
    html! {
        div.notice role="alert" { (notice.message) }
    }
}

fn render_form(params: &ConversionParams, controls: &FormControls) -> Markup {
    html! {
        form method="post" {
            label {
                "Quality: "
                input type="number" name="quality" value=(params.quality()) min="1" max="100";
            }
            label {
                "Width: "
                input type="text" name="width" value=(params.width());
            }
            label {
                "Height: "
                input type="text" name="height" value=(params.height());
            }
            label {
                "Format: "
                select name="format" {
                    @for format in OutputFormat::ALL {
                        option value=(format.as_str()) selected[format == params.format()] {
                            (format.as_str())
                        }
                    }
                }
            }
            br;
            input type="file" name="file";
            button type="submit" disabled[!controls.upload_enabled] { "Upload" }
        }
    }
}

fn render_url_form(pending_url: &str, controls: &FormControls) -> Markup {
    html! {
        form method="post" {
            label { "or URL:" }
            br;
            input.url-input type="text" name="url" value=(pending_url)
                placeholder="Enter the image url";
            button type="submit" disabled[!controls.from_url_enabled] { "From URL" }
        }
    }
}

fn render_delta_markup(delta_bytes: i64) -> Markup {
    let label = render_delta(delta_bytes);
    let class = if label.hint().is_some() { "increased" } else { "reduced" };
    html! {
        span class=(class) {
            (label.to_string())
            @if let Some(hint) = label.hint() {
                br;
                (hint)
            }
        }
    }
}

fn render_pane(
    heading: &str,
    src: Option<&str>,
    blob: &Blob,
    delta: Option<Markup>,
    download_name: &str,
) -> Markup {
    let summary = render_asset_summary(blob);
    html! {
        div.image {
            h2 { (heading) }
            img src=[src] alt="";
            br;
            @if let Some(delta) = delta {
                (delta)
                br;
            }
            div.details {
                @if let Some(name) = &summary.name {
                    span { "Name: " (name) }
                    br;
                }
                span { "Size: " (summary.size) }
                br;
                @if let Some(mime) = &summary.mime_type {
                    span { "Format: " (mime) }
                    br;
                }
            }
            @if let Some(href) = src {
                a.download href=(href) download=(download_name) { "Download" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImgError;
    use crate::library::ImageLibrary;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::Arc;

    /// Halves every blob and previews it as a fixed data URL.
    struct Halving;

    impl ImageLibrary for Halving {
        fn blob_to_preview<'a>(&'a self, _blob: &'a Blob) -> BoxFuture<'a, Result<String, ImgError>> {
            async { Ok("data:image/png;base64,AAAA".to_string()) }.boxed()
        }

        fn url_to_blob<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Blob, ImgError>> {
            async move {
                Err(ImgError::DownloadFailed {
                    url: url.to_string(),
                    reason: "offline".into(),
                })
            }
            .boxed()
        }

        fn convert_blob<'a>(
            &'a self,
            blob: &'a Blob,
            params: &'a ConversionParams,
        ) -> BoxFuture<'a, Result<Blob, ImgError>> {
            let half = vec![0u8; blob.bytes().len() / 2];
            let mime = params.format().mime_type();
            async move { Ok(Blob::new(half).with_mime_type(mime)) }.boxed()
        }

        fn convert_url<'a>(
            &'a self,
            url: &'a str,
            _params: &'a ConversionParams,
        ) -> BoxFuture<'a, Result<Blob, ImgError>> {
            self.url_to_blob(url)
        }
    }

    fn view() -> ConverterView {
        ConverterView::new(Arc::new(Halving))
    }

    #[test]
    fn empty_view_disables_both_buttons() {
        let html = render_page(&view(), &ConversionParams::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<button type="submit" disabled>Upload</button>"#));
        assert!(html.contains(r#"<button type="submit" disabled>From URL</button>"#));
        assert!(!html.contains("Before:"));
        assert!(!html.contains("After:"));
    }

    #[test]
    fn form_is_prefilled() {
        let params = ConversionParams::new(75, 640, 0, OutputFormat::Jpeg).unwrap();
        let html = render_page(&view(), &params);
        assert!(html.contains(r#"name="quality" value="75""#));
        assert!(html.contains(r#"name="width" value="640""#));
        assert!(html.contains(r#"<option value="jpeg" selected>jpeg</option>"#));
        assert!(html.contains(r#"<option value="webp">webp</option>"#));
    }

    #[test]
    fn url_text_enables_from_url() {
        let mut v = view();
        v.set_remote_url("https://example.com/a.png");
        let html = render_page(&v, &ConversionParams::default());
        assert!(html.contains(r#"<button type="submit">From URL</button>"#));
        assert!(html.contains(r#"value="https://example.com/a.png""#));
    }

    #[tokio::test]
    async fn panes_show_summaries_and_delta() {
        let mut v = view();
        v.select_local_file(Blob::new(vec![0u8; 102_400]).with_name("cat.png").with_mime_type("image/png"))
            .await;
        v.convert_from_source(ConversionParams::default()).await;

        let html = render_page(&v, &ConversionParams::default());
        assert!(html.contains("Before:"));
        assert!(html.contains("After:"));
        assert!(html.contains("Name: cat.png"));
        assert!(html.contains("Size: 100.000kb"));
        assert!(html.contains("Size: 50.000kb"));
        assert!(html.contains("Reduced: 50.000kb"));
        assert!(html.contains(r#"download="cat.webp""#));
        assert!(html.contains(r#"src="data:image/png;base64,AAAA""#));
        assert!(html.contains(r#"<button type="submit">Upload</button>"#));
    }

    #[tokio::test]
    async fn failed_fetch_shows_notice() {
        let mut v = view();
        v.set_remote_url("https://example.com/missing.png");
        v.submit_remote_url().await;
        let html = render_page(&v, &ConversionParams::default());
        assert!(html.contains(r#"class="notice""#));
        assert!(html.contains("offline"));
        assert!(!html.contains("Before:"));
    }

    #[test]
    fn markup_is_escaped() {
        let mut v = view();
        v.set_remote_url(r#""><script>alert(1)</script>"#);
        let html = render_page(&v, &ConversionParams::default());
        assert!(!html.contains("<script>"));
    }
}
