//! Converter view flows against a scripted image library.
//!
//! The scripted library answers instantly with sizes chosen by each test, so
//! these run without network access. The last test drives the real
//! `NativeLibrary` over a generated PNG.

use futures::future::BoxFuture;
use futures::FutureExt;
use imgrc::{
    render_delta, Blob, ConversionParams, ConverterConfig, ConverterView, ImageLibrary, ImgError,
    NativeLibrary, Notice, NoticeKind, OutputFormat, Outcome, Pane, Phase, PreviewReference,
    ViewObserver, INCREASED_HINT,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

type ConvertFn = dyn Fn(&Blob, &ConversionParams) -> Result<Blob, ImgError> + Send + Sync;
type FetchFn = dyn Fn(&str) -> Result<Blob, ImgError> + Send + Sync;

/// An `ImageLibrary` whose answers are closures, with call counters.
struct Scripted {
    convert: Box<ConvertFn>,
    fetch: Box<FetchFn>,
    blob_calls: AtomicUsize,
    url_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl Scripted {
    fn new(
        convert: impl Fn(&Blob, &ConversionParams) -> Result<Blob, ImgError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            convert: Box::new(convert),
            fetch: Box::new(|url| {
                Err(ImgError::DownloadFailed {
                    url: url.to_string(),
                    reason: "connection refused".into(),
                })
            }),
            blob_calls: AtomicUsize::new(0),
            url_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    fn with_fetch(
        mut self,
        fetch: impl Fn(&str) -> Result<Blob, ImgError> + Send + Sync + 'static,
    ) -> Self {
        self.fetch = Box::new(fetch);
        self
    }

    /// Every conversion yields `size` bytes.
    fn fixed(size: usize) -> Self {
        Self::new(move |_, params| Ok(Blob::new(vec![0u8; size]).with_mime_type(params.format().mime_type())))
    }
}

impl ImageLibrary for Scripted {
    fn blob_to_preview<'a>(&'a self, blob: &'a Blob) -> BoxFuture<'a, Result<String, ImgError>> {
        let mime = blob.mime_type.clone().unwrap_or_default();
        async move { Ok(format!("data:{mime};base64,")) }.boxed()
    }

    fn url_to_blob<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Blob, ImgError>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let result = (self.fetch)(url);
        async move { result }.boxed()
    }

    fn convert_blob<'a>(
        &'a self,
        blob: &'a Blob,
        params: &'a ConversionParams,
    ) -> BoxFuture<'a, Result<Blob, ImgError>> {
        self.blob_calls.fetch_add(1, Ordering::SeqCst);
        let result = (self.convert)(blob, params);
        async move { result }.boxed()
    }

    fn convert_url<'a>(
        &'a self,
        url: &'a str,
        params: &'a ConversionParams,
    ) -> BoxFuture<'a, Result<Blob, ImgError>> {
        self.url_calls.fetch_add(1, Ordering::SeqCst);
        let result = (self.fetch)(url).and_then(|blob| (self.convert)(&blob, params));
        async move { result }.boxed()
    }
}

#[derive(Default)]
struct Counting {
    notices: AtomicUsize,
    discarded: AtomicUsize,
    completed: AtomicUsize,
}

impl ViewObserver for Counting {
    fn on_conversion_complete(&self, _result: &Blob, _delta_bytes: i64) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_discarded(&self, _request: u64) {
        self.discarded.fetch_add(1, Ordering::SeqCst);
    }

    fn on_notice(&self, _notice: &Notice) {
        self.notices.fetch_add(1, Ordering::SeqCst);
    }
}

fn image(size: usize, name: &str) -> Blob {
    Blob::new(vec![7u8; size]).with_name(name).with_mime_type("image/png")
}

fn webp() -> ConversionParams {
    ConversionParams::default()
}

// ── Delta scenarios ──────────────────────────────────────────────────────────

#[tokio::test]
async fn halving_reports_reduced() {
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(51_200)));
    assert_eq!(view.select_local_file(image(102_400, "cat.png")).await, Outcome::Applied);
    assert_eq!(view.convert_from_source(webp()).await, Outcome::Applied);

    let state = view.state();
    assert_eq!(state.phase(), Phase::ConversionComplete);
    assert_eq!(state.delta_bytes(), Some(51_200));
    let label = render_delta(51_200);
    assert_eq!(label.to_string(), "Reduced: 50.000kb");
    assert_eq!(label.hint(), None);
}

#[tokio::test]
async fn growth_reports_increased_with_hint() {
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(20_480)));
    view.select_local_file(image(10_240, "icon.png")).await;
    view.convert_from_source(webp()).await;

    let delta = view.state().delta_bytes().expect("delta present");
    assert_eq!(delta, -10_240);
    let label = render_delta(delta);
    assert_eq!(label.to_string(), "Increased: 10.000kb");
    assert_eq!(label.hint(), Some(INCREASED_HINT));
    assert_eq!(INCREASED_HINT, "Try changing image format or quality");
}

#[tokio::test]
async fn same_size_counts_as_reduced() {
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(4096)));
    view.select_local_file(image(4096, "a.png")).await;
    view.convert_from_source(webp()).await;
    assert_eq!(view.state().delta_bytes(), Some(0));
    assert_eq!(render_delta(0).to_string(), "Reduced: 0.000kb");
}

// ── Acquisition ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_fetch_leaves_no_source() {
    let observer = Arc::new(Counting::default());
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(1))).with_observer(observer.clone());

    view.set_remote_url("https://example.com/missing.png");
    assert_eq!(view.submit_remote_url().await, Outcome::Applied);

    let state = view.state();
    assert!(state.source().is_none());
    assert_eq!(state.phase(), Phase::Empty);
    assert!(!state.controls().upload_enabled);
    assert_eq!(state.notice().map(|n| n.kind), Some(NoticeKind::AcquisitionFailed));
    assert!(state.notice().is_some_and(|n| n.message.contains("connection refused")));
    assert_eq!(observer.notices.load(Ordering::SeqCst), 1);

    assert_eq!(view.convert_from_source(webp()).await, Outcome::Rejected);
}

#[tokio::test]
async fn failed_fetch_keeps_previous_source() {
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(10)));
    view.select_local_file(image(100, "keep.png")).await;
    view.set_remote_url("https://example.com/missing.png");
    view.submit_remote_url().await;

    let source = view.state().source().expect("source kept");
    assert_eq!(source.blob.name.as_deref(), Some("keep.png"));
    assert!(view.state().notice().is_some());

    view.dismiss_notice();
    assert!(view.state().notice().is_none());
    assert_eq!(view.state().phase(), Phase::SourceLoaded);
}

#[tokio::test]
async fn blank_url_never_fetches() {
    let library = Arc::new(Scripted::fixed(1));
    let mut view = ConverterView::new(library.clone());

    assert!(!view.state().controls().from_url_enabled);
    assert_eq!(view.submit_remote_url().await, Outcome::Rejected);

    view.set_remote_url("   ");
    assert!(!view.state().controls().from_url_enabled);
    assert_eq!(view.submit_remote_url().await, Outcome::Rejected);
    assert!(matches!(view.begin_remote_url(), Err(ImgError::InvalidInput { .. })));

    assert_eq!(library.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_file_surfaces_notice() {
    let dir = tempfile::tempdir().unwrap();
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(1)));
    assert_eq!(view.load_path(dir.path().join("nope.png")).await, Outcome::Applied);
    let notice = view.state().notice().expect("notice");
    assert_eq!(notice.kind, NoticeKind::AcquisitionFailed);
    assert!(notice.message.contains("not found"));
}

#[tokio::test]
async fn url_source_converts_from_url() {
    let library = Arc::new(
        Scripted::fixed(300).with_fetch(|_| Ok(Blob::new(vec![1u8; 900]).with_name("remote.jpg"))),
    );
    let mut view = ConverterView::new(library.clone());

    view.set_remote_url(" https://example.com/remote.jpg ");
    assert_eq!(view.submit_remote_url_and_convert(webp()).await, Outcome::Applied);

    assert_eq!(library.url_calls.load(Ordering::SeqCst), 1);
    assert_eq!(library.blob_calls.load(Ordering::SeqCst), 0);

    let source = view.state().source().expect("source");
    assert_eq!(
        source.preview,
        PreviewReference::Remote("https://example.com/remote.jpg".into())
    );
    assert_eq!(view.state().delta_bytes(), Some(600));
    // Only the result preview lives in the store.
    assert_eq!(view.previews().live(), 1);
}

// ── Request ordering ─────────────────────────────────────────────────────────

/// Size of the converted blob follows the requested quality.
fn by_quality() -> Scripted {
    Scripted::new(|_, params| Ok(Blob::new(vec![0u8; params.quality() as usize * 10])))
}

#[tokio::test]
async fn older_conversion_cannot_overwrite_newer() {
    let observer = Arc::new(Counting::default());
    let mut view = ConverterView::new(Arc::new(by_quality())).with_observer(observer.clone());
    view.select_local_file(image(5000, "a.png")).await;

    let first = view
        .begin_conversion(ConversionParams::new(10, 0, 0, OutputFormat::Jpeg).unwrap())
        .unwrap();
    let second = view
        .begin_conversion(ConversionParams::new(20, 0, 0, OutputFormat::Jpeg).unwrap())
        .unwrap();
    assert!(second.request() > first.request());

    let (a, b) = futures::join!(first.resolve(), second.resolve());
    assert_eq!(view.finish_conversion(b), Outcome::Applied);
    assert_eq!(view.finish_conversion(a), Outcome::Discarded);

    let result = view.state().result().expect("result");
    assert_eq!(result.blob.size(), 200);
    assert_eq!(result.params.quality(), 20);
    assert_eq!(observer.completed.load(Ordering::SeqCst), 1);
    assert_eq!(observer.discarded.load(Ordering::SeqCst), 1);
    assert_eq!(view.previews().live(), 2);
}

#[tokio::test]
async fn conversion_for_replaced_source_is_dropped() {
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(10)));
    view.select_local_file(image(1000, "old.png")).await;

    let pending = view.begin_conversion(webp()).unwrap();
    view.select_local_file(image(2000, "new.png")).await;
    let outcome = pending.resolve().await;

    assert_eq!(view.finish_conversion(outcome), Outcome::Discarded);
    assert!(view.state().result().is_none());
    assert_eq!(view.state().phase(), Phase::SourceLoaded);
    assert_eq!(view.state().delta_bytes(), None);
    assert_eq!(view.previews().live(), 1);
}

#[tokio::test]
async fn abandoned_conversion_restores_the_result_pane() {
    let mut view = ConverterView::new(Arc::new(by_quality()));
    view.select_local_file(image(5000, "a.png")).await;
    view.convert_from_source(ConversionParams::new(30, 0, 0, OutputFormat::Jpeg).unwrap())
        .await;

    let ticket = view.begin_conversion(webp()).unwrap();
    assert_eq!(view.state().phase(), Phase::Converting);

    assert_eq!(view.abandon_conversion(ticket), Outcome::Applied);
    assert_eq!(view.state().phase(), Phase::ConversionComplete);
    assert_eq!(view.state().result().map(|r| r.params.quality()), Some(30));
    assert_eq!(view.state().delta_bytes(), Some(4700));

    // A fresh conversion is not blocked by the abandoned one.
    assert_eq!(view.convert_from_source(webp()).await, Outcome::Applied);
    assert_eq!(view.state().phase(), Phase::ConversionComplete);
}

#[tokio::test]
async fn later_file_selection_wins() {
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(10)));
    let first = view.begin_local_file(image(111, "first.png"));
    let second = view.begin_local_file(image(222, "second.png"));

    let (a, b) = futures::join!(first.resolve(), second.resolve());
    assert_eq!(view.finish_acquisition(b), Outcome::Applied);
    assert_eq!(view.finish_acquisition(a), Outcome::Discarded);

    let source = view.state().source().expect("source");
    assert_eq!(source.blob.name.as_deref(), Some("second.png"));
    assert_eq!(view.previews().live(), 1);
}

#[tokio::test]
async fn new_source_clears_previous_result() {
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(10)));
    view.select_local_file(image(1000, "a.png")).await;
    view.convert_from_source(webp()).await;
    assert!(view.state().result().is_some());

    view.select_local_file(image(2000, "b.png")).await;
    assert!(view.state().result().is_none());
    assert!(!view.state().controls().result_download);
    assert_eq!(view.previews().live(), 1);
}

// ── Failure handling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_conversion_keeps_result() {
    let library = Scripted::new(|_, params| {
        if params.format() == OutputFormat::Bmp {
            Err(ImgError::EncodeFailed {
                format: "bmp".into(),
                detail: "unsupported".into(),
            })
        } else {
            Ok(Blob::new(vec![0u8; 50]))
        }
    });
    let mut view = ConverterView::new(Arc::new(library));
    view.select_local_file(image(100, "a.png")).await;
    view.convert_from_source(webp()).await;

    let bmp = webp().with_format(OutputFormat::Bmp);
    assert_eq!(view.convert_from_source(bmp).await, Outcome::Applied);
    assert_eq!(view.state().phase(), Phase::ConversionFailed);
    assert_eq!(view.state().notice().map(|n| n.kind), Some(NoticeKind::ConversionFailed));
    assert_eq!(view.state().result().map(|r| r.blob.size()), Some(50));

    view.dismiss_notice();
    assert_eq!(view.state().phase(), Phase::SourceLoaded);
    assert!(view.state().result().is_some());
}

// ── Previews & teardown ──────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_conversions_do_not_leak_previews() {
    let mut view = ConverterView::new(Arc::new(by_quality()));
    view.select_local_file(image(5000, "a.png")).await;
    for q in 1..=10 {
        let params = ConversionParams::new(q, 0, 0, OutputFormat::Png).unwrap();
        view.convert_from_source(params).await;
        assert_eq!(view.previews().live(), 2);
    }
    assert_eq!(view.previews().revoked(), 9);

    view.teardown();
    assert_eq!(view.previews().live(), 0);
    assert_eq!(view.state().phase(), Phase::Empty);
}

// ── Downloads ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unnamed_source_downloads_as_image_png() {
    let dir = tempfile::tempdir().unwrap();
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(10)));
    view.select_local_file(Blob::new(vec![1u8; 64])).await;
    view.convert_from_source(webp()).await;

    let after = view.download(Pane::After, dir.path()).unwrap();
    assert_eq!(after.file_name().and_then(|n| n.to_str()), Some("image.png"));
    assert_eq!(std::fs::read(&after).unwrap().len(), 10);
}

#[tokio::test]
async fn downloads_need_the_pane() {
    let dir = tempfile::tempdir().unwrap();
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(10)));
    assert!(matches!(view.download(Pane::Before, dir.path()), Err(ImgError::NoSource)));

    view.select_local_file(image(64, "pic.png")).await;
    let err = view.download(Pane::After, dir.path()).unwrap_err();
    assert!(matches!(err, ImgError::NoResult));
    assert!(err.to_string().contains("Convert the source first."));
    let before = view.download(Pane::Before, dir.path()).unwrap();
    assert_eq!(before, dir.path().join("pic.png"));
}

#[tokio::test]
async fn both_panes_save_side_by_side() {
    let dir = tempfile::tempdir().unwrap();
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(10)));
    view.select_local_file(Blob::new(vec![3u8; 64]).with_name("photo.webp")).await;
    view.convert_from_source(webp()).await;

    let before = view.download(Pane::Before, dir.path()).unwrap();
    let after = view.download(Pane::After, dir.path()).unwrap();
    assert_ne!(before, after);
    assert_eq!(after, dir.path().join("photo-converted.webp"));
    assert_eq!(std::fs::read(&before).unwrap(), vec![3u8; 64]);
    assert_eq!(std::fs::read(&after).unwrap().len(), 10);
}

#[test]
fn snapshot_from_blocking_context() {
    let mut view = ConverterView::new(Arc::new(Scripted::fixed(25)));
    tokio_test::block_on(async {
        view.select_local_file(image(100, "a.png")).await;
        view.convert_from_source(webp()).await;
    });
    let json = serde_json::to_value(view.snapshot()).unwrap();
    assert_eq!(json["phase"], "conversion_complete");
    assert_eq!(json["delta_bytes"], 75);
    assert_eq!(json["result"]["params"]["format"], "webp");
}

// ── Native library ───────────────────────────────────────────────────────────

#[tokio::test]
async fn native_round_trip_through_the_view() {
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("tile.png");
    let img = RgbaImage::from_fn(16, 8, |x, y| Rgba([(x * 16) as u8, (y * 32) as u8, 128, 255]));
    DynamicImage::ImageRgba8(img).save_with_format(&src, ImageFormat::Png).unwrap();

    let library = NativeLibrary::new(ConverterConfig::default()).unwrap();
    let mut view = ConverterView::new(Arc::new(library));
    assert_eq!(view.load_path(&src).await, Outcome::Applied);
    assert_eq!(view.state().source().unwrap().blob.mime_type.as_deref(), Some("image/png"));

    let params = ConversionParams::new(70, 4, 0, OutputFormat::Jpeg).unwrap();
    assert_eq!(view.convert_from_source(params).await, Outcome::Applied);

    let out_dir = dir.path().join("out");
    let saved = view.download(Pane::After, &out_dir).unwrap();
    assert_eq!(saved, out_dir.join("tile.jpeg"));
    let decoded = image::open(&saved).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (4, 2));
}

#[tokio::test]
async fn oversized_resize_becomes_a_conversion_notice() {
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("strip.png");
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 64, Rgba([0, 0, 0, 255])))
        .save_with_format(&src, ImageFormat::Png)
        .unwrap();

    let library = NativeLibrary::new(ConverterConfig::default()).unwrap();
    let mut view = ConverterView::new(Arc::new(library));
    view.load_path(&src).await;

    // Width alone is within bounds; the derived height is not.
    let params = ConversionParams::new(90, 16_384, 0, OutputFormat::Png).unwrap();
    assert_eq!(view.convert_from_source(params).await, Outcome::Applied);
    assert_eq!(view.state().phase(), Phase::ConversionFailed);
    assert_eq!(view.state().notice().map(|n| n.kind), Some(NoticeKind::ConversionFailed));
    assert!(view.state().result().is_none());

    assert!(matches!(
        ConversionParams::new(90, u32::MAX, u32::MAX, OutputFormat::Png),
        Err(ImgError::InvalidParameters(_))
    ));
}
