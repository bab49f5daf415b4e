//! CLI binary for imgrc.
//!
//! A thin shim over the library crate: maps flags to `ConverterConfig` and
//! `ConversionParams`, drives a `ConverterView`, and prints the Before/After
//! panes.

use anyhow::{Context, Result};
use clap::Parser;
use imgrc::{
    render_asset_summary, render_delta, render_page, ConversionParams, ConverterConfig, ConverterView,
    ImageLibrary, NativeLibrary, Notice, OutputFormat, Outcome, Pane, ResizeFilter, ViewObserver,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner while a request is in flight, one log line
/// per settled request.
struct CliObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn spin(&self, prefix: &str, msg: String) {
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.set_prefix(prefix.to_string());
        bar.set_message(msg);
        bar.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(old) = slot.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    fn settle(&self, line: String) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
        eprintln!("{line}");
    }
}

impl ViewObserver for CliObserver {
    fn on_acquisition_start(&self, _request: u64, label: &str) {
        self.spin("Loading", label.to_string());
    }

    fn on_source_loaded(&self, source: &imgrc::Blob) {
        self.settle(format!(
            "{} Loaded {}  {}",
            green("✓"),
            bold(source.name.as_deref().unwrap_or("<unnamed>")),
            dim(&render_asset_summary(source).size),
        ));
    }

    fn on_conversion_start(&self, _request: u64, params: &ConversionParams) {
        self.spin(
            "Converting",
            format!(
                "{} q{} {}x{}",
                params.format(),
                params.quality(),
                params.width(),
                params.height()
            ),
        );
    }

    fn on_conversion_complete(&self, result: &imgrc::Blob, delta_bytes: i64) {
        let label = render_delta(delta_bytes);
        let label = match label.hint() {
            None => green(&label.to_string()),
            Some(_) => red(&label.to_string()),
        };
        self.settle(format!(
            "{} Converted  {}  {}",
            green("✓"),
            dim(&render_asset_summary(result).size),
            label
        ));
    }

    fn on_discarded(&self, request: u64) {
        self.settle(format!("{} Request {request} superseded", dim("·")));
    }

    fn on_notice(&self, notice: &Notice) {
        self.settle(format!("{} {}", red("✗"), red(&notice.message)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert to lossless WebP (default) and print the size delta
  imgrc photo.png

  # JPEG at quality 75, 800px wide, save next to the original copy
  imgrc photo.png --format jpeg --quality 75 --width 800 -o out/ --save-original

  # Convert straight from a URL
  imgrc https://example.com/banner.bmp --format png -o out/

  # Before/After page with inline previews
  imgrc photo.png --html report.html

  # Machine-readable state
  imgrc photo.png --json

  # Line-driven session
  imgrc --interactive

INTERACTIVE COMMANDS:
  file <path>                    load a local file as the source
  url <text>                     set the URL field (does not fetch)
  fetch                          fetch the URL field as the source
  convert                        convert the source with the current settings
  set quality|width|height|format <value>
  show                           print the Before/After panes
  download before|after [dir]    save a pane (default: --output-dir or .)
  dismiss                        acknowledge the current notice
  html <file>                    write the page
  quit

ENVIRONMENT VARIABLES:
  Every flag has an IMGRC_* fallback, e.g. IMGRC_QUALITY=80.
  RUST_LOG overrides the log filter.
"#;

/// Resize, compress and convert images.
#[derive(Parser, Debug)]
#[command(
    name = "imgrc",
    version,
    about = "Resize, compress and convert images (png, webp, bmp, jpeg)",
    long_about = "Resize, compress and convert a local image or an image URL, then report how \
many kilobytes the conversion saved or added. Results can be saved, rendered as an HTML \
before/after page, or printed as JSON.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "interactive")]
    input: Option<String>,

    /// Encoder quality (1–100). Only JPEG honours it.
    #[arg(long, env = "IMGRC_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Target width in pixels; 0 keeps it (or follows the height).
    #[arg(long, env = "IMGRC_WIDTH", default_value_t = 0)]
    width: u32,

    /// Target height in pixels; 0 keeps it (or follows the width).
    #[arg(long, env = "IMGRC_HEIGHT", default_value_t = 0)]
    height: u32,

    /// Output format.
    #[arg(long, env = "IMGRC_FORMAT", value_enum, default_value = "webp")]
    format: FormatArg,

    /// Save the converted image into this directory.
    #[arg(short, long, env = "IMGRC_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Also save the original next to the result (needs --output-dir).
    #[arg(long, env = "IMGRC_SAVE_ORIGINAL", requires = "output_dir")]
    save_original: bool,

    /// Write the before/after page to this HTML file.
    #[arg(long, env = "IMGRC_HTML")]
    html: Option<PathBuf>,

    /// Print the view state as JSON instead of the panes.
    #[arg(long, env = "IMGRC_JSON")]
    json: bool,

    /// Read commands from stdin instead of converting once.
    #[arg(short, long, env = "IMGRC_INTERACTIVE")]
    interactive: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "IMGRC_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Largest image accepted from a URL, in MiB.
    #[arg(long, env = "IMGRC_MAX_DOWNLOAD_MB", default_value_t = 50)]
    max_download_mb: u64,

    /// Resampling filter used when resizing.
    #[arg(long, env = "IMGRC_FILTER", value_enum, default_value = "lanczos3")]
    filter: FilterArg,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMGRC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMGRC_QUIET")]
    quiet: bool,

    /// Disable the spinner.
    #[arg(long, env = "IMGRC_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Webp,
    Bmp,
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Webp => OutputFormat::Webp,
            FormatArg::Bmp => OutputFormat::Bmp,
            FormatArg::Jpeg => OutputFormat::Jpeg,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FilterArg {
    Nearest,
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl From<FilterArg> for ResizeFilter {
    fn from(v: FilterArg) -> Self {
        match v {
            FilterArg::Nearest => ResizeFilter::Nearest,
            FilterArg::Triangle => ResizeFilter::Triangle,
            FilterArg::CatmullRom => ResizeFilter::CatmullRom,
            FilterArg::Lanczos3 => ResizeFilter::Lanczos3,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers progress, so library INFO logs only show without it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build view ───────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let library: Arc<dyn ImageLibrary> =
        Arc::new(NativeLibrary::new(config).context("Failed to set up image library")?);
    let mut view = ConverterView::new(library);
    if show_progress {
        view = view.with_observer(CliObserver::new());
    }

    let params = ConversionParams::new(cli.quality, cli.width, cli.height, cli.format.into())
        .context("Invalid conversion parameters")?;

    if cli.interactive {
        return run_interactive(&cli, view, params).await;
    }

    // ── One-shot conversion ──────────────────────────────────────────────
    let input = cli.input.as_deref().context("An input path or URL is required")?;
    run_once(&mut view, input, params).await;

    if let Some(notice) = view.state().notice() {
        anyhow::bail!("{}", notice.message);
    }

    if let Some(ref dir) = cli.output_dir {
        if cli.save_original {
            let path = view
                .download(Pane::Before, dir)
                .context("Failed to save original")?;
            report_saved(&cli, &path);
        }
        let path = view
            .download(Pane::After, dir)
            .context("Failed to save converted image")?;
        report_saved(&cli, &path);
    }

    if let Some(ref path) = cli.html {
        write_html(&view, &params, path).await?;
        report_saved(&cli, path);
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&view.snapshot()).context("Failed to serialise state")?;
        println!("{json}");
    } else if !cli.quiet {
        print_panes(&view);
    }

    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli) -> Result<ConverterConfig> {
    ConverterConfig::builder()
        .download_timeout_secs(cli.download_timeout)
        .max_download_bytes(cli.max_download_mb.saturating_mul(1024 * 1024))
        .resize_filter(cli.filter.into())
        .build()
        .context("Invalid configuration")
}

/// Load `input` and convert it, the same way the two forms of the page do.
async fn run_once(view: &mut ConverterView, input: &str, params: ConversionParams) -> Outcome {
    if imgrc::pipeline::input::is_url(input) {
        view.set_remote_url(input);
        view.submit_remote_url_and_convert(params).await
    } else {
        match view.load_path(input).await {
            Outcome::Applied => view.convert_from_source(params).await,
            other => other,
        }
    }
}

fn print_panes(view: &ConverterView) {
    let state = view.state();
    let Some(source) = state.source() else {
        println!("{}", dim("No source loaded."));
        return;
    };
    println!("{}", bold("Before:"));
    println!("{}", render_asset_summary(&source.blob));

    if let Some(result) = state.result() {
        println!();
        println!("{}", bold("After:"));
        if let Some(delta) = state.delta_bytes() {
            let label = render_delta(delta);
            match label.hint() {
                None => println!("{}", green(&label.to_string())),
                Some(hint) => {
                    println!("{}", red(&label.to_string()));
                    println!("{hint}");
                }
            }
        }
        println!("{}", render_asset_summary(&result.blob));
    }
}

fn report_saved(cli: &Cli, path: &Path) {
    if !cli.quiet {
        eprintln!("{} Saved {}", green("✔"), bold(&path.display().to_string()));
    }
}

async fn write_html(view: &ConverterView, params: &ConversionParams, path: &Path) -> Result<()> {
    let page = render_page(view, params);
    tokio::fs::write(path, page)
        .await
        .with_context(|| format!("Failed to write HTML to {}", path.display()))
}

// ── Interactive session ──────────────────────────────────────────────────────

async fn run_interactive(cli: &Cli, mut view: ConverterView, mut params: ConversionParams) -> Result<()> {
    if let Some(ref input) = cli.input {
        run_once(&mut view, input, params).await;
    }

    let default_dir = cli.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if !cli.quiet {
            eprint!("{} ", cyan("imgrc>"));
            io::stderr().flush().ok();
        }
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let rest: Vec<&str> = words.collect();

        match (command, rest.as_slice()) {
            ("quit" | "exit", _) => break,
            ("file", [path]) => {
                view.load_path(path).await;
            }
            ("url", args) => view.set_remote_url(args.join(" ")),
            ("fetch", []) => {
                if view.submit_remote_url().await == Outcome::Rejected {
                    eprintln!("{}", red("Enter an image URL first."));
                }
            }
            ("convert", []) => {
                if view.convert_from_source(params).await == Outcome::Rejected {
                    eprintln!("{}", red("Load a file or URL first."));
                }
            }
            ("set", [field, value]) => match update_params(&params, field, value) {
                Ok(updated) => params = updated,
                Err(e) => eprintln!("{}", red(&e.to_string())),
            },
            ("show", []) => {
                print_panes(&view);
                if let Some(notice) = view.state().notice() {
                    println!("{}", red(&notice.message));
                }
            }
            ("download", [pane, dir @ ..]) if dir.len() <= 1 => {
                let pane = match *pane {
                    "before" => Pane::Before,
                    "after" => Pane::After,
                    other => {
                        eprintln!("{}", red(&format!("Unknown pane '{other}'")));
                        continue;
                    }
                };
                let dir = dir.first().map(PathBuf::from).unwrap_or_else(|| default_dir.clone());
                match view.download(pane, &dir) {
                    Ok(path) => report_saved(cli, &path),
                    Err(e) => eprintln!("{}", red(&e.to_string())),
                }
            }
            ("dismiss", []) => view.dismiss_notice(),
            ("html", [path]) => {
                let path = PathBuf::from(path);
                match write_html(&view, &params, &path).await {
                    Ok(()) => report_saved(cli, &path),
                    Err(e) => eprintln!("{}", red(&format!("{e:#}"))),
                }
            }
            _ => eprintln!("{}", red(&format!("Unrecognised command: {line}"))),
        }
    }

    view.teardown();
    Ok(())
}

/// Replace one form field, re-validating the whole set.
fn update_params(params: &ConversionParams, field: &str, value: &str) -> Result<ConversionParams, imgrc::ImgError> {
    let quality = params.quality().to_string();
    let width = params.width().to_string();
    let height = params.height().to_string();
    let format = params.format().to_string();
    match field {
        "quality" => ConversionParams::from_form(value, &width, &height, &format),
        "width" => ConversionParams::from_form(&quality, value, &height, &format),
        "height" => ConversionParams::from_form(&quality, &width, value, &format),
        "format" => ConversionParams::from_form(&quality, &width, &height, value),
        other => Err(imgrc::ImgError::InvalidParameters(format!("unknown setting '{other}'"))),
    }
}
