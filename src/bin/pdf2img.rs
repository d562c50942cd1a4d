//! CLI binary for edgequake-pdf2img.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, runs one upload through a `Gallery` and writes the
//! result as HTML, JSON or image files.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2img::{
    inspect, ConversionConfig, ConversionOutput, ConversionProgressCallback, Gallery,
    ImageEncoding, PageSelection, ProgressCallback, DEFAULT_DISPLAY_WIDTH,
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SURFACE_PIXELS,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per rendered page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently rendering.
    page_started: Mutex<Option<Instant>>,
    encoded_total: AtomicU64,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            encoded_total: AtomicU64::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn page_elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, encoded_bytes: usize) {
        let secs = self.page_elapsed_secs();
        self.encoded_total
            .fetch_add(encoded_bytes as u64, Ordering::Relaxed);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{:>6} KiB", encoded_bytes / 1024)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_aborted(&self, page_num: usize, reason: &str) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Stopped at page {}: {}",
            red("✘"),
            page_num,
            red(reason)
        );
    }

    fn on_conversion_complete(&self, total_pages: usize, rendered: usize) {
        self.bar.finish_and_clear();
        let kib = self.encoded_total.load(Ordering::Relaxed) / 1024;
        if rendered == total_pages {
            eprintln!(
                "{} {} pages rendered  {}",
                green("✔"),
                bold(&rendered.to_string()),
                dim(&format!("({kib} KiB base64)"))
            );
        } else {
            eprintln!(
                "{} {}/{} pages rendered",
                cyan("⚠"),
                bold(&rendered.to_string()),
                total_pages
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # HTML gallery on stdout
  pdf2img document.pdf > gallery.html

  # HTML gallery to a file
  pdf2img document.pdf -o gallery.html

  # Pages 2 to 4 as PNG files
  pdf2img --pages 2-4 --format png --out-dir pages/ document.pdf

  # Base64 pages as JSON
  pdf2img --json document.pdf > pages.json

  # From a URL, at half the default zoom
  pdf2img --scale 1.5 https://arxiv.org/pdf/1706.03762 -o attention.html

  # Inspect PDF metadata only
  pdf2img --inspect-only document.pdf

ENVIRONMENT VARIABLES:
  PDF2IMG_*                 Every flag, e.g. PDF2IMG_SCALE=2
  PDFIUM_LIB_PATH           Path to an existing libpdfium; skips the download
  PDF2IMG_CACHE_DIR         Override the pdfium cache directory
  PDFIUM_DOWNLOAD_BASE_URL  Mirror for the pdfium release archives
  RUST_LOG                  Log filter, overrides -v / -q

  PDFium (~30 MB) is downloaded on first run and cached in
  ~/.cache/pdf2img/pdfium-7690/.
"#;

/// Render every page of a PDF to a base64 image and show them as HTML.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Convert PDF pages to base64 JPEG/PNG images and an HTML gallery",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local .pdf file path or HTTP/HTTPS URL.
    input: String,

    /// Write the HTML gallery to this file instead of stdout.
    #[arg(short, long, env = "PDF2IMG_OUTPUT")]
    output: Option<PathBuf>,

    /// Print pages and stats as JSON instead of HTML.
    #[arg(long, env = "PDF2IMG_JSON")]
    json: bool,

    /// Also write every page as page-NNN.<ext> into this directory.
    #[arg(long, env = "PDF2IMG_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Zoom from PDF points to pixels (0–10].
    #[arg(long, env = "PDF2IMG_SCALE", default_value_t = 3.0)]
    scale: f32,

    /// Image format.
    #[arg(long, env = "PDF2IMG_FORMAT", value_enum, default_value = "jpeg")]
    format: FormatArg,

    /// JPEG quality (1–100).
    #[arg(long, env = "PDF2IMG_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2IMG_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2IMG_PASSWORD")]
    password: Option<String>,

    /// Largest drawing surface, in pixels.
    #[arg(long, env = "PDF2IMG_MAX_SURFACE_PIXELS", default_value_t = DEFAULT_MAX_SURFACE_PIXELS)]
    max_surface_pixels: u64,

    /// CSS width of each image in the HTML gallery.
    #[arg(long, env = "PDF2IMG_DISPLAY_WIDTH", default_value_t = DEFAULT_DISPLAY_WIDTH)]
    display_width: u32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2IMG_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Use this libpdfium instead of the cached download.
    #[arg(long, env = "PDF2IMG_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Print PDF metadata only, no rendering.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMG_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Jpeg,
    Png,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The bar replaces INFO logs while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    // ── Ensure PDFium engine is available ────────────────────────────────
    if cli.pdfium_lib.is_none() && !pdfium_auto::is_pdfium_cached() {
        fetch_pdfium(cli.quiet)?;
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(first) = meta.page_sizes.first() {
                println!(
                    "Page 1:       {:.0} × {:.0} pt  →  {} × {} px at scale {}",
                    first.width_pt,
                    first.height_pt,
                    (first.width_pt * cli.scale).floor(),
                    (first.height_pt * cli.scale).floor(),
                    cli.scale
                );
            }
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let mut gallery = Gallery::new();
    let stats = gallery
        .upload(&cli.input, &config)
        .await
        .context("Conversion failed")?;

    if stats.surface_unavailable && !cli.quiet {
        eprintln!(
            "{} No drawing surface could be allocated; no pages rendered. \
             Try a smaller --scale.",
            red("✘")
        );
    }

    if let Some(ref dir) = cli.out_dir {
        write_page_files(dir, gallery.images(), config.encoding).await?;
    }

    if cli.json {
        let output = ConversionOutput {
            pages: gallery.images().to_vec(),
            stats: stats.clone(),
        };
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(ref path) = cli.output {
        gallery
            .write_html(path, cli.display_width)
            .await
            .context("Failed to write HTML gallery")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}/{} pages  {}ms  →  {}",
                green("✔"),
                stats.rendered_pages,
                stats.selected_pages,
                stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
        }
    } else {
        let html = gallery.render_html(cli.display_width);
        io::stdout()
            .lock()
            .write_all(html.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet && !show_progress && cli.output.is_none() {
        eprintln!(
            "Rendered {}/{} pages in {}ms",
            stats.rendered_pages, stats.selected_pages, stats.total_duration_ms
        );
    }

    Ok(())
}

/// Download and cache libpdfium, with a byte-level progress bar unless quiet.
fn fetch_pdfium(quiet: bool) -> Result<()> {
    if quiet {
        pdfium_auto::ensure_pdfium_library(None).context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    // block_in_place keeps the borrowed callback valid without a 'static bound.
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length() != Some(t) {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

async fn write_page_files(
    dir: &Path,
    pages: &[edgequake_pdf2img::PageImage],
    encoding: ImageEncoding,
) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    for page in pages {
        let bytes = page
            .decode()
            .with_context(|| format!("Page {} holds invalid base64", page.page_num))?;
        let path = dir.join(format!("page-{:03}.{}", page.page_num, encoding.extension()));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let encoding = match cli.format {
        FormatArg::Jpeg => ImageEncoding::Jpeg {
            quality: cli.quality,
        },
        FormatArg::Png => ImageEncoding::Png,
    };

    let mut builder = ConversionConfig::builder()
        .scale(cli.scale)
        .encoding(encoding)
        .pages(parse_pages(&cli.pages)?)
        .max_surface_pixels(cli.max_surface_pixels)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if pages.contains(&0) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got 0)");
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages_forms() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" 4 ").unwrap(), PageSelection::Single(4));
        assert_eq!(parse_pages("2-5").unwrap(), PageSelection::Range(2, 5));
        assert_eq!(
            parse_pages("1,3,5").unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
    }

    #[test]
    fn parse_pages_rejects_bad_input() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-2").is_err());
        assert!(parse_pages("1,0").is_err());
        assert!(parse_pages("x").is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["pdf2img", "doc.pdf"]).unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.scale, 3.0);
        assert_eq!(config.encoding, ImageEncoding::Jpeg { quality: 92 });
        assert_eq!(cli.display_width, 800);
    }
}
