//! CLI binary for pdf-layout-md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_layout_md::{
    convert, convert_to_file, ConversionConfig, ConversionProgressCallback, ImageOutput,
    PageSelection, PageSeparator, ProgressCallback,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

/// Terminal progress callback: a live progress bar plus one log line per
/// page and per skipped image.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` tells us the page count.
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
            start_times: Mutex::new(HashMap::new()),
            skipped: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Laying out");
    }

    fn elapsed_ms(&self, page_num: usize) -> u128 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_num))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, markdown_len: usize) {
        let elapsed_ms = self.elapsed_ms(page_num);
        let mark = if markdown_len == 0 { dim("∅") } else { green("✓") };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            mark,
            page_num,
            total,
            dim(&format!("{markdown_len:>5} chars")),
            dim(&format!("{}ms", elapsed_ms)),
        ));
        self.bar.inc(1);
    }

    fn on_image_skipped(&self, page_num: usize, image: &str, reason: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}  image {} skipped: {}",
            yellow("!"),
            page_num,
            image,
            dim(reason)
        ));
    }

    fn on_conversion_complete(&self, total_pages: usize, content_pages: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);
        eprintln!(
            "{} {}/{} pages with content{}",
            green("✔"),
            bold(&content_pages.to_string()),
            total_pages,
            if skipped > 0 {
                yellow(&format!("  ({skipped} images skipped)"))
            } else {
                String::new()
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (stdout, images embedded as data URIs)
  pdf2md document.pdf

  # Convert to file, images written next to it
  pdf2md document.pdf -o out/document.md --images-dir out/images

  # Specific pages, rule between pages
  pdf2md --pages 1-5 --separator hr paper.pdf -o paper.md

  # Text only
  pdf2md --no-images report.pdf

  # JSON output (markdown, image table, per-page stats)
  pdf2md --json document.pdf > output.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Directory containing libpdfium (otherwise ./ then the system path)
  RUST_LOG          Override the log filter (e.g. pdf_layout_md=debug)
"#;

/// Reconstruct PDF page layout and emit Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md",
    version,
    about = "Reconstruct PDF page layout and emit Markdown",
    long_about = "Convert PDF documents to Markdown by rebuilding each page's layout from \
text positions and font sizes: reading order, headings, paragraphs and inline images. \
Running heads, page numbers and other page furniture are dropped.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "PDF2MD_OUTPUT")]
    output: Option<PathBuf>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2MD_PAGES", default_value = "all")]
    pages: String,

    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, env = "PDF2MD_SEPARATOR", default_value = "none")]
    separator: String,

    /// Write images as PNG files into this directory instead of embedding them.
    #[arg(long, env = "PDF2MD_IMAGES_DIR", conflicts_with = "no_images")]
    images_dir: Option<PathBuf>,

    /// URL prefix for image links when --images-dir is set.
    /// Defaults to the directory's path relative to the output file.
    #[arg(long, env = "PDF2MD_IMAGES_URL_PREFIX", requires = "images_dir")]
    images_url_prefix: Option<String>,

    /// Leave images out of the Markdown entirely.
    #[arg(long, env = "PDF2MD_NO_IMAGES")]
    no_images: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2MD_PASSWORD")]
    password: Option<String>,

    /// Output structured JSON (ConversionResult) instead of Markdown.
    #[arg(long, env = "PDF2MD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    if let (Some(output_path), false) = (&cli.output, cli.json) {
        let stats = convert_to_file(&cli.input, output_path, &config)
            .await
            .context("Conversion failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {}/{} pages  {} images  {}ms  →  {}",
                if stats.skipped_images == 0 {
                    green("✔")
                } else {
                    yellow("⚠")
                },
                stats.processed_pages - stats.empty_pages,
                stats.processed_pages,
                stats.total_images,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
        return Ok(());
    }

    let output = convert(&cli.input, &config)
        .await
        .context("Conversion failed")?;

    let rendered = if cli.json {
        serde_json::to_string_pretty(&output).context("Failed to serialise output")? + "\n"
    } else {
        output.markdown.clone()
    };

    match cli.output {
        Some(ref path) => tokio::fs::write(path, rendered)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    if !cli.quiet && !show_progress {
        eprintln!(
            "Converted {}/{} pages in {}ms ({} images, {} skipped)",
            output.stats.processed_pages,
            output.stats.total_pages,
            output.stats.total_duration_ms,
            output.stats.total_images,
            output.stats.skipped_images,
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = parse_pages(&cli.pages)?;
    let separator = parse_separator(&cli.separator);

    let mut builder = ConversionConfig::builder()
        .pages(pages)
        .page_separator(separator);

    if cli.no_images {
        builder = builder.image_output(ImageOutput::Omit);
    } else if let Some(ref dir) = cli.images_dir {
        let prefix = match cli.images_url_prefix {
            Some(ref p) => p.clone(),
            None => default_url_prefix(dir, cli.output.as_deref()),
        };
        builder = builder.images_dir(dir.clone(), prefix);
    }

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Image links relative to the Markdown file when both live under the same
/// directory; the directory as given otherwise.
fn default_url_prefix(images_dir: &std::path::Path, output: Option<&std::path::Path>) -> String {
    let relative = output
        .and_then(|out| out.parent())
        .and_then(|base| images_dir.strip_prefix(base).ok());
    relative
        .unwrap_or(images_dir)
        .to_string_lossy()
        .replace('\\', "/")
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

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
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

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn pages_parse() {
        assert!(matches!(parse_pages("all").unwrap(), PageSelection::All));
        assert!(matches!(parse_pages("4").unwrap(), PageSelection::Single(4)));
        assert!(matches!(parse_pages("2-5").unwrap(), PageSelection::Range(2, 5)));
        assert!(matches!(parse_pages("1,3").unwrap(), PageSelection::Set(_)));
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-2").is_err());
    }

    #[test]
    fn custom_separator_keeps_case() {
        assert!(matches!(
            parse_separator("* * *"),
            PageSeparator::Custom(ref s) if s == "* * *"
        ));
        assert!(matches!(parse_separator("HR"), PageSeparator::HorizontalRule));
    }

    #[test]
    fn url_prefix_is_relative_to_output() {
        let prefix = default_url_prefix(Path::new("out/images"), Some(Path::new("out/doc.md")));
        assert_eq!(prefix, "images");
        let prefix = default_url_prefix(Path::new("/tmp/img"), Some(Path::new("out/doc.md")));
        assert_eq!(prefix, "/tmp/img");
    }
}
