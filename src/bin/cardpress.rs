//! CLI binary for cardpress.
//!
//! A thin shim over the library crate: it layers defaults, an optional
//! YAML/JSON config file, and explicit flags into one [`RenderConfig`],
//! runs [`generate`], and maps the result to an exit status. All pipeline
//! behaviour lives in the library.

use anyhow::{bail, Context, Result};
use cardpress::{generate, parse_structural_sync, Margin, PageFormat, RenderConfig};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # PNGs for every row of data.csv, using template.html
  cardpress generate

  # Print-ready PDF sheet at 300 DPI on A4 paper
  cardpress generate --data deck.yml --pdf --no-png --pdf-format A4

  # Everything from a project config file
  cardpress generate --config deck/config.yml --base-dir deck

  # Filenames embedding a card field
  cardpress generate --png-filename "{{ card.rarity }}/card_{{ card.id }}.png"

CONFIG FILE (YAML or JSON, same keys as the flags):
  data: cards.csv
  template: template.html
  width: 825
  height: 1125
  dpi: 300
  pdf: true
  pdf-format: Letter
  quantity-key: quantity

TEMPLATE CONTEXT:
  card    the current record        {{ card.name }}
  config  the run configuration     {{ config.width }}
  index   zero-based card position  {{ index }}
  count   total number of cards     {{ count }}

  helpers: has_image(path=…), load_image(path=…), include_css(path=…)
"#;

/// Generate card decks from CSV/JSON/YAML data and HTML/CSS templates.
#[derive(Parser, Debug)]
#[command(
    name = "cardpress",
    version,
    about = "Generate card decks from CSV/JSON/YAML data and HTML/CSS templates",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CARDPRESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "CARDPRESS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render all cards and write PNG and/or PDF output.
    Generate(GenerateArgs),
}

/// Every option can also be set in the config file (same name, kebab or
/// snake case). Precedence: flag > config file > default.
#[derive(Args, Debug)]
struct GenerateArgs {
    /// Path to config file.
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    /// Base directory all relative paths resolve against.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Path to data file.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Resolution for PDF output in pixels per inch.
    #[arg(long)]
    dpi: Option<u32>,

    /// Export cards as PNG files.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", overrides_with = "no_png")]
    png: Option<bool>,

    /// Disable PNG output (shorthand for --png false).
    #[arg(long)]
    no_png: bool,

    /// Export cards as a PDF file.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pdf: Option<bool>,

    /// Card width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Card height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Folder to search for image files.
    #[arg(long)]
    img_dir: Option<PathBuf>,

    /// Folder to save output to.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Page format for PDF output (A0–A6, Ledger, Legal, Letter, Tabloid).
    #[arg(long)]
    pdf_format: Option<String>,

    /// Margin around the outside of the page (px/in/cm/mm).
    #[arg(long)]
    pdf_margin: Option<String>,

    /// Filename for PDF file.
    #[arg(long)]
    pdf_filename: Option<String>,

    /// Filename template for PNG filenames.
    #[arg(long)]
    png_filename: Option<String>,

    /// Data key to use for quantities.
    #[arg(long)]
    quantity_key: Option<String>,

    /// Path to HTML template file.
    #[arg(long)]
    template: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Generate(args) => run_generate(args, cli.quiet).await,
    }
}

async fn run_generate(args: GenerateArgs, quiet: bool) -> Result<()> {
    let file = FileConfig::load(&args.base_dir.join(&args.config))?;
    let (config, data) = build_config(&args, &file)?;
    let data_path = config.base_dir.join(data);

    let summary = generate(&data_path, &config).await?;

    if !quiet {
        let mut parts = vec![format!("{} cards", summary.cards)];
        if config.png {
            parts.push(format!("{} PNGs", summary.pngs_written));
        }
        if summary.pdf_written {
            parts.push(format!("1 PDF sheet ({} images)", summary.sheet_images));
        }
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(&parts.join("  ")),
            dim(&format!("{}ms", summary.total_duration_ms)),
        );
    }
    Ok(())
}

// ── Config-file layer ────────────────────────────────────────────────────────

/// The parsed config file: a flat mapping of option values.
///
/// A missing file is an empty layer — the original tool treats the default
/// `config.yml` as optional — but a file that exists and fails to parse is
/// an error, not a silent fallback.
#[derive(Default)]
struct FileConfig(serde_json::Map<String, Value>);

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let value = parse_structural_sync(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?;
        match value {
            Some(Value::Object(map)) => Ok(Self(map)),
            Some(_) => bail!("config file {} must be a mapping", path.display()),
            None => bail!(
                "config file {} has an unsupported extension (expected .yml/.yaml/.json)",
                path.display()
            ),
        }
    }

    /// Look a key up under both spellings: `img-dir` and `img_dir`.
    fn get(&self, key: &str) -> Option<&Value> {
        self.0
            .get(key)
            .or_else(|| self.0.get(key.replace('-', "_").as_str()))
    }

    fn u32_value(&self, key: &str) -> Result<Option<u32>> {
        self.get(key)
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .with_context(|| format!("config key '{key}' must be a positive integer"))
            })
            .transpose()
    }

    fn bool_value(&self, key: &str) -> Result<Option<bool>> {
        self.get(key)
            .map(|v| {
                v.as_bool()
                    .with_context(|| format!("config key '{key}' must be a boolean"))
            })
            .transpose()
    }

    fn string_value(&self, key: &str) -> Result<Option<String>> {
        self.get(key)
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                // numbers are fine where strings are expected (e.g. a margin of 40)
                Value::Number(n) => Ok(n.to_string()),
                _ => bail!("config key '{key}' must be a string"),
            })
            .transpose()
    }
}

/// Layer defaults < config file < flags into a validated `RenderConfig`,
/// plus the data-file path.
fn build_config(args: &GenerateArgs, file: &FileConfig) -> Result<(RenderConfig, PathBuf)> {
    let defaults = RenderConfig::default();

    let png_flag = if args.no_png { Some(false) } else { args.png };
    let pdf_format = args
        .pdf_format
        .clone()
        .or(file.string_value("pdf-format")?)
        .map(|s| s.parse::<PageFormat>())
        .transpose()?
        .unwrap_or(defaults.pdf_format);
    let pdf_margin = args
        .pdf_margin
        .clone()
        .or(file.string_value("pdf-margin")?)
        .map(|s| s.parse::<Margin>())
        .transpose()?
        .unwrap_or(defaults.pdf_margin);

    let config = RenderConfig::builder()
        .base_dir(args.base_dir.clone())
        .size(
            args.width.or(file.u32_value("width")?).unwrap_or(defaults.width),
            args.height
                .or(file.u32_value("height")?)
                .unwrap_or(defaults.height),
        )
        .dpi(args.dpi.or(file.u32_value("dpi")?).unwrap_or(defaults.dpi))
        .png(png_flag.or(file.bool_value("png")?).unwrap_or(defaults.png))
        .pdf(args.pdf.or(file.bool_value("pdf")?).unwrap_or(defaults.pdf))
        .out_dir(
            args.out_dir
                .clone()
                .or(file.string_value("out-dir")?.map(PathBuf::from))
                .unwrap_or(defaults.out_dir),
        )
        .img_dir(
            args.img_dir
                .clone()
                .or(file.string_value("img-dir")?.map(PathBuf::from))
                .unwrap_or(defaults.img_dir),
        )
        .template(
            args.template
                .clone()
                .or(file.string_value("template")?.map(PathBuf::from))
                .unwrap_or(defaults.template),
        )
        .png_filename(
            args.png_filename
                .clone()
                .or(file.string_value("png-filename")?)
                .unwrap_or(defaults.png_filename),
        )
        .pdf_filename(
            args.pdf_filename
                .clone()
                .or(file.string_value("pdf-filename")?)
                .unwrap_or(defaults.pdf_filename),
        )
        .pdf_format(pdf_format)
        .pdf_margin(pdf_margin)
        .quantity_key(
            args.quantity_key
                .clone()
                .or(file.string_value("quantity-key")?)
                .unwrap_or(defaults.quantity_key),
        )
        .build()
        .context("invalid configuration")?;

    let data = args
        .data
        .clone()
        .or(file.string_value("data")?.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data.csv"));

    Ok((config, data))
}
