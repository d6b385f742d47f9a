//! Configuration types for a card-generation run.
//!
//! All run behaviour is controlled through [`RenderConfig`], built via its
//! [`RenderConfigBuilder`]. The config is an immutable snapshot for the whole
//! run: it is serialized into every template's evaluation context (so a card
//! layout can read `config.width`, `config.dpi`, …) and shared by reference
//! across the normalizer, renderer, and orchestrator.
//!
//! # Design choice: builder over constructor
//! A fourteen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on the
//! defaults for the rest; `build()` rejects configurations that could only
//! fail later (no output format selected, zero-sized cards, a DPI outside
//! what the PDF exporter can scale to).

use crate::error::CardpressError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Reference CSS pixel density. PDF export scales by `96 / dpi` so a card
/// authored in CSS pixels comes out at the requested physical resolution.
pub const CSS_DPI: f64 = 96.0;

/// Configuration for one card-generation run.
///
/// Built via [`RenderConfig::builder()`] or [`RenderConfig::default()`].
///
/// # Example
/// ```rust
/// use cardpress::RenderConfig;
///
/// let config = RenderConfig::builder()
///     .size(825, 1125)
///     .dpi(300)
///     .pdf(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.scale_factor(), 0.32);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct RenderConfig {
    /// Card width in CSS pixels. Default: 825 (2.75 in at 300 DPI).
    pub width: u32,

    /// Card height in CSS pixels. Default: 1125 (3.75 in at 300 DPI).
    pub height: u32,

    /// Print resolution for PDF output in pixels per inch. Default: 300.
    ///
    /// Cards are authored in CSS pixels (96/in). Exporting at `dpi` shrinks
    /// the layout by `96 / dpi`, so a 825 × 1125 px card printed at 300 DPI
    /// measures a physically correct 2.75 × 3.75 in on the sheet.
    pub dpi: u32,

    /// Write one PNG per card. Default: true.
    pub png: bool,

    /// Write a combined PDF sheet. Default: false.
    pub pdf: bool,

    /// Output directory, relative to `base_dir`. Default: `out`.
    pub out_dir: PathBuf,

    /// Filename template for PNG output, evaluated against the full render
    /// context so filenames can embed card fields.
    /// Default: `card_{{ card.id }}.png`.
    pub png_filename: String,

    /// Filename for PDF output. Default: `cards.pdf`.
    pub pdf_filename: String,

    /// Page format for PDF output. Default: Letter.
    pub pdf_format: PageFormat,

    /// Margin around the outside of each PDF page. Default: `37.5px`.
    pub pdf_margin: Margin,

    /// Card template file, relative to `base_dir`. Default: `template.html`.
    pub template: PathBuf,

    /// Directory image paths are resolved against, relative to `base_dir`.
    /// Default: `img`.
    pub img_dir: PathBuf,

    /// Record field holding the per-card repeat count for the PDF sheet.
    /// Default: `quantity`.
    pub quantity_key: String,

    /// Base directory all relative paths resolve against, fixed once per run.
    /// Default: `.`.
    ///
    /// An explicit base keeps the pipeline independent of the process-wide
    /// working directory, so embedding applications and tests can run
    /// multiple configurations side by side.
    pub base_dir: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 825,
            height: 1125,
            dpi: 300,
            png: true,
            pdf: false,
            out_dir: PathBuf::from("out"),
            png_filename: "card_{{ card.id }}.png".to_string(),
            pdf_filename: "cards.pdf".to_string(),
            pdf_format: PageFormat::Letter,
            pdf_margin: Margin::default(),
            template: PathBuf::from("template.html"),
            img_dir: PathBuf::from("img"),
            quantity_key: "quantity".to_string(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl RenderConfig {
    /// Create a new builder for `RenderConfig`.
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }

    /// PDF export scale factor: `96 / dpi`.
    ///
    /// 96 is the CSS reference pixels-per-inch; dividing by the requested
    /// print DPI converts the CSS-pixel card into physically correct print
    /// dimensions (300 DPI → 0.32, 96 DPI → 1.0).
    pub fn scale_factor(&self) -> f64 {
        CSS_DPI / self.dpi as f64
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    /// Card dimensions in CSS pixels.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn png(mut self, enabled: bool) -> Self {
        self.config.png = enabled;
        self
    }

    pub fn pdf(mut self, enabled: bool) -> Self {
        self.config.pdf = enabled;
        self
    }

    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.out_dir = dir.into();
        self
    }

    pub fn png_filename(mut self, template: impl Into<String>) -> Self {
        self.config.png_filename = template.into();
        self
    }

    pub fn pdf_filename(mut self, name: impl Into<String>) -> Self {
        self.config.pdf_filename = name.into();
        self
    }

    pub fn pdf_format(mut self, format: PageFormat) -> Self {
        self.config.pdf_format = format;
        self
    }

    pub fn pdf_margin(mut self, margin: Margin) -> Self {
        self.config.pdf_margin = margin;
        self
    }

    pub fn template(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.template = path.into();
        self
    }

    pub fn img_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.img_dir = dir.into();
        self
    }

    pub fn quantity_key(mut self, key: impl Into<String>) -> Self {
        self.config.quantity_key = key.into();
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = dir.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenderConfig, CardpressError> {
        let c = &self.config;
        if !c.png && !c.pdf {
            return Err(CardpressError::NoOutputSelected);
        }
        if c.width == 0 || c.height == 0 {
            return Err(CardpressError::InvalidConfig(format!(
                "card dimensions must be nonzero, got {}x{}",
                c.width, c.height
            )));
        }
        // printToPdf accepts scale 0.1–2.0, which bounds the DPI range.
        if c.dpi < 48 || c.dpi > 960 {
            return Err(CardpressError::InvalidConfig(format!(
                "DPI must be 48–960, got {}",
                c.dpi
            )));
        }
        Ok(self.config)
    }
}

// ── Page format ──────────────────────────────────────────────────────────

/// Page size for PDF output.
///
/// The set matches what browser print engines accept by name. Dimensions are
/// stored portrait; the exporter always prints landscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageFormat {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    Ledger,
    Legal,
    #[default]
    Letter,
    Tabloid,
}

impl PageFormat {
    /// Portrait (width, height) in inches.
    pub fn dimensions_in(&self) -> (f64, f64) {
        match self {
            PageFormat::A0 => (33.1, 46.8),
            PageFormat::A1 => (23.4, 33.1),
            PageFormat::A2 => (16.54, 23.4),
            PageFormat::A3 => (11.7, 16.54),
            PageFormat::A4 => (8.27, 11.7),
            PageFormat::A5 => (5.83, 8.27),
            PageFormat::A6 => (4.13, 5.83),
            PageFormat::Ledger => (17.0, 11.0),
            PageFormat::Legal => (8.5, 14.0),
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Tabloid => (11.0, 17.0),
        }
    }

    /// All accepted format names, for CLI help and error messages.
    pub fn names() -> &'static [&'static str] {
        &[
            "A0", "A1", "A2", "A3", "A4", "A5", "A6", "Ledger", "Legal", "Letter", "Tabloid",
        ]
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageFormat::A0 => "A0",
            PageFormat::A1 => "A1",
            PageFormat::A2 => "A2",
            PageFormat::A3 => "A3",
            PageFormat::A4 => "A4",
            PageFormat::A5 => "A5",
            PageFormat::A6 => "A6",
            PageFormat::Ledger => "Ledger",
            PageFormat::Legal => "Legal",
            PageFormat::Letter => "Letter",
            PageFormat::Tabloid => "Tabloid",
        };
        f.write_str(name)
    }
}

impl FromStr for PageFormat {
    type Err = CardpressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a0" => Ok(PageFormat::A0),
            "a1" => Ok(PageFormat::A1),
            "a2" => Ok(PageFormat::A2),
            "a3" => Ok(PageFormat::A3),
            "a4" => Ok(PageFormat::A4),
            "a5" => Ok(PageFormat::A5),
            "a6" => Ok(PageFormat::A6),
            "ledger" => Ok(PageFormat::Ledger),
            "legal" => Ok(PageFormat::Legal),
            "letter" => Ok(PageFormat::Letter),
            "tabloid" => Ok(PageFormat::Tabloid),
            other => Err(CardpressError::InvalidConfig(format!(
                "unknown page format '{}' (expected one of {})",
                other,
                PageFormat::names().join(", ")
            ))),
        }
    }
}

impl Serialize for PageFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Margin ───────────────────────────────────────────────────────────────

/// A CSS-style page margin: a number with a `px`, `in`, `cm`, or `mm` unit
/// (bare numbers are pixels).
///
/// Parsed once at configuration time so a typo fails the run before the
/// browser is ever launched; the exporter consumes the value in inches.
#[derive(Debug, Clone, PartialEq)]
pub struct Margin {
    raw: String,
    inches: f64,
}

impl Margin {
    /// The margin in inches, as consumed by the PDF exporter.
    pub fn inches(&self) -> f64 {
        self.inches
    }

    /// The original spelling, kept for template contexts and diagnostics.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Default for Margin {
    fn default() -> Self {
        // 37.5px = 0.390625in at 96 DPI
        "37.5px".parse().expect("default margin is valid")
    }
}

impl FromStr for Margin {
    type Err = CardpressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (number, per_inch) = if let Some(v) = raw.strip_suffix("px") {
            (v, CSS_DPI)
        } else if let Some(v) = raw.strip_suffix("in") {
            (v, 1.0)
        } else if let Some(v) = raw.strip_suffix("cm") {
            (v, 2.54)
        } else if let Some(v) = raw.strip_suffix("mm") {
            (v, 25.4)
        } else {
            (raw, CSS_DPI)
        };

        let value: f64 = number.trim().parse().map_err(|_| {
            CardpressError::InvalidConfig(format!(
                "invalid margin '{raw}' (expected a number with optional px/in/cm/mm unit)"
            ))
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(CardpressError::InvalidConfig(format!(
                "margin must be a non-negative finite length, got '{raw}'"
            )));
        }

        Ok(Margin {
            raw: raw.to_string(),
            inches: value / per_inch,
        })
    }
}

impl fmt::Display for Margin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Margin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}
