//! # cardpress
//!
//! Generate card decks from tabular data and HTML/CSS templates.
//!
//! ## Why this crate?
//!
//! Tabletop prototyping lives in spreadsheets: one row per card, one column
//! per field, a repeated column when a field is a list. Turning that into
//! printable cards by hand means re-exporting images after every balance
//! tweak. This crate makes the deck a build artifact — data plus an
//! HTML/CSS template in, per-card PNGs and a print-ready PDF sheet out —
//! with the layout rendered by a real browser engine, so card designs can
//! use everything CSS can do.
//!
//! ## Pipeline Overview
//!
//! ```text
//! data file (CSV/JSON/YAML)
//!  │
//!  ├─ 1. Normalize  parse into uniform card records (merge duplicate
//!  │                columns, coerce types, prune empty fields)
//!  ├─ 2. Template   evaluate the card layout per record (Tera), with
//!  │                image and stylesheet helpers injected
//!  ├─ 3. Rasterize  headless Chromium: card-sized viewport, transparent
//!  │                PNG capture, one page per card
//!  └─ 4. Output     write PNGs; lay out the quantity-expanded PDF sheet
//!                   and export it at the requested DPI
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardpress::{generate, RenderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RenderConfig::builder()
//!         .template("template.html")
//!         .pdf(true)
//!         .build()?;
//!     let summary = generate("cards.csv", &config).await?;
//!     eprintln!("{} cards, {} PNGs", summary.cards, summary.pngs_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cardpress` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! cardpress = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod record;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Margin, PageFormat, RenderConfig, RenderConfigBuilder};
pub use error::CardpressError;
pub use generate::{generate, generate_with_host, GenerateSummary};
pub use pipeline::chromium::ChromiumHost;
pub use pipeline::host::{DocumentLayout, RasterAsset, RenderHost, RenderPage};
pub use pipeline::normalize::{normalize, normalize_sync, parse_structural_sync};
pub use pipeline::output::{produce_output, OutputSummary};
pub use pipeline::template::RenderContext;
pub use record::{CardRecord, CardSequence, FieldValue};
