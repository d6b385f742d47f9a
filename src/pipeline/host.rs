//! The render-host seam: the minimal contract the pipeline needs from a
//! headless rendering capability.
//!
//! The orchestrator is written against these traits, not against a concrete
//! browser. That keeps the heavyweight dependency behind one boundary — the
//! production implementation is [`crate::pipeline::chromium::ChromiumHost`],
//! tests drive the pipeline with a scripted in-memory host — and it pins
//! down the two contract points downstream correctness depends on:
//!
//! * `capture_raster` must produce a **lossless, alpha-preserving** image —
//!   cards with rounded corners or transparent backgrounds keep their
//!   transparency in PNG output.
//! * `export_document` must preserve **source order and repeat counts** —
//!   the PDF sheet lays out rasters first-to-last, each repeated
//!   `copies` times, in a wrapping flow.

use crate::config::{Margin, PageFormat};
use crate::error::CardpressError;
use async_trait::async_trait;

/// One captured card image, paired with its repeat count for PDF assembly.
///
/// Lives only for the duration of a run: created after a card is captured,
/// consumed by the PDF export, then dropped.
#[derive(Debug, Clone)]
pub struct RasterAsset {
    /// Lossless encoded image bytes (PNG).
    pub png: Vec<u8>,
    /// How many times the card appears on the sheet.
    pub copies: usize,
}

/// Page geometry for the exported PDF document.
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    pub format: PageFormat,
    pub margin: Margin,
    /// Document scale factor (`96 / dpi`), see [`crate::config::RenderConfig::scale_factor`].
    pub scale: f64,
}

/// A headless rendering session, reused across all cards of one run.
#[async_trait]
pub trait RenderHost: Send + Sync {
    /// Open a fresh page.
    async fn open_page(&self) -> Result<Box<dyn RenderPage>, CardpressError>;

    /// Lay out all rasters — each repeated `copies` times, in source order,
    /// left-to-right top-to-bottom — and export a landscape,
    /// print-background-enabled paginated document.
    async fn export_document(
        &self,
        rasters: &[RasterAsset],
        layout: &DocumentLayout,
    ) -> Result<Vec<u8>, CardpressError>;

    /// Shut the session down. Must be called on every exit path; a dropped
    /// host may leak an OS-level browser process.
    async fn close(&mut self) -> Result<(), CardpressError>;
}

/// One open page of a [`RenderHost`].
#[async_trait]
pub trait RenderPage: Send {
    /// Fix the viewport. The device scale factor is always 1; a `None`
    /// dimension leaves the host's default in place.
    async fn set_viewport(
        &mut self,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<(), CardpressError>;

    /// Replace the page content with the given markup and wait for the load
    /// to settle.
    async fn load_markup(&mut self, markup: &str) -> Result<(), CardpressError>;

    /// Capture the viewport as a lossless, alpha-preserving PNG.
    async fn capture_raster(&mut self) -> Result<Vec<u8>, CardpressError>;

    /// Close the page, releasing its host-side resources.
    async fn close(self: Box<Self>) -> Result<(), CardpressError>;
}
