//! Top-level run driver: data file in, PNG/PDF files out.
//!
//! This is the primary entry point for the library. It owns the render-host
//! lifecycle so callers get the resource guarantee for free: the browser
//! session is released on every exit path — success, a per-card failure, or
//! a PDF assembly failure — before the error is reported. Components below
//! this level never touch the process; whoever calls [`generate`] decides
//! what an error means (the CLI turns it into a non-zero exit status).

use crate::config::RenderConfig;
use crate::error::CardpressError;
use crate::pipeline::chromium::ChromiumHost;
use crate::pipeline::host::RenderHost;
use crate::pipeline::normalize;
use crate::pipeline::output::{self, OutputSummary};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// What one [`generate`] run did, for reporting.
#[derive(Debug, Clone, Default)]
pub struct GenerateSummary {
    /// Cards loaded from the data file.
    pub cards: usize,
    /// Individual PNG files written.
    pub pngs_written: usize,
    /// Card images placed on the PDF sheet (quantities included).
    pub sheet_images: usize,
    /// Whether a PDF file was written.
    pub pdf_written: bool,
    /// Wall-clock duration of the whole run.
    pub total_duration_ms: u64,
}

impl GenerateSummary {
    fn from_output(summary: OutputSummary, started: Instant) -> Self {
        GenerateSummary {
            cards: summary.cards,
            pngs_written: summary.pngs_written,
            sheet_images: summary.sheet_images,
            pdf_written: summary.pdf_written,
            total_duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Generate all outputs for one data file, using a headless Chromium
/// session launched for the duration of the run.
pub async fn generate(
    data_path: impl AsRef<Path>,
    config: &RenderConfig,
) -> Result<GenerateSummary, CardpressError> {
    let started = Instant::now();
    let data_path = data_path.as_ref();

    let cards = load_cards(data_path).await?;

    let mut host = ChromiumHost::launch().await?;
    let result = output::produce_output(config, &cards, &host).await;
    // Unconditional release: a leaked browser outlives the process.
    let closed = host.close().await;

    let summary = result?;
    closed?;

    let summary = GenerateSummary::from_output(summary, started);
    info!(
        "run complete: {} cards, {} PNGs, {}ms",
        summary.cards, summary.pngs_written, summary.total_duration_ms
    );
    Ok(summary)
}

/// Like [`generate`], but against a caller-supplied render host.
///
/// The caller owns the host's lifecycle — nothing is closed here. This is
/// the seam tests and embedders use to run the pipeline without launching
/// a browser.
pub async fn generate_with_host(
    data_path: impl AsRef<Path>,
    config: &RenderConfig,
    host: &dyn RenderHost,
) -> Result<GenerateSummary, CardpressError> {
    let started = Instant::now();
    let cards = load_cards(data_path.as_ref()).await?;
    let summary = output::produce_output(config, &cards, host).await?;
    Ok(GenerateSummary::from_output(summary, started))
}

async fn load_cards(
    data_path: &Path,
) -> Result<crate::record::CardSequence, CardpressError> {
    let cards = normalize::normalize(data_path)
        .await?
        .ok_or_else(|| CardpressError::UnsupportedDataFile {
            path: data_path.to_path_buf(),
        })?;
    info!("loaded {} cards from {}", cards.len(), data_path.display());
    Ok(cards)
}
