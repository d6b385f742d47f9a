//! The output orchestrator: sequence the per-card pipeline and write files.
//!
//! ## Why strictly sequential?
//!
//! The render-host session and the raster accumulator are shared, run-scoped
//! mutable state. Cards are cheap to render (tens of milliseconds each) and
//! the PDF sheet depends on source order, so the loop processes one card at
//! a time with one page open at a time — no synchronization, no reordering,
//! deterministic output.
//!
//! ## Failure discipline
//!
//! Any failure during a card is fatal for the run: no partial continuation,
//! no per-card retry. A half-generated deck is worse than no deck — the
//! caller would have to diff the output directory against the data file to
//! find the gap. The page being processed is still closed on the error path,
//! and the driver ([`crate::generate`]) releases the browser session
//! unconditionally.

use crate::config::RenderConfig;
use crate::error::CardpressError;
use crate::pipeline::host::{DocumentLayout, RasterAsset, RenderHost, RenderPage};
use crate::pipeline::template::{self, RenderContext};
use crate::record::CardRecord;
use std::path::Path;
use tracing::{debug, info};

/// What one run produced.
#[derive(Debug, Clone, Default)]
pub struct OutputSummary {
    /// Cards processed.
    pub cards: usize,
    /// Individual PNG files written.
    pub pngs_written: usize,
    /// Card images placed on the PDF sheet (quantities included).
    pub sheet_images: usize,
    /// Whether a PDF file was written.
    pub pdf_written: bool,
}

/// Render every card and write the requested outputs.
///
/// Preconditions: at least one of `config.png` / `config.pdf` is set
/// (guaranteed by the config builder, re-checked here because the fields
/// are public).
pub async fn produce_output(
    config: &RenderConfig,
    cards: &[CardRecord],
    host: &dyn RenderHost,
) -> Result<OutputSummary, CardpressError> {
    if !config.png && !config.pdf {
        return Err(CardpressError::NoOutputSelected);
    }

    let count = cards.len();
    let mut rasters: Vec<RasterAsset> = Vec::new();
    let mut summary = OutputSummary {
        cards: count,
        ..OutputSummary::default()
    };

    for (index, card) in cards.iter().enumerate() {
        match card.display_name() {
            Some(name) => info!("rendering card {}/{}: {}", index + 1, count, name),
            None => info!("rendering card {}/{}", index + 1, count),
        }

        let resolved = template::resolve_fields(card)?;
        let ctx = RenderContext {
            card: &resolved,
            config,
            index,
            count,
        };
        let markup = template::render_card(&ctx).await?;

        let mut page = host.open_page().await?;
        let step = process_card(&mut *page, config, &ctx, &markup, &mut rasters, &mut summary).await;
        let closed = page.close().await;
        // a card failure outranks a close failure
        step?;
        closed?;
    }

    if config.pdf {
        summary.sheet_images = rasters.iter().map(|r| r.copies).sum();
        info!(
            "assembling PDF sheet: {} images from {} cards",
            summary.sheet_images, count
        );
        let layout = DocumentLayout {
            format: config.pdf_format,
            margin: config.pdf_margin.clone(),
            scale: config.scale_factor(),
        };
        let pdf = host.export_document(&rasters, &layout).await?;

        let out_path = config
            .base_dir
            .join(&config.out_dir)
            .join(&config.pdf_filename);
        write_output(&out_path, &pdf).await?;
        info!("wrote {}", out_path.display());
        summary.pdf_written = true;
    }

    Ok(summary)
}

/// The per-card page sequence: viewport → content → capture → write/accumulate.
async fn process_card(
    page: &mut dyn RenderPage,
    config: &RenderConfig,
    ctx: &RenderContext<'_>,
    markup: &str,
    rasters: &mut Vec<RasterAsset>,
    summary: &mut OutputSummary,
) -> Result<(), CardpressError> {
    page.set_viewport(Some(config.width), Some(config.height))
        .await?;
    page.load_markup(markup).await?;

    // one capture serves both outputs
    let raster = page.capture_raster().await?;

    if config.png {
        let filename = template::render_inline(&config.png_filename, ctx, "png filename")?;
        let out_path = config.base_dir.join(&config.out_dir).join(&filename);
        write_output(&out_path, &raster).await?;
        debug!("wrote {}", out_path.display());
        summary.pngs_written += 1;
    }

    if config.pdf {
        let copies = ctx.card.quantity(&config.quantity_key);
        rasters.push(RasterAsset { png: raster, copies });
    }

    Ok(())
}

/// Write bytes, creating parent directories as needed. Filename templates
/// may introduce subdirectories, so the parent is derived from the final
/// path rather than from `out_dir`.
async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), CardpressError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| CardpressError::OutputWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| CardpressError::OutputWrite {
            path: path.to_path_buf(),
            source,
        })
}
