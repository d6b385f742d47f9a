//! Production render host: a headless Chromium driven over CDP.
//!
//! ## Why a real browser?
//!
//! Card layouts are HTML/CSS and lean on everything a browser engine gives
//! away for free — flexbox, web fonts, `print-color-adjust`, SVG — so the
//! faithful way to rasterize them is to let a browser do it. chromiumoxide
//! speaks the DevTools protocol directly from async Rust, which exposes the
//! three controls this pipeline needs and a plain screenshot API does not:
//! per-page device metrics (exact card-sized viewports at scale factor 1),
//! transparent-background capture, and `printToPdf` with paper size, margins,
//! and a document scale.
//!
//! One browser process serves the whole run. Launching Chromium costs around
//! a second; opening a page costs milliseconds — so the session is opened
//! once and pages come and go per card.
//!
//! ## PDF assembly
//!
//! The card sheet is itself just a page: every captured raster is embedded
//! as a data-URL `<img>` (repeated per its quantity) in a wrapping flex
//! container, and the browser's print engine paginates it. Source order in,
//! reading order out.

use crate::error::CardpressError;
use crate::pipeline::host::{DocumentLayout, RasterAsset, RenderHost, RenderPage};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, PrintToPdfParams};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A running headless-Chromium session.
pub struct ChromiumHost {
    browser: Browser,
    handler: Option<JoinHandle<()>>,
}

impl ChromiumHost {
    /// Launch a headless browser and start pumping its CDP event stream.
    pub async fn launch() -> Result<Self, CardpressError> {
        let config = BrowserConfig::builder()
            .build()
            .map_err(|detail| CardpressError::HostLaunch { detail })?;

        let (browser, mut events) =
            Browser::launch(config)
                .await
                .map_err(|e| CardpressError::HostLaunch {
                    detail: e.to_string(),
                })?;

        // The event stream must be drained for the browser connection to
        // make progress; it ends when the browser goes away.
        let handler = tokio::task::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!("chromium session started");
        Ok(Self {
            browser,
            handler: Some(handler),
        })
    }

    async fn blank_page(&self) -> Result<Page, CardpressError> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| render_err("open page", e))
    }
}

#[async_trait]
impl RenderHost for ChromiumHost {
    async fn open_page(&self) -> Result<Box<dyn RenderPage>, CardpressError> {
        Ok(Box::new(ChromiumPage {
            page: self.blank_page().await?,
        }))
    }

    async fn export_document(
        &self,
        rasters: &[RasterAsset],
        layout: &DocumentLayout,
    ) -> Result<Vec<u8>, CardpressError> {
        let page = self
            .blank_page()
            .await
            .map_err(|e| CardpressError::Assembly {
                detail: e.to_string(),
            })?;
        page.set_content(grid_document(rasters))
            .await
            .map_err(|e| CardpressError::Assembly {
                detail: format!("failed to load sheet content: {e}"),
            })?;

        let (paper_width, paper_height) = layout.format.dimensions_in();
        let margin = layout.margin.inches();
        let params = PrintToPdfParams {
            landscape: Some(true),
            print_background: Some(true),
            scale: Some(layout.scale),
            paper_width: Some(paper_width),
            paper_height: Some(paper_height),
            margin_top: Some(margin),
            margin_bottom: Some(margin),
            margin_left: Some(margin),
            margin_right: Some(margin),
            ..Default::default()
        };

        let pdf = page.pdf(params).await.map_err(|e| CardpressError::Assembly {
            detail: e.to_string(),
        });
        if let Err(e) = page.close().await {
            warn!("failed to close sheet page: {e}");
        }
        pdf
    }

    async fn close(&mut self) -> Result<(), CardpressError> {
        let closed = self.browser.close().await;
        let _ = self.browser.wait().await;
        if let Some(handler) = self.handler.take() {
            let _ = handler.await;
        }
        debug!("chromium session closed");
        closed
            .map(|_| ())
            .map_err(|e| render_err("shut down browser", e))
    }
}

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl RenderPage for ChromiumPage {
    async fn set_viewport(
        &mut self,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<(), CardpressError> {
        if width.is_none() && height.is_none() {
            return Ok(());
        }
        // In the device-metrics override a zero dimension means "keep the
        // host default", which is exactly the contract for `None`.
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(width.unwrap_or(0)))
            .height(i64::from(height.unwrap_or(0)))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(CardpressError::Internal)?;
        self.page
            .execute(params)
            .await
            .map_err(|e| render_err("set viewport", e))?;
        Ok(())
    }

    async fn load_markup(&mut self, markup: &str) -> Result<(), CardpressError> {
        self.page
            .set_content(markup)
            .await
            .map_err(|e| render_err("load markup", e))?;
        Ok(())
    }

    async fn capture_raster(&mut self) -> Result<Vec<u8>, CardpressError> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .omit_background(true)
                    .build(),
            )
            .await
            .map_err(|e| render_err("capture raster", e))
    }

    async fn close(self: Box<Self>) -> Result<(), CardpressError> {
        self.page
            .close()
            .await
            .map_err(|e| render_err("close page", e))
    }
}

fn render_err(operation: &str, err: impl std::fmt::Display) -> CardpressError {
    CardpressError::Render {
        detail: format!("{operation}: {err}"),
    }
}

/// Build the card-sheet document: all rasters as data-URL images, repeated
/// per their copy count, in a wrapping flex flow.
fn grid_document(rasters: &[RasterAsset]) -> String {
    let mut html = String::from(
        "<html><body style=\"margin: 0; padding: 0; print-color-adjust: exact;\">\
         <div style=\"display: flex; flex-wrap: wrap; align-content: flex-start;\">",
    );
    for raster in rasters {
        let img = format!("<img src=\"data:image/png;base64,{}\">", STANDARD.encode(&raster.png));
        for _ in 0..raster.copies {
            html.push_str(&img);
        }
    }
    html.push_str("</div></body></html>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_document_repeats_in_source_order() {
        let rasters = vec![
            RasterAsset {
                png: b"one".to_vec(),
                copies: 2,
            },
            RasterAsset {
                png: b"two".to_vec(),
                copies: 1,
            },
        ];
        let html = grid_document(&rasters);

        let one = format!("data:image/png;base64,{}", STANDARD.encode(b"one"));
        let two = format!("data:image/png;base64,{}", STANDARD.encode(b"two"));
        assert_eq!(html.matches(&one).count(), 2);
        assert_eq!(html.matches(&two).count(), 1);
        // first card's images all precede the second card's
        assert!(html.rfind(&one).unwrap() < html.find(&two).unwrap());
    }

    #[test]
    fn grid_document_with_zero_copies_omits_card() {
        let rasters = vec![RasterAsset {
            png: b"ghost".to_vec(),
            copies: 0,
        }];
        let html = grid_document(&rasters);
        assert!(!html.contains(&STANDARD.encode(b"ghost")));
    }
}
