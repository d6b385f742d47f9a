//! Error types for the cardpress library.
//!
//! Every failure in the pipeline is fatal for the run — there is no per-card
//! retry and no partial-success mode — so a single enum covers the whole
//! taxonomy:
//!
//! * **Configuration** — nothing to do, unsupported data file, invalid knobs.
//! * **Data** — unreadable or malformed CSV/JSON/YAML input.
//! * **Resources** — missing template, stylesheet, or image files.
//! * **Rendering** — failures raised by the render host while driving a page.
//! * **Assembly** — failure while laying out and exporting the PDF sheet.
//!
//! The library never terminates the process: every variant propagates up to
//! the caller (the CLI binary, a test, or an embedding application), which
//! decides the exit status. The one deliberate exception to "errors are
//! errors" is the template-side image *existence check*, which reports
//! `false` instead of failing — see [`crate::pipeline::template`].

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the cardpress library.
#[derive(Debug, Error)]
pub enum CardpressError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// Neither PNG nor PDF output was requested.
    #[error("Nothing to do: both PNG and PDF output are disabled.\nEnable at least one output format.")]
    NoOutputSelected,

    /// The data file extension maps to no known parser.
    #[error("Unsupported data file: '{path}'\nSupported extensions: .csv, .json, .yml, .yaml")]
    UnsupportedDataFile { path: PathBuf },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Data errors ───────────────────────────────────────────────────────
    /// The data file exists but could not be read.
    #[error("Failed to read data file '{path}': {source}")]
    DataRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data file was read but could not be parsed into card records.
    #[error("Malformed data in '{path}': {detail}")]
    MalformedData { path: PathBuf, detail: String },

    // ── Resource errors ───────────────────────────────────────────────────
    /// The card template file was not found or could not be read.
    #[error("Template not found: '{path}'\nCheck the `template` setting and the base directory.")]
    TemplateNotFound { path: PathBuf },

    /// Template evaluation failed (syntax error, undefined field, helper failure).
    #[error("Failed to render {name}: {detail}")]
    TemplateRender { name: String, detail: String },

    /// An image was requested with an empty path.
    #[error("Invalid image path: empty string")]
    InvalidImagePath,

    /// An image referenced from a template does not exist.
    #[error("Image not found: '{path}'\nPaths are resolved relative to the configured image directory.")]
    ImageNotFound { path: PathBuf },

    /// An image path resolved to a directory instead of a file.
    #[error("Found a directory at image path: '{path}'")]
    ImageIsDirectory { path: PathBuf },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// The render host (headless browser) could not be started.
    #[error("Failed to launch render host: {detail}\nA Chrome or Chromium installation is required.")]
    HostLaunch { detail: String },

    /// The render host failed during a page, content, or raster operation.
    #[error("Render host error: {detail}")]
    Render { detail: String },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// PDF layout or export failed.
    #[error("PDF assembly failed: {detail}")]
    Assembly { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
