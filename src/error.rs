//! Error types for the medsum library.
//!
//! Every failure in a run is fatal: a summary is either produced from the
//! whole case file or not at all, so there is a single error type,
//! [`SummaryError`], returned from every stage and propagated unchanged to
//! the caller of [`crate::summarize::summarize`].
//!
//! The one deliberately tolerant path, a DOCX table style missing from the
//! template, is not an error at all and never reaches this type (see
//! [`crate::report::styles`]).

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the medsum library.
#[derive(Debug, Error)]
pub enum SummaryError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input PDF or template was not found at the given path.
    #[error("Source file not found: '{path}'\nCheck the path exists and is readable.")]
    SourceNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The PDF could not be parsed (corrupt, encrypted, unsupported).
    #[error("Cannot extract text from PDF '{path}': {detail}")]
    ExtractionFailure { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Invalid chunking parameters or missing external credentials.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Extraction-service errors ─────────────────────────────────────────
    /// The extraction strategy returned data that does not fit the summary shape.
    #[error("Malformed extraction result: {0}")]
    MalformedExtraction(String),

    /// A completion backend failed after its retries.
    #[error("Extraction backend '{backend}' failed: {message}")]
    ExtractionService { backend: String, message: String },

    /// Every backend of a fallback chain failed.
    #[error("All {attempts} extraction backends failed:\n{}", errors.join("\n"))]
    AllBackendsFailed { attempts: usize, errors: Vec<String> },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output artifact.
    #[error("Failed to write '{path}': {source}")]
    RenderFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SummaryError {
    /// Wrap an I/O failure on an output path.
    pub(crate) fn render(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SummaryError::RenderFailure {
            path: path.into(),
            source,
        }
    }
}
