//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummaryConfigBuilder::progress_callback`] to receive
//! events as the run moves through its stages. The library knows nothing
//! about how the host reports progress; the CLI drives a spinner from it.
//!
//! # Example
//!
//! ```rust
//! use medsum::{Stage, SummaryConfig, SummaryProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl SummaryProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: Stage, items: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage}: {items}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = SummaryConfig::builder()
//!     .progress_callback(counter as Arc<dyn SummaryProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// The stages of one summarisation run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Read page text out of the PDF.
    Pages,
    /// Convert page text/HTML to clean markdown.
    Normalize,
    /// Split normalized pages into overlapping windows.
    Chunk,
    /// Hand the chunks to the extraction strategy.
    Extract,
    /// Write the markdown and DOCX reports.
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Pages => "pages",
            Stage::Normalize => "normalize",
            Stage::Chunk => "chunk",
            Stage::Extract => "extract",
            Stage::Render => "render",
        };
        f.write_str(name)
    }
}

/// Called by the pipeline as it enters and leaves each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Runs are sequential, so events for one run never
/// interleave; implementations still need to be `Send + Sync` because the
/// callback lives in a shareable config.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called once before any stage runs.
    fn on_run_start(&self, source: &str) {
        let _ = source;
    }

    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes.
    ///
    /// `items` is the stage's output count: pages kept, pages normalized,
    /// chunks produced, events extracted, or files written.
    fn on_stage_complete(&self, stage: Stage, items: usize) {
        let _ = (stage, items);
    }

    /// Called once after the last stage succeeded.
    fn on_run_complete(&self, duration_ms: u64) {
        let _ = duration_ms;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;
