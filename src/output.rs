//! Result types returned by the summarisation entry points.

use crate::report::ReportPaths;
use crate::summary::MedicalSummary;
use serde::Serialize;

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutput {
    /// The validated summary.
    pub summary: MedicalSummary,
    /// Normalized page markdown, pages joined by a blank line.
    pub markdown: String,
    /// Report locations; `None` unless the run rendered reports.
    pub reports: Option<ReportPaths>,
    pub stats: RunStats,
}

/// Counters and per-stage timings for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Pages in the source document (0 when every page was dropped).
    pub total_pages: usize,
    /// Pages kept after blank-page filtering.
    pub kept_pages: usize,
    pub chunk_count: usize,
    pub event_count: usize,
    pub custom_table_count: usize,
    pub pages_duration_ms: u64,
    pub normalize_duration_ms: u64,
    pub chunk_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}
