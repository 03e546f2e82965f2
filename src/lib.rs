//! # medsum
//!
//! Build structured medical-claim summaries from PDF case files.
//!
//! A case file is read page by page, normalised to markdown, cut into
//! overlapping chunks and handed to an extraction strategy (by default an
//! LLM behind a provider fallback chain). The strategy's JSON is validated
//! into a [`MedicalSummary`]: claimant profile, event timeline and any
//! custom tables requested by a free-text instruction. The summary is then
//! rendered as `medical_summary.md` and `medical_summary.docx`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Pages      text layer per page via lopdf (spawn_blocking)
//!  ├─ 3. Normalize  HTML/plain text → clean markdown
//!  ├─ 4. Chunk      overlapping windows carrying page provenance
//!  ├─ 5. Extract    strategy → JSON → validated MedicalSummary
//!  └─ 6. Render     markdown + DOCX (optionally on a template)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medsum::{summarize_to_dir, SummaryConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = SummaryConfig::builder().output_dir("outputs/case-42").build()?;
//!     let output = summarize_to_dir(
//!         "case.pdf",
//!         Some(Path::new("template.docx")),
//!         Some("Add an Education History table"),
//!         &config,
//!     )
//!     .await?;
//!     println!("{} events", output.summary.events.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Bring your own extractor
//!
//! Anything implementing [`ExtractionStrategy`] can replace the LLM; set it
//! with [`SummaryConfigBuilder::extractor`]. Its output still goes through
//! [`MedicalSummary::from_extraction`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `medsum` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod summarize;
pub mod summary;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SummaryConfig, SummaryConfigBuilder};
pub use error::SummaryError;
pub use output::{RunStats, SummaryOutput};
pub use pipeline::chunk::{reassemble, Chunk, Chunker};
pub use pipeline::extract::{ExtractionStrategy, LlmExtractor};
pub use pipeline::llm::{CompletionBackend, FallbackBackend, ProviderBackend};
pub use pipeline::normalize::{save_markdown, to_markdown};
pub use pipeline::pages::{Metadata, Page, PageExtractor};
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, SummaryProgressCallback};
pub use report::{ReportPaths, ReportRenderer};
pub use summarize::{summarize, summarize_from_bytes, summarize_sync, summarize_to_dir};
pub use summary::{
    CellValue, ClaimantProfile, CustomTables, DateValue, MedicalEvent, MedicalSummary, TableRow,
};
