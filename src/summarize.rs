//! Run entry points: one case file in, one [`MedicalSummary`] out.
//!
//! Stages run strictly in sequence and fail fast. The first error aborts the
//! run and is returned unchanged; nothing is rendered for a failed run.
//! Backend credentials and chunking parameters are checked before the PDF is
//! touched, so a misconfigured run fails in milliseconds.

use crate::config::SummaryConfig;
use crate::error::SummaryError;
use crate::output::{RunStats, SummaryOutput};
use crate::pipeline::chunk::Chunker;
use crate::pipeline::extract::{ExtractionStrategy, LlmExtractor};
use crate::pipeline::pages::Page;
use crate::pipeline::{input, llm, normalize, pages};
use crate::progress::{NoopProgressCallback, ProgressCallback, Stage};
use crate::report::ReportRenderer;
use crate::summary::MedicalSummary;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Summarise a PDF file or URL.
///
/// # Arguments
/// * `input_str`: Local file path or HTTP/HTTPS URL to the case PDF
/// * `template`: Optional DOCX template; must exist when given
/// * `instruction`: Optional free text steering which custom tables to build
/// * `config`: Run configuration
///
/// # Errors
/// * `InvalidConfig`: no extraction backend could be built
/// * `SourceNotFound` / `NotAPdf` / `DownloadFailed`: bad input or template
/// * `ExtractionFailure`: the PDF could not be parsed
/// * `MalformedExtraction` / `AllBackendsFailed`: the extraction stage failed
pub async fn summarize(
    input_str: impl AsRef<str>,
    template: Option<&Path>,
    instruction: Option<&str>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting summary: {}", input_str);
    let cb = callback(config);

    // ── Step 1: Eager configuration checks ───────────────────────────────
    let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
    let extractor = resolve_extractor(config)?;

    // ── Step 2: Resolve template and input ───────────────────────────────
    input::resolve_template(template)?;
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    cb.on_run_start(input_str);

    // ── Step 3: Extract pages ────────────────────────────────────────────
    cb.on_stage_start(Stage::Pages);
    let stage_start = Instant::now();
    let raw_pages = pages::extract_pages(resolved.path(), config.include_empty_pages).await?;
    let pages_duration_ms = stage_start.elapsed().as_millis() as u64;
    let total_pages = raw_pages.first().and_then(Page::total_pages).unwrap_or(0);
    info!(
        "Kept {}/{} pages in {}ms",
        raw_pages.len(),
        total_pages,
        pages_duration_ms
    );
    cb.on_stage_complete(Stage::Pages, raw_pages.len());

    // ── Step 4: Normalise to markdown ────────────────────────────────────
    cb.on_stage_start(Stage::Normalize);
    let stage_start = Instant::now();
    let normalized = raw_pages
        .into_iter()
        .map(|page| -> Result<Page, SummaryError> {
            let text = normalize::to_markdown(&page.text)?;
            Ok(Page { text, ..page })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let markdown = normalize::join_pages(
        &normalized.iter().map(|p| p.text.as_str()).collect::<Vec<_>>(),
    );
    let normalize_duration_ms = stage_start.elapsed().as_millis() as u64;
    cb.on_stage_complete(Stage::Normalize, normalized.len());

    // ── Step 5: Chunk ────────────────────────────────────────────────────
    cb.on_stage_start(Stage::Chunk);
    let stage_start = Instant::now();
    let chunks = chunker.split_pages(&normalized);
    let chunk_duration_ms = stage_start.elapsed().as_millis() as u64;
    cb.on_stage_complete(Stage::Chunk, chunks.len());

    // ── Step 6: Extract and validate ─────────────────────────────────────
    cb.on_stage_start(Stage::Extract);
    let stage_start = Instant::now();
    let raw = extractor.extract(&chunks, instruction).await?;
    let summary = MedicalSummary::from_extraction(raw)?;
    let extract_duration_ms = stage_start.elapsed().as_millis() as u64;
    debug!(
        "Extraction returned {} events, {} custom tables",
        summary.events.len(),
        summary.custom_tables.len()
    );
    cb.on_stage_complete(Stage::Extract, summary.events.len());

    let stats = RunStats {
        total_pages,
        kept_pages: normalized.len(),
        chunk_count: chunks.len(),
        event_count: summary.events.len(),
        custom_table_count: summary.custom_tables.len(),
        pages_duration_ms,
        normalize_duration_ms,
        chunk_duration_ms,
        extract_duration_ms,
        render_duration_ms: 0,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Summary complete: {} chunks, {} events, {}ms total",
        stats.chunk_count, stats.event_count, stats.total_duration_ms
    );
    cb.on_run_complete(stats.total_duration_ms);

    Ok(SummaryOutput {
        summary,
        markdown,
        reports: None,
        stats,
    })
}

/// Summarise, then write both reports into `config.output_dir`.
///
/// Rendering runs on the blocking pool. The returned output carries the
/// report paths in [`SummaryOutput::reports`].
pub async fn summarize_to_dir(
    input_str: impl AsRef<str>,
    template: Option<&Path>,
    instruction: Option<&str>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    let mut output = summarize(input_str, template, instruction, config).await?;
    let cb = callback(config);

    cb.on_stage_start(Stage::Render);
    let stage_start = Instant::now();
    let summary = output.summary.clone();
    let template = template.map(Path::to_path_buf);
    let output_dir = config.output_dir.clone();
    let table_style = config.table_style.clone();
    let paths = tokio::task::spawn_blocking(move || {
        ReportRenderer::new(output_dir)?
            .with_table_style(table_style)
            .write_all(&summary, template.as_deref())
    })
    .await
    .map_err(|e| SummaryError::Internal(format!("Report rendering task panicked: {e}")))??;

    output.stats.render_duration_ms = stage_start.elapsed().as_millis() as u64;
    output.stats.total_duration_ms += output.stats.render_duration_ms;
    cb.on_stage_complete(Stage::Render, 2);
    output.reports = Some(paths);
    Ok(output)
}

/// Synchronous wrapper around [`summarize`].
///
/// Creates a temporary tokio runtime internally.
pub fn summarize_sync(
    input_str: impl AsRef<str>,
    template: Option<&Path>,
    instruction: Option<&str>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SummaryError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(summarize(input_str, template, instruction, config))
}

/// Summarise PDF bytes held in memory.
///
/// The bytes go to a managed [`tempfile`] that is removed on return.
pub async fn summarize_from_bytes(
    bytes: &[u8],
    template: Option<&Path>,
    instruction: Option<&str>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| SummaryError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| SummaryError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `summarize` returns
    summarize(&path, template, instruction, config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn callback(config: &SummaryConfig) -> ProgressCallback {
    config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback))
}

/// The configured strategy, or an [`LlmExtractor`] over the resolved
/// backend chain (see [`llm::resolve_backend`]).
fn resolve_extractor(config: &SummaryConfig) -> Result<Arc<dyn ExtractionStrategy>, SummaryError> {
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }
    let backend = llm::resolve_backend(config)?;
    info!("Extraction backends: {}", llm::CompletionBackend::name(&backend));
    let mut extractor = LlmExtractor::new(Arc::new(backend));
    if let Some(ref prompt) = config.system_prompt {
        extractor = extractor.with_system_prompt(prompt.clone());
    }
    Ok(Arc::new(extractor))
}
