//! CLI binary for medsum.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SummaryConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use medsum::{
    save_markdown, summarize, summarize_to_dir, ProgressCallback, Stage, SummaryConfig,
    SummaryOutput, SummaryProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the running stage and one
/// log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Checking configuration…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(None),
        })
    }
}

fn stage_unit(stage: Stage) -> &'static str {
    match stage {
        Stage::Pages => "pages kept",
        Stage::Normalize => "pages normalized",
        Stage::Chunk => "chunks",
        Stage::Extract => "events",
        Stage::Render => "reports written",
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_run_start(&self, source: &str) {
        self.bar
            .println(format!("{} {}", cyan("◆"), bold(&format!("Summarising {source}…"))));
    }

    fn on_stage_start(&self, stage: Stage) {
        if let Ok(mut started) = self.stage_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("working…");
    }

    fn on_stage_complete(&self, stage: Stage, items: usize) {
        let elapsed_ms = self
            .stage_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        self.bar.println(format!(
            "  {} {:<10} {:>5} {:<17} {}",
            green("✓"),
            stage.to_string(),
            items,
            stage_unit(stage),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        if stage == Stage::Render {
            self.bar.finish_and_clear();
        }
    }

    fn on_run_complete(&self, duration_ms: u64) {
        self.bar.set_prefix("done");
        self.bar.set_message(format!("{duration_ms}ms"));
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a case file into outputs/reports/
  medsum case.pdf

  # Fill a firm's DOCX template and request an extra table
  medsum case.pdf --template summary_template.docx \
      --instructions extra_tables.txt --output-dir outputs/case-42

  # Print the structured summary as JSON, no report files
  medsum case.pdf --skip-reports --json > summary.json

  # Keep the normalized page markdown for auditing
  medsum case.pdf --markdown-out outputs/case-42/pages.md

  # Try OpenAI first, fall back to a local Ollama model
  medsum case.pdf --provider openai --provider ollama --model gpt-4.1-mini

OUTPUT FILES:
  <output-dir>/medical_summary.md     Profile, timeline and custom tables
  <output-dir>/medical_summary.docx   Header block and DATE/PROVIDER/REASON/REF table

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when --provider is not given
  EDGEQUAKE_MODEL         Model used with EDGEQUAKE_LLM_PROVIDER
  RUST_LOG                Log filter (overrides -v / -q)
"#;

/// Build medical-claim summaries from PDF case files.
#[derive(Parser, Debug)]
#[command(
    name = "medsum",
    version,
    about = "Build medical-claim summaries (markdown + DOCX) from PDF case files",
    long_about = "Extract a claimant profile, a timeline of medical events and optional custom \
tables from a PDF case file using an LLM, then render them as markdown and DOCX reports, \
optionally on top of a DOCX template.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// DOCX template the report is appended to.
    #[arg(short, long, env = "MEDSUM_TEMPLATE")]
    template: Option<PathBuf>,

    /// Text file with custom instructions (e.g. extra tables to build).
    #[arg(short, long, env = "MEDSUM_INSTRUCTIONS")]
    instructions: Option<PathBuf>,

    /// Directory receiving medical_summary.md and medical_summary.docx.
    #[arg(short, long, env = "MEDSUM_OUTPUT_DIR", default_value = "outputs/reports")]
    output_dir: PathBuf,

    /// Maximum characters per chunk.
    #[arg(long, env = "MEDSUM_CHUNK_SIZE", default_value_t = medsum::config::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks (must be < chunk size).
    #[arg(
        long,
        env = "MEDSUM_CHUNK_OVERLAP",
        default_value_t = medsum::config::DEFAULT_CHUNK_OVERLAP
    )]
    chunk_overlap: usize,

    /// Keep pages whose extracted text is blank.
    #[arg(long, env = "MEDSUM_INCLUDE_EMPTY_PAGES")]
    include_empty_pages: bool,

    /// LLM provider, repeatable; tried in order until one succeeds.
    #[arg(
        long = "provider",
        env = "MEDSUM_PROVIDERS",
        value_delimiter = ',',
        long_help = "LLM provider(s): openai, anthropic, gemini, azure, ollama, …\n\
          Repeat the flag (or comma-separate) to build a fallback chain.\n\
          Auto-detected from API key env vars if not set."
    )]
    providers: Vec<String>,

    /// LLM model ID used with every named provider.
    #[arg(long, env = "MEDSUM_MODEL")]
    model: Option<String>,

    /// Path to a text file containing a custom extraction system prompt.
    #[arg(long, env = "MEDSUM_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Named DOCX table style for the timeline.
    #[arg(long, env = "MEDSUM_TABLE_STYLE", default_value = medsum::config::DEFAULT_TABLE_STYLE)]
    table_style: String,

    /// Max LLM output tokens for the extraction call.
    #[arg(long, env = "MEDSUM_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "MEDSUM_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries per provider on LLM failure.
    #[arg(long, env = "MEDSUM_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Do not write the markdown/DOCX reports.
    #[arg(long, env = "MEDSUM_SKIP_REPORTS")]
    skip_reports: bool,

    /// Also save the normalized page markdown to this file.
    #[arg(long, env = "MEDSUM_MARKDOWN_OUT")]
    markdown_out: Option<PathBuf>,

    /// Print the structured summary as JSON on stdout.
    #[arg(long, env = "MEDSUM_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "MEDSUM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MEDSUM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MEDSUM_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "MEDSUM_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; -v always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SummaryProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    let instruction = match cli.instructions {
        Some(ref path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read instructions from {:?}", path))?,
        ),
        None => None,
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let template = cli.template.as_deref();
    let output: SummaryOutput = if cli.skip_reports {
        summarize(&cli.input, template, instruction.as_deref(), &config).await
    } else {
        summarize_to_dir(&cli.input, template, instruction.as_deref(), &config).await
    }
    .context("Summary failed")?;
    // The config holds the spinner; dropping it clears the line.
    drop(config);

    if let Some(ref path) = cli.markdown_out {
        save_markdown(&[output.markdown.as_str()], path)
            .with_context(|| format!("Failed to save page markdown to {:?}", path))?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output.summary)
            .context("Failed to serialise summary")?;
        println!("{json}");
    }

    if !cli.quiet {
        print_result(&output, cli.markdown_out.as_ref());
    }

    Ok(())
}

fn print_result(output: &SummaryOutput, markdown_out: Option<&PathBuf>) {
    let stats = &output.stats;
    eprintln!(
        "{}  {}/{} pages  {} chunks  {} events  {}ms",
        green("✔"),
        stats.kept_pages,
        stats.total_pages,
        stats.chunk_count,
        stats.event_count,
        stats.total_duration_ms,
    );
    if let Some(ref reports) = output.reports {
        eprintln!("   {}", bold(&reports.markdown.display().to_string()));
        eprintln!("   {}", bold(&reports.docx.display().to_string()));
    }
    if let Some(path) = markdown_out {
        eprintln!("   {}", dim(&path.display().to_string()));
    }
}

/// Map CLI args to `SummaryConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SummaryConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = SummaryConfig::builder()
        .chunk_size(cli.chunk_size)
        .chunk_overlap(cli.chunk_overlap)
        .include_empty_pages(cli.include_empty_pages)
        .output_dir(&cli.output_dir)
        .table_style(&cli.table_style)
        .providers(cli.providers.iter().cloned())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
