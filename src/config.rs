//! Configuration for a summarisation run.
//!
//! All run behaviour is controlled through [`SummaryConfig`], built via its
//! [`SummaryConfigBuilder`]. Chunking parameters are validated when the
//! config is built, never later: a config that exists is a config the
//! chunker accepts.

use crate::error::SummaryError;
use crate::pipeline::extract::ExtractionStrategy;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1500;
/// Default characters shared between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Table style requested for the DOCX timeline.
pub const DEFAULT_TABLE_STYLE: &str = "Light List";

/// Configuration for one summarisation run.
///
/// Built via [`SummaryConfig::builder()`] or using [`SummaryConfig::default()`].
///
/// # Example
/// ```rust
/// use medsum::SummaryConfig;
///
/// let config = SummaryConfig::builder()
///     .chunk_size(1000)
///     .chunk_overlap(100)
///     .output_dir("outputs/case-42")
///     .build()
///     .unwrap();
/// assert_eq!(config.chunk_size, 1000);
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Maximum characters per chunk. Default: 1500.
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks of one page. Default: 200.
    /// Must be strictly smaller than `chunk_size`.
    pub chunk_overlap: usize,

    /// Keep pages whose extracted text is blank. Default: false.
    pub include_empty_pages: bool,

    /// Directory receiving `medical_summary.md` and `medical_summary.docx`.
    /// Default: `outputs/reports`.
    pub output_dir: PathBuf,

    /// Named style applied to the DOCX timeline table. Default: "Light List".
    ///
    /// Falls back to the document's default table style, then to no style.
    pub table_style: String,

    /// Ordered provider names for the completion fallback chain
    /// (e.g. `["openai", "ollama"]`). Empty means auto-detect from the
    /// environment.
    pub providers: Vec<String>,

    /// Model identifier passed to every named provider.
    pub model: Option<String>,

    /// Sampling temperature for extraction calls. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate for one extraction. Default: 4096.
    pub max_tokens: usize,

    /// Retries per backend on a failed completion call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom extraction system prompt. If None, uses the built-in one.
    pub system_prompt: Option<String>,

    /// Pre-constructed extraction strategy. Takes precedence over `providers`.
    pub extractor: Option<Arc<dyn ExtractionStrategy>>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            include_empty_pages: false,
            output_dir: PathBuf::from("outputs/reports"),
            table_style: DEFAULT_TABLE_STYLE.to_string(),
            providers: Vec::new(),
            model: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            system_prompt: None,
            extractor: None,
            progress_callback: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("include_empty_pages", &self.include_empty_pages)
            .field("output_dir", &self.output_dir)
            .field("table_style", &self.table_style)
            .field("providers", &self.providers)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field(
                "extractor",
                &self.extractor.as_ref().map(|_| "<dyn ExtractionStrategy>"),
            )
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SummaryConfig`].
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.config.chunk_size = n;
        self
    }

    pub fn chunk_overlap(mut self, n: usize) -> Self {
        self.config.chunk_overlap = n;
        self
    }

    pub fn include_empty_pages(mut self, v: bool) -> Self {
        self.config.include_empty_pages = v;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn table_style(mut self, style: impl Into<String>) -> Self {
        self.config.table_style = style.into();
        self
    }

    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.config.providers.push(name.into());
        self
    }

    pub fn providers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.providers = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ExtractionStrategy>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, SummaryError> {
        validate_chunking(self.config.chunk_size, self.config.chunk_overlap)?;
        if self.config.table_style.trim().is_empty() {
            return Err(SummaryError::InvalidConfig(
                "table style name must not be blank".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Check the chunker's preconditions: a positive size and `overlap < size`.
pub(crate) fn validate_chunking(size: usize, overlap: usize) -> Result<(), SummaryError> {
    if size == 0 {
        return Err(SummaryError::InvalidConfig(
            "chunk_size must be at least 1".into(),
        ));
    }
    if overlap >= size {
        return Err(SummaryError::InvalidConfig(format!(
            "chunk_overlap ({overlap}) must be smaller than chunk_size ({size})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = SummaryConfig::default();
        assert_eq!(c.chunk_size, 1500);
        assert_eq!(c.chunk_overlap, 200);
        assert!(!c.include_empty_pages);
        assert_eq!(c.table_style, "Light List");
        assert_eq!(c.output_dir, PathBuf::from("outputs/reports"));
    }

    #[test]
    fn overlap_equal_to_size_is_rejected() {
        let err = SummaryConfig::builder()
            .chunk_size(100)
            .chunk_overlap(100)
            .build()
            .unwrap_err();
        assert!(matches!(err, SummaryError::InvalidConfig(_)));
        assert!(err.to_string().contains("chunk_overlap (100)"));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = SummaryConfig::builder()
            .chunk_size(0)
            .chunk_overlap(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, SummaryError::InvalidConfig(_)));
    }

    #[test]
    fn providers_accumulate_in_order() {
        let c = SummaryConfig::builder()
            .provider("openai")
            .provider("ollama")
            .build()
            .unwrap();
        assert_eq!(c.providers, vec!["openai", "ollama"]);
    }

    #[test]
    fn temperature_is_clamped() {
        let c = SummaryConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }
}
