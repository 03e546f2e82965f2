//! Completion backends for LLM-driven extraction.
//!
//! [`CompletionBackend`] is the narrow seam the extractor talks to: a system
//! prompt and a user prompt in, the model's text out. Two implementations:
//!
//! * [`ProviderBackend`] wraps one `edgequake_llm` provider and retries failed
//!   calls with exponential backoff (`retry_backoff_ms * 2^attempt`), e.g.
//!   500 ms → 1 s → 2 s with the defaults.
//! * [`FallbackBackend`] walks an ordered list of backends and returns the
//!   first success. Earlier failures are logged and only reported, all
//!   together, when every backend has failed.

use crate::config::SummaryConfig;
use crate::error::SummaryError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Model used for named providers when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Something that can turn a prompt into text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short name used in logs and aggregated errors.
    fn name(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, system: &str, user: &str) -> Result<String, SummaryError>;
}

/// Retry and sampling settings for a [`ProviderBackend`].
#[derive(Debug, Clone, Copy)]
pub struct CallSettings {
    pub temperature: f32,
    pub max_tokens: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl From<&SummaryConfig> for CallSettings {
    fn from(c: &SummaryConfig) -> Self {
        Self {
            temperature: c.temperature,
            max_tokens: c.max_tokens,
            max_retries: c.max_retries,
            retry_backoff_ms: c.retry_backoff_ms,
        }
    }
}

/// One `edgequake_llm` provider with retry/backoff.
pub struct ProviderBackend {
    name: String,
    provider: Arc<dyn LLMProvider>,
    settings: CallSettings,
}

impl ProviderBackend {
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        settings: CallSettings,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            settings,
        }
    }
}

#[async_trait]
impl CompletionBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, SummaryError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let options = build_options(&self.settings);
        let mut last_err: Option<String> = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let backoff = self.settings.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    self.name, attempt, self.settings.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        "{}: {} input tokens, {} output tokens, {:?}",
                        self.name,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Err(e) => {
                    let err_msg = format!("{e}");
                    warn!("{}: attempt {} failed: {}", self.name, attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(SummaryError::ExtractionService {
            backend: self.name.clone(),
            message: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

/// Build `CompletionOptions` from the call settings.
fn build_options(settings: &CallSettings) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(settings.temperature),
        max_tokens: Some(settings.max_tokens),
        ..Default::default()
    }
}

/// Ordered backends; the first success wins.
pub struct FallbackBackend {
    backends: Vec<Arc<dyn CompletionBackend>>,
    name: String,
}

impl FallbackBackend {
    pub fn new(backends: Vec<Arc<dyn CompletionBackend>>) -> Result<Self, SummaryError> {
        if backends.is_empty() {
            return Err(SummaryError::InvalidConfig(
                "fallback chain needs at least one backend".into(),
            ));
        }
        let name = backends
            .iter()
            .map(|b| b.name())
            .collect::<Vec<_>>()
            .join(" -> ");
        Ok(Self { backends, name })
    }

}

#[async_trait]
impl CompletionBackend for FallbackBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, SummaryError> {
        let mut errors = Vec::new();
        for backend in &self.backends {
            match backend.complete(system, user).await {
                Ok(text) => {
                    if !errors.is_empty() {
                        info!(
                            "{} succeeded after {} failed backend(s)",
                            backend.name(),
                            errors.len()
                        );
                    }
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Backend {} failed, trying next: {}", backend.name(), e);
                    errors.push(format!("{}: {}", backend.name(), e));
                }
            }
        }
        Err(SummaryError::AllBackendsFailed {
            attempts: self.backends.len(),
            errors,
        })
    }
}

/// Build the provider fallback chain for a config.
///
/// Resolution order, from most to least specific:
///
/// 1. **Named providers** (`config.providers`), each with `config.model`.
///    A name the factory cannot build is a configuration error.
/// 2. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 3. **OpenAI** when `OPENAI_API_KEY` is set.
/// 4. **Auto-detection** via `ProviderFactory::from_env`, only if nothing
///    above produced a backend.
///
/// No backend at all means missing credentials, reported as
/// [`SummaryError::InvalidConfig`] before any document work starts.
pub fn resolve_backend(config: &SummaryConfig) -> Result<FallbackBackend, SummaryError> {
    let settings = CallSettings::from(config);
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    let mut backends: Vec<Arc<dyn CompletionBackend>> = Vec::new();

    if !config.providers.is_empty() {
        for name in &config.providers {
            backends.push(named_backend(name, model, settings)?);
        }
        return FallbackBackend::new(backends);
    }

    let mut names: Vec<String> = Vec::new();
    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            backends.push(named_backend(&prov, &env_model, settings)?);
            names.push(prov);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty())
        && !names.iter().any(|n| n == "openai")
    {
        backends.push(named_backend("openai", model, settings)?);
    }

    if backends.is_empty() {
        let (provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| SummaryError::InvalidConfig(format!(
                "No LLM provider could be auto-detected from environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                 Error: {e}"
            )))?;
        backends.push(Arc::new(ProviderBackend::new("auto", provider, settings)));
    }

    FallbackBackend::new(backends)
}

fn named_backend(
    name: &str,
    model: &str,
    settings: CallSettings,
) -> Result<Arc<dyn CompletionBackend>, SummaryError> {
    let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        SummaryError::InvalidConfig(format!("LLM provider '{name}' is not configured: {e}"))
    })?;
    Ok(Arc::new(ProviderBackend::new(
        format!("{name}/{model}"),
        provider,
        settings,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        name: &'static str,
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(name: &'static str, reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Some(reply),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String, SummaryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Some(r) => Ok(r.to_string()),
                None => Err(SummaryError::ExtractionService {
                    backend: self.name.into(),
                    message: "503".into(),
                }),
            }
        }
    }

    #[test]
    fn build_options_carry_settings() {
        let settings = CallSettings::from(&SummaryConfig::default());
        let opts = build_options(&settings);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[tokio::test]
    async fn first_success_wins_and_later_backends_are_not_called() {
        let a = Scripted::failing("a");
        let b = Scripted::ok("b", "from b");
        let c = Scripted::ok("c", "from c");
        let chain = FallbackBackend::new(vec![a.clone(), b.clone(), c.clone()]).unwrap();

        assert_eq!(chain.complete("sys", "user").await.unwrap(), "from b");
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.calls.load(Ordering::SeqCst), 0);
        assert_eq!(chain.name(), "a -> b -> c");
    }

    #[tokio::test]
    async fn all_failures_are_aggregated() {
        let chain =
            FallbackBackend::new(vec![Scripted::failing("a"), Scripted::failing("b")]).unwrap();
        match chain.complete("sys", "user").await.unwrap_err() {
            SummaryError::AllBackendsFailed { attempts, errors } => {
                assert_eq!(attempts, 2);
                assert!(errors[0].starts_with("a: "));
                assert!(errors[1].starts_with("b: "));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_chain_is_a_config_error() {
        assert!(matches!(
            FallbackBackend::new(Vec::new()),
            Err(SummaryError::InvalidConfig(_))
        ));
    }
}
