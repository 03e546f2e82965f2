//! The extraction seam: chunks plus an optional instruction in, raw
//! summary-shaped JSON out.
//!
//! Strategies only produce JSON. Shape validation is owned by
//! [`crate::summary::MedicalSummary::from_extraction`], so a rule-based,
//! LLM-backed or hybrid strategy all pass through the same gate.

use crate::error::SummaryError;
use crate::pipeline::chunk::Chunk;
use crate::pipeline::llm::CompletionBackend;
use crate::pipeline::normalize::strip_code_fences;
use crate::prompts;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Produces a summary-shaped JSON value from chunked case text.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    async fn extract(
        &self,
        chunks: &[Chunk],
        instruction: Option<&str>,
    ) -> Result<serde_json::Value, SummaryError>;
}

/// An [`ExtractionStrategy`] that asks a completion backend for JSON.
pub struct LlmExtractor {
    backend: Arc<dyn CompletionBackend>,
    system_prompt: String,
}

impl LlmExtractor {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            system_prompt: prompts::DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Replace the built-in system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

#[async_trait]
impl ExtractionStrategy for LlmExtractor {
    async fn extract(
        &self,
        chunks: &[Chunk],
        instruction: Option<&str>,
    ) -> Result<serde_json::Value, SummaryError> {
        let user = prompts::user_prompt(chunks, instruction);
        info!(
            "Extracting from {} chunks via {} ({} prompt chars)",
            chunks.len(),
            self.backend.name(),
            user.len()
        );
        let reply = self.backend.complete(&self.system_prompt, &user).await?;
        debug!("Extraction reply: {} chars", reply.len());
        parse_reply(&reply)
    }
}

/// Parse a model reply as JSON, tolerating one wrapping code fence.
fn parse_reply(reply: &str) -> Result<serde_json::Value, SummaryError> {
    let body = strip_code_fences(reply);
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(120).collect();
        SummaryError::MalformedExtraction(format!("reply is not JSON ({e}): {preview}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned {
        reply: &'static str,
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CompletionBackend for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, system: &str, user: &str) -> Result<String, SummaryError> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            Ok(self.reply.to_string())
        }
    }

    fn canned(reply: &'static str) -> Arc<Canned> {
        Arc::new(Canned {
            reply,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn fenced_reply_is_parsed() {
        let backend = canned("```json\n{\"profile\": {\"ssn\": \"123-45-6789\"}}\n```");
        let value = LlmExtractor::new(backend.clone())
            .extract(&[], Some("add a meds table"))
            .await
            .unwrap();
        assert_eq!(value["profile"]["ssn"], "123-45-6789");
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].0, prompts::DEFAULT_SYSTEM_PROMPT);
        assert!(seen[0].1.contains("add a meds table"));
    }

    #[tokio::test]
    async fn custom_system_prompt_is_used() {
        let backend = canned("{}");
        LlmExtractor::new(backend.clone())
            .with_system_prompt("only JSON")
            .extract(&[], None)
            .await
            .unwrap();
        assert_eq!(backend.seen.lock().unwrap()[0].0, "only JSON");
    }

    #[test]
    fn prose_reply_is_malformed() {
        let err = parse_reply("Sure! Here is the summary you asked for.").unwrap_err();
        assert!(matches!(err, SummaryError::MalformedExtraction(_)));
    }
}
