//! Model interaction: build the chat request and call the provider.
//!
//! The client is deliberately thin — all prompt engineering lives in
//! [`crate::prompts`] so it can be changed without touching transport or
//! error mapping here. The [`ModelClient`] trait is the seam the rest of the
//! pipeline depends on: tests substitute a deterministic stub, production
//! wires in [`LiveModelClient`] over an `edgequake_llm` provider.
//!
//! This component never retries. Retry policy belongs to the orchestrator
//! ([`crate::extract`]), which knows the per-request attempt cap.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, UpstreamKind};
use crate::pipeline::encode;
use crate::pipeline::loader::ExtractedContent;
use crate::prompts::ExtractionPrompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// The capability of turning an extraction prompt into raw model text.
///
/// Every call is a fresh request: the model is non-deterministic, so
/// identical input does not guarantee identical output, and nothing is
/// cached here.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send prompt + content to the model, returning its raw text output.
    async fn infer(&self, prompt: &ExtractionPrompt) -> Result<String, ExtractError>;
}

/// Production [`ModelClient`] backed by an `edgequake_llm` provider.
pub struct LiveModelClient {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    timeout_secs: u64,
}

impl LiveModelClient {
    /// Wrap a pre-built provider with the config's call parameters.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.api_timeout_secs,
        }
    }

    /// Resolve the provider from the config and wrap it.
    ///
    /// Credential comes from the environment (`GEMINI_API_KEY`,
    /// `OPENAI_API_KEY`, …) via the provider factory.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed and
///    configured the provider entirely; used as-is. This is how tests inject
///    doubles below the trait seam.
/// 2. **Named provider + model** (`config.provider_name`) — reads the
///    corresponding API key from the environment.
/// 3. **Full auto-detection** — the factory scans the known API key
///    variables and picks the first available provider.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gemini-2.0-flash");
        return ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            ExtractError::ProviderNotConfigured {
                hint: format!("Provider '{name}' could not be created: {e}"),
            }
        });
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            hint: format!(
                "No LLM provider could be auto-detected from the environment.\n\
                 Set GEMINI_API_KEY, OPENAI_API_KEY, or configure a provider.\n\
                 Error: {e}"
            ),
        })?;
    Ok(provider)
}

#[async_trait]
impl ModelClient for LiveModelClient {
    async fn infer(&self, prompt: &ExtractionPrompt) -> Result<String, ExtractError> {
        let mut messages = vec![ChatMessage::system(prompt.instruction)];

        match &prompt.content {
            ExtractedContent::PageTexts(_) => {
                let text = prompt.document_text().unwrap_or_default();
                messages.push(ChatMessage::user(text));
            }
            ExtractedContent::PageImage(img) => {
                let image_data = encode::encode_page(img)
                    .map_err(|e| ExtractError::Internal(format!("image encoding failed: {e}")))?;
                // Vision APIs require at least one user turn; the image
                // carries all the actual content.
                messages.push(ChatMessage::user_with_images("", vec![image_data]));
            }
        }

        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let call = self.provider.chat(&messages, Some(&options));
        let response = match timeout(Duration::from_secs(self.timeout_secs), call).await {
            Err(_) => {
                return Err(ExtractError::Upstream {
                    kind: UpstreamKind::Unavailable,
                    detail: format!("model call timed out after {}s", self.timeout_secs),
                })
            }
            Ok(Err(e)) => {
                let detail = format!("{e}");
                warn!("model call failed: {detail}");
                return Err(ExtractError::Upstream {
                    kind: classify_upstream(&detail),
                    detail,
                });
            }
            Ok(Ok(response)) => response,
        };

        debug!(
            "model responded: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Classify a provider error message into an upstream failure kind.
///
/// Provider crates do not expose a stable error taxonomy across backends, so
/// this falls back to message inspection. Unknown failures classify as
/// `Unavailable`, the retryable kind, which errs on the side of one more
/// attempt rather than none.
fn classify_upstream(detail: &str) -> UpstreamKind {
    let d = detail.to_ascii_lowercase();
    if d.contains("401")
        || d.contains("403")
        || d.contains("unauthorized")
        || d.contains("api key")
        || d.contains("authentication")
    {
        UpstreamKind::Auth
    } else if d.contains("429") || d.contains("quota") || d.contains("rate limit") {
        UpstreamKind::Quota
    } else {
        UpstreamKind::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_messages_classify_as_auth() {
        assert_eq!(classify_upstream("HTTP 401 Unauthorized"), UpstreamKind::Auth);
        assert_eq!(classify_upstream("Invalid API key provided"), UpstreamKind::Auth);
    }

    #[test]
    fn quota_messages_classify_as_quota() {
        assert_eq!(classify_upstream("429 Too Many Requests"), UpstreamKind::Quota);
        assert_eq!(classify_upstream("Quota exceeded for project"), UpstreamKind::Quota);
        assert_eq!(classify_upstream("rate limit hit"), UpstreamKind::Quota);
    }

    #[test]
    fn everything_else_is_unavailable() {
        assert_eq!(classify_upstream("connection reset by peer"), UpstreamKind::Unavailable);
        assert_eq!(classify_upstream("HTTP 503"), UpstreamKind::Unavailable);
    }
}
