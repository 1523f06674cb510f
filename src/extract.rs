//! End-to-end extraction entry point.
//!
//! Orchestrates the pipeline stages: load the upload, build the prompt,
//! call the model, normalize the output. This is the one place that owns
//! retry policy — the model client itself never retries, and normalization
//! failures are never retried because they are not transient.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::pipeline::model::ModelClient;
use crate::pipeline::{loader, normalize};
use crate::prompts;
use crate::record::LoanRecord;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Extract loan terms and a payment schedule from an uploaded document.
///
/// # Arguments
/// * `bytes` — the raw uploaded file
/// * `declared_media_type` — the upload's declared content type
/// * `client` — the model client (production provider or a test stub)
/// * `config` — pipeline configuration
///
/// # Errors
/// Upload validation, document parsing, upstream, and normalization errors
/// propagate unchanged; the HTTP layer is the sole translator to responses.
pub async fn extract(
    bytes: Vec<u8>,
    declared_media_type: &str,
    client: &dyn ModelClient,
    config: &ExtractionConfig,
) -> Result<LoanRecord, ExtractError> {
    let total_start = Instant::now();

    // ── Step 1: Load the document ────────────────────────────────────────
    let content = loader::load(bytes, declared_media_type, config).await?;
    debug!("loaded {content:?}");

    // ── Step 2: Build the prompt ─────────────────────────────────────────
    let prompt = prompts::build(content);

    // ── Step 3: Call the model ───────────────────────────────────────────
    let infer_start = Instant::now();
    let raw = infer_with_retry(client, &prompt, config).await?;
    debug!(
        "model returned {} bytes in {}ms",
        raw.len(),
        infer_start.elapsed().as_millis()
    );

    // ── Step 4: Normalize ────────────────────────────────────────────────
    let record = normalize::normalize(&raw, config.format_mode)?;

    info!(
        "extraction complete: {} schedule rows, {}ms total",
        record.payment_schedule().len(),
        total_start.elapsed().as_millis()
    );
    Ok(record)
}

/// Call the model, retrying transient upstream failures up to the configured
/// attempt cap (at most 2 attempts total) with exponential backoff.
///
/// Authentication failures are never retried; neither is anything local.
async fn infer_with_retry(
    client: &dyn ModelClient,
    prompt: &crate::prompts::ExtractionPrompt,
    config: &ExtractionConfig,
) -> Result<String, ExtractError> {
    let mut last_err: Option<ExtractError> = None;

    for attempt in 0..config.max_attempts {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "model call retry {}/{} after {}ms",
                attempt,
                config.max_attempts - 1,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match client.infer(prompt).await {
            Ok(raw) => return Ok(raw),
            Err(e) if e.is_retryable() && attempt + 1 < config.max_attempts => {
                warn!("model call failed (will retry): {e}");
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| ExtractError::Internal("model call never attempted".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamKind;
    use crate::prompts::ExtractionPrompt;
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Deterministic [`ModelClient`] double: pops scripted responses and
    /// counts invocations.
    struct StubClient {
        responses: Mutex<Vec<Result<String, ExtractError>>>,
        calls: AtomicUsize,
    }

    impl StubClient {
        fn new(responses: Vec<Result<String, ExtractError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelClient for StubClient {
        async fn infer(&self, _prompt: &ExtractionPrompt) -> Result<String, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ExtractError::Internal("stub exhausted".into())))
        }
    }

    fn unavailable() -> ExtractError {
        ExtractError::Upstream {
            kind: UpstreamKind::Unavailable,
            detail: "timeout".into(),
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn unsupported_upload_never_reaches_the_model() {
        let stub = StubClient::new(vec![]);
        let config = ExtractionConfig::default();
        let err = extract(b"plain".to_vec(), "text/plain", &stub, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedMediaType { .. }));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn fenced_output_is_normalized() {
        let stub = StubClient::new(vec![Ok(
            "```json\n{\"loan_amount\":100.0,\"payment_schedule\":[{\"Tenor\":\"May 1\",\"Principal\":50.0}]}\n```"
                .into(),
        )]);
        let config = ExtractionConfig::default();
        let record = extract(png_bytes(), "image/png", &stub, &config)
            .await
            .unwrap();
        assert_eq!(record.loan_amount(), Some(100.0));
        let row = record.payment_schedule()[0].as_object().unwrap();
        assert_eq!(row.get("Due Date").and_then(|v| v.as_str()), Some("May 1"));
        assert!(!row.contains_key("Tenor"));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once_when_allowed() {
        // Responses pop from the end: first Unavailable, then success.
        let stub = StubClient::new(vec![Ok("{}".into()), Err(unavailable())]);
        let config = ExtractionConfig::builder()
            .max_attempts(2)
            .retry_backoff_ms(1)
            .build()
            .unwrap();
        let record = extract(png_bytes(), "image/png", &stub, &config)
            .await
            .unwrap();
        assert!(record.0.is_empty());
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn auth_failure_is_never_retried() {
        let auth = ExtractError::Upstream {
            kind: UpstreamKind::Auth,
            detail: "bad key".into(),
        };
        let stub = StubClient::new(vec![Ok("{}".into()), Err(auth)]);
        let config = ExtractionConfig::builder()
            .max_attempts(2)
            .retry_backoff_ms(1)
            .build()
            .unwrap();
        let err = extract(png_bytes(), "image/png", &stub, &config)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Upstream {
                kind: UpstreamKind::Auth,
                ..
            }
        ));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn default_config_makes_a_single_attempt() {
        let stub = StubClient::new(vec![Err(unavailable())]);
        let config = ExtractionConfig::default();
        let err = extract(png_bytes(), "image/png", &stub, &config)
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "failure itself is transient: {err:?}");
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_output_is_not_retried_and_preserves_text() {
        let stub = StubClient::new(vec![Ok("{}".into()), Ok("I could not find a loan.".into())]);
        let config = ExtractionConfig::builder()
            .max_attempts(2)
            .retry_backoff_ms(1)
            .build()
            .unwrap();
        let err = extract(png_bytes(), "image/png", &stub, &config)
            .await
            .unwrap_err();
        match err {
            ExtractError::MalformedModelOutput { raw } => {
                assert_eq!(raw, "I could not find a loan.");
            }
            other => panic!("expected MalformedModelOutput, got {other:?}"),
        }
        assert_eq!(stub.calls(), 1);
    }
}
