//! Configuration types for loan-contract extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share the config across request handlers behind an `Arc`,
//! and to diff two deployments to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::ExtractError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How the Document Loader turns a PDF into model input.
///
/// Both modes exist because neither dominates: text extraction is cheap and
/// token-efficient but garbles scanned or heavily tabular contracts; raster
/// mode lets a vision model read the page as a human would, at higher cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractionMode {
    /// Extract each page's text layer. (default)
    #[default]
    Text,
    /// Rasterise a configured page to an RGB bitmap for a vision model.
    Raster,
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ExtractionMode::Text),
            "raster" | "image" => Ok(ExtractionMode::Raster),
            other => Err(format!("unknown extraction mode '{other}' (expected 'text' or 'raster')")),
        }
    }
}

/// How numeric payment-schedule fields are emitted in the response.
///
/// The upstream model is asked for raw numbers; `DisplayString` reformats
/// them to two-decimal, comma-grouped strings for UIs that render the
/// schedule verbatim. An explicit mode rather than an implicit choice because
/// consumers of the two shapes are incompatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FormatMode {
    /// Leave values exactly as the model produced them. (default)
    #[default]
    RawNumeric,
    /// Reformat numeric fields to `1,234.50`-style strings.
    DisplayString,
}

impl FromStr for FormatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" | "raw-numeric" | "numeric" => Ok(FormatMode::RawNumeric),
            "display" | "display-string" => Ok(FormatMode::DisplayString),
            other => Err(format!("unknown format mode '{other}' (expected 'raw' or 'display')")),
        }
    }
}

/// Configuration for a loan-contract extraction pipeline.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use loanlens::{ExtractionConfig, ExtractionMode};
///
/// let config = ExtractionConfig::builder()
///     .mode(ExtractionMode::Raster)
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// PDF handling mode. Default: [`ExtractionMode::Text`].
    pub mode: ExtractionMode,

    /// Which page to rasterise in raster mode, 1-indexed. Default: 1.
    ///
    /// Loan contracts front-load their key terms, so the first page is the
    /// right default; schedules on later pages need a different index or
    /// text mode.
    pub raster_page: usize,

    /// Numeric formatting applied by the normalizer. Default: [`FormatMode::RawNumeric`].
    pub format_mode: FormatMode,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap independent of page size. An A0 poster page could produce
    /// a 13 000 × 18 000 px image and exhaust memory; this field caps either
    /// dimension, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// LLM model identifier, e.g. "gemini-2.0-flash", "gpt-4.1-nano".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the model call. Default: 0.0.
    ///
    /// Extraction wants the model deterministic and faithful to the page;
    /// any creativity worsens field accuracy.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// Long amortisation schedules (360 monthly rows) are the sizing case;
    /// setting this too low silently truncates the JSON mid-array.
    pub max_tokens: usize,

    /// Total model-call attempts, clamped to 1..=2. Default: 1.
    ///
    /// Transient upstream failures may warrant one retry, but the model call
    /// is the dominant request cost, so attempts are hard-capped at 2.
    /// Authentication failures are never retried regardless of this value.
    pub max_attempts: u32,

    /// Initial retry delay in milliseconds (doubles per attempt). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-model-call timeout in seconds. Default: 60.
    ///
    /// A timeout is reported identically to an unavailable upstream.
    pub api_timeout_secs: u64,

    /// Maximum accepted upload size in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::Text,
            raster_page: 1,
            format_mode: FormatMode::RawNumeric,
            max_rendered_pixels: 2000,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_attempts: 1,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("mode", &self.mode)
            .field("raster_page", &self.raster_page)
            .field("format_mode", &self.format_mode)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn mode(mut self, mode: ExtractionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn raster_page(mut self, page: usize) -> Self {
        self.config.raster_page = page.max(1);
        self
    }

    pub fn format_mode(mut self, mode: FormatMode) -> Self {
        self.config.format_mode = mode;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
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

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.max_attempts == 0 || c.max_attempts > 2 {
            return Err(ExtractError::InvalidConfig(format!(
                "max_attempts must be 1 or 2, got {}",
                c.max_attempts
            )));
        }
        if c.raster_page == 0 {
            return Err(ExtractError::InvalidConfig(
                "raster_page is 1-indexed and must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
