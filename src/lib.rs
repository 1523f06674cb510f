//! # loanlens
//!
//! Extract loan terms and payment schedules from contract documents using
//! generative language models.
//!
//! ## Why this crate?
//!
//! Loan contracts arrive as PDFs and phone-camera images with wildly varying
//! layouts; template-based parsers break on every new lender. Instead this
//! crate hands the document content — extracted text or a rasterised page —
//! to a hosted language model with a structured-extraction prompt, then
//! deterministically normalizes the model's JSON into a stable record shape.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Upload (PDF | image)
//!  │
//!  ├─ 1. Load       validate media type; extract page text or rasterise
//!  │                a page via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 2. Prompt     fixed structured-extraction instruction template
//!  ├─ 3. Infer      one call to gemini / gpt / claude via edgequake-llm,
//!  │                bounded by a timeout, capped retry in the orchestrator
//!  ├─ 4. Normalize  strip fences, parse JSON, rename drifting keys,
//!  │                optional display formatting
//!  └─ 5. Respond    LoanRecord as the JSON body
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loanlens::{extract, ExtractionConfig, LiveModelClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let client = LiveModelClient::from_config(&config)?;
//!     let bytes = std::fs::read("contract.pdf")?;
//!     let record = extract(bytes, "application/pdf", &client, &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&record)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Enables the axum HTTP surface and the `loanlens` binary |
//!
//! Disable `server` when using only the library to avoid pulling in the
//! HTTP stack:
//! ```toml
//! loanlens = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod record;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, ExtractionMode, FormatMode};
pub use error::{ExtractError, UpstreamKind};
pub use extract::extract;
pub use pipeline::loader::ExtractedContent;
pub use pipeline::model::{LiveModelClient, ModelClient};
pub use prompts::ExtractionPrompt;
pub use record::LoanRecord;
