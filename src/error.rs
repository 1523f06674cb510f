//! Error types for the loanlens library.
//!
//! One enum covers the whole request pipeline. Variants are grouped by the
//! stage that produces them: upload validation, document parsing, the
//! upstream model call, and response normalization. The server layer is the
//! sole place where these are translated into HTTP responses — no component
//! below it constructs a status code.
//!
//! [`ExtractError::MalformedModelOutput`] is the one recoverable-for-diagnosis
//! case: it carries the model's raw text verbatim so operators can inspect
//! why parsing failed instead of losing the output.

use thiserror::Error;

/// Which upstream failure class a model call hit.
///
/// Only [`Unavailable`](UpstreamKind::Unavailable) and
/// [`Quota`](UpstreamKind::Quota) are transient; authentication failures are
/// never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// Network failure, 5xx, or per-call timeout.
    Unavailable,
    /// Missing or rejected credential (401/403).
    Auth,
    /// Rate limit or quota exhaustion (429).
    Quota,
}

impl std::fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamKind::Unavailable => write!(f, "service unavailable"),
            UpstreamKind::Auth => write!(f, "authentication failed"),
            UpstreamKind::Quota => write!(f, "quota exceeded"),
        }
    }
}

/// All errors returned by the loanlens library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The upload's declared content type is not one we accept.
    /// Raised before any parsing is attempted.
    #[error("Unsupported media type '{declared}'. Accepted types: application/pdf, image/*.")]
    UnsupportedMediaType { declared: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// The bytes could not be parsed as the declared document type.
    #[error("Corrupt document: {detail}")]
    CorruptDocument { detail: String },

    /// The configured raster page exceeds the document's page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The upstream model call failed. `kind` distinguishes transient
    /// failures from credential problems; `detail` carries the cause.
    #[error("Upstream model error ({kind}): {detail}")]
    Upstream { kind: UpstreamKind, detail: String },

    /// The configured provider could not be initialised (missing API key etc.).
    #[error("Model provider is not configured.\n{hint}")]
    ProviderNotConfigured { hint: String },

    // ── Normalization errors ──────────────────────────────────────────────
    /// The model's output was not valid JSON after fence stripping.
    ///
    /// `raw` is the stripped text, preserved verbatim for diagnostics —
    /// never discarded.
    #[error("Model output is not valid JSON")]
    MalformedModelOutput { raw: String },

    /// The model returned valid JSON of the wrong top-level shape
    /// (array or scalar instead of an object).
    #[error("Model output has unexpected shape: {detail}")]
    UnexpectedShape { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Whether the orchestrator may retry the request stage that produced
    /// this error. Only transient upstream failures qualify; authentication
    /// errors and everything local are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExtractError::Upstream {
                kind: UpstreamKind::Unavailable | UpstreamKind::Quota,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_media_type_names_accepted_types() {
        let e = ExtractError::UnsupportedMediaType {
            declared: "text/plain".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("text/plain"));
        assert!(msg.contains("application/pdf"));
        assert!(msg.contains("image/*"));
    }

    #[test]
    fn upstream_display_includes_kind() {
        let e = ExtractError::Upstream {
            kind: UpstreamKind::Quota,
            detail: "429 from provider".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("quota exceeded"), "got: {msg}");
        assert!(msg.contains("429"));
    }

    #[test]
    fn only_transient_upstream_is_retryable() {
        let unavailable = ExtractError::Upstream {
            kind: UpstreamKind::Unavailable,
            detail: "timeout".into(),
        };
        let auth = ExtractError::Upstream {
            kind: UpstreamKind::Auth,
            detail: "bad key".into(),
        };
        let malformed = ExtractError::MalformedModelOutput { raw: "not json".into() };
        assert!(unavailable.is_retryable());
        assert!(!auth.is_retryable());
        assert!(!malformed.is_retryable());
    }

    #[test]
    fn page_out_of_range_display() {
        let e = ExtractError::PageOutOfRange { page: 9, total: 2 };
        assert!(e.to_string().contains("9"));
        assert!(e.to_string().contains("2 pages"));
    }
}
