//! The structured-extraction prompt sent with every document.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the requested schema or a
//!    merging rule requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the prompt directly without
//!    a live model call, making prompt regressions easy to catch.

use crate::pipeline::loader::ExtractedContent;

/// Instruction template for loan-term extraction.
///
/// The key names requested here are load-bearing: the normalizer and the
/// typed accessors in [`crate::record`] use the same constants. The schedule
/// row label drifts between `Due Date` and `Tenor` across model revisions,
/// which the normalizer tolerates.
pub const EXTRACTION_PROMPT: &str = r#"You are a loan-contract analyst. Extract the loan terms and the payment schedule from the provided document content.

Respond with a single JSON object using exactly these keys:

{
  "lender_name": string or null,
  "borrower_name": string or null,
  "loan_amount": float or null,
  "interest_rate": float or null (percentage points, e.g. 4.5 for 4.5%),
  "loan_term": string or null (e.g. "36 months"),
  "agreement_date": string or null,
  "payment_schedule": [
    {
      "Due Date": string,
      "Principal": float,
      "Principal Repayment": float,
      "Interest Repayment": float,
      "Monthly Repayment": float
    }
  ]
}

Follow these rules precisely:

1. MERGING
   - If the same loan terms appear on multiple pages or in multiple sections, report them once.
   - If schedule rows are split across pages or tables, concatenate them into one array in document order.

2. MISSING DATA
   - Use null (or omit the key) for any field you cannot find in the document.
   - NEVER fabricate or estimate a value that is not present.

3. OUTPUT FORMAT
   - Output ONLY the JSON object.
   - Do NOT wrap it in markdown fences.
   - Do NOT add commentary or explanations."#;

/// A fixed instruction plus the content it applies to.
///
/// Not persisted; built per request and handed straight to the model client.
#[derive(Debug, Clone)]
pub struct ExtractionPrompt {
    /// The system instruction. Always [`EXTRACTION_PROMPT`].
    pub instruction: &'static str,
    /// The extracted document content the instruction applies to.
    pub content: ExtractedContent,
}

impl ExtractionPrompt {
    /// The user-message text for text-mode content: pages joined by a
    /// newline. Raster content carries no text (the image is the content).
    pub fn document_text(&self) -> Option<String> {
        match &self.content {
            ExtractedContent::PageTexts(pages) => Some(pages.join("\n")),
            ExtractedContent::PageImage(_) => None,
        }
    }
}

/// Build the extraction prompt for the given content.
///
/// Pure: the same content always yields the same prompt.
pub fn build(content: ExtractedContent) -> ExtractionPrompt {
    ExtractionPrompt {
        instruction: EXTRACTION_PROMPT,
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{keys, row_keys};

    #[test]
    fn prompt_requests_every_schema_key() {
        for key in [
            keys::LENDER_NAME,
            keys::BORROWER_NAME,
            keys::LOAN_AMOUNT,
            keys::INTEREST_RATE,
            keys::LOAN_TERM,
            keys::AGREEMENT_DATE,
            keys::PAYMENT_SCHEDULE,
        ] {
            assert!(EXTRACTION_PROMPT.contains(key), "prompt missing key {key}");
        }
        for key in row_keys::NUMERIC {
            assert!(EXTRACTION_PROMPT.contains(key), "prompt missing row key {key}");
        }
        assert!(EXTRACTION_PROMPT.contains(row_keys::DUE_DATE));
    }

    #[test]
    fn prompt_forbids_fabrication_and_fences() {
        assert!(EXTRACTION_PROMPT.contains("NEVER fabricate"));
        assert!(EXTRACTION_PROMPT.contains("markdown fences"));
    }

    #[test]
    fn text_content_joins_pages_with_newline() {
        let prompt = build(ExtractedContent::PageTexts(vec![
            "Loan Amount: 100.00".into(),
            "Due May 1: 50.00".into(),
        ]));
        assert_eq!(
            prompt.document_text().as_deref(),
            Some("Loan Amount: 100.00\nDue May 1: 50.00")
        );
    }

    #[test]
    fn build_is_deterministic() {
        let a = build(ExtractedContent::PageTexts(vec!["x".into()]));
        let b = build(ExtractedContent::PageTexts(vec!["x".into()]));
        assert_eq!(a.instruction, b.instruction);
        assert_eq!(a.document_text(), b.document_text());
    }
}
