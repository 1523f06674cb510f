//! Normalization: deterministic cleanup of raw model output into a
//! [`LoanRecord`].
//!
//! ## Why is normalization necessary?
//!
//! Even well-prompted models occasionally introduce artefacts that are
//! *semantically correct* from the model's perspective but *structurally
//! wrong* for a JSON API:
//!
//! - Wrapping the object in ` ```json ... ``` ` fences despite the prompt
//!   saying "do not wrap in fences"
//! - Labelling schedule rows `Tenor` instead of `Due Date`
//! - Emitting amounts as numbers one call and display strings the next
//!
//! This module applies cheap, deterministic rules that fix those quirks
//! without touching content. Keeping them here rather than in the prompt
//! means the prompt stays focused on *what to extract*, not on formatting
//! edge cases. Each rule is a pure function and independently testable —
//! critical since this is the only pipeline stage a test suite can exercise
//! without a live network dependency.
//!
//! ## Rule order
//!
//! Trim, then fence-strip, then parse, then shape-check, then per-row key
//! rename and amount formatting. The fence strip is textual (both fences
//! must be present), not a markdown parse.

use crate::config::FormatMode;
use crate::error::ExtractError;
use crate::record::{keys, row_keys, LoanRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Normalize raw model output into a [`LoanRecord`].
///
/// Unknown keys and values pass through untouched; the upstream schema is
/// not contractually stable and diagnostic information must never be lost.
///
/// # Errors
/// - [`ExtractError::MalformedModelOutput`] when the stripped text is not
///   JSON; the stripped text is preserved verbatim in the error.
/// - [`ExtractError::UnexpectedShape`] when the top level is not an object.
pub fn normalize(raw: &str, mode: FormatMode) -> Result<LoanRecord, ExtractError> {
    let stripped = strip_code_fence(raw.trim());

    let value: Value =
        serde_json::from_str(stripped).map_err(|_| ExtractError::MalformedModelOutput {
            raw: stripped.to_string(),
        })?;

    let mut object = match value {
        Value::Object(map) => map,
        other => {
            return Err(ExtractError::UnexpectedShape {
                detail: format!(
                    "expected a JSON object at the top level, got {}",
                    json_type_name(&other)
                ),
            })
        }
    };

    normalize_schedule(&mut object, mode);
    Ok(LoanRecord(object))
}

// ── Rule 1: Strip the outer code fence ───────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*)\r?\n?```\s*$").unwrap());

/// Strip one leading fence line (optional language tag) and one trailing
/// closing fence. Both must be present; otherwise the input is untouched.
fn strip_code_fence(input: &str) -> &str {
    match RE_OUTER_FENCE.captures(input) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(input),
        None => input,
    }
}

// ── Rule 2: Schedule-row key rename and amount formatting ────────────────────

/// Apply per-row normalization to `payment_schedule`, if present.
///
/// Non-array schedules and non-object rows are left alone; shape policing
/// beyond the top level is not this stage's job.
fn normalize_schedule(object: &mut Map<String, Value>, mode: FormatMode) {
    let Some(Value::Array(rows)) = object.get_mut(keys::PAYMENT_SCHEDULE) else {
        return;
    };
    for row in rows.iter_mut() {
        let Some(row) = row.as_object_mut() else {
            continue;
        };
        rename_row_label(row);
        if mode == FormatMode::DisplayString {
            format_row_amounts(row);
        }
    }
}

/// Rename the drifting row label `Tenor` to the canonical `Due Date`.
///
/// When both keys are present the canonical one wins and the duplicate is
/// dropped.
fn rename_row_label(row: &mut Map<String, Value>) {
    if let Some(value) = row.remove(row_keys::TENOR) {
        row.entry(row_keys::DUE_DATE).or_insert(value);
    }
}

/// Reformat the four numeric row fields to display strings.
///
/// A value that cannot be parsed as a number passes through unchanged rather
/// than raising. Already-formatted strings re-parse to the same number, so
/// the pass is idempotent.
fn format_row_amounts(row: &mut Map<String, Value>) {
    for key in row_keys::NUMERIC {
        if let Some(value) = row.get_mut(key) {
            if let Some(amount) = parse_amount(value) {
                *value = Value::String(format_display(amount));
            }
        }
    }
}

/// Read a numeric value from a raw number or a comma-grouped string.
fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Format an amount as a fixed two-decimal, comma-grouped string:
/// `1234567.891` → `"1,234,567.89"`.
fn format_display(amount: f64) -> String {
    let formatted = format!("{amount:.2}");
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let int_grouped: String = grouped.chars().rev().collect();

    format!("{sign}{int_grouped}.{frac_part}")
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
