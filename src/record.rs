//! The validated extraction result: loan metadata plus a payment schedule.
//!
//! ## Why a JSON-object newtype instead of a plain struct?
//!
//! The upstream model's output shape is not contractually stable: it may omit
//! any field, add fields we have never seen, or represent an amount as a
//! number on Monday and a display string on Tuesday. A rigid struct would
//! either drop that information or fail deserialization on harmless drift.
//! [`LoanRecord`] therefore wraps the normalized JSON object verbatim and
//! layers typed accessors for the fields callers actually reach for. The
//! normalizer guarantees the documented key names; everything else passes
//! through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level keys the extraction prompt asks the model for.
pub mod keys {
    pub const LENDER_NAME: &str = "lender_name";
    pub const BORROWER_NAME: &str = "borrower_name";
    pub const LOAN_AMOUNT: &str = "loan_amount";
    pub const INTEREST_RATE: &str = "interest_rate";
    pub const LOAN_TERM: &str = "loan_term";
    pub const AGREEMENT_DATE: &str = "agreement_date";
    pub const PAYMENT_SCHEDULE: &str = "payment_schedule";
}

/// Keys of one payment-schedule row.
pub mod row_keys {
    /// Canonical row label. Some model revisions emit [`TENOR`] instead;
    /// the normalizer renames it.
    pub const DUE_DATE: &str = "Due Date";
    /// Alternate spelling of [`DUE_DATE`] seen in the wild.
    pub const TENOR: &str = "Tenor";
    pub const PRINCIPAL: &str = "Principal";
    pub const PRINCIPAL_REPAYMENT: &str = "Principal Repayment";
    pub const INTEREST_REPAYMENT: &str = "Interest Repayment";
    pub const MONTHLY_REPAYMENT: &str = "Monthly Repayment";

    /// The row fields subject to numeric display formatting.
    pub const NUMERIC: [&str; 4] = [
        PRINCIPAL,
        PRINCIPAL_REPAYMENT,
        INTEREST_REPAYMENT,
        MONTHLY_REPAYMENT,
    ];
}

/// A normalized loan-contract extraction result.
///
/// Serializes transparently as the underlying JSON object, so the HTTP
/// response body is exactly what the normalizer produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanRecord(pub Map<String, Value>);

impl LoanRecord {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    fn num_field(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// Name of the lending party, if the model found one.
    pub fn lender_name(&self) -> Option<&str> {
        self.str_field(keys::LENDER_NAME)
    }

    /// Name of the borrowing party, if the model found one.
    pub fn borrower_name(&self) -> Option<&str> {
        self.str_field(keys::BORROWER_NAME)
    }

    /// Principal loan amount. `None` when absent or emitted as a display
    /// string (see [`FormatMode`](crate::FormatMode)).
    pub fn loan_amount(&self) -> Option<f64> {
        self.num_field(keys::LOAN_AMOUNT)
    }

    /// Interest rate in percentage points.
    pub fn interest_rate(&self) -> Option<f64> {
        self.num_field(keys::INTEREST_RATE)
    }

    /// Loan term as stated in the contract (e.g. "36 months").
    pub fn loan_term(&self) -> Option<&str> {
        self.str_field(keys::LOAN_TERM)
    }

    /// Agreement date as stated in the contract.
    pub fn agreement_date(&self) -> Option<&str> {
        self.str_field(keys::AGREEMENT_DATE)
    }

    /// The payment-schedule rows, in document order. Empty when the model
    /// omitted the schedule or emitted a non-array value.
    pub fn payment_schedule(&self) -> &[Value] {
        self.0
            .get(keys::PAYMENT_SCHEDULE)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> LoanRecord {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn typed_accessors_read_known_fields() {
        let r = record(json!({
            "lender_name": "Acme Bank",
            "loan_amount": 100.0,
            "interest_rate": 4.5,
            "loan_term": "12 months",
            "payment_schedule": [{"Due Date": "May 1", "Principal": 50.0}],
        }));
        assert_eq!(r.lender_name(), Some("Acme Bank"));
        assert_eq!(r.loan_amount(), Some(100.0));
        assert_eq!(r.interest_rate(), Some(4.5));
        assert_eq!(r.loan_term(), Some("12 months"));
        assert_eq!(r.borrower_name(), None);
        assert_eq!(r.payment_schedule().len(), 1);
    }

    #[test]
    fn missing_schedule_is_empty_slice() {
        let r = record(json!({"lender_name": "Acme"}));
        assert!(r.payment_schedule().is_empty());
    }

    #[test]
    fn serialization_is_transparent() {
        let v = json!({"loan_amount": 100.0, "unexpected_key": [1, 2, 3]});
        let r = record(v.clone());
        assert_eq!(serde_json::to_value(&r).unwrap(), v);
    }
}
