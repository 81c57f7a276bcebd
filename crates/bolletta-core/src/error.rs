//! Error types for the bolletta-core library.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the bolletta library.
#[derive(Error, Debug)]
pub enum BollettaError {
    /// Bill field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while extracting billing data from text.
///
/// Only [`ExtractionError::InputTooShort`], [`ExtractionError::MandatoryFieldsMissing`]
/// and [`ExtractionError::Upstream`] ever reach a caller. The other variants
/// describe per-field failures that the cascades absorb into "not found".
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Input text is shorter than the accepted minimum.
    #[error("input too short: {length} characters, at least {min} required")]
    InputTooShort { length: usize, min: usize },

    /// Every rule for a field was exhausted without an in-range candidate.
    #[error("no plausible match for {0}")]
    NoPlausibleMatch(Field),

    /// A numeric token could not be normalized.
    #[error("ambiguous numeric format: {0:?}")]
    AmbiguousNumericFormat(String),

    /// Consumption or total could not be resolved.
    #[error("consumption/total not found in bill text")]
    MandatoryFieldsMissing(Diagnostic),

    /// The completion collaborator failed; surfaced unmodified.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Errors belonging to the external completion/OCR collaborator path.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The service could not be reached or answered with an error.
    #[error("upstream service failure: {0}")]
    ServiceFailure(String),

    /// The service answered, but not with a JSON object.
    #[error("upstream response is not valid JSON: {0}")]
    MalformedJson(String),

    /// The service is not configured (e.g. missing API key).
    #[error("upstream service not configured: {0}")]
    NotConfigured(String),
}

/// Triage payload attached to a failed parse.
///
/// Holds a bounded preview of the input, never the full text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// First characters of the input text.
    pub raw_text_preview: String,
    /// Consumption, when it was resolved.
    pub consumption: Option<Decimal>,
    /// Total amount, when it was resolved.
    pub total: Option<Decimal>,
}

impl Diagnostic {
    /// Build a diagnostic, truncating the preview to `preview_chars` characters.
    pub fn new(
        text: &str,
        preview_chars: usize,
        consumption: Option<Decimal>,
        total: Option<Decimal>,
    ) -> Self {
        Self {
            raw_text_preview: text.chars().take(preview_chars).collect(),
            consumption,
            total,
        }
    }
}

/// Fields produced by the extraction engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Operator,
    Consumption,
    Total,
    Months,
    Period,
    FixedFee,
    SaleCost,
    NetworkCost,
    SystemCharges,
    Taxes,
    AnnualConsumption,
    AnnualSpend,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Operator => "operator",
            Field::Consumption => "consumption",
            Field::Total => "total",
            Field::Months => "months",
            Field::Period => "period",
            Field::FixedFee => "fixed fee",
            Field::SaleCost => "sale cost",
            Field::NetworkCost => "network cost",
            Field::SystemCharges => "system charges",
            Field::Taxes => "taxes",
            Field::AnnualConsumption => "annual consumption",
            Field::AnnualSpend => "annual spend",
        };
        f.write_str(name)
    }
}

/// Result type for the bolletta library.
pub type Result<T> = std::result::Result<T, BollettaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_preview_is_bounded() {
        let text = "è".repeat(1_000);
        let diag = Diagnostic::new(&text, 500, None, None);
        assert_eq!(diag.raw_text_preview.chars().count(), 500);
    }

    #[test]
    fn test_error_messages() {
        let err = ExtractionError::NoPlausibleMatch(Field::AnnualSpend);
        assert_eq!(err.to_string(), "no plausible match for annual spend");

        let err = ExtractionError::InputTooShort { length: 12, min: 50 };
        assert_eq!(
            err.to_string(),
            "input too short: 12 characters, at least 50 required"
        );
    }
}
