//! Bill field extraction module.

mod model;
mod parser;
pub mod rules;

pub use model::{build_prompt, validate_model_response, CompletionClient, ModelBillParser};
pub use parser::RuleBillParser;

use serde::Serialize;

use crate::error::ExtractionError;
use crate::models::bill::{BillData, RawInput};

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result of a successful bill extraction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Extracted bill data.
    pub bill: BillData,
    /// Best-effort fields left unresolved.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Common interface of the extraction strategies.
///
/// Implementations fail with [`ExtractionError::MandatoryFieldsMissing`]
/// when consumption or total cannot be resolved.
pub trait BillParser {
    /// Parse one validated bill text.
    fn parse(&self, input: &RawInput) -> Result<ExtractionResult>;
}
