//! Rule-based bill parser combining the field extractors.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::{Diagnostic, ExtractionError};
use crate::models::bill::{BillData, RawInput};
use crate::models::config::ExtractionConfig;

use super::rules::{
    normalize_text, AnnualExtractor, BreakdownExtractor, ConsumptionExtractor, FieldExtractor,
    FixedFeeExtractor, MonthsEstimator, OperatorIdentifier, TotalExtractor, extract_period,
};
use super::{BillParser, ExtractionResult, Result};

/// Characters of input kept in a failure diagnostic by default.
const DEFAULT_PREVIEW_CHARS: usize = 500;

/// Pattern-cascade parser for Italian energy bills.
pub struct RuleBillParser {
    /// Characters of input kept in a failure diagnostic.
    preview_chars: usize,
}

impl RuleBillParser {
    /// Create a new parser with default settings.
    pub fn new() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Create a parser from the extraction configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new().with_preview_chars(config.preview_chars)
    }

    /// Set the diagnostic preview length.
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// Run every field extractor over the input.
    ///
    /// Never fails: unresolved fields are left empty, so callers can decide
    /// what an incomplete record means.
    pub fn extract(&self, input: &RawInput) -> BillData {
        let energy_type = input.energy_type();
        let text = normalize_text(input.text());
        let mut bill = BillData::new(energy_type);

        // Company suffixes are matched on the original casing
        bill.operator = OperatorIdentifier::new().identify(input.text());

        if let Some(found) = ConsumptionExtractor::new(energy_type).extract(&text) {
            debug!("consumption {} via {}", found.value, found.rule);
            bill.consumption = Some(found.value);
        }

        if let Some(found) = TotalExtractor::new().extract(&text) {
            debug!("total {} via {}", found.value, found.rule);
            bill.total = Some(found.value);
        }

        let months = MonthsEstimator::new().estimate(&text);
        debug!("months {} via {}", months.value, months.rule);
        bill.months = months.value;
        bill.period = extract_period(&text);

        if let Some(found) = FixedFeeExtractor::new(bill.months).extract(&text) {
            debug!("fixed fee via {}", found.rule);
            bill.fixed_fee = found.value;
        }

        bill.cost_breakdown = BreakdownExtractor::new(bill.total).extract(&text);

        let annual = AnnualExtractor::new(energy_type, bill.months);
        if let Some(found) = annual.consumption(&text, bill.consumption) {
            debug!("annual consumption {} via {}", found.value, found.rule);
            bill.annual_consumption = Some(found.value);
        }
        if let Some(found) = annual.spend(&text, bill.total) {
            debug!("annual spend {} via {}", found.value, found.rule);
            bill.annual_spend = Some(found.value);
        }

        bill
    }
}

impl Default for RuleBillParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BillParser for RuleBillParser {
    fn parse(&self, input: &RawInput) -> Result<ExtractionResult> {
        let start = Instant::now();

        info!(
            "Parsing {} bill from {} characters of text",
            input.energy_type(),
            input.text().chars().count()
        );

        let bill = self.extract(input);

        if !bill.is_complete() {
            info!(
                "Mandatory fields missing (consumption: {:?}, total: {:?})",
                bill.consumption, bill.total
            );
            return Err(ExtractionError::MandatoryFieldsMissing(Diagnostic::new(
                input.text(),
                self.preview_chars,
                bill.consumption,
                bill.total,
            )));
        }

        let warnings = bill.missing_optional_fields();
        debug!("Extracted bill from {} with {} warnings", bill.operator, warnings.len());

        Ok(ExtractionResult {
            bill,
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
