//! Bill data models shared by every extraction strategy.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, ExtractionError};

/// Minimum number of (trimmed) characters a bill text must have.
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 50;

/// Operator name used when the text names no known operator.
pub const DEFAULT_OPERATOR: &str = "Operatore attuale";

/// Months assumed when the bill gives no usable cadence signal.
pub const DEFAULT_MONTHS: u8 = 2;

/// Commodity billed by the invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyType {
    /// Electricity (luce), measured in kWh.
    #[default]
    Electricity,
    /// Natural gas, measured in Smc.
    Gas,
}

impl EnergyType {
    /// Resolve an optional request tag, falling back to electricity.
    pub fn from_tag(tag: Option<&str>) -> Self {
        tag.and_then(|t| t.parse().ok()).unwrap_or_default()
    }

    /// Consumption unit label.
    pub fn unit(&self) -> &'static str {
        match self {
            EnergyType::Electricity => "kWh",
            EnergyType::Gas => "Smc",
        }
    }

    /// Italian commodity name, as printed on bills.
    pub fn italian_name(&self) -> &'static str {
        match self {
            EnergyType::Electricity => "elettrica",
            EnergyType::Gas => "gas",
        }
    }
}

impl FromStr for EnergyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "electricity" | "luce" | "energia" | "elettricita" | "elettricità" => {
                Ok(EnergyType::Electricity)
            }
            "gas" => Ok(EnergyType::Gas),
            other => Err(format!("unknown energy type: {other}")),
        }
    }
}

impl fmt::Display for EnergyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnergyType::Electricity => f.write_str("electricity"),
            EnergyType::Gas => f.write_str("gas"),
        }
    }
}

/// Already-extracted bill text plus its energy type.
///
/// Construction enforces the minimum length, so an extractor never sees a
/// text that should have been rejected.
#[derive(Debug, Clone)]
pub struct RawInput {
    text: String,
    energy_type: EnergyType,
}

impl RawInput {
    /// Validate `text` against [`DEFAULT_MIN_TEXT_LENGTH`].
    pub fn new(text: impl Into<String>, energy_type: EnergyType) -> Result<Self, ExtractionError> {
        Self::with_min_length(text, energy_type, DEFAULT_MIN_TEXT_LENGTH)
    }

    /// Validate `text` against an explicit minimum length.
    pub fn with_min_length(
        text: impl Into<String>,
        energy_type: EnergyType,
        min: usize,
    ) -> Result<Self, ExtractionError> {
        let text = text.into();
        let length = text.trim().chars().count();
        if length < min {
            return Err(ExtractionError::InputTooShort { length, min });
        }
        Ok(Self { text, energy_type })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn energy_type(&self) -> EnergyType {
        self.energy_type
    }
}

/// Supply period covered by the bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingPeriod {
    /// Length of the period in whole months (`round(days / 30)`).
    pub fn months(&self) -> i64 {
        let days = (self.end - self.start).num_days();
        (days + 15).div_euclid(30)
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y")
        )
    }
}

/// Fixed charge (quota fissa) of the bill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedFee {
    /// Charge for the billed period.
    pub periodic: Option<Decimal>,
    /// Charge scaled to twelve months.
    pub annual: Option<Decimal>,
}

/// Best-effort split of the total into its main components.
///
/// The components are independent estimates; they are not expected to add
/// up to the total, and a missing component means "unknown", not zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    /// Energy/gas as a commodity (spesa per la materia).
    pub sale: Option<Decimal>,
    /// Transport, distribution and meter management.
    pub network: Option<Decimal>,
    /// System/general charges (oneri di sistema).
    pub system_charges: Option<Decimal>,
    /// Excise and VAT.
    pub taxes: Option<Decimal>,
}

impl CostBreakdown {
    pub fn is_empty(&self) -> bool {
        self.sale.is_none()
            && self.network.is_none()
            && self.system_charges.is_none()
            && self.taxes.is_none()
    }
}

/// Structured billing data extracted from one bill text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillData {
    /// Commodity the bill refers to.
    pub energy_type: EnergyType,

    /// Canonical operator display name.
    pub operator: String,

    /// Supply period, when a date range was found.
    pub period: Option<BillingPeriod>,

    /// Months covered by the bill, always within 1-12.
    pub months: u8,

    /// Consumption for the period (kWh or Smc).
    pub consumption: Option<Decimal>,

    /// Amount due for the period.
    pub total: Option<Decimal>,

    /// Fixed charge, periodic and annualized.
    pub fixed_fee: FixedFee,

    /// Cost components.
    pub cost_breakdown: CostBreakdown,

    /// Consumption over twelve months.
    pub annual_consumption: Option<Decimal>,

    /// Spend over twelve months.
    pub annual_spend: Option<Decimal>,
}

impl BillData {
    /// Create an empty record with the default operator and months.
    pub fn new(energy_type: EnergyType) -> Self {
        Self {
            energy_type,
            operator: DEFAULT_OPERATOR.to_string(),
            period: None,
            months: DEFAULT_MONTHS,
            consumption: None,
            total: None,
            fixed_fee: FixedFee::default(),
            cost_breakdown: CostBreakdown::default(),
            annual_consumption: None,
            annual_spend: None,
        }
    }

    /// Whether both mandatory fields were resolved.
    pub fn is_complete(&self) -> bool {
        self.consumption.is_some() && self.total.is_some()
    }

    /// Describe the best-effort fields that were left unresolved.
    pub fn missing_optional_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.operator == DEFAULT_OPERATOR {
            missing.push("Could not identify operator".to_string());
        }
        if self.period.is_none() {
            missing.push("Could not extract billing period".to_string());
        }
        if self.fixed_fee.periodic.is_none() && self.fixed_fee.annual.is_none() {
            missing.push("Could not extract fixed fee".to_string());
        }
        if self.cost_breakdown.is_empty() {
            missing.push("Could not extract cost breakdown".to_string());
        }
        if self.annual_consumption.is_none() {
            missing.push("Could not extract annual consumption".to_string());
        }
        if self.annual_spend.is_none() {
            missing.push("Could not extract annual spend".to_string());
        }

        missing
    }
}

/// Serializable response envelope for one extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractionReport {
    /// Both mandatory fields were found.
    Success {
        success: bool,
        #[serde(flatten)]
        bill: BillData,
    },
    /// The parse failed; carries the diagnostic when one exists.
    Failure {
        success: bool,
        error: String,
        #[serde(flatten)]
        diagnostic: Option<Diagnostic>,
    },
}

impl ExtractionReport {
    pub fn success(bill: BillData) -> Self {
        ExtractionReport::Success {
            success: true,
            bill,
        }
    }

    /// Build the failure envelope for an extraction error.
    pub fn failure(error: &ExtractionError) -> Self {
        let diagnostic = match error {
            ExtractionError::MandatoryFieldsMissing(diag) => Some(diag.clone()),
            _ => None,
        };
        ExtractionReport::Failure {
            success: false,
            error: error.to_string(),
            diagnostic,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionReport::Success { .. })
    }
}

impl From<&Result<BillData, ExtractionError>> for ExtractionReport {
    fn from(result: &Result<BillData, ExtractionError>) -> Self {
        match result {
            Ok(bill) => ExtractionReport::success(bill.clone()),
            Err(e) => ExtractionReport::failure(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_type_parsing() {
        assert_eq!("LUCE".parse::<EnergyType>(), Ok(EnergyType::Electricity));
        assert_eq!("Electricity".parse::<EnergyType>(), Ok(EnergyType::Electricity));
        assert_eq!(" gas ".parse::<EnergyType>(), Ok(EnergyType::Gas));
        assert!("acqua".parse::<EnergyType>().is_err());
    }

    #[test]
    fn test_energy_type_from_tag_defaults() {
        assert_eq!(EnergyType::from_tag(None), EnergyType::Electricity);
        assert_eq!(EnergyType::from_tag(Some("teleriscaldamento")), EnergyType::Electricity);
        assert_eq!(EnergyType::from_tag(Some("GAS")), EnergyType::Gas);
    }

    #[test]
    fn test_raw_input_rejects_short_text() {
        let err = RawInput::new("TOTALE DA PAGARE 78,52 €", EnergyType::Electricity).unwrap_err();
        assert!(matches!(err, ExtractionError::InputTooShort { min: 50, .. }));

        let padded = format!("   {}   ", "a".repeat(49));
        assert!(RawInput::new(padded, EnergyType::Gas).is_err());
        assert!(RawInput::new("a".repeat(50), EnergyType::Gas).is_ok());
    }

    #[test]
    fn test_billing_period_months() {
        let period = BillingPeriod {
            start: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        };
        assert_eq!(period.months(), 2);
        assert_eq!(period.to_string(), "01/11/2024 - 31/12/2024");
    }

    #[test]
    fn test_report_serializes_nulls() {
        let mut bill = BillData::new(EnergyType::Gas);
        bill.consumption = Some(Decimal::from(310));

        let json = serde_json::to_value(ExtractionReport::success(bill)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["energyType"], "gas");
        assert!(json["total"].is_null());
        assert!(json["costBreakdown"]["taxes"].is_null());
    }

    #[test]
    fn test_failure_report_carries_preview() {
        let diag = Diagnostic::new("bolletta senza importi", 8, Some(Decimal::from(250)), None);
        let report = ExtractionReport::failure(&ExtractionError::MandatoryFieldsMissing(diag));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["rawTextPreview"], "bolletta");
        assert!(json["total"].is_null());
        assert!(!report.is_success());
    }
}
