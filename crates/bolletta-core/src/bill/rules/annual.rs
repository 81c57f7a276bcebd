//! Annual figures: regulatory disclosure box first, then annualization.

use lazy_static::lazy_static;
use rust_decimal::Decimal;

use super::consumption::{electricity_range, gas_range};
use super::numbers::{round_money, round_quantity};
use super::patterns::{EUR, KWH, MONEY, QTY, SMC};
use super::total::total_range;
use super::{absorb, run_cascade, PatternRule, PlausibleRange, RuleMatch};
use crate::error::Field;
use crate::models::bill::EnergyType;

fn annual_consumption_table(range: PlausibleRange) -> Vec<PatternRule> {
    vec![
        // "consumo annuo kwh 443", "consumo annuo (smc): 1.240"
        PatternRule::new(
            "annual_consumption_box",
            &[
                r"consum[oi]\s+annu[oi][\s:]*(?:\(?(?:", KWH, "|", SMC, r")\)?)?[\s:]*", QTY,
            ].concat(),
            range,
        ),
        // "consumo annuo dal 01/01/2024 al 31/12/2024: 443 kwh"
        PatternRule::new(
            "annual_consumption_unit",
            &[r"consum[oi]\s+annu[oi][^€]{0,60}?", QTY, r"\s*(?:", KWH, "|", SMC, ")"].concat(),
            range,
        ),
    ]
}

lazy_static! {
    pub static ref ELECTRICITY_ANNUAL_RULES: Vec<PatternRule> =
        annual_consumption_table(electricity_range());

    pub static ref GAS_ANNUAL_RULES: Vec<PatternRule> = annual_consumption_table(gas_range());

    pub static ref ANNUAL_SPEND_RULES: Vec<PatternRule> = vec![
        // "spesa annua sostenuta iva compresa 471,12 €"
        PatternRule::new(
            "annual_spend_box",
            &[r"spesa\s+annua(?:\s+sostenuta)?[^\d]{0,40}?", EUR, r"?\s*", MONEY].concat(),
            total_range(),
        ),
    ];
}

fn annual_consumption_rules(energy_type: EnergyType) -> &'static [PatternRule] {
    match energy_type {
        EnergyType::Electricity => &ELECTRICITY_ANNUAL_RULES,
        EnergyType::Gas => &GAS_ANNUAL_RULES,
    }
}

/// Scale a period value to twelve months (`value * 12 / months`).
///
/// Unrounded; see [`annualize_money`] and [`annualize_quantity`].
pub fn annualize(value: Decimal, months: u8) -> Decimal {
    value * Decimal::from(12) / Decimal::from(months.max(1))
}

/// Annualize a monetary value, rounded to cents.
pub fn annualize_money(value: Decimal, months: u8) -> Decimal {
    round_money(annualize(value, months))
}

/// Annualize a consumption, rounded to whole units.
pub fn annualize_quantity(value: Decimal, months: u8) -> Decimal {
    round_quantity(annualize(value, months))
}

/// Annual figures extractor.
pub struct AnnualExtractor {
    energy_type: EnergyType,
    months: u8,
}

impl AnnualExtractor {
    pub fn new(energy_type: EnergyType, months: u8) -> Self {
        Self { energy_type, months }
    }

    /// Annual consumption from the disclosure box, else derived from the period.
    pub fn consumption(&self, text: &str, period: Option<Decimal>) -> Option<RuleMatch<Decimal>> {
        let rules = annual_consumption_rules(self.energy_type);
        absorb(run_cascade(Field::AnnualConsumption, rules, text)).or_else(|| {
            period.map(|p| RuleMatch::new(annualize_quantity(p, self.months), "annualized", ""))
        })
    }

    /// Annual spend from the disclosure box, else derived from the period total.
    pub fn spend(&self, text: &str, period_total: Option<Decimal>) -> Option<RuleMatch<Decimal>> {
        absorb(run_cascade(Field::AnnualSpend, &ANNUAL_SPEND_RULES, text)).or_else(|| {
            period_total.map(|t| RuleMatch::new(annualize_money(t, self.months), "annualized", ""))
        })
    }
}

/// Annual consumption for a normalized text.
pub fn extract_annual_consumption(
    text: &str,
    energy_type: EnergyType,
    period: Option<Decimal>,
    months: u8,
) -> Option<Decimal> {
    AnnualExtractor::new(energy_type, months)
        .consumption(text, period)
        .map(|m| m.value)
}

/// Annual spend for a normalized text.
pub fn extract_annual_spend(text: &str, period_total: Option<Decimal>, months: u8) -> Option<Decimal> {
    AnnualExtractor::new(EnergyType::default(), months)
        .spend(text, period_total)
        .map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_disclosure_box_preferred() {
        let text = "consumo nel periodo 86 kwh consumo annuo kwh 443 spesa annua sostenuta iva compresa 471,12 €";
        assert_eq!(
            extract_annual_consumption(text, EnergyType::Electricity, Some(dec("86")), 2),
            Some(dec("443"))
        );
        assert_eq!(extract_annual_spend(text, Some(dec("78.52")), 2), Some(dec("471.12")));
    }

    #[test]
    fn test_box_with_dates_before_value() {
        let text = "consumo annuo dal 01/01/2024 al 31/12/2024: 1.240 smc";
        assert_eq!(
            extract_annual_consumption(text, EnergyType::Gas, None, 2),
            Some(dec("1240"))
        );
    }

    #[test]
    fn test_fallback_annualization() {
        let found = AnnualExtractor::new(EnergyType::Gas, 3)
            .consumption("consumo gas totale 310 smc", Some(dec("310")))
            .unwrap();
        assert_eq!(found.rule, "annualized");
        assert_eq!(found.value, dec("1240"));

        assert_eq!(extract_annual_spend("nessun riquadro", Some(dec("142.30")), 3), Some(dec("569.20")));
    }

    #[test]
    fn test_fallback_needs_period_value() {
        assert_eq!(extract_annual_spend("nessun riquadro", None, 2), None);
        assert_eq!(
            extract_annual_consumption("nessun riquadro", EnergyType::Electricity, None, 2),
            None
        );
    }

    #[test]
    fn test_annualization_round_trip() {
        for months in 1..=12u8 {
            for period in ["86", "310", "1234", "57"] {
                let p = dec(period);
                let annual = annualize_quantity(p, months);
                let back = annual * Decimal::from(months) / Decimal::from(12);
                assert!((back - p).abs() <= Decimal::ONE, "{period} over {months} months");
            }
            for period in ["78.52", "142.30", "39.10", "5.01"] {
                let p = dec(period);
                let annual = annualize_money(p, months);
                let back = round_money(annual * Decimal::from(months) / Decimal::from(12));
                assert!((back - p).abs() <= dec("0.01"), "{period} over {months} months");
            }
        }
    }
}
