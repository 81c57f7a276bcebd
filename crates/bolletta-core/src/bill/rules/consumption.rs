//! Consumption extraction (kWh for electricity, Smc for gas).

use lazy_static::lazy_static;
use rust_decimal::Decimal;

use super::patterns::{KWH, QTY, SMC};
use super::{absorb, run_cascade, FieldExtractor, PatternRule, PlausibleRange, RuleMatch};
use crate::error::Field;
use crate::models::bill::EnergyType;

/// Accepted electricity consumption, in kWh.
pub fn electricity_range() -> PlausibleRange {
    PlausibleRange::inclusive(Decimal::from(50), Decimal::from(99_999))
}

/// Accepted gas consumption, in Smc.
pub fn gas_range() -> PlausibleRange {
    PlausibleRange::inclusive(Decimal::from(5), Decimal::from(99_999))
}

lazy_static! {
    pub static ref ELECTRICITY_RULES: Vec<PatternRule> = vec![
        // "totale energia fatturata 86 kwh", "consumo fatturato: 86"
        PatternRule::new(
            "billed_total",
            &[
                r"(?:totale\s+)?(?:energia|consum[oi])(?:\s+total[ei])?\s+fatturat[oaie][\s:]*(?:\(?",
                KWH, r"\)?)?[\s:]*", QTY,
            ].concat(),
            electricity_range(),
        ).rejecting("annu"),
        // "totale consumi 86 kwh", "energia totale (kwh) 86"
        PatternRule::new(
            "total",
            &[
                r"(?:totale\s+(?:energia|consum[oi])|(?:energia|consum[oi])\s+total[ei])(?:\s+(?:nel|del)\s+periodo)?[\s:]*(?:\(?",
                KWH, r"\)?)?[\s:]*", QTY,
            ].concat(),
            electricity_range(),
        ).rejecting("annu"),
        // "consumo nel periodo 86 kwh"
        PatternRule::new(
            "consumption_kwh",
            &[r"consum[oi][^\d€]{0,40}?", QTY, r"\s*", KWH].concat(),
            electricity_range(),
        ).rejecting("annu"),
        // "86 kwh"
        PatternRule::new(
            "bare_kwh",
            &[QTY, r"\s*", KWH].concat(),
            electricity_range(),
        ),
        // "energia attiva f1 120"
        PatternRule::new(
            "energy_any",
            &[r"energia[^\d€]{0,30}?", QTY].concat(),
            electricity_range(),
        ).rejecting("annu"),
    ];

    pub static ref GAS_RULES: Vec<PatternRule> = vec![
        // "consumo gas totale 310 smc", "consumi fatturati nel periodo 310 sm3"
        PatternRule::new(
            "gas_period",
            &[
                r"consum[oi](?:\s+(?:di\s+)?gas)?\s+(?:total[ei]|fatturat[oi]|(?:nel|del)\s+periodo)[^\d€]{0,20}?",
                QTY, r"\s*", SMC,
            ].concat(),
            gas_range(),
        ).rejecting("annu"),
        // "volume convertito 310"
        PatternRule::new(
            "converted_volume",
            &[r"volume\s+(?:convertito|fatturato)[^\d€]{0,20}?", QTY].concat(),
            gas_range(),
        ).rejecting("annu"),
        // "310 smc"
        PatternRule::new(
            "bare_smc",
            &[QTY, r"\s*(?:smc|sm3)\b"].concat(),
            gas_range(),
        ),
    ];
}

/// Rule cascade for an energy type.
pub fn rules_for(energy_type: EnergyType) -> &'static [PatternRule] {
    match energy_type {
        EnergyType::Electricity => &ELECTRICITY_RULES,
        EnergyType::Gas => &GAS_RULES,
    }
}

/// Consumption extractor for one energy type.
pub struct ConsumptionExtractor {
    energy_type: EnergyType,
}

impl ConsumptionExtractor {
    pub fn new(energy_type: EnergyType) -> Self {
        Self { energy_type }
    }
}

impl FieldExtractor for ConsumptionExtractor {
    type Output = RuleMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        absorb(run_cascade(Field::Consumption, rules_for(self.energy_type), text))
    }
}

/// Extract the period consumption from normalized text.
pub fn extract_consumption(text: &str, energy_type: EnergyType) -> Option<Decimal> {
    ConsumptionExtractor::new(energy_type)
        .extract(text)
        .map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumption(text: &str, energy_type: EnergyType) -> Option<RuleMatch<Decimal>> {
        ConsumptionExtractor::new(energy_type).extract(text)
    }

    #[test]
    fn test_billed_total_preferred() {
        let text = "letture 120 kwh consumo nel periodo 95 kwh totale energia fatturata 310 kwh";
        let found = consumption(text, EnergyType::Electricity).unwrap();
        assert_eq!(found.rule, "billed_total");
        assert_eq!(found.value, Decimal::from(310));
    }

    #[test]
    fn test_period_consumption_skips_annual() {
        let text = "consumo annuo 2.700 kwh consumo nel periodo 86 kwh";
        let found = consumption(text, EnergyType::Electricity).unwrap();
        assert_eq!(found.rule, "consumption_kwh");
        assert_eq!(found.value, Decimal::from(86));
    }

    #[test]
    fn test_out_of_range_falls_through() {
        // 12 kwh is below the electricity floor, the cascade moves on
        let text = "consumo 12 kwh energia attiva 180";
        let found = consumption(text, EnergyType::Electricity).unwrap();
        assert_eq!(found.rule, "energy_any");
        assert_eq!(found.value, Decimal::from(180));
    }

    #[test]
    fn test_grouped_thousands() {
        let text = "totale consumi 1.234 kwh";
        assert_eq!(
            extract_consumption(text, EnergyType::Electricity),
            Some(Decimal::from(1234))
        );
    }

    #[test]
    fn test_gas_cascade() {
        assert_eq!(
            extract_consumption("consumo gas totale 310 smc", EnergyType::Gas),
            Some(Decimal::from(310))
        );
        assert_eq!(
            extract_consumption("volume convertito 42,5 con coefficiente c", EnergyType::Gas),
            Some(Decimal::new(425, 1))
        );
        assert_eq!(
            extract_consumption("lettura 3 smc, fatturati 64 smc", EnergyType::Gas),
            Some(Decimal::from(64))
        );
    }

    #[test]
    fn test_gas_period_units() {
        for (text, expected) in [
            ("consumo gas totale 310 smc", 310),
            ("consumi fatturati nel periodo 310 sm3", 310),
            ("consumo del periodo 128 mc", 128),
        ] {
            let found = consumption(text, EnergyType::Gas).unwrap();
            assert_eq!(found.rule, "gas_period", "{text}");
            assert_eq!(found.value, Decimal::from(expected), "{text}");
        }
    }

    #[test]
    fn test_bare_gas_units() {
        assert_eq!(
            extract_consumption("lettura rilevata: 96 sm3", EnergyType::Gas),
            Some(Decimal::from(96))
        );
        // a bare "mc" needs the period phrasing
        assert_eq!(extract_consumption("contatore da 6 mc/h", EnergyType::Gas), None);
    }

    #[test]
    fn test_not_found() {
        assert_eq!(extract_consumption("nessun consumo indicato", EnergyType::Electricity), None);
        assert_eq!(extract_consumption("consumo 2 smc", EnergyType::Gas), None);
    }
}
