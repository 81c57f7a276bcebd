//! Cost breakdown extraction.
//!
//! The four components are independent best-effort estimates. Each must be
//! strictly below the bill total; they are never reconciled against it.

use lazy_static::lazy_static;
use rust_decimal::Decimal;

use super::patterns::{EUR, MONEY};
use super::{absorb, PatternRule, PlausibleRange, RuleMatch};
use crate::error::{ExtractionError, Field};
use crate::models::bill::CostBreakdown;

/// Upper bound used when the total is unknown.
fn unbounded_range() -> PlausibleRange {
    PlausibleRange::exclusive(Decimal::ZERO, Decimal::from(99_999))
}

/// Build a component rule: label, a short gap, optional currency, amount.
fn component(name: &'static str, label: &str) -> PatternRule {
    PatternRule::new(
        name,
        &[label, r"[^\d€]{0,30}?", EUR, r"?\s*", MONEY].concat(),
        unbounded_range(),
    )
}

lazy_static! {
    pub static ref SALE_RULES: Vec<PatternRule> = vec![
        component("material_cost", r"spesa\s+per\s+(?:la\s+)?materia\s+(?:energia|gas(?:\s+naturale)?)"),
        component("sale_cost", r"(?:spesa|servizi)\s+(?:di|per\s+la)\s+vendita"),
    ];

    pub static ref NETWORK_RULES: Vec<PatternRule> = vec![
        component(
            "transport_and_meter",
            r"spesa\s+per\s+(?:il\s+)?trasporto\s+(?:e\s+(?:la\s+)?)?gestione\s+(?:del\s+)?contatore",
        ),
        component("transport_and_distribution", r"trasporto\s+e\s+distribuzione"),
    ];

    pub static ref SYSTEM_RULES: Vec<PatternRule> = vec![
        component("system_charges", r"(?:spesa\s+per\s+)?oneri\s+(?:di\s+sistema|generali)"),
    ];

    pub static ref TAX_RULES: Vec<PatternRule> = vec![
        component("excise_and_vat", r"totale\s+(?:accise\s+e\s+iva|imposte\s+e\s+iva)"),
        component("total_taxes", r"totale\s+imposte"),
        component("taxes", r"\bimposte\b"),
    ];
}

/// Cost breakdown extractor, bounded by the bill total when known.
pub struct BreakdownExtractor {
    range: PlausibleRange,
}

impl BreakdownExtractor {
    pub fn new(total: Option<Decimal>) -> Self {
        let range = match total {
            Some(total) => PlausibleRange::exclusive(Decimal::ZERO, total),
            None => unbounded_range(),
        };
        Self { range }
    }

    fn component(&self, field: Field, rules: &[PatternRule], text: &str) -> Option<Decimal> {
        let found: Result<RuleMatch<Decimal>, ExtractionError> = rules
            .iter()
            .find_map(|rule| rule.first_match_within(text, self.range))
            .ok_or(ExtractionError::NoPlausibleMatch(field));
        absorb(found).map(|m| m.value)
    }

    /// Extract every component from normalized text.
    pub fn extract(&self, text: &str) -> CostBreakdown {
        CostBreakdown {
            sale: self.component(Field::SaleCost, &SALE_RULES, text),
            network: self.component(Field::NetworkCost, &NETWORK_RULES, text),
            system_charges: self.component(Field::SystemCharges, &SYSTEM_RULES, text),
            taxes: self.component(Field::Taxes, &TAX_RULES, text),
        }
    }
}

/// Extract the cost breakdown from normalized text.
pub fn extract_cost_breakdown(text: &str, total: Option<Decimal>) -> CostBreakdown {
    BreakdownExtractor::new(total).extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_all_components() {
        let text = "spesa per la materia energia € 31,20 \
                    spesa per il trasporto e la gestione del contatore € 18,40 \
                    spesa per oneri di sistema € 9,75 \
                    totale accise e iva € 12,10";
        let breakdown = extract_cost_breakdown(text, Some(dec("78.52")));
        assert_eq!(
            breakdown,
            CostBreakdown {
                sale: Some(dec("31.20")),
                network: Some(dec("18.40")),
                system_charges: Some(dec("9.75")),
                taxes: Some(dec("12.10")),
            }
        );
    }

    #[test]
    fn test_component_not_below_total_is_rejected() {
        let text = "spesa per la materia energia 100,00 € oneri di sistema 78,52 €";
        let breakdown = extract_cost_breakdown(text, Some(dec("78.52")));
        assert_eq!(breakdown.sale, None);
        assert_eq!(breakdown.system_charges, None);
        assert!(breakdown.is_empty());
    }

    #[test]
    fn test_missing_components_stay_unknown() {
        let text = "servizi di vendita 40,00 totale imposte 7,00";
        let breakdown = extract_cost_breakdown(text, None);
        assert_eq!(breakdown.sale, Some(dec("40.00")));
        assert_eq!(breakdown.network, None);
        assert_eq!(breakdown.system_charges, None);
        assert_eq!(breakdown.taxes, Some(dec("7.00")));
    }

    #[test]
    fn test_gas_material_and_distribution() {
        let text = "spesa per la materia gas naturale: 60,15 trasporto e distribuzione 22,30";
        let breakdown = extract_cost_breakdown(text, Some(dec("142.30")));
        assert_eq!(breakdown.sale, Some(dec("60.15")));
        assert_eq!(breakdown.network, Some(dec("22.30")));
    }
}
