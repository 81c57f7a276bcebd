//! Total amount extraction.
//!
//! Bills usually print several amounts (previous balances, instalments,
//! partial payments); the explicit "to pay" phrasings come first so the
//! current period's total wins over a bare currency figure.

use lazy_static::lazy_static;
use rust_decimal::Decimal;

use super::patterns::{EUR, MONEY, NUM_START};
use super::{absorb, run_cascade, FieldExtractor, PatternRule, PlausibleRange, RuleMatch};
use crate::error::Field;

/// Accepted totals, in euro.
pub fn total_range() -> PlausibleRange {
    PlausibleRange::inclusive(Decimal::from(5), Decimal::from(99_999))
}

lazy_static! {
    pub static ref TOTAL_RULES: Vec<PatternRule> = vec![
        // "totale da pagare 78,52 €", "importo da pagare: € 78,52"
        PatternRule::new(
            "amount_to_pay",
            &[
                r"(?:totale|importo)(?:\s+complessivo)?\s+(?:da|a)\s+pagare[\s:]*", EUR, r"?\s*", MONEY,
            ].concat(),
            total_range(),
        ),
        // "totale bolletta 78,52", "totale fattura € 78,52"
        PatternRule::new(
            "bill_total",
            &[
                r"totale\s+(?:della\s+)?(?:bolletta|fattura|documento)[\s:]*", EUR, r"?\s*", MONEY,
            ].concat(),
            total_range(),
        ),
        // "importo 78,52"
        PatternRule::new(
            "amount",
            &[r"importo[\s:]*", EUR, r"?\s*", MONEY].concat(),
            total_range(),
        ),
        // "totale: 78,52"
        PatternRule::new(
            "total",
            &[r"totale[\s:]*", EUR, r"?\s*", MONEY].concat(),
            total_range(),
        ),
        // "€ 78,52", "euro 78,52"
        PatternRule::new(
            "currency_prefix",
            &[EUR, r"[\s:]*", MONEY].concat(),
            total_range(),
        ),
        // "78,52 €"
        PatternRule::new(
            "currency_suffix",
            &[NUM_START, MONEY, r"\s*", EUR].concat(),
            total_range(),
        ),
    ];
}

/// Total amount extractor.
pub struct TotalExtractor;

impl TotalExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TotalExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for TotalExtractor {
    type Output = RuleMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        absorb(run_cascade(Field::Total, &TOTAL_RULES, text))
    }
}

/// Extract the amount due for the current period from normalized text.
pub fn extract_total(text: &str) -> Option<Decimal> {
    TotalExtractor::new().extract(text).map(|m| m.value)
}
