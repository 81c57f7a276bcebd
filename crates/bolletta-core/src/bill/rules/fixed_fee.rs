//! Fixed fee (quota fissa) estimation.

use rust_decimal::Decimal;
use tracing::trace;

use super::annual::annualize_money;
use super::numbers::{parse_italian_number, round_money};
use super::patterns::{FIXED_FEE_AMOUNT, FIXED_FEE_LINE, MONTHLY_RATE};
use super::{FieldExtractor, PlausibleRange, RuleMatch};
use crate::models::bill::FixedFee;

/// Accepted periodic fee, in euro (bounds excluded).
pub fn fixed_fee_range() -> PlausibleRange {
    PlausibleRange::exclusive(Decimal::ZERO, Decimal::from(500))
}

/// Fixed fee extractor; needs the months already estimated for the bill.
pub struct FixedFeeExtractor {
    months: u8,
    range: PlausibleRange,
}

impl FixedFeeExtractor {
    pub fn new(months: u8) -> Self {
        Self {
            months,
            range: fixed_fee_range(),
        }
    }

    /// "N mesi x unit = total": the total is the periodic fee, scaled by 12/N.
    fn from_structured_line(&self, text: &str) -> Option<RuleMatch<FixedFee>> {
        FIXED_FEE_LINE.captures_iter(text).find_map(|caps| {
            let months: u8 = caps[1].parse().ok().filter(|m| (1..=12).contains(m))?;
            let periodic = parse_italian_number(&caps[3])?;
            if !self.range.contains(periodic) {
                trace!("fixed_fee_line: {} outside plausible range", periodic);
                return None;
            }
            Some(RuleMatch::new(
                FixedFee {
                    periodic: Some(periodic),
                    annual: Some(annualize_money(periodic, months)),
                },
                "fixed_fee_line",
                &caps[0],
            ))
        })
    }

    /// "quota fissa ... amount", annualized with the bill's months.
    fn from_fee_phrase(&self, text: &str) -> Option<RuleMatch<FixedFee>> {
        FIXED_FEE_AMOUNT.captures_iter(text).find_map(|caps| {
            let periodic = parse_italian_number(&caps[1])?;
            if !self.range.contains(periodic) {
                trace!("fixed_fee_phrase: {} outside plausible range", periodic);
                return None;
            }
            Some(RuleMatch::new(
                FixedFee {
                    periodic: Some(periodic),
                    annual: Some(annualize_money(periodic, self.months)),
                },
                "fixed_fee_phrase",
                &caps[0],
            ))
        })
    }

    /// "amount/mese": periodic is rate x months, annual is rate x 12.
    fn from_monthly_rate(&self, text: &str) -> Option<RuleMatch<FixedFee>> {
        MONTHLY_RATE.captures_iter(text).find_map(|caps| {
            let rate = parse_italian_number(&caps[1])?;
            let periodic = round_money(rate * Decimal::from(self.months));
            if !self.range.contains(periodic) {
                trace!("monthly_rate: {} outside plausible range", periodic);
                return None;
            }
            Some(RuleMatch::new(
                FixedFee {
                    periodic: Some(periodic),
                    annual: Some(round_money(rate * Decimal::from(12))),
                },
                "monthly_rate",
                &caps[0],
            ))
        })
    }
}

impl FieldExtractor for FixedFeeExtractor {
    type Output = RuleMatch<FixedFee>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.from_structured_line(text)
            .or_else(|| self.from_fee_phrase(text))
            .or_else(|| self.from_monthly_rate(text))
    }
}

/// Extract the fixed fee from normalized text.
pub fn extract_fixed_fee(text: &str, months: u8) -> Option<FixedFee> {
    FixedFeeExtractor::new(months).extract(text).map(|m| m.value)
}
