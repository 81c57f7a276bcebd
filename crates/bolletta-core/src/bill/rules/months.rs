//! Billing months estimation and supply period extraction.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::trace;

use super::patterns::{
    BIMONTHLY, DATE_RANGE, FOUR_MONTHLY, HALF_YEARLY, MONTHLY, MONTHS_EXPLICIT, MONTHS_TIMES,
    QUARTERLY,
};
use super::RuleMatch;
use crate::models::bill::{BillingPeriod, DEFAULT_MONTHS};

/// One step of the months decision order.
#[derive(Debug)]
pub enum MonthsRule {
    /// Capture group 1 holds the month count; matches containing any of
    /// `reject` are skipped.
    Capture {
        name: &'static str,
        regex: &'static Regex,
        reject: &'static [&'static str],
    },
    /// Cadence keyword mapped to a fixed count.
    Keyword { name: &'static str, regex: &'static Regex, months: u8 },
    /// Length of the first usable date range.
    DateRange,
    /// Tail entry, always succeeds.
    Default(u8),
}

lazy_static! {
    pub static ref MONTHS_RULES: Vec<MonthsRule> = vec![
        // "consumo degli ultimi 12 mesi" belongs to the annual disclosure box
        MonthsRule::Capture {
            name: "explicit_months",
            regex: &*MONTHS_EXPLICIT,
            reject: &["ultim", "annu"],
        },
        MonthsRule::Capture { name: "months_times_amount", regex: &*MONTHS_TIMES, reject: &[] },
        MonthsRule::Keyword { name: "bimestrale", regex: &*BIMONTHLY, months: 2 },
        MonthsRule::Keyword { name: "trimestrale", regex: &*QUARTERLY, months: 3 },
        MonthsRule::Keyword { name: "quadrimestrale", regex: &*FOUR_MONTHLY, months: 4 },
        MonthsRule::Keyword { name: "semestrale", regex: &*HALF_YEARLY, months: 6 },
        MonthsRule::Keyword { name: "mensile", regex: &*MONTHLY, months: 1 },
        MonthsRule::DateRange,
        MonthsRule::Default(DEFAULT_MONTHS),
    ];
}

fn plausible_months(value: i64) -> Option<u8> {
    if (1..=12).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}

impl MonthsRule {
    fn apply(&self, text: &str) -> Option<RuleMatch<u8>> {
        match self {
            MonthsRule::Capture { name, regex, reject } => regex.captures_iter(text).find_map(|caps| {
                if reject.iter().any(|marker| caps[0].contains(marker)) {
                    trace!("{}: skipped {:?}", name, &caps[0]);
                    return None;
                }
                let months = caps[1].parse::<i64>().ok().and_then(plausible_months);
                if months.is_none() {
                    trace!("{}: rejected {:?}", name, &caps[0]);
                }
                months.map(|m| RuleMatch::new(m, *name, &caps[0]))
            }),
            MonthsRule::Keyword { name, regex, months } => regex
                .find(text)
                .map(|m| RuleMatch::new(*months, *name, m.as_str())),
            MonthsRule::DateRange => periods(text).find_map(|(period, source)| {
                plausible_months(period.months()).map(|m| RuleMatch::new(m, "date_range", source))
            }),
            MonthsRule::Default(months) => Some(RuleMatch::new(*months, "default", "")),
        }
    }
}

/// Months estimator; never fails thanks to the default tail entry.
pub struct MonthsEstimator {
    rules: &'static [MonthsRule],
}

impl MonthsEstimator {
    pub fn new() -> Self {
        Self {
            rules: &MONTHS_RULES,
        }
    }

    /// Run the decision order; the first rule that fires wins.
    pub fn estimate(&self, text: &str) -> RuleMatch<u8> {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(text))
            .unwrap_or_else(|| RuleMatch::new(DEFAULT_MONTHS, "default", ""))
    }
}

impl Default for MonthsEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Estimate the months covered by a bill from normalized text.
pub fn estimate_months(text: &str) -> u8 {
    MonthsEstimator::new().estimate(text).value
}

/// First valid date range in the text.
pub fn extract_period(text: &str) -> Option<BillingPeriod> {
    periods(text).next().map(|(period, _)| period)
}

fn periods(text: &str) -> impl Iterator<Item = (BillingPeriod, String)> + '_ {
    DATE_RANGE.captures_iter(text).filter_map(|caps| {
        let start = date_at(&caps, 1)?;
        let end = date_at(&caps, 4)?;
        (end >= start).then(|| (BillingPeriod { start, end }, caps[0].to_string()))
    })
}

fn date_at(caps: &Captures<'_>, first: usize) -> Option<NaiveDate> {
    let day: u32 = caps[first].parse().ok()?;
    let month: u32 = caps[first + 1].parse().ok()?;
    let year = parse_year(&caps[first + 2])?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    // Two-digit years on bills are always this century
    Some(if year < 100 { 2000 + year } else { year })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_for(text: &str) -> &'static str {
        MonthsEstimator::new().estimate(text).rule
    }

    #[test]
    fn test_explicit_months() {
        assert_eq!(estimate_months("periodo di fatturazione: 3 mesi"), 3);
        assert_eq!(rule_for("consumi fatturati per 4 mesi"), "explicit_months");
    }

    #[test]
    fn test_months_times_amount() {
        let text = "quota fissa 2 mesi x 19,55 € = 39,10 €";
        assert_eq!(estimate_months(text), 2);
        assert_eq!(rule_for(text), "months_times_amount");
    }

    #[test]
    fn test_out_of_range_count_falls_through() {
        // 24 months is rejected, the keyword decides
        assert_eq!(estimate_months("fornitura 24 mesi fatturazione trimestrale"), 3);
    }

    #[test]
    fn test_trailing_twelve_months_is_not_the_cadence() {
        let text = "fatturazione bimestrale. periodo 01/11/2024 - 31/12/2024. \
                    consumo degli ultimi 12 mesi: 2.700 kwh";
        assert_eq!(estimate_months(text), 2);
        assert_eq!(rule_for(text), "bimestrale");

        assert_eq!(estimate_months("consumo annuo 12 mesi dal 01/01/2024 al 31/03/2024"), 3);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(estimate_months("fatturazione bimestrale"), 2);
        assert_eq!(estimate_months("fatturazione trimestrale"), 3);
        assert_eq!(estimate_months("fatturazione quadrimestrale"), 4);
        assert_eq!(estimate_months("fatturazione mensile"), 1);
        assert_eq!(estimate_months("bolletta mensile o bimestrale"), 2);
    }

    #[test]
    fn test_date_range() {
        assert_eq!(estimate_months("dal 01/01/2024 al 31/03/2024"), 3);
        assert_eq!(rule_for("periodo 01/11/2024 - 31/12/2024"), "date_range");
        // a whole year is still a plausible count, two years are not
        assert_eq!(estimate_months("dal 01/01/2024 al 31/12/2024"), 12);
        assert_eq!(estimate_months("dal 01/01/2022 al 31/12/2023"), 2);
    }

    #[test]
    fn test_default() {
        assert_eq!(estimate_months("nessuna indicazione"), DEFAULT_MONTHS);
        assert_eq!(rule_for("nessuna indicazione"), "default");
    }

    #[test]
    fn test_extract_period() {
        let period = extract_period("periodo 31/12/24 - 01/11/24, poi 01/11/24 - 31/12/24").unwrap();
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(extract_period("nessuna data"), None);
    }
}
