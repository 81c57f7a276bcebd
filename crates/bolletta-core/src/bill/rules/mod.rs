//! Rule-based field extractors for Italian energy bills.
//!
//! Every numeric field is resolved by an ordered cascade of [`PatternRule`]s.
//! Rules are tried most specific first; the first capture that parses and
//! falls inside the rule's [`PlausibleRange`] wins, and no rule is revisited.

pub mod annual;
pub mod breakdown;
pub mod consumption;
pub mod fixed_fee;
pub mod months;
pub mod numbers;
pub mod operator;
pub mod patterns;
pub mod total;

pub use annual::{annualize, extract_annual_consumption, extract_annual_spend, AnnualExtractor};
pub use breakdown::{extract_cost_breakdown, BreakdownExtractor};
pub use consumption::{extract_consumption, ConsumptionExtractor};
pub use fixed_fee::{extract_fixed_fee, FixedFeeExtractor};
pub use months::{estimate_months, extract_period, MonthsEstimator};
pub use numbers::{format_italian_amount, normalize_number, parse_italian_number};
pub use operator::{identify_operator, OperatorIdentifier};
pub use total::{extract_total, TotalExtractor};

use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::error::{ExtractionError, Field};

/// Trait for field extractors working on normalized bill text.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field, absorbing any per-field failure.
    fn extract(&self, text: &str) -> Option<Self::Output>;
}

/// Bounds a candidate value must respect to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlausibleRange {
    pub min: Decimal,
    pub max: Decimal,
    /// Whether the bounds themselves are accepted.
    pub inclusive: bool,
}

impl PlausibleRange {
    pub const fn inclusive(min: Decimal, max: Decimal) -> Self {
        Self { min, max, inclusive: true }
    }

    pub const fn exclusive(min: Decimal, max: Decimal) -> Self {
        Self { min, max, inclusive: false }
    }

    pub fn contains(&self, value: Decimal) -> bool {
        if self.inclusive {
            value >= self.min && value <= self.max
        } else {
            value > self.min && value < self.max
        }
    }
}

/// One entry of a field cascade.
#[derive(Debug)]
pub struct PatternRule {
    /// Name reported when the rule wins.
    pub name: &'static str,
    /// Pattern applied to normalized text.
    pub regex: Regex,
    /// Capture group holding the numeric token.
    pub group: usize,
    /// Accepted values.
    pub range: PlausibleRange,
    /// Full matches containing this marker are discarded (e.g. "annu").
    pub reject_marker: Option<&'static str>,
}

impl PatternRule {
    /// Build a rule capturing group 1.
    ///
    /// Patterns are literals from the rule tables; a bad one is a
    /// programming error caught by the tables' unit tests.
    pub fn new(name: &'static str, pattern: &str, range: PlausibleRange) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
            group: 1,
            range,
            reject_marker: None,
        }
    }

    /// Discard matches whose text contains `marker`.
    pub fn rejecting(mut self, marker: &'static str) -> Self {
        self.reject_marker = Some(marker);
        self
    }

    /// First in-range value produced by this rule, in text order.
    pub fn first_match(&self, text: &str) -> Option<RuleMatch<Decimal>> {
        self.first_match_within(text, self.range)
    }

    /// Like [`PatternRule::first_match`], checking against `range` instead
    /// of the rule's own bounds.
    pub fn first_match_within(
        &self,
        text: &str,
        range: PlausibleRange,
    ) -> Option<RuleMatch<Decimal>> {
        for caps in self.regex.captures_iter(text) {
            let Some(full) = caps.get(0) else { continue };
            if let Some(marker) = self.reject_marker {
                if full.as_str().contains(marker) {
                    trace!("{}: skipped {:?}", self.name, full.as_str());
                    continue;
                }
            }
            let Some(token) = caps.get(self.group) else { continue };

            let value = match numbers::normalize_number(token.as_str()) {
                Ok(value) => value,
                Err(e) => {
                    trace!("{}: {}", self.name, e);
                    continue;
                }
            };

            if !range.contains(value) {
                trace!("{}: {} outside plausible range", self.name, value);
                continue;
            }

            return Some(
                RuleMatch::new(value, self.name, full.as_str())
                    .with_position(full.start(), full.end()),
            );
        }
        None
    }
}

/// A value accepted by a cascade, with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch<T> {
    /// Accepted value.
    pub value: T,
    /// Rule that produced it.
    pub rule: &'static str,
    /// Matched source text.
    pub source: String,
    /// Position in normalized text.
    pub position: Option<(usize, usize)>,
}

impl<T> RuleMatch<T> {
    pub fn new(value: T, rule: &'static str, source: impl Into<String>) -> Self {
        Self {
            value,
            rule,
            source: source.into(),
            position: None,
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// Run a cascade: the first rule yielding an in-range value wins.
pub fn run_cascade(
    field: Field,
    rules: &[PatternRule],
    text: &str,
) -> Result<RuleMatch<Decimal>, ExtractionError> {
    rules
        .iter()
        .find_map(|rule| rule.first_match(text))
        .ok_or(ExtractionError::NoPlausibleMatch(field))
}

/// Turn a per-field failure into "not found".
pub fn absorb<T>(result: Result<T, ExtractionError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}

/// Lowercase the text and collapse whitespace runs into single spaces.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
