//! Common regex fragments and structural patterns for Italian bills.
//!
//! All patterns run against normalized text (lowercase, single spaces).

use lazy_static::lazy_static;
use regex::Regex;

/// Quantity token: "86", "1.234", "1.234,5", "310,25".
pub const QTY: &str = r"(\d{1,3}(?:\.\d{3})+(?:,\d{1,3})?|\d+(?:[.,]\d{1,3})?)";

/// Monetary token with exactly two decimals: "78,52", "1.234,56", "234.60".
pub const MONEY: &str = r"(\d{1,3}(?:\.\d{3})+,\d{2}|\d+[.,]\d{2})\b";

/// Left edge of a numeric token: "234.56" inside "1,234.56" is no token.
pub const NUM_START: &str = r"(?:^|[^\d.,])";

/// Currency marker.
pub const EUR: &str = r"(?:€|eur(?:o)?)";

/// Electricity unit, tolerating OCR spacing ("k wh").
pub const KWH: &str = r"k\s?wh";

/// Gas units.
pub const SMC: &str = r"(?:smc|sm3|mc)\b";

/// Numeric date, day first.
const DATE: &str = r"(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})";

lazy_static! {
    // Date range: "dal 01/11/2024 al 31/12/2024", "01/11/2024 - 31/12/2024"
    pub static ref DATE_RANGE: Regex = Regex::new(
        &[r"(?:dal\s+)?", DATE, r"\s*(?:-|–|al|a)\s*", DATE].concat()
    ).unwrap();

    // "2 mesi x 19,55 € = 39,10 €"
    pub static ref FIXED_FEE_LINE: Regex = Regex::new(
        &[
            r"(\d{1,2})\s*mes[ei]\s*[x×*]\s*", MONEY,
            r"\s*", EUR, r"?(?:\s*/\s*mese)?\s*=?\s*", EUR, r"?\s*", MONEY,
        ].concat()
    ).unwrap();

    // "2 mesi x ..." with whatever follows
    pub static ref MONTHS_TIMES: Regex = Regex::new(
        r"(\d{1,2})\s*mes[ei]\s*[x×*]"
    ).unwrap();

    // "periodo di fatturazione: 2 mesi", "consumi fatturati per 3 mesi"
    pub static ref MONTHS_EXPLICIT: Regex = Regex::new(
        r"(?:periodo\s+(?:di\s+)?(?:fornitura|fatturazione|riferimento)|consum[oi]|fornitura|fatturazione)[^\d]{0,30}?(\d{1,2})\s+mes[ei]\b"
    ).unwrap();

    // "quota fissa ... 39,10"
    pub static ref FIXED_FEE_AMOUNT: Regex = Regex::new(
        &[r"quota\s+fissa[^\d€]{0,30}?", EUR, r"?\s*", MONEY].concat()
    ).unwrap();

    // "19,55 €/mese", "19,55 euro al mese"
    pub static ref MONTHLY_RATE: Regex = Regex::new(
        &[NUM_START, MONEY, r"\s*", EUR, r"?\s*(?:/\s*mese|al\s+mese|mensil[ei])"].concat()
    ).unwrap();

    // Cadence keywords
    pub static ref BIMONTHLY: Regex = Regex::new(r"\bbimestral[ei]\b").unwrap();
    pub static ref QUARTERLY: Regex = Regex::new(r"\btrimestral[ei]\b").unwrap();
    pub static ref FOUR_MONTHLY: Regex = Regex::new(r"\bquadrimestral[ei]\b").unwrap();
    pub static ref HALF_YEARLY: Regex = Regex::new(r"\bsemestral[ei]\b").unwrap();
    pub static ref MONTHLY: Regex = Regex::new(r"\bmensil[ei]\b").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_requires_two_decimals() {
        let re = Regex::new(MONEY).unwrap();
        assert_eq!(&re.captures("totale 78,52 €").unwrap()[1], "78,52");
        assert_eq!(&re.captures("1.234,56").unwrap()[1], "1.234,56");
        assert!(re.captures("78,523").is_none());
        assert!(re.captures("lettura del 15/03/2024").is_none());
    }

    #[test]
    fn test_num_start_keeps_tokens_whole() {
        let re = Regex::new(&[NUM_START, MONEY, r"\s*", EUR].concat()).unwrap();
        assert_eq!(&re.captures("78,52 €").unwrap()[1], "78,52");
        assert_eq!(&re.captures("addebito 64,90 euro").unwrap()[1], "64,90");
        assert!(re.captures("addebito 1,234.56 €").is_none());
    }

    #[test]
    fn test_fixed_fee_line() {
        let caps = FIXED_FEE_LINE
            .captures("quota fissa 2 mesi x 19,55 € = 39,10 €")
            .unwrap();
        assert_eq!(&caps[1], "2");
        assert_eq!(&caps[2], "19,55");
        assert_eq!(&caps[3], "39,10");
    }

    #[test]
    fn test_date_range() {
        let caps = DATE_RANGE
            .captures("periodo di riferimento 01/11/2024 - 31/12/2024")
            .unwrap();
        assert_eq!(&caps[1], "01");
        assert_eq!(&caps[6], "2024");

        assert!(DATE_RANGE.is_match("dal 01.01.2024 al 31.03.2024"));
    }

    #[test]
    fn test_cadence_keywords_do_not_overlap() {
        assert!(QUARTERLY.is_match("fatturazione trimestrale"));
        assert!(!QUARTERLY.is_match("fatturazione quadrimestrale"));
        assert!(!MONTHLY.is_match("fatturazione bimestrale"));
    }
}
