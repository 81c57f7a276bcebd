//! Operator identification.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::models::bill::DEFAULT_OPERATOR;

/// Alias table: (lowercase alias, display name).
///
/// Ordered so that an alias always precedes any shorter alias it contains
/// ("iren mercato" before "iren"); the first alias found as a whole word
/// wins.
pub const OPERATOR_ALIASES: &[(&str, &str)] = &[
    ("iren mercato", "IREN Mercato"),
    ("servizio elettrico nazionale", "Servizio Elettrico Nazionale"),
    ("enel energia", "Enel Energia"),
    ("eni plenitude", "Eni Plenitude"),
    ("eni gas e luce", "Eni Plenitude"),
    ("plenitude", "Eni Plenitude"),
    ("edison energia", "Edison Energia"),
    ("a2a energia", "A2A Energia"),
    ("hera comm", "Hera Comm"),
    ("acea energia", "Acea Energia"),
    ("sorgenia", "Sorgenia"),
    ("engie", "Engie"),
    ("iberdrola", "Iberdrola"),
    ("e.on energia", "E.ON Energia"),
    ("octopus energy", "Octopus Energy"),
    ("illumia", "Illumia"),
    ("pulsee", "Pulsee"),
    ("estra energie", "Estra Energie"),
    ("dolomiti energia", "Dolomiti Energia"),
    ("agsm aim", "AGSM AIM"),
    ("alperia", "Alperia"),
    ("iren", "IREN"),
    ("enel", "Enel"),
    ("edison", "Edison"),
    ("a2a", "A2A"),
    ("e.on", "E.ON"),
];

lazy_static! {
    // "Luce Nova S.p.A.", "Energia Verde S.A."
    static ref COMPANY_SUFFIX: Regex = Regex::new(
        r"\b([A-Z][\w&'\-]*(?:[ \t]+[A-Z][\w&'\-]*){0,3})[ \t]+S\.[ \t]?(?:p\.[ \t]?)?A\.(?:[^\p{L}]|$)"
    ).unwrap();
}

/// True when `alias` occurs in `text` not glued to other letters or digits
/// ("iren" in "gruppo iren", not in "firenze").
fn contains_word(text: &str, alias: &str) -> bool {
    text.match_indices(alias).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + alias.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Maps free bill text to a canonical operator name.
pub struct OperatorIdentifier {
    aliases: &'static [(&'static str, &'static str)],
}

impl OperatorIdentifier {
    pub fn new() -> Self {
        Self {
            aliases: OPERATOR_ALIASES,
        }
    }

    /// Identify the operator; always yields a name.
    ///
    /// `text` is the original-case bill text: aliases are matched on its
    /// lowercase form, the company-suffix fallback on the original case.
    pub fn identify(&self, text: &str) -> String {
        let lower = text.to_lowercase();

        if let Some((alias, name)) = self
            .aliases
            .iter()
            .find(|(alias, _)| contains_word(&lower, alias))
        {
            debug!("Operator alias {:?} matched", alias);
            return (*name).to_string();
        }

        if let Some(caps) = COMPANY_SUFFIX.captures(text) {
            let name = caps[1].trim().to_string();
            debug!("Operator taken from company name {:?}", name);
            return name;
        }

        DEFAULT_OPERATOR.to_string()
    }
}

impl Default for OperatorIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Identify the operator named in `text`.
pub fn identify_operator(text: &str) -> String {
    OperatorIdentifier::new().identify(text)
}
