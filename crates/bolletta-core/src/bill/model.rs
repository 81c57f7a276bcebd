//! Completion-service bill parser.
//!
//! The service is asked for a fixed JSON object; everything it returns is
//! validated here before it becomes a [`BillData`].

use std::str::FromStr;
use std::time::Instant;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Diagnostic, ExtractionError, UpstreamError};
use crate::models::bill::{BillData, EnergyType, RawInput, DEFAULT_MONTHS, DEFAULT_OPERATOR};

use super::rules::{extract_period, normalize_number, normalize_text};
use super::{BillParser, ExtractionResult, Result};

/// A text completion service.
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` and return the raw answer text.
    fn complete(&self, prompt: &str) -> std::result::Result<String, UpstreamError>;
}

impl<C: CompletionClient + ?Sized> CompletionClient for Box<C> {
    fn complete(&self, prompt: &str) -> std::result::Result<String, UpstreamError> {
        (**self).complete(prompt)
    }
}

const PROMPT_HEADER: &str = r#"Ricevi il testo estratto da una bolletta italiana. Il layout cambia da un fornitore all'altro, l'ordine dei campi non è fisso e possono comparire più importi (rate, saldi precedenti, pagamenti già effettuati).

Rispondi SOLO con un oggetto JSON valido, senza testo prima o dopo, con queste chiavi:

{
  "operatore": string,
  "periodo": string,
  "mesi": number,
  "consumoPeriodo": number,
  "spesaPeriodo": number,
  "consumoAnnuo": number|null,
  "spesaAnnua": number|null,
  "quotaFissaAnnua": number|null
}

REGOLE:
- "spesaPeriodo" è l'importo totale da pagare per il periodo fatturato (euro, IVA inclusa), per esempio "TOTALE DA PAGARE" o "TOTALE BOLLETTA". Ignora i saldi di bollette precedenti.
- "consumoPeriodo" è il consumo del periodo fatturato (kWh o Smc), mai quello annuo.
- "periodo" va scritto come "gg/mm/aaaa - gg/mm/aaaa".
- "mesi" si ricava dal periodo oppure da diciture come "fatturazione bimestrale", "trimestrale" o "mensile".
- "consumoAnnuo" e "spesaAnnua" vengono dal riquadro "Consumo annuo" e "Spesa annua sostenuta".
- "quotaFissaAnnua": se la quota fissa è indicata per N mesi, riportala a dodici mesi (importo * 12 / N).
- Se un valore non è certo usa null. Non inventare nulla.
- Numeri con il punto come separatore decimale, senza simbolo di valuta.

ESEMPIO

TESTO:
"IREN MERCATO SPA ... Periodo di riferimento 01/11/2024 - 31/12/2024 ...
Consumo nel periodo 86 kWh ... Consumo annuo kWh 443 ...
Spesa annua sostenuta iva compresa ... 471,12 € ...
Quota fissa 2 mesi x 19,55 € = 39,10 € ...
TOTALE DA PAGARE 78,52 € ..."

JSON:
{
  "operatore": "IREN Mercato",
  "periodo": "01/11/2024 - 31/12/2024",
  "mesi": 2,
  "consumoPeriodo": 86,
  "spesaPeriodo": 78.52,
  "consumoAnnuo": 443,
  "spesaAnnua": 471.12,
  "quotaFissaAnnua": 234.60
}
"#;

/// Build the extraction prompt for a bill text.
///
/// The text is cut to `max_input_chars` characters.
pub fn build_prompt(text: &str, energy_type: EnergyType, max_input_chars: usize) -> String {
    let excerpt: String = text.chars().take(max_input_chars).collect();
    format!(
        "Sei un esperto di bollette italiane di energia {}.\n{}\nBOLLETTA DA ANALIZZARE\n\nTESTO:\n\"\"\"{}\"\"\"\n",
        energy_type.italian_name(),
        PROMPT_HEADER,
        excerpt
    )
}

/// Remove an optional Markdown code fence around the answer.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json") up to the first newline
    let inner = inner.split_once('\n').map_or("", |(_, body)| body);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// First present, non-null value among `keys`.
fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

/// Coerce a JSON value to a non-negative decimal.
fn as_decimal(value: &Value) -> Option<Decimal> {
    let number = match value {
        Value::Number(n) => {
            let repr = n.to_string();
            Decimal::from_str(&repr)
                .or_else(|_| Decimal::from_scientific(&repr))
                .ok()
        }
        Value::String(s) => normalize_number(s).ok(),
        _ => None,
    }?;
    (!number.is_sign_negative()).then_some(number)
}

fn decimal_field(object: &Map<String, Value>, keys: &[&str]) -> Option<Decimal> {
    field(object, keys).and_then(as_decimal)
}

fn months_field(object: &Map<String, Value>) -> u8 {
    field(object, &["mesi", "months"])
        .and_then(Value::as_f64)
        .filter(|m| m.fract() == 0.0 && (1.0..=12.0).contains(m))
        .map_or(DEFAULT_MONTHS, |m| m as u8)
}

fn text_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    field(object, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Validate a completion answer and turn it into bill data.
///
/// Only values present in the answer are used; nothing is derived.
pub fn validate_model_response(
    raw: &str,
    input: &RawInput,
    preview_chars: usize,
) -> Result<BillData> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| UpstreamError::MalformedJson(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(UpstreamError::MalformedJson("answer is not a JSON object".to_string()).into());
    };

    let consumption = decimal_field(&object, &["consumoPeriodo", "consumptionPeriod"]);
    let total = decimal_field(&object, &["spesaPeriodo", "spendPeriod"]);
    let (Some(consumption), Some(total)) = (consumption, total) else {
        warn!("Completion answer lacks consumption or total");
        return Err(ExtractionError::MandatoryFieldsMissing(Diagnostic::new(
            input.text(),
            preview_chars,
            consumption,
            total,
        )));
    };

    let mut bill = BillData::new(input.energy_type());
    bill.consumption = Some(consumption);
    bill.total = Some(total);
    bill.months = months_field(&object);
    bill.operator = text_field(&object, &["operatore", "operator"])
        .unwrap_or(DEFAULT_OPERATOR)
        .to_string();
    bill.period = text_field(&object, &["periodo", "period"])
        .and_then(|period| extract_period(&normalize_text(period)));
    bill.annual_consumption = decimal_field(&object, &["consumoAnnuo", "annualConsumption"]);
    bill.annual_spend = decimal_field(&object, &["spesaAnnua", "annualSpend"]);
    bill.fixed_fee.annual = decimal_field(&object, &["quotaFissaAnnua", "annualFixedFee"]);

    Ok(bill)
}

/// Bill parser delegating the reading to a completion service.
pub struct ModelBillParser<C: CompletionClient> {
    client: C,
    /// Maximum bill characters embedded in the prompt.
    max_input_chars: usize,
    /// Characters of input kept in a failure diagnostic.
    preview_chars: usize,
}

impl<C: CompletionClient> ModelBillParser<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            max_input_chars: 15_000,
            preview_chars: 500,
        }
    }

    /// Set the prompt input limit.
    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Set the diagnostic preview length.
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }
}

impl<C: CompletionClient> BillParser for ModelBillParser<C> {
    fn parse(&self, input: &RawInput) -> Result<ExtractionResult> {
        let start = Instant::now();

        let prompt = build_prompt(input.text(), input.energy_type(), self.max_input_chars);
        info!("Requesting completion for {} bill", input.energy_type());

        let raw = self.client.complete(&prompt)?;
        debug!("Completion answer: {} characters", raw.len());

        let bill = validate_model_response(&raw, input, self.preview_chars)?;
        let warnings = bill.missing_optional_fields();

        Ok(ExtractionResult {
            bill,
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
