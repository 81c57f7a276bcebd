//! Parse command - extract data from a single bill text.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use rust_decimal::Decimal;
use tracing::{debug, info};

use bolletta_core::bill::rules::format_italian_amount;
use bolletta_core::{
    BillData, BillParser, BollettaConfig, EnergyType, ExtractionError, ExtractionReport,
    ExtractionResult, ModelBillParser, RawInput, RuleBillParser, UpstreamError,
};

use crate::completion::ResponsesClient;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Input text file, or "-" for stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Energy type (luce/electricity or gas)
    #[arg(short, long)]
    energy: Option<EnergyType>,

    /// Extraction strategy
    #[arg(long, value_enum, default_value = "rules")]
    engine: Engine,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Minimum text length accepted as a bill
    #[arg(long)]
    min_length: Option<usize>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Engine {
    /// Pattern cascades
    Rules,
    /// Completion service
    Model,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let text = read_input(&args.input)?;
    let energy_type = args.energy.unwrap_or(config.extraction.default_energy);
    let min_length = args.min_length.unwrap_or(config.extraction.min_text_length);

    info!("Parsing {} ({})", args.input.display(), energy_type);

    let result = match RawInput::with_min_length(text, energy_type, min_length) {
        Ok(input) => match args.engine {
            Engine::Rules => RuleBillParser::from_config(&config.extraction).parse(&input),
            Engine::Model => parse_with_model(input, &config).await,
        },
        Err(e) => Err(e),
    };

    if let Ok(extraction) = &result {
        for warning in &extraction.warnings {
            eprintln!("{} {}", style("⚠").yellow(), warning);
        }
    }

    let result = result.map(|extraction| extraction.bill);
    let report = ExtractionReport::from(&result);
    let output = format_report(&report, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    if let Err(e) = result {
        anyhow::bail!("Extraction failed: {}", e);
    }

    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }

    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    Ok(fs::read_to_string(path)?)
}

/// Run the completion strategy on a blocking task.
///
/// The HTTP client is blocking, so it is built and dropped there as well.
async fn parse_with_model(
    input: RawInput,
    config: &BollettaConfig,
) -> Result<ExtractionResult, ExtractionError> {
    let model_config = config.model.clone();
    let preview_chars = config.extraction.preview_chars;

    tokio::task::spawn_blocking(move || -> Result<ExtractionResult, ExtractionError> {
        let client = ResponsesClient::from_config(&model_config)?;
        ModelBillParser::new(client)
            .with_max_input_chars(model_config.max_input_chars)
            .with_preview_chars(preview_chars)
            .parse(&input)
    })
    .await
    .map_err(|e| UpstreamError::ServiceFailure(e.to_string()))?
}

pub fn format_report(report: &ExtractionReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(report)?),
        OutputFormat::Csv => format_csv(report),
        OutputFormat::Text => Ok(format_text(report)),
    }
}

fn amount(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn format_csv(report: &ExtractionReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "success",
        "error",
        "energy_type",
        "operator",
        "period_start",
        "period_end",
        "months",
        "consumption",
        "total",
        "fixed_fee_periodic",
        "fixed_fee_annual",
        "sale",
        "network",
        "system_charges",
        "taxes",
        "annual_consumption",
        "annual_spend",
    ])?;

    match report {
        ExtractionReport::Success { bill, .. } => {
            wtr.write_record([
                "true".to_string(),
                String::new(),
                bill.energy_type.to_string(),
                bill.operator.clone(),
                bill.period.map(|p| p.start.to_string()).unwrap_or_default(),
                bill.period.map(|p| p.end.to_string()).unwrap_or_default(),
                bill.months.to_string(),
                amount(bill.consumption),
                amount(bill.total),
                amount(bill.fixed_fee.periodic),
                amount(bill.fixed_fee.annual),
                amount(bill.cost_breakdown.sale),
                amount(bill.cost_breakdown.network),
                amount(bill.cost_breakdown.system_charges),
                amount(bill.cost_breakdown.taxes),
                amount(bill.annual_consumption),
                amount(bill.annual_spend),
            ])?;
        }
        ExtractionReport::Failure { error, diagnostic, .. } => {
            let mut row = vec![String::new(); 17];
            row[0] = "false".to_string();
            row[1] = error.clone();
            if let Some(diag) = diagnostic {
                row[7] = amount(diag.consumption);
                row[8] = amount(diag.total);
            }
            wtr.write_record(&row)?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &ExtractionReport) -> String {
    match report {
        ExtractionReport::Success { bill, .. } => format_bill_text(bill),
        ExtractionReport::Failure { error, diagnostic, .. } => {
            let mut output = format!("Extraction failed: {}\n", error);
            if let Some(diag) = diagnostic {
                output.push_str(&format!("\nText preview:\n{}\n", diag.raw_text_preview));
            }
            output
        }
    }
}

fn format_bill_text(bill: &BillData) -> String {
    let unit = bill.energy_type.unit();
    let euro = |value: Option<Decimal>| {
        value
            .map(|v| format!("{} €", format_italian_amount(v)))
            .unwrap_or_else(|| "-".to_string())
    };
    let quantity = |value: Option<Decimal>| {
        value
            .map(|v| format!("{} {}", v, unit))
            .unwrap_or_else(|| "-".to_string())
    };

    let mut output = String::new();

    output.push_str(&format!("Operator: {}\n", bill.operator));
    output.push_str(&format!("Energy:   {}\n", bill.energy_type));
    match bill.period {
        Some(period) => output.push_str(&format!("Period:   {} ({} months)\n", period, bill.months)),
        None => output.push_str(&format!("Months:   {}\n", bill.months)),
    }
    output.push('\n');

    output.push_str("Period figures:\n");
    output.push_str(&format!("  Consumption: {}\n", quantity(bill.consumption)));
    output.push_str(&format!("  Total:       {}\n", euro(bill.total)));
    output.push_str(&format!("  Fixed fee:   {}\n", euro(bill.fixed_fee.periodic)));
    output.push('\n');

    if !bill.cost_breakdown.is_empty() {
        output.push_str("Cost breakdown:\n");
        output.push_str(&format!("  Sale:           {}\n", euro(bill.cost_breakdown.sale)));
        output.push_str(&format!("  Network:        {}\n", euro(bill.cost_breakdown.network)));
        output.push_str(&format!("  System charges: {}\n", euro(bill.cost_breakdown.system_charges)));
        output.push_str(&format!("  Taxes:          {}\n", euro(bill.cost_breakdown.taxes)));
        output.push('\n');
    }

    output.push_str("Annual figures:\n");
    output.push_str(&format!("  Consumption: {}\n", quantity(bill.annual_consumption)));
    output.push_str(&format!("  Spend:       {}\n", euro(bill.annual_spend)));
    output.push_str(&format!("  Fixed fee:   {}\n", euro(bill.fixed_fee.annual)));

    output
}
