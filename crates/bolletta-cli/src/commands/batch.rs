//! Batch processing command for multiple bill text files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use bolletta_core::{
    BillData, BillParser, EnergyType, ExtractionError, ExtractionReport, RawInput, RuleBillParser,
};

use super::parse::{format_report, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of bill text files (e.g. "bills/*.txt")
    #[arg(required = true)]
    input: String,

    /// Energy type for every file (luce/electricity or gas)
    #[arg(short, long)]
    energy: Option<EnergyType>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    report: ExtractionReport,
    bill: Option<BillData>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("txt")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let energy_type = args.energy.unwrap_or(config.extraction.default_energy);
    let parser = RuleBillParser::from_config(&config.extraction);
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let outcome = process_single_file(
            &path,
            &parser,
            energy_type,
            config.extraction.min_text_length,
        );
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        let (report, bill, error) = match outcome {
            Ok(Ok(bill)) => (ExtractionReport::success(bill.clone()), Some(bill), None),
            Ok(Err(e)) => (ExtractionReport::failure(&e), None, Some(e.to_string())),
            Err(e) => {
                let message = e.to_string();
                let report = ExtractionReport::Failure {
                    success: false,
                    error: message.clone(),
                    diagnostic: None,
                };
                (report, None, Some(message))
            }
        };

        if let Some(message) = &error {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", path.display(), message);
            } else {
                error!("Failed to process {}: {}", path.display(), message);
                progress.abandon();
                anyhow::bail!("Processing failed for {}: {}", path.display(), message);
            }
        }

        results.push(ProcessResult {
            path,
            report,
            bill,
            error,
            processing_time_ms,
        });
        progress.inc(1);
    }

    progress.finish_with_message("Complete");

    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            let output_name = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("bill");
            let output_path =
                output_dir.join(format!("{}.{}", output_name, args.format.extension()));

            fs::write(&output_path, format_report(&result.report, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for result in &failed {
            eprintln!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Read and parse one file; the outer error is I/O, the inner one extraction.
fn process_single_file(
    path: &Path,
    parser: &RuleBillParser,
    energy_type: EnergyType,
    min_length: usize,
) -> anyhow::Result<Result<BillData, ExtractionError>> {
    let text = fs::read_to_string(path)?;

    let extraction = RawInput::with_min_length(text, energy_type, min_length)
        .and_then(|input| parser.parse(&input))
        .map(|result| result.bill);

    Ok(extraction)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "operator",
        "energy_type",
        "months",
        "consumption",
        "total",
        "annual_consumption",
        "annual_spend",
        "processing_time_ms",
        "error",
    ])?;

    let amount = |value: Option<rust_decimal::Decimal>| {
        value.map(|v| v.to_string()).unwrap_or_default()
    };

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        if let Some(bill) = &result.bill {
            wtr.write_record([
                filename,
                "success".to_string(),
                bill.operator.clone(),
                bill.energy_type.to_string(),
                bill.months.to_string(),
                amount(bill.consumption),
                amount(bill.total),
                amount(bill.annual_consumption),
                amount(bill.annual_spend),
                result.processing_time_ms.to_string(),
                String::new(),
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                result.processing_time_ms.to_string(),
                result.error.clone().unwrap_or_default(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
