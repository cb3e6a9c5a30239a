//! Extract command - extract data from a single OCR text file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use clap::Args;
use console::style;
use tracing::{debug, info};

use claimex_core::{ExtractOptions, ExtractedValue, ExtractionResult, Measurement, TableRow};

use super::{load_config, load_template, service_builder};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file containing OCR text
    #[arg(required = true)]
    input: PathBuf,

    /// Document type (medical_bill, prescription, lab_result or a custom type)
    #[arg(short = 't', long = "type")]
    document_type: String,

    /// Template file (JSON) used instead of the registered template
    #[arg(long)]
    template: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per field
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    let review_threshold = config.extraction.review_threshold;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());
    let text = tokio::fs::read_to_string(&args.input).await?;
    if text.trim().is_empty() {
        anyhow::bail!("Input file is empty: {}", args.input.display());
    }

    let options = match &args.template {
        Some(path) => ExtractOptions::with_template(load_template(path)?),
        None => ExtractOptions::default(),
    };

    let service = service_builder(config).build()?;
    let result = service.extract_data(&text, &args.document_type, &options)?;

    if !result.errors.is_empty() {
        eprintln!("{}", style("Extraction issues:").yellow());
        for error in &result.errors {
            eprintln!("  - [{}] {}: {}", error.severity, error.field, error.message);
        }
    }

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Extraction confidence: {:.1}%",
            style("ℹ").blue(),
            result.confidence * 100.0
        );
        for (field, confidence) in &result.field_confidences {
            println!("    {:<20} {:.1}%", field, confidence * 100.0);
        }
        println!("{} Processing time: {}ms", style("ℹ").blue(), result.processing_time_ms);
        if result.needs_review(review_threshold) {
            println!("{} Needs human review", style("!").yellow());
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

/// Single-cell rendering of a value; tables become JSON.
pub fn format_value(value: &ExtractedValue) -> anyhow::Result<String> {
    match value {
        ExtractedValue::Rows(rows) => Ok(serde_json::to_string(rows)?),
        other => Ok(other.to_string()),
    }
}

fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["field", "value", "confidence"])?;

    for (field, value) in &result.extracted_data {
        let confidence = result
            .field_confidence(field)
            .map(|c| format!("{:.2}", c))
            .unwrap_or_default();
        let value = format_value(value)?;
        wtr.write_record([field.as_str(), value.as_str(), confidence.as_str()])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_row(row: &TableRow) -> String {
    match row {
        TableRow::Service(s) => format!(
            "{} x{} @ {} = {}",
            s.service, s.quantity, s.unit_price, s.total
        ),
        TableRow::Medication(m) => {
            let mut line = format!("{}. {}", m.ordinal, m.name);
            if let Some(dosage) = &m.dosage {
                line.push_str(&format!(" {}", dosage));
            }
            if let Some(instructions) = &m.instructions {
                line.push_str(&format!(" ({})", instructions));
            }
            line
        }
        TableRow::TestResult(t) => {
            let value = match &t.value {
                Measurement::Numeric(n) => n.to_string(),
                Measurement::Raw(raw) => raw.clone(),
            };
            format!(
                "{}: {} {} [{}]",
                t.test_name,
                value,
                t.unit.as_deref().unwrap_or(""),
                t.reference_range
            )
        }
    }
}

fn format_text(result: &ExtractionResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("Document: {}\n", result.document_type));
    output.push_str(&format!("Confidence: {:.1}%\n", result.confidence * 100.0));
    output.push_str(&format!(
        "Extracted at: {}\n",
        result.extracted_at.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S")
    ));
    output.push('\n');

    output.push_str("Fields:\n");
    for (field, value) in &result.extracted_data {
        match value {
            ExtractedValue::Rows(rows) => {
                output.push_str(&format!("  {}:\n", field));
                for row in rows {
                    output.push_str(&format!("    - {}\n", format_row(row)));
                }
            }
            other => output.push_str(&format!("  {}: {}\n", field, other)),
        }
    }

    if !result.errors.is_empty() {
        output.push_str("\nErrors:\n");
        for error in &result.errors {
            output.push_str(&format!(
                "  [{}] {}: {}\n",
                error.severity, error.field, error.message
            ));
        }
    }

    if !result.warnings.is_empty() {
        output.push_str("\nWarnings:\n");
        for warning in &result.warnings {
            output.push_str(&format!("  {}: {}\n", warning.field, warning.message));
        }
    }

    output
}
