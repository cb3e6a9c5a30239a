//! Batch command - extract data from multiple OCR text files.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, warn};

use claimex_core::{BatchDocument, ExtractionEvent, ExtractionObserver, ExtractionResult};

use super::extract::{OutputFormat, format_result};
use super::{load_config, service_builder};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Document type shared by all inputs
    #[arg(short = 't', long = "type")]
    document_type: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers (0 = one per core; default from config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Print extraction statistics for the batch
    #[arg(long)]
    stats: bool,
}

/// Outcome for one input file.
struct FileOutcome {
    path: PathBuf,
    result: Result<ExtractionResult, String>,
}

/// One line of the summary CSV.
#[derive(Serialize)]
struct SummaryRow<'a> {
    filename: &'a str,
    status: &'a str,
    document_type: &'a str,
    confidence: String,
    needs_review: bool,
    fields_extracted: usize,
    errors: usize,
    warnings: usize,
    processing_time_ms: u64,
    extracted_at: String,
    error: &'a str,
}

/// Advances the progress bar as documents finish.
struct ProgressObserver(ProgressBar);

impl ExtractionObserver for ProgressObserver {
    fn on_event(&self, event: &ExtractionEvent) {
        if matches!(
            event,
            ExtractionEvent::DataExtracted { .. } | ExtractionEvent::ExtractionFailed { .. }
        ) {
            self.0.inc(1);
        }
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.batch.max_parallelism = jobs;
    }
    let review_threshold = config.extraction.review_threshold;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    // Unreadable files are reported without reaching the extractor
    let mut documents = Vec::with_capacity(files.len());
    let mut readable = Vec::with_capacity(files.len());
    let mut outcomes = Vec::new();
    for path in files {
        match fs::read_to_string(&path) {
            Ok(text) => {
                documents.push(BatchDocument::new(text, args.document_type.clone()));
                readable.push(path);
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                outcomes.push(FileOutcome {
                    path,
                    result: Err(e.to_string()),
                });
            }
        }
    }

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files",
            )?
            .progress_chars("=>-"),
    );

    let service = Arc::new(
        service_builder(config)
            .with_observer(Arc::new(ProgressObserver(pb.clone())))
            .build()?,
    );

    let worker = Arc::clone(&service);
    let results = tokio::task::spawn_blocking(move || worker.extract_batch(&documents)).await?;
    pb.finish_with_message("Complete");

    outcomes.extend(readable.into_iter().zip(results).map(|(path, result)| FileOutcome {
        path,
        result: result.map_err(|e| e.to_string()),
    }));
    outcomes.sort_by(|a, b| a.path.cmp(&b.path));

    // Write outputs
    if let Some(output_dir) = &args.output_dir {
        let paths: Vec<&Path> = outcomes.iter().map(|o| o.path.as_path()).collect();
        for (outcome, output_name) in outcomes.iter().zip(output_names(&paths)) {
            let Ok(result) = &outcome.result else {
                continue;
            };
            let output_path =
                output_dir.join(format!("{}.{}", output_name, args.format.extension()));

            fs::write(&output_path, format_result(result, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes, review_threshold)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let successful = outcomes.iter().filter(|o| o.result.is_ok()).count();
    let review = outcomes
        .iter()
        .filter(|o| o.result.as_ref().is_ok_and(|r| r.needs_review(review_threshold)))
        .count();
    let failed: Vec<&FileOutcome> = outcomes.iter().filter(|o| o.result.is_err()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful ({} need review), {} failed",
        style(successful).green(),
        style(review).yellow(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in &failed {
            if let Err(error) = &outcome.result {
                println!("  - {}: {}", outcome.path.display(), error);
            }
        }
    }

    if args.stats {
        let report = service.statistics(Some(args.document_type.as_str()));
        println!();
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

/// Output base names from input file stems. Repeated stems get a
/// `_2`, `_3`, ... suffix in input order.
fn output_names(paths: &[&Path]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(paths.len());

    for path in paths {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();

        let count = seen.entry(stem.clone()).or_insert(0);
        let mut name = stem.clone();
        while !taken.insert(name.clone()) {
            *count += 1;
            name = format!("{}_{}", stem, *count + 1);
        }
        names.push(name);
    }

    names
}

fn write_summary(
    path: &Path,
    outcomes: &[FileOutcome],
    review_threshold: f32,
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let row = match &outcome.result {
            Ok(result) => SummaryRow {
                filename,
                status: "success",
                document_type: &result.document_type,
                confidence: format!("{:.2}", result.confidence),
                needs_review: result.needs_review(review_threshold),
                fields_extracted: result.extracted_data.len(),
                errors: result.errors.len(),
                warnings: result.warnings.len(),
                processing_time_ms: result.processing_time_ms,
                extracted_at: result.extracted_at.to_rfc3339(),
                error: "",
            },
            Err(error) => SummaryRow {
                filename,
                status: "error",
                document_type: "",
                confidence: String::new(),
                needs_review: true,
                fields_extracted: 0,
                errors: 0,
                warnings: 0,
                processing_time_ms: 0,
                extracted_at: String::new(),
                error,
            },
        };
        wtr.serialize(row)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_names_unique() {
        let paths = [
            Path::new("a/bill.txt"),
            Path::new("b/bill.txt"),
            Path::new("c/bill.txt"),
            Path::new("d/bill_2.txt"),
            Path::new("lab.txt"),
        ];
        assert_eq!(
            output_names(&paths),
            vec!["bill", "bill_2", "bill_3", "bill_2_2", "lab"]
        );
    }
}
