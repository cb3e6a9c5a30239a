//! Templates command - inspect and export extraction templates.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use claimex_core::{DataExtractionService, ExtractionTemplate};

use super::{load_config, service_builder};

/// Arguments for the templates command.
#[derive(Args)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    command: TemplatesCommand,
}

#[derive(Subcommand)]
enum TemplatesCommand {
    /// List registered document types
    List,

    /// Show the fields of one template
    Show {
        /// Document type
        document_type: String,
    },

    /// Export a template as JSON
    Export {
        /// Document type
        document_type: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub async fn run(args: TemplatesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let service = service_builder(load_config(config_path)?).build()?;

    match args.command {
        TemplatesCommand::List => list_templates(&service),
        TemplatesCommand::Show { document_type } => show_template(&service, &document_type),
        TemplatesCommand::Export {
            document_type,
            output,
        } => export_template(&service, &document_type, output),
    }
}

fn lookup(
    service: &DataExtractionService,
    document_type: &str,
) -> anyhow::Result<std::sync::Arc<ExtractionTemplate>> {
    service
        .template(document_type)
        .ok_or_else(|| anyhow::anyhow!("Unknown document type: {}", document_type))
}

fn list_templates(service: &DataExtractionService) -> anyhow::Result<()> {
    let types = service.supported_document_types();
    if types.is_empty() {
        println!("{} No templates registered.", style("ℹ").blue());
        return Ok(());
    }

    for document_type in &types {
        let template = lookup(service, document_type)?;
        let required: Vec<&str> = template.required_fields().collect();
        println!(
            "{} ({} fields; required: {})",
            style(document_type).bold(),
            template.fields.len(),
            if required.is_empty() {
                "none".to_string()
            } else {
                required.join(", ")
            }
        );
    }

    Ok(())
}

fn show_template(service: &DataExtractionService, document_type: &str) -> anyhow::Result<()> {
    let template = lookup(service, document_type)?;

    println!("{}", style(&template.document_type).bold());
    for field in &template.fields {
        let marker = if field.required { "*" } else { " " };
        println!("  {} {:<20} {}", marker, field.name, field.field_type);
        for pattern in field.ordered_patterns() {
            println!(
                "        - {} (priority {})",
                pattern.strategy.name(),
                pattern.priority
            );
        }
    }

    if !template.validation_rules.is_empty() {
        println!("  validation rules: {}", template.validation_rules.len());
    }
    if !template.post_processing.is_empty() {
        println!("  post-processing rules: {}", template.post_processing.len());
    }

    Ok(())
}

fn export_template(
    service: &DataExtractionService,
    document_type: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let template = lookup(service, document_type)?;
    let json = serde_json::to_string_pretty(template.as_ref())?;

    match output {
        Some(path) => {
            fs::write(&path, json)?;
            println!(
                "{} Exported {} to {}",
                style("✓").green(),
                document_type,
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}
