use crate::cli::OutputFormat;
use colored::Colorize;
use export_core::{EntityKind, ExportSummary};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct JsonSummary<'a> {
    success: bool,
    output_path: &'a Path,
    #[serde(flatten)]
    summary: &'a ExportSummary,
}

pub fn output_summary(summary: &ExportSummary, output_path: &Path, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let json = JsonSummary {
                success: summary.is_success(),
                output_path,
                summary,
            };
            if let Ok(json) = serde_json::to_string_pretty(&json) {
                println!("{}", json);
            }
        }
        OutputFormat::Text => {
            println!("{}", format_summary(summary, output_path));
        }
    }
}

pub fn format_summary(summary: &ExportSummary, output_path: &Path) -> String {
    let headline = format!(
        "Exported {} {} and {} {} to {}",
        summary.pages_exported,
        plural(summary.pages_exported, "page", "pages"),
        summary.attachments_exported,
        plural(summary.attachments_exported, "attachment", "attachments"),
        output_path.display()
    );
    let mut output = if summary.is_success() {
        headline.green().bold().to_string()
    } else {
        headline.yellow().bold().to_string()
    };

    if summary.unchanged > 0 {
        output.push_str(&format!(
            "\n  {}: {}",
            "Unchanged".dimmed(),
            summary.unchanged
        ));
    }
    if summary.degraded_attachments > 0 {
        output.push_str(&format!(
            "\n  {}: {}",
            "Without extension".dimmed(),
            summary.degraded_attachments.to_string().yellow()
        ));
    }

    if !summary.failures.is_empty() {
        output.push_str(&format!(
            "\n{} ({}):",
            "Failures".red().bold(),
            summary.failures.len()
        ));
        for failure in &summary.failures {
            let kind = match failure.kind {
                EntityKind::Space => "space".magenta(),
                EntityKind::Page => "page".cyan(),
                EntityKind::Attachment => "attachment".blue(),
            };
            output.push_str(&format!("\n  {} {}: {}", kind, failure.id.bold(), failure.error));
            if let Some(path) = &failure.path {
                output.push_str(&format!("\n    {}", path.display().to_string().dimmed()));
            }
        }
    }

    if summary.cancelled {
        output.push_str(&format!(
            "\n{}",
            "Cancelled: timeout reached before every item was exported".red()
        ));
    }

    output
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

#[derive(Serialize)]
pub struct JsonError {
    pub error: bool,
    pub code: String,
    pub message: String,
}

pub fn output_error(err: &anyhow::Error, format: OutputFormat) {
    let message = match format {
        OutputFormat::Json => {
            let json_err = JsonError {
                error: true,
                code: "error".to_string(),
                message: format!("{:#}", err),
            };
            serde_json::to_string_pretty(&json_err).unwrap_or_else(|_| {
                format!(r#"{{"error": true, "message": "{}"}}"#, err)
            })
        }
        OutputFormat::Text => format!("{}: {:#}", "Error".red().bold(), err),
    };
    eprintln!("{}", message);
}
