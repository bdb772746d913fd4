//! Compact output rendering helpers for CLI surfaces.
//!
//! Keeps command result output bounded and readable while preserving signal.

use crate::core::error::GridplanError;
use crate::core::report::{Severity, ValidationReport};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), GridplanError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| GridplanError::ValidationError(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Render a validation report for the terminal, fatal issues first.
pub fn render_report(report: &ValidationReport, max_chars: usize) -> Vec<String> {
    use colored::Colorize;

    let mut lines = Vec::new();
    for severity in [Severity::Fatal, Severity::Warning, Severity::Info] {
        for issue in report.issues().iter().filter(|i| i.severity == severity) {
            let tag = match severity {
                Severity::Fatal => "✗ fatal".bright_red().bold(),
                Severity::Warning => "⚠ warn ".bright_yellow(),
                Severity::Info => "ℹ info ".bright_blue(),
            };
            lines.push(format!(
                "  {} [{}] {}: {}",
                tag,
                issue.kind.as_str().bright_white(),
                issue.axis_or_module.bright_cyan(),
                compact_line(&issue.description, max_chars)
            ));
        }
    }
    lines
}
