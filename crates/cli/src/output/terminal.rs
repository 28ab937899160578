//! Terminal output formatting

use colored::Colorize;
use sitefix_core::{FixAttempt, FixOutcome, OutcomeCounts};
use std::path::Path;

pub fn severity_icon(severity: &str) -> &'static str {
    match severity {
        "critical" => "❌",
        "high" => "🔥",
        "medium" => "⚠️ ",
        "low" => "ℹ️ ",
        _ => "  ",
    }
}

pub fn format_record(
    severity: &str,
    message: &str,
    location: Option<(&str, Option<usize>)>,
) -> String {
    let icon = severity_icon(severity);
    match location {
        Some((file, Some(line))) => format!("  {} {} {}:{}", icon, message, file, line),
        Some((file, None)) => format!("  {} {} {}", icon, message, file),
        None => format!("  {} {}", icon, message),
    }
}

pub fn outcome_label(outcome: FixOutcome) -> String {
    match outcome {
        FixOutcome::Applied => "applied".green().to_string(),
        FixOutcome::Skipped => "skipped".dimmed().to_string(),
        FixOutcome::NoMatch => "no match".yellow().to_string(),
        FixOutcome::Failed => "failed".red().to_string(),
    }
}

pub fn format_attempt(attempt: &FixAttempt, root: &Path) -> String {
    let file = attempt.file.strip_prefix(root).unwrap_or(&attempt.file);
    let location = match attempt.record.line {
        Some(line) => format!("{}:{}", file.display(), line),
        None => file.display().to_string(),
    };
    let mut line = format!(
        "  {} {} [{}] {}",
        outcome_label(attempt.outcome),
        location,
        attempt.remedy,
        attempt.record.message
    );
    if let Some(reason) = &attempt.reason {
        line.push_str(&format!(" ({})", reason).dimmed().to_string());
    }
    line
}

/// Indent a unified diff and color its added and removed lines
pub fn format_diff(diff: &str) -> String {
    diff.lines()
        .map(|l| {
            let colored = if l.starts_with("+++") || l.starts_with("---") {
                l.bold().to_string()
            } else if l.starts_with('+') {
                l.green().to_string()
            } else if l.starts_with('-') {
                l.red().to_string()
            } else if l.starts_with("@@") {
                l.cyan().to_string()
            } else {
                l.to_string()
            };
            format!("      {}", colored)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_counts(counts: &OutcomeCounts, unresolved: usize) -> String {
    format!(
        "  {} \u{00b7} {} \u{00b7} {} \u{00b7} {} \u{00b7} {}",
        format!("{} applied", counts.applied).green(),
        format!("{} skipped", counts.skipped).dimmed(),
        format!("{} no match", counts.no_match).yellow(),
        format!("{} failed", counts.failed).red(),
        format!("{} unlocated", unresolved).blue()
    )
}
