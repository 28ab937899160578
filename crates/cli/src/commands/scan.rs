//! `sitefix scan`: extraction and classification only, no file is touched

use anyhow::Result;
use colored::Colorize;
use sitefix_core::coordinator::scan;
use sitefix_core::{ErrorRecord, Severity};
use std::path::Path;

use crate::output::{json, terminal};
use crate::OutputFormat;

pub fn run(checks_path: &Path, path: Option<&Path>, format: OutputFormat) -> Result<i32> {
    let root = super::project_root(path);
    let checks = super::load_checks(checks_path)?;
    let records = scan(&checks);

    match format {
        OutputFormat::Json => json::print(&json::scan_output(&records)),
        OutputFormat::Terminal => print_terminal(&records, &root, checks.len()),
    }
    Ok(0)
}

fn print_terminal(records: &[ErrorRecord], root: &Path, pages: usize) {
    if records.is_empty() {
        println!("  {}", format!("No errors found in {} page(s).", pages).dimmed());
        return;
    }

    // Most severe first; the sort is stable so page order survives ties
    let mut sorted: Vec<&ErrorRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.severity.cmp(&a.severity));

    for record in &sorted {
        let file = record
            .file
            .as_ref()
            .map(|f| f.strip_prefix(root).unwrap_or(f).display().to_string());
        let location = file.as_deref().map(|f| (f, record.line));
        println!(
            "{}",
            terminal::format_record(&record.severity.to_string(), &record.message, location)
        );
    }

    let count = |s: Severity| records.iter().filter(|r| r.severity == s).count();
    println!();
    println!("  {}", "\u{2500}".repeat(60).dimmed());
    println!(
        "  {} \u{00b7} {} \u{00b7} {} \u{00b7} {}",
        format!("{} critical", count(Severity::Critical)).red(),
        format!("{} high", count(Severity::High)).magenta(),
        format!("{} medium", count(Severity::Medium)).yellow(),
        format!("{} low", count(Severity::Low)).blue()
    );
    println!("  {} record(s) from {} page(s)", records.len(), pages);
}
