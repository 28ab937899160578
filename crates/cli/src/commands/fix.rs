//! `sitefix fix`: extract errors from page checks and remediate them

use anyhow::Result;
use colored::Colorize;
use sitefix_core::coordinator::new_session_id;
use sitefix_core::{FixOutcome, FixSession, SessionReport};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use crate::output::{json, terminal};
use crate::progress::Step;
use crate::{run_log, OutputFormat};

pub fn run(
    checks_path: &Path,
    path: Option<&Path>,
    ai: bool,
    fail_on_error: bool,
    format: OutputFormat,
) -> Result<i32> {
    let start = Instant::now();
    let root = super::project_root(path);

    if format == OutputFormat::Terminal {
        println!(
            "{}",
            format!("  sitefix v{} · fixing {}", sitefix_core::VERSION, root.display()).bold()
        );
        println!();
    }

    // ── 1. Config ────────────────────────────────────────────────
    let mut config = super::load_config(&root)?;
    if ai {
        config.ai.enabled = true;
    }

    // ── 2. Session ───────────────────────────────────────────────
    let step = Step::new("Loading rules");
    let session_id = new_session_id();
    let session = match FixSession::new(&config, &root, &session_id) {
        Ok(session) => session,
        Err(e) => {
            step.fail(&format!("{:#}", e));
            return Err(e);
        }
    };
    step.finish(&format!(
        "{} rules, style: {}",
        session.rules().len(),
        session.project_style().describe()
    ));

    // ── 3. Extract & Fix ─────────────────────────────────────────
    let checks = super::load_checks(checks_path)?;
    let step = Step::new(format!("Processing {} page checks", checks.len()));
    let report = session.process_checks(&checks);
    let counts = report.counts();
    step.finish(&format!(
        "{} records, {} applied",
        report.records.len(),
        counts.applied
    ));

    // ── 4. Run Log ───────────────────────────────────────────────
    let duration = start.elapsed().as_secs_f64();
    let log = run_log::build_run_log(&report, &root, duration, session.ai_calls());
    match run_log::save_run_log(&root, &log) {
        Ok(path) => debug!(path = %path.display(), "run log written"),
        Err(e) => eprintln!("  {}: failed to save run log: {:#}", "warn".yellow(), e),
    }

    // ── 5. Output ────────────────────────────────────────────────
    match format {
        OutputFormat::Json => json::print(&json::fix_output(&report, &root)),
        OutputFormat::Terminal => print_terminal(&report, &root, start),
    }

    Ok(exit_code(&report, fail_on_error))
}

/// Non-zero only when asked to and at least one attempt failed
pub fn exit_code(report: &SessionReport, fail_on_error: bool) -> i32 {
    if fail_on_error && report.has_failures() {
        1
    } else {
        0
    }
}

fn print_terminal(report: &SessionReport, root: &Path, start: Instant) {
    println!();

    for attempt in &report.attempts {
        println!("{}", terminal::format_attempt(attempt, root));
        if attempt.outcome == FixOutcome::Applied {
            if let Some(diff) = &attempt.diff {
                println!("{}", terminal::format_diff(diff));
            }
        }
    }

    if !report.unresolved.is_empty() {
        println!();
        println!("  {}", "Errors without a source location:".dimmed());
        for record in &report.unresolved {
            println!(
                "{}",
                terminal::format_record(&record.severity.to_string(), &record.message, None)
            );
        }
    }

    if !report.attempts.is_empty() || !report.unresolved.is_empty() {
        println!();
    }

    println!("  {}", "\u{2500}".repeat(60).dimmed());
    println!(
        "{}",
        terminal::format_counts(&report.counts(), report.unresolved.len())
    );
    if !report.backups.is_empty() {
        println!(
            "  {} file(s) backed up · undo with `sitefix restore {}`",
            report.backups.len(),
            report.session
        );
    }
    println!("  Time: {:.1}s", start.elapsed().as_secs_f64());
}
