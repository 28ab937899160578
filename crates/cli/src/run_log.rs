//! Run log: persists every fix session to `.sitefix-cache/runs/<session>.json`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sitefix_core::SessionReport;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const RUNS_DIR: &str = ".sitefix-cache/runs";

// ── On-disk structures ───────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct RunLog {
    pub session: String,
    pub version: String,
    pub timestamp: u64,
    pub duration_secs: f64,
    pub ai_calls: usize,
    pub summary: RunSummary,
    pub attempts: Vec<RunAttempt>,
    /// Every file a backup was written for
    pub backups: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub records: usize,
    pub applied: usize,
    pub skipped: usize,
    pub no_match: usize,
    pub failed: usize,
    pub unresolved: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunAttempt {
    pub signature: String,
    pub severity: String,
    pub message: String,
    pub file: String,
    pub line: Option<usize>,
    pub url: String,
    pub remedy: String,
    pub outcome: String,
    pub reason: Option<String>,
    /// `from -> to` for every state change, in order
    pub transitions: Vec<String>,
}

/// A brief entry shown in listings.
#[derive(Debug)]
pub struct RunEntry {
    pub session: String,
    pub path: PathBuf,
    pub timestamp: u64,
    pub applied: usize,
    pub failed: usize,
    pub duration_secs: f64,
}

// ── Write ────────────────────────────────────────────────────────

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

pub fn build_run_log(
    report: &SessionReport,
    root: &Path,
    duration_secs: f64,
    ai_calls: usize,
) -> RunLog {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let counts = report.counts();
    let attempts = report
        .attempts
        .iter()
        .map(|a| RunAttempt {
            signature: a.record.signature(),
            severity: a.record.severity.to_string(),
            message: a.record.message.clone(),
            file: relative(&a.file, root),
            line: a.record.line,
            url: a.record.url.clone(),
            remedy: a.remedy.to_string(),
            outcome: a.outcome.to_string(),
            reason: a.reason.clone(),
            transitions: a
                .transitions
                .iter()
                .map(|t| format!("{} -> {}", t.from, t.to))
                .collect(),
        })
        .collect();

    RunLog {
        session: report.session.clone(),
        version: sitefix_core::VERSION.to_string(),
        timestamp,
        duration_secs,
        ai_calls,
        summary: RunSummary {
            records: report.records.len(),
            applied: counts.applied,
            skipped: counts.skipped,
            no_match: counts.no_match,
            failed: counts.failed,
            unresolved: report.unresolved.len(),
        },
        attempts,
        backups: report
            .backups
            .iter()
            .map(|b| relative(&b.original, root))
            .collect(),
    }
}

/// Persist a finished session and return the path written.
pub fn save_run_log(root: &Path, log: &RunLog) -> Result<PathBuf> {
    let runs_dir = root.join(RUNS_DIR);
    std::fs::create_dir_all(&runs_dir)
        .with_context(|| format!("create runs dir {}", runs_dir.display()))?;

    let path = runs_dir.join(format!("{}.json", log.session));
    let json = serde_json::to_string_pretty(log)?;
    std::fs::write(&path, json).with_context(|| format!("write run log {}", path.display()))?;
    Ok(path)
}

// ── Read ─────────────────────────────────────────────────────────

/// Every readable run log, newest first. Unparseable files are skipped.
pub fn list_runs(root: &Path) -> Result<Vec<RunEntry>> {
    let runs_dir = root.join(RUNS_DIR);
    if !runs_dir.is_dir() {
        return Ok(Vec::new());
    }

    let read = std::fs::read_dir(&runs_dir)
        .with_context(|| format!("list runs dir {}", runs_dir.display()))?;
    let mut entries: Vec<RunEntry> = read
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| {
            let log = read_log(&path).ok()?;
            Some(RunEntry {
                session: log.session,
                timestamp: log.timestamp,
                applied: log.summary.applied,
                failed: log.summary.failed,
                duration_secs: log.duration_secs,
                path,
            })
        })
        .collect();

    entries.sort_by_key(|e| std::cmp::Reverse(e.timestamp));
    Ok(entries)
}

pub fn load_run_log(root: &Path, session: &str) -> Result<RunLog> {
    read_log(&root.join(RUNS_DIR).join(format!("{}.json", session)))
}

fn read_log(path: &Path) -> Result<RunLog> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read run log {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse run log {}", path.display()))
}
