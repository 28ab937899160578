//! JSON output formatting

use serde::{Deserialize, Serialize};
use sitefix_core::{ErrorRecord, FixAttempt, SessionReport};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRecord {
    pub severity: String,
    pub kind: String,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub url: String,
    pub http_status: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonAttempt {
    pub file: String,
    pub line: Option<usize>,
    pub message: String,
    pub remedy: String,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct JsonSummary {
    pub records: usize,
    pub applied: usize,
    pub skipped: usize,
    pub no_match: usize,
    pub failed: usize,
    pub unresolved: usize,
}

/// Output of `sitefix scan`
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonScanOutput {
    pub records: Vec<JsonRecord>,
}

/// Output of `sitefix fix`
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonFixOutput {
    pub session: String,
    pub attempts: Vec<JsonAttempt>,
    pub unresolved: Vec<JsonRecord>,
    pub summary: JsonSummary,
}

fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

pub fn json_record(record: &ErrorRecord) -> JsonRecord {
    JsonRecord {
        severity: record.severity.to_string(),
        kind: record.kind.to_string(),
        message: record.message.clone(),
        file: record.file.as_ref().map(|f| f.display().to_string()),
        line: record.line,
        url: record.url.clone(),
        http_status: record.http_status,
    }
}

pub fn json_attempt(attempt: &FixAttempt, root: &Path) -> JsonAttempt {
    JsonAttempt {
        file: display_path(&attempt.file, root),
        line: attempt.record.line,
        message: attempt.record.message.clone(),
        remedy: attempt.remedy.to_string(),
        outcome: attempt.outcome.to_string(),
        reason: attempt.reason.clone(),
        diff: attempt.diff.clone(),
        backup: attempt.backup.as_ref().map(|b| display_path(b, root)),
    }
}

pub fn summary(report: &SessionReport) -> JsonSummary {
    let counts = report.counts();
    JsonSummary {
        records: report.records.len(),
        applied: counts.applied,
        skipped: counts.skipped,
        no_match: counts.no_match,
        failed: counts.failed,
        unresolved: report.unresolved.len(),
    }
}

pub fn fix_output(report: &SessionReport, root: &Path) -> JsonFixOutput {
    JsonFixOutput {
        session: report.session.clone(),
        attempts: report
            .attempts
            .iter()
            .map(|a| json_attempt(a, root))
            .collect(),
        unresolved: report.unresolved.iter().map(json_record).collect(),
        summary: summary(report),
    }
}

pub fn scan_output(records: &[ErrorRecord]) -> JsonScanOutput {
    JsonScanOutput {
        records: records.iter().map(json_record).collect(),
    }
}

/// Print any serializable value as pretty JSON on stdout
pub fn print<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize JSON: {}", e),
    }
}
