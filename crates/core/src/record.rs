//! Error records that bridge page checks to the fix pipeline

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Severity tier assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

/// Category of a detected error occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Fatal,
    Parse,
    Warning,
    Notice,
    Deprecated,
    /// No textual detection, only a failing HTTP status
    Http,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Fatal => write!(f, "fatal"),
            ErrorKind::Parse => write!(f, "parse"),
            ErrorKind::Warning => write!(f, "warning"),
            ErrorKind::Notice => write!(f, "notice"),
            ErrorKind::Deprecated => write!(f, "deprecated"),
            ErrorKind::Http => write!(f, "http"),
        }
    }
}

/// One checked page as handed over by the test-execution harness
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageCheck {
    pub url: String,

    /// Raw page source (HTML or plain text)
    #[serde(default)]
    pub body: String,

    /// Text of visible elements the harness flagged as error-bearing
    #[serde(default)]
    pub elements: Vec<String>,

    /// HTTP status of the response (0 when unknown)
    #[serde(default)]
    pub http_status: u16,
}

/// A single detected error occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Message text as it appeared in the page block
    pub message: String,

    pub kind: ErrorKind,

    /// Source file recovered from the "in <path> on line <N>" fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// Page the occurrence was observed on
    pub url: String,

    pub http_status: u16,

    /// Assigned by [`crate::severity::classify`] when the record is built
    pub severity: Severity,
}

impl ErrorRecord {
    /// Message with the label prefix, location fragment and redundant
    /// whitespace removed. Rule `match` predicates run against this form.
    pub fn normalized_message(&self) -> String {
        normalize_message(&self.message)
    }

    /// Stable identity of the occurrence, independent of the page it came from.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.to_string().as_bytes());
        hasher.update([0]);
        hasher.update(self.normalized_message().as_bytes());
        hasher.update([0]);
        if let Some(file) = &self.file {
            hasher.update(file.to_string_lossy().as_bytes());
        }
        hasher.update([0]);
        if let Some(line) = self.line {
            hasher.update(line.to_string().as_bytes());
        }
        let digest = hasher.finalize();
        format!("{:x}", digest)[..16].to_string()
    }
}

/// Normalize a raw error message for rule matching.
pub fn normalize_message(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_location = match crate::extractor::location_span(&collapsed) {
        Some((start, _)) => collapsed[..start].trim_end().to_string(),
        None => collapsed,
    };
    strip_label(&without_location).trim().to_string()
}

/// Drop a leading "PHP Warning:" / "Fatal error:" style label.
fn strip_label(message: &str) -> &str {
    const LABELS: &[&str] = &[
        "fatal error",
        "parse error",
        "warning",
        "notice",
        "strict standards",
        "deprecated",
    ];

    let mut rest = message.trim_start();
    if rest.is_char_boundary(4) && rest.len() >= 4 && rest[..4].eq_ignore_ascii_case("php ") {
        rest = &rest[4..];
    }
    for label in LABELS {
        if rest.len() > label.len()
            && rest.is_char_boundary(label.len())
            && rest[..label.len()].eq_ignore_ascii_case(label)
        {
            let after = rest[label.len()..].trim_start();
            if let Some(stripped) = after.strip_prefix(':') {
                return stripped;
            }
        }
    }
    message
}
