//! Error taxonomy of the remediation engine
//!
//! Only [`RuleSetError`] is fatal to a session. Every other error is scoped
//! to a single fix attempt and ends up as the attempt's reason string.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed page input. Always recovered to an empty extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("page body too large to scan ({0} bytes)")]
    BodyTooLarge(usize),
    #[error("unparsable line number: {0}")]
    BadLineNumber(String),
}

/// A single rule that cannot be loaded
#[derive(Debug, Error)]
pub enum RuleValidationError {
    #[error("rule #{index} has an empty id")]
    EmptyId { index: usize },
    #[error("duplicate rule id '{0}'")]
    DuplicateId(String),
    #[error("rule '{id}': invalid {field} pattern: {source}")]
    InvalidPattern {
        id: String,
        field: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("rule '{id}': invalid path glob '{glob}': {message}")]
    InvalidGlob {
        id: String,
        glob: String,
        message: String,
    },
    #[error("rule '{0}' has no self-check probe")]
    MissingProbe(String),
    #[error("rule '{0}' does not change its own probe")]
    ProbeUnchanged(String),
    #[error("rule '{id}' is not idempotent: second pass turned {first:?} into {second:?}")]
    NotIdempotent {
        id: String,
        first: String,
        second: String,
    },
}

/// The rule table failed validation; the session must not start.
#[derive(Debug, Error)]
#[error("rule set failed to load: {}", join_errors(.errors))]
pub struct RuleSetError {
    pub errors: Vec<RuleValidationError>,
}

fn join_errors(errors: &[RuleValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Post-write syntax check failure
#[derive(Debug, Clone, Error)]
pub enum SyntaxError {
    #[error("syntax error at {line}:{column}: {message}")]
    Invalid {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("syntax checker unavailable: {0}")]
    CheckerUnavailable(String),
}

/// Failure while reading, backing up or writing a target file
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid UTF-8", .0.display())]
    NotUtf8(PathBuf),
    #[error("syntax_invalid: {0}")]
    SyntaxInvalid(#[from] SyntaxError),
}

impl PatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PatchError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-readable reason recorded on the fix attempt
    pub fn reason(&self) -> String {
        match self {
            PatchError::SyntaxInvalid(_) => "syntax_invalid".to_string(),
            other => other.to_string(),
        }
    }
}

/// Failure of the remote fix proposal
#[derive(Debug, Clone, Error)]
pub enum RemoteFixError {
    #[error("no API key configured for provider '{0}'")]
    NoApiKey(String),
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider quota exhausted")]
    QuotaExhausted,
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("proposal rejected: {0}")]
    Rejected(String),
}

impl RemoteFixError {
    /// Transient failures are retried within the retry budget
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteFixError::Timeout
            | RemoteFixError::Connection(_)
            | RemoteFixError::RateLimited => true,
            RemoteFixError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
