//! AI fallback: bounded, line-range fix proposals from an LLM provider
//!
//! The model sees a numbered window around the failing line and answers with
//! a single replacement range. A proposal is only accepted when it stays
//! inside that window and keeps the line count within `max_line_ratio`.

pub mod client;

pub use client::{health_check, CompletionTransport, HealthReport, HttpTransport};

use crate::config::AIConfig;
use crate::error::RemoteFixError;
use crate::record::ErrorRecord;
use crate::style::ProjectStyle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = r#"You are a senior PHP engineer fixing a runtime error reported after a PHP version upgrade.
You receive the error, the project's coding style and a numbered excerpt of the affected file.

Respond with a single JSON object:
- "start_line": first line to replace (number from the excerpt)
- "end_line": last line to replace, inclusive
- "replacement": the new text for those lines, without line numbers
- "rationale": one sentence explaining the fix (max 200 chars)

Change as little as possible and stay inside the excerpt. Keep the project's indentation and quoting.
Output only the JSON object. No markdown fences, no extra text."#;

/// Retry schedule for transient provider failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), doubling each time
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// The excerpt of a file shown to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// 1-based, inclusive
    pub start_line: usize,
    pub end_line: usize,
    pub numbered: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiProposal {
    pub start_line: usize,
    pub end_line: usize,
    pub replacement: String,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Serialize)]
struct FixContext<'a> {
    error: &'a str,
    kind: String,
    file: String,
    line: Option<usize>,
    style: String,
    excerpt_start: usize,
    excerpt_end: usize,
    excerpt: &'a str,
}

pub struct AiFixClient {
    transport: Box<dyn CompletionTransport>,
    retry: RetryPolicy,
    context_lines: usize,
    max_line_ratio: usize,
}

impl AiFixClient {
    pub fn new(transport: Box<dyn CompletionTransport>, config: &AIConfig) -> Self {
        Self {
            transport,
            retry: RetryPolicy {
                retries: config.retries,
                backoff: Duration::from_millis(config.backoff_ms),
            },
            context_lines: config.context_lines,
            max_line_ratio: config.max_line_ratio.max(1),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        self.transport.model()
    }

    pub fn context_window(&self, source: &str, line: Option<usize>) -> ContextWindow {
        context_window(source, line, self.context_lines)
    }

    /// Ask the provider for a fix and return the patched file content.
    ///
    /// Transient failures are retried with exponential backoff; everything
    /// else, including a rejected proposal, fails immediately.
    pub fn propose(
        &self,
        record: &ErrorRecord,
        path: &Path,
        source: &str,
        style: &ProjectStyle,
        timeout: Duration,
    ) -> Result<(AiProposal, String), RemoteFixError> {
        let window = self.context_window(source, record.line);
        let context = FixContext {
            error: &record.message,
            kind: record.kind.to_string(),
            file: path.to_string_lossy().to_string(),
            line: record.line,
            style: style.describe(),
            excerpt_start: window.start_line,
            excerpt_end: window.end_line,
            excerpt: &window.numbered,
        };
        let user_message = serde_json::to_string_pretty(&context)
            .map_err(|e| RemoteFixError::Malformed(e.to_string()))?;

        let mut attempt = 0u32;
        let content = loop {
            match self.transport.complete(SYSTEM_PROMPT, &user_message, timeout) {
                Ok(content) => break content,
                Err(e) if e.is_transient() && attempt < self.retry.retries => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        file = %path.display(),
                        error = %e,
                        retry = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "AI request failed, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let proposal = parse_proposal(&content)?;
        debug!(
            file = %path.display(),
            start = proposal.start_line,
            end = proposal.end_line,
            "AI proposal received"
        );
        let patched = accept(&proposal, source, &window, self.max_line_ratio)?;
        Ok((proposal, patched))
    }
}

/// Numbered excerpt of `context` lines each side of `line`, or the file head
/// when the line is unknown.
pub fn context_window(source: &str, line: Option<usize>, context: usize) -> ContextWindow {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len().max(1);
    let (start, end) = match line {
        Some(l) if l >= 1 && l <= total => (
            l.saturating_sub(context).max(1),
            (l + context).min(total),
        ),
        _ => (1, (2 * context + 1).min(total)),
    };
    let numbered = (start..=end)
        .map(|n| format!("{:4}: {}", n, lines.get(n - 1).copied().unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\n");
    ContextWindow {
        start_line: start,
        end_line: end,
        numbered,
    }
}

/// Parse a proposal, tolerating markdown fences, surrounding prose and a
/// wrapping object.
pub fn parse_proposal(content: &str) -> Result<AiProposal, RemoteFixError> {
    let json_str = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(proposal) = serde_json::from_str::<AiProposal>(json_str) {
        return Ok(proposal);
    }

    if let (Some(open), Some(close)) = (json_str.find('{'), json_str.rfind('}')) {
        if open < close {
            let inner = &json_str[open..=close];
            if let Ok(proposal) = serde_json::from_str::<AiProposal>(inner) {
                return Ok(proposal);
            }
            // Some models wrap the object
            if let Ok(obj) = serde_json::from_str::<Value>(inner) {
                for key in ["fix", "proposal", "result"] {
                    if let Some(v) = obj.get(key) {
                        if let Ok(proposal) = serde_json::from_value::<AiProposal>(v.clone()) {
                            return Ok(proposal);
                        }
                    }
                }
            }
        }
    }

    Err(RemoteFixError::Malformed(format!(
        "no fix proposal in response: {}",
        content.chars().take(120).collect::<String>()
    )))
}

/// Check a proposal against the excerpt it was made for and splice it in.
pub fn accept(
    proposal: &AiProposal,
    source: &str,
    window: &ContextWindow,
    max_line_ratio: usize,
) -> Result<String, RemoteFixError> {
    let AiProposal {
        start_line: start,
        end_line: end,
        ..
    } = *proposal;

    if start == 0 || end < start {
        return Err(RemoteFixError::Rejected(format!(
            "invalid line range {}-{}",
            start, end
        )));
    }
    if start < window.start_line || end > window.end_line {
        return Err(RemoteFixError::Rejected(format!(
            "range {}-{} is outside the excerpt {}-{}",
            start, end, window.start_line, window.end_line
        )));
    }

    let mut lines: Vec<&str> = source.split_inclusive('\n').collect();
    if end > lines.len() {
        return Err(RemoteFixError::Rejected(format!(
            "range {}-{} is past the end of the file ({} lines)",
            start,
            end,
            lines.len()
        )));
    }

    let old_count = end - start + 1;
    let new_count = proposal.replacement.lines().count().max(1);
    let (small, large) = (old_count.min(new_count), old_count.max(new_count));
    if large > small * max_line_ratio {
        return Err(RemoteFixError::Rejected(format!(
            "replaces {} lines with {} (max ratio {})",
            old_count, new_count, max_line_ratio
        )));
    }

    let newline = if source.contains("\r\n") { "\r\n" } else { "\n" };
    let last_terminated = lines[end - 1].ends_with('\n');
    let mut replacement: String = proposal
        .replacement
        .lines()
        .collect::<Vec<_>>()
        .join(newline);
    if last_terminated {
        replacement.push_str(newline);
    }

    lines.splice(start - 1..end, std::iter::once(replacement.as_str()));
    let patched: String = lines.concat();
    if patched == source {
        return Err(RemoteFixError::Rejected("proposal changes nothing".to_string()));
    }
    Ok(patched)
}
