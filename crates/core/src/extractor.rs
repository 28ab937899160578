//! Error extraction: turns checked pages into [`ErrorRecord`]s
//!
//! Visible error-bearing elements reported by the harness are scanned first.
//! Only when none of them carries a detection is the page body scanned,
//! after scripts, styles and documentation snippets have been removed.
//! A block counts only when it is "strong": the label is followed by a colon
//! (`Warning:`) or the block carries an `in <path> on line <N>` (or
//! `in <path>:<N>`) fragment. In HTML pages one message may span several raw
//! lines, so only `<br>` and block-level tags end a block there.

use crate::error::ExtractionError;
use crate::record::{ErrorKind, ErrorRecord, PageCheck};
use crate::severity;
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;

/// Bodies beyond this size are not scanned
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Messages are cut to this many characters
const MAX_MESSAGE_CHARS: usize = 500;

/// An ordered detector: the first category with a strong block wins
struct Detector {
    kind: ErrorKind,
    regex: Regex,
    labelled: Regex,
}

fn detectors() -> &'static [Detector] {
    static DETECTORS: OnceLock<Vec<Detector>> = OnceLock::new();
    DETECTORS.get_or_init(|| {
        vec![
            Detector {
                kind: ErrorKind::Fatal,
                regex: Regex::new(
                    r"(?i)\b(?:fatal error|uncaught (?:error|exception|typeerror|argumentcounterror|valueerror)\b)",
                )
                .unwrap(),
                labelled: Regex::new(r"(?i)\bfatal error\s*:").unwrap(),
            },
            Detector {
                kind: ErrorKind::Parse,
                regex: Regex::new(r"(?i)\b(?:parse error|syntax error, unexpected)\b").unwrap(),
                labelled: Regex::new(r"(?i)\bparse error\s*:").unwrap(),
            },
            Detector {
                kind: ErrorKind::Warning,
                regex: Regex::new(
                    r"(?i)\bwarning\b|session save path cannot be changed when a session is active",
                )
                .unwrap(),
                labelled: Regex::new(
                    r"(?i)\bwarning\s*:|session save path cannot be changed when a session is active",
                )
                .unwrap(),
            },
            Detector {
                kind: ErrorKind::Notice,
                regex: Regex::new(
                    r"(?i)\b(?:notice|strict standards|undefined (?:array key|index|offset|variable))\b",
                )
                .unwrap(),
                labelled: Regex::new(r"(?i)\b(?:notice|strict standards)\s*:").unwrap(),
            },
            Detector {
                kind: ErrorKind::Deprecated,
                regex: Regex::new(r"(?i)\bdeprecated\b").unwrap(),
                labelled: Regex::new(r"(?i)\bdeprecated\s*:").unwrap(),
            },
        ]
    })
}

fn location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)\b(?:in|at)\s+((?:[a-z]:)?[^\s<>"':]+?\.(?:php|phtml|tpl|inc))(?:\s+on\s+line\s+|:)(\d+)"#,
        )
        .unwrap()
    })
}

struct Cleanup {
    script_style: Regex,
    doc_blocks: Regex,
    line_breaks: Regex,
    tags: Regex,
}

fn cleanup() -> &'static Cleanup {
    static CLEANUP: OnceLock<Cleanup> = OnceLock::new();
    CLEANUP.get_or_init(|| Cleanup {
        script_style: Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").unwrap(),
        doc_blocks: Regex::new(
            r#"(?is)<(?:pre|code)\b[^>]*class\s*=\s*["'][^"']*\b(?:example|docs|documentation|help|guide|cheatsheet)\b[^"']*["'][^>]*>.*?</(?:pre|code)\s*>"#,
        )
        .unwrap(),
        line_breaks: Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|tr|table|pre|h[1-6])\s*>").unwrap(),
        tags: Regex::new(r"<[^>]*>").unwrap(),
    })
}

/// Byte span of the first location fragment in `text`.
pub(crate) fn location_span(text: &str) -> Option<(usize, usize)> {
    location_regex().find(text).map(|m| (m.start(), m.end()))
}

/// Recover `(path, line)` from an "in <path> on line <N>" or "in <path>:<N>" fragment.
pub fn locate(text: &str) -> Result<Option<(PathBuf, usize)>, ExtractionError> {
    let Some(caps) = location_regex().captures(text) else {
        return Ok(None);
    };
    let path = caps[1].trim().to_string();
    let line: usize = caps[2]
        .parse()
        .map_err(|_| ExtractionError::BadLineNumber(caps[2].to_string()))?;
    Ok(Some((PathBuf::from(path), line)))
}

/// Convert an HTML (or plain text) page into textual blocks, one per line.
pub fn page_blocks(body: &str) -> Vec<String> {
    let text = if body.contains('<') {
        let c = cleanup();
        let text = c.script_style.replace_all(body, "");
        let text = c.doc_blocks.replace_all(&text, "");
        let text = text.replace(['\r', '\n'], " ");
        let text = c.line_breaks.replace_all(&text, "\n");
        let text = c.tags.replace_all(&text, "");
        decode_entities(&text)
    } else {
        decode_entities(body)
    };

    text.lines()
        .map(collapse_whitespace)
        .filter(|l| !l.is_empty())
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Extract all error records from one checked page.
///
/// Never fails: malformed input produces an empty result.
pub fn extract(check: &PageCheck) -> Vec<ErrorRecord> {
    match try_extract(check) {
        Ok(records) => records,
        Err(e) => {
            debug!(url = %check.url, error = %e, "extraction recovered to empty result");
            Vec::new()
        }
    }
}

fn try_extract(check: &PageCheck) -> Result<Vec<ErrorRecord>, ExtractionError> {
    if check.body.len() > MAX_BODY_BYTES {
        return Err(ExtractionError::BodyTooLarge(check.body.len()));
    }

    // Structured elements first: each element is one block
    let element_blocks: Vec<String> = check
        .elements
        .iter()
        .map(|e| collapse_whitespace(&page_blocks(e).join(" ")))
        .filter(|b| !b.is_empty())
        .collect();

    let mut records = scan_blocks(&element_blocks, check);
    if records.is_empty() {
        records = scan_blocks(&page_blocks(&check.body), check);
    }

    if records.is_empty() && check.http_status >= 400 {
        let message = format!("HTTP {}", check.http_status);
        records.push(ErrorRecord {
            severity: severity::classify(ErrorKind::Http, &message, check.http_status),
            message,
            kind: ErrorKind::Http,
            file: None,
            line: None,
            url: check.url.clone(),
            http_status: check.http_status,
        });
    }

    Ok(records)
}

/// Apply the ordered detector list; the first category with a strong block wins.
fn scan_blocks(blocks: &[String], check: &PageCheck) -> Vec<ErrorRecord> {
    for detector in detectors() {
        let mut records = Vec::new();
        let mut seen: HashSet<(Option<PathBuf>, Option<usize>, String)> = HashSet::new();

        for block in blocks {
            if !detector.regex.is_match(block) {
                continue;
            }
            let location = locate(block).ok().flatten();
            if location.is_none() && !detector.labelled.is_match(block) {
                continue;
            }

            let message = truncate_chars(block, MAX_MESSAGE_CHARS);
            let (file, line) = match location {
                Some((f, l)) => (Some(f), Some(l)),
                None => (None, None),
            };

            // Unlocated occurrences are told apart by their message
            let discriminator = if file.is_some() {
                String::new()
            } else {
                crate::record::normalize_message(&message)
            };
            if !seen.insert((file.clone(), line, discriminator)) {
                continue;
            }

            records.push(ErrorRecord {
                severity: severity::classify(detector.kind, &message, check.http_status),
                message,
                kind: detector.kind,
                file,
                line,
                url: check.url.clone(),
                http_status: check.http_status,
            });
        }

        if !records.is_empty() {
            return records;
        }
    }
    Vec::new()
}
