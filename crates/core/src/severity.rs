//! Severity classification
//!
//! An ordered rule table; the first tier with a matching rule wins.
//! Classification is a pure function of `(kind, message, http_status)`.

use crate::record::{ErrorKind, Severity};
use regex::Regex;
use std::sync::OnceLock;

enum Predicate {
    Kind(ErrorKind),
    StatusAtLeast(u16),
    Status(u16),
    Message(Regex),
}

impl Predicate {
    fn matches(&self, kind: ErrorKind, message: &str, http_status: u16) -> bool {
        match self {
            Predicate::Kind(k) => *k == kind,
            Predicate::StatusAtLeast(s) => http_status >= *s,
            Predicate::Status(s) => http_status == *s,
            Predicate::Message(re) => re.is_match(message),
        }
    }
}

struct Tier {
    severity: Severity,
    predicates: Vec<Predicate>,
}

fn tiers() -> &'static [Tier] {
    static TIERS: OnceLock<Vec<Tier>> = OnceLock::new();
    TIERS.get_or_init(|| {
        vec![
            Tier {
                severity: Severity::Critical,
                predicates: vec![
                    Predicate::Kind(ErrorKind::Fatal),
                    Predicate::StatusAtLeast(500),
                    Predicate::Message(Regex::new(r"(?i)\bfatal error\b").unwrap()),
                    Predicate::Message(
                        Regex::new(r#"(?i)\b(?:class|interface|trait) ["']?[\w\\]+["']? not found"#)
                            .unwrap(),
                    ),
                ],
            },
            Tier {
                severity: Severity::High,
                predicates: vec![
                    Predicate::Message(
                        Regex::new(r"(?i)\bcall to (?:an )?undefined (?:function|method)\b").unwrap(),
                    ),
                    Predicate::Status(404),
                    Predicate::Kind(ErrorKind::Parse),
                    Predicate::Message(Regex::new(r"(?i)\b(?:parse error|syntax error)\b").unwrap()),
                ],
            },
            Tier {
                severity: Severity::Medium,
                predicates: vec![
                    Predicate::Message(
                        Regex::new(r"(?i)\bundefined (?:variable|array key|index|offset)\b").unwrap(),
                    ),
                    Predicate::Kind(ErrorKind::Deprecated),
                    Predicate::Message(Regex::new(r"(?i)\bdeprecated\b").unwrap()),
                ],
            },
            Tier {
                severity: Severity::Low,
                predicates: vec![
                    Predicate::Kind(ErrorKind::Warning),
                    Predicate::Message(Regex::new(r"(?i)\bstrict standards\b").unwrap()),
                ],
            },
        ]
    })
}

/// Classify an occurrence. Same inputs always yield the same tier.
pub fn classify(kind: ErrorKind, message: &str, http_status: u16) -> Severity {
    for tier in tiers() {
        if tier
            .predicates
            .iter()
            .any(|p| p.matches(kind, message, http_status))
        {
            return tier.severity;
        }
    }

    if http_status >= 500 {
        Severity::Critical
    } else {
        Severity::Medium
    }
}
