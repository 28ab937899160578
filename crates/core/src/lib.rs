//! Sitefix Core - PHP migration error remediation engine
//!
//! This crate provides the detection and repair pipeline behind Sitefix:
//! - Error extraction from rendered pages and severity classification
//! - Declarative, self-checked fix rules applied with backups and atomic commits
//! - Project style inference for style-aware rules and AI prompts
//! - Bounded AI fallback with retry budget and proposal acceptance checks

pub mod ai;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod patch;
pub mod paths;
pub mod record;
pub mod rules;
pub mod severity;
pub mod style;
pub mod syntax;

pub use ai::{AiFixClient, AiProposal, CompletionTransport, HttpTransport, RetryPolicy};
pub use config::{RuleConfig, SitefixConfig};
pub use coordinator::{
    FixAttempt, FixOutcome, FixSession, FixState, OutcomeCounts, Remedy, SessionReport,
};
pub use error::{
    ExtractionError, PatchError, RemoteFixError, RuleSetError, RuleValidationError, SyntaxError,
};
pub use extractor::extract;
pub use paths::PathMapper;
pub use record::{ErrorKind, ErrorRecord, PageCheck, Severity};
pub use rules::{FixRule, RuleOutcome, RuleSet};
pub use severity::classify;
pub use style::{ProjectStyle, StyleInferencer};
pub use syntax::{SyntaxValidator, TreeSitterPhp};

/// Sitefix version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
