//! Per-attempt fix state machine with legal transition guards
//!
//! Every attempt starts at `New` and ends in one of the final states
//! `Applied`, `Skipped`, `NoMatch` or `Failed`. Each transition is recorded
//! so the attempt carries its own trace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixState {
    New,
    /// Candidate rules are being applied
    RuleAttempted,
    /// No rule produced a change; AI may still be tried
    NoMatch,
    /// A rule matched but its result failed validation
    RuleFailed,
    AiAttempted,
    Applied,
    Skipped,
    Failed,
}

impl FixState {
    /// No outgoing transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Applied | Self::Skipped | Self::Failed)
    }

    /// States an attempt may be finalized in
    pub fn is_final(self) -> bool {
        self.is_terminal() || self == Self::NoMatch
    }
}

impl fmt::Display for FixState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::RuleAttempted => "rule_attempted",
            Self::NoMatch => "no_match",
            Self::RuleFailed => "rule_failed",
            Self::AiAttempted => "ai_attempted",
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// ```text
/// New → RuleAttempted | Skipped
/// RuleAttempted → Applied | Skipped | NoMatch | RuleFailed
/// NoMatch → AiAttempted | Skipped
/// RuleFailed → AiAttempted | Skipped
/// AiAttempted → Applied
/// any non-terminal → Failed
/// ```
fn is_legal_transition(from: FixState, to: FixState) -> bool {
    use FixState::*;

    if to == Failed && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        // Duplicate of an already processed pair
        (New, Skipped)
            | (New, RuleAttempted)
            | (RuleAttempted, Applied)
            | (RuleAttempted, Skipped)
            | (RuleAttempted, NoMatch)
            | (RuleAttempted, RuleFailed)
            | (NoMatch, AiAttempted)
            | (NoMatch, Skipped)
            | (RuleFailed, AiAttempted)
            | (RuleFailed, Skipped)
            | (AiAttempted, Applied)
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: FixState,
    pub to: FixState,
    /// Milliseconds since the attempt started
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: FixState,
    pub to: FixState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal fix transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

pub struct FixMachine {
    current: FixState,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl Default for FixMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl FixMachine {
    pub fn new() -> Self {
        Self {
            current: FixState::New,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> FixState {
        self.current
    }

    /// Move to `to` if the edge exists; the state is unchanged otherwise.
    pub fn advance(&mut self, to: FixState, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }
        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(str::to_string),
        });
        self.current = to;
        Ok(())
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }
}
