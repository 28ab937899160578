//! Fix coordination: one attempt per (error record, target file)
//!
//! Records are grouped by target file. Files are processed in parallel;
//! records of one file run in input order, each under the file's lock.
//! The rule path runs first and the AI path is the fallback for `no_match`
//! and for rules whose result failed the syntax check.

pub mod state;

pub use state::{FixMachine, FixState, IllegalTransition, TransitionRecord};

use crate::ai::{AiFixClient, HttpTransport};
use crate::config::{AIConfig, SitefixConfig};
use crate::error::PatchError;
use crate::extractor;
use crate::patch::{read_source, BackupEntry, BackupLedger, FileLocks, PatchEngine, PatchOutcome};
use crate::paths::PathMapper;
use crate::record::{ErrorRecord, PageCheck};
use crate::rules::RuleSet;
use crate::style::{ProjectStyle, StyleCache, StyleInferencer};
use crate::syntax::{validator_from_config, SyntaxValidator};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// The remedy an attempt chose
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remedy {
    Rule(String),
    Ai,
    None,
}

impl std::fmt::Display for Remedy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Remedy::Rule(id) => write!(f, "rule:{}", id),
            Remedy::Ai => write!(f, "ai"),
            Remedy::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixOutcome {
    Applied,
    Skipped,
    NoMatch,
    Failed,
}

impl std::fmt::Display for FixOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixOutcome::Applied => write!(f, "applied"),
            FixOutcome::Skipped => write!(f, "skipped"),
            FixOutcome::NoMatch => write!(f, "no_match"),
            FixOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Finalized result of one (record, file) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixAttempt {
    pub record: ErrorRecord,
    pub file: PathBuf,
    pub remedy: Remedy,
    pub outcome: FixOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Explanation attached to AI fixes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub transitions: Vec<TransitionRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub applied: usize,
    pub skipped: usize,
    pub no_match: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session: String,
    pub records: Vec<ErrorRecord>,
    pub attempts: Vec<FixAttempt>,
    /// Records without a source location; they get no attempt
    pub unresolved: Vec<ErrorRecord>,
    pub backups: Vec<BackupEntry>,
}

impl SessionReport {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for attempt in &self.attempts {
            match attempt.outcome {
                FixOutcome::Applied => counts.applied += 1,
                FixOutcome::Skipped => counts.skipped += 1,
                FixOutcome::NoMatch => counts.no_match += 1,
                FixOutcome::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn has_failures(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| a.outcome == FixOutcome::Failed)
    }
}

/// Extract and classify without touching any file
pub fn scan(checks: &[PageCheck]) -> Vec<ErrorRecord> {
    checks.iter().flat_map(extractor::extract).collect()
}

/// Session identifier derived from the wall clock and process id
pub fn new_session_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{}-{}", secs, std::process::id())
}

/// In-flight attempt: the state machine plus the fields that end up on the
/// finalized [`FixAttempt`].
struct Draft<'a> {
    record: &'a ErrorRecord,
    file: PathBuf,
    machine: FixMachine,
    remedy: Remedy,
    diff: Option<String>,
    backup: Option<PathBuf>,
    reason: Option<String>,
    rationale: Option<String>,
}

impl<'a> Draft<'a> {
    fn new(record: &'a ErrorRecord, file: PathBuf) -> Self {
        Self {
            record,
            file,
            machine: FixMachine::new(),
            remedy: Remedy::None,
            diff: None,
            backup: None,
            reason: None,
            rationale: None,
        }
    }

    fn step(&mut self, to: FixState, reason: Option<&str>) {
        if let Err(e) = self.machine.advance(to, reason) {
            warn!(file = %self.file.display(), error = %e, "transition rejected");
        }
    }

    fn fail(mut self, reason: impl Into<String>) -> FixAttempt {
        let reason = reason.into();
        self.step(FixState::Failed, Some(&reason));
        self.reason = Some(reason);
        self.finish()
    }

    fn finish(mut self) -> FixAttempt {
        if !self.machine.current().is_final() {
            self.step(FixState::Failed, Some("unfinished"));
            self.reason.get_or_insert_with(|| "unfinished".to_string());
        }
        let outcome = match self.machine.current() {
            FixState::Applied => FixOutcome::Applied,
            FixState::Skipped => FixOutcome::Skipped,
            FixState::NoMatch => FixOutcome::NoMatch,
            _ => FixOutcome::Failed,
        };
        info!(
            file = %self.file.display(),
            remedy = %self.remedy,
            outcome = %outcome,
            reason = self.reason.as_deref().unwrap_or(""),
            "fix attempt finished"
        );
        FixAttempt {
            record: self.record.clone(),
            file: self.file,
            remedy: self.remedy,
            outcome,
            diff: self.diff,
            backup: self.backup,
            reason: self.reason,
            rationale: self.rationale,
            transitions: self.machine.into_transitions(),
        }
    }
}

/// Finalize an attempt the AI path cannot take: a rule rejected by the
/// syntax check stays failed, a plain miss stays `no_match`.
fn without_ai(mut draft: Draft<'_>, rule_failed: bool, why: &str) -> FixAttempt {
    if rule_failed {
        return draft.fail("syntax_invalid");
    }
    draft.reason = Some(why.to_string());
    draft.finish()
}

/// Why the rule path ended without applying anything
enum RuleResult {
    NoMatch,
    Unchanged(String),
    Duplicate(Remedy),
    SyntaxInvalid(String),
}

pub struct FixSession {
    session: String,
    rules: RuleSet,
    engine: PatchEngine,
    ai: Option<AiFixClient>,
    ai_config: AIConfig,
    ai_used: AtomicUsize,
    styles: StyleCache,
    paths: PathMapper,
    locks: FileLocks,
    seen: Mutex<HashSet<(PathBuf, Remedy, String)>>,
    /// (file, rule id) pairs a rule has rewritten this session
    applied_rules: Mutex<HashSet<(PathBuf, String)>>,
}

impl FixSession {
    /// Load rules, syntax checker and (when enabled) the AI client.
    ///
    /// Fails when the rule set does not validate or AI is enabled without
    /// credentials.
    pub fn new(config: &SitefixConfig, root: &Path, session: &str) -> Result<Self> {
        let validator = validator_from_config(&config.syntax);
        let mut fix_session = Self::with_validator(config, root, session, validator)?;

        if config.ai.enabled {
            let transport = HttpTransport::from_config(&config.ai)
                .context("AI fixing is enabled but the provider cannot be used")?;
            fix_session.ai = Some(AiFixClient::new(Box::new(transport), &config.ai));
        }
        Ok(fix_session)
    }

    /// Build a session with an explicit syntax validator and no AI client.
    pub fn with_validator(
        config: &SitefixConfig,
        root: &Path,
        session: &str,
        validator: Box<dyn SyntaxValidator>,
    ) -> Result<Self> {
        let rules = RuleSet::load(&config.effective_rules())?;
        let recorded = config.style.recorded_style()?;
        let backups = BackupLedger::new(root, &config.fix.backup_dir, session);
        let engine = PatchEngine::new(validator, config.syntax.extensions.clone(), backups);
        let inferencer = StyleInferencer::new(config.style.sample_lines, config.style.sample_files);

        debug!(session, rules = rules.len(), "fix session ready");
        Ok(Self {
            session: session.to_string(),
            rules,
            engine,
            ai: None,
            ai_config: config.ai.clone(),
            ai_used: AtomicUsize::new(0),
            styles: StyleCache::new(inferencer, root.to_path_buf(), recorded),
            paths: PathMapper::new(root, &config.paths.map),
            locks: FileLocks::new(),
            seen: Mutex::new(HashSet::new()),
            applied_rules: Mutex::new(HashSet::new()),
        })
    }

    /// Replace the AI client (used with custom transports)
    pub fn with_ai(mut self, client: AiFixClient) -> Self {
        self.ai = Some(client);
        self
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn backups(&self) -> &BackupLedger {
        self.engine.backups()
    }

    pub fn ai_calls(&self) -> usize {
        self.ai_used.load(Ordering::SeqCst)
    }

    pub fn project_style(&self) -> ProjectStyle {
        self.styles.project()
    }

    /// Extract records from every check and fix them
    pub fn process_checks(&self, checks: &[PageCheck]) -> SessionReport {
        self.process_records(scan(checks))
    }

    pub fn process_records(&self, records: Vec<ErrorRecord>) -> SessionReport {
        let mut unresolved = Vec::new();
        let mut order: Vec<PathBuf> = Vec::new();
        let mut groups: HashMap<PathBuf, Vec<(usize, &ErrorRecord)>> = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            let Some(reported) = &record.file else {
                unresolved.push(record.clone());
                continue;
            };
            let target = self.paths.target(reported);
            groups
                .entry(target.clone())
                .or_insert_with(|| {
                    order.push(target);
                    Vec::new()
                })
                .push((index, record));
        }

        let mut attempts: Vec<(usize, FixAttempt)> = order
            .par_iter()
            .flat_map_iter(|target| {
                groups[target]
                    .iter()
                    .filter_map(|(index, record)| self.fix_record(record).map(|a| (*index, a)))
                    .collect::<Vec<_>>()
            })
            .collect();
        attempts.sort_by_key(|(index, _)| *index);
        drop(groups);

        SessionReport {
            session: self.session.clone(),
            attempts: attempts.into_iter().map(|(_, a)| a).collect(),
            records,
            unresolved,
            backups: self.engine.backups().entries(),
        }
    }

    /// Run the full fix pipeline for one record. `None` when the record
    /// carries no file path.
    pub fn fix_record(&self, record: &ErrorRecord) -> Option<FixAttempt> {
        let reported = record.file.as_ref()?;
        let target = self.paths.target(reported);
        let mut draft = Draft::new(record, target.clone());

        if self.paths.resolve(reported).is_none() {
            return Some(draft.fail("file_not_found"));
        }

        let lock = self.locks.handle(&target);
        let _guard = lock.lock();

        let signature = record.signature();
        let style = self.styles.for_file(&target);
        draft.step(FixState::RuleAttempted, None);

        let ai_trigger = match self.run_rules(&mut draft, &signature, &style) {
            Ok(None) => return Some(draft.finish()),
            Ok(Some(result)) => result,
            Err(e) => return Some(draft.fail(e.reason())),
        };

        Some(match ai_trigger {
            RuleResult::Unchanged(rule) => {
                draft.remedy = Remedy::Rule(rule);
                draft.reason = Some("unchanged".to_string());
                draft.step(FixState::Skipped, Some("unchanged"));
                draft.finish()
            }
            RuleResult::Duplicate(remedy) => {
                draft.remedy = remedy;
                draft.reason = Some("duplicate".to_string());
                draft.step(FixState::Skipped, Some("duplicate"));
                draft.finish()
            }
            RuleResult::NoMatch => {
                draft.step(FixState::NoMatch, None);
                // A rule rewrites every occurrence in the file at once
                if let Some(rule) = self.fixed_by(record, &target) {
                    draft.remedy = Remedy::Rule(rule);
                    draft.reason = Some("already fixed".to_string());
                    draft.step(FixState::Skipped, Some("already fixed"));
                    return Some(draft.finish());
                }
                self.run_ai(draft, &signature, &style, None)
            }
            RuleResult::SyntaxInvalid(rule) => {
                draft.remedy = Remedy::Rule(rule.clone());
                draft.step(FixState::RuleFailed, Some("syntax_invalid"));
                self.run_ai(draft, &signature, &style, Some(rule))
            }
        })
    }

    /// Returns `None` when a rule was applied (draft is final), otherwise
    /// why the rule path ended.
    fn run_rules(
        &self,
        draft: &mut Draft<'_>,
        signature: &str,
        style: &ProjectStyle,
    ) -> Result<Option<RuleResult>, PatchError> {
        let message = draft.record.normalized_message();
        let file = draft.file.clone();
        let mut duplicate = None;
        let mut unchanged = None;
        let mut invalid = None;

        for rule in self.rules.candidates(&message, &file) {
            let remedy = Remedy::Rule(rule.id.clone());
            if !self.claim(&file, &remedy, signature) {
                duplicate.get_or_insert(remedy);
                continue;
            }
            match self.engine.apply_rule(rule, &file, style) {
                Ok(PatchOutcome::Applied {
                    patch,
                    replacements,
                }) => {
                    debug!(rule = %rule.id, replacements, "rule applied");
                    self.applied_rules
                        .lock()
                        .insert((file.clone(), rule.id.clone()));
                    draft.remedy = remedy;
                    draft.diff = Some(patch.diff);
                    draft.backup = Some(patch.backup);
                    draft.step(FixState::Applied, Some(&rule.id));
                    return Ok(None);
                }
                Ok(PatchOutcome::Skipped { .. }) => {
                    unchanged.get_or_insert_with(|| rule.id.clone());
                }
                Ok(PatchOutcome::NoMatch) => {}
                Err(PatchError::SyntaxInvalid(e)) => {
                    warn!(rule = %rule.id, file = %file.display(), error = %e, "rule result rejected");
                    invalid.get_or_insert_with(|| rule.id.clone());
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Some(if let Some(rule) = invalid {
            RuleResult::SyntaxInvalid(rule)
        } else if let Some(rule) = unchanged {
            RuleResult::Unchanged(rule)
        } else if let Some(remedy) = duplicate {
            RuleResult::Duplicate(remedy)
        } else {
            RuleResult::NoMatch
        }))
    }

    /// AI fallback from `NoMatch` or `RuleFailed`. `failed_rule` is set in
    /// the latter case.
    fn run_ai(
        &self,
        mut draft: Draft<'_>,
        signature: &str,
        style: &ProjectStyle,
        failed_rule: Option<String>,
    ) -> FixAttempt {
        let Some(client) = &self.ai else {
            return without_ai(draft, failed_rule.is_some(), "no matching rule");
        };
        // Duplicates are settled before they can spend budget
        if !self.claim(&draft.file, &Remedy::Ai, signature) {
            draft.remedy = Remedy::Ai;
            draft.reason = Some("duplicate".to_string());
            draft.step(FixState::Skipped, Some("duplicate"));
            return draft.finish();
        }
        if !self.take_ai_budget() {
            return without_ai(draft, failed_rule.is_some(), "ai budget exhausted");
        }

        draft.remedy = Remedy::Ai;
        draft.step(FixState::AiAttempted, Some(client.model()));

        let source = match read_source(&draft.file) {
            Ok(s) => s,
            Err(e) => return draft.fail(e.reason()),
        };
        let timeout = Duration::from_secs(self.ai_config.timeout_secs);
        let (proposal, patched) =
            match client.propose(draft.record, &draft.file, &source, style, timeout) {
                Ok(p) => p,
                Err(e) => return draft.fail(e.to_string()),
            };

        match self.engine.commit_content(&draft.file, &source, &patched) {
            Ok(patch) => {
                draft.diff = Some(patch.diff);
                draft.backup = Some(patch.backup);
                draft.rationale = Some(proposal.rationale);
                draft.step(FixState::Applied, Some("ai"));
                draft.finish()
            }
            Err(e) => draft.fail(e.reason()),
        }
    }

    fn take_ai_budget(&self) -> bool {
        self.ai_used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < self.ai_config.max_attempts).then_some(used + 1)
            })
            .is_ok()
    }

    /// A candidate rule for `record` that already rewrote `file` this session.
    fn fixed_by(&self, record: &ErrorRecord, file: &Path) -> Option<String> {
        let message = record.normalized_message();
        let applied = self.applied_rules.lock();
        let found = self
            .rules
            .candidates(&message, file)
            .find(|rule| applied.contains(&(file.to_path_buf(), rule.id.clone())))
            .map(|rule| rule.id.clone());
        found
    }

    /// Reserve the dedup key; false when the pair was already processed.
    fn claim(&self, file: &Path, remedy: &Remedy, signature: &str) -> bool {
        self.seen
            .lock()
            .insert((file.to_path_buf(), remedy.clone(), signature.to_string()))
    }
}
