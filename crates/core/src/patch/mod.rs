//! Patch engine: applies rule or AI edits with backup, validation and atomic commit
//!
//! A candidate is staged in a temp file next to the target, syntax-checked,
//! and only then renamed over the target. A rejected candidate never reaches
//! the target, so its on-disk content stays byte-identical to the pre-fix
//! content. The session backup is taken right before the first commit.
//!
//! The engine does not lock: callers serialize work on one path through
//! [`FileLocks`].

pub mod backup;
pub mod diff;
pub mod locks;

pub use backup::{BackupEntry, BackupLedger, BackupManifest};
pub use locks::FileLocks;

use crate::error::PatchError;
use crate::rules::{FixRule, RuleOutcome};
use crate::style::ProjectStyle;
use crate::syntax::SyntaxValidator;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A committed edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPatch {
    pub diff: String,
    pub backup: PathBuf,
}

/// Result of applying one rule to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    NoMatch,
    /// The rule matched but produced no textual change
    Skipped { matches: usize },
    Applied {
        patch: AppliedPatch,
        replacements: usize,
    },
}

fn stage(target: &Path, content: &[u8]) -> Result<NamedTempFile, PatchError> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let suffix = target
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut tmp = tempfile::Builder::new()
        .prefix(".sitefix-")
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(|e| PatchError::io(dir, e))?;
    tmp.as_file_mut()
        .write_all(content)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| PatchError::io(tmp.path(), e))?;

    if let Ok(meta) = std::fs::metadata(target) {
        std::fs::set_permissions(tmp.path(), meta.permissions())
            .map_err(|e| PatchError::io(tmp.path(), e))?;
    }
    Ok(tmp)
}

fn commit(staged: NamedTempFile, target: &Path) -> Result<(), PatchError> {
    staged
        .persist(target)
        .map(|_| ())
        .map_err(|e| PatchError::io(target, e.error))
}

/// Write `content` to `path` via temp file + rename.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<(), PatchError> {
    let staged = stage(path, content)?;
    commit(staged, path)
}

/// Read a target file as UTF-8 without any lossy conversion
pub fn read_source(path: &Path) -> Result<String, PatchError> {
    let bytes = std::fs::read(path).map_err(|e| PatchError::io(path, e))?;
    String::from_utf8(bytes).map_err(|_| PatchError::NotUtf8(path.to_path_buf()))
}

pub struct PatchEngine {
    validator: Box<dyn SyntaxValidator>,
    checked_extensions: Vec<String>,
    backups: BackupLedger,
}

impl PatchEngine {
    pub fn new(
        validator: Box<dyn SyntaxValidator>,
        checked_extensions: Vec<String>,
        backups: BackupLedger,
    ) -> Self {
        Self {
            validator,
            checked_extensions,
            backups,
        }
    }

    pub fn backups(&self) -> &BackupLedger {
        &self.backups
    }

    fn needs_check(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.checked_extensions
                    .iter()
                    .any(|c| c.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }

    /// Run `rule` over the file at `path` and commit the result if it changes anything.
    pub fn apply_rule(
        &self,
        rule: &FixRule,
        path: &Path,
        style: &ProjectStyle,
    ) -> Result<PatchOutcome, PatchError> {
        let original = read_source(path)?;
        match rule.apply(&original, style) {
            RuleOutcome::NoMatch => Ok(PatchOutcome::NoMatch),
            RuleOutcome::Unchanged { matches } => Ok(PatchOutcome::Skipped { matches }),
            RuleOutcome::Changed {
                content,
                replacements,
            } => {
                let patch = self.commit_content(path, &original, &content)?;
                debug!(rule = %rule.id, file = %path.display(), replacements, "rule committed");
                Ok(PatchOutcome::Applied {
                    patch,
                    replacements,
                })
            }
        }
    }

    /// Stage, validate, back up and commit `updated` over `original`.
    ///
    /// `original` must be the content currently on disk.
    pub fn commit_content(
        &self,
        path: &Path,
        original: &str,
        updated: &str,
    ) -> Result<AppliedPatch, PatchError> {
        let staged = stage(path, updated.as_bytes())?;

        if self.needs_check(path) {
            // Dropping `staged` on error removes the temp file
            self.validator.validate(staged.path(), updated)?;
        }

        let backup = self.backups.ensure(path, original.as_bytes())?;
        commit(staged, path)?;

        Ok(AppliedPatch {
            diff: diff::unified_diff(path, original, updated),
            backup,
        })
    }

    /// Run the configured syntax check on in-memory content
    pub fn check_syntax(&self, path: &Path, source: &str) -> Result<(), PatchError> {
        if !self.needs_check(path) {
            return Ok(());
        }
        let staged = stage(path, source.as_bytes())?;
        self.validator.validate(staged.path(), source)?;
        Ok(())
    }
}
