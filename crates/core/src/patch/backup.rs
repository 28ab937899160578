//! Session backups: one pre-mutation snapshot per file per session
//!
//! Backups live under `<backup_dir>/<session>/` and mirror the project-relative
//! path of the original. Files outside the project root are stored under
//! `_external/` with a path hash prefix. A `manifest.json` maps every backup
//! to its original so a session can be restored later.

use super::write_atomic;
use crate::error::PatchError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub original: PathBuf,
    pub backup: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupManifest {
    pub session: String,
    pub entries: Vec<BackupEntry>,
}

/// Tracks which files already have a backup in this session
#[derive(Debug)]
pub struct BackupLedger {
    session: String,
    root: PathBuf,
    session_dir: PathBuf,
    entries: Mutex<BTreeMap<PathBuf, PathBuf>>,
}

impl BackupLedger {
    /// `backup_dir` is resolved against `root` when relative.
    pub fn new(root: &Path, backup_dir: &Path, session: &str) -> Self {
        let base = if backup_dir.is_absolute() {
            backup_dir.to_path_buf()
        } else {
            root.join(backup_dir)
        };
        Self {
            session: session.to_string(),
            root: root.to_path_buf(),
            session_dir: base.join(session),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Where the backup of `file` lives (whether or not it exists yet)
    pub fn backup_path_for(&self, file: &Path) -> PathBuf {
        match file.strip_prefix(&self.root) {
            Ok(rel) if !rel.as_os_str().is_empty() => self.session_dir.join(rel),
            _ => {
                let hash = Sha256::digest(file.to_string_lossy().as_bytes());
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "file".to_string());
                self.session_dir
                    .join("_external")
                    .join(format!("{}-{}", &format!("{:x}", hash)[..12], name))
            }
        }
    }

    pub fn get(&self, file: &Path) -> Option<PathBuf> {
        self.entries.lock().get(file).cloned()
    }

    /// Snapshot `content` as the backup of `file` unless one exists already.
    ///
    /// Never overwrites an existing backup, neither a recorded one nor one
    /// found on disk for this session.
    pub fn ensure(&self, file: &Path, content: &[u8]) -> Result<PathBuf, PatchError> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(file) {
            return Ok(existing.clone());
        }

        let backup = self.backup_path_for(file);
        if !backup.exists() {
            if let Some(parent) = backup.parent() {
                std::fs::create_dir_all(parent).map_err(|e| PatchError::io(parent, e))?;
            }
            write_atomic(&backup, content)?;
            info!(file = %file.display(), backup = %backup.display(), "backup created");
        } else {
            debug!(backup = %backup.display(), "backup already on disk, keeping it");
        }

        entries.insert(file.to_path_buf(), backup.clone());
        let manifest = BackupManifest {
            session: self.session.clone(),
            entries: entries
                .iter()
                .map(|(original, backup)| BackupEntry {
                    original: original.clone(),
                    backup: backup.clone(),
                })
                .collect(),
        };
        drop(entries);

        self.write_manifest(&manifest)?;
        Ok(backup)
    }

    fn write_manifest(&self, manifest: &BackupManifest) -> Result<(), PatchError> {
        let path = self.session_dir.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| PatchError::io(&path, std::io::Error::other(e)))?;
        write_atomic(&path, &json)
    }

    pub fn entries(&self) -> Vec<BackupEntry> {
        self.entries
            .lock()
            .iter()
            .map(|(original, backup)| BackupEntry {
                original: original.clone(),
                backup: backup.clone(),
            })
            .collect()
    }
}

/// Read the manifest of a previous session
pub fn load_manifest(session_dir: &Path) -> Result<BackupManifest, PatchError> {
    let path = session_dir.join(MANIFEST_FILE);
    let bytes = std::fs::read(&path).map_err(|e| PatchError::io(&path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| PatchError::io(&path, std::io::Error::other(e)))
}

/// Copy every backup of a session back over its original.
pub fn restore_session(session_dir: &Path) -> Result<Vec<PathBuf>, PatchError> {
    let manifest = load_manifest(session_dir)?;
    let mut restored = Vec::new();
    for entry in &manifest.entries {
        let bytes = std::fs::read(&entry.backup).map_err(|e| PatchError::io(&entry.backup, e))?;
        write_atomic(&entry.original, &bytes)?;
        info!(file = %entry.original.display(), "restored from backup");
        restored.push(entry.original.clone());
    }
    Ok(restored)
}
