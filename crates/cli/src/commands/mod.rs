//! CLI commands
//!
//! Every `run` returns the process exit code on success.

pub mod ai_health;
pub mod fix;
pub mod init;
pub mod restore;
pub mod rules;
pub mod scan;

use anyhow::{Context, Result};
use sitefix_core::{PageCheck, SitefixConfig};
use std::path::{Path, PathBuf};

/// Resolve the project root, canonicalized when it exists
pub fn project_root(path: Option<&Path>) -> PathBuf {
    let root = path.unwrap_or_else(|| Path::new("."));
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}

pub fn load_config(root: &Path) -> Result<SitefixConfig> {
    SitefixConfig::find_and_load(root)
        .with_context(|| format!("Failed to load configuration for {}", root.display()))
}

/// Read the page checks JSON file: an array of check objects
pub fn load_checks(path: &Path) -> Result<Vec<PageCheck>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read checks file {}", path.display()))?;
    let checks: Vec<PageCheck> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse checks file {}", path.display()))?;
    Ok(checks)
}
