//! `sitefix restore`: put every file of a session back from its backup

use anyhow::{bail, Context, Result};
use colored::Colorize;
use sitefix_core::patch::backup::restore_session;
use std::path::Path;

use crate::run_log;

pub fn run(session: &str, path: Option<&Path>) -> Result<i32> {
    let root = super::project_root(path);
    let config = super::load_config(&root)?;
    let session = if session == "latest" {
        latest_session(&root)?
    } else {
        session.to_string()
    };
    let session = session.as_str();
    let session_dir = root.join(&config.fix.backup_dir).join(session);

    if !session_dir.is_dir() {
        bail!(
            "No backups for session '{}' under {}",
            session,
            session_dir.display()
        );
    }

    let restored = restore_session(&session_dir)
        .with_context(|| format!("Failed to restore session '{}'", session))?;

    for file in &restored {
        let display = file.strip_prefix(&root).unwrap_or(file);
        println!("  {} {}", "restored".green(), display.display());
    }
    println!();
    println!("✅ Restored {} file(s) from session {}", restored.len(), session);
    Ok(0)
}

/// Session of the newest run log
fn latest_session(root: &Path) -> Result<String> {
    match run_log::list_runs(root)?.into_iter().next() {
        Some(entry) => Ok(entry.session),
        None => bail!("No run logs under {}", root.join(run_log::RUNS_DIR).display()),
    }
}
