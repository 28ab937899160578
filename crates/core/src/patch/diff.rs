//! Unified diffs between pre-fix and post-fix content

use git2::Patch;
use std::path::Path;
use tracing::warn;

/// Render a unified diff of `old` → `new` labelled with `path`.
pub fn unified_diff(path: &Path, old: &str, new: &str) -> String {
    let rendered = Patch::from_buffers(old.as_bytes(), Some(path), new.as_bytes(), Some(path), None)
        .and_then(|mut patch| patch.to_buf())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned());

    match rendered {
        Ok(diff) => diff,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "git2 diff failed, using line listing");
            line_listing(path, old, new)
        }
    }
}

/// Positional line listing used when libgit2 cannot render a patch
fn line_listing(path: &Path, old: &str, new: &str) -> String {
    let mut out = format!("--- a/{0}\n+++ b/{0}\n", path.display());
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    for i in 0..old_lines.len().max(new_lines.len()) {
        match (old_lines.get(i), new_lines.get(i)) {
            (Some(a), Some(b)) if a == b => {}
            (a, b) => {
                if let Some(a) = a {
                    out.push_str(&format!("-{}\n", a));
                }
                if let Some(b) = b {
                    out.push_str(&format!("+{}\n", b));
                }
            }
        }
    }
    out
}
