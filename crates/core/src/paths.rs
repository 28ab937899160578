//! Resolution of reported file paths to files the engine can write
//!
//! Paths in error messages come from the execution environment (a container,
//! a remote host). They are translated through the `[[paths.map]]` table
//! (longest `from` prefix wins), then resolved against the project root.

use crate::config::PathMapEntry;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PathMapper {
    root: PathBuf,
    maps: Vec<PathMapEntry>,
}

impl PathMapper {
    pub fn new(root: &Path, maps: &[PathMapEntry]) -> Self {
        let mut maps: Vec<PathMapEntry> = maps
            .iter()
            .filter(|m| !m.from.is_empty() && !m.to.is_empty())
            .cloned()
            .collect();
        maps.sort_by(|a, b| b.from.len().cmp(&a.from.len()));
        Self {
            root: root.to_path_buf(),
            maps,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Apply the mapping table only. Unmapped paths are returned normalized.
    pub fn remap(&self, reported: &Path) -> PathBuf {
        let unified = reported.to_string_lossy().replace('\\', "/");
        for map in &self.maps {
            let from = map.from.replace('\\', "/");
            let from = from.trim_end_matches('/');
            let Some(tail) = unified.strip_prefix(from) else {
                continue;
            };
            // Prefix must end on a component boundary
            if !(tail.is_empty() || tail.starts_with('/')) {
                continue;
            }
            let to = map.to.trim_end_matches(['/', '\\']);
            let mut out = PathBuf::from(to);
            for part in tail.split('/').filter(|p| !p.is_empty()) {
                out.push(part);
            }
            return normalize(&out);
        }
        normalize(&PathBuf::from(unified))
    }

    /// Map and resolve a reported path to an existing local file, if any.
    ///
    /// Relative results are joined to the root. An absolute path that does
    /// not exist locally is retried relative to the root.
    pub fn resolve(&self, reported: &Path) -> Option<PathBuf> {
        let mapped = self.remap(reported);
        let candidate = if mapped.is_absolute() {
            mapped.clone()
        } else {
            normalize(&self.root.join(&mapped))
        };
        if candidate.is_file() {
            return Some(candidate);
        }

        if mapped.is_absolute() {
            let relative: PathBuf = mapped
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .collect();
            let rooted = normalize(&self.root.join(relative));
            if rooted.is_file() {
                return Some(rooted);
            }
        }
        None
    }

    /// The path a record would be written to, whether or not it exists
    pub fn target(&self, reported: &Path) -> PathBuf {
        self.resolve(reported).unwrap_or_else(|| {
            let mapped = self.remap(reported);
            if mapped.is_absolute() {
                mapped
            } else {
                normalize(&self.root.join(mapped))
            }
        })
    }
}

/// Lexically normalize `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
