//! Formatting convention inference for generated patches
//!
//! Samples a bounded number of lines and counts indentation deltas, brace
//! placement and quote characters. Ties resolve to the recorded project
//! style first, then to the fixed default.

use ignore::WalkBuilder;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Extensions sampled when inferring a project-wide style
const PROJECT_EXTENSIONS: &[&str] = &["php", "phtml", "inc"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "width")]
pub enum IndentUnit {
    Tabs,
    Spaces(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracePlacement {
    SameLine,
    NextLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    Single,
    Double,
}

/// Formatting conventions of a file or project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectStyle {
    pub indent: IndentUnit,
    pub braces: BracePlacement,
    pub quotes: QuoteStyle,
}

impl Default for ProjectStyle {
    fn default() -> Self {
        Self {
            indent: IndentUnit::Spaces(4),
            braces: BracePlacement::SameLine,
            quotes: QuoteStyle::Single,
        }
    }
}

impl ProjectStyle {
    /// One level of indentation as text
    pub fn indent_str(&self) -> String {
        match self.indent {
            IndentUnit::Tabs => "\t".to_string(),
            IndentUnit::Spaces(n) => " ".repeat(n as usize),
        }
    }

    pub fn quote_char(&self) -> char {
        match self.quotes {
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
        }
    }

    /// Expand `{{quote}}` and `{{indent}}` tokens in a replacement template.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{{quote}}", &self.quote_char().to_string())
            .replace("{{indent}}", &self.indent_str())
    }

    /// Every style a template can be rendered with, used for rule self-checks
    pub fn variants() -> Vec<ProjectStyle> {
        let mut out = Vec::new();
        for indent in [IndentUnit::Spaces(4), IndentUnit::Spaces(2), IndentUnit::Tabs] {
            for quotes in [QuoteStyle::Single, QuoteStyle::Double] {
                out.push(ProjectStyle {
                    indent,
                    braces: BracePlacement::SameLine,
                    quotes,
                });
            }
        }
        out
    }

    /// Human-readable summary for prompts and reports
    pub fn describe(&self) -> String {
        let indent = match self.indent {
            IndentUnit::Tabs => "tabs".to_string(),
            IndentUnit::Spaces(n) => format!("{} spaces", n),
        };
        let braces = match self.braces {
            BracePlacement::SameLine => "opening braces on the same line",
            BracePlacement::NextLine => "opening braces on their own line",
        };
        let quotes = match self.quotes {
            QuoteStyle::Single => "single-quoted strings",
            QuoteStyle::Double => "double-quoted strings",
        };
        format!("indent with {}, {}, {}", indent, braces, quotes)
    }
}

/// Raw frequency counts over a sample
#[derive(Debug, Clone, Default)]
pub struct StyleCounts {
    /// Lines indented one or more tabs deeper than the previous line
    pub tab_increases: usize,
    /// Indentation increase (in spaces) → occurrences
    pub space_deltas: HashMap<usize, usize>,
    pub brace_same_line: usize,
    pub brace_next_line: usize,
    pub single_quotes: usize,
    pub double_quotes: usize,
}

impl StyleCounts {
    pub fn observe(&mut self, lines: &[&str]) {
        let mut prev_tabs = 0usize;
        let mut prev_spaces = 0usize;

        for line in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            // Both units vote once per indentation increase
            if line.starts_with('\t') {
                let tabs = line.len() - line.trim_start_matches('\t').len();
                if tabs > prev_tabs {
                    self.tab_increases += 1;
                }
                prev_tabs = tabs;
                prev_spaces = 0;
            } else {
                let spaces = line.len() - line.trim_start_matches(' ').len();
                if spaces > prev_spaces && spaces - prev_spaces <= 8 {
                    *self.space_deltas.entry(spaces - prev_spaces).or_default() += 1;
                }
                prev_spaces = spaces;
                prev_tabs = 0;
            }

            if is_comment(trimmed) {
                continue;
            }
            if trimmed == "{" {
                self.brace_next_line += 1;
            } else if trimmed.ends_with('{') {
                self.brace_same_line += 1;
            }

            self.single_quotes += trimmed.matches('\'').count();
            self.double_quotes += trimmed.matches('"').count();
        }
    }

    /// Resolve counts into a style. Ties fall back to `recorded`, then to the default.
    pub fn resolve(&self, recorded: Option<&ProjectStyle>) -> ProjectStyle {
        let fallback = recorded.copied().unwrap_or_default();

        let space_votes: usize = self.space_deltas.values().sum();
        let indent = if self.tab_increases > space_votes {
            IndentUnit::Tabs
        } else if space_votes > self.tab_increases {
            let best = self.space_deltas.values().copied().max().unwrap_or(0);
            let mut widths: Vec<usize> = self
                .space_deltas
                .iter()
                .filter(|(_, &count)| count == best)
                .map(|(&width, _)| width)
                .collect();
            widths.sort_unstable();
            match widths.as_slice() {
                [only] => IndentUnit::Spaces(*only as u8),
                _ => match fallback.indent {
                    IndentUnit::Spaces(n) if widths.contains(&(n as usize)) => IndentUnit::Spaces(n),
                    _ => ProjectStyle::default().indent,
                },
            }
        } else {
            fallback.indent
        };

        let braces = match self.brace_same_line.cmp(&self.brace_next_line) {
            std::cmp::Ordering::Greater => BracePlacement::SameLine,
            std::cmp::Ordering::Less => BracePlacement::NextLine,
            std::cmp::Ordering::Equal => fallback.braces,
        };

        let quotes = match self.single_quotes.cmp(&self.double_quotes) {
            std::cmp::Ordering::Greater => QuoteStyle::Single,
            std::cmp::Ordering::Less => QuoteStyle::Double,
            std::cmp::Ordering::Equal => fallback.quotes,
        };

        ProjectStyle {
            indent,
            braces,
            quotes,
        }
    }
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//")
        || trimmed.starts_with('#')
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
}

/// Samples files and derives [`ProjectStyle`]s
#[derive(Debug, Clone)]
pub struct StyleInferencer {
    sample_lines: usize,
    sample_files: usize,
}

impl StyleInferencer {
    pub fn new(sample_lines: usize, sample_files: usize) -> Self {
        Self {
            sample_lines: sample_lines.max(1),
            sample_files: sample_files.max(1),
        }
    }

    fn sample<'a>(&self, source: &'a str) -> Vec<&'a str> {
        source
            .lines()
            .filter(|l| !l.trim().is_empty())
            .take(self.sample_lines)
            .collect()
    }

    /// Infer the style of a single source text.
    pub fn infer_source(&self, source: &str, recorded: Option<&ProjectStyle>) -> ProjectStyle {
        let mut counts = StyleCounts::default();
        counts.observe(&self.sample(source));
        counts.resolve(recorded)
    }

    /// Infer a file's style; an unreadable or empty file yields `project`.
    pub fn infer_file(&self, path: &Path, project: &ProjectStyle) -> ProjectStyle {
        match std::fs::read_to_string(path) {
            Ok(source) if !source.trim().is_empty() => self.infer_source(&source, Some(project)),
            _ => *project,
        }
    }

    /// Infer a project-wide style from a bounded set of source files.
    pub fn infer_project(&self, root: &Path, recorded: Option<&ProjectStyle>) -> ProjectStyle {
        let mut files: Vec<PathBuf> = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| PROJECT_EXTENSIONS.contains(&e))
            })
            .collect();
        files.sort();
        files.truncate(self.sample_files);

        let mut counts = StyleCounts::default();
        for file in &files {
            if let Ok(source) = std::fs::read_to_string(file) {
                counts.observe(&self.sample(&source));
            }
        }
        debug!(root = %root.display(), files = files.len(), "inferred project style");
        counts.resolve(recorded)
    }
}

/// Session-scoped style cache: one project style, one style per file
pub struct StyleCache {
    inferencer: StyleInferencer,
    root: PathBuf,
    recorded: Option<ProjectStyle>,
    project: OnceLock<ProjectStyle>,
    files: Mutex<HashMap<PathBuf, ProjectStyle>>,
}

impl StyleCache {
    pub fn new(inferencer: StyleInferencer, root: PathBuf, recorded: Option<ProjectStyle>) -> Self {
        Self {
            inferencer,
            root,
            recorded,
            project: OnceLock::new(),
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn project(&self) -> ProjectStyle {
        *self.project.get_or_init(|| match self.recorded {
            Some(style) => style,
            None => self.inferencer.infer_project(&self.root, None),
        })
    }

    pub fn for_file(&self, path: &Path) -> ProjectStyle {
        if let Some(style) = self.files.lock().get(path) {
            return *style;
        }
        let style = self.inferencer.infer_file(path, &self.project());
        self.files.lock().insert(path.to_path_buf(), style);
        style
    }
}
