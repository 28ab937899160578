//! Configuration file parsing for .sitefix.toml

use crate::style::{BracePlacement, IndentUnit, ProjectStyle, QuoteStyle};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".sitefix.toml";

/// A declarative fix rule in `.sitefix.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Unique identifier (e.g., "guard-superglobal-access")
    pub id: String,

    /// Regex applied (case-insensitively) to the normalized error message
    #[serde(rename = "match")]
    pub match_message: String,

    /// Regex locating candidate spans in the file (Rust `regex` syntax)
    pub search: String,

    /// Replacement template: `$0`, `$1`, `${name}` captures plus the style
    /// tokens `{{quote}}` and `{{indent}}`
    #[serde(default)]
    pub replace: String,

    /// Drop a match when this pattern matches the text right before it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_if_preceded_by: Option<String>,

    /// Drop a match when this pattern matches the text right after it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_if_followed_by: Option<String>,

    /// Glob patterns on the file name (e.g., `["*.php", "*.inc"]`); empty = all
    #[serde(default)]
    pub paths: Vec<String>,

    /// Sample input the rule must change once and then leave alone
    #[serde(default)]
    pub probe: Option<String>,

    #[serde(default)]
    pub note: String,
}

/// A container → host path translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapEntry {
    pub from: String,
    pub to: String,
}

/// Main configuration structure for .sitefix.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitefixConfig {
    #[serde(default)]
    pub fix: FixConfig,

    #[serde(default)]
    pub ai: AIConfig,

    #[serde(default)]
    pub style: StyleConfig,

    #[serde(default)]
    pub syntax: SyntaxConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    /// User-defined fix rules, applied after the built-in ones
    #[serde(default, rename = "rules")]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixConfig {
    /// Load the built-in PHP 8 migration rules
    #[serde(default = "default_true")]
    pub builtin_rules: bool,

    /// Directory for session backups, relative to the project root
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIConfig {
    /// AI-assisted fixing is opt-in
    #[serde(default)]
    pub enabled: bool,

    /// LLM provider ("openai", "anthropic", "ollama")
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// API key; it can also be set via OPENAI_API_KEY / ANTHROPIC_API_KEY env var
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the provider endpoint (required for self-hosted models)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Max AI fix attempts per session
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Retries per attempt for transient failures
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Initial backoff between retries, doubled on each retry
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Timeout of a single provider call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Lines of context sent on each side of the affected line
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    /// Max ratio between replaced and replacement line counts
    #[serde(default = "default_max_line_ratio")]
    pub max_line_ratio: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Non-blank lines sampled per file
    #[serde(default = "default_sample_lines")]
    pub sample_lines: usize,

    /// Files sampled when inferring the project style
    #[serde(default = "default_sample_files")]
    pub sample_files: usize,

    /// Pin the project indent ("tabs" or a number of spaces)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<String>,

    /// Pin brace placement ("same_line" or "next_line")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub braces: Option<BracePlacement>,

    /// Pin quote preference ("single" or "double")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotes: Option<QuoteStyle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxConfig {
    /// "tree-sitter" (in-process) or "php-lint" (external `php -l`)
    #[serde(default = "default_checker")]
    pub checker: String,

    #[serde(default = "default_php_binary")]
    pub php_binary: String,

    /// Extensions that are syntax-checked; other files are accepted as-is
    #[serde(default = "default_syntax_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Execution-environment → local path translations
    #[serde(default)]
    pub map: Vec<PathMapEntry>,
}

// Default functions
fn default_true() -> bool {
    true
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(".sitefix-cache/backups")
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_attempts() -> usize {
    20
}

fn default_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_context_lines() -> usize {
    20
}

fn default_max_line_ratio() -> usize {
    3
}

fn default_sample_lines() -> usize {
    200
}

fn default_sample_files() -> usize {
    20
}

fn default_checker() -> String {
    "tree-sitter".to_string()
}

fn default_php_binary() -> String {
    "php".to_string()
}

fn default_syntax_extensions() -> Vec<String> {
    vec!["php".to_string(), "phtml".to_string(), "inc".to_string()]
}

impl Default for SitefixConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty TOML should parse to defaults")
    }
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            builtin_rules: true,
            backup_dir: default_backup_dir(),
        }
    }
}

impl Default for AIConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            max_attempts: default_max_attempts(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
            timeout_secs: default_timeout_secs(),
            context_lines: default_context_lines(),
            max_line_ratio: default_max_line_ratio(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            sample_lines: default_sample_lines(),
            sample_files: default_sample_files(),
            indent: None,
            braces: None,
            quotes: None,
        }
    }
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            checker: default_checker(),
            php_binary: default_php_binary(),
            extensions: default_syntax_extensions(),
        }
    }
}

impl StyleConfig {
    /// The pinned project style, if any dimension is pinned.
    /// Unpinned dimensions take the default.
    pub fn recorded_style(&self) -> Result<Option<ProjectStyle>> {
        if self.indent.is_none() && self.braces.is_none() && self.quotes.is_none() {
            return Ok(None);
        }
        let defaults = ProjectStyle::default();
        let indent = match self.indent.as_deref() {
            None => defaults.indent,
            Some("tabs") | Some("tab") => IndentUnit::Tabs,
            Some(n) => IndentUnit::Spaces(
                n.parse::<u8>()
                    .with_context(|| format!("invalid [style].indent '{}'", n))?,
            ),
        };
        Ok(Some(ProjectStyle {
            indent,
            braces: self.braces.unwrap_or(defaults.braces),
            quotes: self.quotes.unwrap_or(defaults.quotes),
        }))
    }
}

impl SitefixConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: SitefixConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Find and load .sitefix.toml from the given directory or ancestors
    pub fn find_and_load(start_dir: &Path) -> Result<Self> {
        let mut current = start_dir;

        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                return Self::from_file(&config_path);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        // No config found, use defaults
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Built-in rules (when enabled) followed by user rules
    pub fn effective_rules(&self) -> Vec<RuleConfig> {
        let mut rules = if self.fix.builtin_rules {
            crate::rules::builtin::builtin_rules()
        } else {
            Vec::new()
        };
        rules.extend(self.rules.iter().cloned());
        rules
    }
}
