//! Syntax validity checks run on staged content before it is committed

use crate::config::SyntaxConfig;
use crate::error::SyntaxError;
use regex::Regex;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tree_sitter::{Node, Parser};
use tracing::warn;

/// Checks that a staged file is syntactically valid
pub trait SyntaxValidator: Send + Sync {
    fn name(&self) -> &str;

    /// `staged` is a file on disk holding exactly `source`.
    fn validate(&self, staged: &Path, source: &str) -> Result<(), SyntaxError>;
}

/// In-process PHP parse via Tree-sitter (HTML-embedded PHP grammar)
pub struct TreeSitterPhp {
    language: tree_sitter::Language,
}

impl Default for TreeSitterPhp {
    fn default() -> Self {
        Self {
            language: tree_sitter_php::LANGUAGE_PHP.into(),
        }
    }
}

impl TreeSitterPhp {
    pub fn new() -> Self {
        Self::default()
    }

    fn create_parser(&self) -> Result<Parser, SyntaxError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| SyntaxError::CheckerUnavailable(e.to_string()))?;
        Ok(parser)
    }

    /// Check source text directly
    pub fn check_source(&self, source: &str) -> Result<(), SyntaxError> {
        let mut parser = self.create_parser()?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            SyntaxError::CheckerUnavailable("tree-sitter returned no tree".to_string())
        })?;

        let root = tree.root_node();
        if !root.has_error() {
            return Ok(());
        }

        let node = first_error(root);
        let pos = node.start_position();
        let message = if node.is_missing() {
            format!("missing {}", node.kind())
        } else {
            let snippet: String = source
                .get(node.start_byte()..node.end_byte())
                .unwrap_or("")
                .chars()
                .take(40)
                .collect();
            format!("unexpected '{}'", snippet.trim())
        };
        Err(SyntaxError::Invalid {
            line: pos.row + 1,
            column: pos.column + 1,
            message,
        })
    }
}

/// Descend along error-bearing children to the first ERROR or MISSING node.
fn first_error(root: Node<'_>) -> Node<'_> {
    let mut node = root;
    loop {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        let mut next = None;
        for child in children {
            if child.is_error() || child.is_missing() {
                return child;
            }
            if child.has_error() {
                next = Some(child);
                break;
            }
        }
        match next {
            Some(child) => node = child,
            None => return node,
        }
    }
}

impl SyntaxValidator for TreeSitterPhp {
    fn name(&self) -> &str {
        "tree-sitter"
    }

    fn validate(&self, _staged: &Path, source: &str) -> Result<(), SyntaxError> {
        self.check_source(source)
    }
}

/// External `php -l` linter; falls back to Tree-sitter when PHP is not installed
pub struct PhpLint {
    binary: String,
    fallback: TreeSitterPhp,
}

impl PhpLint {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            fallback: TreeSitterPhp::new(),
        }
    }
}

fn lint_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:parse|fatal) error:\s*(.*?)\s+in\s+\S+\s+on line\s+(\d+)").unwrap())
}

impl SyntaxValidator for PhpLint {
    fn name(&self) -> &str {
        "php-lint"
    }

    fn validate(&self, staged: &Path, source: &str) -> Result<(), SyntaxError> {
        let output = match Command::new(&self.binary).arg("-l").arg(staged).output() {
            Ok(o) => o,
            Err(e) => {
                warn!(binary = %self.binary, error = %e, "php linter unavailable, using tree-sitter");
                return self.fallback.check_source(source);
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        match lint_line_regex().captures(&text) {
            Some(caps) => Err(SyntaxError::Invalid {
                line: caps[2].parse().unwrap_or(0),
                column: 0,
                message: caps[1].to_string(),
            }),
            None => Err(SyntaxError::Invalid {
                line: 0,
                column: 0,
                message: text.trim().lines().next().unwrap_or("php -l failed").to_string(),
            }),
        }
    }
}

/// Build the validator selected in `[syntax]`
pub fn validator_from_config(config: &SyntaxConfig) -> Box<dyn SyntaxValidator> {
    match config.checker.as_str() {
        "php-lint" | "php" => Box::new(PhpLint::new(config.php_binary.clone())),
        "tree-sitter" => Box::new(TreeSitterPhp::new()),
        other => {
            warn!(checker = other, "unknown syntax checker, using tree-sitter");
            Box::new(TreeSitterPhp::new())
        }
    }
}
