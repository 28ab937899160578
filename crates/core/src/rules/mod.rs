//! Declarative search/replace fix rules
//!
//! Rules come from the `[[rules]]` table of `.sitefix.toml` (plus the
//! built-in set) and are compiled and self-checked once per session.
//! The `regex` crate has no lookaround, so negative context is expressed as
//! a second phase: every candidate match is dropped when
//! `skip_if_preceded_by` matches the text ending at the match start, or
//! `skip_if_followed_by` matches the text starting at the match end.

pub mod builtin;

use crate::config::RuleConfig;
use crate::error::{RuleSetError, RuleValidationError};
use crate::style::ProjectStyle;
use glob::Pattern;
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Bytes of surrounding text visible to the guard filters
const GUARD_WINDOW: usize = 256;

/// Result of running one rule over a piece of content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// No span survived the search and guard phases
    NoMatch,
    /// Spans matched but every replacement equals the original text
    Unchanged { matches: usize },
    /// At least one span was rewritten
    Changed { content: String, replacements: usize },
}

/// A compiled, validated fix rule
#[derive(Debug)]
pub struct FixRule {
    pub id: String,
    pub note: String,
    matcher: Regex,
    search: Regex,
    replace: String,
    preceded: Option<Regex>,
    followed: Option<Regex>,
    globs: Vec<Pattern>,
    probe: String,
}

fn compile(id: &str, field: &'static str, pattern: &str) -> Result<Regex, RuleValidationError> {
    Regex::new(pattern).map_err(|source| RuleValidationError::InvalidPattern {
        id: id.to_string(),
        field,
        source,
    })
}

impl FixRule {
    /// Compile a rule definition. Does not run the self-check.
    pub fn compile(index: usize, config: &RuleConfig) -> Result<Self, RuleValidationError> {
        let id = config.id.trim().to_string();
        if id.is_empty() {
            return Err(RuleValidationError::EmptyId { index });
        }

        let matcher = compile(&id, "match", &format!("(?i){}", config.match_message))?;
        let search = compile(&id, "search", &config.search)?;
        let preceded = config
            .skip_if_preceded_by
            .as_deref()
            .map(|p| compile(&id, "skip_if_preceded_by", &format!("(?:{})$", p)))
            .transpose()?;
        let followed = config
            .skip_if_followed_by
            .as_deref()
            .map(|p| compile(&id, "skip_if_followed_by", &format!("^(?:{})", p)))
            .transpose()?;

        let mut globs = Vec::new();
        for glob in &config.paths {
            let pattern = Pattern::new(glob).map_err(|e| RuleValidationError::InvalidGlob {
                id: id.clone(),
                glob: glob.clone(),
                message: e.to_string(),
            })?;
            globs.push(pattern);
        }

        let probe = config.probe.clone().unwrap_or_default();
        if probe.trim().is_empty() {
            return Err(RuleValidationError::MissingProbe(id));
        }

        Ok(Self {
            id,
            note: config.note.clone(),
            matcher,
            search,
            replace: config.replace.clone(),
            preceded,
            followed,
            globs,
            probe,
        })
    }

    /// Whether the rule addresses this (normalized) error message
    pub fn applies_to(&self, message: &str) -> bool {
        self.matcher.is_match(message)
    }

    /// Whether the rule may touch this file. No globs means every file.
    pub fn applies_to_file(&self, path: &Path) -> bool {
        if self.globs.is_empty() {
            return true;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        self.globs.iter().any(|g| g.matches(name))
    }

    fn uses_style_tokens(&self) -> bool {
        self.replace.contains("{{quote}}") || self.replace.contains("{{indent}}")
    }

    fn guarded(&self, content: &str, start: usize, end: usize) -> bool {
        if let Some(preceded) = &self.preceded {
            let mut from = start.saturating_sub(GUARD_WINDOW);
            while !content.is_char_boundary(from) {
                from += 1;
            }
            if preceded.is_match(&content[from..start]) {
                return true;
            }
        }
        if let Some(followed) = &self.followed {
            let mut to = (end + GUARD_WINDOW).min(content.len());
            while !content.is_char_boundary(to) {
                to -= 1;
            }
            if followed.is_match(&content[end..to]) {
                return true;
            }
        }
        false
    }

    /// Single left-to-right pass over all non-overlapping matches.
    pub fn apply(&self, content: &str, style: &ProjectStyle) -> RuleOutcome {
        let template = style.render(&self.replace);
        let mut output = String::with_capacity(content.len() + 64);
        let mut last = 0;
        let mut matches = 0;
        let mut replacements = 0;

        for caps in self.search.captures_iter(content) {
            let Some(span) = caps.get(0) else { continue };
            if self.guarded(content, span.start(), span.end()) {
                continue;
            }
            matches += 1;

            let mut replacement = String::new();
            caps.expand(&template, &mut replacement);
            if replacement != span.as_str() {
                replacements += 1;
            }

            output.push_str(&content[last..span.start()]);
            output.push_str(&replacement);
            last = span.end();
        }

        if matches == 0 {
            return RuleOutcome::NoMatch;
        }
        if replacements == 0 {
            return RuleOutcome::Unchanged { matches };
        }
        output.push_str(&content[last..]);
        RuleOutcome::Changed {
            content: output,
            replacements,
        }
    }

    /// The probe must change on the first pass and stay fixed on the second,
    /// under every style the template can render with.
    pub fn self_check(&self) -> Result<(), RuleValidationError> {
        let styles = if self.uses_style_tokens() {
            ProjectStyle::variants()
        } else {
            vec![ProjectStyle::default()]
        };

        for style in &styles {
            let first = match self.apply(&self.probe, style) {
                RuleOutcome::Changed { content, .. } => content,
                _ => return Err(RuleValidationError::ProbeUnchanged(self.id.clone())),
            };
            if let RuleOutcome::Changed { content: second, .. } = self.apply(&first, style) {
                return Err(RuleValidationError::NotIdempotent {
                    id: self.id.clone(),
                    first,
                    second,
                });
            }
        }
        Ok(())
    }
}

/// Ordered, validated collection of fix rules
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<FixRule>,
}

impl RuleSet {
    /// Compile and self-check every rule. Any invalid rule rejects the whole set.
    pub fn load(configs: &[RuleConfig]) -> Result<Self, RuleSetError> {
        let mut errors = Vec::new();
        let mut rules = Vec::new();
        let mut ids = HashSet::new();

        for (index, config) in configs.iter().enumerate() {
            match FixRule::compile(index, config) {
                Ok(rule) => {
                    if !ids.insert(rule.id.clone()) {
                        errors.push(RuleValidationError::DuplicateId(rule.id.clone()));
                        continue;
                    }
                    rules.push(rule);
                }
                Err(e) => errors.push(e),
            }
        }

        let check_failures: Vec<RuleValidationError> = rules
            .par_iter()
            .filter_map(|rule| rule.self_check().err())
            .collect();
        errors.extend(check_failures);

        if !errors.is_empty() {
            return Err(RuleSetError { errors });
        }

        debug!(rules = rules.len(), "rule set loaded");
        Ok(Self { rules })
    }

    /// Rules applicable to `message` for `file`, in definition order
    pub fn candidates<'a>(
        &'a self,
        message: &'a str,
        file: &'a Path,
    ) -> impl Iterator<Item = &'a FixRule> + 'a {
        self.rules
            .iter()
            .filter(move |r| r.applies_to(message) && r.applies_to_file(file))
    }

    pub fn rules(&self) -> &[FixRule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&FixRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
