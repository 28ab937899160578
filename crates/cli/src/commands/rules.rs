//! `sitefix rules`: load and validate the effective rule set

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use sitefix_core::RuleSet;
use std::path::Path;

use crate::output::json;
use crate::OutputFormat;

#[derive(Debug, Serialize)]
pub struct RuleListing {
    pub id: String,
    pub note: String,
}

pub fn run(path: Option<&Path>, format: OutputFormat) -> Result<i32> {
    let root = super::project_root(path);
    let config = super::load_config(&root)?;

    let rules = match RuleSet::load(&config.effective_rules()) {
        Ok(rules) => rules,
        Err(e) => {
            match format {
                OutputFormat::Json => json::print(&serde_json::json!({
                    "errors": e.errors.iter().map(|err| err.to_string()).collect::<Vec<_>>(),
                })),
                OutputFormat::Terminal => {
                    println!("  {} rule set does not validate:", "❌".red());
                    for err in &e.errors {
                        println!("    - {}", err);
                    }
                }
            }
            return Ok(2);
        }
    };

    let listing = listing(&rules);
    match format {
        OutputFormat::Json => json::print(&listing),
        OutputFormat::Terminal => {
            println!("  {}", format!("{:<32} {}", "ID", "Note").bold());
            println!("  {}", "\u{2500}".repeat(72).dimmed());
            for rule in &listing {
                println!("  {:<32} {}", rule.id, rule.note.dimmed());
            }
            println!();
            println!("  ✅ {} rule(s) validated", listing.len());
        }
    }
    Ok(0)
}

pub fn listing(rules: &RuleSet) -> Vec<RuleListing> {
    rules
        .rules()
        .iter()
        .map(|r| RuleListing {
            id: r.id.clone(),
            note: r.note.clone(),
        })
        .collect()
}
