//! `sitefix ai-health`: one minimal request to the configured provider

use anyhow::{Context, Result};
use colored::Colorize;
use sitefix_core::ai::health_check;
use sitefix_core::HttpTransport;
use std::path::Path;
use std::time::Duration;

use crate::output::json;
use crate::OutputFormat;

pub fn run(path: Option<&Path>, format: OutputFormat) -> Result<i32> {
    let root = super::project_root(path);
    let config = super::load_config(&root)?;

    let transport = HttpTransport::from_config(&config.ai)
        .with_context(|| format!("Cannot reach provider '{}'", config.ai.provider))?;
    let report = health_check(&transport, Duration::from_secs(config.ai.timeout_secs));

    match format {
        OutputFormat::Json => json::print(&report),
        OutputFormat::Terminal => {
            if report.ok {
                println!(
                    "  ✅ {} ({}) answered in {}ms",
                    config.ai.provider, report.model, report.latency_ms
                );
            } else {
                println!(
                    "  {} {} ({}) after {}ms: {}",
                    "❌".red(),
                    config.ai.provider,
                    report.model,
                    report.latency_ms,
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    Ok(if report.ok { 0 } else { 1 })
}
