//! Initialize .sitefix.toml configuration

use anyhow::Result;
use sitefix_core::config::CONFIG_FILE;
use sitefix_core::SitefixConfig;
use std::path::Path;

pub fn run(path: Option<&Path>) -> Result<i32> {
    let target_path = path.unwrap_or_else(|| Path::new("."));
    let config_path = target_path.join(CONFIG_FILE);

    if config_path.exists() {
        println!("⚠️  {} already exists at {:?}", CONFIG_FILE, config_path);
        return Ok(0);
    }

    SitefixConfig::default().save(&config_path)?;

    println!("✅ Created {} at {:?}", CONFIG_FILE, config_path);
    println!("\nAdd [[rules]] or path mappings, then run:");
    println!("  sitefix fix --checks checks.json");

    Ok(0)
}
