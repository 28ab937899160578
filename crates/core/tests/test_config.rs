use sitefix_core::config::CONFIG_FILE;
use sitefix_core::style::{BracePlacement, IndentUnit, QuoteStyle};
use sitefix_core::SitefixConfig;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let config = SitefixConfig::default();
    assert!(config.fix.builtin_rules);
    assert_eq!(config.fix.backup_dir, PathBuf::from(".sitefix-cache/backups"));
    assert!(!config.ai.enabled);
    assert_eq!(config.ai.max_attempts, 20);
    assert_eq!(config.ai.retries, 2);
    assert_eq!(config.ai.max_line_ratio, 3);
    assert_eq!(config.style.sample_lines, 200);
    assert_eq!(config.syntax.checker, "tree-sitter");
    assert!(config.rules.is_empty());
    assert!(config.style.recorded_style().unwrap().is_none());
}

#[test]
fn test_parse_full_file() {
    let toml = r#"
[fix]
builtin_rules = false

[ai]
enabled = true
provider = "ollama"
model = "qwen2.5-coder"
max_attempts = 5
timeout_secs = 10

[style]
indent = "tabs"
quotes = "double"

[syntax]
checker = "php-lint"

[[paths.map]]
from = "/var/www/html"
to = "."

[[rules]]
id = "mysql-to-mysqli"
match = "call to undefined function mysql_"
search = '\bmysql_(query|fetch_assoc)\('
replace = "mysqli_$1("
probe = "mysql_query($sql);"
paths = ["*.php"]
note = "Legacy ext/mysql calls"
"#;
    let config: SitefixConfig = toml::from_str(toml).unwrap();

    assert!(!config.fix.builtin_rules);
    assert!(config.ai.enabled);
    assert_eq!(config.ai.provider, "ollama");
    assert_eq!(config.ai.max_attempts, 5);
    // Unset fields keep their defaults
    assert_eq!(config.ai.retries, 2);
    assert_eq!(config.syntax.checker, "php-lint");
    assert_eq!(config.paths.map.len(), 1);
    assert_eq!(config.paths.map[0].from, "/var/www/html");

    let style = config.style.recorded_style().unwrap().unwrap();
    assert_eq!(style.indent, IndentUnit::Tabs);
    assert_eq!(style.quotes, QuoteStyle::Double);
    assert_eq!(style.braces, BracePlacement::SameLine);

    assert_eq!(config.rules.len(), 1);
    assert_eq!(config.rules[0].match_message, "call to undefined function mysql_");
    assert_eq!(config.rules[0].paths, vec!["*.php".to_string()]);

    // Built-ins disabled: only the user rule is effective
    let effective = config.effective_rules();
    assert_eq!(effective.len(), 1);
    assert_eq!(effective[0].id, "mysql-to-mysqli");
}

#[test]
fn test_effective_rules_put_builtins_first() {
    let mut config = SitefixConfig::default();
    config.rules.push(sitefix_core::RuleConfig {
        id: "user-rule".to_string(),
        match_message: "x".to_string(),
        search: "x".to_string(),
        replace: "y".to_string(),
        skip_if_preceded_by: None,
        skip_if_followed_by: None,
        paths: Vec::new(),
        probe: Some("x".to_string()),
        note: String::new(),
    });
    let effective = config.effective_rules();
    assert_eq!(effective.len(), 5);
    assert_eq!(effective[0].id, "guard-superglobal-access");
    assert_eq!(effective[4].id, "user-rule");
}

#[test]
fn test_invalid_indent_is_an_error() {
    let config: SitefixConfig = toml::from_str("[style]\nindent = \"wide\"\n").unwrap();
    assert!(config.style.recorded_style().is_err());

    let config: SitefixConfig = toml::from_str("[style]\nindent = \"2\"\n").unwrap();
    assert_eq!(
        config.style.recorded_style().unwrap().unwrap().indent,
        IndentUnit::Spaces(2)
    );
}

#[test]
fn test_find_and_load_walks_ancestors() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let nested = root.join("site/inc");
    fs::create_dir_all(&nested).unwrap();
    fs::write(root.join(CONFIG_FILE), "[ai]\nmax_attempts = 3\n").unwrap();

    let config = SitefixConfig::find_and_load(&nested).unwrap();
    assert_eq!(config.ai.max_attempts, 3);
}

#[test]
fn test_save_and_reload() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(CONFIG_FILE);

    let mut config = SitefixConfig::default();
    config.ai.model = "claude-haiku".to_string();
    config.save(&path).unwrap();

    let loaded = SitefixConfig::from_file(&path).unwrap();
    assert_eq!(loaded.ai.model, "claude-haiku");
    assert!(loaded.fix.builtin_rules);
}

#[test]
fn test_parse_error_has_context() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(CONFIG_FILE);
    fs::write(&path, "[ai\nenabled = ").unwrap();

    let err = SitefixConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));
}
