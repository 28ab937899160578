use sitefix_cli::commands::fix::exit_code;
use sitefix_cli::output::{json, terminal};
use sitefix_cli::run_log;
use sitefix_core::{FixSession, PageCheck, SessionReport, SitefixConfig, TreeSitterPhp};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn page(body: &str) -> PageCheck {
    PageCheck {
        url: "http://localhost/".to_string(),
        body: body.to_string(),
        elements: Vec::new(),
        http_status: 200,
    }
}

/// One applied fix, one failure on a missing file, one unlocated record
fn report(root: &Path) -> SessionReport {
    fs::write(root.join("list.php"), "<?php\n$n = count($rows);\n").unwrap();
    let checks = vec![
        page("Fatal error: Uncaught TypeError: count(): Argument #1 ($value) must be of type Countable|array, null given in /list.php on line 2"),
        page("Warning: Undefined variable $x in /gone.php on line 3"),
        page("Notice: Undefined index: id"),
    ];
    let session = FixSession::with_validator(
        &SitefixConfig::default(),
        root,
        "out-1",
        Box::new(TreeSitterPhp::new()),
    )
    .unwrap();
    session.process_checks(&checks)
}

#[test]
fn test_fix_output_summary() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let report = report(root);
    let out = json::fix_output(&report, root);

    assert_eq!(out.session, "out-1");
    assert_eq!(out.summary.records, 3);
    assert_eq!(out.summary.applied, 1);
    assert_eq!(out.summary.failed, 1);
    assert_eq!(out.summary.unresolved, 1);

    let applied = &out.attempts[0];
    assert_eq!(applied.file, "list.php");
    assert_eq!(applied.remedy, "rule:guard-count-argument");
    assert_eq!(applied.outcome, "applied");
    assert_eq!(applied.backup.as_deref(), Some(".sitefix-cache/backups/out-1/list.php"));
    assert!(applied.diff.as_deref().unwrap().contains("+$n = count($rows ?? []);"));

    let failed = &out.attempts[1];
    assert_eq!(failed.outcome, "failed");
    assert_eq!(failed.reason.as_deref(), Some("file_not_found"));

    // Serialized form omits empty optionals
    let text = serde_json::to_string(&failed).unwrap();
    assert!(!text.contains("\"diff\""));
}

#[test]
fn test_exit_code_follows_flag() {
    let tmp = TempDir::new().unwrap();
    let report = report(tmp.path());
    assert!(report.has_failures());
    assert_eq!(exit_code(&report, false), 0);
    assert_eq!(exit_code(&report, true), 1);
}

#[test]
fn test_run_log_roundtrip_on_disk() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let report = report(root);

    let log = run_log::build_run_log(&report, root, 0.5, 0);
    let path = run_log::save_run_log(root, &log).unwrap();
    assert_eq!(path, root.join(run_log::RUNS_DIR).join("out-1.json"));

    let loaded = run_log::load_run_log(root, "out-1").unwrap();
    assert_eq!(loaded.summary.applied, 1);
    assert_eq!(loaded.summary.unresolved, 1);
    assert_eq!(loaded.backups, vec!["list.php".to_string()]);
    assert_eq!(
        loaded.attempts[0].transitions,
        vec!["new -> rule_attempted", "rule_attempted -> applied"]
    );
    assert_eq!(loaded.attempts[0].signature, report.attempts[0].record.signature());
}

#[test]
fn test_list_runs_skips_foreign_files() {
    let tmp = TempDir::new().unwrap();
    let runs = tmp.path().join(run_log::RUNS_DIR);
    fs::create_dir_all(&runs).unwrap();
    fs::write(runs.join("notes.txt"), "x").unwrap();
    fs::write(runs.join("broken.json"), "{").unwrap();

    assert!(run_log::list_runs(tmp.path()).unwrap().is_empty());
}

#[test]
fn test_terminal_formatting() {
    colored::control::set_override(false);

    assert_eq!(
        terminal::format_record("critical", "boom", Some(("a.php", Some(3)))),
        "  ❌ boom a.php:3"
    );
    assert_eq!(terminal::format_record("low", "hm", None), "  ℹ️  hm");

    let diff = terminal::format_diff("--- a/x.php\n+++ b/x.php\n@@ -1 +1 @@\n-a\n+b");
    assert_eq!(
        diff,
        "      --- a/x.php\n      +++ b/x.php\n      @@ -1 +1 @@\n      -a\n      +b"
    );
}
