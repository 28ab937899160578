use proptest::prelude::*;
use sitefix_core::rules::builtin::builtin_rules;
use sitefix_core::style::{IndentUnit, QuoteStyle};
use sitefix_core::{ProjectStyle, RuleConfig, RuleOutcome, RuleSet, RuleValidationError};
use std::path::Path;

fn rule(id: &str, search: &str, replace: &str, probe: &str) -> RuleConfig {
    RuleConfig {
        id: id.to_string(),
        match_message: "undefined".to_string(),
        search: search.to_string(),
        replace: replace.to_string(),
        skip_if_preceded_by: None,
        skip_if_followed_by: None,
        paths: Vec::new(),
        probe: Some(probe.to_string()),
        note: String::new(),
    }
}

fn builtin_set() -> RuleSet {
    RuleSet::load(&builtin_rules()).expect("built-in rules should validate")
}

fn changed(outcome: RuleOutcome) -> String {
    match outcome {
        RuleOutcome::Changed { content, .. } => content,
        other => panic!("expected a change, got {:?}", other),
    }
}

#[test]
fn test_superglobal_guard_applies_once() {
    let set = builtin_set();
    let rule = set.get("guard-superglobal-access").unwrap();
    let style = ProjectStyle::default();

    let first = changed(rule.apply("<?php\necho $_GET['param'];\n", &style));
    assert_eq!(first, "<?php\necho ($_GET['param'] ?? null);\n");

    assert!(!matches!(
        rule.apply(&first, &style),
        RuleOutcome::Changed { .. }
    ));
}

#[test]
fn test_superglobal_guard_filters() {
    let set = builtin_set();
    let rule = set.get("guard-superglobal-access").unwrap();
    let style = ProjectStyle::default();

    let guarded = "<?php\nif (isset($_GET['a'])) {}\n$_POST['b'] = 1;\n$x = $_GET['c'] ?? 0;\n$_SESSION['n']++;\n";
    assert_eq!(rule.apply(guarded, &style), RuleOutcome::NoMatch);

    // Only the bare read is rewritten
    let mixed = "<?php\n$_POST['b'] = 1;\n$id = $_REQUEST[\"id\"];\n";
    assert_eq!(
        changed(rule.apply(mixed, &style)),
        "<?php\n$_POST['b'] = 1;\n$id = ($_REQUEST[\"id\"] ?? null);\n"
    );
}

#[test]
fn test_null_string_guard_follows_quote_style() {
    let set = builtin_set();
    let rule = set.get("guard-null-string-argument").unwrap();
    let source = "<?php\necho trim($name);\n$this->trim($raw);\n";

    let single = ProjectStyle::default();
    assert_eq!(
        changed(rule.apply(source, &single)),
        "<?php\necho trim($name ?? '');\n$this->trim($raw);\n"
    );

    let double = ProjectStyle {
        quotes: QuoteStyle::Double,
        ..ProjectStyle::default()
    };
    assert_eq!(
        changed(rule.apply(source, &double)),
        "<?php\necho trim($name ?? \"\");\n$this->trim($raw);\n"
    );
}

#[test]
fn test_curly_offset_skips_interpolated_strings() {
    let set = builtin_set();
    let rule = set.get("curly-brace-offset").unwrap();
    let style = ProjectStyle::default();

    let source = "<?php\n$c = $s{0};\necho \"value: $s{0}\";\n";
    assert_eq!(
        changed(rule.apply(source, &style)),
        "<?php\n$c = $s[0];\necho \"value: $s{0}\";\n"
    );
}

#[test]
fn test_candidates_by_message_and_file() {
    let set = builtin_set();
    let ids: Vec<&str> = set
        .candidates("Undefined array key \"param\"", Path::new("/app/index.php"))
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(ids, vec!["guard-superglobal-access"]);

    assert_eq!(
        set.candidates("Call to undefined function mysql_query()", Path::new("a.php"))
            .count(),
        0
    );
}

#[test]
fn test_path_globs_restrict_files() {
    let mut config = rule("only-templates", r"\bvar\s", "public ", "<?php\nvar $x;\n");
    config.paths = vec!["*.tpl".to_string(), "*.phtml".to_string()];
    let set = RuleSet::load(&[config]).unwrap();
    let r = set.get("only-templates").unwrap();

    assert!(r.applies_to_file(Path::new("views/page.phtml")));
    assert!(!r.applies_to_file(Path::new("src/page.php")));
}

#[test]
fn test_style_token_rule_checked_under_every_variant() {
    let config = rule(
        "indent-echo",
        r"(?m)^echo (\$\w+);$",
        "if ($1) {\n{{indent}}echo $1;\n}",
        "<?php\necho $a;\n",
    );
    let set = RuleSet::load(&[config]).unwrap();
    let r = set.get("indent-echo").unwrap();

    let tabs = ProjectStyle {
        indent: IndentUnit::Tabs,
        ..ProjectStyle::default()
    };
    assert_eq!(
        changed(r.apply("<?php\necho $a;\n", &tabs)),
        "<?php\nif ($a) {\n\techo $a;\n}\n"
    );
}

#[test]
fn test_invalid_pattern_rejects_set() {
    let err = RuleSet::load(&[rule("broken", "(unclosed", "x", "probe")]).unwrap_err();
    assert_eq!(err.errors.len(), 1);
    assert!(matches!(
        err.errors[0],
        RuleValidationError::InvalidPattern { field: "search", .. }
    ));
}

#[test]
fn test_lookaround_is_rejected_at_load() {
    let err = RuleSet::load(&[rule("look", r"(?<!isset\()\$x", "y", "$x")]).unwrap_err();
    assert!(matches!(
        err.errors[0],
        RuleValidationError::InvalidPattern { .. }
    ));
}

#[test]
fn test_duplicate_and_empty_ids() {
    let configs = vec![
        rule("same", "a", "b", "a"),
        rule("same", "c", "d", "c"),
        rule("  ", "e", "f", "e"),
    ];
    let err = RuleSet::load(&configs).unwrap_err();
    assert_eq!(err.errors.len(), 2);
    assert!(err
        .errors
        .iter()
        .any(|e| matches!(e, RuleValidationError::DuplicateId(id) if id == "same")));
    assert!(err
        .errors
        .iter()
        .any(|e| matches!(e, RuleValidationError::EmptyId { index: 2 })));
}

#[test]
fn test_probe_requirements() {
    let mut missing = rule("no-probe", "a", "b", "");
    missing.probe = None;
    let err = RuleSet::load(&[missing]).unwrap_err();
    assert!(matches!(err.errors[0], RuleValidationError::MissingProbe(_)));

    let err = RuleSet::load(&[rule("no-change", "zzz", "y", "abc")]).unwrap_err();
    assert!(matches!(err.errors[0], RuleValidationError::ProbeUnchanged(_)));

    let err = RuleSet::load(&[rule("grows", "a", "aa", "a")]).unwrap_err();
    assert!(matches!(
        err.errors[0],
        RuleValidationError::NotIdempotent { .. }
    ));
}

#[test]
fn test_all_failures_reported_together() {
    let configs = vec![
        rule("ok", "foo", "bar", "foo"),
        rule("bad-regex", "[", "x", "x"),
        rule("grows", "a", "aa", "a"),
    ];
    let err = RuleSet::load(&configs).unwrap_err();
    assert_eq!(err.errors.len(), 2);
    assert!(err.to_string().starts_with("rule set failed to load"));
}

const FRAGMENTS: &[&str] = &[
    "<?php\n",
    "\n",
    " ",
    "echo ",
    ";",
    "(",
    ")",
    "{",
    "}",
    "\"",
    "'",
    " = ",
    " . ",
    "$_GET['a']",
    "$_POST[\"b\"]",
    "isset($_GET['c'])",
    "&$_SESSION['d']",
    "strlen($name)",
    "trim($s, 'x')",
    "->trim($t)",
    "function strlen($u)",
    "count($rows)",
    "count($this->items)",
    "$str{0}",
    "$s{$i}",
    "\"$q{1}\"",
];

fn php_source() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..24).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn prop_builtin_rules_are_idempotent(source in php_source()) {
        let set = builtin_set();
        for rule in set.rules() {
            for style in ProjectStyle::variants() {
                if let RuleOutcome::Changed { content, .. } = rule.apply(&source, &style) {
                    let again = rule.apply(&content, &style);
                    prop_assert!(
                        !matches!(again, RuleOutcome::Changed { .. }),
                        "rule {} changed its own output: {:?}",
                        rule.id,
                        content
                    );
                }
            }
        }
    }

    #[test]
    fn prop_no_match_means_no_change(source in php_source()) {
        let set = builtin_set();
        for rule in set.rules() {
            if let RuleOutcome::Changed { content, .. } = rule.apply(&source, &ProjectStyle::default()) {
                prop_assert_ne!(content, source.clone());
            }
        }
    }
}
