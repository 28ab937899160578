use sitefix_core::style::{BracePlacement, IndentUnit, QuoteStyle, StyleCache};
use sitefix_core::{ProjectStyle, StyleInferencer};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_infers_tabs_next_line_double() {
    let source = "<?php\nclass A\n{\n\tpublic function run()\n\t{\n\t\techo \"hi\";\n\t}\n}\n";
    let style = StyleInferencer::new(200, 20).infer_source(source, None);

    assert_eq!(style.indent, IndentUnit::Tabs);
    assert_eq!(style.braces, BracePlacement::NextLine);
    assert_eq!(style.quotes, QuoteStyle::Double);
}

#[test]
fn test_infers_two_spaces_same_line_single() {
    let source = "<?php\nif ($a) {\n  foreach ($b as $c) {\n    echo 'x';\n  }\n}\n";
    let style = StyleInferencer::new(200, 20).infer_source(source, None);

    assert_eq!(style.indent, IndentUnit::Spaces(2));
    assert_eq!(style.braces, BracePlacement::SameLine);
    assert_eq!(style.quotes, QuoteStyle::Single);
}

#[test]
fn test_ties_prefer_recorded_then_default() {
    let inferencer = StyleInferencer::new(200, 20);
    // No indentation, no braces, one quote of each kind
    let source = "<?php\necho 'a' . \"b\";\n";

    assert_eq!(inferencer.infer_source(source, None), ProjectStyle::default());

    let recorded = ProjectStyle {
        indent: IndentUnit::Tabs,
        braces: BracePlacement::NextLine,
        quotes: QuoteStyle::Double,
    };
    assert_eq!(inferencer.infer_source(source, Some(&recorded)), recorded);
}

#[test]
fn test_sample_window_is_bounded() {
    // Only the first two non-blank lines are sampled
    let source = "<?php\necho 'a';\n\n\necho \"b\";\necho \"c\";\necho \"d\";\n";
    let style = StyleInferencer::new(2, 1).infer_source(source, None);
    assert_eq!(style.quotes, QuoteStyle::Single);
}

#[test]
fn test_empty_file_falls_back_to_project_style() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::write(
        root.join("a.php"),
        "<?php\nif ($x)\n{\n\techo \"1\";\n}\n",
    )
    .unwrap();
    fs::write(
        root.join("b.php"),
        "<?php\nwhile ($y)\n{\n\tprint \"2\";\n}\n",
    )
    .unwrap();
    let empty = root.join("empty.php");
    fs::write(&empty, "\n\n").unwrap();

    let cache = StyleCache::new(StyleInferencer::new(200, 20), root.to_path_buf(), None);
    let project = cache.project();
    assert_eq!(project.indent, IndentUnit::Tabs);
    assert_eq!(project.braces, BracePlacement::NextLine);

    assert_eq!(cache.for_file(&empty), project);
    assert_eq!(cache.for_file(&root.join("missing.php")), project);
}

#[test]
fn test_per_file_style_is_cached() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let file = root.join("x.php");
    fs::write(&file, "<?php\nif ($a) {\n  echo 'x';\n}\n").unwrap();

    let cache = StyleCache::new(StyleInferencer::new(200, 20), root.to_path_buf(), None);
    let first = cache.for_file(&file);
    assert_eq!(first.indent, IndentUnit::Spaces(2));

    // Later edits do not change the session's view of the file
    fs::write(&file, "<?php\nif ($a) {\n\techo \"x\";\n}\n").unwrap();
    assert_eq!(cache.for_file(&file), first);
}

#[test]
fn test_render_and_describe() {
    let style = ProjectStyle {
        indent: IndentUnit::Spaces(2),
        braces: BracePlacement::SameLine,
        quotes: QuoteStyle::Double,
    };
    assert_eq!(style.render("{{indent}}x = {{quote}}{{quote}};"), "  x = \"\";");
    assert_eq!(
        style.describe(),
        "indent with 2 spaces, opening braces on the same line, double-quoted strings"
    );
    assert_eq!(ProjectStyle::variants().len(), 6);
}

#[test]
fn test_mixed_indent_counts_increases_for_both_units() {
    // One tab block of many lines against three space nesting steps
    let source = "<?php\n\
                  function a()\n\
                  {\n\
                  \t$a = 1;\n\
                  \t$b = 2;\n\
                  \t$c = 3;\n\
                  \t$d = 4;\n\
                  \t$e = 5;\n\
                  }\n\
                  if ($x) {\n    one();\n}\n\
                  if ($y) {\n    two();\n}\n\
                  if ($z) {\n    three();\n}\n";
    let style = StyleInferencer::new(200, 20).infer_source(source, None);
    assert_eq!(style.indent, IndentUnit::Spaces(4));
}

#[test]
fn test_space_run_restarts_after_tab_line() {
    // The tab line ends the space run, so `z()` counts as a fresh increase
    let source = "<?php\nif ($a) {\n  x();\n\ty();\n  z();\n}\n";
    let recorded = ProjectStyle {
        indent: IndentUnit::Tabs,
        braces: BracePlacement::SameLine,
        quotes: QuoteStyle::Single,
    };
    let style = StyleInferencer::new(200, 20).infer_source(source, Some(&recorded));
    assert_eq!(style.indent, IndentUnit::Spaces(2));
}
