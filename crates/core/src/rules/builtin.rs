//! Built-in PHP 8 migration rules
//!
//! Merged ahead of user rules when `fix.builtin_rules` is enabled. Every rule
//! is self-checked like a user rule, so a broken edit here fails loading.

use crate::config::RuleConfig;

/// Method calls and definitions named like the guarded functions are skipped
const NOT_A_CALL: &str = r"(?:->|::|\bfunction\s)\s*";

pub fn builtin_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            id: "guard-superglobal-access".to_string(),
            match_message: r"undefined (?:array key|index)".to_string(),
            search: r#"\$_(?:GET|POST|REQUEST|COOKIE|SERVER|SESSION|FILES)\[\s*(?:'[^'\n]*'|"[^"\n]*")\s*\]"#
                .to_string(),
            replace: "($0 ?? null)".to_string(),
            skip_if_preceded_by: Some(
                r"\b(?:isset|empty|unset)\s*\([^()]*|&\s*|\{\s*".to_string(),
            ),
            skip_if_followed_by: Some(
                r"\s*(?:\?\?|\+\+|--|[-+*/.%|&^]?=[^=>]|\[|->)".to_string(),
            ),
            paths: Vec::new(),
            probe: Some(
                "<?php\necho $_GET['param'];\nif (isset($_POST['id'])) { $_SESSION['n'] = 1; }\n"
                    .to_string(),
            ),
            note: "Guard superglobal reads with ?? null (PHP 8 undefined array key)".to_string(),
        },
        RuleConfig {
            id: "guard-null-string-argument".to_string(),
            match_message: r"passing null to parameter #1 .* of type string is deprecated"
                .to_string(),
            search: r"\b(strlen|trim|ltrim|rtrim|strtolower|strtoupper|ucfirst|htmlspecialchars|htmlentities|urlencode|rawurlencode|addslashes|stripslashes|nl2br)\(\s*(\$[A-Za-z_][A-Za-z0-9_]*)\s*([,)])"
                .to_string(),
            replace: "$1($2 ?? {{quote}}{{quote}}$3".to_string(),
            skip_if_preceded_by: Some(NOT_A_CALL.to_string()),
            skip_if_followed_by: None,
            paths: Vec::new(),
            probe: Some(
                "<?php\necho strlen($name);\necho htmlspecialchars($title, ENT_QUOTES);\n"
                    .to_string(),
            ),
            note: "Coalesce possibly-null string arguments (PHP 8.1 deprecation)".to_string(),
        },
        RuleConfig {
            id: "guard-count-argument".to_string(),
            match_message: r"count\(\): (?:argument #1 .*must be of type countable|parameter must be an array or an object that implements countable)"
                .to_string(),
            search: r"\bcount\(\s*(\$[A-Za-z_][A-Za-z0-9_]*(?:->[A-Za-z_][A-Za-z0-9_]*)*)\s*\)"
                .to_string(),
            replace: "count($1 ?? [])".to_string(),
            skip_if_preceded_by: Some(NOT_A_CALL.to_string()),
            skip_if_followed_by: None,
            paths: Vec::new(),
            probe: Some(
                "<?php\nif (count($rows) > 0) {\n    echo count($this->items);\n}\n".to_string(),
            ),
            note: "Default uninitialised count() arguments to an empty array".to_string(),
        },
        RuleConfig {
            id: "curly-brace-offset".to_string(),
            match_message: r"array and string offset access syntax with curly braces".to_string(),
            search: r"(\$[A-Za-z_][A-Za-z0-9_]*)\{(\$?[A-Za-z0-9_]+)\}".to_string(),
            replace: "$1[$2]".to_string(),
            // An odd number of double quotes before the match on the same line
            // means the span sits inside an interpolated string.
            skip_if_preceded_by: Some(r#"(?:^|\n)[^"\n]*(?:"[^"\n]*"[^"\n]*)*"[^"\n]*"#.to_string()),
            skip_if_followed_by: None,
            paths: Vec::new(),
            probe: Some("<?php\n$first = $str{0};\n$c = $s{$i};\n".to_string()),
            note: "Replace removed curly-brace offset access with brackets".to_string(),
        },
    ]
}
