use sitefix_core::{classify, ErrorKind, Severity};

#[test]
fn test_fatal_on_500_is_critical() {
    assert_eq!(
        classify(
            ErrorKind::Fatal,
            "Fatal error: Uncaught TypeError: count(): Argument #1 must be of type Countable",
            500
        ),
        Severity::Critical
    );
    // Status alone is enough
    assert_eq!(
        classify(ErrorKind::Warning, "Warning: something", 502),
        Severity::Critical
    );
}

#[test]
fn test_missing_class_is_critical() {
    assert_eq!(
        classify(ErrorKind::Notice, "Class \"App\\Mailer\" not found", 200),
        Severity::Critical
    );
}

#[test]
fn test_high_tier() {
    assert_eq!(
        classify(
            ErrorKind::Warning,
            "Call to undefined function each()",
            200
        ),
        Severity::High
    );
    assert_eq!(
        classify(ErrorKind::Parse, "syntax error, unexpected token \"{\"", 200),
        Severity::High
    );
    assert_eq!(classify(ErrorKind::Http, "HTTP 404", 404), Severity::High);
}

#[test]
fn test_medium_tier_precedes_warning_kind() {
    // A PHP 8 warning about an undefined key is Medium, not Low
    assert_eq!(
        classify(ErrorKind::Warning, "Warning: Undefined array key \"id\"", 200),
        Severity::Medium
    );
    assert_eq!(
        classify(
            ErrorKind::Deprecated,
            "Deprecated: strlen(): Passing null to parameter #1",
            200
        ),
        Severity::Medium
    );
}

#[test]
fn test_low_tier() {
    assert_eq!(
        classify(ErrorKind::Warning, "Warning: file_get_contents(x): Failed to open stream", 200),
        Severity::Low
    );
    assert_eq!(
        classify(ErrorKind::Notice, "Strict Standards: Only variables should be passed", 200),
        Severity::Low
    );
}

#[test]
fn test_defaults_without_textual_match() {
    assert_eq!(classify(ErrorKind::Http, "HTTP 403", 403), Severity::Medium);
    assert_eq!(classify(ErrorKind::Notice, "Notice: something odd", 200), Severity::Medium);
}

#[test]
fn test_classification_is_deterministic() {
    let inputs = [
        (ErrorKind::Fatal, "Fatal error: x", 500u16),
        (ErrorKind::Notice, "Undefined variable $a", 200),
        (ErrorKind::Warning, "Warning: y", 200),
        (ErrorKind::Http, "HTTP 404", 404),
    ];
    for (kind, message, status) in inputs {
        let first = classify(kind, message, status);
        for _ in 0..10 {
            assert_eq!(classify(kind, message, status), first);
        }
    }
}

#[test]
fn test_severity_ordering() {
    assert!(Severity::Critical > Severity::High);
    assert!(Severity::High > Severity::Medium);
    assert!(Severity::Medium > Severity::Low);
}
