use sitefix_core::extractor::{locate, page_blocks};
use sitefix_core::{extract, ErrorKind, PageCheck, Severity};
use std::path::PathBuf;

fn page(body: &str, status: u16) -> PageCheck {
    PageCheck {
        url: "http://localhost/view.php".to_string(),
        body: body.to_string(),
        elements: Vec::new(),
        http_status: status,
    }
}

#[test]
fn test_undefined_array_key_is_medium_notice() {
    let check = page(
        r#"<html><body>Undefined array key "foo" in /app/view.php on line 12<br>Hello</body></html>"#,
        200,
    );
    let records = extract(&check);

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.kind, ErrorKind::Notice);
    assert_eq!(record.file, Some(PathBuf::from("/app/view.php")));
    assert_eq!(record.line, Some(12));
    assert_eq!(record.severity, Severity::Medium);
    assert_eq!(record.url, "http://localhost/view.php");
}

#[test]
fn test_html_formatted_php_warning() {
    let body = "<br />\n<b>Warning</b>:  Undefined variable $title in <b>/var/www/html/inc/header.php</b> on line <b>7</b><br />\n<h1>Site</h1>";
    let records = extract(&page(body, 200));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ErrorKind::Warning);
    assert_eq!(
        records[0].file,
        Some(PathBuf::from("/var/www/html/inc/header.php"))
    );
    assert_eq!(records[0].line, Some(7));
    assert_eq!(
        records[0].normalized_message(),
        "Undefined variable $title"
    );
}

#[test]
fn test_fatal_category_wins_over_warnings() {
    let body = "Warning: count(): Parameter must be an array in /app/a.php on line 3\n<br>\
                Fatal error: Uncaught Error: Call to undefined function mysql_connect() in /app/db.php:10";
    let records = extract(&page(body, 500));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ErrorKind::Fatal);
    assert_eq!(records[0].severity, Severity::Critical);
}

#[test]
fn test_weak_mentions_are_ignored() {
    // "warning" without a colon and without a location is prose, not an error
    let body = "<p>Please read the warning about cookies before continuing.</p>";
    let records = extract(&page(body, 200));
    assert!(records.is_empty());
}

#[test]
fn test_documentation_blocks_are_stripped() {
    let body = r#"<pre class="example">Warning: foo() expects parameter 1 in /docs/x.php on line 1</pre>
                  <script>console.log("Fatal error: nope")</script>
                  <p>All good</p>"#;
    assert!(extract(&page(body, 200)).is_empty());
}

#[test]
fn test_elements_are_preferred_over_body() {
    let mut check = page(
        "Warning: Something in /app/body.php on line 1",
        200,
    );
    check.elements = vec!["<div class=\"xdebug-error\">Deprecated: Function utf8_encode() is deprecated in /app/el.php on line 4</div>".to_string()];

    let records = extract(&check);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ErrorKind::Deprecated);
    assert_eq!(records[0].file, Some(PathBuf::from("/app/el.php")));
}

#[test]
fn test_body_scanned_when_elements_are_clean() {
    let mut check = page("Notice: Undefined index: id in /app/list.php on line 9", 200);
    check.elements = vec!["<div>Everything fine</div>".to_string()];

    let records = extract(&check);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file, Some(PathBuf::from("/app/list.php")));
}

#[test]
fn test_same_location_collapses() {
    let body = "Warning: Undefined variable $a in /app/x.php on line 5<br>\
                Warning: Undefined variable $a in /app/x.php on line 5<br>\
                Warning: Undefined variable $b in /app/x.php on line 6";
    let records = extract(&page(body, 200));
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].line, Some(5));
    assert_eq!(records[1].line, Some(6));
}

#[test]
fn test_http_record_without_text_detection() {
    let records = extract(&page("<h1>Not Found</h1>", 404));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ErrorKind::Http);
    assert_eq!(records[0].message, "HTTP 404");
    assert_eq!(records[0].severity, Severity::High);
    assert!(records[0].file.is_none());

    let records = extract(&page("", 503));
    assert_eq!(records[0].severity, Severity::Critical);

    assert!(extract(&page("<h1>OK</h1>", 200)).is_empty());
}

#[test]
fn test_malformed_input_is_empty_not_error() {
    let garbage = "<<<<>>>>\u{0}\u{fffd}</pre><pre class=\"docs\"";
    assert!(extract(&page(garbage, 200)).is_empty());
}

#[test]
fn test_locate_path_styles() {
    assert_eq!(
        locate("Warning: x in C:\\xampp\\htdocs\\index.php on line 20").unwrap(),
        Some((PathBuf::from("C:\\xampp\\htdocs\\index.php"), 20))
    );
    assert_eq!(
        locate("Notice: y in includes/menu.inc on line 3").unwrap(),
        Some((PathBuf::from("includes/menu.inc"), 3))
    );
    assert_eq!(locate("nothing here").unwrap(), None);
}

#[test]
fn test_page_blocks_decodes_entities() {
    let blocks = page_blocks("<p>Warning: &quot;x&quot; &amp; y</p><p>second</p>");
    assert_eq!(blocks, vec!["Warning: \"x\" & y".to_string(), "second".to_string()]);
}

#[test]
fn test_php8_uncaught_error_keeps_its_location() {
    // PHP 8 prints the stack trace on raw lines inside one <b>Fatal error</b> message
    let body = "<br />\n<b>Fatal error</b>:  Uncaught Error: Call to undefined function foo() in /app/x.php:3\nStack trace:\n#0 {main}\n  thrown in <b>/app/x.php</b> on line <b>3</b><br />";
    let records = extract(&page(body, 500));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ErrorKind::Fatal);
    assert_eq!(records[0].severity, Severity::Critical);
    assert_eq!(records[0].file, Some(PathBuf::from("/app/x.php")));
    assert_eq!(records[0].line, Some(3));
    assert!(records[0].message.contains("thrown in /app/x.php on line 3"));
}

#[test]
fn test_html_block_spans_raw_newlines() {
    let blocks = page_blocks("<b>Warning</b>: a\nb\r\nc<br />next</p>");
    assert_eq!(blocks, vec!["Warning: a b c".to_string(), "next".to_string()]);

    // Plain text still splits per line
    let blocks = page_blocks("one\ntwo");
    assert_eq!(blocks, vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn test_locate_colon_line_form() {
    assert_eq!(
        locate("Uncaught Error: boom in /srv/site/lib/db.php:42").unwrap(),
        Some((PathBuf::from("/srv/site/lib/db.php"), 42))
    );
    assert_eq!(
        locate("thrown in C:\\www\\index.php:7").unwrap(),
        Some((PathBuf::from("C:\\www\\index.php"), 7))
    );
}

#[test]
fn test_session_save_path_is_a_warning() {
    let body = "<div>session_save_path(): Session save path cannot be changed when a session is active</div>";
    let records = extract(&page(body, 200));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, ErrorKind::Warning);
    assert!(records[0].file.is_none());
}
