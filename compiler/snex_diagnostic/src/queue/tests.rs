use super::*;
use pretty_assertions::assert_eq;

const SOURCE: &str = "int a;\nint b;\nint c;\n";

fn err(code: ErrorCode, start: u32, msg: &str) -> Diagnostic {
    Diagnostic::error(code)
        .with_message(msg)
        .with_label(Span::new(start, start + 1), "here")
}

#[test]
fn flush_sorts_by_position() {
    let mut queue = DiagnosticQueue::with_config(SOURCE, DiagnosticConfig::unlimited());
    queue.add(SOURCE, err(ErrorCode::E2003, 14, "third"));
    queue.add(SOURCE, err(ErrorCode::E2003, 0, "first"));
    queue.add(SOURCE, err(ErrorCode::E2003, 7, "second"));
    let messages: Vec<_> = queue.flush().into_iter().map(|d| d.message).collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
    assert!(queue.has_errors().is_none());
}

#[test]
fn syntax_errors_on_one_line_are_deduplicated() {
    let mut queue = DiagnosticQueue::new(SOURCE);
    assert!(queue.add(SOURCE, err(ErrorCode::E1001, 1, "a")));
    assert!(!queue.add(SOURCE, err(ErrorCode::E1002, 3, "b")));
    assert!(queue.add(SOURCE, err(ErrorCode::E1001, 8, "c")));
    assert_eq!(queue.error_count(), 2);
    assert_eq!(queue.suppressed_count(), 1);
}

#[test]
fn follow_on_errors_are_filtered() {
    let mut queue = DiagnosticQueue::new(SOURCE);
    assert!(!queue.add(SOURCE, err(ErrorCode::E2001, 0, "expected `int`, found `<error>`")));
    assert!(queue.has_errors().is_none());
}

#[test]
fn error_limit_appends_one_abort_diagnostic() {
    let config = DiagnosticConfig {
        error_limit: 2,
        ..DiagnosticConfig::unlimited()
    };
    let mut queue = DiagnosticQueue::with_config(SOURCE, config);
    for (i, start) in [0u32, 7, 14, 15].into_iter().enumerate() {
        queue.add(SOURCE, err(ErrorCode::E2003, start, &format!("e{i}")));
    }
    let codes: Vec<_> = queue.flush().into_iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E2003, ErrorCode::E2003, ErrorCode::E9002]);
}

#[test]
fn warnings_are_counted_separately() {
    let mut queue = DiagnosticQueue::new(SOURCE);
    queue.add(SOURCE, Diagnostic::warning(ErrorCode::W2002).with_message("unused"));
    assert_eq!(queue.warning_count(), 1);
    assert!(queue.has_errors().is_none());
}

#[test]
fn fatal_errors_bypass_the_limit() {
    let config = DiagnosticConfig {
        error_limit: 1,
        ..DiagnosticConfig::unlimited()
    };
    let mut queue = DiagnosticQueue::with_config(SOURCE, config);
    queue.add(SOURCE, err(ErrorCode::E2003, 0, "first"));
    queue.add_fatal(SOURCE, Diagnostic::error(ErrorCode::E3001).with_message("backend failed"));
    let codes: Vec<_> = queue.flush().into_iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E2003, ErrorCode::E3001]);
}
