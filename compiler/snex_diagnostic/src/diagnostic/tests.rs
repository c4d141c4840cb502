use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_builder_and_primary_span() {
    let diag = Diagnostic::error(ErrorCode::E2001)
        .with_message("bad")
        .with_secondary_label(Span::new(0, 1), "context")
        .with_label(Span::new(4, 6), "here");
    assert_eq!(diag.primary_span(), Some(Span::new(4, 6)));
    assert!(diag.is_error());
}

#[test]
fn test_display() {
    let diag = unknown_identifier(Span::new(7, 19), "undefinedVar").with_note("declare it");
    assert_eq!(
        diag.to_string(),
        "error [E2003]: use of undeclared identifier `undefinedVar`\n  \
         --> 7..19: not found in this scope\n  = note: declare it"
    );
}

#[test]
fn test_shift_spans() {
    let mut diag = Diagnostic::warning(ErrorCode::W2001).with_label(Span::new(40, 45), "x");
    diag.shift_spans(30);
    assert_eq!(diag.primary_span(), Some(Span::new(10, 15)));
}
