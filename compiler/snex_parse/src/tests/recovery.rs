use pretty_assertions::assert_eq;
use snex_diagnostic::ErrorCode;
use snex_ir::{ItemKind, StringInterner};

use crate::parse;

fn codes(source: &str) -> Vec<ErrorCode> {
    let mut interner = StringInterner::new();
    parse(source, "bad.snex", &mut interner)
        .diagnostics
        .into_iter()
        .map(|d| d.code)
        .collect()
}

#[test]
fn missing_semicolon_reports_and_continues() {
    let mut interner = StringInterner::new();
    let out = parse(
        "int f() { int a = 1 int b = 2; return a; }\nint g() { return 3; }",
        "bad.snex",
        &mut interner,
    );
    assert_eq!(
        out.diagnostics.iter().map(|d| d.code).collect::<Vec<_>>(),
        vec![ErrorCode::E1001]
    );
    // Both functions survive.
    assert_eq!(out.module.items.len(), 2);
    assert!(out.has_errors());
}

#[test]
fn several_errors_in_one_pass() {
    assert_eq!(
        codes("int f() { int = 3; return +; }\nint g() { x = ; }"),
        vec![ErrorCode::E1004, ErrorCode::E1002, ErrorCode::E1002]
    );
}

#[test]
fn unclosed_brace_at_eof() {
    assert_eq!(codes("int f() { return 1;"), vec![ErrorCode::E1003]);
}

#[test]
fn missing_body_is_e1007() {
    assert_eq!(codes("int f(int a);"), vec![ErrorCode::E1007]);
}

#[test]
fn statement_at_top_level_is_e1006() {
    let mut interner = StringInterner::new();
    let out = parse("return 1;\nint ok() { return 1; }", "bad.snex", &mut interner);
    assert_eq!(out.diagnostics[0].code, ErrorCode::E1006);
    assert!(out
        .module
        .items
        .iter()
        .any(|i| matches!(i.kind, ItemKind::Function(_))));
}

#[test]
fn lexer_errors_are_not_repeated_by_the_parser() {
    assert_eq!(codes("int f() { return 1 @ 2; }"), vec![ErrorCode::E0002, ErrorCode::E1001]);
}

#[test]
fn deep_nesting_does_not_overflow() {
    let depth = 5_000;
    let source = format!(
        "int f() {{ return {}1{}; }}",
        "(".repeat(depth),
        ")".repeat(depth)
    );
    assert!(codes(&source).is_empty());
}
