#![allow(clippy::unwrap_used)]

use super::*;
use crate::ErrorCode;
use pretty_assertions::assert_eq;
use snex_ir::Span;

#[test]
fn renders_location_snippet_and_caret() {
    let source = "int f() {\n    return x;\n}\n";
    let start = source.find('x').unwrap() as u32;
    let diag = crate::unknown_identifier(Span::new(start, start + 1), "x");
    let out = render_plain("voice.snex", source, &[diag]);
    let expected = concat!(
        "error[E2003]: use of undeclared identifier `x`\n",
        "  --> voice.snex:2:12\n",
        "  |\n",
        "2 |     return x;\n",
        "  |            ^ not found in this scope\n",
        "\n",
    );
    assert_eq!(out, expected);
}

#[test]
fn gutter_widens_with_the_line_number() {
    let source: String = (1..=12).map(|i| format!("int x{i} = {i};\n")).collect();
    let start = source.find("x12").unwrap() as u32;
    let diag = crate::unknown_identifier(Span::new(start, start + 3), "x12");
    let out = render_plain("wide.snex", &source, &[diag]);
    assert!(out.contains("\n   |\n12 | int x12 = 12;\n   |     ^^^ "), "{out}");
}

#[test]
fn summary_pluralizes() {
    let mut emitter = TerminalEmitter::new(Vec::new(), ColorMode::Never, false, "a", "");
    emitter.emit_summary(2, 1);
    let out = String::from_utf8(emitter.into_inner()).unwrap();
    assert_eq!(out, "error: aborting due to 2 errors; 1 warning emitted\n");
}

#[test]
fn diagnostics_without_labels_render_header_only() {
    let diag = Diagnostic::error(ErrorCode::E9002).with_message("internal");
    let out = render_plain("a", "", &[diag]);
    assert_eq!(out, "error[E9002]: internal\n\n");
}
