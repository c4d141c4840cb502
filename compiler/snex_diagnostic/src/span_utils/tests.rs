#![allow(clippy::unwrap_used)]

use super::*;
use crate::ErrorCode;
use pretty_assertions::assert_eq;

#[test]
fn test_line_offset_table_multiple_lines() {
    let source = "line1\nline2\nline3";
    let table = LineOffsetTable::build(source);
    assert_eq!(table.line_count(), 3);
    assert_eq!(table.line_start_offset(2), Some(6));
    assert_eq!(table.line_start_offset(4), None);
    assert_eq!(table.line_from_offset(5), 1);
    assert_eq!(table.line_from_offset(6), 2);
}

#[test]
fn test_offset_to_line_col() {
    let source = "abc\ndefgh\nij";
    let table = LineOffsetTable::build(source);
    assert_eq!(table.offset_to_line_col(source, 0), (1, 1));
    assert_eq!(table.offset_to_line_col(source, 7), (2, 4));
    assert_eq!(table.offset_to_line_col(source, 10), (3, 1));
}

#[test]
fn test_offset_past_end_is_clamped() {
    let source = "ab";
    let table = LineOffsetTable::build(source);
    assert_eq!(table.offset_to_line_col(source, 40), (1, 3));
}

#[test]
fn test_unicode_columns_count_chars() {
    let source = "αβγ\nδε";
    let table = LineOffsetTable::build(source);
    assert_eq!(table.offset_to_line_col(source, 4), (1, 3));
    assert_eq!(table.offset_to_line_col(source, 7), (2, 1));
}

#[test]
fn test_line_text() {
    let source = "first\r\nsecond\nthird";
    let table = LineOffsetTable::build(source);
    assert_eq!(table.line_text(source, 1), Some("first"));
    assert_eq!(table.line_text(source, 2), Some("second"));
    assert_eq!(table.line_text(source, 3), Some("third"));
    assert_eq!(table.line_text(source, 4), None);
}

#[test]
fn test_located_diagnostic_points_at_line_three() {
    let source = "int f() {\n  int x = 1;\n  return undefinedVar;\n}\n";
    let start = source.find("undefinedVar").unwrap() as u32;
    let diag = crate::unknown_identifier(Span::new(start, start + 12), "undefinedVar");
    let file: Arc<str> = Arc::from("unit.snex");
    let located = LocatedDiagnostic::resolve_all([diag], &file, source);
    assert_eq!(located[0].location.line, 3);
    assert_eq!(located[0].location.column, 10);
    assert_eq!(located[0].diagnostic.code, ErrorCode::E2003);
    assert_eq!(
        located[0].to_string(),
        "unit.snex:3:10: error [E2003]: use of undeclared identifier `undefinedVar`"
    );
}
