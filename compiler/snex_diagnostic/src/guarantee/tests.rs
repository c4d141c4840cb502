#![allow(clippy::unwrap_used)]

use super::*;
use crate::{Diagnostic, ErrorCode};

#[test]
fn from_error_count_returns_some_for_nonzero() {
    assert!(ErrorGuaranteed::from_error_count(1).is_some());
    assert!(ErrorGuaranteed::from_error_count(100).is_some());
}

#[test]
fn from_error_count_returns_none_for_zero() {
    assert!(ErrorGuaranteed::from_error_count(0).is_none());
}

#[test]
fn warnings_alone_do_not_guarantee_an_error() {
    let warnings = vec![Diagnostic::warning(ErrorCode::W2002).with_message("unused")];
    assert!(ErrorGuaranteed::from_diagnostics(&warnings).is_none());

    let mixed = vec![
        Diagnostic::warning(ErrorCode::W2002),
        Diagnostic::error(ErrorCode::E2001),
    ];
    assert!(ErrorGuaranteed::from_diagnostics(&mixed).is_some());
}

#[test]
fn display_shows_error_message() {
    let g = ErrorGuaranteed::from_error_count(1).unwrap();
    assert_eq!(g.to_string(), "error(s) emitted");
}
