use super::*;
use pretty_assertions::assert_eq;

#[test]
fn as_str_round_trips_for_every_code() {
    for code in ErrorCode::ALL {
        assert_eq!(ErrorCode::from_str_code(code.as_str()), Some(*code));
    }
}

#[test]
fn phase_ranges() {
    assert!(ErrorCode::E0002.is_lexer_error());
    assert!(ErrorCode::E1003.is_parser_error());
    assert!(ErrorCode::E2013.is_type_error());
    assert!(ErrorCode::E3001.is_codegen_error());
    assert!(ErrorCode::E9001.is_internal_error());
    assert!(ErrorCode::W2001.is_warning());
    assert!(!ErrorCode::W2001.is_type_error());
}

#[test]
fn unknown_code_is_none() {
    assert_eq!(ErrorCode::from_str_code("E7777"), None);
}

#[test]
fn display_matches_as_str() {
    assert_eq!(ErrorCode::E2004.to_string(), "E2004");
    assert_eq!(ErrorCode::E2004.description(), "wrong number of arguments");
}
