//! Error codes for all compiler diagnostics.
//!
//! Each error code is a unique identifier (e.g., `E1001`) with the first digit
//! indicating the compiler phase.

use std::fmt;

/// Error codes for all compiler diagnostics.
///
/// Format: E#### where first digit indicates phase:
/// - E0xxx: Lexer errors
/// - E1xxx: Parser errors
/// - E2xxx: Name, type and template errors
/// - E3xxx: Code generation errors
/// - E9xxx: Internal compiler errors
/// - W2xxx: Warnings raised by semantic analysis
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum ErrorCode {
    // Lexer Errors (E0xxx)
    /// Unterminated block comment
    E0001,
    /// Invalid character in source
    E0002,
    /// Invalid number literal
    E0003,

    // Parser Errors (E1xxx)
    /// Unexpected token
    E1001,
    /// Expected expression
    E1002,
    /// Unclosed delimiter
    E1003,
    /// Expected identifier
    E1004,
    /// Expected type
    E1005,
    /// Invalid item at unit or namespace level
    E1006,
    /// Missing function body
    E1007,

    // Name / Type Errors (E2xxx)
    /// Type mismatch
    E2001,
    /// Unknown type name
    E2002,
    /// Unknown identifier
    E2003,
    /// Argument count mismatch
    E2004,
    /// Cannot infer type of `auto` declaration
    E2005,
    /// Duplicate definition in the same scope
    E2006,
    /// Ambiguous name (overloads or imports)
    E2007,
    /// Invalid operand or callee
    E2008,
    /// Invalid assignment target
    E2009,
    /// Missing return in non-void function
    E2010,
    /// `break`/`continue` outside of a loop
    E2011,
    /// Struct contains itself by value
    E2012,
    /// Error raised inside a template instantiation
    E2013,
    /// Expression is not a compile-time constant
    E2014,
    /// No such member
    E2015,
    /// Template argument kind mismatch
    E2016,
    /// Template argument count mismatch
    E2017,

    // Codegen Errors (E3xxx)
    /// Backend failed to generate code
    E3001,
    /// Construct not supported by the backend
    E3002,

    // Internal Errors (E9xxx)
    /// Optimization pass broke an IR invariant
    E9001,
    /// Internal compiler state error (also used for error-limit abort)
    E9002,

    // Warnings (W2xxx)
    /// Implicit narrowing conversion
    W2001,
    /// Unused variable
    W2002,
    /// Unreachable code
    W2003,
}

impl ErrorCode {
    /// Every known code, in declaration order.
    pub const ALL: &'static [ErrorCode] = &[
        ErrorCode::E0001,
        ErrorCode::E0002,
        ErrorCode::E0003,
        ErrorCode::E1001,
        ErrorCode::E1002,
        ErrorCode::E1003,
        ErrorCode::E1004,
        ErrorCode::E1005,
        ErrorCode::E1006,
        ErrorCode::E1007,
        ErrorCode::E2001,
        ErrorCode::E2002,
        ErrorCode::E2003,
        ErrorCode::E2004,
        ErrorCode::E2005,
        ErrorCode::E2006,
        ErrorCode::E2007,
        ErrorCode::E2008,
        ErrorCode::E2009,
        ErrorCode::E2010,
        ErrorCode::E2011,
        ErrorCode::E2012,
        ErrorCode::E2013,
        ErrorCode::E2014,
        ErrorCode::E2015,
        ErrorCode::E2016,
        ErrorCode::E2017,
        ErrorCode::E3001,
        ErrorCode::E3002,
        ErrorCode::E9001,
        ErrorCode::E9002,
        ErrorCode::W2001,
        ErrorCode::W2002,
        ErrorCode::W2003,
    ];

    /// Get the string representation of this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E0001 => "E0001",
            ErrorCode::E0002 => "E0002",
            ErrorCode::E0003 => "E0003",
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E1006 => "E1006",
            ErrorCode::E1007 => "E1007",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2007 => "E2007",
            ErrorCode::E2008 => "E2008",
            ErrorCode::E2009 => "E2009",
            ErrorCode::E2010 => "E2010",
            ErrorCode::E2011 => "E2011",
            ErrorCode::E2012 => "E2012",
            ErrorCode::E2013 => "E2013",
            ErrorCode::E2014 => "E2014",
            ErrorCode::E2015 => "E2015",
            ErrorCode::E2016 => "E2016",
            ErrorCode::E2017 => "E2017",
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
            ErrorCode::W2001 => "W2001",
            ErrorCode::W2002 => "W2002",
            ErrorCode::W2003 => "W2003",
        }
    }

    /// Look up a code by its textual form (`"E2001"`).
    pub fn from_str_code(code: &str) -> Option<ErrorCode> {
        Self::ALL.iter().copied().find(|c| c.as_str() == code)
    }

    /// Short human description of the code.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E0001 => "unterminated block comment",
            ErrorCode::E0002 => "invalid character",
            ErrorCode::E0003 => "invalid number literal",
            ErrorCode::E1001 => "unexpected token",
            ErrorCode::E1002 => "expected expression",
            ErrorCode::E1003 => "unclosed delimiter",
            ErrorCode::E1004 => "expected identifier",
            ErrorCode::E1005 => "expected type",
            ErrorCode::E1006 => "invalid item",
            ErrorCode::E1007 => "missing function body",
            ErrorCode::E2001 => "type mismatch",
            ErrorCode::E2002 => "unknown type",
            ErrorCode::E2003 => "unknown identifier",
            ErrorCode::E2004 => "wrong number of arguments",
            ErrorCode::E2005 => "cannot infer type",
            ErrorCode::E2006 => "duplicate definition",
            ErrorCode::E2007 => "ambiguous name",
            ErrorCode::E2008 => "invalid operand",
            ErrorCode::E2009 => "invalid assignment target",
            ErrorCode::E2010 => "missing return",
            ErrorCode::E2011 => "jump outside of loop",
            ErrorCode::E2012 => "recursive struct",
            ErrorCode::E2013 => "error in template instantiation",
            ErrorCode::E2014 => "not a constant expression",
            ErrorCode::E2015 => "no such member",
            ErrorCode::E2016 => "template argument kind mismatch",
            ErrorCode::E2017 => "template argument count mismatch",
            ErrorCode::E3001 => "code generation failed",
            ErrorCode::E3002 => "unsupported construct",
            ErrorCode::E9001 => "optimization invariant violation",
            ErrorCode::E9002 => "internal compiler error",
            ErrorCode::W2001 => "implicit narrowing conversion",
            ErrorCode::W2002 => "unused variable",
            ErrorCode::W2003 => "unreachable code",
        }
    }

    /// Check if this is a lexer error (E0xxx range).
    pub fn is_lexer_error(&self) -> bool {
        self.as_str().starts_with("E0")
    }

    /// Check if this is a parser/syntax error (E1xxx range).
    pub fn is_parser_error(&self) -> bool {
        self.as_str().starts_with("E1")
    }

    /// Check if this is a name/type/template error (E2xxx range).
    pub fn is_type_error(&self) -> bool {
        self.as_str().starts_with("E2")
    }

    pub fn is_codegen_error(&self) -> bool {
        self.as_str().starts_with("E3")
    }

    pub fn is_internal_error(&self) -> bool {
        self.as_str().starts_with("E9")
    }

    pub fn is_warning(&self) -> bool {
        self.as_str().starts_with('W')
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests;
