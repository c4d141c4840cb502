//! Fixed-width primitive types of the language.

use std::fmt;

/// Primitive type tag.
///
/// `bool` occupies a 32-bit slot so that every scalar except `double`
/// shares the same size and alignment.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum Primitive {
    Void,
    Bool,
    Int,
    Float,
    Double,
}

impl Primitive {
    pub const fn size(self) -> u32 {
        match self {
            Primitive::Void => 0,
            Primitive::Bool | Primitive::Int | Primitive::Float => 4,
            Primitive::Double => 8,
        }
    }

    pub const fn align(self) -> u32 {
        match self {
            Primitive::Void => 1,
            Primitive::Bool | Primitive::Int | Primitive::Float => 4,
            Primitive::Double => 8,
        }
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Primitive::Int | Primitive::Float | Primitive::Double)
    }

    pub const fn is_floating(self) -> bool {
        matches!(self, Primitive::Float | Primitive::Double)
    }

    /// Rank in the promotion order `int < float < double`.
    ///
    /// `None` for types that do not take part in arithmetic promotion.
    pub const fn rank(self) -> Option<u8> {
        match self {
            Primitive::Int => Some(0),
            Primitive::Float => Some(1),
            Primitive::Double => Some(2),
            Primitive::Void | Primitive::Bool => None,
        }
    }

    /// Common type of a binary arithmetic operation on `self` and `other`.
    pub fn promote(self, other: Primitive) -> Option<Primitive> {
        let (a, b) = (self.rank()?, other.rank()?);
        Some(if a >= b { self } else { other })
    }

    /// Keyword spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Primitive::Void => "void",
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    /// Single-letter tag shown in debugger and autocomplete views.
    pub const fn type_char(self) -> char {
        match self {
            Primitive::Void => 'V',
            Primitive::Bool => 'B',
            Primitive::Int => 'I',
            Primitive::Float => 'F',
            Primitive::Double => 'D',
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
