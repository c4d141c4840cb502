//! Binary, unary and compound-assignment operators.
//!
//! Precedence follows the C table documented on [`BinaryOp::precedence`].

/// Binary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical (short-circuit)
    And,
    Or,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }

    /// Binding power; higher binds tighter.
    ///
    /// - 10: `*` `/` `%`
    /// - 9: `+` `-`
    /// - 8: `<<` `>>`
    /// - 7: `<` `<=` `>` `>=`
    /// - 6: `==` `!=`
    /// - 5: `&`
    /// - 4: `^`
    /// - 3: `|`
    /// - 2: `&&`
    /// - 1: `||`
    ///
    /// The conditional operator sits below all of these and unary operators
    /// above. Every binary level is left-associative.
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Mul | Self::Div | Self::Mod => 10,
            Self::Add | Self::Sub => 9,
            Self::Shl | Self::Shr => 8,
            Self::Lt | Self::LtEq | Self::Gt | Self::GtEq => 7,
            Self::Eq | Self::NotEq => 6,
            Self::BitAnd => 5,
            Self::BitXor => 4,
            Self::BitOr => 3,
            Self::And => 2,
            Self::Or => 1,
        }
    }

    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub const fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod)
    }

    /// Operators restricted to `int` operands.
    pub const fn is_integer_only(self) -> bool {
        matches!(
            self,
            Self::BitAnd | Self::BitOr | Self::BitXor | Self::Shl | Self::Shr
        )
    }

    pub const fn is_commutative(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Mul
                | Self::Eq
                | Self::NotEq
                | Self::BitAnd
                | Self::BitOr
                | Self::BitXor
        )
    }
}

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `~x`
    BitNot,
}

impl UnaryOp {
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
            Self::BitNot => "~",
        }
    }
}

/// Assignment operators; compound forms carry their binary operator.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

impl AssignOp {
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Compound(BinaryOp::Add) => "+=",
            Self::Compound(BinaryOp::Sub) => "-=",
            Self::Compound(BinaryOp::Mul) => "*=",
            Self::Compound(BinaryOp::Div) => "/=",
            Self::Compound(BinaryOp::Mod) => "%=",
            Self::Compound(BinaryOp::BitAnd) => "&=",
            Self::Compound(BinaryOp::BitOr) => "|=",
            Self::Compound(BinaryOp::BitXor) => "^=",
            Self::Compound(BinaryOp::Shl) => "<<=",
            Self::Compound(BinaryOp::Shr) => ">>=",
            Self::Compound(_) => "?=",
        }
    }

    pub const fn binary(self) -> Option<BinaryOp> {
        match self {
            Self::Assign => None,
            Self::Compound(op) => Some(op),
        }
    }
}
