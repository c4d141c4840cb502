//! Expression nodes.

use smallvec::SmallVec;

use super::{BinaryOp, ExprId, TypeExpr, UnaryOp};
use crate::{Name, Primitive, Span};

/// A possibly qualified name: `gain`, `Math::sin`, `dsp::Filter`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Path {
    pub segments: SmallVec<[Name; 2]>,
    pub span: Span,
}

impl Path {
    pub fn single(name: Name, span: Span) -> Self {
        let mut segments = SmallVec::new();
        segments.push(name);
        Path { segments, span }
    }

    pub fn is_single(&self) -> bool {
        self.segments.len() == 1
    }

    /// Last segment, the name actually being referred to.
    pub fn last(&self) -> Name {
        self.segments.last().copied().unwrap_or(Name::EMPTY)
    }
}

/// A template argument as written: either a type or a constant expression.
///
/// A bare path is parsed as a type; the analyzer reinterprets it as a value
/// when it names a constant.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TemplateArgExpr {
    Type(TypeExpr),
    Value(ExprId),
}

/// An expression node.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExprKind {
    Int(i32),
    /// `f32` bits.
    Float(u32),
    /// `f64` bits.
    Double(u64),
    Bool(bool),
    Path(Path),
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Ternary {
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    /// `(float)x` or `float(x)`.
    Cast {
        to: Primitive,
        expr: ExprId,
    },
    /// `f(a, b)`, `ns::f<4>(a)`, `obj.method(a)`.
    Call {
        callee: ExprId,
        template_args: Vec<TemplateArgExpr>,
        args: Vec<ExprId>,
    },
    Member {
        base: ExprId,
        name: Name,
        name_span: Span,
    },
    Index {
        base: ExprId,
        index: ExprId,
    },
    /// `{ a, b, c }` aggregate initializer.
    InitList(Vec<ExprId>),
    /// Placeholder produced by error recovery.
    Error,
}
