//! Statement nodes.

use super::{AssignOp, ExprId, StmtId, TypeExpr};
use crate::{Name, Span};

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    /// `const int x = 1;`, `auto& v = data[0];`
    Local {
        ty: TypeExpr,
        name: Name,
        name_span: Span,
        init: Option<ExprId>,
        is_const: bool,
    },
    Expr(ExprId),
    /// `x = e`, `x += e`, `x++` (desugared to `x += 1`).
    Assign {
        op: AssignOp,
        target: ExprId,
        value: ExprId,
    },
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        update: Option<StmtId>,
        body: StmtId,
    },
    /// `for (auto& s : data) body`
    RangeFor {
        ty: TypeExpr,
        name: Name,
        name_span: Span,
        iterable: ExprId,
        body: StmtId,
    },
    Return(Option<ExprId>),
    Break,
    Continue,
    Empty,
    Error,
}
