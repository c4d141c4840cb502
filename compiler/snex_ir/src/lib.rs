//! SNEX IR - syntax-level data structures shared by every compiler stage.
//!
//! - Spans for source locations
//! - Interned identifiers (`Name`) and the per-unit `StringInterner`
//! - Tokens and `TokenList` for lexer output
//! - The flat AST: expressions and statements live in arenas and refer to
//!   each other through `ExprId`/`StmtId` indices
//! - Primitive type tags and compile-time constant values
//!
//! Floats are stored as raw bits wherever a type needs `Eq + Hash`.

pub mod ast;
mod const_value;
mod interner;
mod name;
mod primitive;
mod span;
mod token;

pub use ast::{
    AssignOp, Ast, BinaryOp, Expr, ExprArena, ExprId, ExprKind, FieldDecl, FunctionDecl,
    GlobalDecl, Item, ItemKind, Param, Path, Stmt, StmtArena, StmtId, StmtKind, StructDecl,
    TemplateArgExpr, TemplateDecl, TemplateParam, TemplateParamKind, TypeExpr, TypeExprKind,
    UnaryOp,
};
pub use const_value::ConstValue;
pub use interner::StringInterner;
pub use name::Name;
pub use primitive::Primitive;
pub use span::{Span, SpanError};
pub use token::{Token, TokenKind, TokenList, TokenValue};
