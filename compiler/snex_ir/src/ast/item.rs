//! Top-level and member declarations.

use super::{ExprId, Path, StmtId, TypeExpr};
use crate::{Name, Span};

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Item {
    pub kind: ItemKind,
    pub span: Span,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ItemKind {
    Function(FunctionDecl),
    Struct(StructDecl),
    Global(GlobalDecl),
    Namespace {
        name: Name,
        name_span: Span,
        items: Vec<Item>,
    },
    /// `using namespace a::b;`
    UsingNamespace(Path),
    /// `using Alias = target;` where target names a namespace or a type.
    Alias {
        name: Name,
        name_span: Span,
        target: TypeExpr,
    },
    Template(TemplateDecl),
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Param {
    pub ty: TypeExpr,
    pub name: Name,
    pub is_const: bool,
    pub span: Span,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunctionDecl {
    pub ret: TypeExpr,
    pub name: Name,
    pub name_span: Span,
    pub params: Vec<Param>,
    /// Block statement; `None` only after a recovered syntax error.
    pub body: Option<StmtId>,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldDecl {
    pub ty: TypeExpr,
    pub name: Name,
    pub span: Span,
    pub init: Option<ExprId>,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StructDecl {
    pub name: Name,
    pub name_span: Span,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunctionDecl>,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct GlobalDecl {
    pub ty: TypeExpr,
    pub name: Name,
    pub name_span: Span,
    pub init: Option<ExprId>,
    pub is_const: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TemplateParamKind {
    /// `typename T`
    Type,
    /// `int N`
    Int,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TemplateParam {
    pub kind: TemplateParamKind,
    pub name: Name,
    pub span: Span,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TemplateDecl {
    pub params: Vec<TemplateParam>,
    pub item: Box<Item>,
}
