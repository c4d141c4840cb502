//! Flat abstract syntax tree.
//!
//! Expressions and statements are stored in arenas owned by [`Ast`] and
//! referenced by `u32` ids instead of boxes; items form a small tree since
//! there are few of them. Node kinds are closed enums matched exhaustively
//! by every pass.

mod expr;
mod item;
mod operators;
mod stmt;

use std::fmt;

pub use expr::{Expr, ExprKind, Path, TemplateArgExpr};
pub use item::{
    FieldDecl, FunctionDecl, GlobalDecl, Item, ItemKind, Param, StructDecl, TemplateDecl,
    TemplateParam, TemplateParamKind,
};
pub use operators::{AssignOp, BinaryOp, UnaryOp};
pub use stmt::{Stmt, StmtKind};

use crate::{Primitive, Span};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id!(
    /// Index into [`ExprArena`].
    ExprId
);
define_id!(
    /// Index into [`StmtArena`].
    StmtId
);

/// A type as written in source.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        TypeExpr { kind, span }
    }

    pub fn is_auto(&self) -> bool {
        match &self.kind {
            TypeExprKind::Auto => true,
            TypeExprKind::Ref(inner) => inner.is_auto(),
            _ => false,
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self.kind, TypeExprKind::Ref(_))
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeExprKind {
    Primitive(Primitive),
    Auto,
    /// Named type with optional template arguments: `Voice`, `Buffer<float, 4>`.
    Path {
        path: Path,
        args: Vec<TemplateArgExpr>,
    },
    /// `span<T, N>`
    Span {
        elem: Box<TypeExpr>,
        len: ExprId,
    },
    /// `dyn<T>`
    Dyn(Box<TypeExpr>),
    /// `T&`
    Ref(Box<TypeExpr>),
    Error,
}

macro_rules! define_arena {
    ($(#[$meta:meta])* $arena:ident, $id:ident, $node:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, Eq, PartialEq)]
        pub struct $arena {
            nodes: Vec<$node>,
        }

        impl $arena {
            pub fn new() -> Self {
                Self::default()
            }

            /// Allocate a node and return its id.
            pub fn alloc(&mut self, node: $node) -> $id {
                let id = $id::new(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
                self.nodes.push(node);
                id
            }

            /// Node for `id`.
            ///
            /// Ids are only created by `alloc` on the same arena, so indexing
            /// cannot go out of bounds for ids produced by this AST.
            #[inline]
            pub fn get(&self, id: $id) -> &$node {
                &self.nodes[id.index()]
            }

            #[inline]
            pub fn span(&self, id: $id) -> Span {
                self.nodes[id.index()].span
            }

            pub fn len(&self) -> usize {
                self.nodes.len()
            }

            pub fn is_empty(&self) -> bool {
                self.nodes.is_empty()
            }
        }
    };
}

define_arena!(
    /// Arena of expression nodes.
    ExprArena,
    ExprId,
    Expr
);
define_arena!(
    /// Arena of statement nodes.
    StmtArena,
    StmtId,
    Stmt
);

/// A parsed compilation unit.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ast {
    pub exprs: ExprArena,
    pub stmts: StmtArena,
    pub items: Vec<Item>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        self.exprs.get(id)
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        self.stmts.get(id)
    }

    /// Total number of top-level and nested functions, for logging.
    pub fn function_count(&self) -> usize {
        fn count(items: &[Item]) -> usize {
            items
                .iter()
                .map(|item| match &item.kind {
                    ItemKind::Function(_) => 1,
                    ItemKind::Struct(s) => s.methods.len(),
                    ItemKind::Namespace { items, .. } => count(items),
                    ItemKind::Template(t) => count(std::slice::from_ref(&*t.item)),
                    ItemKind::Global(_)
                    | ItemKind::UsingNamespace(_)
                    | ItemKind::Alias { .. } => 0,
                })
                .sum()
        }
        count(&self.items)
    }
}
