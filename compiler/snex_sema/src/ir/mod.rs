//! Typed intermediate representation.
//!
//! The analyzer lowers the AST into this tree form; optimization passes
//! rewrite it in place and the code generator consumes it. Every
//! expression carries its [`TypeId`]; implicit conversions, reference
//! dereferences and the `this` parameter of methods are explicit.
//!
//! Storage is explicit as well: an [`IrPlace`] names a memory location
//! (local slot, global, dereferenced reference, struct field or indexed
//! element) and `Load`/`AddressOf`/`Assign` are the only ways to touch it.

mod print;
pub mod visitor;

use snex_ir::{BinaryOp, ConstValue, Span, UnaryOp};
use snex_types::{ExternId, FuncId, GlobalId, LocalId, TypeId};

pub use print::IrDisplay;

/// Optimizer-ready form of one compilation unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IrModule {
    /// Indexed by [`FuncId`].
    pub functions: Vec<IrFunction>,
    /// Indexed by [`GlobalId`].
    pub globals: Vec<IrGlobal>,
    /// Synthesized function that runs the global initializers.
    pub init: Option<FuncId>,
}

impl IrModule {
    pub fn function(&self, id: FuncId) -> Option<&IrFunction> {
        self.functions.get(id.index())
    }

    pub fn function_mut(&mut self, id: FuncId) -> Option<&mut IrFunction> {
        self.functions.get_mut(id.index())
    }

    pub fn global(&self, id: GlobalId) -> Option<&IrGlobal> {
        self.globals.get(id.index())
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FuncId> {
        (0..self.functions.len()).map(FuncId::from_len)
    }

    /// First function with the given qualified name.
    pub fn find_function(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(FuncId::from_len)
    }

    /// Number of statements over all function bodies, nested ones included.
    pub fn statement_count(&self) -> usize {
        self.functions
            .iter()
            .map(|f| visitor::count_statements(&f.body))
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrGlobal {
    /// Qualified name.
    pub name: String,
    pub ty: TypeId,
    pub is_const: bool,
    /// Compile-time value of a `const` global with a constant initializer.
    pub constant: Option<ConstValue>,
    pub span: Span,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FunctionKind {
    Free,
    /// Parameter 0 is `this`, a reference to the owner.
    Method { owner: TypeId },
    /// Global initializer, run once when the unit is bound.
    Init,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrLocal {
    pub name: String,
    pub ty: TypeId,
    pub is_const: bool,
    pub is_param: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrFunction {
    /// Qualified name: `add`, `dsp::Voice::process`, `makeSpan<4>`.
    pub name: String,
    pub kind: FunctionKind,
    /// Parameter slots, in order, into `locals`.
    pub params: Vec<LocalId>,
    pub ret: TypeId,
    /// Every slot of the frame: parameters, declared locals and
    /// temporaries introduced by the analyzer or the optimizer.
    pub locals: Vec<IrLocal>,
    pub body: Vec<IrStmt>,
    pub span: Span,
    /// Produced by instantiating a template.
    pub is_instance: bool,
    /// Set by the inliner when the function may be inlined at call sites.
    pub inline_eligible: bool,
}

impl IrFunction {
    pub fn new(name: impl Into<String>, kind: FunctionKind, ret: TypeId, span: Span) -> Self {
        IrFunction {
            name: name.into(),
            kind,
            params: Vec::new(),
            ret,
            locals: Vec::new(),
            body: Vec::new(),
            span,
            is_instance: false,
            inline_eligible: false,
        }
    }

    pub fn add_local(&mut self, local: IrLocal) -> LocalId {
        let id = LocalId::from_len(self.locals.len());
        self.locals.push(local);
        id
    }

    pub fn add_param(&mut self, name: impl Into<String>, ty: TypeId, is_const: bool) -> LocalId {
        let id = self.add_local(IrLocal {
            name: name.into(),
            ty,
            is_const,
            is_param: true,
        });
        self.params.push(id);
        id
    }

    /// Fresh unnamed slot.
    pub fn add_temp(&mut self, ty: TypeId) -> LocalId {
        let name = format!("$t{}", self.locals.len());
        self.add_local(IrLocal {
            name,
            ty,
            is_const: false,
            is_param: false,
        })
    }

    pub fn local(&self, id: LocalId) -> Option<&IrLocal> {
        self.locals.get(id.index())
    }

    pub fn param_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.params
            .iter()
            .filter_map(|p| self.locals.get(p.index()).map(|l| l.ty))
    }

    pub fn is_method(&self) -> bool {
        matches!(self.kind, FunctionKind::Method { .. })
    }
}

/// A memory location.
#[derive(Clone, Debug, PartialEq)]
pub struct IrPlace {
    pub kind: PlaceKind,
    pub ty: TypeId,
}

impl IrPlace {
    pub fn new(kind: PlaceKind, ty: TypeId) -> Self {
        IrPlace { kind, ty }
    }

    pub fn local(id: LocalId, ty: TypeId) -> Self {
        IrPlace::new(PlaceKind::Local(id), ty)
    }

    /// Local slot at the root of this place, if it is rooted in one
    /// without going through a reference.
    pub fn root_local(&self) -> Option<LocalId> {
        match &self.kind {
            PlaceKind::Local(id) => Some(*id),
            PlaceKind::Field { base, .. } | PlaceKind::Index { base, .. } => base.root_local(),
            PlaceKind::Global(_) | PlaceKind::Deref(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlaceKind {
    Local(LocalId),
    Global(GlobalId),
    /// Location a reference value points to.
    Deref(Box<IrExpr>),
    Field {
        base: Box<IrPlace>,
        index: u32,
        offset: u32,
    },
    /// Element of a span (inline) or dyn (indirect) place.
    Index {
        base: Box<IrPlace>,
        index: Box<IrExpr>,
        /// Bounds guard emitted; cleared by `NO_SAFETY_CHECKS`.
        checked: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrExpr {
    pub kind: IrExprKind,
    pub ty: TypeId,
    pub span: Span,
}

impl IrExpr {
    pub fn new(kind: IrExprKind, ty: TypeId, span: Span) -> Self {
        IrExpr { kind, ty, span }
    }

    pub fn constant(value: ConstValue, span: Span) -> Self {
        IrExpr::new(
            IrExprKind::Const(value),
            TypeId::of_primitive(value.primitive()),
            span,
        )
    }

    pub fn error(span: Span) -> Self {
        IrExpr::new(IrExprKind::Zero, TypeId::ERROR, span)
    }

    pub fn load(place: IrPlace, span: Span) -> Self {
        let ty = place.ty;
        IrExpr::new(IrExprKind::Load(Box::new(place)), ty, span)
    }

    pub fn as_const(&self) -> Option<ConstValue> {
        match self.kind {
            IrExprKind::Const(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.ty.is_error()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrExprKind {
    Const(ConstValue),
    /// All-zero value of the expression's type.
    Zero,
    Load(Box<IrPlace>),
    /// Reference to a place; the expression's type is `T&`.
    AddressOf(Box<IrPlace>),
    /// Store `value` into the temporary `local` and yield its address.
    /// Binds non-place arguments to reference parameters.
    Materialize {
        local: LocalId,
        value: Box<IrExpr>,
    },
    /// Element count of a span or dyn place.
    Len(Box<IrPlace>),
    Unary {
        op: UnaryOp,
        operand: Box<IrExpr>,
    },
    /// Operands have the same type (the shift amount is always `int`);
    /// `&&`/`||` short-circuit.
    Binary {
        op: BinaryOp,
        lhs: Box<IrExpr>,
        rhs: Box<IrExpr>,
    },
    /// Primitive conversion to the expression's type.
    Convert(Box<IrExpr>),
    Select {
        cond: Box<IrExpr>,
        then_expr: Box<IrExpr>,
        else_expr: Box<IrExpr>,
    },
    Call {
        callee: FuncId,
        args: Vec<IrExpr>,
    },
    CallExtern {
        callee: ExternId,
        args: Vec<IrExpr>,
    },
    /// Struct or span value built from its elements in order.
    Aggregate(Vec<IrExpr>),
    /// A call whose callee body was substituted at the call site.
    Inlined(Box<InlinedCall>),
}

/// Callee body spliced into the caller.
///
/// `bindings` assign the callee's parameters (renumbered into caller
/// slots) in argument order, `body` runs next and `value` is the result.
#[derive(Clone, Debug, PartialEq)]
pub struct InlinedCall {
    pub callee: FuncId,
    pub bindings: Vec<(LocalId, IrExpr)>,
    pub body: Vec<IrStmt>,
    pub value: Option<IrExpr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrStmt {
    pub kind: IrStmtKind,
    pub span: Span,
}

impl IrStmt {
    pub fn new(kind: IrStmtKind, span: Span) -> Self {
        IrStmt { kind, span }
    }

    /// Whether control never continues to the next statement.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self.kind,
            IrStmtKind::Return(_) | IrStmtKind::Break | IrStmtKind::Continue
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum IrStmtKind {
    Expr(IrExpr),
    /// Initialize a slot; uninitialized declarations get `Zero`.
    Local { local: LocalId, init: IrExpr },
    /// `place = value`, or `place op= value` when `op` is set. For compound
    /// assignments the operation is performed in `value`'s type and the
    /// result converted back to the place type.
    Assign {
        place: IrPlace,
        op: Option<BinaryOp>,
        value: IrExpr,
    },
    If {
        cond: IrExpr,
        then_body: Vec<IrStmt>,
        else_body: Vec<IrStmt>,
    },
    While {
        cond: IrExpr,
        body: Vec<IrStmt>,
    },
    /// `continue` jumps to `update`.
    For {
        init: Vec<IrStmt>,
        cond: Option<IrExpr>,
        update: Vec<IrStmt>,
        body: Vec<IrStmt>,
    },
    Return(Option<IrExpr>),
    Break,
    Continue,
    Block(Vec<IrStmt>),
}
