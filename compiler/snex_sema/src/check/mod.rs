//! Semantic analysis: declaration collection, name resolution, type
//! checking and lowering into the typed IR.
//!
//! # Module Structure
//!
//! - `collect`: host symbols, namespaces, structs, templates, directives
//!   and function signatures
//! - `resolve`: type expressions, struct definitions, constant expressions
//! - `template`: template arguments, instantiation and deduction
//! - `stmt`: function bodies and statements
//! - `expr`: expressions, places and implicit conversions
//! - `call`: calls, methods and overload resolution
//!
//! Checking is error tolerant. A failed expression gets `TypeId::ERROR`
//! and every check involving `ERROR` passes silently, so one mistake
//! produces one diagnostic.

mod call;
mod collect;
mod expr;
mod resolve;
mod stmt;
mod template;

#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use snex_diagnostic::{Diagnostic, ErrorCode};
use snex_ir::{
    Ast, ConstValue, FunctionDecl, GlobalDecl, Name, Path, Span, StructDecl, TemplateDecl,
    TemplateParam, TypeExpr,
};
use snex_types::{FuncId, GlobalId, LocalId, ScopeError, ScopeId, SymbolId, TypeId};

use crate::context::UnitContext;
use crate::ir::{IrFunction, IrLocal, IrModule, IrStmt, PlaceKind};
use crate::options::AnalysisOptions;

/// Result of checking one unit.
#[derive(Debug)]
pub struct CheckOutput {
    pub ir: IrModule,
    /// Errors and warnings (E2xxx, W2xxx) in discovery order.
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Check a parsed unit and lower it into the typed IR.
#[tracing::instrument(level = "debug", skip_all, fields(unit = %ctx.name))]
pub fn check(ast: &Ast, ctx: &mut UnitContext, options: &AnalysisOptions) -> CheckOutput {
    let mut checker = Checker::new(ast, ctx, options);
    checker.run();
    let output = checker.finish();
    tracing::debug!(
        functions = output.ir.functions.len(),
        globals = output.ir.globals.len(),
        diagnostics = output.diagnostics.len(),
        "checked unit"
    );
    output
}

/// Instantiations nested deeper than this are reported instead of expanded.
const MAX_INSTANTIATION_DEPTH: usize = 64;

/// Declaration-side information about an IR function.
struct FuncInfo<'a> {
    decl: Option<&'a FunctionDecl>,
    /// Scope the body scope is opened in: the declaring scope, the class
    /// scope of a method or the parameter scope of a template instance.
    scope: ScopeId,
    /// Instantiation frames active when the function was created.
    context: Vec<String>,
    /// Where the instantiation was requested.
    site: Span,
}

struct TemplateDef<'a> {
    name: Name,
    /// Qualified name used as the base of instance names.
    qualified: String,
    params: &'a [TemplateParam],
    decl: &'a TemplateDecl,
    scope: ScopeId,
    symbol: SymbolId,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum StructState {
    Pending,
    Defining,
    Done,
}

struct StructItem<'a> {
    ty: TypeId,
    decl: &'a StructDecl,
    class_scope: ScopeId,
    state: StructState,
    /// Instantiation frames to restore while defining it.
    context: Vec<String>,
}

struct FunctionItem<'a> {
    scope: ScopeId,
    decl: &'a FunctionDecl,
    owner: Option<TypeId>,
}

struct GlobalItem<'a> {
    scope: ScopeId,
    decl: &'a GlobalDecl,
    span: Span,
}

enum Directive<'a> {
    Using {
        scope: ScopeId,
        path: &'a Path,
    },
    Alias {
        scope: ScopeId,
        name: Name,
        name_span: Span,
        target: &'a TypeExpr,
    },
}

/// A local declared by the source, tracked for the unused-variable warning.
struct DeclaredLocal {
    local: LocalId,
    name: Name,
    span: Span,
}

/// State of the function body being lowered.
struct BodyState {
    func: Option<FuncId>,
    ret: TypeId,
    /// Slot of `this` inside methods.
    this: Option<LocalId>,
    locals: Vec<IrLocal>,
    loop_depth: u32,
    declared: Vec<DeclaredLocal>,
    used: FxHashSet<LocalId>,
    /// Values of `const` locals with constant initializers.
    const_locals: FxHashMap<LocalId, ConstValue>,
}

impl BodyState {
    fn new(func: Option<FuncId>, ret: TypeId) -> Self {
        BodyState {
            func,
            ret,
            this: None,
            locals: Vec::new(),
            loop_depth: 0,
            declared: Vec::new(),
            used: FxHashSet::default(),
            const_locals: FxHashMap::default(),
        }
    }
}

pub(crate) struct Checker<'a> {
    ast: &'a Ast,
    ctx: &'a mut UnitContext,
    safety_checks: bool,
    module: IrModule,
    diagnostics: Vec<Diagnostic>,
    /// Parallel to `module.functions`.
    funcs: Vec<FuncInfo<'a>>,
    /// Functions whose bodies still need checking.
    queue: VecDeque<FuncId>,
    templates: Vec<TemplateDef<'a>>,
    structs: Vec<StructItem<'a>>,
    struct_index: FxHashMap<TypeId, usize>,
    /// Constant default initializers of struct members.
    defaults: FxHashMap<TypeId, Vec<Option<ConstValue>>>,
    functions: Vec<FunctionItem<'a>>,
    globals: Vec<GlobalItem<'a>>,
    directives: Vec<Directive<'a>>,
    global_consts: FxHashMap<GlobalId, ConstValue>,
    /// Initializer stores of globals bound as constants ahead of the rest.
    const_inits: Vec<IrStmt>,
    /// Scope names are resolved in.
    scope: ScopeId,
    body: Option<BodyState>,
    /// Names of the instantiations being expanded, outermost first.
    instantiation: Vec<String>,
}

impl<'a> Checker<'a> {
    fn new(ast: &'a Ast, ctx: &'a mut UnitContext, options: &AnalysisOptions) -> Self {
        Checker {
            ast,
            ctx,
            safety_checks: options.optimizations.safety_checks(),
            module: IrModule::default(),
            diagnostics: Vec::new(),
            funcs: Vec::new(),
            queue: VecDeque::new(),
            templates: Vec::new(),
            structs: Vec::new(),
            struct_index: FxHashMap::default(),
            defaults: FxHashMap::default(),
            functions: Vec::new(),
            globals: Vec::new(),
            directives: Vec::new(),
            global_consts: FxHashMap::default(),
            const_inits: Vec::new(),
            scope: ScopeId::GLOBAL,
            body: None,
            instantiation: Vec::new(),
        }
    }

    fn run(&mut self) {
        self.register_externs();
        let ast = self.ast;
        self.collect_items(&ast.items, ScopeId::GLOBAL);
        self.process_directives();
        self.declare_constant_globals();
        for index in 0..self.structs.len() {
            self.define_struct(index);
        }
        self.declare_functions();
        self.check_globals();
        while let Some(func) = self.queue.pop_front() {
            self.check_function_body(func);
        }
    }

    fn finish(self) -> CheckOutput {
        CheckOutput {
            ir: self.module,
            diagnostics: self.diagnostics,
        }
    }

    // Diagnostics

    /// Record a diagnostic, noting the instantiations it happened in.
    fn report(&mut self, mut diagnostic: Diagnostic) {
        for frame in self.instantiation.iter().rev() {
            diagnostic = diagnostic.with_note(format!("in instantiation of '{frame}'"));
        }
        self.diagnostics.push(diagnostic);
    }

    fn error(&mut self, code: ErrorCode, span: Span, message: impl Into<String>) {
        let message = message.into();
        self.report(
            Diagnostic::error(code)
                .with_message(message.clone())
                .with_label(span, message),
        );
    }

    fn warning(&mut self, code: ErrorCode, span: Span, message: impl Into<String>) {
        let message = message.into();
        self.report(
            Diagnostic::warning(code)
                .with_message(message.clone())
                .with_label(span, message),
        );
    }

    fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Report a failed lookup of `name` at `span`.
    fn scope_error(&mut self, err: &ScopeError, span: Span) {
        let name = self.text(err.name());
        match err {
            ScopeError::DuplicateName { existing, .. } => {
                let previous = self.ctx.scopes.symbol(*existing).map(|s| s.span);
                let mut diag = Diagnostic::error(ErrorCode::E2006)
                    .with_message(format!("`{name}` is already defined in this scope"))
                    .with_label(span, "redefined here");
                if let Some(previous) = previous.filter(|s| *s != Span::DUMMY) {
                    diag = diag.with_secondary_label(previous, "previous definition");
                }
                self.report(diag);
            }
            ScopeError::NotFound { .. } => {
                self.report(snex_diagnostic::unknown_identifier(span, &name));
            }
            ScopeError::Ambiguous { candidates, .. } => {
                let mut diag = Diagnostic::error(ErrorCode::E2007)
                    .with_message(format!("`{name}` is ambiguous"))
                    .with_label(span, "found in more than one imported namespace");
                for candidate in candidates {
                    if let Some(data) = self.ctx.scopes.symbol(*candidate) {
                        let qualified = self.qualified_name(data.scope, data.name);
                        diag = diag.with_note(format!("candidate: `{qualified}`"));
                    }
                }
                self.report(diag);
            }
            ScopeError::NotAScope { .. } => self.error(
                ErrorCode::E2003,
                span,
                format!("`{name}` is not a namespace or struct"),
            ),
            ScopeError::NotAType { .. } => {
                self.error(ErrorCode::E2002, span, format!("`{name}` is not a type"));
            }
        }
    }

    // Names

    fn text(&self, name: Name) -> String {
        self.ctx.interner.lookup(name).to_owned()
    }

    fn path_text(&self, path: &Path) -> String {
        path.segments
            .iter()
            .map(|s| self.ctx.interner.lookup(*s))
            .collect::<Vec<_>>()
            .join("::")
    }

    /// `ns::Struct::name` for `name` declared in `scope`.
    fn qualified_name(&self, scope: ScopeId, name: Name) -> String {
        let mut parts: Vec<&str> = self
            .ctx
            .scopes
            .qualifiers(scope)
            .into_iter()
            .map(|n| self.ctx.interner.lookup(n))
            .collect();
        parts.push(self.ctx.interner.lookup(name));
        parts.join("::")
    }

    fn display_type(&self, ty: TypeId) -> String {
        self.ctx.types.display(ty)
    }

    // Scope and body helpers

    /// Run `f` with names resolved from `scope`.
    fn with_scope<T>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = saved;
        result
    }

    /// Run `f` in a fresh block scope.
    fn in_block<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let block = self
            .ctx
            .scopes
            .enter(self.scope, snex_types::ScopeKind::Block, None);
        self.with_scope(block, f)
    }

    /// Run `f` with `body` as the current function body and return it
    /// afterwards.
    fn with_body<T>(&mut self, body: BodyState, f: impl FnOnce(&mut Self) -> T) -> (T, BodyState) {
        let saved = self.body.replace(body);
        let result = f(self);
        let body = std::mem::replace(&mut self.body, saved);
        match body {
            Some(body) => (result, body),
            None => (result, BodyState::new(None, TypeId::VOID)),
        }
    }

    /// Run `f` with the given instantiation frames active.
    fn with_instantiation<T>(&mut self, frames: Vec<String>, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.instantiation, frames);
        let result = f(self);
        self.instantiation = saved;
        result
    }

    /// New slot in the current body. Constant contexts run inside a
    /// scratch body, so the placeholder id is never observed.
    fn add_local(&mut self, name: impl Into<String>, ty: TypeId, is_const: bool) -> LocalId {
        let local = IrLocal {
            name: name.into(),
            ty,
            is_const,
            is_param: false,
        };
        match &mut self.body {
            Some(body) => {
                let id = LocalId::from_len(body.locals.len());
                body.locals.push(local);
                id
            }
            None => LocalId::new(0),
        }
    }

    fn add_temp(&mut self, ty: TypeId) -> LocalId {
        let index = self.body.as_ref().map_or(0, |b| b.locals.len());
        self.add_local(format!("$t{index}"), ty, false)
    }

    fn mark_used(&mut self, local: LocalId) {
        if let Some(body) = &mut self.body {
            body.used.insert(local);
        }
    }

    /// Compile-time value of a `const` global or local.
    fn const_of(&self, place: &PlaceKind) -> Option<ConstValue> {
        match place {
            PlaceKind::Global(id) => self.global_consts.get(id).copied(),
            PlaceKind::Local(id) => self
                .body
                .as_ref()
                .and_then(|b| b.const_locals.get(id).copied()),
            _ => None,
        }
    }

    /// Append a function to the IR.
    fn push_function(&mut self, func: IrFunction, info: FuncInfo<'a>) -> FuncId {
        let id = FuncId::from_len(self.module.functions.len());
        self.module.functions.push(func);
        self.funcs.push(info);
        id
    }
}
