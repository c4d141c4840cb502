//! Declaration collection.
//!
//! Runs before any body is checked so that functions, structs and
//! templates can be used ahead of their declaration in the source.

use std::sync::Arc;

use snex_diagnostic::{Diagnostic, ErrorCode};
use snex_ir::{FunctionDecl, Item, ItemKind, Span, StructDecl, TemplateDecl, TypeExprKind};
use snex_types::{
    Callee, FuncId, GlobalId, ScopeId, ScopeKind, Storage, Symbol, TemplateId, TypeFlags, TypeId,
};

use super::{
    BodyState, Checker, Directive, FuncInfo, FunctionItem, GlobalItem, StructItem, StructState,
    TemplateDef,
};
use crate::ir::{
    FunctionKind, IrExpr, IrFunction, IrGlobal, IrPlace, IrStmt, IrStmtKind, PlaceKind,
};

impl<'a> Checker<'a> {
    /// Bind host functions and constants, creating their namespaces.
    pub(super) fn register_externs(&mut self) {
        let externs = Arc::clone(&self.ctx.externs);
        for (id, function) in externs.functions() {
            let scope = self.extern_scope(function.namespace.as_deref());
            let name = self.ctx.interner.intern(&function.name);
            if let Err(err) =
                self.ctx
                    .scopes
                    .declare_function(scope, name, Callee::Extern(id), Span::DUMMY)
            {
                self.scope_error(&err, Span::DUMMY);
            }
        }
        for constant in externs.constants() {
            let scope = self.extern_scope(constant.namespace.as_deref());
            let name = self.ctx.interner.intern(&constant.name);
            let symbol = Symbol::Constant {
                ty: TypeId::of_primitive(constant.value.primitive()),
                value: constant.value,
            };
            if let Err(err) = self.ctx.scopes.declare(scope, name, symbol, Span::DUMMY) {
                self.scope_error(&err, Span::DUMMY);
            }
        }
    }

    fn extern_scope(&mut self, namespace: Option<&str>) -> ScopeId {
        let mut scope = ScopeId::GLOBAL;
        for segment in namespace.into_iter().flat_map(|ns| ns.split("::")) {
            let name = self.ctx.interner.intern(segment);
            match self.ctx.scopes.namespace(scope, name, Span::DUMMY) {
                Ok(inner) => scope = inner,
                Err(err) => {
                    self.scope_error(&err, Span::DUMMY);
                    break;
                }
            }
        }
        scope
    }

    /// Declare the items of `scope`. Namespaces and types are bound right
    /// away; functions, globals and directives are recorded for later
    /// phases.
    pub(super) fn collect_items(&mut self, items: &'a [Item], scope: ScopeId) {
        for item in items {
            match &item.kind {
                ItemKind::Namespace {
                    name,
                    name_span,
                    items,
                } => match self.ctx.scopes.namespace(scope, *name, *name_span) {
                    Ok(inner) => self.collect_items(items, inner),
                    Err(err) => self.scope_error(&err, *name_span),
                },
                ItemKind::UsingNamespace(path) => {
                    self.directives.push(Directive::Using { scope, path });
                }
                ItemKind::Alias {
                    name,
                    name_span,
                    target,
                } => self.directives.push(Directive::Alias {
                    scope,
                    name: *name,
                    name_span: *name_span,
                    target,
                }),
                ItemKind::Struct(decl) => {
                    self.declare_struct_item(scope, decl);
                }
                ItemKind::Template(decl) => self.declare_template(scope, decl, item.span),
                ItemKind::Function(decl) => self.functions.push(FunctionItem {
                    scope,
                    decl,
                    owner: None,
                }),
                ItemKind::Global(decl) => self.globals.push(GlobalItem {
                    scope,
                    decl,
                    span: item.span,
                }),
            }
        }
    }

    fn declare_struct_item(&mut self, scope: ScopeId, decl: &'a StructDecl) {
        let qualified = self.qualified_name(scope, decl.name);
        let ty = self.ctx.types.declare_struct(qualified);
        if let Err(err) = self
            .ctx
            .scopes
            .declare(scope, decl.name, Symbol::Type(ty), decl.name_span)
        {
            self.scope_error(&err, decl.name_span);
            return;
        }
        let class_scope = self
            .ctx
            .scopes
            .enter(scope, ScopeKind::Class, Some(decl.name));
        self.ctx.scopes.set_class_scope(ty, class_scope);
        self.register_struct(ty, decl, class_scope, Vec::new());
        for method in &decl.methods {
            self.functions.push(FunctionItem {
                scope: class_scope,
                decl: method,
                owner: Some(ty),
            });
        }
    }

    /// Track a declared struct until its members are defined.
    pub(super) fn register_struct(
        &mut self,
        ty: TypeId,
        decl: &'a StructDecl,
        class_scope: ScopeId,
        context: Vec<String>,
    ) -> usize {
        let index = self.structs.len();
        self.structs.push(StructItem {
            ty,
            decl,
            class_scope,
            state: StructState::Pending,
            context,
        });
        self.struct_index.insert(ty, index);
        index
    }

    fn declare_template(&mut self, scope: ScopeId, decl: &'a TemplateDecl, span: Span) {
        let (name, name_span) = match &decl.item.kind {
            ItemKind::Struct(s) => (s.name, s.name_span),
            ItemKind::Function(f) => (f.name, f.name_span),
            _ => {
                self.error(
                    ErrorCode::E1006,
                    span,
                    "only structs and functions can be templates",
                );
                return;
            }
        };
        let id = TemplateId::from_len(self.templates.len());
        match self
            .ctx
            .scopes
            .declare(scope, name, Symbol::Template(id), name_span)
        {
            Ok(symbol) => {
                let qualified = self.qualified_name(scope, name);
                self.templates.push(TemplateDef {
                    name,
                    qualified,
                    params: &decl.params,
                    decl,
                    scope,
                    symbol,
                });
            }
            Err(err) => self.scope_error(&err, name_span),
        }
    }

    /// Apply `using namespace` imports and `using X = ...` aliases in
    /// source order.
    pub(super) fn process_directives(&mut self) {
        let directives = std::mem::take(&mut self.directives);
        for directive in directives {
            match directive {
                Directive::Using { scope, path } => {
                    match self.ctx.scopes.resolve_path(&path.segments, scope) {
                        Ok(symbol) => match self.ctx.scopes.symbol(symbol).map(|s| &s.symbol) {
                            Some(Symbol::Namespace(target)) => {
                                let target = *target;
                                self.ctx.scopes.add_import(scope, target);
                            }
                            _ => {
                                let name = self.path_text(path);
                                self.error(
                                    ErrorCode::E2003,
                                    path.span,
                                    format!("`{name}` is not a namespace"),
                                );
                            }
                        },
                        Err(err) => self.scope_error(&err, path.span),
                    }
                }
                Directive::Alias {
                    scope,
                    name,
                    name_span,
                    target,
                } => {
                    let symbol = match &target.kind {
                        TypeExprKind::Path { path, args } if args.is_empty() => {
                            match self.ctx.scopes.resolve_path(&path.segments, scope) {
                                Ok(found) => match self.ctx.scopes.symbol(found).map(|s| &s.symbol) {
                                    Some(Symbol::Namespace(ns)) => Some(Symbol::Namespace(*ns)),
                                    _ => None,
                                },
                                Err(_) => None,
                            }
                        }
                        _ => None,
                    };
                    let symbol = match symbol {
                        Some(symbol) => symbol,
                        None => {
                            let ty = self.with_scope(scope, |c| c.resolve_type(target));
                            if ty.is_error() {
                                continue;
                            }
                            Symbol::Type(ty)
                        }
                    };
                    if let Err(err) = self.ctx.scopes.declare(scope, name, symbol, name_span) {
                        self.scope_error(&err, name_span);
                    }
                }
            }
        }
    }

    /// Resolve every recorded function signature and queue its body.
    pub(super) fn declare_functions(&mut self) {
        let functions = std::mem::take(&mut self.functions);
        for item in functions {
            if let Some(id) = self.declare_function_item(item.scope, item.decl, item.owner) {
                self.queue.push_back(id);
            }
        }
    }

    /// Resolve the signature of a free function or method and bind it in
    /// its overload set.
    pub(super) fn declare_function_item(
        &mut self,
        scope: ScopeId,
        decl: &'a FunctionDecl,
        owner: Option<TypeId>,
    ) -> Option<FuncId> {
        let name = match owner {
            Some(owner) => format!("{}::{}", self.display_type(owner), self.text(decl.name)),
            None => self.qualified_name(scope, decl.name),
        };
        let func = self.function_signature(decl, scope, name, owner);
        if self.is_redefinition(scope, decl, &func) {
            return None;
        }
        let info = FuncInfo {
            decl: Some(decl),
            scope,
            context: self.instantiation.clone(),
            site: decl.name_span,
        };
        let id = self.push_function(func, info);
        if let Err(err) =
            self.ctx
                .scopes
                .declare_function(scope, decl.name, Callee::Func(id), decl.name_span)
        {
            self.scope_error(&err, decl.name_span);
        }
        Some(id)
    }

    /// Build the IR function shell: name, kind, return type and parameter
    /// slots. Types are resolved from `scope`.
    pub(super) fn function_signature(
        &mut self,
        decl: &'a FunctionDecl,
        scope: ScopeId,
        name: String,
        owner: Option<TypeId>,
    ) -> IrFunction {
        self.with_scope(scope, |c| {
            let ret = if decl.ret.is_auto() {
                c.error(
                    ErrorCode::E2005,
                    decl.ret.span,
                    "return type cannot be `auto`",
                );
                TypeId::ERROR
            } else {
                c.resolve_type(&decl.ret)
            };
            let kind = owner.map_or(FunctionKind::Free, |owner| FunctionKind::Method { owner });
            let mut func = IrFunction::new(name, kind, ret, decl.name_span);
            if let Some(owner) = owner {
                let this = c.ctx.types.ref_of(owner);
                func.add_param("this", this, false);
            }
            for param in &decl.params {
                let ty = if param.ty.is_auto() {
                    c.error(
                        ErrorCode::E2005,
                        param.ty.span,
                        "parameter type cannot be `auto`",
                    );
                    TypeId::ERROR
                } else {
                    c.resolve_type(&param.ty)
                };
                let ty = c.check_storage_type(ty, param.ty.span, "parameter", true);
                let name = c.text(param.name);
                func.add_param(name, ty, param.is_const);
            }
            func
        })
    }

    /// Whether an overload with the same parameter types already exists in
    /// `scope`; reports E2006 if so.
    fn is_redefinition(&mut self, scope: ScopeId, decl: &FunctionDecl, func: &IrFunction) -> bool {
        let Some(symbol) = self.ctx.scopes.binding(scope, decl.name) else {
            return false;
        };
        let Some(data) = self.ctx.scopes.symbol(symbol) else {
            return false;
        };
        let Symbol::Functions(set) = &data.symbol else {
            return false;
        };
        let previous_span = data.span;
        let params: Vec<TypeId> = func.param_types().collect();
        let clash = set.iter().any(|callee| match callee {
            Callee::Func(other) => self.module.function(*other).is_some_and(|other| {
                let other: Vec<TypeId> = other.param_types().collect();
                other.len() == params.len()
                    && other
                        .iter()
                        .zip(&params)
                        .all(|(a, b)| self.ctx.types.structurally_equal(*a, *b))
            }),
            Callee::Extern(_) => false,
        });
        if clash {
            let name = func.name.clone();
            self.report(
                Diagnostic::error(ErrorCode::E2006)
                    .with_message(format!("`{name}` is already defined with these parameter types"))
                    .with_label(decl.name_span, "redefined here")
                    .with_secondary_label(previous_span, "previous definition"),
            );
        }
        clash
    }

    /// Bind `const` scalar globals with constant initializers before struct
    /// layouts and signatures are resolved, so those can use them as span
    /// lengths. Everything else is left for [`Self::check_globals`].
    pub(super) fn declare_constant_globals(&mut self) {
        let globals = std::mem::take(&mut self.globals);
        let mut deferred = Vec::with_capacity(globals.len());
        for global in globals {
            if !(global.decl.is_const && self.declare_constant_global(&global)) {
                deferred.push(global);
            }
        }
        self.globals = deferred;
    }

    fn declare_constant_global(&mut self, global: &GlobalItem<'a>) -> bool {
        let decl = global.decl;
        let Some(init) = decl.init else {
            return false;
        };
        if decl.ty.is_ref() {
            return false;
        }
        let reported = self.diagnostics.len();
        let (ty, constant) = self.with_scope(global.scope, |c| {
            c.with_body(BodyState::new(None, TypeId::VOID), |c| {
                let value = if decl.ty.is_auto() {
                    let value = c.check_expr(init);
                    let ty = c.ctx.types.strip_ref(value.ty);
                    c.coerce(value, ty)
                } else {
                    let ty = c.resolve_type(&decl.ty);
                    c.check_initializer(init, ty)
                };
                (value.ty, c.evaluate_const(&value))
            })
            .0
        });
        let scalar = [TypeId::INT, TypeId::FLOAT, TypeId::DOUBLE, TypeId::BOOL].contains(&ty);
        let Some(constant) = constant.filter(|_| scalar && !self.has_errors_since(reported)) else {
            // Checked again, with full diagnostics, as an ordinary global.
            self.diagnostics.truncate(reported);
            return false;
        };

        let id = GlobalId::from_len(self.module.globals.len());
        self.global_consts.insert(id, constant);
        let name = self.qualified_name(global.scope, decl.name);
        self.module.globals.push(IrGlobal {
            name,
            ty,
            is_const: true,
            constant: Some(constant),
            span: decl.name_span,
        });
        let symbol = Symbol::Constant {
            ty,
            value: constant,
        };
        if let Err(err) = self
            .ctx
            .scopes
            .declare(global.scope, decl.name, symbol, decl.name_span)
        {
            self.scope_error(&err, decl.name_span);
        }
        self.const_inits.push(IrStmt::new(
            IrStmtKind::Assign {
                place: IrPlace::new(PlaceKind::Global(id), ty),
                op: None,
                value: IrExpr::constant(constant, global.span),
            },
            global.span,
        ));
        true
    }

    fn has_errors_since(&self, reported: usize) -> bool {
        self.diagnostics.iter().skip(reported).any(Diagnostic::is_error)
    }

    /// Declare globals in source order and build the initializer function.
    pub(super) fn check_globals(&mut self) {
        let globals = std::mem::take(&mut self.globals);
        if globals.is_empty() && self.const_inits.is_empty() {
            return;
        }
        let const_inits = std::mem::take(&mut self.const_inits);
        let (stmts, body) = self.with_body(BodyState::new(None, TypeId::VOID), |c| {
            let mut stmts = const_inits;
            for global in &globals {
                c.with_scope(global.scope, |c| c.check_global(global, &mut stmts));
            }
            stmts
        });
        if stmts.is_empty() {
            return;
        }
        let mut init = IrFunction::new("$init", FunctionKind::Init, TypeId::VOID, Span::DUMMY);
        init.locals = body.locals;
        init.body = stmts;
        let info = FuncInfo {
            decl: None,
            scope: ScopeId::GLOBAL,
            context: Vec::new(),
            site: Span::DUMMY,
        };
        let id = self.push_function(init, info);
        self.module.init = Some(id);
    }

    fn check_global(&mut self, global: &GlobalItem<'a>, stmts: &mut Vec<IrStmt>) {
        let decl = global.decl;
        let (ty, value) = if decl.ty.is_auto() {
            match decl.init {
                Some(init) => {
                    let value = self.check_expr(init);
                    let ty = self.ctx.types.strip_ref(value.ty);
                    (ty, Some(self.coerce(value, ty)))
                }
                None => {
                    let name = self.text(decl.name);
                    self.error(
                        ErrorCode::E2005,
                        decl.name_span,
                        format!("cannot infer the type of `{name}` without an initializer"),
                    );
                    (TypeId::ERROR, None)
                }
            }
        } else {
            let ty = self.resolve_type(&decl.ty);
            let value = decl.init.map(|init| self.check_initializer(init, ty));
            (ty, value)
        };
        let ty = self.check_storage_type(ty, decl.ty.span, "global", false);
        if decl.is_const && value.is_none() && !ty.is_error() {
            let name = self.text(decl.name);
            self.error(
                ErrorCode::E2014,
                decl.name_span,
                format!("`const` global `{name}` needs an initializer"),
            );
        }

        let id = GlobalId::from_len(self.module.globals.len());
        let constant = if decl.is_const {
            value.as_ref().and_then(|v| self.evaluate_const(v))
        } else {
            None
        };
        if let Some(constant) = constant {
            self.global_consts.insert(id, constant);
        }
        let name = self.qualified_name(global.scope, decl.name);
        self.module.globals.push(IrGlobal {
            name,
            ty,
            is_const: decl.is_const,
            constant,
            span: decl.name_span,
        });
        let symbol = Symbol::Variable {
            ty,
            storage: Storage::Global(id),
            is_const: decl.is_const,
        };
        if let Err(err) = self
            .ctx
            .scopes
            .declare(global.scope, decl.name, symbol, decl.name_span)
        {
            self.scope_error(&err, decl.name_span);
        }

        let value = value.or_else(|| self.default_value(ty, global.span));
        if let Some(value) = value {
            stmts.push(IrStmt::new(
                IrStmtKind::Assign {
                    place: IrPlace::new(PlaceKind::Global(id), ty),
                    op: None,
                    value,
                },
                global.span,
            ));
        }
    }

    /// Reject types a `what` cannot be declared with.
    pub(super) fn check_storage_type(
        &mut self,
        ty: TypeId,
        span: Span,
        what: &str,
        allow_ref: bool,
    ) -> TypeId {
        if ty == TypeId::VOID {
            self.error(
                ErrorCode::E2001,
                span,
                format!("{what} cannot have type `void`"),
            );
            return TypeId::ERROR;
        }
        if !allow_ref && self.ctx.types.flags(ty).contains(TypeFlags::IS_REF) {
            self.error(ErrorCode::E2001, span, format!("{what} cannot be a reference"));
            return TypeId::ERROR;
        }
        ty
    }
}
