//! Function bodies and statements.

use snex_diagnostic::{type_mismatch, ErrorCode};
use snex_ir::{AssignOp, BinaryOp, ConstValue, ExprId, Name, Span, StmtId, StmtKind, TypeExpr};
use snex_types::{FuncId, ScopeKind, Storage, Symbol, TypeId, TypeKind};

use super::expr::{convert_to, Lowered};
use super::{BodyState, Checker, DeclaredLocal};
use crate::ir::{IrExpr, IrExprKind, IrPlace, IrStmt, IrStmtKind, PlaceKind};

impl<'a> Checker<'a> {
    /// Check the body of `func` and store the lowered statements.
    #[tracing::instrument(level = "trace", skip(self))]
    pub(super) fn check_function_body(&mut self, func: FuncId) {
        let Some(info) = self.funcs.get(func.index()) else {
            return;
        };
        let Some(decl) = info.decl else {
            return;
        };
        let (scope, context, site) = (info.scope, info.context.clone(), info.site);
        let Some(function) = self.module.function_mut(func) else {
            return;
        };
        // The stored locals stay in place: a self-call reads its parameter
        // types from them while the body is checked.
        let locals = function.locals.clone();
        let params = function.params.clone();
        let (ret, is_method, name) = (function.ret, function.is_method(), function.name.clone());

        let mut body = BodyState::new(Some(func), ret);
        body.locals = locals;
        let skip = usize::from(is_method);
        if is_method {
            body.this = params.first().copied();
        }
        let fn_scope = self.ctx.scopes.enter(scope, ScopeKind::Function, None);
        let errors = self.error_count();

        let (stmts, body) = self.with_instantiation(context.clone(), |c| {
            c.with_scope(fn_scope, |c| {
                c.with_body(body, |c| {
                    for (param, &local) in decl.params.iter().zip(params.iter().skip(skip)) {
                        let ty = c
                            .body
                            .as_ref()
                            .and_then(|b| b.locals.get(local.index()))
                            .map_or(TypeId::ERROR, |l| l.ty);
                        let symbol = Symbol::Variable {
                            ty,
                            storage: Storage::Local(local),
                            is_const: param.is_const,
                        };
                        if let Err(err) = c.ctx.scopes.declare(c.scope, param.name, symbol, param.span) {
                            c.scope_error(&err, param.span);
                        }
                    }
                    let stmts = match decl.body {
                        Some(block) => c.check_top_block(block),
                        None => Vec::new(),
                    };
                    if decl.body.is_some()
                        && ret != TypeId::VOID
                        && !ret.is_error()
                        && !always_returns(&stmts)
                    {
                        c.error(
                            ErrorCode::E2010,
                            decl.name_span,
                            format!("`{name}` does not return a value on every path"),
                        );
                    }
                    c.report_unused();
                    stmts
                })
            })
        });

        if let Some(function) = self.module.function_mut(func) {
            function.locals = body.locals;
            function.body = stmts;
        }
        if self.error_count() > errors {
            if let Some((frame, outer)) = context.split_last() {
                let frame = frame.clone();
                self.with_instantiation(outer.to_vec(), |c| c.instantiation_failed(&frame, site));
            }
        }
    }

    /// The outermost block shares the scope of the parameters.
    fn check_top_block(&mut self, block: StmtId) -> Vec<IrStmt> {
        let ast = self.ast;
        match &ast.stmt(block).kind {
            StmtKind::Block(ids) => self.check_stmts(ids),
            _ => self.check_stmt(block).into_iter().collect(),
        }
    }

    fn report_unused(&mut self) {
        let Some(body) = self.body.as_mut() else {
            return;
        };
        let declared = std::mem::take(&mut body.declared);
        let unused: Vec<(Name, Span)> = declared
            .iter()
            .filter(|d| !body.used.contains(&d.local))
            .map(|d| (d.name, d.span))
            .collect();
        for (name, span) in unused {
            let text = self.text(name);
            if !text.starts_with('_') {
                self.warning(ErrorCode::W2002, span, format!("unused variable `{text}`"));
            }
        }
    }

    fn check_stmts(&mut self, ids: &'a [StmtId]) -> Vec<IrStmt> {
        let ast = self.ast;
        let mut out = Vec::with_capacity(ids.len());
        let mut terminated = false;
        let mut warned = false;
        for &id in ids {
            let stmt = ast.stmt(id);
            if terminated && !warned && !matches!(stmt.kind, StmtKind::Empty) {
                self.warning(ErrorCode::W2003, stmt.span, "unreachable code");
                warned = true;
            }
            if let Some(lowered) = self.check_stmt(id) {
                terminated |= lowered.is_terminator();
                out.push(lowered);
            }
        }
        out
    }

    fn check_stmt(&mut self, id: StmtId) -> Option<IrStmt> {
        snex_stack::ensure_sufficient_stack(|| self.check_stmt_inner(id))
    }

    fn check_stmt_inner(&mut self, id: StmtId) -> Option<IrStmt> {
        let ast = self.ast;
        let stmt = ast.stmt(id);
        let span = stmt.span;
        let kind = match &stmt.kind {
            StmtKind::Block(ids) => IrStmtKind::Block(self.in_block(|c| c.check_stmts(ids))),
            StmtKind::Local {
                ty,
                name,
                name_span,
                init,
                is_const,
            } => return self.check_local(ty, *name, *name_span, *init, *is_const, span),
            StmtKind::Expr(expr) => IrStmtKind::Expr(self.check_expr(*expr)),
            StmtKind::Assign { op, target, value } => {
                return self.check_assign(*op, *target, *value, span)
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.check_expr(*cond);
                let cond = self.condition(cond);
                let then_body = self.branch(*then_branch);
                let else_body = match else_branch {
                    Some(else_branch) => self.branch(*else_branch),
                    None => Vec::new(),
                };
                IrStmtKind::If {
                    cond,
                    then_body,
                    else_body,
                }
            }
            StmtKind::While { cond, body } => {
                let cond = self.check_expr(*cond);
                let cond = self.condition(cond);
                let body = self.loop_body(*body);
                IrStmtKind::While { cond, body }
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => self.in_block(|c| {
                let init: Vec<IrStmt> = init.and_then(|s| c.check_stmt(s)).into_iter().collect();
                let cond = cond.map(|e| {
                    let value = c.check_expr(e);
                    c.condition(value)
                });
                let update: Vec<IrStmt> = update.and_then(|s| c.check_stmt(s)).into_iter().collect();
                let body = c.loop_body(*body);
                IrStmtKind::For {
                    init,
                    cond,
                    update,
                    body,
                }
            }),
            StmtKind::RangeFor {
                ty,
                name,
                name_span,
                iterable,
                body,
            } => return self.check_range_for(ty, *name, *name_span, *iterable, *body, span),
            StmtKind::Return(value) => IrStmtKind::Return(self.check_return(*value, span)),
            StmtKind::Break | StmtKind::Continue => {
                let is_break = matches!(stmt.kind, StmtKind::Break);
                let in_loop = self.body.as_ref().is_some_and(|b| b.loop_depth > 0);
                if !in_loop {
                    let word = if is_break { "break" } else { "continue" };
                    self.error(
                        ErrorCode::E2011,
                        span,
                        format!("`{word}` outside of a loop"),
                    );
                    return None;
                }
                if is_break {
                    IrStmtKind::Break
                } else {
                    IrStmtKind::Continue
                }
            }
            StmtKind::Empty | StmtKind::Error => return None,
        };
        Some(IrStmt::new(kind, span))
    }

    /// Body of an `if` branch, in its own scope.
    fn branch(&mut self, id: StmtId) -> Vec<IrStmt> {
        let ast = self.ast;
        self.in_block(|c| match &ast.stmt(id).kind {
            StmtKind::Block(ids) => c.check_stmts(ids),
            _ => c.check_stmt(id).into_iter().collect(),
        })
    }

    fn loop_body(&mut self, id: StmtId) -> Vec<IrStmt> {
        self.set_loop_depth(1);
        let body = self.branch(id);
        self.set_loop_depth(-1);
        body
    }

    fn set_loop_depth(&mut self, delta: i32) {
        if let Some(body) = self.body.as_mut() {
            body.loop_depth = body.loop_depth.saturating_add_signed(delta);
        }
    }

    fn check_local(
        &mut self,
        ty_expr: &'a TypeExpr,
        name: Name,
        name_span: Span,
        init: Option<ExprId>,
        is_const: bool,
        span: Span,
    ) -> Option<IrStmt> {
        let (local, value) = if ty_expr.is_ref() {
            self.reference_local(ty_expr, name, init, is_const, span)?
        } else {
            let (ty, value) = if ty_expr.is_auto() {
                match init {
                    Some(init) => {
                        let value = self.check_expr(init);
                        let ty = self.ctx.types.strip_ref(value.ty);
                        (ty, Some(value))
                    }
                    None => {
                        let text = self.text(name);
                        self.error(
                            ErrorCode::E2005,
                            name_span,
                            format!("cannot infer the type of `{text}` without an initializer"),
                        );
                        (TypeId::ERROR, None)
                    }
                }
            } else {
                let ty = self.resolve_type(ty_expr);
                (ty, init.map(|init| self.check_initializer(init, ty)))
            };
            let ty = self.check_storage_type(ty, ty_expr.span, "variable", false);
            if is_const && init.is_none() {
                let text = self.text(name);
                self.error(
                    ErrorCode::E2014,
                    name_span,
                    format!("`const` variable `{text}` needs an initializer"),
                );
            }
            let value = match value {
                Some(value) => value,
                None => self
                    .default_value(ty, span)
                    .unwrap_or_else(|| IrExpr::new(IrExprKind::Zero, ty, span)),
            };
            let text = self.text(name);
            let local = self.add_local(text, ty, is_const);
            if is_const {
                if let Some(constant) = self.evaluate_const(&value) {
                    if let Some(body) = self.body.as_mut() {
                        body.const_locals.insert(local, constant);
                    }
                }
            }
            (local, value)
        };

        let ty = value.ty;
        let symbol = Symbol::Variable {
            ty: self
                .body
                .as_ref()
                .and_then(|b| b.locals.get(local.index()))
                .map_or(ty, |l| l.ty),
            storage: Storage::Local(local),
            is_const,
        };
        match self.ctx.scopes.declare(self.scope, name, symbol, name_span) {
            Ok(_) => {
                if let Some(body) = self.body.as_mut() {
                    body.declared.push(DeclaredLocal {
                        local,
                        name,
                        span: name_span,
                    });
                }
            }
            Err(err) => self.scope_error(&err, name_span),
        }
        Some(IrStmt::new(IrStmtKind::Local { local, init: value }, span))
    }

    /// `T& r = place;` stores the address of `place`. Only `const`
    /// references bind to temporaries.
    fn reference_local(
        &mut self,
        ty_expr: &'a TypeExpr,
        name: Name,
        init: Option<ExprId>,
        is_const: bool,
        span: Span,
    ) -> Option<(snex_types::LocalId, IrExpr)> {
        let text = self.text(name);
        let Some(init) = init else {
            self.error(
                ErrorCode::E2009,
                span,
                format!("reference `{text}` must be initialized"),
            );
            return None;
        };
        let declared = if ty_expr.is_auto() {
            None
        } else {
            let ty = self.resolve_type(ty_expr);
            match self.ctx.types.kind(ty) {
                TypeKind::Ref { inner } => Some(*inner),
                _ => Some(TypeId::ERROR),
            }
        };
        let lowered = self.lower(init, declared);
        let inner = declared.unwrap_or_else(|| lowered.ty());
        if inner.is_error() || lowered.ty().is_error() {
            let ref_ty = if inner.is_error() { TypeId::ERROR } else { self.ctx.types.ref_of(inner) };
            let local = self.add_local(text, ref_ty, is_const);
            return Some((local, IrExpr::error(span)));
        }
        let value = match lowered {
            Lowered::Place(place, place_span) if self.ctx.types.structurally_equal(place.ty, inner) => {
                if !is_const && self.is_const_place(&place) {
                    self.error(
                        ErrorCode::E2009,
                        place_span,
                        format!("cannot bind non-const reference `{text}` to a `const` variable"),
                    );
                    IrExpr::error(span)
                } else {
                    self.address_of(place, place_span)
                }
            }
            other if is_const => {
                let value = self.coerce(other.into_value(), inner);
                self.materialize(value)
            }
            other => {
                let (expected, found) = (self.display_type(inner), self.display_type(other.ty()));
                if self.ctx.types.structurally_equal(other.ty(), inner) {
                    self.error(
                        ErrorCode::E2009,
                        other.span(),
                        format!("cannot bind reference `{text}` to a temporary"),
                    );
                } else {
                    self.report(type_mismatch(
                        other.span(),
                        &expected,
                        &found,
                        "a reference must bind to a variable of the same type",
                    ));
                }
                IrExpr::error(span)
            }
        };
        let ref_ty = self.ctx.types.ref_of(inner);
        let local = self.add_local(text, ref_ty, is_const);
        let mut value = value;
        if !value.is_error() {
            value.ty = ref_ty;
        }
        Some((local, value))
    }

    fn check_assign(
        &mut self,
        op: AssignOp,
        target: ExprId,
        value: ExprId,
        span: Span,
    ) -> Option<IrStmt> {
        let target = self.lower(target, None);
        let place = match target {
            Lowered::Place(place, _) => place,
            Lowered::Value(invalid) => {
                if !invalid.is_error() {
                    self.error(
                        ErrorCode::E2009,
                        invalid.span,
                        format!("cannot assign to this expression with `{}`", op.as_symbol()),
                    );
                }
                self.check_expr(value);
                return None;
            }
        };
        if place.ty.is_error() {
            self.check_expr(value);
            return None;
        }
        if self.is_const_place(&place) {
            self.error(
                ErrorCode::E2009,
                span,
                "cannot assign to a `const` variable",
            );
        }
        let (op, value) = match op.binary() {
            None => (None, self.check_initializer(value, place.ty)),
            Some(bop) => {
                let rhs = self.check_expr(value);
                (Some(bop), self.compound_operand(bop, &place, rhs)?)
            }
        };
        Some(IrStmt::new(IrStmtKind::Assign { place, op, value }, span))
    }

    /// Right operand of `place op= rhs`, converted to the type the
    /// operation is performed in.
    fn compound_operand(&mut self, op: BinaryOp, place: &IrPlace, rhs: IrExpr) -> Option<IrExpr> {
        if rhs.is_error() {
            return None;
        }
        let lhs = self.ctx.types.as_primitive(place.ty);
        let right = self.ctx.types.as_primitive(rhs.ty);
        let common = match (lhs, right) {
            (Some(a), Some(b)) if op.is_integer_only() => {
                (a == snex_ir::Primitive::Int && b == snex_ir::Primitive::Int).then_some(a)
            }
            (Some(a), Some(b)) => a.promote(b),
            _ => None,
        };
        match common {
            Some(common) => Some(convert_to(rhs, common)),
            None => {
                let (a, b) = (self.display_type(place.ty), self.display_type(rhs.ty));
                self.error(
                    ErrorCode::E2008,
                    rhs.span,
                    format!("operator `{}=` cannot be applied to `{a}` and `{b}`", op.as_symbol()),
                );
                None
            }
        }
    }

    fn check_return(&mut self, value: Option<ExprId>, span: Span) -> Option<IrExpr> {
        let ret = self.body.as_ref().map_or(TypeId::VOID, |b| b.ret);
        match value {
            Some(value) if ret == TypeId::VOID => {
                let value = self.check_expr(value);
                if !value.is_error() {
                    self.error(
                        ErrorCode::E2001,
                        value.span,
                        "a `void` function cannot return a value",
                    );
                }
                None
            }
            Some(value) => Some(self.check_initializer(value, ret)),
            None => {
                if ret != TypeId::VOID && !ret.is_error() {
                    let ty = self.display_type(ret);
                    self.error(
                        ErrorCode::E2001,
                        span,
                        format!("function returning `{ty}` must return a value"),
                    );
                }
                None
            }
        }
    }

    /// `for (T x : seq) body` becomes a counted loop over a reference to
    /// `seq`:
    ///
    /// ```text
    /// for ($range = &seq, $i = 0; $i < len; $i += 1) { T x = (*$range)[$i]; body }
    /// ```
    fn check_range_for(
        &mut self,
        ty_expr: &'a TypeExpr,
        name: Name,
        name_span: Span,
        iterable: ExprId,
        body: StmtId,
        span: Span,
    ) -> Option<IrStmt> {
        self.in_block(|c| {
            let lowered = c.lower(iterable, None);
            let seq_ty = lowered.ty();
            let shape = match c.ctx.types.kind(seq_ty) {
                TypeKind::Span { elem, len } => Some((*elem, Some(*len))),
                TypeKind::Dyn { elem } => Some((*elem, None)),
                _ => None,
            };
            let Some((elem, len)) = shape else {
                if !seq_ty.is_error() {
                    let ty = c.display_type(seq_ty);
                    c.error(
                        ErrorCode::E2008,
                        lowered.span(),
                        format!("cannot iterate over `{ty}`"),
                    );
                }
                let text = c.text(name);
                let local = c.add_local(text, TypeId::ERROR, false);
                let symbol = Symbol::Variable {
                    ty: TypeId::ERROR,
                    storage: Storage::Local(local),
                    is_const: false,
                };
                let _ = c.ctx.scopes.declare(c.scope, name, symbol, name_span);
                c.loop_body(body);
                return None;
            };

            let place = c.lowered_place(lowered);
            let range_ref = c.address_of(place, span);
            let range = c.add_local("$range", range_ref.ty, false);
            let index = c.add_local("$i", TypeId::INT, false);
            let range_ty = range_ref.ty;
            let seq = move || {
                IrPlace::new(
                    PlaceKind::Deref(Box::new(IrExpr::load(IrPlace::local(range, range_ty), span))),
                    seq_ty,
                )
            };
            let counter = || IrExpr::load(IrPlace::local(index, TypeId::INT), span);
            let bound = match len {
                Some(len) => IrExpr::constant(ConstValue::Int(i32::try_from(len).unwrap_or(i32::MAX)), span),
                None => IrExpr::new(IrExprKind::Len(Box::new(seq())), TypeId::INT, span),
            };
            let cond = IrExpr::new(
                IrExprKind::Binary {
                    op: BinaryOp::Lt,
                    lhs: Box::new(counter()),
                    rhs: Box::new(bound),
                },
                TypeId::BOOL,
                span,
            );
            let element = IrPlace::new(
                PlaceKind::Index {
                    base: Box::new(seq()),
                    index: Box::new(counter()),
                    checked: false,
                },
                elem,
            );

            let text = c.text(name);
            let (var, var_ty, init) = if ty_expr.is_ref() {
                let declared = if ty_expr.is_auto() {
                    elem
                } else {
                    let ty = c.resolve_type(ty_expr);
                    c.ctx.types.strip_ref(ty)
                };
                if !declared.is_error() && !c.ctx.types.structurally_equal(declared, elem) {
                    let (expected, found) = (c.display_type(declared), c.display_type(elem));
                    c.report(type_mismatch(
                        ty_expr.span,
                        &expected,
                        &found,
                        "loop reference must match the element type",
                    ));
                }
                let ref_ty = c.ctx.types.ref_of(elem);
                let var = c.add_local(text, ref_ty, false);
                let address = IrExpr::new(IrExprKind::AddressOf(Box::new(element)), ref_ty, span);
                (var, ref_ty, address)
            } else {
                let ty = if ty_expr.is_auto() { elem } else { c.resolve_type(ty_expr) };
                let ty = c.check_storage_type(ty, ty_expr.span, "variable", false);
                let value = IrExpr::load(element, span);
                let value = c.coerce(value, ty);
                let var = c.add_local(text, ty, false);
                (var, ty, value)
            };
            let symbol = Symbol::Variable {
                ty: var_ty,
                storage: Storage::Local(var),
                is_const: false,
            };
            if let Err(err) = c.ctx.scopes.declare(c.scope, name, symbol, name_span) {
                c.scope_error(&err, name_span);
            }
            if let Some(state) = c.body.as_mut() {
                state.declared.push(DeclaredLocal {
                    local: var,
                    name,
                    span: name_span,
                });
            }

            let mut loop_body = vec![IrStmt::new(IrStmtKind::Local { local: var, init }, span)];
            loop_body.extend(c.loop_body(body));
            let init = vec![
                IrStmt::new(IrStmtKind::Local { local: range, init: range_ref }, span),
                IrStmt::new(
                    IrStmtKind::Local {
                        local: index,
                        init: IrExpr::constant(ConstValue::Int(0), span),
                    },
                    span,
                ),
            ];
            let update = vec![IrStmt::new(
                IrStmtKind::Assign {
                    place: IrPlace::local(index, TypeId::INT),
                    op: Some(BinaryOp::Add),
                    value: IrExpr::constant(ConstValue::Int(1), span),
                },
                span,
            )];
            Some(IrStmt::new(
                IrStmtKind::For {
                    init,
                    cond: Some(cond),
                    update,
                    body: loop_body,
                },
                span,
            ))
        })
    }
}

/// Whether control can never fall off the end of `stmts`.
pub(crate) fn always_returns(stmts: &[IrStmt]) -> bool {
    stmts.iter().any(stmt_returns)
}

fn stmt_returns(stmt: &IrStmt) -> bool {
    match &stmt.kind {
        IrStmtKind::Return(_) => true,
        IrStmtKind::Block(body) => always_returns(body),
        IrStmtKind::If {
            then_body,
            else_body,
            ..
        } => always_returns(then_body) && always_returns(else_body),
        IrStmtKind::While { cond, body } => is_true(Some(cond)) && !breaks(body),
        IrStmtKind::For { cond, body, .. } => is_true(cond.as_ref()) && !breaks(body),
        _ => false,
    }
}

/// Missing or constant-true loop condition: `for (;;)`, `while (true)`,
/// `while (1)`.
fn is_true(cond: Option<&IrExpr>) -> bool {
    let Some(cond) = cond else {
        return true;
    };
    match &cond.kind {
        IrExprKind::Const(value) => !value.is_zero(),
        IrExprKind::Convert(inner) => inner.as_const().is_some_and(|v| !v.is_zero()),
        _ => false,
    }
}

/// Whether `stmts` contain a `break` leaving the enclosing loop.
fn breaks(stmts: &[IrStmt]) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        IrStmtKind::Break => true,
        IrStmtKind::Block(body) => breaks(body),
        IrStmtKind::If {
            then_body,
            else_body,
            ..
        } => breaks(then_body) || breaks(else_body),
        _ => false,
    })
}
