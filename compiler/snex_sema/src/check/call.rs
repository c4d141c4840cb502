//! Calls, methods and overload resolution.
//!
//! Every candidate of an overload set is ranked by the conversions its
//! arguments need: an exact match costs 0, widening (or boxing into
//! `dynamic`) costs 1 and narrowing costs 2 per argument. `bool` never
//! converts implicitly. The cheapest viable candidate wins; a tie is
//! ambiguous.

use smallvec::SmallVec;
use snex_diagnostic::{type_mismatch, Diagnostic, ErrorCode};
use snex_ir::{ConstValue, ExprId, ExprKind, Name, Span, TemplateArgExpr};
use snex_types::{Callee, Symbol, TemplateId, TypeId, TypeKind};

use super::expr::Lowered;
use super::Checker;
use crate::ir::{FunctionKind, IrExpr, IrExprKind, IrPlace, PlaceKind};

#[derive(Copy, Clone)]
struct ParamInfo {
    ty: TypeId,
    is_const: bool,
}

/// One entry of an overload set, `this` excluded.
struct Candidate {
    callee: Callee,
    name: String,
    params: SmallVec<[ParamInfo; 4]>,
    ret: TypeId,
    owner: Option<TypeId>,
}

impl<'a> Checker<'a> {
    pub(super) fn check_call(
        &mut self,
        callee: ExprId,
        template_args: &'a [TemplateArgExpr],
        args: &'a [ExprId],
        span: Span,
    ) -> IrExpr {
        let ast = self.ast;
        let callee_expr = ast.expr(callee);
        match &callee_expr.kind {
            ExprKind::Path(path) => {
                let symbol = match self.ctx.scopes.resolve_path(&path.segments, self.scope) {
                    Ok(symbol) => symbol,
                    Err(err) => {
                        self.scope_error(&err, path.span);
                        self.lower_args(args, &[]);
                        return IrExpr::error(span);
                    }
                };
                let found = self.ctx.scopes.symbol(symbol).map(|s| s.symbol.clone());
                let name = self.path_text(path);
                match found {
                    Some(Symbol::Functions(set)) => {
                        if !template_args.is_empty() {
                            self.error(
                                ErrorCode::E2016,
                                path.span,
                                format!("`{name}` is not a template"),
                            );
                            return IrExpr::error(span);
                        }
                        let candidates: Vec<Candidate> =
                            set.iter().filter_map(|&c| self.candidate(c)).collect();
                        self.call_overloads(&name, candidates, None, args, span)
                    }
                    Some(Symbol::Template(template)) => {
                        self.call_template(template, &name, template_args, args, span)
                    }
                    Some(other) => {
                        self.lower_args(args, &[]);
                        self.error(
                            ErrorCode::E2008,
                            callee_expr.span,
                            format!("`{name}` is a {}, not a function", other.describe()),
                        );
                        IrExpr::error(span)
                    }
                    None => IrExpr::error(span),
                }
            }
            ExprKind::Member {
                base,
                name,
                name_span,
            } => {
                if !template_args.is_empty() {
                    self.error(
                        ErrorCode::E2016,
                        *name_span,
                        "methods cannot take template arguments",
                    );
                    return IrExpr::error(span);
                }
                self.check_method_call(*base, *name, *name_span, args, span)
            }
            _ => {
                self.check_expr(callee);
                self.lower_args(args, &[]);
                self.error(
                    ErrorCode::E2008,
                    callee_expr.span,
                    "expression cannot be called",
                );
                IrExpr::error(span)
            }
        }
    }

    fn check_method_call(
        &mut self,
        base: ExprId,
        name: Name,
        name_span: Span,
        args: &'a [ExprId],
        span: Span,
    ) -> IrExpr {
        let receiver = self.lower(base, None);
        let base_ty = receiver.ty();
        if base_ty.is_error() {
            self.lower_args(args, &[]);
            return IrExpr::error(span);
        }
        let method = self.text(name);

        if let TypeKind::Span { .. } | TypeKind::Dyn { .. } = self.ctx.types.kind(base_ty) {
            if method == "size" {
                if !args.is_empty() {
                    self.lower_args(args, &[]);
                    self.error(
                        ErrorCode::E2004,
                        span,
                        format!("`size` expects 0 arguments, found {}", args.len()),
                    );
                    return IrExpr::error(span);
                }
                return self.size_of(receiver, span);
            }
        }

        let set = self
            .ctx
            .scopes
            .class_scope(base_ty)
            .and_then(|scope| self.ctx.scopes.binding(scope, name))
            .and_then(|symbol| self.ctx.scopes.symbol(symbol))
            .map(|data| data.symbol.clone());
        let ty_name = self.display_type(base_ty);
        match set {
            Some(Symbol::Functions(set)) => {
                let candidates: Vec<Candidate> =
                    set.iter().filter_map(|&c| self.candidate(c)).collect();
                let place = self.lowered_place(receiver);
                let receiver = self.address_of(place, span);
                let qualified = format!("{ty_name}::{method}");
                self.call_overloads(&qualified, candidates, Some(receiver), args, span)
            }
            Some(Symbol::Field { .. }) => {
                self.lower_args(args, &[]);
                self.error(
                    ErrorCode::E2008,
                    name_span,
                    format!("member `{method}` of `{ty_name}` is not a method"),
                );
                IrExpr::error(span)
            }
            _ => {
                self.lower_args(args, &[]);
                self.error(
                    ErrorCode::E2015,
                    name_span,
                    format!("no method named `{method}` in `{ty_name}`"),
                );
                IrExpr::error(span)
            }
        }
    }

    /// `.size()` of a span is its constant length; a dyn reads it at runtime.
    fn size_of(&mut self, receiver: Lowered, span: Span) -> IrExpr {
        if let Some(len) = self.ctx.types.span_len(receiver.ty()) {
            let len = i32::try_from(len).unwrap_or(i32::MAX);
            return IrExpr::constant(ConstValue::Int(len), span);
        }
        let place = self.lowered_place(receiver);
        IrExpr::new(IrExprKind::Len(Box::new(place)), TypeId::INT, span)
    }

    fn call_template(
        &mut self,
        template: TemplateId,
        name: &str,
        template_args: &'a [TemplateArgExpr],
        args: &'a [ExprId],
        span: Span,
    ) -> IrExpr {
        let (bound, lowered) = if template_args.is_empty() {
            let lowered = self.lower_args(args, &[]);
            if lowered.iter().any(|a| a.ty().is_error()) {
                return IrExpr::error(span);
            }
            let types: Vec<TypeId> = lowered.iter().map(Lowered::ty).collect();
            (self.deduce_template_args(template, &types, span), Some(lowered))
        } else {
            (self.template_args(template, template_args, span), None)
        };
        let Some(bound) = bound else {
            if lowered.is_none() {
                self.lower_args(args, &[]);
            }
            return IrExpr::error(span);
        };
        let Some(func) = self.function_instance(template, &bound, span) else {
            if lowered.is_none() {
                self.lower_args(args, &[]);
            }
            return IrExpr::error(span);
        };
        let Some(candidate) = self.candidate(Callee::Func(func)) else {
            return IrExpr::error(span);
        };
        let lowered = match lowered {
            Some(lowered) => lowered,
            None => {
                let expected: Vec<TypeId> = candidate.params.iter().map(|p| p.ty).collect();
                self.lower_args(args, &expected)
            }
        };
        self.finish_call(name, vec![candidate], None, lowered, span)
    }

    fn call_overloads(
        &mut self,
        name: &str,
        candidates: Vec<Candidate>,
        receiver: Option<IrExpr>,
        args: &'a [ExprId],
        span: Span,
    ) -> IrExpr {
        let arity: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.params.len() == args.len())
            .collect();
        let expected: Vec<TypeId> = match arity.as_slice() {
            [only] => only.params.iter().map(|p| self.ctx.types.strip_ref(p.ty)).collect(),
            _ => Vec::new(),
        };
        let lowered = self.lower_args(args, &expected);
        self.finish_call(name, candidates, receiver, lowered, span)
    }

    fn finish_call(
        &mut self,
        name: &str,
        candidates: Vec<Candidate>,
        receiver: Option<IrExpr>,
        args: Vec<Lowered>,
        span: Span,
    ) -> IrExpr {
        if args.iter().any(|a| a.ty().is_error()) {
            return IrExpr::error(span);
        }
        let Some(index) = self.select_overload(name, &candidates, &args, span) else {
            return IrExpr::error(span);
        };
        let Some(chosen) = candidates.into_iter().nth(index) else {
            return IrExpr::error(span);
        };

        let mut bound = Vec::with_capacity(args.len() + 1);
        if let Some(owner) = chosen.owner {
            match receiver {
                Some(receiver) => bound.push(receiver),
                None => match self.implicit_this(owner, span) {
                    Some(this) => bound.push(this),
                    None => {
                        let owner = self.display_type(owner);
                        self.error(
                            ErrorCode::E2008,
                            span,
                            format!("method `{name}` of `{owner}` needs an object to be called on"),
                        );
                        return IrExpr::error(span);
                    }
                },
            }
        }
        for (arg, param) in args.into_iter().zip(&chosen.params) {
            let value = self.bind_argument(arg, *param);
            bound.push(value);
        }
        let kind = match chosen.callee {
            Callee::Func(callee) => IrExprKind::Call {
                callee,
                args: bound,
            },
            Callee::Extern(callee) => IrExprKind::CallExtern {
                callee,
                args: bound,
            },
        };
        IrExpr::new(kind, chosen.ret, span)
    }

    fn lower_args(&mut self, args: &'a [ExprId], expected: &[TypeId]) -> Vec<Lowered> {
        args.iter()
            .enumerate()
            .map(|(i, &arg)| self.lower(arg, expected.get(i).copied()))
            .collect()
    }

    fn candidate(&self, callee: Callee) -> Option<Candidate> {
        match callee {
            Callee::Func(id) => {
                let func = self.module.function(id)?;
                let owner = match func.kind {
                    FunctionKind::Method { owner } => Some(owner),
                    FunctionKind::Free | FunctionKind::Init => None,
                };
                let skip = usize::from(owner.is_some());
                let params = func
                    .params
                    .iter()
                    .skip(skip)
                    .filter_map(|&p| func.local(p))
                    .map(|local| ParamInfo {
                        ty: local.ty,
                        is_const: local.is_const,
                    })
                    .collect();
                Some(Candidate {
                    callee,
                    name: func.name.clone(),
                    params,
                    ret: func.ret,
                    owner,
                })
            }
            Callee::Extern(id) => {
                let func = self.ctx.externs.function(id)?;
                Some(Candidate {
                    callee,
                    name: func.qualified_name(),
                    params: func
                        .params
                        .iter()
                        .map(|&ty| ParamInfo {
                            ty,
                            is_const: false,
                        })
                        .collect(),
                    ret: func.ret,
                    owner: None,
                })
            }
        }
    }

    /// Index of the best viable candidate; reports why none fits otherwise.
    fn select_overload(
        &mut self,
        name: &str,
        candidates: &[Candidate],
        args: &[Lowered],
        span: Span,
    ) -> Option<usize> {
        let mut best: Option<(u32, usize)> = None;
        let mut tied = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            let Some(cost) = self.call_cost(candidate, args) else {
                continue;
            };
            match best {
                Some((best_cost, _)) if cost > best_cost => {}
                Some((best_cost, _)) if cost == best_cost => tied.push(index),
                _ => {
                    best = Some((cost, index));
                    tied.clear();
                    tied.push(index);
                }
            }
        }
        match best {
            Some((_, index)) if tied.len() == 1 => Some(index),
            Some(_) => {
                let mut diag = Diagnostic::error(ErrorCode::E2007)
                    .with_message(format!("call to `{name}` is ambiguous"))
                    .with_label(span, "more than one overload matches equally well");
                for &index in &tied {
                    if let Some(candidate) = candidates.get(index) {
                        diag = diag.with_note(format!("candidate: `{}`", self.signature(candidate)));
                    }
                }
                self.report(diag);
                None
            }
            None => {
                self.no_match(name, candidates, args, span);
                None
            }
        }
    }

    fn no_match(&mut self, name: &str, candidates: &[Candidate], args: &[Lowered], span: Span) {
        if let [only] = candidates {
            if only.params.len() != args.len() {
                self.error(
                    ErrorCode::E2004,
                    span,
                    format!(
                        "`{name}` expects {} argument{}, found {}",
                        only.params.len(),
                        if only.params.len() == 1 { "" } else { "s" },
                        args.len()
                    ),
                );
                return;
            }
            for (position, (arg, param)) in args.iter().zip(&only.params).enumerate() {
                if self.argument_cost(arg, *param).is_some() {
                    continue;
                }
                let inner = self.ctx.types.strip_ref(param.ty);
                if inner != param.ty && self.ctx.types.structurally_equal(inner, arg.ty()) {
                    let ty = self.display_type(param.ty);
                    self.error(
                        ErrorCode::E2009,
                        arg.span(),
                        format!(
                            "argument {} of `{name}` must be a modifiable variable to bind to `{ty}`",
                            position + 1
                        ),
                    );
                } else {
                    let (expected, found) = (self.display_type(param.ty), self.display_type(arg.ty()));
                    let context = format!("argument {} of `{name}`", position + 1);
                    self.report(type_mismatch(arg.span(), &expected, &found, &context));
                }
                return;
            }
            return;
        }
        let types: Vec<String> = args.iter().map(|a| self.display_type(a.ty())).collect();
        let mut diag = Diagnostic::error(ErrorCode::E2001)
            .with_message(format!(
                "no matching function for call to `{name}({})`",
                types.join(", ")
            ))
            .with_label(span, "no overload accepts these arguments");
        for candidate in candidates {
            diag = diag.with_note(format!("candidate: `{}`", self.signature(candidate)));
        }
        self.report(diag);
    }

    fn call_cost(&self, candidate: &Candidate, args: &[Lowered]) -> Option<u32> {
        if candidate.params.len() != args.len() {
            return None;
        }
        args.iter()
            .zip(&candidate.params)
            .map(|(arg, param)| self.argument_cost(arg, *param))
            .sum()
    }

    fn argument_cost(&self, arg: &Lowered, param: ParamInfo) -> Option<u32> {
        let types = &self.ctx.types;
        if arg.ty().is_error() || param.ty.is_error() {
            return Some(0);
        }
        if let TypeKind::Ref { inner } = types.kind(param.ty) {
            let inner = *inner;
            if let Lowered::Place(place, _) = arg {
                if types.structurally_equal(place.ty, inner) {
                    if !param.is_const && self.is_const_place(place) {
                        return None;
                    }
                    return Some(0);
                }
            }
            if param.is_const {
                return self.conversion_cost(arg.ty(), inner);
            }
            return None;
        }
        self.conversion_cost(arg.ty(), param.ty)
    }

    fn conversion_cost(&self, from: TypeId, to: TypeId) -> Option<u32> {
        let types = &self.ctx.types;
        if from == to || types.structurally_equal(from, to) {
            return Some(0);
        }
        let from_prim = types.as_primitive(from)?;
        if to == TypeId::DYNAMIC {
            return (from_prim != snex_ir::Primitive::Void).then_some(1);
        }
        let to_prim = types.as_primitive(to)?;
        let (a, b) = (from_prim.rank()?, to_prim.rank()?);
        Some(if b >= a { 1 } else { 2 })
    }

    fn bind_argument(&mut self, arg: Lowered, param: ParamInfo) -> IrExpr {
        let inner = match self.ctx.types.kind(param.ty) {
            TypeKind::Ref { inner } => *inner,
            _ => return self.coerce(arg.into_value(), param.ty),
        };
        match arg {
            Lowered::Place(place, span) if self.ctx.types.structurally_equal(place.ty, inner) => {
                self.address_of(place, span)
            }
            other => {
                let value = self.coerce(other.into_value(), inner);
                self.materialize(value)
            }
        }
    }

    pub(super) fn address_of(&mut self, place: IrPlace, span: Span) -> IrExpr {
        // `&*r` is just `r`.
        if let PlaceKind::Deref(reference) = place.kind {
            return *reference;
        }
        let ty = self.ctx.types.ref_of(place.ty);
        IrExpr::new(IrExprKind::AddressOf(Box::new(place)), ty, span)
    }

    /// `this` forwarded to a sibling method called unqualified.
    fn implicit_this(&mut self, owner: TypeId, span: Span) -> Option<IrExpr> {
        let place = self.this_place(owner, span)?;
        Some(self.address_of(place, span))
    }

    /// Whether a place is rooted in a `const` variable.
    pub(super) fn is_const_place(&self, place: &IrPlace) -> bool {
        match &place.kind {
            PlaceKind::Local(id) => self
                .body
                .as_ref()
                .and_then(|b| b.locals.get(id.index()))
                .is_some_and(|l| l.is_const),
            PlaceKind::Global(id) => self.module.global(*id).is_some_and(|g| g.is_const),
            PlaceKind::Field { base, .. } | PlaceKind::Index { base, .. } => self.is_const_place(base),
            PlaceKind::Deref(reference) => match &reference.kind {
                IrExprKind::Load(slot) => self.is_const_place(slot),
                _ => false,
            },
        }
    }

    fn signature(&self, candidate: &Candidate) -> String {
        let params: Vec<String> = candidate
            .params
            .iter()
            .map(|p| {
                let ty = self.display_type(p.ty);
                if p.is_const {
                    format!("const {ty}")
                } else {
                    ty
                }
            })
            .collect();
        format!(
            "{} {}({})",
            self.display_type(candidate.ret),
            candidate.name,
            params.join(", ")
        )
    }
}
