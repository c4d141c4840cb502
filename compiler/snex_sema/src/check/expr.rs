//! Expressions, places and implicit conversions.

use snex_diagnostic::{type_mismatch, ErrorCode};
use snex_ir::{BinaryOp, ConstValue, ExprId, ExprKind, Name, Path, Primitive, Span, UnaryOp};
use snex_types::{Storage, Symbol, TypeFlags, TypeId, TypeKind};

use super::Checker;
use crate::eval;
use crate::ir::{IrExpr, IrExprKind, IrPlace, PlaceKind};

/// An expression lowered either to a memory location or to a value.
pub(super) enum Lowered {
    Place(IrPlace, Span),
    Value(IrExpr),
}

impl Lowered {
    pub(super) fn ty(&self) -> TypeId {
        match self {
            Lowered::Place(place, _) => place.ty,
            Lowered::Value(value) => value.ty,
        }
    }

    pub(super) fn span(&self) -> Span {
        match self {
            Lowered::Place(_, span) => *span,
            Lowered::Value(value) => value.span,
        }
    }

    pub(super) fn into_value(self) -> IrExpr {
        match self {
            Lowered::Place(place, span) => IrExpr::load(place, span),
            Lowered::Value(value) => value,
        }
    }
}

impl<'a> Checker<'a> {
    pub(super) fn check_expr(&mut self, id: ExprId) -> IrExpr {
        self.check_expr_expected(id, None)
    }

    /// Check `id`; `expected` gives initializer lists their type.
    pub(super) fn check_expr_expected(&mut self, id: ExprId, expected: Option<TypeId>) -> IrExpr {
        self.lower(id, expected).into_value()
    }

    /// Check `id` as the initializer of a `ty` slot, converting implicitly.
    pub(super) fn check_initializer(&mut self, id: ExprId, ty: TypeId) -> IrExpr {
        let value = self.check_expr_expected(id, Some(ty));
        self.coerce(value, ty)
    }

    pub(super) fn lower(&mut self, id: ExprId, expected: Option<TypeId>) -> Lowered {
        snex_stack::ensure_sufficient_stack(|| self.lower_inner(id, expected))
    }

    fn lower_inner(&mut self, id: ExprId, expected: Option<TypeId>) -> Lowered {
        let ast = self.ast;
        let expr = ast.expr(id);
        let span = expr.span;
        let value = match &expr.kind {
            ExprKind::Int(v) => IrExpr::constant(ConstValue::Int(*v), span),
            ExprKind::Float(bits) => IrExpr::constant(ConstValue::Float(*bits), span),
            ExprKind::Double(bits) => IrExpr::constant(ConstValue::Double(*bits), span),
            ExprKind::Bool(b) => IrExpr::constant(ConstValue::Bool(*b), span),
            ExprKind::Path(path) => return self.lower_path(path, span),
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, *lhs, *rhs, span),
            ExprKind::Unary { op, operand } => self.check_unary(*op, *operand, span),
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => self.check_ternary(*cond, *then_expr, *else_expr, expected, span),
            ExprKind::Cast { to, expr } => self.check_cast(*to, *expr, span),
            ExprKind::Call {
                callee,
                template_args,
                args,
            } => self.check_call(*callee, template_args, args, span),
            ExprKind::Member {
                base,
                name,
                name_span,
            } => return self.lower_member(*base, *name, *name_span, span),
            ExprKind::Index { base, index } => return self.lower_index(*base, *index, span),
            ExprKind::InitList(elems) => match expected {
                Some(ty) if !ty.is_error() => self.check_init_list(elems, ty, span),
                Some(_) => IrExpr::error(span),
                None => {
                    self.error(
                        ErrorCode::E2005,
                        span,
                        "cannot infer the type of an initializer list",
                    );
                    IrExpr::error(span)
                }
            },
            ExprKind::Error => IrExpr::error(span),
        };
        Lowered::Value(value)
    }

    // Names and places

    fn lower_path(&mut self, path: &Path, span: Span) -> Lowered {
        let symbol = match self.ctx.scopes.resolve_path(&path.segments, self.scope) {
            Ok(symbol) => symbol,
            Err(err) => {
                self.scope_error(&err, path.span);
                return Lowered::Value(IrExpr::error(span));
            }
        };
        let Some(found) = self.ctx.scopes.symbol(symbol).map(|s| s.symbol.clone()) else {
            return Lowered::Value(IrExpr::error(span));
        };
        match found {
            Symbol::Variable { ty, storage, .. } => {
                if let Storage::Local(local) = storage {
                    self.mark_used(local);
                }
                Lowered::Place(self.variable_place(storage, ty, span), span)
            }
            Symbol::Constant { value, .. } => Lowered::Value(IrExpr::constant(value, span)),
            Symbol::Field { owner, index } => match self.this_place(owner, span) {
                Some(this) => match self.field_place(this, index) {
                    Some(place) => Lowered::Place(place, span),
                    None => Lowered::Value(IrExpr::error(span)),
                },
                None => {
                    let name = self.path_text(path);
                    let owner = self.display_type(owner);
                    self.error(
                        ErrorCode::E2008,
                        span,
                        format!("member `{name}` can only be used inside a method of `{owner}`"),
                    );
                    Lowered::Value(IrExpr::error(span))
                }
            },
            other => {
                let name = self.path_text(path);
                let hint = match other {
                    Symbol::Functions(_) | Symbol::Template(_) => "; call it with `(...)`",
                    _ => "",
                };
                self.error(
                    ErrorCode::E2008,
                    span,
                    format!("`{name}` is a {}, not a value{hint}", other.describe()),
                );
                Lowered::Value(IrExpr::error(span))
            }
        }
    }

    /// Location of a variable. Reference variables hold an address and are
    /// dereferenced transparently.
    pub(super) fn variable_place(&mut self, storage: Storage, ty: TypeId, span: Span) -> IrPlace {
        let kind = match storage {
            Storage::Global(id) => PlaceKind::Global(id),
            Storage::Local(id) => PlaceKind::Local(id),
        };
        let place = IrPlace::new(kind, ty);
        self.deref_if_ref(place, span)
    }

    fn deref_if_ref(&mut self, place: IrPlace, span: Span) -> IrPlace {
        match self.ctx.types.kind(place.ty) {
            TypeKind::Ref { inner } => {
                let inner = *inner;
                IrPlace::new(
                    PlaceKind::Deref(Box::new(IrExpr::load(place, span))),
                    inner,
                )
            }
            _ => place,
        }
    }

    /// `*this` inside a method of `owner`.
    pub(super) fn this_place(&mut self, owner: TypeId, span: Span) -> Option<IrPlace> {
        let body = self.body.as_ref()?;
        let this = body.this?;
        let this_ty = body.locals.get(this.index())?.ty;
        if self.ctx.types.strip_ref(this_ty) != owner {
            return None;
        }
        Some(self.variable_place(Storage::Local(this), this_ty, span))
    }

    pub(super) fn field_place(&self, base: IrPlace, index: u32) -> Option<IrPlace> {
        let member = self
            .ctx
            .types
            .struct_def(base.ty)?
            .members
            .get(index as usize)?;
        let (ty, offset) = (member.ty, member.offset);
        Some(IrPlace::new(
            PlaceKind::Field {
                base: Box::new(base),
                index,
                offset,
            },
            ty,
        ))
    }

    /// Store an rvalue in a fresh temporary and name that temporary.
    pub(super) fn rvalue_place(&mut self, value: IrExpr) -> IrPlace {
        let ty = value.ty;
        let reference = self.materialize(value);
        IrPlace::new(PlaceKind::Deref(Box::new(reference)), ty)
    }

    /// Address of a temporary holding `value`.
    pub(super) fn materialize(&mut self, value: IrExpr) -> IrExpr {
        let ty = value.ty;
        let span = value.span;
        let local = self.add_temp(ty);
        let ref_ty = self.ctx.types.ref_of(ty);
        IrExpr::new(
            IrExprKind::Materialize {
                local,
                value: Box::new(value),
            },
            ref_ty,
            span,
        )
    }

    pub(super) fn lowered_place(&mut self, lowered: Lowered) -> IrPlace {
        match lowered {
            Lowered::Place(place, _) => place,
            Lowered::Value(value) => self.rvalue_place(value),
        }
    }

    fn lower_member(&mut self, base: ExprId, name: Name, name_span: Span, span: Span) -> Lowered {
        let base = self.lower(base, None);
        let base_ty = base.ty();
        if base_ty.is_error() {
            return Lowered::Value(IrExpr::error(span));
        }
        let member = self
            .ctx
            .types
            .struct_def(base_ty)
            .map(|def| def.member(name).map(|(index, _)| index));
        match member {
            Some(Some(index)) => {
                let place = self.lowered_place(base);
                let index = u32::try_from(index).unwrap_or(u32::MAX);
                match self.field_place(place, index) {
                    Some(place) => Lowered::Place(place, span),
                    None => Lowered::Value(IrExpr::error(span)),
                }
            }
            Some(None) => {
                let (field, ty) = (self.text(name), self.display_type(base_ty));
                let is_method = self.method_named(base_ty, name);
                let message = if is_method {
                    format!("method `{field}` of `{ty}` must be called")
                } else {
                    format!("no member named `{field}` in `{ty}`")
                };
                self.error(ErrorCode::E2015, name_span, message);
                Lowered::Value(IrExpr::error(span))
            }
            None => {
                let (field, ty) = (self.text(name), self.display_type(base_ty));
                self.error(
                    ErrorCode::E2015,
                    name_span,
                    format!("type `{ty}` has no member `{field}`"),
                );
                Lowered::Value(IrExpr::error(span))
            }
        }
    }

    fn method_named(&self, owner: TypeId, name: Name) -> bool {
        self.ctx
            .scopes
            .class_scope(owner)
            .and_then(|scope| self.ctx.scopes.binding(scope, name))
            .and_then(|symbol| self.ctx.scopes.symbol(symbol))
            .is_some_and(|data| matches!(data.symbol, Symbol::Functions(_)))
    }

    fn lower_index(&mut self, base: ExprId, index: ExprId, span: Span) -> Lowered {
        let base = self.lower(base, None);
        let base_ty = base.ty();
        let index_value = self.check_expr(index);
        if base_ty.is_error() {
            return Lowered::Value(IrExpr::error(span));
        }
        let (elem, len) = match self.ctx.types.kind(base_ty) {
            TypeKind::Span { elem, len } => (*elem, Some(*len)),
            TypeKind::Dyn { elem } => (*elem, None),
            _ => {
                let ty = self.display_type(base_ty);
                self.error(
                    ErrorCode::E2008,
                    span,
                    format!("type `{ty}` cannot be indexed"),
                );
                return Lowered::Value(IrExpr::error(span));
            }
        };
        let index_value = if index_value.is_error() || index_value.ty == TypeId::INT {
            index_value
        } else {
            let found = self.display_type(index_value.ty);
            self.report(type_mismatch(index_value.span, "int", &found, "index must be an `int`"));
            IrExpr::error(index_value.span)
        };
        if let (Some(len), Some(ConstValue::Int(i))) = (len, index_value.as_const()) {
            if i < 0 || i64::from(i) >= i64::from(len) {
                let ty = self.display_type(base_ty);
                self.error(
                    ErrorCode::E2008,
                    index_value.span,
                    format!("index {i} is out of bounds for `{ty}`"),
                );
            }
        }
        let place = self.lowered_place(base);
        Lowered::Place(
            IrPlace::new(
                PlaceKind::Index {
                    base: Box::new(place),
                    index: Box::new(index_value),
                    checked: self.safety_checks,
                },
                elem,
            ),
            span,
        )
    }

    // Operators

    fn check_binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId, span: Span) -> IrExpr {
        let lhs = self.check_expr(lhs);
        let rhs = self.check_expr(rhs);
        if lhs.is_error() || rhs.is_error() {
            return IrExpr::error(span);
        }
        if op.is_logical() {
            let lhs = self.condition(lhs);
            let rhs = self.condition(rhs);
            return binary(op, lhs, rhs, TypeId::BOOL, span);
        }
        let (Some(lp), Some(rp)) = (
            self.ctx.types.as_primitive(lhs.ty),
            self.ctx.types.as_primitive(rhs.ty),
        ) else {
            return self.invalid_operands(op, &lhs, &rhs, span);
        };
        if lp == Primitive::Void || rp == Primitive::Void {
            return self.invalid_operands(op, &lhs, &rhs, span);
        }

        if op.is_comparison() {
            if lp == Primitive::Bool && rp == Primitive::Bool {
                if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
                    return binary(op, lhs, rhs, TypeId::BOOL, span);
                }
                return self.invalid_operands(op, &lhs, &rhs, span);
            }
            let Some(common) = lp.promote(rp) else {
                return self.invalid_operands(op, &lhs, &rhs, span);
            };
            let lhs = convert_to(lhs, common);
            let rhs = convert_to(rhs, common);
            return binary(op, lhs, rhs, TypeId::BOOL, span);
        }

        if op.is_integer_only() {
            if lp != Primitive::Int || rp != Primitive::Int {
                let symbol = op.as_symbol();
                let (a, b) = (self.display_type(lhs.ty), self.display_type(rhs.ty));
                self.error(
                    ErrorCode::E2008,
                    span,
                    format!("operator `{symbol}` requires `int` operands, found `{a}` and `{b}`"),
                );
                return IrExpr::error(span);
            }
            return binary(op, lhs, rhs, TypeId::INT, span);
        }

        let Some(common) = lp.promote(rp) else {
            return self.invalid_operands(op, &lhs, &rhs, span);
        };
        let ty = TypeId::of_primitive(common);
        let lhs = convert_to(lhs, common);
        let rhs = convert_to(rhs, common);
        binary(op, lhs, rhs, ty, span)
    }

    fn invalid_operands(&mut self, op: BinaryOp, lhs: &IrExpr, rhs: &IrExpr, span: Span) -> IrExpr {
        let symbol = op.as_symbol();
        let (a, b) = (self.display_type(lhs.ty), self.display_type(rhs.ty));
        self.error(
            ErrorCode::E2008,
            span,
            format!("operator `{symbol}` cannot be applied to `{a}` and `{b}`"),
        );
        IrExpr::error(span)
    }

    fn check_unary(&mut self, op: UnaryOp, operand: ExprId, span: Span) -> IrExpr {
        let operand = self.check_expr(operand);
        if operand.is_error() {
            return IrExpr::error(span);
        }
        let prim = self.ctx.types.as_primitive(operand.ty);
        let ty = match op {
            UnaryOp::Not => {
                let operand = self.condition(operand);
                return unary(op, operand, TypeId::BOOL, span);
            }
            UnaryOp::Neg if prim.is_some_and(Primitive::is_numeric) => operand.ty,
            UnaryOp::BitNot if prim == Some(Primitive::Int) => TypeId::INT,
            _ => {
                let ty = self.display_type(operand.ty);
                self.error(
                    ErrorCode::E2008,
                    span,
                    format!("operator `{}` cannot be applied to `{ty}`", op.as_symbol()),
                );
                return IrExpr::error(span);
            }
        };
        unary(op, operand, ty, span)
    }

    fn check_ternary(
        &mut self,
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
        expected: Option<TypeId>,
        span: Span,
    ) -> IrExpr {
        let cond = self.check_expr(cond);
        let cond = self.condition(cond);
        let then_expr = self.check_expr_expected(then_expr, expected);
        let else_expr = self.check_expr_expected(else_expr, expected);
        if cond.is_error() || then_expr.is_error() || else_expr.is_error() {
            return IrExpr::error(span);
        }
        let (then_expr, else_expr, ty) = if self.ctx.types.structurally_equal(then_expr.ty, else_expr.ty) {
            let ty = then_expr.ty;
            (then_expr, else_expr, ty)
        } else {
            let common = self
                .ctx
                .types
                .as_primitive(then_expr.ty)
                .zip(self.ctx.types.as_primitive(else_expr.ty))
                .and_then(|(a, b)| a.promote(b));
            match common {
                Some(common) => (
                    convert_to(then_expr, common),
                    convert_to(else_expr, common),
                    TypeId::of_primitive(common),
                ),
                None => {
                    let (a, b) = (self.display_type(then_expr.ty), self.display_type(else_expr.ty));
                    self.error(
                        ErrorCode::E2001,
                        span,
                        format!("branches of `?:` have different types `{a}` and `{b}`"),
                    );
                    return IrExpr::error(span);
                }
            }
        };
        IrExpr::new(
            IrExprKind::Select {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            ty,
            span,
        )
    }

    fn check_cast(&mut self, to: Primitive, operand: ExprId, span: Span) -> IrExpr {
        let operand = self.check_expr(operand);
        if operand.is_error() {
            return IrExpr::error(span);
        }
        let from = self.ctx.types.as_primitive(operand.ty);
        match from {
            Some(from) if from != Primitive::Void && to != Primitive::Void => {
                let mut value = convert_to(operand, to);
                value.span = span;
                value
            }
            _ => {
                let ty = self.display_type(operand.ty);
                self.error(
                    ErrorCode::E2008,
                    span,
                    format!("cannot cast `{ty}` to `{}`", to.as_str()),
                );
                IrExpr::error(span)
            }
        }
    }

    // Conversions

    /// Use `expr` as a condition: `bool` as is, numbers compare against
    /// zero.
    pub(super) fn condition(&mut self, expr: IrExpr) -> IrExpr {
        if expr.is_error() || expr.ty == TypeId::BOOL {
            return expr;
        }
        match self.ctx.types.as_primitive(expr.ty) {
            Some(p) if p.is_numeric() => convert_to(expr, Primitive::Bool),
            _ => {
                let found = self.display_type(expr.ty);
                self.report(type_mismatch(expr.span, "bool", &found, "expected a condition"));
                IrExpr::error(expr.span)
            }
        }
    }

    /// Implicit conversion of `expr` to `to`: identity and widening
    /// silently, numeric narrowing with W2001, everything else is E2001.
    pub(super) fn coerce(&mut self, mut expr: IrExpr, to: TypeId) -> IrExpr {
        if expr.is_error() || to.is_error() || expr.ty == to {
            return expr;
        }
        if self.ctx.types.structurally_equal(expr.ty, to) {
            expr.ty = to;
            return expr;
        }
        let from_prim = self.ctx.types.as_primitive(expr.ty);
        if to == TypeId::DYNAMIC {
            if from_prim.is_some_and(|p| p != Primitive::Void) {
                return expr;
            }
            return self.mismatch(expr, to);
        }
        let (Some(from), Some(target)) = (from_prim, self.ctx.types.as_primitive(to)) else {
            return self.mismatch(expr, to);
        };
        let (Some(from_rank), Some(to_rank)) = (from.rank(), target.rank()) else {
            return self.mismatch(expr, to);
        };
        if to_rank < from_rank && !self.converts_exactly(&expr, target) {
            self.report(
                snex_diagnostic::Diagnostic::warning(ErrorCode::W2001)
                    .with_message(format!(
                        "implicit conversion from `{}` to `{}` may lose precision",
                        from.as_str(),
                        target.as_str()
                    ))
                    .with_label(expr.span, "narrowed here")
                    .with_suggestion(format!("use an explicit cast: `({})`", target.as_str())),
            );
        }
        convert_to(expr, target)
    }

    /// Constants that survive the round trip do not warn: `float x = 0.5;`.
    fn converts_exactly(&self, expr: &IrExpr, to: Primitive) -> bool {
        let Some(value) = self.evaluate_const(expr) else {
            return false;
        };
        eval::convert(value, to)
            .and_then(|narrow| eval::convert(narrow, value.primitive()))
            .is_some_and(|back| back == value)
    }

    fn mismatch(&mut self, expr: IrExpr, to: TypeId) -> IrExpr {
        let (expected, found) = (self.display_type(to), self.display_type(expr.ty));
        let numeric = |ty: TypeId| self.ctx.types.flags(ty).contains(TypeFlags::IS_NUMERIC);
        let boolean_numeric = (to == TypeId::BOOL && numeric(expr.ty))
            || (expr.ty == TypeId::BOOL && numeric(to));
        let context = if boolean_numeric {
            "use an explicit cast to convert between `bool` and numbers"
        } else {
            "expression has the wrong type"
        };
        self.report(type_mismatch(expr.span, &expected, &found, context));
        IrExpr::error(expr.span)
    }

    // Aggregates

    fn check_init_list(&mut self, elems: &'a [ExprId], ty: TypeId, span: Span) -> IrExpr {
        enum Shape {
            Struct(Vec<TypeId>),
            Span(TypeId, u32),
            Scalar,
            Other,
        }
        let shape = match self.ctx.types.kind(ty) {
            TypeKind::Struct(def) => Shape::Struct(def.members.iter().map(|m| m.ty).collect()),
            TypeKind::Span { elem, len } => Shape::Span(*elem, *len),
            TypeKind::Primitive(p) if *p != Primitive::Void => Shape::Scalar,
            _ => Shape::Other,
        };
        let capacity = match &shape {
            Shape::Struct(members) => members.len(),
            Shape::Span(_, len) => *len as usize,
            Shape::Scalar => 1,
            Shape::Other => {
                let name = self.display_type(ty);
                self.error(
                    ErrorCode::E2008,
                    span,
                    format!("cannot initialize `{name}` with an initializer list"),
                );
                return IrExpr::error(span);
            }
        };
        if elems.len() > capacity {
            let name = self.display_type(ty);
            self.error(
                ErrorCode::E2001,
                span,
                format!(
                    "too many initializers for `{name}`: expected at most {capacity}, found {}",
                    elems.len()
                ),
            );
            return IrExpr::error(span);
        }
        match shape {
            Shape::Scalar => match elems.first() {
                Some(&elem) => self.check_initializer(elem, ty),
                None => IrExpr::new(IrExprKind::Zero, ty, span),
            },
            Shape::Struct(members) => {
                let defaults = self.defaults.get(&ty).cloned().unwrap_or_default();
                let values = members
                    .iter()
                    .enumerate()
                    .map(|(i, &member_ty)| match elems.get(i) {
                        Some(&elem) => self.check_initializer(elem, member_ty),
                        None => match defaults.get(i).copied().flatten() {
                            Some(value) => IrExpr::constant(value, span),
                            None => self.zero_or_default(member_ty, span),
                        },
                    })
                    .collect();
                IrExpr::new(IrExprKind::Aggregate(values), ty, span)
            }
            Shape::Span(elem, len) => {
                let values = (0..len as usize)
                    .map(|i| match elems.get(i) {
                        Some(&e) => self.check_initializer(e, elem),
                        None => self.zero_or_default(elem, span),
                    })
                    .collect();
                IrExpr::new(IrExprKind::Aggregate(values), ty, span)
            }
            Shape::Other => IrExpr::error(span),
        }
    }

    fn zero_or_default(&mut self, ty: TypeId, span: Span) -> IrExpr {
        self.default_value(ty, span)
            .unwrap_or_else(|| IrExpr::new(IrExprKind::Zero, ty, span))
    }

    /// Value of a default-initialized `ty` when it is not all zeros, i.e.
    /// when some struct member inside has a default initializer.
    pub(super) fn default_value(&mut self, ty: TypeId, span: Span) -> Option<IrExpr> {
        match self.ctx.types.kind(ty) {
            TypeKind::Struct(def) => {
                let members: Vec<TypeId> = def.members.iter().map(|m| m.ty).collect();
                let defaults = self.defaults.get(&ty).cloned().unwrap_or_default();
                let values: Vec<Option<IrExpr>> = members
                    .iter()
                    .enumerate()
                    .map(|(i, &member_ty)| match defaults.get(i).copied().flatten() {
                        Some(value) => Some(IrExpr::constant(value, span)),
                        None => self.default_value(member_ty, span),
                    })
                    .collect();
                if values.iter().all(Option::is_none) {
                    return None;
                }
                let values = values
                    .into_iter()
                    .zip(members)
                    .map(|(value, member_ty)| {
                        value.unwrap_or_else(|| IrExpr::new(IrExprKind::Zero, member_ty, span))
                    })
                    .collect();
                Some(IrExpr::new(IrExprKind::Aggregate(values), ty, span))
            }
            TypeKind::Span { elem, len } => {
                let (elem, len) = (*elem, *len);
                let value = self.default_value(elem, span)?;
                Some(IrExpr::new(
                    IrExprKind::Aggregate(vec![value; len as usize]),
                    ty,
                    span,
                ))
            }
            _ => None,
        }
    }
}

/// Convert `expr` to a primitive, folding nothing.
pub(super) fn convert_to(expr: IrExpr, to: Primitive) -> IrExpr {
    let ty = TypeId::of_primitive(to);
    if expr.ty == ty {
        return expr;
    }
    let span = expr.span;
    IrExpr::new(IrExprKind::Convert(Box::new(expr)), ty, span)
}

fn binary(op: BinaryOp, lhs: IrExpr, rhs: IrExpr, ty: TypeId, span: Span) -> IrExpr {
    IrExpr::new(
        IrExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
        span,
    )
}

fn unary(op: UnaryOp, operand: IrExpr, ty: TypeId, span: Span) -> IrExpr {
    IrExpr::new(
        IrExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        ty,
        span,
    )
}
