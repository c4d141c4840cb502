//! Type resolution, struct definitions and constant expressions.

use snex_diagnostic::ErrorCode;
use snex_ir::{ConstValue, ExprId, Path, Span, StructDecl, TemplateArgExpr, TypeExpr, TypeExprKind};
use snex_types::{RegistryError, ScopeError, Symbol, TypeId, TypeKind};

use super::{BodyState, Checker, StructState};
use crate::eval;
use crate::ir::IrExpr;

/// Largest element count of a `span<T, N>`.
const MAX_SPAN_LEN: i64 = 1 << 20;

/// Largest size in bytes of a single span object.
const MAX_OBJECT_SIZE: u64 = 1 << 30;

impl<'a> Checker<'a> {
    /// Resolve a written type from the current scope. Failures are
    /// reported and yield `TypeId::ERROR`.
    pub(super) fn resolve_type(&mut self, te: &'a TypeExpr) -> TypeId {
        match &te.kind {
            TypeExprKind::Primitive(p) => TypeId::of_primitive(*p),
            TypeExprKind::Auto => {
                self.error(ErrorCode::E2005, te.span, "`auto` is not allowed here");
                TypeId::ERROR
            }
            TypeExprKind::Error => TypeId::ERROR,
            TypeExprKind::Path { path, args } => self.resolve_named_type(path, args, te.span),
            TypeExprKind::Span { elem, len } => {
                let elem_ty = self.resolve_type(elem);
                let elem_ty = self.check_storage_type(elem_ty, elem.span, "span element", false);
                let len_expr = *len;
                let len = self.span_length(len_expr);
                match len {
                    Some(len) if !elem_ty.is_error() => {
                        let stride = u64::from(self.ctx.types.layout(elem_ty).stride());
                        let bytes = stride * u64::from(len);
                        if bytes > MAX_OBJECT_SIZE {
                            let span = self.ast.exprs.span(len_expr);
                            self.error(
                                ErrorCode::E2014,
                                span,
                                format!(
                                    "span of {bytes} bytes exceeds the {MAX_OBJECT_SIZE}-byte object limit"
                                ),
                            );
                            return TypeId::ERROR;
                        }
                        self.ctx.types.span_of(elem_ty, len)
                    }
                    _ => TypeId::ERROR,
                }
            }
            TypeExprKind::Dyn(elem) => {
                let elem_ty = self.resolve_type(elem);
                let elem_ty = self.check_storage_type(elem_ty, elem.span, "dyn element", false);
                if elem_ty.is_error() {
                    TypeId::ERROR
                } else {
                    self.ctx.types.dyn_of(elem_ty)
                }
            }
            TypeExprKind::Ref(inner) => {
                let inner_ty = self.resolve_type(inner);
                if inner_ty == TypeId::VOID {
                    self.error(ErrorCode::E2001, te.span, "reference to `void`");
                    return TypeId::ERROR;
                }
                if inner_ty.is_error() {
                    TypeId::ERROR
                } else {
                    self.ctx.types.ref_of(inner_ty)
                }
            }
        }
    }

    fn resolve_named_type(
        &mut self,
        path: &Path,
        args: &'a [TemplateArgExpr],
        span: Span,
    ) -> TypeId {
        let symbol = match self.ctx.scopes.resolve_path(&path.segments, self.scope) {
            Ok(symbol) => symbol,
            Err(ScopeError::NotFound { .. }) => {
                let name = self.path_text(path);
                self.error(ErrorCode::E2002, path.span, format!("unknown type `{name}`"));
                return TypeId::ERROR;
            }
            Err(err) => {
                self.scope_error(&err, path.span);
                return TypeId::ERROR;
            }
        };
        let Some(found) = self.ctx.scopes.symbol(symbol).map(|s| s.symbol.clone()) else {
            return TypeId::ERROR;
        };
        match found {
            Symbol::Type(ty) if args.is_empty() => ty,
            Symbol::Type(_) => {
                let name = self.path_text(path);
                self.error(
                    ErrorCode::E2016,
                    span,
                    format!("`{name}` is not a template"),
                );
                TypeId::ERROR
            }
            Symbol::Template(template) if !args.is_empty() => {
                self.instantiate_struct(template, args, span)
            }
            Symbol::Template(_) => {
                let name = self.path_text(path);
                self.error(
                    ErrorCode::E2017,
                    span,
                    format!("template `{name}` needs template arguments"),
                );
                TypeId::ERROR
            }
            other => {
                let name = self.path_text(path);
                self.error(
                    ErrorCode::E2002,
                    path.span,
                    format!("`{name}` is a {}, not a type", other.describe()),
                );
                TypeId::ERROR
            }
        }
    }

    fn span_length(&mut self, len: ExprId) -> Option<u32> {
        let value = self.constant_expr(len, Some(TypeId::INT))?;
        match value.as_i64() {
            Some(n) if (0..=MAX_SPAN_LEN).contains(&n) => u32::try_from(n).ok(),
            _ => {
                let span = self.ast.exprs.span(len);
                self.error(
                    ErrorCode::E2014,
                    span,
                    format!("span length must be between 0 and {MAX_SPAN_LEN}, found {value}"),
                );
                None
            }
        }
    }

    /// Define the members of the struct tracked at `index`. Returns
    /// whether the struct is complete; `false` means it is being defined
    /// further up, i.e. it would contain itself by value.
    pub(super) fn define_struct(&mut self, index: usize) -> bool {
        let Some(item) = self.structs.get(index) else {
            return true;
        };
        match item.state {
            StructState::Done => return true,
            StructState::Defining => return false,
            StructState::Pending => {}
        }
        let (ty, decl, class_scope) = (item.ty, item.decl, item.class_scope);
        let context = item.context.clone();
        if let Some(item) = self.structs.get_mut(index) {
            item.state = StructState::Defining;
        }

        let (members, defaults) = self.with_instantiation(context, |c| {
            c.with_scope(class_scope, |c| c.struct_members(ty, decl))
        });

        match self.ctx.types.define_struct(ty, &members) {
            Ok(layout) => {
                tracing::trace!(
                    name = %self.display_type(ty),
                    size = layout.size,
                    align = layout.align,
                    "defined struct"
                );
            }
            Err(err) => {
                let code = match err {
                    RegistryError::RecursiveStruct { .. } | RegistryError::IncompleteMember { .. } => {
                        ErrorCode::E2012
                    }
                    _ => ErrorCode::E2001,
                };
                self.error(code, decl.name_span, err.to_string());
                let _ = self.ctx.types.define_struct(ty, &[]);
            }
        }
        if defaults.iter().any(Option::is_some) {
            self.defaults.insert(ty, defaults);
        }
        if let Some(item) = self.structs.get_mut(index) {
            item.state = StructState::Done;
        }
        true
    }

    fn struct_members(
        &mut self,
        owner: TypeId,
        decl: &'a StructDecl,
    ) -> (Vec<(snex_ir::Name, TypeId)>, Vec<Option<ConstValue>>) {
        let mut members = Vec::with_capacity(decl.fields.len());
        let mut defaults = Vec::with_capacity(decl.fields.len());
        for (index, field) in decl.fields.iter().enumerate() {
            let ty = if field.ty.is_auto() {
                self.error(ErrorCode::E2005, field.ty.span, "member type cannot be `auto`");
                TypeId::ERROR
            } else {
                self.resolve_type(&field.ty)
            };
            let mut ty = self.check_storage_type(ty, field.ty.span, "member", false);
            if !self.ensure_complete(ty) {
                let owner_name = self.display_type(owner);
                let field_name = self.text(field.name);
                self.error(
                    ErrorCode::E2012,
                    field.span,
                    format!("struct `{owner_name}` contains itself by value through `{field_name}`"),
                );
                ty = TypeId::ERROR;
            }
            let symbol = Symbol::Field {
                owner,
                index: u32::try_from(index).unwrap_or(u32::MAX),
            };
            if let Err(err) = self
                .ctx
                .scopes
                .declare(self.scope, field.name, symbol, field.span)
            {
                self.scope_error(&err, field.span);
            }
            let default = match field.init {
                Some(init) if !ty.is_error() => self.constant_expr(init, Some(ty)),
                _ => None,
            };
            members.push((field.name, ty));
            defaults.push(default);
        }
        (members, defaults)
    }

    /// Make sure a by-value use of `ty` sees a defined layout, defining
    /// pending structs on demand.
    pub(super) fn ensure_complete(&mut self, ty: TypeId) -> bool {
        if let Some(&index) = self.struct_index.get(&ty) {
            return self.define_struct(index);
        }
        let elem = match self.ctx.types.kind(ty) {
            TypeKind::Span { elem, .. } => Some(*elem),
            _ => None,
        };
        match elem {
            Some(elem) => self.ensure_complete(elem),
            None => true,
        }
    }

    /// Check `expr` and evaluate it at compile time. Reports E2014 when it
    /// is not constant.
    pub(super) fn constant_expr(&mut self, expr: ExprId, expected: Option<TypeId>) -> Option<ConstValue> {
        let value = if self.body.is_some() {
            self.typed_value(expr, expected)
        } else {
            self.with_body(BodyState::new(None, TypeId::VOID), |c| c.typed_value(expr, expected))
                .0
        };
        if value.is_error() {
            return None;
        }
        let result = self.evaluate_const(&value);
        if result.is_none() {
            let span = self.ast.exprs.span(expr);
            self.error(
                ErrorCode::E2014,
                span,
                "expression is not a compile-time constant",
            );
        }
        result
    }

    fn typed_value(&mut self, expr: ExprId, expected: Option<TypeId>) -> IrExpr {
        match expected {
            Some(ty) => self.check_initializer(expr, ty),
            None => self.check_expr(expr),
        }
    }

    /// Compile-time value of an already checked expression.
    pub(super) fn evaluate_const(&self, expr: &IrExpr) -> Option<ConstValue> {
        eval::evaluate(expr, &|place| self.const_of(place))
    }
}
