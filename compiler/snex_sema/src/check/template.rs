//! Template arguments, instantiation and deduction.
//!
//! Instances are keyed by the template symbol and the bound arguments.
//! The cache is consulted first, so requesting the same instance twice
//! yields the same type or function and never adds IR twice.

use smallvec::SmallVec;
use snex_diagnostic::{Diagnostic, ErrorCode};
use snex_ir::{
    ConstValue, ItemKind, Span, TemplateArgExpr, TemplateDecl, TemplateParam, TemplateParamKind,
    TypeExpr, TypeExprKind,
};
use snex_types::{
    FuncId, Instance, ScopeId, ScopeKind, Storage, Symbol, TemplateArg, TemplateId, TemplateKey,
    TypeId,
};

use super::{Checker, FuncInfo, MAX_INSTANTIATION_DEPTH};

pub(super) type TemplateArgs = SmallVec<[TemplateArg; 4]>;

impl<'a> Checker<'a> {
    /// Bind explicit template arguments to the parameters of `template`.
    pub(super) fn template_args(
        &mut self,
        template: TemplateId,
        args: &'a [TemplateArgExpr],
        span: Span,
    ) -> Option<TemplateArgs> {
        let def = self.templates.get(template.index())?;
        let (params, name) = (def.params, def.qualified.clone());
        if args.len() != params.len() {
            self.error(
                ErrorCode::E2017,
                span,
                format!(
                    "template `{name}` expects {} argument{}, found {}",
                    params.len(),
                    if params.len() == 1 { "" } else { "s" },
                    args.len()
                ),
            );
            return None;
        }
        let mut bound = TemplateArgs::new();
        for (param, arg) in params.iter().zip(args) {
            let value = match (param.kind, arg) {
                (TemplateParamKind::Type, TemplateArgExpr::Type(te)) => {
                    let ty = self.resolve_type(te);
                    if ty.is_error() {
                        return None;
                    }
                    TemplateArg::Type(ty)
                }
                (TemplateParamKind::Type, TemplateArgExpr::Value(expr)) => {
                    let param_name = self.text(param.name);
                    let span = self.ast.exprs.span(*expr);
                    self.error(
                        ErrorCode::E2016,
                        span,
                        format!("template parameter `{param_name}` expects a type, found a value"),
                    );
                    return None;
                }
                (TemplateParamKind::Int, TemplateArgExpr::Value(expr)) => {
                    let value = self.constant_expr(*expr, Some(TypeId::INT))?;
                    TemplateArg::Value(value.as_i64()?)
                }
                (TemplateParamKind::Int, TemplateArgExpr::Type(te)) => {
                    self.type_arg_as_value(te, param)?
                }
            };
            bound.push(value);
        }
        Some(bound)
    }

    /// A bare name in argument position parses as a type; for an `int`
    /// parameter it may name a constant instead.
    fn type_arg_as_value(&mut self, te: &TypeExpr, param: &TemplateParam) -> Option<TemplateArg> {
        if let TypeExprKind::Path { path, args } = &te.kind {
            if args.is_empty() {
                let found = self
                    .ctx
                    .scopes
                    .resolve_path(&path.segments, self.scope)
                    .ok()
                    .and_then(|s| self.ctx.scopes.symbol(s))
                    .map(|s| s.symbol.clone());
                let value = match found {
                    Some(Symbol::Constant { value, .. }) => Some(value),
                    Some(Symbol::Variable {
                        storage: Storage::Global(id),
                        ..
                    }) => self.global_consts.get(&id).copied(),
                    Some(Symbol::Variable {
                        storage: Storage::Local(id),
                        ..
                    }) => self
                        .body
                        .as_ref()
                        .and_then(|b| b.const_locals.get(&id).copied()),
                    _ => None,
                };
                if let Some(value) = value.and_then(ConstValue::as_i64) {
                    return Some(TemplateArg::Value(value));
                }
            }
        }
        let param_name = self.text(param.name);
        self.error(
            ErrorCode::E2016,
            te.span,
            format!("template parameter `{param_name}` expects a constant"),
        );
        None
    }

    /// Instantiate a struct template named in a type.
    pub(super) fn instantiate_struct(
        &mut self,
        template: TemplateId,
        args: &'a [TemplateArgExpr],
        span: Span,
    ) -> TypeId {
        let is_struct = self
            .templates
            .get(template.index())
            .is_some_and(|def| matches!(def.decl.item.kind, ItemKind::Struct(_)));
        if !is_struct {
            let name = self
                .templates
                .get(template.index())
                .map(|d| d.qualified.clone())
                .unwrap_or_default();
            self.error(
                ErrorCode::E2016,
                span,
                format!("`{name}` is a function template, not a type"),
            );
            return TypeId::ERROR;
        }
        match self.template_args(template, args, span) {
            Some(bound) => self.struct_instance(template, &bound, span),
            None => TypeId::ERROR,
        }
    }

    fn struct_instance(&mut self, template: TemplateId, bound: &TemplateArgs, span: Span) -> TypeId {
        let Some(def) = self.templates.get(template.index()) else {
            return TypeId::ERROR;
        };
        let template_decl: &'a TemplateDecl = def.decl;
        let ItemKind::Struct(decl) = &template_decl.item.kind else {
            return TypeId::ERROR;
        };
        let (decl, params, scope, base, name) =
            (decl, def.params, def.scope, def.qualified.clone(), def.name);
        let key = TemplateKey::new(def.symbol, bound.iter().copied());
        match self.ctx.templates.lookup(&key) {
            Some(Instance::Type(ty)) => return ty,
            Some(_) => return TypeId::ERROR,
            None => {}
        }
        let instance_name = key.instance_name(&base, &self.ctx.types);
        if self.instantiation.len() >= MAX_INSTANTIATION_DEPTH {
            self.ctx.templates.insert(key, Instance::Failed);
            self.depth_exceeded(&instance_name, span);
            return TypeId::ERROR;
        }

        let ty = self.ctx.types.declare_struct(instance_name.clone());
        self.ctx.templates.insert(key, Instance::Type(ty));
        let class_scope = self.ctx.scopes.enter(scope, ScopeKind::Class, None);
        self.ctx.scopes.set_class_scope(ty, class_scope);
        self.bind_template_params(class_scope, params, bound);
        let _ = self
            .ctx
            .scopes
            .declare(class_scope, name, Symbol::Type(ty), decl.name_span);

        let mut frames = self.instantiation.clone();
        frames.push(instance_name.clone());
        let errors = self.error_count();
        let index = self.register_struct(ty, decl, class_scope, frames.clone());
        self.define_struct(index);
        self.with_instantiation(frames, |c| {
            for method in &decl.methods {
                if let Some(id) = c.declare_function_item(class_scope, method, Some(ty)) {
                    if let Some(func) = c.module.function_mut(id) {
                        func.is_instance = true;
                    }
                    if let Some(info) = c.funcs.get_mut(id.index()) {
                        info.site = span;
                    }
                    c.queue.push_back(id);
                }
            }
        });
        if self.error_count() > errors {
            self.instantiation_failed(&instance_name, span);
        }
        tracing::debug!(instance = %instance_name, "instantiated struct template");
        ty
    }

    /// Instantiate a function template with bound arguments.
    pub(super) fn function_instance(
        &mut self,
        template: TemplateId,
        bound: &TemplateArgs,
        site: Span,
    ) -> Option<FuncId> {
        let def = self.templates.get(template.index())?;
        let template_decl: &'a TemplateDecl = def.decl;
        let ItemKind::Function(decl) = &template_decl.item.kind else {
            let name = def.qualified.clone();
            self.error(
                ErrorCode::E2008,
                site,
                format!("`{name}` is a struct template, not a function"),
            );
            return None;
        };
        let (decl, params, scope, base) = (decl, def.params, def.scope, def.qualified.clone());
        let key = TemplateKey::new(def.symbol, bound.iter().copied());
        match self.ctx.templates.lookup(&key) {
            Some(Instance::Function(id)) => return Some(id),
            Some(_) => return None,
            None => {}
        }
        let instance_name = key.instance_name(&base, &self.ctx.types);
        if self.instantiation.len() >= MAX_INSTANTIATION_DEPTH {
            self.ctx.templates.insert(key, Instance::Failed);
            self.depth_exceeded(&instance_name, site);
            return None;
        }

        let param_scope = self.ctx.scopes.enter(scope, ScopeKind::Function, None);
        self.bind_template_params(param_scope, params, bound);
        let mut frames = self.instantiation.clone();
        frames.push(instance_name.clone());
        let errors = self.error_count();
        let mut func = self.with_instantiation(frames.clone(), |c| {
            c.function_signature(decl, param_scope, instance_name.clone(), None)
        });
        if self.error_count() > errors {
            self.ctx.templates.insert(key, Instance::Failed);
            self.instantiation_failed(&instance_name, site);
            return None;
        }
        func.is_instance = true;
        let info = FuncInfo {
            decl: Some(decl),
            scope: param_scope,
            context: frames,
            site,
        };
        let id = self.push_function(func, info);
        self.ctx.templates.insert(key, Instance::Function(id));
        self.queue.push_back(id);
        tracing::debug!(instance = %instance_name, "instantiated function template");
        Some(id)
    }

    fn bind_template_params(&mut self, scope: ScopeId, params: &[TemplateParam], bound: &TemplateArgs) {
        for (param, arg) in params.iter().zip(bound) {
            let symbol = match *arg {
                TemplateArg::Type(ty) => Symbol::Type(ty),
                TemplateArg::Value(value) => Symbol::Constant {
                    ty: TypeId::INT,
                    value: ConstValue::Int(i32::try_from(value).unwrap_or_default()),
                },
            };
            if let Err(err) = self.ctx.scopes.declare(scope, param.name, symbol, param.span) {
                self.scope_error(&err, param.span);
            }
        }
    }

    /// Deduce the arguments of a function template from the types of the
    /// call arguments. Every type parameter must appear directly as the
    /// type of some function parameter.
    pub(super) fn deduce_template_args(
        &mut self,
        template: TemplateId,
        arg_types: &[TypeId],
        span: Span,
    ) -> Option<TemplateArgs> {
        let def = self.templates.get(template.index())?;
        let template_decl: &'a TemplateDecl = def.decl;
        let ItemKind::Function(decl) = &template_decl.item.kind else {
            return None;
        };
        let (decl, params, name) = (decl, def.params, def.qualified.clone());
        if decl.params.len() != arg_types.len() {
            self.error(
                ErrorCode::E2004,
                span,
                format!(
                    "`{name}` expects {} argument{}, found {}",
                    decl.params.len(),
                    if decl.params.len() == 1 { "" } else { "s" },
                    arg_types.len()
                ),
            );
            return None;
        }

        let mut deduced: Vec<Option<TypeId>> = vec![None; params.len()];
        for (param, &arg_ty) in decl.params.iter().zip(arg_types) {
            let written = match &param.ty.kind {
                TypeExprKind::Ref(inner) => &**inner,
                _ => &param.ty,
            };
            let TypeExprKind::Path { path, args } = &written.kind else {
                continue;
            };
            if !args.is_empty() || !path.is_single() {
                continue;
            }
            let Some(position) = params
                .iter()
                .position(|p| p.kind == TemplateParamKind::Type && p.name == path.last())
            else {
                continue;
            };
            let arg_ty = self.ctx.types.strip_ref(arg_ty);
            if arg_ty.is_error() {
                return None;
            }
            match deduced[position] {
                None => deduced[position] = Some(arg_ty),
                Some(previous) if self.ctx.types.structurally_equal(previous, arg_ty) => {}
                Some(previous) => {
                    let param_name = self.text(params[position].name);
                    let (a, b) = (self.display_type(previous), self.display_type(arg_ty));
                    self.error(
                        ErrorCode::E2016,
                        span,
                        format!("conflicting types deduced for `{param_name}`: `{a}` and `{b}`"),
                    );
                    return None;
                }
            }
        }

        let mut bound = TemplateArgs::new();
        for (param, deduced) in params.iter().zip(deduced) {
            match deduced {
                Some(ty) => bound.push(TemplateArg::Type(ty)),
                None => {
                    let param_name = self.text(param.name);
                    self.report(
                        Diagnostic::error(ErrorCode::E2017)
                            .with_message(format!(
                                "cannot deduce template argument `{param_name}` of `{name}`"
                            ))
                            .with_label(span, "template arguments needed here")
                            .with_suggestion(format!("pass it explicitly: `{name}<...>(...)`")),
                    );
                    return None;
                }
            }
        }
        Some(bound)
    }

    /// Wrapper error at the site of an instantiation whose expansion failed.
    pub(super) fn instantiation_failed(&mut self, name: &str, site: Span) {
        self.report(
            Diagnostic::error(ErrorCode::E2013)
                .with_message(format!("error in instantiation of '{name}'"))
                .with_label(site, "instantiated here"),
        );
    }

    fn depth_exceeded(&mut self, name: &str, site: Span) {
        self.report(
            Diagnostic::error(ErrorCode::E2013)
                .with_message(format!(
                    "instantiation of '{name}' exceeds the nesting limit of {MAX_INSTANTIATION_DEPTH}"
                ))
                .with_label(site, "instantiated here")
                .with_note("the template probably instantiates itself without end"),
        );
    }
}
