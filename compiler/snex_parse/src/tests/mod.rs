//! Parser tests.

#![allow(clippy::unwrap_used)]

mod items;
mod recovery;

use snex_ir::{Ast, ExprId, ExprKind, StringInterner, TemplateArgExpr, TypeExpr, TypeExprKind};

use crate::{parse, parse_expression, ParseOutput};

pub(super) fn parse_ok(source: &str) -> (Ast, StringInterner) {
    let mut interner = StringInterner::new();
    let ParseOutput {
        module,
        diagnostics,
    } = parse(source, "test.snex", &mut interner);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:#?}");
    (module, interner)
}

/// Parse an expression and render it as an S-expression.
pub(super) fn sexpr(source: &str) -> String {
    let mut interner = StringInterner::new();
    let out = parse_expression(source, &mut interner);
    assert!(out.diagnostics.is_empty(), "unexpected diagnostics: {:#?}", out.diagnostics);
    let expr = out.expr.unwrap();
    render(&out.module, expr, &interner)
}

pub(super) fn render(ast: &Ast, id: ExprId, interner: &StringInterner) -> String {
    match &ast.expr(id).kind {
        ExprKind::Int(v) => v.to_string(),
        ExprKind::Float(bits) => format!("{}f", f32::from_bits(*bits)),
        ExprKind::Double(bits) => format!("{}", f64::from_bits(*bits)),
        ExprKind::Bool(b) => b.to_string(),
        ExprKind::Path(path) => path
            .segments
            .iter()
            .map(|n| interner.lookup(*n))
            .collect::<Vec<_>>()
            .join("::"),
        ExprKind::Binary { op, lhs, rhs } => format!(
            "({} {} {})",
            op.as_symbol(),
            render(ast, *lhs, interner),
            render(ast, *rhs, interner)
        ),
        ExprKind::Unary { op, operand } => {
            format!("({} {})", op.as_symbol(), render(ast, *operand, interner))
        }
        ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => format!(
            "(? {} {} {})",
            render(ast, *cond, interner),
            render(ast, *then_expr, interner),
            render(ast, *else_expr, interner)
        ),
        ExprKind::Cast { to, expr } => format!("(cast {} {})", to, render(ast, *expr, interner)),
        ExprKind::Call {
            callee,
            template_args,
            args,
        } => {
            let mut out = format!("(call {}", render(ast, *callee, interner));
            if !template_args.is_empty() {
                let targs: Vec<_> = template_args
                    .iter()
                    .map(|a| match a {
                        TemplateArgExpr::Type(ty) => render_type(ast, ty, interner),
                        TemplateArgExpr::Value(e) => render(ast, *e, interner),
                    })
                    .collect();
                out.push_str(&format!(" <{}>", targs.join(", ")));
            }
            for arg in args {
                out.push(' ');
                out.push_str(&render(ast, *arg, interner));
            }
            out.push(')');
            out
        }
        ExprKind::Member { base, name, .. } => {
            format!("(. {} {})", render(ast, *base, interner), interner.lookup(*name))
        }
        ExprKind::Index { base, index } => format!(
            "([] {} {})",
            render(ast, *base, interner),
            render(ast, *index, interner)
        ),
        ExprKind::InitList(elems) => {
            let parts: Vec<_> = elems.iter().map(|e| render(ast, *e, interner)).collect();
            format!("{{{}}}", parts.join(", "))
        }
        ExprKind::Error => "<error>".to_string(),
    }
}

pub(super) fn render_type(ast: &Ast, ty: &TypeExpr, interner: &StringInterner) -> String {
    match &ty.kind {
        TypeExprKind::Primitive(p) => p.to_string(),
        TypeExprKind::Auto => "auto".to_string(),
        TypeExprKind::Path { path, args } => {
            let mut out = path
                .segments
                .iter()
                .map(|n| interner.lookup(*n))
                .collect::<Vec<_>>()
                .join("::");
            if !args.is_empty() {
                let parts: Vec<_> = args
                    .iter()
                    .map(|a| match a {
                        TemplateArgExpr::Type(t) => render_type(ast, t, interner),
                        TemplateArgExpr::Value(e) => render(ast, *e, interner),
                    })
                    .collect();
                out.push_str(&format!("<{}>", parts.join(", ")));
            }
            out
        }
        TypeExprKind::Span { elem, len } => format!(
            "span<{}, {}>",
            render_type(ast, elem, interner),
            render(ast, *len, interner)
        ),
        TypeExprKind::Dyn(elem) => format!("dyn<{}>", render_type(ast, elem, interner)),
        TypeExprKind::Ref(inner) => format!("{}&", render_type(ast, inner, interner)),
        TypeExprKind::Error => "<error>".to_string(),
    }
}
