//! IR traversal.
//!
//! [`Visitor`] walks the tree immutably, [`MutVisitor`] in place. Override
//! `visit_*` to act on a node and call the matching `walk_*` function to
//! continue into its children.

use super::{InlinedCall, IrExpr, IrExprKind, IrPlace, IrStmt, IrStmtKind, PlaceKind};

pub trait Visitor<'ir> {
    fn visit_stmt(&mut self, stmt: &'ir IrStmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ir IrExpr) {
        walk_expr(self, expr);
    }

    fn visit_place(&mut self, place: &'ir IrPlace) {
        walk_place(self, place);
    }

    fn visit_block(&mut self, stmts: &'ir [IrStmt]) {
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
    }
}

pub fn walk_stmt<'ir, V: Visitor<'ir> + ?Sized>(v: &mut V, stmt: &'ir IrStmt) {
    match &stmt.kind {
        IrStmtKind::Expr(e) | IrStmtKind::Local { init: e, .. } => v.visit_expr(e),
        IrStmtKind::Assign { place, value, .. } => {
            v.visit_place(place);
            v.visit_expr(value);
        }
        IrStmtKind::If {
            cond,
            then_body,
            else_body,
        } => {
            v.visit_expr(cond);
            v.visit_block(then_body);
            v.visit_block(else_body);
        }
        IrStmtKind::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_block(body);
        }
        IrStmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            v.visit_block(init);
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            v.visit_block(body);
            v.visit_block(update);
        }
        IrStmtKind::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        IrStmtKind::Block(stmts) => v.visit_block(stmts),
        IrStmtKind::Break | IrStmtKind::Continue => {}
    }
}

pub fn walk_expr<'ir, V: Visitor<'ir> + ?Sized>(v: &mut V, expr: &'ir IrExpr) {
    match &expr.kind {
        IrExprKind::Const(_) | IrExprKind::Zero => {}
        IrExprKind::Load(place) | IrExprKind::AddressOf(place) | IrExprKind::Len(place) => {
            v.visit_place(place);
        }
        IrExprKind::Materialize { value, .. } => v.visit_expr(value),
        IrExprKind::Unary { operand, .. } => v.visit_expr(operand),
        IrExprKind::Convert(inner) => v.visit_expr(inner),
        IrExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        IrExprKind::Select {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(cond);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        IrExprKind::Call { args, .. }
        | IrExprKind::CallExtern { args, .. }
        | IrExprKind::Aggregate(args) => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        IrExprKind::Inlined(call) => {
            let InlinedCall {
                bindings,
                body,
                value,
                ..
            } = &**call;
            for (_, arg) in bindings {
                v.visit_expr(arg);
            }
            v.visit_block(body);
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
    }
}

pub fn walk_place<'ir, V: Visitor<'ir> + ?Sized>(v: &mut V, place: &'ir IrPlace) {
    match &place.kind {
        PlaceKind::Local(_) | PlaceKind::Global(_) => {}
        PlaceKind::Deref(reference) => v.visit_expr(reference),
        PlaceKind::Field { base, .. } => v.visit_place(base),
        PlaceKind::Index { base, index, .. } => {
            v.visit_place(base);
            v.visit_expr(index);
        }
    }
}

pub trait MutVisitor {
    fn visit_stmt(&mut self, stmt: &mut IrStmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut IrExpr) {
        walk_expr_mut(self, expr);
    }

    fn visit_place(&mut self, place: &mut IrPlace) {
        walk_place_mut(self, place);
    }

    fn visit_block(&mut self, stmts: &mut Vec<IrStmt>) {
        for stmt in stmts.iter_mut() {
            self.visit_stmt(stmt);
        }
    }
}

pub fn walk_stmt_mut<V: MutVisitor + ?Sized>(v: &mut V, stmt: &mut IrStmt) {
    match &mut stmt.kind {
        IrStmtKind::Expr(e) | IrStmtKind::Local { init: e, .. } => v.visit_expr(e),
        IrStmtKind::Assign { place, value, .. } => {
            v.visit_place(place);
            v.visit_expr(value);
        }
        IrStmtKind::If {
            cond,
            then_body,
            else_body,
        } => {
            v.visit_expr(cond);
            v.visit_block(then_body);
            v.visit_block(else_body);
        }
        IrStmtKind::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_block(body);
        }
        IrStmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            v.visit_block(init);
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            v.visit_block(body);
            v.visit_block(update);
        }
        IrStmtKind::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        IrStmtKind::Block(stmts) => v.visit_block(stmts),
        IrStmtKind::Break | IrStmtKind::Continue => {}
    }
}

pub fn walk_expr_mut<V: MutVisitor + ?Sized>(v: &mut V, expr: &mut IrExpr) {
    match &mut expr.kind {
        IrExprKind::Const(_) | IrExprKind::Zero => {}
        IrExprKind::Load(place) | IrExprKind::AddressOf(place) | IrExprKind::Len(place) => {
            v.visit_place(place);
        }
        IrExprKind::Materialize { value, .. } => v.visit_expr(value),
        IrExprKind::Unary { operand, .. } => v.visit_expr(operand),
        IrExprKind::Convert(inner) => v.visit_expr(inner),
        IrExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        IrExprKind::Select {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(cond);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        IrExprKind::Call { args, .. }
        | IrExprKind::CallExtern { args, .. }
        | IrExprKind::Aggregate(args) => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        IrExprKind::Inlined(call) => {
            for (_, arg) in &mut call.bindings {
                v.visit_expr(arg);
            }
            v.visit_block(&mut call.body);
            if let Some(value) = &mut call.value {
                v.visit_expr(value);
            }
        }
    }
}

pub fn walk_place_mut<V: MutVisitor + ?Sized>(v: &mut V, place: &mut IrPlace) {
    match &mut place.kind {
        PlaceKind::Local(_) | PlaceKind::Global(_) => {}
        PlaceKind::Deref(reference) => v.visit_expr(reference),
        PlaceKind::Field { base, .. } => v.visit_place(base),
        PlaceKind::Index { base, index, .. } => {
            v.visit_place(base);
            v.visit_expr(index);
        }
    }
}

/// Statements in `stmts`, counting nested bodies.
pub fn count_statements(stmts: &[IrStmt]) -> usize {
    struct Counter(usize);
    impl<'ir> Visitor<'ir> for Counter {
        fn visit_stmt(&mut self, stmt: &'ir IrStmt) {
            self.0 += 1;
            walk_stmt(self, stmt);
        }
    }
    let mut counter = Counter(0);
    counter.visit_block(stmts);
    counter.0
}
