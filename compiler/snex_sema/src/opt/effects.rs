//! Side-effect queries shared by the passes.

use rustc_hash::FxHashSet;
use snex_ir::BinaryOp;
use snex_types::{LocalId, TypeId};

use crate::ir::visitor::{walk_expr, walk_place, walk_stmt, Visitor};
use crate::ir::{IrExpr, IrExprKind, IrPlace, IrStmt, IrStmtKind, PlaceKind};

/// Whether evaluating `expr` has no effect besides producing its value.
///
/// Calls are never pure; host functions and callee bodies may write
/// globals or references.
pub fn is_pure(expr: &IrExpr) -> bool {
    struct Purity(bool);
    impl<'ir> Visitor<'ir> for Purity {
        fn visit_expr(&mut self, expr: &'ir IrExpr) {
            if !self.0 {
                return;
            }
            match expr.kind {
                IrExprKind::Call { .. } | IrExprKind::CallExtern { .. } | IrExprKind::Inlined(_) => {
                    self.0 = false;
                }
                _ => walk_expr(self, expr),
            }
        }
    }
    let mut purity = Purity(true);
    purity.visit_expr(expr);
    purity.0
}

/// Whether evaluating `expr` may raise a runtime fault: a bounds-checked
/// index or an integer division whose divisor is not a non-zero constant.
pub fn can_fault(expr: &IrExpr) -> bool {
    struct Faults(bool);
    impl<'ir> Visitor<'ir> for Faults {
        fn visit_expr(&mut self, expr: &'ir IrExpr) {
            if self.0 {
                return;
            }
            if let IrExprKind::Binary {
                op: BinaryOp::Div | BinaryOp::Mod,
                rhs,
                ..
            } = &expr.kind
            {
                let constant_divisor = rhs.as_const().is_some_and(|c| !c.is_zero());
                if expr.ty == TypeId::INT && !constant_divisor {
                    self.0 = true;
                    return;
                }
            }
            walk_expr(self, expr);
        }

        fn visit_place(&mut self, place: &'ir IrPlace) {
            if let PlaceKind::Index { checked: true, .. } = place.kind {
                self.0 = true;
                return;
            }
            walk_place(self, place);
        }
    }
    let mut faults = Faults(false);
    faults.visit_expr(expr);
    faults.0
}

/// Locals that `stmts` may write: declarations, assignments rooted in a
/// local, address-taken and materialized slots and inlined parameter
/// bindings.
pub fn written_locals(stmts: &[IrStmt]) -> FxHashSet<LocalId> {
    let mut writes = Writes::default();
    writes.visit_block(stmts);
    writes.0
}

/// Locals written by `expr` (through `Materialize`, `AddressOf` or an
/// inlined body).
pub fn written_locals_in_expr(expr: &IrExpr) -> FxHashSet<LocalId> {
    let mut writes = Writes::default();
    writes.visit_expr(expr);
    writes.0
}

#[derive(Default)]
struct Writes(FxHashSet<LocalId>);

impl<'ir> Visitor<'ir> for Writes {
    fn visit_stmt(&mut self, stmt: &'ir IrStmt) {
        match &stmt.kind {
            IrStmtKind::Local { local, .. } => {
                self.0.insert(*local);
            }
            IrStmtKind::Assign { place, .. } => {
                if let Some(local) = place.root_local() {
                    self.0.insert(local);
                }
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ir IrExpr) {
        match &expr.kind {
            IrExprKind::AddressOf(place) => {
                if let Some(local) = place.root_local() {
                    self.0.insert(local);
                }
            }
            IrExprKind::Materialize { local, .. } => {
                self.0.insert(*local);
            }
            IrExprKind::Inlined(call) => {
                self.0.extend(call.bindings.iter().map(|(local, _)| *local));
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

/// Locals whose address escapes into a reference anywhere in `stmts`.
pub fn address_taken(stmts: &[IrStmt]) -> FxHashSet<LocalId> {
    struct Taken(FxHashSet<LocalId>);
    impl<'ir> Visitor<'ir> for Taken {
        fn visit_expr(&mut self, expr: &'ir IrExpr) {
            match &expr.kind {
                IrExprKind::AddressOf(place) => {
                    if let Some(local) = place.root_local() {
                        self.0.insert(local);
                    }
                }
                IrExprKind::Materialize { local, .. } => {
                    self.0.insert(*local);
                }
                _ => {}
            }
            walk_expr(self, expr);
        }
    }
    let mut taken = Taken(FxHashSet::default());
    taken.visit_block(stmts);
    taken.0
}

/// Locals mentioned anywhere in `stmts` other than in their own
/// declaration statement.
pub fn referenced_locals(stmts: &[IrStmt]) -> FxHashSet<LocalId> {
    struct Refs(FxHashSet<LocalId>);
    impl<'ir> Visitor<'ir> for Refs {
        fn visit_expr(&mut self, expr: &'ir IrExpr) {
            match &expr.kind {
                IrExprKind::Materialize { local, .. } => {
                    self.0.insert(*local);
                }
                IrExprKind::Inlined(call) => {
                    self.0.extend(call.bindings.iter().map(|(local, _)| *local));
                }
                _ => {}
            }
            walk_expr(self, expr);
        }

        fn visit_place(&mut self, place: &'ir IrPlace) {
            if let PlaceKind::Local(local) = place.kind {
                self.0.insert(local);
            }
            walk_place(self, place);
        }
    }
    let mut refs = Refs(FxHashSet::default());
    refs.visit_block(stmts);
    refs.0
}
