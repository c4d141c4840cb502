//! Constant folding.
//!
//! Bottom-up: after a node's children are folded, a node whose operands
//! are all constants is evaluated with [`crate::eval`], the same scalar
//! semantics the generated code has. Integer division or modulo by zero
//! is never folded so the runtime fault is preserved.
//!
//! Loads of `const` globals with a known value and of `const` locals
//! initialized with a constant are replaced by the value. `if` statements
//! and `?:` selects with a constant condition keep only the taken arm;
//! `&&`/`||` with a constant left operand are short-circuited.

use rustc_hash::FxHashMap;
use snex_ir::{BinaryOp, ConstValue};
use snex_types::LocalId;

use crate::eval;
use crate::ir::visitor::{walk_expr_mut, walk_stmt_mut, MutVisitor};
use crate::ir::{IrExpr, IrExprKind, IrGlobal, IrLocal, IrModule, IrStmt, IrStmtKind, PlaceKind};

/// Fold every function of `module`. Returns the number of folded nodes.
pub fn run(module: &mut IrModule) -> usize {
    let globals = &module.globals;
    let mut changes = 0;
    for func in &mut module.functions {
        let mut folder = Folder {
            globals,
            locals: &func.locals,
            const_locals: FxHashMap::default(),
            changes: 0,
        };
        folder.visit_block(&mut func.body);
        if folder.changes > 0 {
            tracing::trace!(function = %func.name, changes = folder.changes, "folded");
        }
        changes += folder.changes;
    }
    changes
}

struct Folder<'a> {
    globals: &'a [IrGlobal],
    locals: &'a [IrLocal],
    /// `const` locals whose initializer folded to a constant. A local's
    /// declaration precedes every use, so the map is complete whenever a
    /// load of the local is visited.
    const_locals: FxHashMap<LocalId, ConstValue>,
    changes: usize,
}

impl Folder<'_> {
    fn lookup(&self, place: &PlaceKind) -> Option<ConstValue> {
        match place {
            PlaceKind::Global(id) => self.globals.get(id.index()).and_then(|g| g.constant),
            PlaceKind::Local(id) => self.const_locals.get(id).copied(),
            _ => None,
        }
    }

    fn fold(&mut self, expr: &mut IrExpr) {
        let replacement = if has_constant_operands(expr) {
            eval::evaluate(expr, &|place| self.lookup(place))
                .map(|value| IrExpr::constant(value, expr.span))
        } else {
            short_circuit(expr)
        };
        if let Some(replacement) = replacement {
            *expr = replacement;
            self.changes += 1;
        }
    }
}

fn has_constant_operands(expr: &IrExpr) -> bool {
    match &expr.kind {
        IrExprKind::Load(_) => true,
        IrExprKind::Unary { operand, .. } | IrExprKind::Convert(operand) => {
            operand.as_const().is_some()
        }
        IrExprKind::Binary { lhs, rhs, .. } => lhs.as_const().is_some() && rhs.as_const().is_some(),
        _ => false,
    }
}

/// Logical operators and selects decided by a constant operand.
fn short_circuit(expr: &mut IrExpr) -> Option<IrExpr> {
    let span = expr.span;
    match &mut expr.kind {
        IrExprKind::Binary { op, lhs, rhs } => match (*op, lhs.as_const()?) {
            (BinaryOp::And, ConstValue::Bool(false)) | (BinaryOp::Or, ConstValue::Bool(true)) => {
                lhs.as_const().map(|c| IrExpr::constant(c, span))
            }
            (BinaryOp::And, ConstValue::Bool(true)) | (BinaryOp::Or, ConstValue::Bool(false)) => {
                Some(std::mem::replace(&mut **rhs, IrExpr::error(span)))
            }
            _ => None,
        },
        IrExprKind::Select {
            cond,
            then_expr,
            else_expr,
        } => {
            let taken = if eval::truthy(cond.as_const()?) {
                then_expr
            } else {
                else_expr
            };
            Some(std::mem::replace(&mut **taken, IrExpr::error(span)))
        }
        _ => None,
    }
}

impl MutVisitor for Folder<'_> {
    fn visit_expr(&mut self, expr: &mut IrExpr) {
        walk_expr_mut(self, expr);
        self.fold(expr);
    }

    fn visit_stmt(&mut self, stmt: &mut IrStmt) {
        walk_stmt_mut(self, stmt);
        match &mut stmt.kind {
            IrStmtKind::Local { local, init } => {
                let is_const = self
                    .locals
                    .get(local.index())
                    .is_some_and(|l| l.is_const && !l.is_param);
                if let (true, Some(value)) = (is_const, init.as_const()) {
                    self.const_locals.insert(*local, value);
                }
            }
            IrStmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                if let Some(c) = cond.as_const() {
                    let taken = if eval::truthy(c) { then_body } else { else_body };
                    stmt.kind = IrStmtKind::Block(std::mem::take(taken));
                    self.changes += 1;
                }
            }
            _ => {}
        }
    }
}
