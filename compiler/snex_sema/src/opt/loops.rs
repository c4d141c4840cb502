//! Loop-invariant code motion.
//!
//! A compound expression inside a `while` or `for` loop is invariant when
//! every leaf is a constant or a load of a local the loop never writes and
//! whose address is never taken. Invariant expressions that are pure and
//! cannot fault are computed once into a fresh local declared right before
//! the loop; evaluating them when the loop runs zero times is harmless.
//!
//! Inner loops are processed first. Range-for loops are `for` loops in the
//! IR and are covered by the same rule.

use rustc_hash::FxHashSet;
use snex_types::LocalId;

use super::effects::{address_taken, can_fault, is_pure, written_locals, written_locals_in_expr};
use crate::ir::visitor::{walk_expr_mut, walk_stmt_mut, MutVisitor};
use crate::ir::{IrExpr, IrExprKind, IrLocal, IrModule, IrPlace, IrStmt, IrStmtKind, PlaceKind};

/// Hoist invariant expressions out of every loop of `module`. Returns the
/// number of hoisted expressions.
pub fn run(module: &mut IrModule) -> usize {
    let mut hoisted = 0;
    for func in &mut module.functions {
        let mut body = std::mem::take(&mut func.body);
        let mut hoister = Hoister {
            escaped: address_taken(&body),
            locals: &mut func.locals,
            hoisted: 0,
        };
        hoister.visit_block(&mut body);
        hoisted += hoister.hoisted;
        func.body = body;
    }
    hoisted
}

struct Hoister<'f> {
    locals: &'f mut Vec<IrLocal>,
    /// Locals a reference may write behind the loop's back.
    escaped: FxHashSet<LocalId>,
    hoisted: usize,
}

impl MutVisitor for Hoister<'_> {
    fn visit_block(&mut self, stmts: &mut Vec<IrStmt>) {
        let mut out = Vec::with_capacity(stmts.len());
        for mut stmt in stmts.drain(..) {
            // Inner loops and nested blocks first.
            walk_stmt_mut(self, &mut stmt);
            out.extend(self.hoist(&mut stmt));
            out.push(stmt);
        }
        *stmts = out;
    }
}

impl Hoister<'_> {
    /// Declarations of the expressions hoisted out of `stmt`, in order.
    fn hoist(&mut self, stmt: &mut IrStmt) -> Vec<IrStmt> {
        let mut written = match &stmt.kind {
            IrStmtKind::While { cond, body } => {
                let mut written = written_locals(body);
                written.extend(written_locals_in_expr(cond));
                written
            }
            IrStmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let mut written = written_locals(init);
                written.extend(written_locals(update));
                written.extend(written_locals(body));
                if let Some(cond) = cond {
                    written.extend(written_locals_in_expr(cond));
                }
                written
            }
            _ => return Vec::new(),
        };
        written.extend(self.escaped.iter().copied());

        let mut motion = Motion {
            locals: &mut *self.locals,
            written: &written,
            hoisted: Vec::new(),
        };
        match &mut stmt.kind {
            IrStmtKind::While { cond, body } => {
                motion.visit_expr(cond);
                motion.visit_block(body);
            }
            IrStmtKind::For {
                cond, update, body, ..
            } => {
                if let Some(cond) = cond {
                    motion.visit_expr(cond);
                }
                motion.visit_block(body);
                motion.visit_block(update);
            }
            _ => {}
        }
        self.hoisted += motion.hoisted.len();
        let span = stmt.span;
        motion
            .hoisted
            .into_iter()
            .map(|(local, init)| IrStmt::new(IrStmtKind::Local { local, init }, span))
            .collect()
    }
}

/// Replaces invariant subexpressions of one loop with loads of new locals.
struct Motion<'a> {
    locals: &'a mut Vec<IrLocal>,
    written: &'a FxHashSet<LocalId>,
    hoisted: Vec<(LocalId, IrExpr)>,
}

impl Motion<'_> {
    fn is_invariant(&self, expr: &IrExpr) -> bool {
        match &expr.kind {
            IrExprKind::Const(_) => true,
            IrExprKind::Load(place) => match place.kind {
                PlaceKind::Local(local) => !self.written.contains(&local),
                _ => false,
            },
            IrExprKind::Unary { operand, .. } | IrExprKind::Convert(operand) => {
                self.is_invariant(operand)
            }
            IrExprKind::Binary { lhs, rhs, .. } => self.is_invariant(lhs) && self.is_invariant(rhs),
            _ => false,
        }
    }

    fn new_temp(&mut self, expr: &IrExpr) -> LocalId {
        let id = LocalId::from_len(self.locals.len());
        self.locals.push(IrLocal {
            name: format!("$inv{}", self.locals.len()),
            ty: expr.ty,
            is_const: true,
            is_param: false,
        });
        id
    }
}

impl MutVisitor for Motion<'_> {
    fn visit_expr(&mut self, expr: &mut IrExpr) {
        let compound = matches!(
            expr.kind,
            IrExprKind::Unary { .. } | IrExprKind::Convert(_) | IrExprKind::Binary { .. }
        );
        if compound && self.is_invariant(expr) && is_pure(expr) && !can_fault(expr) {
            let local = self.new_temp(expr);
            let load = IrExpr::load(IrPlace::local(local, expr.ty), expr.span);
            let invariant = std::mem::replace(expr, load);
            self.hoisted.push((local, invariant));
            return;
        }
        walk_expr_mut(self, expr);
    }
}
