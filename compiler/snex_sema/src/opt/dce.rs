//! Dead code elimination.
//!
//! Per block, after its nested blocks:
//! - statements after one that always leaves the block are dropped
//! - `if` with a constant condition keeps the taken arm, `while (false)`
//!   disappears and `for (init; false; ...)` keeps only `init`
//! - expression statements that are pure and cannot fault are dropped
//! - declarations of locals nothing refers to are dropped when their
//!   initializer is pure and cannot fault
//! - empty blocks are dropped
//!
//! Removing a local can make another one unused, so the pass repeats
//! until nothing changes.

use rustc_hash::FxHashSet;
use snex_types::LocalId;

use super::effects::{can_fault, is_pure, referenced_locals};
use crate::eval;
use crate::ir::visitor::{walk_stmt_mut, MutVisitor};
use crate::ir::{IrExpr, IrLocal, IrModule, IrStmt, IrStmtKind};

/// Rounds per function before giving up on reaching a fixed point.
const MAX_ROUNDS: usize = 8;

/// Eliminate dead code in every function of `module`. Returns the number
/// of removed statements.
pub fn run(module: &mut IrModule) -> usize {
    let mut total = 0;
    for func in &mut module.functions {
        for _ in 0..MAX_ROUNDS {
            let mut eliminator = Eliminator {
                locals: &func.locals,
                referenced: referenced_locals(&func.body),
                changes: 0,
            };
            eliminator.visit_block(&mut func.body);
            total += eliminator.changes;
            if eliminator.changes == 0 {
                break;
            }
        }
    }
    total
}

struct Eliminator<'a> {
    locals: &'a [IrLocal],
    referenced: FxHashSet<LocalId>,
    changes: usize,
}

impl Eliminator<'_> {
    fn is_dead(&self, stmt: &IrStmt) -> bool {
        match &stmt.kind {
            IrStmtKind::Expr(e) => removable(e),
            IrStmtKind::Local { local, init } => {
                let is_param = self.locals.get(local.index()).map_or(true, |l| l.is_param);
                !is_param && !self.referenced.contains(local) && removable(init)
            }
            IrStmtKind::Block(stmts) => stmts.is_empty(),
            IrStmtKind::If {
                cond,
                then_body,
                else_body,
            } => then_body.is_empty() && else_body.is_empty() && removable(cond),
            _ => false,
        }
    }
}

impl MutVisitor for Eliminator<'_> {
    fn visit_stmt(&mut self, stmt: &mut IrStmt) {
        walk_stmt_mut(self, stmt);
        let replacement = match &mut stmt.kind {
            IrStmtKind::If {
                cond,
                then_body,
                else_body,
            } => cond.as_const().map(|c| {
                let taken = if eval::truthy(c) { then_body } else { else_body };
                std::mem::take(taken)
            }),
            IrStmtKind::While { cond, .. } => cond
                .as_const()
                .filter(|c| !eval::truthy(*c))
                .map(|_| Vec::new()),
            IrStmtKind::For {
                init,
                cond: Some(cond),
                ..
            } => cond
                .as_const()
                .filter(|c| !eval::truthy(*c))
                .map(|_| std::mem::take(init)),
            _ => None,
        };
        if let Some(stmts) = replacement {
            stmt.kind = IrStmtKind::Block(stmts);
            self.changes += 1;
        }
    }

    fn visit_block(&mut self, stmts: &mut Vec<IrStmt>) {
        for stmt in stmts.iter_mut() {
            self.visit_stmt(stmt);
        }
        let before = stmts.len();
        let mut kept = Vec::with_capacity(before);
        for stmt in stmts.drain(..) {
            if self.is_dead(&stmt) {
                continue;
            }
            let leaves = diverges(&stmt);
            kept.push(stmt);
            if leaves {
                break;
            }
        }
        self.changes += before - kept.len();
        *stmts = kept;
    }
}

fn removable(expr: &IrExpr) -> bool {
    is_pure(expr) && !can_fault(expr)
}

/// Whether control never reaches the statement after `stmt`.
fn diverges(stmt: &IrStmt) -> bool {
    match &stmt.kind {
        IrStmtKind::Return(_) | IrStmtKind::Break | IrStmtKind::Continue => true,
        IrStmtKind::Block(stmts) => stmts.iter().any(diverges),
        IrStmtKind::If {
            then_body,
            else_body,
            ..
        } => then_body.iter().any(diverges) && else_body.iter().any(diverges),
        _ => false,
    }
}
