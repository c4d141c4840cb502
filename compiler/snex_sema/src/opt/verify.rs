//! Structural IR verifier.
//!
//! Run after every optimization pass. Checks what the code generator
//! relies on:
//! - local and function ids are in range
//! - `break`/`continue` only inside a loop, never inside an inlined body
//! - `return` never inside an inlined body
//! - no error-typed expression survives
//! - binary operands share a type; comparisons and logical operators
//!   yield `bool`, every other operator yields the operand type
//! - a load has its place's type
//! - a returned value has the function's return type

use snex_ir::BinaryOp;
use snex_types::{FuncId, LocalId, TypeId};

use crate::ir::visitor::{walk_expr, walk_place, walk_stmt, Visitor};
use crate::ir::{IrExpr, IrExprKind, IrFunction, IrModule, IrPlace, IrStmt, IrStmtKind, PlaceKind};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("`{function}`: local ${local} out of range")]
    LocalOutOfRange { function: String, local: usize },
    #[error("`{function}`: call to unknown function #{callee}")]
    UnknownFunction { function: String, callee: usize },
    #[error("`{function}`: `{stmt}` outside of a loop")]
    StrayJump { function: String, stmt: &'static str },
    #[error("`{function}`: `return` inside an inlined body")]
    ReturnInInlinedBody { function: String },
    #[error("`{function}`: error-typed expression")]
    ErrorType { function: String },
    #[error("`{function}`: {detail}")]
    TypeMismatch { function: String, detail: String },
}

/// Verify every function of `module`, stopping at the first violation.
pub fn verify_module(module: &IrModule) -> Result<(), VerifyError> {
    for func in &module.functions {
        let mut verifier = Verifier {
            module,
            func,
            loop_depth: 0,
            inlined_depth: 0,
            error: None,
        };
        verifier.visit_block(&func.body);
        if let Some(err) = verifier.error {
            return Err(err);
        }
    }
    Ok(())
}

struct Verifier<'m> {
    module: &'m IrModule,
    func: &'m IrFunction,
    loop_depth: usize,
    inlined_depth: usize,
    error: Option<VerifyError>,
}

impl<'m> Verifier<'m> {
    fn fail(&mut self, make: impl FnOnce(String) -> VerifyError) {
        if self.error.is_none() {
            self.error = Some(make(self.func.name.clone()));
        }
    }

    fn check_local(&mut self, local: LocalId) {
        if local.index() >= self.func.locals.len() {
            self.fail(|function| VerifyError::LocalOutOfRange {
                function,
                local: local.index(),
            });
        }
    }

    fn check_callee(&mut self, callee: FuncId) {
        if self.module.function(callee).is_none() {
            self.fail(|function| VerifyError::UnknownFunction {
                function,
                callee: callee.index(),
            });
        }
    }

    fn mismatch(&mut self, detail: String) {
        self.fail(|function| VerifyError::TypeMismatch { function, detail });
    }

    fn check_binary(&mut self, expr: &IrExpr, op: BinaryOp, lhs: &IrExpr, rhs: &IrExpr) {
        if lhs.ty != rhs.ty {
            self.mismatch(format!(
                "operands of `{}` have different types (#{} and #{})",
                op.as_symbol(),
                lhs.ty.raw(),
                rhs.ty.raw()
            ));
            return;
        }
        let expected = if op.is_comparison() || op.is_logical() {
            TypeId::BOOL
        } else {
            lhs.ty
        };
        if expr.ty != expected {
            self.mismatch(format!(
                "`{}` yields #{} instead of #{}",
                op.as_symbol(),
                expr.ty.raw(),
                expected.raw()
            ));
        }
    }

    fn visit_loop_body(&mut self, body: &'m [IrStmt]) {
        self.loop_depth += 1;
        self.visit_block(body);
        self.loop_depth -= 1;
    }
}

impl<'m> Visitor<'m> for Verifier<'m> {
    fn visit_stmt(&mut self, stmt: &'m IrStmt) {
        if self.error.is_some() {
            return;
        }
        match &stmt.kind {
            IrStmtKind::Local { local, .. } => self.check_local(*local),
            IrStmtKind::Break | IrStmtKind::Continue if self.loop_depth == 0 => {
                let name = if matches!(stmt.kind, IrStmtKind::Break) {
                    "break"
                } else {
                    "continue"
                };
                self.fail(|function| VerifyError::StrayJump {
                    function,
                    stmt: name,
                });
            }
            IrStmtKind::Return(value) => {
                if self.inlined_depth > 0 {
                    self.fail(|function| VerifyError::ReturnInInlinedBody { function });
                } else if let Some(value) = value {
                    if value.ty != self.func.ret {
                        self.mismatch(format!(
                            "returns #{} from a function returning #{}",
                            value.ty.raw(),
                            self.func.ret.raw()
                        ));
                    }
                }
            }
            IrStmtKind::While { cond, body } => {
                self.visit_expr(cond);
                self.visit_loop_body(body);
                return;
            }
            IrStmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.visit_block(init);
                if let Some(cond) = cond {
                    self.visit_expr(cond);
                }
                self.visit_loop_body(body);
                self.visit_loop_body(update);
                return;
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'m IrExpr) {
        if self.error.is_some() {
            return;
        }
        if expr.is_error() {
            self.fail(|function| VerifyError::ErrorType { function });
            return;
        }
        match &expr.kind {
            IrExprKind::Load(place) if place.ty != expr.ty => {
                self.mismatch(format!(
                    "load of #{} typed #{}",
                    place.ty.raw(),
                    expr.ty.raw()
                ));
            }
            IrExprKind::Binary { op, lhs, rhs } => self.check_binary(expr, *op, lhs, rhs),
            IrExprKind::Materialize { local, .. } => self.check_local(*local),
            IrExprKind::Call { callee, .. } => self.check_callee(*callee),
            IrExprKind::Inlined(call) => {
                self.check_callee(call.callee);
                for (local, _) in &call.bindings {
                    self.check_local(*local);
                }
                // Jumps inside an inlined body cannot reach the caller's loops.
                let loop_depth = std::mem::replace(&mut self.loop_depth, 0);
                self.inlined_depth += 1;
                walk_expr(self, expr);
                self.inlined_depth -= 1;
                self.loop_depth = loop_depth;
                return;
            }
            _ => {}
        }
        walk_expr(self, expr);
    }

    fn visit_place(&mut self, place: &'m IrPlace) {
        if let PlaceKind::Local(local) = place.kind {
            self.check_local(local);
        }
        walk_place(self, place);
    }
}
