//! Statement lowering and structured control flow.

use snex_ir::BinaryOp;
use snex_sema::eval;
use snex_sema::ir::{IrExpr, IrPlace, IrStmt, IrStmtKind};

use super::{eval_fault, Code, Lowerer, Repr};
use crate::runtime::Machine;
use crate::{CodegenError, FaultReason, RuntimeFault};

/// How control leaves a statement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) enum Flow {
    Next,
    Break,
    Continue,
    Return,
}

pub(super) type StmtFn = Box<dyn Fn(&mut Machine<'_>) -> Result<Flow, RuntimeFault> + Send + Sync>;

fn stmt<F>(f: F) -> StmtFn
where
    F: Fn(&mut Machine<'_>) -> Result<Flow, RuntimeFault> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Run statements in order until one leaves the block.
pub(super) fn run_block(block: &[StmtFn], m: &mut Machine<'_>) -> Result<Flow, RuntimeFault> {
    for s in block {
        let flow = s(m)?;
        if flow != Flow::Next {
            return Ok(flow);
        }
    }
    Ok(Flow::Next)
}

impl Lowerer<'_> {
    pub(super) fn lower_block(&self, stmts: &[IrStmt]) -> Result<Vec<StmtFn>, CodegenError> {
        stmts.iter().map(|s| self.lower_stmt(s)).collect()
    }

    fn lower_stmt(&self, s: &IrStmt) -> Result<StmtFn, CodegenError> {
        snex_stack::ensure_sufficient_stack(|| self.lower_stmt_inner(s))
    }

    fn lower_stmt_inner(&self, s: &IrStmt) -> Result<StmtFn, CodegenError> {
        Ok(match &s.kind {
            IrStmtKind::Expr(expr) => {
                let run = self.lower_expr(expr)?.into_effect();
                stmt(move |m| run(m).map(|()| Flow::Next))
            }
            IrStmtKind::Local { local, init } => {
                let offset = self.local_offset(local.index())?;
                let init = self.lower_store(init)?;
                stmt(move |m| {
                    let slot = m.fp.wrapping_add(offset);
                    init(m, slot)?;
                    Ok(Flow::Next)
                })
            }
            IrStmtKind::Assign { place, op, value } => match op {
                None => {
                    let target = self.lower_place(place)?;
                    let value = self.lower_store(value)?;
                    stmt(move |m| {
                        let at = target(m)?;
                        value(m, at)?;
                        Ok(Flow::Next)
                    })
                }
                Some(op) => self.lower_compound(place, *op, value)?,
            },
            IrStmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let cond = self.lower_scalar(cond)?;
                let then_body = self.lower_block(then_body)?;
                let else_body = self.lower_block(else_body)?;
                stmt(move |m| {
                    if eval::truthy(cond(m)?) {
                        run_block(&then_body, m)
                    } else {
                        run_block(&else_body, m)
                    }
                })
            }
            IrStmtKind::While { cond, body } => {
                let cond = self.lower_scalar(cond)?;
                let body = self.lower_block(body)?;
                stmt(move |m| {
                    while eval::truthy(cond(m)?) {
                        match run_block(&body, m)? {
                            Flow::Break => break,
                            Flow::Return => return Ok(Flow::Return),
                            Flow::Next | Flow::Continue => {}
                        }
                    }
                    Ok(Flow::Next)
                })
            }
            IrStmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let init = self.lower_block(init)?;
                let cond = cond.as_ref().map(|c| self.lower_scalar(c)).transpose()?;
                let update = self.lower_block(update)?;
                let body = self.lower_block(body)?;
                stmt(move |m| {
                    if run_block(&init, m)? == Flow::Return {
                        return Ok(Flow::Return);
                    }
                    loop {
                        if let Some(cond) = &cond {
                            if !eval::truthy(cond(m)?) {
                                break;
                            }
                        }
                        match run_block(&body, m)? {
                            Flow::Break => break,
                            Flow::Return => return Ok(Flow::Return),
                            Flow::Next | Flow::Continue => {}
                        }
                        run_block(&update, m)?;
                    }
                    Ok(Flow::Next)
                })
            }
            IrStmtKind::Return(value) => self.lower_return(value.as_ref())?,
            IrStmtKind::Break => stmt(|_| Ok(Flow::Break)),
            IrStmtKind::Continue => stmt(|_| Ok(Flow::Continue)),
            IrStmtKind::Block(stmts) => {
                let body = self.lower_block(stmts)?;
                stmt(move |m| run_block(&body, m))
            }
        })
    }

    fn lower_return(&self, value: Option<&IrExpr>) -> Result<StmtFn, CodegenError> {
        let Some(value) = value else {
            return Ok(stmt(|_| Ok(Flow::Return)));
        };
        let code = self.lower_expr(value)?;
        Ok(match (self.frame.layout.ret, code) {
            (Some(ret), code) => {
                let write = code.into_store();
                stmt(move |m| {
                    let slot = m.fp.wrapping_add(ret);
                    write(m, slot)?;
                    Ok(Flow::Return)
                })
            }
            // `return f();` in a void function.
            (None, code) => {
                let run = code.into_effect();
                stmt(move |m| run(m).map(|()| Flow::Return))
            }
        })
    }

    /// `place op= value`: the operation runs in the value's type and the
    /// result is converted back to the place's type.
    fn lower_compound(
        &self,
        place: &IrPlace,
        op: BinaryOp,
        value: &IrExpr,
    ) -> Result<StmtFn, CodegenError> {
        let Repr::Scalar(place_prim) = self.repr(place.ty)? else {
            return Err(self.unsupported("compound assignment to a non-scalar"));
        };
        let Repr::Scalar(value_prim) = self.repr(value.ty)? else {
            return Err(self.unsupported("compound assignment of a non-scalar"));
        };
        let target = self.lower_place(place)?;
        let value = match self.lower_expr(value)? {
            Code::Scalar(f) => f,
            _ => return Err(self.unsupported("compound assignment of a non-scalar")),
        };
        let convert_fault = || {
            RuntimeFault::new(FaultReason::InvalidOperation, "invalid compound assignment")
        };
        Ok(stmt(move |m| {
            let at = target(m)?;
            let rhs = value(m)?;
            let current = m.read_scalar(at, place_prim)?;
            let lhs = eval::convert(current, value_prim).ok_or_else(convert_fault)?;
            let result = eval::binary(op, lhs, rhs).map_err(eval_fault)?;
            let result = eval::convert(result, place_prim).ok_or_else(convert_fault)?;
            m.write_scalar(at, result)?;
            Ok(Flow::Next)
        }))
    }
}
