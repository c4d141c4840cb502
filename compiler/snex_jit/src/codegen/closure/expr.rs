//! Expression lowering.

use snex_ir::{BinaryOp, ConstValue};
use snex_sema::eval;
use snex_sema::ir::{InlinedCall, IrExpr, IrExprKind, IrPlace};
use snex_types::{ExternId, FuncId, TypeId, TypeKind};

use super::stmt::run_block;
use super::{addr, effect, eval_fault, scalar, store, AddrFn, Code, Lowerer, Repr, ScalarFn, StoreFn};
use crate::runtime::Machine;
use crate::{CodegenError, FaultReason, RuntimeFault, Value};

impl Lowerer<'_> {
    pub(super) fn lower_expr(&self, expr: &IrExpr) -> Result<Code, CodegenError> {
        snex_stack::ensure_sufficient_stack(|| self.lower_expr_inner(expr))
    }

    pub(super) fn lower_scalar(&self, expr: &IrExpr) -> Result<ScalarFn, CodegenError> {
        match self.lower_expr(expr)? {
            Code::Scalar(f) => Ok(f),
            _ => Err(self.unsupported(format!(
                "`{}` used as a scalar",
                self.types().display(expr.ty)
            ))),
        }
    }

    pub(super) fn lower_addr(&self, expr: &IrExpr) -> Result<AddrFn, CodegenError> {
        match self.lower_expr(expr)? {
            Code::Addr(f) => Ok(f),
            _ => Err(self.unsupported(format!(
                "`{}` used as a reference",
                self.types().display(expr.ty)
            ))),
        }
    }

    pub(super) fn lower_store(&self, expr: &IrExpr) -> Result<StoreFn, CodegenError> {
        self.lower_expr(expr).map(Code::into_store)
    }

    fn lower_expr_inner(&self, expr: &IrExpr) -> Result<Code, CodegenError> {
        let repr = self.repr(expr.ty)?;
        match &expr.kind {
            IrExprKind::Const(value) => {
                let value = *value;
                Ok(Code::Scalar(scalar(move |_| Ok(value))))
            }
            IrExprKind::Zero => Ok(zero(repr)),
            IrExprKind::Load(place) => self.lower_load(place, repr),
            IrExprKind::AddressOf(place) => self.lower_place(place).map(Code::Addr),
            IrExprKind::Materialize { local, value } => {
                let offset = self.local_offset(local.index())?;
                let value = self.lower_store(value)?;
                Ok(Code::Addr(addr(move |m| {
                    let slot = m.fp.wrapping_add(offset);
                    value(m, slot)?;
                    Ok(slot)
                })))
            }
            IrExprKind::Len(place) => self.lower_len(place),
            IrExprKind::Unary { op, operand } => {
                let op = *op;
                let operand = self.lower_scalar(operand)?;
                Ok(Code::Scalar(scalar(move |m| {
                    eval::unary(op, operand(m)?).map_err(eval_fault)
                })))
            }
            IrExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs),
            IrExprKind::Convert(inner) => {
                let target = self
                    .types()
                    .as_primitive(expr.ty)
                    .ok_or_else(|| self.unsupported("conversion to a non-primitive type"))?;
                let inner = self.lower_scalar(inner)?;
                Ok(Code::Scalar(scalar(move |m| {
                    let value = inner(m)?;
                    eval::convert(value, target).ok_or_else(|| {
                        RuntimeFault::new(
                            FaultReason::InvalidOperation,
                            format!("cannot convert to `{}`", target.as_str()),
                        )
                    })
                })))
            }
            IrExprKind::Select {
                cond,
                then_expr,
                else_expr,
            } => self.lower_select(cond, then_expr, else_expr),
            IrExprKind::Call { callee, args } => self.lower_call(*callee, args, repr),
            IrExprKind::CallExtern { callee, args } => self.lower_extern_call(*callee, args, repr),
            IrExprKind::Aggregate(elements) => self.lower_aggregate(expr.ty, elements, repr),
            IrExprKind::Inlined(call) => self.lower_inlined(call),
        }
    }

    fn lower_load(&self, place: &IrPlace, repr: Repr) -> Result<Code, CodegenError> {
        let address = self.lower_place(place)?;
        Ok(match repr {
            Repr::Scalar(prim) => Code::Scalar(scalar(move |m| {
                let at = address(m)?;
                m.read_scalar(at, prim)
            })),
            Repr::Addr => Code::Addr(addr(move |m| {
                let at = address(m)?;
                m.read_u32(at)
            })),
            Repr::Memory(layout) => Code::Memory {
                store: store(move |m, dest| {
                    let src = address(m)?;
                    m.copy(dest, src, layout.size)
                }),
                layout,
            },
            Repr::Void => return Err(self.unsupported("load of a `void` place")),
        })
    }

    fn lower_len(&self, place: &IrPlace) -> Result<Code, CodegenError> {
        match self.types().kind(place.ty) {
            TypeKind::Span { len, .. } => {
                let len = i32::try_from(*len).unwrap_or(i32::MAX);
                Ok(Code::Scalar(scalar(move |_| Ok(ConstValue::Int(len)))))
            }
            TypeKind::Dyn { .. } => {
                let view = self.lower_place(place)?;
                Ok(Code::Scalar(scalar(move |m| {
                    let at = view(m)?;
                    let len = m.read_u32(at.wrapping_add(4))?;
                    Ok(ConstValue::Int(i32::try_from(len).unwrap_or(i32::MAX)))
                })))
            }
            _ => Err(self.unsupported(format!(
                "length of `{}`",
                self.types().display(place.ty)
            ))),
        }
    }

    fn lower_binary(&self, op: BinaryOp, lhs: &IrExpr, rhs: &IrExpr) -> Result<Code, CodegenError> {
        let lhs = self.lower_scalar(lhs)?;
        let rhs = self.lower_scalar(rhs)?;
        let code = match op {
            BinaryOp::And => scalar(move |m| {
                let value = eval::truthy(lhs(m)?) && eval::truthy(rhs(m)?);
                Ok(ConstValue::Bool(value))
            }),
            BinaryOp::Or => scalar(move |m| {
                let value = eval::truthy(lhs(m)?) || eval::truthy(rhs(m)?);
                Ok(ConstValue::Bool(value))
            }),
            _ => scalar(move |m| {
                let a = lhs(m)?;
                let b = rhs(m)?;
                eval::binary(op, a, b).map_err(eval_fault)
            }),
        };
        Ok(Code::Scalar(code))
    }

    fn lower_select(
        &self,
        cond: &IrExpr,
        then_expr: &IrExpr,
        else_expr: &IrExpr,
    ) -> Result<Code, CodegenError> {
        let cond = self.lower_scalar(cond)?;
        Ok(match (self.lower_expr(then_expr)?, self.lower_expr(else_expr)?) {
            (Code::Scalar(a), Code::Scalar(b)) => Code::Scalar(scalar(move |m| {
                if eval::truthy(cond(m)?) {
                    a(m)
                } else {
                    b(m)
                }
            })),
            (Code::Addr(a), Code::Addr(b)) => Code::Addr(addr(move |m| {
                if eval::truthy(cond(m)?) {
                    a(m)
                } else {
                    b(m)
                }
            })),
            (Code::Memory { store: a, layout }, other) => {
                let b = other.into_store();
                Code::Memory {
                    store: store(move |m, dest| {
                        if eval::truthy(cond(m)?) {
                            a(m, dest)
                        } else {
                            b(m, dest)
                        }
                    }),
                    layout,
                }
            }
            (a, b) => {
                let (a, b) = (a.into_effect(), b.into_effect());
                Code::Effect(effect(move |m| {
                    if eval::truthy(cond(m)?) {
                        a(m)
                    } else {
                        b(m)
                    }
                }))
            }
        })
    }

    fn lower_call(&self, callee: FuncId, args: &[IrExpr], repr: Repr) -> Result<Code, CodegenError> {
        let plan = self
            .frames
            .get(callee.index())
            .ok_or_else(|| self.unsupported(format!("call of unknown function #{}", callee.index())))?;
        if plan.layout.params.len() != args.len() {
            return Err(self.unsupported(format!(
                "call passes {} arguments to a function with {} parameters",
                args.len(),
                plan.layout.params.len()
            )));
        }
        let stores = args
            .iter()
            .zip(&plan.layout.params)
            .map(|(arg, &offset)| Ok((offset, self.lower_store(arg)?)))
            .collect::<Result<Vec<_>, CodegenError>>()?;
        let site = CallSite {
            index: callee.index(),
            size: plan.layout.size,
            align: plan.layout.align,
            ret: plan.layout.ret.unwrap_or(0),
            args: stores,
        };
        Ok(match repr {
            Repr::Scalar(prim) => Code::Scalar(scalar(move |m| {
                let sp = m.sp;
                let frame = site.enter(m)?;
                let value = m.read_scalar(frame.wrapping_add(site.ret), prim)?;
                m.sp = sp;
                Ok(value)
            })),
            Repr::Addr => Code::Addr(addr(move |m| {
                let sp = m.sp;
                let frame = site.enter(m)?;
                let value = m.read_u32(frame.wrapping_add(site.ret))?;
                m.sp = sp;
                Ok(value)
            })),
            Repr::Memory(layout) => Code::Memory {
                store: store(move |m, dest| {
                    let sp = m.sp;
                    let frame = site.enter(m)?;
                    m.copy(dest, frame.wrapping_add(site.ret), layout.size)?;
                    m.sp = sp;
                    Ok(())
                }),
                layout,
            },
            Repr::Void => Code::Effect(effect(move |m| {
                let sp = m.sp;
                site.enter(m)?;
                m.sp = sp;
                Ok(())
            })),
        })
    }

    fn lower_extern_call(
        &self,
        callee: ExternId,
        args: &[IrExpr],
        repr: Repr,
    ) -> Result<Code, CodegenError> {
        let declaration = self
            .request
            .externs
            .function(callee)
            .ok_or_else(|| self.unsupported(format!("unknown host function #{}", callee.index())))?;
        let name = declaration.qualified_name();
        let host = self
            .request
            .host
            .get(callee.index())
            .cloned()
            .ok_or_else(|| CodegenError::MissingHostFunction { name: name.clone() })?;
        let args = args
            .iter()
            .map(|arg| self.lower_scalar(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let call = host_call(move |m| {
            let mut values = Vec::with_capacity(args.len());
            for arg in &args {
                values.push(Value::from_const(arg(m)?));
            }
            host(&values).map_err(|message| {
                RuntimeFault::new(FaultReason::HostFunction, format!("`{name}`: {message}"))
            })
        });
        Ok(match repr {
            Repr::Scalar(prim) => Code::Scalar(scalar(move |m| {
                let value = call(m)?;
                value.to_const(prim).ok_or_else(|| {
                    RuntimeFault::new(
                        FaultReason::HostFunction,
                        format!(
                            "host function returned {}, expected `{}`",
                            value.kind_name(),
                            prim.as_str()
                        ),
                    )
                })
            })),
            Repr::Void => Code::Effect(effect(move |m| call(m).map(drop))),
            Repr::Addr | Repr::Memory(_) => {
                return Err(self.unsupported("host functions return scalars only"))
            }
        })
    }

    fn lower_aggregate(
        &self,
        ty: TypeId,
        elements: &[IrExpr],
        repr: Repr,
    ) -> Result<Code, CodegenError> {
        let Repr::Memory(layout) = repr else {
            return Err(self.unsupported("aggregate of a scalar type"));
        };
        let types = self.types();
        let offsets: Vec<u32> = match types.kind(ty) {
            TypeKind::Struct(def) => def.members.iter().map(|m| m.offset).collect(),
            TypeKind::Span { elem, len } => {
                let stride = types.layout(*elem).stride();
                (0..*len).map(|i| i * stride).collect()
            }
            _ => {
                return Err(self.unsupported(format!(
                    "aggregate of `{}`",
                    types.display(ty)
                )))
            }
        };
        if offsets.len() != elements.len() {
            return Err(self.unsupported(format!(
                "aggregate of `{}` with {} elements",
                types.display(ty),
                elements.len()
            )));
        }
        let parts = elements
            .iter()
            .zip(offsets)
            .map(|(e, offset)| Ok((offset, self.lower_store(e)?)))
            .collect::<Result<Vec<_>, CodegenError>>()?;
        // Built in a temporary so elements may read the destination.
        Ok(Code::Memory {
            store: store(move |m, dest| {
                let sp = m.sp;
                let temp = m.alloca(layout.size, layout.align)?;
                m.fill_zero(temp, layout.size)?;
                for (offset, part) in &parts {
                    part(m, temp.wrapping_add(*offset))?;
                }
                m.copy(dest, temp, layout.size)?;
                m.sp = sp;
                Ok(())
            }),
            layout,
        })
    }

    fn lower_inlined(&self, call: &InlinedCall) -> Result<Code, CodegenError> {
        let bindings = call
            .bindings
            .iter()
            .map(|(local, value)| Ok((self.local_offset(local.index())?, self.lower_store(value)?)))
            .collect::<Result<Vec<_>, CodegenError>>()?;
        let body = self.lower_block(&call.body)?;
        let prologue = effect(move |m| {
            for (offset, bind) in &bindings {
                let slot = m.fp.wrapping_add(*offset);
                bind(m, slot)?;
            }
            run_block(&body, m).map(drop)
        });
        let Some(value) = &call.value else {
            return Ok(Code::Effect(prologue));
        };
        Ok(match self.lower_expr(value)? {
            Code::Scalar(f) => Code::Scalar(scalar(move |m| {
                prologue(m)?;
                f(m)
            })),
            Code::Addr(f) => Code::Addr(addr(move |m| {
                prologue(m)?;
                f(m)
            })),
            Code::Memory { store: f, layout } => Code::Memory {
                store: store(move |m, dest| {
                    prologue(m)?;
                    f(m, dest)
                }),
                layout,
            },
            Code::Effect(f) => Code::Effect(effect(move |m| {
                prologue(m)?;
                f(m)
            })),
        })
    }
}

fn host_call<F>(f: F) -> F
where
    F: Fn(&mut Machine<'_>) -> Result<Value, RuntimeFault>,
{
    f
}

/// All-zero value of a representation.
fn zero(repr: Repr) -> Code {
    match repr {
        Repr::Scalar(prim) => {
            let value = ConstValue::zero(prim).unwrap_or(ConstValue::Int(0));
            Code::Scalar(scalar(move |_| Ok(value)))
        }
        Repr::Addr => Code::Addr(addr(|_| Ok(0))),
        Repr::Memory(layout) => Code::Memory {
            store: store(move |m, dest| m.fill_zero(dest, layout.size)),
            layout,
        },
        Repr::Void => Code::Effect(effect(|_| Ok(()))),
    }
}

/// Prepared call of a compiled function.
struct CallSite {
    index: usize,
    size: u32,
    align: u32,
    ret: u32,
    /// Parameter offset and argument code, in parameter order.
    args: Vec<(u32, StoreFn)>,
}

impl CallSite {
    /// Reserve and fill the callee frame, run the callee and return the
    /// frame address. The caller restores the stack pointer.
    fn enter(&self, m: &mut Machine<'_>) -> Result<u32, RuntimeFault> {
        let frame = m.alloca(self.size, self.align)?;
        m.fill_zero(frame, self.size)?;
        for (offset, arg) in &self.args {
            arg(m, frame.wrapping_add(*offset))?;
        }
        m.call(self.index, frame)?;
        Ok(frame)
    }
}
