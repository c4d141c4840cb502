//! Reference backend: IR lowered into a tree of closures.
//!
//! Every IR function becomes an [`EntryFn`] that runs on the byte-addressed
//! [`Machine`]. Lowering happens once, at generation time; invoking a
//! function only walks the prebuilt closures.
//!
//! # Frames
//!
//! A frame holds the return slot (offset 0) followed by every local of the
//! function, parameters included, each at its natural alignment. The caller
//! reserves the callee's frame, zeroes it, stores the arguments into the
//! parameter slots and reads the result back from the return slot.
//!
//! # Value representations
//!
//! - scalars travel as [`ConstValue`]s
//! - references travel as addresses
//! - structs, spans and dyn views are written straight to a destination
//!   address
//! - `void` expressions only run for their effect

mod expr;
mod place;
mod stmt;

use std::sync::Arc;

use snex_ir::{ConstValue, Primitive};
use snex_sema::ir::{FunctionKind, IrFunction};
use snex_types::{round_up, Layout, TypeId, TypeKind, TypeRegistry};
use tracing::{debug, instrument};

use super::{
    CodeGenerator, CodegenRequest, FrameLayout, GeneratedModule, GlobalSlot, NativeEntryPoint,
};
use crate::runtime::{EntryFn, Machine, GLOBAL_BASE, STACK_BASE};
use crate::{CodegenError, FaultReason, RuntimeFault};

use stmt::run_block;

/// Minimum alignment of every frame; keeps `double` slots aligned.
const FRAME_ALIGN: u32 = 8;

pub(super) type ScalarFn =
    Box<dyn Fn(&mut Machine<'_>) -> Result<ConstValue, RuntimeFault> + Send + Sync>;
pub(super) type AddrFn = Box<dyn Fn(&mut Machine<'_>) -> Result<u32, RuntimeFault> + Send + Sync>;
pub(super) type StoreFn =
    Box<dyn Fn(&mut Machine<'_>, u32) -> Result<(), RuntimeFault> + Send + Sync>;
pub(super) type EffectFn = Box<dyn Fn(&mut Machine<'_>) -> Result<(), RuntimeFault> + Send + Sync>;

// Closures are built through these so their argument types are inferred as
// higher-ranked over the machine's lifetime.
pub(super) fn scalar<F>(f: F) -> ScalarFn
where
    F: Fn(&mut Machine<'_>) -> Result<ConstValue, RuntimeFault> + Send + Sync + 'static,
{
    Box::new(f)
}

pub(super) fn addr<F>(f: F) -> AddrFn
where
    F: Fn(&mut Machine<'_>) -> Result<u32, RuntimeFault> + Send + Sync + 'static,
{
    Box::new(f)
}

pub(super) fn store<F>(f: F) -> StoreFn
where
    F: Fn(&mut Machine<'_>, u32) -> Result<(), RuntimeFault> + Send + Sync + 'static,
{
    Box::new(f)
}

pub(super) fn effect<F>(f: F) -> EffectFn
where
    F: Fn(&mut Machine<'_>) -> Result<(), RuntimeFault> + Send + Sync + 'static,
{
    Box::new(f)
}

fn entry<F>(f: F) -> EntryFn
where
    F: Fn(&mut Machine<'_>) -> Result<(), RuntimeFault> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// How values of a type are carried by the lowered code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) enum Repr {
    Void,
    Scalar(Primitive),
    Addr,
    Memory(Layout),
}

impl Repr {
    pub(super) fn of(types: &TypeRegistry, ty: TypeId) -> Option<Repr> {
        Some(match types.kind(ty) {
            TypeKind::Primitive(Primitive::Void) => Repr::Void,
            TypeKind::Primitive(p) => Repr::Scalar(*p),
            TypeKind::Ref { .. } => Repr::Addr,
            TypeKind::Struct(_) | TypeKind::Span { .. } | TypeKind::Dyn { .. } => {
                Repr::Memory(types.layout(ty))
            }
            TypeKind::Dynamic | TypeKind::Error | TypeKind::Function(_) => return None,
        })
    }
}

/// Lowered expression.
pub(super) enum Code {
    Scalar(ScalarFn),
    Addr(AddrFn),
    Memory { store: StoreFn, layout: Layout },
    Effect(EffectFn),
}

impl Code {
    /// Code that writes the value to a destination address.
    pub(super) fn into_store(self) -> StoreFn {
        match self {
            Code::Scalar(f) => store(move |m, dest| {
                let value = f(m)?;
                m.write_scalar(dest, value)
            }),
            Code::Addr(f) => store(move |m, dest| {
                let address = f(m)?;
                m.write_u32(dest, address)
            }),
            Code::Memory { store, .. } => store,
            Code::Effect(f) => store(move |m, _| f(m)),
        }
    }

    /// Code that evaluates the value and discards it.
    pub(super) fn into_effect(self) -> EffectFn {
        match self {
            Code::Scalar(f) => effect(move |m| f(m).map(drop)),
            Code::Addr(f) => effect(move |m| f(m).map(drop)),
            Code::Memory { store, layout } => effect(move |m| {
                let sp = m.sp;
                let temp = m.alloca(layout.size, layout.align)?;
                store(m, temp)?;
                m.sp = sp;
                Ok(())
            }),
            Code::Effect(f) => f,
        }
    }
}

/// Where a function's locals live inside its frame.
#[derive(Clone, Debug)]
pub(super) struct FramePlan {
    pub(super) layout: FrameLayout,
    /// Indexed by `LocalId`.
    pub(super) locals: Vec<u32>,
}

fn plan_frame(types: &TypeRegistry, func: &IrFunction) -> Result<FramePlan, CodegenError> {
    let unsupported = |detail: String| CodegenError::Unsupported {
        function: func.name.clone(),
        detail,
    };
    let mut size = 0;
    let mut align = FRAME_ALIGN;
    let ret = match Repr::of(types, func.ret) {
        Some(Repr::Void) => None,
        Some(_) => {
            let layout = types.layout(func.ret);
            align = align.max(layout.align);
            size = layout.size;
            Some(0)
        }
        None => {
            return Err(unsupported(format!(
                "return type `{}`",
                types.display(func.ret)
            )))
        }
    };
    let mut locals = Vec::with_capacity(func.locals.len());
    for local in &func.locals {
        match Repr::of(types, local.ty) {
            Some(Repr::Void) | None => {
                return Err(unsupported(format!(
                    "`{}` has type `{}`",
                    local.name,
                    types.display(local.ty)
                )))
            }
            Some(_) => {}
        }
        let layout = types.layout(local.ty);
        let offset = round_up(size, layout.align);
        align = align.max(layout.align);
        size = offset.saturating_add(layout.size);
        locals.push(offset);
    }
    let params = func
        .params
        .iter()
        .map(|p| locals.get(p.index()).copied())
        .collect::<Option<Vec<u32>>>()
        .ok_or_else(|| unsupported("parameter without a slot".to_owned()))?;
    Ok(FramePlan {
        layout: FrameLayout {
            size: round_up(size, align),
            align,
            params,
            ret,
        },
        locals,
    })
}

fn plan_globals(
    request: &CodegenRequest<'_>,
) -> Result<(Vec<GlobalSlot>, u32), CodegenError> {
    let types = request.types;
    let limit = STACK_BASE - GLOBAL_BASE;
    let mut size = 0u64;
    let mut slots = Vec::with_capacity(request.module.globals.len());
    for global in &request.module.globals {
        match Repr::of(types, global.ty) {
            Some(Repr::Scalar(_) | Repr::Memory(_)) => {}
            _ => {
                return Err(CodegenError::Unsupported {
                    function: global.name.clone(),
                    detail: format!("global of type `{}`", types.display(global.ty)),
                })
            }
        }
        let layout = types.layout(global.ty);
        let align = u64::from(layout.align.max(1));
        let offset = size.div_ceil(align) * align;
        size = offset + u64::from(layout.size);
        // Addresses from `STACK_BASE` up belong to the call stack.
        let address = u32::try_from(offset)
            .ok()
            .filter(|_| size <= u64::from(limit))
            .ok_or_else(|| CodegenError::GlobalsTooLarge {
                global: global.name.clone(),
                size,
                limit,
            })?;
        slots.push(GlobalSlot {
            name: global.name.clone(),
            ty: global.ty,
            address: GLOBAL_BASE + address,
            is_const: global.is_const,
            constant: global.constant,
        });
    }
    let size = u32::try_from(size).unwrap_or(limit);
    Ok((slots, size))
}

/// Shared state while lowering one function.
pub(super) struct Lowerer<'a> {
    pub(super) request: &'a CodegenRequest<'a>,
    pub(super) frames: &'a [FramePlan],
    pub(super) globals: &'a [GlobalSlot],
    pub(super) function: &'a IrFunction,
    pub(super) frame: &'a FramePlan,
}

impl Lowerer<'_> {
    pub(super) fn types(&self) -> &TypeRegistry {
        self.request.types
    }

    pub(super) fn unsupported(&self, detail: impl Into<String>) -> CodegenError {
        CodegenError::Unsupported {
            function: self.function.name.clone(),
            detail: detail.into(),
        }
    }

    pub(super) fn repr(&self, ty: TypeId) -> Result<Repr, CodegenError> {
        Repr::of(self.types(), ty)
            .ok_or_else(|| self.unsupported(format!("type `{}`", self.types().display(ty))))
    }

    fn lower_function(&self) -> Result<EntryFn, CodegenError> {
        let body = self.lower_block(&self.function.body)?;
        Ok(entry(move |m| run_block(&body, m).map(drop)))
    }
}

/// Map an arithmetic failure to the fault compiled code raises.
pub(super) fn eval_fault(err: snex_sema::eval::EvalError) -> RuntimeFault {
    match err {
        snex_sema::eval::EvalError::DivisionByZero => {
            RuntimeFault::new(FaultReason::DivisionByZero, "integer division by zero")
        }
        snex_sema::eval::EvalError::InvalidOperands => {
            RuntimeFault::new(FaultReason::InvalidOperation, err.to_string())
        }
    }
}

/// Backend that needs no native code generation at all.
#[derive(Clone, Debug, Default)]
pub struct ClosureGenerator {
    generated: u64,
}

impl ClosureGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of modules generated so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }
}

impl CodeGenerator for ClosureGenerator {
    fn name(&self) -> &str {
        "closure"
    }

    #[instrument(level = "debug", skip_all, fields(unit = request.unit))]
    fn generate(&mut self, request: &CodegenRequest<'_>) -> Result<GeneratedModule, CodegenError> {
        let module = request.module;
        for (id, function) in request.externs.functions() {
            if request.host.get(id.index()).is_none() {
                return Err(CodegenError::MissingHostFunction {
                    name: function.qualified_name(),
                });
            }
        }

        let frames = module
            .functions
            .iter()
            .map(|f| plan_frame(request.types, f))
            .collect::<Result<Vec<_>, _>>()?;
        for (function, plan) in module.functions.iter().zip(&frames) {
            if plan.layout.size > request.stack_size {
                return Err(CodegenError::FrameTooLarge {
                    function: function.name.clone(),
                    size: plan.layout.size,
                    limit: request.stack_size,
                });
            }
        }
        let (globals, global_size) = plan_globals(request)?;

        let mut entries = Vec::with_capacity(module.functions.len());
        for (function, frame) in module.functions.iter().zip(&frames) {
            let lowerer = Lowerer {
                request,
                frames: &frames,
                globals: &globals,
                function,
                frame,
            };
            let code = lowerer.lower_function()?;
            entries.push(NativeEntryPoint {
                name: function.name.clone(),
                frame: frame.layout.clone(),
                code,
            });
        }

        let methods = module
            .functions
            .iter()
            .filter(|f| matches!(f.kind, FunctionKind::Method { .. }))
            .count();
        debug!(
            functions = entries.len(),
            methods,
            global_size,
            "closure module generated"
        );
        self.generated += 1;

        Ok(GeneratedModule {
            entries,
            globals,
            global_size,
            init: module.init,
        })
    }
}

#[cfg(test)]
mod tests;
