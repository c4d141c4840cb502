//! SNEX JIT - compiled objects, the driver and the reference backend.
//!
//! This crate provides:
//!
//! - **Driver** ([`JitCompiler`]): runs a source text through parsing,
//!   analysis, optimization, code generation and binding, producing a
//!   [`CompilationUnit`] that ends `Bound` or `Failed`.
//!
//! - **Object model** ([`CompiledObject`], [`FunctionClass`]): callable
//!   handles with argument marshaling and typed runtime faults.
//!
//! - **Backend boundary** ([`codegen`]): the [`CodeGenerator`] trait and
//!   [`ClosureGenerator`], the reference backend running on the
//!   byte-addressed [`runtime`].
//!
//! - **Host integration**: [`ExternalLibrary`] for host functions and
//!   constants, [`FunctionSlot`] for handing new code to an execution
//!   thread, [`CompileWorker`] for compiling off that thread and
//!   [`JitExpression`] for one-line formulas.
//!
//! # Example
//!
//! ```
//! use snex_jit::{CompilerOptions, ExternalLibrary, JitCompiler, Value};
//!
//! let compiler = JitCompiler::new(CompilerOptions::default(), ExternalLibrary::math());
//! let unit = compiler.compile("int add(int a, int b) { return a + b; }", "demo");
//! assert!(unit.is_bound());
//! let sum: i32 = unit.call("add", &mut [Value::Int(2), Value::Int(3)]).unwrap();
//! assert_eq!(sum, 5);
//! ```

pub mod codegen;
mod compiler;
mod error;
mod expression;
mod externals;
mod marshal;
mod object;
mod options;
pub mod runtime;
mod slot;
mod unit;
mod value;
mod worker;

pub use codegen::{
    ClosureGenerator, CodeGenerator, CodegenRequest, FrameLayout, GeneratedModule, GlobalSlot,
    NativeEntryPoint,
};
pub use compiler::JitCompiler;
pub use error::{CodegenError, FaultReason, InvokeError, JitError, MarshalingError, RuntimeFault};
pub use expression::JitExpression;
pub use externals::{ExternalLibrary, HostFn};
pub use object::{CompiledObject, FunctionClass};
pub use options::{CompilerOptions, DEFAULT_STACK_SIZE};
pub use slot::FunctionSlot;
pub use unit::{CompilationUnit, DebugSymbol, DebugSymbolKind, UnitState, WatchEntry};
pub use value::{FromValue, IntoValue, Value};
pub use worker::{CompileResult, CompileTicket, CompileWorker};

pub use snex_sema::OptimizationFlags;
