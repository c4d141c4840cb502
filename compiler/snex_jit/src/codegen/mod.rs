//! Boundary between the analyzer and a code generator.
//!
//! A [`CodeGenerator`] receives the optimized IR of one unit together with
//! everything needed for layout and host calls, and returns one
//! [`NativeEntryPoint`] per IR function. The object model only relies on
//! the frame layouts and the memory model of [`crate::runtime`];
//! instruction selection is the generator's business.
//!
//! [`ClosureGenerator`] is the reference backend: it lowers the IR into a
//! tree of closures over the byte-addressed machine.

mod closure;

pub use closure::ClosureGenerator;

use snex_ir::ConstValue;
use snex_sema::ir::IrModule;
use snex_types::{ExternTable, FuncId, TypeId, TypeRegistry};

use crate::externals::HostFn;
use crate::runtime::EntryFn;
use crate::CodegenError;

/// Inputs of one code generation run.
pub struct CodegenRequest<'a> {
    pub unit: &'a str,
    pub module: &'a IrModule,
    pub types: &'a TypeRegistry,
    pub externs: &'a ExternTable,
    /// Host implementations, indexed like `externs`.
    pub host: &'a [HostFn],
    /// Emit bounds guards for indexes marked `checked`.
    pub safety_checks: bool,
    /// Bytes of stack available to one invocation.
    pub stack_size: u32,
}

pub trait CodeGenerator: Send {
    fn name(&self) -> &str;

    fn generate(&mut self, request: &CodegenRequest<'_>) -> Result<GeneratedModule, CodegenError>;
}

impl<G: CodeGenerator + ?Sized> CodeGenerator for Box<G> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&mut self, request: &CodegenRequest<'_>) -> Result<GeneratedModule, CodegenError> {
        (**self).generate(request)
    }
}

/// Where parameters and the result live inside a function's frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FrameLayout {
    pub size: u32,
    pub align: u32,
    /// Offset of each parameter slot, in parameter order.
    pub params: Vec<u32>,
    /// Offset of the result slot; `None` for `void` functions.
    pub ret: Option<u32>,
}

/// Compiled code of one IR function.
#[derive(Clone)]
pub struct NativeEntryPoint {
    /// Qualified name of the IR function.
    pub name: String,
    pub frame: FrameLayout,
    pub code: EntryFn,
}

impl std::fmt::Debug for NativeEntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEntryPoint")
            .field("name", &self.name)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

/// Storage assigned to one global.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalSlot {
    pub name: String,
    pub ty: TypeId,
    pub address: u32,
    pub is_const: bool,
    /// Compile-time value, when the global is a folded constant.
    pub constant: Option<ConstValue>,
}

/// Output of [`CodeGenerator::generate`].
#[derive(Clone, Debug)]
pub struct GeneratedModule {
    /// Indexed by [`FuncId`].
    pub entries: Vec<NativeEntryPoint>,
    /// Constant table and global storage, indexed by `GlobalId`.
    pub globals: Vec<GlobalSlot>,
    pub global_size: u32,
    /// Global initializer to run once before any other function.
    pub init: Option<FuncId>,
}

impl GeneratedModule {
    pub fn entry(&self, id: FuncId) -> Option<&NativeEntryPoint> {
        self.entries.get(id.index())
    }
}
