//! Compiled objects and the function class of a bound unit.
//!
//! A bound unit's artifacts live behind one `Arc` shared by every handle:
//! the generated entry points, a copy of the type registry for marshaling
//! and the unit's memory. Releasing the unit only flips a flag, so a
//! handle that outlives its unit fails with [`InvokeError::Released`]
//! instead of running freed code.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use snex_diagnostic::{DebugChannel, DebugEvent, RuntimeEvent};
use snex_sema::ir::{FunctionKind, IrModule};
use snex_types::{TypeId, TypeRegistry};
use tracing::debug;

use crate::codegen::GeneratedModule;
use crate::runtime::UnitMemory;
use crate::{marshal, FromValue, InvokeError, MarshalingError, RuntimeFault, Value};

/// Everything a bound unit's handles depend on.
pub(crate) struct UnitArtifacts {
    pub(crate) name: Arc<str>,
    pub(crate) types: TypeRegistry,
    pub(crate) module: GeneratedModule,
    pub(crate) memory: Mutex<UnitMemory>,
    released: AtomicBool,
    channel: Option<DebugChannel>,
}

impl UnitArtifacts {
    pub(crate) fn new(
        name: Arc<str>,
        types: TypeRegistry,
        module: GeneratedModule,
        stack_size: u32,
        channel: Option<DebugChannel>,
    ) -> Self {
        let memory = UnitMemory::new(module.global_size, stack_size);
        UnitArtifacts {
            name,
            types,
            module,
            memory: Mutex::new(memory),
            released: AtomicBool::new(false),
            channel,
        }
    }

    /// Run the global initializer, if the unit has one.
    pub(crate) fn initialize(&self) -> Result<(), RuntimeFault> {
        let Some(init) = self.module.init else {
            return Ok(());
        };
        let Some(entry) = self.module.entry(init) else {
            return Ok(());
        };
        let mut memory = self.memory.lock();
        let mut m = memory.machine(&self.module.entries);
        let frame = m.alloca(entry.frame.size, entry.frame.align)?;
        m.fill_zero(frame, entry.frame.size)?;
        m.call(init.index(), frame)
    }

    pub(crate) fn release(&self) -> bool {
        !self.released.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn channel(&self) -> Option<&DebugChannel> {
        self.channel.as_ref()
    }
}

/// Callable handle to one compiled function.
///
/// Handles are cheap to clone and safe to invoke from any thread;
/// invocations of functions of the same unit are serialized because they
/// share the unit's globals.
#[derive(Clone)]
pub struct CompiledObject {
    shared: Arc<UnitArtifacts>,
    index: usize,
    name: String,
    params: Vec<TypeId>,
    ret: TypeId,
    signature: String,
}

impl CompiledObject {
    /// Qualified name: `add`, `dsp::Voice::process`, `makeSpan<4>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rendered signature, e.g. `int add(int, int)`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn param_types(&self) -> &[TypeId] {
        &self.params
    }

    pub fn return_type(&self) -> TypeId {
        self.ret
    }

    pub fn unit_name(&self) -> &str {
        &self.shared.name
    }

    pub fn is_released(&self) -> bool {
        self.shared.is_released()
    }

    /// Call the function.
    ///
    /// Struct, span, `dyn` and reference arguments are written back into
    /// `args` after the call. Runtime faults are also published on the
    /// unit's debug channel.
    pub fn invoke(&self, args: &mut [Value]) -> Result<Value, InvokeError> {
        if self.shared.is_released() {
            return Err(InvokeError::Released);
        }
        let Some(entry) = self.shared.module.entries.get(self.index) else {
            return Err(InvokeError::UnknownFunction(self.name.clone()));
        };
        let result = {
            let mut memory = self.shared.memory.lock();
            let mut m = memory.machine(&self.shared.module.entries);
            marshal::invoke(
                &mut m,
                &self.shared.types,
                self.index,
                &entry.frame,
                &self.params,
                self.ret,
                args,
            )
        };
        if let Err(InvokeError::Fault(fault)) = &result {
            debug!(function = %self.name, reason = %fault.reason, "runtime fault");
            if let Some(channel) = self.shared.channel() {
                channel.publish(DebugEvent::Runtime(RuntimeEvent::Fault {
                    unit: Arc::clone(&self.shared.name),
                    function: self.name.clone(),
                    reason: fault.reason.to_string(),
                    message: fault.message.clone(),
                }));
            }
        }
        result
    }

    /// [`invoke`](Self::invoke) with a typed result.
    pub fn call<R: FromValue>(&self, args: &mut [Value]) -> Result<R, InvokeError> {
        let value = self.invoke(args)?;
        let found = value.kind_name();
        R::from_value(value).ok_or_else(|| {
            MarshalingError::ReturnType {
                found: found.to_owned(),
            }
            .into()
        })
    }
}

impl std::fmt::Debug for CompiledObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledObject")
            .field("signature", &self.signature)
            .field("unit", &self.shared.name)
            .finish_non_exhaustive()
    }
}

/// The compiled functions of a unit, addressable by qualified name and by
/// overload signature.
#[derive(Clone, Default)]
pub struct FunctionClass {
    objects: Vec<Arc<CompiledObject>>,
    by_name: FxHashMap<String, SmallVec<[usize; 2]>>,
}

impl FunctionClass {
    /// Handles for every function of `ir` except the global initializer.
    pub(crate) fn bind(shared: &Arc<UnitArtifacts>, ir: &IrModule) -> Self {
        let mut class = FunctionClass::default();
        for (index, function) in ir.functions.iter().enumerate() {
            if function.kind == FunctionKind::Init {
                continue;
            }
            let params: Vec<TypeId> = function.param_types().collect();
            let rendered: Vec<String> = params.iter().map(|&p| shared.types.display(p)).collect();
            let signature = format!(
                "{} {}({})",
                shared.types.display(function.ret),
                function.name,
                rendered.join(", ")
            );
            let object = CompiledObject {
                shared: Arc::clone(shared),
                index,
                name: function.name.clone(),
                params,
                ret: function.ret,
                signature,
            };
            class
                .by_name
                .entry(function.name.clone())
                .or_default()
                .push(class.objects.len());
            class.objects.push(Arc::new(object));
        }
        class
    }

    /// First function declared under `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<CompiledObject>> {
        self.overloads(name).next()
    }

    /// Every overload declared under `name`, in declaration order.
    pub fn overloads<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Arc<CompiledObject>> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.objects.get(i))
    }

    /// The overload of `name` taking exactly `params`.
    pub fn overload(&self, name: &str, params: &[TypeId]) -> Option<&Arc<CompiledObject>> {
        self.overloads(name).find(|o| o.params == params)
    }

    /// Look up by rendered signature, e.g. `float mix(float, float)`.
    pub fn by_signature(&self, signature: &str) -> Option<&Arc<CompiledObject>> {
        self.objects.iter().find(|o| o.signature == signature)
    }

    /// Invoke the first overload of `name` with a typed result.
    pub fn call<R: FromValue>(&self, name: &str, args: &mut [Value]) -> Result<R, InvokeError> {
        self.get(name)
            .ok_or_else(|| InvokeError::UnknownFunction(name.to_owned()))?
            .call(args)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CompiledObject>> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl std::fmt::Debug for FunctionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.objects.iter().map(|o| o.signature()))
            .finish()
    }
}
