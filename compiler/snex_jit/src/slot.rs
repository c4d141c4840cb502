//! Atomic handoff of compiled functions to the execution path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{CompiledObject, InvokeError, Value};

/// Holds the handle the execution path currently runs.
///
/// A reader either sees the old handle or the new one, never a mix. The
/// old handle stays valid for whoever still holds it, so an invocation in
/// progress finishes on the code it started with.
#[derive(Default)]
pub struct FunctionSlot {
    current: RwLock<Option<Arc<CompiledObject>>>,
    generation: AtomicU64,
}

impl FunctionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(object: Arc<CompiledObject>) -> Self {
        let slot = Self::new();
        slot.swap(object);
        slot
    }

    /// Install `object`, returning the handle it replaces.
    pub fn swap(&self, object: Arc<CompiledObject>) -> Option<Arc<CompiledObject>> {
        let old = self.current.write().replace(object);
        self.generation.fetch_add(1, Ordering::Release);
        old
    }

    /// Empty the slot.
    pub fn take(&self) -> Option<Arc<CompiledObject>> {
        let old = self.current.write().take();
        if old.is_some() {
            self.generation.fetch_add(1, Ordering::Release);
        }
        old
    }

    pub fn load(&self) -> Option<Arc<CompiledObject>> {
        self.current.read().clone()
    }

    /// Number of swaps so far; lets a reader notice a new handle without
    /// taking the lock.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invoke whatever is installed. `None` when the slot is empty.
    pub fn invoke(&self, args: &mut [Value]) -> Option<Result<Value, InvokeError>> {
        let object = self.load()?;
        Some(object.invoke(args))
    }
}

impl std::fmt::Debug for FunctionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionSlot")
            .field("current", &self.current.read().as_ref().map(|o| o.signature().to_owned()))
            .field("generation", &self.generation())
            .finish()
    }
}
