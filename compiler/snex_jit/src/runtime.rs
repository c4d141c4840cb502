//! Execution memory shared by every backend.
//!
//! Compiled code sees one 32-bit byte-addressed space:
//!
//! - `0..GLOBAL_BASE` is never mapped, so a zeroed reference faults
//! - `GLOBAL_BASE..` holds the unit's globals, laid out by the backend
//! - `STACK_BASE..` is the call stack; frames grow upwards
//!
//! Every access is bounds checked and reported as a
//! [`FaultReason::MemoryAccess`](crate::FaultReason::MemoryAccess) fault, so
//! even unchecked indexing can never touch host memory.

use std::sync::Arc;

use smallvec::SmallVec;
use snex_ir::{ConstValue, Primitive};
use snex_types::round_up;

use crate::codegen::NativeEntryPoint;
use crate::{FaultReason, RuntimeFault};

pub const GLOBAL_BASE: u32 = 16;
pub const STACK_BASE: u32 = 1 << 30;

/// Nested calls deeper than this fault with `StackOverflow`.
pub const MAX_CALL_DEPTH: u32 = 10_000;

/// Compiled body of one function.
///
/// Runs with the machine's frame pointer at a frame whose parameter slots
/// are filled; leaves the result in the frame's return slot.
pub type EntryFn = Arc<dyn Fn(&mut Machine<'_>) -> Result<(), RuntimeFault> + Send + Sync>;

/// Backing store of one bound unit.
#[derive(Debug)]
pub struct UnitMemory {
    pub globals: Vec<u8>,
    pub stack: Vec<u8>,
}

impl UnitMemory {
    pub fn new(global_size: u32, stack_size: u32) -> Self {
        UnitMemory {
            globals: vec![0; global_size as usize],
            stack: vec![0; stack_size as usize],
        }
    }

    /// Machine over this memory with an empty stack.
    pub fn machine<'m>(&'m mut self, functions: &'m [NativeEntryPoint]) -> Machine<'m> {
        Machine {
            globals: &mut self.globals,
            stack: &mut self.stack,
            fp: STACK_BASE,
            sp: STACK_BASE,
            depth: 0,
            functions,
        }
    }
}

/// Registers and memory of one invocation.
pub struct Machine<'m> {
    globals: &'m mut [u8],
    stack: &'m mut [u8],
    /// Address of the current frame.
    pub fp: u32,
    /// First free stack address.
    pub sp: u32,
    depth: u32,
    functions: &'m [NativeEntryPoint],
}

impl Machine<'_> {
    fn region(&mut self, address: u32, len: u32) -> Result<&mut [u8], RuntimeFault> {
        let (memory, offset) = if address >= STACK_BASE {
            (&mut *self.stack, address - STACK_BASE)
        } else if address >= GLOBAL_BASE {
            (&mut *self.globals, address - GLOBAL_BASE)
        } else {
            return Err(RuntimeFault::memory(address, len));
        };
        let start = offset as usize;
        let end = start + len as usize;
        memory
            .get_mut(start..end)
            .ok_or_else(|| RuntimeFault::memory(address, len))
    }

    pub fn read_bytes<const N: usize>(&mut self, address: u32) -> Result<[u8; N], RuntimeFault> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.region(address, N as u32)?);
        Ok(out)
    }

    pub fn write_bytes(&mut self, address: u32, bytes: &[u8]) -> Result<(), RuntimeFault> {
        let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        self.region(address, len)?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_u32(&mut self, address: u32) -> Result<u32, RuntimeFault> {
        self.read_bytes::<4>(address).map(u32::from_le_bytes)
    }

    pub fn write_u32(&mut self, address: u32, value: u32) -> Result<(), RuntimeFault> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Load a scalar; `bool` occupies a 32-bit slot.
    pub fn read_scalar(&mut self, address: u32, prim: Primitive) -> Result<ConstValue, RuntimeFault> {
        Ok(match prim {
            Primitive::Int => ConstValue::Int(i32::from_le_bytes(self.read_bytes(address)?)),
            Primitive::Bool => ConstValue::Bool(self.read_u32(address)? != 0),
            Primitive::Float => ConstValue::Float(self.read_u32(address)?),
            Primitive::Double => ConstValue::Double(u64::from_le_bytes(self.read_bytes(address)?)),
            Primitive::Void => {
                return Err(RuntimeFault::new(
                    FaultReason::InvalidOperation,
                    "load of a void value",
                ))
            }
        })
    }

    pub fn write_scalar(&mut self, address: u32, value: ConstValue) -> Result<(), RuntimeFault> {
        match value {
            ConstValue::Int(v) => self.write_bytes(address, &v.to_le_bytes()),
            ConstValue::Bool(b) => self.write_u32(address, u32::from(b)),
            ConstValue::Float(bits) => self.write_u32(address, bits),
            ConstValue::Double(bits) => self.write_bytes(address, &bits.to_le_bytes()),
        }
    }

    /// Copy `len` bytes; the ranges may overlap.
    pub fn copy(&mut self, dest: u32, src: u32, len: u32) -> Result<(), RuntimeFault> {
        if len == 0 || dest == src {
            return Ok(());
        }
        let buffer: SmallVec<[u8; 64]> = SmallVec::from_slice(self.region(src, len)?);
        self.region(dest, len)?.copy_from_slice(&buffer);
        Ok(())
    }

    pub fn fill_zero(&mut self, dest: u32, len: u32) -> Result<(), RuntimeFault> {
        self.region(dest, len)?.fill(0);
        Ok(())
    }

    /// Reserve `size` bytes at the top of the stack.
    pub fn alloca(&mut self, size: u32, align: u32) -> Result<u32, RuntimeFault> {
        let address = round_up(self.sp, align.max(8));
        let end = address.checked_add(size).ok_or_else(stack_overflow)?;
        let limit = STACK_BASE.saturating_add(u32::try_from(self.stack.len()).unwrap_or(u32::MAX));
        if end > limit {
            return Err(stack_overflow());
        }
        self.sp = end;
        Ok(address)
    }

    /// Run function `index` on a frame at `frame`, which the caller has
    /// reserved and filled.
    pub fn call(&mut self, index: usize, frame: u32) -> Result<(), RuntimeFault> {
        let Some(entry) = self.functions.get(index) else {
            return Err(RuntimeFault::new(
                FaultReason::InvalidOperation,
                format!("call of unknown function #{index}"),
            ));
        };
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeFault::new(
                FaultReason::StackOverflow,
                format!("call depth exceeds {MAX_CALL_DEPTH} in `{}`", entry.name),
            ));
        }
        let code = Arc::clone(&entry.code);
        let saved_fp = std::mem::replace(&mut self.fp, frame);
        self.depth += 1;
        let result = snex_stack::ensure_sufficient_stack(|| code(self));
        self.depth -= 1;
        self.fp = saved_fp;
        result
    }
}

#[cold]
fn stack_overflow() -> RuntimeFault {
    RuntimeFault::new(FaultReason::StackOverflow, "stack exhausted")
}

#[cfg(test)]
mod tests;
