//! Error types of code generation and invocation.

use std::fmt;

use crate::UnitState;

/// Failure to turn an optimized IR module into entry points.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CodegenError {
    #[error("`{function}`: unsupported construct: {detail}")]
    Unsupported { function: String, detail: String },
    #[error("`{function}`: frame of {size} bytes exceeds the stack of {limit} bytes")]
    FrameTooLarge {
        function: String,
        size: u32,
        limit: u32,
    },
    #[error("global `{global}` ends at {size} bytes, past the {limit}-byte global region")]
    GlobalsTooLarge { global: String, size: u64, limit: u32 },
    #[error("no host implementation for `{name}`")]
    MissingHostFunction { name: String },
}

/// An argument or return value that does not fit the signature.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum MarshalingError {
    #[error("expected {expected} arguments, found {found}")]
    Arity { expected: usize, found: usize },
    #[error("argument {index}: expected `{expected}`, found {found}")]
    ArgumentType {
        index: usize,
        expected: String,
        found: &'static str,
    },
    #[error("argument {index}: `{expected}` has {expected_len} elements, found {found_len}")]
    Shape {
        index: usize,
        expected: String,
        expected_len: usize,
        found_len: usize,
    },
    #[error("argument {index}: `{ty}` cannot be passed from the host")]
    Unsupported { index: usize, ty: String },
    #[error("argument {index}: {bytes} bytes do not fit on the stack")]
    StackExhausted { index: usize, bytes: u32 },
    #[error("result is `{found}`, not the requested type")]
    ReturnType { found: String },
}

/// Why compiled code stopped.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FaultReason {
    IndexOutOfBounds,
    DivisionByZero,
    StackOverflow,
    MemoryAccess,
    HostFunction,
    /// An operator met operands it is not defined for.
    InvalidOperation,
}

impl FaultReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultReason::IndexOutOfBounds => "index out of bounds",
            FaultReason::DivisionByZero => "division by zero",
            FaultReason::StackOverflow => "stack overflow",
            FaultReason::MemoryAccess => "invalid memory access",
            FaultReason::HostFunction => "host function failed",
            FaultReason::InvalidOperation => "invalid operation",
        }
    }
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fault raised while compiled code was executing.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{reason}: {message}")]
pub struct RuntimeFault {
    pub reason: FaultReason,
    pub message: String,
}

impl RuntimeFault {
    pub fn new(reason: FaultReason, message: impl Into<String>) -> Self {
        RuntimeFault {
            reason,
            message: message.into(),
        }
    }

    #[cold]
    pub(crate) fn memory(address: u32, len: u32) -> Self {
        Self::new(
            FaultReason::MemoryAccess,
            format!("access of {len} bytes at {address:#x}"),
        )
    }
}

/// Failure of [`CompiledObject::invoke`](crate::CompiledObject::invoke).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InvokeError {
    /// The unit that produced the handle was released.
    #[error("compiled unit was released")]
    Released,
    #[error(transparent)]
    Marshaling(#[from] MarshalingError),
    #[error(transparent)]
    Fault(#[from] RuntimeFault),
    #[error("no function named `{0}`")]
    UnknownFunction(String),
}

/// Misuse of the driver API.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum JitError {
    #[error("cannot move a unit from {from:?} to {to:?}")]
    InvalidTransition { from: UnitState, to: UnitState },
    #[error("unit is {state:?}, expected {expected:?}")]
    WrongState {
        state: UnitState,
        expected: UnitState,
    },
    #[error("compile worker has shut down")]
    WorkerGone,
    #[error("failed to spawn compile worker: {0}")]
    WorkerSpawn(String),
}
