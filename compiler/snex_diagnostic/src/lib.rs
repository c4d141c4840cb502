//! Diagnostic system for the SNEX compiler.
//!
//! - Error codes for searchability, grouped by phase
//! - Clear messages (what went wrong)
//! - Primary span (where it went wrong) resolved to 1-based line/column
//! - Notes (why it's wrong) and suggestions (how to fix)
//!
//! The [`channel`] module is the fan-out used to feed diagnostics and
//! runtime events to external consumers such as an editor overlay.

pub mod channel;
mod diagnostic;
pub mod emitter;
mod error_code;
mod guarantee;
pub mod queue;
pub mod span_utils;

pub use channel::{DebugChannel, DebugEvent, DebugListener, ListenerId, LogLevel, RuntimeEvent};
pub use diagnostic::{
    expected_token, type_mismatch, unknown_identifier, Diagnostic, Label, Severity,
};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use span_utils::{LineOffsetTable, LocatedDiagnostic, SourceLocation};
