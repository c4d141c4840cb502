//! Proof that at least one error was emitted.

use std::fmt;

/// Zero-sized token proving that an error diagnostic was reported.
///
/// A stage that fails returns this instead of a bare `bool`, so a failure
/// can never be signalled without a diagnostic backing it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    /// Only the queue and the count/list constructors below hand these out.
    pub(crate) fn new() -> Self {
        ErrorGuaranteed(())
    }

    /// `Some` when `count > 0`.
    pub fn from_error_count(count: usize) -> Option<Self> {
        (count > 0).then(Self::new)
    }

    /// `Some` when any diagnostic in `diagnostics` is an error.
    pub fn from_diagnostics(diagnostics: &[crate::Diagnostic]) -> Option<Self> {
        diagnostics.iter().any(crate::Diagnostic::is_error).then(Self::new)
    }
}

impl fmt::Display for ErrorGuaranteed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error(s) emitted")
    }
}

#[cfg(test)]
mod tests;
