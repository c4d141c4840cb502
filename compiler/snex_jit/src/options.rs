//! Compiler configuration.

use snex_diagnostic::queue::DiagnosticConfig;
use snex_sema::{AnalysisOptions, OptimizationFlags, DEFAULT_MAX_INLINE_STATEMENTS};

/// Default per-unit stack: 64 KiB.
pub const DEFAULT_STACK_SIZE: u32 = 64 * 1024;

/// Options of a [`JitCompiler`](crate::JitCompiler).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompilerOptions {
    pub optimizations: OptimizationFlags,
    /// Largest callee body, in statements, considered for inlining.
    pub max_inline_statements: usize,
    pub diagnostic_config: DiagnosticConfig,
    /// Bytes of stack each bound unit reserves for its invocations.
    pub stack_size: u32,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            optimizations: OptimizationFlags::default(),
            max_inline_statements: DEFAULT_MAX_INLINE_STATEMENTS,
            diagnostic_config: DiagnosticConfig::default(),
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_optimizations(mut self, optimizations: OptimizationFlags) -> Self {
        self.optimizations = optimizations;
        self
    }

    /// Every optimization off; safety checks stay on.
    pub fn without_optimizations(self) -> Self {
        self.with_optimizations(OptimizationFlags::empty())
    }

    pub fn with_max_inline_statements(mut self, max: usize) -> Self {
        self.max_inline_statements = max;
        self
    }

    pub fn with_diagnostic_config(mut self, config: DiagnosticConfig) -> Self {
        self.diagnostic_config = config;
        self
    }

    pub fn with_stack_size(mut self, bytes: u32) -> Self {
        self.stack_size = bytes;
        self
    }

    pub fn safety_checks(&self) -> bool {
        self.optimizations.safety_checks()
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions::default()
            .with_optimizations(self.optimizations)
            .with_max_inline_statements(self.max_inline_statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_keep_safety_checks() {
        let options = CompilerOptions::default();
        assert!(options.safety_checks());
        assert_eq!(options.stack_size, DEFAULT_STACK_SIZE);
        assert_eq!(options.analysis_options(), AnalysisOptions::default());
    }

    #[test]
    fn test_builders() {
        let options = CompilerOptions::new()
            .without_optimizations()
            .with_max_inline_statements(2)
            .with_stack_size(1024);
        assert!(options.optimizations.is_empty());
        assert_eq!(options.analysis_options().max_inline_statements, 2);
        assert_eq!(options.stack_size, 1024);
    }
}
