//! Semantic analysis and optimization for SNEX.
//!
//! This crate provides:
//!
//! - **Checking** ([`check`]): declaration collection, name resolution
//!   through the scope tree, template instantiation, type checking and
//!   lowering into the typed IR. Errors are collected, not fatal.
//!
//! - **Typed IR** ([`ir`]): the optimizer-ready tree every later stage
//!   consumes, with explicit places, conversions and dereferences.
//!
//! - **Optimization** ([`opt`]): constant folding, binary-op
//!   simplification, dead-code elimination, loop-invariant code motion and
//!   inlining, each followed by a structural verifier run.
//!
//! - **Scalar evaluation** ([`eval`]): the arithmetic shared by constant
//!   folding and the reference code generator.
//!
//! # Crate Dependencies
//!
//! `snex_sema` depends on `snex_ir` (AST, operators, constants),
//! `snex_types` (registry, scopes, template cache) and `snex_diagnostic`.
//! It knows nothing about code generation.

pub mod check;
pub mod context;
pub mod eval;
pub mod ir;
pub mod opt;
pub mod options;

pub use check::{check, CheckOutput};
pub use context::UnitContext;
pub use ir::IrModule;
pub use opt::{optimize, PassReport};
pub use options::{AnalysisOptions, OptimizationFlags, DEFAULT_MAX_INLINE_STATEMENTS};

use snex_diagnostic::Diagnostic;
use snex_ir::Ast;

/// Result of analyzing one unit.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub ir: IrModule,
    /// Checker errors and warnings, then the verifier failure if any.
    pub diagnostics: Vec<Diagnostic>,
    /// Optimization trace; empty when checking failed.
    pub passes: Vec<PassReport>,
}

impl AnalysisOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Check `ast` and, when it has no errors, optimize the result.
pub fn analyze(ast: &Ast, ctx: &mut UnitContext, options: &AnalysisOptions) -> AnalysisOutput {
    let CheckOutput {
        mut ir,
        mut diagnostics,
    } = check(ast, ctx, options);
    if diagnostics.iter().any(Diagnostic::is_error) {
        return AnalysisOutput {
            ir,
            diagnostics,
            passes: Vec::new(),
        };
    }
    let passes = match optimize(&mut ir, options) {
        Ok(passes) => passes,
        Err(violation) => {
            diagnostics.push(violation);
            Vec::new()
        }
    };
    AnalysisOutput {
        ir,
        diagnostics,
        passes,
    }
}
