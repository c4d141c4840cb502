//! Optimization pipeline over the typed IR.
//!
//! # Passes
//!
//! - `const_fold`: literal subtrees, `const` globals and locals, constant
//!   conditions
//! - `binop`: canonical operand order, identities, strength reduction
//! - `dce`: unreachable statements, constant branches, pure expression
//!   statements, unused pure locals
//! - `loops`: hoisting of loop-invariant subexpressions
//! - `inline`: call-site substitution of small non-recursive callees
//!
//! Every pass rewrites the module in place and returns the number of
//! changes it made. [`verify`] runs after each pass; a violation is an
//! internal error (E9001) and aborts the unit.
//!
//! `AUTO_VECTORISATION`, `SMALL_OBJECT_OPTIMISATION` and
//! `ASM_OPTIMISATION` are accepted but have no pass.

pub mod binop;
pub mod const_fold;
pub mod dce;
mod effects;
pub mod inline;
pub mod loops;
pub mod verify;

#[cfg(test)]
mod tests;

use snex_diagnostic::{Diagnostic, ErrorCode};

use crate::ir::IrModule;
use crate::options::{AnalysisOptions, OptimizationFlags};

pub use effects::{can_fault, is_pure};
pub use verify::{verify_module, VerifyError};

/// Outcome of one pass run, surfaced as an optimization trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    pub pass: &'static str,
    pub changes: usize,
    pub message: String,
}

impl PassReport {
    fn new(pass: &'static str, changes: usize) -> Self {
        let message = match pass {
            "const_fold" => format!("folded {changes} constant expressions"),
            "binop" => format!("simplified {changes} binary operations"),
            "dce" => format!("removed {changes} dead statements"),
            "loops" => format!("hoisted {changes} loop-invariant expressions"),
            "inline" => format!("inlined {changes} call sites"),
            _ => format!("{pass}: {changes} changes"),
        };
        PassReport {
            pass,
            changes,
            message,
        }
    }
}

type PassFn = fn(&mut IrModule, &AnalysisOptions) -> usize;

/// Scalar passes, in pipeline order.
const SCALAR_PASSES: &[(&str, OptimizationFlags, PassFn)] = &[
    ("const_fold", OptimizationFlags::CONSTANT_FOLDING, fold_pass),
    ("binop", OptimizationFlags::BINARY_OP_OPTIMIZATION, binop_pass),
    ("dce", OptimizationFlags::DEAD_CODE_ELIMINATION, dce_pass),
];

fn fold_pass(module: &mut IrModule, _: &AnalysisOptions) -> usize {
    const_fold::run(module)
}

fn binop_pass(module: &mut IrModule, _: &AnalysisOptions) -> usize {
    binop::run(module)
}

fn dce_pass(module: &mut IrModule, _: &AnalysisOptions) -> usize {
    dce::run(module)
}

fn loop_pass(module: &mut IrModule, _: &AnalysisOptions) -> usize {
    loops::run(module)
}

fn inline_pass(module: &mut IrModule, options: &AnalysisOptions) -> usize {
    inline::run(module, options.max_inline_statements)
}

const NO_OP_FLAGS: &[(&str, OptimizationFlags)] = &[
    ("AutoVectorisation", OptimizationFlags::AUTO_VECTORISATION),
    (
        "SmallObjectOptimisation",
        OptimizationFlags::SMALL_OBJECT_OPTIMISATION,
    ),
    ("AsmOptimisation", OptimizationFlags::ASM_OPTIMISATION),
];

/// Run the passes enabled in `options` over a checked module.
///
/// Returns one report per pass run, or the verifier failure as an E9001
/// diagnostic naming the pass that broke the module.
#[tracing::instrument(level = "debug", skip_all)]
pub fn optimize(
    module: &mut IrModule,
    options: &AnalysisOptions,
) -> Result<Vec<PassReport>, Diagnostic> {
    let flags = options.optimizations;
    for (id, flag) in NO_OP_FLAGS {
        if flags.contains(*flag) {
            tracing::debug!(optimization = *id, "accepted, no pass implemented");
        }
    }

    let mut reports = Vec::new();
    run_scalar_passes(module, options, &mut reports)?;

    if flags.contains(OptimizationFlags::LOOP_OPTIMIZATION) {
        run_pass(module, options, "loops", loop_pass, &mut reports)?;
    }

    if flags.contains(OptimizationFlags::INLINING) {
        let inlined = run_pass(module, options, "inline", inline_pass, &mut reports)?;
        if inlined > 0 {
            run_scalar_passes(module, options, &mut reports)?;
        }
    }

    Ok(reports)
}

fn run_scalar_passes(
    module: &mut IrModule,
    options: &AnalysisOptions,
    reports: &mut Vec<PassReport>,
) -> Result<(), Diagnostic> {
    for (name, flag, pass) in SCALAR_PASSES {
        if options.optimizations.contains(*flag) {
            run_pass(module, options, *name, *pass, reports)?;
        }
    }
    Ok(())
}

fn run_pass(
    module: &mut IrModule,
    options: &AnalysisOptions,
    name: &'static str,
    pass: PassFn,
    reports: &mut Vec<PassReport>,
) -> Result<usize, Diagnostic> {
    let changes = pass(module, options);
    tracing::debug!(pass = name, changes, "ran optimization pass");
    verify_module(module).map_err(|err| invariant_violation(name, &err))?;
    reports.push(PassReport::new(name, changes));
    Ok(changes)
}

fn invariant_violation(pass: &str, err: &VerifyError) -> Diagnostic {
    Diagnostic::error(ErrorCode::E9001)
        .with_message(format!("optimization pass `{pass}` broke the IR: {err}"))
        .with_note("this is a compiler bug; compile with optimizations disabled to work around it")
}
