//! The JIT driver.
//!
//! [`JitCompiler::compile`] takes one source text through every stage of a
//! fresh [`CompilationUnit`]:
//!
//! ```text
//! Empty -> Parsed -> Resolved -> Optimized -> CodeGenerated -> Bound
//! ```
//!
//! Syntax, name and type errors are collected for the whole stage before
//! the unit fails; an optimizer invariant violation, a backend error or a
//! fault in the global initializer fails it at once. Every unit owns its
//! registry, scope tree and template cache, so independent units compile
//! in parallel without locking anything but the backend.

use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use snex_diagnostic::queue::DiagnosticQueue;
use snex_diagnostic::{
    DebugChannel, DebugEvent, Diagnostic, ErrorCode, ErrorGuaranteed, LocatedDiagnostic, LogLevel,
    RuntimeEvent,
};
use snex_sema::UnitContext;
use snex_types::ExternTable;
use tracing::{debug, instrument};

use crate::codegen::{ClosureGenerator, CodeGenerator, CodegenRequest};
use crate::object::UnitArtifacts;
use crate::options::CompilerOptions;
use crate::{CodegenError, CompilationUnit, ExternalLibrary, JitError, UnitState};

/// Compiles source text into bound units.
///
/// Cheap to clone; clones share the external library, the backend and
/// the debug channel.
#[derive(Clone)]
pub struct JitCompiler {
    options: CompilerOptions,
    externals: Arc<ExternalLibrary>,
    extern_table: Arc<ExternTable>,
    /// Generators take `&mut self`, so code generation is serialized.
    backend: Arc<Mutex<Box<dyn CodeGenerator>>>,
    channel: Option<DebugChannel>,
}

impl JitCompiler {
    /// A compiler using the closure backend.
    pub fn new(options: CompilerOptions, externals: ExternalLibrary) -> Self {
        let extern_table = Arc::new(externals.table().clone());
        JitCompiler {
            options,
            externals: Arc::new(externals),
            extern_table,
            backend: Arc::new(Mutex::new(Box::new(ClosureGenerator::new()))),
            channel: None,
        }
    }

    /// Replace the code generator.
    #[must_use]
    pub fn with_backend(mut self, backend: impl CodeGenerator + 'static) -> Self {
        self.backend = Arc::new(Mutex::new(Box::new(backend)));
        self
    }

    /// Publish diagnostics, traces and runtime events on `channel`.
    #[must_use]
    pub fn with_channel(mut self, channel: DebugChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn externals(&self) -> &ExternalLibrary {
        &self.externals
    }

    pub fn channel(&self) -> Option<&DebugChannel> {
        self.channel.as_ref()
    }

    /// Name of the configured code generator.
    pub fn backend_name(&self) -> String {
        self.backend.lock().name().to_owned()
    }

    /// Compile `source` into a fresh unit named `name`.
    ///
    /// Always returns the unit; inspect [`CompilationUnit::state`] and
    /// its diagnostics to see how far it got.
    #[instrument(level = "debug", skip_all, fields(unit = name))]
    pub fn compile(&self, source: &str, name: &str) -> CompilationUnit {
        let name: Arc<str> = Arc::from(name);
        let source: Arc<str> = Arc::from(source);
        let context = UnitContext::new(Arc::clone(&name), Arc::clone(&self.extern_table));
        let mut unit = CompilationUnit::new(Arc::clone(&name), Arc::clone(&source), context);
        let mut queue =
            DiagnosticQueue::with_config(&source, self.options.diagnostic_config.clone());

        let outcome = self.run_stages(&mut unit, &mut queue, &name, &source);

        let diagnostics = queue.flush();
        let located = LocatedDiagnostic::resolve_all(diagnostics.iter().cloned(), &name, &source);
        self.publish_diagnostics(&name, &located);
        unit.record(diagnostics, located);
        match outcome {
            Ok(()) => {
                debug!(
                    functions = unit.functions().map_or(0, |f| f.len()),
                    warnings = unit.warnings().count(),
                    "unit bound"
                );
            }
            Err(guar) => {
                unit.fail(guar);
            }
        }
        unit
    }

    /// Compile independent units in parallel.
    ///
    /// Each request is `(source, name)`; results are in request order.
    pub fn compile_batch(&self, requests: &[(&str, &str)]) -> Vec<CompilationUnit> {
        requests
            .par_iter()
            .map(|(source, name)| self.compile(source, name))
            .collect()
    }

    fn run_stages(
        &self,
        unit: &mut CompilationUnit,
        queue: &mut DiagnosticQueue,
        name: &Arc<str>,
        source: &str,
    ) -> Result<(), ErrorGuaranteed> {
        let parsed = snex_parse::parse(source, name, &mut unit.context.interner);
        self.finish_stage(unit, queue, source, parsed.diagnostics, UnitState::Parsed)?;

        let analysis = self.options.analysis_options();
        let checked = snex_sema::check(&parsed.module, &mut unit.context, &analysis);
        let mut ir = checked.ir;
        self.finish_stage(unit, queue, source, checked.diagnostics, UnitState::Resolved)?;

        let passes = match snex_sema::optimize(&mut ir, &analysis) {
            Ok(passes) => passes,
            Err(violation) => return Err(queue.add_fatal(source, violation)),
        };
        for report in &passes {
            debug!(pass = report.pass, changes = report.changes, "{}", report.message);
            if let Some(channel) = &self.channel {
                channel.log(name, LogLevel::Info, format!("{}: {}", report.pass, report.message));
            }
        }
        unit.passes = passes;
        unit.ir = Some(ir);
        self.advance(unit, queue, source, UnitState::Optimized)?;

        let generated = {
            let Some(ir) = unit.ir.as_ref() else {
                return Err(internal(queue, source, "optimized unit has no IR"));
            };
            let request = CodegenRequest {
                unit: name,
                module: ir,
                types: &unit.context.types,
                externs: &self.extern_table,
                host: self.externals.host_functions(),
                safety_checks: self.options.safety_checks(),
                stack_size: self.options.stack_size,
            };
            let mut backend = self.backend.lock();
            debug!(backend = backend.name(), "generating code");
            backend.generate(&request)
        };
        let generated = match generated {
            Ok(generated) => generated,
            Err(error) => return Err(queue.add_fatal(source, codegen_diagnostic(&error))),
        };
        self.advance(unit, queue, source, UnitState::CodeGenerated)?;

        let artifacts = Arc::new(UnitArtifacts::new(
            Arc::clone(name),
            unit.context.types.clone(),
            generated,
            self.options.stack_size,
            self.channel.clone(),
        ));
        if let Err(fault) = artifacts.initialize() {
            let diag = Diagnostic::error(ErrorCode::E3001)
                .with_message(format!("global initializer faulted: {fault}"));
            return Err(queue.add_fatal(source, diag));
        }
        if let Err(error) = unit.bind(artifacts) {
            return Err(internal(queue, source, &error.to_string()));
        }

        if let Some(channel) = &self.channel {
            channel.publish(DebugEvent::Runtime(RuntimeEvent::Bound {
                unit: Arc::clone(name),
                functions: unit.functions().map_or(0, |f| f.len()),
            }));
        }
        Ok(())
    }

    /// Queue a stage's diagnostics, then fail if any of them is an error.
    fn finish_stage(
        &self,
        unit: &mut CompilationUnit,
        queue: &mut DiagnosticQueue,
        source: &str,
        diagnostics: Vec<Diagnostic>,
        to: UnitState,
    ) -> Result<(), ErrorGuaranteed> {
        let failed = ErrorGuaranteed::from_diagnostics(&diagnostics);
        queue.extend(source, diagnostics);
        if let Some(guar) = failed {
            debug!(stage = ?to, errors = queue.error_count(), "stage failed");
            return Err(guar);
        }
        self.advance(unit, queue, source, to)
    }

    fn advance(
        &self,
        unit: &mut CompilationUnit,
        queue: &mut DiagnosticQueue,
        source: &str,
        to: UnitState,
    ) -> Result<(), ErrorGuaranteed> {
        unit.advance(to)
            .map_err(|error: JitError| internal(queue, source, &error.to_string()))
    }

    fn publish_diagnostics(&self, name: &Arc<str>, located: &[LocatedDiagnostic]) {
        let Some(channel) = &self.channel else {
            return;
        };
        for diagnostic in located {
            channel.publish(DebugEvent::Diagnostic {
                unit: Arc::clone(name),
                diagnostic: diagnostic.clone(),
            });
        }
    }
}

impl std::fmt::Debug for JitCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitCompiler")
            .field("options", &self.options)
            .field("externs", &self.extern_table.function_count())
            .field("channel", &self.channel.is_some())
            .finish_non_exhaustive()
    }
}

fn codegen_diagnostic(error: &CodegenError) -> Diagnostic {
    let code = match error {
        CodegenError::Unsupported { .. } => ErrorCode::E3002,
        CodegenError::FrameTooLarge { .. }
        | CodegenError::GlobalsTooLarge { .. }
        | CodegenError::MissingHostFunction { .. } => ErrorCode::E3001,
    };
    Diagnostic::error(code).with_message(error.to_string())
}

#[cold]
fn internal(queue: &mut DiagnosticQueue, source: &str, message: &str) -> ErrorGuaranteed {
    queue.add_fatal(
        source,
        Diagnostic::error(ErrorCode::E9002).with_message(format!("internal error: {message}")),
    )
}
