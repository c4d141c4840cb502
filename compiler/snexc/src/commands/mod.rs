//! Command implementations and the helpers they share.

mod check;
mod eval;
mod inspect;
mod run;

#[cfg(test)]
mod tests;

pub use check::check_file;
pub use eval::eval_expression;
pub use inspect::{dump_ir, list_symbols};
pub use run::run_function;

use snex_diagnostic::emitter::{self, DiagnosticEmitter};
use snex_jit::{CompilationUnit, CompilerOptions, ExternalLibrary, JitCompiler, OptimizationFlags};

/// Options shared by every command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliOptions {
    pub optimizations: OptimizationFlags,
    pub max_inline: Option<usize>,
    pub watch: bool,
    pub dump_ir: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        CliOptions {
            optimizations: OptimizationFlags::default(),
            max_inline: None,
            watch: false,
            dump_ir: false,
        }
    }
}

impl CliOptions {
    pub fn compiler(&self) -> JitCompiler {
        let mut options = CompilerOptions::default().with_optimizations(self.optimizations);
        if let Some(max) = self.max_inline {
            options = options.with_max_inline_statements(max);
        }
        JitCompiler::new(options, ExternalLibrary::math())
    }
}

/// Split `args` into options and positional arguments.
///
/// `--unsafe` composes with `--opt` and `--no-opt` in any order.
pub fn parse_cli_options(args: &[String]) -> Result<(CliOptions, Vec<String>), String> {
    let mut options = CliOptions::default();
    let mut positional = Vec::new();
    let mut unchecked = false;

    for arg in args {
        if let Some(list) = arg.strip_prefix("--opt=") {
            options.optimizations = OptimizationFlags::parse_list(list)
                .map_err(|id| format!("unknown optimization '{id}'"))?;
        } else if let Some(max) = arg.strip_prefix("--max-inline=") {
            let max = max
                .parse()
                .map_err(|_| format!("--max-inline expects a count, got '{max}'"))?;
            options.max_inline = Some(max);
        } else {
            match arg.as_str() {
                "--no-opt" => options.optimizations = OptimizationFlags::empty(),
                "--unsafe" => unchecked = true,
                "--watch" => options.watch = true,
                "--dump-ir" => options.dump_ir = true,
                // Negative numbers are call arguments, not flags.
                flag if flag.starts_with("--") => return Err(format!("unknown option '{flag}'")),
                _ => positional.push(arg.clone()),
            }
        }
    }

    if unchecked {
        options.optimizations |= OptimizationFlags::NO_SAFETY_CHECKS;
    }
    Ok((options, positional))
}

pub(super) fn read_file(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            let msg = match e.kind() {
                std::io::ErrorKind::NotFound => format!("cannot find file '{path}'"),
                std::io::ErrorKind::PermissionDenied => {
                    format!("permission denied reading '{path}'")
                }
                std::io::ErrorKind::InvalidData => {
                    format!("'{path}' contains invalid UTF-8 data")
                }
                _ => format!("error reading '{path}': {e}"),
            };
            eprintln!("{msg}");
            std::process::exit(1);
        }
    }
}

/// Compile `path`, print its diagnostics and exit when the unit failed.
pub(super) fn compile_or_exit(path: &str, options: &CliOptions) -> CompilationUnit {
    let source = read_file(path);
    let unit = options.compiler().compile(&source, path);
    report_diagnostics(path, &source, &unit);
    if unit.is_failed() {
        std::process::exit(1);
    }
    if options.dump_ir {
        if let Some(dump) = unit.ir_dump() {
            println!("{dump}");
        }
    }
    unit
}

pub(super) fn report_diagnostics(path: &str, source: &str, unit: &CompilationUnit) {
    if unit.diagnostics().is_empty() {
        return;
    }
    let is_tty = std::io::IsTerminal::is_terminal(&std::io::stderr());
    let mut emitter = emitter::stderr(path, source, is_tty);
    emitter.emit_all(unit.diagnostics());
    emitter.emit_summary(unit.errors().count(), unit.warnings().count());
    emitter.flush();
}
