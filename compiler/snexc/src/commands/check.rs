//! The `check` command: compile a file and report the outcome.

use super::{compile_or_exit, CliOptions};

pub fn check_file(path: &str, options: &CliOptions) {
    let unit = compile_or_exit(path, options);
    let functions = unit.functions().map_or(0, snex_jit::FunctionClass::len);
    println!(
        "{path}: ok ({functions} function{}, {} warning{})",
        if functions == 1 { "" } else { "s" },
        unit.warnings().count(),
        if unit.warnings().count() == 1 { "" } else { "s" },
    );
}
