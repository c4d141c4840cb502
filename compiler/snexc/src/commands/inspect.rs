//! The `dump-ir` and `symbols` commands.

use super::{compile_or_exit, CliOptions};

pub fn dump_ir(path: &str, options: &CliOptions) {
    let unit = compile_or_exit(path, options);
    if let Some(dump) = unit.ir_dump() {
        println!("{dump}");
    }
    let enabled = options.optimizations.ids().join(",");
    println!("// optimizations: {}", if enabled.is_empty() { "none" } else { &enabled });
    for report in unit.passes() {
        println!("// {}: {} change(s) {}", report.pass, report.changes, report.message);
    }
}

pub fn list_symbols(path: &str, options: &CliOptions) {
    let unit = compile_or_exit(path, options);
    let mut symbols = unit.debug_symbols();
    symbols.sort_by(|a, b| a.kind.letter().cmp(&b.kind.letter()).then_with(|| a.name.cmp(&b.name)));
    for symbol in symbols {
        println!("{} {:<32} {}", symbol.kind.letter(), symbol.name, symbol.type_name);
    }
}
