//! The `run` command: compile a file and call one of its functions.

use snex_jit::{CompiledObject, Value};
use snex_types::TypeId;

use super::{compile_or_exit, CliOptions};

pub fn run_function(path: &str, name: &str, raw_args: &[String], options: &CliOptions) {
    let unit = compile_or_exit(path, options);
    let Some(function) = unit.function(name) else {
        eprintln!("error: '{path}' has no function named '{name}'");
        if let Some(functions) = unit.functions() {
            let mut names: Vec<&str> = functions.iter().map(|f| f.signature()).collect();
            names.sort_unstable();
            eprintln!("available: {}", names.join(", "));
        }
        std::process::exit(1);
    };

    let mut args = match parse_arguments(&function, raw_args) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("error: {msg}");
            eprintln!("  signature: {}", function.signature());
            std::process::exit(2);
        }
    };

    match function.invoke(&mut args) {
        Ok(Value::Void) => {}
        Ok(value) => println!("{value}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }

    if options.watch {
        for entry in unit.watch_table() {
            match entry.value {
                Ok(value) => println!("{} {} {} = {value}", entry.type_tag, entry.type_name, entry.name),
                Err(fault) => println!("{} {} {} = <{fault}>", entry.type_tag, entry.type_name, entry.name),
            }
        }
    }
}

/// Parse command-line text into values of the function's parameter types.
pub(super) fn parse_arguments(function: &CompiledObject, raw: &[String]) -> Result<Vec<Value>, String> {
    let params = function.param_types();
    if params.len() != raw.len() {
        return Err(format!(
            "'{}' takes {} argument{}, {} given",
            function.name(),
            params.len(),
            if params.len() == 1 { "" } else { "s" },
            raw.len()
        ));
    }
    params
        .iter()
        .zip(raw)
        .enumerate()
        .map(|(index, (&ty, text))| parse_scalar(ty, text).ok_or_else(|| describe_mismatch(index, ty, text)))
        .collect()
}

pub(super) fn parse_scalar(ty: TypeId, text: &str) -> Option<Value> {
    let text = text.trim();
    match ty {
        TypeId::INT => text.parse().ok().map(Value::Int),
        TypeId::FLOAT => text.trim_end_matches('f').parse().ok().map(Value::Float),
        TypeId::DOUBLE => text.parse().ok().map(Value::Double),
        TypeId::BOOL => text.parse().ok().map(Value::Bool),
        _ => None,
    }
}

fn describe_mismatch(index: usize, ty: TypeId, text: &str) -> String {
    let expected = match ty {
        TypeId::INT => "an int",
        TypeId::FLOAT => "a float",
        TypeId::DOUBLE => "a double",
        TypeId::BOOL => "`true` or `false`",
        _ => return format!("argument {index} has a type that cannot be passed on the command line"),
    };
    format!("argument {index} should be {expected}, got '{text}'")
}
