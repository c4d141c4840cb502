//! SNEX compiler CLI
//!
//! Compiles a source file with the JIT driver and either reports the
//! result, runs one of its functions or prints what the compiler built.

use std::sync::Once;

mod commands;

use commands::{check_file, dump_ir, eval_expression, list_symbols, parse_cli_options, run_function};

static TRACING_INIT: Once = Once::new();

/// Install the hierarchical tracing layer when `SNEX_LOG` is set.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var("SNEX_LOG").is_ok() {
            let filter = EnvFilter::from_env("SNEX_LOG");
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .init();
        }
    });
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let (options, positional) = match parse_cli_options(&args[2..]) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("error: {msg}");
            std::process::exit(2);
        }
    };

    match args[1].as_str() {
        "check" => {
            let [path] = positional.as_slice() else {
                eprintln!("Usage: snexc check <file.snex> [options]");
                std::process::exit(2);
            };
            check_file(path, &options);
        }
        "run" => {
            let [path, function, call_args @ ..] = positional.as_slice() else {
                eprintln!("Usage: snexc run <file.snex> <function> [args...] [options]");
                eprintln!();
                eprintln!("Arguments are parsed as the function's parameter types:");
                eprintln!("  int 3, float 0.5, double 0.25, bool true");
                std::process::exit(2);
            };
            run_function(path, function, call_args, &options);
        }
        "dump-ir" => {
            let [path] = positional.as_slice() else {
                eprintln!("Usage: snexc dump-ir <file.snex> [options]");
                std::process::exit(2);
            };
            dump_ir(path, &options);
        }
        "symbols" => {
            let [path] = positional.as_slice() else {
                eprintln!("Usage: snexc symbols <file.snex> [options]");
                std::process::exit(2);
            };
            list_symbols(path, &options);
        }
        "eval" => {
            let [expression, inputs @ ..] = positional.as_slice() else {
                eprintln!("Usage: snexc eval \"<expression over input>\" [input...]");
                std::process::exit(2);
            };
            eval_expression(expression, inputs, &options);
        }
        "help" | "--help" | "-h" => print_usage(),
        "version" | "--version" | "-V" => {
            println!("snexc {}", env!("CARGO_PKG_VERSION"));
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    }
}

fn print_usage() {
    println!("SNEX Compiler");
    println!();
    println!("Usage: snexc <command> [options]");
    println!();
    println!("Commands:");
    println!("  check <file>                   Compile and report diagnostics");
    println!("  run <file> <function> [args]   Compile and call one function");
    println!("  dump-ir <file>                 Print the optimized IR and pass reports");
    println!("  symbols <file>                 List the unit's debug symbols");
    println!("  eval <expr> [input...]         Evaluate a one-line expression of `input`");
    println!("  help                           Show this message");
    println!("  version                        Show the version");
    println!();
    println!("Options:");
    println!("  --opt=<ids>          Comma separated optimizations, e.g.");
    println!("                       ConstantFolding,Inlining,NoSafeChecks");
    println!("  --no-opt             Disable every optimization");
    println!("  --unsafe             Remove runtime bounds checks");
    println!("  --max-inline=<n>     Largest function body the inliner copies");
    println!("  --watch              After `run`, print the unit's globals");
    println!("  --dump-ir            Print the optimized IR before running the command");
    println!();
    println!("Set SNEX_LOG (e.g. SNEX_LOG=snex_jit=debug) to trace the compiler.");
}
