//! The `eval` command: one-line expressions of `input`.

use snex_jit::JitExpression;

use super::CliOptions;

pub fn eval_expression(text: &str, inputs: &[String], options: &CliOptions) {
    let expression = JitExpression::new(text, &options.compiler());
    if let Some(message) = expression.error_message() {
        eprintln!("error: {message}");
        std::process::exit(1);
    }

    let inputs = if inputs.is_empty() { vec!["0".to_owned()] } else { inputs.to_vec() };
    for raw in &inputs {
        let Ok(input) = raw.parse::<f64>() else {
            eprintln!("error: input '{raw}' is not a number");
            std::process::exit(2);
        };
        match expression.eval(input) {
            Ok(value) => println!("{input} -> {value}"),
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
    }
}
