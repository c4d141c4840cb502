#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use snex_jit::{OptimizationFlags, Value};
use snex_types::TypeId;

use super::run::{parse_arguments, parse_scalar};
use super::{parse_cli_options, CliOptions};

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

#[test]
fn defaults_enable_every_optimization() {
    let (options, positional) = parse_cli_options(&args(&["file.snex"])).unwrap();
    assert_eq!(options, CliOptions::default());
    assert!(options.optimizations.safety_checks());
    assert_eq!(positional, vec!["file.snex"]);
}

#[test]
fn opt_list_replaces_the_defaults() {
    let (options, _) =
        parse_cli_options(&args(&["--opt=ConstantFolding,inlining", "f.snex"])).unwrap();
    assert_eq!(
        options.optimizations,
        OptimizationFlags::CONSTANT_FOLDING | OptimizationFlags::INLINING
    );
}

#[test]
fn unsafe_composes_with_no_opt_in_any_order() {
    for order in [["--unsafe", "--no-opt"], ["--no-opt", "--unsafe"]] {
        let (options, _) = parse_cli_options(&args(&order)).unwrap();
        assert_eq!(options.optimizations, OptimizationFlags::NO_SAFETY_CHECKS);
    }
}

#[test]
fn bad_options_are_reported() {
    assert_eq!(
        parse_cli_options(&args(&["--opt=Folding"])).unwrap_err(),
        "unknown optimization 'Folding'"
    );
    assert!(parse_cli_options(&args(&["--max-inline=lots"])).is_err());
    assert!(parse_cli_options(&args(&["--verbose"])).is_err());
}

#[test]
fn negative_numbers_stay_positional() {
    let (options, positional) =
        parse_cli_options(&args(&["f.snex", "add", "-3", "4", "--watch", "--max-inline=2"])).unwrap();
    assert!(options.watch);
    assert_eq!(options.max_inline, Some(2));
    assert_eq!(positional, vec!["f.snex", "add", "-3", "4"]);
}

#[test]
fn scalars_parse_by_parameter_type() {
    assert_eq!(parse_scalar(TypeId::INT, "-3"), Some(Value::Int(-3)));
    assert_eq!(parse_scalar(TypeId::FLOAT, "0.5f"), Some(Value::Float(0.5)));
    assert_eq!(parse_scalar(TypeId::DOUBLE, "0.25"), Some(Value::Double(0.25)));
    assert_eq!(parse_scalar(TypeId::BOOL, "true"), Some(Value::Bool(true)));
    assert_eq!(parse_scalar(TypeId::INT, "1.5"), None);
}

#[test]
fn arguments_follow_the_signature() {
    let unit = CliOptions::default()
        .compiler()
        .compile("double mix(int a, double b) { if (a > 1) { return b * 2.0; } return b; }", "cli");
    let mix = unit.function("mix").unwrap();

    let values = parse_arguments(&mix, &args(&["2", "1.5"])).unwrap();
    assert_eq!(values, vec![Value::Int(2), Value::Double(1.5)]);
    assert_eq!(mix.call::<f64>(&mut values.clone()), Ok(3.0));

    assert!(parse_arguments(&mix, &args(&["2"])).unwrap_err().contains("takes 2 arguments"));
    assert_eq!(
        parse_arguments(&mix, &args(&["x", "1"])).unwrap_err(),
        "argument 0 should be an int, got 'x'"
    );
}
