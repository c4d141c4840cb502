//! Optimizations never change what a bound function computes.
//!
//! Random integer programs are compiled twice, once with every
//! optimization and once with none, and must agree on every input,
//! including on which inputs fault.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use snex_jit::{
    CompilationUnit, CompilerOptions, ExternalLibrary, JitCompiler, OptimizationFlags, Value,
};

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("x".to_owned()),
        Just("y".to_owned()),
        (0i32..20).prop_map(|v| v.to_string()),
    ]
}

fn int_expr() -> impl Strategy<Value = String> {
    leaf().prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), prop::sample::select(vec!["+", "-", "*", "&", "|", "^"]), inner.clone())
                .prop_map(|(a, op, b)| format!("({a} {op} {b})")),
            (inner.clone(), 0i32..5).prop_map(|(a, s)| format!("({a} << {s})")),
            (inner.clone(), 1i32..7).prop_map(|(a, d)| format!("({a} / {d})")),
            (inner.clone(), inner.clone(), inner.clone(), inner.clone()).prop_map(
                |(a, b, c, d)| format!("({a} < {b} ? {c} : {d})")
            ),
            inner.clone().prop_map(|a| format!("(-{a})")),
        ]
    })
}

fn compile(source: &str, flags: OptimizationFlags) -> CompilationUnit {
    let options = CompilerOptions::default().with_optimizations(flags);
    let unit = JitCompiler::new(options, ExternalLibrary::new()).compile(source, "prop");
    assert!(unit.is_bound(), "{source}\n{:#?}", unit.diagnostics());
    unit
}

fn agree(source: &str, inputs: &[(i32, i32)]) {
    let optimized = compile(source, OptimizationFlags::default());
    let plain = compile(source, OptimizationFlags::empty());
    for &(x, y) in inputs {
        let a = optimized.call::<i32>("f", &mut [Value::Int(x), Value::Int(y)]);
        let b = plain.call::<i32>("f", &mut [Value::Int(x), Value::Int(y)]);
        assert_eq!(a, b, "{source} at x={x}, y={y}");
    }
}

const INPUTS: &[(i32, i32)] = &[(0, 0), (1, -1), (7, 3), (-12, 5), (100, 0), (i32::MAX, 2)];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn expressions_agree(expr in int_expr()) {
        agree(&format!("int f(int x, int y) {{ return {expr}; }}"), INPUTS);
    }

    #[test]
    fn loops_and_helpers_agree(body in int_expr(), step in int_expr()) {
        let source = format!(
            "int helper(int x, int y) {{ return {step}; }}
             int f(int x, int y) {{
                 int acc = 0;
                 int k = 3 * 2;
                 for (int i = 0; i < 4; i += 1) {{
                     acc += helper(x + i, y) + k;
                     if (acc > 1000) {{ acc = acc / 2; }}
                 }}
                 return acc + {body};
             }}"
        );
        agree(&source, INPUTS);
    }
}
