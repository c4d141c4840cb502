#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use snex_diagnostic::ErrorCode;
use snex_ir::Span;
use snex_parse::parse;
use snex_types::TypeId;

use super::{optimize, verify_module, PassReport, VerifyError};
use crate::check::check;
use crate::context::UnitContext;
use crate::ir::{FunctionKind, IrFunction, IrModule, IrStmt, IrStmtKind};
use crate::options::{AnalysisOptions, OptimizationFlags};

fn compile_with(source: &str, options: AnalysisOptions) -> (IrModule, UnitContext, Vec<PassReport>) {
    let mut ctx = UnitContext::standalone("test");
    let parsed = parse(source, "test.snex", &mut ctx.interner);
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected syntax errors: {:#?}",
        parsed.diagnostics
    );
    let mut output = check(&parsed.module, &mut ctx, &options);
    assert!(!output.has_errors(), "unexpected errors: {:#?}", output.diagnostics);
    let reports = optimize(&mut output.ir, &options).unwrap();
    (output.ir, ctx, reports)
}

fn compile(source: &str, flags: OptimizationFlags) -> (IrModule, UnitContext) {
    let (ir, ctx, _) = compile_with(source, AnalysisOptions::default().with_optimizations(flags));
    (ir, ctx)
}

/// Printed IR of function `name` after running `flags`.
fn dump(source: &str, flags: OptimizationFlags, name: &str) -> String {
    let (ir, ctx) = compile(source, flags);
    let func = ir.function(ir.find_function(name).unwrap()).unwrap();
    ir.display(&ctx.types).function(func)
}

fn body_len(source: &str, flags: OptimizationFlags, name: &str) -> usize {
    let (ir, _) = compile(source, flags);
    ir.function(ir.find_function(name).unwrap()).unwrap().body.len()
}

const FOLD: OptimizationFlags = OptimizationFlags::CONSTANT_FOLDING;
const BINOP: OptimizationFlags = OptimizationFlags::BINARY_OP_OPTIMIZATION;
const DCE: OptimizationFlags = OptimizationFlags::DEAD_CODE_ELIMINATION;
const LOOPS: OptimizationFlags = OptimizationFlags::LOOP_OPTIMIZATION;
const INLINE: OptimizationFlags = OptimizationFlags::INLINING;

// Constant folding

#[test]
fn literal_addition_folds() {
    assert_eq!(
        dump("int f() { return 2 + 3; }", FOLD, "f"),
        "fn f() -> int {\n    return 5;\n}\n"
    );
    assert!(dump("int f() { return 2 + 3; }", OptimizationFlags::empty(), "f").contains("(2 + 3)"));
}

#[test]
fn integer_division_by_zero_is_kept() {
    let text = dump("int f() { return 1 / 0; }", FOLD, "f");
    assert!(text.contains("(1 / 0)"), "{text}");
}

#[test]
fn float_folding_uses_single_precision() {
    let text = dump("float f() { return 1.0f / 3.0f; }", FOLD, "f");
    let expected = format!("return {:?}f;", 1.0f32 / 3.0f32);
    assert!(text.contains(&expected), "{text}");
}

#[test]
fn const_globals_and_locals_propagate() {
    let text = dump(
        "const int N = 4;
         int f(int x) { const int k = N + 1; return x * k; }",
        FOLD,
        "f",
    );
    assert!(text.contains("return (x * 5);"), "{text}");
}

#[test]
fn constant_condition_keeps_taken_branch() {
    let text = dump(
        "int f(int x) { if (1 < 2) { return x; } else { return 0; } }",
        FOLD,
        "f",
    );
    assert!(!text.contains("if"), "{text}");
    assert!(text.contains("return x;"), "{text}");
}

#[test]
fn logical_operators_short_circuit() {
    let text = dump("bool f(bool b) { return false && b; }", FOLD, "f");
    assert!(text.contains("return false;"), "{text}");
    let text = dump("bool f(bool b) { return true && b; }", FOLD, "f");
    assert!(text.contains("return b;"), "{text}");
}

// Binary operations

#[test]
fn constant_moves_right_and_identities_vanish() {
    let text = dump("int f(int x) { return 1 + x; }", BINOP, "f");
    assert!(text.contains("return (x + 1);"), "{text}");
    let text = dump("int f(int x) { return (x * 1) + 0; }", BINOP, "f");
    assert!(text.contains("return x;"), "{text}");
}

#[test]
fn float_additive_identity_is_kept() {
    let text = dump("float f(float x) { return x + 0.0f; }", BINOP, "f");
    assert!(text.contains("(x + 0.0f)"), "{text}");
}

#[test]
fn strength_reduction() {
    let text = dump("int f(int x) { return x * 8; }", BINOP, "f");
    assert!(text.contains("(x << 3)"), "{text}");
    let text = dump("double f(double x) { return x / 4.0; }", BINOP, "f");
    assert!(text.contains("(x * 0.25)"), "{text}");
    let text = dump("double f(double x) { return x / 3.0; }", BINOP, "f");
    assert!(text.contains("(x / 3.0)"), "{text}");
}

#[test]
fn multiply_by_zero_only_when_pure() {
    let text = dump("int f(int x) { return x * 0; }", BINOP, "f");
    assert!(text.contains("return 0;"), "{text}");
    let text = dump(
        "int g() { return 3; } int f() { return g() * 0; }",
        BINOP,
        "f",
    );
    assert!(text.contains("g()"), "{text}");
}

#[test]
fn folded_constants_reach_strength_reduction() {
    let text = dump(
        "const int N = 4; int f(int x) { return x * N; }",
        FOLD | BINOP,
        "f",
    );
    assert!(text.contains("(x << 2)"), "{text}");
}

// Dead code

#[test]
fn unused_pure_code_is_removed() {
    let source = "int f(int x) { int unused = x * 2; x + 1; return x; }";
    assert_eq!(body_len(source, DCE, "f"), 1);
    assert_eq!(body_len(source, OptimizationFlags::empty(), "f"), 3);
}

#[test]
fn chains_of_unused_locals_are_removed() {
    assert_eq!(
        body_len("int f(int x) { int a = x; int b = a; return x; }", DCE, "f"),
        1
    );
}

#[test]
fn unreachable_statements_are_removed() {
    assert_eq!(body_len("int f() { return 1; int y = 2; y += 1; }", DCE, "f"), 1);
}

#[test]
fn calls_and_faulting_code_survive() {
    let source = "int g() { return 1; }
                  int f(int x, span<int, 4>& d) { g(); int q = 10 / x; int e = d[x]; return 0; }";
    assert_eq!(body_len(source, DCE, "f"), 4);
}

#[test]
fn while_false_is_removed() {
    let text = dump("void f(int x) { while (false) { x += 1; } }", DCE, "f");
    assert!(!text.contains("while"), "{text}");
}

// Loops

const HOIST_SOURCE: &str = "float f(float a, float b, int n) {
    float acc = 0.0f;
    for (int i = 0; i < n; i += 1) { acc += a * b; }
    return acc;
}";

#[test]
fn invariant_product_is_hoisted() {
    let text = dump(HOIST_SOURCE, LOOPS, "f");
    assert!(text.contains("$inv"), "{text}");
    assert!(text.contains(": float = (a * b);"), "{text}");
}

#[test]
fn written_operands_are_not_hoisted() {
    let text = dump(
        "float f(float a, float b, int n) {
             float acc = 0.0f;
             for (int i = 0; i < n; i += 1) { b += 1.0f; acc += a * b; }
             return acc;
         }",
        LOOPS,
        "f",
    );
    assert!(!text.contains("$inv"), "{text}");
}

#[test]
fn faulting_division_is_not_hoisted() {
    let text = dump(
        "int f(int a, int b, int n) {
             int acc = 0;
             while (acc < n) { acc += a / b; }
             return acc;
         }",
        LOOPS,
        "f",
    );
    assert!(!text.contains("$inv"), "{text}");
}

#[test]
fn referenced_locals_are_not_hoisted() {
    let text = dump(
        "void bump(float& v) { v += 1.0f; }
         float f(float a, int n) {
             float acc = 0.0f;
             float b = 2.0f;
             for (int i = 0; i < n; i += 1) { bump(b); acc += a * b; }
             return acc;
         }",
        LOOPS,
        "f",
    );
    assert!(!text.contains("$inv"), "{text}");
}

// Inlining

const GETTER_SOURCE: &str = "int get(int x) { return x; }
                             int f(int y) { return get(y) + 1; }";

#[test]
fn getter_is_inlined() {
    let text = dump(GETTER_SOURCE, INLINE, "f");
    assert!(text.contains("inline get["), "{text}");
    assert!(dump(GETTER_SOURCE, INLINE, "get").contains("#inline"));
    let plain = dump(GETTER_SOURCE, OptimizationFlags::empty(), "f");
    assert!(plain.contains("get(y)"), "{plain}");
}

#[test]
fn recursion_is_never_inlined() {
    let source = "int a(int n) { return b(n); }
                  int b(int n) { return a(n); }
                  int f(int n) { return a(n); }";
    let (ir, _) = compile(source, INLINE);
    assert!(ir.functions.iter().all(|f| f.name == "f" || !f.inline_eligible));
    let text = format!("{:?}", ir.functions);
    assert!(!text.contains("Inlined"), "{text}");
}

#[test]
fn self_recursion_is_never_inlined() {
    let source = "int down(int n) { if (n <= 0) { return 0; } return down(n - 1); }
                  int f(int n) { return down(n); }";
    let (ir, _) = compile(source, INLINE);
    let down = ir.functions.iter().find(|f| f.name == "down").unwrap();
    assert!(!down.inline_eligible);
    let text = format!("{:?}", ir.functions);
    assert!(!text.contains("Inlined"), "{text}");
}

#[test]
fn inlining_respects_size_limit() {
    let options = AnalysisOptions::default()
        .with_optimizations(INLINE)
        .with_max_inline_statements(0);
    let (ir, _, reports) = compile_with(GETTER_SOURCE, options);
    assert!(ir.functions.iter().all(|f| !f.inline_eligible));
    assert_eq!(reports, vec![PassReport::new("inline", 0)]);
}

#[test]
fn inlined_bodies_are_reoptimized() {
    let (_, _, reports) = compile_with(
        "int twice(int x) { int y = x * 2; return y; }
         int f(int a) { return twice(a); }",
        AnalysisOptions::default(),
    );
    let passes: Vec<&str> = reports.iter().map(|r| r.pass).collect();
    assert_eq!(
        passes,
        vec!["const_fold", "binop", "dce", "loops", "inline", "const_fold", "binop", "dce"]
    );
    assert_eq!(reports[4].message, "inlined 1 call sites");
}

// Pipeline

#[test]
fn no_flags_runs_no_pass() {
    let (_, _, reports) = compile_with(
        GETTER_SOURCE,
        AnalysisOptions::default().with_optimizations(OptimizationFlags::empty()),
    );
    assert!(reports.is_empty());
}

#[test]
fn reserved_flags_are_accepted() {
    let (_, _, reports) = compile_with(
        GETTER_SOURCE,
        AnalysisOptions::default().with_optimizations(
            OptimizationFlags::AUTO_VECTORISATION | OptimizationFlags::ASM_OPTIMISATION,
        ),
    );
    assert!(reports.is_empty());
}

#[test]
fn unsafe_mode_drops_bounds_guards() {
    let flags = OptimizationFlags::NO_SAFETY_CHECKS;
    let text = dump("float f(span<float, 4>& d, int i) { return d[i]; }", flags, "f");
    assert!(text.contains("unchecked"), "{text}");
}

#[test]
fn verifier_rejects_stray_break() {
    let mut func = IrFunction::new("broken", FunctionKind::Free, TypeId::VOID, Span::DUMMY);
    func.body.push(IrStmt::new(IrStmtKind::Break, Span::DUMMY));
    let module = IrModule {
        functions: vec![func],
        ..IrModule::default()
    };
    assert_eq!(
        verify_module(&module),
        Err(VerifyError::StrayJump {
            function: "broken".to_owned(),
            stmt: "break",
        })
    );
    let diagnostic = super::invariant_violation("dce", &verify_module(&module).unwrap_err());
    assert_eq!(diagnostic.code, ErrorCode::E9001);
}

// Folding agrees with wrapping i32 arithmetic.

fn int_expr() -> impl Strategy<Value = (String, i32)> {
    let leaf = (0i32..1000).prop_map(|v| (v.to_string(), v));
    leaf.prop_recursive(4, 32, 2, |inner| {
        (inner.clone(), 0usize..6, inner).prop_map(|((ls, lv), op, (rs, rv))| {
            let (sym, value) = match op {
                0 => ("+", lv.wrapping_add(rv)),
                1 => ("-", lv.wrapping_sub(rv)),
                2 => ("*", lv.wrapping_mul(rv)),
                3 => ("&", lv & rv),
                4 => ("|", lv | rv),
                _ => ("^", lv ^ rv),
            };
            (format!("({ls} {sym} {rs})"), value)
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn folding_matches_wrapping_arithmetic((source, value) in int_expr()) {
        let text = dump(&format!("int f() {{ return {source}; }}"), FOLD, "f");
        let expected = format!("return {value};");
        prop_assert!(text.contains(&expected), "{} => {}", source, text);
    }
}
