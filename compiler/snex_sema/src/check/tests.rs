#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use snex_diagnostic::{Diagnostic, ErrorCode};
use snex_ir::ConstValue;
use snex_parse::parse;
use snex_types::{ScopeId, Symbol, TypeId};

use super::{check, CheckOutput};
use crate::context::UnitContext;
use crate::ir::{IrExprKind, IrStmtKind};
use crate::options::AnalysisOptions;

fn check_source(source: &str) -> (CheckOutput, UnitContext) {
    let mut ctx = UnitContext::standalone("test");
    let parsed = parse(source, "test.snex", &mut ctx.interner);
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected syntax errors: {:#?}",
        parsed.diagnostics
    );
    let output = check(&parsed.module, &mut ctx, &AnalysisOptions::default());
    (output, ctx)
}

fn codes(source: &str) -> Vec<ErrorCode> {
    let (output, _) = check_source(source);
    output.diagnostics.iter().map(|d| d.code).collect()
}

fn errors(output: &CheckOutput) -> Vec<&Diagnostic> {
    output.diagnostics.iter().filter(|d| d.is_error()).collect()
}

fn assert_clean(source: &str) -> (CheckOutput, UnitContext) {
    let (output, ctx) = check_source(source);
    assert!(
        output.diagnostics.is_empty(),
        "unexpected diagnostics: {:#?}",
        output.diagnostics
    );
    (output, ctx)
}

// Declarations and bodies

#[test]
fn simple_function_lowers() {
    let (output, _) = assert_clean("int add(int a, int b) { return a + b; }");
    let add = output.ir.find_function("add").unwrap();
    let func = output.ir.function(add).unwrap();
    assert_eq!(func.ret, TypeId::INT);
    assert_eq!(func.params.len(), 2);
    assert!(matches!(func.body.as_slice(), [stmt] if matches!(stmt.kind, IrStmtKind::Return(Some(_)))));
}

#[test]
fn namespaces_qualify_function_names() {
    let (output, _) = assert_clean(
        "namespace dsp { namespace util { float half(float x) { return x * 0.5f; } } }
         float g(float x) { return dsp::util::half(x); }",
    );
    assert!(output.ir.find_function("dsp::util::half").is_some());
}

#[test]
fn using_namespace_imports_names() {
    assert_clean(
        "namespace a { int one() { return 1; } }
         using namespace a;
         int f() { return one(); }",
    );
}

#[test]
fn ambiguous_import_is_reported() {
    assert_eq!(
        codes(
            "namespace a { int v() { return 1; } }
             namespace b { int v() { return 2; } }
             using namespace a;
             using namespace b;
             int f() { return v(); }"
        ),
        vec![ErrorCode::E2007]
    );
}

#[test]
fn alias_names_a_type() {
    assert_clean(
        "namespace dsp { struct Frame { float l; float r; }; }
         using Frame = dsp::Frame;
         float left(Frame f) { return f.l; }",
    );
}

#[test]
fn unknown_identifier() {
    let (output, _) = check_source("int f() { return missing; }");
    let errors = errors(&output);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ErrorCode::E2003);
}

#[test]
fn errors_do_not_cascade() {
    assert_eq!(
        codes("float f() { float x = missing * 2.0f + 1.0f; return x; }"),
        vec![ErrorCode::E2003]
    );
}

#[test]
fn bool_does_not_convert_implicitly() {
    assert_eq!(codes("int f() { int x = true; return x; }"), vec![ErrorCode::E2001]);
    assert_clean("int f() { int x = (int)true; return x; }");
}

#[test]
fn narrowing_warns_unless_exact() {
    assert_eq!(codes("int f(double d) { int x = d; return x; }"), vec![ErrorCode::W2001]);
    assert_clean("float f() { float x = 0.5; return x; }");
}

#[test]
fn widening_is_silent() {
    let (output, _) = assert_clean("double f(int i) { return i; }");
    let func = output.ir.function(output.ir.find_function("f").unwrap()).unwrap();
    let IrStmtKind::Return(Some(value)) = &func.body[0].kind else {
        panic!("expected return");
    };
    assert!(matches!(value.kind, IrExprKind::Convert(_)));
    assert_eq!(value.ty, TypeId::DOUBLE);
}

#[test]
fn duplicate_local() {
    assert_eq!(
        codes("void f() { int x = 1; int x = 2; x = x + 1; }"),
        vec![ErrorCode::E2006]
    );
}

#[test]
fn shadowing_in_inner_block_is_allowed() {
    assert_clean("int f() { int x = 1; { int x = 2; x += 1; } return x; }");
}

#[test]
fn missing_return() {
    assert_eq!(
        codes("int f(int x) { if (x > 0) { return 1; } }"),
        vec![ErrorCode::E2010]
    );
    assert_clean("int f(int x) { if (x > 0) { return 1; } else { return 2; } }");
    assert_clean("int f() { while (true) { return 1; } }");
}

#[test]
fn break_outside_loop() {
    assert_eq!(codes("void f() { break; }"), vec![ErrorCode::E2011]);
    assert_clean("void f() { for (;;) { break; } }");
}

#[test]
fn unused_variable_warning() {
    assert_eq!(codes("void f() { int x = 1; }"), vec![ErrorCode::W2002]);
    assert!(codes("void f() { int _x = 1; }").is_empty());
}

#[test]
fn unreachable_code_warning() {
    assert_eq!(
        codes("int f() { return 1; int y = 2; }"),
        vec![ErrorCode::W2003, ErrorCode::W2002]
    );
}

#[test]
fn assignment_targets() {
    assert_eq!(codes("void f() { 1 = 2; }"), vec![ErrorCode::E2009]);
    assert_eq!(
        codes("const int N = 4; void f() { N = 5; }"),
        vec![ErrorCode::E2009]
    );
}

// Structs

#[test]
fn struct_methods_see_members() {
    let (output, _) = assert_clean(
        "struct Gain {
             float amount = 0.5f;
             float process(float x) { return x * amount; }
         };
         float run(float x) { Gain g; return g.process(x); }",
    );
    assert!(output.ir.find_function("Gain::process").is_some());
}

#[test]
fn member_defaults_fill_initializer() {
    let (output, _) = assert_clean(
        "struct Pair { int a; int b = 7; };
         int f() { Pair p = { 1 }; return p.b; }",
    );
    let func = output.ir.function(output.ir.find_function("f").unwrap()).unwrap();
    let IrStmtKind::Local { init, .. } = &func.body[0].kind else {
        panic!("expected local");
    };
    let IrExprKind::Aggregate(values) = &init.kind else {
        panic!("expected aggregate, got {init:?}");
    };
    assert_eq!(values[1].as_const(), Some(ConstValue::Int(7)));
}

#[test]
fn recursive_struct_by_value() {
    let found = codes("struct Node { int v; Node next; };");
    assert!(found.contains(&ErrorCode::E2012), "{found:?}");
}

#[test]
fn self_reference_through_reference_is_fine() {
    assert_clean("struct Node { int v; }; void touch(Node& n) { n.v = 1; }");
}

#[test]
fn missing_member() {
    assert_eq!(
        codes("struct P { int a; }; int f(P p) { return p.b; }"),
        vec![ErrorCode::E2015]
    );
}

// Spans and references

#[test]
fn span_size_and_range_for() {
    assert_clean(
        "float sum(span<float, 4>& data) {
             float total = 0.0f;
             for (auto& s : data) { total += s; }
             return total + (float)data.size();
         }",
    );
}

#[test]
fn constant_index_out_of_bounds() {
    assert_eq!(
        codes("float f(span<float, 4>& data) { return data[4]; }"),
        vec![ErrorCode::E2008]
    );
}

#[test]
fn reference_binding_rules() {
    assert_eq!(codes("void f() { int& r = 5; r = 1; }"), vec![ErrorCode::E2009]);
    assert_clean("int f() { const int& r = 5; return r; }");
    assert_clean("int f() { int x = 1; int& r = x; r = 2; return x; }");
}

#[test]
fn safety_flag_reaches_index_places() {
    let (output, _) = assert_clean("float f(span<float, 4>& d, int i) { return d[i]; }");
    let text = format!("{:?}", output.ir.functions[0].body);
    assert!(text.contains("checked: true"), "{text}");
}

// Calls and overloads

#[test]
fn overload_prefers_exact_match() {
    let (output, _) = assert_clean(
        "float g(float x) { return x; }
         double g(double x) { return x; }
         float f() { return g(1.0f); }",
    );
    let f = output.ir.function(output.ir.find_function("f").unwrap()).unwrap();
    let IrStmtKind::Return(Some(value)) = &f.body[0].kind else {
        panic!("expected return");
    };
    let IrExprKind::Call { callee, .. } = &value.kind else {
        panic!("expected call, got {value:?}");
    };
    assert_eq!(output.ir.function(*callee).unwrap().ret, TypeId::FLOAT);
}

#[test]
fn equally_good_overloads_are_ambiguous() {
    assert_eq!(
        codes(
            "float g(float x) { return x; }
             double g(double x) { return x; }
             void f() { g(1); }"
        ),
        vec![ErrorCode::E2007]
    );
}

#[test]
fn function_may_call_itself() {
    let (output, _) = assert_clean(
        "int fact(int n) { if (n <= 1) { return 1; } return n * fact(n - 1); }
         float halve(float x, int times) { if (times == 0) { return x; } return halve(x * 0.5f, times - 1); }",
    );
    let fact = output.ir.function(output.ir.find_function("fact").unwrap()).unwrap();
    assert_eq!(fact.param_types().collect::<Vec<_>>(), vec![TypeId::INT]);
    assert!(fact.locals.iter().any(|l| l.is_param && l.ty == TypeId::INT));
}

#[test]
fn self_call_arity_is_still_checked() {
    assert_eq!(
        codes("int f(int n) { return f(n, n); }"),
        vec![ErrorCode::E2004]
    );
}

#[test]
fn arity_mismatch() {
    assert_eq!(
        codes("int g(int a) { return a; } int f() { return g(1, 2); }"),
        vec![ErrorCode::E2004]
    );
}

#[test]
fn redefinition_of_overload() {
    assert_eq!(
        codes("int g(int a) { return a; } int g(int b) { return b; }"),
        vec![ErrorCode::E2006]
    );
}

#[test]
fn calling_a_variable() {
    assert_eq!(codes("int f(int x) { return x(1); }"), vec![ErrorCode::E2008]);
}

// Templates

#[test]
fn instantiation_is_idempotent() {
    let (output, _) = assert_clean(
        "template <int N> int size() { return N; }
         int f() { return size<4>() + size<4>() + size<2>(); }",
    );
    let names: Vec<&str> = output
        .ir
        .functions
        .iter()
        .filter(|f| f.is_instance)
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["size<4>", "size<2>"]);
}

#[test]
fn struct_template_instances_share_a_type() {
    let (_, ctx) = assert_clean(
        "template <typename T, int N> struct Buffer { span<T, N> data; };
         float f(Buffer<float, 4>& a, Buffer<float, 4>& b) { return a.data[0] + b.data[0]; }",
    );
    let instances = (0..ctx.types.len() as u32)
        .map(TypeId::new)
        .filter(|&ty| ctx.types.display(ty) == "Buffer<float, 4>")
        .count();
    assert_eq!(instances, 1);
}

#[test]
fn deduction_from_arguments() {
    let (output, _) = assert_clean(
        "template <typename T> T twice(T x) { return x + x; }
         double f() { return twice(1.5); }",
    );
    assert!(output.ir.find_function("twice<double>").is_some());
}

#[test]
fn errors_inside_instances_point_at_the_cause() {
    let (output, _) = check_source(
        "template <typename T> T bad(T x) { return x + missing; }
         float f() { return bad<float>(1.0f); }",
    );
    let errors = errors(&output);
    assert_eq!(
        errors.iter().map(|d| d.code).collect::<Vec<_>>(),
        vec![ErrorCode::E2003, ErrorCode::E2013]
    );
    assert!(errors[0]
        .notes
        .iter()
        .any(|n| n == "in instantiation of 'bad<float>'"));
}

#[test]
fn template_argument_count() {
    assert_eq!(
        codes("template <int N> int size() { return N; } int f() { return size<1, 2>(); }"),
        vec![ErrorCode::E2017]
    );
}

// Constants

#[test]
fn const_globals_are_evaluated() {
    let (output, _) = assert_clean("const int N = 2 * 8; span<float, N> buffer;");
    assert_eq!(output.ir.globals[0].constant, Some(ConstValue::Int(16)));
    assert!(output.ir.init.is_some());
}

#[test]
fn const_globals_bind_as_constants() {
    let (output, mut ctx) = assert_clean("const double RATE = 44100.0; int count = 0;");
    let rate = ctx.interner.intern("RATE");
    let id = ctx.scopes.resolve(rate, ScopeId::GLOBAL).unwrap();
    assert_eq!(
        ctx.scopes.symbol(id).map(|data| &data.symbol),
        Some(&Symbol::Constant {
            ty: TypeId::DOUBLE,
            value: ConstValue::double(44100.0),
        })
    );
    // Still a global, so the watch table can show it.
    assert_eq!(output.ir.globals[0].name, "RATE");

    let count = ctx.interner.intern("count");
    let id = ctx.scopes.resolve(count, ScopeId::GLOBAL).unwrap();
    assert!(matches!(
        ctx.scopes.symbol(id).map(|data| &data.symbol),
        Some(Symbol::Variable { .. })
    ));
}

#[test]
fn const_globals_size_struct_members_and_parameters() {
    let (output, ctx) = assert_clean(
        "const int N = 4;
         struct Block { span<int, N> data; };
         int first(span<int, N>& s) { return s[0]; }
         int total(Block& b) { return first(b.data) + N; }",
    );
    let first = output.ir.function(output.ir.find_function("first").unwrap()).unwrap();
    let param = first.param_types().next().unwrap();
    assert_eq!(ctx.types.display(param), "span<int, 4>&");
}

#[test]
fn const_global_with_runtime_initializer_stays_a_variable() {
    let (output, _) = assert_clean("int seed = 3; const int twice = seed * 2; int f() { return twice; }");
    assert_eq!(output.ir.globals.len(), 2);
    assert_eq!(output.ir.globals[1].constant, None);
}

#[test]
fn span_length_must_be_constant() {
    let found = codes("int n = 4; span<float, n> buffer;");
    assert!(found.contains(&ErrorCode::E2014), "{found:?}");
}

#[test]
fn span_size_is_bounded_in_bytes() {
    let found = codes("span<span<span<int, 1048576>, 1048576>, 2> a;");
    assert_eq!(found.iter().filter(|c| **c == ErrorCode::E2014).count(), 1, "{found:?}");
    let (output, _) = check_source("span<span<double, 1048576>, 256> b;");
    let errs = errors(&output);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].message.contains("object limit"), "{:?}", errs[0].message);
}
