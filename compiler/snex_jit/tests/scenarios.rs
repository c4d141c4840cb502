#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end compiles: source text in, bound functions or diagnostics out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use snex_diagnostic::ErrorCode;
use snex_jit::{
    ClosureGenerator, CodeGenerator, CodegenError, CodegenRequest, CompilationUnit,
    CompilerOptions, ExternalLibrary, FaultReason, GeneratedModule, JitCompiler, OptimizationFlags,
    UnitState, Value,
};

fn compile(source: &str) -> CompilationUnit {
    JitCompiler::new(CompilerOptions::default(), ExternalLibrary::math()).compile(source, "test")
}

fn compile_with(source: &str, flags: OptimizationFlags) -> CompilationUnit {
    let options = CompilerOptions::default().with_optimizations(flags);
    JitCompiler::new(options, ExternalLibrary::math()).compile(source, "test")
}

fn assert_bound(unit: &CompilationUnit) {
    assert_eq!(unit.state(), UnitState::Bound, "{:#?}", unit.diagnostics());
}

// Plain functions and literal folding.

#[test]
fn add_binds_and_runs() {
    let unit = compile("int add(int a, int b) { return a + b; }");
    assert_bound(&unit);
    assert!(unit.diagnostics().is_empty());
    let sum: i32 = unit.call("add", &mut [Value::Int(2), Value::Int(3)]).unwrap();
    assert_eq!(sum, 5);
    let add = unit.function("add").unwrap();
    assert_eq!(add.signature(), "int add(int, int)");
}

#[test]
fn literal_addition_is_folded_away() {
    let unit = compile_with("int five() { return 2 + 3; }", OptimizationFlags::CONSTANT_FOLDING);
    assert_bound(&unit);
    let ir = unit.ir().unwrap();
    let text = ir
        .display(&unit.context().types)
        .function(ir.function(ir.find_function("five").unwrap()).unwrap());
    assert!(text.contains("return 5;"), "{text}");
    assert!(!text.contains('+'), "{text}");
    assert_eq!(unit.call::<i32>("five", &mut []), Ok(5));
    assert!(unit.passes().iter().any(|p| p.pass == "const_fold" && p.changes > 0));
}

// Located errors.

#[test]
fn undeclared_identifier_fails_with_one_located_error() {
    let unit = compile("int f() {\n    return undefinedVar;\n}");
    assert_eq!(unit.state(), UnitState::Failed);
    assert_eq!(unit.errors().count(), 1);
    let located = unit.located_diagnostics();
    assert_eq!(located.len(), 1);
    assert_eq!(located[0].diagnostic.code, ErrorCode::E2003);
    assert_eq!((located[0].location.line, located[0].location.column), (2, 12));
    assert!(unit.functions().is_none());
}

#[test]
fn syntax_errors_are_all_reported() {
    let unit = compile("int f() { return 1 }\nint g() { return (2; }\nint h() { return 3; }");
    assert_eq!(unit.state(), UnitState::Failed);
    assert!(unit.errors().count() >= 2, "{:#?}", unit.diagnostics());
    let lines: Vec<u32> = unit
        .located_diagnostics()
        .iter()
        .map(|d| d.location.line)
        .collect();
    assert!(lines.contains(&1) && lines.contains(&2), "{lines:?}");
}

// Templates: one definition, distinct instances.

const MAKE_SPAN: &str = "
template <int N> span<int, N> makeSpan() {
    span<int, N> s;
    for (int i = 0; i < N; i += 1) { s[i] = i; }
    return s;
}
int f() {
    span<int, 4> a = makeSpan<4>();
    span<int, 8> b = makeSpan<8>();
    return a[3] + b[7];
}";

#[test]
fn template_instances_get_distinct_types() {
    let unit = compile(MAKE_SPAN);
    assert_bound(&unit);
    let ir = unit.ir().unwrap();
    let types = &unit.context().types;
    let ret = |name: &str| ir.function(ir.find_function(name).unwrap()).unwrap().ret;
    let (four, eight) = (ret("makeSpan<4>"), ret("makeSpan<8>"));
    assert_ne!(four, eight);
    assert_eq!(types.layout(eight).size - types.layout(four).size, 4 * 4);

    assert_eq!(unit.call::<i32>("f", &mut []), Ok(10));
    let made: Vec<i32> = unit.call("makeSpan<4>", &mut []).unwrap();
    assert_eq!(made, vec![0, 1, 2, 3]);
}

/// Counts what reaches the backend, then delegates to the closure backend.
struct CountingBackend {
    inner: ClosureGenerator,
    calls: Arc<AtomicUsize>,
    functions: Arc<Mutex<Vec<String>>>,
}

impl CodeGenerator for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn generate(&mut self, request: &CodegenRequest<'_>) -> Result<GeneratedModule, CodegenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.functions
            .lock()
            .extend(request.module.functions.iter().map(|f| f.name.clone()));
        self.inner.generate(request)
    }
}

#[test]
fn repeated_instantiation_generates_code_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let functions = Arc::new(Mutex::new(Vec::new()));
    let backend = CountingBackend {
        inner: ClosureGenerator::new(),
        calls: Arc::clone(&calls),
        functions: Arc::clone(&functions),
    };
    let compiler = JitCompiler::new(CompilerOptions::default().without_optimizations(), ExternalLibrary::new())
        .with_backend(backend);
    assert_eq!(compiler.backend_name(), "counting");

    let unit = compiler.compile(
        "template <int N> int size() { return N; }
         int f() { return size<4>() + size<4>() + size<2>() + size<4>(); }",
        "test",
    );
    assert_bound(&unit);
    assert_eq!(unit.call::<i32>("f", &mut []), Ok(14));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let generated = functions.lock();
    assert_eq!(generated.iter().filter(|n| *n == "size<4>").count(), 1);
    assert_eq!(generated.iter().filter(|n| *n == "size<2>").count(), 1);
}

#[test]
fn failed_units_never_reach_the_backend() {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = CountingBackend {
        inner: ClosureGenerator::new(),
        calls: Arc::clone(&calls),
        functions: Arc::default(),
    };
    let compiler =
        JitCompiler::new(CompilerOptions::default(), ExternalLibrary::new()).with_backend(backend);
    let unit = compiler.compile("int f() { return missing; }", "test");
    assert!(unit.is_failed());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Moves one global to the unmapped page after the closure backend ran.
struct RelocatingBackend {
    inner: ClosureGenerator,
    global: &'static str,
}

impl CodeGenerator for RelocatingBackend {
    fn name(&self) -> &str {
        "relocating"
    }

    fn generate(&mut self, request: &CodegenRequest<'_>) -> Result<GeneratedModule, CodegenError> {
        let mut module = self.inner.generate(request)?;
        for slot in module.globals.iter_mut().filter(|g| g.name == self.global) {
            slot.address = 0;
        }
        Ok(module)
    }
}

#[test]
fn watch_table_reports_unreadable_globals() {
    let backend = RelocatingBackend {
        inner: ClosureGenerator::new(),
        global: "lost",
    };
    let compiler =
        JitCompiler::new(CompilerOptions::default(), ExternalLibrary::new()).with_backend(backend);
    let unit = compiler.compile("int kept = 3; int lost; int f() { return kept; }", "test");
    assert_bound(&unit);
    let table = unit.watch_table();
    let kept = table.iter().find(|e| e.name == "kept").unwrap();
    assert_eq!(kept.value, Ok(Value::Int(3)));
    let lost = table.iter().find(|e| e.name == "lost").unwrap();
    match &lost.value {
        Err(fault) => assert_eq!(fault.reason, FaultReason::MemoryAccess),
        Ok(value) => panic!("expected a fault, got {value:?}"),
    }
}

// Oversized storage is a diagnostic, never a panic.

#[test]
fn globals_overlapping_the_stack_fail_to_compile() {
    let unit = compile(
        "span<span<int, 1048576>, 256> big;
         int g2;
         int f(int a, int b, int c, int d, int e) { g2 = 7; return d; }",
    );
    assert!(unit.is_failed());
    let codes: Vec<ErrorCode> = unit.errors().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E3001]);
}

#[test]
fn nested_spans_past_the_object_limit_are_rejected() {
    let unit = compile("span<span<span<int, 1048576>, 1048576>, 2> a; int b;");
    assert!(unit.is_failed());
    assert!(
        unit.errors().any(|d| d.code == ErrorCode::E2014),
        "{:#?}",
        unit.diagnostics()
    );
}

// Inlining changes the IR, not the results.

const GETTER: &str = "int get(int x) { return x; }
                      int f(int y) { return get(y) + 1; }";

#[test]
fn inlining_changes_shape_not_results() {
    let inlined = compile_with(GETTER, OptimizationFlags::INLINING);
    let plain = compile_with(GETTER, OptimizationFlags::empty());
    assert_bound(&inlined);
    assert_bound(&plain);
    assert_ne!(inlined.ir_dump(), plain.ir_dump());
    assert!(plain.ir_dump().unwrap().contains("get(y)"));

    for y in [-3, 0, 1, 41] {
        let a: i32 = inlined.call("f", &mut [Value::Int(y)]).unwrap();
        let b: i32 = plain.call("f", &mut [Value::Int(y)]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, y + 1);
    }
}

// Scopes

#[test]
fn inner_binding_shadows_outer() {
    let unit = compile(
        "int outer() { int x = 1; { int x = 2; x += 1; } return x; }
         int both() { int x = 1; int r = 0; { int x = 5; r = x; } return r + x; }",
    );
    assert_bound(&unit);
    assert_eq!(unit.call::<i32>("outer", &mut []), Ok(1));
    assert_eq!(unit.call::<i32>("both", &mut []), Ok(6));
}

#[test]
fn duplicate_in_one_scope_is_rejected() {
    let unit = compile("int f() { int x = 1; int x = 2; return x; }");
    assert!(unit.is_failed());
    let codes: Vec<ErrorCode> = unit.errors().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E2006]);
}

#[test]
fn namespaces_and_methods_are_addressable() {
    let unit = compile(
        "namespace dsp {
             struct Voice {
                 float gain = 0.5f;
                 float process(float x) { return x * gain; }
                 void setGain(float g) { gain = g; }
             };
             float twice(float x) { return x * 2.0f; }
         }",
    );
    assert_bound(&unit);
    let functions = unit.functions().unwrap();
    assert!(functions.get("dsp::twice").is_some());
    assert_eq!(functions.call::<f32>("dsp::twice", &mut [Value::Float(1.5)]), Ok(3.0));

    let mut args = [Value::Aggregate(vec![Value::Float(0.5)]), Value::Float(0.25)];
    functions.call::<()>("dsp::Voice::setGain", &mut args).unwrap();
    assert_eq!(args[0], Value::Aggregate(vec![Value::Float(0.25)]));
    let mut args = [args[0].clone(), Value::Float(8.0)];
    assert_eq!(functions.call::<f32>("dsp::Voice::process", &mut args), Ok(2.0));
}

#[test]
fn overloads_resolve_by_signature() {
    let unit = compile(
        "float mix(float a, float b) { return a + b; }
         double mix(double a, double b) { return a * b; }",
    );
    assert_bound(&unit);
    let functions = unit.functions().unwrap();
    assert_eq!(functions.overloads("mix").count(), 2);
    let wide = functions.by_signature("double mix(double, double)").unwrap();
    assert_eq!(wide.call::<f64>(&mut [Value::Double(2.0), Value::Double(3.0)]), Ok(6.0));
}

#[test]
fn host_constants_fold_into_code() {
    let mut library = ExternalLibrary::math();
    library.register_constant(Some("Host"), "sampleRate", snex_ir::ConstValue::double(48_000.0));
    let compiler = JitCompiler::new(CompilerOptions::default(), library);
    let unit = compiler.compile("double period() { return 1.0 / Host::sampleRate; }", "test");
    assert_bound(&unit);
    assert_eq!(unit.call::<f64>("period", &mut []), Ok(1.0 / 48_000.0));
}

#[test]
fn batch_compiles_are_independent() {
    let compiler = JitCompiler::new(CompilerOptions::default(), ExternalLibrary::math());
    let units = compiler.compile_batch(&[
        ("struct A { int v; }; int f() { A a; a.v = 1; return a.v; }", "one"),
        ("struct A { double v; }; double f() { A a; a.v = 2.5; return a.v; }", "two"),
        ("int f() { return nope; }", "three"),
    ]);
    assert_eq!(units.len(), 3);
    assert_eq!(units[0].name(), "one");
    assert_eq!(units[0].call::<i32>("f", &mut []), Ok(1));
    assert_eq!(units[1].call::<f64>("f", &mut []), Ok(2.5));
    assert!(units[2].is_failed());
}
