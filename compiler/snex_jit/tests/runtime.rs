#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Invocation: marshaling errors, runtime faults and debug events.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use snex_diagnostic::{DebugChannel, DebugEvent, LogLevel, RuntimeEvent};
use snex_jit::{
    CompilationUnit, CompilerOptions, ExternalLibrary, FaultReason, InvokeError, JitCompiler,
    MarshalingError, OptimizationFlags, Value,
};
use snex_types::TypeId;

fn compile(source: &str) -> CompilationUnit {
    let unit =
        JitCompiler::new(CompilerOptions::default(), ExternalLibrary::math()).compile(source, "rt");
    assert!(unit.is_bound(), "{:#?}", unit.diagnostics());
    unit
}

fn fault_reason(result: Result<Value, InvokeError>) -> FaultReason {
    match result {
        Err(InvokeError::Fault(fault)) => fault.reason,
        other => panic!("expected a fault, got {other:?}"),
    }
}

#[test]
fn arity_and_type_mismatches_are_marshaling_errors() {
    let unit = compile("int add(int a, int b) { return a + b; }");
    let add = unit.function("add").unwrap();
    assert_eq!(
        add.invoke(&mut [Value::Int(1)]),
        Err(InvokeError::Marshaling(MarshalingError::Arity {
            expected: 2,
            found: 1,
        }))
    );
    assert!(matches!(
        add.invoke(&mut [Value::Int(1), Value::Bool(true)]),
        Err(InvokeError::Marshaling(MarshalingError::ArgumentType { index: 1, .. }))
    ));
    assert!(matches!(
        add.call::<f64>(&mut [Value::Int(1), Value::Int(2)]),
        Err(InvokeError::Marshaling(MarshalingError::ReturnType { .. }))
    ));
}

#[test]
fn span_arguments_are_copied_back() {
    let unit = compile(
        "void scale(span<float, 4>& data, float g) {
             for (int i = 0; i < 4; i += 1) { data[i] *= g; }
         }",
    );
    let data = [1.0f32, 2.0, 3.0, 4.0].into_iter().map(Value::Float).collect();
    let mut args = [Value::Aggregate(data), Value::Float(2.0)];
    unit.call::<()>("scale", &mut args).unwrap();
    assert_eq!(
        args[0],
        Value::Aggregate(vec![
            Value::Float(2.0),
            Value::Float(4.0),
            Value::Float(6.0),
            Value::Float(8.0)
        ])
    );
}

#[test]
fn dyn_views_take_any_length() {
    let unit = compile(
        "int total(dyn<int> data) {
             int sum = 0;
             for (int i = 0; i < data.size(); i += 1) { sum += data[i]; }
             return sum;
         }",
    );
    let total = unit.function("total").unwrap();
    for len in [0, 1, 7] {
        let mut args = [Value::Aggregate((1..=len).map(Value::Int).collect())];
        let expected: i32 = (1..=len).sum();
        assert_eq!(total.call::<i32>(&mut args), Ok(expected));
    }
}

#[test]
fn out_of_bounds_index_faults_when_checked() {
    let source = "int at(span<int, 4>& d, int i) { return d[i]; }";
    let unit = compile(source);
    let data = || Value::Aggregate((0..4).map(Value::Int).collect());
    assert_eq!(unit.call::<i32>("at", &mut [data(), Value::Int(3)]), Ok(3));
    assert_eq!(
        fault_reason(unit.function("at").unwrap().invoke(&mut [data(), Value::Int(4)])),
        FaultReason::IndexOutOfBounds
    );

    let options = CompilerOptions::default()
        .with_optimizations(OptimizationFlags::default() | OptimizationFlags::NO_SAFETY_CHECKS);
    let unchecked = JitCompiler::new(options, ExternalLibrary::new()).compile(source, "unchecked");
    let result = unchecked.function("at").unwrap().invoke(&mut [data(), Value::Int(4)]);
    assert!(
        !matches!(&result, Err(InvokeError::Fault(f)) if f.reason == FaultReason::IndexOutOfBounds),
        "{result:?}"
    );
}

#[test]
fn integer_division_by_zero_faults() {
    let unit = compile("int div(int a, int b) { return a / b; }");
    let div = unit.function("div").unwrap();
    assert_eq!(
        fault_reason(div.invoke(&mut [Value::Int(1), Value::Int(0)])),
        FaultReason::DivisionByZero
    );
    // A fault leaves the unit usable.
    assert_eq!(div.call::<i32>(&mut [Value::Int(9), Value::Int(3)]), Ok(3));
}

#[test]
fn runaway_recursion_faults_instead_of_crashing() {
    let unit = compile("int down(int n) { return down(n + 1); }");
    assert_eq!(
        fault_reason(unit.function("down").unwrap().invoke(&mut [Value::Int(0)])),
        FaultReason::StackOverflow
    );
}

#[test]
fn host_function_errors_become_faults() {
    let mut library = ExternalLibrary::new();
    library.register_function(Some("Host"), "check", vec![TypeId::INT], TypeId::INT, |args| {
        match args {
            [Value::Int(v)] if *v >= 0 => Ok(Value::Int(v * 2)),
            _ => Err("negative input".to_owned()),
        }
    });
    let unit = JitCompiler::new(CompilerOptions::default(), library)
        .compile("int f(int x) { return Host::check(x); }", "host");
    assert!(unit.is_bound(), "{:#?}", unit.diagnostics());
    assert_eq!(unit.call::<i32>("f", &mut [Value::Int(4)]), Ok(8));
    let Err(InvokeError::Fault(fault)) = unit.call::<i32>("f", &mut [Value::Int(-1)]) else {
        panic!("expected a fault");
    };
    assert_eq!(fault.reason, FaultReason::HostFunction);
    assert!(fault.message.contains("negative input"), "{}", fault.message);
}

#[test]
fn math_library_is_callable() {
    let unit = compile(
        "double shape(double x) { return Math::tanh(x) + Math::abs(-1.0) + Math::sqrt(4.0); }",
    );
    let got: f64 = unit.call("shape", &mut [Value::Double(0.5)]).unwrap();
    assert!((got - (0.5f64.tanh() + 3.0)).abs() < 1e-12, "{got}");
}

#[test]
fn channel_sees_diagnostics_traces_and_runtime_events() {
    let channel = DebugChannel::new();
    let events = channel.bounded_receiver(64);
    let compiler = JitCompiler::new(CompilerOptions::default(), ExternalLibrary::new())
        .with_channel(channel.clone());

    let failed = compiler.compile("int f() { return nope; }", "broken");
    assert!(failed.is_failed());
    let mut unit = compiler.compile("int div(int a, int b) { return a / b; }", "ok");
    assert!(unit.is_bound());
    let _ = unit.call::<i32>("div", &mut [Value::Int(1), Value::Int(0)]);
    unit.release().unwrap();

    let received: Vec<DebugEvent> = events.try_iter().collect();
    assert!(received.iter().any(|e| matches!(
        e,
        DebugEvent::Diagnostic { unit, diagnostic } if &**unit == "broken" && diagnostic.location.line == 1
    )));
    assert!(received
        .iter()
        .any(|e| matches!(e, DebugEvent::Trace { level: LogLevel::Info, .. })));
    assert!(received.iter().any(|e| matches!(
        e,
        DebugEvent::Runtime(RuntimeEvent::Bound { unit, functions: 1 }) if &**unit == "ok"
    )));
    assert!(received.iter().any(|e| matches!(
        e,
        DebugEvent::Runtime(RuntimeEvent::Fault { function, .. }) if function == "div"
    )));
    assert!(matches!(
        received.last(),
        Some(DebugEvent::Runtime(RuntimeEvent::Released { .. }))
    ));
}

#[test]
fn listeners_receive_events_synchronously() {
    let channel = DebugChannel::new();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = channel.subscribe(Arc::new(move |event: &DebugEvent| {
        sink.lock().push(event.level());
    }));
    let compiler = JitCompiler::new(CompilerOptions::default(), ExternalLibrary::new())
        .with_channel(channel.clone());
    let unit = compiler.compile("int f() { int unused = 0; return 1; }", "warn");
    assert!(unit.is_bound());
    assert!(seen.lock().contains(&LogLevel::Warning));

    assert!(channel.unsubscribe(id));
    let before = seen.lock().len();
    compiler.compile("int f() { return 1; }", "quiet");
    assert_eq!(seen.lock().len(), before);
}

#[test]
fn globals_persist_between_calls() {
    let unit = compile(
        "double phase = 0.0;
         double advance(double delta) { phase += delta; return phase; }",
    );
    let advance = unit.function("advance").unwrap();
    advance.call::<f64>(&mut [Value::Double(0.25)]).unwrap();
    assert_eq!(advance.call::<f64>(&mut [Value::Double(0.5)]), Ok(0.75));
    let phase = unit.watch_table().into_iter().find(|e| e.name == "phase").unwrap();
    assert_eq!(phase.value, Ok(Value::Double(0.75)));
    assert_eq!(phase.type_tag, 'D');
}
