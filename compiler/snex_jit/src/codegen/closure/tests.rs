#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use snex_ir::{ConstValue, Primitive};
use snex_sema::{analyze, AnalysisOptions, OptimizationFlags, UnitContext};

use super::ClosureGenerator;
use crate::codegen::{CodeGenerator, CodegenRequest, GeneratedModule};
use crate::runtime::UnitMemory;
use crate::{CodegenError, ExternalLibrary, FaultReason, RuntimeFault};

const STACK: u32 = 64 * 1024;

fn generate_with(
    source: &str,
    flags: OptimizationFlags,
    library: &ExternalLibrary,
    stack_size: u32,
) -> Result<GeneratedModule, CodegenError> {
    let mut ctx = UnitContext::new("test", Arc::new(library.table().clone()));
    let parsed = snex_parse::parse(source, "test.snex", &mut ctx.interner);
    assert!(parsed.diagnostics.is_empty(), "{:#?}", parsed.diagnostics);
    let options = AnalysisOptions::default().with_optimizations(flags);
    let output = analyze(&parsed.module, &mut ctx, &options);
    assert!(!output.has_errors(), "{:#?}", output.diagnostics);
    let request = CodegenRequest {
        unit: "test",
        module: &output.ir,
        types: &ctx.types,
        externs: library.table(),
        host: library.host_functions(),
        safety_checks: flags.safety_checks(),
        stack_size,
    };
    ClosureGenerator::new().generate(&request)
}

fn generate(source: &str, flags: OptimizationFlags) -> GeneratedModule {
    generate_with(source, flags, &ExternalLibrary::math(), STACK).unwrap()
}

/// Run `name` with scalar arguments and read a scalar result.
fn run(
    module: &GeneratedModule,
    name: &str,
    args: &[ConstValue],
    ret: Primitive,
) -> Result<ConstValue, RuntimeFault> {
    let index = module.entries.iter().position(|e| e.name == name).unwrap();
    let mut memory = UnitMemory::new(module.global_size, STACK);
    let mut m = memory.machine(&module.entries);
    if let Some(init) = module.init {
        let frame = &module.entries[init.index()].frame;
        let at = m.alloca(frame.size, frame.align)?;
        m.call(init.index(), at)?;
        m.sp = at;
    }
    let layout = module.entries[index].frame.clone();
    let frame = m.alloca(layout.size, layout.align)?;
    m.fill_zero(frame, layout.size)?;
    for (arg, offset) in args.iter().zip(&layout.params) {
        m.write_scalar(frame + offset, *arg)?;
    }
    m.call(index, frame)?;
    m.read_scalar(frame + layout.ret.unwrap(), ret)
}

#[test]
fn recursion_through_frames() {
    let module = generate(
        "int fact(int n) { if (n <= 1) return 1; return n * fact(n - 1); }",
        OptimizationFlags::default(),
    );
    assert_eq!(
        run(&module, "fact", &[ConstValue::Int(10)], Primitive::Int),
        Ok(ConstValue::Int(3_628_800))
    );
}

#[test]
fn loops_honor_break_and_continue() {
    let source = r"
        int sum(int n) {
            int total = 0;
            for (int i = 0; i < n; i++) {
                if (i == 3) continue;
                if (i > 6) break;
                total += i;
            }
            int k = 0;
            while (true) {
                k++;
                if (k >= 2) break;
            }
            return total + k;
        }
    ";
    for flags in [OptimizationFlags::empty(), OptimizationFlags::default()] {
        let module = generate(source, flags);
        assert_eq!(
            run(&module, "sum", &[ConstValue::Int(10)], Primitive::Int),
            Ok(ConstValue::Int(20))
        );
    }
}

#[test]
fn compound_assignment_converts_back() {
    let module = generate(
        "int halve(int x) { x /= 2.0; return x; }",
        OptimizationFlags::empty(),
    );
    assert_eq!(
        run(&module, "halve", &[ConstValue::Int(7)], Primitive::Int),
        Ok(ConstValue::Int(3))
    );
}

#[test]
fn globals_are_initialized_before_use() {
    let module = generate(
        "double gain = 0.5; int counter = 3; double scaled(double x) { return x * gain + counter; }",
        OptimizationFlags::empty(),
    );
    assert_eq!(module.globals.len(), 2);
    assert_eq!(
        run(&module, "scaled", &[ConstValue::double(4.0)], Primitive::Double),
        Ok(ConstValue::double(5.0))
    );
}

#[test]
fn checked_index_faults() {
    let source = "int pick(int i) { span<int, 4> data; data[1] = 7; return data[i]; }";
    let module = generate(source, OptimizationFlags::default());
    assert_eq!(
        run(&module, "pick", &[ConstValue::Int(1)], Primitive::Int),
        Ok(ConstValue::Int(7))
    );
    let fault = run(&module, "pick", &[ConstValue::Int(4)], Primitive::Int).unwrap_err();
    assert_eq!(fault.reason, FaultReason::IndexOutOfBounds);

    let unchecked = generate(source, OptimizationFlags::NO_SAFETY_CHECKS);
    assert!(run(&unchecked, "pick", &[ConstValue::Int(4)], Primitive::Int).is_ok());
}

#[test]
fn integer_division_by_zero_faults() {
    let module = generate("int div(int a, int b) { return a / b; }", OptimizationFlags::default());
    let fault = run(
        &module,
        "div",
        &[ConstValue::Int(1), ConstValue::Int(0)],
        Primitive::Int,
    )
    .unwrap_err();
    assert_eq!(fault.reason, FaultReason::DivisionByZero);
}

#[test]
fn unbounded_recursion_overflows_the_stack() {
    let module = generate("int down(int n) { return down(n + 1); }", OptimizationFlags::default());
    let fault = run(&module, "down", &[ConstValue::Int(0)], Primitive::Int).unwrap_err();
    assert_eq!(fault.reason, FaultReason::StackOverflow);
}

#[test]
fn host_functions_are_called() {
    let module = generate(
        "double clip(double x) { return Math::range(x, -1.0, 1.0); }",
        OptimizationFlags::default(),
    );
    assert_eq!(
        run(&module, "clip", &[ConstValue::double(3.0)], Primitive::Double),
        Ok(ConstValue::double(1.0))
    );
}

#[test]
fn failing_host_function_faults() {
    let mut library = ExternalLibrary::new();
    library.register_function(None, "fail", vec![snex_types::TypeId::INT], snex_types::TypeId::INT, |_| {
        Err("refused".to_owned())
    });
    let module = generate_with(
        "int f(int x) { return fail(x); }",
        OptimizationFlags::default(),
        &library,
        STACK,
    )
    .unwrap();
    let fault = run(&module, "f", &[ConstValue::Int(1)], Primitive::Int).unwrap_err();
    assert_eq!(fault.reason, FaultReason::HostFunction);
    assert!(fault.message.contains("refused"));
}

#[test]
fn oversized_frames_are_rejected() {
    let err = generate_with(
        "int f() { span<double, 64> big; return 0; }",
        OptimizationFlags::empty(),
        &ExternalLibrary::new(),
        128,
    )
    .unwrap_err();
    assert!(matches!(err, CodegenError::FrameTooLarge { limit: 128, .. }));
}

#[test]
fn globals_may_not_reach_the_stack_region() {
    let err = generate_with(
        "span<span<int, 1048576>, 256> big;
         int g2;
         int f(int a, int b, int c, int d, int e) { g2 = 7; return d; }",
        OptimizationFlags::empty(),
        &ExternalLibrary::new(),
        STACK,
    )
    .unwrap_err();
    match err {
        CodegenError::GlobalsTooLarge { global, size, limit } => {
            assert_eq!(global, "big");
            assert!(size > u64::from(limit));
        }
        other => panic!("expected GlobalsTooLarge, got {other:?}"),
    }
}

#[test]
fn globals_are_packed_by_alignment() {
    let module = generate(
        "span<double, 4> a; int b; double c;",
        OptimizationFlags::empty(),
    );
    let addresses: Vec<u32> = module.globals.iter().map(|g| g.address).collect();
    assert_eq!(addresses, vec![16, 48, 56]);
    assert_eq!(module.global_size, 48);
}
