#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Hot-swapping compiled code and compiling in the background.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use snex_jit::{
    CompileWorker, CompilerOptions, ExternalLibrary, FunctionSlot, InvokeError, JitCompiler, Value,
};

const TIMEOUT: Duration = Duration::from_secs(30);

fn compiler() -> JitCompiler {
    JitCompiler::new(CompilerOptions::default(), ExternalLibrary::math())
}

fn gain_source(gain: f64) -> String {
    format!("double process(double x) {{ return x * {gain:?}; }}")
}

#[test]
fn slot_swaps_handles_atomically() {
    let compiler = compiler();
    let first = compiler.compile(&gain_source(2.0), "v1");
    let second = compiler.compile(&gain_source(3.0), "v2");

    let slot = FunctionSlot::new();
    assert!(slot.invoke(&mut [Value::Double(1.0)]).is_none());
    assert!(slot.swap(first.function("process").unwrap()).is_none());
    assert_eq!(slot.invoke(&mut [Value::Double(1.0)]), Some(Ok(Value::Double(2.0))));

    let generation = slot.generation();
    let old = slot.swap(second.function("process").unwrap()).unwrap();
    assert_eq!(old.unit_name(), "v1");
    assert!(slot.generation() > generation);
    assert_eq!(slot.invoke(&mut [Value::Double(1.0)]), Some(Ok(Value::Double(3.0))));
    // The replaced handle stays usable until its unit is released.
    assert_eq!(old.call::<f64>(&mut [Value::Double(1.0)]), Ok(2.0));
}

#[test]
fn readers_only_ever_see_whole_handles() {
    let compiler = compiler();
    let units: Vec<_> = [1.0, 2.0, 3.0, 4.0]
        .iter()
        .map(|&g| compiler.compile(&gain_source(g), "swap"))
        .collect();
    let slot = Arc::new(FunctionSlot::with_object(units[0].function("process").unwrap()));
    let stop = Arc::new(AtomicBool::new(false));

    let reader = {
        let slot = Arc::clone(&slot);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut calls = 0u32;
            while !stop.load(Ordering::Relaxed) {
                let Some(Ok(Value::Double(y))) = slot.invoke(&mut [Value::Double(1.0)]) else {
                    panic!("slot produced no result");
                };
                assert!([1.0, 2.0, 3.0, 4.0].contains(&y), "{y}");
                calls += 1;
            }
            calls
        })
    };
    for round in 0..200 {
        let unit = &units[round % units.len()];
        slot.swap(unit.function("process").unwrap());
    }
    stop.store(true, Ordering::Relaxed);
    assert!(reader.join().unwrap() > 0);
}

#[test]
fn released_unit_invalidates_swapped_out_handle() {
    let compiler = compiler();
    let mut unit = compiler.compile(&gain_source(0.5), "old");
    let slot = FunctionSlot::with_object(unit.function("process").unwrap());
    let replacement = compiler.compile(&gain_source(0.25), "new");
    let old = slot.swap(replacement.function("process").unwrap()).unwrap();

    unit.release().unwrap();
    assert_eq!(old.invoke(&mut [Value::Double(1.0)]), Err(InvokeError::Released));
    assert_eq!(slot.invoke(&mut [Value::Double(4.0)]), Some(Ok(Value::Double(1.0))));
}

#[test]
fn handles_are_shared_across_threads() {
    let unit = compiler().compile("int square(int x) { return x * x; }", "shared");
    let square = unit.function("square").unwrap();
    let workers: Vec<_> = (0..4)
        .map(|t| {
            let square = Arc::clone(&square);
            thread::spawn(move || {
                (0..100).all(|i| {
                    let x = t * 100 + i;
                    square.call::<i32>(&mut [Value::Int(x)]) == Ok(x * x)
                })
            })
        })
        .collect();
    for worker in workers {
        assert!(worker.join().unwrap());
    }
}

#[test]
fn worker_delivers_compiled_units() {
    let worker = CompileWorker::spawn(compiler()).unwrap();
    let ticket = worker.request(&gain_source(2.0), "bg").unwrap();
    let result = worker.wait_result(TIMEOUT).expect("worker result");
    assert_eq!(result.ticket, ticket);
    assert!(result.unit.is_bound());
    assert_eq!(result.unit.call::<f64>("process", &mut [Value::Double(2.0)]), Ok(4.0));

    let ticket = worker.request("double process(double x) { return y; }", "bad").unwrap();
    let result = worker.wait_result(TIMEOUT).expect("worker result");
    assert_eq!(result.ticket, ticket);
    assert!(result.unit.is_failed());
}

#[test]
fn only_the_latest_request_is_delivered() {
    let worker = CompileWorker::spawn(compiler()).unwrap();
    let mut last = 0;
    for g in 1..=20 {
        last = worker.request(&gain_source(f64::from(g)), "burst").unwrap();
    }
    let result = loop {
        let result = worker.wait_result(TIMEOUT).expect("worker result");
        if result.ticket == last {
            break result;
        }
    };
    assert_eq!(result.unit.call::<f64>("process", &mut [Value::Double(1.0)]), Ok(20.0));
    // Everything but the delivered results was dropped somewhere.
    assert!(worker.discarded() >= 1);
    assert!(worker.try_result().is_none());
}

#[test]
fn cancel_drops_pending_work() {
    let worker = CompileWorker::spawn(compiler()).unwrap();
    worker.request(&gain_source(1.0), "cancelled").unwrap();
    worker.cancel();
    assert!(worker.wait_result(Duration::from_millis(200)).is_none());

    let ticket = worker.request(&gain_source(5.0), "after").unwrap();
    let result = worker.wait_result(TIMEOUT).expect("worker result");
    assert_eq!(result.ticket, ticket);
}
