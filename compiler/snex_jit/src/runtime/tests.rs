#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use snex_ir::{ConstValue, Primitive};

use super::{UnitMemory, GLOBAL_BASE, STACK_BASE};
use crate::FaultReason;

#[test]
fn scalars_round_trip_through_memory() {
    let mut memory = UnitMemory::new(16, 64);
    let mut machine = memory.machine(&[]);
    machine.write_scalar(GLOBAL_BASE, ConstValue::double(0.25)).unwrap();
    machine.write_scalar(GLOBAL_BASE + 8, ConstValue::Bool(true)).unwrap();
    assert_eq!(
        machine.read_scalar(GLOBAL_BASE, Primitive::Double).unwrap(),
        ConstValue::double(0.25)
    );
    assert_eq!(machine.read_u32(GLOBAL_BASE + 8).unwrap(), 1);
}

#[test]
fn null_and_out_of_range_accesses_fault() {
    let mut memory = UnitMemory::new(8, 32);
    let mut machine = memory.machine(&[]);
    let null = machine.read_u32(0).unwrap_err();
    assert_eq!(null.reason, FaultReason::MemoryAccess);
    assert!(machine.write_u32(GLOBAL_BASE + 6, 1).is_err());
    assert!(machine.read_u32(STACK_BASE + 32).is_err());
}

#[test]
fn alloca_respects_the_stack_size() {
    let mut memory = UnitMemory::new(0, 64);
    let mut machine = memory.machine(&[]);
    assert_eq!(machine.alloca(12, 4).unwrap(), STACK_BASE);
    assert_eq!(machine.alloca(8, 8).unwrap(), STACK_BASE + 16);
    let fault = machine.alloca(64, 4).unwrap_err();
    assert_eq!(fault.reason, FaultReason::StackOverflow);
}

#[test]
fn overlapping_copy() {
    let mut memory = UnitMemory::new(0, 16);
    let mut machine = memory.machine(&[]);
    machine.write_bytes(STACK_BASE, &[1, 2, 3, 4]).unwrap();
    machine.copy(STACK_BASE + 2, STACK_BASE, 4).unwrap();
    assert_eq!(machine.read_bytes::<6>(STACK_BASE).unwrap(), [1, 2, 1, 2, 3, 4]);
}

#[test]
fn call_of_unknown_function_faults() {
    let mut memory = UnitMemory::new(0, 16);
    let mut machine = memory.machine(&[]);
    let fault = machine.call(3, STACK_BASE).unwrap_err();
    assert_eq!(fault.reason, FaultReason::InvalidOperation);
}
