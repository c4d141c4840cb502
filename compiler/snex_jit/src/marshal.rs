//! Conversion between host [`Value`]s and compiled frames.
//!
//! Scalars are written straight into their parameter slot. Structs and
//! spans are laid out in the slot with the registry's layout. References
//! and `dyn<T>` views point at storage reserved on the unit's stack; after
//! the call every non-scalar argument is read back into the host's value,
//! so mutation through `this`, `T&` or a view is visible to the caller.

use snex_types::{TypeId, TypeKind, TypeRegistry};

use crate::codegen::FrameLayout;
use crate::runtime::Machine;
use crate::{FaultReason, InvokeError, MarshalingError, RuntimeFault, Value};

/// Run function `index` with `args`, copying non-scalar arguments back.
pub(crate) fn invoke(
    m: &mut Machine<'_>,
    types: &TypeRegistry,
    index: usize,
    frame: &FrameLayout,
    params: &[TypeId],
    ret: TypeId,
    args: &mut [Value],
) -> Result<Value, InvokeError> {
    if args.len() != params.len() {
        return Err(MarshalingError::Arity {
            expected: params.len(),
            found: args.len(),
        }
        .into());
    }
    let base = m
        .alloca(frame.size, frame.align)
        .map_err(|_| MarshalingError::StackExhausted {
            index: 0,
            bytes: frame.size,
        })?;
    m.fill_zero(base, frame.size)?;

    let mut write_back = Vec::new();
    for (i, ((arg, &ty), &offset)) in args.iter().zip(params).zip(&frame.params).enumerate() {
        let slot = base.wrapping_add(offset);
        if let Some(back) = write_argument(m, types, i, ty, slot, arg)? {
            write_back.push((i, back));
        }
    }

    m.call(index, base)?;

    for (i, (ty, address)) in write_back {
        args[i] = read_value(m, types, ty, address)?;
    }
    match frame.ret {
        Some(offset) => Ok(read_value(m, types, ret, base.wrapping_add(offset))?),
        None => Ok(Value::Void),
    }
}

/// Store argument `index` into its slot. Returns the type and address to
/// read back after the call for non-scalar arguments.
fn write_argument(
    m: &mut Machine<'_>,
    types: &TypeRegistry,
    index: usize,
    ty: TypeId,
    slot: u32,
    arg: &Value,
) -> Result<Option<(TypeId, u32)>, InvokeError> {
    match types.kind(ty) {
        TypeKind::Primitive(_) => {
            write_value(m, types, index, ty, slot, arg)?;
            Ok(None)
        }
        TypeKind::Struct(_) | TypeKind::Span { .. } => {
            write_value(m, types, index, ty, slot, arg)?;
            Ok(Some((ty, slot)))
        }
        TypeKind::Dyn { .. } => {
            write_view(m, types, index, ty, slot, arg)?;
            Ok(Some((ty, slot)))
        }
        TypeKind::Ref { inner } => {
            let inner = *inner;
            let layout = types.layout(inner);
            let storage = m
                .alloca(layout.size, layout.align)
                .map_err(|_| MarshalingError::StackExhausted {
                    index,
                    bytes: layout.size,
                })?;
            match types.kind(inner) {
                TypeKind::Dyn { .. } => write_view(m, types, index, inner, storage, arg)?,
                _ => write_value(m, types, index, inner, storage, arg)?,
            }
            m.write_u32(slot, storage)?;
            Ok(Some((inner, storage)))
        }
        TypeKind::Dynamic | TypeKind::Error | TypeKind::Function(_) => {
            Err(unsupported(types, index, ty))
        }
    }
}

/// Lay `value` out at `address` as a `ty`.
fn write_value(
    m: &mut Machine<'_>,
    types: &TypeRegistry,
    index: usize,
    ty: TypeId,
    address: u32,
    value: &Value,
) -> Result<(), InvokeError> {
    match types.kind(ty) {
        TypeKind::Primitive(prim) => {
            let constant = value
                .to_const(*prim)
                .ok_or_else(|| mismatch(types, index, ty, value))?;
            m.write_scalar(address, constant)?;
        }
        TypeKind::Struct(def) => {
            let elements = elements_of(types, index, ty, value, Some(def.members.len()))?;
            for (member, element) in def.members.iter().zip(elements) {
                write_value(m, types, index, member.ty, address.wrapping_add(member.offset), element)?;
            }
        }
        TypeKind::Span { elem, len } => {
            let elements = elements_of(types, index, ty, value, Some(*len as usize))?;
            let stride = types.layout(*elem).stride();
            let mut at = address;
            for element in elements {
                write_value(m, types, index, *elem, at, element)?;
                at = at.wrapping_add(stride);
            }
        }
        TypeKind::Dyn { .. }
        | TypeKind::Ref { .. }
        | TypeKind::Dynamic
        | TypeKind::Error
        | TypeKind::Function(_) => return Err(unsupported(types, index, ty)),
    }
    Ok(())
}

/// Copy the elements of `value` to fresh stack storage and write the
/// (pointer, length) view to `slot`.
fn write_view(
    m: &mut Machine<'_>,
    types: &TypeRegistry,
    index: usize,
    ty: TypeId,
    slot: u32,
    value: &Value,
) -> Result<(), InvokeError> {
    let Some(elem) = types.element(ty) else {
        return Err(unsupported(types, index, ty));
    };
    let elements = elements_of(types, index, ty, value, None)?;
    let layout = types.layout(elem);
    let count = u32::try_from(elements.len()).unwrap_or(u32::MAX);
    let bytes = layout.stride().saturating_mul(count);
    let data = m
        .alloca(bytes, layout.align)
        .map_err(|_| MarshalingError::StackExhausted { index, bytes })?;
    let mut at = data;
    for element in elements {
        write_value(m, types, index, elem, at, element)?;
        at = at.wrapping_add(layout.stride());
    }
    m.write_u32(slot, data)?;
    m.write_u32(slot.wrapping_add(4), count)?;
    Ok(())
}

fn elements_of<'v>(
    types: &TypeRegistry,
    index: usize,
    ty: TypeId,
    value: &'v Value,
    expected_len: Option<usize>,
) -> Result<&'v [Value], InvokeError> {
    let elements = value
        .as_aggregate()
        .ok_or_else(|| mismatch(types, index, ty, value))?;
    if let Some(expected_len) = expected_len {
        if elements.len() != expected_len {
            return Err(MarshalingError::Shape {
                index,
                expected: types.display(ty),
                expected_len,
                found_len: elements.len(),
            }
            .into());
        }
    }
    Ok(elements)
}

/// Read a `ty` stored at `address` back into a host value.
pub(crate) fn read_value(
    m: &mut Machine<'_>,
    types: &TypeRegistry,
    ty: TypeId,
    address: u32,
) -> Result<Value, RuntimeFault> {
    snex_stack::ensure_sufficient_stack(|| match types.kind(ty) {
        TypeKind::Primitive(snex_ir::Primitive::Void) => Ok(Value::Void),
        TypeKind::Primitive(prim) => Ok(Value::from_const(m.read_scalar(address, *prim)?)),
        TypeKind::Struct(def) => {
            let mut values = Vec::with_capacity(def.members.len());
            for member in &def.members {
                values.push(read_value(m, types, member.ty, address.wrapping_add(member.offset))?);
            }
            Ok(Value::Aggregate(values))
        }
        TypeKind::Span { elem, len } => read_elements(m, types, *elem, address, *len),
        TypeKind::Dyn { elem } => {
            let data = m.read_u32(address)?;
            let len = m.read_u32(address.wrapping_add(4))?;
            read_elements(m, types, *elem, data, len)
        }
        TypeKind::Ref { inner } => {
            let target = m.read_u32(address)?;
            read_value(m, types, *inner, target)
        }
        TypeKind::Dynamic | TypeKind::Error | TypeKind::Function(_) => Err(RuntimeFault::new(
            FaultReason::InvalidOperation,
            format!("cannot read a `{}` value", types.display(ty)),
        )),
    })
}

fn read_elements(
    m: &mut Machine<'_>,
    types: &TypeRegistry,
    elem: TypeId,
    start: u32,
    len: u32,
) -> Result<Value, RuntimeFault> {
    let stride = types.layout(elem).stride();
    let mut values = Vec::with_capacity(len as usize);
    let mut at = start;
    for _ in 0..len {
        values.push(read_value(m, types, elem, at)?);
        at = at.wrapping_add(stride);
    }
    Ok(Value::Aggregate(values))
}

fn mismatch(types: &TypeRegistry, index: usize, ty: TypeId, value: &Value) -> InvokeError {
    MarshalingError::ArgumentType {
        index,
        expected: types.display(ty),
        found: value.kind_name(),
    }
    .into()
}

fn unsupported(types: &TypeRegistry, index: usize, ty: TypeId) -> InvokeError {
    MarshalingError::Unsupported {
        index,
        ty: types.display(ty),
    }
    .into()
}
