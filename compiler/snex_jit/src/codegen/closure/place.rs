//! Address computation for IR places.

use snex_ir::ConstValue;
use snex_sema::ir::{IrExpr, IrPlace, PlaceKind};
use snex_types::TypeKind;

use super::{addr, AddrFn, Lowerer};
use crate::{CodegenError, FaultReason, RuntimeFault};

impl Lowerer<'_> {
    pub(super) fn lower_place(&self, place: &IrPlace) -> Result<AddrFn, CodegenError> {
        snex_stack::ensure_sufficient_stack(|| self.lower_place_inner(place))
    }

    fn lower_place_inner(&self, place: &IrPlace) -> Result<AddrFn, CodegenError> {
        match &place.kind {
            PlaceKind::Local(id) => {
                let offset = self.local_offset(id.index())?;
                Ok(addr(move |m| Ok(m.fp.wrapping_add(offset))))
            }
            PlaceKind::Global(id) => {
                let address = self
                    .globals
                    .get(id.index())
                    .map(|g| g.address)
                    .ok_or_else(|| self.unsupported(format!("unknown global #{}", id.index())))?;
                Ok(addr(move |_| Ok(address)))
            }
            PlaceKind::Deref(reference) => self.lower_addr(reference),
            PlaceKind::Field { base, offset, .. } => {
                let base = self.lower_place(base)?;
                let offset = *offset;
                Ok(addr(move |m| Ok(base(m)?.wrapping_add(offset))))
            }
            PlaceKind::Index {
                base,
                index,
                checked,
            } => self.lower_index(base, index, *checked),
        }
    }

    pub(super) fn local_offset(&self, index: usize) -> Result<u32, CodegenError> {
        self.frame
            .locals
            .get(index)
            .copied()
            .ok_or_else(|| self.unsupported(format!("unknown local #{index}")))
    }

    fn lower_index(
        &self,
        base: &IrPlace,
        index: &IrExpr,
        checked: bool,
    ) -> Result<AddrFn, CodegenError> {
        let types = self.types();
        let checked = checked && self.request.safety_checks;
        let elem = types
            .element(base.ty)
            .ok_or_else(|| self.unsupported(format!("index into `{}`", types.display(base.ty))))?;
        let stride = types.layout(elem).stride();
        let base_addr = self.lower_place(base)?;
        let index = self.lower_scalar(index)?;
        match types.kind(base.ty) {
            TypeKind::Span { len, .. } => {
                let len = *len;
                Ok(addr(move |m| {
                    let start = base_addr(m)?;
                    let i = index_value(index(m)?)?;
                    if checked {
                        check_bounds(i, len)?;
                    }
                    Ok(element_address(start, i, stride))
                }))
            }
            TypeKind::Dyn { .. } => Ok(addr(move |m| {
                let view = base_addr(m)?;
                let i = index_value(index(m)?)?;
                let data = m.read_u32(view)?;
                if checked {
                    let len = m.read_u32(view.wrapping_add(4))?;
                    check_bounds(i, len)?;
                }
                Ok(element_address(data, i, stride))
            })),
            _ => Err(self.unsupported(format!("index into `{}`", types.display(base.ty)))),
        }
    }
}

fn index_value(value: ConstValue) -> Result<i64, RuntimeFault> {
    value.as_i64().ok_or_else(|| {
        RuntimeFault::new(
            FaultReason::InvalidOperation,
            format!("index of type `{}`", value.primitive().as_str()),
        )
    })
}

fn check_bounds(index: i64, len: u32) -> Result<(), RuntimeFault> {
    if index < 0 || index >= i64::from(len) {
        return Err(RuntimeFault::new(
            FaultReason::IndexOutOfBounds,
            format!("index {index} out of bounds for length {len}"),
        ));
    }
    Ok(())
}

/// Address of element `index`; unrepresentable addresses map to 0, which
/// is never mapped.
fn element_address(start: u32, index: i64, stride: u32) -> u32 {
    let address = i64::from(start) + index * i64::from(stride);
    u32::try_from(address).unwrap_or(0)
}
