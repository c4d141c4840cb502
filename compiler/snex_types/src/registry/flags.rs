//! Pre-computed type metadata flags.
//!
//! Computed once when a type is registered so the analyzer can classify
//! operands without matching on [`TypeKind`](super::TypeKind).

use bitflags::bitflags;

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct TypeFlags: u32 {
        // Category
        const IS_VOID = 1 << 0;
        const IS_PRIMITIVE = 1 << 1;
        const IS_STRUCT = 1 << 2;
        const IS_SPAN = 1 << 3;
        const IS_DYN = 1 << 4;
        const IS_REF = 1 << 5;
        const IS_FUNCTION = 1 << 6;
        const IS_DYNAMIC = 1 << 7;

        // Properties
        /// `int`, `float` or `double`.
        const IS_NUMERIC = 1 << 8;
        const IS_FLOATING = 1 << 9;
        /// Fits in a single machine value (non-void primitive or dynamic).
        const IS_SCALAR = 1 << 10;

        // Presence
        /// Is or contains the error sentinel.
        const HAS_ERROR = 1 << 16;
    }
}

impl TypeFlags {
    /// Struct or span: stored inline and passed by copy.
    #[inline]
    pub fn is_aggregate(self) -> bool {
        self.intersects(TypeFlags::IS_STRUCT | TypeFlags::IS_SPAN)
    }

    /// Indexable with `a[i]` and iterable with range-for.
    #[inline]
    pub fn is_sequence(self) -> bool {
        self.intersects(TypeFlags::IS_SPAN | TypeFlags::IS_DYN)
    }
}
