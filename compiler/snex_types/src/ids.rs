//! Index newtypes for per-unit arenas.

use std::fmt;

use snex_ir::Primitive;

/// Index into a [`TypeRegistry`](crate::TypeRegistry).
///
/// Primitives, `Dynamic` and the error sentinel are pre-registered at fixed
/// indices so they can be named without a registry at hand. Compound types
/// are registered on first use.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    pub const VOID: TypeId = TypeId(0);
    pub const INT: TypeId = TypeId(1);
    pub const FLOAT: TypeId = TypeId(2);
    pub const DOUBLE: TypeId = TypeId(3);
    pub const BOOL: TypeId = TypeId(4);
    /// Accepts any scalar; only used for host function parameters.
    pub const DYNAMIC: TypeId = TypeId(5);
    /// Sentinel given to expressions that failed to check.
    pub const ERROR: TypeId = TypeId(6);

    /// First index for compound types.
    pub const FIRST_COMPOUND: u32 = 7;

    #[inline]
    pub const fn new(index: u32) -> Self {
        TypeId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Pre-registered id of a primitive.
    pub const fn of_primitive(prim: Primitive) -> TypeId {
        match prim {
            Primitive::Void => TypeId::VOID,
            Primitive::Int => TypeId::INT,
            Primitive::Float => TypeId::FLOAT,
            Primitive::Double => TypeId::DOUBLE,
            Primitive::Bool => TypeId::BOOL,
        }
    }

    /// Primitive tag for the fixed ids, `None` for everything else.
    pub const fn as_primitive(self) -> Option<Primitive> {
        match self {
            TypeId::VOID => Some(Primitive::Void),
            TypeId::INT => Some(Primitive::Int),
            TypeId::FLOAT => Some(Primitive::Float),
            TypeId::DOUBLE => Some(Primitive::Double),
            TypeId::BOOL => Some(Primitive::Bool),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }

    #[inline]
    pub const fn is_compound(self) -> bool {
        self.0 >= Self::FIRST_COMPOUND
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::VOID => write!(f, "TypeId::VOID"),
            Self::INT => write!(f, "TypeId::INT"),
            Self::FLOAT => write!(f, "TypeId::FLOAT"),
            Self::DOUBLE => write!(f, "TypeId::DOUBLE"),
            Self::BOOL => write!(f, "TypeId::BOOL"),
            Self::DYNAMIC => write!(f, "TypeId::DYNAMIC"),
            Self::ERROR => write!(f, "TypeId::ERROR"),
            _ => write!(f, "TypeId({})", self.0),
        }
    }
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            pub fn from_len(len: usize) -> Self {
                $name(u32::try_from(len).unwrap_or(u32::MAX))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id!(
    /// Index into a [`ScopeTree`](crate::ScopeTree). The global scope is 0.
    ScopeId
);
define_id!(
    /// Index of a bound symbol in a [`ScopeTree`](crate::ScopeTree).
    SymbolId
);
define_id!(
    /// Index of a function in the unit's function table.
    FuncId
);
define_id!(
    /// Index of a global variable.
    GlobalId
);
define_id!(
    /// Index of a local slot inside one function.
    LocalId
);
define_id!(
    /// Index of a host function in an [`ExternTable`](crate::ExternTable).
    ExternId
);
define_id!(
    /// Index of a template declaration held by the analyzer.
    TemplateId
);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
}
