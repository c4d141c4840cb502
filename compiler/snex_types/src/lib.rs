//! SNEX types - per-unit type registry, scope tree and template keys.
//!
//! Each compilation unit owns one [`TypeRegistry`], one [`ScopeTree`] and
//! one [`TemplateCache`]. They are arenas indexed by the id newtypes in
//! this crate; nothing is shared between units, so independent units can
//! be compiled in parallel without locks and a unit is torn down by
//! dropping it.

mod externs;
mod ids;
pub mod registry;
pub mod scope;
pub mod template;

pub use externs::{ExternConstant, ExternFunction, ExternTable};
pub use ids::{ExternId, FuncId, GlobalId, LocalId, ScopeId, SymbolId, TemplateId, TypeId};
pub use registry::{
    round_up, Layout, Member, RegistryError, Signature, StructDef, TypeFlags, TypeKind,
    TypeRegistry,
};
pub use scope::{Callee, ScopeError, ScopeKind, ScopeTree, Storage, Symbol, SymbolData};
pub use template::{Instance, TemplateArg, TemplateCache, TemplateKey};
