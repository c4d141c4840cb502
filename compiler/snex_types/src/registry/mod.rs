//! Per-unit type registry.
//!
//! Every type used by a compilation unit lives in one arena owned by the
//! unit's [`TypeRegistry`] and is referenced by [`TypeId`]. Compound types
//! are canonicalized on registration: asking for `span<float, 4>` twice
//! yields the same id, and function signatures are keyed only by their
//! parameter and return types.
//!
//! Structs are registered in two steps so members may refer back to the
//! struct through a reference: [`TypeRegistry::declare_struct`] reserves an
//! id, [`TypeRegistry::define_struct`] fills members and computes the
//! layout with natural alignment.

mod flags;

use rustc_hash::{FxHashMap, FxHashSet};
use snex_ir::{Name, Primitive};

use crate::{ScopeId, ScopeTree, TypeId};

pub use flags::TypeFlags;

/// Size and alignment in bytes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Layout {
    pub size: u32,
    pub align: u32,
}

impl Layout {
    pub const EMPTY: Layout = Layout { size: 0, align: 1 };

    pub const fn new(size: u32, align: u32) -> Self {
        Layout { size, align }
    }

    /// Distance between consecutive elements of an array of this type.
    pub const fn stride(self) -> u32 {
        round_up(self.size, self.align)
    }
}

/// Round `offset` up to the next multiple of `align` (a power of two or 1).
pub const fn round_up(offset: u32, align: u32) -> u32 {
    if align <= 1 {
        return offset;
    }
    let rem = offset % align;
    if rem == 0 {
        offset
    } else {
        offset.saturating_add(align - rem)
    }
}

/// One data member of a struct.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Member {
    pub name: Name,
    pub ty: TypeId,
    pub offset: u32,
}

/// A struct type: qualified name plus ordered members.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StructDef {
    /// Qualified or synthesized name (`dsp::Voice`, `Buffer<float, 4>`).
    pub name: String,
    pub members: Vec<Member>,
    pub layout: Layout,
    /// False between `declare_struct` and `define_struct`.
    pub defined: bool,
}

impl StructDef {
    pub fn member(&self, name: Name) -> Option<(usize, &Member)> {
        self.members.iter().enumerate().find(|(_, m)| m.name == name)
    }
}

/// Function signature; the declared name is not part of the type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Signature {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

/// Kind of a registered type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    Primitive(Primitive),
    Dynamic,
    Error,
    Struct(StructDef),
    /// Fixed-length inline array.
    Span { elem: TypeId, len: u32 },
    /// (pointer, length) view over elements stored elsewhere.
    Dyn { elem: TypeId },
    Ref { inner: TypeId },
    Function(Signature),
}

/// Failure to define a struct.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("struct `{name}` contains itself by value")]
    RecursiveStruct { name: String, member: Name },
    #[error("member of `{name}` has a type that is not defined yet")]
    IncompleteMember { name: String, member: Name },
    #[error("member of `{name}` cannot have type `void`")]
    VoidMember { name: String, member: Name },
    #[error("struct `{name}` is already defined")]
    AlreadyDefined { name: String },
    #[error("type is not a struct")]
    NotAStruct,
}

#[derive(Clone, Debug)]
struct TypeEntry {
    kind: TypeKind,
    flags: TypeFlags,
}

/// Arena of all types of one compilation unit.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    types: Vec<TypeEntry>,
    canonical: FxHashMap<TypeKind, TypeId>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Registry holding only the pre-registered types.
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            types: Vec::with_capacity(32),
            canonical: FxHashMap::default(),
        };
        let fixed = [
            TypeKind::Primitive(Primitive::Void),
            TypeKind::Primitive(Primitive::Int),
            TypeKind::Primitive(Primitive::Float),
            TypeKind::Primitive(Primitive::Double),
            TypeKind::Primitive(Primitive::Bool),
            TypeKind::Dynamic,
            TypeKind::Error,
        ];
        for kind in fixed {
            let id = registry.push(kind.clone());
            registry.canonical.insert(kind, id);
        }
        debug_assert_eq!(registry.types.len(), TypeId::FIRST_COMPOUND as usize);
        registry
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Register a type, returning the existing id for a structurally
    /// identical request.
    ///
    /// Structs passed here must already carry their computed layout; use
    /// [`register_struct`](Self::register_struct) to build one from members.
    pub fn register(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.canonical.get(&kind) {
            return id;
        }
        let id = self.push(kind.clone());
        self.canonical.insert(kind, id);
        tracing::trace!(?id, ty = %self.display(id), "registered type");
        id
    }

    pub fn span_of(&mut self, elem: TypeId, len: u32) -> TypeId {
        self.register(TypeKind::Span { elem, len })
    }

    pub fn dyn_of(&mut self, elem: TypeId) -> TypeId {
        self.register(TypeKind::Dyn { elem })
    }

    /// Reference to `inner`; references to references collapse.
    pub fn ref_of(&mut self, inner: TypeId) -> TypeId {
        if matches!(self.kind(inner), TypeKind::Ref { .. }) {
            return inner;
        }
        self.register(TypeKind::Ref { inner })
    }

    pub fn function(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.register(TypeKind::Function(Signature { params, ret }))
    }

    /// Reserve a nominal struct id whose members are filled in later.
    pub fn declare_struct(&mut self, name: impl Into<String>) -> TypeId {
        self.push(TypeKind::Struct(StructDef {
            name: name.into(),
            members: Vec::new(),
            layout: Layout::EMPTY,
            defined: false,
        }))
    }

    /// Fill in the members of a declared struct and compute its layout.
    pub fn define_struct(
        &mut self,
        id: TypeId,
        members: &[(Name, TypeId)],
    ) -> Result<Layout, RegistryError> {
        let name = match self.kind(id) {
            TypeKind::Struct(def) if def.defined => {
                return Err(RegistryError::AlreadyDefined {
                    name: def.name.clone(),
                })
            }
            TypeKind::Struct(def) => def.name.clone(),
            _ => return Err(RegistryError::NotAStruct),
        };
        let (members, layout) = self.struct_layout(Some(id), &name, members)?;
        let def = StructDef {
            name,
            members,
            layout,
            defined: true,
        };
        let kind = TypeKind::Struct(def);
        let flags = self.compute_flags(&kind);
        self.canonical.entry(kind.clone()).or_insert(id);
        if let Some(entry) = self.types.get_mut(id.index()) {
            entry.kind = kind;
            entry.flags = flags;
        }
        Ok(layout)
    }

    /// Declare and define a struct in one go. An identical struct (same
    /// name, same members) registered earlier is returned instead.
    pub fn register_struct(
        &mut self,
        name: impl Into<String>,
        members: &[(Name, TypeId)],
    ) -> Result<TypeId, RegistryError> {
        let name = name.into();
        let (laid_out, layout) = self.struct_layout(None, &name, members)?;
        let kind = TypeKind::Struct(StructDef {
            name,
            members: laid_out,
            layout,
            defined: true,
        });
        Ok(self.register(kind))
    }

    fn struct_layout(
        &self,
        self_id: Option<TypeId>,
        name: &str,
        members: &[(Name, TypeId)],
    ) -> Result<(Vec<Member>, Layout), RegistryError> {
        let mut offset = 0u32;
        let mut align = 1u32;
        let mut laid_out = Vec::with_capacity(members.len());
        for &(member, ty) in members {
            if ty == TypeId::VOID {
                return Err(RegistryError::VoidMember {
                    name: name.to_owned(),
                    member,
                });
            }
            if self_id.is_some_and(|target| self.contains_by_value(ty, target)) {
                return Err(RegistryError::RecursiveStruct {
                    name: name.to_owned(),
                    member,
                });
            }
            if !self.is_complete(ty) {
                return Err(RegistryError::IncompleteMember {
                    name: name.to_owned(),
                    member,
                });
            }
            let member_layout = self.layout(ty);
            offset = round_up(offset, member_layout.align);
            laid_out.push(Member {
                name: member,
                ty,
                offset,
            });
            offset = offset.saturating_add(member_layout.size);
            align = align.max(member_layout.align);
        }
        Ok((laid_out, Layout::new(round_up(offset, align), align)))
    }

    /// Whether a value of `ty` physically embeds a value of `target`.
    fn contains_by_value(&self, ty: TypeId, target: TypeId) -> bool {
        if ty == target {
            return true;
        }
        match self.kind(ty) {
            TypeKind::Struct(def) => def
                .members
                .iter()
                .any(|m| self.contains_by_value(m.ty, target)),
            TypeKind::Span { elem, .. } => self.contains_by_value(*elem, target),
            _ => false,
        }
    }

    fn push(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId::new(u32::try_from(self.types.len()).unwrap_or(u32::MAX));
        let flags = self.compute_flags(&kind);
        self.types.push(TypeEntry { kind, flags });
        id
    }

    /// Size and alignment of `id`.
    ///
    /// Computed on demand so a span registered before its element struct
    /// was defined still reports the final layout.
    pub fn layout(&self, id: TypeId) -> Layout {
        match self.kind(id) {
            TypeKind::Primitive(p) => Layout::new(p.size(), p.align()),
            TypeKind::Dynamic => Layout::new(8, 8),
            TypeKind::Error => Layout::EMPTY,
            TypeKind::Struct(def) => def.layout,
            TypeKind::Span { elem, len } => {
                let elem = self.layout(*elem);
                Layout::new(elem.stride().saturating_mul(*len), elem.align)
            }
            TypeKind::Dyn { .. } => Layout::new(8, 4),
            TypeKind::Ref { .. } | TypeKind::Function(_) => Layout::new(4, 4),
        }
    }

    fn compute_flags(&self, kind: &TypeKind) -> TypeFlags {
        match kind {
            TypeKind::Primitive(Primitive::Void) => TypeFlags::IS_VOID,
            TypeKind::Primitive(p) => {
                let mut flags = TypeFlags::IS_PRIMITIVE | TypeFlags::IS_SCALAR;
                if p.is_numeric() {
                    flags |= TypeFlags::IS_NUMERIC;
                }
                if p.is_floating() {
                    flags |= TypeFlags::IS_FLOATING;
                }
                flags
            }
            TypeKind::Dynamic => TypeFlags::IS_DYNAMIC | TypeFlags::IS_SCALAR,
            TypeKind::Error => TypeFlags::HAS_ERROR,
            TypeKind::Struct(def) => {
                let mut flags = TypeFlags::IS_STRUCT;
                for m in &def.members {
                    flags |= self.flags(m.ty) & TypeFlags::HAS_ERROR;
                }
                flags
            }
            TypeKind::Span { elem, .. } => {
                TypeFlags::IS_SPAN | (self.flags(*elem) & TypeFlags::HAS_ERROR)
            }
            TypeKind::Dyn { elem } => {
                TypeFlags::IS_DYN | (self.flags(*elem) & TypeFlags::HAS_ERROR)
            }
            TypeKind::Ref { inner } => {
                TypeFlags::IS_REF | (self.flags(*inner) & TypeFlags::HAS_ERROR)
            }
            TypeKind::Function(sig) => {
                let mut flags = TypeFlags::IS_FUNCTION;
                for &p in sig.params.iter().chain(std::iter::once(&sig.ret)) {
                    flags |= self.flags(p) & TypeFlags::HAS_ERROR;
                }
                flags
            }
        }
    }

    /// Kind of `id`. Unknown ids read as the error type.
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        self.types
            .get(id.index())
            .map_or(&TypeKind::Error, |e| &e.kind)
    }

    /// False for structs that are declared but not defined yet, and for
    /// spans of them.
    pub fn is_complete(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Struct(def) => def.defined,
            TypeKind::Span { elem, .. } => self.is_complete(*elem),
            _ => true,
        }
    }

    pub fn flags(&self, id: TypeId) -> TypeFlags {
        self.types
            .get(id.index())
            .map_or(TypeFlags::HAS_ERROR, |e| e.flags)
    }

    pub fn struct_def(&self, id: TypeId) -> Option<&StructDef> {
        match self.kind(id) {
            TypeKind::Struct(def) => Some(def),
            _ => None,
        }
    }

    pub fn signature(&self, id: TypeId) -> Option<&Signature> {
        match self.kind(id) {
            TypeKind::Function(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn as_primitive(&self, id: TypeId) -> Option<Primitive> {
        match self.kind(id) {
            TypeKind::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Referenced type for `T&`, `id` itself otherwise.
    pub fn strip_ref(&self, id: TypeId) -> TypeId {
        match self.kind(id) {
            TypeKind::Ref { inner } => *inner,
            _ => id,
        }
    }

    /// Element type of a span or dyn.
    pub fn element(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Span { elem, .. } | TypeKind::Dyn { elem } => Some(*elem),
            _ => None,
        }
    }

    /// Compile-time length of a span.
    pub fn span_len(&self, id: TypeId) -> Option<u32> {
        match self.kind(id) {
            TypeKind::Span { len, .. } => Some(*len),
            _ => None,
        }
    }

    /// Resolve a type name through the scope tree.
    pub fn lookup_type(&self, scopes: &ScopeTree, name: Name, scope: ScopeId) -> Option<TypeId> {
        scopes.lookup_type(name, scope).ok()
    }

    /// Structural equality: same kind, same name and same member layout,
    /// compared recursively.
    ///
    /// Self-referencing structs are compared coinductively: a pair already
    /// under comparison is assumed equal.
    pub fn structurally_equal(&self, a: TypeId, b: TypeId) -> bool {
        let mut assumed = FxHashSet::default();
        self.equal_in(a, b, &mut assumed)
    }

    fn equal_in(&self, a: TypeId, b: TypeId, assumed: &mut FxHashSet<(TypeId, TypeId)>) -> bool {
        if a == b {
            return true;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if !assumed.insert(key) {
            return true;
        }
        match (self.kind(a), self.kind(b)) {
            (TypeKind::Primitive(x), TypeKind::Primitive(y)) => x == y,
            (TypeKind::Dynamic, TypeKind::Dynamic) | (TypeKind::Error, TypeKind::Error) => true,
            (TypeKind::Struct(x), TypeKind::Struct(y)) => {
                x.defined == y.defined
                    && x.name == y.name
                    && x.members.len() == y.members.len()
                    && x.members.iter().zip(&y.members).all(|(m, n)| {
                        m.name == n.name && m.offset == n.offset && self.equal_in(m.ty, n.ty, assumed)
                    })
            }
            (
                TypeKind::Span { elem: x, len: n },
                TypeKind::Span { elem: y, len: m },
            ) => n == m && self.equal_in(*x, *y, assumed),
            (TypeKind::Dyn { elem: x }, TypeKind::Dyn { elem: y })
            | (TypeKind::Ref { inner: x }, TypeKind::Ref { inner: y }) => {
                self.equal_in(*x, *y, assumed)
            }
            (TypeKind::Function(x), TypeKind::Function(y)) => {
                x.params.len() == y.params.len()
                    && self.equal_in(x.ret, y.ret, assumed)
                    && x
                        .params
                        .iter()
                        .zip(&y.params)
                        .all(|(p, q)| self.equal_in(*p, *q, assumed))
            }
            _ => false,
        }
    }

    /// Render a type for diagnostics: `span<float, 4>`, `Voice`, `int&`.
    pub fn display(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(&mut out, id);
        out
    }

    fn write_type(&self, out: &mut String, id: TypeId) {
        match self.kind(id) {
            TypeKind::Primitive(p) => out.push_str(p.as_str()),
            TypeKind::Dynamic => out.push_str("dynamic"),
            TypeKind::Error => out.push_str("<error>"),
            TypeKind::Struct(def) => out.push_str(&def.name),
            TypeKind::Span { elem, len } => {
                out.push_str("span<");
                self.write_type(out, *elem);
                out.push_str(", ");
                out.push_str(&len.to_string());
                out.push('>');
            }
            TypeKind::Dyn { elem } => {
                out.push_str("dyn<");
                self.write_type(out, *elem);
                out.push('>');
            }
            TypeKind::Ref { inner } => {
                self.write_type(out, *inner);
                out.push('&');
            }
            TypeKind::Function(sig) => {
                self.write_type(out, sig.ret);
                out.push('(');
                for (i, p) in sig.params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(out, *p);
                }
                out.push(')');
            }
        }
    }

    /// One-letter tag used by debug views.
    pub fn type_char(&self, id: TypeId) -> char {
        match self.kind(id) {
            TypeKind::Primitive(p) => p.type_char(),
            TypeKind::Dynamic | TypeKind::Error => '?',
            TypeKind::Struct(_) => 'C',
            TypeKind::Span { .. } | TypeKind::Dyn { .. } => 'S',
            TypeKind::Ref { .. } => 'R',
            TypeKind::Function(_) => 'f',
        }
    }
}

#[cfg(test)]
mod tests;
