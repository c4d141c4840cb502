//! Namespace and scope handling.
//!
//! Scopes form a tree (global → namespace → class → function → block)
//! stored in a flat vector and navigated through parent links. Symbols are
//! stored in a second flat vector and bound by name in exactly one scope.
//! Everything lives until the owning [`ScopeTree`] is dropped with its
//! compilation unit, so ids handed out stay valid for the unit's lifetime.
//!
//! Lookup walks from the innermost scope outward. At each level a scope's
//! own bindings win, then its `using namespace` imports are searched in
//! declaration order; the same name reached through two different imports
//! at one level is ambiguous.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use snex_ir::{ConstValue, Name, Span};

use crate::{ExternId, FuncId, GlobalId, LocalId, ScopeId, SymbolId, TemplateId, TypeId};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ScopeKind {
    Global,
    Namespace,
    Class,
    Function,
    Block,
}

/// Target of one entry in an overload set.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Callee {
    Func(FuncId),
    Extern(ExternId),
}

/// Where a variable lives at runtime.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Storage {
    Global(GlobalId),
    Local(LocalId),
}

/// What a name is bound to.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Symbol {
    Type(TypeId),
    Variable {
        ty: TypeId,
        storage: Storage,
        is_const: bool,
    },
    /// Compile-time constant: `const` globals with constant initializers,
    /// `int N` template parameters, host constants.
    Constant {
        ty: TypeId,
        value: ConstValue,
    },
    /// Overload set.
    Functions(SmallVec<[Callee; 2]>),
    Namespace(ScopeId),
    Template(TemplateId),
    /// Data member visible unqualified inside methods.
    Field {
        owner: TypeId,
        index: u32,
    },
}

impl Symbol {
    /// Noun used in diagnostics ("`x` is a function").
    pub fn describe(&self) -> &'static str {
        match self {
            Symbol::Type(_) => "type",
            Symbol::Variable { .. } => "variable",
            Symbol::Constant { .. } => "constant",
            Symbol::Functions(_) => "function",
            Symbol::Namespace(_) => "namespace",
            Symbol::Template(_) => "template",
            Symbol::Field { .. } => "member",
        }
    }
}

/// A bound symbol with its declaration site.
#[derive(Clone, Debug)]
pub struct SymbolData {
    pub name: Name,
    pub scope: ScopeId,
    pub span: Span,
    pub symbol: Symbol,
}

/// Name-resolution failure.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ScopeError {
    #[error("name is already defined in this scope")]
    DuplicateName { name: Name, existing: SymbolId },
    #[error("name not found")]
    NotFound { name: Name },
    #[error("name is reachable through more than one imported namespace")]
    Ambiguous {
        name: Name,
        candidates: Vec<SymbolId>,
    },
    #[error("name does not refer to a namespace or struct")]
    NotAScope { name: Name },
    #[error("name does not refer to a type")]
    NotAType { name: Name, found: SymbolId },
}

impl ScopeError {
    pub fn name(&self) -> Name {
        match self {
            ScopeError::DuplicateName { name, .. }
            | ScopeError::NotFound { name }
            | ScopeError::Ambiguous { name, .. }
            | ScopeError::NotAScope { name }
            | ScopeError::NotAType { name, .. } => *name,
        }
    }
}

#[derive(Clone, Debug)]
struct ScopeData {
    parent: Option<ScopeId>,
    kind: ScopeKind,
    name: Option<Name>,
    bindings: FxHashMap<Name, SymbolId>,
    imports: Vec<ScopeId>,
}

/// Arena of all scopes and symbols of one compilation unit.
#[derive(Clone, Debug)]
pub struct ScopeTree {
    scopes: Vec<ScopeData>,
    symbols: Vec<SymbolData>,
    class_scopes: FxHashMap<TypeId, ScopeId>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Tree holding only the global scope.
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![ScopeData {
                parent: None,
                kind: ScopeKind::Global,
                name: None,
                bindings: FxHashMap::default(),
                imports: Vec::new(),
            }],
            symbols: Vec::new(),
            class_scopes: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Create a child scope of `parent`.
    pub fn enter(&mut self, parent: ScopeId, kind: ScopeKind, name: Option<Name>) -> ScopeId {
        let id = ScopeId::from_len(self.scopes.len());
        self.scopes.push(ScopeData {
            parent: Some(parent),
            kind,
            name,
            bindings: FxHashMap::default(),
            imports: Vec::new(),
        });
        id
    }

    /// Open namespace `name` inside `parent`, reusing the scope if the
    /// namespace was opened there before.
    pub fn namespace(
        &mut self,
        parent: ScopeId,
        name: Name,
        span: Span,
    ) -> Result<ScopeId, ScopeError> {
        if let Some(&existing) = self.data(parent).and_then(|d| d.bindings.get(&name)) {
            if let Some(Symbol::Namespace(scope)) = self.symbol(existing).map(|s| &s.symbol) {
                let reopened = self
                    .data(*scope)
                    .is_some_and(|d| d.parent == Some(parent) && d.name == Some(name));
                if reopened {
                    return Ok(*scope);
                }
            }
            return Err(ScopeError::DuplicateName { name, existing });
        }
        let scope = self.enter(parent, ScopeKind::Namespace, Some(name));
        self.declare(parent, name, Symbol::Namespace(scope), span)?;
        Ok(scope)
    }

    /// Bind `name` in `scope`. Names are unique within one scope; shadowing
    /// a binding of an enclosing scope is allowed.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: Name,
        symbol: Symbol,
        span: Span,
    ) -> Result<SymbolId, ScopeError> {
        if let Some(&existing) = self.data(scope).and_then(|d| d.bindings.get(&name)) {
            return Err(ScopeError::DuplicateName { name, existing });
        }
        let id = SymbolId::from_len(self.symbols.len());
        self.symbols.push(SymbolData {
            name,
            scope,
            span,
            symbol,
        });
        if let Some(data) = self.scopes.get_mut(scope.index()) {
            data.bindings.insert(name, id);
        }
        Ok(id)
    }

    /// Add `callee` to the overload set `name` in `scope`, creating it if
    /// needed. A non-function binding of the same name is a duplicate.
    pub fn declare_function(
        &mut self,
        scope: ScopeId,
        name: Name,
        callee: Callee,
        span: Span,
    ) -> Result<SymbolId, ScopeError> {
        if let Some(&existing) = self.data(scope).and_then(|d| d.bindings.get(&name)) {
            return match self.symbols.get_mut(existing.index()).map(|s| &mut s.symbol) {
                Some(Symbol::Functions(set)) => {
                    set.push(callee);
                    Ok(existing)
                }
                _ => Err(ScopeError::DuplicateName { name, existing }),
            };
        }
        let mut set = SmallVec::new();
        set.push(callee);
        self.declare(scope, name, Symbol::Functions(set), span)
    }

    /// Record a `using namespace` directive in `scope`.
    pub fn add_import(&mut self, scope: ScopeId, target: ScopeId) {
        if let Some(data) = self.scopes.get_mut(scope.index()) {
            if !data.imports.contains(&target) && scope != target {
                data.imports.push(target);
            }
        }
    }

    /// Associate a struct type with the class scope holding its members.
    pub fn set_class_scope(&mut self, ty: TypeId, scope: ScopeId) {
        self.class_scopes.insert(ty, scope);
    }

    pub fn class_scope(&self, ty: TypeId) -> Option<ScopeId> {
        self.class_scopes.get(&ty).copied()
    }

    /// Resolve an unqualified name starting at `from`.
    pub fn resolve(&self, name: Name, from: ScopeId) -> Result<SymbolId, ScopeError> {
        let mut current = Some(from);
        while let Some(scope) = current {
            if let Some(found) = self.lookup_in(scope, name)? {
                return Ok(found);
            }
            current = self.parent(scope);
        }
        Err(ScopeError::NotFound { name })
    }

    /// Look `name` up in `scope` only: own bindings, then imports.
    fn lookup_in(&self, scope: ScopeId, name: Name) -> Result<Option<SymbolId>, ScopeError> {
        let Some(data) = self.data(scope) else {
            return Ok(None);
        };
        if let Some(&found) = data.bindings.get(&name) {
            return Ok(Some(found));
        }
        let mut found: SmallVec<[SymbolId; 2]> = SmallVec::new();
        for import in &data.imports {
            if let Some(&sym) = self.data(*import).and_then(|d| d.bindings.get(&name)) {
                if !found.contains(&sym) {
                    found.push(sym);
                }
            }
        }
        match found.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => Err(ScopeError::Ambiguous {
                name,
                candidates: found.into_vec(),
            }),
        }
    }

    /// Resolve a qualified name such as `dsp::Voice::process`.
    ///
    /// The first segment resolves normally; every following segment is
    /// looked up directly in the namespace or class scope named by the
    /// previous one.
    pub fn resolve_path(&self, path: &[Name], from: ScopeId) -> Result<SymbolId, ScopeError> {
        let Some((&first, rest)) = path.split_first() else {
            return Err(ScopeError::NotFound { name: Name::EMPTY });
        };
        let mut current = self.resolve(first, from)?;
        let mut current_name = first;
        for &segment in rest {
            let scope = self
                .scope_of(current)
                .ok_or(ScopeError::NotAScope { name: current_name })?;
            current = self
                .lookup_in(scope, segment)?
                .ok_or(ScopeError::NotFound { name: segment })?;
            current_name = segment;
        }
        Ok(current)
    }

    /// Resolve a name that must denote a type.
    pub fn lookup_type(&self, name: Name, from: ScopeId) -> Result<TypeId, ScopeError> {
        let found = self.resolve(name, from)?;
        match self.symbol(found).map(|s| &s.symbol) {
            Some(Symbol::Type(ty)) => Ok(*ty),
            _ => Err(ScopeError::NotAType { name, found }),
        }
    }

    /// Namespace or class scope a symbol opens, if any.
    pub fn scope_of(&self, symbol: SymbolId) -> Option<ScopeId> {
        match &self.symbol(symbol)?.symbol {
            Symbol::Namespace(scope) => Some(*scope),
            Symbol::Type(ty) => self.class_scope(*ty),
            _ => None,
        }
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&SymbolData> {
        self.symbols.get(id.index())
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &SymbolData)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId::from_len(i), s))
    }

    /// Symbol bound to `name` directly in `scope`, ignoring imports.
    pub fn binding(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        self.data(scope)?.bindings.get(&name).copied()
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.data(scope)?.parent
    }

    pub fn kind(&self, scope: ScopeId) -> Option<ScopeKind> {
        self.data(scope).map(|d| d.kind)
    }

    pub fn name(&self, scope: ScopeId) -> Option<Name> {
        self.data(scope)?.name
    }

    /// Nearest scope of `kind` at or above `from`.
    pub fn enclosing(&self, from: ScopeId, kind: ScopeKind) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(scope) = current {
            if self.kind(scope) == Some(kind) {
                return Some(scope);
            }
            current = self.parent(scope);
        }
        None
    }

    /// Names of the enclosing namespaces and classes, outermost first.
    pub fn qualifiers(&self, scope: ScopeId) -> Vec<Name> {
        let mut names = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(data) = self.data(id) {
                if matches!(data.kind, ScopeKind::Namespace | ScopeKind::Class) {
                    if let Some(name) = data.name {
                        names.push(name);
                    }
                }
                current = data.parent;
            } else {
                break;
            }
        }
        names.reverse();
        names
    }

    fn data(&self, scope: ScopeId) -> Option<&ScopeData> {
        self.scopes.get(scope.index())
    }
}

#[cfg(test)]
mod tests;
