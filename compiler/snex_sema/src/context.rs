//! Per-unit compilation state shared by the analyzer and the backend.

use std::sync::Arc;

use snex_ir::StringInterner;
use snex_types::{ExternTable, ScopeTree, TemplateCache, TypeRegistry};

/// Arenas owned by one compilation unit.
///
/// Everything in here lives exactly as long as the unit: ids handed out by
/// the registry, the scope tree and the template cache stay valid until the
/// context is dropped as a whole.
pub struct UnitContext {
    /// Unit name used in diagnostics and runtime events.
    pub name: Arc<str>,
    pub interner: StringInterner,
    pub types: TypeRegistry,
    pub scopes: ScopeTree,
    pub templates: TemplateCache,
    pub externs: Arc<ExternTable>,
}

impl UnitContext {
    pub fn new(name: impl Into<Arc<str>>, externs: Arc<ExternTable>) -> Self {
        UnitContext {
            name: name.into(),
            interner: StringInterner::new(),
            types: TypeRegistry::new(),
            scopes: ScopeTree::new(),
            templates: TemplateCache::new(),
            externs,
        }
    }

    /// Unit without host functions.
    pub fn standalone(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Arc::new(ExternTable::new()))
    }
}

impl std::fmt::Debug for UnitContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitContext")
            .field("name", &self.name)
            .field("types", &self.types.len())
            .field("scopes", &self.scopes.len())
            .field("templates", &self.templates.len())
            .finish_non_exhaustive()
    }
}
