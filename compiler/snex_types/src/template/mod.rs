//! Template instantiation keys and cache.
//!
//! An instance is identified by the template's symbol and the exact list
//! of bound arguments. The cache makes instantiation idempotent: the
//! analyzer checks it before substituting, so a second request for the
//! same key never produces a second type or function.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{FuncId, SymbolId, TypeId, TypeRegistry};

/// A bound template argument.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TemplateArg {
    Type(TypeId),
    Value(i64),
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TemplateKey {
    pub template: SymbolId,
    pub args: SmallVec<[TemplateArg; 4]>,
}

impl TemplateKey {
    pub fn new(template: SymbolId, args: impl IntoIterator<Item = TemplateArg>) -> Self {
        TemplateKey {
            template,
            args: args.into_iter().collect(),
        }
    }

    /// Synthesized name of the instance: `Buffer<float, 4>`.
    pub fn instance_name(&self, base: &str, types: &TypeRegistry) -> String {
        let mut out = String::with_capacity(base.len() + 8);
        out.push_str(base);
        out.push('<');
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match arg {
                TemplateArg::Type(ty) => out.push_str(&types.display(*ty)),
                TemplateArg::Value(v) => {
                    let _ = write!(out, "{v}");
                }
            }
        }
        out.push('>');
        out
    }
}

/// Result of an instantiation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Instance {
    Type(TypeId),
    Function(FuncId),
    /// Instantiation was attempted and failed; repeated requests report
    /// nothing new.
    Failed,
}

#[derive(Clone, Debug, Default)]
pub struct TemplateCache {
    instances: FxHashMap<TemplateKey, Instance>,
    hits: u64,
    misses: u64,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached instance for `key`, counting the hit or miss.
    pub fn lookup(&mut self, key: &TemplateKey) -> Option<Instance> {
        match self.instances.get(key) {
            Some(instance) => {
                self.hits += 1;
                Some(*instance)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Record the instance for `key`. An existing entry is kept and
    /// returned, so the first instance always wins.
    pub fn insert(&mut self, key: TemplateKey, instance: Instance) -> Instance {
        *self.instances.entry(key).or_insert(instance)
    }

    /// Replace a provisional entry, e.g. a function instance reserved
    /// before its body was checked that then failed.
    pub fn update(&mut self, key: &TemplateKey, instance: Instance) {
        if let Some(slot) = self.instances.get_mut(key) {
            *slot = instance;
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TemplateKey, &Instance)> {
        self.instances.iter()
    }
}

#[cfg(test)]
mod tests;
