//! Host-provided symbols.
//!
//! The host injects capabilities into compiled code only through an
//! [`ExternTable`]: functions it implements and constants folded at compile
//! time. Their types are limited to the pre-registered ids (primitives and
//! `Dynamic`) so the table can be built without a unit's registry.

use snex_ir::ConstValue;

use crate::{ExternId, TypeId};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExternFunction {
    /// Namespace the function is declared in, e.g. `Math`.
    pub namespace: Option<String>,
    pub name: String,
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

impl ExternFunction {
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}::{}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExternConstant {
    pub namespace: Option<String>,
    pub name: String,
    pub value: ConstValue,
}

#[derive(Clone, Debug, Default)]
pub struct ExternTable {
    functions: Vec<ExternFunction>,
    constants: Vec<ExternConstant>,
}

impl ExternTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, function: ExternFunction) -> ExternId {
        let id = ExternId::from_len(self.functions.len());
        self.functions.push(function);
        id
    }

    pub fn add_constant(&mut self, constant: ExternConstant) {
        self.constants.push(constant);
    }

    pub fn function(&self, id: ExternId) -> Option<&ExternFunction> {
        self.functions.get(id.index())
    }

    pub fn functions(&self) -> impl Iterator<Item = (ExternId, &ExternFunction)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (ExternId::from_len(i), f))
    }

    pub fn constants(&self) -> impl Iterator<Item = &ExternConstant> {
        self.constants.iter()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.constants.is_empty()
    }
}
