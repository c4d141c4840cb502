//! Compilation units and their state machine.

use std::sync::Arc;

use snex_diagnostic::{Diagnostic, ErrorGuaranteed, LocatedDiagnostic, RuntimeEvent};
use snex_ir::ConstValue;
use snex_sema::{IrModule, PassReport, UnitContext};
use snex_types::{ScopeKind, Symbol, TypeKind};
use tracing::debug;

use crate::object::{FunctionClass, UnitArtifacts};
use crate::{marshal, CompiledObject, FromValue, InvokeError, JitError, RuntimeFault, Value};

/// Stage a unit has reached.
///
/// Transitions only move forward, one stage at a time; `Failed` is
/// reachable from every other state and is terminal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnitState {
    Empty,
    Parsed,
    Resolved,
    Optimized,
    CodeGenerated,
    Bound,
    Failed,
}

impl UnitState {
    /// The state after `self` on the success path.
    pub fn next(self) -> Option<UnitState> {
        Some(match self {
            UnitState::Empty => UnitState::Parsed,
            UnitState::Parsed => UnitState::Resolved,
            UnitState::Resolved => UnitState::Optimized,
            UnitState::Optimized => UnitState::CodeGenerated,
            UnitState::CodeGenerated => UnitState::Bound,
            UnitState::Bound | UnitState::Failed => return None,
        })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, UnitState::Bound | UnitState::Failed)
    }
}

/// A global as shown by a debugger view.
#[derive(Clone, Debug, PartialEq)]
pub struct WatchEntry {
    pub name: String,
    /// The fault is kept when the global's memory could not be read.
    pub value: Result<Value, RuntimeFault>,
    pub type_name: String,
    pub type_tag: char,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DebugSymbolKind {
    LocalFunction,
    ApiCall,
    Template,
    Constant,
    BasicType,
}

impl DebugSymbolKind {
    /// Letter shown next to the symbol.
    pub fn letter(self) -> char {
        match self {
            DebugSymbolKind::LocalFunction => 'F',
            DebugSymbolKind::ApiCall => 'A',
            DebugSymbolKind::Template | DebugSymbolKind::BasicType => 'T',
            DebugSymbolKind::Constant => 'C',
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DebugSymbol {
    pub name: String,
    pub kind: DebugSymbolKind,
    /// Signature for functions, value type otherwise.
    pub type_name: String,
}

/// One compile attempt, from source text to `Bound` or `Failed`.
pub struct CompilationUnit {
    name: Arc<str>,
    source: Arc<str>,
    state: UnitState,
    diagnostics: Vec<Diagnostic>,
    located: Vec<LocatedDiagnostic>,
    pub(crate) context: UnitContext,
    pub(crate) ir: Option<IrModule>,
    pub(crate) passes: Vec<PassReport>,
    artifacts: Option<Arc<UnitArtifacts>>,
    functions: FunctionClass,
}

impl CompilationUnit {
    pub(crate) fn new(name: Arc<str>, source: Arc<str>, context: UnitContext) -> Self {
        CompilationUnit {
            name,
            source,
            state: UnitState::Empty,
            diagnostics: Vec::new(),
            located: Vec::new(),
            context,
            ir: None,
            passes: Vec::new(),
            artifacts: None,
            functions: FunctionClass::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn is_bound(&self) -> bool {
        self.state == UnitState::Bound
    }

    pub fn is_failed(&self) -> bool {
        self.state == UnitState::Failed
    }

    /// Every diagnostic of this attempt, sorted by position.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Diagnostics with resolved 1-based line and column.
    pub fn located_diagnostics(&self) -> &[LocatedDiagnostic] {
        &self.located
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    /// Optimized IR, once analysis succeeded.
    pub fn ir(&self) -> Option<&IrModule> {
        self.ir.as_ref()
    }

    /// Human-readable IR listing.
    pub fn ir_dump(&self) -> Option<String> {
        let ir = self.ir.as_ref()?;
        Some(
            ir.display(&self.context.types)
                .with_names(&self.context.interner)
                .with_externs(&self.context.externs)
                .to_string(),
        )
    }

    /// Optimization trace of this attempt.
    pub fn passes(&self) -> &[PassReport] {
        &self.passes
    }

    /// Per-unit arenas: type registry, scope tree and template cache.
    pub fn context(&self) -> &UnitContext {
        &self.context
    }

    /// The compiled functions; `None` unless the unit is bound.
    pub fn functions(&self) -> Option<&FunctionClass> {
        self.is_bound().then_some(&self.functions)
    }

    /// First function named `name` of a bound unit.
    pub fn function(&self, name: &str) -> Option<Arc<CompiledObject>> {
        self.functions()?.get(name).cloned()
    }

    /// Invoke `name` with a typed result.
    pub fn call<R: FromValue>(&self, name: &str, args: &mut [Value]) -> Result<R, InvokeError> {
        match self.functions() {
            Some(functions) => functions.call(name, args),
            None => Err(InvokeError::UnknownFunction(name.to_owned())),
        }
    }

    /// Invalidate every handle of a bound unit. Returns `true` the first
    /// time.
    pub fn release(&mut self) -> Result<bool, JitError> {
        self.expect_state(UnitState::Bound)?;
        let Some(artifacts) = &self.artifacts else {
            return Ok(false);
        };
        let first = artifacts.release();
        if first {
            debug!(unit = %self.name, "unit released");
            if let Some(channel) = artifacts.channel() {
                channel.publish(snex_diagnostic::DebugEvent::Runtime(RuntimeEvent::Released {
                    unit: Arc::clone(&self.name),
                }));
            }
        }
        Ok(first)
    }

    pub fn is_released(&self) -> bool {
        self.artifacts.as_ref().is_some_and(|a| a.is_released())
    }

    /// Current values of the unit's globals, read live from its memory.
    pub fn watch_table(&self) -> Vec<WatchEntry> {
        let Some(artifacts) = self.artifacts.as_ref().filter(|_| self.is_bound()) else {
            return Vec::new();
        };
        let types = &artifacts.types;
        let mut memory = artifacts.memory.lock();
        let mut m = memory.machine(&[]);
        artifacts
            .module
            .globals
            .iter()
            .map(|slot| WatchEntry {
                name: slot.name.clone(),
                value: marshal::read_value(&mut m, types, slot.ty, slot.address),
                type_name: types.display(slot.ty),
                type_tag: types.type_char(slot.ty),
            })
            .collect()
    }

    /// Symbol overview for an autocomplete or debugger view.
    pub fn debug_symbols(&self) -> Vec<DebugSymbol> {
        let ctx = &self.context;
        let types = &ctx.types;
        let mut symbols = Vec::new();

        if let Some(ir) = &self.ir {
            for function in &ir.functions {
                if function.kind == snex_sema::ir::FunctionKind::Init {
                    continue;
                }
                let params: Vec<String> = function.param_types().map(|p| types.display(p)).collect();
                symbols.push(DebugSymbol {
                    name: function.name.clone(),
                    kind: DebugSymbolKind::LocalFunction,
                    type_name: format!("{}({})", types.display(function.ret), params.join(", ")),
                });
            }
        }
        for (_, function) in ctx.externs.functions() {
            let params: Vec<String> = function.params.iter().map(|&p| types.display(p)).collect();
            symbols.push(DebugSymbol {
                name: function.qualified_name(),
                kind: DebugSymbolKind::ApiCall,
                type_name: format!("{}({})", types.display(function.ret), params.join(", ")),
            });
        }
        for (_, data) in ctx.scopes.symbols() {
            let visible = matches!(
                ctx.scopes.kind(data.scope),
                Some(ScopeKind::Global | ScopeKind::Namespace | ScopeKind::Class)
            );
            if !visible {
                continue;
            }
            let mut path: Vec<&str> = ctx
                .scopes
                .qualifiers(data.scope)
                .into_iter()
                .map(|n| ctx.interner.lookup(n))
                .collect();
            path.push(ctx.interner.lookup(data.name));
            let name = path.join("::");
            match &data.symbol {
                Symbol::Template(_) => symbols.push(DebugSymbol {
                    name,
                    kind: DebugSymbolKind::Template,
                    type_name: "template".to_owned(),
                }),
                Symbol::Constant { ty, value } => symbols.push(DebugSymbol {
                    name: format!("{name} = {}", render_constant(*value)),
                    kind: DebugSymbolKind::Constant,
                    type_name: types.display(*ty),
                }),
                Symbol::Type(ty) if matches!(types.kind(*ty), TypeKind::Struct(_)) => {
                    symbols.push(DebugSymbol {
                        name,
                        kind: DebugSymbolKind::BasicType,
                        type_name: types.display(*ty),
                    });
                }
                _ => {}
            }
        }
        for primitive in ["int", "float", "double", "bool", "void"] {
            symbols.push(DebugSymbol {
                name: primitive.to_owned(),
                kind: DebugSymbolKind::BasicType,
                type_name: primitive.to_owned(),
            });
        }
        symbols
    }

    pub(crate) fn expect_state(&self, expected: UnitState) -> Result<(), JitError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(JitError::WrongState {
                state: self.state,
                expected,
            })
        }
    }

    /// Move to `to`; only the next state on the success path or `Failed`
    /// are accepted.
    pub(crate) fn advance(&mut self, to: UnitState) -> Result<(), JitError> {
        let allowed = if to == UnitState::Failed {
            self.state != UnitState::Failed
        } else {
            self.state.next() == Some(to)
        };
        if !allowed {
            return Err(JitError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        debug!(unit = %self.name, from = ?self.state, to = ?to, "unit state");
        self.state = to;
        Ok(())
    }

    /// Record the diagnostics of a stage. Ignored once the unit failed.
    pub(crate) fn record(&mut self, diagnostics: Vec<Diagnostic>, located: Vec<LocatedDiagnostic>) {
        if self.is_failed() {
            return;
        }
        self.diagnostics.extend(diagnostics);
        self.located.extend(located);
    }

    /// Enter `Failed`. Later diagnostics are ignored and no function is
    /// exposed again.
    pub(crate) fn fail(&mut self, guar: ErrorGuaranteed) -> ErrorGuaranteed {
        if self.state != UnitState::Failed {
            self.state = UnitState::Failed;
            self.ir = None;
            self.artifacts = None;
            self.functions = FunctionClass::default();
            debug!(unit = %self.name, errors = self.errors().count(), "unit failed");
        }
        guar
    }

    pub(crate) fn bind(&mut self, artifacts: Arc<UnitArtifacts>) -> Result<(), JitError> {
        let Some(ir) = &self.ir else {
            return Err(JitError::WrongState {
                state: self.state,
                expected: UnitState::CodeGenerated,
            });
        };
        self.functions = FunctionClass::bind(&artifacts, ir);
        self.artifacts = Some(artifacts);
        self.advance(UnitState::Bound)
    }
}

fn render_constant(value: ConstValue) -> String {
    Value::from_const(value).to_string()
}

impl std::fmt::Debug for CompilationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationUnit")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("diagnostics", &self.diagnostics.len())
            .field("functions", &self.functions.len())
            .finish_non_exhaustive()
    }
}
