//! One-line expressions over a `double input`.
//!
//! `input * 0.5 + 1.0` becomes
//!
//! ```text
//! double expression(double input) { return (input * 0.5 + 1.0); }
//! ```
//!
//! and goes through the normal pipeline. Diagnostics point into the
//! expression text, not the wrapper.

use std::sync::Arc;

use snex_diagnostic::Diagnostic;
use snex_ir::StringInterner;
use tracing::debug;

use crate::{CompiledObject, InvokeError, JitCompiler, Value};

const PREFIX: &str = "double expression(double input) { return (";
const SUFFIX: &str = "); }";

/// A compiled `double -> double` expression.
#[derive(Debug)]
pub struct JitExpression {
    text: String,
    function: Option<Arc<CompiledObject>>,
    diagnostics: Vec<Diagnostic>,
}

impl JitExpression {
    pub fn new(text: &str, compiler: &JitCompiler) -> Self {
        let mut interner = StringInterner::new();
        let parsed = snex_parse::parse_expression(text, &mut interner);
        if parsed.expr.is_none() || parsed.diagnostics.iter().any(Diagnostic::is_error) {
            return JitExpression {
                text: text.to_owned(),
                function: None,
                diagnostics: parsed.diagnostics,
            };
        }

        let wrapped = format!("{PREFIX}{text}{SUFFIX}");
        let unit = compiler.compile(&wrapped, "expression");
        let shift = PREFIX.len() as u32;
        let diagnostics = unit
            .diagnostics()
            .iter()
            .cloned()
            .map(|mut d| {
                d.shift_spans(shift);
                d
            })
            .collect();
        let function = unit.function("expression");
        debug!(expression = text, valid = function.is_some(), "compiled expression");
        JitExpression {
            text: text.to_owned(),
            function,
            diagnostics,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_valid(&self) -> bool {
        self.function.is_some()
    }

    /// Diagnostics with spans relative to the expression text.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// First error message, if compiling failed.
    pub fn error_message(&self) -> Option<String> {
        self.diagnostics
            .iter()
            .find(|d| d.is_error())
            .map(|d| d.message.clone())
    }

    /// Evaluate at `input`. Fails with [`InvokeError::UnknownFunction`]
    /// when the expression did not compile.
    pub fn eval(&self, input: f64) -> Result<f64, InvokeError> {
        let Some(function) = &self.function else {
            return Err(InvokeError::UnknownFunction("expression".to_owned()));
        };
        function.call(&mut [Value::Double(input)])
    }

    /// [`eval`](Self::eval), or `fallback` on any failure.
    pub fn eval_or(&self, input: f64, fallback: f64) -> f64 {
        self.eval(input).unwrap_or(fallback)
    }
}
