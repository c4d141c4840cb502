//! Host functions and constants injected into compiled code.
//!
//! An [`ExternalLibrary`] pairs the declarations the analyzer resolves
//! calls against with the host implementations the backend calls. Hosts
//! start from [`ExternalLibrary::math`] or an empty library and register
//! their own entries.

use std::fmt;
use std::sync::Arc;

use snex_ir::ConstValue;
use snex_types::{ExternConstant, ExternFunction, ExternId, ExternTable, TypeId};

use crate::Value;

/// Host implementation of an external function.
///
/// Receives one scalar per declared parameter; an `Err` becomes a
/// [`FaultReason::HostFunction`](crate::FaultReason::HostFunction) fault.
pub type HostFn = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ExternalLibrary {
    table: ExternTable,
    /// Indexed by [`ExternId`].
    functions: Vec<HostFn>,
}

impl ExternalLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `namespace::name(params) -> ret` backed by `f`.
    ///
    /// Parameter and return types must be pre-registered ids: primitives
    /// or [`TypeId::DYNAMIC`].
    pub fn register_function(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        params: Vec<TypeId>,
        ret: TypeId,
        f: impl Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    ) -> ExternId {
        let id = self.table.add_function(ExternFunction {
            namespace: namespace.map(str::to_owned),
            name: name.to_owned(),
            params,
            ret,
        });
        self.functions.push(Arc::new(f));
        id
    }

    /// Declare a constant; uses are folded at compile time.
    pub fn register_constant(&mut self, namespace: Option<&str>, name: &str, value: ConstValue) {
        self.table.add_constant(ExternConstant {
            namespace: namespace.map(str::to_owned),
            name: name.to_owned(),
            value,
        });
    }

    pub fn table(&self) -> &ExternTable {
        &self.table
    }

    pub fn host_functions(&self) -> &[HostFn] {
        &self.functions
    }

    /// DSP helpers under the `Math` namespace, all on `double`.
    pub fn math() -> Self {
        let mut lib = ExternalLibrary::new();
        let unary: [(&str, fn(f64) -> f64); 12] = [
            ("sin", f64::sin),
            ("cos", f64::cos),
            ("tan", f64::tan),
            ("tanh", f64::tanh),
            ("abs", f64::abs),
            ("sqrt", f64::sqrt),
            ("exp", f64::exp),
            ("log", f64::ln),
            ("sign", sign),
            ("round", f64::round),
            ("floor", f64::floor),
            ("ceil", f64::ceil),
        ];
        for (name, f) in unary {
            lib.register_function(
                Some("Math"),
                name,
                vec![TypeId::DOUBLE],
                TypeId::DOUBLE,
                move |args| Ok(Value::Double(f(double_arg(args, 0)?))),
            );
        }
        let binary: [(&str, fn(f64, f64) -> f64); 4] = [
            ("pow", f64::powf),
            ("min", f64::min),
            ("max", f64::max),
            ("fmod", |a, b| a % b),
        ];
        for (name, f) in binary {
            lib.register_function(
                Some("Math"),
                name,
                vec![TypeId::DOUBLE, TypeId::DOUBLE],
                TypeId::DOUBLE,
                move |args| Ok(Value::Double(f(double_arg(args, 0)?, double_arg(args, 1)?))),
            );
        }
        lib.register_function(
            Some("Math"),
            "range",
            vec![TypeId::DOUBLE, TypeId::DOUBLE, TypeId::DOUBLE],
            TypeId::DOUBLE,
            |args| {
                let (x, lo, hi) = (double_arg(args, 0)?, double_arg(args, 1)?, double_arg(args, 2)?);
                Ok(Value::Double(x.max(lo).min(hi)))
            },
        );
        lib.register_constant(Some("Math"), "PI", ConstValue::double(std::f64::consts::PI));
        lib.register_constant(Some("Math"), "E", ConstValue::double(std::f64::consts::E));
        lib
    }
}

impl fmt::Debug for ExternalLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalLibrary")
            .field("functions", &self.table.function_count())
            .field("constants", &self.table.constants().count())
            .finish()
    }
}

fn double_arg(args: &[Value], index: usize) -> Result<f64, String> {
    args.get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("argument {} is not a number", index + 1))
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_math_library_declares_namespaced_functions() {
        let lib = ExternalLibrary::math();
        let names: Vec<String> = lib
            .table()
            .functions()
            .map(|(_, f)| f.qualified_name())
            .collect();
        assert!(names.contains(&"Math::sin".to_owned()));
        assert!(names.contains(&"Math::range".to_owned()));
        assert_eq!(lib.host_functions().len(), lib.table().function_count());
    }

    #[test]
    fn test_host_functions_compute() {
        let lib = ExternalLibrary::math();
        let (id, _) = lib
            .table()
            .functions()
            .find(|(_, f)| f.name == "range")
            .unwrap_or_else(|| panic!("range is registered"));
        let range = &lib.host_functions()[id.index()];
        assert_eq!(
            range(&[Value::Double(5.0), Value::Double(0.0), Value::Double(1.0)]),
            Ok(Value::Double(1.0))
        );
        assert!(range(&[Value::Bool(true)]).is_err());
    }
}
