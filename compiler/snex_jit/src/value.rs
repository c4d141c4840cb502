//! Host-side values exchanged with compiled code.

use std::fmt;

use snex_ir::{ConstValue, Primitive};

/// A value passed to or returned from a compiled function.
///
/// Structs and spans are `Aggregate`s of their members or elements in
/// declaration order; a `dyn<T>` argument is an `Aggregate` of any length.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Void,
    Int(i32),
    Float(f32),
    Double(f64),
    Bool(bool),
    Aggregate(Vec<Value>),
}

impl Value {
    /// Name of the value's kind, for marshaling errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Aggregate(_) => "aggregate",
        }
    }

    /// Numeric value widened to `f64`; `None` for non-numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_aggregate(&self) -> Option<&[Value]> {
        match self {
            Value::Aggregate(values) => Some(values),
            _ => None,
        }
    }

    pub(crate) fn from_const(value: ConstValue) -> Self {
        match value {
            ConstValue::Bool(b) => Value::Bool(b),
            ConstValue::Int(v) => Value::Int(v),
            ConstValue::Float(bits) => Value::Float(f32::from_bits(bits)),
            ConstValue::Double(bits) => Value::Double(f64::from_bits(bits)),
        }
    }

    /// Scalar as a constant of exactly `prim`. `int` widens to the
    /// floating types; nothing else converts.
    pub(crate) fn to_const(&self, prim: Primitive) -> Option<ConstValue> {
        Some(match (self, prim) {
            (Value::Int(v), Primitive::Int) => ConstValue::Int(*v),
            (Value::Bool(b), Primitive::Bool) => ConstValue::Bool(*b),
            (Value::Float(v), Primitive::Float) => ConstValue::float(*v),
            (Value::Double(v), Primitive::Double) => ConstValue::double(*v),
            (Value::Int(v), Primitive::Float) => ConstValue::float(*v as f32),
            (Value::Int(v), Primitive::Double) => ConstValue::double(f64::from(*v)),
            _ => return None,
        })
    }

    /// Any scalar as a constant of its own type.
    pub(crate) fn as_const(&self) -> Option<ConstValue> {
        match self {
            Value::Int(v) => Some(ConstValue::Int(*v)),
            Value::Bool(b) => Some(ConstValue::Bool(*b)),
            Value::Float(v) => Some(ConstValue::float(*v)),
            Value::Double(v) => Some(ConstValue::double(*v)),
            Value::Void | Value::Aggregate(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("void"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}f"),
            Value::Double(v) => write!(f, "{v:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Aggregate(values) => {
                f.write_str("{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Conversion from a returned [`Value`] into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

/// Conversion of a Rust argument into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Option<Self> {
        matches!(value, Value::Void).then_some(())
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    /// `float` results widen losslessly.
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Double(v) => Some(v),
            Value::Float(v) => Some(f64::from(v)),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Aggregate(values) => values.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Double(self)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Aggregate(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: IntoValue, const N: usize> IntoValue for [T; N] {
    fn into_value(self) -> Value {
        Value::Aggregate(self.into_iter().map(IntoValue::into_value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_int_widens_to_floating_params() {
        assert_eq!(
            Value::Int(3).to_const(Primitive::Double),
            Some(ConstValue::double(3.0))
        );
        assert_eq!(Value::Int(3).to_const(Primitive::Bool), None);
        assert_eq!(Value::Double(1.0).to_const(Primitive::Float), None);
    }

    #[test]
    fn test_typed_conversions() {
        assert_eq!(i32::from_value(Value::Int(7)), Some(7));
        assert_eq!(f64::from_value(Value::Float(0.5)), Some(0.5));
        assert_eq!(bool::from_value(Value::Int(1)), None);
        assert_eq!(
            Vec::<f32>::from_value([1.0f32, 2.0].into_value()),
            Some(vec![1.0, 2.0])
        );
    }

    #[test]
    fn test_display() {
        let value = Value::Aggregate(vec![Value::Int(1), Value::Float(0.5)]);
        assert_eq!(value.to_string(), "{1, 0.5f}");
    }
}
