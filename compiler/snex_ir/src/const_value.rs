//! Compile-time constant values.

use std::fmt;

use crate::Primitive;

/// A scalar known at compile time.
///
/// Floating-point payloads are kept as raw bits so the value is `Eq + Hash`
/// (template arguments and constant pools key on it).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConstValue {
    Bool(bool),
    Int(i32),
    Float(u32),
    Double(u64),
}

impl ConstValue {
    #[inline]
    pub fn float(v: f32) -> Self {
        ConstValue::Float(v.to_bits())
    }

    #[inline]
    pub fn double(v: f64) -> Self {
        ConstValue::Double(v.to_bits())
    }

    pub const fn primitive(self) -> Primitive {
        match self {
            ConstValue::Bool(_) => Primitive::Bool,
            ConstValue::Int(_) => Primitive::Int,
            ConstValue::Float(_) => Primitive::Float,
            ConstValue::Double(_) => Primitive::Double,
        }
    }

    /// Zero of the given primitive. `void` has no value.
    pub fn zero(prim: Primitive) -> Option<Self> {
        match prim {
            Primitive::Void => None,
            Primitive::Bool => Some(ConstValue::Bool(false)),
            Primitive::Int => Some(ConstValue::Int(0)),
            Primitive::Float => Some(ConstValue::float(0.0)),
            Primitive::Double => Some(ConstValue::double(0.0)),
        }
    }

    pub fn as_i64(self) -> Option<i64> {
        match self {
            ConstValue::Int(v) => Some(i64::from(v)),
            ConstValue::Bool(b) => Some(i64::from(b)),
            ConstValue::Float(_) | ConstValue::Double(_) => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            ConstValue::Bool(b) => f64::from(u8::from(b)),
            ConstValue::Int(v) => f64::from(v),
            ConstValue::Float(bits) => f64::from(f32::from_bits(bits)),
            ConstValue::Double(bits) => f64::from_bits(bits),
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            ConstValue::Bool(b) => !b,
            ConstValue::Int(v) => v == 0,
            ConstValue::Float(bits) => f32::from_bits(bits) == 0.0,
            ConstValue::Double(bits) => f64::from_bits(bits) == 0.0,
        }
    }

    pub fn is_one(self) -> bool {
        match self {
            ConstValue::Bool(_) => false,
            ConstValue::Int(v) => v == 1,
            ConstValue::Float(bits) => f32::from_bits(bits) == 1.0,
            ConstValue::Double(bits) => f64::from_bits(bits) == 1.0,
        }
    }

    /// Convert to another primitive with the same semantics as a runtime
    /// cast (`as` conversions: float→int truncates and saturates).
    pub fn cast(self, to: Primitive) -> Option<Self> {
        Some(match (self, to) {
            (_, Primitive::Void) => return None,
            (v, p) if v.primitive() == p => v,
            (ConstValue::Bool(b), Primitive::Int) => ConstValue::Int(i32::from(b)),
            (ConstValue::Bool(b), Primitive::Float) => ConstValue::float(f32::from(u8::from(b))),
            (ConstValue::Bool(b), Primitive::Double) => {
                ConstValue::double(f64::from(u8::from(b)))
            }
            (v, Primitive::Bool) => ConstValue::Bool(!v.is_zero()),
            (ConstValue::Int(v), Primitive::Float) => ConstValue::float(v as f32),
            (ConstValue::Int(v), Primitive::Double) => ConstValue::double(f64::from(v)),
            (ConstValue::Float(bits), Primitive::Int) => {
                ConstValue::Int(f32::from_bits(bits) as i32)
            }
            (ConstValue::Float(bits), Primitive::Double) => {
                ConstValue::double(f64::from(f32::from_bits(bits)))
            }
            (ConstValue::Double(bits), Primitive::Int) => {
                ConstValue::Int(f64::from_bits(bits) as i32)
            }
            (ConstValue::Double(bits), Primitive::Float) => {
                ConstValue::float(f64::from_bits(bits) as f32)
            }
            (ConstValue::Int(_) | ConstValue::Float(_) | ConstValue::Double(_), _) => {
                return None
            }
        })
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Float(bits) => write!(f, "{:?}f", f32::from_bits(*bits)),
            ConstValue::Double(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_matches_runtime_conversion() {
        assert_eq!(
            ConstValue::double(2.9).cast(Primitive::Int),
            Some(ConstValue::Int(2))
        );
        assert_eq!(
            ConstValue::double(1e20).cast(Primitive::Int),
            Some(ConstValue::Int(i32::MAX))
        );
        assert_eq!(
            ConstValue::Int(3).cast(Primitive::Float),
            Some(ConstValue::float(3.0))
        );
        assert_eq!(
            ConstValue::Int(0).cast(Primitive::Bool),
            Some(ConstValue::Bool(false))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ConstValue::Int(5).to_string(), "5");
        assert_eq!(ConstValue::float(0.5).to_string(), "0.5f");
        assert_eq!(ConstValue::double(2.0).to_string(), "2.0");
    }
}
