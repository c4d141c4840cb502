//! Scalar arithmetic with the exact runtime semantics.
//!
//! Shared by constant folding and by the reference code generator so a
//! folded expression always produces the value the compiled code would:
//! `int` is 32-bit wrapping, `float` is `f32`, `double` is `f64`, shift
//! amounts are masked to 5 bits and float-to-int conversion saturates.

use snex_ir::{BinaryOp, ConstValue, Primitive, UnaryOp};
use crate::ir::{IrExpr, IrExprKind, PlaceKind};

#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("operator not defined for these operands")]
    InvalidOperands,
}

/// Apply a binary operator. Operands share a primitive type, except the
/// shift amount which is always `int`. `&&`/`||` are evaluated strictly
/// here; callers short-circuit.
pub fn binary(op: BinaryOp, lhs: ConstValue, rhs: ConstValue) -> Result<ConstValue, EvalError> {
    use ConstValue::{Bool, Double, Float, Int};
    match (lhs, rhs) {
        (Int(a), Int(b)) => int_binary(op, a, b),
        (Float(a), Float(b)) => {
            let (a, b) = (f32::from_bits(a), f32::from_bits(b));
            if let Some(v) = float_op_f32(op, a, b) {
                return Ok(ConstValue::float(v));
            }
            // Comparisons of widened f32 values are exact.
            float_binary(op, f64::from(a), f64::from(b)).map(|r| match r {
                FloatResult::Value(v) => ConstValue::float(v as f32),
                FloatResult::Bool(v) => Bool(v),
            })
        }
        (Double(a), Double(b)) => {
            float_binary(op, f64::from_bits(a), f64::from_bits(b)).map(|r| match r {
                FloatResult::Value(v) => ConstValue::double(v),
                FloatResult::Bool(v) => Bool(v),
            })
        }
        (Bool(a), Bool(b)) => match op {
            BinaryOp::Eq => Ok(Bool(a == b)),
            BinaryOp::NotEq => Ok(Bool(a != b)),
            BinaryOp::And => Ok(Bool(a && b)),
            BinaryOp::Or => Ok(Bool(a || b)),
            _ => Err(EvalError::InvalidOperands),
        },
        _ => Err(EvalError::InvalidOperands),
    }
}

fn int_binary(op: BinaryOp, a: i32, b: i32) -> Result<ConstValue, EvalError> {
    use ConstValue::{Bool, Int};
    Ok(match op {
        BinaryOp::Add => Int(a.wrapping_add(b)),
        BinaryOp::Sub => Int(a.wrapping_sub(b)),
        BinaryOp::Mul => Int(a.wrapping_mul(b)),
        BinaryOp::Div => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Int(a.wrapping_div(b))
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Int(a.wrapping_rem(b))
        }
        BinaryOp::BitAnd => Int(a & b),
        BinaryOp::BitOr => Int(a | b),
        BinaryOp::BitXor => Int(a ^ b),
        BinaryOp::Shl => Int(a.wrapping_shl(b as u32)),
        BinaryOp::Shr => Int(a.wrapping_shr(b as u32)),
        BinaryOp::Eq => Bool(a == b),
        BinaryOp::NotEq => Bool(a != b),
        BinaryOp::Lt => Bool(a < b),
        BinaryOp::LtEq => Bool(a <= b),
        BinaryOp::Gt => Bool(a > b),
        BinaryOp::GtEq => Bool(a >= b),
        BinaryOp::And => Bool(a != 0 && b != 0),
        BinaryOp::Or => Bool(a != 0 || b != 0),
    })
}

enum FloatResult {
    Value(f64),
    Bool(bool),
}

fn float_binary(op: BinaryOp, a: f64, b: f64) -> Result<FloatResult, EvalError> {
    use FloatResult::{Bool, Value};
    Ok(match op {
        BinaryOp::Add => Value(a + b),
        BinaryOp::Sub => Value(a - b),
        BinaryOp::Mul => Value(a * b),
        BinaryOp::Div => Value(a / b),
        BinaryOp::Mod => Value(a % b),
        BinaryOp::Eq => Bool(a == b),
        BinaryOp::NotEq => Bool(a != b),
        BinaryOp::Lt => Bool(a < b),
        BinaryOp::LtEq => Bool(a <= b),
        BinaryOp::Gt => Bool(a > b),
        BinaryOp::GtEq => Bool(a >= b),
        BinaryOp::And
        | BinaryOp::Or
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::Shl
        | BinaryOp::Shr => return Err(EvalError::InvalidOperands),
    })
}

/// Arithmetic performed in single precision, so `float` results are
/// rounded once like the compiled code does.
fn float_op_f32(op: BinaryOp, a: f32, b: f32) -> Option<f32> {
    Some(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => return None,
    })
}

pub fn unary(op: UnaryOp, value: ConstValue) -> Result<ConstValue, EvalError> {
    use ConstValue::{Bool, Double, Float, Int};
    Ok(match (op, value) {
        (UnaryOp::Neg, Int(v)) => Int(v.wrapping_neg()),
        (UnaryOp::Neg, Float(bits)) => ConstValue::float(-f32::from_bits(bits)),
        (UnaryOp::Neg, Double(bits)) => ConstValue::double(-f64::from_bits(bits)),
        (UnaryOp::Not, Bool(b)) => Bool(!b),
        (UnaryOp::BitNot, Int(v)) => Int(!v),
        _ => return Err(EvalError::InvalidOperands),
    })
}

/// Primitive conversion; `None` only for conversions to `void`.
pub fn convert(value: ConstValue, to: Primitive) -> Option<ConstValue> {
    value.cast(to)
}

/// Truth value used by conditions.
pub fn truthy(value: ConstValue) -> bool {
    !value.is_zero()
}

/// Evaluate an IR expression at compile time.
///
/// `lookup` supplies the values of `const` globals and locals. Returns
/// `None` for anything that is not a constant expression or that would
/// fault.
pub fn evaluate(expr: &IrExpr, lookup: &dyn Fn(&PlaceKind) -> Option<ConstValue>) -> Option<ConstValue> {
    match &expr.kind {
        IrExprKind::Const(v) => Some(*v),
        IrExprKind::Load(place) => match place.kind {
            PlaceKind::Global(_) | PlaceKind::Local(_) => lookup(&place.kind),
            _ => None,
        },
        IrExprKind::Unary { op, operand } => unary(*op, evaluate(operand, lookup)?).ok(),
        IrExprKind::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, lookup)?;
            match (op, lhs) {
                (BinaryOp::And, ConstValue::Bool(false)) => return Some(ConstValue::Bool(false)),
                (BinaryOp::Or, ConstValue::Bool(true)) => return Some(ConstValue::Bool(true)),
                _ => {}
            }
            binary(*op, lhs, evaluate(rhs, lookup)?).ok()
        }
        IrExprKind::Convert(inner) => convert(evaluate(inner, lookup)?, expr.ty.as_primitive()?),
        IrExprKind::Select {
            cond,
            then_expr,
            else_expr,
        } => {
            if truthy(evaluate(cond, lookup)?) {
                evaluate(then_expr, lookup)
            } else {
                evaluate(else_expr, lookup)
            }
        }
        _ => None,
    }
}
