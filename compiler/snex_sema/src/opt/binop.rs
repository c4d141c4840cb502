//! Binary operation simplification.
//!
//! Rewrites, applied bottom-up:
//!
//! | pattern | result | applies to |
//! |---|---|---|
//! | `c op x` (commutative) | `x op c` | all |
//! | `x * 1`, `x / 1` | `x` | all numeric |
//! | `x + 0`, `x - 0`, `x \| 0`, `x ^ 0`, `x << 0`, `x >> 0` | `x` | `int` |
//! | `x * 0` | `0` | `int`, `x` pure and fault free |
//! | `x * 2^k` | `x << k` | `int` |
//! | `x / 2^k` | `x * 2^-k` | `float`, `double` |
//!
//! The floating-point additive identities are left alone: `-0.0 + 0.0`
//! is `+0.0`.

use snex_ir::{BinaryOp, ConstValue};
use snex_types::TypeId;

use super::effects::{can_fault, is_pure};
use crate::ir::visitor::{walk_expr_mut, MutVisitor};
use crate::ir::{IrExpr, IrExprKind, IrModule};

/// Simplify every function of `module`. Returns the number of rewrites.
pub fn run(module: &mut IrModule) -> usize {
    let mut simplifier = Simplifier { changes: 0 };
    for func in &mut module.functions {
        simplifier.visit_block(&mut func.body);
    }
    simplifier.changes
}

struct Simplifier {
    changes: usize,
}

impl MutVisitor for Simplifier {
    fn visit_expr(&mut self, expr: &mut IrExpr) {
        walk_expr_mut(self, expr);
        if canonicalize(expr) {
            self.changes += 1;
        }
        if let Some(rewritten) = simplify(expr) {
            *expr = rewritten;
            self.changes += 1;
        }
    }
}

/// Move a constant left operand of a commutative operator to the right.
fn canonicalize(expr: &mut IrExpr) -> bool {
    match &mut expr.kind {
        IrExprKind::Binary { op, lhs, rhs }
            if op.is_commutative() && lhs.as_const().is_some() && rhs.as_const().is_none() =>
        {
            std::mem::swap(lhs, rhs);
            true
        }
        _ => false,
    }
}

/// One rewrite with a constant right operand, or `None` when no pattern
/// applies.
fn simplify(expr: &mut IrExpr) -> Option<IrExpr> {
    let span = expr.span;
    let ty = expr.ty;
    let IrExprKind::Binary { op, lhs, rhs } = &mut expr.kind else {
        return None;
    };
    let op = *op;
    let constant = rhs.as_const()?;
    let take_lhs = |lhs: &mut Box<IrExpr>| std::mem::replace(&mut **lhs, IrExpr::error(span));

    match (op, constant) {
        (BinaryOp::Mul | BinaryOp::Div, c) if c.is_one() && c.primitive().is_numeric() => {
            Some(take_lhs(lhs))
        }
        (
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr,
            ConstValue::Int(0),
        ) => Some(take_lhs(lhs)),
        (BinaryOp::Mul, ConstValue::Int(0)) if is_pure(lhs) && !can_fault(lhs) => {
            Some(IrExpr::constant(ConstValue::Int(0), span))
        }
        (BinaryOp::Mul, ConstValue::Int(c)) => {
            let shift = power_of_two(c)?;
            let value = take_lhs(lhs);
            Some(IrExpr::new(
                IrExprKind::Binary {
                    op: BinaryOp::Shl,
                    lhs: Box::new(value),
                    rhs: Box::new(IrExpr::constant(ConstValue::Int(shift), span)),
                },
                TypeId::INT,
                span,
            ))
        }
        (BinaryOp::Div, ConstValue::Float(_) | ConstValue::Double(_)) => {
            let reciprocal = exact_reciprocal(constant)?;
            let value = take_lhs(lhs);
            Some(IrExpr::new(
                IrExprKind::Binary {
                    op: BinaryOp::Mul,
                    lhs: Box::new(value),
                    rhs: Box::new(IrExpr::constant(reciprocal, span)),
                },
                ty,
                span,
            ))
        }
        _ => None,
    }
}

/// `k` for `value == 2^k`, `1 <= k <= 30`.
fn power_of_two(value: i32) -> Option<i32> {
    (value > 1 && value.count_ones() == 1).then(|| value.trailing_zeros() as i32)
}

/// `1 / c` when `c` is a power of two whose reciprocal is a normal
/// number, so multiplying rounds exactly like dividing.
fn exact_reciprocal(c: ConstValue) -> Option<ConstValue> {
    match c {
        ConstValue::Float(bits) => {
            let value = f32::from_bits(bits);
            let reciprocal = 1.0 / value;
            (value.is_normal() && bits & 0x007F_FFFF == 0 && reciprocal.is_normal())
                .then(|| ConstValue::float(reciprocal))
        }
        ConstValue::Double(bits) => {
            let value = f64::from_bits(bits);
            let reciprocal = 1.0 / value;
            (value.is_normal() && bits & 0x000F_FFFF_FFFF_FFFF == 0 && reciprocal.is_normal())
                .then(|| ConstValue::double(reciprocal))
        }
        ConstValue::Bool(_) | ConstValue::Int(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_power_of_two() {
        assert_eq!(power_of_two(8), Some(3));
        assert_eq!(power_of_two(1 << 30), Some(30));
        assert_eq!(power_of_two(1), None);
        assert_eq!(power_of_two(6), None);
        assert_eq!(power_of_two(-4), None);
        assert_eq!(power_of_two(i32::MIN), None);
    }

    #[test]
    fn test_exact_reciprocal() {
        assert_eq!(
            exact_reciprocal(ConstValue::double(4.0)),
            Some(ConstValue::double(0.25))
        );
        assert_eq!(
            exact_reciprocal(ConstValue::float(-0.5)),
            Some(ConstValue::float(-2.0))
        );
        assert_eq!(exact_reciprocal(ConstValue::double(3.0)), None);
        assert_eq!(exact_reciprocal(ConstValue::double(0.0)), None);
        assert_eq!(exact_reciprocal(ConstValue::float(f32::MAX)), None);
    }
}
