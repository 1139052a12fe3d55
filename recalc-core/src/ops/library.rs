//! Operator Catalog
//!
//! Concrete operations for building equations. Each is a pure
//! parameterization of [`Op`]; none adds engine behavior. Binary
//! arithmetic broadcasts scalars against arrays the way
//! [`Value::zip_with`] does.

use crate::error::EvalError;
use crate::tree::Value;

use super::op::Op;

fn binary(name: &'static str, symbol: &'static str, f: fn(f64, f64) -> f64) -> Op {
    Op::new(name, symbol, 2, move |args| args[0].zip_with(&args[1], f))
}

fn unary(name: &'static str, symbol: &'static str, f: fn(f64) -> f64) -> Op {
    Op::new(name, symbol, 1, move |args| Ok(args[0].map(f)))
}

/// Elementwise addition.
pub fn add() -> Op {
    binary("add", "+", |a, b| a + b)
}

/// Elementwise subtraction.
pub fn subtract() -> Op {
    binary("subtract", "-", |a, b| a - b)
}

/// Elementwise multiplication.
pub fn multiply() -> Op {
    binary("multiply", "*", |a, b| a * b)
}

/// Elementwise division.
pub fn divide() -> Op {
    binary("divide", "/", |a, b| a / b)
}

/// Elementwise exponentiation.
pub fn power() -> Op {
    binary("power", "**", f64::powf)
}

/// Elementwise floored remainder (sign follows the divisor).
pub fn modulo() -> Op {
    binary("mod", "%", |a, b| a - b * (a / b).floor())
}

/// Elementwise negation.
pub fn negate() -> Op {
    unary("negative", "-", |a| -a)
}

/// Elementwise exponential.
pub fn exp() -> Op {
    unary("exp", "exp", f64::exp)
}

/// Elementwise square root.
pub fn sqrt() -> Op {
    unary("sqrt", "sqrt", f64::sqrt)
}

/// Sum of all elements, reducing to a scalar.
pub fn sum() -> Op {
    Op::new("sum", "sum", 1, |args| Ok(Value::Scalar(args[0].sum())))
}

/// Identity passthrough whose may-combine flag is permanently set.
///
/// Applied to a partition-shaped value this forces reduction to a scalar;
/// other values pass through unchanged.
pub fn combine() -> Op {
    Op::new("combine", "combine", 1, |args| Ok(args[0].clone())).combining(true)
}

/// Variadic pack of the arguments into one array.
///
/// Scalar arguments contribute one element each; array arguments are
/// flattened in place.
pub fn array() -> Op {
    Op::new("array", "array", -1, |args| Ok(pack(args)))
}

/// Variadic pack, alias of [`array`] under the name `"list"`.
pub fn list() -> Op {
    Op::new("list", "list", -1, |args| Ok(pack(args)))
}

fn pack(args: &[Value]) -> Value {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Value::Scalar(v) => out.push(*v),
            Value::Array(vs) => out.extend_from_slice(vs),
        }
    }
    Value::Array(out)
}

/// Polynomial evaluation: coefficients (highest order first), then the
/// abscissa, which may be a scalar or an array.
pub fn polyval() -> Op {
    Op::new("polyval", "polyval", 2, |args| {
        let coeffs = match &args[0] {
            Value::Array(cs) => cs.clone(),
            Value::Scalar(c) => vec![*c],
        };
        Ok(args[1].map(|x| horner(&coeffs, x)))
    })
}

fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, c| acc * x + c)
}

/// Scale-preserving "same"-mode convolution.
///
/// Convolves `v1` with `v2`, divides every element by `sum(v2)` so the
/// scale of `v1` is preserved, and forces the result to exactly
/// `len(v1)` elements: longer results are truncated, shorter ones padded
/// with zeros.
pub fn convolve() -> Op {
    Op::new("convolve", "convolve", 2, |args| {
        let v1 = args[0]
            .as_array()
            .ok_or(EvalError::ExpectedArray { op: "convolve" })?;
        let v2 = args[1]
            .as_array()
            .ok_or(EvalError::ExpectedArray { op: "convolve" })?;

        let norm = v2.iter().sum::<f64>();
        if norm == 0.0 {
            return Err(EvalError::ZeroKernel);
        }
        if v1.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }

        let mut out = same_convolve(v1, v2);
        for v in &mut out {
            *v /= norm;
        }
        out.resize(v1.len(), 0.0);
        Ok(Value::Array(out))
    })
}

/// Full convolution restricted to the centered window of length
/// `max(len(v1), len(v2))`.
fn same_convolve(v1: &[f64], v2: &[f64]) -> Vec<f64> {
    let full_len = v1.len() + v2.len() - 1;
    let mut full = vec![0.0; full_len];
    for (i, a) in v1.iter().enumerate() {
        for (j, b) in v2.iter().enumerate() {
            full[i + j] += a * b;
        }
    }

    let out_len = v1.len().max(v2.len());
    let start = (full_len - out_len) / 2;
    full[start..start + out_len].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: f64) -> Value {
        Value::Scalar(v)
    }

    #[test]
    fn arithmetic_on_scalars() {
        assert_eq!(add().apply(&[s(2.0), s(3.0)]).unwrap(), s(5.0));
        assert_eq!(subtract().apply(&[s(2.0), s(3.0)]).unwrap(), s(-1.0));
        assert_eq!(multiply().apply(&[s(2.0), s(3.0)]).unwrap(), s(6.0));
        assert_eq!(divide().apply(&[s(3.0), s(2.0)]).unwrap(), s(1.5));
        assert_eq!(power().apply(&[s(2.0), s(3.0)]).unwrap(), s(8.0));
        assert_eq!(negate().apply(&[s(2.0)]).unwrap(), s(-2.0));
    }

    #[test]
    fn modulo_is_floored() {
        assert_eq!(modulo().apply(&[s(7.0), s(3.0)]).unwrap(), s(1.0));
        assert_eq!(modulo().apply(&[s(-7.0), s(3.0)]).unwrap(), s(2.0));
        assert_eq!(modulo().apply(&[s(7.0), s(-3.0)]).unwrap(), s(-2.0));
    }

    #[test]
    fn sum_reduces_arrays() {
        let v = Value::Array(vec![1.0, 2.0, 3.0]);
        assert_eq!(sum().apply(&[v]).unwrap(), s(6.0));
        assert_eq!(sum().apply(&[s(4.0)]).unwrap(), s(4.0));
    }

    #[test]
    fn array_packs_and_flattens() {
        let packed = array()
            .apply(&[s(1.0), Value::Array(vec![2.0, 3.0]), s(4.0)])
            .unwrap();
        assert_eq!(packed, Value::Array(vec![1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn polyval_highest_order_first() {
        // 2x^2 + 3x + 1 at x = 2 -> 15
        let coeffs = Value::Array(vec![2.0, 3.0, 1.0]);
        assert_eq!(polyval().apply(&[coeffs.clone(), s(2.0)]).unwrap(), s(15.0));

        let xs = Value::Array(vec![0.0, 1.0, 2.0]);
        assert_eq!(
            polyval().apply(&[coeffs, xs]).unwrap(),
            Value::Array(vec![1.0, 6.0, 15.0])
        );
    }

    #[test]
    fn convolve_preserves_scale_and_length() {
        let v1 = Value::Array(vec![1.0, 2.0, 3.0, 4.0]);
        let v2 = Value::Array(vec![1.0, 1.0]);

        let out = convolve().apply(&[v1, v2]).unwrap();
        assert_eq!(out, Value::Array(vec![0.5, 1.5, 2.5, 3.5]));
    }

    #[test]
    fn convolve_truncates_to_first_argument() {
        // A kernel longer than the signal would otherwise widen the result.
        let v1 = Value::Array(vec![1.0, 2.0]);
        let v2 = Value::Array(vec![1.0, 1.0, 1.0, 1.0]);

        let out = convolve().apply(&[v1, v2]).unwrap();
        match out {
            Value::Array(vs) => assert_eq!(vs.len(), 2),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn convolve_rejects_zero_sum_kernel() {
        let v1 = Value::Array(vec![1.0, 2.0]);
        let v2 = Value::Array(vec![1.0, -1.0]);
        assert_eq!(
            convolve().apply(&[v1, v2]).unwrap_err(),
            EvalError::ZeroKernel
        );
    }

    #[test]
    fn convolve_requires_arrays() {
        let err = convolve()
            .apply(&[s(1.0), Value::Array(vec![1.0])])
            .unwrap_err();
        assert_eq!(err, EvalError::ExpectedArray { op: "convolve" });
    }

    #[test]
    fn combine_is_identity_with_flag() {
        let op = combine();
        assert!(op.combines());
        assert_eq!(op.apply(&[s(5.0)]).unwrap(), s(5.0));
    }
}
