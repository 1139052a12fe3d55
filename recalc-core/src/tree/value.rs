//! Evaluation Values
//!
//! The engine computes over a small closed value type: a scalar or a
//! one-dimensional array of `f64`. Elementwise application broadcasts a
//! scalar against an array; two arrays must agree in length.

use crate::error::EvalError;

/// A value flowing through an equation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A single number.
    Scalar(f64),

    /// A one-dimensional array of numbers.
    Array(Vec<f64>),
}

impl Value {
    /// The scalar contents, if this value is a scalar.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Array(_) => None,
        }
    }

    /// The array contents, if this value is an array.
    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            Value::Scalar(_) => None,
            Value::Array(vs) => Some(vs),
        }
    }

    /// Number of elements (1 for a scalar).
    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Array(vs) => vs.len(),
        }
    }

    /// True for an empty array.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all elements (identity for a scalar).
    pub fn sum(&self) -> f64 {
        match self {
            Value::Scalar(v) => *v,
            Value::Array(vs) => vs.iter().sum(),
        }
    }

    /// Apply a unary function elementwise.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(v) => Value::Scalar(f(*v)),
            Value::Array(vs) => Value::Array(vs.iter().map(|v| f(*v)).collect()),
        }
    }

    /// Apply a binary function elementwise, broadcasting scalars.
    ///
    /// Two arrays must have the same length; a scalar pairs with every
    /// element of an array.
    pub fn zip_with(&self, other: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, EvalError> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(f(*a, *b))),
            (Value::Array(xs), Value::Scalar(b)) => {
                Ok(Value::Array(xs.iter().map(|a| f(*a, *b)).collect()))
            }
            (Value::Scalar(a), Value::Array(ys)) => {
                Ok(Value::Array(ys.iter().map(|b| f(*a, *b)).collect()))
            }
            (Value::Array(xs), Value::Array(ys)) => {
                if xs.len() != ys.len() {
                    return Err(EvalError::ShapeMismatch {
                        left: xs.len(),
                        right: ys.len(),
                    });
                }
                Ok(Value::Array(
                    xs.iter().zip(ys).map(|(a, b)| f(*a, *b)).collect(),
                ))
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(vs: Vec<f64>) -> Self {
        Value::Array(vs)
    }
}

impl From<&[f64]> for Value {
    fn from(vs: &[f64]) -> Self {
        Value::Array(vs.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_scalar_application() {
        let a = Value::Scalar(2.0);
        let b = Value::Scalar(3.0);
        assert_eq!(a.zip_with(&b, |x, y| x + y).unwrap(), Value::Scalar(5.0));
    }

    #[test]
    fn scalar_broadcasts_over_array() {
        let a = Value::Array(vec![1.0, 2.0, 3.0]);
        let b = Value::Scalar(10.0);

        assert_eq!(
            a.zip_with(&b, |x, y| x * y).unwrap(),
            Value::Array(vec![10.0, 20.0, 30.0])
        );
        assert_eq!(
            b.zip_with(&a, |x, y| x - y).unwrap(),
            Value::Array(vec![9.0, 8.0, 7.0])
        );
    }

    #[test]
    fn arrays_must_agree_in_length() {
        let a = Value::Array(vec![1.0, 2.0]);
        let b = Value::Array(vec![1.0, 2.0, 3.0]);

        let err = a.zip_with(&b, |x, y| x + y).unwrap_err();
        assert_eq!(err, EvalError::ShapeMismatch { left: 2, right: 3 });
    }

    #[test]
    fn sum_over_scalar_and_array() {
        assert_eq!(Value::Scalar(4.0).sum(), 4.0);
        assert_eq!(Value::Array(vec![1.0, 2.0, 3.0]).sum(), 6.0);
    }

    #[test]
    fn map_is_elementwise() {
        let a = Value::Array(vec![1.0, 4.0, 9.0]);
        assert_eq!(a.map(f64::sqrt), Value::Array(vec![1.0, 2.0, 3.0]));
    }
}
