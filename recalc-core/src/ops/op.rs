//! Operation Contract
//!
//! An [`Op`] parameterizes an operator node: a typed function over an
//! ordered sequence of values, plus the metadata (name, symbol, arity)
//! that identifies it. The engine itself never rejects an arity mismatch;
//! the operation validates its argument count at invocation time.

use std::fmt;
use std::sync::Arc;

use crate::error::EvalError;
use crate::tree::Value;

/// The function an operator applies to its argument values.
///
/// Arguments arrive in positional order. Variadic operations receive
/// however many arguments the node holds.
pub type OpFn = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError>>;

/// A concrete operation: function plus identifying metadata.
#[derive(Clone)]
pub struct Op {
    name: String,
    symbol: String,
    /// Expected input count; negative means variadic.
    nin: i32,
    /// Output count. Always 1 in practice.
    nout: u32,
    operation: OpFn,
    /// Default for the owning node's may-combine flag.
    combines: bool,
}

impl Op {
    /// Create an operation with the given arity.
    ///
    /// A negative `nin` marks the operation as variadic: any number of
    /// arguments is accepted and passed through to the function.
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        nin: i32,
        operation: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            nin,
            nout: 1,
            operation: Arc::new(operation),
            combines: false,
        }
    }

    /// Set the default may-combine flag for nodes built from this op.
    pub fn combining(mut self, flag: bool) -> Self {
        self.combines = flag;
        self
    }

    /// The operation's name, e.g. `"add"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The display symbol, e.g. `"+"`.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Expected input count; negative means variadic.
    pub fn nin(&self) -> i32 {
        self.nin
    }

    /// Output count.
    pub fn nout(&self) -> u32 {
        self.nout
    }

    /// True when the operation accepts any number of arguments.
    pub fn is_variadic(&self) -> bool {
        self.nin < 0
    }

    /// Default may-combine flag.
    pub fn combines(&self) -> bool {
        self.combines
    }

    /// Apply the operation to positional argument values.
    ///
    /// Validates the argument count against a non-negative `nin` before
    /// invoking the function.
    pub fn apply(&self, args: &[Value]) -> Result<Value, EvalError> {
        if self.nin >= 0 && args.len() != self.nin as usize {
            return Err(EvalError::Arity {
                name: self.name.clone(),
                expected: self.nin as usize,
                got: args.len(),
            });
        }
        (self.operation)(args)
    }
}

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Op")
            .field("name", &self.name)
            .field("symbol", &self.symbol)
            .field("nin", &self.nin)
            .field("nout", &self.nout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_validates_fixed_arity() {
        let op = Op::new("pair", "pair", 2, |args| {
            Ok(Value::Scalar(args[0].sum() + args[1].sum()))
        });

        let err = op.apply(&[Value::Scalar(1.0)]).unwrap_err();
        assert_eq!(
            err,
            EvalError::Arity {
                name: "pair".to_owned(),
                expected: 2,
                got: 1
            }
        );

        let ok = op.apply(&[Value::Scalar(1.0), Value::Scalar(2.0)]).unwrap();
        assert_eq!(ok, Value::Scalar(3.0));
    }

    #[test]
    fn variadic_accepts_any_count() {
        let op = Op::new("total", "total", -1, |args| {
            Ok(Value::Scalar(args.iter().map(Value::sum).sum()))
        });

        assert!(op.is_variadic());
        assert_eq!(op.apply(&[]).unwrap(), Value::Scalar(0.0));
        assert_eq!(
            op.apply(&[Value::Scalar(1.0), Value::Scalar(2.0), Value::Scalar(3.0)])
                .unwrap(),
            Value::Scalar(6.0)
        );
    }

    #[test]
    fn combining_flag_defaults_off() {
        let op = Op::new("id", "id", 1, |args| Ok(args[0].clone()));
        assert!(!op.combines());
        assert!(op.combining(true).combines());
    }
}
