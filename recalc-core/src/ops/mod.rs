//! Operations
//!
//! The typed operation contract ([`Op`]) and a catalog of concrete
//! operators: arithmetic, transcendental, reduction, convolution, packing,
//! polynomial evaluation, and the combining passthrough.
//!
//! Operations are plain function values over an ordered sequence of
//! [`Value`](crate::tree::Value)s. Fixed-arity operations validate their
//! argument count when invoked; variadic operations (negative `nin`)
//! accept whatever the node holds. The engine treats arity as advisory and
//! never checks it itself.

mod library;
mod op;

pub use library::{
    add, array, combine, convolve, divide, exp, list, modulo, multiply, negate, polyval, power,
    sqrt, subtract, sum,
};
pub use op::{Op, OpFn};
