//! Builtin tool implementations, one file per concern.

pub mod brainteasers;
pub mod points;
pub mod solutions;
