//! tenir builds intermediate representation (IR) nodes for tensor
//! programs.
//!
//! A tensor program is a graph of [`Expr`] nodes: values (program inputs)
//! and calls binding a registered operator to operand expressions and a
//! typed attribute record. This crate provides the construction path for
//! such calls:
//!
//! 1. Register operators in an [`OpRegistry`], or start from
//!    [`OpRegistry::with_conv_ops`] which has the convolution family
//!    pre-registered. Registration happens once, before any programs are
//!    built; afterwards the registry is read-only and can be shared across
//!    threads by reference.
//! 2. Call a factory function from [`ops`] (eg. [`ops::conv2d`]) to build
//!    a call expression. The factory applies variant-specific defaulting,
//!    validates the attributes and resolves the operator by name.
//! 3. Insert the returned expression into a larger program. Type and shape
//!    inference over the finished program is out of scope for this crate.
//!
//! ```
//! use tenir::ops::conv2d;
//! use tenir::{DataType, Expr, OpRegistry, SymInt};
//!
//! # fn main() -> Result<(), tenir::ops::BuildError> {
//! let registry = OpRegistry::with_conv_ops();
//! let x = Expr::value("x");
//! let w = Expr::value("w");
//!
//! let call = conv2d(
//!     &registry,
//!     x,
//!     w,
//!     [SymInt::from(1), SymInt::from(1)].into_iter().collect(),
//!     [SymInt::from(0), SymInt::from(0)].into_iter().collect(),
//!     [SymInt::from(1), SymInt::from(1)].into_iter().collect(),
//!     "NCHW".to_string(),
//!     "OIHW".to_string(),
//!     None, // Output layout defaults to the data layout.
//!     DataType::Unspecified,
//! )?;
//! assert_eq!(call.as_call().unwrap().op().name(), "nn.conv2d");
//! # Ok(()) }
//! ```

mod expr;
mod op_registry;
pub mod ops;

pub use expr::{Attributes, CallExpr, DataType, Expr, SymInt, SymIntList, TensorType, ValueExpr};
pub use op_registry::{Op, OpRegistry, UnknownOperatorError};
