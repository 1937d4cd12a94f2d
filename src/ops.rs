//! Constructors for operator call expressions.
//!
//! Each operator variant is exposed as a factory function that validates
//! its attributes, resolves the operator in a registry and returns the
//! finished [`Expr`](crate::Expr). Factories for one operator family share
//! a generic builder parametrized by the attribute schema type; adding a
//! variant means adding a schema and a factory, not touching the builder.

use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::op_registry::UnknownOperatorError;

pub mod conv;

pub use conv::{
    conv1d, conv1d_transpose, conv2d, conv2d_transpose, conv3d, Conv1dAttrs, Conv1dTransposeAttrs,
    Conv2dAttrs, Conv2dTransposeAttrs, Conv3dAttrs,
};

/// Ways in which an attribute record can fail validation at construction
/// time.
#[derive(Debug, PartialEq, Eq)]
pub enum MalformedAttributeError {
    /// A sequence attribute has the wrong number of entries for the
    /// operator's spatial dimension count.
    WrongDimCount {
        /// Name of the attribute.
        attr: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A padding sequence has neither one entry per spatial dimension
    /// (symmetric) nor two (before/after pairs).
    WrongPaddingCount { per_dim: usize, actual: usize },

    /// A layout string is empty, is missing a required axis marker, or
    /// repeats one.
    BadLayout {
        /// Name of the attribute.
        attr: &'static str,
        layout: String,
        /// Description of what is wrong with the layout.
        details: String,
    },
}

impl Display for MalformedAttributeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MalformedAttributeError::WrongDimCount {
                attr,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "\"{}\" must have {} entries, one per spatial dimension, but has {}",
                    attr, expected, actual
                )
            }
            MalformedAttributeError::WrongPaddingCount { per_dim, actual } => {
                write!(
                    f,
                    "\"padding\" must have {} entries (symmetric) or {} (before/after pairs), but has {}",
                    per_dim,
                    per_dim * 2,
                    actual
                )
            }
            MalformedAttributeError::BadLayout {
                attr,
                layout,
                details,
            } => {
                write!(f, "layout \"{}\" in \"{}\" is invalid: {}", layout, attr, details)
            }
        }
    }
}

impl Error for MalformedAttributeError {}

/// Error type for failures when building an operator call.
///
/// Construction is all-or-nothing: on failure no partial call exists, and
/// the same inputs always fail the same way.
#[derive(Debug, PartialEq, Eq)]
pub enum BuildError {
    /// The operator name did not resolve to a registered operator.
    UnknownOperator(UnknownOperatorError),

    /// An attribute record failed validation.
    MalformedAttribute(MalformedAttributeError),
}

impl From<UnknownOperatorError> for BuildError {
    fn from(err: UnknownOperatorError) -> BuildError {
        BuildError::UnknownOperator(err)
    }
}

impl From<MalformedAttributeError> for BuildError {
    fn from(err: MalformedAttributeError) -> BuildError {
        BuildError::MalformedAttribute(err)
    }
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnknownOperator(err) => write!(f, "{}", err),
            BuildError::MalformedAttribute(err) => write!(f, "{}", err),
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BuildError::UnknownOperator(err) => Some(err),
            BuildError::MalformedAttribute(err) => Some(err),
        }
    }
}
