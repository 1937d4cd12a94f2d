//! Registry mapping operator names to their descriptors.

use std::any::TypeId;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::expr::Attributes;

/// Descriptor for a registered operator.
///
/// Descriptors are immutable once registered. Call construction only reads
/// them; every call invoking the same operator shares one descriptor.
#[derive(Debug)]
pub struct Op {
    name: String,
    num_inputs: usize,
    attrs_type: TypeId,
    attrs_type_name: &'static str,
}

impl Op {
    /// Return the name the operator was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the number of operands the operator expects.
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// Return true if this operator accepts attribute records of type `T`.
    pub fn accepts_attrs<T: Attributes>(&self) -> bool {
        TypeId::of::<T>() == self.attrs_type
    }

    /// Return the name of the attribute record type the operator accepts.
    pub fn attrs_type_name(&self) -> &'static str {
        self.attrs_type_name
    }
}

/// Error returned when an operator name does not resolve to a registered
/// descriptor.
///
/// This indicates a program-construction bug in the caller, such as a
/// typo'd or not-yet-registered name, and is never retried.
#[derive(Debug, PartialEq, Eq)]
pub struct UnknownOperatorError {
    name: String,
}

impl UnknownOperatorError {
    /// Return the name that failed to resolve.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for UnknownOperatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "no operator registered under the name \"{}\"", self.name)
    }
}

impl Error for UnknownOperatorError {}

/// Table of registered operators.
///
/// New registries have no operators registered. To create a registry with
/// the convolution family pre-registered, use
/// [`OpRegistry::with_conv_ops`]; otherwise register operators selectively
/// with [`OpRegistry::register_op`].
///
/// Registration must complete before call construction starts. Afterwards
/// the registry is only read, so builders on multiple threads can share it
/// by reference without locking.
#[derive(Default)]
pub struct OpRegistry {
    ops: FxHashMap<String, Arc<Op>>,
}

impl OpRegistry {
    /// Create a new empty registry.
    pub fn new() -> OpRegistry {
        OpRegistry {
            ops: FxHashMap::default(),
        }
    }

    /// Register an operator taking `num_inputs` operands and attribute
    /// records of type `A`.
    ///
    /// Registering a name that is already present replaces the previous
    /// descriptor.
    pub fn register_op<A: Attributes>(&mut self, name: &str, num_inputs: usize) {
        let op = Arc::new(Op {
            name: name.to_string(),
            num_inputs,
            attrs_type: TypeId::of::<A>(),
            attrs_type_name: std::any::type_name::<A>(),
        });
        self.ops.insert(name.to_string(), op);
    }

    /// Look up an operator by its registered name.
    ///
    /// Matching is exact and case-sensitive: `"nn.conv2d"` and
    /// `"nn.Conv2D"` are distinct names.
    pub fn resolve(&self, name: &str) -> Result<Arc<Op>, UnknownOperatorError> {
        self.ops
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownOperatorError {
                name: name.to_string(),
            })
    }

    /// Create a registry with the convolution operator family registered.
    pub fn with_conv_ops() -> OpRegistry {
        use crate::ops::conv::{
            Conv1dAttrs, Conv1dTransposeAttrs, Conv2dAttrs, Conv2dTransposeAttrs, Conv3dAttrs,
        };

        let mut reg = OpRegistry::new();
        reg.register_op::<Conv1dAttrs>("nn.conv1d", 2);
        reg.register_op::<Conv2dAttrs>("nn.conv2d", 2);
        reg.register_op::<Conv3dAttrs>("nn.conv3d", 2);
        reg.register_op::<Conv1dTransposeAttrs>("nn.conv1d_transpose", 2);
        reg.register_op::<Conv2dTransposeAttrs>("nn.conv2d_transpose", 2);
        reg
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Arc;

    use crate::expr::Attributes;
    use crate::ops::conv::{Conv2dAttrs, Conv2dTransposeAttrs};

    use super::OpRegistry;

    #[derive(Debug)]
    struct TestAttrs {}

    impl Attributes for TestAttrs {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut reg = OpRegistry::new();
        reg.register_op::<TestAttrs>("test.op", 3);

        let op = reg.resolve("test.op").unwrap();
        assert_eq!(op.name(), "test.op");
        assert_eq!(op.num_inputs(), 3);
        assert!(op.accepts_attrs::<TestAttrs>());
        assert!(!op.accepts_attrs::<Conv2dAttrs>());

        // Repeated lookups share one descriptor.
        let op2 = reg.resolve("test.op").unwrap();
        assert!(Arc::ptr_eq(&op, &op2));
    }

    #[test]
    fn test_resolve_unknown_name() {
        let reg = OpRegistry::with_conv_ops();
        let err = reg.resolve("nonexistent-op").err().unwrap();
        assert_eq!(err.name(), "nonexistent-op");
        assert_eq!(
            err.to_string(),
            "no operator registered under the name \"nonexistent-op\""
        );
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let reg = OpRegistry::with_conv_ops();
        assert!(reg.resolve("nn.conv2d").is_ok());
        assert!(reg.resolve("nn.Conv2D").is_err());
        assert!(reg.resolve("NN.CONV2D").is_err());
    }

    #[test]
    fn test_with_conv_ops() {
        let reg = OpRegistry::with_conv_ops();
        for name in [
            "nn.conv1d",
            "nn.conv2d",
            "nn.conv3d",
            "nn.conv1d_transpose",
            "nn.conv2d_transpose",
        ] {
            let op = reg.resolve(name).unwrap();
            assert_eq!(op.name(), name);
            assert_eq!(op.num_inputs(), 2);
        }
        assert!(reg
            .resolve("nn.conv2d_transpose")
            .unwrap()
            .accepts_attrs::<Conv2dTransposeAttrs>());
    }
}
