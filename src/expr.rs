//! Expression types that make up a tensor program.

use std::any::Any;
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::op_registry::Op;

/// An integer used in shape-like operator attributes (strides, padding,
/// dilation), whose value may not be known until a later stage.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum SymInt {
    /// A value that is known when the program is constructed.
    Fixed(i64),

    /// A value determined later. The symbol provides a name to identify
    /// when different attributes share a value.
    Symbolic(String),
}

impl From<i64> for SymInt {
    fn from(val: i64) -> SymInt {
        SymInt::Fixed(val)
    }
}

impl From<String> for SymInt {
    fn from(name: String) -> SymInt {
        SymInt::Symbolic(name)
    }
}

impl<'a> From<&'a str> for SymInt {
    fn from(name: &'a str) -> SymInt {
        SymInt::Symbolic(name.into())
    }
}

impl fmt::Debug for SymInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(val) => write!(f, "{}", val),
            Self::Symbolic(name) => write!(f, "\"{}\"", name),
        }
    }
}

/// Sequence of [`SymInt`]s forming one attribute of an operator.
///
/// The inline capacity covers before/after padding pairs for operators with
/// up to three spatial dimensions.
pub type SymIntList = SmallVec<[SymInt; 6]>;

/// Element type of a tensor value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Element type that has not been specified and is to be inferred from
    /// the operator's inputs at a later stage.
    #[default]
    Unspecified,
    Float,
    Double,
    Int32,
    Int8,
    UInt8,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Unspecified => "unspecified",
            DataType::Float => "f32",
            DataType::Double => "f64",
            DataType::Int32 => "i32",
            DataType::Int8 => "i8",
            DataType::UInt8 => "u8",
        };
        write!(f, "{}", name)
    }
}

/// Type annotation for a value produced by an expression.
///
/// Call expressions are created with an empty list of these; a later
/// inference stage fills in the output types.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorType {
    pub dtype: DataType,
    /// Expected shape, if known.
    pub shape: Option<Vec<SymInt>>,
}

/// Trait implemented by attribute records attached to operator calls.
///
/// Each operator variant declares its structural parameters as a plain
/// record type implementing this trait. Records are populated once during
/// call construction and sealed into the [`CallExpr`] that owns them;
/// consumers downcast back to the concrete type via [`CallExpr::attrs`].
pub trait Attributes: Any + Debug + Send + Sync {
    /// Return this record as `Any` for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug)]
enum ExprKind {
    Value(ValueExpr),
    Call(CallExpr),
}

/// An expression in a tensor program.
///
/// Expressions are immutable and cheap to clone. Cloning shares the
/// underlying node rather than copying it, so an expression can appear as
/// an operand of many calls.
#[derive(Clone, Debug)]
pub struct Expr {
    kind: Arc<ExprKind>,
}

impl From<ExprKind> for Expr {
    fn from(kind: ExprKind) -> Expr {
        Expr { kind: kind.into() }
    }
}

impl Expr {
    /// Create an expression representing a runtime-computed value (eg.
    /// program inputs).
    pub fn value(name: &str) -> Expr {
        Expr::from(ExprKind::Value(ValueExpr {
            name: name.to_string(),
            dtype: None,
            shape: None,
        }))
    }

    /// Create an expression representing a runtime-computed value, with
    /// element type and shape information.
    pub fn value_with_info(name: &str, dtype: DataType, shape: &[SymInt]) -> Expr {
        Expr::from(ExprKind::Value(ValueExpr {
            name: name.to_string(),
            dtype: Some(dtype),
            shape: Some(shape.to_vec()),
        }))
    }

    /// Create an expression invoking `op` over `args`.
    ///
    /// The call references the resolved operator descriptor, shares the
    /// operand expressions and owns its attribute record. `ty_args` carries
    /// output-type annotations and is empty for newly built calls.
    pub fn call(
        op: Arc<Op>,
        args: Vec<Expr>,
        attrs: Arc<dyn Attributes>,
        ty_args: Vec<TensorType>,
    ) -> Expr {
        Expr::from(ExprKind::Call(CallExpr {
            op,
            args,
            attrs,
            ty_args,
        }))
    }

    /// Return the contained call, if this is a call expression.
    pub fn as_call(&self) -> Option<&CallExpr> {
        match self.kind.as_ref() {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Return the contained value, if this is a value expression.
    pub fn as_value(&self) -> Option<&ValueExpr> {
        match self.kind.as_ref() {
            ExprKind::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Return true if `self` and `other` are the same expression instance,
    /// as opposed to structurally equal copies.
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.kind, &other.kind)
    }
}

/// A named value computed at runtime (eg. a program input).
#[derive(Debug)]
pub struct ValueExpr {
    name: String,
    dtype: Option<DataType>,
    shape: Option<Vec<SymInt>>,
}

impl ValueExpr {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> Option<DataType> {
        self.dtype
    }

    pub fn shape(&self) -> Option<&[SymInt]> {
        self.shape.as_deref()
    }
}

/// An operator invocation.
///
/// A call binds a resolved operator descriptor to concrete operand
/// expressions and a populated attribute record. Calls are immutable once
/// constructed; producing a different call means building a new one.
#[derive(Debug)]
pub struct CallExpr {
    op: Arc<Op>,
    args: Vec<Expr>,
    attrs: Arc<dyn Attributes>,
    ty_args: Vec<TensorType>,
}

impl CallExpr {
    /// Return the descriptor of the invoked operator.
    pub fn op(&self) -> &Op {
        &self.op
    }

    /// Return the operand expressions, in the operator's fixed argument
    /// order.
    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    /// Return the attribute record downcast to the schema type `T`, or
    /// `None` if the record has a different type.
    pub fn attrs<T: Attributes>(&self) -> Option<&T> {
        self.attrs.as_any().downcast_ref()
    }

    /// Return the output-type annotations for this call.
    pub fn ty_args(&self) -> &[TensorType] {
        &self.ty_args
    }
}
