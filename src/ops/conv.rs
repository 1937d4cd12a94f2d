//! Constructors for convolution operator calls.

use std::any::Any;
use std::sync::Arc;

use crate::expr::{Attributes, DataType, Expr, SymIntList};
use crate::op_registry::{OpRegistry, UnknownOperatorError};
use crate::ops::{BuildError, MalformedAttributeError};

/// Structural parameters for a 1-D convolution.
///
/// All fields are stored exactly as supplied at the call site. `padding`
/// has either one entry per spatial dimension (symmetric) or two (before,
/// after); downstream consumers handle both conventions.
#[derive(Clone, Debug, PartialEq)]
pub struct Conv1dAttrs {
    /// Step of the filter along each spatial dimension.
    pub strides: SymIntList,
    /// Implicit zero-padding added around the spatial dimensions.
    pub padding: SymIntList,
    /// Spacing between filter taps along each spatial dimension.
    pub dilation: SymIntList,
    /// Axis order of the input tensor (eg. "NCW").
    pub data_layout: String,
    /// Axis order of the weight tensor (eg. "OIW").
    pub kernel_layout: String,
    /// Axis order of the output tensor.
    pub out_layout: String,
    /// Element type of the output, or [`DataType::Unspecified`] to infer it
    /// from the inputs at a later stage.
    pub out_dtype: DataType,
}

/// Structural parameters for a 2-D convolution.
#[derive(Clone, Debug, PartialEq)]
pub struct Conv2dAttrs {
    pub strides: SymIntList,
    pub padding: SymIntList,
    pub dilation: SymIntList,
    pub data_layout: String,
    pub kernel_layout: String,
    pub out_layout: String,
    pub out_dtype: DataType,
}

/// Structural parameters for a 3-D convolution.
#[derive(Clone, Debug, PartialEq)]
pub struct Conv3dAttrs {
    pub strides: SymIntList,
    pub padding: SymIntList,
    pub dilation: SymIntList,
    pub data_layout: String,
    pub kernel_layout: String,
    pub out_layout: String,
    pub out_dtype: DataType,
}

/// Structural parameters for a transposed 1-D convolution.
///
/// `output_padding` disambiguates the output size when the forward
/// convolution's stride maps several input sizes to one output size.
#[derive(Clone, Debug, PartialEq)]
pub struct Conv1dTransposeAttrs {
    pub strides: SymIntList,
    pub padding: SymIntList,
    pub output_padding: SymIntList,
    pub dilation: SymIntList,
    pub data_layout: String,
    pub kernel_layout: String,
    pub out_layout: String,
    pub out_dtype: DataType,
}

/// Structural parameters for a transposed 2-D convolution.
#[derive(Clone, Debug, PartialEq)]
pub struct Conv2dTransposeAttrs {
    pub strides: SymIntList,
    pub padding: SymIntList,
    pub output_padding: SymIntList,
    pub dilation: SymIntList,
    pub data_layout: String,
    pub kernel_layout: String,
    pub out_layout: String,
    pub out_dtype: DataType,
}

/// Shape of a convolution variant: its spatial dimension count and the
/// axis markers its layout strings must contain.
///
/// Implemented by every convolution attribute record. The generic builders
/// and factories below are parametrized over implementations of this trait,
/// so a new variant only needs a new record and a factory function.
pub trait ConvSchema: Attributes + Sized {
    /// Number of spatial dimensions the operator convolves over.
    const SPATIAL_DIMS: usize;

    /// Axis markers required in `data_layout` and `out_layout`.
    const DATA_AXES: &'static [char];

    /// Axis markers required in `kernel_layout`.
    const KERNEL_AXES: &'static [char];
}

/// Constructor contract for standard convolution attribute records.
pub trait ConvAttributes: ConvSchema {
    fn new(
        strides: SymIntList,
        padding: SymIntList,
        dilation: SymIntList,
        data_layout: String,
        kernel_layout: String,
        out_layout: String,
        out_dtype: DataType,
    ) -> Self;
}

/// Constructor contract for transposed convolution attribute records.
pub trait ConvTransposeAttributes: ConvSchema {
    fn new(
        strides: SymIntList,
        padding: SymIntList,
        output_padding: SymIntList,
        dilation: SymIntList,
        data_layout: String,
        kernel_layout: String,
        out_layout: String,
        out_dtype: DataType,
    ) -> Self;
}

macro_rules! impl_conv_schema {
    ($attrs:ident, $dims:literal, $data_axes:expr, $kernel_axes:expr) => {
        impl Attributes for $attrs {
            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        impl ConvSchema for $attrs {
            const SPATIAL_DIMS: usize = $dims;
            const DATA_AXES: &'static [char] = &$data_axes;
            const KERNEL_AXES: &'static [char] = &$kernel_axes;
        }
    };
}

macro_rules! impl_conv_attrs {
    ($attrs:ident) => {
        impl ConvAttributes for $attrs {
            fn new(
                strides: SymIntList,
                padding: SymIntList,
                dilation: SymIntList,
                data_layout: String,
                kernel_layout: String,
                out_layout: String,
                out_dtype: DataType,
            ) -> Self {
                $attrs {
                    strides,
                    padding,
                    dilation,
                    data_layout,
                    kernel_layout,
                    out_layout,
                    out_dtype,
                }
            }
        }
    };
}

macro_rules! impl_conv_transpose_attrs {
    ($attrs:ident) => {
        impl ConvTransposeAttributes for $attrs {
            fn new(
                strides: SymIntList,
                padding: SymIntList,
                output_padding: SymIntList,
                dilation: SymIntList,
                data_layout: String,
                kernel_layout: String,
                out_layout: String,
                out_dtype: DataType,
            ) -> Self {
                $attrs {
                    strides,
                    padding,
                    output_padding,
                    dilation,
                    data_layout,
                    kernel_layout,
                    out_layout,
                    out_dtype,
                }
            }
        }
    };
}

impl_conv_schema!(Conv1dAttrs, 1, ['N', 'C', 'W'], ['O', 'I', 'W']);
impl_conv_schema!(Conv2dAttrs, 2, ['N', 'C', 'H', 'W'], ['O', 'I', 'H', 'W']);
impl_conv_schema!(Conv3dAttrs, 3, ['N', 'C', 'D', 'H', 'W'], ['O', 'I', 'D', 'H', 'W']);
impl_conv_schema!(Conv1dTransposeAttrs, 1, ['N', 'C', 'W'], ['O', 'I', 'W']);
impl_conv_schema!(Conv2dTransposeAttrs, 2, ['N', 'C', 'H', 'W'], ['O', 'I', 'H', 'W']);

impl_conv_attrs!(Conv1dAttrs);
impl_conv_attrs!(Conv2dAttrs);
impl_conv_attrs!(Conv3dAttrs);

impl_conv_transpose_attrs!(Conv1dTransposeAttrs);
impl_conv_transpose_attrs!(Conv2dTransposeAttrs);

/// Build a call to a standard convolution operator.
///
/// This populates a fresh `T` record with the given attribute values,
/// stored verbatim, resolves `op_name` in `registry` and returns a call
/// over `(data, weight)` with an empty output-type list.
///
/// No validation of the attribute values happens at this layer. The public
/// factories ([`conv2d`] etc.) validate before delegating here; callers
/// using this function directly take on that responsibility.
pub fn make_conv<T: ConvAttributes>(
    registry: &OpRegistry,
    data: Expr,
    weight: Expr,
    strides: SymIntList,
    padding: SymIntList,
    dilation: SymIntList,
    data_layout: String,
    kernel_layout: String,
    out_layout: String,
    out_dtype: DataType,
    op_name: &str,
) -> Result<Expr, UnknownOperatorError> {
    let attrs = T::new(
        strides,
        padding,
        dilation,
        data_layout,
        kernel_layout,
        out_layout,
        out_dtype,
    );
    let op = registry.resolve(op_name)?;
    Ok(Expr::call(op, vec![data, weight], Arc::new(attrs), Vec::new()))
}

/// Build a call to a transposed convolution operator.
///
/// Sibling of [`make_conv`] for schemas that carry an `output_padding`
/// attribute. Behaves identically otherwise.
pub fn make_conv_transpose<T: ConvTransposeAttributes>(
    registry: &OpRegistry,
    data: Expr,
    weight: Expr,
    strides: SymIntList,
    padding: SymIntList,
    output_padding: SymIntList,
    dilation: SymIntList,
    data_layout: String,
    kernel_layout: String,
    out_layout: String,
    out_dtype: DataType,
    op_name: &str,
) -> Result<Expr, UnknownOperatorError> {
    let attrs = T::new(
        strides,
        padding,
        output_padding,
        dilation,
        data_layout,
        kernel_layout,
        out_layout,
        out_dtype,
    );
    let op = registry.resolve(op_name)?;
    Ok(Expr::call(op, vec![data, weight], Arc::new(attrs), Vec::new()))
}

fn check_dim_count(
    attr: &'static str,
    seq: &SymIntList,
    expected: usize,
) -> Result<(), MalformedAttributeError> {
    if seq.len() != expected {
        return Err(MalformedAttributeError::WrongDimCount {
            attr,
            expected,
            actual: seq.len(),
        });
    }
    Ok(())
}

fn check_padding(padding: &SymIntList, per_dim: usize) -> Result<(), MalformedAttributeError> {
    if padding.len() != per_dim && padding.len() != per_dim * 2 {
        return Err(MalformedAttributeError::WrongPaddingCount {
            per_dim,
            actual: padding.len(),
        });
    }
    Ok(())
}

/// Check that `layout` contains each marker in `axes` exactly once and
/// otherwise consists only of tiling sub-axis characters (lowercase letters
/// and digits, as in "NCHW16c").
fn check_layout(
    attr: &'static str,
    layout: &str,
    axes: &[char],
) -> Result<(), MalformedAttributeError> {
    let bad_layout = |details: String| MalformedAttributeError::BadLayout {
        attr,
        layout: layout.to_string(),
        details,
    };

    if layout.is_empty() {
        return Err(bad_layout("layout is empty".to_string()));
    }
    for axis in axes {
        match layout.chars().filter(|ch| ch == axis).count() {
            1 => {}
            0 => return Err(bad_layout(format!("axis \"{}\" is missing", axis))),
            _ => return Err(bad_layout(format!("axis \"{}\" appears more than once", axis))),
        }
    }
    for ch in layout.chars() {
        if !axes.contains(&ch) && !ch.is_ascii_lowercase() && !ch.is_ascii_digit() {
            return Err(bad_layout(format!("unexpected character \"{}\"", ch)));
        }
    }
    Ok(())
}

/// Validate attribute values against the schema's spatial dimension count
/// and required layout axes.
fn validate_attrs<T: ConvSchema>(
    strides: &SymIntList,
    padding: &SymIntList,
    dilation: &SymIntList,
    data_layout: &str,
    kernel_layout: &str,
    out_layout: &str,
) -> Result<(), MalformedAttributeError> {
    check_dim_count("strides", strides, T::SPATIAL_DIMS)?;
    check_dim_count("dilation", dilation, T::SPATIAL_DIMS)?;
    check_padding(padding, T::SPATIAL_DIMS)?;
    check_layout("data_layout", data_layout, T::DATA_AXES)?;
    check_layout("kernel_layout", kernel_layout, T::KERNEL_AXES)?;
    check_layout("out_layout", out_layout, T::DATA_AXES)?;
    Ok(())
}

macro_rules! conv_factory {
    ($(#[$docs:meta])* $name:ident, $attrs:ident, $op_name:literal) => {
        $(#[$docs])*
        pub fn $name(
            registry: &OpRegistry,
            data: Expr,
            weight: Expr,
            strides: SymIntList,
            padding: SymIntList,
            dilation: SymIntList,
            data_layout: String,
            kernel_layout: String,
            out_layout: Option<String>,
            out_dtype: DataType,
        ) -> Result<Expr, BuildError> {
            let out_layout = out_layout.unwrap_or_else(|| data_layout.clone());
            validate_attrs::<$attrs>(
                &strides,
                &padding,
                &dilation,
                &data_layout,
                &kernel_layout,
                &out_layout,
            )?;
            let call = make_conv::<$attrs>(
                registry,
                data,
                weight,
                strides,
                padding,
                dilation,
                data_layout,
                kernel_layout,
                out_layout,
                out_dtype,
                $op_name,
            )?;
            Ok(call)
        }
    };
}

macro_rules! conv_transpose_factory {
    ($(#[$docs:meta])* $name:ident, $attrs:ident, $op_name:literal) => {
        $(#[$docs])*
        pub fn $name(
            registry: &OpRegistry,
            data: Expr,
            weight: Expr,
            strides: SymIntList,
            padding: SymIntList,
            output_padding: SymIntList,
            dilation: SymIntList,
            data_layout: String,
            kernel_layout: String,
            out_layout: Option<String>,
            out_dtype: DataType,
        ) -> Result<Expr, BuildError> {
            let out_layout = out_layout.unwrap_or_else(|| data_layout.clone());
            validate_attrs::<$attrs>(
                &strides,
                &padding,
                &dilation,
                &data_layout,
                &kernel_layout,
                &out_layout,
            )?;
            check_dim_count("output_padding", &output_padding, $attrs::SPATIAL_DIMS)?;
            let call = make_conv_transpose::<$attrs>(
                registry,
                data,
                weight,
                strides,
                padding,
                output_padding,
                dilation,
                data_layout,
                kernel_layout,
                out_layout,
                out_dtype,
                $op_name,
            )?;
            Ok(call)
        }
    };
}

conv_factory!(
    /// Build a call convolving `weight` over `data` in one spatial
    /// dimension.
    ///
    /// See [`conv2d`] for the meaning of the parameters.
    conv1d,
    Conv1dAttrs,
    "nn.conv1d"
);

conv_factory!(
    /// Build a call convolving `weight` over `data` in two spatial
    /// dimensions.
    ///
    /// `strides` and `dilation` have one entry per spatial dimension.
    /// `padding` has either one entry per spatial dimension (symmetric) or
    /// two per dimension (before, after). `out_layout` defaults to
    /// `data_layout` when `None`. `out_dtype` may be
    /// [`DataType::Unspecified`] to leave the output element type to a
    /// later inference stage.
    ///
    /// Fails with [`BuildError::MalformedAttribute`] if an attribute does
    /// not fit the operator's spatial dimension count or required layout
    /// axes, and with [`BuildError::UnknownOperator`] if the operator is
    /// not registered in `registry`.
    conv2d,
    Conv2dAttrs,
    "nn.conv2d"
);

conv_factory!(
    /// Build a call convolving `weight` over `data` in three spatial
    /// dimensions.
    ///
    /// See [`conv2d`] for the meaning of the parameters.
    conv3d,
    Conv3dAttrs,
    "nn.conv3d"
);

conv_transpose_factory!(
    /// Build a call applying a transposed 1-D convolution of `weight` over
    /// `data`.
    ///
    /// See [`conv2d`] for the common parameters. `output_padding` has one
    /// entry per spatial dimension.
    conv1d_transpose,
    Conv1dTransposeAttrs,
    "nn.conv1d_transpose"
);

conv_transpose_factory!(
    /// Build a call applying a transposed 2-D convolution of `weight` over
    /// `data`.
    ///
    /// See [`conv2d`] for the common parameters. `output_padding` has one
    /// entry per spatial dimension.
    conv2d_transpose,
    Conv2dTransposeAttrs,
    "nn.conv2d_transpose"
);
