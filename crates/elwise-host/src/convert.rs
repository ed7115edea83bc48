use crate::value::HostValue;
use elwise_core_tensor::{DType, Result, ShapeBuf, Tensor, TensorError, TensorView};
use log::{debug, trace};
use std::borrow::Cow;

/// An argument after conversion, ready to be viewed.
///
/// `Borrowed` points straight into a caller-owned array. `Coerced` is a
/// temporary built from a host sequence; it belongs to the call and is
/// dropped when the argument goes out of scope. `Opaque` describes an
/// object-kind sequence that has no numeric representation.
#[derive(Debug)]
pub enum ArrayArg<'a> {
    Borrowed(TensorView<'a>),
    Coerced(Tensor),
    Opaque { shape: ShapeBuf, dtype: DType },
}

impl ArrayArg<'_> {
    pub fn view(&self) -> TensorView<'_> {
        match self {
            ArrayArg::Borrowed(v) => v.clone(),
            ArrayArg::Coerced(t) => t.view(),
            ArrayArg::Opaque { shape, dtype } => TensorView::opaque(Cow::Borrowed(&shape[..]), *dtype),
        }
    }
}

/// Attempts to view a host value as a contiguous array.
///
/// Scalars, strings and `None` are not arrays and fail with
/// `ConversionFailure`, as do ragged sequences.
pub fn as_array(value: &HostValue) -> Result<ArrayArg<'_>> {
    match value {
        HostValue::Array(t) => {
            trace!("as_array: borrowing {} {:?}", t.dtype(), t.shape());
            Ok(ArrayArg::Borrowed(t.view()))
        }
        HostValue::List(_) => coerce_list(value),
        other => Err(TensorError::conversion(format!(
            "expected an array, got {} ({})",
            other.type_name(),
            other
        ))),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LeafKind {
    Empty,
    Int,
    Float,
    Bool,
    Str,
    Object,
}

impl LeafKind {
    fn of(value: &HostValue) -> Self {
        match value {
            HostValue::Int(_) => LeafKind::Int,
            HostValue::Float(_) => LeafKind::Float,
            HostValue::Bool(_) => LeafKind::Bool,
            HostValue::Str(_) => LeafKind::Str,
            HostValue::None | HostValue::List(_) | HostValue::Array(_) => LeafKind::Object,
        }
    }

    fn merge(self, other: LeafKind) -> LeafKind {
        use LeafKind::*;
        match (self, other) {
            (Empty, k) | (k, Empty) => k,
            (a, b) if a == b => a,
            (Int, Float) | (Float, Int) => Float,
            _ => Object,
        }
    }

    fn dtype(self) -> DType {
        match self {
            LeafKind::Empty | LeafKind::Float => DType::F64,
            LeafKind::Int => DType::I64,
            LeafKind::Bool => DType::Bool,
            LeafKind::Str => DType::Utf8,
            LeafKind::Object => DType::Object,
        }
    }
}

fn coerce_list(value: &HostValue) -> Result<ArrayArg<'static>> {
    let shape = infer_shape(value);

    let mut leaves = Vec::with_capacity(shape.iter().product());
    flatten(value, &shape, 0, &mut leaves)?;

    let kind = leaves
        .iter()
        .fold(LeafKind::Empty, |acc, leaf| acc.merge(LeafKind::of(leaf)));
    let dtype = kind.dtype();

    debug!("as_array: coercing sequence to {} {:?}", dtype, shape);

    let tensor = match kind {
        LeafKind::Int => Tensor::from_vec(leaves.iter().map(|v| int_of(v)).collect(), &shape)?,
        LeafKind::Empty | LeafKind::Float => {
            Tensor::from_vec(leaves.iter().map(|v| float_of(v)).collect(), &shape)?
        }
        LeafKind::Bool => Tensor::from_bools(
            leaves.iter().map(|v| matches!(v, HostValue::Bool(true))).collect(),
            &shape,
        )?,
        LeafKind::Str => Tensor::from_strings(
            leaves
                .iter()
                .map(|v| match v {
                    HostValue::Str(s) => s.clone(),
                    _ => String::new(),
                })
                .collect(),
            &shape,
        )?,
        LeafKind::Object => return Ok(ArrayArg::Opaque { shape, dtype }),
    };

    Ok(ArrayArg::Coerced(tensor))
}

fn int_of(value: &HostValue) -> i64 {
    match value {
        HostValue::Int(i) => *i,
        _ => 0,
    }
}

fn float_of(value: &HostValue) -> f64 {
    match value {
        HostValue::Int(i) => *i as f64,
        HostValue::Float(x) => *x,
        _ => 0.0,
    }
}

// Shape follows the first element at every depth; `flatten` then checks
// every other branch against it.
fn infer_shape(value: &HostValue) -> ShapeBuf {
    let mut shape = ShapeBuf::new();
    let mut cursor = value;
    while let HostValue::List(items) = cursor {
        shape.push(items.len());
        match items.first() {
            Some(first) => cursor = first,
            None => break,
        }
    }
    shape
}

fn flatten<'v>(
    value: &'v HostValue,
    shape: &[usize],
    depth: usize,
    out: &mut Vec<&'v HostValue>,
) -> Result<()> {
    match (value, shape.get(depth)) {
        (HostValue::List(items), Some(&len)) => {
            if items.len() != len {
                return Err(ragged(depth, len, items.len()));
            }
            for item in items {
                flatten(item, shape, depth + 1, out)?;
            }
            Ok(())
        }
        (HostValue::List(items), None) => Err(ragged(depth, 0, items.len())),
        (_, Some(&len)) => Err(TensorError::conversion(format!(
            "inhomogeneous sequence: scalar at depth {} where a sequence of {} was expected",
            depth, len
        ))),
        (leaf, None) => {
            out.push(leaf);
            Ok(())
        }
    }
}

fn ragged(depth: usize, expected: usize, got: usize) -> TensorError {
    TensorError::conversion(format!(
        "inhomogeneous sequence at depth {}: expected {} items, got {}",
        depth, expected, got
    ))
}
