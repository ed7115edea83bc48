use crate::dtype::DType;

/// Errors surfaced by tensor operations and by the host boundary.
///
/// Every failure is terminal for the call that produced it; nothing is retried
/// and no partial result accompanies an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TensorError {
    /// An argument could not be viewed as a contiguous array at all.
    #[error("conversion failure: {0}")]
    ConversionFailure(String),

    #[error("shape mismatch: lhs {lhs:?} vs rhs {rhs:?}")]
    ShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },

    #[error("unsupported element type: {0}")]
    UnsupportedType(DType),

    #[error("allocation failure: cannot reserve {elements} elements of {dtype}")]
    AllocationFailure { elements: usize, dtype: DType },

    /// Only raised under the checked overflow policy.
    #[error("integer overflow at linear index {index} ({dtype})")]
    IntegerOverflow { index: usize, dtype: DType },
}

/// Fieldless tag for matching on the failure class.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConversionFailure,
    ShapeMismatch,
    UnsupportedType,
    AllocationFailure,
    IntegerOverflow,
}

impl TensorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TensorError::ConversionFailure(_) => ErrorKind::ConversionFailure,
            TensorError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            TensorError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            TensorError::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            TensorError::IntegerOverflow { .. } => ErrorKind::IntegerOverflow,
        }
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        TensorError::ConversionFailure(msg.into())
    }
}
