//! Unified error handling for the tensor algebra layer.
//!
//! This module defines `TensorError`, the error type returned by vector and
//! matrix operations whose operands disagree on shape, by aggregation helpers
//! that receive invalid arguments, and by operations that are not defined for
//! a particular storage combination. An alias `TensorResult<T>` standardizes
//! the return type across the tensor modules.
//!
//! Out-of-range element indices are not represented here: they are
//! programming errors and panic, mirroring slice indexing.

/// Unified error type for tensor operations.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorError {
    // ---- Shapes ----
    /// Two vectors that must have the same size do not.
    SizeMismatch { expected: usize, found: usize },

    /// Two matrices whose shapes must agree for `op` do not.
    ShapeMismatch { op: &'static str, this: (usize, usize), other: (usize, usize) },

    /// A vector operand does not match the matrix dimension it is applied to.
    VectorDimMismatch { op: &'static str, expected: usize, found: usize },

    /// A raveled buffer does not hold the number of elements the target shape needs.
    RavelLengthMismatch { expected: usize, found: usize },

    // ---- Construction ----
    /// Invalid arguments to an aggregation or constructor.
    InvalidAggregate { reason: String },

    /// Sparse indices must be strictly increasing and inside the vector size.
    InvalidSparseIndices { reason: &'static str },

    // ---- Storage combinations ----
    /// The operation is not defined for the given storage pair.
    UnsupportedStorage { op: &'static str, reason: &'static str },

    /// Tensor kinds (vector vs. matrix) disagree.
    KindMismatch { op: &'static str },
}

pub type TensorResult<T> = Result<T, TensorError>;

impl std::error::Error for TensorError {}

impl std::fmt::Display for TensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Shapes ----
            TensorError::SizeMismatch { expected, found } => {
                write!(f, "Vector size mismatch: expected {expected}, found {found}")
            }
            TensorError::ShapeMismatch { op, this, other } => {
                write!(f, "Invalid matrix dimensions for {op}: this {this:?}, other {other:?}")
            }
            TensorError::VectorDimMismatch { op, expected, found } => {
                write!(f, "Invalid vector size for {op}: expected {expected}, found {found}")
            }
            TensorError::RavelLengthMismatch { expected, found } => {
                write!(f, "Raveled length mismatch: expected {expected} elements, found {found}")
            }

            // ---- Construction ----
            TensorError::InvalidAggregate { reason } => {
                write!(f, "Invalid aggregate: {reason}")
            }
            TensorError::InvalidSparseIndices { reason } => {
                write!(f, "Invalid sparse indices: {reason}")
            }

            // ---- Storage combinations ----
            TensorError::UnsupportedStorage { op, reason } => {
                write!(f, "Unsupported storage for {op}: {reason}")
            }
            TensorError::KindMismatch { op } => {
                write!(f, "Tensor kind mismatch in {op}: cannot combine a vector and a matrix")
            }
        }
    }
}
