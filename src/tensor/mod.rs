//! tensor — vector and matrix algebra for linear models.
//!
//! Purpose
//! -------
//! Supply the numeric containers that parameters, gradients, features and
//! predictions are stored in, with operations that exploit sparsity where
//! the data has it and delegate to `ndarray` where it is dense.
//!
//! Key behaviors
//! -------------
//! - [`Vector`]: dense ([`DenseVector`]) or sparse ([`SparseVector`]).
//! - [`Matrix`]: dense ([`DenseMatrix`]) or an array of row vectors
//!   ([`RowMatrix`]), with the borrowed [`MatrixRef`] / [`RowView`] forms.
//! - [`matrix_multiply`] over every storage pair and transpose combination.
//! - [`Tensor`] blocks and their flat form ([`ravel`], [`unravel_like`]).
//! - [`HeapMerger`] for summing sparse gradient shards.
//! - [`VectorNormalizer`] implementations mapping scores to probabilities.
//!
//! Invariants & assumptions
//! ------------------------
//! - Shape disagreements are returned as [`TensorError`]; out-of-range
//!   element indices panic.
//! - Equality and hashing follow logical content, independent of storage.
//!
//! Downstream usage
//! ----------------
//! - `parameters::LinearParameters` stores its weights as a `DenseMatrix`
//!   inside a `Tensor` array.
//! - `optimization::lbfgs` ravels gradient arrays into a `DenseVector`.
//! - `objective` consumes prediction buffers and normalizes them in place.
pub mod errors;
pub mod matrix;
pub mod merge;
pub mod multiply;
pub mod normalizer;
pub mod stack;
pub mod vector;

pub use self::errors::{TensorError, TensorResult};
pub use self::matrix::{DenseMatrix, Matrix, MatrixIter, MatrixRef, RowMatrix, RowView};
pub use self::merge::HeapMerger;
pub use self::multiply::matrix_multiply;
pub use self::normalizer::{
    ExpNormalizer, NoNormalizer, NormalizerKind, SigmoidNormalizer, VectorNormalizer,
};
pub use self::stack::{Tensor, ravel, total_len, unravel_like};
pub use self::vector::{DenseVector, SparseVector, Vector, VectorIter};

pub mod prelude {
    pub use super::{
        DenseMatrix, DenseVector, Matrix, RowMatrix, SparseVector, Tensor, TensorError,
        TensorResult, Vector,
    };
}
