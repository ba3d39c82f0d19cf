//! parameters — containers for the trainable tensors of a model.
//!
//! Purpose
//! -------
//! Give the optimizer one interface over "the parameters of a model": read
//! them as a tensor array, replace them wholesale, apply an additive step,
//! and produce zeroed copies or merged gradient shards. [`LinearParameters`]
//! is the concrete container used by linear models.
//!
//! Key behaviors
//! -------------
//! - [`Parameters::update`] adds a step block by block through
//!   `intersect_and_add_in_place`, so sparse steps touch only their active
//!   entries.
//! - [`Parameters::merge`] sums gradient shards: dense blocks are
//!   accumulated directly, row-sparse matrices and sparse vectors go through
//!   the [`HeapMerger`] k-way merge.
//!
//! Invariants & assumptions
//! ------------------------
//! - The number of blocks and their shapes are fixed for the lifetime of a
//!   container; `set` and `update` reject anything else.
//! - A container is mutated by one optimizer run at a time (`&mut` borrow).
//!
//! Downstream usage
//! ----------------
//! - `optimization::lbfgs` is generic over [`Parameters`]; the training
//!   layer instantiates it with [`LinearParameters`].

pub mod linear;

pub use self::linear::LinearParameters;

use crate::{
    optimization::errors::OptResult,
    tensor::{
        DenseMatrix, DenseVector, HeapMerger, Matrix, RowMatrix, SparseVector, Tensor,
        TensorError, TensorResult, Vector,
    },
};

/// A fixed-shape array of trainable tensors.
///
/// Required:
/// - `get`: the current blocks.
/// - `set`: replace every block; shapes must match.
/// - `update`: `block[i] += step[i]` over the active entries of each step.
///
/// Provided:
/// - `empty_copy`: zero tensors with the same shapes and storage kinds.
/// - `merge`: sum the first `count` gradient shards.
pub trait Parameters {
    fn get(&self) -> &[Tensor];

    fn set(&mut self, tensors: Vec<Tensor>) -> OptResult<()>;

    fn update(&mut self, step: &[Tensor]) -> OptResult<()>;

    fn empty_copy(&self) -> Vec<Tensor> {
        self.get().iter().map(Tensor::empty_copy).collect()
    }

    fn merge(&self, shards: &[Vec<Tensor>], count: usize) -> TensorResult<Vec<Tensor>> {
        merge_shards(shards, count)
    }
}

/// Sum the first `count` shards block by block.
///
/// # Errors
/// - [`TensorError::InvalidAggregate`] if `count` is zero, exceeds the
///   number of shards, or the shards hold different numbers of blocks.
/// - [`TensorError::KindMismatch`] if one block position mixes vectors and
///   matrices.
/// - Shape errors from the underlying accumulation.
pub fn merge_shards(shards: &[Vec<Tensor>], count: usize) -> TensorResult<Vec<Tensor>> {
    if count == 0 || count > shards.len() {
        return Err(TensorError::InvalidAggregate {
            reason: format!("count {count} invalid for {} shards", shards.len()),
        });
    }
    let shards = &shards[..count];
    let blocks = shards[0].len();
    if shards.iter().any(|s| s.len() != blocks) {
        return Err(TensorError::InvalidAggregate {
            reason: "shards hold different numbers of blocks".into(),
        });
    }

    let merger = HeapMerger::new();
    (0..blocks)
        .map(|b| {
            let column: Vec<&Tensor> = shards.iter().map(|s| &s[b]).collect();
            merge_block(&merger, &column)
        })
        .collect()
}

fn merge_block(merger: &HeapMerger, blocks: &[&Tensor]) -> TensorResult<Tensor> {
    let row_matrices: Option<Vec<&RowMatrix>> = blocks
        .iter()
        .map(|t| match t {
            Tensor::Matrix(Matrix::Rows(r)) => Some(r),
            _ => None,
        })
        .collect();
    if let Some(row_matrices) = row_matrices {
        return Ok(Matrix::Rows(merger.merge_row_matrices(&row_matrices)?).into());
    }

    let sparse: Option<Vec<&SparseVector>> = blocks
        .iter()
        .map(|t| match t {
            Tensor::Vector(Vector::Sparse(s)) => Some(s),
            _ => None,
        })
        .collect();
    if let Some(sparse) = sparse {
        return Ok(Vector::Sparse(merger.merge_vectors(&sparse)?).into());
    }

    match blocks[0] {
        Tensor::Matrix(first) => {
            let mut acc = DenseMatrix::zeros(first.dim1(), first.dim2());
            for block in blocks {
                let m = block.as_matrix().ok_or(TensorError::KindMismatch { op: "merge" })?;
                acc.intersect_and_add_in_place(m, |v| v)?;
            }
            Ok(acc.into())
        }
        Tensor::Vector(first) => {
            let mut acc = DenseVector::zeros(first.size());
            for block in blocks {
                let v = block.as_vector().ok_or(TensorError::KindMismatch { op: "merge" })?;
                acc.intersect_and_add_in_place(v, |x| x)?;
            }
            Ok(Vector::Dense(acc).into())
        }
    }
}
