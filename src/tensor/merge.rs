//! K-way merge of sparse vectors and row matrices.
//!
//! Summing many sparse gradient shards by repeated insertion is quadratic in
//! the number of active entries. `HeapMerger` instead walks every shard in
//! index order at once through a min-heap keyed on the column index, so each
//! active entry is visited exactly once and the output indices come out
//! sorted.
use std::{cmp::Reverse, collections::BinaryHeap};

use crate::tensor::{
    errors::{TensorError, TensorResult},
    matrix::RowMatrix,
    vector::{DenseVector, SparseVector, Vector},
};

/// Stateless k-way merger.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapMerger;

impl HeapMerger {
    pub fn new() -> Self {
        Self
    }

    /// Sum sparse vectors of equal size.
    ///
    /// # Errors
    /// - [`TensorError::InvalidAggregate`] if `vectors` is empty.
    /// - [`TensorError::SizeMismatch`] if the sizes differ.
    pub fn merge_vectors(&self, vectors: &[&SparseVector]) -> TensorResult<SparseVector> {
        let size = vectors
            .first()
            .map(|v| v.size())
            .ok_or_else(|| TensorError::InvalidAggregate { reason: "no vectors to merge".into() })?;
        if let Some(bad) = vectors.iter().find(|v| v.size() != size) {
            return Err(TensorError::SizeMismatch { expected: size, found: bad.size() });
        }

        // (column, shard, position within shard)
        let mut heap: BinaryHeap<Reverse<(usize, usize, usize)>> = vectors
            .iter()
            .enumerate()
            .filter_map(|(shard, v)| v.indices().first().map(|&j| Reverse((j, shard, 0))))
            .collect();

        let mut indices: Vec<usize> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        while let Some(Reverse((j, shard, pos))) = heap.pop() {
            let value = vectors[shard].values()[pos];
            match indices.last() {
                Some(&last) if last == j => {
                    if let Some(acc) = values.last_mut() {
                        *acc += value;
                    }
                }
                _ => {
                    indices.push(j);
                    values.push(value);
                }
            }
            if let Some(&next) = vectors[shard].indices().get(pos + 1) {
                heap.push(Reverse((next, shard, pos + 1)));
            }
        }
        SparseVector::new(size, indices, values)
    }

    /// Sum rows of equal size; stays sparse only when every row is sparse.
    ///
    /// # Errors
    /// - [`TensorError::InvalidAggregate`] for an empty `rows`.
    /// - [`TensorError::SizeMismatch`] if the rows disagree in size.
    pub fn merge_rows(&self, rows: &[&Vector]) -> TensorResult<Vector> {
        let sparse: Option<Vec<&SparseVector>> = rows
            .iter()
            .map(|r| match r {
                Vector::Sparse(s) => Some(s),
                Vector::Dense(_) => None,
            })
            .collect();
        if let Some(sparse) = sparse {
            return self.merge_vectors(&sparse).map(Vector::Sparse);
        }

        let size = rows
            .first()
            .map(|r| r.size())
            .ok_or_else(|| TensorError::InvalidAggregate { reason: "no rows to merge".into() })?;
        let mut acc = DenseVector::zeros(size);
        for r in rows {
            acc.intersect_and_add_in_place(r, |v| v)?;
        }
        Ok(Vector::Dense(acc))
    }

    /// Sum row matrices of equal shape row by row.
    ///
    /// # Errors
    /// [`TensorError::ShapeMismatch`] if the shards disagree on shape.
    pub fn merge_row_matrices(&self, matrices: &[&RowMatrix]) -> TensorResult<RowMatrix> {
        let first = matrices.first().ok_or_else(|| TensorError::InvalidAggregate {
            reason: "no matrices to merge".into(),
        })?;
        let shape = (first.dim1(), first.dim2());
        if let Some(bad) = matrices.iter().find(|m| (m.dim1(), m.dim2()) != shape) {
            return Err(TensorError::ShapeMismatch {
                op: "merge_row_matrices",
                this: shape,
                other: (bad.dim1(), bad.dim2()),
            });
        }

        let mut merged = Vec::with_capacity(shape.0);
        for i in 0..shape.0 {
            let rows: Vec<&Vector> = matrices.iter().map(|m| m.row(i)).collect();
            merged.push(self.merge_rows(&rows)?);
        }
        RowMatrix::new(merged, shape.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sv(size: usize, entries: &[(usize, f64)]) -> SparseVector {
        let (i, v) = entries.iter().copied().unzip();
        SparseVector::new(size, i, v).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Overlapping and disjoint indices are merged in sorted order with
    // values summed at collisions.
    fn merge_vectors_sums_collisions_in_order() {
        let a = sv(8, &[(1, 1.0), (5, 2.0)]);
        let b = sv(8, &[(0, 3.0), (5, 4.0), (7, 1.0)]);
        let c = sv(8, &[]);
        let merged = HeapMerger::new().merge_vectors(&[&a, &b, &c]).unwrap();
        assert_eq!(merged.indices(), &[0, 1, 5, 7]);
        assert_eq!(merged.values(), &[3.0, 1.0, 6.0, 1.0]);
    }

    #[test]
    fn merge_rejects_empty_and_mismatched_input() {
        let merger = HeapMerger::new();
        assert!(merger.merge_vectors(&[]).is_err());
        let a = sv(3, &[(0, 1.0)]);
        let b = sv(4, &[(0, 1.0)]);
        assert!(merger.merge_vectors(&[&a, &b]).is_err());
    }

    #[test]
    fn merge_row_matrices_matches_dense_sum() {
        let m1 = RowMatrix::new(vec![sv(3, &[(0, 1.0)]).into(), sv(3, &[(2, 2.0)]).into()], 3)
            .unwrap();
        let m2 = RowMatrix::new(vec![sv(3, &[(0, 1.0), (1, 1.0)]).into(), sv(3, &[]).into()], 3)
            .unwrap();
        let merged = HeapMerger::new().merge_row_matrices(&[&m1, &m2]).unwrap();
        assert_eq!(merged.row(0), &Vector::dense(vec![2.0, 1.0, 0.0]));
        assert_eq!(merged.row(1), &Vector::dense(vec![0.0, 0.0, 2.0]));
    }
}
