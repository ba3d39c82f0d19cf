//! Heterogeneous tensor arrays and their flat (raveled) form.
//!
//! Parameters and gradients travel as `[Tensor]` slices: one entry per
//! parameter block, each a vector or a matrix. The optimizer works on the
//! row-major concatenation of such a slice (`ravel`) and maps flat
//! directions back onto the block shapes (`unravel_like`).
use serde::{Deserialize, Serialize};

use crate::tensor::{
    errors::{TensorError, TensorResult},
    matrix::{DenseMatrix, Matrix, RowMatrix},
    vector::{DenseVector, SparseVector, Vector},
};

/// A single parameter or gradient block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tensor {
    Vector(Vector),
    Matrix(Matrix),
}

impl From<Vector> for Tensor {
    fn from(v: Vector) -> Self {
        Tensor::Vector(v)
    }
}

impl From<Matrix> for Tensor {
    fn from(m: Matrix) -> Self {
        Tensor::Matrix(m)
    }
}

impl From<DenseMatrix> for Tensor {
    fn from(m: DenseMatrix) -> Self {
        Tensor::Matrix(Matrix::Dense(m))
    }
}

impl Tensor {
    /// Number of logical elements.
    pub fn len(&self) -> usize {
        match self {
            Tensor::Vector(v) => v.size(),
            Tensor::Matrix(m) => m.dim1() * m.dim2(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Tensor::Matrix(m) => Some(m),
            Tensor::Vector(_) => None,
        }
    }

    pub fn as_matrix_mut(&mut self) -> Option<&mut Matrix> {
        match self {
            Tensor::Matrix(m) => Some(m),
            Tensor::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&Vector> {
        match self {
            Tensor::Vector(v) => Some(v),
            Tensor::Matrix(_) => None,
        }
    }

    /// `self += f(other)` over the active entries of `other`.
    ///
    /// # Errors
    /// [`TensorError::KindMismatch`] when a vector meets a matrix, otherwise
    /// the shape errors of the underlying operation.
    pub fn intersect_and_add_in_place(
        &mut self, other: &Tensor, f: impl Fn(f64) -> f64,
    ) -> TensorResult<()> {
        match (self, other) {
            (Tensor::Vector(a), Tensor::Vector(b)) => a.intersect_and_add_in_place(b, f),
            (Tensor::Matrix(a), Tensor::Matrix(b)) => a.intersect_and_add_in_place(b, f),
            _ => Err(TensorError::KindMismatch { op: "intersect_and_add_in_place" }),
        }
    }

    pub fn scale_in_place(&mut self, coefficient: f64) {
        match self {
            Tensor::Vector(v) => v.scale_in_place(coefficient),
            Tensor::Matrix(m) => m.scale_in_place(coefficient),
        }
    }

    pub fn two_norm(&self) -> f64 {
        match self {
            Tensor::Vector(v) => v.two_norm(),
            Tensor::Matrix(m) => m.two_norm(),
        }
    }

    /// Zero tensor with the same shape and storage kind.
    pub fn empty_copy(&self) -> Tensor {
        match self {
            Tensor::Vector(Vector::Dense(d)) => Tensor::Vector(DenseVector::zeros(d.size()).into()),
            Tensor::Vector(Vector::Sparse(s)) => Tensor::Vector(SparseVector::empty(s.size()).into()),
            Tensor::Matrix(Matrix::Dense(d)) => DenseMatrix::zeros(d.dim1(), d.dim2()).into(),
            Tensor::Matrix(Matrix::Rows(r)) => Matrix::Rows(RowMatrix::empty(r.dim1(), r.dim2())).into(),
        }
    }

    fn extend_flat(&self, out: &mut Vec<f64>) {
        match self {
            Tensor::Vector(Vector::Dense(d)) => out.extend(d.as_array().iter()),
            Tensor::Vector(Vector::Sparse(s)) => out.extend(s.densify().as_array().iter()),
            Tensor::Matrix(Matrix::Dense(d)) => out.extend(d.as_array().iter()),
            Tensor::Matrix(m) => out.extend(m.densify().as_array().iter()),
        }
    }
}

/// Total number of logical elements across a tensor array.
pub fn total_len(tensors: &[Tensor]) -> usize {
    tensors.iter().map(Tensor::len).sum()
}

/// Row-major concatenation of every tensor into one dense vector.
pub fn ravel(tensors: &[Tensor]) -> DenseVector {
    let mut flat = Vec::with_capacity(total_len(tensors));
    for t in tensors {
        t.extend_flat(&mut flat);
    }
    DenseVector::from_vec(flat)
}

/// Split a flat vector into dense tensors shaped like `template`.
///
/// # Errors
/// [`TensorError::RavelLengthMismatch`] if `flat` does not hold exactly as
/// many elements as the template.
pub fn unravel_like(template: &[Tensor], flat: &DenseVector) -> TensorResult<Vec<Tensor>> {
    let expected = total_len(template);
    if flat.size() != expected {
        return Err(TensorError::RavelLengthMismatch { expected, found: flat.size() });
    }
    let values = flat.as_array();
    let mut offset = 0;
    let mut out = Vec::with_capacity(template.len());
    for t in template {
        let chunk = values.slice(ndarray::s![offset..offset + t.len()]);
        offset += t.len();
        out.push(match t {
            Tensor::Vector(_) => Tensor::Vector(DenseVector::from_view(chunk).into()),
            Tensor::Matrix(m) => {
                let block = chunk.to_owned().into_shape((m.dim1(), m.dim2())).map_err(|_| {
                    TensorError::RavelLengthMismatch { expected: t.len(), found: chunk.len() }
                })?;
                DenseMatrix::from_array(block).into()
            }
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Raveling is row-major and `unravel_like` restores the block shapes.
    fn ravel_is_row_major_and_unravel_restores_shapes() {
        let blocks = vec![
            Tensor::from(DenseMatrix::from_array(array![[1.0, 2.0], [3.0, 4.0]])),
            Tensor::Vector(Vector::dense(vec![5.0, 6.0, 7.0])),
        ];
        let flat = ravel(&blocks);
        assert_eq!(flat.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);

        let back = unravel_like(&blocks, &flat).unwrap();
        assert_eq!(back, blocks);
    }

    #[test]
    fn unravel_rejects_wrong_length() {
        let blocks = vec![Tensor::from(DenseMatrix::zeros(2, 2))];
        let err = unravel_like(&blocks, &DenseVector::zeros(3)).unwrap_err();
        assert_eq!(err, TensorError::RavelLengthMismatch { expected: 4, found: 3 });
    }

    #[test]
    fn kind_mismatch_and_empty_copy() {
        let mut m = Tensor::from(DenseMatrix::from_array(array![[1.0, -1.0]]));
        let v = Tensor::Vector(Vector::dense(vec![1.0, 2.0]));
        assert!(matches!(
            m.intersect_and_add_in_place(&v, |x| x),
            Err(TensorError::KindMismatch { .. })
        ));
        let zero = m.empty_copy();
        assert_eq!(zero.len(), 2);
        assert_eq!(zero.two_norm(), 0.0);
    }
}
