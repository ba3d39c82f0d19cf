//! General matrix product over every storage pair and transpose combination.
//!
//! Dispatch is decided once per call. Dense·dense goes through `ndarray`'s
//! general matrix product on (possibly transposed) views; any product that
//! involves a row matrix goes through one of four row kernels that only
//! touch the active entries of sparse rows. The output is always dense.
use ndarray::Array2;

use crate::tensor::{
    errors::{TensorError, TensorResult},
    matrix::{DenseMatrix, Matrix, MatrixRef, RowMatrix},
};

type RowKernel = fn(MatrixRef<'_>, MatrixRef<'_>, &mut Array2<f64>);

/// Row kernels indexed by `[transpose_this][transpose_other]`.
const ROW_KERNELS: [[RowKernel; 2]; 2] = [[kernel_nn, kernel_nt], [kernel_tn, kernel_tt]];

/// `op(this) · op(other)` where `op` optionally transposes.
///
/// # Errors
/// [`TensorError::ShapeMismatch`] if the inner dimensions disagree; both
/// operand shapes are reported as stored (before transposition).
pub fn matrix_multiply<'a, 'b>(
    this: impl Into<MatrixRef<'a>>, other: impl Into<MatrixRef<'b>>, transpose_this: bool,
    transpose_other: bool,
) -> TensorResult<DenseMatrix> {
    let (this, other) = (this.into(), other.into());
    let (m, inner_this) = oriented(this.shape(), transpose_this);
    let (inner_other, n) = oriented(other.shape(), transpose_other);
    if inner_this != inner_other {
        return Err(TensorError::ShapeMismatch {
            op: "matrix_multiply",
            this: this.shape(),
            other: other.shape(),
        });
    }

    if let (MatrixRef::Dense(a), MatrixRef::Dense(b)) = (this, other) {
        let a = if transpose_this { a.as_array().t() } else { a.as_array().view() };
        let b = if transpose_other { b.as_array().t() } else { b.as_array().view() };
        return Ok(DenseMatrix::from_array(a.dot(&b)));
    }

    let mut out = Array2::zeros((m, n));
    ROW_KERNELS[transpose_this as usize][transpose_other as usize](this, other, &mut out);
    Ok(DenseMatrix::from_array(out))
}

fn oriented(shape: (usize, usize), transpose: bool) -> (usize, usize) {
    if transpose { (shape.1, shape.0) } else { shape }
}

/// `out[i] = Σ_k this[i][k] · other[k]`.
fn kernel_nn(this: MatrixRef<'_>, other: MatrixRef<'_>, out: &mut Array2<f64>) {
    for i in 0..this.dim1() {
        for (k, v) in this.row(i).iter() {
            other.row(k).axpy_into(v, out.row_mut(i));
        }
    }
}

/// `out[i][j] = this[i] · other[j]`.
fn kernel_nt(this: MatrixRef<'_>, other: MatrixRef<'_>, out: &mut Array2<f64>) {
    for i in 0..this.dim1() {
        let row = this.row(i);
        for j in 0..other.dim1() {
            out[[i, j]] = row.dot(&other.row(j));
        }
    }
}

/// `out[k] += this[i][k] · other[i]` for every row `i`.
fn kernel_tn(this: MatrixRef<'_>, other: MatrixRef<'_>, out: &mut Array2<f64>) {
    for i in 0..this.dim1() {
        let other_row = other.row(i);
        for (k, v) in this.row(i).iter() {
            other_row.axpy_into(v, out.row_mut(k));
        }
    }
}

/// `out[k][j] = Σ_i this[i][k] · other[j][i]`.
fn kernel_tt(this: MatrixRef<'_>, other: MatrixRef<'_>, out: &mut Array2<f64>) {
    for i in 0..this.dim1() {
        let mut entries = this.row(i).iter().peekable();
        if entries.peek().is_none() {
            continue;
        }
        let other_column = other.column(i);
        for (k, v) in entries {
            out.row_mut(k).scaled_add(v, &other_column.view());
        }
    }
}

impl Matrix {
    /// See [`matrix_multiply`].
    pub fn matrix_multiply<'b>(
        &self, other: impl Into<MatrixRef<'b>>, transpose_this: bool, transpose_other: bool,
    ) -> TensorResult<DenseMatrix> {
        matrix_multiply(self, other, transpose_this, transpose_other)
    }
}

impl DenseMatrix {
    /// See [`matrix_multiply`].
    pub fn matrix_multiply<'b>(
        &self, other: impl Into<MatrixRef<'b>>, transpose_this: bool, transpose_other: bool,
    ) -> TensorResult<DenseMatrix> {
        matrix_multiply(self, other, transpose_this, transpose_other)
    }
}

impl RowMatrix {
    /// See [`matrix_multiply`].
    pub fn matrix_multiply<'b>(
        &self, other: impl Into<MatrixRef<'b>>, transpose_this: bool, transpose_other: bool,
    ) -> TensorResult<DenseMatrix> {
        matrix_multiply(self, other, transpose_this, transpose_other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::vector::{SparseVector, Vector};
    use approx::assert_relative_eq;
    use ndarray::array;

    fn as_rows(m: &DenseMatrix) -> Matrix {
        let rows = (0..m.dim1())
            .map(|i| {
                Vector::Sparse(SparseVector::from_dense(&crate::tensor::DenseVector::from_view(
                    m.row(i),
                )))
            })
            .collect();
        Matrix::Rows(RowMatrix::new(rows, m.dim2()).unwrap())
    }

    #[test]
    // Purpose
    // -------
    // Every storage pair and transpose flag combination gives the same
    // product as the dense ndarray reference.
    //
    // Given
    // -----
    // - A = 2×3 and B = 3×2 with some zero entries.
    //
    // Expect
    // ------
    // - A·B, Aᵀ·Bᵀ, A·Aᵀ and Aᵀ·A match for dense and row storage.
    fn all_storage_pairs_and_transposes_agree() {
        let a = DenseMatrix::from_array(array![[1.0, 0.0, 2.0], [0.0, -1.0, 3.0]]);
        let b = DenseMatrix::from_array(array![[4.0, 0.0], [1.0, 2.0], [0.0, -2.0]]);
        let cases = [
            (&a, &b, false, false),
            (&a, &b, true, true),
            (&a, &a, false, true),
            (&a, &a, true, false),
        ];
        for (x, y, tx, ty) in cases {
            let expected = Matrix::Dense(x.clone()).matrix_multiply(y, tx, ty).unwrap();
            let xs = [Matrix::Dense(x.clone()), as_rows(x)];
            let ys = [Matrix::Dense(y.clone()), as_rows(y)];
            for xm in &xs {
                for ym in &ys {
                    let got = xm.matrix_multiply(ym, tx, ty).unwrap();
                    assert_eq!(got.shape(), expected.shape());
                    for (g, e) in got.as_array().iter().zip(expected.as_array()) {
                        assert_relative_eq!(*g, *e, max_relative = 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn mismatched_inner_dimensions_report_both_shapes() {
        let a = DenseMatrix::zeros(2, 3);
        let b = DenseMatrix::zeros(2, 3);
        let err = a.matrix_multiply(&b, false, false).unwrap_err();
        assert_eq!(
            err,
            TensorError::ShapeMismatch { op: "matrix_multiply", this: (2, 3), other: (2, 3) }
        );
        assert!(a.matrix_multiply(&b, false, true).is_ok());
    }
}
