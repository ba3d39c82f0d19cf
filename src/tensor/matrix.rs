//! tensor::matrix — dense and row-vector matrices.
//!
//! Purpose
//! -------
//! Provide the matrix half of the tensor algebra layer. A [`DenseMatrix`]
//! wraps a row-major `ndarray::Array2<f64>`; a [`RowMatrix`] holds one
//! [`Vector`] per row (typically sparse feature rows). The closed [`Matrix`]
//! variant dispatches between the two, and [`MatrixRef`] is the borrowed
//! counterpart that read-only kernels are written against.
//!
//! Key behaviors
//! -------------
//! - `row(i)` returns a borrowed [`RowView`] into storage; `column(j)` is a
//!   freshly computed dense copy, so loops should run over rows.
//! - Matrix-vector products (`left_multiply`, `right_multiply`), row scaling,
//!   per-row reductions, row-wise normalization and arg-max.
//! - In-place combination with another matrix restricted to the other
//!   operand's active entries.
//! - Aggregation of a batch of vectors into a dense matrix (all dense) or a
//!   row matrix of sparse rows.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every row of a `RowMatrix` reports `size() == dim2`.
//! - Shape disagreements are returned as `TensorError`; out-of-range element
//!   indices panic.
//!
//! Conventions
//! -----------
//! - Equality and hashing are by logical content, so a dense matrix and an
//!   equivalent row matrix compare equal.
use std::hash::{Hash, Hasher};

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, Axis};
use serde::{Deserialize, Serialize};

use crate::tensor::{
    errors::{TensorError, TensorResult},
    normalizer::VectorNormalizer,
    vector::{DenseVector, SparseVector, Vector, VectorIter, sparse_dot},
};

#[inline]
#[track_caller]
fn check_entry(i: usize, j: usize, shape: (usize, usize)) {
    assert!(
        i < shape.0 && j < shape.1,
        "Index ({i}, {j}) out of bounds for matrix of shape {shape:?}"
    );
}

#[inline]
#[track_caller]
fn check_row(i: usize, dim1: usize) {
    assert!(i < dim1, "Row {i} out of bounds for matrix with {dim1} rows");
}

fn check_same_shape(
    op: &'static str, this: (usize, usize), other: (usize, usize),
) -> TensorResult<()> {
    if this != other {
        return Err(TensorError::ShapeMismatch { op, this, other });
    }
    Ok(())
}

// ---- Row views ------------------------------------------------------------

/// Borrowed view of one matrix row.
#[derive(Debug, Clone, Copy)]
pub enum RowView<'a> {
    Dense(ArrayView1<'a, f64>),
    Vector(&'a Vector),
}

impl<'a> RowView<'a> {
    pub fn size(&self) -> usize {
        match self {
            RowView::Dense(v) => v.len(),
            RowView::Vector(v) => v.size(),
        }
    }

    pub fn num_active_elements(&self) -> usize {
        match self {
            RowView::Dense(v) => v.len(),
            RowView::Vector(v) => v.num_active_elements(),
        }
    }

    #[track_caller]
    pub fn get(&self, j: usize) -> f64 {
        match self {
            RowView::Dense(v) => {
                assert!(j < v.len(), "Index {j} out of bounds for row of size {}", v.len());
                v[j]
            }
            RowView::Vector(v) => v.get(j),
        }
    }

    /// Active `(column, value)` pairs in ascending column order.
    pub fn iter(&self) -> VectorIter<'a> {
        match *self {
            RowView::Dense(v) => VectorIter::Dense(v.into_iter().enumerate()),
            RowView::Vector(v) => v.iter(),
        }
    }

    /// Inner product with another row of the same size.
    pub fn dot(&self, other: &RowView<'_>) -> f64 {
        debug_assert_eq!(self.size(), other.size());
        match (*self, *other) {
            (RowView::Dense(a), RowView::Dense(b)) => a.dot(&b),
            (RowView::Dense(a), RowView::Vector(v)) => dense_view_dot(a, v),
            (RowView::Vector(v), RowView::Dense(a)) => dense_view_dot(a, v),
            (RowView::Vector(a), RowView::Vector(b)) => match (a, b) {
                (Vector::Dense(x), _) => dense_view_dot(x.view(), b),
                (_, Vector::Dense(y)) => dense_view_dot(y.view(), a),
                (Vector::Sparse(x), Vector::Sparse(y)) => sparse_dot(x, y),
            },
        }
    }

    /// `out += alpha * row`.
    pub fn axpy_into(&self, alpha: f64, mut out: ArrayViewMut1<'_, f64>) {
        match self {
            RowView::Dense(v) => out.scaled_add(alpha, v),
            RowView::Vector(Vector::Dense(d)) => out.scaled_add(alpha, &d.view()),
            RowView::Vector(Vector::Sparse(s)) => {
                for (j, x) in s.iter() {
                    out[j] += alpha * x;
                }
            }
        }
    }

    pub fn index_of_max(&self) -> Option<usize> {
        match self {
            RowView::Dense(v) => {
                let mut best: Option<(usize, f64)> = None;
                for (j, &x) in v.iter().enumerate() {
                    if best.is_none_or(|(_, b)| x > b) {
                        best = Some((j, x));
                    }
                }
                best.map(|(j, _)| j)
            }
            RowView::Vector(v) => v.index_of_max(),
        }
    }

    /// Owned copy of the row.
    pub fn to_vector(&self) -> Vector {
        match self {
            RowView::Dense(v) => Vector::Dense(DenseVector::from_view(*v)),
            RowView::Vector(v) => (*v).clone(),
        }
    }
}

fn dense_view_dot(a: ArrayView1<'_, f64>, v: &Vector) -> f64 {
    match v {
        Vector::Dense(d) => a.dot(&d.view()),
        Vector::Sparse(s) => s.iter().map(|(j, x)| x * a[j]).sum(),
    }
}

// ---- Dense ----------------------------------------------------------------

/// Row-major dense matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseMatrix {
    elements: Array2<f64>,
}

impl DenseMatrix {
    pub fn zeros(dim1: usize, dim2: usize) -> Self {
        Self { elements: Array2::zeros((dim1, dim2)) }
    }

    pub fn from_array(elements: Array2<f64>) -> Self {
        Self { elements }
    }

    /// Build from row slices; every row must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> TensorResult<Self> {
        let dim2 = rows.first().map_or(0, Vec::len);
        let mut elements = Array2::zeros((rows.len(), dim2));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim2 {
                return Err(TensorError::SizeMismatch { expected: dim2, found: row.len() });
            }
            elements.row_mut(i).assign(&ArrayView1::from(row.as_slice()));
        }
        Ok(Self { elements })
    }

    /// Rank-1 product `column ⊗ row`.
    pub fn outer(column: &Vector, row: &Vector) -> Self {
        let mut out = Self::zeros(column.size(), row.size());
        for (i, a) in column.iter() {
            let mut target = out.elements.row_mut(i);
            for (j, b) in row.iter() {
                target[j] = a * b;
            }
        }
        out
    }

    pub fn dim1(&self) -> usize {
        self.elements.nrows()
    }

    pub fn dim2(&self) -> usize {
        self.elements.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.elements.dim()
    }

    #[track_caller]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        check_entry(i, j, self.shape());
        self.elements[[i, j]]
    }

    #[track_caller]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        check_entry(i, j, self.shape());
        self.elements[[i, j]] = value;
    }

    #[track_caller]
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        check_entry(i, j, self.shape());
        self.elements[[i, j]] += value;
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.elements
    }

    pub fn as_array_mut(&mut self) -> &mut Array2<f64> {
        &mut self.elements
    }

    pub fn into_array(self) -> Array2<f64> {
        self.elements
    }

    #[track_caller]
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        check_row(i, self.dim1());
        self.elements.row(i)
    }

    /// Live mutable access to row `i`.
    #[track_caller]
    pub fn row_mut(&mut self, i: usize) -> ArrayViewMut1<'_, f64> {
        check_row(i, self.dim1());
        self.elements.row_mut(i)
    }

    pub fn column(&self, j: usize) -> DenseVector {
        MatrixRef::Dense(self).column(j)
    }

    pub fn left_multiply(&self, vector: &Vector) -> TensorResult<DenseVector> {
        MatrixRef::Dense(self).left_multiply(vector)
    }

    pub fn right_multiply(&self, vector: &Vector) -> TensorResult<DenseVector> {
        MatrixRef::Dense(self).right_multiply(vector)
    }

    pub fn two_norm(&self) -> f64 {
        self.elements.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn sum(&self) -> f64 {
        self.elements.sum()
    }

    pub fn row_sum(&self) -> DenseVector {
        DenseVector::from_array(self.elements.sum_axis(Axis(1)))
    }

    pub fn column_sum(&self) -> DenseVector {
        DenseVector::from_array(self.elements.sum_axis(Axis(0)))
    }

    pub fn index_of_row_max(&self) -> Vec<usize> {
        MatrixRef::Dense(self).index_of_row_max()
    }

    /// Scale row `i` by `scales[i]`.
    pub fn row_scale_in_place(&mut self, scales: &DenseVector) -> TensorResult<()> {
        if scales.size() != self.dim1() {
            return Err(TensorError::VectorDimMismatch {
                op: "row_scale_in_place",
                expected: self.dim1(),
                found: scales.size(),
            });
        }
        for (mut row, &s) in self.elements.rows_mut().into_iter().zip(scales.as_array()) {
            row *= s;
        }
        Ok(())
    }

    pub fn scale_in_place(&mut self, coefficient: f64) {
        self.elements *= coefficient;
    }

    pub fn foreach_in_place(&mut self, f: impl Fn(f64) -> f64) {
        self.elements.mapv_inplace(f);
    }

    /// `self[i][j] += f(other[i][j])` over the active entries of `other`.
    pub fn intersect_and_add_in_place<'b>(
        &mut self, other: impl Into<MatrixRef<'b>>, f: impl Fn(f64) -> f64,
    ) -> TensorResult<()> {
        let other = other.into();
        check_same_shape("intersect_and_add_in_place", self.shape(), other.shape())?;
        match other {
            MatrixRef::Dense(o) => self.elements.zip_mut_with(&o.elements, |a, &b| *a += f(b)),
            MatrixRef::Rows(o) => {
                for (i, row) in o.rows.iter().enumerate() {
                    let mut target = self.elements.row_mut(i);
                    for (j, v) in row.iter() {
                        target[j] += f(v);
                    }
                }
            }
        }
        Ok(())
    }

    /// `self[i][j] *= f(other[i][j])` over the active entries of `other`.
    pub fn hadamard_product_in_place<'b>(
        &mut self, other: impl Into<MatrixRef<'b>>, f: impl Fn(f64) -> f64,
    ) -> TensorResult<()> {
        let other = other.into();
        check_same_shape("hadamard_product_in_place", self.shape(), other.shape())?;
        match other {
            MatrixRef::Dense(o) => self.elements.zip_mut_with(&o.elements, |a, &b| *a *= f(b)),
            MatrixRef::Rows(o) => {
                for (i, row) in o.rows.iter().enumerate() {
                    let mut target = self.elements.row_mut(i);
                    for (j, v) in row.iter() {
                        target[j] *= f(v);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn normalize_rows(&mut self, normalizer: &impl VectorNormalizer) {
        for row in self.elements.rows_mut() {
            normalizer.normalize_in_place(row);
        }
    }

    pub fn iter(&self) -> MatrixIter<'_> {
        MatrixRef::Dense(self).iter()
    }
}

// ---- Row matrix -----------------------------------------------------------

/// Matrix stored as an array of row vectors, each dense or sparse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawRowMatrix")]
pub struct RowMatrix {
    rows: Vec<Vector>,
    dim2: usize,
}

#[derive(Deserialize)]
struct RawRowMatrix {
    rows: Vec<Vector>,
    dim2: usize,
}

impl TryFrom<RawRowMatrix> for RowMatrix {
    type Error = TensorError;

    fn try_from(raw: RawRowMatrix) -> TensorResult<Self> {
        RowMatrix::new(raw.rows, raw.dim2)
    }
}

impl RowMatrix {
    /// # Errors
    /// [`TensorError::SizeMismatch`] if any row does not have size `dim2`.
    pub fn new(rows: Vec<Vector>, dim2: usize) -> TensorResult<Self> {
        if let Some(bad) = rows.iter().find(|r| r.size() != dim2) {
            return Err(TensorError::SizeMismatch { expected: dim2, found: bad.size() });
        }
        Ok(Self { rows, dim2 })
    }

    /// `dim1` all-inactive sparse rows.
    pub fn empty(dim1: usize, dim2: usize) -> Self {
        Self { rows: (0..dim1).map(|_| SparseVector::empty(dim2).into()).collect(), dim2 }
    }

    pub fn dim1(&self) -> usize {
        self.rows.len()
    }

    pub fn dim2(&self) -> usize {
        self.dim2
    }

    pub fn rows(&self) -> &[Vector] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vector> {
        self.rows
    }

    #[track_caller]
    pub fn row(&self, i: usize) -> &Vector {
        check_row(i, self.dim1());
        &self.rows[i]
    }

    /// Live mutable access to row `i`.
    #[track_caller]
    pub fn row_mut(&mut self, i: usize) -> &mut Vector {
        check_row(i, self.dim1());
        &mut self.rows[i]
    }

    pub fn row_scale_in_place(&mut self, scales: &DenseVector) -> TensorResult<()> {
        if scales.size() != self.dim1() {
            return Err(TensorError::VectorDimMismatch {
                op: "row_scale_in_place",
                expected: self.dim1(),
                found: scales.size(),
            });
        }
        for (row, &s) in self.rows.iter_mut().zip(scales.as_array()) {
            row.scale_in_place(s);
        }
        Ok(())
    }

    pub fn intersect_and_add_in_place<'b>(
        &mut self, other: impl Into<MatrixRef<'b>>, f: impl Fn(f64) -> f64,
    ) -> TensorResult<()> {
        let other = other.into();
        check_same_shape("intersect_and_add_in_place", (self.dim1(), self.dim2), other.shape())?;
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.intersect_and_add_entries(other.row(i).iter(), &f);
        }
        Ok(())
    }

    pub fn hadamard_product_in_place<'b>(
        &mut self, other: impl Into<MatrixRef<'b>>, f: impl Fn(f64) -> f64,
    ) -> TensorResult<()> {
        let other = other.into();
        check_same_shape("hadamard_product_in_place", (self.dim1(), self.dim2), other.shape())?;
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.hadamard_entries(other.row(i).iter(), &f);
        }
        Ok(())
    }
}

// ---- Borrowed dispatch ----------------------------------------------------

/// Borrowed matrix of either storage kind.
#[derive(Debug, Clone, Copy)]
pub enum MatrixRef<'a> {
    Dense(&'a DenseMatrix),
    Rows(&'a RowMatrix),
}

impl<'a> From<&'a DenseMatrix> for MatrixRef<'a> {
    fn from(m: &'a DenseMatrix) -> Self {
        MatrixRef::Dense(m)
    }
}

impl<'a> From<&'a RowMatrix> for MatrixRef<'a> {
    fn from(m: &'a RowMatrix) -> Self {
        MatrixRef::Rows(m)
    }
}

impl<'a> From<&'a Matrix> for MatrixRef<'a> {
    fn from(m: &'a Matrix) -> Self {
        match m {
            Matrix::Dense(d) => MatrixRef::Dense(d),
            Matrix::Rows(r) => MatrixRef::Rows(r),
        }
    }
}

impl<'a> MatrixRef<'a> {
    pub fn dim1(self) -> usize {
        match self {
            MatrixRef::Dense(d) => d.dim1(),
            MatrixRef::Rows(r) => r.dim1(),
        }
    }

    pub fn dim2(self) -> usize {
        match self {
            MatrixRef::Dense(d) => d.dim2(),
            MatrixRef::Rows(r) => r.dim2(),
        }
    }

    pub fn shape(self) -> (usize, usize) {
        (self.dim1(), self.dim2())
    }

    #[track_caller]
    pub fn get(self, i: usize, j: usize) -> f64 {
        check_entry(i, j, self.shape());
        self.row(i).get(j)
    }

    #[track_caller]
    pub fn row(self, i: usize) -> RowView<'a> {
        check_row(i, self.dim1());
        match self {
            MatrixRef::Dense(d) => RowView::Dense(d.elements.row(i)),
            MatrixRef::Rows(r) => RowView::Vector(&r.rows[i]),
        }
    }

    /// Copy of column `j`.
    #[track_caller]
    pub fn column(self, j: usize) -> DenseVector {
        assert!(j < self.dim2(), "Column {j} out of bounds for matrix with {} columns", self.dim2());
        match self {
            MatrixRef::Dense(d) => DenseVector::from_view(d.elements.column(j)),
            MatrixRef::Rows(r) => DenseVector::from_vec(r.rows.iter().map(|v| v.get(j)).collect()),
        }
    }

    /// `W·x`: one output per row.
    pub fn left_multiply(self, vector: &Vector) -> TensorResult<DenseVector> {
        if vector.size() != self.dim2() {
            return Err(TensorError::VectorDimMismatch {
                op: "left_multiply",
                expected: self.dim2(),
                found: vector.size(),
            });
        }
        if let (MatrixRef::Dense(d), Vector::Dense(x)) = (self, vector) {
            return Ok(DenseVector::from_array(d.elements.dot(x.as_array())));
        }
        let x = RowView::Vector(vector);
        let out: Array1<f64> = (0..self.dim1()).map(|i| self.row(i).dot(&x)).collect();
        Ok(DenseVector::from_array(out))
    }

    /// `xᵀ·W`: one output per column.
    pub fn right_multiply(self, vector: &Vector) -> TensorResult<DenseVector> {
        if vector.size() != self.dim1() {
            return Err(TensorError::VectorDimMismatch {
                op: "right_multiply",
                expected: self.dim1(),
                found: vector.size(),
            });
        }
        let mut out = DenseVector::zeros(self.dim2());
        for (i, x) in vector.iter() {
            self.row(i).axpy_into(x, out.view_mut());
        }
        Ok(out)
    }

    /// Per-row fold of `op(m[i][j])` over every logical column, implicit
    /// zeros included, as `state = reduction(op(value), state)`.
    pub fn reduce_rows(
        self, initial: f64, op: impl Fn(f64) -> f64, reduction: impl Fn(f64, f64) -> f64,
    ) -> DenseVector {
        let dim2 = self.dim2();
        let out: Array1<f64> = (0..self.dim1())
            .map(|i| {
                let mut state = initial;
                let mut next = 0;
                for (j, v) in self.row(i).iter() {
                    for _ in next..j {
                        state = reduction(op(0.0), state);
                    }
                    state = reduction(op(v), state);
                    next = j + 1;
                }
                for _ in next..dim2 {
                    state = reduction(op(0.0), state);
                }
                state
            })
            .collect();
        DenseVector::from_array(out)
    }

    pub fn row_sum(self) -> DenseVector {
        let out: Array1<f64> =
            (0..self.dim1()).map(|i| self.row(i).iter().map(|(_, v)| v).sum::<f64>()).collect();
        DenseVector::from_array(out)
    }

    pub fn column_sum(self) -> DenseVector {
        let mut out = DenseVector::zeros(self.dim2());
        for i in 0..self.dim1() {
            self.row(i).axpy_into(1.0, out.view_mut());
        }
        out
    }

    pub fn two_norm(self) -> f64 {
        self.iter().map(|(_, _, v)| v * v).sum::<f64>().sqrt()
    }

    /// Arg-max column of every row; rows of a zero-column matrix report 0.
    pub fn index_of_row_max(self) -> Vec<usize> {
        (0..self.dim1()).map(|i| self.row(i).index_of_max().unwrap_or(0)).collect()
    }

    pub fn densify(self) -> DenseMatrix {
        match self {
            MatrixRef::Dense(d) => d.clone(),
            MatrixRef::Rows(r) => {
                let mut out = DenseMatrix::zeros(r.dim1(), r.dim2());
                for (i, row) in r.rows.iter().enumerate() {
                    let mut target = out.elements.row_mut(i);
                    for (j, v) in row.iter() {
                        target[j] = v;
                    }
                }
                out
            }
        }
    }

    /// Active `(row, column, value)` triples in row-major order.
    pub fn iter(self) -> MatrixIter<'a> {
        MatrixIter { matrix: self, row: 0, current: None }
    }
}

// ---- Closed variant -------------------------------------------------------

/// A matrix that is either dense or an array of row vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Matrix {
    Dense(DenseMatrix),
    Rows(RowMatrix),
}

impl From<DenseMatrix> for Matrix {
    fn from(m: DenseMatrix) -> Self {
        Matrix::Dense(m)
    }
}

impl From<RowMatrix> for Matrix {
    fn from(m: RowMatrix) -> Self {
        Matrix::Rows(m)
    }
}

impl Matrix {
    /// Stack the first `length` vectors into a matrix.
    ///
    /// All-dense input yields a dense matrix; otherwise every row is stored
    /// sparse. The vectors are consumed, so no row is copied more than once.
    ///
    /// # Errors
    /// - [`TensorError::InvalidAggregate`] if `length` is zero or exceeds the
    ///   number of vectors supplied.
    /// - [`TensorError::SizeMismatch`] if the vectors disagree on size.
    pub fn aggregate(mut vectors: Vec<Vector>, length: usize) -> TensorResult<Matrix> {
        if length == 0 || length > vectors.len() {
            return Err(TensorError::InvalidAggregate {
                reason: format!("length {length} invalid for {} vectors", vectors.len()),
            });
        }
        vectors.truncate(length);
        let dim2 = vectors[0].size();
        if let Some(bad) = vectors.iter().find(|v| v.size() != dim2) {
            return Err(TensorError::SizeMismatch { expected: dim2, found: bad.size() });
        }

        if vectors.iter().all(|v| !v.is_sparse()) {
            let mut elements = Array2::zeros((length, dim2));
            for (mut target, v) in elements.rows_mut().into_iter().zip(&vectors) {
                if let Vector::Dense(d) = v {
                    target.assign(d.as_array());
                }
            }
            return Ok(Matrix::Dense(DenseMatrix::from_array(elements)));
        }

        let rows = vectors
            .into_iter()
            .map(|v| match v {
                Vector::Dense(d) => Vector::Sparse(SparseVector::from_dense(&d)),
                sparse => sparse,
            })
            .collect();
        Ok(Matrix::Rows(RowMatrix { rows, dim2 }))
    }

    pub fn as_ref(&self) -> MatrixRef<'_> {
        MatrixRef::from(self)
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, Matrix::Dense(_))
    }

    pub fn dim1(&self) -> usize {
        self.as_ref().dim1()
    }

    pub fn dim2(&self) -> usize {
        self.as_ref().dim2()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.as_ref().shape()
    }

    #[track_caller]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.as_ref().get(i, j)
    }

    /// Write entry `(i, j)`. On a sparse row an inactive column becomes
    /// active, inserted in sorted position.
    ///
    /// # Panics
    /// If `(i, j)` lies outside `shape()`.
    #[track_caller]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        match self {
            Matrix::Dense(d) => d.set(i, j, value),
            Matrix::Rows(r) => {
                check_entry(i, j, (r.dim1(), r.dim2));
                r.rows[i].set(j, value);
            }
        }
    }

    /// `self[i, j] += value`, activating the entry on a sparse row.
    ///
    /// # Panics
    /// If `(i, j)` lies outside `shape()`.
    #[track_caller]
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        match self {
            Matrix::Dense(d) => d.add(i, j, value),
            Matrix::Rows(r) => {
                check_entry(i, j, (r.dim1(), r.dim2));
                r.rows[i].add(j, value);
            }
        }
    }

    #[track_caller]
    pub fn row(&self, i: usize) -> RowView<'_> {
        self.as_ref().row(i)
    }

    pub fn column(&self, j: usize) -> DenseVector {
        self.as_ref().column(j)
    }

    #[track_caller]
    pub fn num_active_elements(&self, row: usize) -> usize {
        self.row(row).num_active_elements()
    }

    pub fn left_multiply(&self, vector: &Vector) -> TensorResult<DenseVector> {
        self.as_ref().left_multiply(vector)
    }

    pub fn right_multiply(&self, vector: &Vector) -> TensorResult<DenseVector> {
        self.as_ref().right_multiply(vector)
    }

    pub fn row_scale_in_place(&mut self, scales: &DenseVector) -> TensorResult<()> {
        match self {
            Matrix::Dense(d) => d.row_scale_in_place(scales),
            Matrix::Rows(r) => r.row_scale_in_place(scales),
        }
    }

    pub fn reduce_rows(
        &self, initial: f64, op: impl Fn(f64) -> f64, reduction: impl Fn(f64, f64) -> f64,
    ) -> DenseVector {
        self.as_ref().reduce_rows(initial, op, reduction)
    }

    pub fn row_sum(&self) -> DenseVector {
        self.as_ref().row_sum()
    }

    pub fn column_sum(&self) -> DenseVector {
        self.as_ref().column_sum()
    }

    pub fn intersect_and_add_in_place(
        &mut self, other: &Matrix, f: impl Fn(f64) -> f64,
    ) -> TensorResult<()> {
        match self {
            Matrix::Dense(d) => d.intersect_and_add_in_place(other, f),
            Matrix::Rows(r) => r.intersect_and_add_in_place(other, f),
        }
    }

    pub fn hadamard_product_in_place(
        &mut self, other: &Matrix, f: impl Fn(f64) -> f64,
    ) -> TensorResult<()> {
        match self {
            Matrix::Dense(d) => d.hadamard_product_in_place(other, f),
            Matrix::Rows(r) => r.hadamard_product_in_place(other, f),
        }
    }

    /// Apply `f` to every active entry.
    pub fn foreach_in_place(&mut self, f: impl Fn(f64) -> f64) {
        match self {
            Matrix::Dense(d) => d.foreach_in_place(f),
            Matrix::Rows(r) => r.rows.iter_mut().for_each(|row| row.foreach_in_place(&f)),
        }
    }

    pub fn scale_in_place(&mut self, coefficient: f64) {
        match self {
            Matrix::Dense(d) => d.scale_in_place(coefficient),
            Matrix::Rows(r) => r.rows.iter_mut().for_each(|row| row.scale_in_place(coefficient)),
        }
    }

    pub fn two_norm(&self) -> f64 {
        self.as_ref().two_norm()
    }

    pub fn index_of_row_max(&self) -> Vec<usize> {
        self.as_ref().index_of_row_max()
    }

    pub fn normalize_rows(&mut self, normalizer: &impl VectorNormalizer) {
        match self {
            Matrix::Dense(d) => d.normalize_rows(normalizer),
            Matrix::Rows(r) => r.rows.iter_mut().for_each(|row| row.normalize(normalizer)),
        }
    }

    pub fn densify(&self) -> DenseMatrix {
        self.as_ref().densify()
    }

    pub fn iter(&self) -> MatrixIter<'_> {
        self.as_ref().iter()
    }
}

// ---- Iteration ------------------------------------------------------------

/// Iterator over active `(row, column, value)` triples.
pub struct MatrixIter<'a> {
    matrix: MatrixRef<'a>,
    row: usize,
    current: Option<VectorIter<'a>>,
}

impl Iterator for MatrixIter<'_> {
    type Item = (usize, usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        while self.row < self.matrix.dim1() {
            let (matrix, row) = (self.matrix, self.row);
            let entries = self.current.get_or_insert_with(|| matrix.row(row).iter());
            if let Some((j, v)) = entries.next() {
                return Some((row, j, v));
            }
            self.current = None;
            self.row += 1;
        }
        None
    }
}

// ---- Logical equality -----------------------------------------------------

fn logical_eq(a: MatrixRef<'_>, b: MatrixRef<'_>) -> bool {
    a.shape() == b.shape()
        && a.iter().filter(|e| e.2 != 0.0).eq(b.iter().filter(|e| e.2 != 0.0))
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        logical_eq(self.as_ref(), other.as_ref())
    }
}

impl PartialEq for DenseMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl PartialEq for RowMatrix {
    fn eq(&self, other: &Self) -> bool {
        logical_eq(MatrixRef::Rows(self), MatrixRef::Rows(other))
    }
}

impl Hash for Matrix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shape().hash(state);
        for (i, j, v) in self.iter().filter(|e| e.2 != 0.0) {
            (i, j).hash(state);
            v.to_bits().hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn sparse(size: usize, entries: &[(usize, f64)]) -> Vector {
        let (i, v) = entries.iter().copied().unzip();
        Vector::Sparse(SparseVector::new(size, i, v).expect("valid sparse vector"))
    }

    fn dense_fixture() -> Matrix {
        Matrix::Dense(DenseMatrix::from_array(array![[1.0, 0.0, 2.0], [0.0, -3.0, 4.0]]))
    }

    fn rows_fixture() -> Matrix {
        let rows = vec![sparse(3, &[(0, 1.0), (2, 2.0)]), sparse(3, &[(1, -3.0), (2, 4.0)])];
        Matrix::Rows(RowMatrix::new(rows, 3).unwrap())
    }

    #[test]
    // Purpose
    // -------
    // A dense matrix and its row-matrix equivalent are logically equal and
    // agree on every read-only operation.
    fn dense_and_row_storage_agree() {
        let d = dense_fixture();
        let r = rows_fixture();
        assert_eq!(d, r);
        assert_eq!(r.densify(), d.densify());
        assert_eq!(d.column(2).to_vec(), r.column(2).to_vec());
        assert_eq!(d.row_sum().to_vec(), r.row_sum().to_vec());
        assert_eq!(d.column_sum().to_vec(), vec![1.0, -3.0, 6.0]);
        assert_eq!(r.column_sum().to_vec(), vec![1.0, -3.0, 6.0]);
        assert_relative_eq!(d.two_norm(), r.two_norm());
        assert_eq!(d.index_of_row_max(), vec![2, 2]);
        assert_eq!(r.index_of_row_max(), vec![2, 2]);
        assert_eq!(r.num_active_elements(0), 2);
        assert_eq!(d.num_active_elements(0), 3);
    }

    #[test]
    // Purpose
    // -------
    // Row dot products agree whichever side holds the dense row.
    fn row_dots_are_symmetric_across_storage() {
        let d = dense_fixture();
        let r = rows_fixture();
        for i in 0..2 {
            for j in 0..2 {
                let dense_first = d.row(i).dot(&r.row(j));
                let rows_first = r.row(j).dot(&d.row(i));
                assert_relative_eq!(dense_first, rows_first);
                assert_relative_eq!(dense_first, d.row(i).dot(&d.row(j)));
            }
        }
        assert_relative_eq!(d.row(0).dot(&r.row(1)), 8.0);
    }

    #[test]
    // Purpose
    // -------
    // Deserialized row matrices are checked like `RowMatrix::new`.
    //
    // Given
    // -----
    // - A row of size 2 declared under `dim2 = 3`, and a well-formed matrix.
    //
    // Expect
    // ------
    // - The mismatched row is rejected; the valid matrix round-trips equal.
    fn row_matrix_deserialization_checks_row_sizes() {
        // Arrange
        let bad = r#"{"rows":[{"Sparse":{"size":2,"indices":[],"values":[]}}],"dim2":3}"#;
        let Matrix::Rows(good) = rows_fixture() else { unreachable!() };
        let json = serde_json::to_string(&good).unwrap();

        // Act
        let rejected = serde_json::from_str::<RowMatrix>(bad);
        let restored: RowMatrix = serde_json::from_str(&json).unwrap();

        // Assert
        assert!(rejected.is_err());
        assert_eq!(Matrix::Rows(restored), rows_fixture());
    }

    #[test]
    fn left_and_right_multiply() {
        let x = Vector::dense(vec![1.0, 2.0, 3.0]);
        let y = sparse(2, &[(1, 2.0)]);
        for m in [dense_fixture(), rows_fixture()] {
            assert_eq!(m.left_multiply(&x).unwrap().to_vec(), vec![7.0, 6.0]);
            assert_eq!(m.right_multiply(&y).unwrap().to_vec(), vec![0.0, -6.0, 8.0]);
            assert!(m.left_multiply(&y).is_err());
        }
    }

    #[test]
    // Purpose
    // -------
    // `reduce_rows` folds every logical column, including implicit zeros.
    fn reduce_rows_sees_implicit_zeros() {
        let r = rows_fixture();
        let counts = r.reduce_rows(0.0, |_| 1.0, |x, acc| x + acc);
        assert_eq!(counts.to_vec(), vec![3.0, 3.0]);
        let min = r.reduce_rows(f64::INFINITY, |v| v, f64::min);
        assert_eq!(min.to_vec(), vec![0.0, -3.0]);
    }

    #[test]
    fn row_scale_and_intersect_add() {
        let mut d = dense_fixture();
        d.row_scale_in_place(&DenseVector::from_vec(vec![2.0, 0.5])).unwrap();
        assert_eq!(d.row(1).get(1), -1.5);

        let mut r = rows_fixture();
        r.intersect_and_add_in_place(&dense_fixture(), |v| v).unwrap();
        assert_eq!(r.densify().into_array(), array![[2.0, 0.0, 4.0], [0.0, -6.0, 8.0]]);

        let mut wrong = Matrix::Dense(DenseMatrix::zeros(3, 3));
        let err = wrong.intersect_and_add_in_place(&r, |v| v).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { this: (3, 3), other: (2, 3), .. }));
    }

    #[test]
    fn aggregate_picks_storage_and_validates() {
        let dense = vec![Vector::dense(vec![1.0, 2.0]), Vector::dense(vec![3.0, 4.0])];
        assert!(Matrix::aggregate(dense.clone(), 2).unwrap().is_dense());
        assert_eq!(Matrix::aggregate(dense.clone(), 1).unwrap().shape(), (1, 2));
        assert!(Matrix::aggregate(dense.clone(), 0).is_err());
        assert!(Matrix::aggregate(dense, 3).is_err());

        let mixed = vec![Vector::dense(vec![1.0, 0.0]), sparse(2, &[(1, 5.0)])];
        let m = Matrix::aggregate(mixed, 2).unwrap();
        assert!(!m.is_dense());
        assert_eq!(m.num_active_elements(0), 1);

        let uneven = vec![Vector::dense(vec![1.0]), Vector::dense(vec![1.0, 2.0])];
        assert!(Matrix::aggregate(uneven, 2).is_err());
    }

    #[test]
    fn outer_product_shape_and_values() {
        let a = Vector::dense(vec![1.0, 2.0]);
        let b = sparse(3, &[(2, 3.0)]);
        let o = a.outer(&b);
        assert_eq!(o.shape(), (2, 3));
        assert_eq!(o.into_array(), array![[0.0, 0.0, 3.0], [0.0, 0.0, 6.0]]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn out_of_range_entry_panics() {
        let _ = dense_fixture().get(2, 0);
    }
}
