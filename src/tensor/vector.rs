//! tensor::vector — dense and sparse 1-D containers.
//!
//! Purpose
//! -------
//! Provide the vector half of the tensor algebra layer: a dense vector backed
//! by `ndarray::Array1<f64>`, a sparse vector holding parallel sorted
//! index/value arrays, and the closed [`Vector`] variant that dispatches
//! between them.
//!
//! Key behaviors
//! -------------
//! - Element access (`get`, `set`, `add`) with fail-fast bounds checks.
//! - Inner products that stay proportional to the number of active entries:
//!   sparse·sparse walks the index intersection, dense·sparse walks the
//!   sparse side.
//! - In-place combination with an element-wise function restricted to the
//!   active entries of the other operand (`intersect_and_add_in_place`,
//!   `hadamard_product_in_place`).
//! - Ascending `(index, value)` iteration over active entries.
//!
//! Invariants & assumptions
//! ------------------------
//! - Sparse indices are strictly increasing, unique and `< size`. An entry
//!   may be active and hold an explicit zero.
//! - Operations on two vectors require equal `size`; mismatches are reported
//!   as [`TensorError::SizeMismatch`].
//! - Out-of-range indices panic: they are programming errors, not data
//!   errors.
//!
//! Conventions
//! -----------
//! - Equality and hashing are defined over the logical content (non-zero
//!   `(index, value)` pairs), so a dense vector and its sparse equivalent
//!   compare equal.
use std::hash::{Hash, Hasher};

use ndarray::{Array1, ArrayView1, ArrayViewMut1, Ix1};
use serde::{Deserialize, Serialize};

use crate::tensor::{
    errors::{TensorError, TensorResult},
    matrix::DenseMatrix,
    normalizer::VectorNormalizer,
};

#[inline]
#[track_caller]
fn check_index(index: usize, size: usize) {
    assert!(index < size, "Index {index} out of bounds for vector of size {size}");
}

#[inline]
fn check_sizes(expected: usize, found: usize) -> TensorResult<()> {
    if expected != found {
        return Err(TensorError::SizeMismatch { expected, found });
    }
    Ok(())
}

// ---- Dense ----------------------------------------------------------------

/// Contiguous vector of `f64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseVector {
    elements: Array1<f64>,
}

impl DenseVector {
    /// A zero vector of the given size.
    pub fn zeros(size: usize) -> Self {
        Self { elements: Array1::zeros(size) }
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Self { elements: Array1::from(values) }
    }

    pub fn from_array(elements: Array1<f64>) -> Self {
        Self { elements }
    }

    pub fn from_view(view: ArrayView1<'_, f64>) -> Self {
        Self { elements: view.to_owned() }
    }

    pub fn size(&self) -> usize {
        self.elements.len()
    }

    #[track_caller]
    pub fn get(&self, index: usize) -> f64 {
        check_index(index, self.size());
        self.elements[index]
    }

    #[track_caller]
    pub fn set(&mut self, index: usize, value: f64) {
        check_index(index, self.size());
        self.elements[index] = value;
    }

    #[track_caller]
    pub fn add(&mut self, index: usize, value: f64) {
        check_index(index, self.size());
        self.elements[index] += value;
    }

    pub fn as_array(&self) -> &Array1<f64> {
        &self.elements
    }

    pub fn as_array_mut(&mut self) -> &mut Array1<f64> {
        &mut self.elements
    }

    pub fn into_array(self) -> Array1<f64> {
        self.elements
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        self.elements.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut1<'_, f64> {
        self.elements.view_mut()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.elements.to_vec()
    }

    pub fn iter(&self) -> VectorIter<'_> {
        VectorIter::Dense(self.elements.iter().enumerate())
    }

    /// Inner product against any vector.
    pub fn dot(&self, other: &Vector) -> TensorResult<f64> {
        check_sizes(self.size(), other.size())?;
        Ok(match other {
            Vector::Dense(d) => self.elements.dot(&d.elements),
            Vector::Sparse(s) => s.iter().map(|(i, v)| v * self.elements[i]).sum(),
        })
    }

    /// Inner product against another dense vector.
    pub fn dot_dense(&self, other: &DenseVector) -> TensorResult<f64> {
        check_sizes(self.size(), other.size())?;
        Ok(self.elements.dot(&other.elements))
    }

    /// `self += alpha * other`.
    ///
    /// # Errors
    /// [`TensorError::SizeMismatch`] if the sizes differ.
    pub fn scaled_add(&mut self, alpha: f64, other: &DenseVector) -> TensorResult<()> {
        check_sizes(self.size(), other.size())?;
        self.elements.scaled_add(alpha, &other.elements);
        Ok(())
    }

    pub fn scale(&self, coefficient: f64) -> DenseVector {
        DenseVector { elements: &self.elements * coefficient }
    }

    pub fn scale_in_place(&mut self, coefficient: f64) {
        self.elements *= coefficient;
    }

    pub fn foreach_in_place(&mut self, f: impl Fn(f64) -> f64) {
        self.elements.mapv_inplace(f);
    }

    /// `self[i] += f(other[i])` for every active index of `other`.
    pub fn intersect_and_add_in_place(
        &mut self, other: &Vector, f: impl Fn(f64) -> f64,
    ) -> TensorResult<()> {
        check_sizes(self.size(), other.size())?;
        match other {
            Vector::Dense(d) => self.elements.zip_mut_with(&d.elements, |a, &b| *a += f(b)),
            Vector::Sparse(s) => {
                for (i, v) in s.iter() {
                    self.elements[i] += f(v);
                }
            }
        }
        Ok(())
    }

    /// `self[i] *= f(other[i])` for every active index of `other`.
    pub fn hadamard_product_in_place(
        &mut self, other: &Vector, f: impl Fn(f64) -> f64,
    ) -> TensorResult<()> {
        check_sizes(self.size(), other.size())?;
        match other {
            Vector::Dense(d) => self.elements.zip_mut_with(&d.elements, |a, &b| *a *= f(b)),
            Vector::Sparse(s) => {
                for (i, v) in s.iter() {
                    self.elements[i] *= f(v);
                }
            }
        }
        Ok(())
    }

    /// Element-wise `self - other` as a new dense vector.
    pub fn subtract(&self, other: &Vector) -> TensorResult<DenseVector> {
        let mut out = self.clone();
        out.intersect_and_add_in_place(other, |v| -v)?;
        Ok(out)
    }

    pub fn sum(&self) -> f64 {
        self.elements.sum()
    }

    pub fn two_norm(&self) -> f64 {
        self.elements.dot(&self.elements).sqrt()
    }

    /// Left-to-right fold of `op(x_i)` into `initial` using `reduction(transformed, state)`.
    pub fn reduce(
        &self, initial: f64, op: impl Fn(f64) -> f64, reduction: impl Fn(f64, f64) -> f64,
    ) -> f64 {
        self.elements.iter().fold(initial, |acc, &v| reduction(op(v), acc))
    }

    /// Index of the maximum element (first one on ties), `None` when empty.
    pub fn index_of_max(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.elements.iter().enumerate() {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn normalize(&mut self, normalizer: &impl VectorNormalizer) {
        normalizer.normalize_in_place(self.elements.view_mut());
    }

    /// Rank-1 product `self ⊗ other` with `self` as the column.
    pub fn outer(&self, other: &Vector) -> DenseMatrix {
        DenseMatrix::outer(&Vector::Dense(self.clone()), other)
    }
}

// ---- Sparse ---------------------------------------------------------------

/// Sparse vector with sorted parallel index/value arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawSparseVector")]
pub struct SparseVector {
    size: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

/// Unchecked wire form of [`SparseVector`]; deserialization goes through
/// [`SparseVector::new`].
#[derive(Deserialize)]
struct RawSparseVector {
    size: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl TryFrom<RawSparseVector> for SparseVector {
    type Error = TensorError;

    fn try_from(raw: RawSparseVector) -> TensorResult<Self> {
        SparseVector::new(raw.size, raw.indices, raw.values)
    }
}

impl SparseVector {
    /// Build a sparse vector, validating the index invariants.
    ///
    /// # Errors
    /// - [`TensorError::SizeMismatch`] if `indices` and `values` differ in length.
    /// - [`TensorError::InvalidSparseIndices`] if indices are not strictly
    ///   increasing or exceed `size`.
    pub fn new(size: usize, indices: Vec<usize>, values: Vec<f64>) -> TensorResult<Self> {
        check_sizes(indices.len(), values.len())?;
        if indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TensorError::InvalidSparseIndices {
                reason: "indices must be strictly increasing",
            });
        }
        if indices.last().is_some_and(|&last| last >= size) {
            return Err(TensorError::InvalidSparseIndices {
                reason: "indices must be smaller than the vector size",
            });
        }
        Ok(Self { size, indices, values })
    }

    /// An all-inactive vector.
    pub fn empty(size: usize) -> Self {
        Self { size, indices: Vec::new(), values: Vec::new() }
    }

    /// Sparse copy of the non-zero entries of a dense vector.
    pub fn from_dense(dense: &DenseVector) -> Self {
        let (indices, values) = dense.iter().filter(|&(_, v)| v != 0.0).unzip();
        Self { size: dense.size(), indices, values }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_active_elements(&self) -> usize {
        self.indices.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    #[track_caller]
    pub fn get(&self, index: usize) -> f64 {
        check_index(index, self.size);
        match self.indices.binary_search(&index) {
            Ok(k) => self.values[k],
            Err(_) => 0.0,
        }
    }

    /// Set an element, inserting the index if it was inactive.
    #[track_caller]
    pub fn set(&mut self, index: usize, value: f64) {
        check_index(index, self.size);
        match self.indices.binary_search(&index) {
            Ok(k) => self.values[k] = value,
            Err(k) => {
                self.indices.insert(k, index);
                self.values.insert(k, value);
            }
        }
    }

    #[track_caller]
    pub fn add(&mut self, index: usize, value: f64) {
        check_index(index, self.size);
        match self.indices.binary_search(&index) {
            Ok(k) => self.values[k] += value,
            Err(k) => {
                self.indices.insert(k, index);
                self.values.insert(k, value);
            }
        }
    }

    pub fn iter(&self) -> VectorIter<'_> {
        VectorIter::Sparse(self.indices.iter().zip(self.values.iter()))
    }

    pub fn densify(&self) -> DenseVector {
        let mut out = DenseVector::zeros(self.size);
        for (i, v) in self.iter() {
            out.elements[i] = v;
        }
        out
    }

    /// Merge ascending `entries` into this vector: matching indices receive
    /// `f(value)` added, new indices are inserted with `f(value)`.
    fn merge_add<I>(&mut self, entries: I, f: impl Fn(f64) -> f64)
    where
        I: Iterator<Item = (usize, f64)>,
    {
        let mut indices = Vec::with_capacity(self.indices.len());
        let mut values = Vec::with_capacity(self.values.len());
        let mut k = 0;
        for (j, v) in entries {
            while k < self.indices.len() && self.indices[k] < j {
                indices.push(self.indices[k]);
                values.push(self.values[k]);
                k += 1;
            }
            if k < self.indices.len() && self.indices[k] == j {
                indices.push(j);
                values.push(self.values[k] + f(v));
                k += 1;
            } else {
                indices.push(j);
                values.push(f(v));
            }
        }
        indices.extend_from_slice(&self.indices[k..]);
        values.extend_from_slice(&self.values[k..]);
        self.indices = indices;
        self.values = values;
    }

    /// Multiply active entries by `f(value)` for every matching entry in `entries`.
    fn intersect_multiply<I>(&mut self, entries: I, f: impl Fn(f64) -> f64)
    where
        I: Iterator<Item = (usize, f64)>,
    {
        for (j, v) in entries {
            if let Ok(k) = self.indices.binary_search(&j) {
                self.values[k] *= f(v);
            }
        }
    }
}

// ---- Closed variant -------------------------------------------------------

/// A vector that is either dense or sparse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Vector {
    Dense(DenseVector),
    Sparse(SparseVector),
}

impl From<DenseVector> for Vector {
    fn from(v: DenseVector) -> Self {
        Vector::Dense(v)
    }
}

impl From<SparseVector> for Vector {
    fn from(v: SparseVector) -> Self {
        Vector::Sparse(v)
    }
}

impl Vector {
    pub fn dense(values: Vec<f64>) -> Self {
        Vector::Dense(DenseVector::from_vec(values))
    }

    pub fn size(&self) -> usize {
        match self {
            Vector::Dense(d) => d.size(),
            Vector::Sparse(s) => s.size(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Vector::Sparse(_))
    }

    pub fn num_active_elements(&self) -> usize {
        match self {
            Vector::Dense(d) => d.size(),
            Vector::Sparse(s) => s.num_active_elements(),
        }
    }

    #[track_caller]
    pub fn get(&self, index: usize) -> f64 {
        match self {
            Vector::Dense(d) => d.get(index),
            Vector::Sparse(s) => s.get(index),
        }
    }

    #[track_caller]
    pub fn set(&mut self, index: usize, value: f64) {
        match self {
            Vector::Dense(d) => d.set(index, value),
            Vector::Sparse(s) => s.set(index, value),
        }
    }

    #[track_caller]
    pub fn add(&mut self, index: usize, value: f64) {
        match self {
            Vector::Dense(d) => d.add(index, value),
            Vector::Sparse(s) => s.add(index, value),
        }
    }

    /// Active `(index, value)` pairs in ascending index order.
    pub fn iter(&self) -> VectorIter<'_> {
        match self {
            Vector::Dense(d) => d.iter(),
            Vector::Sparse(s) => s.iter(),
        }
    }

    /// Inner product.
    ///
    /// # Errors
    /// [`TensorError::SizeMismatch`] when the sizes differ.
    pub fn dot(&self, other: &Vector) -> TensorResult<f64> {
        match (self, other) {
            (Vector::Dense(a), _) => a.dot(other),
            (Vector::Sparse(_), Vector::Dense(b)) => b.dot(self),
            (Vector::Sparse(a), Vector::Sparse(b)) => {
                check_sizes(a.size(), b.size())?;
                Ok(sparse_dot(a, b))
            }
        }
    }

    pub fn scale(&self, coefficient: f64) -> Vector {
        let mut out = self.clone();
        out.scale_in_place(coefficient);
        out
    }

    /// Multiply every active entry by `coefficient`; inactive entries stay zero.
    pub fn scale_in_place(&mut self, coefficient: f64) {
        match self {
            Vector::Dense(d) => d.scale_in_place(coefficient),
            Vector::Sparse(s) => s.values.iter_mut().for_each(|v| *v *= coefficient),
        }
    }

    pub fn foreach_in_place(&mut self, f: impl Fn(f64) -> f64) {
        match self {
            Vector::Dense(d) => d.foreach_in_place(f),
            Vector::Sparse(s) => s.values.iter_mut().for_each(|v| *v = f(*v)),
        }
    }

    /// `self[i] += f(other[i])` for every active index of `other`.
    ///
    /// A sparse receiver grows structurally to hold indices it did not have.
    pub fn intersect_and_add_in_place(
        &mut self, other: &Vector, f: impl Fn(f64) -> f64,
    ) -> TensorResult<()> {
        check_sizes(self.size(), other.size())?;
        self.intersect_and_add_entries(other.iter(), f);
        Ok(())
    }

    /// Unchecked form used by the matrix layer; `entries` must be ascending and in range.
    pub(crate) fn intersect_and_add_entries<I>(&mut self, entries: I, f: impl Fn(f64) -> f64)
    where
        I: Iterator<Item = (usize, f64)>,
    {
        match self {
            Vector::Dense(d) => {
                for (i, v) in entries {
                    d.elements[i] += f(v);
                }
            }
            Vector::Sparse(s) => s.merge_add(entries, f),
        }
    }

    /// `self[i] *= f(other[i])` for every active index of `other`.
    pub fn hadamard_product_in_place(
        &mut self, other: &Vector, f: impl Fn(f64) -> f64,
    ) -> TensorResult<()> {
        check_sizes(self.size(), other.size())?;
        self.hadamard_entries(other.iter(), f);
        Ok(())
    }

    pub(crate) fn hadamard_entries<I>(&mut self, entries: I, f: impl Fn(f64) -> f64)
    where
        I: Iterator<Item = (usize, f64)>,
    {
        match self {
            Vector::Dense(d) => {
                for (i, v) in entries {
                    d.elements[i] *= f(v);
                }
            }
            Vector::Sparse(s) => s.intersect_multiply(entries, f),
        }
    }

    /// Element-wise `self - other`; dense unless both operands are sparse.
    pub fn subtract(&self, other: &Vector) -> TensorResult<Vector> {
        match (self, other) {
            (Vector::Sparse(_), Vector::Sparse(_)) => {
                let mut out = self.clone();
                out.intersect_and_add_in_place(other, |v| -v)?;
                Ok(out)
            }
            _ => {
                let mut out = self.densify();
                out.intersect_and_add_in_place(other, |v| -v)?;
                Ok(Vector::Dense(out))
            }
        }
    }

    /// Element-wise `self + other`; dense unless both operands are sparse.
    pub fn add_vector(&self, other: &Vector) -> TensorResult<Vector> {
        let mut out = match (self, other) {
            (Vector::Sparse(_), Vector::Sparse(_)) => self.clone(),
            _ => Vector::Dense(self.densify()),
        };
        out.intersect_and_add_in_place(other, |v| v)?;
        Ok(out)
    }

    pub fn sum(&self) -> f64 {
        match self {
            Vector::Dense(d) => d.sum(),
            Vector::Sparse(s) => s.values.iter().sum(),
        }
    }

    pub fn two_norm(&self) -> f64 {
        match self {
            Vector::Dense(d) => d.two_norm(),
            Vector::Sparse(s) => s.values.iter().map(|v| v * v).sum::<f64>().sqrt(),
        }
    }

    /// Index of the maximum logical element (first one on ties).
    ///
    /// For a sparse vector an inactive slot counts as zero, so an all-negative
    /// active set yields the first inactive index.
    pub fn index_of_max(&self) -> Option<usize> {
        match self {
            Vector::Dense(d) => d.index_of_max(),
            Vector::Sparse(s) => {
                if s.size == 0 {
                    return None;
                }
                let mut best: Option<(usize, f64)> = None;
                let mut expected = 0;
                for (i, v) in s.iter() {
                    if expected < i && best.is_none_or(|(_, b)| b < 0.0) {
                        best = Some((expected, 0.0));
                    }
                    if best.is_none_or(|(bi, b)| v > b || (v == b && i < bi)) {
                        best = Some((i, v));
                    }
                    expected = i + 1;
                }
                if expected < s.size && best.is_none_or(|(_, b)| b < 0.0) {
                    best = Some((expected, 0.0));
                }
                best.map(|(i, _)| i)
            }
        }
    }

    /// Apply a normalizer in place (to the active values when sparse).
    pub fn normalize(&mut self, normalizer: &impl VectorNormalizer) {
        match self {
            Vector::Dense(d) => d.normalize(normalizer),
            Vector::Sparse(s) => {
                normalizer.normalize_in_place(ArrayViewMut1::from(s.values.as_mut_slice()))
            }
        }
    }

    pub fn densify(&self) -> DenseVector {
        match self {
            Vector::Dense(d) => d.clone(),
            Vector::Sparse(s) => s.densify(),
        }
    }

    /// Rank-1 product `self ⊗ other`, `self.size() × other.size()`.
    pub fn outer(&self, other: &Vector) -> DenseMatrix {
        DenseMatrix::outer(self, other)
    }
}

pub(crate) fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.indices.len() && j < b.indices.len() {
        match a.indices[i].cmp(&b.indices[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a.values[i] * b.values[j];
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

// ---- Iteration ------------------------------------------------------------

/// Iterator over active `(index, value)` pairs in ascending index order.
pub enum VectorIter<'a> {
    Dense(std::iter::Enumerate<ndarray::iter::Iter<'a, f64, Ix1>>),
    Sparse(std::iter::Zip<std::slice::Iter<'a, usize>, std::slice::Iter<'a, f64>>),
}

impl Iterator for VectorIter<'_> {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            VectorIter::Dense(it) => it.next().map(|(i, &v)| (i, v)),
            VectorIter::Sparse(it) => it.next().map(|(&i, &v)| (i, v)),
        }
    }
}

// ---- Logical equality -----------------------------------------------------

fn non_zero(iter: VectorIter<'_>) -> impl Iterator<Item = (usize, f64)> + '_ {
    iter.filter(|&(_, v)| v != 0.0)
}

impl PartialEq for Vector {
    fn eq(&self, other: &Self) -> bool {
        self.size() == other.size() && non_zero(self.iter()).eq(non_zero(other.iter()))
    }
}

impl Hash for Vector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.size().hash(state);
        for (i, v) in non_zero(self.iter()) {
            i.hash(state);
            v.to_bits().hash(state);
        }
    }
}

impl PartialEq for DenseVector {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl PartialEq for SparseVector {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && non_zero(self.iter()).eq(non_zero(other.iter()))
    }
}
