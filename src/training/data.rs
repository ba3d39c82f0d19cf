//! Validated training data for linear models.
//!
//! Purpose
//! -------
//! Hold everything a fit needs in the form the optimizer consumes: the
//! feature matrix with its constant-1 bias column appended, a target
//! structure matching one objective family, and per-example weights
//! normalized to sum to one.
//!
//! Key behaviors
//! -------------
//! - [`TrainingData::new`] validates shapes and finiteness once, so the
//!   loss closures never re-check them.
//! - Three target families implement [`Targets`]: [`ClassTargets`] (class
//!   ids for `LogMulticlass`), [`LabelTargets`] (0/1 matrix for
//!   `BinaryCrossEntropy`), [`RegressionTargets`] (real matrix for the
//!   regression losses).
//!
//! Invariants & assumptions
//! ------------------------
//! - `features()` has `num_features + 1` columns; the last is all ones.
//! - `weights()` sums to one; `weight_sum()` keeps the raw sum for the L2
//!   strength.
use log::info;
use ndarray::{Array1, Array2, ArrayView2, s};

use crate::{
    tensor::{DenseMatrix, DenseVector, Matrix, SparseVector, Vector},
    training::errors::{TrainError, TrainResult},
};

/// A target structure usable as the batch truth of an objective.
pub trait Targets {
    type Batch: ?Sized;

    /// Number of examples described.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of model outputs (classes, labels, or regression dimensions).
    fn num_outputs(&self) -> usize;

    fn batch(&self) -> &Self::Batch;
}

// ---- Classification ----

/// Class ids in `0..num_classes`, one per example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTargets {
    classes: Vec<usize>,
    num_classes: usize,
}

impl ClassTargets {
    /// # Errors
    /// - [`TrainError::NoOutputs`] if `num_classes == 0`.
    /// - [`TrainError::UnknownTarget`] for a `None` entry.
    /// - [`TrainError::ClassOutOfRange`] for an id `>= num_classes`.
    pub fn new(labels: Vec<Option<usize>>, num_classes: usize) -> TrainResult<Self> {
        if num_classes == 0 {
            return Err(TrainError::NoOutputs);
        }
        let classes = labels
            .into_iter()
            .enumerate()
            .map(|(index, label)| match label {
                None => Err(TrainError::UnknownTarget { index }),
                Some(class) if class >= num_classes => {
                    Err(TrainError::ClassOutOfRange { index, class, num_classes })
                }
                Some(class) => Ok(class),
            })
            .collect::<TrainResult<Vec<usize>>>()?;
        Ok(Self { classes, num_classes })
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }
}

impl Targets for ClassTargets {
    type Batch = [usize];

    fn len(&self) -> usize {
        self.classes.len()
    }

    fn num_outputs(&self) -> usize {
        self.num_classes
    }

    fn batch(&self) -> &[usize] {
        &self.classes
    }
}

// ---- Multi-label ----

/// Label sets as a 0/1 matrix (one row per example), stored row-sparse.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTargets {
    labels: Matrix,
}

impl LabelTargets {
    /// Build from the active label ids of each example.
    ///
    /// # Errors
    /// - [`TrainError::NoOutputs`] if `num_labels == 0`.
    /// - [`TrainError::ClassOutOfRange`] for a label id `>= num_labels`.
    pub fn from_label_sets(sets: &[Vec<usize>], num_labels: usize) -> TrainResult<Self> {
        if num_labels == 0 {
            return Err(TrainError::NoOutputs);
        }
        let mut rows = Vec::with_capacity(sets.len());
        for (index, set) in sets.iter().enumerate() {
            let mut row = SparseVector::empty(num_labels);
            for &label in set {
                if label >= num_labels {
                    return Err(TrainError::ClassOutOfRange {
                        index,
                        class: label,
                        num_classes: num_labels,
                    });
                }
                row.set(label, 1.0);
            }
            rows.push(Vector::Sparse(row));
        }
        if rows.is_empty() {
            return Err(TrainError::EmptyDataset);
        }
        let length = rows.len();
        Ok(Self { labels: Matrix::aggregate(rows, length)? })
    }

    /// Build from a dense 0/1 matrix.
    ///
    /// # Errors
    /// [`TrainError::InvalidLabel`] for any entry other than 0 or 1.
    pub fn from_matrix(labels: Array2<f64>) -> TrainResult<Self> {
        if labels.ncols() == 0 {
            return Err(TrainError::NoOutputs);
        }
        if let Some(((row, column), &value)) =
            labels.indexed_iter().find(|(_, v)| **v != 0.0 && **v != 1.0)
        {
            return Err(TrainError::InvalidLabel { row, column, value });
        }
        Ok(Self { labels: Matrix::Dense(DenseMatrix::from_array(labels)) })
    }
}

impl Targets for LabelTargets {
    type Batch = Matrix;

    fn len(&self) -> usize {
        self.labels.dim1()
    }

    fn num_outputs(&self) -> usize {
        self.labels.dim2()
    }

    fn batch(&self) -> &Matrix {
        &self.labels
    }
}

// ---- Regression ----

/// Real-valued targets, one row per example.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTargets {
    values: DenseMatrix,
}

impl RegressionTargets {
    /// # Errors
    /// [`TrainError::NonFiniteTarget`] for NaN/±inf entries.
    pub fn new(values: Array2<f64>) -> TrainResult<Self> {
        if values.ncols() == 0 {
            return Err(TrainError::NoOutputs);
        }
        if let Some(((row, column), &value)) = values.indexed_iter().find(|(_, v)| !v.is_finite())
        {
            return Err(TrainError::NonFiniteTarget { row, column, value });
        }
        Ok(Self { values: DenseMatrix::from_array(values) })
    }

    /// Single-output regression.
    pub fn from_column(values: Array1<f64>) -> TrainResult<Self> {
        let n = values.len();
        Self::new(values.into_shape((n, 1)).map_err(|_| TrainError::NoOutputs)?)
    }
}

impl Targets for RegressionTargets {
    type Batch = DenseMatrix;

    fn len(&self) -> usize {
        self.values.dim1()
    }

    fn num_outputs(&self) -> usize {
        self.values.dim2()
    }

    fn batch(&self) -> &DenseMatrix {
        &self.values
    }
}

// ---- Dataset ----

/// Append the constant-1 bias column.
pub fn with_bias_column(features: ArrayView2<'_, f64>) -> Array2<f64> {
    let (n, d) = features.dim();
    let mut out = Array2::ones((n, d + 1));
    out.slice_mut(s![.., ..d]).assign(&features);
    out
}

#[derive(Debug, Clone)]
pub struct TrainingData<T: Targets> {
    features: Matrix,
    targets: T,
    weights: DenseVector,
    weight_sum: f64,
    num_features: usize,
}

impl<T: Targets> TrainingData<T> {
    /// Construct validated training data.
    ///
    /// Parameters
    /// ----------
    /// - `features`: `Array2<f64>`
    ///   One row per example, without a bias column. Must be non-empty and
    ///   finite.
    /// - `targets`: `T`
    ///   One target per example.
    /// - `weights`: `Option<Array1<f64>>`
    ///   Per-example weights, finite and `>= 0` with a positive sum. `None`
    ///   weighs every example equally.
    ///
    /// Errors
    /// ------
    /// - `TrainError::EmptyDataset`, `TrainError::NonFiniteFeature`.
    /// - `TrainError::TargetCountMismatch`, `TrainError::WeightCountMismatch`.
    /// - `TrainError::InvalidWeight`, `TrainError::NonPositiveWeightSum`.
    pub fn new(features: Array2<f64>, targets: T, weights: Option<Array1<f64>>) -> TrainResult<Self> {
        let (n, num_features) = features.dim();
        if n == 0 {
            return Err(TrainError::EmptyDataset);
        }
        if let Some(((row, column), &value)) =
            features.indexed_iter().find(|(_, v)| !v.is_finite())
        {
            return Err(TrainError::NonFiniteFeature { row, column, value });
        }
        if targets.len() != n {
            return Err(TrainError::TargetCountMismatch { expected: n, found: targets.len() });
        }

        let weights = weights.unwrap_or_else(|| Array1::ones(n));
        if weights.len() != n {
            return Err(TrainError::WeightCountMismatch { expected: n, found: weights.len() });
        }
        if let Some((index, &value)) =
            weights.iter().enumerate().find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(TrainError::InvalidWeight { index, value });
        }
        let weight_sum = weights.sum();
        if weight_sum <= 0.0 || !weight_sum.is_finite() {
            return Err(TrainError::NonPositiveWeightSum { sum: weight_sum });
        }

        info!(
            "Training data: {n} examples, {num_features} features, {} outputs",
            targets.num_outputs()
        );
        Ok(Self {
            features: Matrix::Dense(DenseMatrix::from_array(with_bias_column(features.view()))),
            targets,
            weights: DenseVector::from_array(weights / weight_sum),
            weight_sum,
            num_features,
        })
    }

    /// Features with the bias column appended.
    pub fn features(&self) -> &Matrix {
        &self.features
    }

    pub fn targets(&self) -> &T {
        &self.targets
    }

    /// Example weights normalized to sum to one.
    pub fn weights(&self) -> &DenseVector {
        &self.weights
    }

    /// Sum of the raw example weights.
    pub fn weight_sum(&self) -> f64 {
        self.weight_sum
    }

    pub fn num_examples(&self) -> usize {
        self.features.dim1()
    }

    /// Feature count, bias excluded.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_outputs(&self) -> usize {
        self.targets.num_outputs()
    }
}
