//! Vector normalizers applied to raw linear scores.
//!
//! A normalizer maps the unnormalized score vector of one example onto the
//! scale the objective interprets: probabilities for multiclass log loss
//! (`ExpNormalizer`), independent per-label probabilities for multi-label
//! cross-entropy (`SigmoidNormalizer`), or the identity for regression
//! (`NoNormalizer`). Normalizers work in place on `ndarray` views so they can
//! be applied to a dense vector, a dense matrix row, or the active values of
//! a sparse vector without copying.
use ndarray::ArrayViewMut1;
use serde::{Deserialize, Serialize};

use crate::optimization::numerical_stability::{safe_logistic, softmax_in_place};

/// A pluggable in-place transform over the values of a single vector.
pub trait VectorNormalizer {
    fn normalize_in_place(&self, values: ArrayViewMut1<'_, f64>);
}

/// Softmax: `exp(x_i - max) / Σ exp(x_j - max)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpNormalizer;

impl VectorNormalizer for ExpNormalizer {
    fn normalize_in_place(&self, values: ArrayViewMut1<'_, f64>) {
        softmax_in_place(values);
    }
}

/// Element-wise logistic sigmoid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SigmoidNormalizer;

impl VectorNormalizer for SigmoidNormalizer {
    fn normalize_in_place(&self, mut values: ArrayViewMut1<'_, f64>) {
        values.mapv_inplace(safe_logistic);
    }
}

/// Identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoNormalizer;

impl VectorNormalizer for NoNormalizer {
    fn normalize_in_place(&self, _values: ArrayViewMut1<'_, f64>) {}
}

/// Closed set of the normalizers the objectives report, suitable for storing
/// alongside trained weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizerKind {
    Exp,
    Sigmoid,
    #[default]
    Identity,
}

impl VectorNormalizer for NormalizerKind {
    fn normalize_in_place(&self, values: ArrayViewMut1<'_, f64>) {
        match self {
            NormalizerKind::Exp => ExpNormalizer.normalize_in_place(values),
            NormalizerKind::Sigmoid => SigmoidNormalizer.normalize_in_place(values),
            NormalizerKind::Identity => NoNormalizer.normalize_in_place(values),
        }
    }
}
