//! Multi-label binary cross-entropy.
//!
//! Each output is an independent logit for one label. Per label the loss is
//! `max(x, 0) − x·y + ln1p(exp(−|x|))` and the score gradient is
//! `sigmoid(x) − y`. Truth is a 0/1 vector (dense or sparse) per example, or
//! a 0/1 matrix per batch.
use ndarray::ArrayViewMut1;

use crate::{
    objective::{BatchLossAndGrad, LossAndGrad, ObjResult, Objective, check_length, check_shape},
    optimization::numerical_stability::{bce_with_logits, safe_logistic},
    tensor::{DenseMatrix, DenseVector, Matrix, NormalizerKind, Vector, VectorIter},
};

/// Default decision threshold on sigmoid outputs.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryCrossEntropy {
    threshold: f64,
}

impl Default for BinaryCrossEntropy {
    fn default() -> Self {
        Self { threshold: DEFAULT_THRESHOLD }
    }
}

impl BinaryCrossEntropy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objective reporting a custom decision threshold; the loss itself is
    /// unaffected.
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }
}

fn row_loss(scores: impl Iterator<Item = f64>, labels: impl Iterator<Item = f64>) -> f64 {
    scores.zip(labels).map(|(x, y)| bce_with_logits(x, y)).sum()
}

/// Overwrite each logit with `sigmoid(x) − y` and return the row loss.
/// `labels` yields the active `(index, value)` pairs in ascending order;
/// missing indices are label 0.
fn row_loss_and_gradient(mut scores: ArrayViewMut1<'_, f64>, labels: VectorIter<'_>) -> f64 {
    let mut labels = labels.peekable();
    let mut loss = 0.0;
    for (j, x) in scores.iter_mut().enumerate() {
        let y = labels.next_if(|&(i, _)| i == j).map_or(0.0, |(_, y)| y);
        loss += bce_with_logits(*x, y);
        *x = safe_logistic(*x) - y;
    }
    loss
}

impl Objective for BinaryCrossEntropy {
    type Truth = Vector;
    type BatchTruth = Matrix;

    fn loss_and_gradient(
        &self, truth: &Vector, mut prediction: DenseVector,
    ) -> ObjResult<LossAndGrad> {
        check_length(prediction.size(), truth.size())?;
        let loss = row_loss_and_gradient(prediction.view_mut(), truth.iter());
        Ok(LossAndGrad { loss, gradient: prediction })
    }

    fn batch_loss_and_gradient(
        &self, truth: &Matrix, mut prediction: DenseMatrix,
    ) -> ObjResult<BatchLossAndGrad> {
        check_shape(prediction.shape(), truth.shape())?;
        let loss: Vec<f64> = prediction
            .as_array_mut()
            .rows_mut()
            .into_iter()
            .enumerate()
            .map(|(i, row)| row_loss_and_gradient(row, truth.row(i).iter()))
            .collect();
        Ok(BatchLossAndGrad { loss: DenseVector::from_vec(loss), gradient: prediction })
    }

    fn loss(&self, truth: &Vector, prediction: DenseVector) -> ObjResult<f64> {
        check_length(prediction.size(), truth.size())?;
        let labels = truth.densify();
        Ok(row_loss(prediction.as_array().iter().copied(), labels.as_array().iter().copied()))
    }

    fn batch_loss(&self, truth: &Matrix, prediction: DenseMatrix) -> ObjResult<DenseVector> {
        check_shape(prediction.shape(), truth.shape())?;
        let labels = truth.densify();
        let loss: Vec<f64> = prediction
            .as_array()
            .rows()
            .into_iter()
            .zip(labels.as_array().rows())
            .map(|(x, y)| row_loss(x.iter().copied(), y.iter().copied()))
            .collect();
        Ok(DenseVector::from_vec(loss))
    }

    fn is_probabilistic(&self) -> bool {
        true
    }

    fn threshold(&self) -> Option<f64> {
        Some(self.threshold)
    }

    fn normalizer(&self) -> NormalizerKind {
        NormalizerKind::Sigmoid
    }

    fn name(&self) -> &'static str {
        "BinaryCrossEntropy"
    }
}
