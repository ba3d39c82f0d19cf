//! Regression objectives on raw scores.
//!
//! Both losses compare the linear scores directly with real-valued targets
//! (no normalizer). The residual `x − y` is computed in the prediction
//! buffer, which then becomes the gradient.
use crate::{
    objective::{BatchLossAndGrad, LossAndGrad, ObjResult, Objective, check_length, check_shape},
    tensor::{DenseMatrix, DenseVector, MatrixRef, NormalizerKind},
};

fn residual(truth: &DenseVector, mut prediction: DenseVector) -> ObjResult<DenseVector> {
    check_length(prediction.size(), truth.size())?;
    *prediction.as_array_mut() -= truth.as_array();
    Ok(prediction)
}

fn batch_residual(truth: &DenseMatrix, mut prediction: DenseMatrix) -> ObjResult<DenseMatrix> {
    check_shape(prediction.shape(), truth.shape())?;
    *prediction.as_array_mut() -= truth.as_array();
    Ok(prediction)
}

/// Sign with `sign(0) = 0`, the subgradient the absolute loss reports at a
/// zero residual.
fn sign(d: f64) -> f64 {
    if d > 0.0 {
        1.0
    } else if d < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// `0.5 · Σ (x − y)²`, gradient `x − y`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquaredLoss;

impl Objective for SquaredLoss {
    type Truth = DenseVector;
    type BatchTruth = DenseMatrix;

    fn loss_and_gradient(
        &self, truth: &DenseVector, prediction: DenseVector,
    ) -> ObjResult<LossAndGrad> {
        let gradient = residual(truth, prediction)?;
        let loss = gradient.reduce(0.0, |d| 0.5 * d * d, |t, s| s + t);
        Ok(LossAndGrad { loss, gradient })
    }

    fn batch_loss_and_gradient(
        &self, truth: &DenseMatrix, prediction: DenseMatrix,
    ) -> ObjResult<BatchLossAndGrad> {
        let gradient = batch_residual(truth, prediction)?;
        let loss = MatrixRef::from(&gradient).reduce_rows(0.0, |d| 0.5 * d * d, |t, s| s + t);
        Ok(BatchLossAndGrad { loss, gradient })
    }

    fn loss(&self, truth: &DenseVector, prediction: DenseVector) -> ObjResult<f64> {
        Ok(self.loss_and_gradient(truth, prediction)?.loss)
    }

    fn batch_loss(&self, truth: &DenseMatrix, prediction: DenseMatrix) -> ObjResult<DenseVector> {
        Ok(self.batch_loss_and_gradient(truth, prediction)?.loss)
    }

    fn is_probabilistic(&self) -> bool {
        false
    }

    fn normalizer(&self) -> NormalizerKind {
        NormalizerKind::Identity
    }

    fn name(&self) -> &'static str {
        "SquaredLoss"
    }
}

/// `Σ |x − y|`, gradient `sign(x − y)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsoluteLoss;

impl Objective for AbsoluteLoss {
    type Truth = DenseVector;
    type BatchTruth = DenseMatrix;

    fn loss_and_gradient(
        &self, truth: &DenseVector, prediction: DenseVector,
    ) -> ObjResult<LossAndGrad> {
        let mut gradient = residual(truth, prediction)?;
        let loss = gradient.reduce(0.0, f64::abs, |t, s| s + t);
        gradient.foreach_in_place(sign);
        Ok(LossAndGrad { loss, gradient })
    }

    fn batch_loss_and_gradient(
        &self, truth: &DenseMatrix, prediction: DenseMatrix,
    ) -> ObjResult<BatchLossAndGrad> {
        let mut gradient = batch_residual(truth, prediction)?;
        let loss = MatrixRef::from(&gradient).reduce_rows(0.0, f64::abs, |t, s| s + t);
        gradient.foreach_in_place(sign);
        Ok(BatchLossAndGrad { loss, gradient })
    }

    fn loss(&self, truth: &DenseVector, prediction: DenseVector) -> ObjResult<f64> {
        let diff = residual(truth, prediction)?;
        Ok(diff.reduce(0.0, f64::abs, |t, s| s + t))
    }

    fn batch_loss(&self, truth: &DenseMatrix, prediction: DenseMatrix) -> ObjResult<DenseVector> {
        let diff = batch_residual(truth, prediction)?;
        Ok(MatrixRef::from(&diff).reduce_rows(0.0, f64::abs, |t, s| s + t))
    }

    fn is_probabilistic(&self) -> bool {
        false
    }

    fn normalizer(&self) -> NormalizerKind {
        NormalizerKind::Identity
    }

    fn name(&self) -> &'static str {
        "AbsoluteLoss"
    }
}
