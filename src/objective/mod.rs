//! objective — losses over linear-model predictions.
//!
//! Purpose
//! -------
//! Turn raw linear scores plus ground truth into a scalar loss and the
//! gradient of that loss with respect to the scores. Parameters then map the
//! score gradient back onto the weights (outer product per example, `Gᵀ·X`
//! per batch).
//!
//! Key behaviors
//! -------------
//! - [`LogMulticlass`]: softmax + negative log-likelihood of the true class.
//! - [`BinaryCrossEntropy`]: independent sigmoid cross-entropy per label.
//! - [`SquaredLoss`] / [`AbsoluteLoss`]: regression losses on raw scores.
//! - Every objective consumes its prediction buffer and hands the same
//!   storage back as the gradient, so no second buffer is allocated.
//!
//! Invariants & assumptions
//! ------------------------
//! - Gradients are gradients of the loss (`softmax − one_hot`,
//!   `sigmoid − y`, `x − y`); the optimizer minimizes without sign flips.
//! - Losses are finite for finite scores: log-probabilities are clamped
//!   before the logarithm.
//! - Truth whose shape disagrees with the prediction, or a class id outside
//!   the score range, is an [`OptError`](crate::optimization::errors::OptError),
//!   never a panic.
//!
//! Conventions
//! -----------
//! - `batch_*` methods take one prediction row per example and return one
//!   loss per example; weighting and summation belong to the trainer.
//! - [`Objective::normalizer`] names the transform that maps scores to the
//!   objective's output scale; models reuse it at prediction time.

pub mod classification;
pub mod multilabel;
pub mod regression;

pub use self::classification::LogMulticlass;
pub use self::multilabel::BinaryCrossEntropy;
pub use self::regression::{AbsoluteLoss, SquaredLoss};

use crate::{
    optimization::errors::{OptError, OptResult},
    tensor::{DenseMatrix, DenseVector, NormalizerKind},
};

/// Result alias for objective evaluations.
pub type ObjResult<T> = OptResult<T>;

/// Loss and score gradient for one example.
#[derive(Debug, Clone, PartialEq)]
pub struct LossAndGrad {
    pub loss: f64,
    pub gradient: DenseVector,
}

/// Per-example losses and the score gradient matrix for a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchLossAndGrad {
    pub loss: DenseVector,
    pub gradient: DenseMatrix,
}

/// A differentiable loss over linear scores.
///
/// Required:
/// - `loss_and_gradient` / `batch_loss_and_gradient`: loss and gradient
///   w.r.t. the scores. The prediction buffer is consumed and returned as
///   the gradient.
/// - `loss` / `batch_loss`: loss only.
/// - `is_probabilistic`, `normalizer`, `name`.
///
/// Optional:
/// - `threshold`: decision threshold on normalized outputs, for
///   objectives that predict label sets.
pub trait Objective {
    type Truth: ?Sized;
    type BatchTruth: ?Sized;

    fn loss_and_gradient(
        &self, truth: &Self::Truth, prediction: DenseVector,
    ) -> ObjResult<LossAndGrad>;

    fn batch_loss_and_gradient(
        &self, truth: &Self::BatchTruth, prediction: DenseMatrix,
    ) -> ObjResult<BatchLossAndGrad>;

    fn loss(&self, truth: &Self::Truth, prediction: DenseVector) -> ObjResult<f64>;

    fn batch_loss(&self, truth: &Self::BatchTruth, prediction: DenseMatrix)
    -> ObjResult<DenseVector>;

    fn is_probabilistic(&self) -> bool;

    fn threshold(&self) -> Option<f64> {
        None
    }

    fn normalizer(&self) -> NormalizerKind;

    fn name(&self) -> &'static str;
}

pub(crate) fn check_length(expected: usize, found: usize) -> ObjResult<()> {
    if expected != found {
        return Err(OptError::TruthLengthMismatch { expected, found });
    }
    Ok(())
}

pub(crate) fn check_shape(expected: (usize, usize), found: (usize, usize)) -> ObjResult<()> {
    if expected != found {
        return Err(OptError::TruthShapeMismatch { expected, found });
    }
    Ok(())
}

pub mod prelude {
    pub use super::{
        AbsoluteLoss, BatchLossAndGrad, BinaryCrossEntropy, LogMulticlass, LossAndGrad, ObjResult,
        Objective, SquaredLoss,
    };
}
