//! Multiclass log loss.
//!
//! Scores are mapped to class probabilities with a max-shifted softmax; the
//! loss is `-ln p[truth]` and its gradient w.r.t. the scores is
//! `softmax − one_hot(truth)`. A probability that underflows to zero is
//! clamped to `MIN_PROBABILITY`, so the loss stays finite (≈ 708.4) and the
//! gradient stays bounded.
use log::debug;

use crate::{
    objective::{BatchLossAndGrad, LossAndGrad, ObjResult, Objective, check_length},
    optimization::{errors::OptError, numerical_stability::neg_log_clamped},
    tensor::{DenseMatrix, DenseVector, ExpNormalizer, NormalizerKind},
};

/// Softmax cross-entropy over class ids `0..num_outputs`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogMulticlass;

impl LogMulticlass {
    pub fn new() -> Self {
        Self
    }
}

fn check_class(class: usize, num_classes: usize) -> ObjResult<()> {
    if class >= num_classes {
        return Err(OptError::UnknownClass { class, num_classes });
    }
    Ok(())
}

fn class_loss(probability: f64) -> f64 {
    if probability <= 0.0 {
        debug!("True-class probability underflowed to {probability:e}; clamping log loss");
    }
    neg_log_clamped(probability)
}

impl Objective for LogMulticlass {
    type Truth = usize;
    type BatchTruth = [usize];

    fn loss_and_gradient(
        &self, truth: &usize, mut prediction: DenseVector,
    ) -> ObjResult<LossAndGrad> {
        check_class(*truth, prediction.size())?;
        prediction.normalize(&ExpNormalizer);
        let loss = class_loss(prediction.get(*truth));
        prediction.add(*truth, -1.0);
        Ok(LossAndGrad { loss, gradient: prediction })
    }

    fn batch_loss_and_gradient(
        &self, truth: &[usize], mut prediction: DenseMatrix,
    ) -> ObjResult<BatchLossAndGrad> {
        check_length(prediction.dim1(), truth.len())?;
        let num_classes = prediction.dim2();
        truth.iter().try_for_each(|&c| check_class(c, num_classes))?;

        prediction.normalize_rows(&ExpNormalizer);
        let mut loss = DenseVector::zeros(truth.len());
        for (i, &c) in truth.iter().enumerate() {
            loss.set(i, class_loss(prediction.get(i, c)));
            prediction.add(i, c, -1.0);
        }
        Ok(BatchLossAndGrad { loss, gradient: prediction })
    }

    fn loss(&self, truth: &usize, mut prediction: DenseVector) -> ObjResult<f64> {
        check_class(*truth, prediction.size())?;
        prediction.normalize(&ExpNormalizer);
        Ok(class_loss(prediction.get(*truth)))
    }

    fn batch_loss(&self, truth: &[usize], mut prediction: DenseMatrix) -> ObjResult<DenseVector> {
        check_length(prediction.dim1(), truth.len())?;
        let num_classes = prediction.dim2();
        truth.iter().try_for_each(|&c| check_class(c, num_classes))?;

        prediction.normalize_rows(&ExpNormalizer);
        let loss: Vec<f64> =
            truth.iter().enumerate().map(|(i, &c)| class_loss(prediction.get(i, c))).collect();
        Ok(DenseVector::from_vec(loss))
    }

    fn is_probabilistic(&self) -> bool {
        true
    }

    fn normalizer(&self) -> NormalizerKind {
        NormalizerKind::Exp
    }

    fn name(&self) -> &'static str {
        "LogMulticlass"
    }
}
