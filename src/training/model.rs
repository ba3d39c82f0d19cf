//! Trained linear model.
//!
//! A [`LinearModel`] pairs fitted [`LinearParameters`] with the output
//! normalizer of the objective it was trained under, so scores come back on
//! the objective's scale: softmax probabilities for `LogMulticlass`, sigmoid
//! probabilities for `BinaryCrossEntropy`, raw values for regression.
//!
//! Inputs never carry the bias column; the model appends it.
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{
    objective::{Objective, multilabel::DEFAULT_THRESHOLD},
    optimization::lbfgs::OptimOutcome,
    parameters::LinearParameters,
    tensor::{DenseMatrix, DenseVector, Matrix, NormalizerKind, SparseVector, Vector},
    training::{
        data::with_bias_column,
        errors::{TrainError, TrainResult},
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    parameters: LinearParameters,
    normalizer: NormalizerKind,
    probabilistic: bool,
    threshold: Option<f64>,
    objective: String,
    outcome: OptimOutcome,
}

/// `x` with a trailing 1 appended, keeping its storage kind.
fn with_bias(features: &Vector) -> TrainResult<Vector> {
    let size = features.size();
    Ok(match features {
        Vector::Dense(d) => {
            let mut values = d.to_vec();
            values.push(1.0);
            Vector::dense(values)
        }
        Vector::Sparse(s) => {
            let mut indices = s.indices().to_vec();
            let mut values = s.values().to_vec();
            indices.push(size);
            values.push(1.0);
            Vector::Sparse(SparseVector::new(size + 1, indices, values)?)
        }
    })
}

impl LinearModel {
    pub fn new<O: Objective + ?Sized>(
        parameters: LinearParameters, objective: &O, outcome: OptimOutcome,
    ) -> Self {
        Self {
            parameters,
            normalizer: objective.normalizer(),
            probabilistic: objective.is_probabilistic(),
            threshold: objective.threshold(),
            objective: objective.name().to_string(),
            outcome,
        }
    }

    pub fn parameters(&self) -> &LinearParameters {
        &self.parameters
    }

    pub fn normalizer(&self) -> NormalizerKind {
        self.normalizer
    }

    pub fn is_probabilistic(&self) -> bool {
        self.probabilistic
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    /// Name of the objective the model was trained under.
    pub fn objective_name(&self) -> &str {
        &self.objective
    }

    pub fn outcome(&self) -> &OptimOutcome {
        &self.outcome
    }

    pub fn num_features(&self) -> usize {
        self.parameters.num_features()
    }

    pub fn num_outputs(&self) -> usize {
        self.parameters.num_outputs()
    }

    fn check_width(&self, found: usize) -> TrainResult<()> {
        let expected = self.num_features();
        if found != expected {
            return Err(TrainError::FeatureCountMismatch { expected, found });
        }
        Ok(())
    }

    /// Normalized scores for one example.
    ///
    /// # Errors
    /// [`TrainError::FeatureCountMismatch`] if `features` does not have
    /// `num_features()` entries.
    pub fn predict_scores(&self, features: &Vector) -> TrainResult<DenseVector> {
        self.check_width(features.size())?;
        let mut scores = self.parameters.predict(&with_bias(features)?)?;
        scores.normalize(&self.normalizer);
        Ok(scores)
    }

    /// Normalized scores, one row per example.
    pub fn predict_batch_scores(&self, features: &Array2<f64>) -> TrainResult<DenseMatrix> {
        self.check_width(features.ncols())?;
        let examples = Matrix::Dense(DenseMatrix::from_array(with_bias_column(features.view())));
        let mut scores = self.parameters.predict_batch(&examples)?;
        scores.normalize_rows(&self.normalizer);
        Ok(scores)
    }

    /// Highest-scoring output per example.
    pub fn predict_class(&self, features: &Array2<f64>) -> TrainResult<Vec<usize>> {
        Ok(self.predict_batch_scores(features)?.index_of_row_max())
    }

    /// Outputs whose score reaches the decision threshold (0.5 when the
    /// objective reports none), per example.
    pub fn predict_labels(&self, features: &Array2<f64>) -> TrainResult<Vec<Vec<usize>>> {
        let threshold = self.threshold.unwrap_or(DEFAULT_THRESHOLD);
        let scores = self.predict_batch_scores(features)?;
        Ok(scores
            .as_array()
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &s)| s >= threshold)
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect())
    }
}
