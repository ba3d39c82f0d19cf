//! Full-batch L-BFGS trainer for linear models.
//!
//! Purpose
//! -------
//! Turn validated [`TrainingData`] and an [`Objective`] into the two closures
//! the optimizer drives (loss-and-gradient, loss only), run L-BFGS over a
//! zero-initialized [`LinearParameters`], and package the result as a
//! [`LinearModel`].
//!
//! Key behaviors
//! -------------
//! - Scores are `X·Wᵀ` over the whole dataset; the score gradient rows are
//!   scaled by the normalized example weights before `Gᵀ·X`, so the loss is
//!   the weighted mean of the per-example losses.
//! - With `l2_penalty` set, `0.5·λ·‖W‖²` is added over the non-bias columns
//!   with `λ = 1 / (regularisation_strength · weight_sum)`.
//! - Each `train` call bumps an invocation counter.
//!
//! Invariants & assumptions
//! ------------------------
//! - The configuration is validated at construction; `TrainerConfig` fields
//!   are public, so a deserialized config is re-validated by `new`.
//! - A diverged run still returns a model holding the last finite weights;
//!   callers inspect `LinearModel::outcome()`.
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    objective::{BatchLossAndGrad, Objective},
    optimization::{
        errors::{OptError, OptResult},
        lbfgs::{
            GradAndLoss, IterationObserver, LbfgsOptions, NoopObserver, Problem,
            TerminationStatus, minimize_observed,
        },
    },
    parameters::LinearParameters,
    tensor::{DenseMatrix, Matrix, Tensor, TensorError, matrix_multiply},
    training::{
        data::{Targets, TrainingData},
        errors::{TrainError, TrainResult},
        model::LinearModel,
    },
};

/// Trainer settings.
///
/// Defaults: `max_iterations = 100`, `tolerance = 1e-4`,
/// `gradient_tolerance = 1e-4`, `memory_size = 10`, `l2_penalty = false`,
/// `regularisation_strength = 1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub gradient_tolerance: f64,
    pub memory_size: usize,
    pub l2_penalty: bool,
    pub regularisation_strength: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-4,
            gradient_tolerance: 1e-4,
            memory_size: 10,
            l2_penalty: false,
            regularisation_strength: 1.0,
        }
    }
}

fn positive_finite(field: &'static str, value: f64) -> TrainResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TrainError::InvalidConfig {
            field,
            value,
            reason: "must be finite and greater than 0",
        });
    }
    Ok(())
}

fn at_least_one(field: &'static str, value: usize) -> TrainResult<()> {
    if value == 0 {
        return Err(TrainError::InvalidConfig {
            field,
            value: value as f64,
            reason: "must be at least 1",
        });
    }
    Ok(())
}

impl TrainerConfig {
    /// Construct a validated configuration.
    ///
    /// # Errors
    /// [`TrainError::InvalidConfig`] naming the first offending field.
    pub fn new(
        max_iterations: usize, l2_penalty: bool, tolerance: f64, gradient_tolerance: f64,
        regularisation_strength: f64, memory_size: usize,
    ) -> TrainResult<Self> {
        let config = Self {
            max_iterations,
            tolerance,
            gradient_tolerance,
            memory_size,
            l2_penalty,
            regularisation_strength,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TrainResult<()> {
        at_least_one("max_iterations", self.max_iterations)?;
        at_least_one("memory_size", self.memory_size)?;
        positive_finite("tolerance", self.tolerance)?;
        positive_finite("gradient_tolerance", self.gradient_tolerance)?;
        positive_finite("regularisation_strength", self.regularisation_strength)
    }

    pub fn lbfgs_options(&self) -> LbfgsOptions {
        LbfgsOptions {
            memory_size: self.memory_size,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            gradient_tolerance: self.gradient_tolerance,
        }
    }
}

/// Trains a linear model for one objective.
#[derive(Debug, Clone)]
pub struct LinearTrainer<O: Objective> {
    objective: O,
    config: TrainerConfig,
    invocations: usize,
}

impl<O: Objective> LinearTrainer<O> {
    /// LinearTrainer::new — trainer for one objective and configuration.
    ///
    /// Parameters
    /// ----------
    /// - `objective`: `O`
    ///   Loss over linear scores; its `BatchTruth` fixes which target family
    ///   the trainer accepts.
    /// - `config`: `TrainerConfig`
    ///   Optimizer budget, tolerances and the L2 switch. Re-validated here
    ///   since public fields and serde can bypass `TrainerConfig::new`.
    ///
    /// Returns
    /// -------
    /// `TrainResult<LinearTrainer<O>>`
    ///   A trainer with its invocation counter at zero.
    ///
    /// Errors
    /// ------
    /// - `TrainError::InvalidConfig` if `config` fails validation.
    pub fn new(objective: O, config: TrainerConfig) -> TrainResult<Self> {
        config.validate()?;
        Ok(Self { objective, config, invocations: 0 })
    }

    pub fn objective(&self) -> &O {
        &self.objective
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Number of completed or attempted `train` calls.
    pub fn invocation_count(&self) -> usize {
        self.invocations
    }

    pub fn set_invocation_count(&mut self, count: usize) {
        self.invocations = count;
    }

    /// LinearTrainer::train — fit a model on `data` with full-batch L-BFGS.
    ///
    /// Parameters
    /// ----------
    /// - `data`: `&TrainingData<T>`
    ///   Validated features (bias column included), targets matching the
    ///   objective, and normalized example weights.
    ///
    /// Returns
    /// -------
    /// `TrainResult<LinearModel>`
    ///   Weights of shape `(num_outputs, num_features + 1)` starting from
    ///   zero, the objective's normalizer and threshold, and the optimizer
    ///   outcome. A diverged or budget-limited run still returns a model;
    ///   inspect `LinearModel::outcome`.
    ///
    /// Errors
    /// ------
    /// - `TrainError::Optimization` if the objective rejects the targets or
    ///   the starting loss is non-finite.
    /// - `TrainError::Tensor` for shape failures inside the loss.
    ///
    /// Notes
    /// -----
    /// - Increments the invocation counter even when training fails.
    pub fn train<T>(&mut self, data: &TrainingData<T>) -> TrainResult<LinearModel>
    where
        T: Targets<Batch = O::BatchTruth>,
    {
        self.train_observed(data, &mut NoopObserver)
    }

    /// [`LinearTrainer::train`] reporting every iteration to `observer`.
    ///
    /// Errors
    /// ------
    /// Same as [`LinearTrainer::train`].
    pub fn train_observed<T, Obs>(
        &mut self, data: &TrainingData<T>, observer: &mut Obs,
    ) -> TrainResult<LinearModel>
    where
        T: Targets<Batch = O::BatchTruth>,
        Obs: IterationObserver + ?Sized,
    {
        self.invocations += 1;
        let num_features = data.num_features();
        let num_outputs = data.num_outputs();
        info!(
            "Training {} linear model with {} examples, {num_features} features and \
             {num_outputs} outputs",
            self.objective.name(),
            data.num_examples()
        );

        let lambda = self
            .config
            .l2_penalty
            .then(|| 1.0 / (self.config.regularisation_strength * data.weight_sum()));
        let problem = LinearProblem { objective: &self.objective, data, lambda };
        let mut params = LinearParameters::new(num_features, num_outputs);
        let outcome =
            minimize_observed(&mut params, &problem, &self.config.lbfgs_options(), observer)?;

        match outcome.status {
            TerminationStatus::Diverged => {
                warn!("Training diverged; keeping the last finite weights")
            }
            TerminationStatus::MaxIterExceeded => {
                info!("Training stopped at the iteration limit ({})", outcome.iterations)
            }
            TerminationStatus::Converged => {
                info!("Training converged after {} iterations", outcome.iterations)
            }
        }
        Ok(LinearModel::new(params, &self.objective, outcome))
    }
}

/// Weighted full-batch loss of a linear model, optionally L2-penalized.
struct LinearProblem<'a, O: Objective, T: Targets> {
    objective: &'a O,
    data: &'a TrainingData<T>,
    lambda: Option<f64>,
}

fn weight_block(params: &[Tensor]) -> OptResult<&Matrix> {
    match params {
        [block] => block.as_matrix().ok_or_else(|| TensorError::KindMismatch { op: "loss" }.into()),
        _ => Err(OptError::ParameterCountMismatch { expected: 1, found: params.len() }),
    }
}

/// `0.5·λ·Σ w²` over every column but the trailing bias column, adding
/// `λ·w` to `gradient` when given.
fn l2_penalty(weights: &Matrix, lambda: f64, mut gradient: Option<&mut DenseMatrix>) -> f64 {
    let bias = weights.dim2().saturating_sub(1);
    let mut penalty = 0.0;
    for (i, j, w) in weights.iter().filter(|&(_, j, _)| j < bias) {
        penalty += w * w;
        if let Some(g) = gradient.as_mut() {
            g.add(i, j, lambda * w);
        }
    }
    0.5 * lambda * penalty
}

impl<O, T> Problem for LinearProblem<'_, O, T>
where
    O: Objective,
    T: Targets<Batch = O::BatchTruth>,
{
    fn loss_and_grad(&self, params: &[Tensor]) -> OptResult<GradAndLoss> {
        let weights = weight_block(params)?;
        let features = self.data.features();
        let scores = matrix_multiply(features, weights, false, true)?;
        let BatchLossAndGrad { loss, mut gradient } =
            self.objective.batch_loss_and_gradient(self.data.targets().batch(), scores)?;

        let example_weights = self.data.weights();
        let mut total = loss.dot_dense(example_weights)?;
        gradient.row_scale_in_place(example_weights)?;
        let mut weight_gradient = matrix_multiply(&gradient, features, true, false)?;
        if let Some(lambda) = self.lambda {
            total += l2_penalty(weights, lambda, Some(&mut weight_gradient));
        }
        Ok(GradAndLoss { loss: total, gradient: vec![weight_gradient.into()] })
    }

    fn loss(&self, params: &[Tensor]) -> OptResult<f64> {
        let weights = weight_block(params)?;
        let scores = matrix_multiply(self.data.features(), weights, false, true)?;
        let losses = self.objective.batch_loss(self.data.targets().batch(), scores)?;
        let mut total = losses.dot_dense(self.data.weights())?;
        if let Some(lambda) = self.lambda {
            total += l2_penalty(weights, lambda, None);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        objective::{LogMulticlass, SquaredLoss},
        optimization::lbfgs::{RecordingObserver, max_gradient_error},
        parameters::Parameters,
        training::data::{ClassTargets, RegressionTargets},
    };
    use approx::assert_relative_eq;
    use ndarray::array;

    fn separable_data() -> TrainingData<ClassTargets> {
        let targets = ClassTargets::new(vec![Some(0), Some(0), Some(1), Some(1)], 2).unwrap();
        TrainingData::new(array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]], targets, None)
            .unwrap()
    }

    #[test]
    fn config_defaults_and_validation() {
        let d = TrainerConfig::default();
        assert_eq!((d.max_iterations, d.memory_size), (100, 10));
        assert_eq!((d.tolerance, d.gradient_tolerance, d.regularisation_strength), (1e-4, 1e-4, 1.0));
        assert!(!d.l2_penalty);

        assert!(matches!(
            TrainerConfig::new(0, false, 1e-4, 1e-4, 1.0, 10),
            Err(TrainError::InvalidConfig { field: "max_iterations", .. })
        ));
        assert!(matches!(
            TrainerConfig::new(10, true, 1e-4, 1e-4, 0.0, 10),
            Err(TrainError::InvalidConfig { field: "regularisation_strength", .. })
        ));
        assert!(matches!(
            TrainerConfig::new(10, true, f64::NAN, 1e-4, 1.0, 10),
            Err(TrainError::InvalidConfig { field: "tolerance", .. })
        ));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: TrainerConfig =
            serde_json::from_str(r#"{"max_iterations": 50, "l2_penalty": true}"#).unwrap();
        assert_eq!(config.max_iterations, 50);
        assert!(config.l2_penalty);
        assert_eq!(config.memory_size, 10);
    }

    #[test]
    // Purpose
    // -------
    // The weighted, penalized loss closure reports the gradient of its own
    // loss.
    //
    // Given
    // -----
    // - Four examples, softmax objective, non-uniform weights, L2 on.
    // - Non-zero weights W.
    //
    // Expect
    // ------
    // - Analytic and finite-difference gradients agree within 1e-6.
    fn loss_gradient_matches_finite_differences() {
        // Arrange
        let targets = ClassTargets::new(vec![Some(0), Some(1), Some(1), Some(0)], 2).unwrap();
        let data = TrainingData::new(
            array![[0.5, -1.0], [1.5, 0.3], [-0.2, 2.0], [1.0, 1.0]],
            targets,
            Some(array![1.0, 2.0, 0.5, 1.5]),
        )
        .unwrap();
        let objective = LogMulticlass;
        let problem = LinearProblem { objective: &objective, data: &data, lambda: Some(0.3) };
        let w = DenseMatrix::from_rows(&[vec![0.2, -0.4, 0.1], vec![-0.3, 0.6, 0.05]]).unwrap();
        let params: Vec<Tensor> = vec![w.into()];

        // Act
        let max_error = max_gradient_error(&problem, &params).unwrap();

        // Assert
        assert!(max_error < 1e-6, "max gradient error {max_error}");
        assert_relative_eq!(
            problem.loss(&params).unwrap(),
            problem.loss_and_grad(&params).unwrap().loss,
            epsilon = 1e-12
        );
    }

    #[test]
    // Purpose
    // -------
    // The penalty skips the bias column.
    fn l2_penalty_excludes_bias() {
        let w = Matrix::Dense(DenseMatrix::from_rows(&[vec![1.0, 2.0, 100.0]]).unwrap());
        let mut g = DenseMatrix::zeros(1, 3);
        let p = l2_penalty(&w, 2.0, Some(&mut g));
        assert_relative_eq!(p, 5.0);
        assert_eq!(g.as_array().row(0).to_vec(), vec![2.0, 4.0, 0.0]);
    }

    #[test]
    fn train_separates_linearly_separable_classes() {
        let data = separable_data();
        let config = TrainerConfig { max_iterations: 50, ..TrainerConfig::default() };
        let mut trainer = LinearTrainer::new(LogMulticlass, config).unwrap();
        let mut observer = RecordingObserver::new();

        let model = trainer.train_observed(&data, &mut observer).unwrap();

        assert_eq!(trainer.invocation_count(), 1);
        assert!(!observer.records().is_empty());
        let predicted = model.predict_class(&array![[0.0, 0.0], [1.0, 1.0]]).unwrap();
        assert_eq!(predicted, vec![0, 1]);
    }

    #[test]
    // Purpose
    // -------
    // A penalized fit has smaller non-bias weights than an unpenalized one.
    fn l2_penalty_shrinks_weights() {
        let targets = RegressionTargets::from_column(array![0.0, 2.0, 4.0, 6.0]).unwrap();
        let data =
            TrainingData::new(array![[0.0], [1.0], [2.0], [3.0]], targets, None).unwrap();
        let plain = TrainerConfig { max_iterations: 200, tolerance: 1e-10, ..Default::default() };
        let penalized = TrainerConfig { l2_penalty: true, regularisation_strength: 0.25, ..plain };

        let free = LinearTrainer::new(SquaredLoss, plain).unwrap().train(&data).unwrap();
        let shrunk = LinearTrainer::new(SquaredLoss, penalized).unwrap().train(&data).unwrap();

        let slope = |m: &LinearModel| m.parameters().get()[0].as_matrix().unwrap().get(0, 0);
        assert_relative_eq!(slope(&free), 2.0, epsilon = 1e-3);
        assert!(slope(&shrunk) < slope(&free) - 0.1);
    }
}
