//! Integration tests for the linear training pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end path: validated training data, trainer
//!   configuration, native L-BFGS fitting, and prediction from the fitted
//!   model.
//! - Cover the three target families (classes, label sets, real values) on
//!   small problems with known answers.
//!
//! Coverage
//! --------
//! - `training::data`: `TrainingData` with class, label, and regression
//!   targets, with and without example weights.
//! - `training::trainer`: `LinearTrainer` with and without the L2 penalty,
//!   observer reporting, invocation counting.
//! - `training::model`: class, label, and score prediction; serde round-trip.
//!
//! Exclusions
//! ----------
//! - Low-level tensor kernels, history bookkeeping and line search details
//!   are covered by unit tests.
use approx::assert_relative_eq;
use ndarray::{Array2, array};
use rust_linear::{
    objective::{BinaryCrossEntropy, LogMulticlass, SquaredLoss},
    optimization::lbfgs::{RecordingObserver, TerminationStatus},
    parameters::Parameters,
    tensor::Vector,
    training::{
        ClassTargets, LabelTargets, LinearModel, LinearTrainer, RegressionTargets, TrainerConfig,
        TrainingData,
    },
};

/// Purpose
/// -------
/// Four points whose class is decided by the first feature alone:
/// `(0,0) → 0`, `(0,1) → 0`, `(1,0) → 1`, `(1,1) → 1`.
fn first_feature_classes() -> (Array2<f64>, TrainingData<ClassTargets>) {
    let features = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let targets = ClassTargets::new(vec![Some(0), Some(0), Some(1), Some(1)], 2)
        .expect("class ids are within range");
    let data = TrainingData::new(features.clone(), targets, None)
        .expect("features are finite and match the targets");
    (features, data)
}

fn config(max_iterations: usize, tolerance: f64) -> TrainerConfig {
    TrainerConfig { max_iterations, tolerance, ..TrainerConfig::default() }
}

fn weight(model: &LinearModel, output: usize, column: usize) -> f64 {
    model.parameters().get()[0].as_matrix().expect("weights are a matrix block").get(output, column)
}

#[test]
// Purpose
// -------
// Multinomial logistic regression separates classes decided by one feature.
//
// Given
// -----
// - The four `first_feature_classes` points, maxIterations 50, tolerance 1e-4.
//
// Expect
// ------
// - Training accuracy is 1.0.
// - Class 1 puts more weight on feature 0 than class 0 does.
fn logistic_regression_fits_separable_classes() {
    // Arrange
    let (features, data) = first_feature_classes();
    let mut trainer =
        LinearTrainer::new(LogMulticlass, config(50, 1e-4)).expect("valid trainer config");

    // Act
    let model = trainer.train(&data).expect("training succeeds");
    let predicted = model.predict_class(&features).expect("features have the trained width");

    // Assert
    let correct = predicted.iter().zip([0, 0, 1, 1]).filter(|(p, t)| **p == *t).count();
    assert_eq!(correct as f64 / 4.0, 1.0);
    assert!(weight(&model, 1, 0) - weight(&model, 0, 0) > 0.0);
    assert_ne!(model.outcome().status, TerminationStatus::Diverged);
}

#[test]
// Purpose
// -------
// Every iteration the optimizer reports lowers (or keeps) the training loss.
fn observed_losses_never_increase() {
    let (_, data) = first_feature_classes();
    let mut trainer = LinearTrainer::new(LogMulticlass, config(30, 1e-8)).expect("valid config");
    let mut observer = RecordingObserver::new();

    trainer.train_observed(&data, &mut observer).expect("training succeeds");

    let losses: Vec<f64> = observer.records().iter().map(|r| r.loss).collect();
    assert!(!losses.is_empty());
    for pair in losses.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-12, "loss rose from {} to {}", pair[0], pair[1]);
    }
    assert_eq!(trainer.invocation_count(), 1);
}

#[test]
// Purpose
// -------
// Least squares recovers the generating weights, including the bias.
//
// Given
// -----
// - y = 2·x0 − x1 + 0.5 on a 3×3 grid of inputs.
//
// Expect
// ------
// - Fitted weights [2, −1, 0.5] within 1e-3.
fn least_squares_recovers_generating_weights() {
    // Arrange
    let mut rows = Vec::new();
    let mut y = Vec::new();
    for a in [-1.0, 0.0, 1.0] {
        for b in [-1.0, 0.5, 2.0] {
            rows.extend([a, b]);
            y.push(2.0 * a - b + 0.5);
        }
    }
    let features = Array2::from_shape_vec((9, 2), rows).expect("9 rows of 2 features");
    let targets = RegressionTargets::from_column(y.into()).expect("finite targets");
    let data = TrainingData::new(features, targets, None).expect("valid data");
    let mut trainer = LinearTrainer::new(SquaredLoss, config(200, 1e-12)).expect("valid config");

    // Act
    let model = trainer.train(&data).expect("training succeeds");

    // Assert
    assert_relative_eq!(weight(&model, 0, 0), 2.0, epsilon = 1e-3);
    assert_relative_eq!(weight(&model, 0, 1), -1.0, epsilon = 1e-3);
    assert_relative_eq!(weight(&model, 0, 2), 0.5, epsilon = 1e-3);
    let score = model.predict_scores(&Vector::dense(vec![1.0, 1.0])).expect("width 2");
    assert_relative_eq!(score.get(0), 1.5, epsilon = 1e-3);
}

#[test]
// Purpose
// -------
// Zero-weight examples do not influence the fit.
fn zero_weight_examples_are_ignored() {
    let features = array![[0.0], [1.0], [2.0], [10.0]];
    let targets = RegressionTargets::from_column(array![1.0, 3.0, 5.0, -100.0]).expect("finite");
    let weights = array![1.0, 1.0, 1.0, 0.0];
    let data = TrainingData::new(features, targets, Some(weights)).expect("valid data");
    let mut trainer = LinearTrainer::new(SquaredLoss, config(200, 1e-12)).expect("valid config");

    let model = trainer.train(&data).expect("training succeeds");

    assert_relative_eq!(weight(&model, 0, 0), 2.0, epsilon = 1e-3);
    assert_relative_eq!(weight(&model, 0, 1), 1.0, epsilon = 1e-3);
}

#[test]
// Purpose
// -------
// Binary cross-entropy learns one independent label per feature sign.
//
// Given
// -----
// - Inputs at (±1, ±1); label 0 active when x0 > 0, label 1 when x1 > 0.
//
// Expect
// ------
// - Thresholded predictions reproduce the training label sets.
fn multilabel_model_reproduces_label_sets() {
    // Arrange
    let features = array![[1.0, 1.0], [1.0, -1.0], [-1.0, 1.0], [-1.0, -1.0]];
    let sets = vec![vec![0, 1], vec![0], vec![1], vec![]];
    let targets = LabelTargets::from_label_sets(&sets, 2).expect("label ids are within range");
    let data = TrainingData::new(features.clone(), targets, None).expect("valid data");
    let mut trainer =
        LinearTrainer::new(BinaryCrossEntropy::new(), config(100, 1e-6)).expect("valid config");

    // Act
    let model = trainer.train(&data).expect("training succeeds");
    let labels = model.predict_labels(&features).expect("width 2");

    // Assert
    assert_eq!(labels, sets);
    assert!(model.is_probabilistic());
    assert_eq!(model.threshold(), Some(0.5));
}

#[test]
// Purpose
// -------
// The L2 penalty shrinks the fitted weights of a separable problem.
fn l2_penalty_bounds_separable_weights() {
    let (_, data) = first_feature_classes();
    let plain = config(100, 1e-8);
    let penalized = TrainerConfig { l2_penalty: true, ..plain };

    let free = LinearTrainer::new(LogMulticlass, plain).expect("valid").train(&data).expect("fit");
    let shrunk =
        LinearTrainer::new(LogMulticlass, penalized).expect("valid").train(&data).expect("fit");

    let margin = |m: &LinearModel| weight(m, 1, 0) - weight(m, 0, 0);
    assert!(margin(&shrunk) > 0.0);
    assert!(margin(&shrunk) < margin(&free));
}

#[test]
// Purpose
// -------
// A fitted model survives a JSON round-trip with identical predictions.
fn fitted_model_round_trips_through_json() {
    let (features, data) = first_feature_classes();
    let model = LinearTrainer::new(LogMulticlass, config(20, 1e-4))
        .expect("valid")
        .train(&data)
        .expect("fit");

    let json = serde_json::to_string(&model).expect("model serializes");
    let restored: LinearModel = serde_json::from_str(&json).expect("model deserializes");

    assert_eq!(restored, model);
    assert_eq!(
        restored.predict_batch_scores(&features).expect("width 2"),
        model.predict_batch_scores(&features).expect("width 2")
    );
}

#[test]
fn trainer_rejects_bad_inputs() {
    assert!(LinearTrainer::new(LogMulticlass, config(0, 1e-4)).is_err());
    assert!(ClassTargets::new(vec![Some(0), None], 2).is_err());

    let (_, data) = first_feature_classes();
    let model = LinearTrainer::new(LogMulticlass, config(5, 1e-4))
        .expect("valid")
        .train(&data)
        .expect("fit");
    assert!(model.predict_class(&array![[1.0, 2.0, 3.0]]).is_err());
}
