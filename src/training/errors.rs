//! Errors for the training layer (dataset validation, trainer configuration,
//! and failures bubbling up from the optimizer or the tensor layer).
//!
//! ## Conventions
//! - Row and column indices are 0-based.
//! - Feature values must be finite; example weights must be finite and
//!   non-negative with a strictly positive sum.
//! - Optimizer and tensor errors are wrapped unchanged so callers can match
//!   on the original variant.
use crate::{optimization::errors::OptError, tensor::errors::TensorError};

/// Result alias for training operations.
pub type TrainResult<T> = Result<T, TrainError>;

#[derive(Debug, Clone, PartialEq)]
pub enum TrainError {
    // ---- Dataset validation ----
    /// Feature matrix has no rows.
    EmptyDataset,

    /// A feature value is NaN/±inf.
    NonFiniteFeature { row: usize, column: usize, value: f64 },

    /// Number of targets differs from the number of examples.
    TargetCountMismatch { expected: usize, found: usize },

    /// Number of example weights differs from the number of examples.
    WeightCountMismatch { expected: usize, found: usize },

    /// An example weight is negative or non-finite.
    InvalidWeight { index: usize, value: f64 },

    /// Example weights sum to zero.
    NonPositiveWeightSum { sum: f64 },

    // ---- Targets ----
    /// A supervised target is missing.
    UnknownTarget { index: usize },

    /// Class id outside `0..num_classes`.
    ClassOutOfRange { index: usize, class: usize, num_classes: usize },

    /// A multi-label target entry is not 0 or 1.
    InvalidLabel { row: usize, column: usize, value: f64 },

    /// A regression target is NaN/±inf.
    NonFiniteTarget { row: usize, column: usize, value: f64 },

    /// Targets need at least one output.
    NoOutputs,

    // ---- Configuration ----
    /// A trainer setting is out of range.
    InvalidConfig { field: &'static str, value: f64, reason: &'static str },

    // ---- Prediction ----
    /// Input width differs from the number of features the model was trained on.
    FeatureCountMismatch { expected: usize, found: usize },

    // ---- Wrapped ----
    Optimization(OptError),
    Tensor(TensorError),
}

impl std::error::Error for TrainError {}

impl std::fmt::Display for TrainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Dataset validation ----
            TrainError::EmptyDataset => write!(f, "Training data has no examples."),
            TrainError::NonFiniteFeature { row, column, value } => {
                write!(f, "Feature at row {row}, column {column} is non-finite: {value}")
            }
            TrainError::TargetCountMismatch { expected, found } => {
                write!(f, "Target count mismatch: expected {expected}, found {found}")
            }
            TrainError::WeightCountMismatch { expected, found } => {
                write!(f, "Weight count mismatch: expected {expected}, found {found}")
            }
            TrainError::InvalidWeight { index, value } => {
                write!(f, "Example weight at index {index} must be finite and >= 0; got: {value}")
            }
            TrainError::NonPositiveWeightSum { sum } => {
                write!(f, "Example weights must have a positive sum; got: {sum}")
            }
            // ---- Targets ----
            TrainError::UnknownTarget { index } => {
                write!(f, "Example {index} has an unknown target; training is supervised.")
            }
            TrainError::ClassOutOfRange { index, class, num_classes } => {
                write!(f, "Example {index} has class {class}, expected a value below {num_classes}")
            }
            TrainError::InvalidLabel { row, column, value } => {
                write!(f, "Label at row {row}, column {column} must be 0 or 1; got: {value}")
            }
            TrainError::NonFiniteTarget { row, column, value } => {
                write!(f, "Target at row {row}, column {column} is non-finite: {value}")
            }
            TrainError::NoOutputs => write!(f, "Targets must describe at least one output."),
            // ---- Configuration ----
            TrainError::InvalidConfig { field, value, reason } => {
                write!(f, "Invalid trainer setting {field} = {value}: {reason}")
            }
            // ---- Prediction ----
            TrainError::FeatureCountMismatch { expected, found } => {
                write!(f, "Feature count mismatch: model expects {expected}, input has {found}")
            }
            // ---- Wrapped ----
            TrainError::Optimization(err) => write!(f, "Optimization failed: {err}"),
            TrainError::Tensor(err) => write!(f, "Tensor error: {err}"),
        }
    }
}

impl From<OptError> for TrainError {
    fn from(err: OptError) -> Self {
        TrainError::Optimization(err)
    }
}

impl From<TensorError> for TrainError {
    fn from(err: TensorError) -> Self {
        TrainError::Tensor(err)
    }
}
