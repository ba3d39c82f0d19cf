//! training — fitting linear models with full-batch L-BFGS.
//!
//! Purpose
//! -------
//! Tie the lower layers together: validated data ([`TrainingData`]) and an
//! [`Objective`](crate::objective::Objective) go into a [`LinearTrainer`],
//! which runs the native optimizer over [`LinearParameters`](crate::parameters::LinearParameters)
//! and returns a [`LinearModel`].
//!
//! Key behaviors
//! -------------
//! - Features gain a constant-1 bias column once, at data construction.
//! - Example weights are normalized to sum to one, so the training loss is a
//!   weighted mean and does not scale with the dataset size.
//! - An optional L2 penalty on the non-bias weights, with strength
//!   `1 / (regularisation_strength · weight_sum)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Training is supervised: class targets must all be known.
//! - The target family must match the objective
//!   (`Targets::Batch == Objective::BatchTruth`), which the type system
//!   enforces.
//!
//! Conventions
//! -----------
//! - Errors surface as [`TrainError`]; optimizer and tensor failures are
//!   wrapped, not re-described.
//! - Progress is reported through the `log` facade; pass an
//!   `IterationObserver` to `train_observed` for per-iteration records.
//!
//! Testing notes
//! -------------
//! - Unit tests cover validation, the penalized loss gradient against finite
//!   differences, and prediction helpers; the integration tests fit small
//!   end-to-end problems.

pub mod data;
pub mod errors;
pub mod model;
pub mod trainer;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::data::{ClassTargets, LabelTargets, RegressionTargets, Targets, TrainingData};
pub use self::errors::{TrainError, TrainResult};
pub use self::model::LinearModel;
pub use self::trainer::{LinearTrainer, TrainerConfig};

pub mod prelude {
    pub use super::{
        ClassTargets, LabelTargets, LinearModel, LinearTrainer, RegressionTargets, TrainError,
        TrainResult, TrainerConfig, TrainingData,
    };
}
