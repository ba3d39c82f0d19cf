use argmin::core::{ArgminError, Error};

use crate::tensor::errors::TensorError;

/// Crate-wide result alias for optimizer and objective operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// Flat gradient length does not match the flat parameter length.
    GradientDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Gradient elements need to be finite.
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    // ---- LbfgsOptions ----
    /// L-BFGS memory needs to be at least 1.
    InvalidLbfgsMem {
        mem: usize,
        reason: &'static str,
    },
    /// Maximum iterations needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// Relative loss change tolerance needs to be positive and finite.
    InvalidTolerance {
        tol: f64,
        reason: &'static str,
    },
    /// Gradient tolerance needs to be positive and finite.
    InvalidTolGrad {
        tol: f64,
        reason: &'static str,
    },
    /// Invalid line searcher name.
    InvalidLineSearch {
        name: String,
        reason: &'static str,
    },

    // ---- Loss ----
    /// Loss function returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    // ---- Objectives ----
    /// Truth and prediction disagree on the number of examples or outputs.
    TruthLengthMismatch {
        expected: usize,
        found: usize,
    },
    /// Multi-output truth does not match the prediction shape.
    TruthShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// Class id outside `0..num_classes`.
    UnknownClass {
        class: usize,
        num_classes: usize,
    },

    // ---- Parameters ----
    /// A tensor array does not have the number of blocks the parameters hold.
    ParameterCountMismatch {
        expected: usize,
        found: usize,
    },

    /// Optimizer finished without parameters to report.
    MissingParameters,

    // ---- Tensors ----
    Tensor(TensorError),

    // ---- Argmin ----
    /// An error raised inside the reference solver, tagged with Argmin's
    /// error kind (`"invalid parameter"`, `"condition violated"`, ...).
    Solver {
        kind: &'static str,
        text: String,
    },
    /// Any other error surfaced through Argmin.
    BackendError {
        text: String,
    },
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }

            // ---- LbfgsOptions ----
            OptError::InvalidLbfgsMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::InvalidTolerance { tol, reason } => {
                write!(f, "Invalid loss change tolerance {tol}: {reason}")
            }
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }

            // ---- Loss ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite loss value: {value}")
            }

            // ---- Objectives ----
            OptError::TruthLengthMismatch { expected, found } => {
                write!(f, "Truth length mismatch: expected {expected}, found {found}")
            }
            OptError::TruthShapeMismatch { expected, found } => {
                write!(f, "Truth shape mismatch: expected {expected:?}, found {found:?}")
            }
            OptError::UnknownClass { class, num_classes } => {
                write!(f, "Unknown class id {class}: expected a value below {num_classes}")
            }

            // ---- Parameters ----
            OptError::ParameterCountMismatch { expected, found } => {
                write!(f, "Parameter block count mismatch: expected {expected}, found {found}")
            }
            OptError::MissingParameters => {
                write!(f, "Missing optimized parameters")
            }

            // ---- Tensors ----
            OptError::Tensor(err) => write!(f, "Tensor error: {err}"),

            // ---- Argmin ----
            OptError::Solver { kind, text } => write!(f, "Reference solver error ({kind}): {text}"),
            OptError::BackendError { text } => write!(f, "Backend error: {text}"),
        }
    }
}

impl From<TensorError> for OptError {
    fn from(err: TensorError) -> Self {
        OptError::Tensor(err)
    }
}

fn argmin_kind(err: &ArgminError) -> &'static str {
    match err {
        ArgminError::InvalidParameter { .. } => "invalid parameter",
        ArgminError::NotImplemented { .. } => "not implemented",
        ArgminError::NotInitialized { .. } => "not initialized",
        ArgminError::ConditionViolated { .. } => "condition violated",
        ArgminError::CheckpointNotFound { .. } => "checkpoint not found",
        ArgminError::PotentialBug { .. } => "potential bug",
        ArgminError::ImpossibleError { .. } => "impossible error",
        _ => "unknown",
    }
}

impl From<Error> for OptError {
    /// Recover an `OptError` that a callback sent through Argmin, otherwise
    /// wrap Argmin's own error.
    fn from(err: Error) -> Self {
        let err = match err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match err.downcast_ref::<ArgminError>() {
            Some(argmin_err) => {
                OptError::Solver { kind: argmin_kind(argmin_err), text: argmin_err.to_string() }
            }
            None => OptError::BackendError { text: err.to_string() },
        }
    }
}
