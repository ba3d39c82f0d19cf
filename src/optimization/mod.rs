//! optimization — L-BFGS minimization, numerical helpers, and the shared
//! error surface.
//!
//! Purpose
//! -------
//! Provide the minimization layer used to fit linear models: a native
//! L-BFGS optimizer over tensor parameter arrays, an Argmin-backed
//! reference solver for cross-checks, numerically stable scalar and vector
//! transforms, and a single error/result surface.
//!
//! Key behaviors
//! -------------
//! - [`lbfgs`]: the [`Problem`](lbfgs::Problem) abstraction, the native
//!   optimizer with observer hooks, the reference solver, and
//!   finite-difference gradient checks.
//! - [`numerical_stability`]: overflow-safe logistic, softplus, softmax and
//!   clamped log helpers shared by objectives and normalizers.
//! - [`errors`]: configuration issues, objective failures, tensor shape
//!   errors and backend solver errors normalized into
//!   [`OptError`](errors::OptError) with the alias
//!   [`OptResult<T>`](errors::OptResult).
//!
//! Invariants & assumptions
//! ------------------------
//! - Losses are minimized; every gradient in this layer is the gradient of
//!   the loss being minimized.
//! - Options are validated on construction and treated as consistent by the
//!   solvers.
//!
//! Conventions
//! -----------
//! - Public entrypoints that can fail return `OptResult<T>`; callers never
//!   see raw Argmin errors.
//! - Progress and termination are reported through the `log` facade and the
//!   optional [`IterationObserver`](lbfgs::IterationObserver).
//!
//! Testing notes
//! -------------
//! - Unit tests in the submodules focus on local concerns (history
//!   bookkeeping, line search, Argmin wiring, numerical tails, error
//!   conversions).
//! - Integration tests drive complete fits through the training layer.

pub mod errors;
pub mod lbfgs;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_linear::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::lbfgs::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
