//! lbfgs — limited-memory BFGS over tensor parameter arrays.
//!
//! Purpose
//! -------
//! Minimize differentiable losses whose parameters are arrays of tensors
//! (vectors and matrices, dense or row-sparse). Callers implement
//! [`Problem`] and run either the native optimizer ([`minimize`] /
//! [`Lbfgs`]) or the Argmin-backed reference ([`minimize_reference`]) on a
//! [`Parameters`](crate::parameters::Parameters) container.
//!
//! Key behaviors
//! -------------
//! - Native solver: circular `(s, y)` history with a curvature guard,
//!   two-loop recursion, backtracking Armijo line search, and divergence
//!   recovery to the last finite parameters ([`solver`], [`history`],
//!   [`line_search`]).
//! - Reference solver: Argmin L-BFGS with More–Thuente or Hager–Zhang line
//!   search over the raveled parameters ([`adapter`], [`builders`],
//!   [`reference`]).
//! - Finite-difference gradient checks for analytic gradients
//!   ([`finite_diff`]).
//! - Progress reporting through [`IterationObserver`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Losses are minimized and gradients are gradients of the loss.
//! - Gradient arrays match parameter arrays block for block.
//! - Options are validated on construction; [`minimize`] re-validates, so
//!   deserialized options are safe to pass.
//!
//! Conventions
//! -----------
//! - Errors bubble up as [`OptResult<T>`](crate::optimization::errors::OptResult);
//!   numerical breakdown mid-run is reported through
//!   [`TerminationStatus::Diverged`], not an error.
//! - Logging goes through the `log` facade; nothing is printed directly.
//!
//! Testing notes
//! -------------
//! - Unit tests in the submodules cover history bookkeeping, the line
//!   search, solver termination paths, Argmin wiring, and finite
//!   differences.
//! - Integration tests under `tests/` cross-check the native solver against
//!   closed-form optima and the reference solver.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod history;
pub mod line_search;
pub mod observer;
pub mod reference;
pub mod solver;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::{minimize, minimize_observed};
pub use self::finite_diff::{max_gradient_error, problem_gradient_fd};
pub use self::observer::{
    IterationObserver, IterationRecord, LogObserver, NoopObserver, RecordingObserver,
};
pub use self::reference::minimize_reference;
pub use self::solver::Lbfgs;
pub use self::traits::{
    FnProblem, GradAndLoss, LbfgsOptions, LineSearcher, OptimOutcome, Problem, ReferenceOptions,
    TerminationStatus,
};
pub use self::types::{Cost, FnEvalMap};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::api::minimize;
    pub use super::observer::{IterationObserver, IterationRecord};
    pub use super::reference::minimize_reference;
    pub use super::solver::Lbfgs;
    pub use super::traits::{
        FnProblem, GradAndLoss, LbfgsOptions, OptimOutcome, Problem, TerminationStatus,
    };
}
