//! lbfgs::types — shared numeric aliases, constants, and solver wiring.
//!
//! Purpose
//! -------
//! Centralize the constants that define the native L-BFGS iteration (default
//! history size, tolerances, line-search constants, curvature guard) and the
//! Argmin aliases used by the reference solver. Keeping them in one place
//! lets the runner, the line search, and the configuration layer agree on
//! the same numbers.
//!
//! Invariants & assumptions
//! ------------------------
//! - The reference solver works on the raveled parameter vector
//!   ([`Flat`], an `Array1<f64>`); the native solver works on
//!   `tensor::DenseVector`, which wraps the same storage.
//! - The line-search aliases assume Argmin's three-parameter forms
//!   `(Param, Gradient, Float)` as of the pinned Argmin version.
//!
//! Testing notes
//! -------------
//! - This module only defines aliases and constants; correctness is
//!   exercised by the solver and line-search tests.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::Array1;
use std::collections::HashMap;

/// Raveled parameter or gradient vector handed to Argmin.
pub type Flat = Array1<f64>;

/// Scalar loss value.
pub type Cost = f64;

/// Function-evaluation counters, keyed like Argmin's (`"cost_count"`,
/// `"gradient_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`).
pub const DEFAULT_MEMORY_SIZE: usize = 10;

/// Default iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Default relative loss change tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Default tolerance on the norm of the unscaled search direction.
pub const DEFAULT_GRADIENT_TOLERANCE: f64 = 1e-4;

/// Sufficient-decrease (Armijo) constant.
pub const ARMIJO_C1: f64 = 1e-4;

/// Multiplicative step backoff between line-search trials.
pub const STEP_BACKOFF: f64 = 0.9;

/// Maximum number of backoffs after the unit step, so a line search
/// evaluates the loss at most `MAX_LINE_SEARCH_BACKOFFS + 1` times.
pub const MAX_LINE_SEARCH_BACKOFFS: usize = 50;

/// First trial step.
pub const INITIAL_STEP: f64 = 1.0;

/// History updates with `s·y` at or below this value are skipped.
pub const CURVATURE_EPS: f64 = 1e-10;

/// Guards the relative loss change test against a zero denominator.
pub const LOSS_CHANGE_EPS: f64 = 1e-10;

/// Hager–Zhang line search specialized to the raveled parameter types.
pub type HagerZhangLS = HagerZhangLineSearch<Flat, Flat, Cost>;

/// More–Thuente line search specialized to the raveled parameter types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Flat, Flat, Cost>;

/// Reference L-BFGS wired to the Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Flat, Flat, Cost>;

/// Reference L-BFGS wired to the More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Flat, Flat, Cost>;
