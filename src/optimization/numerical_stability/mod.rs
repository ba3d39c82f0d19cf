//! numerical_stability — numerically robust transforms shared by objectives and normalizers.
//!
//! Purpose
//! -------
//! Collect the scalar and vector transforms that the loss functions and
//! vector normalizers rely on, written so they stay finite for logits of any
//! magnitude. Keeping them in one place lets the objective layer assume
//! well-conditioned `f64` arithmetic.
//!
//! Key behaviors
//! -------------
//! - Stable scalar transforms: `safe_logistic` (sigmoid), `safe_softplus`
//!   and the fused logits cross-entropy `bce_with_logits`.
//! - In-place max-shifted softmax over an `ndarray` view (`softmax_in_place`).
//! - Clamped negative log (`neg_log_clamped`) so a zero probability yields a
//!   large finite loss instead of `inf`/`NaN`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite `f64`; these helpers never validate shapes.
//! - `softmax_in_place` leaves a probability vector summing to one for any
//!   finite input.
//!
//! Conventions
//! -----------
//! - Pure functions, no logging, no I/O. Vector routines operate in place on
//!   `ndarray` views to avoid allocation in the objective hot loops.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] compare against naive formulas on safe
//!   grids and check the tails for overflow.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    MIN_PROBABILITY, bce_with_logits, neg_log_clamped, safe_logistic, safe_softplus,
    softmax_in_place,
};

pub mod prelude {
    pub use super::transformations::{
        MIN_PROBABILITY, bce_with_logits, neg_log_clamped, safe_logistic, safe_softplus,
        softmax_in_place,
    };
}
