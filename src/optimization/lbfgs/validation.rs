//! Validation helpers for the L-BFGS layer.
//!
//! - **Option checks**: [`verify_memory`], [`verify_max_iter`],
//!   [`verify_tolerance`], [`verify_tol_grad`] reject zero budgets and
//!   non-finite or non-positive tolerances.
//! - **Gradient validation**: [`validate_grad`] enforces the flat gradient
//!   length and finite entries.
//! - **Loss values**: [`validate_value`] rejects non-finite losses.
//!
//! All helpers return domain-specific [`OptError`] variants so callers can
//! propagate with `?`.
use ndarray::ArrayView1;

use crate::optimization::errors::{OptError, OptResult};

/// History size must be at least one.
pub fn verify_memory(mem: usize) -> OptResult<()> {
    if mem == 0 {
        return Err(OptError::InvalidLbfgsMem {
            mem,
            reason: "L-BFGS memory must be greater than zero.",
        });
    }
    Ok(())
}

pub fn verify_max_iter(max_iter: usize) -> OptResult<()> {
    if max_iter == 0 {
        return Err(OptError::InvalidMaxIter {
            max_iter,
            reason: "Maximum iterations must be greater than zero.",
        });
    }
    Ok(())
}

/// Validate the relative loss change tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolerance`] if the value is non-finite or ≤ 0.0.
pub fn verify_tolerance(tol: f64) -> OptResult<()> {
    if !tol.is_finite() {
        return Err(OptError::InvalidTolerance { tol, reason: "Tolerance must be finite." });
    }
    if tol <= 0.0 {
        return Err(OptError::InvalidTolerance { tol, reason: "Tolerance must be positive." });
    }
    Ok(())
}

/// Validate the gradient-norm tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolGrad`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_grad(tol: f64) -> OptResult<()> {
    if !tol.is_finite() {
        return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
    }
    if tol <= 0.0 {
        return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
    }
    Ok(())
}

/// Validate a flat gradient against dimension and finiteness.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if the length does not match `dim`.
/// - [`OptError::InvalidGradient`] with the index/value of the first
///   offending element.
pub fn validate_grad(grad: ArrayView1<'_, f64>, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate that a loss value is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}
