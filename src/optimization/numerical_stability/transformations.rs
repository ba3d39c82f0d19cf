//! Numerical stability utilities.
//!
//! Provides safe implementations of common nonlinear transforms
//! that are prone to overflow/underflow in naïve form.
//! The functions here follow guarded strategies similar to those
//! in major ML libraries (e.g. PyTorch, TensorFlow), using explicit
//! cutoffs (`x > 20.0`) or sign-split evaluation to keep `f64`
//! arithmetic in a well-conditioned regime.
//!
//! # Provided items
//! - [`MIN_PROBABILITY`]: smallest probability fed to a logarithm.
//! - [`safe_logistic(x)`]: sigmoid `1 / (1 + exp(-x))` without overflow.
//! - [`safe_softplus(x)`]: stable version of `ln(1 + exp(x))`.
//! - [`bce_with_logits(x, y)`]: binary cross-entropy of a logit against a
//!   0/1 label in the form `max(x, 0) - x·y + ln1p(exp(-|x|))`.
//! - [`softmax_in_place(values)`]: max-shifted softmax.
//! - [`neg_log_clamped(p)`]: `-ln(max(p, MIN_PROBABILITY))`.
use ndarray::ArrayViewMut1;

/// Smallest probability passed to `ln` by the log-loss objectives.
///
/// `-ln(f64::MIN_POSITIVE) ≈ 708.4`, so a probability that underflows to
/// zero produces a large but finite loss.
pub const MIN_PROBABILITY: f64 = f64::MIN_POSITIVE;

/// Numerically stable logistic sigmoid.
///
/// Splits on the sign of `x` so `exp` is only ever evaluated on a
/// non-positive argument.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
///
/// - For sufficiently large `x`, `softplus(x) ≈ x`.
/// - Otherwise, it falls back to `ln1p(exp(x))`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Binary cross-entropy of a logit `x` against a label `y ∈ {0, 1}`.
///
/// Equal to `-y·ln σ(x) - (1-y)·ln(1-σ(x))`, evaluated as
/// `max(x, 0) - x·y + ln1p(exp(-|x|))` so neither branch overflows.
pub fn bce_with_logits(x: f64, y: f64) -> f64 {
    x.max(0.0) - x * y + (-x.abs()).exp().ln_1p()
}

/// Negative log of a probability, clamped at [`MIN_PROBABILITY`].
pub fn neg_log_clamped(p: f64) -> f64 {
    -p.max(MIN_PROBABILITY).ln()
}

/// Max-shifted softmax applied in place.
///
/// Subtracting the maximum before exponentiating keeps every exponent
/// non-positive, so the largest entry maps to `exp(0) = 1` and the sum is at
/// least one. Empty views are left untouched.
pub fn softmax_in_place(mut values: ArrayViewMut1<'_, f64>) {
    if values.is_empty() {
        return;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    values.mapv_inplace(|v| {
        let e = (v - max).exp();
        sum += e;
        e
    });
    values.mapv_inplace(|v| v / sum);
}
