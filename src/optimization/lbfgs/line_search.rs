//! Backtracking line search with the Armijo sufficient-decrease test.
//!
//! Each trial point is rebuilt from the base parameters, so no error
//! accumulates across trials. A trial is accepted when
//! `loss(x + α·d) ≤ loss(x) + α·c1·(d·∇f)`; otherwise `α` shrinks by
//! [`STEP_BACKOFF`]. A non-finite trial loss never satisfies the test. After
//! the unit step and [`MAX_LINE_SEARCH_BACKOFFS`] backoffs the last step
//! (`0.9^50`) is returned and flagged as stalled.
use log::{debug, warn};

use crate::{
    optimization::{
        errors::OptResult,
        lbfgs::{
            traits::Problem,
            types::{ARMIJO_C1, INITIAL_STEP, MAX_LINE_SEARCH_BACKOFFS, STEP_BACKOFF},
        },
    },
    tensor::Tensor,
};

/// Result of one line search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchOutcome {
    /// Accepted step length `α`.
    pub step: f64,
    /// Loss at `x + α·d`.
    pub loss: f64,
    /// Loss evaluations performed.
    pub evaluations: usize,
    /// `true` when no trial met the sufficient-decrease test.
    pub stalled: bool,
}

/// `base + step · direction`, block by block.
pub fn trial_point(base: &[Tensor], direction: &[Tensor], step: f64) -> OptResult<Vec<Tensor>> {
    let mut point = base.to_vec();
    for (block, dir) in point.iter_mut().zip(direction) {
        block.intersect_and_add_in_place(dir, |v| v * step)?;
    }
    Ok(point)
}

/// Search along `direction` from `base`.
///
/// `directional_derivative` is `d·∇f(base)`; it is negative for a descent
/// direction.
pub fn backtracking<Q: Problem + ?Sized>(
    problem: &Q, base: &[Tensor], base_loss: f64, direction: &[Tensor],
    directional_derivative: f64,
) -> OptResult<LineSearchOutcome> {
    let sufficient =
        |step: f64, loss: f64| loss <= base_loss + step * ARMIJO_C1 * directional_derivative;
    let mut step = INITIAL_STEP;
    let mut loss = problem.loss(&trial_point(base, direction, step)?)?;
    let mut backoffs = 0;
    while !sufficient(step, loss) {
        if backoffs == MAX_LINE_SEARCH_BACKOFFS {
            warn!(
                "Line search hit {MAX_LINE_SEARCH_BACKOFFS} backoffs without sufficient decrease; \
                 accepting step {step:e} (loss = {loss:e})"
            );
            return Ok(LineSearchOutcome { step, loss, evaluations: backoffs + 1, stalled: true });
        }
        step *= STEP_BACKOFF;
        backoffs += 1;
        loss = problem.loss(&trial_point(base, direction, step)?)?;
    }
    debug!("Line search accepted step {step:e} after {backoffs} backoff(s), loss = {loss:e}");
    Ok(LineSearchOutcome { step, loss, evaluations: backoffs + 1, stalled: false })
}
