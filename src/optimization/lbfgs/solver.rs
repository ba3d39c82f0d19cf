//! Native L-BFGS over a [`Parameters`] container.
//!
//! Purpose
//! -------
//! Minimize a [`Problem`] by updating a parameters container in place. The
//! optimizer works on the raveled gradient (row-major concatenation of the
//! gradient blocks) and maps search directions back onto the parameter
//! block shapes before applying them through `Parameters::update`.
//!
//! Key behaviors
//! -------------
//! - Two-loop recursion over a circular curvature history; the very first
//!   direction is the unit-normalized negative gradient.
//! - Backtracking Armijo line search from `line_search`.
//! - Convergence checks in priority order: relative loss change, norm of the
//!   unscaled direction, then non-finite direction (divergence).
//! - Divergence restores the last finite parameters instead of failing.
//!
//! Invariants & assumptions
//! ------------------------
//! - The problem returns one gradient block per parameter block, with the
//!   same shape.
//! - `optimize` takes `&mut self`, so one optimizer cannot run two
//!   optimizations at once; its history is reset at the start of each run.
//!
//! Conventions
//! -----------
//! - Logging: `info!` on convergence and on an exhausted budget, `warn!` on
//!   divergence, `debug!` for skipped history updates and line searches.
//! - Errors are reserved for malformed inputs (shape mismatches, a non-finite
//!   starting loss, problem failures); numerical breakdown mid-run is a
//!   [`TerminationStatus::Diverged`] outcome.
use log::{debug, info, warn};

use crate::{
    optimization::{
        errors::OptResult,
        lbfgs::{
            history::GradientHistory,
            line_search::backtracking,
            observer::{IterationObserver, IterationRecord},
            traits::{GradAndLoss, LbfgsOptions, OptimOutcome, Problem, TerminationStatus},
            types::{FnEvalMap, LOSS_CHANGE_EPS},
            validation::{validate_grad, validate_value},
        },
    },
    parameters::Parameters,
    tensor::{DenseVector, ravel, total_len, unravel_like},
};

/// Limited-memory BFGS optimizer.
#[derive(Debug, Clone)]
pub struct Lbfgs {
    options: LbfgsOptions,
    history: GradientHistory,
}

struct Counters {
    cost: u64,
    gradient: u64,
}

impl Counters {
    fn into_map(self) -> FnEvalMap {
        FnEvalMap::from([
            ("cost_count".to_string(), self.cost),
            ("gradient_count".to_string(), self.gradient),
        ])
    }
}

impl Default for Lbfgs {
    fn default() -> Self {
        Self::new(LbfgsOptions::default())
    }
}

impl Lbfgs {
    /// Lbfgs::new — optimizer with an empty history sized from `options`.
    ///
    /// Parameters
    /// ----------
    /// - `options`: `LbfgsOptions`
    ///   History length, iteration budget and both tolerances. They are
    ///   taken as given; [`minimize`](crate::optimization::lbfgs::minimize) validates them
    ///   first.
    ///
    /// Returns
    /// -------
    /// `Lbfgs`
    ///   Optimizer ready for [`Lbfgs::optimize`]. The history is cleared at
    ///   the start of every run, so one instance can be reused.
    pub fn new(options: LbfgsOptions) -> Self {
        Self { options, history: GradientHistory::new(options.memory_size) }
    }

    /// Options this optimizer was built with.
    pub fn options(&self) -> &LbfgsOptions {
        &self.options
    }

    /// Lbfgs::optimize — minimize `problem` starting from, and writing back
    /// into, `params`.
    ///
    /// Parameters
    /// ----------
    /// - `params`: `&mut P`
    ///   Starting point. Holds the final iterate on return; after a
    ///   divergence it holds the last finite iterate.
    /// - `problem`: `&Q`
    ///   Loss and gradient over the parameter blocks.
    /// - `observer`: `&mut O`
    ///   Receives one [`IterationRecord`] per accepted iteration.
    ///
    /// Returns
    /// -------
    /// `OptResult<OptimOutcome>`
    ///   Termination status, final loss, iteration count, final direction
    ///   norm and the `cost_count` / `gradient_count` evaluation counters.
    ///   Divergence and an exhausted budget are statuses, not errors.
    ///
    /// Errors
    /// ------
    /// - `OptError::NonFiniteCost` / `OptError::InvalidGradient` if the
    ///   starting point already has a non-finite loss or gradient.
    /// - `OptError::GradientDimMismatch` if the gradient blocks do not
    ///   cover the parameter blocks.
    /// - Any error returned by the problem or by the parameters container.
    pub fn optimize<P, Q, O>(
        &mut self, params: &mut P, problem: &Q, observer: &mut O,
    ) -> OptResult<OptimOutcome>
    where
        P: Parameters + ?Sized,
        Q: Problem + ?Sized,
        O: IterationObserver + ?Sized,
    {
        self.history.clear();
        let dim = total_len(params.get());
        let mut counters = Counters { cost: 0, gradient: 0 };

        let GradAndLoss { loss: mut loss, gradient } = problem.loss_and_grad(params.get())?;
        counters.gradient += 1;
        validate_value(loss)?;
        let mut grad = ravel(&gradient);
        validate_grad(grad.view(), dim)?;

        let mut iteration = 0;
        let status = loop {
            if iteration >= self.options.max_iterations {
                info!("L-BFGS stopped after {iteration} iterations without converging");
                break TerminationStatus::MaxIterExceeded;
            }

            let mut direction = grad.clone();
            self.history.two_loop(&mut direction)?;
            let direction_norm = direction.two_norm();
            if !direction_norm.is_finite() {
                warn!("L-BFGS diverged at iteration {iteration}: direction norm {direction_norm}");
                break TerminationStatus::Diverged;
            }
            if self.history.is_empty() && direction_norm > 0.0 {
                direction.scale_in_place(1.0 / direction_norm);
            }
            direction.scale_in_place(-1.0);

            let mut slope = direction.dot_dense(&grad)?;
            if !(slope < 0.0) && direction_norm > 0.0 {
                debug!("L-BFGS direction is not a descent direction; resetting history");
                self.history.clear();
                direction = grad.scale(-1.0 / grad.two_norm());
                slope = direction.dot_dense(&grad)?;
            }

            let direction_blocks = unravel_like(params.get(), &direction)?;
            let search = backtracking(problem, params.get(), loss, &direction_blocks, slope)?;
            counters.cost += search.evaluations as u64;

            observer.observe(&IterationRecord {
                iteration: iteration + 1,
                loss: search.loss,
                gradient_norm: direction_norm,
                step_size: search.step,
            });

            let loss_converged = (search.loss - loss).abs() * 2.0
                < self.options.tolerance * (search.loss.abs() + loss.abs() + LOSS_CHANGE_EPS);
            let direction_converged = direction_norm < self.options.gradient_tolerance;

            let snapshot = params.get().to_vec();
            let mut step_blocks = direction_blocks;
            step_blocks.iter_mut().for_each(|block| block.scale_in_place(search.step));
            params.update(&step_blocks)?;

            let GradAndLoss { loss: next_loss, gradient: next_gradient } =
                problem.loss_and_grad(params.get())?;
            counters.gradient += 1;
            let next_grad = ravel(&next_gradient);
            if !next_loss.is_finite() || validate_grad(next_grad.view(), dim).is_err() {
                warn!(
                    "L-BFGS diverged at iteration {}: loss = {next_loss}; \
                     restoring last finite parameters",
                    iteration + 1
                );
                params.set(snapshot)?;
                break TerminationStatus::Diverged;
            }
            iteration += 1;

            let s = direction.scale(search.step);
            let y = gradient_change(&next_grad, &grad)?;
            loss = next_loss;
            grad = next_grad;

            if loss_converged || direction_converged {
                info!("L-BFGS converged after {iteration} iterations, loss = {loss:e}");
                break TerminationStatus::Converged;
            }
            self.history.push(s, y)?;
        };

        Ok(OptimOutcome {
            status,
            loss,
            iterations: iteration,
            gradient_norm: Some(grad.two_norm()),
            fn_evals: counters.into_map(),
        })
    }
}

fn gradient_change(next: &DenseVector, previous: &DenseVector) -> OptResult<DenseVector> {
    let mut y = next.clone();
    y.scaled_add(-1.0, previous)?;
    Ok(y)
}
