use crate::{
    optimization::{
        errors::OptResult,
        lbfgs::{
            observer::{IterationObserver, NoopObserver},
            solver::Lbfgs,
            traits::{LbfgsOptions, OptimOutcome, Problem},
        },
    },
    parameters::Parameters,
};

/// Minimize `problem` in place with the native L-BFGS optimizer.
///
/// # Behavior
/// - Validates `options` (they may have been deserialized).
/// - Runs a fresh [`Lbfgs`] from the current contents of `params` and writes
///   the final iterate back through [`Parameters::set`] / [`Parameters::update`].
///
/// # Parameters
/// - `params`: Any [`Parameters`] container; its blocks are the start point.
/// - `problem`: The [`Problem`] supplying loss and gradient.
/// - `options`: History length, iteration budget and tolerances.
///
/// # Errors
/// - `OptError::InvalidLbfgsMem`, `InvalidMaxIter`, `InvalidTolerance` or
///   `InvalidTolGrad` for bad options.
/// - Everything [`Lbfgs::optimize`] returns.
///
/// # Returns
/// An [`OptimOutcome`]; check [`OptimOutcome::converged`] or its `status`.
pub fn minimize<P, Q>(params: &mut P, problem: &Q, options: &LbfgsOptions) -> OptResult<OptimOutcome>
where
    P: Parameters + ?Sized,
    Q: Problem + ?Sized,
{
    minimize_observed(params, problem, options, &mut NoopObserver)
}

/// [`minimize`] with a per-iteration observer.
///
/// # Parameters
/// - `observer`: Receives `(iteration, loss, gradient_norm, step_size)` after
///   every accepted step; use `RecordingObserver` to keep them or
///   `LogObserver` to log them.
///
/// # Errors
/// Same as [`minimize`].
pub fn minimize_observed<P, Q, O>(
    params: &mut P, problem: &Q, options: &LbfgsOptions, observer: &mut O,
) -> OptResult<OptimOutcome>
where
    P: Parameters + ?Sized,
    Q: Problem + ?Sized,
    O: IterationObserver + ?Sized,
{
    options.validate()?;
    Lbfgs::new(*options).optimize(params, problem, observer)
}
