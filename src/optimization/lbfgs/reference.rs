//! Argmin-backed reference minimizer.
//!
//! Purpose
//! -------
//! Run Argmin's L-BFGS (More–Thuente or Hager–Zhang line search) on the same
//! [`Problem`] / [`Parameters`] pair the native solver uses, so results can
//! be cross-checked against an independent implementation.
//!
//! Key behaviors
//! -------------
//! - Parameters are raveled into one flat vector; the best point found is
//!   unraveled and written back through `Parameters::set`.
//! - Argmin's termination reasons are normalized into
//!   [`TerminationStatus`]: solver convergence, a reached target cost, and a
//!   solver-initiated exit count as converged; everything else (iteration
//!   budget, interrupts) counts as an exhausted budget.
//!
//! Conventions
//! -----------
//! - Argmin errors cross back into [`OptError`] via `From`, so problem
//!   errors raised inside cost or gradient evaluations come back with their
//!   original variant.
use argmin::core::{
    Executor, IterState, Solver, State, TerminationReason,
    TerminationStatus as ArgminTermination,
};
use log::info;

use crate::{
    optimization::{
        errors::{OptError, OptResult},
        lbfgs::{
            adapter::ArgMinAdapter,
            builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
            traits::{LineSearcher, OptimOutcome, Problem, ReferenceOptions, TerminationStatus},
            types::Flat,
            validation::validate_value,
        },
    },
    parameters::Parameters,
    tensor::{DenseVector, ravel, unravel_like},
};

/// Execute an Argmin solver from `x0` and return the best point with the
/// normalized outcome.
///
/// # Errors
/// - Any error raised while running the executor.
/// - `OptError::MissingParameters` if Argmin reports no best point.
/// - `OptError::NonFiniteCost` if the best cost is not finite.
pub fn run_lbfgs<'a, Q, S>(
    x0: Flat, max_iterations: usize, problem: ArgMinAdapter<'a, Q>, solver: S,
) -> OptResult<(Flat, OptimOutcome)>
where
    Q: Problem + ?Sized,
    S: Solver<ArgMinAdapter<'a, Q>, IterState<Flat, Flat, (), (), (), f64>> + Send + 'static,
{
    let mut result = Executor::new(problem, solver)
        .configure(|state| state.param(x0).max_iters(max_iterations as u64))
        .run()?
        .state()
        .clone();

    let iterations = result.get_iter() as usize;
    let fn_evals = result.get_func_counts().clone();
    let status = map_termination(result.get_termination_status());
    let loss = result.get_best_cost();
    validate_value(loss)?;
    let gradient_norm = result.take_gradient().map(|g| g.dot(&g).sqrt());
    let best = result.take_best_param().ok_or(OptError::MissingParameters)?;

    Ok((best, OptimOutcome { status, loss, iterations, gradient_norm, fn_evals }))
}

/// Minimize `problem` with Argmin's L-BFGS, writing the best point back into
/// `params`.
///
/// # Behavior
/// - Ravels `params` into one flat start vector and wraps `problem` in an
///   [`ArgMinAdapter`] that unravels every probe point the same way.
/// - Builds a More–Thuente or Hager–Zhang L-BFGS from `opts.line_searcher`.
/// - Unravels the best point and stores it with `Parameters::set`.
///
/// # Parameters
/// - `params`: Start point; receives the best point found.
/// - `problem`: The same [`Problem`] the native optimizer accepts.
/// - `opts`: History length, iteration budget, optional tolerances and the
///   line search.
///
/// # Errors
/// - `OptError::Solver` for Argmin-side failures (e.g. invalid tolerances).
/// - Errors raised by `problem`, returned with their original variant.
/// - `OptError::MissingParameters` / `OptError::NonFiniteCost` if Argmin
///   ends without a usable best point.
///
/// # Returns
/// An [`OptimOutcome`] with Argmin's termination reason normalized into
/// [`TerminationStatus`] and Argmin's own evaluation counters.
pub fn minimize_reference<P, Q>(
    params: &mut P, problem: &Q, opts: &ReferenceOptions,
) -> OptResult<OptimOutcome>
where
    P: Parameters + ?Sized,
    Q: Problem + ?Sized,
{
    let template = params.get().to_vec();
    let x0 = ravel(&template).into_array();
    let adapter = ArgMinAdapter::new(problem, &template);
    let (best, outcome) = match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(x0, opts.max_iterations, adapter, solver)?
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(x0, opts.max_iterations, adapter, solver)?
        }
    };
    params.set(unravel_like(&template, &DenseVector::from_array(best))?)?;
    info!(
        "Reference L-BFGS finished: {} after {} iterations, loss = {:e}",
        outcome.status, outcome.iterations, outcome.loss
    );
    Ok(outcome)
}

fn map_termination(status: &ArgminTermination) -> TerminationStatus {
    match status {
        ArgminTermination::Terminated(
            TerminationReason::SolverConverged
            | TerminationReason::TargetCostReached
            | TerminationReason::SolverExit(_),
        ) => TerminationStatus::Converged,
        _ => TerminationStatus::MaxIterExceeded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        optimization::lbfgs::traits::{FnProblem, GradAndLoss},
        parameters::LinearParameters,
        tensor::{DenseMatrix, Tensor},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    fn weights(params: &[Tensor]) -> Array2<f64> {
        match params[0].as_matrix() {
            Some(m) => m.densify().into_array(),
            None => Array2::zeros((0, 0)),
        }
    }

    #[test]
    // Purpose
    // -------
    // Both Argmin line searches reach the minimizer of a shifted quadratic
    // and write it back into the parameters.
    //
    // Given
    // -----
    // - LinearParameters 1×3, f(W) = Σ (w − c)² with c = [1, -1, 2].
    //
    // Expect
    // ------
    // - Converged status and weights ≈ c for each line searcher.
    fn reference_solver_recovers_minimizer() {
        let target = array![[1.0, -1.0, 2.0]];
        for searcher in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            // Arrange
            let t1 = target.clone();
            let t2 = target.clone();
            let problem = FnProblem::new(
                move |p: &[Tensor]| {
                    let diff = weights(p) - &t1;
                    Ok(GradAndLoss {
                        loss: diff.mapv(|v| v * v).sum(),
                        gradient: vec![DenseMatrix::from_array(diff * 2.0).into()],
                    })
                },
                move |p: &[Tensor]| Ok((weights(p) - &t2).mapv(|v| v * v).sum()),
            );
            let mut params = LinearParameters::new(2, 1);
            let opts = ReferenceOptions::new(5, 100, Some(1e-10), None, searcher).unwrap();

            // Act
            let outcome = minimize_reference(&mut params, &problem, &opts).unwrap();

            // Assert
            assert_eq!(outcome.status, TerminationStatus::Converged);
            let w = weights(params.get());
            for j in 0..3 {
                assert_abs_diff_eq!(w[[0, j]], target[[0, j]], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn termination_reasons_are_normalized() {
        let converged = ArgminTermination::Terminated(TerminationReason::SolverConverged);
        let budget = ArgminTermination::Terminated(TerminationReason::MaxItersReached);
        assert_eq!(map_termination(&converged), TerminationStatus::Converged);
        assert_eq!(map_termination(&budget), TerminationStatus::MaxIterExceeded);
        assert_eq!(map_termination(&ArgminTermination::NotTerminated), TerminationStatus::MaxIterExceeded);
    }
}
