//! Public API surface for loss minimization.
//!
//! - [`Problem`]: trait users implement for a differentiable loss over a
//!   tensor array (or [`FnProblem`] around two closures).
//! - [`LbfgsOptions`]: configuration for the native optimizer.
//! - [`ReferenceOptions`] and [`LineSearcher`]: configuration for the
//!   Argmin-backed reference solver.
//! - [`TerminationStatus`] and [`OptimOutcome`]: normalized run results.
//!
//! Convention: the loss is *minimized*, and gradients are gradients of the
//! loss itself (no sign flips anywhere in the optimizer layer).
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    optimization::{
        errors::{OptError, OptResult},
        lbfgs::{
            types::{
                DEFAULT_GRADIENT_TOLERANCE, DEFAULT_MAX_ITERATIONS, DEFAULT_MEMORY_SIZE,
                DEFAULT_TOLERANCE, FnEvalMap,
            },
            validation::{verify_max_iter, verify_memory, verify_tol_grad, verify_tolerance},
        },
    },
    tensor::Tensor,
};

/// Loss and gradient at one point, one gradient block per parameter block.
#[derive(Debug, Clone, PartialEq)]
pub struct GradAndLoss {
    pub loss: f64,
    pub gradient: Vec<Tensor>,
}

/// A differentiable loss over a tensor array.
///
/// Required:
/// - `loss_and_grad(&[Tensor]) -> OptResult<GradAndLoss>`: evaluate the loss
///   and its gradient at the given parameters. The gradient array must match
///   the parameter array block for block.
///
/// Optional:
/// - `loss(&[Tensor]) -> OptResult<f64>`: loss only, used by the line search.
///   The default evaluates `loss_and_grad` and drops the gradient; override
///   it when the loss alone is cheaper.
pub trait Problem {
    fn loss_and_grad(&self, params: &[Tensor]) -> OptResult<GradAndLoss>;

    fn loss(&self, params: &[Tensor]) -> OptResult<f64> {
        Ok(self.loss_and_grad(params)?.loss)
    }
}

/// [`Problem`] built from a loss-and-gradient closure and a loss-only closure.
pub struct FnProblem<G, L> {
    loss_and_grad: G,
    loss: L,
}

impl<G, L> FnProblem<G, L>
where
    G: Fn(&[Tensor]) -> OptResult<GradAndLoss>,
    L: Fn(&[Tensor]) -> OptResult<f64>,
{
    pub fn new(loss_and_grad: G, loss: L) -> Self {
        Self { loss_and_grad, loss }
    }
}

impl<G, L> Problem for FnProblem<G, L>
where
    G: Fn(&[Tensor]) -> OptResult<GradAndLoss>,
    L: Fn(&[Tensor]) -> OptResult<f64>,
{
    fn loss_and_grad(&self, params: &[Tensor]) -> OptResult<GradAndLoss> {
        (self.loss_and_grad)(params)
    }

    fn loss(&self, params: &[Tensor]) -> OptResult<f64> {
        (self.loss)(params)
    }
}

/// Native L-BFGS configuration.
///
/// Fields:
/// - `memory_size` — number of `(s, y)` pairs kept (`m ≥ 1`).
/// - `max_iterations` — iteration budget (`≥ 1`).
/// - `tolerance` — relative loss change below which the run converges.
/// - `gradient_tolerance` — norm of the unscaled search direction below
///   which the run converges.
///
/// Default: `10`, `1000`, `1e-5`, `1e-4`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LbfgsOptions {
    pub memory_size: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub gradient_tolerance: f64,
}

impl LbfgsOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// - [`OptError::InvalidLbfgsMem`] if `memory_size == 0`.
    /// - [`OptError::InvalidMaxIter`] if `max_iterations == 0`.
    /// - [`OptError::InvalidTolerance`] / [`OptError::InvalidTolGrad`] for
    ///   non-finite or non-positive tolerances.
    pub fn new(
        memory_size: usize, max_iterations: usize, tolerance: f64, gradient_tolerance: f64,
    ) -> OptResult<Self> {
        verify_memory(memory_size)?;
        verify_max_iter(max_iterations)?;
        verify_tolerance(tolerance)?;
        verify_tol_grad(gradient_tolerance)?;
        Ok(Self { memory_size, max_iterations, tolerance, gradient_tolerance })
    }

    /// Re-run the constructor checks, e.g. after deserialization.
    pub fn validate(&self) -> OptResult<()> {
        Self::new(self.memory_size, self.max_iterations, self.tolerance, self.gradient_tolerance)
            .map(|_| ())
    }
}

impl Default for LbfgsOptions {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            gradient_tolerance: DEFAULT_GRADIENT_TOLERANCE,
        }
    }
}

/// Choice of line search used inside the reference solver.
///
/// Parsing:
/// This enum implements `FromStr` and accepts case-insensitive names
/// (`"MoreThuente"`, `"HagerZhang"`). Unknown names return
/// `OptError::InvalidLineSearch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Configuration for the Argmin reference solver.
///
/// - `memory_size`, `max_iterations`: as for [`LbfgsOptions`].
/// - `tol_grad`, `tol_cost`: optional Argmin stopping tolerances; `None`
///   keeps Argmin's defaults.
/// - `line_searcher`: More–Thuente (default) or Hager–Zhang.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceOptions {
    pub memory_size: usize,
    pub max_iterations: usize,
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub line_searcher: LineSearcher,
}

impl ReferenceOptions {
    pub fn new(
        memory_size: usize, max_iterations: usize, tol_grad: Option<f64>, tol_cost: Option<f64>,
        line_searcher: LineSearcher,
    ) -> OptResult<Self> {
        verify_memory(memory_size)?;
        verify_max_iter(max_iterations)?;
        if let Some(tol) = tol_grad {
            verify_tol_grad(tol)?;
        }
        if let Some(tol) = tol_cost {
            verify_tolerance(tol)?;
        }
        Ok(Self { memory_size, max_iterations, tol_grad, tol_cost, line_searcher })
    }
}

impl Default for ReferenceOptions {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tol_grad: Some(1e-8),
            tol_cost: None,
            line_searcher: LineSearcher::MoreThuente,
        }
    }
}

/// Terminal state of an optimizer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationStatus {
    /// Loss change or direction norm fell below tolerance.
    Converged,
    /// A non-finite loss, gradient, or direction was produced; the last
    /// finite parameters were kept.
    Diverged,
    /// The iteration budget ran out.
    MaxIterExceeded,
}

impl TerminationStatus {
    pub fn is_converged(self) -> bool {
        self == TerminationStatus::Converged
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationStatus::Converged => write!(f, "Converged"),
            TerminationStatus::Diverged => write!(f, "Diverged"),
            TerminationStatus::MaxIterExceeded => write!(f, "Maximum iterations exceeded"),
        }
    }
}

/// Canonical result of a run.
///
/// - `status`: why the run stopped.
/// - `loss`: loss at the returned parameters.
/// - `iterations`: completed iterations.
/// - `gradient_norm`: norm of the gradient at the returned parameters, when
///   known.
/// - `fn_evals`: evaluation counters (`cost_count`, `gradient_count`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimOutcome {
    pub status: TerminationStatus,
    pub loss: f64,
    pub iterations: usize,
    pub gradient_norm: Option<f64>,
    pub fn_evals: FnEvalMap,
}

impl OptimOutcome {
    pub fn converged(&self) -> bool {
        self.status.is_converged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Defaults carry the documented values and `new` rejects each invalid
    // field with its own error variant.
    fn lbfgs_options_defaults_and_validation() {
        let d = LbfgsOptions::default();
        assert_eq!((d.memory_size, d.max_iterations), (10, 1000));
        assert_eq!((d.tolerance, d.gradient_tolerance), (1e-5, 1e-4));
        assert!(d.validate().is_ok());

        assert!(matches!(LbfgsOptions::new(0, 10, 1e-4, 1e-4), Err(OptError::InvalidLbfgsMem { .. })));
        assert!(matches!(LbfgsOptions::new(5, 0, 1e-4, 1e-4), Err(OptError::InvalidMaxIter { .. })));
        assert!(matches!(LbfgsOptions::new(5, 10, 0.0, 1e-4), Err(OptError::InvalidTolerance { .. })));
        assert!(matches!(
            LbfgsOptions::new(5, 10, 1e-4, f64::INFINITY),
            Err(OptError::InvalidTolGrad { .. })
        ));
    }

    #[test]
    fn line_searcher_parses_case_insensitively() {
        assert_eq!("morethuente".parse::<LineSearcher>(), Ok(LineSearcher::MoreThuente));
        assert_eq!("HAGERZHANG".parse::<LineSearcher>(), Ok(LineSearcher::HagerZhang));
        assert!(matches!(
            "backtracking".parse::<LineSearcher>(),
            Err(OptError::InvalidLineSearch { .. })
        ));
    }

    #[test]
    fn fn_problem_default_and_explicit_loss() {
        let problem = FnProblem::new(
            |_: &[Tensor]| Ok(GradAndLoss { loss: 2.0, gradient: Vec::new() }),
            |_: &[Tensor]| Ok(3.0),
        );
        assert_eq!(problem.loss_and_grad(&[]).unwrap().loss, 2.0);
        assert_eq!(problem.loss(&[]).unwrap(), 3.0);
    }
}
