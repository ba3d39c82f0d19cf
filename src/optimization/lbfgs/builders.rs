//! Construction of the Argmin L-BFGS solvers used by the reference path.
//!
//! Each builder picks a line search, sets the history size from
//! [`ReferenceOptions::memory_size`], and applies the optional gradient and
//! cost tolerances through [`configure_lbfgs`].
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    lbfgs::{
        traits::ReferenceOptions,
        types::{Cost, Flat, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente, MoreThuenteLS},
    },
};

pub fn build_optimizer_hager_zhang(opts: &ReferenceOptions) -> OptResult<LbfgsHagerZhang> {
    let lbfgs = LbfgsHagerZhang::new(HagerZhangLS::new(), opts.memory_size);
    configure_lbfgs(lbfgs, opts)
}

pub fn build_optimizer_more_thuente(opts: &ReferenceOptions) -> OptResult<LbfgsMoreThuente> {
    let lbfgs = LbfgsMoreThuente::new(MoreThuenteLS::new(), opts.memory_size);
    configure_lbfgs(lbfgs, opts)
}

/// Apply the optional tolerances to a freshly built solver.
///
/// # Errors
/// Argmin rejects negative tolerances; the error is surfaced as
/// `OptError::Solver`.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Flat, Flat, Cost>, opts: &ReferenceOptions,
) -> OptResult<LBFGS<L, Flat, Flat, Cost>> {
    if let Some(g) = opts.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}
