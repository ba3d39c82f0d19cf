//! lbfgs::finite_diff — numerical gradients for checking analytic ones.
//!
//! Purpose
//! -------
//! Approximate the gradient of a [`Problem`] by finite differences over the
//! raveled parameter vector, and measure how far an analytic gradient is
//! from that approximation. Objectives and models use this in tests to
//! confirm their hand-derived gradients.
//!
//! Key behaviors
//! -------------
//! - [`central_gradient`] prefers central differences and falls back to
//!   forward differences when the central estimate fails validation.
//! - Errors raised by the loss inside the difference closure are captured
//!   and surfaced after the sweep, since `finitediff` closures must return
//!   a bare `f64`.
//! - [`problem_gradient_fd`] returns the estimate in the parameter block
//!   layout; [`max_gradient_error`] reduces the comparison to one number.
//!
//! Invariants & assumptions
//! ------------------------
//! - The loss is smooth around the evaluation point; kinks (e.g. absolute
//!   loss at zero residual) make central differences disagree with any
//!   subgradient.
//!
//! Testing notes
//! -------------
//! - Unit tests cover a quadratic with a known gradient and error capture
//!   from a failing loss.
use std::cell::RefCell;

use finitediff::FiniteDiff;

use crate::{
    optimization::{
        errors::{OptError, OptResult},
        lbfgs::{traits::Problem, types::Flat, validation::validate_grad},
    },
    tensor::{DenseVector, Tensor, ravel, unravel_like},
};

/// central_gradient — finite-difference gradient with error capture.
///
/// Parameters
/// ----------
/// - `x`: `&Flat`
///   Point at which to differentiate.
/// - `func`: `&G`
///   Fallible scalar function of the flat point.
///
/// Returns
/// -------
/// `OptResult<Flat>`
///   Central-difference gradient when it is finite; otherwise a
///   forward-difference gradient if that one is.
///
/// Errors
/// ------
/// - The first error returned by `func` during either sweep.
/// - `OptError::InvalidGradient` when neither estimate is finite.
pub fn central_gradient<G>(x: &Flat, func: &G) -> OptResult<Flat>
where
    G: Fn(&Flat) -> OptResult<f64>,
{
    let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
    let wrapped = |point: &Flat| -> f64 {
        match func(point) {
            Ok(value) => value,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                f64::NAN
            }
        }
    };

    let central = x.central_diff(&wrapped);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    if validate_grad(central.view(), x.len()).is_ok() {
        return Ok(central);
    }

    let forward = x.forward_diff(&wrapped);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    validate_grad(forward.view(), x.len())?;
    Ok(forward)
}

/// Finite-difference gradient of `problem.loss` at `params`, laid out like
/// `params`.
pub fn problem_gradient_fd<Q: Problem + ?Sized>(
    problem: &Q, params: &[Tensor],
) -> OptResult<Vec<Tensor>> {
    let x = ravel(params).into_array();
    let loss = |point: &Flat| -> OptResult<f64> {
        let blocks = unravel_like(params, &DenseVector::from_array(point.clone()))?;
        problem.loss(&blocks)
    };
    let gradient = central_gradient(&x, &loss)?;
    Ok(unravel_like(params, &DenseVector::from_array(gradient))?)
}

/// Largest absolute difference between the analytic gradient returned by
/// `loss_and_grad` and its finite-difference estimate.
///
/// # Errors
/// - `OptError::GradientDimMismatch` if the analytic gradient does not
///   cover the parameters.
/// - Any error raised by the problem.
pub fn max_gradient_error<Q: Problem + ?Sized>(problem: &Q, params: &[Tensor]) -> OptResult<f64> {
    let analytic = ravel(&problem.loss_and_grad(params)?.gradient);
    let numeric = ravel(&problem_gradient_fd(problem, params)?);
    validate_grad(analytic.view(), numeric.size())?;
    Ok(analytic
        .as_array()
        .iter()
        .zip(numeric.as_array().iter())
        .fold(0.0, |acc: f64, (a, n)| acc.max((a - n).abs())))
}
