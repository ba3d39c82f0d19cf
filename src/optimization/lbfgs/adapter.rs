//! Adapter that exposes a tensor [`Problem`] as an `argmin` problem.
//!
//! Argmin works on one flat vector, so the adapter carries the parameter
//! template (block shapes) and converts in both directions: the flat point
//! is unraveled into blocks before calling the problem, and the returned
//! gradient blocks are raveled back. The loss is minimized as-is; there is
//! no sign flip.
use crate::{
    optimization::{
        errors::OptError,
        lbfgs::{
            traits::Problem,
            types::{Cost, Flat},
            validation::validate_grad,
        },
    },
    tensor::{DenseVector, Tensor, ravel, total_len, unravel_like},
};
use argmin::core::{CostFunction, Error, Gradient};

/// Bridges a [`Problem`] to `argmin`'s `CostFunction` and `Gradient`.
///
/// - `CostFunction::cost` returns `problem.loss(blocks)`, rejecting
///   non-finite values with `NonFiniteCost`.
/// - `Gradient::gradient` returns the raveled `loss_and_grad` gradient after
///   dimension and finiteness checks.
pub struct ArgMinAdapter<'a, Q: Problem + ?Sized> {
    pub problem: &'a Q,
    pub template: &'a [Tensor],
}

impl<'a, Q: Problem + ?Sized> ArgMinAdapter<'a, Q> {
    pub fn new(problem: &'a Q, template: &'a [Tensor]) -> Self {
        Self { problem, template }
    }

    /// Number of scalar parameters seen by Argmin.
    pub fn dim(&self) -> usize {
        total_len(self.template)
    }

    /// Rebuild parameter blocks from a flat point.
    pub fn blocks(&self, flat: &Flat) -> Result<Vec<Tensor>, OptError> {
        Ok(unravel_like(self.template, &DenseVector::from_array(flat.clone()))?)
    }
}

impl<'a, Q: Problem + ?Sized> CostFunction for ArgMinAdapter<'a, Q> {
    type Param = Flat;
    type Output = Cost;

    fn cost(&self, flat: &Self::Param) -> Result<Self::Output, Error> {
        let blocks = self.blocks(flat)?;
        let output = self.problem.loss(&blocks)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(output)
    }
}

impl<'a, Q: Problem + ?Sized> Gradient for ArgMinAdapter<'a, Q> {
    type Param = Flat;
    type Gradient = Flat;

    /// # Errors
    /// - Propagates problem errors.
    /// - `GradientDimMismatch` / `InvalidGradient` if the raveled gradient
    ///   has the wrong length or non-finite entries.
    fn gradient(&self, flat: &Self::Param) -> Result<Self::Gradient, Error> {
        let blocks = self.blocks(flat)?;
        let gradient = ravel(&self.problem.loss_and_grad(&blocks)?.gradient);
        validate_grad(gradient.view(), self.dim())?;
        Ok(gradient.into_array())
    }
}
