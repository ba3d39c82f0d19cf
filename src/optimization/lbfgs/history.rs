//! Fixed-capacity curvature history and the two-loop recursion.
//!
//! Entries `(s, y, rho = 1 / s·y)` live in a circular buffer: the slot for
//! the `k`-th oldest entry is `(write_index + capacity - len + k) % capacity`,
//! so once full the newest pair overwrites the oldest in place. `gamma =
//! s·y / y·y` of the newest accepted pair scales the initial inverse Hessian
//! guess; it stays at 1 until a pair has been accepted.
//!
//! Pairs with `s·y ≤ CURVATURE_EPS` are skipped so the implicit inverse
//! Hessian stays positive definite.
use log::debug;

use crate::{
    optimization::{errors::OptResult, lbfgs::types::CURVATURE_EPS},
    tensor::DenseVector,
};

#[derive(Debug, Clone)]
struct HistoryEntry {
    s: DenseVector,
    y: DenseVector,
    rho: f64,
}

/// Circular buffer of the most recent `capacity` curvature pairs.
#[derive(Debug, Clone)]
pub struct GradientHistory {
    capacity: usize,
    entries: Vec<HistoryEntry>,
    len: usize,
    write_index: usize,
    gamma: f64,
}

impl GradientHistory {
    /// `capacity` must be at least one; `LbfgsOptions` enforces this.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, entries: Vec::with_capacity(capacity), len: 0, write_index: 0, gamma: 1.0 }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
        self.write_index = 0;
        self.gamma = 1.0;
    }

    fn slot(&self, k: usize) -> usize {
        (self.write_index + self.capacity - self.len + k) % self.capacity
    }

    /// Record a step `s` and gradient change `y`.
    ///
    /// Returns `false` (and leaves the history untouched) when the pair
    /// fails the curvature condition.
    pub fn push(&mut self, s: DenseVector, y: DenseVector) -> OptResult<bool> {
        let sy = s.dot_dense(&y)?;
        if !(sy > CURVATURE_EPS) {
            debug!("Skipping L-BFGS history update: s·y = {sy:e}");
            return Ok(false);
        }
        let yy = y.dot_dense(&y)?;
        self.gamma = sy / yy;

        let entry = HistoryEntry { s, y, rho: 1.0 / sy };
        if self.entries.len() < self.capacity {
            self.entries.push(entry);
        } else {
            self.entries[self.write_index] = entry;
        }
        self.write_index = (self.write_index + 1) % self.capacity;
        self.len = (self.len + 1).min(self.capacity);
        Ok(true)
    }

    /// Overwrite `q` (a gradient) with `H·q`, the inverse-Hessian estimate
    /// applied to it.
    pub fn two_loop(&self, q: &mut DenseVector) -> OptResult<()> {
        let mut alpha = vec![0.0; self.len];
        for k in (0..self.len).rev() {
            let entry = &self.entries[self.slot(k)];
            alpha[k] = entry.rho * entry.s.dot_dense(q)?;
            q.scaled_add(-alpha[k], &entry.y)?;
        }

        q.scale_in_place(self.gamma);

        for (k, &a) in alpha.iter().enumerate() {
            let entry = &self.entries[self.slot(k)];
            let beta = entry.rho * entry.y.dot_dense(q)?;
            q.scaled_add(a - beta, &entry.s)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dv(values: &[f64]) -> DenseVector {
        DenseVector::from_vec(values.to_vec())
    }

    #[test]
    // Purpose
    // -------
    // An empty history leaves the gradient unchanged (gamma = 1).
    fn empty_history_is_identity() {
        let history = GradientHistory::new(3);
        let mut q = dv(&[1.0, -2.0]);
        history.two_loop(&mut q).unwrap();
        assert_eq!(q.to_vec(), vec![1.0, -2.0]);
        assert_eq!(history.gamma(), 1.0);
    }

    #[test]
    // Purpose
    // -------
    // Pairs failing the curvature condition are skipped, including NaN.
    fn curvature_guard_skips_bad_pairs() {
        let mut history = GradientHistory::new(3);
        assert!(!history.push(dv(&[1.0, 0.0]), dv(&[-1.0, 0.0])).unwrap());
        assert!(!history.push(dv(&[1.0, 0.0]), dv(&[f64::NAN, 0.0])).unwrap());
        assert!(history.is_empty());
        assert!(history.push(dv(&[1.0, 0.0]), dv(&[2.0, 0.0])).unwrap());
        assert_eq!(history.len(), 1);
    }

    #[test]
    // Purpose
    // -------
    // The buffer never exceeds its capacity and evicts the oldest pair.
    //
    // Given
    // -----
    // - Capacity 2 and three accepted pairs with distinct curvature.
    //
    // Expect
    // ------
    // - `len()` stays at 2 and `gamma` tracks the newest pair.
    fn overflow_evicts_oldest_entry() {
        let mut history = GradientHistory::new(2);
        for scale in [1.0, 2.0, 4.0] {
            history.push(dv(&[1.0, 0.0]), dv(&[scale, 0.0])).unwrap();
        }
        assert_eq!(history.len(), 2);
        assert_relative_eq!(history.gamma(), 0.25);
        assert_eq!(history.entries[history.slot(0)].y.to_vec(), vec![2.0, 0.0]);
        assert_eq!(history.entries[history.slot(1)].y.to_vec(), vec![4.0, 0.0]);
    }

    #[test]
    // Purpose
    // -------
    // On a quadratic with Hessian diag(2, 8), exact curvature pairs along
    // both axes make the two-loop recursion reproduce `H⁻¹ q`.
    fn two_loop_recovers_inverse_hessian_on_quadratic() {
        let mut history = GradientHistory::new(5);
        history.push(dv(&[1.0, 0.0]), dv(&[2.0, 0.0])).unwrap();
        history.push(dv(&[0.0, 1.0]), dv(&[0.0, 8.0])).unwrap();
        let mut q = dv(&[4.0, 4.0]);
        history.two_loop(&mut q).unwrap();
        assert_relative_eq!(q.get(0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(q.get(1), 0.5, epsilon = 1e-12);
    }
}
