//! Integration tests for the optimizer and tensor layers.
//!
//! Purpose
//! -------
//! - Check the native L-BFGS optimizer against closed-form optima and
//!   against the Argmin-backed reference solver.
//! - Check the tensor kernels against naive reference computations on
//!   seeded random inputs, across dense and row-sparse storage.
//!
//! Coverage
//! --------
//! - `optimization::lbfgs`: `minimize`, `minimize_reference` with both line
//!   searches, `max_gradient_error`.
//! - `tensor`: `matrix_multiply` for every storage pair and transpose flag,
//!   sparse/dense agreement of `dot`, `two_norm`, `scale`.
//! - `objective`: batch gradients of binary cross-entropy against finite
//!   differences through the `Problem` interface.
//!
//! Exclusions
//! ----------
//! - Training data validation and prediction are covered by
//!   `integration_training_pipeline`.
use approx::assert_abs_diff_eq;
use nalgebra::{Matrix3, Vector3};
use ndarray::{Array1, Array2, Axis, array};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rust_linear::{
    objective::{BinaryCrossEntropy, Objective},
    optimization::{
        errors::OptResult,
        lbfgs::{
            FnProblem, GradAndLoss, LbfgsOptions, LineSearcher, Problem, ReferenceOptions,
            max_gradient_error, minimize, minimize_reference,
        },
    },
    parameters::{LinearParameters, Parameters},
    tensor::{
        DenseMatrix, DenseVector, Matrix, SparseVector, Tensor, Vector, matrix_multiply, ravel,
    },
};

/// `0.5·wᵀAw − bᵀw` over the three weights of a 1×(2+1) linear model.
struct Quadratic {
    a: Array2<f64>,
    b: Array1<f64>,
}

impl Quadratic {
    fn new() -> Self {
        Self {
            a: array![[4.0, 1.0, 0.0], [1.0, 3.0, 0.5], [0.0, 0.5, 2.0]],
            b: array![1.0, 2.0, 3.0],
        }
    }

    /// Closed-form optimum `A⁻¹b`.
    fn optimum(&self) -> Vec<f64> {
        let a = Matrix3::from_fn(|i, j| self.a[[i, j]]);
        let b = Vector3::from_fn(|i, _| self.b[i]);
        let x = a.lu().solve(&b).expect("A is positive definite");
        x.iter().copied().collect()
    }
}

impl Problem for Quadratic {
    fn loss_and_grad(&self, params: &[Tensor]) -> OptResult<GradAndLoss> {
        let w = ravel(params).into_array();
        let aw = self.a.dot(&w);
        let loss = 0.5 * w.dot(&aw) - self.b.dot(&w);
        let g = aw - &self.b;
        let block = DenseMatrix::from_array(g.insert_axis(Axis(0)));
        Ok(GradAndLoss { loss, gradient: vec![block.into()] })
    }
}

fn flat(params: &LinearParameters) -> Vec<f64> {
    ravel(params.get()).to_vec()
}

#[test]
// Purpose
// -------
// The native optimizer reaches the analytic optimum of a quadratic.
//
// Given
// -----
// - Symmetric positive-definite A (3×3), b = [1, 2, 3], zero start.
//
// Expect
// ------
// - Converged status; weights within 1e-5 of A⁻¹b.
fn native_lbfgs_reaches_quadratic_optimum() {
    // Arrange
    let problem = Quadratic::new();
    let mut params = LinearParameters::new(2, 1);
    let options = LbfgsOptions::new(5, 200, 1e-14, 1e-10).expect("valid options");

    // Act
    let outcome = minimize(&mut params, &problem, &options).expect("optimization runs");

    // Assert
    assert!(outcome.converged(), "status: {}", outcome.status);
    for (w, x) in flat(&params).iter().zip(problem.optimum()) {
        assert_abs_diff_eq!(*w, x, epsilon = 1e-5);
    }
    assert!(outcome.fn_evals.get("gradient_count").copied().unwrap_or(0) > 0);
}

#[test]
// Purpose
// -------
// Native and reference solvers agree on the same problem, with either
// reference line search.
fn native_and_reference_solvers_agree() {
    let problem = Quadratic::new();
    let mut native = LinearParameters::new(2, 1);
    minimize(&mut native, &problem, &LbfgsOptions::new(5, 200, 1e-14, 1e-10).expect("valid"))
        .expect("native run");

    for searcher in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
        let mut reference = LinearParameters::new(2, 1);
        let opts = ReferenceOptions::new(5, 200, Some(1e-10), None, searcher).expect("valid");
        minimize_reference(&mut reference, &problem, &opts).expect("reference run");

        for (a, b) in flat(&native).iter().zip(flat(&reference)) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-5);
        }
    }
}

#[test]
fn quadratic_gradient_matches_finite_differences() {
    let problem = Quadratic::new();
    let params: Vec<Tensor> =
        vec![DenseMatrix::from_rows(&[vec![0.3, -1.2, 2.0]]).expect("one row").into()];
    let err = max_gradient_error(&problem, &params).expect("finite differences run");
    assert!(err < 1e-6, "max gradient error {err}");
}

#[test]
// Purpose
// -------
// Binary cross-entropy batch gradients agree with finite differences of the
// summed batch loss when the score matrix itself is the parameter.
fn binary_cross_entropy_batch_gradient_matches_finite_differences() {
    let truth = Matrix::Dense(
        DenseMatrix::from_rows(&[vec![1.0, 0.0, 1.0], vec![0.0, 0.0, 1.0]]).expect("rows"),
    );
    let bce = BinaryCrossEntropy::new();
    let scores = |params: &[Tensor]| -> DenseMatrix {
        params[0].as_matrix().expect("matrix block").densify()
    };
    let problem = FnProblem::new(
        |params: &[Tensor]| {
            let out = bce.batch_loss_and_gradient(&truth, scores(params))?;
            Ok(GradAndLoss { loss: out.loss.sum(), gradient: vec![out.gradient.into()] })
        },
        |params: &[Tensor]| Ok(bce.batch_loss(&truth, scores(params))?.sum()),
    );
    let params: Vec<Tensor> = vec![
        DenseMatrix::from_rows(&[vec![0.4, -1.5, 3.0], vec![-0.2, 2.2, -4.0]])
            .expect("rows")
            .into(),
    ];

    let err = max_gradient_error(&problem, &params).expect("finite differences run");

    assert!(err < 1e-6, "max gradient error {err}");
}

/// Random `(rows × cols)` matrix with roughly half its entries zero.
fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| {
        if rng.gen_bool(0.5) { rng.gen_range(-2.0..2.0) } else { 0.0 }
    })
}

fn row_sparse(a: &Array2<f64>) -> Matrix {
    let rows = a
        .rows()
        .into_iter()
        .map(|r| Vector::Sparse(SparseVector::from_dense(&DenseVector::from_view(r))))
        .collect();
    Matrix::aggregate(rows, a.nrows()).expect("rows share a width")
}

fn naive_product(a: &Array2<f64>, b: &Array2<f64>, ta: bool, tb: bool) -> Array2<f64> {
    let a = if ta { a.t().to_owned() } else { a.clone() };
    let b = if tb { b.t().to_owned() } else { b.clone() };
    let (n, k, m) = (a.nrows(), a.ncols(), b.ncols());
    let mut out = Array2::zeros((n, m));
    for i in 0..n {
        for j in 0..m {
            let mut acc = 0.0;
            for l in 0..k {
                acc += a[[i, l]] * b[[l, j]];
            }
            out[[i, j]] = acc;
        }
    }
    out
}

#[test]
// Purpose
// -------
// `matrix_multiply` matches a naive triple loop for every storage pair
// (dense/row-sparse) and every transpose combination.
//
// Given
// -----
// - Seeded random 5×4 and 4×3 logical operands, stored so that the
//   requested transposes line up.
//
// Expect
// ------
// - Every entry agrees within 1e-9.
fn matrix_multiply_matches_naive_product() {
    // Arrange
    let mut rng = StdRng::seed_from_u64(7);
    for (ta, tb) in [(false, false), (true, false), (false, true), (true, true)] {
        let a = if ta { random_matrix(&mut rng, 4, 5) } else { random_matrix(&mut rng, 5, 4) };
        let b = if tb { random_matrix(&mut rng, 3, 4) } else { random_matrix(&mut rng, 4, 3) };
        let expected = naive_product(&a, &b, ta, tb);
        let lefts = [Matrix::Dense(DenseMatrix::from_array(a.clone())), row_sparse(&a)];
        let rights = [Matrix::Dense(DenseMatrix::from_array(b.clone())), row_sparse(&b)];

        for left in &lefts {
            for right in &rights {
                // Act
                let got = matrix_multiply(left, right, ta, tb).expect("shapes line up");

                // Assert
                assert_eq!(got.shape(), (5, 3));
                for ((i, j), e) in expected.indexed_iter() {
                    assert_abs_diff_eq!(got.get(i, j), *e, epsilon = 1e-9);
                }
            }
        }
    }
}

#[test]
fn matrix_multiply_rejects_inner_dimension_mismatch() {
    let a = Matrix::Dense(DenseMatrix::zeros(2, 3));
    let b = Matrix::Dense(DenseMatrix::zeros(2, 3));
    assert!(matrix_multiply(&a, &b, false, false).is_err());
    assert!(matrix_multiply(&a, &b, false, true).is_ok());
}

#[test]
// Purpose
// -------
// Sparse and dense storage of the same logical vectors give the same dot
// products, norms and scaled copies.
fn sparse_and_dense_vectors_agree() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20 {
        let x = DenseVector::from_array(random_matrix(&mut rng, 1, 12).row(0).to_owned());
        let y = DenseVector::from_array(random_matrix(&mut rng, 1, 12).row(0).to_owned());
        let (xd, yd) = (Vector::Dense(x.clone()), Vector::Dense(y.clone()));
        let (xs, ys) =
            (Vector::Sparse(SparseVector::from_dense(&x)), Vector::Sparse(SparseVector::from_dense(&y)));

        let dense_dot = xd.dot(&yd).expect("same size");
        assert_abs_diff_eq!(xs.dot(&ys).expect("same size"), dense_dot, epsilon = 1e-12);
        assert_abs_diff_eq!(xs.dot(&yd).expect("same size"), dense_dot, epsilon = 1e-12);
        assert_abs_diff_eq!(xd.dot(&ys).expect("same size"), dense_dot, epsilon = 1e-12);
        assert_abs_diff_eq!(xs.two_norm(), xd.two_norm(), epsilon = 1e-12);
        assert_eq!(xs.scale(-1.5), xd.scale(-1.5));
    }
}
