//! Weight matrix of a linear model.
//!
//! Purpose
//! -------
//! Hold the `(num_outputs × (num_features + 1))` weight matrix `W` whose
//! trailing column is the bias, and provide the two maps a linear model
//! needs: scores from features (`W·x`, `X·Wᵀ`) and weight gradients from
//! score gradients (`g ⊗ x`, `Gᵀ·X`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Feature vectors and matrices already carry the constant-1 bias entry in
//!   their last position, so they have `num_features + 1` columns.
//! - The block array always holds exactly one matrix block of the original
//!   shape; [`Parameters::set`] and [`Parameters::update`] enforce this.
//! - Predictions depend only on the weight matrix.
use serde::{Deserialize, Serialize};

use crate::{
    objective::{BatchLossAndGrad, LossAndGrad},
    optimization::errors::{OptError, OptResult},
    parameters::Parameters,
    tensor::{
        DenseMatrix, DenseVector, Matrix, Tensor, TensorError, TensorResult, Vector,
        matrix_multiply,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLinearParameters")]
pub struct LinearParameters {
    num_features: usize,
    num_outputs: usize,
    blocks: Vec<Tensor>,
}

/// Wire form of [`LinearParameters`]; the block array is re-checked against
/// the declared shape on the way in.
#[derive(Deserialize)]
struct RawLinearParameters {
    num_features: usize,
    num_outputs: usize,
    blocks: Vec<Tensor>,
}

impl TryFrom<RawLinearParameters> for LinearParameters {
    type Error = OptError;

    fn try_from(raw: RawLinearParameters) -> OptResult<Self> {
        let mut params = LinearParameters::new(raw.num_features, raw.num_outputs);
        params.set(raw.blocks)?;
        Ok(params)
    }
}

impl LinearParameters {
    /// Zero weights for `num_features` inputs (bias excluded) and
    /// `num_outputs` scores.
    pub fn new(num_features: usize, num_outputs: usize) -> Self {
        let weights = DenseMatrix::zeros(num_outputs, num_features + 1);
        Self { num_features, num_outputs, blocks: vec![weights.into()] }
    }

    /// Wrap an existing weight matrix; its last column is the bias.
    ///
    /// # Errors
    /// [`TensorError::InvalidAggregate`] for a matrix with no columns.
    pub fn from_weights(weights: Matrix) -> TensorResult<Self> {
        let (num_outputs, dim2) = weights.shape();
        let num_features = dim2.checked_sub(1).ok_or_else(|| TensorError::InvalidAggregate {
            reason: "weight matrix needs a bias column".into(),
        })?;
        Ok(Self { num_features, num_outputs, blocks: vec![weights.into()] })
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Expected weight shape `(num_outputs, num_features + 1)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_outputs, self.num_features + 1)
    }

    pub fn weights(&self) -> TensorResult<&Matrix> {
        self.blocks
            .first()
            .and_then(Tensor::as_matrix)
            .ok_or(TensorError::KindMismatch { op: "weights" })
    }

    /// Scores `W·x` for one example.
    pub fn predict(&self, example: &Vector) -> TensorResult<DenseVector> {
        self.weights()?.left_multiply(example)
    }

    /// Scores `X·Wᵀ`, one row per example.
    pub fn predict_batch(&self, examples: &Matrix) -> TensorResult<DenseMatrix> {
        matrix_multiply(examples, self.weights()?, false, true)
    }

    /// Weight gradient `g ⊗ x` for one example.
    pub fn gradients(&self, score_grad: &LossAndGrad, example: &Vector) -> Vec<Tensor> {
        let outer = Vector::Dense(score_grad.gradient.clone()).outer(example);
        vec![outer.into()]
    }

    /// Weight gradient `Gᵀ·X` summed over a batch.
    pub fn batch_gradients(
        &self, score_grad: &BatchLossAndGrad, examples: &Matrix,
    ) -> TensorResult<Vec<Tensor>> {
        let gradient = matrix_multiply(&score_grad.gradient, examples, true, false)?;
        Ok(vec![gradient.into()])
    }

    fn check_blocks(&self, tensors: &[Tensor]) -> OptResult<()> {
        if tensors.len() != 1 {
            return Err(OptError::ParameterCountMismatch { expected: 1, found: tensors.len() });
        }
        let block = tensors[0].as_matrix().ok_or(TensorError::KindMismatch { op: "set" })?;
        if block.shape() != self.shape() {
            return Err(TensorError::ShapeMismatch {
                op: "set",
                this: self.shape(),
                other: block.shape(),
            }
            .into());
        }
        Ok(())
    }
}

impl Parameters for LinearParameters {
    fn get(&self) -> &[Tensor] {
        &self.blocks
    }

    fn set(&mut self, tensors: Vec<Tensor>) -> OptResult<()> {
        self.check_blocks(&tensors)?;
        self.blocks = tensors;
        Ok(())
    }

    fn update(&mut self, step: &[Tensor]) -> OptResult<()> {
        if step.len() != self.blocks.len() {
            return Err(OptError::ParameterCountMismatch {
                expected: self.blocks.len(),
                found: step.len(),
            });
        }
        for (block, delta) in self.blocks.iter_mut().zip(step) {
            block.intersect_and_add_in_place(delta, |v| v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{RowMatrix, SparseVector};
    use approx::assert_relative_eq;

    fn params() -> LinearParameters {
        // 2 outputs, 2 features + bias.
        let w = DenseMatrix::from_rows(&[vec![1.0, 2.0, 0.5], vec![-1.0, 0.0, 1.0]]).unwrap();
        LinearParameters::from_weights(Matrix::Dense(w)).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // `predict` is `W·x` including the bias column, and `predict_batch`
    // agrees with it row by row for dense and sparse example storage.
    //
    // Given
    // -----
    // - W = [[1, 2, 0.5], [-1, 0, 1]], examples x1 = [1, 1, 1], x2 = [0, 3, 1].
    //
    // Expect
    // ------
    // - predict(x1) = [3.5, 0], predict(x2) = [6.5, 1].
    fn predict_and_predict_batch_agree() {
        // Arrange
        let p = params();
        let x1 = Vector::dense(vec![1.0, 1.0, 1.0]);
        let x2 = Vector::Sparse(SparseVector::new(3, vec![1, 2], vec![3.0, 1.0]).unwrap());
        let batch = Matrix::aggregate(vec![x1.clone(), x2.clone()], 2).unwrap();

        // Act
        let s1 = p.predict(&x1).unwrap();
        let s2 = p.predict(&x2).unwrap();
        let scores = p.predict_batch(&batch).unwrap();

        // Assert
        assert_eq!(s1.to_vec(), vec![3.5, 0.0]);
        assert_eq!(s2.to_vec(), vec![6.5, 1.0]);
        for j in 0..2 {
            assert_relative_eq!(scores.get(0, j), s1.get(j));
            assert_relative_eq!(scores.get(1, j), s2.get(j));
        }
    }

    #[test]
    // Purpose
    // -------
    // The batch gradient `Gᵀ·X` equals the sum of per-example outer products.
    fn batch_gradient_is_sum_of_outer_products() {
        let p = params();
        let xs = [vec![1.0, 2.0, 1.0], vec![-1.0, 0.5, 1.0]];
        let gs = [vec![0.2, -0.2], vec![-0.4, 0.1]];
        let examples = Matrix::Dense(DenseMatrix::from_rows(&xs).unwrap());
        let batch = BatchLossAndGrad {
            loss: DenseVector::zeros(2),
            gradient: DenseMatrix::from_rows(&gs).unwrap(),
        };

        let total = p.batch_gradients(&batch, &examples).unwrap();

        let mut expected = DenseMatrix::zeros(2, 3);
        for (x, g) in xs.iter().zip(&gs) {
            let single = LossAndGrad { loss: 0.0, gradient: DenseVector::from_vec(g.clone()) };
            let outer = p.gradients(&single, &Vector::dense(x.clone()));
            expected.intersect_and_add_in_place(outer[0].as_matrix().unwrap(), |v| v).unwrap();
        }
        assert_eq!(total[0].as_matrix().unwrap(), &Matrix::Dense(expected));
    }

    #[test]
    fn update_adds_sparse_and_dense_steps() {
        let mut p = LinearParameters::new(2, 2);
        let dense: Tensor = DenseMatrix::from_rows(&[vec![1.0, 1.0, 1.0], vec![0.0, 0.0, 0.0]])
            .unwrap()
            .into();
        let sparse: Tensor = Matrix::Rows(
            RowMatrix::new(
                vec![
                    Vector::Sparse(SparseVector::empty(3)),
                    Vector::Sparse(SparseVector::new(3, vec![2], vec![4.0]).unwrap()),
                ],
                3,
            )
            .unwrap(),
        )
        .into();

        p.update(&[dense]).unwrap();
        p.update(&[sparse]).unwrap();

        let w = p.weights().unwrap();
        assert_eq!(w.get(0, 1), 1.0);
        assert_eq!(w.get(1, 2), 4.0);
        assert_eq!(w.get(1, 0), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // `set` rejects arrays of the wrong length, kind, or shape and leaves
    // the weights untouched.
    fn set_validates_blocks() {
        let mut p = LinearParameters::new(1, 1);
        assert!(matches!(p.set(vec![]), Err(OptError::ParameterCountMismatch { .. })));
        assert!(matches!(
            p.set(vec![Vector::dense(vec![0.0, 0.0]).into()]),
            Err(OptError::Tensor(TensorError::KindMismatch { .. }))
        ));
        assert!(matches!(
            p.set(vec![DenseMatrix::zeros(2, 2).into()]),
            Err(OptError::Tensor(TensorError::ShapeMismatch { .. }))
        ));
        let replacement: Tensor = DenseMatrix::from_rows(&[vec![3.0, 4.0]]).unwrap().into();
        p.set(vec![replacement.clone()]).unwrap();
        assert_eq!(p.get(), &[replacement]);
    }

    #[test]
    fn empty_copy_and_serde_round_trip() {
        let p = params();
        let zeros = p.empty_copy();
        assert_eq!(zeros[0].two_norm(), 0.0);
        assert_eq!(zeros[0].len(), 6);

        let json = serde_json::to_string(&p).unwrap();
        let back: LinearParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        let x = Vector::dense(vec![0.5, 0.5, 1.0]);
        assert_eq!(back.predict(&x).unwrap(), p.predict(&x).unwrap());
    }

    #[test]
    // Purpose
    // -------
    // Deserialization re-checks the block array against the declared shape.
    //
    // Given
    // -----
    // - Valid JSON for a 2×3 model, edited to claim 4 features, to carry no
    //   blocks, or to carry a vector block.
    //
    // Expect
    // ------
    // - Every edited document is rejected.
    fn deserialization_rejects_inconsistent_blocks() {
        // Arrange
        let valid = serde_json::to_value(params()).unwrap();
        let mut wrong_width = valid.clone();
        wrong_width["num_features"] = serde_json::json!(4);
        let mut no_blocks = valid.clone();
        no_blocks["blocks"] = serde_json::json!([]);
        let mut vector_block = valid.clone();
        vector_block["blocks"] =
            serde_json::to_value(vec![Tensor::from(Vector::dense(vec![1.0; 6]))]).unwrap();

        // Act / Assert
        for doc in [wrong_width, no_blocks, vector_block] {
            assert!(serde_json::from_value::<LinearParameters>(doc).is_err());
        }
        assert_eq!(serde_json::from_value::<LinearParameters>(valid).unwrap(), params());
    }
}
