//! rust_linear — linear models trained by L-BFGS over dense and sparse tensors.
//!
//! Purpose
//! -------
//! Serve as the crate root: declare the layers and expose a prelude for
//! callers who want the common types in one import.
//!
//! Key behaviors
//! -------------
//! - [`tensor`]: dense/sparse vectors and matrices, matrix multiply, tensor
//!   arrays with ravel/unravel, shard merging, score normalizers.
//! - [`parameters`]: the `Parameters` trait and the `LinearParameters`
//!   weight matrix.
//! - [`objective`]: losses over linear scores (softmax, binary
//!   cross-entropy, squared, absolute).
//! - [`optimization`]: the native L-BFGS optimizer, an Argmin-backed
//!   reference solver, finite-difference gradient checks, and the shared
//!   error type.
//! - [`training`]: validated training data, the linear trainer, and the
//!   fitted model.
//!
//! Invariants & assumptions
//! ------------------------
//! - Layers depend only downward: tensor ← parameters ← objective ←
//!   optimization ← training (the optimizer is generic over `Parameters`).
//! - Everything runs on the calling thread; no global state.
//!
//! Conventions
//! -----------
//! - Losses are minimized and gradients are gradients of the loss.
//! - Weight matrices are `(num_outputs × (num_features + 1))`; the trailing
//!   column is the bias.
//! - Logging goes through the `log` facade; install any logger to see it.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to the code in `#[cfg(test)]` modules;
//!   `tests/` holds end-to-end training and cross-checks between the native
//!   and reference solvers.

pub mod objective;
pub mod optimization;
pub mod parameters;
pub mod tensor;
pub mod training;

pub mod prelude {
    pub use crate::objective::prelude::*;
    pub use crate::optimization::prelude::*;
    pub use crate::parameters::{LinearParameters, Parameters};
    pub use crate::tensor::prelude::*;
    pub use crate::training::prelude::*;
}
