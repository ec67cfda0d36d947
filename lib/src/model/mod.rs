//! Models trained by the [`train`](crate::train) driver.
//!
//! A [`Model`] exposes a flat parameter vector, the mean objective of a batch
//! and its gradient with respect to the parameters. Parameter updates are
//! left to an [`Optimizer`](crate::optimizer::Optimizer), so any model can be
//! paired with any optimizer.

use std::path::Path;

use ndarray::{Array1, ArrayView2};

use crate::preprocessing::error::PreprocessingError;

pub mod gaussian;

pub use gaussian::GaussianMean;

/// Interface between a model and the training loop.
pub trait Model {
    /// Number of input features the model expects.
    fn num_features(&self) -> usize;

    /// Mean objective over the rows of `batch`.
    fn objective(&self, batch: ArrayView2<'_, f64>) -> f64;

    /// Gradient of [`Model::objective`] with respect to [`Model::params`].
    fn gradients(&self, batch: ArrayView2<'_, f64>) -> Array1<f64>;

    fn params(&self) -> &Array1<f64>;

    /// Replace the parameters with the result of an optimizer step.
    fn update_params(&mut self, params: Array1<f64>);

    /// Persist the model in binary form.
    fn save_to_file(&self, path: &Path) -> Result<(), PreprocessingError>;

    fn name(&self) -> &'static str;
}
