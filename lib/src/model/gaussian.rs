//! Per-feature mean estimator.
//!
//! The model holds one parameter per feature, `mu`, and minimizes
//! ```text
//! J(mu) = 1/(2n) * sum_i ||x_i - mu||²
//! ```
//! whose gradient is `mu - mean(x)`. Plain SGD on it converges to the
//! feature means of the data.

use std::path::Path;

use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::Model;
use crate::preprocessing::error::PreprocessingError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianMean {
    mu: Array1<f64>,
}

impl GaussianMean {
    /// Zero-initialized model for `num_features` inputs.
    pub fn new(num_features: usize) -> Self {
        Self {
            mu: Array1::zeros(num_features),
        }
    }

    /// Constructs a model from explicit parameters (e.g., for a warm start).
    pub fn from_params(mu: Array1<f64>) -> Self {
        Self { mu }
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mu
    }

    /// Load a model written by [`Model::save_to_file`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PreprocessingError> {
        let bytes = std::fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

impl Model for GaussianMean {
    fn num_features(&self) -> usize {
        self.mu.len()
    }

    fn objective(&self, batch: ArrayView2<'_, f64>) -> f64 {
        if batch.nrows() == 0 {
            return 0.0;
        }
        let total: f64 = batch
            .rows()
            .into_iter()
            .map(|row| {
                let diff = &row - &self.mu;
                diff.dot(&diff)
            })
            .sum();
        0.5 * total / batch.nrows() as f64
    }

    fn gradients(&self, batch: ArrayView2<'_, f64>) -> Array1<f64> {
        match batch.mean_axis(Axis(0)) {
            Some(batch_mean) => &self.mu - &batch_mean,
            None => Array1::zeros(self.mu.len()),
        }
    }

    fn params(&self) -> &Array1<f64> {
        &self.mu
    }

    fn update_params(&mut self, params: Array1<f64>) {
        self.mu = params;
    }

    fn save_to_file(&self, path: &Path) -> Result<(), PreprocessingError> {
        let bytes = bincode::serialize(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "GaussianMean"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_objective_known_value() {
        let model = GaussianMean::from_params(array![1.0, 0.0]);
        let x = array![[1.0, 2.0], [3.0, 0.0]];
        // ||(0, 2)||² = 4, ||(2, 0)||² = 4
        assert_abs_diff_eq!(model.objective(x.view()), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_points_away_from_mean() {
        let model = GaussianMean::new(2);
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let grad = model.gradients(x.view());
        assert_eq!(grad, array![-2.0, -3.0]);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let model = GaussianMean::from_params(array![0.3, -0.7, 1.1]);
        let x = array![[1.0, 2.0, -1.0], [0.5, -0.5, 2.0], [0.0, 1.0, 1.0]];
        let grad = model.gradients(x.view());

        let h = 1e-6;
        for j in 0..3 {
            let mut plus = model.params().clone();
            plus[j] += h;
            let mut minus = model.params().clone();
            minus[j] -= h;
            let numeric = (GaussianMean::from_params(plus).objective(x.view())
                - GaussianMean::from_params(minus).objective(x.view()))
                / (2.0 * h);
            assert_abs_diff_eq!(grad[j], numeric, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_empty_batch() {
        let model = GaussianMean::new(3);
        let x = ndarray::Array2::<f64>::zeros((0, 3));
        assert_eq!(model.objective(x.view()), 0.0);
        assert_eq!(model.gradients(x.view()), Array1::<f64>::zeros(3));
    }

    #[test]
    fn test_save_load() {
        let model = GaussianMean::from_params(array![0.25, -4.0]);
        let file = tempfile::NamedTempFile::new().unwrap();

        model.save_to_file(file.path()).unwrap();
        let loaded = GaussianMean::load_from_file(file.path()).unwrap();
        assert_eq!(model, loaded);
    }
}
