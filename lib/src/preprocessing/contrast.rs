//! Global contrast normalization.
//!
//! Each example (design matrix row) is normalized independently:
//! ```text
//! x' = scale * (x - mean(x)) / max(sqrt(std_bias + s(x)), min_divisor)
//! ```
//! where `s(x)` is either the squared L2 norm (`use_norm`) or the population
//! variance of the row, and the mean is only removed when `subtract_mean` is set.
//!
//! # Example
//! ```ignore
//! use topoprep::preprocessing::GlobalContrastNormalization;
//!
//! let gcn = GlobalContrastNormalization::new()
//!     .with_subtract_mean(false)
//!     .with_std_bias(0.0)
//!     .with_use_norm(true);
//! dataset.apply_preprocessor(&gcn)?; // every row now has unit L2 norm
//! ```

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::dataset::DenseDesignMatrix;
use crate::numeric::{ensure_finite, ensure_finite_input, floor_divisor};
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::Preprocessor;

const NAME: &str = "GlobalContrastNormalization";

/// Per-example contrast normalization on the design matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalContrastNormalization {
    subtract_mean: bool,
    /// Added under the square root before dividing.
    std_bias: f64,
    /// Divide by the L2 norm instead of the standard deviation.
    use_norm: bool,
    scale: f64,
    /// Denominators are floored here.
    min_divisor: f64,
}

impl Default for GlobalContrastNormalization {
    fn default() -> Self {
        Self {
            subtract_mean: true,
            std_bias: 10.0,
            use_norm: false,
            scale: 1.0,
            min_divisor: 1e-8,
        }
    }
}

impl GlobalContrastNormalization {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subtract_mean(mut self, subtract_mean: bool) -> Self {
        self.subtract_mean = subtract_mean;
        self
    }

    pub fn with_std_bias(mut self, std_bias: f64) -> Self {
        self.std_bias = std_bias;
        self
    }

    pub fn with_use_norm(mut self, use_norm: bool) -> Self {
        self.use_norm = use_norm;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_min_divisor(mut self, min_divisor: f64) -> Self {
        self.min_divisor = min_divisor;
        self
    }

    pub fn subtract_mean(&self) -> bool {
        self.subtract_mean
    }

    pub fn std_bias(&self) -> f64 {
        self.std_bias
    }

    pub fn use_norm(&self) -> bool {
        self.use_norm
    }

    fn validate(&self) -> Result<(), PreprocessingError> {
        if !(self.std_bias >= 0.0 && self.std_bias.is_finite()) {
            return Err(PreprocessingError::InvalidParameter(format!(
                "std_bias must be finite and non-negative, got {}",
                self.std_bias
            )));
        }
        if !(self.min_divisor > 0.0 && self.min_divisor.is_finite()) {
            return Err(PreprocessingError::InvalidParameter(format!(
                "min_divisor must be positive, got {}",
                self.min_divisor
            )));
        }
        if !self.scale.is_finite() {
            return Err(PreprocessingError::InvalidParameter(format!(
                "scale must be finite, got {}",
                self.scale
            )));
        }
        Ok(())
    }

    /// Normalize every row of `x`, returning a new matrix.
    pub fn normalize(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, PreprocessingError> {
        self.validate()?;
        let mut out = x.to_owned();
        if out.ncols() == 0 {
            return Ok(out);
        }
        let n = out.ncols() as f64;

        for mut row in out.rows_mut() {
            // Work on row / max|row| so sums of squares cannot overflow; the
            // bias and the floor are rescaled to match.
            let magnitude = row.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
            if magnitude == 0.0 {
                continue;
            }
            row.mapv_inplace(|v| v / magnitude);

            let mean = row.sum() / n;
            if self.subtract_mean {
                row.mapv_inplace(|v| v - mean);
            }

            let spread = if self.use_norm {
                row.dot(&row)
            } else {
                // Variance is taken around the current row mean, which is
                // zero when the mean was already removed.
                let center = if self.subtract_mean { 0.0 } else { mean };
                row.iter().map(|v| (v - center) * (v - center)).sum::<f64>() / n
            };
            let bias = self.std_bias / (magnitude * magnitude);
            let divisor = floor_divisor((bias + spread).sqrt(), self.min_divisor / magnitude);
            let factor = self.scale / divisor;
            row.mapv_inplace(|v| v * factor);
        }
        Ok(out)
    }
}

impl Preprocessor for GlobalContrastNormalization {
    fn apply(&self, dataset: &mut DenseDesignMatrix) -> Result<(), PreprocessingError> {
        let x = dataset.design_matrix();
        ensure_finite_input(x, NAME)?;
        let out = self.normalize(x.view())?;
        ensure_finite(&out, NAME)?;
        dataset.set_design_matrix(out)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
