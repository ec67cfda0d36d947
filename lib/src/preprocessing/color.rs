//! RGB ↔ YUV colorspace conversion.

use ndarray::{ArrayD, Axis};
use serde::{Deserialize, Serialize};

use crate::dataset::DenseDesignMatrix;
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{apply_numeric_to_canonical_view, Preprocessor};

const RGB_TO_YUV: [[f64; 3]; 3] = [
    [0.299, 0.587, 0.114],
    [-0.14713, -0.28886, 0.436],
    [0.615, -0.51499, -0.10001],
];

const YUV_TO_RGB: [[f64; 3]; 3] = [
    [1.0, 0.0, 1.13983],
    [1.0, -0.39465, -0.58060],
    [1.0, 2.03211, 0.0],
];

/// Per-pixel colorspace conversion on the channel axis.
///
/// The forward direction maps RGB to YUV; [`RgbYuv::inverse`] maps back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbYuv {
    #[serde(default)]
    inverse: bool,
}

impl RgbYuv {
    pub fn new() -> Self {
        Self::default()
    }

    /// YUV → RGB.
    pub fn inverse() -> Self {
        Self { inverse: true }
    }

    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    fn matrix(&self) -> &'static [[f64; 3]; 3] {
        if self.inverse {
            &YUV_TO_RGB
        } else {
            &RGB_TO_YUV
        }
    }

    /// Convert every pixel of a canonical `(b, spatial..., 3)` view.
    pub fn convert(&self, mut view: ArrayD<f64>) -> Result<ArrayD<f64>, PreprocessingError> {
        let channel_axis = Axis(view.ndim().saturating_sub(1));
        let channels = view.shape().last().copied().unwrap_or(0);
        if channels != 3 {
            return Err(PreprocessingError::shape_mismatch("3 channels", view.shape()));
        }

        let m = self.matrix();
        for mut pixel in view.lanes_mut(channel_axis) {
            let (a, b, c) = (pixel[0], pixel[1], pixel[2]);
            for (out, row) in pixel.iter_mut().zip(m.iter()) {
                *out = row[0] * a + row[1] * b + row[2] * c;
            }
        }
        Ok(view)
    }
}

impl Preprocessor for RgbYuv {
    fn apply(&self, dataset: &mut DenseDesignMatrix) -> Result<(), PreprocessingError> {
        apply_numeric_to_canonical_view(dataset, self.name(), |view| self.convert(view))
    }

    fn name(&self) -> &'static str {
        if self.inverse {
            "YuvRgb"
        } else {
            "RgbYuv"
        }
    }
}
