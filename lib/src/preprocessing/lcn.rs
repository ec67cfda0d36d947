//! LeCun local contrast normalization.
//!
//! For every selected channel of every example:
//! ```text
//! centered  = x - conv(x, g)
//! local_std = sqrt(conv(centered², g))
//! x'        = centered / max(mean(local_std), local_std, threshold)
//! ```
//! where `g` is a normalized Gaussian kernel (`sigma = 2`) and `conv` is a
//! zero-padded correlation with the same output size as its input.

use ndarray::{s, Array2, ArrayD, ArrayView2, Ix4};
use serde::{Deserialize, Serialize};

use crate::dataset::DenseDesignMatrix;
use crate::numeric::floor_divisor;
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{apply_numeric_to_canonical_view, Preprocessor};

const SIGMA: f64 = 2.0;

fn default_kernel_size() -> usize {
    7
}

fn default_threshold() -> f64 {
    1e-4
}

/// Local contrast normalization over 2-D images.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeCunLcn {
    img_shape: Vec<usize>,
    #[serde(default = "default_kernel_size")]
    kernel_size: usize,
    #[serde(default = "default_threshold")]
    threshold: f64,
    /// Channels to normalize; `None` means all of them.
    #[serde(default)]
    channels: Option<Vec<usize>>,
}

impl LeCunLcn {
    /// # Errors
    /// [`PreprocessingError::InvalidParameter`] unless `img_shape` has two
    /// positive entries.
    pub fn new(img_shape: Vec<usize>) -> Result<Self, PreprocessingError> {
        let lcn = Self {
            img_shape,
            kernel_size: default_kernel_size(),
            threshold: default_threshold(),
            channels: None,
        };
        lcn.validate()?;
        Ok(lcn)
    }

    /// Kernel width; must be odd.
    pub fn with_kernel_size(mut self, kernel_size: usize) -> Result<Self, PreprocessingError> {
        self.kernel_size = kernel_size;
        self.validate()?;
        Ok(self)
    }

    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, PreprocessingError> {
        self.threshold = threshold;
        self.validate()?;
        Ok(self)
    }

    /// Restrict normalization to `channels`; the rest pass through unchanged.
    pub fn with_channels(mut self, channels: Vec<usize>) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn img_shape(&self) -> &[usize] {
        &self.img_shape
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn channels(&self) -> Option<&[usize]> {
        self.channels.as_deref()
    }

    fn validate(&self) -> Result<(), PreprocessingError> {
        if self.img_shape.len() != 2 || self.img_shape.contains(&0) {
            return Err(PreprocessingError::InvalidParameter(format!(
                "img_shape must be two positive sizes, got {:?}",
                self.img_shape
            )));
        }
        if self.kernel_size % 2 == 0 {
            return Err(PreprocessingError::InvalidParameter(format!(
                "kernel_size must be odd, got {}",
                self.kernel_size
            )));
        }
        if !(self.threshold > 0.0 && self.threshold.is_finite()) {
            return Err(PreprocessingError::InvalidParameter(format!(
                "threshold must be positive, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    fn selected_channels(&self, num_channels: usize) -> Result<Vec<usize>, PreprocessingError> {
        match &self.channels {
            None => Ok((0..num_channels).collect()),
            Some(channels) => {
                if let Some(&bad) = channels.iter().find(|&&c| c >= num_channels) {
                    return Err(PreprocessingError::InvalidParameter(format!(
                        "channel {} out of range for {} channels",
                        bad, num_channels
                    )));
                }
                Ok(channels.clone())
            }
        }
    }

    /// Normalize a canonical `(b, rows, cols, c)` view.
    pub fn normalize(&self, view: ArrayD<f64>) -> Result<ArrayD<f64>, PreprocessingError> {
        self.validate()?;
        if view.ndim() != 4 {
            return Err(PreprocessingError::shape_mismatch(
                "(batch, rows, cols, channels)",
                view.shape(),
            ));
        }
        if view.shape()[1..3] != self.img_shape[..] {
            return Err(PreprocessingError::shape_mismatch(
                format!("images of shape {:?}", self.img_shape),
                &view.shape()[1..3],
            ));
        }

        let mut images = view
            .into_dimensionality::<Ix4>()
            .map_err(|e| PreprocessingError::shape_mismatch("4-d view", e.to_string()))?;
        let channels = self.selected_channels(images.shape()[3])?;
        let kernel = gaussian_filter(self.kernel_size);

        for example in 0..images.shape()[0] {
            for &channel in &channels {
                let normalized = self.normalize_image(images.slice(s![example, .., .., channel]), &kernel);
                images
                    .slice_mut(s![example, .., .., channel])
                    .assign(&normalized);
            }
        }
        Ok(images.into_dyn())
    }

    fn normalize_image(&self, image: ArrayView2<'_, f64>, kernel: &Array2<f64>) -> Array2<f64> {
        let centered = &image - &correlate_same(image, kernel);
        let local_std = correlate_same(centered.mapv(|v| v * v).view(), kernel).mapv(f64::sqrt);
        let mean_std = local_std.mean().unwrap_or(0.0);

        let divisor = local_std.mapv(|s| floor_divisor(s.max(mean_std), self.threshold));
        centered / divisor
    }
}

impl Preprocessor for LeCunLcn {
    fn apply(&self, dataset: &mut DenseDesignMatrix) -> Result<(), PreprocessingError> {
        apply_numeric_to_canonical_view(dataset, self.name(), |view| self.normalize(view))
    }

    fn name(&self) -> &'static str {
        "LeCunLcn"
    }
}

/// Normalized `size x size` Gaussian kernel with `sigma = 2`.
pub fn gaussian_filter(size: usize) -> Array2<f64> {
    let radius = (size / 2) as f64;
    let kernel = Array2::from_shape_fn((size, size), |(i, j)| {
        let x = i as f64 - radius;
        let y = j as f64 - radius;
        (-(x * x + y * y) / (2.0 * SIGMA * SIGMA)).exp()
    });
    let total = kernel.sum();
    kernel / total
}

/// Zero-padded correlation with the same output size as `image`.
fn correlate_same(image: ArrayView2<'_, f64>, kernel: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = image.dim();
    let (k_rows, k_cols) = kernel.dim();
    let (r_off, c_off) = (k_rows / 2, k_cols / 2);

    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let mut acc = 0.0;
        for ki in 0..k_rows {
            // Output pixel (r, c) sees input row r + ki - r_off
            let Some(ir) = (r + ki).checked_sub(r_off).filter(|&ir| ir < rows) else {
                continue;
            };
            for kj in 0..k_cols {
                if let Some(ic) = (c + kj).checked_sub(c_off).filter(|&ic| ic < cols) {
                    acc += image[[ir, ic]] * kernel[[ki, kj]];
                }
            }
        }
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Axes;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array, Array4, IxDyn};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::StandardNormal;

    fn random_images(shape: [usize; 4], seed: u64) -> ArrayD<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array::from_shape_simple_fn(IxDyn(&shape), || rng.sample(StandardNormal))
    }

    #[test]
    fn test_gaussian_filter_is_normalized_and_symmetric() {
        let kernel = gaussian_filter(7);
        assert_abs_diff_eq!(kernel.sum(), 1.0, epsilon = 1e-12);
        assert_eq!(kernel[[0, 0]], kernel[[6, 6]]);
        assert_eq!(kernel[[1, 3]], kernel[[3, 1]]);
        assert!(kernel[[3, 3]] > kernel[[2, 3]]);
    }

    #[test]
    fn test_correlate_same_keeps_shape() {
        let image = Array2::<f64>::ones((5, 4));
        let out = correlate_same(image.view(), &gaussian_filter(3));
        assert_eq!(out.dim(), (5, 4));
        // Interior pixels see the whole kernel
        assert_abs_diff_eq!(out[[2, 2]], 1.0, epsilon = 1e-12);
        // Corners lose part of it to the zero padding
        assert!(out[[0, 0]] < 1.0);
    }

    #[test]
    fn test_random_images_are_finite() {
        let topo = random_images([2, 32, 32, 3], 11);
        let mut dataset = DenseDesignMatrix::from_topological_view(topo, Axes::default()).unwrap();

        dataset.apply_preprocessor(&LeCunLcn::new(vec![32, 32]).unwrap()).unwrap();
        assert!(dataset.design_matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_zero_images_are_finite() {
        let topo = Array4::<f64>::zeros((2, 32, 32, 3)).into_dyn();
        let mut dataset = DenseDesignMatrix::from_topological_view(topo, Axes::default()).unwrap();

        dataset.apply_preprocessor(&LeCunLcn::new(vec![32, 32]).unwrap()).unwrap();
        assert!(dataset.design_matrix().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_selected_channels_only() {
        let topo = random_images([2, 32, 32, 3], 12);
        let mut dataset = DenseDesignMatrix::from_topological_view(topo.clone(), Axes::default()).unwrap();

        let lcn = LeCunLcn::new(vec![32, 32]).unwrap().with_channels(vec![1, 2]);
        dataset.apply_preprocessor(&lcn).unwrap();

        let out = dataset.topological_view().unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
        assert_eq!(
            out.slice(s![.., .., .., 0]),
            topo.slice(s![.., .., .., 0])
        );
        assert_ne!(
            out.slice(s![.., .., .., 1]),
            topo.slice(s![.., .., .., 1])
        );
    }

    #[test]
    fn test_channel_out_of_range() {
        let topo = random_images([1, 8, 8, 3], 13);
        let mut dataset = DenseDesignMatrix::from_topological_view(topo, Axes::default()).unwrap();
        let before = dataset.clone();

        let lcn = LeCunLcn::new(vec![8, 8]).unwrap().with_channels(vec![3]);
        assert!(matches!(
            dataset.apply_preprocessor(&lcn),
            Err(PreprocessingError::InvalidParameter(_))
        ));
        assert_eq!(dataset, before);
    }

    #[test]
    fn test_img_shape_must_match() {
        let topo = random_images([1, 8, 8, 1], 14);
        let lcn = LeCunLcn::new(vec![8, 9]).unwrap();
        assert!(matches!(
            lcn.normalize(topo),
            Err(PreprocessingError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(LeCunLcn::new(vec![8]).is_err());
        assert!(LeCunLcn::new(vec![8, 8]).unwrap().with_kernel_size(4).is_err());
        assert!(LeCunLcn::new(vec![8, 8]).unwrap().with_threshold(0.0).is_err());
    }

    #[test]
    fn test_non_canonical_axes() {
        let axes: Axes = "c,0,1,b".parse().unwrap();
        let topo = random_images([3, 16, 16, 2], 15);
        let mut dataset = DenseDesignMatrix::from_topological_view(topo, axes.clone()).unwrap();

        dataset.apply_preprocessor(&LeCunLcn::new(vec![16, 16]).unwrap()).unwrap();
        assert_eq!(dataset.axes(), Some(&axes));
        assert_eq!(dataset.view_shape().unwrap(), vec![3, 16, 16, 2]);
    }

    #[test]
    fn test_json_defaults() {
        let lcn: LeCunLcn = serde_json::from_str(r#"{"img_shape": [32, 32]}"#).unwrap();
        assert_eq!(lcn.kernel_size(), 7);
        assert_eq!(lcn.threshold(), 1e-4);
        assert!(lcn.channels().is_none());
    }
}
