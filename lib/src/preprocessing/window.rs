//! Cropping transforms: a fixed central window and randomly placed patches.

use ndarray::{ArrayD, ArrayViewD, IxDyn, Slice};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::dataset::DenseDesignMatrix;
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::patches::{check_rank, validate_extent};
use crate::preprocessing::traits::{apply_to_canonical_view, Preprocessor};

/// Keeps the central `window_shape` region of every example.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentralWindow {
    window_shape: Vec<usize>,
}

impl CentralWindow {
    pub fn new(window_shape: Vec<usize>) -> Result<Self, PreprocessingError> {
        validate_extent("window_shape", &window_shape)?;
        Ok(Self { window_shape })
    }

    pub fn window_shape(&self) -> &[usize] {
        &self.window_shape
    }

    /// Crop a canonical `(b, spatial..., c)` view.
    pub fn crop(&self, view: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, PreprocessingError> {
        validate_extent("window_shape", &self.window_shape)?;
        let spatial = spatial_shape(&view)?;
        check_rank(spatial.len(), self.window_shape.len())?;

        let offsets = spatial
            .iter()
            .zip(&self.window_shape)
            .map(|(&dim, &window)| {
                if window > dim {
                    Err(PreprocessingError::Geometry(format!(
                        "window {:?} does not fit images of shape {:?}",
                        self.window_shape, spatial
                    )))
                } else {
                    Ok((dim - window) / 2)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rank = spatial.len();
        let cropped = view.slice_each_axis(|desc| {
            let axis = desc.axis.index();
            if axis >= 1 && axis <= rank {
                let start = offsets[axis - 1];
                Slice::from(start..start + self.window_shape[axis - 1])
            } else {
                Slice::from(..)
            }
        });
        Ok(cropped.to_owned())
    }
}

impl Preprocessor for CentralWindow {
    fn apply(&self, dataset: &mut DenseDesignMatrix) -> Result<(), PreprocessingError> {
        apply_to_canonical_view(dataset, self.name(), |view| self.crop(view.view()))
    }

    fn name(&self) -> &'static str {
        "CentralWindow"
    }
}

/// Draws patches at random examples and positions.
///
/// The generator is seeded from `seed`, so applying the same configuration
/// to the same data always yields the same patches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractPatches {
    patch_shape: Vec<usize>,
    num_patches: usize,
    #[serde(default)]
    seed: u64,
}

impl ExtractPatches {
    pub fn new(patch_shape: Vec<usize>, num_patches: usize) -> Result<Self, PreprocessingError> {
        validate_extent("patch_shape", &patch_shape)?;
        Ok(Self {
            patch_shape,
            num_patches,
            seed: 0,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn patch_shape(&self) -> &[usize] {
        &self.patch_shape
    }

    pub fn num_patches(&self) -> usize {
        self.num_patches
    }

    /// Sample patches from a canonical `(b, spatial..., c)` view.
    pub fn sample(&self, view: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, PreprocessingError> {
        validate_extent("patch_shape", &self.patch_shape)?;
        let spatial = spatial_shape(&view)?;
        check_rank(spatial.len(), self.patch_shape.len())?;
        if let Some(axis) = (0..spatial.len()).find(|&i| self.patch_shape[i] > spatial[i]) {
            return Err(PreprocessingError::Geometry(format!(
                "patch width {} exceeds spatial axis {} of width {}",
                self.patch_shape[axis], axis, spatial[axis]
            )));
        }

        let batch = view.shape()[0];
        if batch == 0 && self.num_patches > 0 {
            return Err(PreprocessingError::EmptyData(
                "cannot draw patches from a dataset with no examples".to_string(),
            ));
        }

        let rank = spatial.len();
        let mut out_shape = Vec::with_capacity(rank + 2);
        out_shape.push(self.num_patches);
        out_shape.extend_from_slice(&self.patch_shape);
        out_shape.push(view.shape()[rank + 1]);
        let mut out = ArrayD::<f64>::zeros(IxDyn(&out_shape));

        let mut rng = StdRng::seed_from_u64(self.seed);
        for i in 0..self.num_patches {
            let example = rng.gen_range(0..batch);
            let starts: Vec<usize> = spatial
                .iter()
                .zip(&self.patch_shape)
                .map(|(&dim, &patch)| rng.gen_range(0..=dim - patch))
                .collect();

            let src = view.slice_each_axis(|desc| {
                let axis = desc.axis.index();
                if axis == 0 {
                    Slice::from(example..example + 1)
                } else if axis <= rank {
                    let start = starts[axis - 1];
                    Slice::from(start..start + self.patch_shape[axis - 1])
                } else {
                    Slice::from(..)
                }
            });
            out.slice_each_axis_mut(|desc| {
                if desc.axis.index() == 0 {
                    Slice::from(i..i + 1)
                } else {
                    Slice::from(..)
                }
            })
            .assign(&src);
        }
        Ok(out)
    }
}

impl Preprocessor for ExtractPatches {
    fn apply(&self, dataset: &mut DenseDesignMatrix) -> Result<(), PreprocessingError> {
        apply_to_canonical_view(dataset, self.name(), |view| self.sample(view.view()))
    }

    fn name(&self) -> &'static str {
        "ExtractPatches"
    }
}

fn spatial_shape(view: &ArrayViewD<'_, f64>) -> Result<Vec<usize>, PreprocessingError> {
    let shape = view.shape();
    if shape.len() < 3 {
        return Err(PreprocessingError::shape_mismatch(
            "(batch, spatial..., channels)",
            shape,
        ));
    }
    Ok(shape[1..shape.len() - 1].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Axes;
    use ndarray::{s, Array, Dimension};

    fn indexed(shape: &[usize]) -> ArrayD<f64> {
        Array::from_shape_fn(IxDyn(shape), |idx| {
            idx.slice().iter().fold(0.0, |acc, &i| acc * 100.0 + i as f64)
        })
    }

    #[test]
    fn test_central_window_offsets() {
        let topo = indexed(&[2, 6, 7, 1]);
        let window = CentralWindow::new(vec![2, 3]).unwrap();
        let cropped = window.crop(topo.view()).unwrap();

        assert_eq!(cropped.shape(), &[2, 2, 3, 1]);
        // Offsets are (6 - 2) / 2 = 2 and (7 - 3) / 2 = 2
        assert_eq!(cropped[[1, 0, 0, 0]], topo[[1, 2, 2, 0]]);
        assert_eq!(cropped[[0, 1, 2, 0]], topo[[0, 3, 4, 0]]);
    }

    #[test]
    fn test_central_window_through_dataset() {
        let axes: Axes = "b,c,0,1".parse().unwrap();
        let mut dataset = DenseDesignMatrix::from_topological_view(indexed(&[3, 2, 8, 8]), axes).unwrap();

        dataset.apply_preprocessor(&CentralWindow::new(vec![4, 4]).unwrap()).unwrap();
        assert_eq!(dataset.view_shape().unwrap(), vec![3, 2, 4, 4]);
        assert_eq!(dataset.num_features(), 2 * 4 * 4);
    }

    #[test]
    fn test_central_window_too_large() {
        let topo = indexed(&[1, 4, 4, 1]);
        let window = CentralWindow::new(vec![5, 4]).unwrap();
        assert!(matches!(
            window.crop(topo.view()),
            Err(PreprocessingError::Geometry(_))
        ));
    }

    #[test]
    fn test_extract_patches_shape_and_content() {
        let topo = indexed(&[5, 10, 10, 2]);
        let extractor = ExtractPatches::new(vec![3, 4], 20).unwrap().with_seed(9);
        let patches = extractor.sample(topo.view()).unwrap();
        assert_eq!(patches.shape(), &[20, 3, 4, 2]);

        // Every patch is a contiguous block of one example
        for patch in patches.outer_iter() {
            let origin = patch[[0, 0, 0]];
            let example = (origin / 1_000_000.0).floor();
            for ((r, c, ch), &v) in patch.view().into_dimensionality::<ndarray::Ix3>().unwrap().indexed_iter() {
                let expected = origin + (r * 10_000 + c * 100 + ch) as f64;
                assert_eq!(v, expected);
                assert_eq!((v / 1_000_000.0).floor(), example);
            }
        }
    }

    #[test]
    fn test_extract_patches_is_reproducible() {
        let topo = indexed(&[4, 8, 8, 1]);
        let a = ExtractPatches::new(vec![2, 2], 6).unwrap().with_seed(1);
        let b = a.clone();
        let c = a.clone().with_seed(2);

        let pa = a.sample(topo.view()).unwrap();
        assert_eq!(pa, b.sample(topo.view()).unwrap());
        assert_ne!(pa, c.sample(topo.view()).unwrap());
    }

    #[test]
    fn test_extract_patches_empty_dataset() {
        let topo = ArrayD::<f64>::zeros(IxDyn(&[0, 4, 4, 1]));
        let extractor = ExtractPatches::new(vec![2, 2], 3).unwrap();
        assert!(matches!(
            extractor.sample(topo.view()),
            Err(PreprocessingError::EmptyData(_))
        ));
    }

    #[test]
    fn test_extract_patches_through_dataset() {
        let mut dataset = DenseDesignMatrix::from_topological_view(indexed(&[2, 6, 6, 3]), Axes::default())
            .unwrap()
            .with_targets(ndarray::Array2::zeros((2, 1)))
            .unwrap();

        dataset
            .apply_preprocessor(&ExtractPatches::new(vec![3, 3], 7).unwrap())
            .unwrap();
        assert_eq!(dataset.num_examples(), 7);
        assert!(dataset.targets().is_none());
        let view = dataset.topological_view().unwrap();
        assert!(view.slice(s![.., 0, 0, 0]).iter().all(|&v| v < 2_000_000.0));
    }
}
