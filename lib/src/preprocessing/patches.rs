//! Grid patch extraction and reassembly.
//!
//! [`ExtractGridPatches`] slides a window over every example and stacks the
//! windows along the batch axis. Patches are ordered example-major, then by
//! grid position in row-major order (the last spatial axis varies fastest).
//! [`ReassembleGridPatches`] relies on that order to put non-overlapping
//! patches back into their images. Applying an extractor records a
//! [`PatchGrid`] on the dataset, and reassembly refuses patches whose recorded
//! grid overlaps or came from images of a different shape:
//!
//! ```text
//! (4, 15, 21, 2) --extract (3, 7) / (3, 7)--> (4 * 5 * 3, 3, 7, 2)
//!                <--reassemble orig (15, 21)--
//! ```

use ndarray::{ArrayD, ArrayViewD, IxDyn, Slice};
use serde::{Deserialize, Serialize};

use crate::dataset::DenseDesignMatrix;
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{apply_to_canonical_view, Preprocessor};

/// Geometry of the grid extraction that produced a dataset's current examples.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchGrid {
    /// Spatial shape of the images the patches were cut from.
    pub orig_shape: Vec<usize>,
    pub patch_shape: Vec<usize>,
    pub stride: Vec<usize>,
}

impl PatchGrid {
    /// True when neighbouring patches neither overlap nor leave gaps.
    pub fn is_tiling(&self) -> bool {
        self.patch_shape == self.stride
    }
}

/// Cuts every example into a grid of patches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractGridPatches {
    patch_shape: Vec<usize>,
    stride: Vec<usize>,
}

impl ExtractGridPatches {
    /// # Errors
    /// [`PreprocessingError::InvalidParameter`] when the two shapes differ in
    /// length or contain a zero.
    pub fn new(patch_shape: Vec<usize>, stride: Vec<usize>) -> Result<Self, PreprocessingError> {
        let extractor = Self { patch_shape, stride };
        extractor.validate()?;
        Ok(extractor)
    }

    /// Non-overlapping tiling: the stride equals the patch shape.
    pub fn tiling(patch_shape: Vec<usize>) -> Result<Self, PreprocessingError> {
        Self::new(patch_shape.clone(), patch_shape)
    }

    pub fn patch_shape(&self) -> &[usize] {
        &self.patch_shape
    }

    pub fn stride(&self) -> &[usize] {
        &self.stride
    }

    fn validate(&self) -> Result<(), PreprocessingError> {
        validate_extent("patch_shape", &self.patch_shape)?;
        validate_extent("stride", &self.stride)?;
        if self.patch_shape.len() != self.stride.len() {
            return Err(PreprocessingError::InvalidParameter(format!(
                "patch_shape {:?} and stride {:?} have different lengths",
                self.patch_shape, self.stride
            )));
        }
        Ok(())
    }

    /// Number of patch positions along each spatial axis of `spatial`.
    pub fn grid_shape(&self, spatial: &[usize]) -> Result<Vec<usize>, PreprocessingError> {
        self.validate()?;
        check_rank(spatial.len(), self.patch_shape.len())?;

        spatial
            .iter()
            .zip(self.patch_shape.iter().zip(&self.stride))
            .enumerate()
            .map(|(axis, (&dim, (&patch, &stride)))| {
                if patch > dim {
                    return Err(PreprocessingError::Geometry(format!(
                        "spatial axis {} has width {} but the patch width is {}",
                        axis, dim, patch
                    )));
                }
                if stride == patch && dim % patch != 0 {
                    return Err(PreprocessingError::Geometry(format!(
                        "patch width {} does not tile spatial axis {} of width {}",
                        patch, axis, dim
                    )));
                }
                Ok((dim - patch) / stride + 1)
            })
            .collect()
    }

    /// Extract patches from a canonical `(b, spatial..., c)` view.
    pub fn extract(&self, view: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, PreprocessingError> {
        check_view(&view)?;
        let shape = view.shape();
        let rank = shape.len().saturating_sub(2);
        let grid = self.grid_shape(&shape[1..shape.len() - 1])?;
        let positions: usize = grid.iter().product();
        let batch = shape[0];

        let mut out_shape = Vec::with_capacity(shape.len());
        out_shape.push(batch * positions);
        out_shape.extend_from_slice(&self.patch_shape);
        out_shape.push(shape[shape.len() - 1]);
        let mut out = ArrayD::<f64>::zeros(IxDyn(&out_shape));

        let mut next = 0;
        for example in 0..batch {
            for position in 0..positions {
                let coords = unravel(position, &grid);
                let src = view.slice_each_axis(|desc| {
                    let axis = desc.axis.index();
                    if axis == 0 {
                        Slice::from(example..example + 1)
                    } else if axis <= rank {
                        let start = coords[axis - 1] * self.stride[axis - 1];
                        Slice::from(start..start + self.patch_shape[axis - 1])
                    } else {
                        Slice::from(..)
                    }
                });
                out.slice_each_axis_mut(|desc| batch_slot(desc.axis.index(), next))
                    .assign(&src);
                next += 1;
            }
        }
        Ok(out)
    }
}

impl Preprocessor for ExtractGridPatches {
    fn apply(&self, dataset: &mut DenseDesignMatrix) -> Result<(), PreprocessingError> {
        let orig_shape = dataset
            .view_converter()
            .ok_or(PreprocessingError::MissingTopology)?
            .spatial_shape()
            .to_vec();
        apply_to_canonical_view(dataset, self.name(), |view| self.extract(view.view()))?;
        dataset.set_patch_grid(PatchGrid {
            orig_shape,
            patch_shape: self.patch_shape.clone(),
            stride: self.stride.clone(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ExtractGridPatches"
    }
}

/// Puts non-overlapping grid patches back into images of `orig_shape`.
///
/// Only the tiling produced by [`ExtractGridPatches`] with `stride ==
/// patch_shape` can be inverted. Any batch that does not split evenly into
/// whole grids is rejected, as is a dataset whose recorded [`PatchGrid`]
/// overlaps or was cut from images of another shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassembleGridPatches {
    orig_shape: Vec<usize>,
    patch_shape: Vec<usize>,
}

impl ReassembleGridPatches {
    /// # Errors
    /// - [`PreprocessingError::InvalidParameter`] for zero or mismatched lengths
    /// - [`PreprocessingError::Geometry`] when `patch_shape` does not divide `orig_shape`
    pub fn new(orig_shape: Vec<usize>, patch_shape: Vec<usize>) -> Result<Self, PreprocessingError> {
        let reassembler = Self {
            orig_shape,
            patch_shape,
        };
        reassembler.grid_shape()?;
        Ok(reassembler)
    }

    pub fn orig_shape(&self) -> &[usize] {
        &self.orig_shape
    }

    pub fn patch_shape(&self) -> &[usize] {
        &self.patch_shape
    }

    /// Patches per image along each spatial axis.
    pub fn grid_shape(&self) -> Result<Vec<usize>, PreprocessingError> {
        validate_extent("orig_shape", &self.orig_shape)?;
        validate_extent("patch_shape", &self.patch_shape)?;
        if self.orig_shape.len() != self.patch_shape.len() {
            return Err(PreprocessingError::InvalidParameter(format!(
                "orig_shape {:?} and patch_shape {:?} have different lengths",
                self.orig_shape, self.patch_shape
            )));
        }
        self.orig_shape
            .iter()
            .zip(&self.patch_shape)
            .map(|(&dim, &patch)| {
                if dim % patch != 0 {
                    Err(PreprocessingError::Geometry(format!(
                        "cannot assemble patches of shape {:?} into images of shape {:?}",
                        self.patch_shape, self.orig_shape
                    )))
                } else {
                    Ok(dim / patch)
                }
            })
            .collect()
    }

    /// Check a dataset's recorded extraction against this reassembly.
    pub fn check_source(&self, grid: &PatchGrid) -> Result<(), PreprocessingError> {
        if !grid.is_tiling() {
            return Err(PreprocessingError::Geometry(format!(
                "patches of shape {:?} were extracted with stride {:?}; only a non-overlapping tiling can be reassembled",
                grid.patch_shape, grid.stride
            )));
        }
        if grid.orig_shape != self.orig_shape || grid.patch_shape != self.patch_shape {
            return Err(PreprocessingError::Geometry(format!(
                "patches of shape {:?} were cut from images of shape {:?}, not {:?} patches of {:?}",
                grid.patch_shape, grid.orig_shape, self.patch_shape, self.orig_shape
            )));
        }
        Ok(())
    }

    /// Reassemble a canonical `(b * positions, patch..., c)` view.
    pub fn reassemble(&self, view: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, PreprocessingError> {
        let grid = self.grid_shape()?;
        check_view(&view)?;
        let shape = view.shape();
        let rank = shape.len().saturating_sub(2);
        check_rank(rank, self.patch_shape.len())?;

        if shape[1..shape.len() - 1] != self.patch_shape[..] {
            return Err(PreprocessingError::Geometry(format!(
                "expected patches of shape {:?}, got {:?}",
                self.patch_shape,
                &shape[1..shape.len() - 1]
            )));
        }

        let positions: usize = grid.iter().product();
        let batch = shape[0];
        if batch % positions != 0 {
            return Err(PreprocessingError::Geometry(format!(
                "{} patches do not split into whole grids of {} patches",
                batch, positions
            )));
        }
        let examples = batch / positions;

        let mut out_shape = Vec::with_capacity(shape.len());
        out_shape.push(examples);
        out_shape.extend_from_slice(&self.orig_shape);
        out_shape.push(shape[shape.len() - 1]);
        let mut out = ArrayD::<f64>::zeros(IxDyn(&out_shape));

        let mut next = 0;
        for example in 0..examples {
            for position in 0..positions {
                let coords = unravel(position, &grid);
                let src = view.slice_each_axis(|desc| batch_slot(desc.axis.index(), next));
                out.slice_each_axis_mut(|desc| {
                    let axis = desc.axis.index();
                    if axis == 0 {
                        Slice::from(example..example + 1)
                    } else if axis <= rank {
                        let width = self.patch_shape[axis - 1];
                        let start = coords[axis - 1] * width;
                        Slice::from(start..start + width)
                    } else {
                        Slice::from(..)
                    }
                })
                .assign(&src);
                next += 1;
            }
        }
        Ok(out)
    }
}

impl Preprocessor for ReassembleGridPatches {
    fn apply(&self, dataset: &mut DenseDesignMatrix) -> Result<(), PreprocessingError> {
        if let Some(grid) = dataset.patch_grid() {
            self.check_source(grid)?;
        }
        apply_to_canonical_view(dataset, self.name(), |view| self.reassemble(view.view()))
    }

    fn name(&self) -> &'static str {
        "ReassembleGridPatches"
    }
}

fn check_view(view: &ArrayViewD<'_, f64>) -> Result<(), PreprocessingError> {
    if view.ndim() < 3 {
        return Err(PreprocessingError::shape_mismatch(
            "(batch, spatial..., channels)",
            view.shape(),
        ));
    }
    Ok(())
}

/// Selects batch entry `index` and keeps every other axis whole.
fn batch_slot(axis: usize, index: usize) -> Slice {
    if axis == 0 {
        Slice::from(index..index + 1)
    } else {
        Slice::from(..)
    }
}

/// Row-major coordinates of `flat` inside a grid of `dims`.
pub(crate) fn unravel(mut flat: usize, dims: &[usize]) -> Vec<usize> {
    let mut coords = vec![0; dims.len()];
    for (coord, &dim) in coords.iter_mut().zip(dims).rev() {
        *coord = flat % dim;
        flat /= dim;
    }
    coords
}

pub(crate) fn validate_extent(name: &str, extent: &[usize]) -> Result<(), PreprocessingError> {
    if extent.is_empty() || extent.contains(&0) {
        return Err(PreprocessingError::InvalidParameter(format!(
            "{} must be non-empty with positive entries, got {:?}",
            name, extent
        )));
    }
    Ok(())
}

pub(crate) fn check_rank(spatial_rank: usize, expected: usize) -> Result<(), PreprocessingError> {
    if spatial_rank != expected {
        return Err(PreprocessingError::Geometry(format!(
            "data has {} spatial dimensions but the patch geometry has {}",
            spatial_rank, expected
        )));
    }
    Ok(())
}
