//! Conversion between design matrices and topological views.
//!
//! The flat feature layout is channel-major: every pixel of channel 0 in
//! row-major spatial order, then channel 1, and so on. Converting is a pure
//! relabeling of the same values, so both directions round trip exactly.

use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};

use super::axes::Axes;
use crate::preprocessing::error::PreprocessingError;

/// Maps design matrices of shape `(examples, features)` to topological views
/// laid out according to an [`Axes`] descriptor, and back.
///
/// `shape` is the non-batch shape in canonical order: `(spatial..., channels)`.
/// Deserialized values go through [`DefaultViewConverter::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConverterRepr", into = "ConverterRepr")]
pub struct DefaultViewConverter {
    shape: Vec<usize>,
    axes: Axes,
}

#[derive(Serialize, Deserialize)]
struct ConverterRepr {
    shape: Vec<usize>,
    axes: Axes,
}

impl TryFrom<ConverterRepr> for DefaultViewConverter {
    type Error = PreprocessingError;

    fn try_from(repr: ConverterRepr) -> Result<Self, Self::Error> {
        Self::new(repr.shape, repr.axes)
    }
}

impl From<DefaultViewConverter> for ConverterRepr {
    fn from(converter: DefaultViewConverter) -> Self {
        Self {
            shape: converter.shape,
            axes: converter.axes,
        }
    }
}

impl DefaultViewConverter {
    /// Create a converter for images of `shape = (spatial..., channels)`.
    ///
    /// # Errors
    /// - [`PreprocessingError::InvalidParameter`] for an empty shape or a zero dimension
    /// - [`PreprocessingError::InvalidAxes`] when the axes rank does not match `shape`
    pub fn new(shape: Vec<usize>, axes: Axes) -> Result<Self, PreprocessingError> {
        validate_shape(&shape)?;
        check_rank(&shape, &axes)?;
        Ok(Self { shape, axes })
    }

    /// Converter with canonical `b, 0, 1, ..., c` axes.
    pub fn canonical(shape: Vec<usize>) -> Result<Self, PreprocessingError> {
        let rank = shape.len().saturating_sub(1);
        Self::new(shape, Axes::canonical(rank))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn axes(&self) -> &Axes {
        &self.axes
    }

    pub fn spatial_shape(&self) -> &[usize] {
        &self.shape[..self.shape.len() - 1]
    }

    pub fn num_channels(&self) -> usize {
        self.shape[self.shape.len() - 1]
    }

    pub fn pixels_per_channel(&self) -> usize {
        self.spatial_shape().iter().product()
    }

    /// Number of design matrix columns this converter expects.
    pub fn num_features(&self) -> usize {
        self.shape.iter().product()
    }

    /// Replace the non-batch shape, keeping the axis order.
    ///
    /// The spatial rank cannot change because the axes are kept.
    pub fn set_shape(&mut self, shape: Vec<usize>) -> Result<(), PreprocessingError> {
        validate_shape(&shape)?;
        check_rank(&shape, &self.axes)?;
        self.shape = shape;
        Ok(())
    }

    /// Change the axis order of produced views.
    pub fn set_axes(&mut self, axes: Axes) -> Result<(), PreprocessingError> {
        check_rank(&self.shape, &axes)?;
        self.axes = axes;
        Ok(())
    }

    /// Full shape of a view with `batch` examples, in this converter's axis order.
    pub fn view_shape(&self, batch: usize) -> Vec<usize> {
        let mut canonical = Vec::with_capacity(self.shape.len() + 1);
        canonical.push(batch);
        canonical.extend_from_slice(&self.shape);
        self.axes
            .from_canonical_permutation()
            .into_iter()
            .map(|i| canonical[i])
            .collect()
    }

    /// Design matrix to a topological view in this converter's axis order.
    pub fn design_to_topo(&self, x: ArrayView2<'_, f64>) -> Result<ArrayD<f64>, PreprocessingError> {
        let canonical = self.design_to_canonical(x)?;
        Ok(from_canonical(canonical, &self.axes))
    }

    /// Design matrix to a view in canonical `b, spatial..., c` order.
    pub fn design_to_canonical(
        &self,
        x: ArrayView2<'_, f64>,
    ) -> Result<ArrayD<f64>, PreprocessingError> {
        let (rows, cols) = x.dim();
        if cols != self.num_features() {
            return Err(PreprocessingError::ShapeMismatch {
                expected: format!(
                    "{} features ({} channels x {} pixels)",
                    self.num_features(),
                    self.num_channels(),
                    self.pixels_per_channel()
                ),
                got: format!("{} features", cols),
            });
        }

        // (b, c, spatial...) matches the channel-major feature order.
        let mut dims = Vec::with_capacity(self.shape.len() + 1);
        dims.push(rows);
        dims.push(self.num_channels());
        dims.extend_from_slice(self.spatial_shape());
        let channel_first = ArrayD::from_shape_vec(IxDyn(&dims), x.iter().copied().collect())
            .map_err(|e| PreprocessingError::shape_mismatch(&dims, e.to_string()))?;

        let ndim = dims.len();
        let mut perm = Vec::with_capacity(ndim);
        perm.push(0);
        perm.extend(2..ndim);
        perm.push(1);
        Ok(channel_first
            .permuted_axes(IxDyn(&perm))
            .as_standard_layout()
            .into_owned())
    }

    /// Topological view in this converter's axis order to a design matrix.
    pub fn topo_to_design(&self, view: ArrayViewD<'_, f64>) -> Result<Array2<f64>, PreprocessingError> {
        if view.ndim() != self.axes.ndim() {
            return Err(PreprocessingError::shape_mismatch(
                self.view_shape(0),
                view.shape(),
            ));
        }
        let canonical = view.permuted_axes(IxDyn(&self.axes.to_canonical_permutation()));
        self.canonical_to_design(canonical)
    }

    /// Canonical-order view to a design matrix.
    pub fn canonical_to_design(
        &self,
        view: ArrayViewD<'_, f64>,
    ) -> Result<Array2<f64>, PreprocessingError> {
        if view.ndim() != self.shape.len() + 1 || view.shape()[1..] != self.shape[..] {
            let mut expected = vec![view.shape().first().copied().unwrap_or(0)];
            expected.extend_from_slice(&self.shape);
            return Err(PreprocessingError::shape_mismatch(expected, view.shape()));
        }

        let rows = view.shape()[0];
        let ndim = view.ndim();
        let mut perm = Vec::with_capacity(ndim);
        perm.push(0);
        perm.push(ndim - 1);
        perm.extend(1..ndim - 1);
        let channel_first = view.permuted_axes(IxDyn(&perm));
        Array2::from_shape_vec((rows, self.num_features()), channel_first.iter().copied().collect())
            .map_err(|e| PreprocessingError::shape_mismatch((rows, self.num_features()), e.to_string()))
    }
}

/// Reorder a canonical-order view into `axes` order.
pub fn from_canonical(view: ArrayD<f64>, axes: &Axes) -> ArrayD<f64> {
    if axes.is_canonical() {
        return view;
    }
    view.permuted_axes(IxDyn(&axes.from_canonical_permutation()))
        .as_standard_layout()
        .into_owned()
}

/// Reorder a view in `axes` order into canonical order.
pub fn to_canonical(view: ArrayD<f64>, axes: &Axes) -> ArrayD<f64> {
    if axes.is_canonical() {
        return view;
    }
    view.permuted_axes(IxDyn(&axes.to_canonical_permutation()))
        .as_standard_layout()
        .into_owned()
}

fn validate_shape(shape: &[usize]) -> Result<(), PreprocessingError> {
    if shape.len() < 2 {
        return Err(PreprocessingError::InvalidParameter(format!(
            "view shape needs at least one spatial dimension and a channel dimension, got {:?}",
            shape
        )));
    }
    if shape.contains(&0) {
        return Err(PreprocessingError::InvalidParameter(format!(
            "view shape {:?} contains a zero dimension",
            shape
        )));
    }
    Ok(())
}

fn check_rank(shape: &[usize], axes: &Axes) -> Result<(), PreprocessingError> {
    if axes.ndim() != shape.len() + 1 {
        return Err(PreprocessingError::InvalidAxes(format!(
            "axes {} do not fit a view of non-batch shape {:?}",
            axes, shape
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn sequential(rows: usize, cols: usize) -> Array2<f64> {
        Array::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as f64)
    }

    #[test]
    fn test_channel_major_layout() {
        // 1 example, 2x2 pixels, 2 channels: features [c0p0, c0p1, c0p2, c0p3, c1p0, ...]
        let conv = DefaultViewConverter::canonical(vec![2, 2, 2]).unwrap();
        let x = sequential(1, 8);
        let topo = conv.design_to_topo(x.view()).unwrap();

        assert_eq!(topo.shape(), &[1, 2, 2, 2]);
        assert_eq!(topo[[0, 0, 0, 0]], 0.0);
        assert_eq!(topo[[0, 0, 1, 0]], 1.0);
        assert_eq!(topo[[0, 1, 0, 0]], 2.0);
        assert_eq!(topo[[0, 0, 0, 1]], 4.0);
        assert_eq!(topo[[0, 1, 1, 1]], 7.0);
    }

    #[test]
    fn test_round_trip_canonical() {
        let conv = DefaultViewConverter::canonical(vec![3, 5, 2]).unwrap();
        let x = sequential(4, 30);
        let topo = conv.design_to_topo(x.view()).unwrap();
        let back = conv.topo_to_design(topo.view()).unwrap();
        assert_eq!(back, x);
    }

    #[test]
    fn test_round_trip_permuted_axes() {
        let axes: Axes = "c,1,b,0".parse().unwrap();
        let conv = DefaultViewConverter::new(vec![3, 5, 2], axes).unwrap();
        let x = sequential(4, 30);
        let topo = conv.design_to_topo(x.view()).unwrap();

        assert_eq!(topo.shape(), &[2, 5, 4, 3]);
        assert_eq!(topo.shape(), conv.view_shape(4).as_slice());
        assert_eq!(conv.topo_to_design(topo.view()).unwrap(), x);
    }

    #[test]
    fn test_permuted_matches_canonical_values() {
        let axes: Axes = "b,c,0,1".parse().unwrap();
        let conv = DefaultViewConverter::new(vec![2, 3, 2], axes).unwrap();
        let canonical = DefaultViewConverter::canonical(vec![2, 3, 2]).unwrap();
        let x = sequential(2, 12);

        let bc01 = conv.design_to_topo(x.view()).unwrap();
        let b01c = canonical.design_to_topo(x.view()).unwrap();
        assert_eq!(bc01[[1, 1, 0, 2]], b01c[[1, 0, 2, 1]]);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let conv = DefaultViewConverter::canonical(vec![2, 2, 3]).unwrap();
        let x = sequential(2, 11);
        assert!(matches!(
            conv.design_to_topo(x.view()),
            Err(PreprocessingError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_view_shape_mismatch() {
        let conv = DefaultViewConverter::canonical(vec![2, 2, 3]).unwrap();
        let view = ArrayD::<f64>::zeros(IxDyn(&[1, 2, 3, 3]));
        assert!(matches!(
            conv.topo_to_design(view.view()),
            Err(PreprocessingError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_set_shape_keeps_axes() {
        let axes: Axes = "b,c,0,1".parse().unwrap();
        let mut conv = DefaultViewConverter::new(vec![4, 4, 3], axes.clone()).unwrap();
        conv.set_shape(vec![2, 2, 3]).unwrap();
        assert_eq!(conv.shape(), &[2, 2, 3]);
        assert_eq!(conv.axes(), &axes);
        assert_eq!(conv.num_features(), 12);

        assert!(conv.set_shape(vec![2, 2, 2, 3]).is_err());
        assert!(conv.set_shape(vec![0, 2, 3]).is_err());
    }

    #[test]
    fn test_rank_mismatch_rejected() {
        let result = DefaultViewConverter::new(vec![4, 4, 4, 3], Axes::canonical(2));
        assert!(matches!(result, Err(PreprocessingError::InvalidAxes(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let axes: Axes = "c,0,1,b".parse().unwrap();
        let conv = DefaultViewConverter::new(vec![4, 5, 3], axes).unwrap();
        let json = serde_json::to_string(&conv).unwrap();
        assert_eq!(serde_json::from_str::<DefaultViewConverter>(&json).unwrap(), conv);
    }

    #[test]
    fn test_json_is_validated() {
        for json in [
            r#"{"shape": [], "axes": ["b", 0, "c"]}"#,
            r#"{"shape": [4, 0, 3], "axes": ["b", 0, 1, "c"]}"#,
            r#"{"shape": [4, 4, 3], "axes": ["b", 0, "c"]}"#,
        ] {
            assert!(serde_json::from_str::<DefaultViewConverter>(json).is_err(), "{}", json);
        }
    }

    #[test]
    fn test_one_spatial_dimension() {
        let conv = DefaultViewConverter::canonical(vec![6, 2]).unwrap();
        let x = sequential(3, 12);
        let topo = conv.design_to_topo(x.view()).unwrap();
        assert_eq!(topo.shape(), &[3, 6, 2]);
        assert_eq!(conv.topo_to_design(topo.view()).unwrap(), x);
    }
}
