//! Dataset abstractions for preprocessing and training workloads.
//!
//! This module provides the [`Dataset`] trait for uniform batch access, the
//! [`DatasetBatchIter`] iterator built on it, and [`DenseDesignMatrix`], the
//! in-memory dataset every preprocessor operates on.
//!
//! # Core Concepts
//!
//! - **Design matrix** - canonical storage, shape `(n_examples, n_features)`.
//! - **Topological view** - the same values reshaped to
//!   `(examples, spatial..., channels)` in the order given by an
//!   [`Axes`](crate::space::Axes) descriptor; derived on demand.
//! - **Batch** - a contiguous range of examples.
//!
//! # Example
//!
//! ```rust
//! use ndarray::Array2;
//! use topoprep::dataset::{Dataset, DenseDesignMatrix};
//! use topoprep::space::DefaultViewConverter;
//!
//! let x = Array2::<f64>::zeros((4, 2 * 2 * 3));
//! let converter = DefaultViewConverter::canonical(vec![2, 2, 3]).unwrap();
//! let dataset = DenseDesignMatrix::with_view_converter(x, converter).unwrap();
//!
//! assert_eq!(dataset.topological_view().unwrap().shape(), &[4, 2, 2, 3]);
//! assert_eq!(dataset.batches(3).count(), 2);
//! ```

use std::ops::Range;

use ndarray::{s, Array2, ArrayD, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::patches::PatchGrid;
use crate::preprocessing::traits::Preprocessor;
use crate::space::{to_canonical, Axes, DefaultViewConverter};

pub mod csv;
pub use self::csv::CsvOptions;

/// Abstract interface for a dataset that can be read in contiguous batches.
pub trait Dataset {
    /// Number of examples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the design matrix rows in `range`.
    ///
    /// # Errors
    /// Returns [`PreprocessingError::ShapeMismatch`] when the range runs past the end.
    fn get_batch(&self, range: Range<usize>) -> Result<ArrayView2<'_, f64>, PreprocessingError>;

    /// Creates an iterator over fixed-size batches (the last one may be smaller).
    ///
    /// A `batch_size` of zero is treated as one.
    fn batches(&self, batch_size: usize) -> DatasetBatchIter<'_, Self>
    where
        Self: Sized,
    {
        DatasetBatchIter {
            dataset: self,
            batch_size: batch_size.max(1),
            current: 0,
        }
    }
}

/// Iterator over dataset batches, created by [`Dataset::batches`].
pub struct DatasetBatchIter<'a, D: ?Sized> {
    dataset: &'a D,
    batch_size: usize,
    /// Index of the next example to yield.
    current: usize,
}

impl<'a, D: Dataset> Iterator for DatasetBatchIter<'a, D> {
    type Item = Result<ArrayView2<'a, f64>, PreprocessingError>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.dataset.len();
        if self.current >= total {
            return None;
        }

        let end = (self.current + self.batch_size).min(total);
        let range = self.current..end;
        self.current = end;
        Some(self.dataset.get_batch(range))
    }
}

/// Dense in-memory dataset: a design matrix plus an optional view converter
/// describing its topology, and optional targets.
///
/// Deserialization runs the same consistency checks as the constructors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetRepr", into = "DatasetRepr")]
pub struct DenseDesignMatrix {
    x: Array2<f64>,
    y: Option<Array2<f64>>,
    view_converter: Option<DefaultViewConverter>,
    /// Set by grid extraction; cleared whenever the view shape changes.
    patch_grid: Option<PatchGrid>,
}

#[derive(Serialize, Deserialize)]
struct DatasetRepr {
    x: Array2<f64>,
    #[serde(default)]
    y: Option<Array2<f64>>,
    #[serde(default)]
    view_converter: Option<DefaultViewConverter>,
    #[serde(default)]
    patch_grid: Option<PatchGrid>,
}

impl TryFrom<DatasetRepr> for DenseDesignMatrix {
    type Error = PreprocessingError;

    fn try_from(repr: DatasetRepr) -> Result<Self, Self::Error> {
        let mut dataset = match repr.view_converter {
            Some(converter) => Self::with_view_converter(repr.x, converter)?,
            None => Self::new(repr.x),
        };
        if let Some(y) = repr.y {
            dataset = dataset.with_targets(y)?;
        }
        if let Some(grid) = repr.patch_grid {
            let spatial = dataset.view_converter.as_ref().map(DefaultViewConverter::spatial_shape);
            if spatial != Some(grid.patch_shape.as_slice()) {
                return Err(PreprocessingError::Geometry(format!(
                    "patch grid {:?} does not match view shape {:?}",
                    grid.patch_shape,
                    dataset.view_converter.as_ref().map(DefaultViewConverter::shape)
                )));
            }
            dataset.patch_grid = Some(grid);
        }
        Ok(dataset)
    }
}

impl From<DenseDesignMatrix> for DatasetRepr {
    fn from(dataset: DenseDesignMatrix) -> Self {
        Self {
            x: dataset.x,
            y: dataset.y,
            view_converter: dataset.view_converter,
            patch_grid: dataset.patch_grid,
        }
    }
}

impl DenseDesignMatrix {
    /// Dataset with no topology: only design matrix access is available.
    pub fn new(x: Array2<f64>) -> Self {
        Self {
            x,
            y: None,
            view_converter: None,
            patch_grid: None,
        }
    }

    /// Dataset whose columns are interpreted through `converter`.
    ///
    /// # Errors
    /// [`PreprocessingError::ShapeMismatch`] when the column count differs from
    /// the converter's feature count.
    pub fn with_view_converter(
        x: Array2<f64>,
        converter: DefaultViewConverter,
    ) -> Result<Self, PreprocessingError> {
        check_features(&x, &converter)?;
        Ok(Self {
            x,
            y: None,
            view_converter: Some(converter),
            patch_grid: None,
        })
    }

    /// Build a dataset from a topological view laid out in `axes` order.
    pub fn from_topological_view(view: ArrayD<f64>, axes: Axes) -> Result<Self, PreprocessingError> {
        let (x, converter) = flatten_view(view, axes)?;
        Ok(Self {
            x,
            y: None,
            view_converter: Some(converter),
            patch_grid: None,
        })
    }

    /// Attach targets, one row per example.
    pub fn with_targets(mut self, y: Array2<f64>) -> Result<Self, PreprocessingError> {
        if y.nrows() != self.x.nrows() {
            return Err(PreprocessingError::shape_mismatch(
                format!("{} target rows", self.x.nrows()),
                format!("{} target rows", y.nrows()),
            ));
        }
        self.y = Some(y);
        Ok(self)
    }

    pub fn design_matrix(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn targets(&self) -> Option<&Array2<f64>> {
        self.y.as_ref()
    }

    pub fn view_converter(&self) -> Option<&DefaultViewConverter> {
        self.view_converter.as_ref()
    }

    /// Grid geometry of the extraction that produced the current examples.
    pub fn patch_grid(&self) -> Option<&PatchGrid> {
        self.patch_grid.as_ref()
    }

    pub(crate) fn set_patch_grid(&mut self, grid: PatchGrid) {
        self.patch_grid = Some(grid);
    }

    pub fn axes(&self) -> Option<&Axes> {
        self.view_converter.as_ref().map(DefaultViewConverter::axes)
    }

    pub fn num_examples(&self) -> usize {
        self.x.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.x.ncols()
    }

    /// Shape of the topological view in the dataset's axis order.
    pub fn view_shape(&self) -> Option<Vec<usize>> {
        self.view_converter
            .as_ref()
            .map(|c| c.view_shape(self.num_examples()))
    }

    /// Topological view in the dataset's axis order.
    pub fn topological_view(&self) -> Result<ArrayD<f64>, PreprocessingError> {
        self.converter()?.design_to_topo(self.x.view())
    }

    /// Topological view in canonical `b, spatial..., c` order.
    ///
    /// Transforms work on this layout regardless of the dataset's axes.
    pub fn canonical_view(&self) -> Result<ArrayD<f64>, PreprocessingError> {
        self.converter()?.design_to_canonical(self.x.view())
    }

    /// Replace the design matrix.
    ///
    /// The column count must still match the view converter, if any. When the
    /// number of examples changes, targets no longer line up and are dropped.
    pub fn set_design_matrix(&mut self, x: Array2<f64>) -> Result<(), PreprocessingError> {
        if let Some(converter) = &self.view_converter {
            check_features(&x, converter)?;
        }
        self.commit(x, None);
        Ok(())
    }

    /// Replace the data with a topological view in `axes` order.
    ///
    /// The view converter is rebuilt from the view's shape and adopts `axes`.
    pub fn set_topological_view(
        &mut self,
        view: ArrayD<f64>,
        axes: Axes,
    ) -> Result<(), PreprocessingError> {
        let (x, converter) = flatten_view(view, axes)?;
        self.commit(x, Some(converter));
        Ok(())
    }

    /// Replace the data with a canonical-order view.
    ///
    /// The dataset keeps its axis order; only the converter's shape is updated.
    ///
    /// # Errors
    /// [`PreprocessingError::InvalidAxes`] when the view's rank differs from
    /// the dataset's axes.
    pub fn set_canonical_view(&mut self, view: ArrayD<f64>) -> Result<(), PreprocessingError> {
        if view.ndim() < 3 {
            return Err(PreprocessingError::shape_mismatch(
                "(batch, spatial..., channels)",
                view.shape(),
            ));
        }
        let shape = view.shape()[1..].to_vec();
        let converter = match &self.view_converter {
            Some(current) => {
                let mut converter = current.clone();
                converter.set_shape(shape)?;
                converter
            }
            None => DefaultViewConverter::canonical(shape)?,
        };
        let x = converter.canonical_to_design(view.view())?;
        self.commit(x, Some(converter));
        Ok(())
    }

    /// Apply `preprocessor` to this dataset in place.
    ///
    /// On error the dataset is left exactly as it was.
    pub fn apply_preprocessor(
        &mut self,
        preprocessor: &dyn Preprocessor,
    ) -> Result<(), PreprocessingError> {
        debug!(
            preprocessor = preprocessor.name(),
            examples = self.num_examples(),
            features = self.num_features(),
            "applying preprocessor"
        );
        preprocessor.apply(self)?;
        debug!(
            preprocessor = preprocessor.name(),
            examples = self.num_examples(),
            features = self.num_features(),
            "preprocessor applied"
        );
        Ok(())
    }

    fn converter(&self) -> Result<&DefaultViewConverter, PreprocessingError> {
        self.view_converter
            .as_ref()
            .ok_or(PreprocessingError::MissingTopology)
    }

    fn commit(&mut self, x: Array2<f64>, converter: Option<DefaultViewConverter>) {
        let resized = x.nrows() != self.x.nrows();
        if resized && self.y.take().is_some() {
            warn!(
                old_examples = self.x.nrows(),
                new_examples = x.nrows(),
                "example count changed, dropping targets"
            );
        }
        let reshaped = converter.as_ref().map_or(false, |new| {
            self.view_converter.as_ref().map(DefaultViewConverter::shape) != Some(new.shape())
        });
        if resized || reshaped {
            self.patch_grid = None;
        }
        self.x = x;
        if converter.is_some() {
            self.view_converter = converter;
        }
    }
}

impl Dataset for DenseDesignMatrix {
    fn len(&self) -> usize {
        self.num_examples()
    }

    fn get_batch(&self, range: Range<usize>) -> Result<ArrayView2<'_, f64>, PreprocessingError> {
        if range.start > range.end || range.end > self.num_examples() {
            return Err(PreprocessingError::shape_mismatch(
                format!("range within 0..{}", self.num_examples()),
                range,
            ));
        }
        Ok(self.x.slice(s![range, ..]))
    }
}

fn check_features(x: &Array2<f64>, converter: &DefaultViewConverter) -> Result<(), PreprocessingError> {
    if x.ncols() != converter.num_features() {
        return Err(PreprocessingError::ShapeMismatch {
            expected: format!(
                "{} features for view shape {:?}",
                converter.num_features(),
                converter.shape()
            ),
            got: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

fn flatten_view(
    view: ArrayD<f64>,
    axes: Axes,
) -> Result<(Array2<f64>, DefaultViewConverter), PreprocessingError> {
    if view.ndim() != axes.ndim() {
        return Err(PreprocessingError::InvalidAxes(format!(
            "axes {} do not match a {}-dimensional view",
            axes,
            view.ndim()
        )));
    }
    let canonical = to_canonical(view, &axes);
    let converter = DefaultViewConverter::new(canonical.shape()[1..].to_vec(), axes)?;
    let x = converter.canonical_to_design(canonical.view())?;
    Ok((x, converter))
}
