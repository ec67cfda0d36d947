//! Core trait for preprocessors.
//!
//! A [`Preprocessor`] is configured once and can be applied to any number of
//! datasets. Applying it rewrites the dataset's design matrix in place; the
//! full result is computed before anything is written back, so a failed
//! application leaves the dataset untouched.

use ndarray::ArrayD;
use tracing::debug;

use crate::dataset::DenseDesignMatrix;
use crate::numeric::{ensure_finite, ensure_finite_input};
use crate::preprocessing::error::PreprocessingError;

/// A transform that rewrites a dataset in place.
///
/// # Example
/// ```ignore
/// use topoprep::preprocessing::{GlobalContrastNormalization, Preprocessor};
///
/// let gcn = GlobalContrastNormalization::new().with_std_bias(0.0).with_use_norm(true);
/// dataset.apply_preprocessor(&gcn)?;
/// ```
pub trait Preprocessor {
    /// Transform `dataset`, committing the result only on success.
    ///
    /// # Errors
    /// Returns [`PreprocessingError`] if the dataset's shape or topology does
    /// not fit the transform's parameters.
    fn apply(&self, dataset: &mut DenseDesignMatrix) -> Result<(), PreprocessingError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Run `transform` on the dataset's canonical view and commit its output.
pub(crate) fn apply_to_canonical_view<F>(
    dataset: &mut DenseDesignMatrix,
    name: &'static str,
    transform: F,
) -> Result<(), PreprocessingError>
where
    F: FnOnce(ArrayD<f64>) -> Result<ArrayD<f64>, PreprocessingError>,
{
    let view = dataset.canonical_view()?;
    let output = transform(view)?;
    debug!(transform = name, shape = ?output.shape(), "committing canonical view");
    dataset.set_canonical_view(output)
}

/// Like [`apply_to_canonical_view`], for arithmetic transforms whose output
/// must stay finite. NaN/Inf input is rejected up front.
pub(crate) fn apply_numeric_to_canonical_view<F>(
    dataset: &mut DenseDesignMatrix,
    name: &'static str,
    transform: F,
) -> Result<(), PreprocessingError>
where
    F: FnOnce(ArrayD<f64>) -> Result<ArrayD<f64>, PreprocessingError>,
{
    apply_to_canonical_view(dataset, name, |view| {
        ensure_finite_input(&view, name)?;
        let output = transform(view)?;
        ensure_finite(&output, name)?;
        Ok(output)
    })
}
