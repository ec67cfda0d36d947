//! Numeric guards shared by the normalizing transforms.
//!
//! Every division in a transform goes through [`floor_divisor`], so a zero
//! denominator can never reach the arithmetic. [`ensure_finite`] then checks
//! the finished buffer before it is committed back to a dataset.

use ndarray::{ArrayBase, Data, Dimension};

use crate::preprocessing::error::PreprocessingError;

/// Clamp a denominator from below at `floor`.
///
/// NaN inputs also map to `floor`, because `f64::max` ignores a NaN operand.
#[inline]
pub fn floor_divisor(value: f64, floor: f64) -> f64 {
    value.max(floor)
}

/// Returns `true` when every element is finite.
pub fn all_finite<S, D>(data: &ArrayBase<S, D>) -> bool
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    data.iter().all(|v| v.is_finite())
}

/// Reject input that already carries NaN or Inf.
pub fn ensure_finite_input<S, D>(
    data: &ArrayBase<S, D>,
    transform: &'static str,
) -> Result<(), PreprocessingError>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if all_finite(data) {
        Ok(())
    } else {
        Err(PreprocessingError::NonFiniteInput(format!(
            "{} received NaN or Inf values",
            transform
        )))
    }
}

/// Check the output of a transform before it is committed.
pub fn ensure_finite<S, D>(
    data: &ArrayBase<S, D>,
    transform: &'static str,
) -> Result<(), PreprocessingError>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if all_finite(data) {
        Ok(())
    } else {
        Err(PreprocessingError::NumericGuardViolation { transform })
    }
}
