//! Shared fixtures for the topoprep benchmarks.
//!
//! Run with:
//! ```text
//! cargo bench --package benchmarks --bench preprocessing
//! cargo bench --package benchmarks --bench view_conversion
//! ```

use ndarray::{Array, Array2, ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use topoprep::dataset::DenseDesignMatrix;
use topoprep::preprocessing::PreprocessingError;
use topoprep::space::Axes;

/// Image batch sizes used across benchmarks: `(examples, side)`.
pub const IMAGE_SIZES: [(usize, usize); 3] = [(16, 32), (64, 32), (16, 64)];

/// Standard-normal topological view of the given shape.
pub fn random_view(shape: &[usize], seed: u64) -> ArrayD<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array::from_shape_simple_fn(IxDyn(shape), || rng.sample(StandardNormal))
}

/// Standard-normal design matrix.
pub fn random_design(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_simple_fn((rows, cols), || rng.sample(StandardNormal))
}

/// `examples` RGB images of `side x side` pixels in `b, 0, 1, c` order.
pub fn rgb_dataset(
    examples: usize,
    side: usize,
    seed: u64,
) -> Result<DenseDesignMatrix, PreprocessingError> {
    DenseDesignMatrix::from_topological_view(random_view(&[examples, side, side, 3], seed), Axes::default())
}
