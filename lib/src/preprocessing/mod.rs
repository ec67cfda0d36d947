//! Dataset preprocessors for image-like data.
//!
//! Every preprocessor is a plain configured value implementing
//! [`Preprocessor`]. Applying one to a [`DenseDesignMatrix`] computes the
//! complete new data first and commits it only on success, so a failure
//! leaves the dataset exactly as it was.
//!
//! # Available Preprocessors
//!
//! ## Contrast
//! - [`GlobalContrastNormalization`]: per-example centering and scaling
//! - [`LeCunLcn`]: Gaussian-weighted local contrast normalization
//!
//! ## Geometry
//! - [`ExtractGridPatches`] / [`ReassembleGridPatches`]: tile images into patches and back
//! - [`CentralWindow`]: crop the center of every image
//! - [`ExtractPatches`]: seeded random patches
//!
//! ## Color
//! - [`RgbYuv`]: RGB ↔ YUV conversion on the channel axis
//!
//! ## Pipeline
//! - [`Pipeline`]: chain any of the above
//!
//! # Example
//!
//! ```rust
//! use ndarray::{Array, IxDyn};
//! use topoprep::dataset::DenseDesignMatrix;
//! use topoprep::preprocessing::{ExtractGridPatches, ReassembleGridPatches};
//! use topoprep::space::Axes;
//!
//! let topo = Array::from_shape_fn(IxDyn(&[2, 6, 6, 3]), |idx| idx[1] as f64);
//! let mut dataset = DenseDesignMatrix::from_topological_view(topo.clone(), Axes::default()).unwrap();
//!
//! dataset.apply_preprocessor(&ExtractGridPatches::tiling(vec![3, 3]).unwrap()).unwrap();
//! assert_eq!(dataset.num_examples(), 2 * 4);
//!
//! dataset.apply_preprocessor(&ReassembleGridPatches::new(vec![6, 6], vec![3, 3]).unwrap()).unwrap();
//! assert_eq!(dataset.topological_view().unwrap(), topo);
//! ```
//!
//! [`DenseDesignMatrix`]: crate::dataset::DenseDesignMatrix

pub mod color;
pub mod contrast;
pub mod error;
pub mod lcn;
pub mod patches;
pub mod pipeline;
pub mod traits;
pub mod window;

pub use color::RgbYuv;
pub use contrast::GlobalContrastNormalization;
pub use error::PreprocessingError;
pub use lcn::LeCunLcn;
pub use patches::{ExtractGridPatches, PatchGrid, ReassembleGridPatches};
pub use pipeline::{Pipeline, PreprocessorStep};
pub use traits::Preprocessor;
pub use window::{CentralWindow, ExtractPatches};
