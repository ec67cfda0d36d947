//! # topoprep
//!
//! Preprocessing for image-like datasets stored as design matrices, with a
//! small config-driven training loop on top.
//!
//! ## Core Design Principles
//!
//! - **One canonical store**: a dataset owns a flat `(examples, features)`
//!   design matrix; the N-d topological view is always derived from it.
//! - **Typed layouts**: axis orders such as `b, 0, 1, c` are validated once
//!   into an [`Axes`](space::Axes) value and trusted afterwards.
//! - **All-or-nothing transforms**: every preprocessor computes its full
//!   result before committing, so a failed application changes nothing.
//! - **Guarded arithmetic**: normalizing divisions are floored at an epsilon
//!   and outputs are checked to be finite.
//!
//! ## Quick Start
//!
//! ```rust
//! use ndarray::{Array, IxDyn};
//! use topoprep::dataset::DenseDesignMatrix;
//! use topoprep::preprocessing::{GlobalContrastNormalization, LeCunLcn, Pipeline};
//! use topoprep::space::Axes;
//!
//! let topo = Array::from_shape_fn(IxDyn(&[4, 16, 16, 3]), |idx| (idx[1] * idx[2]) as f64);
//! let mut dataset = DenseDesignMatrix::from_topological_view(topo, Axes::default()).unwrap();
//!
//! let pipeline = Pipeline::new()
//!     .add(GlobalContrastNormalization::new())
//!     .add(LeCunLcn::new(vec![16, 16]).unwrap());
//! dataset.apply_preprocessor(&pipeline).unwrap();
//!
//! assert!(dataset.design_matrix().iter().all(|v| v.is_finite()));
//! ```
//!
//! ## Module Structure
//!
//! - `space` - axis descriptors and the design matrix ↔ topological view converter
//! - `dataset` - [`DenseDesignMatrix`](dataset::DenseDesignMatrix), batching, CSV input
//! - `preprocessing` - the preprocessors and pipelines
//! - `numeric` - divisor floors and finiteness checks
//! - `model` - models fitted by the training loop
//! - `optimizer` - parameter update rules
//! - `train` - JSON configs, termination criteria and the main loop

/// Data loading utilities and dataset abstractions.
pub mod dataset;

/// Machine learning models trained by the [`train`] driver.
pub mod model;

/// Numeric guards shared by the normalizing transforms.
pub mod numeric;

/// Optimization algorithms for parameter updates.
pub mod optimizer;

/// Dataset preprocessors and pipelines.
pub mod preprocessing;

/// Axis descriptors and view conversion.
pub mod space;

/// High-level training loop orchestration.
pub mod train;

pub use dataset::{Dataset, DenseDesignMatrix};
pub use preprocessing::{Preprocessor, PreprocessingError};
pub use space::{Axes, Axis, DefaultViewConverter};
