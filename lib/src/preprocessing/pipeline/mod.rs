//! Pipeline utilities for chaining preprocessors.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Pipeline`] | Apply steps sequentially, all-or-nothing |
//! | [`PreprocessorStep`] | Closed set of configurable preprocessors |

#[allow(clippy::module_inception)]
pub mod pipeline;

pub use pipeline::{Pipeline, PreprocessorStep};
