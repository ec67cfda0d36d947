//! Axis descriptors and design matrix / topological view conversion.

pub mod axes;
pub mod converter;

pub use axes::{Axes, Axis};
pub use converter::{from_canonical, to_canonical, DefaultViewConverter};
