//! Axis descriptors for topological views.
//!
//! An [`Axes`] value fixes the memory order of a topological view, e.g.
//! `b, 0, 1, c` for (batch, row, column, channel). The descriptor is checked
//! once in [`Axes::new`]; code holding an `Axes` never re-validates it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::preprocessing::error::PreprocessingError;

/// A single axis tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AxisRepr", into = "AxisRepr")]
pub enum Axis {
    /// Example index.
    Batch,
    /// Spatial dimension `i` (0 = rows, 1 = columns, ...).
    Spatial(usize),
    /// Channel index.
    Channel,
}

/// Wire form used in config files: `"b"`, `"c"` or a spatial index.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum AxisRepr {
    Index(usize),
    Tag(String),
}

impl TryFrom<AxisRepr> for Axis {
    type Error = PreprocessingError;

    fn try_from(repr: AxisRepr) -> Result<Self, Self::Error> {
        match repr {
            AxisRepr::Index(i) => Ok(Axis::Spatial(i)),
            AxisRepr::Tag(tag) => tag.parse(),
        }
    }
}

impl From<Axis> for AxisRepr {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Batch => AxisRepr::Tag("b".to_string()),
            Axis::Channel => AxisRepr::Tag("c".to_string()),
            Axis::Spatial(i) => AxisRepr::Index(i),
        }
    }
}

impl FromStr for Axis {
    type Err = PreprocessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "b" => Ok(Axis::Batch),
            "c" => Ok(Axis::Channel),
            other => other.parse::<usize>().map(Axis::Spatial).map_err(|_| {
                PreprocessingError::InvalidAxes(format!("unknown axis tag '{}'", other))
            }),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Batch => write!(f, "b"),
            Axis::Channel => write!(f, "c"),
            Axis::Spatial(i) => write!(f, "{}", i),
        }
    }
}

/// A validated axis order.
///
/// Holds exactly one [`Axis::Batch`], exactly one [`Axis::Channel`] and the
/// spatial axes `0..rank`, each once, in any order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Axis>", into = "Vec<Axis>")]
pub struct Axes {
    order: Vec<Axis>,
}

impl Axes {
    /// Validate an axis order.
    ///
    /// # Errors
    /// [`PreprocessingError::InvalidAxes`] when a tag is missing, duplicated,
    /// or a spatial index is outside `0..rank`.
    pub fn new(order: Vec<Axis>) -> Result<Self, PreprocessingError> {
        if order.len() < 3 {
            return Err(PreprocessingError::InvalidAxes(format!(
                "need batch, channel and at least one spatial axis, got {} axes",
                order.len()
            )));
        }
        let rank = order.len() - 2;
        let mut seen_batch = false;
        let mut seen_channel = false;
        let mut seen_spatial = vec![false; rank];

        for axis in &order {
            let slot = match axis {
                Axis::Batch => &mut seen_batch,
                Axis::Channel => &mut seen_channel,
                Axis::Spatial(i) if *i < rank => &mut seen_spatial[*i],
                Axis::Spatial(i) => {
                    return Err(PreprocessingError::InvalidAxes(format!(
                        "spatial axis {} out of range for spatial rank {}",
                        i, rank
                    )))
                }
            };
            if *slot {
                return Err(PreprocessingError::InvalidAxes(format!(
                    "axis '{}' appears more than once",
                    axis
                )));
            }
            *slot = true;
        }

        if !seen_batch || !seen_channel {
            return Err(PreprocessingError::InvalidAxes(
                "batch and channel axes are both required".to_string(),
            ));
        }
        Ok(Self { order })
    }

    /// The canonical order `b, 0, 1, ..., c` for the given spatial rank.
    pub fn canonical(spatial_rank: usize) -> Self {
        let mut order = Vec::with_capacity(spatial_rank + 2);
        order.push(Axis::Batch);
        order.extend((0..spatial_rank).map(Axis::Spatial));
        order.push(Axis::Channel);
        Self { order }
    }

    pub fn as_slice(&self) -> &[Axis] {
        &self.order
    }

    /// Total number of dimensions of a view in this order.
    pub fn ndim(&self) -> usize {
        self.order.len()
    }

    pub fn spatial_rank(&self) -> usize {
        self.order.len() - 2
    }

    /// Position of `axis` in this order.
    pub fn position(&self, axis: Axis) -> Option<usize> {
        self.order.iter().position(|a| *a == axis)
    }

    pub fn is_canonical(&self) -> bool {
        *self == Self::canonical(self.spatial_rank())
    }

    fn canonical_index(&self, axis: Axis) -> usize {
        match axis {
            Axis::Batch => 0,
            Axis::Spatial(i) => i + 1,
            Axis::Channel => self.spatial_rank() + 1,
        }
    }

    /// Permutation turning a canonical-order array into this order
    /// (for `ndarray`'s `permuted_axes`).
    pub fn from_canonical_permutation(&self) -> Vec<usize> {
        self.order.iter().map(|a| self.canonical_index(*a)).collect()
    }

    /// Permutation turning an array in this order into canonical order.
    pub fn to_canonical_permutation(&self) -> Vec<usize> {
        let mut perm = vec![0; self.order.len()];
        for (pos, axis) in self.order.iter().enumerate() {
            perm[self.canonical_index(*axis)] = pos;
        }
        perm
    }
}

impl Default for Axes {
    fn default() -> Self {
        Self::canonical(2)
    }
}

impl TryFrom<Vec<Axis>> for Axes {
    type Error = PreprocessingError;

    fn try_from(order: Vec<Axis>) -> Result<Self, Self::Error> {
        Axes::new(order)
    }
}

impl From<Axes> for Vec<Axis> {
    fn from(axes: Axes) -> Self {
        axes.order
    }
}

impl FromStr for Axes {
    type Err = PreprocessingError;

    /// Parses comma separated tags such as `b,0,1,c`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let order = s
            .split(',')
            .map(str::parse::<Axis>)
            .collect::<Result<Vec<_>, _>>()?;
        Axes::new(order)
    }
}

impl fmt::Display for Axes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self.order.iter().map(Axis::to_string).collect();
        write!(f, "[{}]", tags.join(", "))
    }
}
