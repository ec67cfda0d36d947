//! JSON training configuration.
//!
//! ```json
//! {
//!   "dataset": { "type": "random", "num_examples": 40, "shape": [8, 8, 3], "seed": 3 },
//!   "preprocessors": [ { "type": "global_contrast_normalization" } ],
//!   "model": { "type": "gaussian_mean" },
//!   "algorithm": {
//!     "learning_rate": 0.1,
//!     "batch_size": 10,
//!     "termination_criterion": { "type": "monitor_based", "prop_decrease": 0.01, "n": 5 }
//!   },
//!   "save_path": null
//! }
//! ```

use std::path::{Path, PathBuf};

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::dataset::{CsvOptions, DenseDesignMatrix};
use crate::model::{GaussianMean, Model};
use crate::optimizer::Sgd;
use crate::preprocessing::Pipeline;
use crate::space::{Axes, DefaultViewConverter};

/// Top-level training configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub preprocessors: Pipeline,
    #[serde(default)]
    pub model: ModelConfig,
    pub algorithm: Sgd,
    /// Where to write the trained model; relative paths resolve against the
    /// config file's directory.
    #[serde(default)]
    pub save_path: Option<PathBuf>,
}

/// Where the training examples come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatasetConfig {
    /// Standard-normal examples drawn from a seeded generator.
    Random {
        num_examples: usize,
        /// Non-batch shape `(spatial..., channels)`.
        shape: Vec<usize>,
        #[serde(default)]
        axes: Option<Axes>,
        #[serde(default)]
        seed: u64,
    },
    /// A CSV file with one example per record.
    Csv {
        path: PathBuf,
        #[serde(default)]
        options: CsvOptions,
        /// Non-batch shape to attach as topology, if any.
        #[serde(default)]
        shape: Option<Vec<usize>>,
        #[serde(default)]
        axes: Option<Axes>,
    },
}

impl DatasetConfig {
    /// Materialize the dataset; CSV paths resolve against `base_dir`.
    pub fn build(&self, base_dir: &Path) -> Result<DenseDesignMatrix, super::TrainError> {
        match self {
            DatasetConfig::Random {
                num_examples,
                shape,
                axes,
                seed,
            } => {
                let converter = converter_for(shape.clone(), axes.clone())?;
                let mut rng = StdRng::seed_from_u64(*seed);
                let x = Array2::from_shape_simple_fn((*num_examples, converter.num_features()), || {
                    rng.sample(StandardNormal)
                });
                Ok(DenseDesignMatrix::with_view_converter(x, converter)?)
            }
            DatasetConfig::Csv {
                path,
                options,
                shape,
                axes,
            } => {
                let dataset = DenseDesignMatrix::from_csv(base_dir.join(path), options)?;
                match shape {
                    Some(shape) => {
                        let converter = converter_for(shape.clone(), axes.clone())?;
                        let targets = dataset.targets().cloned();
                        let with_topology =
                            DenseDesignMatrix::with_view_converter(dataset.design_matrix().clone(), converter)?;
                        match targets {
                            Some(y) => Ok(with_topology.with_targets(y)?),
                            None => Ok(with_topology),
                        }
                    }
                    None => Ok(dataset),
                }
            }
        }
    }
}

fn converter_for(
    shape: Vec<usize>,
    axes: Option<Axes>,
) -> Result<DefaultViewConverter, super::TrainError> {
    let converter = match axes {
        Some(axes) => DefaultViewConverter::new(shape, axes)?,
        None => DefaultViewConverter::canonical(shape)?,
    };
    Ok(converter)
}

/// Which model to train.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelConfig {
    #[default]
    GaussianMean,
}

impl ModelConfig {
    /// Instantiate the model once the (preprocessed) feature count is known.
    pub fn build(&self, num_features: usize) -> Box<dyn Model> {
        match self {
            ModelConfig::GaussianMean => Box::new(GaussianMean::new(num_features)),
        }
    }
}
