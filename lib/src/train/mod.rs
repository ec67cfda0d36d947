//! Config-driven training.
//!
//! [`load_train_file`] turns a JSON config (see [`config`]) into a [`Train`]
//! object; [`Train::main_loop`] preprocesses the dataset once, then runs SGD
//! epochs until the termination criterion says stop.
//!
//! ```rust,no_run
//! use topoprep::train::{load_train_file, TerminationCriterion};
//!
//! let mut train = load_train_file("demos/gcn_gaussian_mean.json").unwrap();
//! train.algorithm.termination_criterion = TerminationCriterion::MonitorBased {
//!     prop_decrease: 0.5,
//!     n: 1,
//! };
//! train.main_loop().unwrap();
//! println!("objective per epoch: {:?}", train.monitor());
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::dataset::{Dataset, DenseDesignMatrix};
use crate::model::Model;
use crate::optimizer::{Optimizer, Sgd};
use crate::preprocessing::{Pipeline, PreprocessingError};

pub mod config;
pub mod termination;

pub use config::{DatasetConfig, ModelConfig, TrainConfig};
pub use termination::TerminationCriterion;

/// Errors raised while loading a config or training.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),
    #[error("Invalid training config: {0}")]
    Config(String),
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read a JSON training config and build everything it describes.
///
/// # Errors
/// - [`TrainError::Io`] if the file cannot be read
/// - [`TrainError::Parse`] for malformed JSON
/// - [`TrainError::Config`] for invalid hyperparameters
/// - [`TrainError::Preprocessing`] when the dataset cannot be built
pub fn load_train_file<P: AsRef<Path>>(path: P) -> Result<Train, TrainError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let config: TrainConfig = serde_json::from_str(&json).map_err(|source| TrainError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    debug!(path = %path.display(), "loaded training config");
    Train::from_config(config, base_dir)
}

/// A dataset, its preprocessing, a model and the algorithm that fits it.
pub struct Train {
    dataset: DenseDesignMatrix,
    preprocessors: Pipeline,
    preprocessed: bool,
    model_config: ModelConfig,
    model: Option<Box<dyn Model>>,
    pub algorithm: Sgd,
    save_path: Option<PathBuf>,
    monitor: Vec<f64>,
}

impl Train {
    pub fn new(
        dataset: DenseDesignMatrix,
        preprocessors: Pipeline,
        model_config: ModelConfig,
        algorithm: Sgd,
        save_path: Option<PathBuf>,
    ) -> Self {
        Self {
            dataset,
            preprocessors,
            preprocessed: false,
            model_config,
            model: None,
            algorithm,
            save_path,
            monitor: Vec::new(),
        }
    }

    /// Build from a parsed config; relative paths resolve against `base_dir`.
    pub fn from_config(config: TrainConfig, base_dir: &Path) -> Result<Self, TrainError> {
        config.algorithm.validate().map_err(TrainError::Config)?;
        let dataset = config.dataset.build(base_dir)?;
        let save_path = config.save_path.map(|p| base_dir.join(p));
        Ok(Self::new(
            dataset,
            config.preprocessors,
            config.model,
            config.algorithm,
            save_path,
        ))
    }

    pub fn dataset(&self) -> &DenseDesignMatrix {
        &self.dataset
    }

    /// The model, once [`Train::main_loop`] has created it.
    pub fn model(&self) -> Option<&dyn Model> {
        self.model.as_deref()
    }

    /// Mean objective over the whole dataset after each finished epoch.
    pub fn monitor(&self) -> &[f64] {
        &self.monitor
    }

    /// Preprocess (once), then train until the termination criterion stops.
    ///
    /// Calling it again continues training the same model with a fresh
    /// objective history.
    pub fn main_loop(&mut self) -> Result<(), TrainError> {
        self.algorithm.validate().map_err(TrainError::Config)?;

        if !self.preprocessed {
            self.dataset.apply_preprocessor(&self.preprocessors)?;
            self.preprocessed = true;
            info!(
                steps = self.preprocessors.len(),
                examples = self.dataset.num_examples(),
                features = self.dataset.num_features(),
                "preprocessing finished"
            );
        }
        if self.dataset.is_empty() {
            return Err(PreprocessingError::EmptyData("training dataset has no examples".to_string()).into());
        }

        let num_features = self.dataset.num_features();
        let model_config = self.model_config;
        let model = self
            .model
            .get_or_insert_with(|| model_config.build(num_features));
        if model.num_features() != num_features {
            return Err(TrainError::Config(format!(
                "model expects {} features, dataset has {}",
                model.num_features(),
                num_features
            )));
        }

        self.monitor.clear();
        let criterion = &self.algorithm.termination_criterion;
        while criterion.continue_learning(&self.monitor) {
            for batch in self.dataset.batches(self.algorithm.batch_size) {
                let batch = batch?;
                let gradients = model.gradients(batch);
                let params = self.algorithm.step(model.params(), &gradients);
                model.update_params(params);
            }

            let objective = model.objective(self.dataset.design_matrix().view());
            self.monitor.push(objective);
            info!(
                epoch = self.monitor.len(),
                objective,
                model = model.name(),
                "epoch finished"
            );
        }

        if let Some(path) = &self.save_path {
            model.save_to_file(path)?;
            info!(path = %path.display(), "model saved");
        }
        Ok(())
    }
}
