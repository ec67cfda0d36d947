//! Pipeline for chaining preprocessors.
//!
//! A [`Pipeline`] applies its steps in order to one working copy of the
//! dataset, so the output of one step is the input of the next, and only
//! writes the result back once every step has succeeded.
//!
//! # Example
//! ```ignore
//! use topoprep::preprocessing::{
//!     ExtractGridPatches, GlobalContrastNormalization, Pipeline,
//! };
//!
//! let pipeline = Pipeline::new()
//!     .add(ExtractGridPatches::tiling(vec![8, 8])?)
//!     .add(GlobalContrastNormalization::new());
//!
//! dataset.apply_preprocessor(&pipeline)?;
//! pipeline.save_to_file("pipeline.bin")?;
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataset::DenseDesignMatrix;
use crate::preprocessing::color::RgbYuv;
use crate::preprocessing::contrast::GlobalContrastNormalization;
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::lcn::LeCunLcn;
use crate::preprocessing::patches::{ExtractGridPatches, ReassembleGridPatches};
use crate::preprocessing::traits::Preprocessor;
use crate::preprocessing::window::{CentralWindow, ExtractPatches};

/// One configured preprocessor inside a pipeline or a config file.
///
/// In JSON the variant is selected by a `"type"` field next to the
/// preprocessor's own parameters:
/// ```json
/// { "type": "extract_grid_patches", "patch_shape": [8, 8], "stride": [8, 8] }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreprocessorStep {
    GlobalContrastNormalization(GlobalContrastNormalization),
    ExtractGridPatches(ExtractGridPatches),
    ReassembleGridPatches(ReassembleGridPatches),
    #[serde(rename = "lecun_lcn")]
    LeCunLcn(LeCunLcn),
    RgbYuv(RgbYuv),
    CentralWindow(CentralWindow),
    ExtractPatches(ExtractPatches),
}

impl PreprocessorStep {
    fn as_preprocessor(&self) -> &dyn Preprocessor {
        match self {
            PreprocessorStep::GlobalContrastNormalization(p) => p,
            PreprocessorStep::ExtractGridPatches(p) => p,
            PreprocessorStep::ReassembleGridPatches(p) => p,
            PreprocessorStep::LeCunLcn(p) => p,
            PreprocessorStep::RgbYuv(p) => p,
            PreprocessorStep::CentralWindow(p) => p,
            PreprocessorStep::ExtractPatches(p) => p,
        }
    }

    /// Encode the step's parameters on their own, tagged by name.
    fn to_tagged_bytes(&self) -> Result<(String, Vec<u8>), PreprocessingError> {
        let bytes = match self {
            PreprocessorStep::GlobalContrastNormalization(p) => bincode::serialize(p)?,
            PreprocessorStep::ExtractGridPatches(p) => bincode::serialize(p)?,
            PreprocessorStep::ReassembleGridPatches(p) => bincode::serialize(p)?,
            PreprocessorStep::LeCunLcn(p) => bincode::serialize(p)?,
            PreprocessorStep::RgbYuv(p) => bincode::serialize(p)?,
            PreprocessorStep::CentralWindow(p) => bincode::serialize(p)?,
            PreprocessorStep::ExtractPatches(p) => bincode::serialize(p)?,
        };
        Ok((self.name().to_string(), bytes))
    }

    fn from_tagged_bytes(name: &str, bytes: &[u8]) -> Result<Self, PreprocessingError> {
        let step = match name {
            "GlobalContrastNormalization" => {
                PreprocessorStep::GlobalContrastNormalization(bincode::deserialize(bytes)?)
            }
            "ExtractGridPatches" => PreprocessorStep::ExtractGridPatches(bincode::deserialize(bytes)?),
            "ReassembleGridPatches" => {
                PreprocessorStep::ReassembleGridPatches(bincode::deserialize(bytes)?)
            }
            "LeCunLcn" => PreprocessorStep::LeCunLcn(bincode::deserialize(bytes)?),
            "RgbYuv" | "YuvRgb" => PreprocessorStep::RgbYuv(bincode::deserialize(bytes)?),
            "CentralWindow" => PreprocessorStep::CentralWindow(bincode::deserialize(bytes)?),
            "ExtractPatches" => PreprocessorStep::ExtractPatches(bincode::deserialize(bytes)?),
            other => {
                return Err(PreprocessingError::Serialization(format!(
                    "unknown pipeline step '{}'",
                    other
                )))
            }
        };
        Ok(step)
    }
}

impl Preprocessor for PreprocessorStep {
    fn apply(&self, dataset: &mut DenseDesignMatrix) -> Result<(), PreprocessingError> {
        self.as_preprocessor().apply(dataset)
    }

    fn name(&self) -> &'static str {
        self.as_preprocessor().name()
    }
}

macro_rules! impl_from_step {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for PreprocessorStep {
                fn from(p: $variant) -> Self {
                    PreprocessorStep::$variant(p)
                }
            }
        )*
    };
}

impl_from_step!(
    GlobalContrastNormalization,
    ExtractGridPatches,
    ReassembleGridPatches,
    LeCunLcn,
    RgbYuv,
    CentralWindow,
    ExtractPatches,
);

/// An ordered chain of preprocessing steps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    steps: Vec<PreprocessorStep>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, step: impl Into<PreprocessorStep>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn push(&mut self, step: impl Into<PreprocessorStep>) {
        self.steps.push(step.into());
    }

    pub fn steps(&self) -> &[PreprocessorStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Parse a pipeline from a JSON array of steps.
    pub fn from_json(json: &str) -> Result<Self, PreprocessingError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PreprocessingError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a JSON pipeline file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PreprocessingError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save the pipeline in binary form.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PreprocessingError> {
        let step_params = self
            .steps
            .iter()
            .map(PreprocessorStep::to_tagged_bytes)
            .collect::<Result<Vec<_>, _>>()?;
        let bytes = bincode::serialize(&step_params)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a pipeline written by [`Pipeline::save_to_file`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PreprocessingError> {
        let bytes = std::fs::read(path)?;
        let step_params: Vec<(String, Vec<u8>)> = bincode::deserialize(&bytes)?;
        let steps = step_params
            .iter()
            .map(|(name, step_bytes)| PreprocessorStep::from_tagged_bytes(name, step_bytes))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }
}

impl Preprocessor for Pipeline {
    fn apply(&self, dataset: &mut DenseDesignMatrix) -> Result<(), PreprocessingError> {
        let mut working = dataset.clone();
        for step in &self.steps {
            working.apply_preprocessor(step)?;
        }
        *dataset = working;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Pipeline"
    }
}
