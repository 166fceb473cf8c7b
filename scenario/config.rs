use super::hypothesis::{Hypothesis, ScenarioSet};
use crate::grid::{DEFAULT_TIME_POINTS, GridEvaluator, GridValue, TimeIndexing};
use crate::survival::{DEFAULT_TRUNCATION, SurvivalError, SurvivalModel};
use crate::types::{CategoryParameters, MixtureError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid survival model settings: {0}")]
    Survival(#[from] SurvivalError),
    #[error("Invalid scenario mixture: {0}")]
    Mixture(#[from] MixtureError),
    #[error("time_points must be at least 1.")]
    EmptyAxis,
}

/// Where and how scenario results are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
    /// Also write the headerless t1 × t2 pratio matrix next to the row table.
    pub matrix: bool,
    /// Write the category survival curves once per run.
    pub curves: bool,
    pub plots: bool,
    pub plot_value: GridValue,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_prefix: String::new(),
            matrix: false,
            curves: true,
            plots: true,
            plot_value: GridValue::Pratio,
        }
    }
}

/// `(Alt_func, Dos, Non)` fractions of one configured scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub alt_func: f64,
    pub dos: f64,
    pub non: f64,
}

/// Everything one batch run needs, loadable from TOML.
///
/// Missing keys fall back to the published defaults, so an empty file is a
/// valid Duplicability run over the fifteen published compositions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub time_points: usize,
    pub truncation: usize,
    pub indexing: TimeIndexing,
    /// Reject parameters outside their documented regimes instead of warning.
    pub strict_regimes: bool,
    pub hypothesis: Hypothesis,
    /// Explicit compositions; the hypothesis' published set is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compositions: Option<Vec<Composition>>,
    pub parameters: CategoryParameters,
    pub output: OutputConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_points: DEFAULT_TIME_POINTS,
            truncation: DEFAULT_TRUNCATION,
            indexing: TimeIndexing::default(),
            strict_regimes: false,
            hypothesis: Hypothesis::default(),
            compositions: None,
            parameters: CategoryParameters::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = self.to_toml()?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(text.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn evaluator(&self) -> Result<GridEvaluator, ConfigError> {
        if self.time_points == 0 {
            return Err(ConfigError::EmptyAxis);
        }
        let model = SurvivalModel::new(self.truncation)?;
        Ok(GridEvaluator::new(model, self.parameters)
            .with_time_points(self.time_points)
            .with_indexing(self.indexing))
    }

    pub fn scenarios(&self) -> Result<ScenarioSet, ConfigError> {
        let set = match &self.compositions {
            Some(list) => {
                let compositions: Vec<_> =
                    list.iter().map(|c| (c.alt_func, c.dos, c.non)).collect();
                ScenarioSet::from_compositions(self.hypothesis, &compositions)?
            }
            None => ScenarioSet::published(self.hypothesis)?,
        };
        Ok(set)
    }
}
