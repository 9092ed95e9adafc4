//! Configuration file support for growthcalc.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/growthcalc/config.toml`.

use crate::reference::Dataset;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub reference: ReferenceConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Location of the WHO reference tables
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ReferenceConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub files: ReferenceFiles,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            files: ReferenceFiles::default(),
        }
    }
}

impl ReferenceConfig {
    /// Default WHO file names inside `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            files: ReferenceFiles::default(),
        }
    }

    /// Full path of the file holding `dataset`
    pub fn path_for(&self, dataset: Dataset) -> PathBuf {
        self.data_dir.join(self.files.file_name(dataset))
    }
}

/// File name of each reference table, relative to the data directory
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct ReferenceFiles {
    pub weight_for_age: String,
    pub length_or_height_for_age: String,
    pub weight_for_length: String,
    pub weight_for_height: String,
    pub body_mass_index_for_age: String,
    pub head_circumference_for_age: String,
}

impl Default for ReferenceFiles {
    fn default() -> Self {
        Self {
            weight_for_age: Dataset::WeightForAge.default_file_name().into(),
            length_or_height_for_age: Dataset::LengthOrHeightForAge.default_file_name().into(),
            weight_for_length: Dataset::WeightForLength.default_file_name().into(),
            weight_for_height: Dataset::WeightForHeight.default_file_name().into(),
            body_mass_index_for_age: Dataset::BodyMassIndexForAge.default_file_name().into(),
            head_circumference_for_age: Dataset::HeadCircumferenceForAge
                .default_file_name()
                .into(),
        }
    }
}

impl ReferenceFiles {
    pub fn file_name(&self, dataset: Dataset) -> &str {
        match dataset {
            Dataset::WeightForAge => &self.weight_for_age,
            Dataset::LengthOrHeightForAge => &self.length_or_height_for_age,
            Dataset::WeightForLength => &self.weight_for_length,
            Dataset::WeightForHeight => &self.weight_for_height,
            Dataset::BodyMassIndexForAge => &self.body_mass_index_for_age,
            Dataset::HeadCircumferenceForAge => &self.head_circumference_for_age,
        }
    }
}

/// How computed statistics are printed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(Error::Config(format!("unknown output format: {}", other))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// Output configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("growthcalc")
        .join("who")
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("growthcalc")
            .join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
