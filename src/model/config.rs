//! Experiment Configuration Module
//!
//! Hyperparameters and paths for one EEG classifier comparison run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::error::{LabError, Result};

/// Configuration for an EEG comparison run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Number of passes over the training set
    pub epochs: usize,

    /// Training batch size (the test set is always one batch)
    pub batch_size: usize,

    /// Learning rate shared by every optimizer
    pub learning_rate: f64,

    /// Directory holding the BCI CSV files
    pub data_dir: PathBuf,

    /// Directory for charts and JSON dumps
    pub output_dir: PathBuf,

    /// Dropout used by EEGNet
    pub eegnet_dropout: f64,

    /// Dropout used by DeepConvNet
    pub deep_conv_dropout: f64,

    /// Show an indicatif progress bar during training
    pub show_progress: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            epochs: 300,
            batch_size: 64,
            learning_rate: 1e-2,
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            eegnet_dropout: 0.25,
            deep_conv_dropout: 0.5,
            show_progress: true,
        }
    }
}

impl ExperimentConfig {
    /// Parameters shown in the result table header and chart file names
    pub fn display_params(&self) -> Vec<(String, String)> {
        vec![
            ("epoch_size".to_string(), self.epochs.to_string()),
            ("batch_size".to_string(), self.batch_size.to_string()),
            ("learning_rate".to_string(), self.learning_rate.to_string()),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(LabError::Config("epochs must be greater than 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(LabError::Config("batch_size must be greater than 0".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(LabError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, p) in [
            ("eegnet_dropout", self.eegnet_dropout),
            ("deep_conv_dropout", self.deep_conv_dropout),
        ] {
            if !(0.0..1.0).contains(&p) {
                return Err(LabError::Config(format!("{} must be in [0, 1), got {}", name, p)));
            }
        }
        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.epochs, 300);
        assert_eq!(config.batch_size, 64);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ExperimentConfig::default();
        config.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::default();
        config.learning_rate = -1.0;
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::default();
        config.eegnet_dropout = 1.0;
        assert!(matches!(config.validate(), Err(LabError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.json");

        let mut config = ExperimentConfig::default();
        config.epochs = 12;
        config.save(&path).unwrap();

        assert_eq!(ExperimentConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "epochs": 5 }"#).unwrap();

        let config = ExperimentConfig::load(&path).unwrap();
        assert_eq!(config.epochs, 5);
        assert_eq!(config.batch_size, 64);
    }

    #[test]
    fn test_display_params() {
        let params = ExperimentConfig::default().display_params();
        assert_eq!(params[0], ("epoch_size".to_string(), "300".to_string()));
        assert_eq!(params[2].1, "0.01");
    }
}
