use serde::{Deserialize, Serialize};

use std::fs;
use std::path::{Path, PathBuf};

use crate::nn::Activation;
use crate::{Error, Result};

/// Knobs for [`crate::driver::train`] and the demo binary. Missing JSON fields take their
/// default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Width of the hidden layer; 0 trains a linear model instead of an mlp.
    pub hidden_units: usize,
    pub activation: Activation,
    pub seed: u64,
    /// Log the loss of every n-th batch at debug level; 0 disables it.
    pub log_every: usize,
    pub model_input_path: Option<PathBuf>,
    pub model_output_path: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 20,
            batch_size: 32,
            learning_rate: 0.05,
            hidden_units: 0,
            activation: Activation::Tanh,
            seed: 42,
            log_every: 0,
            model_input_path: None,
            model_output_path: None,
        }
    }
}

impl TrainConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<TrainConfig> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: TrainConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::Config("epochs must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".into()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::Config(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrainConfig =
            serde_json::from_str(r#"{"epochs": 3, "activation": "relu"}"#).unwrap();
        assert_eq!(config.epochs, 3);
        assert_eq!(config.activation, Activation::Relu);
        assert_eq!(config.batch_size, TrainConfig::default().batch_size);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let config = TrainConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = TrainConfig {
            learning_rate: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<TrainConfig>(r#"{"epoch": 3}"#).is_err());
    }
}
