use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::cost::MeanSquaredError;
use crate::error::Result as CoreResult;
use crate::layers::{Activation, DenseLayer, LeakyRelu, Sigmoid, Tanh};
use crate::model::Model;
use crate::optim::{Adam, Optimiser, Sgd};
use crate::rng::RandomSource;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Optimiser selection as written in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OptimiserConfig {
    #[default]
    Sgd,
    Adam {
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
    },
}

fn default_beta1() -> f64 {
    crate::optim::adam::DEFAULT_BETA1
}

fn default_beta2() -> f64 {
    crate::optim::adam::DEFAULT_BETA2
}

impl OptimiserConfig {
    pub fn build(&self, lr: f64) -> CoreResult<Box<dyn Optimiser>> {
        Ok(match *self {
            OptimiserConfig::Sgd => Box::new(Sgd::new(lr)?),
            OptimiserConfig::Adam { beta1, beta2 } => Box::new(Adam::with_betas(lr, beta1, beta2)?),
        })
    }
}

/// Hidden-layer activation for the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenActivation {
    Sigmoid,
    Tanh,
    LeakyRelu,
}

/// Classifier training configuration loaded from a TOML or JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub optimiser: OptimiserConfig,
    pub hidden: usize,
    pub activation: HiddenActivation,
    /// Slope for [`HiddenActivation::LeakyRelu`].
    pub leaky_slope: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 1,
            batch_size: 20,
            learning_rate: 0.1,
            optimiser: OptimiserConfig::Sgd,
            hidden: 100,
            activation: HiddenActivation::Sigmoid,
            leaky_slope: 0.05,
        }
    }
}

impl TrainingConfig {
    /// Built-in classifier setups, numbered 1 to 6: sigmoid, leaky ReLU and
    /// tanh hidden layers, first with SGD and then with Adam.
    pub fn preset(n: usize) -> Option<Self> {
        let activation = match n {
            1 | 4 => HiddenActivation::Sigmoid,
            2 | 5 => HiddenActivation::LeakyRelu,
            3 | 6 => HiddenActivation::Tanh,
            _ => return None,
        };
        let (learning_rate, optimiser) = match n {
            1..=3 => (0.1, OptimiserConfig::Sgd),
            4 => (2e-2, adam_half()),
            _ => (2e-3, adam_half()),
        };
        Some(Self {
            learning_rate,
            optimiser,
            activation,
            ..Self::default()
        })
    }

    /// Input range matching the hidden activation: `[-1, 1]` for tanh,
    /// `[0, 1]` otherwise.
    pub fn input_range(&self) -> (f64, f64) {
        match self.activation {
            HiddenActivation::Tanh => (-1.0, 1.0),
            _ => (0.0, 1.0),
        }
    }

    /// Two dense layers `input_dim -> hidden -> output_dim` with a sigmoid
    /// output, trained on mean squared error.
    pub fn build_model(
        &self,
        input_dim: usize,
        output_dim: usize,
        rng: &mut dyn RandomSource,
    ) -> CoreResult<Model> {
        let hidden: Box<dyn Activation> = match self.activation {
            HiddenActivation::Sigmoid => Box::new(Sigmoid::new()),
            HiddenActivation::Tanh => Box::new(Tanh::new()),
            HiddenActivation::LeakyRelu => Box::new(LeakyRelu::new(self.leaky_slope)),
        };
        let optimiser = self.optimiser.build(self.learning_rate)?;
        let mut model = Model::new(optimiser, MeanSquaredError::new());
        model.add(DenseLayer::new(input_dim, self.hidden, Some(hidden), rng)?);
        let out: Box<dyn Activation> = Box::new(Sigmoid::new());
        model.add(DenseLayer::new(self.hidden, output_dim, Some(out), rng)?);
        Ok(model)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let cfg: Self = load(path.as_ref())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::Invalid("epochs must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be > 0".to_string()));
        }
        if self.hidden == 0 {
            return Err(ConfigError::Invalid("hidden must be > 0".to_string()));
        }
        validate_lr(self.learning_rate)
    }
}

/// Adversarial training configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GanConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub noise_dim: usize,
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    /// Digits to train on; empty means all ten.
    pub digits: Vec<usize>,
    /// Directory receiving one sample grid per epoch.
    pub image_dir: Option<String>,
}

impl Default for GanConfig {
    fn default() -> Self {
        Self {
            epochs: 500,
            batch_size: 256,
            noise_dim: 100,
            learning_rate: 2e-4,
            beta1: 0.5,
            beta2: 0.999,
            digits: Vec::new(),
            image_dir: None,
        }
    }
}

impl GanConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let cfg: Self = load(path.as_ref())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::Invalid("epochs must be > 0".to_string()));
        }
        if self.batch_size < 2 {
            return Err(ConfigError::Invalid("batch_size must be >= 2".to_string()));
        }
        if self.noise_dim == 0 {
            return Err(ConfigError::Invalid("noise_dim must be > 0".to_string()));
        }
        if let Some(d) = self.digits.iter().find(|&&d| d > 9) {
            return Err(ConfigError::Invalid(format!("digit {d} outside 0..=9")));
        }
        validate_lr(self.learning_rate)
    }
}

fn adam_half() -> OptimiserConfig {
    OptimiserConfig::Adam {
        beta1: 0.5,
        beta2: default_beta2(),
    }
}

fn validate_lr(lr: f64) -> Result<(), ConfigError> {
    if !(lr.is_finite() && lr > 0.0) {
        return Err(ConfigError::Invalid(format!(
            "learning_rate must be finite and > 0, got {lr}"
        )));
    }
    Ok(())
}

/// Parse TOML or JSON depending on the file extension.
fn load<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path)?;
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(toml::from_str(&content)?)
    }
}
