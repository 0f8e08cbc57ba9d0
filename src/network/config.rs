use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::Result;

/// What the label column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// Discrete class labels, encoded as a single output (≤ 2 classes) or
    /// one-hot.
    #[default]
    Classification,
    /// A single numeric target.
    Regression,
}

/// Activation choices and target mode used to shape a new network.
///
/// `seed` fixes the weight-initialization RNG; `None` seeds from entropy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub hidden_activation: Activation,
    pub output_activation: Activation,
    pub mode: TargetMode,
    pub seed: Option<u64>,
}

impl NetworkConfig {
    pub fn new(hidden_activation: Activation, output_activation: Activation, mode: TargetMode) -> Self {
        NetworkConfig { hidden_activation, output_activation, mode, seed: None }
    }

    /// Resolves activation names through the registry.
    pub fn from_names(hidden: &str, output: &str, mode: TargetMode) -> Result<Self> {
        Ok(NetworkConfig::new(Activation::resolve(hidden)?, Activation::resolve(output)?, mode))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig::new(Activation::Tanh, Activation::Sigmoid, TargetMode::Classification)
    }
}
