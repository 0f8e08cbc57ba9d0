use serde::{Deserialize, Serialize};
use std::f64::consts::E;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A named pair of pure scalar functions: the activation and its derivative.
///
/// Both are evaluated at the pre-activation sum `z`, never at the activated
/// output, so `derivative()` recomputes whatever it needs from `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Linear,
    Sigmoid,
    Tanh,
}

impl Activation {
    pub const ALL: [Activation; 4] = [
        Activation::Relu,
        Activation::Linear,
        Activation::Sigmoid,
        Activation::Tanh,
    ];

    /// Looks an activation up by name. `"sig"` is accepted as an alias for
    /// `"sigmoid"`; anything else outside the registry is rejected.
    pub fn resolve(name: &str) -> Result<Activation> {
        match name.trim().to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "linear" => Ok(Activation::Linear),
            "sigmoid" | "sig" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            _ => Err(Error::UnknownActivation(name.to_owned())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Linear => "linear",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
        }
    }

    pub fn function(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => if x > 0.0 { x } else { 0.0 },
            Activation::Linear => x,
            Activation::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            Activation::Tanh => x.tanh(),
        }
    }

    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => if x <= 0.0 { 0.0 } else { 1.0 },
            Activation::Linear => 1.0,
            Activation::Sigmoid => {
                let s = self.function(x);
                s * (1.0 - s)
            }
            Activation::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
        }
    }

    /// Closed output range `(lower, upper)`; unbounded ends are infinite.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Activation::Relu => (0.0, f64::INFINITY),
            Activation::Linear => (f64::NEG_INFINITY, f64::INFINITY),
            Activation::Sigmoid => (0.0, 1.0),
            Activation::Tanh => (-1.0, 1.0),
        }
    }

    /// Target value used for "not this class" when encoding expected outputs.
    ///
    /// Activations bounded below use their lower bound (0 for sigmoid/relu,
    /// -1 for tanh); unbounded ones use 0.
    pub fn negative_target(&self) -> f64 {
        let (lower, _) = self.range();
        if lower.is_finite() { lower } else { 0.0 }
    }

    /// Decision threshold for a single-output binary classifier: the midpoint
    /// between the negative and positive targets.
    pub fn decision_threshold(&self) -> f64 {
        (self.negative_target() + 1.0) / 2.0
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Activation::resolve(s)
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
