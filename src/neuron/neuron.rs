use rand::Rng;

use crate::activation::Activation;
use crate::error::{Error, Result};

/// Scale of the uniform weight-initialization interval: weights and bias are
/// drawn from `[-2.4 / fan_in, 2.4 / fan_in]`.
pub const WEIGHT_INIT_COEFFICIENT: f64 = 2.4;

/// Output of a single neuron activation: `f(z)` and `f'(z)` at the same `z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Activated {
    pub value: f64,
    pub derivative: f64,
}

/// A scalar unit: weighted sum of its inputs plus a signed bias, passed
/// through an activation.
///
/// The pre-activation sum is `bias * bias_sign + Σ wᵢ·xᵢ`.
#[derive(Debug, Clone, PartialEq)]
pub struct Neuron {
    weights: Vec<f64>,
    bias: f64,
    bias_sign: f64,
    activation: Activation,
}

impl Neuron {
    /// Creates an uninitialized neuron (no weights). Call `initialize` or
    /// `identity` before activating it.
    pub fn new(activation: Activation) -> Neuron {
        Neuron {
            weights: Vec::new(),
            bias: 0.0,
            bias_sign: -1.0,
            activation,
        }
    }

    /// An input-layer passthrough unit: `weights = [1]`, `bias = 0`, linear.
    pub fn identity() -> Neuron {
        Neuron::with_params(vec![1.0], 0.0, Activation::Linear)
    }

    /// A neuron with randomly initialized parameters for `fan_in` inputs.
    pub fn random<R: Rng + ?Sized>(fan_in: usize, activation: Activation, rng: &mut R) -> Neuron {
        let mut neuron = Neuron::new(activation);
        neuron.initialize(fan_in, rng);
        neuron
    }

    /// A neuron with explicit parameters (used when restoring snapshots).
    pub fn with_params(weights: Vec<f64>, bias: f64, activation: Activation) -> Neuron {
        Neuron { weights, bias, bias_sign: -1.0, activation }
    }

    /// (Re)draws every weight and the bias uniformly from
    /// `[-2.4 / fan_in, 2.4 / fan_in]`.
    ///
    /// A `fan_in` of zero turns the neuron into an identity passthrough
    /// (`weights = [1]`, `bias = 0`) regardless of its previous state.
    pub fn initialize<R: Rng + ?Sized>(&mut self, fan_in: usize, rng: &mut R) {
        self.weights.clear();
        if fan_in == 0 {
            self.weights.push(1.0);
            self.bias = 0.0;
            return;
        }

        let range = WEIGHT_INIT_COEFFICIENT / fan_in as f64;
        self.bias = rng.gen_range(-range..=range);
        self.weights.extend((0..fan_in).map(|_| rng.gen_range(-range..=range)));
    }

    /// Computes `z = bias * bias_sign + w·x` and returns `(f(z), f'(z))`.
    pub fn activate(&self, inputs: &[f64]) -> Result<Activated> {
        if inputs.len() != self.weights.len() {
            return Err(Error::DimensionMismatch {
                expected: self.weights.len(),
                actual: inputs.len(),
            });
        }

        let sum = self.weights.iter().zip(inputs)
            .fold(self.bias * self.bias_sign, |acc, (w, x)| acc + w * x);

        Ok(Activated {
            value: self.activation.function(sum),
            derivative: self.activation.derivative(sum),
        })
    }

    pub fn fan_in(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    pub fn set_weights(&mut self, weights: Vec<f64>) {
        self.weights = weights;
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn set_bias(&mut self, bias: f64) {
        self.bias = bias;
    }

    pub fn bias_sign(&self) -> f64 {
        self.bias_sign
    }

    /// Sets the bias multiplier; any negative value maps to `-1`, anything
    /// else to `+1`.
    pub fn set_bias_sign(&mut self, sign: f64) {
        self.bias_sign = if sign < 0.0 { -1.0 } else { 1.0 };
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn set_activation(&mut self, activation: Activation) {
        self.activation = activation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn activate_rejects_wrong_input_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let neuron = Neuron::random(3, Activation::Tanh, &mut rng);
        for len in [0usize, 1, 2, 4, 10] {
            match neuron.activate(&vec![0.5; len]) {
                Err(Error::DimensionMismatch { expected, actual }) => {
                    assert_eq!(expected, 3);
                    assert_eq!(actual, len);
                }
                other => panic!("expected DimensionMismatch, got {other:?}"),
            }
        }
    }

    #[test]
    fn zero_fan_in_resets_to_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut neuron = Neuron::random(5, Activation::Sigmoid, &mut rng);
        neuron.set_bias(3.0);
        neuron.initialize(0, &mut rng);
        assert_eq!(neuron.weights(), &[1.0]);
        assert_eq!(neuron.bias(), 0.0);

        neuron.initialize(0, &mut rng);
        assert_eq!(neuron.weights(), &[1.0]);
        assert_eq!(neuron.bias(), 0.0);
    }

    #[test]
    fn initialize_stays_within_scaled_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for fan_in in [1usize, 2, 6, 24] {
            let neuron = Neuron::random(fan_in, Activation::Relu, &mut rng);
            let range = WEIGHT_INIT_COEFFICIENT / fan_in as f64;
            assert_eq!(neuron.fan_in(), fan_in);
            assert!(neuron.weights().iter().all(|w| w.abs() <= range));
            assert!(neuron.bias().abs() <= range);
        }
    }

    #[test]
    fn linear_activation_returns_raw_sum() {
        let mut neuron = Neuron::with_params(vec![0.5, -2.0], 0.25, Activation::Linear);
        let out = neuron.activate(&[4.0, 1.0]).unwrap();
        // 0.25 * -1 + 0.5 * 4 - 2 * 1
        assert_eq!(out.value, -0.25);
        assert_eq!(out.derivative, 1.0);

        neuron.set_bias_sign(1.0);
        let out = neuron.activate(&[4.0, 1.0]).unwrap();
        assert_eq!(out.value, 0.25);
    }

    #[test]
    fn identity_passes_input_through() {
        let neuron = Neuron::identity();
        let out = neuron.activate(&[-7.5]).unwrap();
        assert_eq!(out.value, -7.5);
        assert_eq!(out.derivative, 1.0);
    }
}
