use rand::Rng;

use crate::activation::Activation;
use crate::error::{Error, Result};
use crate::neuron::{Activated, Neuron};

/// An ordered set of neurons sharing the same fan-in.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    neurons: Vec<Neuron>,
}

/// Per-row update for one layer, computed before any weight is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    /// `weight_deltas[i][j]` is added to weight `j` of neuron `i`.
    pub weight_deltas: Vec<Vec<f64>>,
    /// Added to each neuron's bias.
    pub bias_deltas: Vec<f64>,
    /// Error attributed to each neuron of the previous layer, computed with
    /// the pre-update weights.
    pub previous_error: Vec<f64>,
}

impl Layer {
    /// `size` randomly initialized neurons with `fan_in` inputs each.
    pub fn new<R: Rng + ?Sized>(size: usize, fan_in: usize, activation: Activation, rng: &mut R) -> Layer {
        let neurons = (0..size)
            .map(|_| Neuron::random(fan_in, activation, rng))
            .collect();
        Layer { neurons }
    }

    /// `width` identity passthrough neurons.
    pub fn input(width: usize) -> Layer {
        Layer { neurons: (0..width).map(|_| Neuron::identity()).collect() }
    }

    pub fn from_neurons(neurons: Vec<Neuron>) -> Layer {
        Layer { neurons }
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    /// Fan-in shared by the layer's neurons (0 for an empty layer).
    pub fn fan_in(&self) -> usize {
        self.neurons.first().map(Neuron::fan_in).unwrap_or(0)
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neurons_mut(&mut self) -> &mut [Neuron] {
        &mut self.neurons
    }

    pub fn push(&mut self, neuron: Neuron) {
        self.neurons.push(neuron);
    }

    pub fn pop(&mut self) -> Option<Neuron> {
        self.neurons.pop()
    }

    /// Re-draws every neuron's parameters for the given fan-in.
    pub fn reinitialize<R: Rng + ?Sized>(&mut self, fan_in: usize, rng: &mut R) {
        for neuron in &mut self.neurons {
            neuron.initialize(fan_in, rng);
        }
    }

    pub fn set_activation(&mut self, activation: Activation) {
        for neuron in &mut self.neurons {
            neuron.set_activation(activation);
        }
    }

    /// Activates every neuron on the same input vector.
    pub fn feed_from(&self, inputs: &[f64]) -> Result<Vec<Activated>> {
        self.neurons.iter().map(|n| n.activate(inputs)).collect()
    }

    /// Input-layer pass: neuron `i` receives only feature `i`.
    pub fn feed_passthrough(&self, features: &[f64]) -> Result<Vec<Activated>> {
        if features.len() != self.neurons.len() {
            return Err(Error::DimensionMismatch {
                expected: self.neurons.len(),
                actual: features.len(),
            });
        }
        self.neurons.iter().zip(features)
            .map(|(n, x)| n.activate(std::slice::from_ref(x)))
            .collect()
    }

    /// Computes the online gradient-descent step for this layer.
    ///
    /// - `error`  : `expected - actual` per neuron (or the error propagated
    ///               from the next layer)
    /// - `outputs`: this layer's cached `(value, derivative)` pairs
    /// - `inputs` : values that fed this layer on the forward pass
    pub fn compute_gradients(
        &self,
        error: &[f64],
        outputs: &[Activated],
        inputs: &[f64],
        learning_rate: f64,
    ) -> Result<Gradients> {
        if error.len() != self.neurons.len() || outputs.len() != self.neurons.len() {
            return Err(Error::DimensionMismatch {
                expected: self.neurons.len(),
                actual: error.len().min(outputs.len()),
            });
        }
        if inputs.len() != self.fan_in() {
            return Err(Error::DimensionMismatch { expected: self.fan_in(), actual: inputs.len() });
        }

        let mut weight_deltas = Vec::with_capacity(self.neurons.len());
        let mut bias_deltas = Vec::with_capacity(self.neurons.len());
        let mut previous_error = vec![0.0; inputs.len()];

        for ((neuron, err), out) in self.neurons.iter().zip(error).zip(outputs) {
            let sigma = err * out.derivative;
            weight_deltas.push(inputs.iter().map(|x| learning_rate * sigma * x).collect());
            bias_deltas.push(neuron.bias_sign() * sigma * learning_rate);
            for (prev, w) in previous_error.iter_mut().zip(neuron.weights()) {
                *prev += w * sigma;
            }
        }

        Ok(Gradients { weight_deltas, bias_deltas, previous_error })
    }

    /// Adds pre-computed deltas to weights and biases.
    pub fn apply_gradients(&mut self, gradients: &Gradients) {
        let updates = gradients.weight_deltas.iter().zip(&gradients.bias_deltas);
        for (neuron, (deltas, bias_delta)) in self.neurons.iter_mut().zip(updates) {
            for (w, d) in neuron.weights_mut().iter_mut().zip(deltas) {
                *w += d;
            }
            let bias = neuron.bias() + bias_delta;
            neuron.set_bias(bias);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn act(value: f64, derivative: f64) -> Activated {
        Activated { value, derivative }
    }

    #[test]
    fn passthrough_forwards_each_feature() {
        let layer = Layer::input(3);
        let out = layer.feed_passthrough(&[1.5, -2.0, 0.0]).unwrap();
        let values: Vec<f64> = out.iter().map(|a| a.value).collect();
        assert_eq!(values, vec![1.5, -2.0, 0.0]);
        assert!(layer.feed_passthrough(&[1.0]).is_err());
    }

    #[test]
    fn gradients_use_pre_update_weights() {
        let mut layer = Layer::from_neurons(vec![
            Neuron::with_params(vec![1.0, 2.0], 0.5, Activation::Linear),
            Neuron::with_params(vec![-1.0, 0.5], 0.0, Activation::Linear),
        ]);
        let inputs = [2.0, 4.0];
        let outputs = [act(0.0, 1.0), act(0.0, 0.5)];
        let error = [1.0, 2.0];

        let g = layer.compute_gradients(&error, &outputs, &inputs, 0.1).unwrap();
        // sigma = [1.0, 1.0]
        assert_eq!(g.previous_error, vec![1.0 * 1.0 + -1.0 * 1.0, 2.0 * 1.0 + 0.5 * 1.0]);
        assert!((g.weight_deltas[0][0] - 0.2).abs() < 1e-12);
        assert!((g.weight_deltas[1][1] - 0.4).abs() < 1e-12);
        assert!((g.bias_deltas[0] + 0.1).abs() < 1e-12);

        layer.apply_gradients(&g);
        let first = &layer.neurons()[0];
        assert!((first.weights()[0] - 1.2).abs() < 1e-12);
        assert!((first.weights()[1] - 2.4).abs() < 1e-12);
        assert!((first.bias() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn gradients_reject_mismatched_inputs() {
        let layer = Layer::from_neurons(vec![Neuron::with_params(vec![1.0], 0.0, Activation::Tanh)]);
        let res = layer.compute_gradients(&[1.0], &[act(0.0, 1.0)], &[1.0, 2.0], 0.1);
        assert!(matches!(res, Err(Error::DimensionMismatch { expected: 1, actual: 2 })));
    }
}
