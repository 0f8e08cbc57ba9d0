use std::iter;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::activation::Activation;
use crate::data::dataset::{parse_numbers, Dataset};
use crate::error::{Error, Result};
use crate::layers::Layer;
use crate::network::class_map::ClassMap;
use crate::network::config::{NetworkConfig, TargetMode};
use crate::network::params::{NetworkParams, NeuronParams};
use crate::network::stop_handle::StopHandle;
use crate::neuron::{Activated, Neuron};
use crate::train::{LearningConfig, Training};

/// Width of every hidden layer the network creates on its own.
pub const DEFAULT_HIDDEN_WIDTH: usize = 2;

/// A feed-forward network of scalar neurons.
///
/// Layout: an identity input layer (one neuron per feature column), at least
/// one hidden layer, and an output layer sized by the target mode. The
/// network owns every layer exclusively.
///
/// Topology, activation and reset operations are rejected with
/// `Error::InvalidState` while a training run is active.
#[derive(Debug)]
pub struct Network {
    input_layer: Layer,
    hidden_layers: Vec<Layer>,
    output_layer: Layer,
    hidden_activation: Activation,
    output_activation: Activation,
    mode: TargetMode,
    class_map: Option<ClassMap>,
    learning: StopHandle,
    rng: StdRng,
}

impl Network {
    /// Builds the default topology for `dataset`: one hidden layer of two
    /// neurons and an output layer sized by the target mode.
    pub fn new(dataset: &Dataset, config: &NetworkConfig) -> Result<Network> {
        let mut rng = seeded_rng(config.seed);
        let (class_map, output_width) = discover_targets(dataset, config.mode);
        let input_width = dataset.feature_count();

        let hidden = Layer::new(DEFAULT_HIDDEN_WIDTH, input_width, config.hidden_activation, &mut rng);
        let output_layer = Layer::new(output_width, hidden.len(), config.output_activation, &mut rng);

        info!(
            inputs = input_width,
            outputs = output_width,
            hidden = %config.hidden_activation,
            output = %config.output_activation,
            "network created"
        );

        Ok(Network {
            input_layer: Layer::input(input_width),
            hidden_layers: vec![hidden],
            output_layer,
            hidden_activation: config.hidden_activation,
            output_activation: config.output_activation,
            mode: config.mode,
            class_map,
            learning: StopHandle::new(),
            rng,
        })
    }

    /// Rebuilds a network from a checkpoint, copying weights and biases
    /// verbatim. The input layer and class map still come from `dataset`.
    pub fn from_params(dataset: &Dataset, config: &NetworkConfig, params: &NetworkParams) -> Result<Network> {
        let (class_map, output_width) = discover_targets(dataset, config.mode);
        let input_width = dataset.feature_count();

        if params.hidden_layers.is_empty() {
            return Err(Error::InvalidSnapshot("snapshot has no hidden layers".into()));
        }

        let mut hidden_layers = Vec::with_capacity(params.hidden_layers.len());
        let mut fan_in = input_width;
        for (level, layer) in params.hidden_layers.iter().enumerate() {
            let layer = restore_layer(layer, fan_in, config.hidden_activation)
                .map_err(|msg| Error::InvalidSnapshot(format!("hidden layer {level}: {msg}")))?;
            fan_in = layer.len();
            hidden_layers.push(layer);
        }

        if params.output_layer.len() != output_width {
            return Err(Error::InvalidSnapshot(format!(
                "output layer has {} neurons, dataset needs {}",
                params.output_layer.len(),
                output_width
            )));
        }
        let output_layer = restore_layer(&params.output_layer, fan_in, config.output_activation)
            .map_err(|msg| Error::InvalidSnapshot(format!("output layer: {msg}")))?;

        debug!(hidden = ?params.hidden_sizes(), "network restored from snapshot");

        Ok(Network {
            input_layer: Layer::input(input_width),
            hidden_layers,
            output_layer,
            hidden_activation: config.hidden_activation,
            output_activation: config.output_activation,
            mode: config.mode,
            class_map,
            learning: StopHandle::new(),
            rng: seeded_rng(config.seed),
        })
    }

    // ── Inference ───────────────────────────────────────────────────────────

    /// Forward pass on one row of raw feature cells.
    pub fn predict<S: AsRef<str>>(&self, row: &[S]) -> Result<Vec<f64>> {
        let features = parse_numbers(row, 0)?;
        self.predict_values(&features)
    }

    /// Forward pass on already-parsed features; returns the output values.
    pub fn predict_values(&self, features: &[f64]) -> Result<Vec<f64>> {
        let mut current = values(&self.input_layer.feed_passthrough(features)?);
        for layer in self.trainable_layers() {
            current = values(&layer.feed_from(&current)?);
        }
        Ok(current)
    }

    /// Predicted class label for one row of raw feature cells. `None` in
    /// regression mode.
    pub fn classify<S: AsRef<str>>(&self, row: &[S]) -> Result<Option<String>> {
        let output = self.predict(row)?;
        Ok(self.class_map.as_ref().and_then(|map| {
            map.decode(&output, self.output_activation.decision_threshold())
                .map(str::to_owned)
        }))
    }

    /// Forward pass keeping every layer's `(value, derivative)` pairs,
    /// input layer first.
    pub(crate) fn forward(&self, features: &[f64]) -> Result<Vec<Vec<Activated>>> {
        let mut outputs = Vec::with_capacity(self.hidden_layers.len() + 2);
        outputs.push(self.input_layer.feed_passthrough(features)?);
        for layer in self.trainable_layers() {
            let inputs = values(&outputs[outputs.len() - 1]);
            outputs.push(layer.feed_from(&inputs)?);
        }
        Ok(outputs)
    }

    // ── Training ────────────────────────────────────────────────────────────

    /// Starts an online-backpropagation run over `dataset`.
    ///
    /// The returned sequence borrows the network; events are produced as it
    /// is iterated. Fails with `InvalidState` if a run is already active.
    pub fn start_learning(&mut self, dataset: &Dataset, config: &LearningConfig) -> Result<Training<&mut Network>> {
        Training::new(self, dataset, config)
    }

    /// Clears the learning flag. The active run notices at its next row.
    pub fn stop_learning(&self) {
        self.learning.stop();
    }

    pub fn is_learning(&self) -> bool {
        self.learning.is_learning()
    }

    /// Handle that can stop the active run from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.learning.clone()
    }

    /// Expected output vector for a raw label cell.
    ///
    /// In classification mode the negative class is encoded with the output
    /// activation's lower bound (0 for sigmoid, -1 for tanh).
    pub fn expected_output(&self, label: &str) -> Result<Vec<f64>> {
        match &self.class_map {
            Some(map) => map
                .encode(label, self.output_activation.negative_target())
                .ok_or_else(|| Error::InvalidData(format!("unknown class label '{}'", label.trim()))),
            None => parse_numbers(&[label], 0),
        }
    }

    /// One online step: forward pass, output error, backpropagation and
    /// weight update. Returns the row's sum of squared errors.
    pub(crate) fn train_row(&mut self, features: &[f64], expected: &[f64], learning_rate: f64) -> Result<f64> {
        let outputs = self.forward(features)?;
        let actual = &outputs[outputs.len() - 1];
        if actual.len() != expected.len() {
            return Err(Error::DimensionMismatch { expected: actual.len(), actual: expected.len() });
        }

        let mut error: Vec<f64> = expected.iter().zip(actual).map(|(e, a)| e - a.value).collect();
        let sse = error.iter().map(|e| e * e).sum();

        for level in (0..=self.hidden_layers.len()).rev() {
            let inputs = values(&outputs[level]);
            let layer = self.trainable_layer_mut(level);
            let gradients = layer.compute_gradients(&error, &outputs[level + 1], &inputs, learning_rate)?;
            layer.apply_gradients(&gradients);
            error = gradients.previous_error;
        }

        Ok(sse)
    }

    // ── Topology ────────────────────────────────────────────────────────────

    /// Appends a two-neuron hidden layer and re-initializes the output layer.
    pub fn increase_hidden_layers(&mut self) -> Result<()> {
        self.ensure_idle()?;
        let fan_in = self.last_hidden_width();
        let layer = Layer::new(DEFAULT_HIDDEN_WIDTH, fan_in, self.hidden_activation, &mut self.rng);
        self.hidden_layers.push(layer);
        self.reinitialize_output();
        debug!(hidden = ?self.layer_sizes(), "hidden layer added");
        Ok(())
    }

    /// Removes the deepest hidden layer unless it is the only one.
    pub fn decrease_hidden_layers(&mut self) -> Result<()> {
        self.ensure_idle()?;
        if self.hidden_layers.len() == 1 {
            return Ok(());
        }
        self.hidden_layers.pop();
        self.reinitialize_output();
        debug!(hidden = ?self.layer_sizes(), "hidden layer removed");
        Ok(())
    }

    /// Adds one neuron to hidden layer `level`; the following layer is
    /// re-initialized for the new width.
    pub fn add_neuron_to_hidden_layer(&mut self, level: usize, activation: Activation) -> Result<()> {
        self.ensure_idle()?;
        self.check_level(level)?;
        let fan_in = self.hidden_fan_in(level);
        let neuron = Neuron::random(fan_in, activation, &mut self.rng);
        self.hidden_layers[level].push(neuron);
        self.reinitialize_after(level);
        debug!(level, hidden = ?self.layer_sizes(), "neuron added");
        Ok(())
    }

    /// Removes one neuron from hidden layer `level`; the following layer is
    /// re-initialized for the new width. A layer is never emptied.
    pub fn remove_neuron_from_hidden_layer(&mut self, level: usize) -> Result<()> {
        self.ensure_idle()?;
        self.check_level(level)?;
        if self.hidden_layers[level].len() <= 1 {
            return Ok(());
        }
        self.hidden_layers[level].pop();
        self.reinitialize_after(level);
        debug!(level, hidden = ?self.layer_sizes(), "neuron removed");
        Ok(())
    }

    /// Re-draws every weight and bias, keeping topology and activations.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_idle()?;
        let mut fan_in = self.input_layer.len();
        for layer in &mut self.hidden_layers {
            layer.reinitialize(fan_in, &mut self.rng);
            fan_in = layer.len();
        }
        self.output_layer.reinitialize(fan_in, &mut self.rng);
        Ok(())
    }

    /// Swaps the activation of every hidden neuron (and of hidden neurons
    /// created later). Weights are untouched.
    pub fn update_hidden_layers_activation_function(&mut self, name: &str) -> Result<()> {
        self.ensure_idle()?;
        let activation = Activation::resolve(name)?;
        for layer in &mut self.hidden_layers {
            layer.set_activation(activation);
        }
        self.hidden_activation = activation;
        Ok(())
    }

    /// Swaps the activation of every neuron in hidden layer `level` only.
    /// Layers created later still use the group activation.
    pub fn update_layer_activation_function(&mut self, level: usize, name: &str) -> Result<()> {
        self.ensure_idle()?;
        self.check_level(level)?;
        let activation = Activation::resolve(name)?;
        self.hidden_layers[level].set_activation(activation);
        debug!(level, activation = activation.name(), "layer activation updated");
        Ok(())
    }

    /// Swaps the output layer's activation. Weights are untouched.
    pub fn update_output_layer_activation_function(&mut self, name: &str) -> Result<()> {
        self.ensure_idle()?;
        let activation = Activation::resolve(name)?;
        self.output_layer.set_activation(activation);
        self.output_activation = activation;
        Ok(())
    }

    // ── Snapshot ────────────────────────────────────────────────────────────

    pub fn extract_network_params(&self) -> NetworkParams {
        NetworkParams {
            hidden_layers: self.hidden_layers.iter().map(NeuronParams::from_layer).collect(),
            output_layer: NeuronParams::from_layer(&self.output_layer),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn input_layer(&self) -> &Layer {
        &self.input_layer
    }

    pub fn hidden_layers(&self) -> &[Layer] {
        &self.hidden_layers
    }

    pub fn output_layer(&self) -> &Layer {
        &self.output_layer
    }

    pub fn input_width(&self) -> usize {
        self.input_layer.len()
    }

    pub fn output_width(&self) -> usize {
        self.output_layer.len()
    }

    /// Neuron count of each hidden layer.
    pub fn layer_sizes(&self) -> Vec<usize> {
        self.hidden_layers.iter().map(Layer::len).collect()
    }

    pub fn hidden_activation(&self) -> Activation {
        self.hidden_activation
    }

    pub fn output_activation(&self) -> Activation {
        self.output_activation
    }

    pub fn mode(&self) -> TargetMode {
        self.mode
    }

    pub fn class_map(&self) -> Option<&ClassMap> {
        self.class_map.as_ref()
    }

    pub fn class_labels(&self) -> &[String] {
        self.class_map.as_ref().map(ClassMap::labels).unwrap_or(&[])
    }

    // ── Private helpers ─────────────────────────────────────────────────────

    fn ensure_idle(&self) -> Result<()> {
        if self.is_learning() {
            return Err(Error::InvalidState("can't update network while learning".into()));
        }
        Ok(())
    }

    fn check_level(&self, level: usize) -> Result<()> {
        if level >= self.hidden_layers.len() {
            return Err(Error::LayerOutOfRange { level, count: self.hidden_layers.len() });
        }
        Ok(())
    }

    /// Hidden layers followed by the output layer.
    fn trainable_layers(&self) -> impl Iterator<Item = &Layer> {
        self.hidden_layers.iter().chain(iter::once(&self.output_layer))
    }

    fn trainable_layer_mut(&mut self, level: usize) -> &mut Layer {
        if level < self.hidden_layers.len() {
            &mut self.hidden_layers[level]
        } else {
            &mut self.output_layer
        }
    }

    fn hidden_fan_in(&self, level: usize) -> usize {
        if level == 0 {
            self.input_layer.len()
        } else {
            self.hidden_layers[level - 1].len()
        }
    }

    fn last_hidden_width(&self) -> usize {
        self.hidden_layers.last().map(Layer::len).unwrap_or(self.input_layer.len())
    }

    fn reinitialize_output(&mut self) {
        let fan_in = self.last_hidden_width();
        self.output_layer.reinitialize(fan_in, &mut self.rng);
    }

    /// Re-initializes the layer after hidden layer `level` for its new width.
    fn reinitialize_after(&mut self, level: usize) {
        let fan_in = self.hidden_layers[level].len();
        let next = if level + 1 < self.hidden_layers.len() {
            &mut self.hidden_layers[level + 1]
        } else {
            &mut self.output_layer
        };
        next.reinitialize(fan_in, &mut self.rng);
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn values(activated: &[Activated]) -> Vec<f64> {
    activated.iter().map(|a| a.value).collect()
}

/// Class map (classification only) and output width for `dataset`.
fn discover_targets(dataset: &Dataset, mode: TargetMode) -> (Option<ClassMap>, usize) {
    match mode {
        TargetMode::Classification => {
            let map = ClassMap::from_labels(dataset.label_column().iter().map(String::as_str));
            let width = map.output_width();
            (Some(map), width)
        }
        TargetMode::Regression => (None, 1),
    }
}

fn restore_layer(params: &[NeuronParams], fan_in: usize, activation: Activation) -> std::result::Result<Layer, String> {
    if params.is_empty() {
        return Err("layer has no neurons".into());
    }
    let mut neurons = Vec::with_capacity(params.len());
    for (index, p) in params.iter().enumerate() {
        if p.weights.len() != fan_in {
            return Err(format!("neuron {index} has {} weights, expected {fan_in}", p.weights.len()));
        }
        neurons.push(Neuron::with_params(p.weights.clone(), p.bias, activation));
    }
    Ok(Layer::from_neurons(neurons))
}
