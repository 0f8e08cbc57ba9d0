use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layers::Layer;
use crate::neuron::Neuron;

/// Weights and bias of one non-input neuron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronParams {
    pub weights: Vec<f64>,
    pub bias: f64,
}

/// Checkpoint of every trainable neuron.
///
/// Topology is implied by the nesting; activation choices are not stored and
/// must be supplied again when restoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkParams {
    pub hidden_layers: Vec<Vec<NeuronParams>>,
    pub output_layer: Vec<NeuronParams>,
}

impl From<&Neuron> for NeuronParams {
    fn from(neuron: &Neuron) -> Self {
        NeuronParams { weights: neuron.weights().to_vec(), bias: neuron.bias() }
    }
}

impl NeuronParams {
    pub(crate) fn from_layer(layer: &Layer) -> Vec<NeuronParams> {
        layer.neurons().iter().map(NeuronParams::from).collect()
    }
}

impl NetworkParams {
    /// Neuron count of each hidden layer.
    pub fn hidden_sizes(&self) -> Vec<usize> {
        self.hidden_layers.iter().map(Vec::len).collect()
    }

    /// Serializes the snapshot to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a snapshot previously written by `save_json`.
    pub fn load_json(path: &str) -> Result<NetworkParams> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
