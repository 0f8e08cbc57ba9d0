pub mod activation;
pub mod data;
pub mod error;
pub mod layers;
pub mod network;
pub mod neuron;
pub mod train;

// Convenience re-exports
pub use activation::Activation;
pub use data::Dataset;
pub use error::{Error, Result};
pub use layers::Layer;
pub use network::{Network, NetworkConfig, NetworkParams, NeuronParams, StopHandle, TargetMode};
pub use neuron::Neuron;
pub use train::{train, train_loop, LearningConfig, StopReason, Training, TrainingConfig, TrainingEvent};
