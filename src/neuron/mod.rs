pub mod neuron;

pub use neuron::{Activated, Neuron, WEIGHT_INIT_COEFFICIENT};
