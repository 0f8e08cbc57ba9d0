pub mod class_map;
pub mod config;
pub mod network;
pub mod params;
pub mod stop_handle;

pub use class_map::ClassMap;
pub use config::{NetworkConfig, TargetMode};
pub use network::Network;
pub use params::{NetworkParams, NeuronParams};
pub use stop_handle::StopHandle;
