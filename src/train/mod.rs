pub mod driver;
pub mod events;
pub mod learning_config;
pub mod training;

pub use driver::{build_network, train, train_loop, Split, TrainingConfig};
pub use events::{StopReason, TrainingEvent};
pub use learning_config::LearningConfig;
pub use training::Training;
