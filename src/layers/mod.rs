pub mod layer;

pub use layer::{Gradients, Layer};
