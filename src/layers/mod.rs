pub mod layer;
pub mod neuron;

pub use layer::{Distribution, Layer, LayerParam};
pub use neuron::Neuron;
