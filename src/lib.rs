pub mod math;
pub mod activation;
pub mod aggregation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;
pub mod error;

// Convenience re-exports
pub use math::matrix::{Matrix, Vector};
pub use activation::activation::Activation;
pub use aggregation::aggregation::Aggregation;
pub use layers::{Distribution, Layer, LayerParam, Neuron};
pub use network::{Network, NetworkParam, NetworkRecord};
pub use loss::{Loss, Metric};
pub use optim::{LrDecay, Optimizer};
pub use train::{Dataset, EpochStats};
pub use error::{NetworkError, Result};
