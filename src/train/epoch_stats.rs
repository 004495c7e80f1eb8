use serde::{Serialize, Deserialize};

/// Statistics recorded after every epoch; epoch 0 is the untrained baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    /// Learning rate used during this epoch (the base rate for epoch 0).
    pub learning_rate: f64,
    /// Loss over the whole training set, L1/L2 penalties included.
    pub train_loss: f64,
    /// Loss over the whole validation set, L1/L2 penalties included.
    pub validation_loss: f64,
    /// First test metric (see `Metric`).
    pub first_metric: f64,
    /// Second test metric (see `Metric`).
    pub second_metric: f64,
}
