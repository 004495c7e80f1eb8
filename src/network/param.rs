use serde::{Serialize, Deserialize};

use crate::error::{NetworkError, Result};
use crate::loss::loss_type::Loss;
use crate::loss::metric::Metric;
use crate::optim::decay::LrDecay;
use crate::optim::optimizer::Optimizer;

/// Hyperparameters of a `Network` and its training run.
///
/// Every field has a default, so a JSON configuration only needs the values
/// it changes:
///
/// ```json
/// { "batch_size": 10, "learning_rate": 0.01, "optimizer": "adam", "loss": "cross_entropy" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkParam {
    /// Generator seed; 0 draws a random one.
    pub seed: u64,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub l1: f64,
    pub l2: f64,
    /// Decoupled weight decay, applied after the optimizer step.
    pub weight_decay: f64,
    /// Epoch cap; epochs 1 to `epoch - 1` are trained.
    pub epoch: usize,
    /// Epochs without improvement tolerated before stopping.
    pub patience: usize,
    pub dropout: f64,
    pub dropconnect: f64,
    pub validation_ratio: f64,
    pub test_ratio: f64,
    pub loss: Loss,
    pub decay: LrDecay,
    pub lr_decay_constant: f64,
    pub lr_step_decay: usize,
    pub optimizer: Optimizer,
    pub momentum: f64,
    pub window: f64,
    pub optimizer_bias: f64,
    pub metric: Metric,
    /// Threshold above which an output counts as a predicted positive.
    pub class_validity: f64,
    /// A validation loss only counts as an improvement below `best * plateau`.
    pub plateau: f64,
    pub threads: usize,
    pub normalize_outputs: bool,
}

impl Default for NetworkParam {
    fn default() -> Self {
        NetworkParam {
            seed: 0,
            batch_size: 1,
            learning_rate: 0.001,
            l1: 0.0,
            l2: 0.0,
            weight_decay: 0.0,
            epoch: 50,
            patience: 5,
            dropout: 0.0,
            dropconnect: 0.0,
            validation_ratio: 0.2,
            test_ratio: 0.2,
            loss: Loss::L2,
            decay: LrDecay::None,
            lr_decay_constant: 0.01,
            lr_step_decay: 10,
            optimizer: Optimizer::None,
            momentum: 0.9,
            window: 0.9,
            optimizer_bias: 1e-7,
            metric: Metric::L1,
            class_validity: 0.9,
            plateau: 0.999,
            threads: 1,
            normalize_outputs: false,
        }
    }
}

impl NetworkParam {
    pub fn from_json_str(json: &str) -> Result<NetworkParam> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a parameter file written as JSON.
    pub fn load_json(path: &str) -> Result<NetworkParam> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Checks the invariants that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(NetworkError::Config(msg));
        if self.batch_size == 0 {
            return fail("batch_size must be at least 1".to_string());
        }
        if self.threads == 0 {
            return fail("threads must be at least 1".to_string());
        }
        if !(self.validation_ratio > 0.0) || self.test_ratio < 0.0 {
            return fail(format!(
                "validation_ratio must be positive and test_ratio non-negative, got {} and {}",
                self.validation_ratio, self.test_ratio
            ));
        }
        if self.validation_ratio + self.test_ratio >= 1.0 {
            return fail(format!(
                "validation_ratio + test_ratio must leave a training fraction, got {}",
                self.validation_ratio + self.test_ratio
            ));
        }
        for (name, rate) in [("dropout", self.dropout), ("dropconnect", self.dropconnect)] {
            if !(0.0..1.0).contains(&rate) {
                return fail(format!("{name} must lie in [0, 1), got {rate}"));
            }
        }
        Ok(())
    }
}
