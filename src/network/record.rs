use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::layers::layer::Layer;
use crate::loss::loss_type::Loss;
use crate::math::preprocess::Scaling;
use crate::network::network::Network;
use crate::network::param::NetworkParam;

/// Everything needed to run a trained network again: layers with their
/// weights and optimizer state, loss (for the softmax at inference) and the
/// scaling fitted on the training data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub labels: Vec<String>,
    pub loss: Loss,
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub input_scaling: Scaling,
    #[serde(default)]
    pub output_scaling: Option<Scaling>,
}

impl NetworkRecord {
    /// Serializes the record to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json(path: &str) -> Result<NetworkRecord> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Network {
    pub fn to_record(&self) -> NetworkRecord {
        NetworkRecord {
            labels: self.labels.clone(),
            loss: self.param.loss,
            layers: self.layers.clone(),
            input_scaling: self.input_scaling.clone(),
            output_scaling: self.output_scaling.clone(),
        }
    }

    /// Rebuilds a network from a record. The record's loss overrides the one
    /// in `param`; the other hyperparameters drive any further training.
    pub fn from_record(record: NetworkRecord, mut param: NetworkParam) -> Result<Network> {
        param.loss = record.loss;
        let mut network = Network::new(record.labels, param)?;
        network.layers = record.layers;
        network.input_scaling = record.input_scaling;
        network.output_scaling = record.output_scaling;
        Ok(network)
    }

    /// Saves the trained network as JSON.
    pub fn save_json(&self, path: &str) -> Result<()> {
        self.to_record().save_json(path)
    }

    /// Loads a network written by `save_json`.
    pub fn load_json(path: &str, param: NetworkParam) -> Result<Network> {
        Network::from_record(NetworkRecord::load_json(path)?, param)
    }
}
