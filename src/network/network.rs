use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{NetworkError, Result};
use crate::layers::layer::{Layer, LayerParam};
use crate::loss::loss_type::{average_loss, Loss};
use crate::math::matrix::Matrix;
use crate::math::preprocess::{self, Scaling};
use crate::network::param::NetworkParam;
use crate::optim::optimizer::UpdateParams;
use crate::train::early_stopping::{EarlyStopping, Verdict};
use crate::train::epoch_stats::EpochStats;
use crate::train::partition::{self, check_dataset, Dataset, Partition};

/// A feed-forward network together with everything needed to train it:
/// hyperparameters, seeded generator, worker pool, data partitions and
/// per-epoch history.
pub struct Network {
    pub(crate) param: NetworkParam,
    pub(crate) labels: Vec<String>,
    seed: u64,
    rng: StdRng,
    pool: ThreadPool,
    pub(crate) layers: Vec<Layer>,
    raw_data: Dataset,
    data: Partition,
    pub(crate) input_scaling: Scaling,
    pub(crate) output_scaling: Option<Scaling>,
    history: Vec<EpochStats>,
    optimal_epoch: usize,
}

impl Network {
    /// Creates an empty network. `labels` name the outputs in reports.
    pub fn new(labels: Vec<String>, param: NetworkParam) -> Result<Network> {
        param.validate()?;
        let seed = if param.seed == 0 { rand::random::<u64>() } else { param.seed };
        tracing::debug!(seed, threads = param.threads, "network created");

        let pool = ThreadPoolBuilder::new().num_threads(param.threads).build()?;
        Ok(Network {
            param,
            labels,
            seed,
            rng: StdRng::seed_from_u64(seed),
            pool,
            layers: Vec::new(),
            raw_data: Vec::new(),
            data: Partition::default(),
            input_scaling: Vec::new(),
            output_scaling: None,
            history: Vec::new(),
            optimal_epoch: 0,
        })
    }

    /// Appends a layer. A last layer of size 0 takes the data's output count.
    pub fn add_layer(&mut self, param: LayerParam) {
        self.layers.push(Layer::new(param));
    }

    /// Replaces the labeled examples used by the next `learn`.
    pub fn set_data(&mut self, data: Dataset) {
        self.raw_data = data;
    }

    /// Sizes and initializes the layers for the current data.
    ///
    /// Layers already initialized for the right input size are left untouched,
    /// so a trained or loaded network keeps its weights.
    pub fn init_layers(&mut self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(NetworkError::Config("the network has no layer".to_string()));
        }
        let (nb_inputs, nb_outputs) = check_dataset(&self.raw_data)?;

        let last = self.layers.len() - 1;
        if self.layers[last].size() == 0 {
            self.layers[last].resize(nb_outputs);
        }
        if let Some(pos) = self.layers.iter().position(|l| l.size() == 0) {
            return Err(NetworkError::Config(format!("layer {pos} has no neuron")));
        }

        let sizes: Vec<usize> = self.layers.iter().map(Layer::size).collect();
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let layer_inputs = if i == 0 { nb_inputs } else { sizes[i - 1] };
            let layer_outputs = sizes.get(i + 1).copied().unwrap_or(nb_outputs);
            if !layer.is_initialized_for(layer_inputs) {
                layer.init(layer_inputs, layer_outputs, &mut self.rng)?;
            }
        }
        Ok(())
    }

    /// Trains the network on the data given to `set_data`.
    ///
    /// Returns `Ok(false)` when a loss becomes NaN, `Ok(true)` once training
    /// stops early or reaches the epoch cap. In the latter case the weights of
    /// the best validation epoch are restored.
    pub fn learn(&mut self) -> Result<bool> {
        self.param.validate()?;
        self.init_layers()?;
        self.data = partition::partition(
            self.raw_data.clone(),
            self.param.batch_size,
            self.param.validation_ratio,
            self.param.test_ratio,
            &mut self.rng,
        )?;
        self.fit_scaling();

        let layer = self.layers.last().map_or(0, Layer::size);
        let outputs = self.data.train_outputs.cols;
        if layer != outputs {
            return Err(NetworkError::OutputMismatch { layer, outputs });
        }

        self.history.clear();
        self.keep();
        let baseline = self.evaluate(0, self.param.learning_rate);
        let mut stopping = EarlyStopping::new(baseline.validation_loss, self.param.plateau, self.param.patience);
        self.history.push(baseline);
        self.optimal_epoch = 0;

        for epoch in 1..self.param.epoch {
            let learning_rate = self.param.decay.compute(
                self.param.learning_rate,
                epoch,
                self.param.lr_decay_constant,
                self.param.lr_step_decay,
            );
            self.perform_one_epoch(learning_rate);

            let stats = self.evaluate(epoch, learning_rate);
            tracing::info!(
                epoch,
                learning_rate,
                train_loss = stats.train_loss,
                validation_loss = stats.validation_loss,
                first_metric = stats.first_metric,
                second_metric = stats.second_metric,
                "epoch done"
            );
            let validation_loss = stats.validation_loss;
            let diverged = stats.train_loss.is_nan() || validation_loss.is_nan();
            self.history.push(stats);
            if diverged {
                tracing::warn!(epoch, "loss is NaN, training aborted");
                return Ok(false);
            }

            match stopping.observe(epoch, validation_loss) {
                Verdict::Improved => self.keep(),
                Verdict::Waiting => {}
                Verdict::Stop => {
                    tracing::warn!(epoch, optimal_epoch = stopping.optimal_epoch(), "early stop");
                    break;
                }
            }
        }

        self.optimal_epoch = stopping.optimal_epoch();
        self.load_saved();
        let best = &self.history[self.optimal_epoch];
        tracing::info!(
            optimal_epoch = self.optimal_epoch,
            validation_loss = best.validation_loss,
            first_metric = best.first_metric,
            second_metric = best.second_metric,
            "training done"
        );
        Ok(true)
    }

    /// Inference on raw inputs, one row per sample.
    ///
    /// Applies the fitted input standardization, softmax for cross-entropy
    /// networks and the inverse output normalization when enabled.
    ///
    /// # Panics
    /// Panics if a row does not have as many values as the first layer has
    /// inputs.
    pub fn process(&self, inputs: &Matrix) -> Matrix {
        if let Some(first) = self.layers.first().filter(|l| l.input_size() > 0) {
            assert_eq!(
                inputs.cols,
                first.input_size(),
                "the network expects {} inputs per row, got {}",
                first.input_size(),
                inputs.cols
            );
        }
        let mut inputs = inputs.clone();
        preprocess::standardize_with(&mut inputs, &self.input_scaling);
        let outputs = self.scores(self.forward(&inputs));
        self.to_output_units(outputs)
    }

    /// Input-space gradient descent: adjusts `input` so that the network
    /// output moves towards `target`. Weights are not modified.
    pub fn generate(&mut self, target: &[f64], input: Vec<f64>, iterations: usize, learning_rate: f64) -> Result<Vec<f64>> {
        let (nb_inputs, nb_outputs) = match (self.layers.first(), self.layers.last()) {
            (Some(first), Some(last)) if first.input_size() > 0 => (first.input_size(), last.size()),
            _ => return Err(NetworkError::Config("the network is not initialized".to_string())),
        };
        if input.len() != nb_inputs || target.len() != nb_outputs {
            return Err(NetworkError::Data(format!(
                "generate needs {nb_inputs} inputs and {nb_outputs} targets, got {} and {}",
                input.len(),
                target.len()
            )));
        }

        let mut input = Matrix::from_data(vec![input]);
        preprocess::standardize_with(&mut input, &self.input_scaling);
        let mut target = Matrix::from_data(vec![target.to_vec()]);
        if let Some(scaling) = &self.output_scaling {
            preprocess::normalize_with(&mut target, scaling);
        }

        for _ in 0..iterations {
            let mut outputs = input.clone();
            for layer in self.layers.iter_mut() {
                outputs = layer.process_to_learn(&outputs, 0.0, 0.0, &mut self.rng, &self.pool);
            }
            let mut gradients = self.param.loss.compute(&target, &outputs).1;
            for layer in self.layers.iter_mut().rev() {
                layer.compute_gradients(&gradients, &self.pool);
                gradients = layer.get_gradients();
            }
            self.layers[0].update_input(&mut input[0], learning_rate);
            self.layers.iter_mut().for_each(Layer::discard_gradients);
        }

        preprocess::destandardize_with(&mut input, &self.input_scaling);
        Ok(input.data.swap_remove(0))
    }

    fn fit_scaling(&mut self) {
        let data = &mut self.data;
        self.input_scaling = preprocess::standardize(&mut data.train_inputs);
        preprocess::standardize_with(&mut data.validation_inputs, &self.input_scaling);
        preprocess::standardize_with(&mut data.test_inputs, &self.input_scaling);

        self.output_scaling = self.param.normalize_outputs.then(|| {
            let scaling = preprocess::normalize(&mut data.train_outputs);
            preprocess::normalize_with(&mut data.validation_outputs, &scaling);
            preprocess::normalize_with(&mut data.test_outputs, &scaling);
            scaling
        });
    }

    fn perform_one_epoch(&mut self, learning_rate: f64) {
        let params = UpdateParams {
            optimizer: self.param.optimizer,
            learning_rate,
            momentum: self.param.momentum,
            window: self.param.window,
            optimizer_bias: self.param.optimizer_bias,
            iteration: 0,
            l1: self.param.l1,
            l2: self.param.l2,
            decay: self.param.weight_decay,
        };
        let batch_size = self.param.batch_size;

        for batch in 0..self.data.nb_batch {
            let rows = batch * batch_size..(batch + 1) * batch_size;
            let mut outputs = Matrix::from_data(self.data.train_inputs.data[rows.clone()].to_vec());
            let real = Matrix::from_data(self.data.train_outputs.data[rows].to_vec());

            for layer in self.layers.iter_mut() {
                outputs = layer.process_to_learn(
                    &outputs,
                    self.param.dropout,
                    self.param.dropconnect,
                    &mut self.rng,
                    &self.pool,
                );
            }

            let mut gradients = self.param.loss.compute(&real, &outputs).1;
            for layer in self.layers.iter_mut().rev() {
                layer.compute_gradients(&gradients, &self.pool);
                gradients = layer.get_gradients();
            }
            for layer in self.layers.iter_mut() {
                layer.update_weights(&params, &self.pool);
            }
        }
    }

    /// Losses over the full train and validation sets, test metrics.
    fn evaluate(&self, epoch: usize, learning_rate: f64) -> EpochStats {
        let penalty = self.penalty();
        let loss = self.param.loss;
        let set_loss = |inputs: &Matrix, real: &Matrix| {
            let predicted = self.forward(inputs);
            average_loss(&loss.compute(real, &predicted).0) + penalty
        };
        let train_loss = set_loss(&self.data.train_inputs, &self.data.train_outputs);
        let validation_loss = set_loss(&self.data.validation_inputs, &self.data.validation_outputs);

        let (real, predicted) = self.test_predictions();
        let (first_metric, second_metric) = self.param.metric.compute(&real, &predicted, self.param.class_validity);

        EpochStats {
            epoch,
            learning_rate,
            train_loss,
            validation_loss,
            first_metric,
            second_metric,
        }
    }

    /// L1 and L2 penalty over every weight; biases are not penalized.
    fn penalty(&self) -> f64 {
        let (mut l1, mut l2) = (0.0, 0.0);
        for layer in &self.layers {
            for (weights, _) in layer.weights() {
                for w in weights.data.iter().flatten() {
                    l1 += w.abs();
                    l2 += w * w;
                }
            }
        }
        self.param.l1 * l1 + 0.5 * self.param.l2 * l2
    }

    /// Expected and predicted test outputs, both in output units.
    pub(crate) fn test_predictions(&self) -> (Matrix, Matrix) {
        let predicted = self.scores(self.forward(&self.data.test_inputs));
        let real = self.data.test_outputs.clone();
        (self.to_output_units(real), self.to_output_units(predicted))
    }

    fn forward(&self, inputs: &Matrix) -> Matrix {
        let mut outputs = inputs.clone();
        for layer in &self.layers {
            outputs = layer.process(&outputs, &self.pool);
        }
        outputs
    }

    fn scores(&self, outputs: Matrix) -> Matrix {
        match self.param.loss {
            Loss::CrossEntropy => outputs.softmax(),
            _ => outputs,
        }
    }

    fn to_output_units(&self, mut outputs: Matrix) -> Matrix {
        if let Some(scaling) = &self.output_scaling {
            preprocess::denormalize_with(&mut outputs, scaling);
        }
        outputs
    }

    fn keep(&mut self) {
        self.layers.iter_mut().for_each(Layer::keep);
    }

    fn load_saved(&mut self) {
        self.layers.iter_mut().for_each(Layer::load_saved);
    }

    pub fn param(&self) -> &NetworkParam {
        &self.param
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Seed actually used, drawn at creation when the configured one is 0.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// One record per epoch, the untrained baseline first.
    pub fn history(&self) -> &[EpochStats] {
        &self.history
    }

    pub fn train_losses(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.train_loss).collect()
    }

    pub fn validation_losses(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.validation_loss).collect()
    }

    pub fn optimal_epoch(&self) -> usize {
        self.optimal_epoch
    }

    /// Train, validation and test sets as prepared by the last `learn`.
    pub fn partition(&self) -> &Partition {
        &self.data
    }
}
