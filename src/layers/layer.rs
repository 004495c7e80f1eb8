use std::ops::Range;

use rand::Rng;
use rayon::ThreadPool;
use serde::{Serialize, Deserialize};

use crate::activation::activation::Activation;
use crate::aggregation::aggregation::Aggregation;
use crate::error::{NetworkError, Result};
use crate::layers::neuron::Neuron;
use crate::math::matrix::{Matrix, Vector};
use crate::optim::optimizer::UpdateParams;

/// Rates at or below this value disable dropout/dropconnect.
const DROP_EPSILON: f64 = f64::EPSILON;

/// Distribution the initial weights are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    Uniform,
    #[default]
    Normal,
}

/// Describes one layer of a network.
///
/// Fields:
/// - `size`          — number of neurons; 0 on the last layer means "as many
///                     as the data has outputs"
/// - `aggregation`   — how each neuron combines its inputs
/// - `activation`    — transfer function applied after aggregation
/// - `k`             — weight sets per neuron (only `Maxout` uses more than one)
/// - `max_norm`      — cap on each weight set's L2 norm, 0 to disable
/// - `distrib`       — initial weight distribution
/// - `mean_boundary` — mean for `Normal`, squared-boundary numerator for `Uniform`
/// - `deviation`     — variance numerator for `Normal`
/// - `use_output`    — scale the distribution by fan-in + fan-out instead of fan-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerParam {
    pub size: usize,
    pub aggregation: Aggregation,
    pub activation: Activation,
    pub k: usize,
    pub max_norm: f64,
    pub distrib: Distribution,
    pub mean_boundary: f64,
    pub deviation: f64,
    pub use_output: bool,
}

impl Default for LayerParam {
    fn default() -> Self {
        LayerParam {
            size: 8,
            aggregation: Aggregation::Dot,
            activation: Activation::Relu,
            k: 1,
            max_norm: 32.0,
            distrib: Distribution::Normal,
            mean_boundary: 0.0,
            deviation: 2.0,
            use_output: false,
        }
    }
}

impl LayerParam {
    pub fn new(size: usize, aggregation: Aggregation, activation: Activation) -> LayerParam {
        LayerParam {
            size,
            aggregation,
            activation,
            ..LayerParam::default()
        }
    }
}

/// An ordered group of neurons sharing one aggregation/activation pair.
///
/// Every batch operation splits the neurons into contiguous ranges, one per
/// worker of the pool it is given, and returns once all ranges are done.
/// Neurons own all their mutable state, so the ranges never contend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    param: LayerParam,
    input_size: usize,
    neurons: Vec<Neuron>,
}

impl Layer {
    pub fn new(param: LayerParam) -> Layer {
        let neurons = vec![Neuron::new(param.aggregation, param.activation); param.size];
        Layer {
            param,
            input_size: 0,
            neurons,
        }
    }

    /// Sizes and randomly initializes every neuron.
    pub fn init<R: Rng + ?Sized>(&mut self, nb_inputs: usize, nb_outputs: usize, rng: &mut R) -> Result<()> {
        if self.neurons.is_empty() {
            return Err(NetworkError::Config("a layer must hold at least one neuron".to_string()));
        }
        self.input_size = nb_inputs;
        for neuron in self.neurons.iter_mut() {
            neuron.init(
                self.param.distrib,
                self.param.mean_boundary,
                self.param.deviation,
                nb_inputs,
                nb_outputs,
                self.param.k,
                rng,
                self.param.use_output,
            )?;
        }
        Ok(())
    }

    /// True once the neurons hold weights for `nb_inputs` inputs.
    pub fn is_initialized_for(&self, nb_inputs: usize) -> bool {
        self.input_size == nb_inputs
            && !self.neurons.is_empty()
            && self.neurons.iter().all(|n| n.nb_weights() == nb_inputs && n.weight_sets() > 0)
    }

    /// Replaces the neurons with `neurons` fresh ones. Only meaningful before `init`.
    pub fn resize(&mut self, neurons: usize) {
        self.param.size = neurons;
        self.neurons = vec![Neuron::new(self.param.aggregation, self.param.activation); neurons];
        self.input_size = 0;
    }

    pub fn size(&self) -> usize {
        self.neurons.len()
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn param(&self) -> &LayerParam {
        &self.param
    }

    /// Inputs expected by each weight set.
    pub fn nb_weights(&self) -> usize {
        self.neurons.first().map_or(0, Neuron::nb_weights)
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neurons_mut(&mut self) -> &mut [Neuron] {
        &mut self.neurons
    }

    /// Inference: rows are samples, columns are this layer's neurons.
    pub fn process(&self, inputs: &Matrix, pool: &ThreadPool) -> Matrix {
        self.check_width(inputs);
        let outputs = fan_out(pool, &self.neurons, |_, neuron| neuron.process(inputs));
        assemble(inputs.rows, outputs)
    }

    /// Training forward pass with dropout and dropconnect.
    ///
    /// The masks are drawn here, on the calling thread and in neuron order,
    /// so a seeded generator gives the same run whatever the pool size.
    pub fn process_to_learn<R: Rng + ?Sized>(
        &mut self,
        inputs: &Matrix,
        dropout: f64,
        dropconnect: f64,
        rng: &mut R,
        pool: &ThreadPool,
    ) -> Matrix {
        self.check_width(inputs);
        let masks: Vec<(Option<Matrix>, Option<Vector>)> = self.neurons.iter()
            .map(|neuron| {
                let connect = (dropconnect > DROP_EPSILON).then(|| {
                    let data = (0..neuron.weight_sets())
                        .map(|_| draw_factors(&mut *rng, inputs.cols, dropconnect))
                        .collect();
                    Matrix::from_data(data)
                });
                let drop = (dropout > DROP_EPSILON).then(|| draw_factors(&mut *rng, inputs.rows, dropout));
                (connect, drop)
            })
            .collect();

        let outputs = fan_out_mut(pool, &mut self.neurons, |i, neuron| {
            let (connect, drop) = &masks[i];
            neuron.process_to_learn(inputs, connect.as_ref(), drop.as_deref())
        });
        assemble(inputs.rows, outputs)
    }

    /// Backward pass; `gradients` has one row per sample and one column per neuron.
    pub fn compute_gradients(&mut self, gradients: &Matrix, pool: &ThreadPool) {
        assert_eq!(
            gradients.cols,
            self.neurons.len(),
            "one gradient column is needed per neuron"
        );
        let per_neuron = gradients.transpose();
        fan_out_mut(pool, &mut self.neurons, |i, neuron| neuron.compute_gradients(&per_neuron[i]));
    }

    /// Gradient w.r.t. this layer's inputs: each neuron's contribution summed,
    /// rows are samples and columns are inputs.
    pub fn get_gradients(&self) -> Matrix {
        let rows = self.neurons.first().map_or(0, |n| n.get_gradients().rows);
        let mut grad = Matrix::zeros(rows, self.input_size);
        for neuron in &self.neurons {
            let neuron_grad = neuron.get_gradients();
            for (row, neuron_row) in grad.data.iter_mut().zip(&neuron_grad.data) {
                for (g, n) in row.iter_mut().zip(neuron_row) {
                    *g += n;
                }
            }
        }
        grad
    }

    pub fn update_weights(&mut self, params: &UpdateParams, pool: &ThreadPool) {
        let max_norm = self.param.max_norm;
        fan_out_mut(pool, &mut self.neurons, |_, neuron| neuron.update_weights(params, max_norm));
    }

    /// Drops the gradients accumulated since the last update.
    pub fn discard_gradients(&mut self) {
        self.neurons.iter_mut().for_each(Neuron::discard_gradients);
    }

    /// Input-space descent step. Sequential: every neuron writes the same input.
    pub fn update_input(&self, input: &mut [f64], learning_rate: f64) {
        for neuron in &self.neurons {
            neuron.update_input(input, learning_rate);
        }
    }

    pub fn keep(&mut self) {
        self.neurons.iter_mut().for_each(Neuron::keep);
    }

    pub fn load_saved(&mut self) {
        self.neurons.iter_mut().for_each(Neuron::load_saved);
    }

    // Each row must carry exactly one value per weight.
    fn check_width(&self, inputs: &Matrix) {
        if self.input_size > 0 {
            assert_eq!(
                inputs.cols, self.input_size,
                "the layer expects {} inputs per row, got {}",
                self.input_size, inputs.cols
            );
        }
    }

    /// `(weights, bias)` of every neuron.
    pub fn weights(&self) -> Vec<(&Matrix, &[f64])> {
        self.neurons.iter().map(Neuron::weights).collect()
    }
}

/// Splits `len` neurons into one contiguous range per worker.
///
/// Each range holds `len / threads` neurons and the last one also takes the
/// leftover; the worker count shrinks to `len` when there are fewer neurons
/// than workers.
pub(crate) fn work_ranges(len: usize, threads: usize) -> Vec<Range<usize>> {
    let threads = threads.clamp(1, len.max(1));
    let per_thread = len / threads;
    (0..threads)
        .map(|i| {
            let end = if i == threads - 1 { len } else { per_thread * (i + 1) };
            per_thread * i..end
        })
        .collect()
}

fn fan_out<T, R, F>(pool: &ThreadPool, items: &[T], task: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    let mut results: Vec<Option<R>> = items.iter().map(|_| None).collect();
    let ranges = work_ranges(items.len(), pool.current_num_threads());
    pool.scope(|scope| {
        let task = &task;
        let mut slots_left = results.as_mut_slice();
        for range in ranges {
            let (slots, rest) = std::mem::take(&mut slots_left).split_at_mut(range.len());
            slots_left = rest;
            let chunk = &items[range.clone()];
            scope.spawn(move |_| {
                for (offset, (item, slot)) in chunk.iter().zip(slots.iter_mut()).enumerate() {
                    *slot = Some(task(range.start + offset, item));
                }
            });
        }
    });
    results.into_iter().flatten().collect()
}

fn fan_out_mut<T, R, F>(pool: &ThreadPool, items: &mut [T], task: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(usize, &mut T) -> R + Sync,
{
    let mut results: Vec<Option<R>> = items.iter().map(|_| None).collect();
    let ranges = work_ranges(items.len(), pool.current_num_threads());
    pool.scope(|scope| {
        let task = &task;
        let mut items_left = items;
        let mut slots_left = results.as_mut_slice();
        for range in ranges {
            let (chunk, rest) = std::mem::take(&mut items_left).split_at_mut(range.len());
            items_left = rest;
            let (slots, rest) = std::mem::take(&mut slots_left).split_at_mut(range.len());
            slots_left = rest;
            scope.spawn(move |_| {
                for (offset, (item, slot)) in chunk.iter_mut().zip(slots.iter_mut()).enumerate() {
                    *slot = Some(task(range.start + offset, item));
                }
            });
        }
    });
    results.into_iter().flatten().collect()
}

/// Per-neuron output columns into a samples x neurons matrix.
fn assemble(rows: usize, columns: Vec<Vector>) -> Matrix {
    let mut output = Matrix::zeros(rows, columns.len());
    for (i, column) in columns.iter().enumerate() {
        for (j, value) in column.iter().enumerate() {
            output[j][i] = *value;
        }
    }
    output
}

// Inverted dropout: 0 with probability `rate`, else 1 / (1 - rate).
fn draw_factors<R: Rng + ?Sized>(rng: &mut R, len: usize, rate: f64) -> Vector {
    let keep = 1.0 / (1.0 - rate);
    (0..len)
        .map(|_| if rng.gen_bool(rate) { 0.0 } else { keep })
        .collect()
}
