use rand::Rng;
use rand_distr::{Distribution as _, Normal, Uniform};
use serde::{Serialize, Deserialize};

use crate::activation::activation::Activation;
use crate::aggregation::aggregation::Aggregation;
use crate::error::{NetworkError, Result};
use crate::layers::layer::Distribution;
use crate::math::matrix::{Matrix, Vector};
use crate::optim::optimizer::{optimized_update, CoefState, UpdateParams};

/// A single unit: one aggregation, one activation and the weights they use.
///
/// `weights` holds one row per weight set (several only for `Maxout`) and one
/// column per input; `bias` holds one value per set. Every coefficient has its
/// own `CoefState`, so neurons never share mutable state and a layer can
/// update them in parallel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Neuron {
    aggregation: Aggregation,
    activation: Activation,
    weights: Matrix,
    bias: Vector,
    weight_states: Vec<Vec<CoefState>>,
    bias_states: Vec<CoefState>,
    iteration: u64,
    #[serde(skip)]
    saved: Option<(Matrix, Vector)>,
    #[serde(skip)]
    cache: LearningCache,
}

/// What the forward pass of a batch leaves behind for the backward pass.
#[derive(Debug, Clone, Default)]
struct LearningCache {
    inputs: Matrix,
    /// Dropconnect factor per weight, `None` when dropconnect is off.
    connect: Option<Matrix>,
    /// (aggregated value, selected weight set) per sample.
    aggregates: Vec<(f64, usize)>,
    /// Dropout factor per sample, empty when dropout is off.
    dropout: Vector,
    weight_gradients: Matrix,
    bias_gradients: Vector,
    input_gradients: Matrix,
    features: usize,
}

impl Neuron {
    pub fn new(aggregation: Aggregation, activation: Activation) -> Neuron {
        Neuron {
            aggregation,
            activation,
            ..Neuron::default()
        }
    }

    /// Draws fresh weights and clears the optimizer history.
    ///
    /// The fan used to scale the distribution is `nb_inputs`, plus
    /// `nb_outputs` when `use_output` is set:
    /// - `Normal`  — N(mean_boundary, √(deviation / fan))
    /// - `Uniform` — U(−√(mean_boundary / fan), √(mean_boundary / fan))
    #[allow(clippy::too_many_arguments)]
    pub fn init<R: Rng + ?Sized>(
        &mut self,
        distrib: Distribution,
        mean_boundary: f64,
        deviation: f64,
        nb_inputs: usize,
        nb_outputs: usize,
        k: usize,
        rng: &mut R,
        use_output: bool,
    ) -> Result<()> {
        let sets = self.aggregation.weight_sets(k);
        let fan = (nb_inputs + if use_output { nb_outputs } else { 0 }).max(1) as f64;

        let mut weights = Matrix::zeros(sets, nb_inputs);
        match distrib {
            Distribution::Normal => {
                let dist = Normal::new(mean_boundary, (deviation / fan).sqrt())
                    .map_err(|e| NetworkError::Config(format!("normal weight distribution: {e}")))?;
                for w in weights.data.iter_mut().flatten() {
                    *w = dist.sample(rng);
                }
            }
            Distribution::Uniform => {
                let bound = (mean_boundary / fan).sqrt();
                if !(bound > 0.0) {
                    return Err(NetworkError::Config(format!(
                        "uniform weight distribution needs a positive boundary, got {mean_boundary}"
                    )));
                }
                let dist = Uniform::new(-bound, bound);
                for w in weights.data.iter_mut().flatten() {
                    *w = dist.sample(rng);
                }
            }
        }

        self.weights = weights;
        self.bias = vec![0.0; sets];
        self.weight_states = vec![vec![CoefState::default(); nb_inputs]; sets];
        self.bias_states = vec![CoefState::default(); sets];
        self.iteration = 0;
        self.saved = None;
        self.cache = LearningCache::default();
        Ok(())
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Number of inputs each weight set expects.
    pub fn nb_weights(&self) -> usize {
        self.weights.cols
    }

    pub fn weight_sets(&self) -> usize {
        self.weights.rows
    }

    pub fn weights(&self) -> (&Matrix, &[f64]) {
        (&self.weights, &self.bias)
    }

    pub fn weights_mut(&mut self) -> (&mut Matrix, &mut Vector) {
        (&mut self.weights, &mut self.bias)
    }

    /// One output per input row, without touching the learning cache.
    pub fn process(&self, inputs: &Matrix) -> Vector {
        inputs.data.iter()
            .map(|row| {
                let (aggregate, _) = self.aggregation.aggregate(row, &self.weights, &self.bias);
                self.activation.function(aggregate)
            })
            .collect()
    }

    /// Forward pass of a training batch.
    ///
    /// `connect` scales each weight (dropconnect) and `dropout` scales each
    /// sample's output; both are drawn by the layer. Inputs, aggregates and
    /// factors are cached for `compute_gradients`.
    pub fn process_to_learn(&mut self, inputs: &Matrix, connect: Option<&Matrix>, dropout: Option<&[f64]>) -> Vector {
        let effective = self.effective_weights(connect);
        let aggregates: Vec<(f64, usize)> = inputs.data.iter()
            .map(|row| self.aggregation.aggregate(row, &effective, &self.bias))
            .collect();

        let outputs = aggregates.iter()
            .enumerate()
            .map(|(r, &(aggregate, _))| {
                let factor = dropout.map_or(1.0, |d| d[r]);
                self.activation.function(aggregate) * factor
            })
            .collect();

        if !self.weights.has_same_shape(&self.cache.weight_gradients) {
            self.cache.weight_gradients = Matrix::zeros(self.weights.rows, self.weights.cols);
            self.cache.bias_gradients = vec![0.0; self.bias.len()];
            self.cache.features = 0;
        }
        self.cache.inputs = inputs.clone();
        self.cache.connect = connect.cloned();
        self.cache.aggregates = aggregates;
        self.cache.dropout = dropout.map(<[f64]>::to_vec).unwrap_or_default();
        outputs
    }

    /// Backward pass for the cached batch.
    ///
    /// `output_gradients[r]` is the gradient reaching this neuron's output for
    /// sample `r`. Weight and bias gradients are accumulated until
    /// `update_weights`; input gradients replace the previous batch's.
    pub fn compute_gradients(&mut self, output_gradients: &[f64]) {
        let effective = self.effective_weights(self.cache.connect.as_ref());
        let cache = &mut self.cache;
        let mut input_gradients = Matrix::zeros(cache.inputs.rows, cache.inputs.cols);

        for (r, &(aggregate, set)) in cache.aggregates.iter().enumerate() {
            let factor = cache.dropout.get(r).copied().unwrap_or(1.0);
            let delta = output_gradients[r] * factor * self.activation.derivative(aggregate);
            let input = cache.inputs.row(r);
            let weights = &effective[set];

            let weight_primes = self.aggregation.prime(input, weights);
            for (j, prime) in weight_primes.iter().enumerate() {
                let connect = cache.connect.as_ref().map_or(1.0, |c| c[set][j]);
                cache.weight_gradients[set][j] += delta * prime * connect;
            }
            cache.bias_gradients[set] += delta;

            let input_primes = self.aggregation.prime_input(input, weights);
            for (j, prime) in input_primes.iter().enumerate() {
                input_gradients[r][j] = delta * prime;
            }
        }
        cache.features += cache.aggregates.len();
        cache.input_gradients = input_gradients;
    }

    /// Gradient w.r.t. each input (rows = samples, columns = inputs) of the
    /// last backward pass.
    pub fn get_gradients(&self) -> &Matrix {
        &self.cache.input_gradients
    }

    /// Applies the batch-averaged gradients through the optimizer, then
    /// rescales any weight set whose norm exceeds `max_norm` (0 disables it).
    pub fn update_weights(&mut self, params: &UpdateParams, max_norm: f64) {
        if self.cache.features == 0 {
            return;
        }
        self.iteration += 1;
        let params = UpdateParams { iteration: self.iteration, ..*params };
        let bias_params = params.without_penalty();
        let count = self.cache.features as f64;

        for i in 0..self.weights.rows {
            for j in 0..self.weights.cols {
                let gradient = self.cache.weight_gradients[i][j] / count;
                optimized_update(&mut self.weights[i][j], &mut self.weight_states[i][j], gradient, &params);
            }
            let gradient = self.cache.bias_gradients[i] / count;
            optimized_update(&mut self.bias[i], &mut self.bias_states[i], gradient, &bias_params);

            if max_norm > 0.0 {
                let norm = self.weights[i].iter().map(|w| w * w).sum::<f64>().sqrt();
                if norm > max_norm {
                    let scale = max_norm / norm;
                    self.weights[i].iter_mut().for_each(|w| *w *= scale);
                }
            }
        }
        self.discard_gradients();
    }

    /// Clears accumulated weight and bias gradients.
    pub fn discard_gradients(&mut self) {
        self.cache.weight_gradients = Matrix::zeros(self.weights.rows, self.weights.cols);
        self.cache.bias_gradients = vec![0.0; self.bias.len()];
        self.cache.features = 0;
    }

    /// Moves `input` along the input gradients of the last backward pass.
    pub fn update_input(&self, input: &mut [f64], learning_rate: f64) {
        for row in &self.cache.input_gradients.data {
            for (x, g) in input.iter_mut().zip(row) {
                *x += learning_rate * g;
            }
        }
    }

    /// Checkpoints the current weights and bias.
    pub fn keep(&mut self) {
        self.saved = Some((self.weights.clone(), self.bias.clone()));
    }

    /// Restores the last checkpoint; does nothing if `keep` was never called.
    pub fn load_saved(&mut self) {
        if let Some((weights, bias)) = &self.saved {
            self.weights = weights.clone();
            self.bias = bias.clone();
        }
    }

    fn effective_weights(&self, connect: Option<&Matrix>) -> Matrix {
        match connect {
            None => self.weights.clone(),
            Some(factors) => {
                let mut effective = self.weights.clone();
                for (row, factor_row) in effective.data.iter_mut().zip(&factors.data) {
                    for (w, f) in row.iter_mut().zip(factor_row) {
                        *w *= f;
                    }
                }
                effective
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::optimizer::Optimizer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sgd(learning_rate: f64) -> UpdateParams {
        UpdateParams {
            optimizer: Optimizer::None,
            learning_rate,
            momentum: 0.0,
            window: 0.0,
            optimizer_bias: 1e-7,
            iteration: 0,
            l1: 0.0,
            l2: 0.0,
            decay: 0.0,
        }
    }

    fn linear_neuron(weights: Vec<f64>, bias: f64) -> Neuron {
        let mut neuron = Neuron::new(Aggregation::Dot, Activation::Linear);
        let mut rng = StdRng::seed_from_u64(1);
        neuron.init(Distribution::Normal, 0.0, 1.0, weights.len(), 1, 1, &mut rng, false).unwrap();
        let (w, b) = neuron.weights_mut();
        w[0] = weights;
        b[0] = bias;
        neuron
    }

    #[test]
    fn gradients_are_averaged_over_the_batch() {
        let mut neuron = linear_neuron(vec![0.0, 0.0], 0.0);
        let inputs = Matrix::from_data(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        neuron.process_to_learn(&inputs, None, None);
        neuron.compute_gradients(&[1.0, 1.0]);
        neuron.update_weights(&sgd(0.5), 0.0);

        let (w, b) = neuron.weights();
        assert_eq!(w[0], vec![1.0, 1.5]);
        assert_eq!(b[0], 0.5);
    }

    #[test]
    fn input_gradients_follow_the_weights() {
        let mut neuron = linear_neuron(vec![2.0, -3.0], 0.0);
        let inputs = Matrix::from_data(vec![vec![1.0, 1.0]]);
        neuron.process_to_learn(&inputs, None, None);
        neuron.compute_gradients(&[0.5]);
        assert_eq!(neuron.get_gradients()[0], vec![1.0, -1.5]);
    }

    #[test]
    fn dropped_samples_carry_no_gradient() {
        let mut neuron = linear_neuron(vec![1.0], 0.0);
        let inputs = Matrix::from_data(vec![vec![2.0], vec![3.0]]);
        let out = neuron.process_to_learn(&inputs, None, Some(&[0.0, 2.0]));
        assert_eq!(out, vec![0.0, 6.0]);
        neuron.compute_gradients(&[1.0, 1.0]);
        assert_eq!(neuron.get_gradients().column(0), vec![0.0, 2.0]);
    }

    #[test]
    fn max_norm_caps_the_weight_vector() {
        let mut neuron = linear_neuron(vec![3.0, 4.0], 0.0);
        let inputs = Matrix::from_data(vec![vec![3.0, 4.0]]);
        neuron.process_to_learn(&inputs, None, None);
        neuron.compute_gradients(&[1.0]);
        neuron.update_weights(&sgd(1.0), 1.0);
        let norm = neuron.weights().0[0].iter().map(|w| w * w).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }
}
