use approx::{assert_abs_diff_eq, assert_relative_eq};
use rand::rngs::StdRng;
use rand::SeedableRng;

use ferrite_mlp::optim::{Optimizer, UpdateParams};
use ferrite_mlp::{Activation, Aggregation, Distribution, Matrix, Neuron, NetworkError};

fn sgd(learning_rate: f64) -> UpdateParams {
    UpdateParams {
        optimizer: Optimizer::None,
        learning_rate,
        momentum: 0.9,
        window: 0.9,
        optimizer_bias: 1e-7,
        iteration: 0,
        l1: 0.0,
        l2: 0.0,
        decay: 0.0,
    }
}

fn neuron(aggregation: Aggregation, activation: Activation, inputs: usize) -> Neuron {
    let mut neuron = Neuron::new(aggregation, activation);
    neuron
        .init(Distribution::Normal, 0.0, 2.0, inputs, 1, 3, &mut StdRng::seed_from_u64(11), false)
        .unwrap();
    neuron
}

#[test]
fn init_sizes_weight_sets() {
    let dot = neuron(Aggregation::Dot, Activation::Relu, 4);
    assert_eq!((dot.weight_sets(), dot.nb_weights()), (1, 4));
    assert_eq!(dot.weights().1, &[0.0]);

    let maxout = neuron(Aggregation::Maxout, Activation::Linear, 4);
    assert_eq!((maxout.weight_sets(), maxout.nb_weights()), (3, 4));
}

#[test]
fn uniform_init_respects_the_boundary() {
    let mut neuron = Neuron::new(Aggregation::Dot, Activation::Tanh);
    neuron
        .init(Distribution::Uniform, 6.0, 0.0, 50, 50, 1, &mut StdRng::seed_from_u64(2), true)
        .unwrap();
    let bound = (6.0f64 / 100.0).sqrt();
    assert!(neuron.weights().0.data[0].iter().all(|w| w.abs() <= bound));

    let err = neuron.init(Distribution::Uniform, 0.0, 0.0, 5, 1, 1, &mut StdRng::seed_from_u64(2), false);
    assert!(matches!(err, Err(NetworkError::Config(_))));
}

#[test]
fn weight_step_matches_the_activation_slope() {
    let mut neuron = neuron(Aggregation::Dot, Activation::Sigmoid, 3);
    {
        let (weights, bias) = neuron.weights_mut();
        weights[0] = vec![0.2, -0.4, 0.1];
        bias[0] = 0.05;
    }
    let input = vec![1.0, 0.5, -2.0];
    let inputs = Matrix::from_data(vec![input.clone()]);
    let aggregate: f64 = 0.2 - 0.2 - 0.2 + 0.05;
    let slope = Activation::Sigmoid.derivative(aggregate);

    let outputs = neuron.process_to_learn(&inputs, None, None);
    assert_relative_eq!(outputs[0], Activation::Sigmoid.function(aggregate));

    neuron.compute_gradients(&[1.0]);
    let input_gradients = neuron.get_gradients().clone();
    assert_relative_eq!(input_gradients[0][1], slope * -0.4);

    neuron.update_weights(&sgd(1.0), 0.0);
    let (weights, bias) = neuron.weights();
    for (j, (w, start)) in weights[0].iter().zip([0.2, -0.4, 0.1]).enumerate() {
        assert_relative_eq!(w - start, slope * input[j], epsilon = 1e-12);
    }
    assert_relative_eq!(bias[0] - 0.05, slope, epsilon = 1e-12);
}

#[test]
fn batch_gradients_are_averaged() {
    let mut neuron = neuron(Aggregation::Dot, Activation::Linear, 1);
    neuron.weights_mut().0[0][0] = 0.0;
    let inputs = Matrix::from_data(vec![vec![1.0], vec![3.0]]);
    neuron.process_to_learn(&inputs, None, None);
    neuron.compute_gradients(&[1.0, 1.0]);
    neuron.update_weights(&sgd(0.5), 0.0);
    assert_relative_eq!(neuron.weights().0[0][0], 0.5 * 2.0);
    assert_relative_eq!(neuron.weights().1[0], 0.5);
}

#[test]
fn dropped_samples_carry_no_gradient() {
    let mut neuron = neuron(Aggregation::Dot, Activation::Linear, 2);
    let before = neuron.weights().0.clone();
    let inputs = Matrix::from_data(vec![vec![1.0, 1.0]]);
    let outputs = neuron.process_to_learn(&inputs, None, Some(&[0.0][..]));
    assert_eq!(outputs, vec![0.0]);
    neuron.compute_gradients(&[5.0]);
    assert!(neuron.get_gradients()[0].iter().all(|g| *g == 0.0));
    neuron.update_weights(&sgd(1.0), 0.0);
    assert_eq!(neuron.weights().0, &before);
}

#[test]
fn dropconnect_masks_single_weights() {
    let mut neuron = neuron(Aggregation::Dot, Activation::Linear, 2);
    {
        let (weights, _) = neuron.weights_mut();
        weights[0] = vec![1.0, 1.0];
    }
    let inputs = Matrix::from_data(vec![vec![2.0, 3.0]]);
    let connect = Matrix::from_data(vec![vec![0.0, 2.0]]);
    let outputs = neuron.process_to_learn(&inputs, Some(&connect), None);
    assert_relative_eq!(outputs[0], 6.0);

    neuron.compute_gradients(&[1.0]);
    neuron.update_weights(&sgd(1.0), 0.0);
    assert_eq!(neuron.weights().0[0][0], 1.0);
    assert_relative_eq!(neuron.weights().0[0][1], 1.0 + 3.0 * 2.0);
}

#[test]
fn max_norm_rescales_each_set() {
    let mut neuron = neuron(Aggregation::Dot, Activation::Linear, 2);
    neuron.weights_mut().0[0] = vec![3.0, 4.0];
    neuron.process_to_learn(&Matrix::from_data(vec![vec![0.0, 0.0]]), None, None);
    neuron.compute_gradients(&[0.0]);
    neuron.update_weights(&sgd(0.1), 1.0);
    assert_abs_diff_eq!(neuron.weights().0[0][0], 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(neuron.weights().0[0][1], 0.8, epsilon = 1e-12);
}

#[test]
fn keep_and_load_saved_round_trip() {
    let mut neuron = neuron(Aggregation::Dot, Activation::Relu, 3);
    neuron.keep();
    let kept = (neuron.weights().0.clone(), neuron.weights().1.to_vec());

    {
        let (weights, bias) = neuron.weights_mut();
        weights[0][1] = 42.0;
        bias[0] = -1.0;
    }
    assert_ne!(neuron.weights().0, &kept.0);

    neuron.load_saved();
    assert_eq!(neuron.weights().0, &kept.0);
    assert_eq!(neuron.weights().1, kept.1.as_slice());
}

#[test]
fn maxout_only_updates_the_selected_set() {
    let mut neuron = neuron(Aggregation::Maxout, Activation::Linear, 1);
    {
        let (weights, bias) = neuron.weights_mut();
        weights.data = vec![vec![1.0], vec![-1.0], vec![0.5]];
        bias.iter_mut().for_each(|b| *b = 0.0);
    }
    let outputs = neuron.process_to_learn(&Matrix::from_data(vec![vec![2.0]]), None, None);
    assert_eq!(outputs, vec![2.0]);
    neuron.compute_gradients(&[1.0]);
    neuron.update_weights(&sgd(1.0), 0.0);
    assert_eq!(neuron.weights().0.data, vec![vec![3.0], vec![-1.0], vec![0.5]]);
}
