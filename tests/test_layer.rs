use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::{ThreadPool, ThreadPoolBuilder};

use ferrite_mlp::optim::{Optimizer, UpdateParams};
use ferrite_mlp::{Activation, Aggregation, Layer, LayerParam, Matrix, NetworkError};

fn pool(threads: usize) -> ThreadPool {
    ThreadPoolBuilder::new().num_threads(threads).build().unwrap()
}

fn layer(size: usize, inputs: usize) -> Layer {
    let mut layer = Layer::new(LayerParam::new(size, Aggregation::Dot, Activation::Tanh));
    layer.init(inputs, 2, &mut StdRng::seed_from_u64(5)).unwrap();
    layer
}

fn batch() -> Matrix {
    Matrix::from_data(vec![
        vec![0.1, -0.3, 0.8, 1.2],
        vec![-1.0, 0.4, 0.0, 0.5],
        vec![0.7, 0.7, -0.2, -0.9],
    ])
}

fn snapshot(layer: &Layer) -> Vec<(Matrix, Vec<f64>)> {
    layer.weights().into_iter().map(|(w, b)| (w.clone(), b.to_vec())).collect()
}

#[test]
fn results_do_not_depend_on_the_thread_count() {
    let params = UpdateParams {
        optimizer: Optimizer::Adam,
        learning_rate: 0.01,
        momentum: 0.9,
        window: 0.999,
        optimizer_bias: 1e-7,
        iteration: 0,
        l1: 0.001,
        l2: 0.001,
        decay: 0.0,
    };
    let gradients = Matrix::from_data(vec![vec![0.5; 7], vec![-0.25; 7], vec![1.0; 7]]);

    let run = |threads: usize| {
        let pool = pool(threads);
        let mut rng = StdRng::seed_from_u64(17);
        let mut layer = layer(7, 4);
        let outputs = layer.process_to_learn(&batch(), 0.3, 0.2, &mut rng, &pool);
        layer.compute_gradients(&gradients, &pool);
        let input_gradients = layer.get_gradients();
        layer.update_weights(&params, &pool);
        (outputs, input_gradients, snapshot(&layer))
    };

    let reference = run(1);
    for threads in [2, 3, 4, 8, 16] {
        assert_eq!(run(threads), reference, "{threads} threads");
    }
}

#[test]
fn process_assembles_neuron_columns() {
    let layer = layer(5, 4);
    let outputs = layer.process(&batch(), &pool(2));
    assert_eq!((outputs.rows, outputs.cols), (3, 5));
    for (n, neuron) in layer.neurons().iter().enumerate() {
        assert_eq!(outputs.column(n), neuron.process(&batch()));
    }
}

#[test]
fn input_gradients_sum_over_neurons() {
    let pool = pool(2);
    let mut layer = Layer::new(LayerParam::new(3, Aggregation::Dot, Activation::Linear));
    layer.init(2, 1, &mut StdRng::seed_from_u64(1)).unwrap();
    let inputs = Matrix::from_data(vec![vec![1.0, 2.0]]);
    layer.process_to_learn(&inputs, 0.0, 0.0, &mut StdRng::seed_from_u64(1), &pool);
    layer.compute_gradients(&Matrix::from_data(vec![vec![1.0, 2.0, 3.0]]), &pool);

    let grad = layer.get_gradients();
    for j in 0..2 {
        let expected: f64 = layer.neurons().iter()
            .zip([1.0, 2.0, 3.0])
            .map(|(n, g)| g * n.weights().0[0][j])
            .sum();
        assert_relative_eq!(grad[0][j], expected, epsilon = 1e-12);
    }
}

#[test]
fn dropout_zeroes_or_scales_outputs() {
    let mut layer = layer(6, 4);
    let plain = layer.process(&batch(), &pool(1));
    let dropped = layer.process_to_learn(&batch(), 0.5, 0.0, &mut StdRng::seed_from_u64(4), &pool(3));
    for (p, d) in plain.data.iter().flatten().zip(dropped.data.iter().flatten()) {
        assert!(*d == 0.0 || (d - 2.0 * p).abs() < 1e-12);
    }
}

#[test]
fn keep_restores_after_updates() {
    let pool = pool(2);
    let mut layer = layer(4, 4);
    layer.keep();
    let kept = snapshot(&layer);

    let params = UpdateParams {
        optimizer: Optimizer::None,
        learning_rate: 0.5,
        momentum: 0.0,
        window: 0.0,
        optimizer_bias: 1e-7,
        iteration: 0,
        l1: 0.0,
        l2: 0.0,
        decay: 0.0,
    };
    layer.process_to_learn(&batch(), 0.0, 0.0, &mut StdRng::seed_from_u64(0), &pool);
    layer.compute_gradients(&Matrix::from_data(vec![vec![1.0; 4]; 3]), &pool);
    layer.update_weights(&params, &pool);
    assert_ne!(snapshot(&layer), kept);

    layer.load_saved();
    assert_eq!(snapshot(&layer), kept);
}

#[test]
fn resize_and_initialization_state() {
    let mut layer = Layer::new(LayerParam::new(0, Aggregation::Dot, Activation::Linear));
    assert!(matches!(
        layer.init(3, 1, &mut StdRng::seed_from_u64(0)),
        Err(NetworkError::Config(_))
    ));

    layer.resize(2);
    assert_eq!(layer.size(), 2);
    assert!(!layer.is_initialized_for(3));
    layer.init(3, 1, &mut StdRng::seed_from_u64(0)).unwrap();
    assert!(layer.is_initialized_for(3));
    assert!(!layer.is_initialized_for(4));
    assert_eq!(layer.nb_weights(), 3);
}

#[test]
#[should_panic]
fn layer_rejects_rows_of_the_wrong_width() {
    let layer = layer(3, 4);
    layer.process(&Matrix::from_data(vec![vec![1.0, 2.0]]), &pool(1));
}

#[test]
#[should_panic]
fn training_pass_rejects_rows_of_the_wrong_width() {
    let mut layer = layer(3, 4);
    let wide = Matrix::from_data(vec![vec![0.0; 5]]);
    layer.process_to_learn(&wide, 0.0, 0.0, &mut StdRng::seed_from_u64(0), &pool(1));
}
