/// Fits y = 3·x1 − 2·x2 + 1 with a single linear neuron, then writes the
/// training report and the trained model next to the current directory.
///
/// Run with:
///   cargo run --example regression
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use ferrite_mlp::{Activation, Aggregation, LayerParam, Loss, Matrix, Network, NetworkParam, Optimizer};

fn main() -> ferrite_mlp::Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let data = (0..500)
        .map(|_| {
            let x1: f64 = rng.gen_range(-1.0..1.0);
            let x2: f64 = rng.gen_range(-1.0..1.0);
            (vec![x1, x2], vec![3.0 * x1 - 2.0 * x2 + 1.0])
        })
        .collect();

    let param = NetworkParam {
        seed: 1,
        batch_size: 10,
        learning_rate: 0.01,
        epoch: 200,
        patience: 10,
        loss: Loss::L2,
        optimizer: Optimizer::Adam,
        threads: 2,
        ..NetworkParam::default()
    };

    let mut network = Network::new(vec!["y".to_string()], param.clone())?;
    network.add_layer(LayerParam::new(1, Aggregation::Dot, Activation::Linear));
    network.set_data(data);

    if !network.learn()? {
        println!("training diverged");
        return Ok(());
    }

    let losses = network.validation_losses();
    println!(
        "validation loss {:.6} -> {:.6} (optimal epoch {})",
        losses[0],
        losses[network.optimal_epoch()],
        network.optimal_epoch()
    );

    network.write_info("regression_info.csv")?;
    network.save_json("regression_model.json")?;

    let reloaded = Network::load_json("regression_model.json", param)?;
    let probe = Matrix::from_data(vec![vec![0.5, -0.5]]);
    println!("f(0.5, -0.5) = {:.4} (expected 3.5)", reloaded.process(&probe)[0][0]);
    Ok(())
}
