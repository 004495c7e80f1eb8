use ferrite_mlp::{Activation, Aggregation, LayerParam, Matrix, Network, NetworkParam, Optimizer};

fn main() -> ferrite_mlp::Result<()> {
    let param = NetworkParam {
        seed: 42,
        batch_size: 4,
        learning_rate: 0.01,
        epoch: 500,
        patience: 50,
        optimizer: Optimizer::Adam,
        metric: ferrite_mlp::Metric::Accuracy,
        class_validity: 0.5,
        ..NetworkParam::default()
    };

    let mut network = Network::new(vec!["xor".to_string()], param)?;
    network.add_layer(LayerParam::new(8, Aggregation::Dot, Activation::Tanh));
    // Size 0: the last layer takes the number of outputs of the data.
    network.add_layer(LayerParam::new(0, Aggregation::Dot, Activation::Sigmoid));

    let corners = [
        (vec![1.0, 0.0], vec![1.0]),
        (vec![1.0, 1.0], vec![0.0]),
        (vec![0.0, 1.0], vec![1.0]),
        (vec![0.0, 0.0], vec![0.0]),
    ];
    let data = corners.iter().cycle().take(200).cloned().collect();
    network.set_data(data);

    if !network.learn()? {
        println!("training diverged, try a smaller learning rate");
        return Ok(());
    }

    let stats = &network.history()[network.optimal_epoch()];
    println!(
        "optimal epoch {}: validation loss = {:.6}, accuracy = {:.1}%",
        stats.epoch, stats.validation_loss, stats.first_metric
    );

    let inputs = Matrix::from_data(corners.iter().map(|(i, _)| i.clone()).collect());
    let outputs = network.process(&inputs);
    for (input, output) in inputs.data.iter().zip(&outputs.data) {
        println!("Input: {:?} -> Output: {:.4}", input, output[0]);
    }
    Ok(())
}
