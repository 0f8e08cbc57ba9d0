use ferrite_mlp::{Activation, Dataset, LearningConfig, Network, NetworkConfig, TargetMode, TrainingEvent};

fn main() -> ferrite_mlp::Result<()> {
    let dataset = Dataset::parse_csv("1,0,1\n1,1,0\n0,1,1\n0,0,0\n")?;

    let config = NetworkConfig::new(Activation::Tanh, Activation::Sigmoid, TargetMode::Classification)
        .with_seed(7);
    let mut network = Network::new(&dataset, &config)?;
    network.add_neuron_to_hidden_layer(0, Activation::Tanh)?;
    network.add_neuron_to_hidden_layer(0, Activation::Tanh)?;

    let learning = LearningConfig::new(0.3, 5000, 0.005);
    let mut training = network.start_learning(&dataset, &learning)?;
    for event in training.by_ref() {
        if let TrainingEvent::EpochCompleted { epoch, mse, .. } = event? {
            if epoch % 500 == 0 || epoch == 1 {
                println!("Epoch {epoch}: mse = {mse:.6}");
            }
        }
    }
    println!("Finished: {:?}", training.outcome());
    drop(training);

    for row in 0..dataset.rows_count() {
        let cells = dataset.row(row).unwrap_or_default();
        let output = network.predict(&cells)?;
        let label = network.classify(&cells)?.unwrap_or_default();
        println!("Input: {:?} -> Output: {:.4} (class {label})", cells, output[0]);
    }
    Ok(())
}
