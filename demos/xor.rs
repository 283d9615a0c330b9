use meik_nn::{ActivationFunction, BuildConfig, Dense, LossKind, Matrix, MetricKind, Sequential};

fn main() -> meik_nn::Result<()> {
    env_logger::init();

    let inputs = Matrix::from_data(vec![
        vec![1.0, 0.0],
        vec![1.0, 1.0],
        vec![0.0, 1.0],
        vec![0.0, 0.0],
    ])?;
    let expected_outputs = Matrix::column(&[1.0, 0.0, 1.0, 0.0]);

    let mut model = Sequential::new();
    model.add(Dense::new(4, ActivationFunction::Tanh).with_input_width(2).with_seed(42))?;
    model.add(Dense::new(1, ActivationFunction::Sigmoid).with_seed(43))?;
    model.build(
        BuildConfig::new(LossKind::BinaryCrossentropy)
            .learning_rate(0.5)
            .train_metrics(vec![MetricKind::Accuracy])
            .eval_metrics(vec![MetricKind::Accuracy, MetricKind::F1]),
    )?;

    let epochs = 5000;
    model.train(&inputs, &expected_outputs, epochs, false)?;

    for (epoch, cost) in model.cost().iter().enumerate().step_by(1000) {
        println!("Epoch {epoch}: cost = {cost:.6}");
    }

    let outputs = model.predict(&inputs)?;
    for (input, output) in inputs.data.iter().zip(outputs.data.iter()) {
        println!("Input: {:?} -> Output: {:.4}", input, output[0]);
    }
    println!("{}", model.evaluate(&inputs, &expected_outputs)?);
    Ok(())
}
