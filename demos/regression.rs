use std::sync::mpsc;
use std::thread;

use meik_nn::{
    ActivationFunction, BuildConfig, Dense, EpochStats, LossKind, Matrix, MetricKind,
    NormalizationKind, Regularizer, Sequential, TrainConfig,
};

/// Fits y = 2x + 1 on noisy samples while a second thread prints progress.
fn main() -> meik_nn::Result<()> {
    env_logger::init();

    let xs: Vec<f64> = (0..40).map(|i| -3.0 + 6.0 * i as f64 / 39.0).collect();
    let ys: Vec<f64> = xs
        .iter()
        .enumerate()
        .map(|(i, x)| 2.0 * x + 1.0 + 0.1 * (3.0 * i as f64).sin())
        .collect();
    let x = Matrix::column(&xs);
    let y = Matrix::column(&ys);

    let mut model = Sequential::new();
    model.add(
        Dense::new(8, ActivationFunction::Tanh)
            .with_input_width(1)
            .with_regularizer(Regularizer::l2(0.001))
            .with_seed(1),
    )?;
    model.add(Dense::new(1, ActivationFunction::Identity).with_seed(2))?;
    model.build(
        BuildConfig::new(LossKind::Mse)
            .normalization(NormalizationKind::Standard)
            .learning_rate(0.05)
            .eval_metrics(vec![MetricKind::Mae, MetricKind::Rmse, MetricKind::R2]),
    )?;

    let (tx, rx) = mpsc::channel::<EpochStats>();
    let printer = thread::spawn(move || {
        for stats in rx {
            if stats.epoch % 100 == 0 {
                println!("epoch {}/{}: cost = {:.6}", stats.epoch, stats.total_epochs, stats.cost);
            }
        }
    });

    // The printer stops once the config (and with it the sender) is dropped.
    let config = TrainConfig::new(500, false).with_progress(tx);
    model.train_with(&x, &y, &config)?;
    drop(config);
    if printer.join().is_err() {
        eprintln!("progress printer panicked");
    }

    let score = model.evaluate(&x, &y)?;
    println!("{score}");

    let probe = Matrix::column(&[-2.0, 0.0, 2.0]);
    let predicted = model.predict_normalized(&probe)?;
    for (x, p) in probe.iter().zip(predicted.iter()) {
        println!("f({x:.1}) = {p:.3} (expected {:.3})", 2.0 * x + 1.0);
    }
    Ok(())
}
