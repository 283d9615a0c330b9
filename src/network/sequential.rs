use log::{debug, info, warn};
use std::time::Instant;

use crate::error::{NnError, Result};
use crate::layers::layer::Layer;
use crate::loss::loss_type::LossKind;
use crate::math::matrix::Matrix;
use crate::metrics::{MetricKind, Metrics, Score};
use crate::network::build_config::BuildConfig;
use crate::normalize::normalizer::Normalizer;
use crate::optim::sgd::Sgd;
use crate::regularization;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

/// An ordered stack of layers trained by full-batch gradient descent.
///
/// Lifecycle: `add` layers, `build` once, then `train` / `evaluate` /
/// `predict` as often as needed. Samples are rows; the batch size is the
/// number of rows of the targets.
///
/// ```ignore
/// let mut model = Sequential::new();
/// model.add(Dense::new(4, ActivationFunction::Tanh).with_input_width(1))?;
/// model.add(Dense::new(1, ActivationFunction::Identity))?;
/// model.build(BuildConfig::new(LossKind::Mse).learning_rate(0.1))?;
/// model.train(&x, &y, 100, false)?;
/// ```
#[derive(Debug, Default)]
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
    config: Option<BuildConfig>,
    normalize: Option<Normalizer>,
    metrics: Option<Metrics>,
    cost: Vec<f64>,
    accuracy: Vec<f64>,
    score: Option<Score>,
}

impl Sequential {
    pub fn new() -> Sequential {
        Sequential::default()
    }

    /// Appends a layer, wiring its input width to the previous layer's output.
    ///
    /// The first layer must declare its input width; later layers have it
    /// assigned, whatever they declare.
    pub fn add<L: Layer + 'static>(&mut self, layer: L) -> Result<()> {
        self.add_boxed(Box::new(layer))
    }

    pub fn add_boxed(&mut self, mut layer: Box<dyn Layer>) -> Result<()> {
        if self.config.is_some() {
            return Err(NnError::AlreadyBuilt);
        }

        let id = self.layers.len();
        let input_width = match self.layers.last() {
            None => layer.declared_input_width().ok_or(NnError::MissingInputWidth)?,
            Some(prev) => prev.units(),
        };

        layer.init(id, input_width)?;
        if layer.units() == 0 {
            return Err(NnError::Contract(format!(
                "{} layer {} reports zero output units after init",
                layer.name(),
                id
            )));
        }
        if layer.id() != Some(id) {
            return Err(NnError::Contract(format!(
                "{} layer did not record its position {} during init",
                layer.name(),
                id
            )));
        }

        debug!("added {} layer {}: {} -> {}", layer.name(), id, input_width, layer.units());
        self.layers.push(layer);
        Ok(())
    }

    /// Fixes the hyperparameters, creates the normalizer and metrics, and hands
    /// every layer its optimizer. Can only run once.
    pub fn build(&mut self, config: BuildConfig) -> Result<()> {
        if self.config.is_some() {
            return Err(NnError::AlreadyBuilt);
        }
        if self.layers.is_empty() {
            return Err(NnError::InvalidConfig("cannot build a model without layers".to_string()));
        }
        if !config.learning_rate.is_finite() || config.learning_rate <= 0.0 {
            return Err(NnError::InvalidConfig(format!(
                "learning rate must be positive and finite, got {}",
                config.learning_rate
            )));
        }

        let metrics = match config.loss {
            Some(loss) => Some(Metrics::new(
                loss,
                config.train_metrics.clone(),
                config.eval_metrics.clone(),
                config.thresholds.clone(),
            )?),
            None => {
                warn!("model built without a loss; training and evaluation will fail");
                None
            }
        };

        // TODO: accept one optimizer per layer once there is more than plain SGD.
        let optimizer = Sgd::new(config.learning_rate);
        for layer in self.layers.iter_mut() {
            layer.set_optimizer(optimizer);
        }

        info!(
            "built model: {} layers, loss {}, normalization {}, learning rate {}",
            self.layers.len(),
            config.loss.map_or("none".to_string(), |l| l.to_string()),
            config.normalization,
            config.learning_rate
        );

        self.normalize = Some(Normalizer::new(config.normalization));
        self.metrics = metrics;
        self.config = Some(config);
        Ok(())
    }

    /// Inference pass through every layer's `predict`, on already-normalized input.
    pub fn predict(&self, x: &Matrix) -> Result<Matrix> {
        self.require_built()?;
        self.check_input(x)?;
        Ok(self.layers.iter().fold(x.clone(), |a, layer| layer.predict(&a)))
    }

    /// Normalizes raw input with the statistics fitted during `train`, then predicts.
    pub fn predict_normalized(&self, x: &Matrix) -> Result<Matrix> {
        let normalizer = self.normalize.as_ref().ok_or(NnError::NotBuilt)?;
        self.predict(&normalizer.evaluate(x)?)
    }

    /// Training pass; every layer caches what its backprop needs.
    pub fn forwardprop(&mut self, x: &Matrix) -> Result<Matrix> {
        self.check_input(x)?;
        let mut a = x.clone();
        for layer in self.layers.iter_mut() {
            a = layer.forwardprop(&a);
        }
        Ok(a)
    }

    /// Derives the output error signal from the loss and threads it through
    /// the stack from the last layer to the first.
    pub fn backprop(&mut self, y: &Matrix, a: &Matrix) -> Result<()> {
        let loss = self.loss()?;
        if y.shape() != a.shape() {
            return Err(NnError::ShapeMismatch {
                what: "targets vs predictions",
                expected: a.shape(),
                got: y.shape(),
            });
        }
        let delta = loss.output_delta(y, a);

        let (last, rest) = self.layers.split_last_mut().ok_or(NnError::NotBuilt)?;
        let mut grad = last.backprop_output(&delta)?;
        for layer in rest.iter_mut().rev() {
            grad = layer.backprop(&grad)?;
        }
        Ok(())
    }

    /// Applies the staged gradients, last layer first.
    pub fn update(&mut self) -> Result<()> {
        for layer in self.layers.iter_mut().rev() {
            layer.update()?;
        }
        Ok(())
    }

    /// Sum of the penalties of all regularized layers.
    pub fn regularization_loss(&self, batch_size: usize) -> f64 {
        regularization::regularization_loss(&self.layers, batch_size)
    }

    pub fn train(&mut self, x: &Matrix, y: &Matrix, epochs: usize, verbose: bool) -> Result<()> {
        self.train_with(x, y, &TrainConfig::new(epochs, verbose))
    }

    /// Fits the normalizer on `x` and runs `config.epochs` full-batch epochs.
    ///
    /// Every configuration and shape problem is reported before the first
    /// epoch, so a failed call leaves parameters and histories untouched.
    pub fn train_with(&mut self, x: &Matrix, y: &Matrix, config: &TrainConfig) -> Result<()> {
        self.loss()?;
        self.check_batch(x, y)?;
        if config.epochs == 0 {
            return Err(NnError::InvalidConfig("epochs must be at least 1".to_string()));
        }

        let m = y.rows;
        let x_norm = self.normalize.as_mut().ok_or(NnError::NotBuilt)?.train(x)?;

        for epoch in 0..config.epochs {
            let started = Instant::now();

            let a = self.forwardprop(&x_norm)?;
            self.backprop(y, &a)?;
            self.update()?;
            let reg_loss = self.regularization_loss(m);

            let metrics = self.metrics.as_mut().ok_or(NnError::MissingLoss)?;
            let cost = metrics.train(y, &a, reg_loss);
            let accuracy = metrics.last_train().and_then(|s| s.get(MetricKind::Accuracy));
            if config.verbose {
                metrics.train_print(epoch, config.epochs);
            }

            self.cost.push(cost);
            if let Some(acc) = accuracy {
                self.accuracy.push(acc);
            }

            if let Some(tx) = &config.progress_tx {
                let stats = EpochStats {
                    epoch: epoch + 1,
                    total_epochs: config.epochs,
                    cost,
                    accuracy,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                };
                if tx.send(stats).is_err() {
                    debug!("progress receiver dropped at epoch {}", epoch + 1);
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            info!("------------ Final performance ------------");
            metrics.train_print(config.epochs - 1, config.epochs);
        }
        Ok(())
    }

    /// Scores the model on held-out data. Uses the normalizer statistics from
    /// `train` and the inference path, so no parameter or history changes.
    pub fn evaluate(&mut self, x: &Matrix, y: &Matrix) -> Result<Score> {
        self.loss()?;
        self.check_batch(x, y)?;

        let normalizer = self.normalize.as_ref().ok_or(NnError::NotBuilt)?;
        let a = self.predict(&normalizer.evaluate(x)?)?;
        let reg_loss = self.regularization_loss(y.rows);

        let metrics = self.metrics.as_ref().ok_or(NnError::MissingLoss)?;
        let score = metrics.evaluate(y, &a, reg_loss);
        debug!("evaluation: {}", score);
        self.score = Some(score.clone());
        Ok(score)
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    /// Training cost per completed epoch, across all `train` calls.
    pub fn cost(&self) -> &[f64] {
        &self.cost
    }

    /// Training accuracy per epoch; only filled when accuracy is a training metric.
    pub fn accuracy(&self) -> &[f64] {
        &self.accuracy
    }

    /// Result of the most recent `evaluate`.
    pub fn score(&self) -> Option<&Score> {
        self.score.as_ref()
    }

    pub fn config(&self) -> Option<&BuildConfig> {
        self.config.as_ref()
    }

    pub fn is_built(&self) -> bool {
        self.config.is_some()
    }

    fn require_built(&self) -> Result<&BuildConfig> {
        self.config.as_ref().ok_or(NnError::NotBuilt)
    }

    fn loss(&self) -> Result<LossKind> {
        self.require_built()?.loss.ok_or(NnError::MissingLoss)
    }

    fn input_width(&self) -> Option<usize> {
        self.layers.first().and_then(|l| l.declared_input_width())
    }

    fn check_input(&self, x: &Matrix) -> Result<()> {
        let width = self.input_width().ok_or(NnError::MissingInputWidth)?;
        if x.cols != width {
            return Err(NnError::ShapeMismatch {
                what: "model input",
                expected: (x.rows, width),
                got: x.shape(),
            });
        }
        Ok(())
    }

    fn check_batch(&self, x: &Matrix, y: &Matrix) -> Result<()> {
        if y.rows == 0 {
            return Err(NnError::InvalidConfig("empty batch".to_string()));
        }
        self.check_input(x)?;
        let units = self.layers.last().map_or(0, |l| l.units());
        if x.rows != y.rows || y.cols != units {
            return Err(NnError::ShapeMismatch {
                what: "targets",
                expected: (x.rows, units),
                got: y.shape(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::layers::{Dense, Dropout};
    use crate::normalize::NormalizationKind;
    use crate::optim::Sgd;
    use crate::regularization::Regularizer;
    use approx::assert_abs_diff_eq;

    fn two_layer() -> Sequential {
        let mut model = Sequential::new();
        model
            .add(Dense::new(4, ActivationFunction::Tanh).with_input_width(3).with_seed(1))
            .unwrap();
        model.add(Dense::new(2, ActivationFunction::Sigmoid).with_seed(2)).unwrap();
        model
    }

    fn batch() -> (Matrix, Matrix) {
        let x = Matrix::from_data(vec![
            vec![0.5, -1.0, 2.0],
            vec![1.5, 0.0, -0.5],
            vec![-0.5, 1.0, 0.25],
        ]).unwrap();
        let y = Matrix::from_data(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        (x, y)
    }

    /// Records the order in which the orchestrator drives it.
    #[derive(Debug)]
    struct Probe {
        id: Option<usize>,
        width: usize,
        log: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    }

    impl Layer for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn id(&self) -> Option<usize> {
            self.id
        }

        fn declared_input_width(&self) -> Option<usize> {
            Some(self.width)
        }

        fn units(&self) -> usize {
            self.width
        }

        fn init(&mut self, id: usize, _input_width: usize) -> Result<()> {
            self.id = Some(id);
            Ok(())
        }

        fn set_optimizer(&mut self, _optimizer: Sgd) {}

        fn predict(&self, input: &Matrix) -> Matrix {
            input.clone()
        }

        fn forwardprop(&mut self, input: &Matrix) -> Matrix {
            self.log.borrow_mut().push(format!("forward {}", self.id.unwrap()));
            input.clone()
        }

        fn backprop(&mut self, grad: &Matrix) -> Result<Matrix> {
            self.log.borrow_mut().push(format!("backprop {}", self.id.unwrap()));
            Ok(grad.clone())
        }

        fn backprop_output(&mut self, delta: &Matrix) -> Result<Matrix> {
            self.log.borrow_mut().push(format!("backprop_output {}", self.id.unwrap()));
            Ok(delta.clone())
        }

        fn update(&mut self) -> Result<()> {
            self.log.borrow_mut().push(format!("update {}", self.id.unwrap()));
            Ok(())
        }
    }

    #[test]
    fn test_add_wires_widths_and_ids() {
        let model = two_layer();
        let layers = model.layers();
        assert_eq!(layers[0].id(), Some(0));
        assert_eq!(layers[1].id(), Some(1));
        assert_eq!(layers[1].declared_input_width(), Some(4));
        assert_eq!(layers[1].units(), 2);
    }

    #[test]
    fn test_later_declared_width_is_overridden() {
        let mut model = Sequential::new();
        model.add(Dense::new(3, ActivationFunction::ReLU).with_input_width(2)).unwrap();
        model.add(Dense::new(1, ActivationFunction::Identity).with_input_width(99)).unwrap();
        assert_eq!(model.layers()[1].declared_input_width(), Some(3));
    }

    #[test]
    fn test_first_layer_without_width_is_config_error() {
        let mut model = Sequential::new();
        let err = model.add(Dense::new(3, ActivationFunction::ReLU)).unwrap_err();
        assert!(matches!(err, NnError::MissingInputWidth));
        assert!(err.is_config());
        assert!(model.layers().is_empty());
    }

    #[test]
    fn test_build_is_single_shot_and_required() {
        let (x, y) = batch();
        let mut model = two_layer();
        assert!(matches!(model.train(&x, &y, 1, false).unwrap_err(), NnError::NotBuilt));
        assert!(matches!(model.evaluate(&x, &y).unwrap_err(), NnError::NotBuilt));
        assert!(matches!(model.predict(&x).unwrap_err(), NnError::NotBuilt));

        model.build(BuildConfig::new(LossKind::Mse)).unwrap();
        let err = model.build(BuildConfig::new(LossKind::Mse)).unwrap_err();
        assert!(matches!(err, NnError::AlreadyBuilt));
        let err = model.add(Dense::new(1, ActivationFunction::Identity)).unwrap_err();
        assert!(matches!(err, NnError::AlreadyBuilt));
    }

    #[test]
    fn test_build_rejects_bad_hyperparameters() {
        assert!(Sequential::new().build(BuildConfig::new(LossKind::Mse)).unwrap_err().is_config());
        let err = two_layer()
            .build(BuildConfig::new(LossKind::Mse).learning_rate(-1.0))
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_missing_loss_fails_before_any_epoch() {
        let (x, y) = batch();
        let mut model = two_layer();
        model.build(BuildConfig::default()).unwrap();
        assert!(matches!(model.train(&x, &y, 3, false).unwrap_err(), NnError::MissingLoss));
        assert!(model.cost().is_empty());
    }

    #[test]
    fn test_shape_errors_leave_model_untouched() {
        let (x, _) = batch();
        let mut model = two_layer();
        model.build(BuildConfig::new(LossKind::Mse)).unwrap();
        let before = model.predict(&x).unwrap();
        let wrong_y = Matrix::column(&[1.0, 0.0, 1.0]);
        let err = model.train(&x, &wrong_y, 5, false).unwrap_err();
        assert!(matches!(err, NnError::ShapeMismatch { .. }));
        assert!(model.cost().is_empty());
        assert_eq!(model.predict(&x).unwrap(), before);
    }

    #[test]
    fn test_wrong_input_width_is_rejected_before_layers_run() {
        let mut model = two_layer();
        model.build(BuildConfig::new(LossKind::Mse)).unwrap();
        let narrow = Matrix::from_data(vec![vec![1.0, 2.0]]).unwrap();
        assert!(matches!(model.predict(&narrow).unwrap_err(), NnError::ShapeMismatch { .. }));
        assert!(matches!(model.forwardprop(&narrow).unwrap_err(), NnError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_predict_matches_forwardprop_without_dropout() {
        let (x, _) = batch();
        let mut model = two_layer();
        model.build(BuildConfig::new(LossKind::BinaryCrossentropy)).unwrap();
        assert_eq!(model.predict(&x).unwrap(), model.forwardprop(&x).unwrap());
    }

    #[test]
    fn test_dropout_only_active_in_training() {
        let x = Matrix::from_data(vec![vec![1.0; 6]; 4]).unwrap();
        let mut model = Sequential::new();
        model.add(Dropout::new(0.5).with_input_width(6).with_seed(4)).unwrap();
        model.build(BuildConfig::new(LossKind::Mse)).unwrap();
        assert_eq!(model.predict(&x).unwrap(), x);
        let trained = model.forwardprop(&x).unwrap();
        assert!(trained.iter().any(|&v| v == 0.0));
    }

    #[test]
    fn test_backprop_runs_in_reverse_then_updates() {
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut model = Sequential::new();
        for _ in 0..3 {
            model.add(Probe { id: None, width: 2, log: log.clone() }).unwrap();
        }
        model.build(BuildConfig::new(LossKind::Mae)).unwrap();
        let x = Matrix::from_data(vec![vec![1.0, 2.0]]).unwrap();
        model.train(&x, &x, 1, false).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                "forward 0", "forward 1", "forward 2",
                "backprop_output 2", "backprop 1", "backprop 0",
                "update 2", "update 1", "update 0",
            ]
        );
    }

    #[test]
    fn test_cost_history_grows_one_entry_per_epoch() {
        let (x, y) = batch();
        let mut model = two_layer();
        let config = BuildConfig::new(LossKind::BinaryCrossentropy)
            .train_metrics(vec![MetricKind::Accuracy]);
        model.build(config).unwrap();
        model.train(&x, &y, 4, false).unwrap();
        assert_eq!(model.cost().len(), 4);
        assert_eq!(model.accuracy().len(), 4);
        model.train(&x, &y, 2, false).unwrap();
        assert_eq!(model.cost().len(), 6);
    }

    #[test]
    fn test_evaluate_does_not_touch_parameters_or_history() {
        let (x, y) = batch();
        let mut model = two_layer();
        model
            .build(BuildConfig::new(LossKind::Mse).normalization(NormalizationKind::Standard))
            .unwrap();
        model.train(&x, &y, 3, false).unwrap();
        let before = model.predict_normalized(&x).unwrap();
        let cost_before = model.cost().to_vec();

        let score = model.evaluate(&x, &y).unwrap();
        assert_eq!(model.score(), Some(&score));
        assert_eq!(model.cost(), cost_before.as_slice());
        assert_eq!(model.predict_normalized(&x).unwrap(), before);
    }

    #[test]
    fn test_regularization_loss_sums_only_regularized_layers() {
        let mut model = Sequential::new();
        model
            .add(Dense::new(3, ActivationFunction::Tanh).with_input_width(2).with_seed(5))
            .unwrap();
        assert_eq!(model.regularization_loss(4), 0.0);

        let mut regularized = Sequential::new();
        regularized.add(Dense::new(3, ActivationFunction::Tanh).with_input_width(2).with_seed(5)
            .with_regularizer(Regularizer::l2(2.0))).unwrap();
        regularized.add(Dropout::new(0.2)).unwrap();
        let weights = model.layers()[0].regularizer().map(|(_, w)| w.clone());
        assert!(weights.is_none());
        let (_, w) = regularized.layers()[0].regularizer().unwrap();
        let expected = 2.0 / 8.0 * w.iter().map(|v| v * v).sum::<f64>();
        assert_abs_diff_eq!(regularized.regularization_loss(4), expected, epsilon = 1e-12);
    }
}
