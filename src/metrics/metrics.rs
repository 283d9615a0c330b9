use log::info;

use crate::error::{NnError, Result};
use crate::loss::loss_type::LossKind;
use crate::math::matrix::Matrix;
use crate::metrics::metric_kind::MetricKind;
use crate::metrics::score::{MetricValue, Score};

/// Turns predictions into the reported training cost and evaluation score.
#[derive(Debug, Clone)]
pub struct Metrics {
    pub loss: LossKind,
    pub train_metrics: Vec<MetricKind>,
    pub eval_metrics: Vec<MetricKind>,
    pub thresholds: Vec<f64>,
    last_train: Option<Score>,
}

impl Metrics {
    pub fn new(
        loss: LossKind,
        train_metrics: Vec<MetricKind>,
        eval_metrics: Vec<MetricKind>,
        thresholds: Vec<f64>,
    ) -> Result<Metrics> {
        if let Some(bad) = thresholds.iter().find(|t| !(0.0..=1.0).contains(*t)) {
            return Err(NnError::InvalidConfig(format!("threshold {} is outside [0, 1]", bad)));
        }
        let thresholds = if thresholds.is_empty() { vec![0.5] } else { thresholds };
        Ok(Metrics { loss, train_metrics, eval_metrics, thresholds, last_train: None })
    }

    /// Epoch cost (`loss + reg_loss`); also records the training metrics for
    /// `train_print`.
    pub fn train(&mut self, y: &Matrix, a: &Matrix, reg_loss: f64) -> f64 {
        let score = self.score(&self.train_metrics, y, a, reg_loss);
        let cost = score.cost;
        self.last_train = Some(score);
        cost
    }

    /// Logs the values recorded by the last `train` call.
    pub fn train_print(&self, epoch: usize, epochs: usize) {
        if let Some(score) = &self.last_train {
            info!("epoch {}/{}: {}", epoch + 1, epochs, score);
        }
    }

    pub fn evaluate(&self, y: &Matrix, a: &Matrix, reg_loss: f64) -> Score {
        self.score(&self.eval_metrics, y, a, reg_loss)
    }

    pub fn last_train(&self) -> Option<&Score> {
        self.last_train.as_ref()
    }

    fn score(&self, metrics: &[MetricKind], y: &Matrix, a: &Matrix, reg_loss: f64) -> Score {
        let cost = self.loss.loss(y, a) + reg_loss;
        let mut values = Vec::new();
        for &metric in metrics {
            if metric.uses_threshold() && a.cols == 1 {
                for &t in &self.thresholds {
                    values.push(MetricValue { metric, threshold: Some(t), value: metric.compute(y, a, t) });
                }
            } else {
                let value = metric.compute(y, a, self.thresholds[0]);
                values.push(MetricValue { metric, threshold: None, value });
            }
        }
        Score { cost, values }
    }
}
