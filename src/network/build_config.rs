use serde::{Serialize, Deserialize};

use crate::loss::loss_type::LossKind;
use crate::metrics::metric_kind::MetricKind;
use crate::normalize::normalizer::NormalizationKind;

/// Hyperparameters fixed once by `Sequential::build`.
///
/// The learning rate is shared by every layer; per-layer optimizers are not
/// supported yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub loss: Option<LossKind>,
    pub normalization: NormalizationKind,
    pub learning_rate: f64,
    pub train_metrics: Vec<MetricKind>,
    pub eval_metrics: Vec<MetricKind>,
    pub thresholds: Vec<f64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            loss: None,
            normalization: NormalizationKind::None,
            learning_rate: 0.01,
            train_metrics: Vec::new(),
            eval_metrics: Vec::new(),
            thresholds: vec![0.5],
        }
    }
}

impl BuildConfig {
    pub fn new(loss: LossKind) -> Self {
        BuildConfig { loss: Some(loss), ..Default::default() }
    }

    pub fn normalization(mut self, normalization: NormalizationKind) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn train_metrics(mut self, metrics: Vec<MetricKind>) -> Self {
        self.train_metrics = metrics;
        self
    }

    pub fn eval_metrics(mut self, metrics: Vec<MetricKind>) -> Self {
        self.eval_metrics = metrics;
        self
    }

    pub fn thresholds(mut self, thresholds: Vec<f64>) -> Self {
        self.thresholds = thresholds;
        self
    }
}
