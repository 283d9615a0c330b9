use serde::{Serialize, Deserialize};
use std::fmt;

use crate::metrics::metric_kind::MetricKind;

/// One computed metric. `threshold` is set for classification metrics on
/// single-column outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub metric: MetricKind,
    pub threshold: Option<f64>,
    pub value: f64,
}

/// Cost plus every requested metric for one pass over a dataset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Score {
    /// Loss plus regularization penalty.
    pub cost: f64,
    pub values: Vec<MetricValue>,
}

impl Score {
    /// Value of `metric` at the first configured threshold.
    pub fn get(&self, metric: MetricKind) -> Option<f64> {
        self.values.iter().find(|v| v.metric == metric).map(|v| v.value)
    }

    pub fn get_at(&self, metric: MetricKind, threshold: f64) -> Option<f64> {
        self.values
            .iter()
            .find(|v| v.metric == metric && v.threshold.map_or(true, |t| (t - threshold).abs() < 1e-12))
            .map(|v| v.value)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cost = {:.6}", self.cost)?;
        for v in &self.values {
            match v.threshold {
                Some(t) => write!(f, ", {}@{:.2} = {:.4}", v.metric, t, v.value)?,
                None => write!(f, ", {} = {:.4}", v.metric, v.value)?,
            }
        }
        Ok(())
    }
}
