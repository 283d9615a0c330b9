use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NnError;
use crate::math::matrix::Matrix;

/// A reportable quality measure, computed alongside the loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Accuracy,
    Precision,
    Recall,
    F1,
    Mae,
    Rmse,
    R2,
}

impl MetricKind {
    /// Classification metrics depend on a decision threshold for
    /// single-column outputs; regression metrics do not.
    pub fn uses_threshold(&self) -> bool {
        matches!(
            self,
            MetricKind::Accuracy | MetricKind::Precision | MetricKind::Recall | MetricKind::F1
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Accuracy => "accuracy",
            MetricKind::Precision => "precision",
            MetricKind::Recall => "recall",
            MetricKind::F1 => "f1",
            MetricKind::Mae => "mae",
            MetricKind::Rmse => "rmse",
            MetricKind::R2 => "r2",
        }
    }

    /// Evaluates the metric for targets `y` and outputs `a` (samples are rows).
    /// `threshold` only matters for classification metrics on one-column outputs.
    /// `y` and `a` must have the same shape.
    pub fn compute(&self, y: &Matrix, a: &Matrix, threshold: f64) -> f64 {
        debug_assert_eq!(y.shape(), a.shape(), "targets and predictions differ in shape");
        match self {
            MetricKind::Accuracy => Labels::new(y, a, threshold).accuracy(),
            MetricKind::Precision => Labels::new(y, a, threshold).macro_average(Labels::precision),
            MetricKind::Recall => Labels::new(y, a, threshold).macro_average(Labels::recall),
            MetricKind::F1 => Labels::new(y, a, threshold).macro_average(Labels::f1),
            MetricKind::Mae => mean(y.iter().zip(a.iter()).map(|(t, p)| (t - p).abs()), y),
            MetricKind::Rmse => {
                mean(y.iter().zip(a.iter()).map(|(t, p)| (t - p).powi(2)), y).sqrt()
            }
            MetricKind::R2 => r2_score(y, a),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = NnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accuracy" | "acc" => Ok(MetricKind::Accuracy),
            "precision" => Ok(MetricKind::Precision),
            "recall" => Ok(MetricKind::Recall),
            "f1" | "f1_score" => Ok(MetricKind::F1),
            "mae" => Ok(MetricKind::Mae),
            "rmse" => Ok(MetricKind::Rmse),
            "r2" => Ok(MetricKind::R2),
            _ => Err(NnError::UnknownMetric(s.to_string())),
        }
    }
}

fn mean<I: Iterator<Item = f64>>(values: I, y: &Matrix) -> f64 {
    let n = y.rows * y.cols;
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

fn r2_score(y: &Matrix, a: &Matrix) -> f64 {
    let n = (y.rows * y.cols) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean_true = y.sum() / n;
    let ss_res: f64 = y.iter().zip(a.iter()).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|t| (t - mean_true).powi(2)).sum();
    if ss_tot < 1e-15 {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}

/// Predicted and true class indices, one per sample.
struct Labels {
    truth: Vec<usize>,
    predicted: Vec<usize>,
    n_classes: usize,
    /// One-column output thresholded into a positive class.
    binary: bool,
}

impl Labels {
    fn new(y: &Matrix, a: &Matrix, threshold: f64) -> Labels {
        if a.cols == 1 {
            Labels {
                truth: y.iter().map(|&t| usize::from(t >= 0.5)).collect(),
                predicted: a.iter().map(|&p| usize::from(p >= threshold)).collect(),
                n_classes: 2,
                binary: true,
            }
        } else {
            Labels {
                truth: y.data.iter().map(|row| argmax(row)).collect(),
                predicted: a.data.iter().map(|row| argmax(row)).collect(),
                n_classes: a.cols,
                binary: false,
            }
        }
    }

    fn accuracy(&self) -> f64 {
        if self.truth.is_empty() {
            return 0.0;
        }
        let correct = self.truth.iter().zip(self.predicted.iter()).filter(|(t, p)| t == p).count();
        correct as f64 / self.truth.len() as f64
    }

    fn counts(&self, class: usize) -> (usize, usize, usize) {
        let mut tp = 0;
        let mut fp = 0;
        let mut fn_ = 0;
        for (&t, &p) in self.truth.iter().zip(self.predicted.iter()) {
            match (t == class, p == class) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }
        (tp, fp, fn_)
    }

    fn precision(&self, class: usize) -> f64 {
        let (tp, fp, _) = self.counts(class);
        if tp + fp == 0 { 0.0 } else { tp as f64 / (tp + fp) as f64 }
    }

    fn recall(&self, class: usize) -> f64 {
        let (tp, _, fn_) = self.counts(class);
        if tp + fn_ == 0 { 0.0 } else { tp as f64 / (tp + fn_) as f64 }
    }

    fn f1(&self, class: usize) -> f64 {
        let p = self.precision(class);
        let r = self.recall(class);
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    /// One-column outputs report the positive class; multi-column outputs
    /// average over every class, including two-column ones.
    fn macro_average(&self, per_class: fn(&Labels, usize) -> f64) -> f64 {
        if self.binary {
            return per_class(self, 1);
        }
        let sum: f64 = (0..self.n_classes).map(|c| per_class(self, c)).sum();
        sum / self.n_classes as f64
    }
}

/// Index of the maximum element in a slice.
fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_binary_metrics_at_threshold() {
        let y = Matrix::column(&[1.0, 1.0, 0.0, 0.0]);
        let a = Matrix::column(&[0.9, 0.4, 0.6, 0.1]);
        assert_abs_diff_eq!(MetricKind::Accuracy.compute(&y, &a, 0.5), 0.5);
        assert_abs_diff_eq!(MetricKind::Accuracy.compute(&y, &a, 0.3), 0.75);
        assert_abs_diff_eq!(MetricKind::Precision.compute(&y, &a, 0.5), 0.5);
        assert_abs_diff_eq!(MetricKind::Recall.compute(&y, &a, 0.3), 1.0);
    }

    #[test]
    fn test_multiclass_accuracy_uses_argmax() {
        let y = Matrix::from_data(vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]]).unwrap();
        let a = Matrix::from_data(vec![vec![0.7, 0.2, 0.1], vec![0.5, 0.3, 0.2]]).unwrap();
        assert_abs_diff_eq!(MetricKind::Accuracy.compute(&y, &a, 0.99), 0.5);
    }

    #[test]
    fn test_two_column_metrics_are_macro_averaged() {
        // truth 0,0,1,1 and predictions 0,1,1,1
        let y = Matrix::from_data(vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        ]).unwrap();
        let a = Matrix::from_data(vec![
            vec![0.8, 0.2],
            vec![0.3, 0.7],
            vec![0.1, 0.9],
            vec![0.4, 0.6],
        ]).unwrap();
        // precision 1 and 2/3, recall 1/2 and 1
        assert_abs_diff_eq!(MetricKind::Precision.compute(&y, &a, 0.5), 5.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(MetricKind::Recall.compute(&y, &a, 0.5), 0.75, epsilon = 1e-12);
        let f1 = (2.0 / 3.0 + 0.8) / 2.0;
        assert_abs_diff_eq!(MetricKind::F1.compute(&y, &a, 0.5), f1, epsilon = 1e-12);
    }

    #[test]
    fn test_three_column_metrics_are_macro_averaged() {
        // truth 0,1,2,2 and predictions 0,2,2,1
        let y = Matrix::from_data(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0],
        ]).unwrap();
        let a = Matrix::from_data(vec![
            vec![0.6, 0.3, 0.1],
            vec![0.2, 0.3, 0.5],
            vec![0.1, 0.2, 0.7],
            vec![0.2, 0.5, 0.3],
        ]).unwrap();
        // precision 1, 0, 1/2; recall 1, 0, 1/2
        assert_abs_diff_eq!(MetricKind::Precision.compute(&y, &a, 0.5), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(MetricKind::Recall.compute(&y, &a, 0.5), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(MetricKind::F1.compute(&y, &a, 0.5), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_regression_metrics() {
        let y = Matrix::column(&[1.0, 2.0, 3.0]);
        let a = Matrix::column(&[1.0, 2.0, 5.0]);
        assert_abs_diff_eq!(MetricKind::Mae.compute(&y, &a, 0.5), 2.0 / 3.0, epsilon = 1e-12);
        let rmse = (4.0f64 / 3.0).sqrt();
        assert_abs_diff_eq!(MetricKind::Rmse.compute(&y, &a, 0.5), rmse, epsilon = 1e-12);
        assert_abs_diff_eq!(MetricKind::R2.compute(&y, &y, 0.5), 1.0);
    }

    #[test]
    fn test_parse_metric_names() {
        assert_eq!("acc".parse::<MetricKind>().unwrap(), MetricKind::Accuracy);
        assert!("auc".parse::<MetricKind>().unwrap_err().is_config());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "differ in shape")]
    fn test_compute_rejects_mismatched_shapes() {
        let y = Matrix::column(&[1.0, 2.0, 3.0]);
        let a = Matrix::column(&[1.0, 2.0]);
        MetricKind::Mae.compute(&y, &a, 0.5);
    }
}
