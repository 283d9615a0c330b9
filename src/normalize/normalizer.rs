use log::debug;
use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{NnError, Result};
use crate::math::matrix::Matrix;

/// How input features are rescaled before they reach the first layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationKind {
    #[default]
    None,
    /// Per-column zero mean, unit variance.
    Standard,
    /// Per-column rescale to [0, 1].
    MinMax,
}

impl fmt::Display for NormalizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NormalizationKind::None => "none",
            NormalizationKind::Standard => "standard",
            NormalizationKind::MinMax => "minmax",
        })
    }
}

impl FromStr for NormalizationKind {
    type Err = NnError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(NormalizationKind::None),
            "standard" | "zscore" => Ok(NormalizationKind::Standard),
            "minmax" => Ok(NormalizationKind::MinMax),
            _ => Err(NnError::UnknownNormalization(s.to_string())),
        }
    }
}

/// Per-column `(x - shift) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ColumnStats {
    shift: Vec<f64>,
    scale: Vec<f64>,
}

/// Fits feature statistics on training data and reapplies them unchanged
/// at evaluation time.
#[derive(Debug, Clone)]
pub struct Normalizer {
    pub method: NormalizationKind,
    stats: Option<ColumnStats>,
}

impl Normalizer {
    pub fn new(method: NormalizationKind) -> Normalizer {
        Normalizer { method, stats: None }
    }

    pub fn is_fitted(&self) -> bool {
        self.method == NormalizationKind::None || self.stats.is_some()
    }

    /// Fits statistics from `x` (replacing any previous fit) and transforms it.
    pub fn train(&mut self, x: &Matrix) -> Result<Matrix> {
        let stats = match self.method {
            NormalizationKind::None => return Ok(x.clone()),
            NormalizationKind::Standard => standard_stats(x),
            NormalizationKind::MinMax => min_max_stats(x),
        };
        debug!("fitted {} normalizer on {} samples x {} features", self.method, x.rows, x.cols);
        let out = apply(&stats, x);
        self.stats = Some(stats);
        Ok(out)
    }

    /// Transforms `x` with the statistics fixed by the last `train` call.
    pub fn evaluate(&self, x: &Matrix) -> Result<Matrix> {
        if self.method == NormalizationKind::None {
            return Ok(x.clone());
        }
        let stats = self.stats.as_ref().ok_or_else(|| {
            NnError::State(format!("{} normalizer used before it was fitted", self.method))
        })?;
        if stats.shift.len() != x.cols {
            return Err(NnError::ShapeMismatch {
                what: "normalizer input",
                expected: (x.rows, stats.shift.len()),
                got: x.shape(),
            });
        }
        Ok(apply(stats, x))
    }
}

/// Divisor used for constant columns.
fn safe_scale(v: f64) -> f64 {
    if v.abs() < f64::EPSILON { 1.0 } else { v }
}

fn standard_stats(x: &Matrix) -> ColumnStats {
    let n = x.rows.max(1) as f64;
    let mean: Vec<f64> = x.sum_rows().data[0].iter().map(|s| s / n).collect();
    let std = (0..x.cols)
        .map(|j| {
            let var = x.data.iter().map(|row| (row[j] - mean[j]).powi(2)).sum::<f64>() / n;
            safe_scale(var.sqrt())
        })
        .collect();
    ColumnStats { shift: mean, scale: std }
}

fn min_max_stats(x: &Matrix) -> ColumnStats {
    let mut min = vec![f64::INFINITY; x.cols];
    let mut max = vec![f64::NEG_INFINITY; x.cols];
    for row in &x.data {
        for (j, &v) in row.iter().enumerate() {
            min[j] = min[j].min(v);
            max[j] = max[j].max(v);
        }
    }
    let range = min.iter().zip(max.iter()).map(|(lo, hi)| safe_scale(hi - lo)).collect();
    ColumnStats { shift: min, scale: range }
}

fn apply(stats: &ColumnStats, x: &Matrix) -> Matrix {
    let data = x
        .data
        .iter()
        .map(|row| {
            row.iter()
                .zip(stats.shift.iter().zip(stats.scale.iter()))
                .map(|(v, (shift, scale))| (v - shift) / scale)
                .collect()
        })
        .collect();
    Matrix { rows: x.rows, cols: x.cols, data }
}
