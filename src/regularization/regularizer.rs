use serde::{Serialize, Deserialize};

use crate::loss::mae::sign;
use crate::math::matrix::Matrix;

/// Weight penalty attached to a single layer.
///
/// Both terms are scaled by the batch size so they stay comparable with the
/// batch-averaged loss they are added to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regularizer {
    /// λ/m · Σ |W|
    L1 { lambda: f64 },
    /// λ/(2m) · Σ W²
    L2 { lambda: f64 },
}

impl Regularizer {
    pub fn l1(lambda: f64) -> Regularizer {
        Regularizer::L1 { lambda }
    }

    pub fn l2(lambda: f64) -> Regularizer {
        Regularizer::L2 { lambda }
    }

    pub fn lambda(&self) -> f64 {
        match self {
            Regularizer::L1 { lambda } | Regularizer::L2 { lambda } => *lambda,
        }
    }

    /// Penalty contributed to the reported cost.
    pub fn loss(&self, weights: &Matrix, batch_size: usize) -> f64 {
        if batch_size == 0 {
            return 0.0;
        }
        let m = batch_size as f64;
        match self {
            Regularizer::L1 { lambda } => lambda / m * weights.iter().map(|w| w.abs()).sum::<f64>(),
            Regularizer::L2 { lambda } => lambda / (2.0 * m) * weights.iter().map(|w| w * w).sum::<f64>(),
        }
    }

    /// Gradient of `loss` with respect to the weights, added into dW.
    pub fn gradient(&self, weights: &Matrix, batch_size: usize) -> Matrix {
        if batch_size == 0 {
            return Matrix::zeros(weights.rows, weights.cols);
        }
        let m = batch_size as f64;
        match self {
            Regularizer::L1 { lambda } => weights.map(|w| lambda / m * sign(w)),
            Regularizer::L2 { lambda } => weights.scale(lambda / m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn weights() -> Matrix {
        Matrix::from_data(vec![vec![1.0, -2.0], vec![0.0, 3.0]]).unwrap()
    }

    #[test]
    fn test_l2_loss_and_gradient() {
        let r = Regularizer::l2(0.5);
        // 0.5 / (2 * 2) * (1 + 4 + 0 + 9)
        assert_abs_diff_eq!(r.loss(&weights(), 2), 1.75);
        assert_eq!(r.gradient(&weights(), 2).data, vec![vec![0.25, -0.5], vec![0.0, 0.75]]);
    }

    #[test]
    fn test_l1_loss_and_gradient() {
        let r = Regularizer::l1(1.0);
        assert_abs_diff_eq!(r.loss(&weights(), 2), 3.0);
        assert_eq!(r.gradient(&weights(), 2).data, vec![vec![0.5, -0.5], vec![0.0, 0.5]]);
    }

    #[test]
    fn test_larger_penalty_gives_larger_loss() {
        let strong = Regularizer::l2(10.0).loss(&weights(), 4);
        let none = Regularizer::l2(0.0).loss(&weights(), 4);
        assert!(strong > none);
        assert_eq!(none, 0.0);
    }
}
