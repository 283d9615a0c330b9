use crate::loss::bce::clip;
use crate::math::matrix::Matrix;

/// Categorical cross-entropy loss for use with a Softmax output layer.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Computes the scalar loss over a batch of one-hot (or soft) targets:
    ///   L = -(1/m) · Σ y · log(ŷ)
    ///
    /// `ŷ` is clipped to [1e-15, 1 - 1e-15] so a zero probability on the
    /// true class stays finite.
    pub fn loss(expected: &Matrix, predicted: &Matrix) -> f64 {
        let m = expected.rows;
        if m == 0 {
            return 0.0;
        }
        -expected.iter().zip(predicted.iter())
            .map(|(y, p)| y * clip(*p).ln())
            .sum::<f64>() / m as f64
    }

    /// Combined Softmax + cross-entropy gradient with respect to the logits:
    ///   ∂L/∂z = ŷ - y
    ///
    /// The output layer consumes this directly, without applying the softmax
    /// Jacobian a second time.
    pub fn delta(expected: &Matrix, predicted: &Matrix) -> Matrix {
        predicted - expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cross_entropy_one_hot() {
        let y = Matrix::from_data(vec![vec![0.0, 1.0, 0.0], vec![1.0, 0.0, 0.0]]).unwrap();
        let p = Matrix::from_data(vec![vec![0.2, 0.7, 0.1], vec![0.5, 0.25, 0.25]]).unwrap();
        let expected = -(0.7f64.ln() + 0.5f64.ln()) / 2.0;
        assert_abs_diff_eq!(CrossEntropyLoss::loss(&y, &p), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_cross_entropy_zero_probability_is_finite() {
        let y = Matrix::from_data(vec![vec![1.0, 0.0]]).unwrap();
        let p = Matrix::from_data(vec![vec![0.0, 1.0]]).unwrap();
        let loss = CrossEntropyLoss::loss(&y, &p);
        assert!(loss.is_finite());
        assert_abs_diff_eq!(loss, -(1e-15f64).ln(), epsilon = 1e-9);
    }
}
