use crate::math::matrix::Matrix;

pub struct MseLoss;

impl MseLoss {
    /// Scalar MSE: (1/2m) · Σ (y - ŷ)²
    ///
    /// The 1/2 makes `ŷ - y` the exact gradient with respect to a linear output.
    pub fn loss(expected: &Matrix, predicted: &Matrix) -> f64 {
        let m = expected.rows;
        if m == 0 {
            return 0.0;
        }
        expected.iter().zip(predicted.iter())
            .map(|(y, p)| (y - p).powi(2))
            .sum::<f64>() / (2.0 * m as f64)
    }

    /// Output-layer error signal: ŷ - y
    pub fn delta(expected: &Matrix, predicted: &Matrix) -> Matrix {
        predicted - expected
    }
}
